//! The pluggable cryptographic suite abstraction. A suite is a named,
//! stateless strategy object that provides every primitive the item engine
//! needs: signing, verification, key generation, key agreement, authenticated
//! encryption, hashing, and the text codec for raw key material.
//!
//! The item engine never touches an algorithm directly. It resolves a suite
//! by name from the [registry][crate::crypto] and calls through this trait,
//! which is what lets old and new cryptographic material coexist in one
//! process.

use crate::{capability::KeyCapability, error::Result};
use rand::RngCore;
use zeroize::Zeroizing;

/// Raw key material produced by a suite. Secret bytes are zeroized when the
/// pair is dropped.
#[derive(Clone)]
pub struct RawKeyPair {
    capabilities: Vec<KeyCapability>,
    secret: Option<Zeroizing<Vec<u8>>>,
    public: Option<Vec<u8>>,
}

impl RawKeyPair {
    pub fn new(capabilities: Vec<KeyCapability>, secret: Option<Vec<u8>>, public: Option<Vec<u8>>) -> Self {
        Self {
            capabilities,
            secret: secret.map(Zeroizing::new),
            public,
        }
    }

    pub fn capabilities(&self) -> &[KeyCapability] {
        &self.capabilities
    }

    pub fn has_capability(&self, capability: KeyCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn secret(&self) -> Option<&[u8]> {
        self.secret.as_deref().map(|v| v.as_slice())
    }

    pub fn public(&self) -> Option<&[u8]> {
        self.public.as_deref()
    }

    /// A copy of this pair with the secret half removed.
    pub fn public_only(&self) -> Self {
        Self {
            capabilities: self.capabilities.clone(),
            secret: None,
            public: self.public.clone(),
        }
    }
}

impl std::fmt::Debug for RawKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawKeyPair")
            .field("capabilities", &self.capabilities)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("public", &self.public.as_ref().map(crate::util::ser::hex_encode))
            .finish()
    }
}

/// A named provider of cryptographic primitives.
///
/// Implementations must be stateless (beyond configuration) and callable
/// from multiple threads. The `rng` parameters take any cryptographically
/// secure source; [`rng_chacha20`][crate::crypto::rng_chacha20] is the
/// house default.
pub trait CryptoSuite: Send + Sync {
    /// The registry name of this suite, also used as the prefix of key text
    /// encodings.
    fn name(&self) -> &'static str;

    /// A short stable identifier for a public key, used to pick the right
    /// signature out of a multi-signature list without retrying every
    /// candidate.
    fn key_identifier(&self, public_key: &[u8]) -> Result<String>;

    /// Sign `data` with a raw secret signing key.
    fn sign(&self, data: &[u8], secret_key: &[u8]) -> Result<Vec<u8>>;

    /// Verify `signature` over `data` against a raw public signing key.
    /// `Ok(false)` means the signature is well-formed but does not verify;
    /// `Err` means the inputs could not be used at all.
    fn verify(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool>;

    /// Generate raw key material for exactly one capability.
    fn generate_key(&self, capabilities: &[KeyCapability], rng: &mut dyn RngCore) -> Result<RawKeyPair>;

    /// Derive a shared symmetric key from a local pair (secret half
    /// required) and a remote pair (public half required). Both ends derive
    /// the same key regardless of which side is "local".
    fn generate_shared_secret(
        &self,
        local: &RawKeyPair,
        remote: &RawKeyPair,
        capabilities: &[KeyCapability],
    ) -> Result<Zeroizing<Vec<u8>>>;

    /// Authenticated encryption; the nonce is generated from `rng` and
    /// prepended to the ciphertext.
    fn encrypt(&self, data: &[u8], key: &[u8], rng: &mut dyn RngCore) -> Result<Vec<u8>>;

    /// Reverse of [`encrypt`][CryptoSuite::encrypt].
    fn decrypt(&self, data: &[u8], key: &[u8]) -> Result<Vec<u8>>;

    /// The suite's digest over arbitrary bytes.
    fn hash(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Encode raw key bytes in this suite's text form (no suite prefix).
    fn encode_key(&self, raw: &[u8]) -> String;

    /// Decode this suite's key text form back to raw bytes.
    fn decode_key(&self, text: &str) -> Result<Vec<u8>>;
}
