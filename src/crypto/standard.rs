//! The two suites that ship with the crate. Both run the same primitives
//! (Ed25519 signing, X25519 agreement, XChaCha20-Poly1305 sealing, Blake2b
//! hashing) and differ only in their key text codec: the standard suite
//! writes base58, the legacy suite base64 plus the old headered raw-key
//! framing.

use crate::{
    capability::KeyCapability,
    crypto::suite::{CryptoSuite, RawKeyPair},
    error::{Error, Result},
    util::ser,
};
use blake2::digest::{consts::U32, Digest, Mac};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use rand::RngCore;
use zeroize::Zeroizing;

const KEY_LEN: usize = 32;
const SIGNATURE_LEN: usize = 64;
const NONCE_LEN: usize = 24;
const KEY_IDENTIFIER_LEN: usize = 16;

/// Length of the binary header prepended to legacy raw keys.
pub(crate) const LEGACY_HEADER_LEN: usize = 6;
const LEGACY_VERSION: u8 = 0x01;

type Blake2b256 = blake2::Blake2b<U32>;
type Blake2bMac256 = blake2::Blake2bMac<U32>;

fn blake2b_256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

fn keyed_blake2b_256(key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <Blake2bMac256 as Mac>::new_from_slice(key)
        .map_err(|_| Error::Crypto("bad derivation key length".to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn key_array(bytes: &[u8]) -> Result<[u8; KEY_LEN]> {
    bytes
        .try_into()
        .map_err(|_| Error::Crypto(format!("expected a {}-byte key, got {}", KEY_LEN, bytes.len())))
}

fn ed25519_sign(data: &[u8], secret_key: &[u8]) -> Result<Vec<u8>> {
    let seed = key_array(secret_key)?;
    let signing = ed25519_consensus::SigningKey::from(seed);
    Ok(signing.sign(data).to_bytes().to_vec())
}

fn ed25519_verify(data: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool> {
    let verification = ed25519_consensus::VerificationKey::try_from(key_array(public_key)?)
        .map_err(|_| Error::Crypto("invalid public signing key".to_string()))?;
    let sig_bytes: [u8; SIGNATURE_LEN] = signature
        .try_into()
        .map_err(|_| Error::Crypto(format!("expected a {}-byte signature", SIGNATURE_LEN)))?;
    let signature = ed25519_consensus::Signature::from(sig_bytes);
    Ok(verification.verify(&signature, data).is_ok())
}

fn generate_raw(capabilities: &[KeyCapability], rng: &mut dyn RngCore) -> Result<RawKeyPair> {
    if capabilities.len() != 1 {
        return Err(Error::Crypto("key generation takes exactly one capability".to_string()));
    }
    let mut seed = Zeroizing::new([0u8; KEY_LEN]);
    rng.fill_bytes(seed.as_mut());
    match capabilities[0] {
        KeyCapability::Sign => {
            let signing = ed25519_consensus::SigningKey::from(*seed);
            let public = signing.verification_key().to_bytes().to_vec();
            Ok(RawKeyPair::new(capabilities.to_vec(), Some(seed.to_vec()), Some(public)))
        }
        KeyCapability::Exchange => {
            let secret = x25519_dalek::StaticSecret::from(*seed);
            let public = x25519_dalek::PublicKey::from(&secret).as_bytes().to_vec();
            Ok(RawKeyPair::new(capabilities.to_vec(), Some(seed.to_vec()), Some(public)))
        }
        KeyCapability::Encrypt => Ok(RawKeyPair::new(capabilities.to_vec(), Some(seed.to_vec()), None)),
    }
}

fn shared_secret(local: &RawKeyPair, remote: &RawKeyPair) -> Result<Zeroizing<Vec<u8>>> {
    if !local.has_capability(KeyCapability::Exchange) || !remote.has_capability(KeyCapability::Exchange) {
        return Err(Error::MissingKey);
    }
    let local_secret = local.secret().ok_or(Error::MissingKey)?;
    let remote_public = remote.public().ok_or(Error::MissingKey)?;
    let secret = x25519_dalek::StaticSecret::from(key_array(local_secret)?);
    let local_public = match local.public() {
        Some(public) => public.to_vec(),
        None => x25519_dalek::PublicKey::from(&secret).as_bytes().to_vec(),
    };
    let remote_key = x25519_dalek::PublicKey::from(key_array(remote_public)?);
    let dh = secret.diffie_hellman(&remote_key);
    // both sides must derive the same key, so order the publics
    // deterministically instead of by role
    let (first, second) = if local_public.as_slice() <= remote_public {
        (local_public.as_slice(), remote_public)
    } else {
        (remote_public, local_public.as_slice())
    };
    let mut message = Vec::with_capacity(first.len() + second.len());
    message.extend_from_slice(first);
    message.extend_from_slice(second);
    Ok(Zeroizing::new(keyed_blake2b_256(dh.as_bytes(), &message)?))
}

fn xchacha_encrypt(data: &[u8], key: &[u8], rng: &mut dyn RngCore) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|_| Error::Crypto("bad encryption key length".to_string()))?;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, data)
        .map_err(|_| Error::Crypto("encryption failed".to_string()))?;
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn xchacha_decrypt(data: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    if data.len() < NONCE_LEN {
        return Err(Error::Crypto("ciphertext too short".to_string()));
    }
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|_| Error::Crypto("bad encryption key length".to_string()))?;
    let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
    cipher
        .decrypt(XNonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| Error::Crypto("decryption failed".to_string()))
}

fn identifier(public_key: &[u8]) -> String {
    ser::hex_encode(&blake2b_256(public_key)[..KEY_IDENTIFIER_LEN])
}

/// The default suite: current primitives, base58 key text.
#[derive(Debug, Default)]
pub struct StandardSuite;

impl CryptoSuite for StandardSuite {
    fn name(&self) -> &'static str {
        crate::crypto::STANDARD_SUITE
    }

    fn key_identifier(&self, public_key: &[u8]) -> Result<String> {
        Ok(identifier(public_key))
    }

    fn sign(&self, data: &[u8], secret_key: &[u8]) -> Result<Vec<u8>> {
        ed25519_sign(data, secret_key)
    }

    fn verify(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool> {
        ed25519_verify(data, signature, public_key)
    }

    fn generate_key(&self, capabilities: &[KeyCapability], rng: &mut dyn RngCore) -> Result<RawKeyPair> {
        generate_raw(capabilities, rng)
    }

    fn generate_shared_secret(
        &self,
        local: &RawKeyPair,
        remote: &RawKeyPair,
        _capabilities: &[KeyCapability],
    ) -> Result<Zeroizing<Vec<u8>>> {
        shared_secret(local, remote)
    }

    fn encrypt(&self, data: &[u8], key: &[u8], rng: &mut dyn RngCore) -> Result<Vec<u8>> {
        xchacha_encrypt(data, key, rng)
    }

    fn decrypt(&self, data: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        xchacha_decrypt(data, key)
    }

    fn hash(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(blake2b_256(data))
    }

    fn encode_key(&self, raw: &[u8]) -> String {
        ser::base58_encode(raw)
    }

    fn decode_key(&self, text: &str) -> Result<Vec<u8>> {
        ser::base58_decode(text)
    }
}

/// The legacy suite: same primitives, base64 key text, and support for the
/// old headered raw-key framing used by legacy-mode items.
#[derive(Debug, Default)]
pub struct LegacySuite;

impl CryptoSuite for LegacySuite {
    fn name(&self) -> &'static str {
        crate::crypto::LEGACY_SUITE
    }

    fn key_identifier(&self, public_key: &[u8]) -> Result<String> {
        Ok(identifier(public_key))
    }

    fn sign(&self, data: &[u8], secret_key: &[u8]) -> Result<Vec<u8>> {
        ed25519_sign(data, secret_key)
    }

    fn verify(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool> {
        ed25519_verify(data, signature, public_key)
    }

    fn generate_key(&self, capabilities: &[KeyCapability], rng: &mut dyn RngCore) -> Result<RawKeyPair> {
        generate_raw(capabilities, rng)
    }

    fn generate_shared_secret(
        &self,
        local: &RawKeyPair,
        remote: &RawKeyPair,
        _capabilities: &[KeyCapability],
    ) -> Result<Zeroizing<Vec<u8>>> {
        shared_secret(local, remote)
    }

    fn encrypt(&self, data: &[u8], key: &[u8], rng: &mut dyn RngCore) -> Result<Vec<u8>> {
        xchacha_encrypt(data, key, rng)
    }

    fn decrypt(&self, data: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        xchacha_decrypt(data, key)
    }

    fn hash(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(blake2b_256(data))
    }

    fn encode_key(&self, raw: &[u8]) -> String {
        ser::base64_encode(raw)
    }

    fn decode_key(&self, text: &str) -> Result<Vec<u8>> {
        ser::base64_decode(text)
    }
}

fn legacy_class_byte(capability: KeyCapability) -> u8 {
    match capability {
        KeyCapability::Sign => 0x10,
        KeyCapability::Exchange => 0x20,
        KeyCapability::Encrypt => 0x40,
    }
}

fn legacy_capability_byte(capability: KeyCapability) -> u8 {
    match capability {
        KeyCapability::Sign => 0x01,
        KeyCapability::Exchange => 0x02,
        KeyCapability::Encrypt => 0x03,
    }
}

/// Encode raw key bytes in the legacy framing: a fixed 6-byte header
/// (version, class, capability, variant, two reserved zero bytes) prepended
/// to the raw bytes, base58-encoded, no suite prefix.
pub(crate) fn encode_legacy_key(raw: &[u8], capability: KeyCapability, secret_half: bool) -> String {
    let mut framed = Vec::with_capacity(LEGACY_HEADER_LEN + raw.len());
    framed.push(LEGACY_VERSION);
    framed.push(legacy_class_byte(capability));
    framed.push(legacy_capability_byte(capability));
    framed.push(if secret_half { 0x00 } else { 0x01 });
    framed.push(0x00);
    framed.push(0x00);
    framed.extend_from_slice(raw);
    ser::base58_encode(&framed)
}

/// Decode the legacy key framing back into raw bytes, the capability, and
/// whether the material is the secret half.
pub(crate) fn decode_legacy_key(text: &str) -> Result<(Vec<u8>, KeyCapability, bool)> {
    let framed = ser::base58_decode(text)?;
    if framed.len() <= LEGACY_HEADER_LEN {
        return Err(Error::InvalidFormat("legacy key too short".to_string()));
    }
    if framed[0] != LEGACY_VERSION {
        return Err(Error::InvalidFormat(format!("unknown legacy key version {}", framed[0])));
    }
    let capability = match framed[1] {
        0x10 => KeyCapability::Sign,
        0x20 => KeyCapability::Exchange,
        0x40 => KeyCapability::Encrypt,
        other => return Err(Error::InvalidFormat(format!("unknown legacy key class {:#04x}", other))),
    };
    let secret_half = match framed[3] {
        0x00 => true,
        0x01 => false,
        other => return Err(Error::InvalidFormat(format!("unknown legacy key variant {:#04x}", other))),
    };
    Ok((framed[LEGACY_HEADER_LEN..].to_vec(), capability, secret_half))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::rng_chacha20;

    #[test]
    fn sign_and_verify() {
        let suite = StandardSuite;
        let mut rng = rng_chacha20();
        let pair = suite.generate_key(&[KeyCapability::Sign], &mut rng).unwrap();
        let sig = suite.sign(b"hi friend", pair.secret().unwrap()).unwrap();
        assert_eq!(sig.len(), SIGNATURE_LEN);
        assert!(suite.verify(b"hi friend", &sig, pair.public().unwrap()).unwrap());
        assert!(!suite.verify(b"hi fiend", &sig, pair.public().unwrap()).unwrap());
    }

    #[test]
    fn signing_is_deterministic() {
        let suite = StandardSuite;
        let mut rng = rng_chacha20();
        let pair = suite.generate_key(&[KeyCapability::Sign], &mut rng).unwrap();
        let sig1 = suite.sign(b"same bytes", pair.secret().unwrap()).unwrap();
        let sig2 = suite.sign(b"same bytes", pair.secret().unwrap()).unwrap();
        assert_eq!(sig1, sig2);
    }

    #[test]
    fn generate_key_takes_one_capability() {
        let suite = StandardSuite;
        let mut rng = rng_chacha20();
        assert!(suite.generate_key(&[], &mut rng).is_err());
        assert!(suite
            .generate_key(&[KeyCapability::Sign, KeyCapability::Encrypt], &mut rng)
            .is_err());
        let pair = suite.generate_key(&[KeyCapability::Encrypt], &mut rng).unwrap();
        assert!(pair.secret().is_some());
        assert!(pair.public().is_none());
    }

    #[test]
    fn shared_secret_is_symmetric() {
        let suite = StandardSuite;
        let mut rng = rng_chacha20();
        let alice = suite.generate_key(&[KeyCapability::Exchange], &mut rng).unwrap();
        let bob = suite.generate_key(&[KeyCapability::Exchange], &mut rng).unwrap();
        let k1 = suite
            .generate_shared_secret(&alice, &bob.public_only(), &[KeyCapability::Encrypt])
            .unwrap();
        let k2 = suite
            .generate_shared_secret(&bob, &alice.public_only(), &[KeyCapability::Encrypt])
            .unwrap();
        assert_eq!(k1.as_slice(), k2.as_slice());
        assert_eq!(k1.len(), KEY_LEN);
    }

    #[test]
    fn shared_secret_requires_halves() {
        let suite = StandardSuite;
        let mut rng = rng_chacha20();
        let alice = suite.generate_key(&[KeyCapability::Exchange], &mut rng).unwrap();
        let bob = suite.generate_key(&[KeyCapability::Exchange], &mut rng).unwrap();
        assert!(suite
            .generate_shared_secret(&alice.public_only(), &bob.public_only(), &[])
            .is_err());
        let sign = suite.generate_key(&[KeyCapability::Sign], &mut rng).unwrap();
        assert!(suite.generate_shared_secret(&sign, &bob, &[]).is_err());
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let suite = StandardSuite;
        let mut rng = rng_chacha20();
        let key = suite.generate_key(&[KeyCapability::Encrypt], &mut rng).unwrap();
        let sealed = suite.encrypt(b"secret message", key.secret().unwrap(), &mut rng).unwrap();
        assert_ne!(&sealed[NONCE_LEN..], b"secret message".as_slice());
        let opened = suite.decrypt(&sealed, key.secret().unwrap()).unwrap();
        assert_eq!(opened, b"secret message");
        // tampering fails the auth tag
        let mut tampered = sealed.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 1;
        assert!(suite.decrypt(&tampered, key.secret().unwrap()).is_err());
    }

    #[test]
    fn key_identifier_is_stable() {
        let suite = StandardSuite;
        let mut rng = rng_chacha20();
        let pair = suite.generate_key(&[KeyCapability::Sign], &mut rng).unwrap();
        let id1 = suite.key_identifier(pair.public().unwrap()).unwrap();
        let id2 = suite.key_identifier(pair.public().unwrap()).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(id1.len(), KEY_IDENTIFIER_LEN * 2);
        let other = suite.generate_key(&[KeyCapability::Sign], &mut rng).unwrap();
        assert_ne!(id1, suite.key_identifier(other.public().unwrap()).unwrap());
    }

    #[test]
    fn key_text_codecs_differ() {
        let raw = [7u8; KEY_LEN];
        let stn = StandardSuite.encode_key(&raw);
        let dsc = LegacySuite.encode_key(&raw);
        assert_ne!(stn, dsc);
        assert_eq!(StandardSuite.decode_key(&stn).unwrap(), raw);
        assert_eq!(LegacySuite.decode_key(&dsc).unwrap(), raw);
    }

    #[test]
    fn legacy_key_framing_round_trip() {
        let raw = [42u8; KEY_LEN];
        let text = encode_legacy_key(&raw, KeyCapability::Sign, true);
        let (back, capability, secret) = decode_legacy_key(&text).unwrap();
        assert_eq!(back, raw);
        assert_eq!(capability, KeyCapability::Sign);
        assert!(secret);
        let text = encode_legacy_key(&raw, KeyCapability::Exchange, false);
        let (_, capability, secret) = decode_legacy_key(&text).unwrap();
        assert_eq!(capability, KeyCapability::Exchange);
        assert!(!secret);
        assert!(decode_legacy_key("zzz").is_err());
    }
}
