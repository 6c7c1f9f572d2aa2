//! The crypto module holds the suite abstraction and the process-wide suite
//! registry. Suites are registered once, looked up by name during item
//! encode/decode/sign/verify, and one suite is marked as the default for
//! generation calls that don't name one.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use rand::{rngs::OsRng, RngCore, SeedableRng};
use std::sync::{Arc, RwLock};

mod standard;
pub mod suite;

pub use standard::{LegacySuite, StandardSuite};
pub(crate) use standard::{decode_legacy_key, encode_legacy_key};
pub use suite::{CryptoSuite, RawKeyPair};

/// Name of the default suite (current primitives, base58 key text).
pub const STANDARD_SUITE: &str = "STN";
/// Name of the legacy suite (base64 key text, headered legacy raw keys).
pub const LEGACY_SUITE: &str = "DSC";

/// A convenience function that returns a ChaCha20 CSRNG seeded with OS random
/// bytes. Use this if you want a nice, strong random number generator, you
/// don't want to wire one up yourself, and your platform provides good
/// entropy.
pub fn rng_chacha20() -> rand_chacha::ChaCha20Rng {
    let mut seed_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut seed_bytes);
    rand_chacha::ChaCha20Rng::from_seed(seed_bytes)
}

struct Registry {
    // registration order is meaningless, but a vec keeps lookups simple and
    // the set is tiny
    suites: Vec<Arc<dyn CryptoSuite>>,
    default_name: String,
}

impl Registry {
    fn seeded() -> Self {
        Self {
            suites: vec![Arc::new(StandardSuite), Arc::new(LegacySuite)],
            default_name: STANDARD_SUITE.to_string(),
        }
    }

    fn find(&self, name: &str) -> Option<Arc<dyn CryptoSuite>> {
        self.suites.iter().find(|s| s.name() == name).cloned()
    }
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::seeded()));

/// Register an additional suite. Fails if a suite with the same name already
/// exists.
pub fn register_suite(suite: Arc<dyn CryptoSuite>) -> Result<()> {
    let mut registry = REGISTRY.write().expect("dime_core::crypto::register_suite() -- registry lock poisoned");
    if registry.find(suite.name()).is_some() {
        return Err(Error::DuplicateCryptoSuite(suite.name().to_string()));
    }
    tracing::debug!(suite = suite.name(), "crypto suite registered");
    registry.suites.push(suite);
    Ok(())
}

/// Look up a suite by name.
pub fn suite(name: &str) -> Result<Arc<dyn CryptoSuite>> {
    REGISTRY
        .read()
        .expect("dime_core::crypto::suite() -- registry lock poisoned")
        .find(name)
        .ok_or_else(|| Error::UnknownCryptoSuite(name.to_string()))
}

/// The suite used when no suite is named explicitly.
pub fn default_suite() -> Arc<dyn CryptoSuite> {
    let registry = REGISTRY.read().expect("dime_core::crypto::default_suite() -- registry lock poisoned");
    registry
        .find(&registry.default_name)
        .expect("dime_core::crypto::default_suite() -- default suite missing from registry")
}

/// The name of the default suite.
pub fn default_suite_name() -> String {
    REGISTRY
        .read()
        .expect("dime_core::crypto::default_suite_name() -- registry lock poisoned")
        .default_name
        .clone()
}

/// Mark a registered suite as the default.
pub fn set_default_suite(name: &str) -> Result<()> {
    let mut registry = REGISTRY.write().expect("dime_core::crypto::set_default_suite() -- registry lock poisoned");
    if registry.find(name).is_none() {
        return Err(Error::UnknownCryptoSuite(name.to_string()));
    }
    registry.default_name = name.to_string();
    Ok(())
}
