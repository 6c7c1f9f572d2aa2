//! The Key item: a container for cryptographic key material. The secret and
//! public halves travel as suite-prefixed text claims; legacy-mode keys use
//! the old headered framing with no suite prefix.

use crate::{
    capability::KeyCapability,
    claim::Claim,
    crypto::{self, RawKeyPair},
    error::{Error, Result},
    item::{Item, ItemState},
};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

/// A key item. The `uid`, `iat`, `cap`, `pub`, and `key` claims are computed
/// at generation; only context, expiration, and issuer are caller-settable.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    state: ItemState,
}

impl Item for Key {
    const TAG: &'static str = "KEY";
    const MIN_COMPONENTS: usize = 2;

    fn state(&self) -> &ItemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ItemState {
        &mut self.state
    }

    fn from_parts(state: ItemState, _extra: Vec<String>) -> Result<Self> {
        let mut key = Self { state };
        // unsigned legacy keys are recognized by their suite-less key text
        if !key.state.legacy {
            if let Some(text) = key.any_key_text()? {
                if !text.contains('.') {
                    key.state.legacy = true;
                }
            }
        }
        Ok(key)
    }

    fn settable_claims() -> &'static [Claim] {
        &[Claim::Ctx, Claim::Exp, Claim::Iss]
    }

    /// Switching dialects re-encodes the key material itself: legacy keys
    /// carry their capability in a binary header instead of a `cap` claim.
    fn set_legacy(&mut self, legacy: bool) -> Result<()> {
        if self.state.signed {
            return Err(Error::ItemSigned);
        }
        if self.state.legacy == legacy {
            return Ok(());
        }
        let capability = *self
            .capabilities()?
            .first()
            .ok_or_else(|| Error::InvalidClaim("key has no capability".to_string()))?;
        let secret = self.secret_bytes()?;
        let public = self.public_bytes()?;
        let state = &mut self.state;
        if legacy {
            if let Some(secret) = secret.as_ref() {
                state.put_internal(Claim::Key, Some(crypto::encode_legacy_key(secret, capability, true)));
            }
            if let Some(public) = public.as_ref() {
                state.put_internal(Claim::Pub, Some(crypto::encode_legacy_key(public, capability, false)));
            }
            state.remove_internal(Claim::Cap);
        } else {
            let suite = crypto::default_suite();
            if let Some(secret) = secret.as_ref() {
                state.put_internal(Claim::Key, Some(format!("{}.{}", suite.name(), suite.encode_key(secret))));
            }
            if let Some(public) = public.as_ref() {
                state.put_internal(Claim::Pub, Some(format!("{}.{}", suite.name(), suite.encode_key(public))));
            }
            state.put_internal(Claim::Cap, Some(vec![capability]));
        }
        state.legacy = legacy;
        state.cached_unsigned = None;
        Ok(())
    }
}

impl Key {
    /// Generate a new key with the default suite and an OS-seeded RNG.
    pub fn generate(capabilities: &[KeyCapability]) -> Result<Self> {
        Self::generate_with_rng(&mut crypto::rng_chacha20(), capabilities)
    }

    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R, capabilities: &[KeyCapability]) -> Result<Self> {
        Self::generate_full(rng, capabilities, None, None, None)
    }

    /// Generate a new key, optionally bounded in time, tagged with a
    /// context, and produced by a named suite.
    pub fn generate_full<R: RngCore + CryptoRng>(
        rng: &mut R,
        capabilities: &[KeyCapability],
        valid_for: Option<i64>,
        context: Option<&str>,
        suite_name: Option<&str>,
    ) -> Result<Self> {
        let suite = match suite_name {
            Some(name) => crypto::suite(name)?,
            None => crypto::default_suite(),
        };
        let pair = suite.generate_key(capabilities, rng)?;
        let mut state = ItemState::new_stamped();
        state.claims.put(Claim::Cap, Some(pair.capabilities().to_vec()));
        if let Some(secret) = pair.secret() {
            state
                .claims
                .put(Claim::Key, Some(format!("{}.{}", suite.name(), suite.encode_key(secret))));
        }
        if let Some(public) = pair.public() {
            state
                .claims
                .put(Claim::Pub, Some(format!("{}.{}", suite.name(), suite.encode_key(public))));
        }
        let mut key = Self { state };
        if let Some(valid_for) = valid_for {
            let issued_at = key.issued_at()?.expect("freshly stamped key has an issued-at");
            key.state.put_internal(Claim::Exp, Some(issued_at.add_seconds(valid_for)));
        }
        if let Some(context) = context {
            key.put_claim(Claim::Ctx, Some(context.to_string()))?;
        }
        Ok(key)
    }

    /// Build a transient verification key from a public key text claim (an
    /// identity's or request's `pub` claim).
    pub(crate) fn from_public_text(text: &str) -> Result<Self> {
        let mut state = ItemState::default();
        match text.split_once('.') {
            Some((suite_name, _)) => {
                crypto::suite(suite_name)?;
                state.claims.put(Claim::Cap, Some(vec![KeyCapability::Sign]));
            }
            None => {
                crypto::decode_legacy_key(text)?;
                state.legacy = true;
            }
        }
        state.claims.put(Claim::Pub, Some(text.to_string()));
        Ok(Self { state })
    }

    /// The name of the suite this key's material belongs to.
    pub fn suite_name(&self) -> Result<String> {
        if self.state.legacy {
            return Ok(crypto::LEGACY_SUITE.to_string());
        }
        let text = self.any_key_text()?.ok_or(Error::MissingKey)?;
        match text.split_once('.') {
            Some((suite_name, _)) => Ok(suite_name.to_string()),
            None => Ok(crypto::LEGACY_SUITE.to_string()),
        }
    }

    /// The key's capabilities, from the `cap` claim or the legacy header.
    pub fn capabilities(&self) -> Result<Vec<KeyCapability>> {
        if let Some(capabilities) = self.get_claim::<Vec<KeyCapability>>(Claim::Cap)? {
            return Ok(capabilities);
        }
        let text = self.any_key_text()?.ok_or(Error::MissingKey)?;
        if !text.contains('.') {
            let (_, capability, _) = crypto::decode_legacy_key(&text)?;
            return Ok(vec![capability]);
        }
        Err(Error::InvalidClaim("key has no capability claim".to_string()))
    }

    pub fn has_capability(&self, capability: KeyCapability) -> bool {
        self.capabilities().map(|caps| caps.contains(&capability)).unwrap_or(false)
    }

    /// Raw secret key bytes, if the secret half is present.
    pub fn secret_bytes(&self) -> Result<Option<Zeroizing<Vec<u8>>>> {
        match self.get_claim::<String>(Claim::Key)? {
            Some(text) => Ok(Some(Zeroizing::new(Self::decode_key_text(&text)?))),
            None => Ok(None),
        }
    }

    /// Raw public key bytes, if the public half is present.
    pub fn public_bytes(&self) -> Result<Option<Vec<u8>>> {
        match self.get_claim::<String>(Claim::Pub)? {
            Some(text) => Ok(Some(Self::decode_key_text(&text)?)),
            None => Ok(None),
        }
    }

    /// The suite-derived identifier of this key's public half.
    pub fn key_identifier(&self) -> Result<String> {
        let public = self.public_bytes()?.ok_or(Error::MissingKey)?;
        crypto::suite(&self.suite_name()?)?.key_identifier(&public)
    }

    /// A copy of this key with the secret half and any signatures removed.
    pub fn public_only(&self) -> Result<Self> {
        let mut copy = self.clone();
        copy.strip();
        copy.state.remove_internal(Claim::Key);
        Ok(copy)
    }

    /// The raw material of this key as a suite key pair.
    pub(crate) fn raw_key_pair(&self) -> Result<RawKeyPair> {
        Ok(RawKeyPair::new(
            self.capabilities()?,
            self.secret_bytes()?.map(|secret| secret.to_vec()),
            self.public_bytes()?,
        ))
    }

    fn any_key_text(&self) -> Result<Option<String>> {
        if let Some(text) = self.get_claim::<String>(Claim::Pub)? {
            return Ok(Some(text));
        }
        self.get_claim::<String>(Claim::Key)
    }

    fn decode_key_text(text: &str) -> Result<Vec<u8>> {
        match text.split_once('.') {
            Some((suite_name, body)) => crypto::suite(suite_name)?.decode_key(body),
            None => crypto::decode_legacy_key(text).map(|(raw, _, _)| raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test;
    use uuid::Uuid;

    #[test]
    fn generate_stamps_computed_claims() {
        let _guard = test::lock_globals();
        let key = Key::generate(&[KeyCapability::Sign]).unwrap();
        assert!(key.unique_id().unwrap().is_some());
        assert!(key.issued_at().unwrap().is_some());
        assert_eq!(key.capabilities().unwrap(), vec![KeyCapability::Sign]);
        assert!(key.secret_bytes().unwrap().is_some());
        assert!(key.public_bytes().unwrap().is_some());
        assert_eq!(key.suite_name().unwrap(), crypto::STANDARD_SUITE);
        let text: String = key.get_claim(Claim::Pub).unwrap().unwrap();
        assert!(text.starts_with("STN."));
    }

    #[test]
    fn generate_full_options() {
        let _guard = test::lock_globals();
        let mut rng = test::rng();
        let key = Key::generate_full(
            &mut rng,
            &[KeyCapability::Exchange],
            Some(3600),
            Some("exchange-key"),
            Some(crypto::LEGACY_SUITE),
        )
        .unwrap();
        assert_eq!(key.suite_name().unwrap(), crypto::LEGACY_SUITE);
        assert_eq!(key.context().unwrap().as_deref(), Some("exchange-key"));
        let issued = key.issued_at().unwrap().unwrap();
        assert_eq!(key.expires_at().unwrap().unwrap(), issued.add_seconds(3600));
    }

    #[test]
    fn deterministic_rng_reproduces_material() {
        let _guard = test::lock_globals();
        let a = Key::generate_with_rng(&mut test::rng(), &[KeyCapability::Sign]).unwrap();
        let b = Key::generate_with_rng(&mut test::rng(), &[KeyCapability::Sign]).unwrap();
        assert_eq!(
            a.secret_bytes().unwrap().unwrap().as_slice(),
            b.secret_bytes().unwrap().unwrap().as_slice()
        );
        assert_eq!(a.public_bytes().unwrap(), b.public_bytes().unwrap());
    }

    #[test]
    fn export_import_round_trip() {
        let _guard = test::lock_globals();
        let key = Key::generate(&[KeyCapability::Sign]).unwrap();
        let exported = key.export().unwrap();
        let back = Key::import(&exported).unwrap();
        assert_eq!(back, key);
        assert_eq!(
            back.secret_bytes().unwrap().unwrap().as_slice(),
            key.secret_bytes().unwrap().unwrap().as_slice()
        );
        // unsigned export is byte-stable
        assert_eq!(key.export().unwrap(), exported);
    }

    #[test]
    fn public_only_drops_the_secret() {
        let _guard = test::lock_globals();
        let key = Key::generate(&[KeyCapability::Sign]).unwrap();
        let public = key.public_only().unwrap();
        assert!(public.secret_bytes().unwrap().is_none());
        assert_eq!(public.public_bytes().unwrap(), key.public_bytes().unwrap());
        assert_eq!(public.key_identifier().unwrap(), key.key_identifier().unwrap());
    }

    #[test]
    fn legacy_conversion_round_trip() {
        let _guard = test::lock_globals();
        let mut key = Key::generate(&[KeyCapability::Sign]).unwrap();
        let secret = key.secret_bytes().unwrap().unwrap().to_vec();
        let public = key.public_bytes().unwrap().unwrap();

        key.set_legacy(true).unwrap();
        assert!(key.is_legacy());
        assert_eq!(key.suite_name().unwrap(), crypto::LEGACY_SUITE);
        let text: String = key.get_claim(Claim::Key).unwrap().unwrap();
        assert!(!text.contains('.'));
        assert!(!key.claims().contains(Claim::Cap));
        // raw material survives the re-framing
        assert_eq!(key.secret_bytes().unwrap().unwrap().as_slice(), secret.as_slice());
        assert_eq!(key.public_bytes().unwrap().unwrap(), public);
        assert_eq!(key.capabilities().unwrap(), vec![KeyCapability::Sign]);

        key.set_legacy(false).unwrap();
        assert!(!key.is_legacy());
        assert_eq!(key.secret_bytes().unwrap().unwrap().as_slice(), secret.as_slice());
        assert_eq!(key.capabilities().unwrap(), vec![KeyCapability::Sign]);
    }

    #[test]
    fn legacy_key_import_detected_by_text_shape() {
        let _guard = test::lock_globals();
        let mut key = Key::generate(&[KeyCapability::Sign]).unwrap();
        key.set_legacy(true).unwrap();
        let exported = key.export().unwrap();
        let back = Key::import(&exported).unwrap();
        assert!(back.is_legacy());
        assert_eq!(
            back.secret_bytes().unwrap().unwrap().as_slice(),
            key.secret_bytes().unwrap().unwrap().as_slice()
        );
    }

    #[test]
    fn settable_claims_enforced() {
        let _guard = test::lock_globals();
        let mut key = Key::generate(&[KeyCapability::Sign]).unwrap();
        key.put_claim(Claim::Iss, Some(Uuid::new_v4())).unwrap();
        assert!(matches!(
            key.put_claim(Claim::Pub, Some("STN.forged".to_string())),
            Err(Error::InvalidClaim(_))
        ));
    }
}
