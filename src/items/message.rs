//! The Message item: a payload-carrying item addressed to an audience. It
//! extends Data with one extra maturity requirement, that a message must be
//! signed before it can be exported, and supports sealing its payload to a
//! recipient with an exchange-key shared secret.

use crate::{
    capability::KeyCapability,
    claim::Claim,
    crypto,
    error::{Error, Result},
    item::{Item, ItemState},
    items::Key,
    util::ser,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    state: ItemState,
    payload: Option<String>,
}

impl Item for Message {
    const TAG: &'static str = "MSG";
    // a message is only ever exported signed, so the signature block counts
    // toward the minimum
    const MIN_COMPONENTS: usize = 4;
    const EXTRA_COMPONENTS: usize = 1;

    fn state(&self) -> &ItemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ItemState {
        &mut self.state
    }

    fn from_parts(state: ItemState, extra: Vec<String>) -> Result<Self> {
        let payload = extra
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidFormat("message is missing its payload".to_string()))?;
        Ok(Self {
            state,
            payload: Some(payload),
        })
    }

    fn settable_claims() -> &'static [Claim] {
        &[Claim::Aud, Claim::Ctx, Claim::Exp, Claim::Iss, Claim::Kid, Claim::Mim]
    }

    fn extra_components(&self) -> Result<Vec<String>> {
        let payload = self
            .payload
            .clone()
            .ok_or_else(|| Error::InvalidFormat("message has no payload".to_string()))?;
        Ok(vec![payload])
    }

    fn check_exportable(&self) -> Result<()> {
        if !self.state.signed {
            return Err(Error::ItemNotSigned);
        }
        Ok(())
    }
}

impl Message {
    pub fn new() -> Self {
        Self {
            state: ItemState::new_stamped(),
            payload: None,
        }
    }

    /// A message addressed to a receiver, expiring after `valid_for`
    /// seconds.
    pub fn new_addressed(audience: Uuid, valid_for: Option<i64>) -> Self {
        let mut message = Self::new();
        message.state.put_internal(Claim::Aud, Some(audience));
        if let Some(valid_for) = valid_for {
            let issued_at = message
                .issued_at()
                .ok()
                .flatten()
                .expect("freshly stamped message has an issued-at");
            message.state.put_internal(Claim::Exp, Some(issued_at.add_seconds(valid_for)));
        }
        message
    }

    /// The intended receiver.
    pub fn audience(&self) -> Result<Option<Uuid>> {
        self.get_claim(Claim::Aud)
    }

    /// The unique id of the key item the sender signed with, if declared.
    pub fn key_id(&self) -> Result<Option<Uuid>> {
        self.get_claim(Claim::Kid)
    }

    pub fn mime_type(&self) -> Result<Option<String>> {
        self.get_claim(Claim::Mim)
    }

    /// Attach a plaintext payload. Fails once signed.
    pub fn set_payload(&mut self, payload: &[u8]) -> Result<()> {
        if self.state.signed {
            return Err(Error::ItemSigned);
        }
        self.payload = Some(ser::base64_encode(payload));
        self.state.cached_unsigned = None;
        Ok(())
    }

    pub fn payload(&self) -> Result<Option<Vec<u8>>> {
        self.payload.as_deref().map(ser::base64_decode).transpose()
    }

    /// Attach a payload encrypted to the remote party: a shared secret is
    /// derived from the local exchange key (secret half) and the remote
    /// exchange key (public half), and the payload sealed with it.
    pub fn seal_payload(&mut self, payload: &[u8], local: &Key, remote: &Key) -> Result<()> {
        if self.state.signed {
            return Err(Error::ItemSigned);
        }
        let suite = crypto::suite(&local.suite_name()?)?;
        let shared = suite.generate_shared_secret(
            &local.raw_key_pair()?,
            &remote.raw_key_pair()?,
            &[KeyCapability::Encrypt],
        )?;
        let sealed = suite.encrypt(payload, &shared, &mut crypto::rng_chacha20())?;
        self.payload = Some(ser::base64_encode(sealed));
        self.state.cached_unsigned = None;
        Ok(())
    }

    /// Decrypt a sealed payload from the other side of the exchange.
    pub fn open_payload(&self, local: &Key, remote: &Key) -> Result<Vec<u8>> {
        let sealed = self
            .payload()?
            .ok_or_else(|| Error::InvalidFormat("message has no payload".to_string()))?;
        let suite = crypto::suite(&local.suite_name()?)?;
        let shared = suite.generate_shared_secret(
            &local.raw_key_pair()?,
            &remote.raw_key_pair()?,
            &[KeyCapability::Encrypt],
        )?;
        suite.decrypt(&sealed, &shared)
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::IntegrityState;
    use crate::util::test;

    #[test]
    fn export_requires_signature() {
        let _guard = test::lock_globals();
        let mut message = Message::new();
        message.set_payload(b"hello there").unwrap();
        assert!(matches!(message.export(), Err(Error::ItemNotSigned)));
        let key = Key::generate(&[KeyCapability::Sign]).unwrap();
        message.sign(&key).unwrap();
        let exported = message.export().unwrap();
        let back = Message::import(&exported).unwrap();
        assert_eq!(back, message);
        assert_eq!(back.verify_with_key(&key), IntegrityState::Complete);
    }

    #[test]
    fn unsigned_message_text_is_rejected() {
        let _guard = test::lock_globals();
        let mut message = Message::new();
        message.set_payload(b"hello").unwrap();
        // three components (no signature block) is below the message minimum
        let unsigned = message.encode(false).unwrap();
        assert!(matches!(Message::decode(&unsigned), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn addressed_message_claims() {
        let _guard = test::lock_globals();
        let audience = Uuid::new_v4();
        let message = Message::new_addressed(audience, Some(120));
        assert_eq!(message.audience().unwrap(), Some(audience));
        let issued = message.issued_at().unwrap().unwrap();
        assert_eq!(message.expires_at().unwrap().unwrap(), issued.add_seconds(120));
    }

    #[test]
    fn seal_and_open_payload() {
        let _guard = test::lock_globals();
        let alice = Key::generate(&[KeyCapability::Exchange]).unwrap();
        let bob = Key::generate(&[KeyCapability::Exchange]).unwrap();
        let sign_key = Key::generate(&[KeyCapability::Sign]).unwrap();

        let mut message = Message::new_addressed(Uuid::new_v4(), None);
        message
            .seal_payload(b"attack at dawn", &alice, &bob.public_only().unwrap())
            .unwrap();
        message.sign(&sign_key).unwrap();

        // the wire payload is not the plaintext
        assert_ne!(message.payload().unwrap().unwrap(), b"attack at dawn");
        // bob opens with his secret half and alice's public half
        let opened = message.open_payload(&bob, &alice.public_only().unwrap()).unwrap();
        assert_eq!(opened, b"attack at dawn");

        // an outsider with the wrong exchange key cannot open it
        let eve = Key::generate(&[KeyCapability::Exchange]).unwrap();
        assert!(message.open_payload(&eve, &alice.public_only().unwrap()).is_err());
    }
}
