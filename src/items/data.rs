//! The Data item: an arbitrary payload wrapped in the signable envelope
//! machinery. The payload travels as its own positional component, base64
//! encoded, after the claims.

use crate::{
    claim::Claim,
    error::{Error, Result},
    item::{Item, ItemState},
    util::ser,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    state: ItemState,
    // the payload component exactly as it appears on the wire
    payload: Option<String>,
}

impl Item for Data {
    const TAG: &'static str = "DAT";
    const MIN_COMPONENTS: usize = 3;
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
            .ok_or_else(|| Error::InvalidFormat("data item is missing its payload".to_string()))?;
        Ok(Self {
            state,
            payload: Some(payload),
        })
    }

    fn settable_claims() -> &'static [Claim] {
        &[Claim::Aud, Claim::Ctx, Claim::Exp, Claim::Iss, Claim::Mim]
    }

    fn extra_components(&self) -> Result<Vec<String>> {
        let payload = self
            .payload
            .clone()
            .ok_or_else(|| Error::InvalidFormat("data item has no payload".to_string()))?;
        Ok(vec![payload])
    }
}

impl Data {
    pub fn new() -> Self {
        Self {
            state: ItemState::new_stamped(),
            payload: None,
        }
    }

    /// Attach the payload. Fails once signed.
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

    /// The MIME type of the payload, if declared.
    pub fn mime_type(&self) -> Result<Option<String>> {
        self.get_claim(Claim::Mim)
    }
}

impl Default for Data {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::KeyCapability;
    use crate::integrity::IntegrityState;
    use crate::items::Key;
    use crate::util::test;

    #[test]
    fn payload_round_trip() {
        let _guard = test::lock_globals();
        let mut data = Data::new();
        assert!(data.payload().unwrap().is_none());
        data.set_payload(b"Racecar is racecar backwards.").unwrap();
        data.put_claim(Claim::Mim, Some("text/plain".to_string())).unwrap();
        assert_eq!(data.payload().unwrap().unwrap(), b"Racecar is racecar backwards.");
        assert_eq!(data.mime_type().unwrap().as_deref(), Some("text/plain"));
    }

    #[test]
    fn encoding_requires_payload() {
        let _guard = test::lock_globals();
        let data = Data::new();
        assert!(matches!(data.encode(false), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn signed_export_import_round_trip() {
        let _guard = test::lock_globals();
        let key = Key::generate(&[KeyCapability::Sign]).unwrap();
        let mut data = Data::new();
        data.set_payload(b"payload bytes").unwrap();
        data.put_claim(Claim::Ctx, Some("test-data".to_string())).unwrap();
        data.sign(&key).unwrap();
        let exported = data.export().unwrap();
        let back = Data::import(&exported).unwrap();
        assert_eq!(back, data);
        assert_eq!(back.payload().unwrap().unwrap(), b"payload bytes");
        assert_eq!(back.verify_with_key(&key), IntegrityState::Complete);
        // signed re-export is byte-identical
        assert_eq!(back.export().unwrap(), exported);
    }

    #[test]
    fn payload_is_immutable_once_signed() {
        let _guard = test::lock_globals();
        let key = Key::generate(&[KeyCapability::Sign]).unwrap();
        let mut data = Data::new();
        data.set_payload(b"original").unwrap();
        data.sign(&key).unwrap();
        assert!(matches!(data.set_payload(b"changed"), Err(Error::ItemSigned)));
    }

    #[test]
    fn wrong_component_count_rejected() {
        let _guard = test::lock_globals();
        assert!(matches!(Data::decode("DAT.e30"), Err(Error::InvalidFormat(_))));
        assert!(matches!(Data::decode("KEY.e30.cGF5bG9hZA"), Err(Error::InvalidFormat(_))));
    }
}
