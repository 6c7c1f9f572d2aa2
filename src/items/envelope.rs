//! The Envelope item: an ordered container of items, itself an item. An
//! anonymous envelope (no issuer claims) is a plain transport wrapper and
//! needs no signature; a non-anonymous envelope asserts provenance and must
//! be signed before export.
//!
//! The envelope grammar joins sections with `:`. The sections are the
//! header (tag plus
//! optional claims), one section per item, and an optional trailing
//! signature block.

use crate::{
    claim::Claim,
    error::{Error, Result},
    item::{self, AnyItem, Item, ItemState, ENVELOPE_TAG, SECTION_DELIMITER},
    signature::Signature,
    util::ser,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    state: ItemState,
    items: Vec<AnyItem>,
}

impl Item for Envelope {
    const TAG: &'static str = ENVELOPE_TAG;
    const MIN_COMPONENTS: usize = 1;

    fn state(&self) -> &ItemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ItemState {
        &mut self.state
    }

    fn from_parts(_state: ItemState, _extra: Vec<String>) -> Result<Self> {
        Err(Error::InvalidFormat("envelopes decode through import".to_string()))
    }

    fn settable_claims() -> &'static [Claim] {
        &[Claim::Aud, Claim::Ctx]
    }

    fn check_signable(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::EmptyEnvelope);
        }
        // the legacy dialect has no anonymous signed form
        if self.state.legacy && self.is_anonymous() {
            return Err(Error::UnsupportedLegacyOperation);
        }
        Ok(())
    }

    fn check_exportable(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::EmptyEnvelope);
        }
        if !self.is_anonymous() && !self.state.signed {
            return Err(Error::ItemNotSigned);
        }
        Ok(())
    }

    /// Envelope sections join with `:` instead of `.`; the canonical
    /// unsigned form is the header followed by each item's full encoding.
    fn encode_unsigned(&self) -> Result<String> {
        if let Some(cached) = self.state.cached_unsigned.as_ref() {
            return Ok(cached.clone());
        }
        let header = if self.state.claims.is_empty() {
            Self::TAG.to_string()
        } else {
            let claims_json = self.state.claims.to_canonical_json()?;
            format!("{}.{}", Self::TAG, ser::base64_encode(claims_json.as_bytes()))
        };
        let mut sections = vec![header];
        for item in &self.items {
            sections.push(item.encode(true)?);
        }
        Ok(sections.join(&SECTION_DELIMITER.to_string()))
    }

    fn encode(&self, with_signature: bool) -> Result<String> {
        let unsigned = self.encode_unsigned()?;
        if with_signature && self.state.signed {
            Ok(format!(
                "{}{}{}",
                unsigned,
                SECTION_DELIMITER,
                Signature::encode_list(&self.state.signatures)?
            ))
        } else {
            Ok(unsigned)
        }
    }

    fn export(&self) -> Result<String> {
        self.check_exportable()?;
        self.encode(true)
    }

    fn import(encoded: &str) -> Result<Self> {
        Self::import_envelope(encoded)
    }

    fn decode(encoded: &str) -> Result<Self> {
        Self::import_envelope(encoded)
    }
}

impl Envelope {
    /// A fresh anonymous envelope.
    pub fn new() -> Self {
        Self {
            state: ItemState::default(),
            items: Vec::new(),
        }
    }

    /// A non-anonymous envelope claiming an issuer; must be signed before
    /// export.
    pub fn new_with_issuer(issuer_id: Uuid, context: Option<&str>) -> Result<Self> {
        let mut envelope = Self {
            state: ItemState::new_stamped(),
            items: Vec::new(),
        };
        envelope.state.put_internal(Claim::Iss, Some(issuer_id));
        if let Some(context) = context {
            envelope.put_claim(Claim::Ctx, Some(context.to_string()))?;
        }
        Ok(envelope)
    }

    /// Whether the envelope carries no issuer claim.
    pub fn is_anonymous(&self) -> bool {
        !self.state.claims.contains(Claim::Iss)
    }

    /// Add an item. Rejects duplicate unique ids and nested envelopes, and
    /// fails once the envelope is signed.
    pub fn add_item<T: Into<AnyItem>>(&mut self, item: T) -> Result<()> {
        if self.state.signed {
            return Err(Error::ItemSigned);
        }
        let item = item.into();
        if matches!(item, AnyItem::Envelope(_)) {
            return Err(Error::NestedEnvelope);
        }
        let unique_id = item
            .unique_id()?
            .ok_or_else(|| Error::InvalidClaim("item has no unique id".to_string()))?;
        let duplicate = self
            .items
            .iter()
            .any(|existing| existing.unique_id().ok().flatten() == Some(unique_id));
        if duplicate {
            return Err(Error::DuplicateItem(unique_id));
        }
        self.state.cached_unsigned = None;
        self.items.push(item);
        Ok(())
    }

    pub fn items(&self) -> &[AnyItem] {
        &self.items
    }

    pub fn get_item(&self, unique_id: &Uuid) -> Option<&AnyItem> {
        self.items
            .iter()
            .find(|item| item.unique_id().ok().flatten().as_ref() == Some(unique_id))
    }

    /// Parse an envelope from its section grammar. A final section that is
    /// not a parseable item is retried as the envelope's signature block.
    pub fn import_envelope(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        let sections: Vec<&str> = encoded.split(SECTION_DELIMITER).collect();
        let header = sections[0];
        let mut state = if header == Self::TAG {
            ItemState::default()
        } else {
            match header.strip_prefix(&format!("{}.", Self::TAG)) {
                Some(claims_component) => item::decode_claims_component(claims_component)?,
                None => {
                    return Err(Error::InvalidFormat(format!(
                        "expected envelope header, got {}",
                        header
                    )))
                }
            }
        };
        if sections.len() < 2 {
            return Err(Error::EmptyEnvelope);
        }
        let mut items = Vec::new();
        let mut signature_section = None;
        let last = sections.len() - 1;
        for (index, section) in sections.iter().enumerate().skip(1) {
            match AnyItem::from_encoded(section) {
                Ok(item) => items.push(item),
                Err(err) => {
                    if index == last {
                        let (signatures, legacy) = Signature::decode_list(section).map_err(|_| {
                            Error::InvalidFormat("trailing section is neither item nor signature block".to_string())
                        })?;
                        state.signatures = signatures;
                        state.signed = true;
                        state.legacy = legacy;
                        signature_section = Some(index);
                    } else {
                        return Err(err);
                    }
                }
            }
        }
        if items.is_empty() {
            return Err(Error::EmptyEnvelope);
        }
        let unsigned_end = signature_section.unwrap_or(sections.len());
        state.cached_unsigned = Some(sections[..unsigned_end].join(&SECTION_DELIMITER.to_string()));
        Ok(Self { state, items })
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::KeyCapability;
    use crate::integrity::IntegrityState;
    use crate::items::{Data, Key, Message};
    use crate::util::test;

    #[test]
    fn anonymous_envelope_round_trip() {
        let _guard = test::lock_globals();
        let key = Key::generate(&[KeyCapability::Sign]).unwrap();
        let mut data = Data::new();
        data.set_payload(b"boxed payload").unwrap();

        let mut envelope = Envelope::new();
        envelope.add_item(key.clone()).unwrap();
        envelope.add_item(data.clone()).unwrap();
        assert!(envelope.is_anonymous());

        let exported = envelope.export().unwrap();
        assert!(exported.starts_with("Di:"));
        let back = Envelope::import(&exported).unwrap();
        assert_eq!(back.items().len(), 2);
        assert_eq!(back, envelope);
        assert_eq!(back.export().unwrap(), exported);
        let uid = data.unique_id().unwrap().unwrap();
        assert!(back.get_item(&uid).is_some());
    }

    #[test]
    fn signed_envelope_round_trip() {
        let _guard = test::lock_globals();
        let sign_key = Key::generate(&[KeyCapability::Sign]).unwrap();
        let issuer_id = Uuid::new_v4();
        let mut data = Data::new();
        data.set_payload(b"signed contents").unwrap();

        let mut envelope = Envelope::new_with_issuer(issuer_id, Some("envelope-test")).unwrap();
        envelope.add_item(data).unwrap();
        // non-anonymous envelopes cannot export unsigned
        assert!(matches!(envelope.export(), Err(Error::ItemNotSigned)));
        envelope.sign(&sign_key).unwrap();

        let exported = envelope.export().unwrap();
        let back = Envelope::import(&exported).unwrap();
        assert!(!back.is_anonymous());
        assert!(back.is_signed());
        assert_eq!(back, envelope);
        assert_eq!(back.verify_with_key(&sign_key), IntegrityState::Complete);
        assert_eq!(back.get_claim::<Uuid>(Claim::Iss).unwrap(), Some(issuer_id));
        assert_eq!(back.export().unwrap(), exported);
    }

    #[test]
    fn envelope_rejects_duplicates_and_nesting() {
        let _guard = test::lock_globals();
        let key = Key::generate(&[KeyCapability::Sign]).unwrap();
        let mut envelope = Envelope::new();
        envelope.add_item(key.clone()).unwrap();
        assert!(matches!(envelope.add_item(key), Err(Error::DuplicateItem(_))));
        assert!(matches!(
            envelope.add_item(Envelope::new()),
            Err(Error::NestedEnvelope)
        ));
    }

    #[test]
    fn signing_needs_items_and_sealing_freezes() {
        let _guard = test::lock_globals();
        let sign_key = Key::generate(&[KeyCapability::Sign]).unwrap();
        let mut envelope = Envelope::new_with_issuer(Uuid::new_v4(), None).unwrap();
        assert!(matches!(envelope.sign(&sign_key), Err(Error::EmptyEnvelope)));
        let mut data = Data::new();
        data.set_payload(b"contents").unwrap();
        envelope.add_item(data).unwrap();
        envelope.sign(&sign_key).unwrap();
        let mut late = Data::new();
        late.set_payload(b"too late").unwrap();
        assert!(matches!(envelope.add_item(late), Err(Error::ItemSigned)));
    }

    #[test]
    fn legacy_envelopes_cannot_be_anonymous_when_signed() {
        let _guard = test::lock_globals();
        let sign_key = Key::generate(&[KeyCapability::Sign]).unwrap();
        let mut envelope = Envelope::new();
        let mut data = Data::new();
        data.set_payload(b"contents").unwrap();
        envelope.add_item(data).unwrap();
        envelope.set_legacy(true).unwrap();
        assert!(matches!(
            envelope.sign(&sign_key),
            Err(Error::UnsupportedLegacyOperation)
        ));
    }

    #[test]
    fn mixed_item_types_survive_the_round_trip() {
        let _guard = test::lock_globals();
        let sign_key = Key::generate(&[KeyCapability::Sign]).unwrap();
        let (_identity_key, identity) = test::self_issued_identity("envelope-system");
        let mut message = Message::new_addressed(Uuid::new_v4(), Some(600));
        message.set_payload(b"enveloped message").unwrap();
        message.sign(&sign_key).unwrap();

        let mut envelope = Envelope::new();
        envelope.add_item(identity.clone()).unwrap();
        envelope.add_item(message).unwrap();
        envelope.add_item(sign_key.public_only().unwrap()).unwrap();

        let back = Envelope::import(&envelope.export().unwrap()).unwrap();
        assert_eq!(back.items().len(), 3);
        assert!(matches!(back.items()[0], AnyItem::Identity(_)));
        assert!(matches!(back.items()[1], AnyItem::Message(_)));
        assert!(matches!(back.items()[2], AnyItem::Key(_)));
        if let AnyItem::Identity(found) = &back.items()[0] {
            assert_eq!(found.thumbprint(None).unwrap(), identity.thumbprint(None).unwrap());
        }
    }

    #[test]
    fn malformed_middle_section_is_an_error() {
        let _guard = test::lock_globals();
        let key = Key::generate(&[KeyCapability::Sign]).unwrap();
        let mut data = Data::new();
        data.set_payload(b"x").unwrap();
        let mut envelope = Envelope::new();
        envelope.add_item(key).unwrap();
        envelope.add_item(data).unwrap();
        let exported = envelope.export().unwrap();
        let sections: Vec<&str> = exported.split(':').collect();
        // corrupt the middle item section, leaving the trailing one intact
        let corrupted = format!("{}:GARBAGE*&^:{}", sections[0], sections[2]);
        assert!(Envelope::import(&corrupted).is_err());
    }
}
