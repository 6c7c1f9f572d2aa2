//! The Identity item: a subject id, a public signing key, and the grants the
//! issuer negotiated, signed by the issuer. An identity may own an embedded
//! snapshot of its issuer's identity, the trust chain, which lets it
//! verify all the way to a root without consulting the key ring.

use crate::{
    capability::IdentityCapability,
    claim::Claim,
    error::{Error, Result},
    integrity::IntegrityState,
    item::{self, Item, ItemState, COMPONENT_DELIMITER},
    items::Key,
    signature::Signature,
    util::ser,
};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    state: ItemState,
    // owned parent snapshot; strictly acyclic since each parent is embedded
    // by value at issuance time
    trust_chain: Option<Box<Identity>>,
}

impl Item for Identity {
    const TAG: &'static str = "ID";
    // identities only exist signed, so tag + claims + signature is the floor
    const MIN_COMPONENTS: usize = 3;

    fn state(&self) -> &ItemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ItemState {
        &mut self.state
    }

    fn from_parts(state: ItemState, extra: Vec<String>) -> Result<Self> {
        let trust_chain = match extra.into_iter().next() {
            Some(chain) => {
                let text = String::from_utf8(ser::base64_decode(chain)?)?;
                Some(Box::new(Identity::decode(&text)?))
            }
            None => None,
        };
        Ok(Self { state, trust_chain })
    }

    fn settable_claims() -> &'static [Claim] {
        &[Claim::Cmn, Claim::Ctx, Claim::Isu]
    }

    fn extra_components(&self) -> Result<Vec<String>> {
        match self.trust_chain.as_ref() {
            Some(parent) => Ok(vec![ser::base64_encode(parent.encode(true)?.as_bytes())]),
            None => Ok(Vec::new()),
        }
    }

    /// The trust-chain component is optional, so the component count alone
    /// decides the layout: three components is claims + signature, four is
    /// claims + chain + signature.
    fn decode(encoded: &str) -> Result<Self> {
        let components: Vec<&str> = encoded.split(COMPONENT_DELIMITER).collect();
        if components[0] != Self::TAG {
            return Err(Error::InvalidFormat(format!(
                "expected tag {}, got {}",
                Self::TAG,
                components[0]
            )));
        }
        if components.len() < Self::MIN_COMPONENTS || components.len() > 4 {
            return Err(Error::InvalidFormat(format!(
                "identity takes 3 or 4 components, got {}",
                components.len()
            )));
        }
        let unsigned_len = components.len() - 1;
        let mut state = item::decode_claims_component(components[1])?;
        state.cached_unsigned = Some(components[..unsigned_len].join(&COMPONENT_DELIMITER.to_string()));
        let (signatures, legacy) = Signature::decode_list(components[unsigned_len])?;
        state.signatures = signatures;
        state.signed = true;
        state.legacy = legacy;
        let extra = components[2..unsigned_len].iter().map(|s| s.to_string()).collect();
        Self::from_parts(state, extra)
    }

    /// Trust-chain verification: if a parent is embedded, verify the parent
    /// recursively and then this identity against the parent's public key,
    /// bypassing the key ring entirely. A self-issued identity is its own
    /// root and verifies against its own embedded public key. Everything
    /// else falls back to the generic key-ring verification.
    fn verify(&self) -> IntegrityState {
        match self.trust_chain.as_ref() {
            Some(parent) => {
                let parent_state = parent.verify();
                if !parent_state.is_valid() {
                    tracing::warn!(state = %parent_state, "trust chain parent failed verification");
                    return parent_state;
                }
                let key = match parent.public_key() {
                    Ok(key) => key,
                    Err(_) => return IntegrityState::InternalFault,
                };
                item::verify_against_key(self, &key, &[])
            }
            None if self.is_self_issued() => match self.public_key() {
                Ok(key) => item::verify_against_key(self, &key, &[]),
                Err(_) => IntegrityState::InternalFault,
            },
            None => self.verify_with_key_ring(&[]),
        }
    }
}

impl Identity {
    pub(crate) fn from_issuance(state: ItemState, trust_chain: Option<Box<Identity>>) -> Self {
        Self { state, trust_chain }
    }

    /// The name of the system this identity was issued under.
    pub fn system_name(&self) -> Result<Option<String>> {
        self.get_claim(Claim::Sys)
    }

    /// The id of the entity this identity belongs to.
    pub fn subject_id(&self) -> Result<Option<Uuid>> {
        self.get_claim(Claim::Sub)
    }

    /// The id of the entity that issued this identity.
    pub fn issuer_id(&self) -> Result<Option<Uuid>> {
        self.get_claim(Claim::Iss)
    }

    /// The identity's public signing key, as a verification-only key item.
    pub fn public_key(&self) -> Result<Key> {
        let text = self
            .get_claim::<String>(Claim::Pub)?
            .ok_or_else(|| Error::InvalidClaim("identity has no public key".to_string()))?;
        Key::from_public_text(&text)
    }

    pub fn capabilities(&self) -> Result<Vec<IdentityCapability>> {
        Ok(self.get_claim(Claim::Cap)?.unwrap_or_default())
    }

    pub fn has_capability(&self, capability: IdentityCapability) -> bool {
        self.capabilities().map(|caps| caps.contains(&capability)).unwrap_or(false)
    }

    /// The principals map: arbitrary claims about the subject, fixed at
    /// issuance.
    pub fn principals(&self) -> Result<Option<serde_json::Map<String, serde_json::Value>>> {
        self.get_claim(Claim::Pri)
    }

    pub fn ambit(&self) -> Result<Option<Vec<String>>> {
        self.get_claim(Claim::Amb)
    }

    pub fn methods(&self) -> Result<Option<Vec<String>>> {
        self.get_claim(Claim::Mtd)
    }

    pub fn common_name(&self) -> Result<Option<String>> {
        self.get_claim(Claim::Cmn)
    }

    pub fn issuer_url(&self) -> Result<Option<Url>> {
        self.get_claim(Claim::Isu)
    }

    /// The embedded issuer identity, if one was included at issuance.
    pub fn trust_chain(&self) -> Option<&Identity> {
        self.trust_chain.as_deref()
    }

    /// Whether subject and issuer are the same entity.
    pub fn is_self_issued(&self) -> bool {
        match (self.subject_id(), self.issuer_id()) {
            (Ok(Some(subject)), Ok(Some(issuer))) => subject == issuer,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test;

    #[test]
    fn accessors_read_issued_claims() {
        let _guard = test::lock_globals();
        let (_key, identity) = test::self_issued_identity("test-system");
        assert_eq!(identity.system_name().unwrap().as_deref(), Some("test-system"));
        assert!(identity.subject_id().unwrap().is_some());
        assert!(identity.is_self_issued());
        assert!(identity.has_capability(IdentityCapability::SelfIssued));
        assert!(identity.has_capability(IdentityCapability::Generic));
        assert!(identity.trust_chain().is_none());
        assert!(identity.public_key().unwrap().public_bytes().unwrap().is_some());
    }

    #[test]
    fn export_import_round_trip() {
        let _guard = test::lock_globals();
        let (key, identity) = test::self_issued_identity("round-trip");
        let exported = identity.export().unwrap();
        let back = Identity::import(&exported).unwrap();
        assert_eq!(back, identity);
        assert_eq!(back.export().unwrap(), exported);
        assert_eq!(back.verify_with_key(&key), IntegrityState::Complete);
        assert_eq!(back.thumbprint(None).unwrap(), identity.thumbprint(None).unwrap());
    }

    #[test]
    fn chained_identity_round_trips_with_parent() {
        let _guard = test::lock_globals();
        let (_root_key, _root, _node_key, node) = test::chained_identity("chain-system");
        assert!(node.trust_chain().is_some());
        let exported = node.export().unwrap();
        let back = Identity::import(&exported).unwrap();
        assert_eq!(back, node);
        assert!(back.trust_chain().is_some());
        assert_eq!(
            back.trust_chain().unwrap().thumbprint(None).unwrap(),
            node.trust_chain().unwrap().thumbprint(None).unwrap()
        );
    }

    #[test]
    fn malformed_identity_text_rejected() {
        let _guard = test::lock_globals();
        assert!(matches!(Identity::decode("ID.e30"), Err(Error::InvalidFormat(_))));
        assert!(matches!(
            Identity::decode("ID.e30.a.b.c.d"),
            Err(Error::InvalidFormat(_))
        ));
    }
}
