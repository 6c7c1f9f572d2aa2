//! The IdentityIssuingRequest item and the issuance protocol: a requester
//! self-signs a request carrying its public key and wanted capabilities, and
//! an issuer validates it, negotiates the final capability set, optionally
//! extends the trust chain, and signs a new identity.
//!
//! A request is consumed exactly once (issuing takes it by value), and
//! issuance either returns a fully signed identity or fails before any
//! caller-visible state changes.

use crate::{
    capability::{IdentityCapability, KeyCapability},
    claim::Claim,
    error::{Error, Result},
    integrity::IntegrityState,
    item::{Item, ItemState},
    items::{Identity, Key},
    key_ring, util,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct IdentityIssuingRequest {
    state: ItemState,
}

impl Item for IdentityIssuingRequest {
    const TAG: &'static str = "IIR";
    // requests are always self-signed, so the signature block counts
    const MIN_COMPONENTS: usize = 3;

    fn state(&self) -> &ItemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ItemState {
        &mut self.state
    }

    fn from_parts(state: ItemState, _extra: Vec<String>) -> Result<Self> {
        Ok(Self { state })
    }

    fn settable_claims() -> &'static [Claim] {
        &[]
    }
}

impl IdentityIssuingRequest {
    /// Build and self-sign a request for the holder of `key`. Capability
    /// defaults to `generic` when nothing is named.
    pub fn generate(key: &Key) -> Result<Self> {
        Self::generate_full(key, None, None)
    }

    pub fn generate_full(
        key: &Key,
        capabilities: Option<&[IdentityCapability]>,
        principals: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Self> {
        if !key.has_capability(KeyCapability::Sign) {
            return Err(Error::MissingKey);
        }
        if key.secret_bytes()?.is_none() || key.public_bytes()?.is_none() {
            return Err(Error::MissingKey);
        }
        let requested: Vec<IdentityCapability> = match capabilities {
            Some(capabilities) if !capabilities.is_empty() => capabilities.to_vec(),
            _ => vec![IdentityCapability::Generic],
        };
        let public_text = key
            .get_claim::<String>(Claim::Pub)?
            .ok_or(Error::MissingKey)?;
        let mut state = ItemState::new_stamped();
        state.claims.put(Claim::Pub, Some(public_text));
        state.claims.put(Claim::Cap, Some(requested));
        state.claims.put(Claim::Pri, principals);
        state.legacy = key.is_legacy();
        let mut request = Self { state };
        request.sign(key)?;
        Ok(request)
    }

    /// The requested public key, as a verification-only key item.
    pub fn public_key(&self) -> Result<Key> {
        let text = self
            .get_claim::<String>(Claim::Pub)?
            .ok_or_else(|| Error::InvalidClaim("request has no public key".to_string()))?;
        Key::from_public_text(&text)
    }

    /// The requested capabilities (`generic` when the claim is absent).
    pub fn capabilities(&self) -> Result<Vec<IdentityCapability>> {
        Ok(self
            .get_claim(Claim::Cap)?
            .unwrap_or_else(|| vec![IdentityCapability::Generic]))
    }

    pub fn wants_capability(&self, capability: IdentityCapability) -> bool {
        self.capabilities().map(|caps| caps.contains(&capability)).unwrap_or(false)
    }

    pub fn principals(&self) -> Result<Option<serde_json::Map<String, serde_json::Value>>> {
        self.get_claim(Claim::Pri)
    }

    /// Re-verify the request's own signature against its embedded public
    /// key.
    pub fn verify_request(&self) -> IntegrityState {
        match self.public_key() {
            Ok(key) => self.verify_with_key(&key),
            Err(_) => IntegrityState::InternalFault,
        }
    }

    /// Issue an identity to oneself: the requester's key both requested and
    /// signs, there is no issuer identity, and no capability lists apply.
    pub fn self_issue_identity(
        self,
        subject_id: Uuid,
        valid_for: i64,
        key: &Key,
        system_name: &str,
    ) -> Result<Identity> {
        self.issue_identity(
            subject_id,
            valid_for,
            key,
            None,
            false,
            None,
            None,
            Some(system_name),
            None,
            None,
        )
    }

    /// The issue-identity algorithm. Consumes the request; either returns a
    /// fully signed identity or fails without side effects.
    #[allow(clippy::too_many_arguments)]
    pub fn issue_identity(
        mut self,
        subject_id: Uuid,
        valid_for: i64,
        issuer_key: &Key,
        issuer_identity: Option<&Identity>,
        include_chain: bool,
        allowed_capabilities: Option<&[IdentityCapability]>,
        required_capabilities: Option<&[IdentityCapability]>,
        system_name: Option<&str>,
        ambit: Option<&[String]>,
        methods: Option<&[String]>,
    ) -> Result<Identity> {
        if valid_for <= 0 {
            return Err(Error::InvalidClaim("identity validity period must be positive".to_string()));
        }
        // 1. the request must still carry a valid self-signature
        let request_state = self.verify_request();
        if !request_state.is_valid() {
            return Err(Error::Integrity(request_state));
        }
        let requested_public = self
            .public_key()?
            .public_bytes()?
            .ok_or(Error::MissingKey)?;
        let issuer_public = issuer_key.public_bytes()?.ok_or(Error::MissingKey)?;
        let self_issue = issuer_identity.is_none() || issuer_public == requested_public;

        // 2. strip so the negotiated capability claim lands in fresh state
        self.strip();

        // 3. negotiate the final capability set
        let requested = self.capabilities()?;
        let mut capabilities = requested.clone();
        if self_issue {
            if !capabilities.contains(&IdentityCapability::SelfIssued) {
                capabilities.push(IdentityCapability::SelfIssued);
            }
        } else {
            let allowed = allowed_capabilities.unwrap_or(&[]);
            let required = required_capabilities.unwrap_or(&[]);
            if allowed.is_empty() && required.is_empty() {
                return Err(Error::Capability(
                    "issuing to another entity requires an allowed or required capability list".to_string(),
                ));
            }
            for capability in required {
                if !capabilities.contains(capability) {
                    capabilities.push(*capability);
                }
            }
            if !allowed.is_empty() {
                for capability in &requested {
                    if !allowed.contains(capability) {
                        return Err(Error::Capability(format!(
                            "requested capability {} is not allowed",
                            capability
                        )));
                    }
                }
            }
            // 4. only identities granted issue may issue to others
            let issuer = issuer_identity.expect("non-self issue always has an issuer identity");
            if !issuer.has_capability(IdentityCapability::Issue) {
                return Err(Error::Capability("issuer lacks the issue capability".to_string()));
            }
        }
        capabilities.sort();
        capabilities.dedup();
        self.state.put_internal(Claim::Cap, Some(capabilities.clone()));

        // 5. assemble the new identity's claims
        let issuer_id = match issuer_identity {
            Some(issuer) => issuer
                .subject_id()?
                .ok_or_else(|| Error::InvalidClaim("issuer identity has no subject id".to_string()))?,
            None => subject_id,
        };
        let now = util::now();
        let public_text = self.get_claim::<String>(Claim::Pub)?.ok_or(Error::MissingKey)?;
        let mut state = ItemState::default();
        state.claims.put(Claim::Uid, Some(Uuid::new_v4()));
        state.claims.put(Claim::Sub, Some(subject_id));
        state.claims.put(Claim::Iss, Some(issuer_id));
        state.claims.put(Claim::Iat, Some(now));
        state.claims.put(Claim::Exp, Some(now.add_seconds(valid_for)));
        state.claims.put(Claim::Pub, Some(public_text));
        state.claims.put(Claim::Sys, system_name.map(|s| s.to_string()));
        state.claims.put(Claim::Cap, Some(capabilities));
        state.claims.put(Claim::Pri, self.principals()?);
        state.claims.put(Claim::Amb, ambit.map(|a| a.to_vec()));
        state.claims.put(Claim::Mtd, methods.map(|m| m.to_vec()));
        state.legacy = self.is_legacy();

        // 6. embed the issuer as trust-chain parent only when it is not
        // already a known trust anchor
        let trust_chain = match issuer_identity {
            Some(issuer) => {
                let anchored = key_ring::with_key_ring(|ring| ring.contains_item(issuer))?;
                if include_chain && !anchored {
                    let issuer_state = issuer.verify();
                    if !issuer_state.is_valid() {
                        return Err(Error::Integrity(issuer_state));
                    }
                    Some(Box::new(issuer.clone()))
                } else {
                    let date_state = issuer.verify_dates();
                    if !date_state.is_valid() {
                        return Err(Error::Integrity(date_state));
                    }
                    None
                }
            }
            None => None,
        };

        // 7. sign with the issuer key
        let mut identity = Identity::from_issuance(state, trust_chain);
        identity.sign(issuer_key)?;
        tracing::info!(
            subject = %subject_id,
            issuer = %issuer_id,
            self_issue,
            chained = identity.trust_chain().is_some(),
            "identity issued"
        );
        Ok(identity)
    }
}
