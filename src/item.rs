//! The shared state machine every concrete item runs on: canonical encoding,
//! decoding, signing, stripping, thumbprints, and the converged verification
//! algorithm.
//!
//! An item is constructed unsigned and mutable, becomes immutable in its
//! claims and links once the first signature lands, and can be returned to
//! the unsigned state with [`strip`][Item::strip]. The canonical unsigned
//! encoding is cached on import and on signing so verification and re-export
//! always operate on the exact bytes that were signed.

use crate::{
    capability::KeyCapability,
    claim::{Claim, ClaimValue, ClaimsMap},
    crypto,
    error::{Error, Result},
    integrity::IntegrityState,
    item_link::ItemLink,
    items::{Data, Envelope, Identity, IdentityIssuingRequest, Key, Message, Tag},
    key_ring,
    signature::Signature,
    util::{self, Timestamp, ser},
};
use uuid::Uuid;

/// Delimiter between the components of a single item encoding.
pub(crate) const COMPONENT_DELIMITER: char = '.';
/// Delimiter between the sections of an envelope encoding.
pub(crate) const SECTION_DELIMITER: char = ':';
/// The envelope header tag, also used to prefix standalone item exports.
pub(crate) const ENVELOPE_TAG: &str = "Di";

/// Maximum byte length of a context (`ctx`) claim.
pub const MAX_CONTEXT_LENGTH: usize = 84;

/// The state shared by every item type: claims, signatures, the cached
/// canonical encoding, and the signed/legacy flags.
#[derive(Debug, Clone, Default)]
pub struct ItemState {
    pub(crate) claims: ClaimsMap,
    pub(crate) signatures: Vec<Signature>,
    pub(crate) cached_unsigned: Option<String>,
    pub(crate) signed: bool,
    pub(crate) legacy: bool,
}

impl ItemState {
    /// Fresh state with a new unique id and the current time stamped in.
    pub(crate) fn new_stamped() -> Self {
        let mut state = Self::default();
        state.claims.put(Claim::Uid, Some(Uuid::new_v4()));
        state.claims.put(Claim::Iat, Some(util::now()));
        state
    }

    /// Claim write that bypasses the caller-settable list. For computed
    /// claims owned by the item types themselves.
    pub(crate) fn put_internal<T: ClaimValue>(&mut self, claim: Claim, value: Option<T>) {
        self.cached_unsigned = None;
        self.claims.put(claim, value);
    }

    pub(crate) fn remove_internal(&mut self, claim: Claim) {
        self.cached_unsigned = None;
        self.claims.remove(claim);
    }
}

// the cached encoding is a performance detail, not an observable property
impl PartialEq for ItemState {
    fn eq(&self, other: &Self) -> bool {
        self.claims == other.claims
            && self.signatures == other.signatures
            && self.signed == other.signed
            && self.legacy == other.legacy
    }
}

/// The abstract item interface. Concrete types supply their tag, wire
/// layout, and settable-claim subset; the rest of the machinery is
/// provided.
pub trait Item: Clone + std::fmt::Debug {
    /// The short type tag leading every encoding of this item.
    const TAG: &'static str;
    /// Minimum number of `.`-separated wire components.
    const MIN_COMPONENTS: usize;
    /// Number of positional components between the claims component and the
    /// signature block.
    const EXTRA_COMPONENTS: usize = 0;

    fn state(&self) -> &ItemState;
    fn state_mut(&mut self) -> &mut ItemState;

    /// Rebuild an item from decoded state plus its extra positional
    /// components.
    fn from_parts(state: ItemState, extra: Vec<String>) -> Result<Self>;

    /// The subset of claims a caller may set directly on this item type.
    fn settable_claims() -> &'static [Claim];

    /// The extra positional components this item contributes to its
    /// encoding, in order.
    fn extra_components(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Per-type requirements checked before signing.
    fn check_signable(&self) -> Result<()> {
        Ok(())
    }

    /// Per-type requirements checked before export.
    fn check_exportable(&self) -> Result<()> {
        Ok(())
    }

    // ------------------------------------------------------------------
    // claims and links
    // ------------------------------------------------------------------

    fn tag(&self) -> &'static str {
        Self::TAG
    }

    fn claims(&self) -> &ClaimsMap {
        &self.state().claims
    }

    fn get_claim<T: ClaimValue>(&self, claim: Claim) -> Result<Option<T>> {
        self.state().claims.get(claim)
    }

    /// Set a claim. Fails once the item is signed, and for claims outside
    /// the type's settable subset.
    fn put_claim<T: ClaimValue>(&mut self, claim: Claim, value: Option<T>) -> Result<()> {
        if self.state().signed {
            return Err(Error::ItemSigned);
        }
        let value = match value {
            Some(value) => value,
            None => return Ok(()),
        };
        if !Self::settable_claims().contains(&claim) {
            return Err(Error::InvalidClaim(format!(
                "claim {} cannot be set directly on {}",
                claim,
                Self::TAG
            )));
        }
        let json = value.to_json();
        if claim == Claim::Ctx {
            let too_long = json.as_str().map(|s| s.len() > MAX_CONTEXT_LENGTH).unwrap_or(true);
            if too_long {
                return Err(Error::InvalidClaim(format!(
                    "context exceeds {} bytes or is not a string",
                    MAX_CONTEXT_LENGTH
                )));
            }
        }
        let state = self.state_mut();
        state.cached_unsigned = None;
        state.claims.put(claim, Some(json));
        Ok(())
    }

    /// Remove a claim. Same restrictions as [`put_claim`][Item::put_claim].
    fn remove_claim(&mut self, claim: Claim) -> Result<()> {
        if self.state().signed {
            return Err(Error::ItemSigned);
        }
        if !Self::settable_claims().contains(&claim) {
            return Err(Error::InvalidClaim(format!(
                "claim {} cannot be removed from {}",
                claim,
                Self::TAG
            )));
        }
        self.state_mut().remove_internal(claim);
        Ok(())
    }

    /// The item's unique id.
    fn unique_id(&self) -> Result<Option<Uuid>> {
        self.get_claim(Claim::Uid)
    }

    /// When the item was issued.
    fn issued_at(&self) -> Result<Option<Timestamp>> {
        self.get_claim(Claim::Iat)
    }

    /// When the item expires, if it does.
    fn expires_at(&self) -> Result<Option<Timestamp>> {
        self.get_claim(Claim::Exp)
    }

    /// The context claim.
    fn context(&self) -> Result<Option<String>> {
        self.get_claim(Claim::Ctx)
    }

    /// The links this item commits to.
    fn item_links(&self) -> Result<Option<Vec<ItemLink>>> {
        self.get_claim(Claim::Lnk)
    }

    /// Commit a link to another item. Fails once signed.
    fn add_item_link<T: Item>(&mut self, item: &T, suite_name: Option<&str>) -> Result<()> {
        if self.state().signed {
            return Err(Error::ItemSigned);
        }
        let link = ItemLink::new_from_item(item, suite_name)?;
        let mut links = self.item_links()?.unwrap_or_default();
        links.push(link);
        self.state_mut().put_internal(Claim::Lnk, Some(links));
        Ok(())
    }

    /// Replace the committed link set wholesale. An empty set removes the
    /// claim.
    fn set_item_links(&mut self, links: Vec<ItemLink>) -> Result<()> {
        if self.state().signed {
            return Err(Error::ItemSigned);
        }
        if links.is_empty() {
            self.state_mut().remove_internal(Claim::Lnk);
        } else {
            self.state_mut().put_internal(Claim::Lnk, Some(links));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // signing state
    // ------------------------------------------------------------------

    fn is_signed(&self) -> bool {
        self.state().signed
    }

    fn is_legacy(&self) -> bool {
        self.state().legacy
    }

    fn signatures(&self) -> &[Signature] {
        &self.state().signatures
    }

    /// Switch the item's wire dialect. Fails once signed.
    fn set_legacy(&mut self, legacy: bool) -> Result<()> {
        if self.state().signed {
            return Err(Error::ItemSigned);
        }
        if self.state().legacy != legacy {
            let state = self.state_mut();
            state.legacy = legacy;
            state.cached_unsigned = None;
        }
        Ok(())
    }

    /// Sign the item's canonical unsigned encoding with a secret signing
    /// key. Appends to the signature list; fails on a duplicate key, and on
    /// legacy items that already carry their one allowed signature.
    fn sign(&mut self, key: &Key) -> Result<()> {
        if self.state().legacy && self.state().signed {
            return Err(Error::AlreadySigned);
        }
        self.check_signable()?;
        if !key.has_capability(KeyCapability::Sign) {
            return Err(Error::MissingKey);
        }
        let secret = key.secret_bytes()?.ok_or(Error::MissingKey)?;
        let public = key.public_bytes()?.ok_or(Error::MissingKey)?;
        let suite = crypto::suite(&key.suite_name()?)?;
        let key_id = suite.key_identifier(&public)?;
        if Signature::has(&self.state().signatures, &key_id) {
            return Err(Error::AlreadySigned);
        }
        let canonical = self.encode_unsigned()?;
        let bytes = suite.sign(canonical.as_bytes(), &secret)?;
        let signature = if self.state().legacy {
            Signature::new(bytes, None)
        } else {
            Signature::new(bytes, Some(key_id))
        };
        let state = self.state_mut();
        state.cached_unsigned = Some(canonical);
        state.signatures.push(signature);
        state.signed = true;
        tracing::debug!(item = Self::TAG, "item signed");
        Ok(())
    }

    /// Discard all signatures and return the item to the unsigned state.
    /// Claims are untouched.
    fn strip(&mut self) {
        let state = self.state_mut();
        state.signatures.clear();
        state.signed = false;
        state.cached_unsigned = None;
    }

    /// Remove only the given key's signature. Returns whether anything was
    /// removed. Legacy items cannot selectively strip.
    fn strip_key(&mut self, key: &Key) -> Result<bool> {
        if self.state().legacy {
            return Err(Error::UnsupportedLegacyOperation);
        }
        let public = key.public_bytes()?.ok_or(Error::MissingKey)?;
        let suite = crypto::suite(&key.suite_name()?)?;
        let key_id = suite.key_identifier(&public)?;
        let state = self.state_mut();
        let before = state.signatures.len();
        state.signatures.retain(|sig| sig.key_id().as_deref() != Some(key_id.as_str()));
        let removed = state.signatures.len() < before;
        if state.signatures.is_empty() {
            state.signed = false;
            state.cached_unsigned = None;
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // encoding
    // ------------------------------------------------------------------

    /// The canonical encoding without the signature block:
    /// `TAG.base64(claims-json)` plus any extra positional components.
    /// Imported and signed items return the cached original bytes.
    fn encode_unsigned(&self) -> Result<String> {
        if let Some(cached) = self.state().cached_unsigned.as_ref() {
            return Ok(cached.clone());
        }
        let claims_json = self.state().claims.to_canonical_json()?;
        let mut components = vec![Self::TAG.to_string(), ser::base64_encode(claims_json.as_bytes())];
        components.extend(self.extra_components()?);
        Ok(components.join(&COMPONENT_DELIMITER.to_string()))
    }

    /// The full encoding, optionally with the signature block appended.
    fn encode(&self, with_signature: bool) -> Result<String> {
        let unsigned = self.encode_unsigned()?;
        if with_signature && self.state().signed {
            Ok(format!(
                "{}{}{}",
                unsigned,
                COMPONENT_DELIMITER,
                Signature::encode_list(&self.state().signatures)?
            ))
        } else {
            Ok(unsigned)
        }
    }

    /// Export the item as a standalone single-item envelope string.
    fn export(&self) -> Result<String> {
        self.check_exportable()?;
        Ok(format!("{}{}{}", ENVELOPE_TAG, SECTION_DELIMITER, self.encode(true)?))
    }

    /// Import a standalone item, accepting the single-item envelope prefix.
    fn import(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        let encoded = encoded
            .strip_prefix(&format!("{}{}", ENVELOPE_TAG, SECTION_DELIMITER))
            .unwrap_or(encoded);
        if encoded.contains(SECTION_DELIMITER) {
            return Err(Error::InvalidFormat(
                "multiple sections; import through Envelope instead".to_string(),
            ));
        }
        Self::decode(encoded)
    }

    /// Decode a bare item encoding (no envelope prefix).
    fn decode(encoded: &str) -> Result<Self> {
        let components: Vec<&str> = encoded.split(COMPONENT_DELIMITER).collect();
        if components[0] != Self::TAG {
            return Err(Error::InvalidFormat(format!(
                "expected tag {}, got {}",
                Self::TAG,
                components[0]
            )));
        }
        if components.len() < Self::MIN_COMPONENTS {
            return Err(Error::InvalidFormat(format!(
                "{} takes at least {} components, got {}",
                Self::TAG,
                Self::MIN_COMPONENTS,
                components.len()
            )));
        }
        let unsigned_len = 2 + Self::EXTRA_COMPONENTS;
        let signed = match components.len() {
            n if n == unsigned_len => false,
            n if n == unsigned_len + 1 => true,
            n => {
                return Err(Error::InvalidFormat(format!(
                    "{} takes {} or {} components, got {}",
                    Self::TAG,
                    unsigned_len,
                    unsigned_len + 1,
                    n
                )))
            }
        };
        let mut state = decode_claims_component(components[1])?;
        state.cached_unsigned = Some(components[..unsigned_len].join(&COMPONENT_DELIMITER.to_string()));
        if signed {
            let (signatures, legacy) = Signature::decode_list(components[unsigned_len])?;
            state.signatures = signatures;
            state.signed = true;
            state.legacy = legacy;
        }
        let extra = components[2..unsigned_len].iter().map(|s| s.to_string()).collect();
        Self::from_parts(state, extra)
    }

    /// Thumbprint of the canonical unsigned encoding, hashed with the named
    /// suite (default suite if `None`). Stable across re-import.
    fn thumbprint(&self, suite_name: Option<&str>) -> Result<String> {
        let suite = match suite_name {
            Some(name) => crypto::suite(name)?,
            None => crypto::default_suite(),
        };
        Ok(ser::hex_encode(suite.hash(self.encode_unsigned()?.as_bytes())?))
    }

    // ------------------------------------------------------------------
    // verification
    // ------------------------------------------------------------------

    /// Verify against the process-wide key ring.
    fn verify(&self) -> IntegrityState {
        self.verify_with_key_ring(&[])
    }

    /// Verify against one explicit key.
    fn verify_with_key(&self, key: &Key) -> IntegrityState {
        self.verify_with_key_and_items(key, &[])
    }

    /// Verify against one explicit key, also requiring the supplied items to
    /// match this item's committed links.
    fn verify_with_key_and_items(&self, key: &Key, linked_items: &[AnyItem]) -> IntegrityState {
        verify_against_key(self, key, linked_items)
    }

    /// Verify against an issuing identity's public key, cross-checking this
    /// item's issuer claim against the identity's subject.
    fn verify_with_identity(&self, issuer: &Identity, linked_items: &[AnyItem]) -> IntegrityState {
        let item_issuer = match self.get_claim::<Uuid>(Claim::Iss) {
            Ok(value) => value,
            Err(_) => return IntegrityState::InternalFault,
        };
        let issuer_subject = match issuer.subject_id() {
            Ok(value) => value,
            Err(_) => return IntegrityState::InternalFault,
        };
        if let (Some(item_issuer), Some(issuer_subject)) = (item_issuer, issuer_subject) {
            if item_issuer != issuer_subject {
                return IntegrityState::IssuerMismatch;
            }
        }
        let key = match issuer.public_key() {
            Ok(key) => key,
            Err(_) => return IntegrityState::InternalFault,
        };
        verify_against_key(self, &key, linked_items)
    }

    /// Verify against every entry of the process-wide key ring, in insertion
    /// order, returning the first result that is not a key mismatch.
    ///
    /// Note the short-circuit: a `NotTrusted` from an early ring entry is
    /// returned before a later entry that might have verified is tried.
    fn verify_with_key_ring(&self, linked_items: &[AnyItem]) -> IntegrityState {
        key_ring::with_key_ring(|ring| {
            if ring.is_empty() {
                return IntegrityState::NoKeyRing;
            }
            for (name, entry) in ring.entries() {
                let key = match entry.verification_key() {
                    Ok(key) => key,
                    Err(_) => return IntegrityState::InvalidKeyRingItem,
                };
                let result = verify_against_key(self, &key, linked_items);
                if result != IntegrityState::KeyMismatch {
                    tracing::debug!(item = Self::TAG, anchor = name.as_str(), state = %result, "key ring verification settled");
                    return result;
                }
            }
            IntegrityState::KeyMismatch
        })
    }

    /// Verify only the date claims.
    fn verify_dates(&self) -> IntegrityState {
        match evaluate_dates(self) {
            DateEval::Valid => IntegrityState::ValidDates,
            DateEval::Missing => IntegrityState::Intact,
            DateEval::Fail(state) => state,
        }
    }

    /// Verify only that the supplied items match this item's committed
    /// links.
    fn verify_linked_items(&self, linked_items: &[AnyItem]) -> IntegrityState {
        evaluate_links(self, linked_items)
    }
}

/// Decode the base64-JSON claims component into fresh item state.
pub(crate) fn decode_claims_component(component: &str) -> Result<ItemState> {
    let claims_text = String::from_utf8(ser::base64_decode(component)?)?;
    let claims = ClaimsMap::from_json(&claims_text)
        .ok_or_else(|| Error::InvalidFormat("malformed claims json".to_string()))?;
    Ok(ItemState {
        claims,
        ..Default::default()
    })
}

#[derive(Clone, Copy)]
enum DateEval {
    Valid,
    Missing,
    Fail(IntegrityState),
}

fn evaluate_dates<T: Item>(item: &T) -> DateEval {
    let issued_at = match item.get_claim::<Timestamp>(Claim::Iat) {
        Ok(value) => value,
        Err(_) => return DateEval::Fail(IntegrityState::InternalFault),
    };
    let expires_at = match item.get_claim::<Timestamp>(Claim::Exp) {
        Ok(value) => value,
        Err(_) => return DateEval::Fail(IntegrityState::InternalFault),
    };
    let now = util::now();
    let issued_at = match issued_at {
        Some(issued_at) => issued_at,
        None => return DateEval::Missing,
    };
    if util::cmp_with_grace(&issued_at, &now) == std::cmp::Ordering::Greater {
        return DateEval::Fail(IntegrityState::UsedBeforeIssued);
    }
    if let Some(expires_at) = expires_at {
        if util::cmp_with_grace(&issued_at, &expires_at) == std::cmp::Ordering::Greater {
            return DateEval::Fail(IntegrityState::DateMismatch);
        }
        if util::cmp_with_grace(&now, &expires_at) == std::cmp::Ordering::Greater {
            return DateEval::Fail(IntegrityState::UsedAfterExpired);
        }
    }
    DateEval::Valid
}

fn evaluate_links<T: Item>(item: &T, linked_items: &[AnyItem]) -> IntegrityState {
    let links = match item.item_links() {
        Ok(Some(links)) if !links.is_empty() => links,
        Ok(_) => return IntegrityState::LinkedItemMissing,
        Err(_) => return IntegrityState::LinkedItemFault,
    };
    ItemLink::verify_batch(linked_items, &links)
}

/// The converged verification algorithm every overload lands on.
pub(crate) fn verify_against_key<T: Item>(
    item: &T,
    key: &Key,
    linked_items: &[AnyItem],
) -> IntegrityState {
    let signatures = &item.state().signatures;
    if signatures.is_empty() {
        return IntegrityState::NoSignature;
    }
    let public = match key.public_bytes() {
        Ok(Some(public)) => public,
        Ok(None) => return IntegrityState::KeyMismatch,
        Err(_) => return IntegrityState::InternalFault,
    };
    let suite = match key.suite_name().and_then(|name| crypto::suite(&name)) {
        Ok(suite) => suite,
        Err(_) => return IntegrityState::InternalFault,
    };
    // legacy items carry one anonymous signature at index 0; everything else
    // is looked up by key identifier
    let signature = if item.state().legacy || signatures[0].is_legacy() {
        &signatures[0]
    } else {
        let key_id = match suite.key_identifier(&public) {
            Ok(key_id) => key_id,
            Err(_) => return IntegrityState::InternalFault,
        };
        match Signature::find(signatures, &key_id) {
            Some(signature) => signature,
            None => return IntegrityState::KeyMismatch,
        }
    };
    let canonical = match item.encode_unsigned() {
        Ok(canonical) => canonical,
        Err(_) => return IntegrityState::InternalFault,
    };
    match suite.verify(canonical.as_bytes(), signature.bytes(), &public) {
        Ok(true) => {}
        Ok(false) => return IntegrityState::NotTrusted,
        Err(_) => return IntegrityState::NotTrusted,
    }
    let dates = evaluate_dates(item);
    if let DateEval::Fail(state) = dates {
        return state;
    }
    let links = if linked_items.is_empty() {
        None
    } else {
        let state = evaluate_links(item, linked_items);
        if !state.is_valid() {
            return state;
        }
        Some(state)
    };
    match (dates, links) {
        (DateEval::Missing, _) => IntegrityState::Intact,
        (DateEval::Valid, Some(IntegrityState::PartiallyValidItemLinks)) => IntegrityState::PartiallyComplete,
        (DateEval::Valid, _) => IntegrityState::Complete,
        (DateEval::Fail(state), _) => state,
    }
}

/// The closed union over every concrete item type, with the static
/// tag-dispatch table used during decode.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyItem {
    Data(Data),
    Envelope(Envelope),
    Identity(Identity),
    IdentityIssuingRequest(IdentityIssuingRequest),
    Key(Key),
    Message(Message),
    Tag(Tag),
}

macro_rules! with_item {
    ($any:expr, |$item:ident| $body:expr) => {
        match $any {
            AnyItem::Data($item) => $body,
            AnyItem::Envelope($item) => $body,
            AnyItem::Identity($item) => $body,
            AnyItem::IdentityIssuingRequest($item) => $body,
            AnyItem::Key($item) => $body,
            AnyItem::Message($item) => $body,
            AnyItem::Tag($item) => $body,
        }
    };
}

type DecodeFn = fn(&str) -> Result<AnyItem>;

/// Static tag → decoder table. Decode never instantiates reflectively; the
/// union is closed.
const TAG_TABLE: &[(&str, DecodeFn)] = &[
    (Data::TAG, |encoded| Data::decode(encoded).map(AnyItem::Data)),
    (Identity::TAG, |encoded| Identity::decode(encoded).map(AnyItem::Identity)),
    (IdentityIssuingRequest::TAG, |encoded| {
        IdentityIssuingRequest::decode(encoded).map(AnyItem::IdentityIssuingRequest)
    }),
    (Key::TAG, |encoded| Key::decode(encoded).map(AnyItem::Key)),
    (Message::TAG, |encoded| Message::decode(encoded).map(AnyItem::Message)),
    (Tag::TAG, |encoded| Tag::decode(encoded).map(AnyItem::Tag)),
];

impl AnyItem {
    /// Decode any item from its leading type tag. Envelope text routes to
    /// the envelope importer.
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        let tag_end = encoded
            .find(|c| c == COMPONENT_DELIMITER || c == SECTION_DELIMITER)
            .unwrap_or(encoded.len());
        let tag = &encoded[..tag_end];
        if tag == ENVELOPE_TAG {
            return Ok(AnyItem::Envelope(Envelope::import(encoded)?));
        }
        let decode = TAG_TABLE
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, decode)| decode)
            .ok_or_else(|| Error::InvalidFormat(format!("unknown item tag: {}", tag)))?;
        decode(encoded)
    }

    pub fn tag(&self) -> &'static str {
        with_item!(self, |item| item.tag())
    }

    pub fn get_claim<T: ClaimValue>(&self, claim: Claim) -> Result<Option<T>> {
        with_item!(self, |item| item.get_claim(claim))
    }

    pub fn unique_id(&self) -> Result<Option<Uuid>> {
        with_item!(self, |item| item.unique_id())
    }

    pub fn is_signed(&self) -> bool {
        with_item!(self, |item| item.is_signed())
    }

    pub fn thumbprint(&self, suite_name: Option<&str>) -> Result<String> {
        with_item!(self, |item| item.thumbprint(suite_name))
    }

    pub fn encode(&self, with_signature: bool) -> Result<String> {
        with_item!(self, |item| item.encode(with_signature))
    }

    pub fn export(&self) -> Result<String> {
        with_item!(self, |item| item.export())
    }

    pub fn verify(&self) -> IntegrityState {
        with_item!(self, |item| item.verify())
    }

    pub fn verify_with_key(&self, key: &Key) -> IntegrityState {
        with_item!(self, |item| item.verify_with_key(key))
    }

    pub(crate) fn verify_against_link(&self, link: &ItemLink) -> bool {
        with_item!(self, |item| link.verify_item(item))
    }
}

impl From<Data> for AnyItem {
    fn from(item: Data) -> Self {
        Self::Data(item)
    }
}

impl From<Envelope> for AnyItem {
    fn from(item: Envelope) -> Self {
        Self::Envelope(item)
    }
}

impl From<Identity> for AnyItem {
    fn from(item: Identity) -> Self {
        Self::Identity(item)
    }
}

impl From<IdentityIssuingRequest> for AnyItem {
    fn from(item: IdentityIssuingRequest) -> Self {
        Self::IdentityIssuingRequest(item)
    }
}

impl From<Key> for AnyItem {
    fn from(item: Key) -> Self {
        Self::Key(item)
    }
}

impl From<Message> for AnyItem {
    fn from(item: Message) -> Self {
        Self::Message(item)
    }
}

impl From<Tag> for AnyItem {
    fn from(item: Tag) -> Self {
        Self::Tag(item)
    }
}
