//! The key ring: a named trust store of keys and identities consulted when
//! an item is verified without an explicit key. The core does not persist
//! the ring; import/export through the envelope format is the boundary.

use crate::{
    error::{Error, Result},
    item::{AnyItem, Item},
    items::{Envelope, Identity, Key},
};
use once_cell::sync::Lazy;
use std::sync::RwLock;
use uuid::Uuid;

/// An entry in the ring. Only keys and identities can anchor trust.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyRingItem {
    Key(Key),
    Identity(Identity),
}

impl KeyRingItem {
    /// The key this entry verifies signatures with.
    pub(crate) fn verification_key(&self) -> Result<Key> {
        match self {
            Self::Key(key) => key.public_only(),
            Self::Identity(identity) => identity.public_key(),
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Self::Key(_) => Key::TAG,
            Self::Identity(_) => Identity::TAG,
        }
    }

    fn thumbprint(&self) -> Result<String> {
        match self {
            Self::Key(key) => key.thumbprint(None),
            Self::Identity(identity) => identity.thumbprint(None),
        }
    }

    fn to_any(&self) -> AnyItem {
        match self {
            Self::Key(key) => AnyItem::Key(key.clone()),
            Self::Identity(identity) => AnyItem::Identity(identity.clone()),
        }
    }
}

impl From<Key> for KeyRingItem {
    fn from(key: Key) -> Self {
        Self::Key(key)
    }
}

impl From<Identity> for KeyRingItem {
    fn from(identity: Identity) -> Self {
        Self::Identity(identity)
    }
}

/// A named map of trust anchors, iterated in insertion order.
///
/// Verification consults entries in order and settles on the first result
/// that is not a key mismatch, so a `NotTrusted` from an early entry
/// shadows a later entry that might have verified.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    entries: Vec<(String, KeyRingItem)>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry under a name.
    pub fn put<T: Into<KeyRingItem>>(&mut self, name: &str, item: T) {
        let item = item.into();
        tracing::debug!(name, tag = item.tag(), "key ring entry added");
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = item,
            None => self.entries.push((name.to_string(), item)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&KeyRingItem> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, item)| item)
    }

    /// Remove an entry by name. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| n != name);
        self.entries.len() < before
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether an equivalent item (same tag and unsigned thumbprint) is
    /// anchored in the ring, regardless of name.
    pub fn contains_item<T: Item>(&self, item: &T) -> Result<bool> {
        let thumbprint = item.thumbprint(None)?;
        for (_, entry) in &self.entries {
            if entry.tag() == item.tag() && entry.thumbprint()? == thumbprint {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&String, &KeyRingItem)> {
        self.entries.iter().map(|(name, item)| (name, item))
    }

    /// Export the ring's anchors as an envelope string, signed when a key is
    /// given (anonymous otherwise). Entry names are not part of the wire
    /// form; import names entries by their unique id.
    pub fn export_to_envelope(&self, sign_key: Option<&Key>, issuer_id: Option<Uuid>) -> Result<String> {
        if self.entries.is_empty() {
            return Err(Error::EmptyEnvelope);
        }
        let mut envelope = match issuer_id {
            Some(issuer_id) => Envelope::new_with_issuer(issuer_id, None)?,
            None => Envelope::new(),
        };
        for (_, entry) in &self.entries {
            envelope.add_item(entry.to_any())?;
        }
        if let Some(key) = sign_key {
            envelope.sign(key)?;
        }
        envelope.export()
    }

    /// Import anchors from an envelope string, verifying the envelope
    /// against the given key first when one is supplied. Fails without
    /// touching the ring if the envelope holds anything but keys and
    /// identities.
    pub fn import_from_envelope(&mut self, encoded: &str, verify_key: Option<&Key>) -> Result<usize> {
        let envelope = Envelope::import(encoded)?;
        if let Some(key) = verify_key {
            let state = envelope.verify_with_key(key);
            if !state.is_valid() {
                return Err(Error::Integrity(state));
            }
        }
        let mut incoming = Vec::with_capacity(envelope.items().len());
        for item in envelope.items() {
            let entry = match item {
                AnyItem::Key(key) => KeyRingItem::Key(key.clone()),
                AnyItem::Identity(identity) => KeyRingItem::Identity(identity.clone()),
                other => {
                    return Err(Error::InvalidFormat(format!(
                        "key rings hold keys and identities, not {}",
                        other.tag()
                    )))
                }
            };
            let name = item
                .unique_id()?
                .ok_or_else(|| Error::InvalidClaim("anchor has no unique id".to_string()))?
                .to_string();
            incoming.push((name, entry));
        }
        let count = incoming.len();
        for (name, entry) in incoming {
            self.put(&name, entry);
        }
        Ok(count)
    }
}

static KEY_RING: Lazy<RwLock<KeyRing>> = Lazy::new(|| RwLock::new(KeyRing::new()));

/// Read access to the process-wide key ring.
pub fn with_key_ring<R>(f: impl FnOnce(&KeyRing) -> R) -> R {
    let ring = KEY_RING.read().expect("dime_core::key_ring::with_key_ring() -- ring lock poisoned");
    f(&ring)
}

/// Write access to the process-wide key ring.
pub fn with_key_ring_mut<R>(f: impl FnOnce(&mut KeyRing) -> R) -> R {
    let mut ring = KEY_RING.write().expect("dime_core::key_ring::with_key_ring_mut() -- ring lock poisoned");
    f(&mut ring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::KeyCapability;
    use crate::integrity::IntegrityState;
    use crate::items::Data;
    use crate::util::test;

    #[test]
    fn put_get_remove() {
        let mut ring = KeyRing::new();
        let _guard = test::lock_globals();
        let key = Key::generate(&[KeyCapability::Sign]).unwrap();
        ring.put("work", key.public_only().unwrap());
        assert!(ring.contains_name("work"));
        assert_eq!(ring.size(), 1);
        assert!(matches!(ring.get("work"), Some(KeyRingItem::Key(_))));
        // same name replaces
        let other = Key::generate(&[KeyCapability::Sign]).unwrap();
        ring.put("work", other.public_only().unwrap());
        assert_eq!(ring.size(), 1);
        assert!(ring.remove("work"));
        assert!(!ring.remove("work"));
        assert!(ring.is_empty());
    }

    #[test]
    fn contains_item_matches_by_thumbprint() {
        let _guard = test::lock_globals();
        let mut ring = KeyRing::new();
        let (_key, identity) = test::self_issued_identity("ring-system");
        assert!(!ring.contains_item(&identity).unwrap());
        ring.put("anchor", identity.clone());
        assert!(ring.contains_item(&identity).unwrap());
        let (_other_key, other) = test::self_issued_identity("other-system");
        assert!(!ring.contains_item(&other).unwrap());
    }

    #[test]
    fn ring_verification_and_short_circuit() {
        let _guard = test::lock_globals();
        let k1 = Key::generate(&[KeyCapability::Sign]).unwrap();
        let k2 = Key::generate(&[KeyCapability::Sign]).unwrap();
        let mut data = Data::new();
        data.set_payload(b"ring payload").unwrap();
        data.sign(&k2).unwrap();

        // empty ring
        assert_eq!(data.verify(), IntegrityState::NoKeyRing);

        // k1 mismatches, k2 verifies: iteration keeps going past mismatches
        with_key_ring_mut(|ring| {
            ring.put("first", k1.public_only().unwrap());
            ring.put("second", k2.public_only().unwrap());
        });
        assert_eq!(data.verify(), IntegrityState::Complete);

        // no matching entry at all
        with_key_ring_mut(|ring| {
            ring.clear();
            ring.put("first", k1.public_only().unwrap());
        });
        assert_eq!(data.verify(), IntegrityState::KeyMismatch);
        with_key_ring_mut(|ring| ring.clear());
    }

    #[test]
    fn envelope_export_import_round_trip() {
        let _guard = test::lock_globals();
        let sign_key = Key::generate(&[KeyCapability::Sign]).unwrap();
        let (_key, identity) = test::self_issued_identity("export-system");
        let mut ring = KeyRing::new();
        ring.put("signer", sign_key.public_only().unwrap());
        ring.put("root", identity);

        let exported = ring.export_to_envelope(Some(&sign_key), Some(Uuid::new_v4())).unwrap();
        let mut imported = KeyRing::new();
        let count = imported.import_from_envelope(&exported, Some(&sign_key)).unwrap();
        assert_eq!(count, 2);
        assert_eq!(imported.size(), 2);

        // verification against the wrong key refuses the import
        let wrong = Key::generate(&[KeyCapability::Sign]).unwrap();
        let mut refused = KeyRing::new();
        assert!(matches!(
            refused.import_from_envelope(&exported, Some(&wrong)),
            Err(Error::Integrity(_))
        ));
        assert!(refused.is_empty());
    }

    #[test]
    fn import_rejects_foreign_item_types() {
        let _guard = test::lock_globals();
        let mut data = Data::new();
        data.set_payload(b"not an anchor").unwrap();
        let mut envelope = Envelope::new();
        envelope.add_item(data).unwrap();
        let exported = envelope.export().unwrap();
        let mut ring = KeyRing::new();
        assert!(matches!(
            ring.import_from_envelope(&exported, None),
            Err(Error::InvalidFormat(_))
        ));
        assert!(ring.is_empty());
    }
}
