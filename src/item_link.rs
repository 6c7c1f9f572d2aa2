//! A committed reference from one item to another: type tag, unique id,
//! thumbprint, and the suite that produced the thumbprint. Links are created
//! from a live item and later verified against a live item by recomputing
//! the thumbprint, which makes cross-references tamper-evident.

use crate::{
    crypto,
    error::{Error, Result},
    integrity::IntegrityState,
    item::{AnyItem, Item},
    claim::Claim,
};
use getset::Getters;
use subtle::ConstantTimeEq;
use uuid::Uuid;

const COMPONENT_DELIMITER: char = '.';
const LIST_DELIMITER: char = ':';

/// An immutable link to another item.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct ItemLink {
    /// The linked item's type tag.
    item_tag: String,
    /// The linked item's unique id.
    unique_id: Uuid,
    /// Thumbprint of the linked item's canonical unsigned encoding.
    thumbprint: String,
    /// Name of the suite the thumbprint was computed with.
    suite_name: String,
}

impl ItemLink {
    /// Capture a link to the given item, thumbprinted with the named suite
    /// (default suite if `None`).
    pub fn new_from_item<T: Item>(item: &T, suite_name: Option<&str>) -> Result<Self> {
        let suite_name = match suite_name {
            Some(name) => {
                crypto::suite(name)?;
                name.to_string()
            }
            None => crypto::default_suite_name(),
        };
        let unique_id = item
            .get_claim::<Uuid>(Claim::Uid)?
            .ok_or_else(|| Error::InvalidClaim("linked item has no unique id".to_string()))?;
        let thumbprint = item.thumbprint(Some(&suite_name))?;
        Ok(Self {
            item_tag: item.tag().to_string(),
            unique_id,
            thumbprint,
            suite_name,
        })
    }

    /// Whether the given item is the item this link was created from, down
    /// to its canonical unsigned bytes.
    pub fn verify_item<T: Item>(&self, item: &T) -> bool {
        if item.tag() != self.item_tag {
            return false;
        }
        match item.get_claim::<Uuid>(Claim::Uid) {
            Ok(Some(uid)) if uid == self.unique_id => {}
            _ => return false,
        }
        match item.thumbprint(Some(&self.suite_name)) {
            Ok(thumbprint) => bool::from(thumbprint.as_bytes().ct_eq(self.thumbprint.as_bytes())),
            Err(_) => false,
        }
    }

    /// Verify a batch of supplied items against a committed link set.
    ///
    /// Every supplied item must match exactly one link (tag, id, and
    /// thumbprint); an unmatched supplied item fails the batch. If all
    /// supplied items matched but links remain uncovered, the result is
    /// partial.
    pub fn verify_batch(items: &[AnyItem], links: &[ItemLink]) -> IntegrityState {
        for item in items {
            let uid = match item.get_claim::<Uuid>(Claim::Uid) {
                Ok(Some(uid)) => uid,
                Ok(None) => return IntegrityState::LinkedItemFault,
                Err(_) => return IntegrityState::LinkedItemFault,
            };
            let link = links
                .iter()
                .find(|link| link.item_tag == item.tag() && link.unique_id == uid);
            match link {
                None => return IntegrityState::LinkedItemMissing,
                Some(link) => {
                    if !item.verify_against_link(link) {
                        return IntegrityState::LinkedItemMismatch;
                    }
                }
            }
        }
        if items.len() < links.len() {
            IntegrityState::PartiallyValidItemLinks
        } else {
            IntegrityState::ValidItemLinks
        }
    }

    /// The wire form: `TAG.uuid.thumbprint[.suite]`. The suite component is
    /// omitted when it is the default suite.
    pub fn to_encoded(&self) -> String {
        if self.suite_name == crypto::default_suite_name() {
            format!("{}.{}.{}", self.item_tag, self.unique_id, self.thumbprint)
        } else {
            format!(
                "{}.{}.{}.{}",
                self.item_tag, self.unique_id, self.thumbprint, self.suite_name
            )
        }
    }

    pub fn from_encoded(encoded: &str) -> Result<Self> {
        let components: Vec<&str> = encoded.split(COMPONENT_DELIMITER).collect();
        if components.len() < 3 || components.len() > 4 {
            return Err(Error::InvalidFormat(format!(
                "item link has {} components",
                components.len()
            )));
        }
        let suite_name = components
            .get(3)
            .map(|s| s.to_string())
            .unwrap_or_else(crypto::default_suite_name);
        Ok(Self {
            item_tag: components[0].to_string(),
            unique_id: Uuid::parse_str(components[1])?,
            thumbprint: components[2].to_string(),
            suite_name,
        })
    }

    /// Encode a link list, `:`-joined.
    pub fn encode_list(links: &[ItemLink]) -> String {
        links
            .iter()
            .map(ItemLink::to_encoded)
            .collect::<Vec<_>>()
            .join(&LIST_DELIMITER.to_string())
    }

    pub fn decode_list(encoded: &str) -> Result<Vec<ItemLink>> {
        if encoded.is_empty() {
            return Err(Error::InvalidFormat("empty item link list".to_string()));
        }
        encoded.split(LIST_DELIMITER).map(ItemLink::from_encoded).collect()
    }
}
