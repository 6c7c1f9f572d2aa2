//! The Tag item: a claims-light marker whose entire purpose is the item
//! links it commits to. A tag with no links is meaningless, so signing and
//! export both require at least one.

use crate::{
    claim::Claim,
    error::{Error, Result},
    item::{Item, ItemState},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    state: ItemState,
}

impl Item for Tag {
    const TAG: &'static str = "TAG";
    const MIN_COMPONENTS: usize = 2;

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
        &[Claim::Ctx, Claim::Iss]
    }

    fn check_signable(&self) -> Result<()> {
        self.require_links()
    }

    fn check_exportable(&self) -> Result<()> {
        self.require_links()
    }
}

impl Tag {
    pub fn new() -> Self {
        Self {
            state: ItemState::new_stamped(),
        }
    }

    fn require_links(&self) -> Result<()> {
        match self.item_links()? {
            Some(links) if !links.is_empty() => Ok(()),
            _ => Err(Error::InvalidClaim("tag commits to no item links".to_string())),
        }
    }
}

impl Default for Tag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::KeyCapability;
    use crate::integrity::IntegrityState;
    use crate::item::AnyItem;
    use crate::items::{Data, Key};
    use crate::util::test;

    #[test]
    fn tag_requires_links() {
        let _guard = test::lock_globals();
        let key = Key::generate(&[KeyCapability::Sign]).unwrap();
        let mut tag = Tag::new();
        assert!(matches!(tag.sign(&key), Err(Error::InvalidClaim(_))));
        assert!(matches!(tag.export(), Err(Error::InvalidClaim(_))));

        let mut data = Data::new();
        data.set_payload(b"tagged").unwrap();
        tag.add_item_link(&data, None).unwrap();
        tag.sign(&key).unwrap();
        let exported = tag.export().unwrap();
        let back = Tag::import(&exported).unwrap();
        assert_eq!(back, tag);

        let linked: Vec<AnyItem> = vec![data.into()];
        assert_eq!(
            back.verify_with_key_and_items(&key, &linked),
            IntegrityState::Complete
        );
    }
}
