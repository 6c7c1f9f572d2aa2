//! The concrete item types. Each is a thin struct over the shared
//! [`ItemState`][crate::item::ItemState] plus its own wire layout, claim
//! rules, and type-specific operations.

mod data;
mod envelope;
mod identity;
mod identity_issuing_request;
mod key;
mod message;
mod tag;

pub use data::Data;
pub use envelope::Envelope;
pub use identity::Identity;
pub use identity_issuing_request::IdentityIssuingRequest;
pub use key::Key;
pub use message::Message;
pub use tag::Tag;
