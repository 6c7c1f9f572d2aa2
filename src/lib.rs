//! Welcome to the Dime core, a reference implementation of the Dime item
//! and envelope format.
//!
//! Dime is a compact, text-based, cryptographically verifiable envelope
//! format for identity credentials and signed data items. It lets entities
//! issue self-describing, signable, linkable records (keys, identities,
//! data payloads, messages, tags) and verify their integrity and
//! provenance without a central server, using an embeddable chain of trust.
//!
//! The pieces fit together like this:
//!
//! * Every item is backed by a [`ClaimsMap`][claim::ClaimsMap]: a typed,
//!   insertion-ordered store of namespaced claims that canonicalizes to
//!   compact JSON.
//! * The [`Item`][item::Item] trait provides the shared state machine
//!   (encode, decode, sign, verify, strip) over that map. Concrete types
//!   ([`Key`][items::Key], [`Identity`][items::Identity],
//!   [`IdentityIssuingRequest`][items::IdentityIssuingRequest],
//!   [`Data`][items::Data], [`Message`][items::Message],
//!   [`Tag`][items::Tag], [`Envelope`][items::Envelope]) add their wire
//!   layout and rules on top.
//! * All cryptography flows through named, pluggable
//!   [suites][crypto::CryptoSuite] resolved from a process-wide registry,
//!   so old and new material interoperate.
//! * Items commit to each other with [`ItemLink`][item_link::ItemLink]
//!   thumbprints, carry multi-signature lists, and verify against explicit
//!   keys, issuing identities, embedded trust chains, or the process-wide
//!   [`KeyRing`][key_ring::KeyRing].
//! * Verification never throws: every check lands on a value of the closed
//!   [`IntegrityState`][integrity::IntegrityState] enumeration.
//!
//! A taste of the issuance flow:
//!
//! ```rust
//! use dime_core::{
//!     capability::KeyCapability,
//!     integrity::IntegrityState,
//!     item::Item,
//!     items::{IdentityIssuingRequest, Key},
//! };
//! use uuid::Uuid;
//!
//! # fn main() -> dime_core::error::Result<()> {
//! let key = Key::generate(&[KeyCapability::Sign])?;
//! let request = IdentityIssuingRequest::generate(&key)?;
//! let identity = request.self_issue_identity(Uuid::new_v4(), 3600, &key, "example-system")?;
//! assert_eq!(identity.verify(), IntegrityState::Complete);
//!
//! let transferable = identity.export()?;
//! # let _ = transferable;
//! # Ok(())
//! # }
//! ```
//!
//! Network transport, persistence, revocation, and key storage at rest are
//! out of scope: callers supply keys and receive opaque encoded strings.

pub mod capability;
pub mod claim;
pub mod crypto;
pub mod error;
pub mod integrity;
pub mod item;
pub mod item_link;
pub mod items;
pub mod key_ring;
pub mod signature;
pub mod util;

pub use capability::{IdentityCapability, KeyCapability};
pub use claim::{Claim, ClaimsMap};
pub use error::{Error, Result};
pub use integrity::IntegrityState;
pub use item::{AnyItem, Item, MAX_CONTEXT_LENGTH};
pub use item_link::ItemLink;
pub use items::{Data, Envelope, Identity, IdentityIssuingRequest, Key, Message, Tag};
pub use key_ring::{KeyRing, KeyRingItem};
pub use signature::Signature;
pub use util::Timestamp;
