//! The main error enum for the project lives here, and documents the various
//! conditions that can arise while interacting with the system.
//!
//! Note that verification *outcomes* are not errors: they are values of
//! [`IntegrityState`][crate::integrity::IntegrityState]. The variants here
//! cover contract violations (mutating a signed item, double-signing) and
//! data that cannot be decoded at all.

use crate::integrity::IntegrityState;
use thiserror::Error;

/// This is our error enum. It contains an entry for any part of the system in
/// which an expectation is not met or a problem occurs.
#[derive(Error, Debug)]
pub enum Error {
    /// Tried to add a second signature from the same key, or to sign a legacy
    /// item that already carries its one allowed signature.
    #[error("item is already signed by this key")]
    AlreadySigned,

    /// A capability request could not be satisfied during identity issuance.
    #[error("capability failure: {0}")]
    Capability(String),

    /// A cryptographic operation failed inside a suite.
    #[error("cryptographic operation failed: {0}")]
    Crypto(String),

    /// A suite with this name is already registered.
    #[error("crypto suite already registered: {0}")]
    DuplicateCryptoSuite(String),

    /// An envelope already contains an item with this unique id.
    #[error("envelope already contains an item with unique id {0}")]
    DuplicateItem(uuid::Uuid),

    /// An envelope must contain at least one item before it can be signed or
    /// exported.
    #[error("envelope contains no items")]
    EmptyEnvelope,

    /// A verification result that a caller required to be valid was not. The
    /// offending result is carried along.
    #[error("integrity requirement not met: {0}")]
    Integrity(IntegrityState),

    /// A claim value is of the wrong type for the requested access, or the
    /// claim is not settable on this item type.
    #[error("invalid claim: {0}")]
    InvalidClaim(String),

    /// Wire text could not be decoded: component-count mismatch, tag
    /// mismatch, bad base64/base58/hex, or malformed JSON.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Tried to mutate claims, links, or legacy mode on an item that has
    /// already been signed.
    #[error("item is signed and cannot be modified")]
    ItemSigned,

    /// An operation required a signed item but the item bears no signature.
    #[error("item is not signed")]
    ItemNotSigned,

    /// A key is missing the half (secret or public) an operation requires,
    /// or lacks a required capability.
    #[error("required key material is missing or unusable")]
    MissingKey,

    /// Envelopes cannot be nested inside other envelopes.
    #[error("envelopes cannot contain envelopes")]
    NestedEnvelope,

    /// No crypto suite is registered under this name.
    #[error("unknown crypto suite: {0}")]
    UnknownCryptoSuite(String),

    /// Legacy items only support a single anonymous signature, so operations
    /// like selective stripping are unavailable.
    #[error("operation is not supported on legacy items")]
    UnsupportedLegacyOperation,
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Self::InvalidFormat(format!("base64: {}", err))
    }
}

impl From<bs58::decode::Error> for Error {
    fn from(err: bs58::decode::Error) -> Self {
        Self::InvalidFormat(format!("base58: {}", err))
    }
}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        Self::InvalidFormat(format!("hex: {}", err))
    }
}

impl From<uuid::Error> for Error {
    fn from(err: uuid::Error) -> Self {
        Self::InvalidFormat(format!("uuid: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidFormat(format!("json: {}", err))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::InvalidFormat(format!("utf8: {}", err))
    }
}

/// Wraps `std::result::Result` around our `Error` enum
pub type Result<T> = std::result::Result<T, Error>;
