//! The capability value types: what a key may be used for, and what an
//! identity has been granted permission to do.

use crate::error::{Error, Result};
use serde_derive::{Deserialize, Serialize};
use std::str::FromStr;

/// What a cryptographic key can do. A key holds exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyCapability {
    /// The key can produce and verify signatures.
    Sign,
    /// The key can take part in Diffie-Hellman style key agreement.
    Exchange,
    /// The key can encrypt and decrypt data symmetrically.
    Encrypt,
}

impl KeyCapability {
    /// The wire name of this capability.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sign => "sign",
            Self::Exchange => "exchange",
            Self::Encrypt => "encrypt",
        }
    }
}

impl std::fmt::Display for KeyCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for KeyCapability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sign" => Ok(Self::Sign),
            "exchange" => Ok(Self::Exchange),
            "encrypt" => Ok(Self::Encrypt),
            _ => Err(Error::InvalidFormat(format!("unknown key capability: {}", s))),
        }
    }
}

/// What an identity has been granted permission to do. Granted at issuance
/// and negotiated between the request and the issuer's allow/require lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityCapability {
    /// General-purpose use. The default when a request names nothing.
    Generic,
    /// The identity may be used to identify its holder.
    Identify,
    /// The identity may issue other identities.
    Issue,
    /// The identity may produce proofs over data items.
    Prove,
    /// The identity may seal (encrypt) payloads on behalf of its holder.
    Seal,
    /// Marks a self-issued (root) identity.
    #[serde(rename = "self")]
    SelfIssued,
    /// The identity may produce trusted timestamps.
    Timestamp,
}

impl IdentityCapability {
    /// The wire name of this capability.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Identify => "identify",
            Self::Issue => "issue",
            Self::Prove => "prove",
            Self::Seal => "seal",
            Self::SelfIssued => "self",
            Self::Timestamp => "timestamp",
        }
    }
}

impl std::fmt::Display for IdentityCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for IdentityCapability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "generic" => Ok(Self::Generic),
            "identify" => Ok(Self::Identify),
            "issue" => Ok(Self::Issue),
            "prove" => Ok(Self::Prove),
            "seal" => Ok(Self::Seal),
            "self" => Ok(Self::SelfIssued),
            "timestamp" => Ok(Self::Timestamp),
            _ => Err(Error::InvalidFormat(format!("unknown identity capability: {}", s))),
        }
    }
}
