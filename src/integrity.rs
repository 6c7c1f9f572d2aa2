//! The closed result enumeration returned from every `verify` call.
//!
//! Verification never raises on a failed check; it reports one of these
//! states. Only decode problems and contract violations surface as
//! [`Error`][crate::error::Error] values.

use serde_derive::{Deserialize, Serialize};

/// The outcome of verifying an item.
///
/// The first group of variants are successes ([`is_valid`][IntegrityState::is_valid]
/// returns `true`), the rest are failures. `Complete` is the only state that
/// asserts signature, dates, and (when requested) item links all hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityState {
    /// Signature, date validity, and all requested item links check out.
    Complete,
    /// The signature is cryptographically valid but the item carries no date
    /// claims to evaluate, so temporal validity could not be asserted.
    Intact,
    /// Date claims are valid. Returned from date-only verification requests.
    ValidDates,
    /// All supplied linked items matched. Returned from link-only
    /// verification requests.
    ValidItemLinks,
    /// Signature and dates are valid and every supplied linked item matched,
    /// but the item commits to more links than were supplied.
    PartiallyComplete,
    /// Every supplied linked item matched, but the item commits to more
    /// links than were supplied. Returned from link-only requests.
    PartiallyValidItemLinks,

    /// The item bears no signature at all.
    NoSignature,
    /// The signature does not verify against the candidate key.
    NotTrusted,
    /// No signature on the item was produced by the candidate key.
    KeyMismatch,
    /// The item's issuer claim does not match the verifying identity's
    /// subject.
    IssuerMismatch,
    /// The item's issued-at lies in the future (beyond the grace window).
    UsedBeforeIssued,
    /// The item expired before now (beyond the grace window).
    UsedAfterExpired,
    /// The item's issued-at lies after its expires-at.
    DateMismatch,
    /// A committed item link could not be parsed or recomputed.
    LinkedItemFault,
    /// A supplied item matched a link's identity but not its thumbprint.
    LinkedItemMismatch,
    /// A supplied item has no corresponding link, or links were requested on
    /// an item that commits to none.
    LinkedItemMissing,
    /// A key ring entry was not usable for verification.
    InvalidKeyRingItem,
    /// Key-ring verification was requested but the ring is empty.
    NoKeyRing,
    /// An unexpected failure inside the verification machinery itself.
    InternalFault,
}

impl IntegrityState {
    /// Whether this state represents a successful verification.
    pub fn is_valid(&self) -> bool {
        matches!(
            self,
            Self::Complete
                | Self::Intact
                | Self::ValidDates
                | Self::ValidItemLinks
                | Self::PartiallyComplete
                | Self::PartiallyValidItemLinks
        )
    }
}

impl std::fmt::Display for IntegrityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Complete => "complete",
            Self::Intact => "intact",
            Self::ValidDates => "valid-dates",
            Self::ValidItemLinks => "valid-item-links",
            Self::PartiallyComplete => "partially-complete",
            Self::PartiallyValidItemLinks => "partially-valid-item-links",
            Self::NoSignature => "no-signature",
            Self::NotTrusted => "not-trusted",
            Self::KeyMismatch => "key-mismatch",
            Self::IssuerMismatch => "issuer-mismatch",
            Self::UsedBeforeIssued => "used-before-issued",
            Self::UsedAfterExpired => "used-after-expired",
            Self::DateMismatch => "date-mismatch",
            Self::LinkedItemFault => "linked-item-fault",
            Self::LinkedItemMismatch => "linked-item-mismatch",
            Self::LinkedItemMissing => "linked-item-missing",
            Self::InvalidKeyRingItem => "invalid-key-ring-item",
            Self::NoKeyRing => "no-key-ring",
            Self::InternalFault => "internal-fault",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_split() {
        assert!(IntegrityState::Complete.is_valid());
        assert!(IntegrityState::Intact.is_valid());
        assert!(IntegrityState::ValidDates.is_valid());
        assert!(IntegrityState::ValidItemLinks.is_valid());
        assert!(IntegrityState::PartiallyComplete.is_valid());
        assert!(IntegrityState::PartiallyValidItemLinks.is_valid());
        assert!(!IntegrityState::NoSignature.is_valid());
        assert!(!IntegrityState::NotTrusted.is_valid());
        assert!(!IntegrityState::KeyMismatch.is_valid());
        assert!(!IntegrityState::NoKeyRing.is_valid());
        assert!(!IntegrityState::InternalFault.is_valid());
    }
}
