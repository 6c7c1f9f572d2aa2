//! One cryptographic signature plus the identifier of the key that produced
//! it. Signed items hold an ordered list of these, at most one per distinct
//! key identifier; legacy items hold exactly one with no identifier.

use crate::{
    error::{Error, Result},
    util::ser,
};
use getset::Getters;

/// An immutable signature entry. `key_id` is `None` only for legacy items,
/// which support a single anonymous signature.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct Signature {
    /// Raw signature bytes.
    bytes: Vec<u8>,
    /// Identifier of the signing key, as produced by the suite.
    key_id: Option<String>,
}

impl Signature {
    pub fn new(bytes: Vec<u8>, key_id: Option<String>) -> Self {
        Self { bytes, key_id }
    }

    /// Whether this is a legacy (identifier-less) signature.
    pub fn is_legacy(&self) -> bool {
        self.key_id.is_none()
    }

    /// Encode a signature list as a wire signature block.
    ///
    /// Non-legacy: `base64("<key-id-hex>.<sig-hex>" [":" ...])`. Legacy: the
    /// raw signature bytes base64-encoded, no identifier, exactly one entry.
    pub fn encode_list(signatures: &[Signature]) -> Result<String> {
        if signatures.is_empty() {
            return Err(Error::ItemNotSigned);
        }
        if signatures[0].is_legacy() {
            if signatures.len() > 1 {
                return Err(Error::UnsupportedLegacyOperation);
            }
            return Ok(ser::base64_encode(&signatures[0].bytes));
        }
        let entries: Vec<String> = signatures
            .iter()
            .map(|sig| {
                let key_id = sig.key_id.as_deref().ok_or(Error::UnsupportedLegacyOperation)?;
                Ok(format!("{}.{}", key_id, ser::hex_encode(&sig.bytes)))
            })
            .collect::<Result<_>>()?;
        Ok(ser::base64_encode(entries.join(":")))
    }

    /// Decode a wire signature block, detecting whether it is legacy. The
    /// decoded bytes of a modern block are `key-id.sig-hex` text entries; raw
    /// legacy signature bytes are vanishingly unlikely to also parse as that
    /// shape, so the shape is the discriminator.
    pub fn decode_list(block: &str) -> Result<(Vec<Signature>, bool)> {
        let raw = ser::base64_decode(block)?;
        if let Some(signatures) = Self::try_decode_modern(&raw) {
            return Ok((signatures, false));
        }
        Ok((vec![Signature::new(raw, None)], true))
    }

    fn try_decode_modern(raw: &[u8]) -> Option<Vec<Signature>> {
        let text = std::str::from_utf8(raw).ok()?;
        let mut signatures = Vec::new();
        for entry in text.split(':') {
            let (key_id, sig_hex) = entry.split_once('.')?;
            if key_id.is_empty() || sig_hex.is_empty() {
                return None;
            }
            // a modern key id is itself hex; require that so random legacy
            // bytes can't masquerade as a block
            if hex::decode(key_id).is_err() {
                return None;
            }
            let bytes = hex::decode(sig_hex).ok()?;
            signatures.push(Signature::new(bytes, Some(key_id.to_string())));
        }
        if signatures.is_empty() {
            None
        } else {
            Some(signatures)
        }
    }

    /// Find the signature produced by the key with the given identifier.
    pub fn find<'a>(signatures: &'a [Signature], key_id: &str) -> Option<&'a Signature> {
        signatures.iter().find(|sig| sig.key_id.as_deref() == Some(key_id))
    }

    /// Whether any signature in the list was produced by the given key
    /// identifier.
    pub fn has(signatures: &[Signature], key_id: &str) -> bool {
        Self::find(signatures, key_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(byte: u8, key_id: &str) -> Signature {
        Signature::new(vec![byte; 64], Some(key_id.to_string()))
    }

    #[test]
    fn modern_block_round_trip() {
        let signatures = vec![sig(1, "aabb01"), sig(2, "ccdd02")];
        let block = Signature::encode_list(&signatures).unwrap();
        let (decoded, legacy) = Signature::decode_list(&block).unwrap();
        assert!(!legacy);
        assert_eq!(decoded, signatures);
    }

    #[test]
    fn legacy_block_round_trip() {
        let signatures = vec![Signature::new(vec![7u8; 64], None)];
        let block = Signature::encode_list(&signatures).unwrap();
        let (decoded, legacy) = Signature::decode_list(&block).unwrap();
        assert!(legacy);
        assert_eq!(decoded, signatures);
        assert!(decoded[0].is_legacy());
    }

    #[test]
    fn legacy_allows_only_one_signature() {
        let signatures = vec![Signature::new(vec![7u8; 64], None), sig(1, "aabb")];
        assert!(matches!(
            Signature::encode_list(&signatures),
            Err(Error::UnsupportedLegacyOperation)
        ));
        assert!(Signature::encode_list(&[]).is_err());
    }

    #[test]
    fn find_by_key_id() {
        let signatures = vec![sig(1, "aabb01"), sig(2, "ccdd02")];
        assert_eq!(Signature::find(&signatures, "ccdd02").unwrap().bytes()[0], 2);
        assert!(Signature::find(&signatures, "eeff03").is_none());
        assert!(Signature::has(&signatures, "aabb01"));
        assert!(!Signature::has(&signatures, "eeff03"));
    }

    #[test]
    fn malformed_block_errors() {
        assert!(Signature::decode_list("not!!base64").is_err());
    }
}
