//! Helpful serialization tools: the text codecs the wire format is built
//! from, and canonical JSON over insertion-ordered maps.

use crate::error::Result;

/// Convert bytes to base64 (url-safe, no padding). The alphabet never
/// collides with the `.` and `:` wire delimiters.
pub fn base64_encode<T: AsRef<[u8]>>(bytes: T) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes.as_ref())
}

pub fn base64_decode<T: AsRef<[u8]>>(bytes: T) -> Result<Vec<u8>> {
    use base64::Engine;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(bytes.as_ref())?)
}

/// Convert bytes to base58 (bitcoin alphabet).
pub fn base58_encode<T: AsRef<[u8]>>(bytes: T) -> String {
    bs58::encode(bytes.as_ref()).into_string()
}

pub fn base58_decode<T: AsRef<[u8]>>(bytes: T) -> Result<Vec<u8>> {
    Ok(bs58::decode(bytes.as_ref()).into_vec()?)
}

/// Convert bytes to lowercase hex.
pub fn hex_encode<T: AsRef<[u8]>>(bytes: T) -> String {
    hex::encode(bytes.as_ref())
}

pub fn hex_decode<T: AsRef<[u8]>>(bytes: T) -> Result<Vec<u8>> {
    Ok(hex::decode(bytes.as_ref())?)
}

/// Serialize an insertion-ordered JSON map compactly. Key order is
/// first-insertion order, which survives a decode/encode round trip, so two
/// serializations of the same imported map are byte-identical.
pub(crate) fn to_canonical_json(map: &serde_json::Map<String, serde_json::Value>) -> Result<String> {
    Ok(serde_json::to_string(map)?)
}

/// Parse a JSON object into an insertion-ordered map. Non-objects and
/// malformed text return `None`.
pub(crate) fn from_json_object(text: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_round_trip() {
        let bytes = b"get a job";
        let enc = base64_encode(bytes);
        assert!(!enc.contains('='));
        assert_eq!(base64_decode(&enc).unwrap(), bytes);
        assert!(base64_decode("!!not base64!!").is_err());
    }

    #[test]
    fn base58_round_trip() {
        let bytes: Vec<u8> = (0..=32).collect();
        assert_eq!(base58_decode(base58_encode(&bytes)).unwrap(), bytes);
        assert!(base58_decode("0OIl").is_err());
    }

    #[test]
    fn hex_round_trip() {
        assert_eq!(hex_encode([0xde, 0xad, 0xbe, 0xef]), "deadbeef");
        assert_eq!(hex_decode("deadbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(hex_decode("xyz").is_err());
    }

    #[test]
    fn canonical_json_preserves_insertion_order() {
        let map = from_json_object(r#"{"zzz":"1","aaa":"2","mmm":"3"}"#).unwrap();
        assert_eq!(to_canonical_json(&map).unwrap(), r#"{"zzz":"1","aaa":"2","mmm":"3"}"#);
    }

    #[test]
    fn from_json_rejects_non_objects() {
        assert!(from_json_object("[1,2,3]").is_none());
        assert!(from_json_object("{\"unterminated\":").is_none());
        assert!(from_json_object("").is_none());
    }
}
