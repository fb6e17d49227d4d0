use serde::{Deserialize, Deserializer, Serializer};
use subtle_encoding::base64;

/// Serde adapter for byte fields that are carried as base64 strings in JSON,
/// as done by the protobuf JSON mapping of `bytes`.
pub mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = String::from_utf8(base64::encode(data)).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}
