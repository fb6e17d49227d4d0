//! The generic acknowledgement envelope written by applications and
//! middlewares for received packets.

use core::fmt::{Display, Formatter};

use serde_derive::{Deserialize, Serialize};
use serde_json::json;
use subtle_encoding::base64;

use crate::core::ics04_channel::error::Error;

/// The result payload of a successful ICS20 acknowledgement, ie. `0x01`.
pub const ACK_SUCCESS_RESULT: &[u8] = &[1];

/// An acknowledgement in the JSON form every IBC application agrees on:
/// `{"result":"<base64>"}` or `{"error":"<text>"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acknowledgement {
    /// Successful acknowledgement carrying an opaque result
    Result(#[serde(with = "crate::serializers::base64_bytes")] Vec<u8>),
    /// Error Acknowledgement
    Error(String),
}

impl Acknowledgement {
    pub fn success() -> Self {
        Self::Result(ACK_SUCCESS_RESULT.to_vec())
    }

    pub fn result(result: Vec<u8>) -> Self {
        Self::Result(result)
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error(error.into())
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Result(_))
    }

    /// The error text of an error acknowledgement, or the empty string.
    pub fn error_text(&self) -> &str {
        match self {
            Self::Result(_) => "",
            Self::Error(e) => e,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(Error::invalid_acknowledgement)
    }

    /// Deterministic JSON encoding of the acknowledgement.
    pub fn to_bytes(&self) -> Vec<u8> {
        let value = match self {
            Self::Result(result) => {
                let encoded = String::from_utf8(base64::encode(result)).unwrap_or_default();
                json!({ "result": encoded })
            }
            Self::Error(e) => json!({ "error": e }),
        };
        value.to_string().into_bytes()
    }
}

impl Display for Acknowledgement {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.to_bytes()))
    }
}
