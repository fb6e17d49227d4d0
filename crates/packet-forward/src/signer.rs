use core::{convert::Infallible, fmt::Display, str::FromStr};

use flex_error::{define_error, TraceError};
use serde::{Deserialize, Serialize};
use subtle_encoding::bech32;

define_error! {
    #[derive(Debug, PartialEq, Eq)]
    SignerError {
        EmptySigner
            | _ | { "signer cannot be empty" },

        InvalidAddressPrefix
            { prefix: String }
            | e | { format_args!("invalid bech32 address prefix `{}`", e.prefix) },

        InvalidAddress
            { address: String }
            [ TraceError<subtle_encoding::Error> ]
            | e | { format_args!("invalid bech32 address `{}`", e.address) },
    }
}

/// An account address, kept in its textual (bech32) form.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Signer(String);

impl Signer {
    pub fn new(s: impl ToString) -> Self {
        Self(s.to_string())
    }

    /// Encodes raw account bytes as a bech32 address with the given human readable prefix.
    pub fn from_address_bytes(prefix: &str, bytes: &[u8]) -> Result<Self, SignerError> {
        let valid_prefix = !prefix.is_empty()
            && prefix.len() <= 83
            && prefix.bytes().all(|b| (33..=126).contains(&b) && !b.is_ascii_uppercase());
        if !valid_prefix {
            return Err(SignerError::invalid_address_prefix(prefix.to_string()));
        }

        Ok(Self(bech32::encode(prefix, bytes)))
    }

    /// Decodes the bech32 address into its raw account bytes.
    pub fn address_bytes(&self) -> Result<Vec<u8>, SignerError> {
        if self.is_empty() {
            return Err(SignerError::empty_signer());
        }

        bech32::decode(&self.0)
            .map(|(_prefix, bytes)| bytes)
            .map_err(|e| SignerError::invalid_address(self.0.clone(), e))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for Signer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Signer {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Signer {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl FromStr for Signer {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for Signer {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
