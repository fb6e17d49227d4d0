//! Denomination traces: the `port/channel` hops a fungible token crossed to
//! reach this chain, and the `ibc/{hash}` denominations they are stored under.

use serde_derive::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle_encoding::hex;

use crate::core::ics24_host::identifier::{ChannelId, PortId};

/// The prefix of hashed voucher denominations.
pub const DENOM_PREFIX: &str = "ibc";

/// The source tracing information of a fungible token, ie. the chain of
/// port/channel identifiers it travelled through, and its base denomination.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DenomTrace {
    pub path: String,
    pub base_denom: String,
}

impl DenomTrace {
    /// Parses a full denomination path into its trace and base denomination.
    ///
    /// - `portidone/channel-0/uatom` has path `portidone/channel-0` and base `uatom`
    /// - `portidone/channel-0/portidtwo/channel-1/uatom` has path
    ///   `portidone/channel-0/portidtwo/channel-1` and base `uatom`
    /// - `portidone/channel-0/gamm/pool/1` has path `portidone/channel-0` and base `gamm/pool/1`
    /// - `gamm/pool/1` has an empty path and base `gamm/pool/1`
    /// - `uatom` has an empty path and base `uatom`
    pub fn parse(raw_denom: &str) -> Self {
        let items: Vec<&str> = raw_denom.split('/').collect();
        if items.len() == 1 {
            return Self {
                path: String::new(),
                base_denom: raw_denom.to_string(),
            };
        }

        // The channel identifier format is the only thing telling a hop apart from
        // a base denomination that contains slashes, so only `channel-{N}` counts.
        let length = items.len();
        let mut path = Vec::new();
        let mut base = Vec::new();
        let mut i = 0;
        while i < length {
            if i < length - 1 && length > 2 && ChannelId::is_valid_channel_id(items[i + 1]) {
                path.extend_from_slice(&items[i..i + 2]);
                i += 2;
            } else {
                base.extend_from_slice(&items[i..]);
                break;
            }
        }

        Self {
            path: path.join("/"),
            base_denom: base.join("/"),
        }
    }

    /// SHA256 of the full denomination path.
    pub fn hash(&self) -> Vec<u8> {
        Sha256::digest(self.full_denom_path().as_bytes()).to_vec()
    }

    /// The voucher denomination `ibc/{HASH}` of the trace, or the base
    /// denomination if the token never left its native chain.
    pub fn ibc_denom(&self) -> String {
        if self.path.is_empty() {
            return self.base_denom.clone();
        }

        let hash = String::from_utf8(hex::encode_upper(self.hash())).unwrap_or_default();
        format!("{}/{}", DENOM_PREFIX, hash)
    }

    /// The trace path and the base denomination joined by a `/`.
    pub fn full_denom_path(&self) -> String {
        if self.path.is_empty() {
            self.base_denom.clone()
        } else {
            format!("{}/{}", self.path, self.base_denom)
        }
    }
}

/// The `{port}/{channel}/` prefix a denomination receives when it crosses the given channel end.
pub fn denom_prefix(port_id: &PortId, channel_id: &ChannelId) -> String {
    format!("{}/{}/", port_id, channel_id)
}

/// Returns true if the denomination originally came from the receiving
/// chain, ie. it is prefixed with the sending chain's port and channel.
pub fn is_receiver_chain_source(source_port: &PortId, source_channel: &ChannelId, denom: &str) -> bool {
    denom.starts_with(&denom_prefix(source_port, source_channel))
}

/// Returns true if the denomination did not come from the receiving chain,
/// ie. the sending chain is the source of the token.
pub fn is_sender_chain_source(source_port: &PortId, source_channel: &ChannelId, denom: &str) -> bool {
    !is_receiver_chain_source(source_port, source_channel, denom)
}
