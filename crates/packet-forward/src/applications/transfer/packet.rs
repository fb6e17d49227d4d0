use serde_derive::{Deserialize, Serialize};

use super::error::Error;

/// The ICS20 fungible token packet data.
///
/// Fields are declared in lexicographical order so that the JSON encoding
/// matches the sorted JSON every ICS20 implementation commits to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleTokenPacketData {
    /// Amount as a decimal string, parsed only where it is spent
    pub amount: String,
    /// Full denomination path, eg. `transfer/channel-0/uatom`
    pub denom: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
    pub receiver: String,
    pub sender: String,
}

impl FungibleTokenPacketData {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(Error::packet_data_deserialization)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(Error::packet_data_serialization)
    }
}
