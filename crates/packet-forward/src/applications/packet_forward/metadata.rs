//! Forwarding instructions carried in the memo of an ICS20 packet:
//!
//! ```json
//! { "forward": {
//!     "receiver": "cosmos1...",
//!     "port": "transfer",
//!     "channel": "channel-0",
//!     "timeout": "10m",
//!     "retries": 2,
//!     "next": { "forward": { ... } }
//! } }
//! ```

use core::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_derive::{Deserialize as DeserializeDerive, Serialize as SerializeDerive};
use serde_json::{Map, Value};

use super::error::Error;
use crate::core::ics24_host::identifier::{ChannelId, PortId};

/// The root key under which forwarding instructions live in a memo.
pub const FORWARD_KEY: &str = "forward";

/// A JSON object whose keys keep the order they were decoded in.
pub type JsonObject = Map<String, Value>;

#[derive(Clone, Debug, PartialEq, SerializeDerive, DeserializeDerive)]
pub struct PacketMetadata {
    pub forward: ForwardMetadata,
}

impl PacketMetadata {
    /// Decodes the forwarding instructions of a memo.
    ///
    /// Returns `Ok(None)` when the memo is not a JSON object with a `forward`
    /// key, in which case the packet is not meant to be forwarded. Once the key
    /// is present, any decoding failure is an error.
    pub fn from_memo(memo: &str) -> Result<Option<Self>, Error> {
        let is_forward = serde_json::from_str::<JsonObject>(memo)
            .map(|object| object.get(FORWARD_KEY).map_or(false, |v| !v.is_null()))
            .unwrap_or(false);
        if !is_forward {
            return Ok(None);
        }

        let mut metadata: Self = serde_json::from_str(memo).map_err(Error::metadata_parse)?;
        if let Some(next) = metadata.forward.next.as_mut() {
            next.canonicalize()?;
        }

        Ok(Some(metadata))
    }
}

/// The instructions for a single hop.
#[derive(Clone, Debug, Default, PartialEq, SerializeDerive, DeserializeDerive)]
pub struct ForwardMetadata {
    /// Account receiving the tokens on the next chain
    #[serde(default)]
    pub receiver: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub channel: String,
    /// Relative timeout of the forwarded packet; zero selects the configured default
    #[serde(default, with = "timeout_nanos")]
    pub timeout: Duration,
    /// Retries on timeout; absent selects the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u8>,
    /// Memo of the forwarded packet, typically the next hop's instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<ForwardNext>,
}

impl ForwardMetadata {
    pub fn validate(&self) -> Result<(), Error> {
        if self.receiver.is_empty() {
            return Err(Error::empty_receiver());
        }
        self.port_id()?;
        self.channel_id()?;
        Ok(())
    }

    pub fn port_id(&self) -> Result<PortId, Error> {
        self.port.parse().map_err(Error::invalid_metadata_identifier)
    }

    pub fn channel_id(&self) -> Result<ChannelId, Error> {
        self.channel
            .parse()
            .map_err(Error::invalid_metadata_identifier)
    }

    /// The memo for the packet sent to the next hop.
    pub fn next_memo(&self) -> Result<String, Error> {
        match &self.next {
            Some(next) => serde_json::to_string(next).map_err(Error::next_serialization),
            None => Ok(String::new()),
        }
    }
}

/// The `next` field, accepted both as a nested object and, for older
/// senders, as a string holding the JSON of that object.
#[derive(Clone, Debug, PartialEq)]
pub enum ForwardNext {
    Raw(String),
    Parsed(JsonObject),
}

impl ForwardNext {
    /// Decodes the string form in place, so that both forms compare equal and
    /// encode to the nested object form.
    pub fn canonicalize(&mut self) -> Result<(), Error> {
        if let Self::Raw(raw) = self {
            *self = Self::Parsed(serde_json::from_str(raw).map_err(Error::metadata_parse)?);
        }
        Ok(())
    }

    pub fn as_object(&self) -> Option<&JsonObject> {
        match self {
            Self::Parsed(object) => Some(object),
            Self::Raw(_) => None,
        }
    }
}

impl From<JsonObject> for ForwardNext {
    fn from(object: JsonObject) -> Self {
        Self::Parsed(object)
    }
}

impl Serialize for ForwardNext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Parsed(object) => object.serialize(serializer),
            Self::Raw(raw) => serde_json::from_str::<JsonObject>(raw)
                .map_err(serde::ser::Error::custom)?
                .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ForwardNext {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(DeserializeDerive)]
        #[serde(untagged)]
        enum RawNext {
            Text(String),
            Object(JsonObject),
        }

        Ok(match RawNext::deserialize(deserializer)? {
            RawNext::Text(raw) => Self::Raw(raw),
            RawNext::Object(object) => Self::Parsed(object),
        })
    }
}

/// Timeouts are encoded as integer nanoseconds, and decoded from either
/// integer nanoseconds or a duration string such as `"60s"`. Negative
/// values decode to zero, ie. to the configured default.
mod timeout_nanos {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};
    use serde_derive::Deserialize as DeserializeDerive;

    pub fn serialize<S: Serializer>(timeout: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = u64::try_from(timeout.as_nanos()).map_err(serde::ser::Error::custom)?;
        serializer.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        #[derive(DeserializeDerive)]
        #[serde(untagged)]
        enum RawTimeout {
            Nanos(i64),
            Text(String),
        }

        match RawTimeout::deserialize(deserializer)? {
            RawTimeout::Nanos(nanos) => Ok(Duration::from_nanos(u64::try_from(nanos).unwrap_or(0))),
            RawTimeout::Text(text) => match text.trim().strip_prefix('-') {
                Some(negative) => humantime::parse_duration(negative)
                    .map(|_| Duration::ZERO)
                    .map_err(serde::de::Error::custom),
                None => humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom),
            },
        }
    }
}
