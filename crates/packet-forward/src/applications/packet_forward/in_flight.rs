//! The continuation record of a forwarded packet.

use core::time::Duration;

use prost::Message;
use serde_derive::{Deserialize, Serialize};

use ibc_packet_forward_proto::packetforward::v1::InFlightPacket as RawInFlightPacket;

use super::error::Error;
use crate::core::ics04_channel::packet::{Packet, Sequence};
use crate::core::ics24_host::identifier::{ChannelId, PortId};
use crate::timestamp::Timestamp;
use crate::Height;

/// Store key of the record of the outbound packet sent on `channel_id`/`port_id` with `sequence`.
pub fn refund_packet_key(channel_id: &ChannelId, port_id: &PortId, sequence: Sequence) -> Vec<u8> {
    format!("{}/{}/{}", channel_id, port_id, sequence).into_bytes()
}

/// Everything needed to resolve an inbound packet once the outcome of the
/// packet forwarded on its behalf is known: where to write the inbound
/// packet's acknowledgement, and how many more times a timed-out forward
/// may be retried.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InFlightPacket {
    pub original_sender_address: String,
    /// Channel and port the inbound packet was received on
    pub refund_channel_id: ChannelId,
    pub refund_port_id: PortId,
    /// Channel and port the inbound packet was sent from
    pub packet_src_channel_id: ChannelId,
    pub packet_src_port_id: PortId,
    pub packet_timeout_timestamp: Timestamp,
    pub packet_timeout_height: Height,
    #[serde(with = "crate::serializers::base64_bytes")]
    pub packet_data: Vec<u8>,
    /// Sequence of the inbound packet
    pub refund_sequence: Sequence,
    pub retries_remaining: i32,
    /// Relative timeout of every attempt of the forward
    pub timeout: Duration,
    pub nonrefundable: bool,
}

impl InFlightPacket {
    /// Rebuilds the inbound packet, for writing its acknowledgement.
    pub fn refund_packet(&self) -> Packet {
        Packet {
            sequence: self.refund_sequence,
            source_port: self.packet_src_port_id.clone(),
            source_channel: self.packet_src_channel_id.clone(),
            destination_port: self.refund_port_id.clone(),
            destination_channel: self.refund_channel_id.clone(),
            data: self.packet_data.clone(),
            timeout_height: self.packet_timeout_height,
            timeout_timestamp: self.packet_timeout_timestamp,
        }
    }

    pub fn encode_vec(&self) -> Vec<u8> {
        RawInFlightPacket::from(self.clone()).encode_to_vec()
    }

    pub fn decode_vec(bytes: &[u8]) -> Result<Self, Error> {
        RawInFlightPacket::decode(bytes)
            .map_err(Error::in_flight_packet_decode)?
            .try_into()
    }
}

impl TryFrom<RawInFlightPacket> for InFlightPacket {
    type Error = Error;

    fn try_from(raw: RawInFlightPacket) -> Result<Self, Self::Error> {
        Ok(Self {
            original_sender_address: raw.original_sender_address,
            refund_channel_id: raw
                .refund_channel_id
                .parse()
                .map_err(Error::invalid_in_flight_packet_identifier)?,
            refund_port_id: raw
                .refund_port_id
                .parse()
                .map_err(Error::invalid_in_flight_packet_identifier)?,
            packet_src_channel_id: raw
                .packet_src_channel_id
                .parse()
                .map_err(Error::invalid_in_flight_packet_identifier)?,
            packet_src_port_id: raw
                .packet_src_port_id
                .parse()
                .map_err(Error::invalid_in_flight_packet_identifier)?,
            packet_timeout_timestamp: Timestamp::from_nanoseconds(raw.packet_timeout_timestamp),
            packet_timeout_height: raw
                .packet_timeout_height
                .parse()
                .map_err(Error::invalid_in_flight_packet_height)?,
            packet_data: raw.packet_data,
            refund_sequence: raw.refund_sequence.into(),
            retries_remaining: raw.retries_remaining,
            timeout: Duration::from_nanos(raw.timeout),
            nonrefundable: raw.nonrefundable,
        })
    }
}

impl From<InFlightPacket> for RawInFlightPacket {
    fn from(value: InFlightPacket) -> Self {
        RawInFlightPacket {
            original_sender_address: value.original_sender_address,
            refund_channel_id: value.refund_channel_id.to_string(),
            refund_port_id: value.refund_port_id.to_string(),
            packet_src_channel_id: value.packet_src_channel_id.to_string(),
            packet_src_port_id: value.packet_src_port_id.to_string(),
            packet_timeout_timestamp: value.packet_timeout_timestamp.as_nanoseconds(),
            packet_timeout_height: value.packet_timeout_height.to_string(),
            packet_data: value.packet_data,
            refund_sequence: value.refund_sequence.into(),
            retries_remaining: value.retries_remaining,
            timeout: u64::try_from(value.timeout.as_nanos()).unwrap_or(u64::MAX),
            nonrefundable: value.nonrefundable,
        }
    }
}
