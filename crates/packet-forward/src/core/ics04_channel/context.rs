//! The channel-layer operations the host exposes to applications and middlewares.

use crate::core::ics04_channel::acknowledgement::Acknowledgement;
use crate::core::ics04_channel::error::Error;
use crate::core::ics04_channel::packet::{Packet, Sequence};
use crate::core::ics04_channel::Version;
use crate::core::ics24_host::identifier::{ChannelId, PortId};
use crate::timestamp::Timestamp;
use crate::Height;

/// The ICS4 wrapper: sending packets and writing (possibly asynchronous)
/// acknowledgements through the next layer down the stack.
pub trait Ics4Wrapper {
    /// Sends a packet on the given channel and returns the sequence it was assigned.
    fn send_packet(
        &mut self,
        source_port: &PortId,
        source_channel: &ChannelId,
        timeout_height: Height,
        timeout_timestamp: Timestamp,
        data: Vec<u8>,
    ) -> Result<Sequence, Error>;

    /// Writes the acknowledgement for a packet received on this chain.
    fn write_acknowledgement(
        &mut self,
        packet: &Packet,
        acknowledgement: &Acknowledgement,
    ) -> Result<(), Error>;

    /// Returns the application version negotiated on the given channel.
    fn get_app_version(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<Version>;
}
