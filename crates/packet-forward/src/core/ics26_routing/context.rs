use crate::core::ics04_channel::acknowledgement::Acknowledgement;
use crate::core::ics04_channel::channel::{Counterparty, Order};
use crate::core::ics04_channel::context::Ics4Wrapper;
use crate::core::ics04_channel::error::Error;
use crate::core::ics04_channel::packet::{Packet, Sequence};
use crate::core::ics04_channel::Version;
use crate::core::ics24_host::identifier::{ChannelId, ConnectionId, PortId};
use crate::signer::Signer;
use crate::timestamp::Timestamp;
use crate::Height;

/// The callbacks an IBC application receives from the routing module, given
/// mutable access to the host chain state `Ctx`.
pub trait Module<Ctx> {
    #[allow(clippy::too_many_arguments)]
    fn on_chan_open_init(
        &self,
        ctx: &mut Ctx,
        order: Order,
        connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty: &Counterparty,
        version: &Version,
    ) -> Result<Version, Error>;

    #[allow(clippy::too_many_arguments)]
    fn on_chan_open_try(
        &self,
        ctx: &mut Ctx,
        order: Order,
        connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty: &Counterparty,
        counterparty_version: &Version,
    ) -> Result<Version, Error>;

    fn on_chan_open_ack(
        &self,
        _ctx: &mut Ctx,
        _port_id: &PortId,
        _channel_id: &ChannelId,
        _counterparty_channel_id: &ChannelId,
        _counterparty_version: &Version,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn on_chan_open_confirm(
        &self,
        _ctx: &mut Ctx,
        _port_id: &PortId,
        _channel_id: &ChannelId,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn on_chan_close_init(
        &self,
        _ctx: &mut Ctx,
        _port_id: &PortId,
        _channel_id: &ChannelId,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn on_chan_close_confirm(
        &self,
        _ctx: &mut Ctx,
        _port_id: &PortId,
        _channel_id: &ChannelId,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Returns the acknowledgement to write for `packet`, or `None` when the
    /// acknowledgement is written asynchronously at a later point.
    fn on_recv_packet(
        &self,
        ctx: &mut Ctx,
        packet: &Packet,
        relayer: &Signer,
    ) -> Option<Acknowledgement>;

    fn on_acknowledgement_packet(
        &self,
        ctx: &mut Ctx,
        packet: &Packet,
        acknowledgement: &[u8],
        relayer: &Signer,
    ) -> Result<(), Error>;

    fn on_timeout_packet(&self, ctx: &mut Ctx, packet: &Packet, relayer: &Signer)
        -> Result<(), Error>;
}

/// A module that wraps another one and also sits on the packet sending path,
/// relaying the ICS4 calls of the wrapped application to the channel layer.
pub trait Middleware<Ctx: Ics4Wrapper>: Module<Ctx> {
    fn send_packet(
        &self,
        ctx: &mut Ctx,
        source_port: &PortId,
        source_channel: &ChannelId,
        timeout_height: Height,
        timeout_timestamp: Timestamp,
        data: Vec<u8>,
    ) -> Result<Sequence, Error>;

    fn write_acknowledgement(
        &self,
        ctx: &mut Ctx,
        packet: &Packet,
        acknowledgement: &Acknowledgement,
    ) -> Result<(), Error>;

    fn get_app_version(&self, ctx: &Ctx, port_id: &PortId, channel_id: &ChannelId) -> Option<Version>;
}
