//! A mock ICS20 fungible token transfer application.

use crate::applications::transfer::amount::Amount;
use crate::applications::transfer::coin::Coin;
use crate::applications::transfer::context::{BankKeeper, TransferKeeper};
use crate::applications::transfer::denom::{
    denom_prefix, is_receiver_chain_source, is_sender_chain_source, DenomTrace, DENOM_PREFIX,
};
use crate::applications::transfer::error::Error as Ics20Error;
use crate::applications::transfer::msgs::transfer::MsgTransfer;
use crate::applications::transfer::packet::FungibleTokenPacketData;
use crate::applications::transfer::{MODULE_ID_STR, PORT_ID_STR};
use crate::core::ics04_channel::acknowledgement::Acknowledgement;
use crate::core::ics04_channel::channel::{Counterparty, Order};
use crate::core::ics04_channel::context::Ics4Wrapper;
use crate::core::ics04_channel::error::Error as ChannelError;
use crate::core::ics04_channel::packet::{Packet, Sequence};
use crate::core::ics04_channel::Version;
use crate::core::ics24_host::identifier::{ChannelId, ConnectionId, PortId};
use crate::core::ics26_routing::context::Module;
use crate::mock::context::MockContext;
use crate::signer::Signer;

/// Escrows or burns the tokens of `msg` and sends the transfer packet.
pub fn send_transfer(ctx: &mut MockContext, msg: MsgTransfer) -> Result<Sequence, Ics20Error> {
    let full_denom_path = if msg.token.denom.starts_with(&format!("{}/", DENOM_PREFIX)) {
        ctx.denom_path_from_hash(&msg.token.denom)?
    } else {
        msg.token.denom.clone()
    };

    if is_sender_chain_source(&msg.source_port, &msg.source_channel, &full_denom_path) {
        let escrow_address = ctx.escrow_address(&msg.source_port, &msg.source_channel)?;
        ctx.send_coins(&msg.sender, &escrow_address, &msg.token)?;
        ctx.escrow_token(&msg.token)?;
    } else {
        ctx.send_coins_from_account_to_module(&msg.sender, MODULE_ID_STR, &msg.token)?;
        ctx.burn_coins(MODULE_ID_STR, &msg.token)?;
    }

    let data = FungibleTokenPacketData {
        amount: msg.token.amount.to_string(),
        denom: full_denom_path,
        memo: msg.memo,
        receiver: msg.receiver.to_string(),
        sender: msg.sender.to_string(),
    };

    ctx.send_packet(
        &msg.source_port,
        &msg.source_channel,
        msg.timeout_height,
        msg.timeout_timestamp,
        data.to_bytes()?,
    )
    .map_err(Ics20Error::channel)
}

/// Unescrows returning tokens, or mints vouchers for tokens entering this chain.
pub fn process_recv_packet(
    ctx: &mut MockContext,
    packet: &Packet,
    data: &FungibleTokenPacketData,
) -> Result<(), Ics20Error> {
    let amount: Amount = data.amount.parse()?;
    let receiver = Signer::new(&data.receiver);
    receiver.address_bytes().map_err(Ics20Error::signer)?;

    if is_receiver_chain_source(&packet.source_port, &packet.source_channel, &data.denom) {
        // sender chain is not the source, unescrow tokens
        let prefix = denom_prefix(&packet.source_port, &packet.source_channel);
        let unprefixed_denom = data.denom.strip_prefix(&prefix).unwrap_or(&data.denom);
        let coin = Coin::new(DenomTrace::parse(unprefixed_denom).ibc_denom(), amount);

        let escrow_address = ctx.escrow_address(&packet.destination_port, &packet.destination_channel)?;
        ctx.send_coins(&escrow_address, &receiver, &coin)?;
        ctx.unescrow_token(&coin)
    } else {
        // sender chain is the source, mint vouchers
        let prefixed_denom = format!(
            "{}{}",
            denom_prefix(&packet.destination_port, &packet.destination_channel),
            data.denom
        );
        let trace = DenomTrace::parse(&prefixed_denom);
        let coin = Coin::new(trace.ibc_denom(), amount);

        ctx.set_denom_trace(trace);
        ctx.mint_coins(&receiver, &coin)
    }
}

/// Gives the tokens of a failed or timed-out packet back to its sender.
pub fn refund_packet_token(
    ctx: &mut MockContext,
    packet: &Packet,
    data: &FungibleTokenPacketData,
) -> Result<(), Ics20Error> {
    let amount: Amount = data.amount.parse()?;
    let sender = Signer::new(&data.sender);
    let coin = Coin::new(DenomTrace::parse(&data.denom).ibc_denom(), amount);

    if is_sender_chain_source(&packet.source_port, &packet.source_channel, &data.denom) {
        let escrow_address = ctx.escrow_address(&packet.source_port, &packet.source_channel)?;
        ctx.send_coins(&escrow_address, &sender, &coin)?;
        ctx.unescrow_token(&coin)
    } else {
        ctx.mint_coins(&sender, &coin)
    }
}

fn validate_transfer_channel(order: Order, port_id: &PortId, version: &Version) -> Result<(), Ics20Error> {
    if order != Order::Unordered {
        return Err(Ics20Error::channel_not_unordered(order));
    }

    let bound_port = PortId::transfer();
    if port_id.as_str() != PORT_ID_STR {
        return Err(Ics20Error::invalid_port(port_id.clone(), bound_port));
    }

    if version != &Version::ics20() {
        return Err(Ics20Error::invalid_version(version.clone()));
    }

    Ok(())
}

fn app_error(e: Ics20Error) -> ChannelError {
    ChannelError::app_module(e.trace().to_string())
}

/// The ICS20 application at the bottom of the mock middleware stack.
#[derive(Clone, Debug, Default)]
pub struct MockTransferModule;

impl Module<MockContext> for MockTransferModule {
    fn on_chan_open_init(
        &self,
        _ctx: &mut MockContext,
        order: Order,
        _connection_hops: &[ConnectionId],
        port_id: &PortId,
        _channel_id: &ChannelId,
        _counterparty: &Counterparty,
        version: &Version,
    ) -> Result<Version, ChannelError> {
        validate_transfer_channel(order, port_id, version).map_err(app_error)?;
        Ok(Version::ics20())
    }

    fn on_chan_open_try(
        &self,
        _ctx: &mut MockContext,
        order: Order,
        _connection_hops: &[ConnectionId],
        port_id: &PortId,
        _channel_id: &ChannelId,
        _counterparty: &Counterparty,
        counterparty_version: &Version,
    ) -> Result<Version, ChannelError> {
        validate_transfer_channel(order, port_id, counterparty_version).map_err(app_error)?;
        Ok(Version::ics20())
    }

    fn on_chan_close_init(
        &self,
        _ctx: &mut MockContext,
        _port_id: &PortId,
        _channel_id: &ChannelId,
    ) -> Result<(), ChannelError> {
        Err(app_error(Ics20Error::cant_close_channel()))
    }

    fn on_recv_packet(
        &self,
        ctx: &mut MockContext,
        packet: &Packet,
        _relayer: &Signer,
    ) -> Option<Acknowledgement> {
        let result = FungibleTokenPacketData::from_bytes(&packet.data)
            .and_then(|data| process_recv_packet(ctx, packet, &data));

        match result {
            Ok(()) => Some(Acknowledgement::success()),
            Err(e) => Some(Acknowledgement::error(e.trace().to_string())),
        }
    }

    fn on_acknowledgement_packet(
        &self,
        ctx: &mut MockContext,
        packet: &Packet,
        acknowledgement: &[u8],
        _relayer: &Signer,
    ) -> Result<(), ChannelError> {
        let data = FungibleTokenPacketData::from_bytes(&packet.data).map_err(app_error)?;
        let acknowledgement = Acknowledgement::from_bytes(acknowledgement)?;

        if !acknowledgement.is_successful() {
            refund_packet_token(ctx, packet, &data).map_err(app_error)?;
        }

        Ok(())
    }

    fn on_timeout_packet(
        &self,
        ctx: &mut MockContext,
        packet: &Packet,
        _relayer: &Signer,
    ) -> Result<(), ChannelError> {
        let data = FungibleTokenPacketData::from_bytes(&packet.data).map_err(app_error)?;
        refund_packet_token(ctx, packet, &data).map_err(app_error)
    }
}
