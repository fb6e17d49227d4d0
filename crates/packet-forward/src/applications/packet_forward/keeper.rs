//! The forwarding engine and the resolution of forwarded packets.

use core::time::Duration;

use tracing::{debug, error};

use super::context::ForwardContext;
use super::error::Error;
use super::in_flight::{refund_packet_key, InFlightPacket};
use super::metadata::{ForwardMetadata, ForwardNext, JsonObject};
use super::params::{Decimal, Params};
use super::store::KvStore;
use crate::applications::transfer::amount::Amount;
use crate::applications::transfer::coin::Coin;
use crate::applications::transfer::context::get_escrow_address;
use crate::applications::transfer::denom::{is_sender_chain_source, DenomTrace, DENOM_PREFIX};
use crate::applications::transfer::msgs::transfer::MsgTransfer;
use crate::applications::transfer::packet::FungibleTokenPacketData;
use crate::applications::transfer::MODULE_ID_STR;
use crate::core::ics04_channel::acknowledgement::Acknowledgement;
use crate::core::ics04_channel::packet::{Packet, Sequence};
use crate::core::ics24_host::identifier::{ChannelId, PortId};
use crate::signer::Signer;
use crate::Height;

/// Text of the successful acknowledgement written for a failed forward that
/// can no longer be refunded.
pub const NONREFUNDABLE_ACK_PREFIX: &str = "packet forward failed after point of no return";

/// Where a forward attempt comes from.
#[derive(Clone, Debug)]
pub enum ForwardOrigin<'a> {
    /// First attempt, on behalf of a packet just received.
    Inbound {
        packet: &'a Packet,
        sender: &'a str,
        max_retries: u8,
        nonrefundable: bool,
    },
    /// Another attempt of a timed-out forward, continuing its record.
    Retry(InFlightPacket),
}

/// What to do about a timed-out packet.
#[derive(Debug)]
pub enum TimeoutAction {
    /// The packet was not sent by the middleware.
    NotForwarded,
    /// The forward is to be sent again.
    Retry(InFlightPacket),
    /// No retries left: the inbound packet is to be resolved with the error.
    GiveUp(InFlightPacket, Error),
}

/// Keeps the continuation records of forwarded packets in the host store and
/// moves funds through the host's transfer, bank and distribution keepers.
#[derive(Clone, Debug)]
pub struct Keeper {
    address_prefix: String,
}

impl Keeper {
    pub fn new(address_prefix: impl Into<String>) -> Self {
        Self {
            address_prefix: address_prefix.into(),
        }
    }

    /// Bech32 prefix of the accounts of this chain.
    pub fn address_prefix(&self) -> &str {
        &self.address_prefix
    }

    pub fn get_params<Ctx: ForwardContext>(&self, ctx: &Ctx) -> Params {
        ctx.get_params()
    }

    pub fn set_params<Ctx: ForwardContext>(&self, ctx: &mut Ctx, params: Params) {
        ctx.set_params(params)
    }

    pub fn get_fee_percentage<Ctx: ForwardContext>(&self, ctx: &Ctx) -> Decimal {
        self.get_params(ctx).fee_percentage
    }

    /// Pays the forwarding fee out of `token`, sends the rest from `receiver`
    /// (the account holding the received tokens) to the next hop described by
    /// `metadata`, and records how to resolve the forward under the key of the
    /// packet just sent.
    pub fn forward_transfer_packet<Ctx: ForwardContext>(
        &self,
        ctx: &mut Ctx,
        origin: ForwardOrigin<'_>,
        receiver: &Signer,
        metadata: &ForwardMetadata,
        token: Coin,
        timeout: Duration,
    ) -> Result<(), Error> {
        let fee_amount = self
            .get_fee_percentage(ctx)
            .mul_floor(token.amount)
            .ok_or_else(|| Error::fee_overflow(token.amount.to_string()))?;
        let packet_amount = token
            .amount
            .checked_sub(fee_amount)
            .ok_or_else(|| Error::fee_overflow(token.amount.to_string()))?;
        let fee_coin = Coin::new(token.denom.clone(), fee_amount);
        let packet_coin = Coin::new(token.denom, packet_amount);

        if fee_coin.is_positive() {
            receiver.address_bytes().map_err(Error::fee_depositor)?;
            ctx.fund_community_pool(&fee_coin, receiver).map_err(|e| {
                error!(error = %e.trace(), "failed to fund the community pool with the forward fee");
                Error::insufficient_funds(e)
            })?;
        }

        let memo = metadata.next_memo().map_err(|e| {
            error!(error = %e.trace(), "failed to encode the next forward memo");
            e
        })?;

        let port_id = metadata.port_id()?;
        let channel_id = metadata.channel_id()?;
        let timeout_timestamp = (ctx.host_timestamp() + timeout).map_err(Error::timeout_overflow)?;

        let msg = MsgTransfer {
            source_port: port_id.clone(),
            source_channel: channel_id.clone(),
            token: packet_coin.clone(),
            sender: receiver.clone(),
            receiver: Signer::new(&metadata.receiver),
            timeout_height: Height::zero(),
            timeout_timestamp,
            memo,
        };

        debug!(
            port = %port_id,
            channel = %channel_id,
            sender = %receiver,
            receiver = %metadata.receiver,
            amount = %packet_coin.amount,
            denom = %packet_coin.denom,
            "forwarding transfer"
        );

        let sequence = ctx.transfer(msg).map_err(|e| {
            error!(
                port = %port_id,
                channel = %channel_id,
                sender = %receiver,
                receiver = %metadata.receiver,
                amount = %packet_coin.amount,
                denom = %packet_coin.denom,
                error = %e.trace(),
                "failed to forward transfer"
            );
            Error::insufficient_funds(e)
        })?;

        let in_flight_packet = match origin {
            ForwardOrigin::Inbound {
                packet,
                sender,
                max_retries,
                nonrefundable,
            } => InFlightPacket {
                original_sender_address: sender.to_string(),
                refund_channel_id: packet.destination_channel.clone(),
                refund_port_id: packet.destination_port.clone(),
                packet_src_channel_id: packet.source_channel.clone(),
                packet_src_port_id: packet.source_port.clone(),
                packet_timeout_timestamp: packet.timeout_timestamp,
                packet_timeout_height: packet.timeout_height,
                packet_data: packet.data.clone(),
                refund_sequence: packet.sequence,
                retries_remaining: i32::from(max_retries),
                timeout,
                nonrefundable,
            },
            ForwardOrigin::Retry(mut in_flight_packet) => {
                in_flight_packet.retries_remaining -= 1;
                in_flight_packet
            }
        };

        let key = refund_packet_key(&channel_id, &port_id, sequence);
        ctx.store_mut().set(key, in_flight_packet.encode_vec());

        Ok(())
    }

    /// Decides whether the forward of a timed-out packet is to be sent again.
    pub fn timeout_should_retry<Ctx: ForwardContext>(
        &self,
        ctx: &Ctx,
        packet: &Packet,
    ) -> Result<TimeoutAction, Error> {
        let key = refund_packet_key(&packet.source_channel, &packet.source_port, packet.sequence);
        let Some(bytes) = ctx.store().get(&key) else {
            return Ok(TimeoutAction::NotForwarded);
        };

        let in_flight_packet = InFlightPacket::decode_vec(&bytes)?;

        if in_flight_packet.retries_remaining <= 0 {
            error!(
                key = %String::from_utf8_lossy(&key),
                original_sender_address = %in_flight_packet.original_sender_address,
                refund_channel_id = %in_flight_packet.refund_channel_id,
                refund_port_id = %in_flight_packet.refund_port_id,
                "giving up on forwarded packet after max retries"
            );
            let err = Error::max_retries_exceeded(
                in_flight_packet.refund_channel_id.clone(),
                in_flight_packet.refund_port_id.clone(),
            );
            return Ok(TimeoutAction::GiveUp(in_flight_packet, err));
        }

        Ok(TimeoutAction::Retry(in_flight_packet))
    }

    /// Sends the tokens of the timed-out `packet` again over the same
    /// channel, to the same receiver and with the same memo. The record of the
    /// timed-out packet is replaced by one for the new packet.
    pub fn retry_timeout<Ctx: ForwardContext>(
        &self,
        ctx: &mut Ctx,
        packet: &Packet,
        data: &FungibleTokenPacketData,
        in_flight_packet: InFlightPacket,
    ) -> Result<(), Error> {
        let mut metadata = ForwardMetadata {
            receiver: data.receiver.clone(),
            port: packet.source_port.to_string(),
            channel: packet.source_channel.to_string(),
            ..Default::default()
        };

        if !data.memo.is_empty() {
            let next: JsonObject = serde_json::from_str(&data.memo).map_err(Error::memo_parse)?;
            metadata.next = Some(ForwardNext::Parsed(next));
        }

        let amount: Amount = data.amount.parse().map_err(|_| {
            error!(
                original_sender_address = %in_flight_packet.original_sender_address,
                refund_channel_id = %in_flight_packet.refund_channel_id,
                refund_port_id = %in_flight_packet.refund_port_id,
                retries_remaining = in_flight_packet.retries_remaining,
                amount = %data.amount,
                "invalid amount in timed out packet, cannot retry"
            );
            Error::invalid_retry_amount(data.amount.clone())
        })?;

        let token = Coin::new(DenomTrace::parse(&data.denom).ibc_denom(), amount);

        self.remove_in_flight_packet(ctx, packet);

        let timeout = in_flight_packet.timeout;
        self.forward_transfer_packet(
            ctx,
            ForwardOrigin::Retry(in_flight_packet),
            &Signer::new(&data.sender),
            &metadata,
            token,
            timeout,
        )
    }

    /// Deletes the record of a packet sent by the middleware, if any.
    pub fn remove_in_flight_packet<Ctx: ForwardContext>(&self, ctx: &mut Ctx, packet: &Packet) {
        let key = refund_packet_key(&packet.source_channel, &packet.source_port, packet.sequence);
        if ctx.store().has(&key) {
            ctx.store_mut().delete(&key);
        }
    }

    /// Removes and returns the record of the packet sent on `channel_id`/`port_id`
    /// with `sequence`. `None` means the packet was not sent by the middleware.
    pub fn get_and_clear_in_flight_packet<Ctx: ForwardContext>(
        &self,
        ctx: &mut Ctx,
        channel_id: &ChannelId,
        port_id: &PortId,
        sequence: Sequence,
    ) -> Result<Option<InFlightPacket>, Error> {
        let key = refund_packet_key(channel_id, port_id, sequence);
        let Some(bytes) = ctx.store().get(&key) else {
            return Ok(None);
        };

        ctx.store_mut().delete(&key);

        InFlightPacket::decode_vec(&bytes).map(Some)
    }

    /// Resolves the inbound packet of a forward with the outcome `ack` of
    /// the forwarded `packet`, whose packet data is `data`.
    ///
    /// On failure the tokens the middleware holds in escrow for the forward
    /// are moved back to the escrow of the inbound channel, or burned if they
    /// are vouchers of that channel, unless the record is nonrefundable. In
    /// that case a successful acknowledgement carrying the error is written.
    pub fn write_acknowledgement_for_forwarded_packet<Ctx: ForwardContext>(
        &self,
        ctx: &mut Ctx,
        packet: &Packet,
        data: &FungibleTokenPacketData,
        in_flight_packet: &InFlightPacket,
        ack: Acknowledgement,
    ) -> Result<(), Error> {
        let refund_packet = in_flight_packet.refund_packet();

        if !ack.is_successful() {
            if in_flight_packet.nonrefundable {
                let result = format!("{}: {}", NONREFUNDABLE_ACK_PREFIX, ack.error_text());
                return ctx
                    .write_acknowledgement(&refund_packet, &Acknowledgement::result(result.into_bytes()))
                    .map_err(Error::channel);
            }

            self.refund_forwarded_tokens(ctx, packet, data, in_flight_packet)?;
        }

        ctx.write_acknowledgement(&refund_packet, &ack)
            .map_err(Error::channel)
    }

    fn refund_forwarded_tokens<Ctx: ForwardContext>(
        &self,
        ctx: &mut Ctx,
        packet: &Packet,
        data: &FungibleTokenPacketData,
        in_flight_packet: &InFlightPacket,
    ) -> Result<(), Error> {
        let full_denom_path = if data.denom.starts_with(&format!("{}/", DENOM_PREFIX)) {
            ctx.denom_path_from_hash(&data.denom)
                .map_err(Error::transfer)?
        } else {
            data.denom.clone()
        };

        // vouchers of the forward channel were burned when sent, nothing is held here
        if !is_sender_chain_source(&packet.source_port, &packet.source_channel, &full_denom_path) {
            return Ok(());
        }

        let amount: Amount = data
            .amount
            .parse()
            .map_err(|_| Error::invalid_refund_amount(data.amount.clone()))?;
        let token = Coin::new(DenomTrace::parse(&full_denom_path).ibc_denom(), amount);

        let escrow_address =
            get_escrow_address(&self.address_prefix, &packet.source_port, &packet.source_channel)
                .map_err(Error::transfer)?;

        if is_sender_chain_source(
            &in_flight_packet.refund_port_id,
            &in_flight_packet.refund_channel_id,
            &full_denom_path,
        ) {
            let refund_escrow_address = get_escrow_address(
                &self.address_prefix,
                &in_flight_packet.refund_port_id,
                &in_flight_packet.refund_channel_id,
            )
            .map_err(Error::transfer)?;

            ctx.send_coins(&escrow_address, &refund_escrow_address, &token)
                .map_err(Error::refund_escrow_transfer)?;
        } else {
            ctx.send_coins_from_account_to_module(&escrow_address, MODULE_ID_STR, &token)
                .map_err(Error::escrow_to_module_transfer)?;
            ctx.burn_coins(MODULE_ID_STR, &token)
                .map_err(Error::burn)?;
        }

        self.unescrow_token(ctx, &token)
    }

    /// Deducts `token` from the total escrow of its denomination.
    fn unescrow_token<Ctx: ForwardContext>(&self, ctx: &mut Ctx, token: &Coin) -> Result<(), Error> {
        let current_total_escrow = ctx.get_total_escrow_for_denom(&token.denom);
        let new_total_escrow = current_total_escrow
            .amount
            .checked_sub(token.amount)
            .ok_or_else(|| Error::negative_total_escrow(token.denom.clone()))?;

        ctx.set_total_escrow_for_denom(Coin::new(token.denom.clone(), new_total_escrow));
        Ok(())
    }
}
