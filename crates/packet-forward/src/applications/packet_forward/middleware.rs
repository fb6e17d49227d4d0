//! The packet-forward middleware, stacked on top of an ICS20 application.

use core::time::Duration;

use tracing::{debug, error};

use super::context::ForwardContext;
use super::error::Error;
use super::keeper::{ForwardOrigin, Keeper, TimeoutAction};
use super::metadata::PacketMetadata;
use super::receiver::get_receiver;
use super::ERROR_ACK_PREFIX;
use crate::applications::transfer::amount::Amount;
use crate::applications::transfer::coin::Coin;
use crate::applications::transfer::denom::{denom_prefix, DenomTrace};
use crate::applications::transfer::packet::FungibleTokenPacketData;
use crate::config::ForwardConfig;
use crate::core::ics04_channel::acknowledgement::Acknowledgement;
use crate::core::ics04_channel::channel::{Counterparty, Order};
use crate::core::ics04_channel::error::Error as ChannelError;
use crate::core::ics04_channel::packet::{Packet, Sequence};
use crate::core::ics04_channel::Version;
use crate::core::ics24_host::identifier::{ChannelId, ConnectionId, PortId};
use crate::core::ics26_routing::context::{Middleware, Module};
use crate::signer::Signer;
use crate::timestamp::Timestamp;
use crate::Height;

/// The error acknowledgement written for a packet the middleware failed to handle.
pub fn new_error_acknowledgement(err: &Error) -> Acknowledgement {
    Acknowledgement::error(format!("{}: {}", ERROR_ACK_PREFIX, err.message()))
}

/// The denomination on this chain of tokens received over
/// `port`/`channel` with denomination `denom` on the sending side.
///
/// Tokens returning to the chain they came from are unwound to the base
/// denomination, or to the voucher of the remaining trace. Any other tokens
/// become vouchers of `port`/`channel`.
pub fn get_denom_for_this_chain(
    port: &PortId,
    channel: &ChannelId,
    counterparty_port: &PortId,
    counterparty_channel: &ChannelId,
    denom: &str,
) -> String {
    let counterparty_prefix = denom_prefix(counterparty_port, counterparty_channel);

    if let Some(unwound_denom) = denom.strip_prefix(&counterparty_prefix) {
        let denom_trace = DenomTrace::parse(unwound_denom);
        if denom_trace.path.is_empty() {
            return unwound_denom.to_string();
        }
        return denom_trace.ibc_denom();
    }

    let prefixed_denom = format!("{}{}", denom_prefix(port, channel), denom);
    DenomTrace::parse(&prefixed_denom).ibc_denom()
}

fn app_error(e: Error) -> ChannelError {
    ChannelError::app_module(e.message())
}

/// Wraps the ICS20 application `App`. Transfers whose memo carries forwarding
/// instructions are received on behalf of an intermediate account and sent
/// on to the next chain; the acknowledgement of the inbound packet is written
/// once the outcome of the forward is known.
#[derive(Clone, Debug)]
pub struct PacketForwardMiddleware<App> {
    app: App,
    keeper: Keeper,
    retries_on_timeout: u8,
    forward_timeout: Duration,
    /// Not used by the middleware, which never issues refund transfers of its
    /// own. Kept for hosts that refund failed forwards with a new transfer.
    refund_timeout: Duration,
}

impl<App> PacketForwardMiddleware<App> {
    pub fn new(app: App, config: &ForwardConfig) -> Self {
        Self {
            app,
            keeper: Keeper::new(config.address_prefix.clone()),
            retries_on_timeout: config.retries_on_timeout,
            forward_timeout: config.forward_timeout,
            refund_timeout: config.refund_timeout,
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn keeper(&self) -> &Keeper {
        &self.keeper
    }

    pub fn retries_on_timeout(&self) -> u8 {
        self.retries_on_timeout
    }

    pub fn forward_timeout(&self) -> Duration {
        self.forward_timeout
    }

    /// Relative timeout hosts should give to refund transfers they issue.
    pub fn refund_timeout(&self) -> Duration {
        self.refund_timeout
    }

    /// Hands the packet to the wrapped app and forwards the received tokens.
    /// `Ok(None)` means the forward is in flight and the acknowledgement is
    /// written later, `Ok(Some(_))` carries the failed acknowledgement of the
    /// wrapped app.
    fn forward_packet<Ctx>(
        &self,
        ctx: &mut Ctx,
        packet: &Packet,
        mut data: FungibleTokenPacketData,
        metadata: PacketMetadata,
        relayer: &Signer,
    ) -> Result<Option<Acknowledgement>, Error>
    where
        Ctx: ForwardContext,
        App: Module<Ctx>,
    {
        let metadata = metadata.forward;
        let flags = ctx.forward_flags();

        metadata.validate()?;

        let override_receiver = get_receiver(
            self.keeper.address_prefix(),
            &packet.destination_channel,
            &data.sender,
        )?;

        if !flags.processed {
            data.receiver = override_receiver.to_string();
            data.memo = String::new();

            let packet = Packet {
                data: data.to_bytes().map_err(Error::packet_data_encode)?,
                ..packet.clone()
            };

            match self.app.on_recv_packet(ctx, &packet, relayer) {
                Some(ack) if ack.is_successful() => {}
                ack => return Ok(ack),
            }
        }

        let denom_on_this_chain = if flags.disable_denom_composition {
            data.denom.clone()
        } else {
            get_denom_for_this_chain(
                &packet.destination_port,
                &packet.destination_channel,
                &packet.source_port,
                &packet.source_channel,
                &data.denom,
            )
        };

        let amount: Amount = data
            .amount
            .parse()
            .map_err(|_| Error::invalid_forward_amount(data.amount.clone()))?;

        let token = Coin::new(denom_on_this_chain, amount);

        let timeout = if metadata.timeout.is_zero() {
            self.forward_timeout
        } else {
            metadata.timeout
        };

        let retries = metadata.retries.unwrap_or(self.retries_on_timeout);

        self.keeper.forward_transfer_packet(
            ctx,
            ForwardOrigin::Inbound {
                packet,
                sender: &data.sender,
                max_retries: retries,
                nonrefundable: flags.nonrefundable,
            },
            &override_receiver,
            &metadata,
            token,
            timeout,
        )?;

        Ok(None)
    }
}

impl<Ctx, App> Module<Ctx> for PacketForwardMiddleware<App>
where
    Ctx: ForwardContext,
    App: Module<Ctx>,
{
    fn on_chan_open_init(
        &self,
        ctx: &mut Ctx,
        order: Order,
        connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty: &Counterparty,
        version: &Version,
    ) -> Result<Version, ChannelError> {
        self.app.on_chan_open_init(
            ctx,
            order,
            connection_hops,
            port_id,
            channel_id,
            counterparty,
            version,
        )
    }

    fn on_chan_open_try(
        &self,
        ctx: &mut Ctx,
        order: Order,
        connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty: &Counterparty,
        counterparty_version: &Version,
    ) -> Result<Version, ChannelError> {
        self.app.on_chan_open_try(
            ctx,
            order,
            connection_hops,
            port_id,
            channel_id,
            counterparty,
            counterparty_version,
        )
    }

    fn on_chan_open_ack(
        &self,
        ctx: &mut Ctx,
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty_channel_id: &ChannelId,
        counterparty_version: &Version,
    ) -> Result<(), ChannelError> {
        self.app.on_chan_open_ack(
            ctx,
            port_id,
            channel_id,
            counterparty_channel_id,
            counterparty_version,
        )
    }

    fn on_chan_open_confirm(
        &self,
        ctx: &mut Ctx,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<(), ChannelError> {
        self.app.on_chan_open_confirm(ctx, port_id, channel_id)
    }

    fn on_chan_close_init(
        &self,
        ctx: &mut Ctx,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<(), ChannelError> {
        self.app.on_chan_close_init(ctx, port_id, channel_id)
    }

    fn on_chan_close_confirm(
        &self,
        ctx: &mut Ctx,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<(), ChannelError> {
        self.app.on_chan_close_confirm(ctx, port_id, channel_id)
    }

    fn on_recv_packet(
        &self,
        ctx: &mut Ctx,
        packet: &Packet,
        relayer: &Signer,
    ) -> Option<Acknowledgement> {
        let data = match FungibleTokenPacketData::from_bytes(&packet.data) {
            Ok(data) => data,
            Err(_) => {
                debug!(sequence = %packet.sequence, "packet data is not ICS20, passing packet to the app");
                return self.app.on_recv_packet(ctx, packet, relayer);
            }
        };

        debug!(
            sequence = %packet.sequence,
            src_channel = %packet.source_channel,
            src_port = %packet.source_port,
            dst_channel = %packet.destination_channel,
            dst_port = %packet.destination_port,
            amount = %data.amount,
            denom = %data.denom,
            memo = %data.memo,
            "received packet"
        );

        let metadata = match PacketMetadata::from_memo(&data.memo) {
            Ok(Some(metadata)) => metadata,
            Ok(None) => {
                debug!("no forward metadata in memo, passing packet to the app");
                return self.app.on_recv_packet(ctx, packet, relayer);
            }
            Err(e) => return Some(new_error_acknowledgement(&e)),
        };

        match self.forward_packet(ctx, packet, data, metadata, relayer) {
            Ok(ack) => ack,
            Err(e) => {
                error!(sequence = %packet.sequence, error = %e.trace(), "failed to forward received packet");
                Some(new_error_acknowledgement(&e))
            }
        }
    }

    fn on_acknowledgement_packet(
        &self,
        ctx: &mut Ctx,
        packet: &Packet,
        acknowledgement: &[u8],
        relayer: &Signer,
    ) -> Result<(), ChannelError> {
        let data = match FungibleTokenPacketData::from_bytes(&packet.data) {
            Ok(data) => data,
            Err(e) => {
                error!(
                    sequence = %packet.sequence,
                    src_channel = %packet.source_channel,
                    src_port = %packet.source_port,
                    dst_channel = %packet.destination_channel,
                    dst_port = %packet.destination_port,
                    error = %e.trace(),
                    "packet data of acknowledged packet is not ICS20, passing acknowledgement to the app"
                );
                return self
                    .app
                    .on_acknowledgement_packet(ctx, packet, acknowledgement, relayer);
            }
        };

        debug!(
            sequence = %packet.sequence,
            src_channel = %packet.source_channel,
            src_port = %packet.source_port,
            dst_channel = %packet.destination_channel,
            dst_port = %packet.destination_port,
            amount = %data.amount,
            denom = %data.denom,
            "received acknowledgement"
        );

        let ack = Acknowledgement::from_bytes(acknowledgement)?;

        let in_flight_packet = self
            .keeper
            .get_and_clear_in_flight_packet(
                ctx,
                &packet.source_channel,
                &packet.source_port,
                packet.sequence,
            )
            .map_err(app_error)?;

        match in_flight_packet {
            Some(in_flight_packet) => self
                .keeper
                .write_acknowledgement_for_forwarded_packet(ctx, packet, &data, &in_flight_packet, ack)
                .map_err(app_error),
            None => self
                .app
                .on_acknowledgement_packet(ctx, packet, acknowledgement, relayer),
        }
    }

    fn on_timeout_packet(
        &self,
        ctx: &mut Ctx,
        packet: &Packet,
        relayer: &Signer,
    ) -> Result<(), ChannelError> {
        let data = match FungibleTokenPacketData::from_bytes(&packet.data) {
            Ok(data) => data,
            Err(e) => {
                error!(
                    sequence = %packet.sequence,
                    src_channel = %packet.source_channel,
                    src_port = %packet.source_port,
                    dst_channel = %packet.destination_channel,
                    dst_port = %packet.destination_port,
                    error = %e.trace(),
                    "packet data of timed out packet is not ICS20, passing timeout to the app"
                );
                return self.app.on_timeout_packet(ctx, packet, relayer);
            }
        };

        debug!(
            sequence = %packet.sequence,
            src_channel = %packet.source_channel,
            src_port = %packet.source_port,
            dst_channel = %packet.destination_channel,
            dst_port = %packet.destination_port,
            amount = %data.amount,
            denom = %data.denom,
            "packet timed out"
        );

        match self.keeper.timeout_should_retry(ctx, packet).map_err(app_error)? {
            TimeoutAction::NotForwarded => self.app.on_timeout_packet(ctx, packet, relayer),
            TimeoutAction::GiveUp(in_flight_packet, err) => {
                self.keeper.remove_in_flight_packet(ctx, packet);
                self.keeper
                    .write_acknowledgement_for_forwarded_packet(
                        ctx,
                        packet,
                        &data,
                        &in_flight_packet,
                        new_error_acknowledgement(&err),
                    )
                    .map_err(app_error)
            }
            TimeoutAction::Retry(in_flight_packet) => {
                self.app.on_timeout_packet(ctx, packet, relayer)?;
                self.keeper
                    .retry_timeout(ctx, packet, &data, in_flight_packet)
                    .map_err(app_error)
            }
        }
    }
}

impl<Ctx, App> Middleware<Ctx> for PacketForwardMiddleware<App>
where
    Ctx: ForwardContext,
    App: Module<Ctx>,
{
    fn send_packet(
        &self,
        ctx: &mut Ctx,
        source_port: &PortId,
        source_channel: &ChannelId,
        timeout_height: Height,
        timeout_timestamp: Timestamp,
        data: Vec<u8>,
    ) -> Result<Sequence, ChannelError> {
        ctx.send_packet(source_port, source_channel, timeout_height, timeout_timestamp, data)
    }

    fn write_acknowledgement(
        &self,
        ctx: &mut Ctx,
        packet: &Packet,
        acknowledgement: &Acknowledgement,
    ) -> Result<(), ChannelError> {
        ctx.write_acknowledgement(packet, acknowledgement)
    }

    fn get_app_version(&self, ctx: &Ctx, port_id: &PortId, channel_id: &ChannelId) -> Option<Version> {
        ctx.get_app_version(port_id, channel_id)
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use serde_json::json;
    use test_log::test;

    use super::{get_denom_for_this_chain, new_error_acknowledgement, PacketForwardMiddleware};
    use crate::applications::packet_forward::error::Error;
    use crate::applications::packet_forward::context::{ForwardContext, ForwardFlags};
    use crate::applications::packet_forward::keeper::{TimeoutAction, NONREFUNDABLE_ACK_PREFIX};
    use crate::applications::packet_forward::params::{Decimal, Params};
    use crate::applications::packet_forward::receiver::get_receiver;
    use crate::applications::transfer::coin::Coin;
    use crate::applications::transfer::amount::Amount;
    use crate::applications::transfer::context::TransferKeeper;
    use crate::applications::transfer::denom::DenomTrace;
    use crate::applications::transfer::msgs::transfer::MsgTransfer;
    use crate::applications::transfer::packet::FungibleTokenPacketData;
    use crate::config::ForwardConfig;
    use crate::core::ics04_channel::acknowledgement::Acknowledgement;
    use crate::core::ics04_channel::channel::{Counterparty, Order};
    use crate::core::ics04_channel::packet::Packet;
    use crate::core::ics04_channel::Version;
    use crate::core::ics24_host::identifier::{ChannelId, PortId};
    use crate::core::ics26_routing::context::{Middleware, Module};
    use crate::mock::context::MOCK_HOST_TIMESTAMP;
    use crate::mock::network::{relayer_account, MockNetwork};
    use crate::mock::transfer::MockTransferModule;
    use crate::signer::Signer;
    use crate::timestamp::Timestamp;
    use crate::Height;

    fn account(seed: u8) -> Signer {
        Signer::from_address_bytes("cosmos", &[seed; 20]).unwrap()
    }

    fn alice() -> Signer {
        account(1)
    }

    fn bob() -> Signer {
        account(2)
    }

    /// Forwarding instructions sending the tokens one hop further for every
    /// receiver, each time over `channel-1`.
    fn route_memo(receivers: &[&str]) -> String {
        let mut next: Option<serde_json::Value> = None;
        for receiver in receivers.iter().rev() {
            let mut forward = json!({
                "receiver": receiver,
                "port": "transfer",
                "channel": "channel-1",
            });
            if let Some(next) = next.take() {
                forward["next"] = next;
            }
            next = Some(json!({ "forward": forward }));
        }
        next.map(|memo| memo.to_string()).unwrap_or_default()
    }

    /// A network of `len` chains where alice holds 1000uatom on the first chain.
    fn network(len: usize, config: &ForwardConfig) -> MockNetwork {
        let mut network = MockNetwork::linear(len, config);
        network
            .chain_mut(0)
            .ctx
            .mint_coins(&alice(), &Coin::new("uatom", 1000u64))
            .unwrap();
        network
    }

    /// Sends `amount`uatom from alice on the first chain to the second one.
    fn send_from_origin(network: &mut MockNetwork, amount: u64, receiver: &str, memo: String) -> Packet {
        let ctx = &mut network.chain_mut(0).ctx;
        ctx.transfer(MsgTransfer {
            source_port: PortId::transfer(),
            source_channel: MockNetwork::channel_to_next(),
            token: Coin::new("uatom", amount),
            sender: alice(),
            receiver: Signer::new(receiver),
            timeout_height: Height::zero(),
            timeout_timestamp: Timestamp::none(),
            memo,
        })
        .unwrap();
        ctx.sent_packets().last().cloned().unwrap()
    }

    /// Denomination on chain `hops` of uatom sent from the first chain.
    fn voucher(hops: usize) -> String {
        let path = vec!["transfer/channel-0"; hops].join("/");
        DenomTrace::parse(&format!("{}/uatom", path)).ibc_denom()
    }

    /// The account holding the tokens of `original_sender` while they are
    /// forwarded from the second chain.
    fn intermediate(original_sender: &Signer) -> Signer {
        get_receiver("cosmos", &MockNetwork::channel_to_previous(), original_sender.as_str()).unwrap()
    }

    fn escrowed(network: &MockNetwork, index: usize, denom: &str) -> Amount {
        network
            .chain(index)
            .ctx
            .escrow_balance(&PortId::transfer(), &MockNetwork::channel_to_next(), denom)
    }

    fn assert_no_in_flight_packets(network: &MockNetwork) {
        for index in 0..network.len() {
            let chain = network.chain(index);
            assert_eq!(chain.ctx.in_flight_packet_count(), 0, "records left on chain {}", index);
            let genesis = chain.app.keeper().export_genesis(&chain.ctx).unwrap();
            assert!(genesis.in_flight_packets.is_empty());
        }
    }

    #[test]
    fn denom_for_this_chain() {
        struct Test {
            name: &'static str,
            denom: &'static str,
            want: String,
        }

        let tests = vec![
            Test {
                name: "native token of the sender",
                denom: "uatom",
                want: DenomTrace::parse("transfer/channel-0/uatom").ibc_denom(),
            },
            Test {
                name: "token returning home",
                denom: "transfer/channel-1/uatom",
                want: "uatom".to_string(),
            },
            Test {
                name: "token unwinding one hop of a longer trace",
                denom: "transfer/channel-1/transfer/channel-5/uatom",
                want: DenomTrace::parse("transfer/channel-5/uatom").ibc_denom(),
            },
            Test {
                name: "voucher of another chain",
                denom: "transfer/channel-7/uatom",
                want: DenomTrace::parse("transfer/channel-0/transfer/channel-7/uatom").ibc_denom(),
            },
        ];

        for test in tests {
            let got = get_denom_for_this_chain(
                &PortId::transfer(),
                &ChannelId::new(0),
                &PortId::transfer(),
                &ChannelId::new(1),
                test.denom,
            );
            assert_eq!(got, test.want, "{}", test.name);
        }
    }

    #[test]
    fn error_acknowledgement_text() {
        let err = Error::max_retries_exceeded(ChannelId::new(0), PortId::transfer());
        assert_eq!(
            new_error_acknowledgement(&err),
            Acknowledgement::error(
                "packet-forward-middleware error: giving up on packet on channel (channel-0) \
                 port (transfer) after max retries"
            )
        );

        let err = Error::empty_receiver();
        assert_eq!(
            new_error_acknowledgement(&err),
            Acknowledgement::error(
                "packet-forward-middleware error: failed to validate metadata. receiver cannot be empty"
            )
        );
    }

    #[test]
    fn plain_transfer_passes_through() {
        let mut network = network(2, &ForwardConfig::default());
        let packet = send_from_origin(&mut network, 100, bob().as_str(), String::new());

        network.deliver_packets(0).unwrap();

        let chain = network.chain(1);
        assert_eq!(chain.ctx.balance(&bob(), &voucher(1)), 100u64.into());
        assert_eq!(
            chain
                .ctx
                .acknowledgement(&packet.destination_port, &packet.destination_channel, packet.sequence),
            Some(&Acknowledgement::success())
        );
        assert_eq!(chain.ctx.in_flight_packet_count(), 0);
        assert!(chain.ctx.sent_packets().is_empty());
    }

    #[test]
    fn memo_without_forward_passes_through() {
        for memo in [r#"{"wasm":{"contract":"x"}}"#, r#"{"forward":null}"#, "not json", "[1,2]"] {
            let mut network = network(2, &ForwardConfig::default());
            send_from_origin(&mut network, 100, bob().as_str(), memo.to_string());

            network.relay().unwrap();

            assert_eq!(network.chain(1).ctx.balance(&bob(), &voucher(1)), 100u64.into(), "memo {}", memo);
            assert!(network.chain(1).ctx.sent_packets().is_empty());
        }
    }

    #[test]
    fn non_transfer_packet_passes_through() {
        let network = network(2, &ForwardConfig::default());
        let mut chain = network.chain(1).clone();
        let packet = Packet {
            sequence: 1.into(),
            source_port: PortId::transfer(),
            source_channel: ChannelId::new(1),
            destination_port: PortId::transfer(),
            destination_channel: ChannelId::new(0),
            data: b"hello".to_vec(),
            timeout_height: Height::zero(),
            timeout_timestamp: Timestamp::none(),
        };

        let ack = chain.recv_packet(&packet).unwrap().unwrap();
        assert!(!ack.is_successful());
        assert!(!ack.error_text().starts_with("packet-forward-middleware error"));
        assert_eq!(chain.ctx.in_flight_packet_count(), 0);
    }

    #[test]
    fn forward_deducts_the_fee() {
        let mut network = network(3, &ForwardConfig::default());
        network
            .chain_mut(1)
            .ctx
            .set_params(Params::new(Decimal::percent(10)));

        send_from_origin(&mut network, 100, "pfm", route_memo(&[bob().as_str()]));
        network.deliver_packets(0).unwrap();

        let forwarded = network.chain(1).ctx.sent_packets()[0].clone();
        let data = FungibleTokenPacketData::from_bytes(&forwarded.data).unwrap();
        assert_eq!(data.amount, "90");
        assert_eq!(data.denom, "transfer/channel-0/uatom");
        assert_eq!(data.sender, intermediate(&alice()).to_string());
        assert_eq!(data.receiver, bob().to_string());

        network.relay().unwrap();

        assert_eq!(network.chain(2).ctx.balance(&bob(), &voucher(2)), 90u64.into());
        assert_eq!(network.chain(1).ctx.community_pool_balance(&voucher(1)), 10u64.into());
        assert!(network
            .chain(1)
            .ctx
            .balance(&intermediate(&alice()), &voucher(1))
            .is_zero());
        assert_eq!(escrowed(&network, 1, &voucher(1)), 90u64.into());
        assert_eq!(network.chain(0).ctx.balance(&alice(), "uatom"), 900u64.into());
        assert_no_in_flight_packets(&network);
    }

    #[test]
    fn multi_hop_round_trip() {
        let mut network = network(4, &ForwardConfig::default());
        let origin_packet = send_from_origin(&mut network, 100, "pfm", route_memo(&["pfm", bob().as_str()]));

        network.deliver_packets(0).unwrap();
        assert_eq!(network.chain(1).ctx.in_flight_packet_count(), 1);
        assert_eq!(
            network.chain(1).ctx.acknowledgement(
                &origin_packet.destination_port,
                &origin_packet.destination_channel,
                origin_packet.sequence
            ),
            None
        );

        let forwarded = network.chain(1).ctx.sent_packets()[0].clone();
        let data = FungibleTokenPacketData::from_bytes(&forwarded.data).unwrap();
        assert_eq!(data.memo, route_memo(&[bob().as_str()]));

        network.deliver_packets(1).unwrap();
        assert_eq!(network.chain(2).ctx.in_flight_packet_count(), 1);

        network.deliver_packets(2).unwrap();
        assert_eq!(network.chain(3).ctx.balance(&bob(), &voucher(3)), 100u64.into());
        assert!(network.chain(3).ctx.sent_packets().is_empty());

        assert_eq!(network.deliver_acknowledgements(3).unwrap(), 1);
        assert_eq!(network.chain(2).ctx.in_flight_packet_count(), 0);
        assert_eq!(network.chain(1).ctx.in_flight_packet_count(), 1);

        assert_eq!(network.deliver_acknowledgements(2).unwrap(), 1);
        assert_eq!(network.chain(1).ctx.in_flight_packet_count(), 0);

        assert_eq!(network.deliver_acknowledgements(1).unwrap(), 1);
        let delivered = network.chain(0).delivered_acknowledgements();
        assert_eq!(delivered, &[(origin_packet, Acknowledgement::success())]);

        assert_eq!(network.relay().unwrap(), 0);
        assert_eq!(network.chain(0).ctx.balance(&alice(), "uatom"), 900u64.into());
        assert_no_in_flight_packets(&network);
    }

    #[test]
    fn forward_timeout_defaults_and_overrides() {
        let config = ForwardConfig {
            forward_timeout: Duration::from_secs(600),
            ..ForwardConfig::default()
        };

        let mut network = network(3, &config);
        send_from_origin(&mut network, 100, "pfm", route_memo(&[bob().as_str()]));
        network.deliver_packets(0).unwrap();
        assert_eq!(
            network.chain(1).ctx.sent_packets()[0].timeout_timestamp,
            (MOCK_HOST_TIMESTAMP + Duration::from_secs(600)).unwrap()
        );

        let mut network = self::network(3, &config);
        let memo = json!({
            "forward": {
                "receiver": bob().as_str(),
                "port": "transfer",
                "channel": "channel-1",
                "timeout": "1m",
            }
        });
        send_from_origin(&mut network, 100, "pfm", memo.to_string());
        network.deliver_packets(0).unwrap();
        assert_eq!(
            network.chain(1).ctx.sent_packets()[0].timeout_timestamp,
            (MOCK_HOST_TIMESTAMP + Duration::from_secs(60)).unwrap()
        );
    }

    #[test]
    fn invalid_forward_metadata_is_rejected() {
        let memos = [
            r#"{"forward":{"port":"transfer","channel":"channel-1"}}"#.to_string(),
            r#"{"forward":{"receiver":"bob","port":"transfer","channel":"not a channel"}}"#.to_string(),
            r#"{"forward":{"receiver":"bob","port":"transfer","channel":"channel-1","retries":-1}}"#.to_string(),
            r#"{"forward":"bob"}"#.to_string(),
        ];

        for memo in memos {
            let mut network = network(3, &ForwardConfig::default());
            let packet = send_from_origin(&mut network, 100, "pfm", memo.clone());

            network.deliver_packets(0).unwrap();

            let chain = network.chain(1);
            let ack = chain
                .ctx
                .acknowledgement(&packet.destination_port, &packet.destination_channel, packet.sequence)
                .cloned()
                .unwrap();
            assert!(
                ack.error_text().starts_with("packet-forward-middleware error: "),
                "memo {} acknowledged with {}",
                memo,
                ack
            );
            assert_eq!(chain.ctx.in_flight_packet_count(), 0);
            assert!(chain
                .ctx
                .balance(&intermediate(&alice()), &voucher(1))
                .is_zero());

            network.relay().unwrap();
            assert_eq!(network.chain(0).ctx.balance(&alice(), "uatom"), 1000u64.into());
        }
    }

    #[test]
    fn failed_forward_rolls_back_the_receive() {
        let mut network = network(3, &ForwardConfig::default());
        let memo = json!({
            "forward": { "receiver": bob().as_str(), "port": "transfer", "channel": "channel-9" }
        });
        let packet = send_from_origin(&mut network, 100, "pfm", memo.to_string());

        network.deliver_packets(0).unwrap();

        let chain = network.chain(1);
        let ack = chain
            .ctx
            .acknowledgement(&packet.destination_port, &packet.destination_channel, packet.sequence)
            .cloned()
            .unwrap();
        assert!(ack.error_text().starts_with("packet-forward-middleware error: insufficient funds"));
        assert!(chain
            .ctx
            .balance(&intermediate(&alice()), &voucher(1))
            .is_zero());
        assert_eq!(chain.ctx.in_flight_packet_count(), 0);

        network.relay().unwrap();
        assert_eq!(network.chain(0).ctx.balance(&alice(), "uatom"), 1000u64.into());
        assert_eq!(escrowed(&network, 0, "uatom"), 0u64.into());
    }

    #[test]
    fn failure_downstream_is_refunded() {
        let mut network = network(3, &ForwardConfig::default());
        send_from_origin(&mut network, 100, "pfm", route_memo(&["not-an-address"]));

        network.relay().unwrap();

        let failure = network.chain(2).ctx.acknowledgement(
            &PortId::transfer(),
            &MockNetwork::channel_to_previous(),
            1.into(),
        );
        let failure = failure.cloned().unwrap();
        assert!(!failure.is_successful());

        // the failure travels back unchanged
        assert_eq!(network.chain(0).delivered_acknowledgements()[0].1, failure);

        assert_eq!(escrowed(&network, 1, &voucher(1)), 0u64.into());
        assert!(network
            .chain(1)
            .ctx
            .get_total_escrow_for_denom(&voucher(1))
            .amount
            .is_zero());
        assert_eq!(network.chain(0).ctx.balance(&alice(), "uatom"), 1000u64.into());
        assert_eq!(escrowed(&network, 0, "uatom"), 0u64.into());
        assert_no_in_flight_packets(&network);
    }

    #[test]
    fn nonrefundable_failure_downstream_is_not_refunded() {
        let mut network = network(3, &ForwardConfig::default());
        network.chain_mut(1).ctx.set_forward_flags(ForwardFlags {
            nonrefundable: true,
            ..ForwardFlags::default()
        });
        send_from_origin(&mut network, 100, "pfm", route_memo(&["not-an-address"]));

        network.relay().unwrap();

        let (_, ack) = &network.chain(0).delivered_acknowledgements()[0];
        let result = match ack {
            Acknowledgement::Result(result) => String::from_utf8(result.clone()).unwrap(),
            Acknowledgement::Error(e) => panic!("expected a successful acknowledgement, got {}", e),
        };
        assert!(result.starts_with(&format!("{}: ", NONREFUNDABLE_ACK_PREFIX)), "{}", result);

        assert_eq!(network.chain(0).ctx.balance(&alice(), "uatom"), 900u64.into());
        assert_eq!(escrowed(&network, 1, &voucher(1)), 100u64.into());
        assert_no_in_flight_packets(&network);
    }

    #[test]
    fn timed_out_forward_is_retried() {
        let config = ForwardConfig {
            retries_on_timeout: 1,
            ..ForwardConfig::default()
        };
        let mut network = network(3, &config);
        send_from_origin(&mut network, 100, "pfm", route_memo(&[bob().as_str()]));
        network.deliver_packets(0).unwrap();

        assert_eq!(network.time_out_packets(1).unwrap(), 1);
        assert_eq!(network.chain(1).ctx.in_flight_packet_count(), 1);

        let retried = network.chain(1).ctx.sent_packets()[0].clone();
        assert_eq!(retried.sequence, 2.into());
        let data = FungibleTokenPacketData::from_bytes(&retried.data).unwrap();
        assert_eq!(data.amount, "100");
        assert_eq!(data.receiver, bob().to_string());

        network.relay().unwrap();

        assert_eq!(network.chain(2).ctx.balance(&bob(), &voucher(2)), 100u64.into());
        assert_eq!(
            network.chain(0).delivered_acknowledgements()[0].1,
            Acknowledgement::success()
        );
        assert_no_in_flight_packets(&network);
    }

    #[test]
    fn retries_are_bounded() {
        let memo = json!({
            "forward": {
                "receiver": bob().as_str(),
                "port": "transfer",
                "channel": "channel-1",
                "retries": 2,
            }
        });
        let mut network = network(3, &ForwardConfig::default());
        send_from_origin(&mut network, 100, "pfm", memo.to_string());
        network.deliver_packets(0).unwrap();

        let mut last_packet = None;
        for _ in 0..3 {
            last_packet = network.chain(1).ctx.sent_packets().last().cloned();
            assert_eq!(network.time_out_packets(1).unwrap(), 1);
        }
        let last_packet = last_packet.unwrap();

        // the third timeout gives up instead of sending again
        assert!(network.chain(1).ctx.sent_packets().is_empty());
        assert_eq!(network.chain(1).ctx.in_flight_packet_count(), 0);

        network.relay().unwrap();

        let (_, ack) = &network.chain(0).delivered_acknowledgements()[0];
        assert_eq!(
            ack.error_text(),
            "packet-forward-middleware error: giving up on packet on channel (channel-0) port (transfer) after max retries"
        );
        assert_eq!(network.chain(0).ctx.balance(&alice(), "uatom"), 1000u64.into());
        assert_eq!(escrowed(&network, 1, &voucher(1)), 0u64.into());
        assert!(network
            .chain(1)
            .ctx
            .balance(&intermediate(&alice()), &voucher(1))
            .is_zero());

        // a further timeout of the last attempt finds nothing to resolve
        let chain = network.chain_mut(1);
        assert!(matches!(
            chain.app.keeper().timeout_should_retry(&chain.ctx, &last_packet).unwrap(),
            TimeoutAction::NotForwarded
        ));
        assert!(chain.timeout_packet(&last_packet).is_err());
        assert_eq!(network.chain(0).ctx.balance(&alice(), "uatom"), 1000u64.into());
        assert_no_in_flight_packets(&network);
    }

    #[test]
    fn failure_at_the_last_hop_unwinds_every_chain() {
        let mut network = network(4, &ForwardConfig::default());
        send_from_origin(&mut network, 100, "pfm", route_memo(&["pfm", "not-an-address"]));

        network.deliver_packets(0).unwrap();
        network.deliver_packets(1).unwrap();
        assert_eq!(escrowed(&network, 1, &voucher(1)), 100u64.into());
        assert_eq!(escrowed(&network, 2, &voucher(2)), 100u64.into());

        network.relay().unwrap();

        let failure = network
            .chain(3)
            .ctx
            .acknowledgement(&PortId::transfer(), &MockNetwork::channel_to_previous(), 1.into())
            .cloned()
            .unwrap();
        assert!(!failure.is_successful());
        assert_eq!(network.chain(0).delivered_acknowledgements()[0].1, failure);

        let first_hop = intermediate(&alice());
        let second_hop = intermediate(&first_hop);
        for (index, holder) in [(1, &first_hop), (2, &second_hop)] {
            let chain = network.chain(index);
            let denom = voucher(index);
            assert!(escrowed(&network, index, &denom).is_zero(), "escrow left on chain {}", index);
            assert!(
                chain.ctx.get_total_escrow_for_denom(&denom).amount.is_zero(),
                "total escrow left on chain {}",
                index
            );
            assert!(chain.ctx.balance(holder, &denom).is_zero(), "funds left on chain {}", index);
        }

        assert!(network.chain(3).ctx.balance(&bob(), &voucher(3)).is_zero());
        assert_eq!(network.chain(0).ctx.balance(&alice(), "uatom"), 1000u64.into());
        assert_eq!(escrowed(&network, 0, "uatom"), 0u64.into());
        assert!(network
            .chain(0)
            .ctx
            .get_total_escrow_for_denom("uatom")
            .amount
            .is_zero());
        assert_no_in_flight_packets(&network);
    }

    #[test]
    fn timeout_at_the_second_hop_is_retried() {
        let config = ForwardConfig {
            retries_on_timeout: 1,
            ..ForwardConfig::default()
        };
        let mut network = network(4, &config);
        send_from_origin(&mut network, 100, "pfm", route_memo(&["pfm", bob().as_str()]));
        network.deliver_packets(0).unwrap();
        network.deliver_packets(1).unwrap();

        assert_eq!(network.time_out_packets(2).unwrap(), 1);
        assert_eq!(network.chain(2).ctx.in_flight_packet_count(), 1);
        assert_eq!(network.chain(1).ctx.in_flight_packet_count(), 1);

        let retried = network.chain(2).ctx.sent_packets()[0].clone();
        assert_eq!(retried.sequence, 2.into());
        let data = FungibleTokenPacketData::from_bytes(&retried.data).unwrap();
        assert_eq!(data.amount, "100");
        assert_eq!(data.receiver, bob().to_string());
        assert_eq!(escrowed(&network, 2, &voucher(2)), 100u64.into());
        assert_eq!(
            network.chain(2).ctx.get_total_escrow_for_denom(&voucher(2)).amount,
            100u64.into()
        );

        network.relay().unwrap();

        assert_eq!(network.chain(3).ctx.balance(&bob(), &voucher(3)), 100u64.into());
        assert_eq!(
            network.chain(0).delivered_acknowledgements()[0].1,
            Acknowledgement::success()
        );
        assert_eq!(escrowed(&network, 1, &voucher(1)), 100u64.into());
        assert_eq!(escrowed(&network, 2, &voucher(2)), 100u64.into());
        assert_eq!(network.chain(0).ctx.balance(&alice(), "uatom"), 900u64.into());
        assert_no_in_flight_packets(&network);
    }

    #[test]
    fn processed_packets_skip_the_wrapped_app() {
        let mut network = network(3, &ForwardConfig::default());
        let intermediate = self::intermediate(&alice());
        {
            let chain = network.chain_mut(1);
            chain.ctx.set_forward_flags(ForwardFlags {
                processed: true,
                ..ForwardFlags::default()
            });
            chain.ctx.set_denom_trace(DenomTrace::parse("transfer/channel-0/uatom"));
            chain
                .ctx
                .mint_coins(&intermediate, &Coin::new(voucher(1), 100u64))
                .unwrap();
        }

        send_from_origin(&mut network, 100, "pfm", route_memo(&[bob().as_str()]));
        network.relay().unwrap();

        assert_eq!(network.chain(2).ctx.balance(&bob(), &voucher(2)), 100u64.into());
        assert!(network.chain(1).ctx.balance(&intermediate, &voucher(1)).is_zero());
        assert_no_in_flight_packets(&network);
    }

    #[test]
    fn denom_composition_can_be_disabled() {
        let mut network = network(3, &ForwardConfig::default());
        let intermediate = self::intermediate(&alice());
        {
            let chain = network.chain_mut(1);
            chain.ctx.set_forward_flags(ForwardFlags {
                processed: true,
                disable_denom_composition: true,
                ..ForwardFlags::default()
            });
            chain
                .ctx
                .mint_coins(&intermediate, &Coin::new("uatom", 100u64))
                .unwrap();
        }

        send_from_origin(&mut network, 100, "pfm", route_memo(&[bob().as_str()]));
        network.deliver_packets(0).unwrap();

        let forwarded = network.chain(1).ctx.sent_packets()[0].clone();
        let data = FungibleTokenPacketData::from_bytes(&forwarded.data).unwrap();
        assert_eq!(data.denom, "uatom");
        assert_eq!(escrowed(&network, 1, "uatom"), 100u64.into());
    }

    #[test]
    fn unrelated_acknowledgements_pass_through() {
        let mut network = network(2, &ForwardConfig::default());
        let packet = send_from_origin(&mut network, 100, "not-an-address", String::new());

        network.relay().unwrap();

        assert!(!network.chain(0).delivered_acknowledgements()[0].1.is_successful());
        assert_eq!(network.chain(0).ctx.balance(&alice(), "uatom"), 1000u64.into());

        let chain = network.chain_mut(0);
        let result = chain
            .app
            .on_acknowledgement_packet(&mut chain.ctx, &packet, b"not json", &relayer_account());
        assert!(result.is_err());
    }

    #[test]
    fn configuration_is_carried() {
        let config = ForwardConfig {
            retries_on_timeout: 4,
            forward_timeout: Duration::from_secs(30),
            refund_timeout: Duration::from_secs(3600),
            address_prefix: "osmo".to_string(),
        };
        let middleware = PacketForwardMiddleware::new(MockTransferModule, &config);
        assert_eq!(middleware.retries_on_timeout(), 4);
        assert_eq!(middleware.forward_timeout(), Duration::from_secs(30));
        assert_eq!(middleware.refund_timeout(), Duration::from_secs(3600));

        let defaults = PacketForwardMiddleware::new(MockTransferModule, &ForwardConfig::default());
        assert_eq!(defaults.refund_timeout(), Duration::from_secs(28 * 24 * 60 * 60));
    }

    #[test]
    fn handshake_and_ics4_calls_pass_through() {
        let network = network(2, &ForwardConfig::default());
        let mut chain = network.chain(1).clone();
        let counterparty = Counterparty::new(PortId::transfer(), Some(ChannelId::new(1)));

        let version = chain
            .app
            .on_chan_open_try(
                &mut chain.ctx,
                Order::Unordered,
                &[],
                &PortId::transfer(),
                &ChannelId::new(0),
                &counterparty,
                &Version::ics20(),
            )
            .unwrap();
        assert_eq!(version, Version::ics20());

        assert!(chain
            .app
            .on_chan_open_init(
                &mut chain.ctx,
                Order::Ordered,
                &[],
                &PortId::transfer(),
                &ChannelId::new(0),
                &counterparty,
                &Version::ics20(),
            )
            .is_err());
        assert!(chain
            .app
            .on_chan_close_init(&mut chain.ctx, &PortId::transfer(), &ChannelId::new(0))
            .is_err());

        assert_eq!(
            chain
                .app
                .get_app_version(&chain.ctx, &PortId::transfer(), &ChannelId::new(0)),
            Some(Version::ics20())
        );
        assert_eq!(
            chain
                .app
                .get_app_version(&chain.ctx, &PortId::transfer(), &ChannelId::new(5)),
            None
        );

        let sequence = chain
            .app
            .send_packet(
                &mut chain.ctx,
                &PortId::transfer(),
                &ChannelId::new(0),
                Height::zero(),
                Timestamp::none(),
                b"data".to_vec(),
            )
            .unwrap();
        assert_eq!(sequence, 1.into());
        assert_eq!(chain.ctx.take_sent_packets().len(), 1);
    }

    #[test]
    fn legacy_string_next_is_forwarded_as_an_object() {
        let inner = route_memo(&[bob().as_str()]);
        let memo = json!({
            "forward": {
                "receiver": "pfm",
                "port": "transfer",
                "channel": "channel-1",
                "next": inner,
            }
        });

        let mut network = network(4, &ForwardConfig::default());
        send_from_origin(&mut network, 100, "pfm", memo.to_string());
        network.deliver_packets(0).unwrap();

        let forwarded = network.chain(1).ctx.sent_packets()[0].clone();
        let data = FungibleTokenPacketData::from_bytes(&forwarded.data).unwrap();
        assert_eq!(data.memo, inner);

        network.relay().unwrap();
        assert_eq!(network.chain(3).ctx.balance(&bob(), &voucher(3)), 100u64.into());
        assert_no_in_flight_packets(&network);
    }
}
