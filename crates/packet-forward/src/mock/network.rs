//! A line of mock chains running the packet-forward middleware, and a
//! relayer moving packets and acknowledgements between neighbours.

use crate::applications::packet_forward::middleware::PacketForwardMiddleware;
use crate::config::ForwardConfig;
use crate::core::ics04_channel::acknowledgement::Acknowledgement;
use crate::core::ics04_channel::context::Ics4Wrapper;
use crate::core::ics04_channel::error::Error as ChannelError;
use crate::core::ics04_channel::packet::Packet;
use crate::core::ics24_host::identifier::{ChannelId, PortId};
use crate::core::ics26_routing::context::Module;
use crate::mock::context::MockContext;
use crate::mock::transfer::MockTransferModule;
use crate::signer::Signer;

pub fn relayer_account() -> Signer {
    Signer::new("cosmos1relayer")
}

/// A chain state together with its middleware stack. Every callback runs
/// against the state as a whole: a callback that fails, or that returns an
/// error acknowledgement, leaves no trace in the state.
#[derive(Clone, Debug)]
pub struct MockChain {
    pub ctx: MockContext,
    pub app: PacketForwardMiddleware<MockTransferModule>,
    delivered_acknowledgements: Vec<(Packet, Acknowledgement)>,
}

impl MockChain {
    pub fn new(ctx: MockContext, config: &ForwardConfig) -> Self {
        Self {
            ctx,
            app: PacketForwardMiddleware::new(MockTransferModule, config),
            delivered_acknowledgements: Vec::new(),
        }
    }

    /// Delivers a packet and writes the acknowledgement returned by the stack, if any.
    pub fn recv_packet(&mut self, packet: &Packet) -> Result<Option<Acknowledgement>, ChannelError> {
        let checkpoint = self.ctx.clone();

        let ack = self
            .app
            .on_recv_packet(&mut self.ctx, packet, &relayer_account());

        if let Some(ack) = &ack {
            if !ack.is_successful() {
                self.ctx = checkpoint;
            }
            self.ctx.write_acknowledgement(packet, ack)?;
        }

        Ok(ack)
    }

    /// Delivers the acknowledgement of a packet sent by this chain.
    pub fn acknowledge_packet(&mut self, packet: &Packet, ack: &Acknowledgement) -> Result<(), ChannelError> {
        let checkpoint = self.ctx.clone();

        let result = self.ctx.delete_packet_commitment(packet).and_then(|_| {
            self.app
                .on_acknowledgement_packet(&mut self.ctx, packet, &ack.to_bytes(), &relayer_account())
        });

        match result {
            Ok(()) => {
                self.delivered_acknowledgements
                    .push((packet.clone(), ack.clone()));
                Ok(())
            }
            Err(e) => {
                self.ctx = checkpoint;
                Err(e)
            }
        }
    }

    /// Times out a packet sent by this chain.
    pub fn timeout_packet(&mut self, packet: &Packet) -> Result<(), ChannelError> {
        let checkpoint = self.ctx.clone();

        let result = self.ctx.delete_packet_commitment(packet).and_then(|_| {
            self.app
                .on_timeout_packet(&mut self.ctx, packet, &relayer_account())
        });

        if result.is_err() {
            self.ctx = checkpoint;
        }
        result
    }

    /// Acknowledgements delivered to this chain, in delivery order.
    pub fn delivered_acknowledgements(&self) -> &[(Packet, Acknowledgement)] {
        &self.delivered_acknowledgements
    }
}

/// Chains connected in a line over ICS20 channels: chain `i` reaches chain
/// `i + 1` over its [`MockNetwork::channel_to_next`], which is
/// [`MockNetwork::channel_to_previous`] on chain `i + 1`.
#[derive(Clone, Debug)]
pub struct MockNetwork {
    chains: Vec<MockChain>,
}

impl MockNetwork {
    pub fn channel_to_previous() -> ChannelId {
        ChannelId::new(0)
    }

    pub fn channel_to_next() -> ChannelId {
        ChannelId::new(1)
    }

    /// A line of `len` chains named `chain-0`, `chain-1`, ..., all running
    /// the middleware with `config`.
    pub fn linear(len: usize, config: &ForwardConfig) -> Self {
        let chains = (0..len)
            .map(|index| {
                let mut ctx = MockContext::new(format!("chain-{}", index))
                    .with_address_prefix(config.address_prefix.clone());
                if index > 0 {
                    ctx.add_channel(
                        PortId::transfer(),
                        Self::channel_to_previous(),
                        PortId::transfer(),
                        Self::channel_to_next(),
                    );
                }
                if index + 1 < len {
                    ctx.add_channel(
                        PortId::transfer(),
                        Self::channel_to_next(),
                        PortId::transfer(),
                        Self::channel_to_previous(),
                    );
                }
                MockChain::new(ctx, config)
            })
            .collect();

        Self { chains }
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn chain(&self, index: usize) -> &MockChain {
        &self.chains[index]
    }

    pub fn chain_mut(&mut self, index: usize) -> &mut MockChain {
        &mut self.chains[index]
    }

    /// Index of the chain at the other end of `channel_id` on chain `index`.
    fn counterparty_index(index: usize, channel_id: &ChannelId) -> usize {
        if *channel_id == Self::channel_to_next() {
            index + 1
        } else {
            index - 1
        }
    }

    /// Delivers the packets sent by chain `index` to their destination.
    /// Returns the number of packets delivered.
    pub fn deliver_packets(&mut self, index: usize) -> Result<usize, ChannelError> {
        let packets = self.chains[index].ctx.take_sent_packets();
        for packet in &packets {
            let destination = Self::counterparty_index(index, &packet.source_channel);
            self.chains[destination].recv_packet(packet)?;
        }
        Ok(packets.len())
    }

    /// Delivers the acknowledgements written by chain `index` to the
    /// senders of the acknowledged packets.
    pub fn deliver_acknowledgements(&mut self, index: usize) -> Result<usize, ChannelError> {
        let acks = self.chains[index].ctx.take_written_acknowledgements();
        for (packet, ack) in &acks {
            let source = Self::counterparty_index(index, &packet.destination_channel);
            self.chains[source].acknowledge_packet(packet, ack)?;
        }
        Ok(acks.len())
    }

    /// Times out the packets sent by chain `index` instead of delivering them.
    pub fn time_out_packets(&mut self, index: usize) -> Result<usize, ChannelError> {
        let packets = self.chains[index].ctx.take_sent_packets();
        for packet in &packets {
            self.chains[index].timeout_packet(packet)?;
        }
        Ok(packets.len())
    }

    /// Relays packets and acknowledgements until there is nothing left to
    /// relay. Returns the number of messages relayed.
    pub fn relay(&mut self) -> Result<usize, ChannelError> {
        let mut total = 0;
        loop {
            let mut relayed = 0;
            for index in 0..self.chains.len() {
                relayed += self.deliver_packets(index)?;
                relayed += self.deliver_acknowledgements(index)?;
            }
            if relayed == 0 {
                return Ok(total);
            }
            total += relayed;
        }
    }
}
