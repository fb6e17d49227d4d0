//! Implementation of a host chain mock. Used in testing the packet-forward middleware.

use std::collections::BTreeMap;

use crate::applications::packet_forward::context::{ForwardContext, ForwardFlags};
use crate::applications::packet_forward::params::Params;
use crate::applications::packet_forward::store::MemoryStore;
use crate::applications::transfer::amount::Amount;
use crate::applications::transfer::coin::Coin;
use crate::applications::transfer::context::{
    get_escrow_address, BankKeeper, DistributionKeeper, TransferKeeper,
};
use crate::applications::transfer::denom::{DenomTrace, DENOM_PREFIX};
use crate::applications::transfer::error::Error as Ics20Error;
use crate::applications::transfer::msgs::transfer::MsgTransfer;
use crate::core::ics04_channel::acknowledgement::Acknowledgement;
use crate::core::ics04_channel::channel::Counterparty;
use crate::core::ics04_channel::context::Ics4Wrapper;
use crate::core::ics04_channel::error::Error as ChannelError;
use crate::core::ics04_channel::packet::{Packet, Sequence};
use crate::core::ics04_channel::Version;
use crate::core::ics24_host::identifier::{ChannelId, PortId};
use crate::mock::transfer::send_transfer;
use crate::signer::Signer;
use crate::timestamp::Timestamp;
use crate::Height;

/// Block time of a fresh mock chain: 2023-11-14T22:13:20Z.
pub const MOCK_HOST_TIMESTAMP: Timestamp = Timestamp::from_nanoseconds(1_700_000_000_000_000_000);

/// A channel end of the mock chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockChannelEnd {
    pub counterparty: Counterparty,
    pub version: Version,
}

/// A context implementing the dependencies of the packet-forward middleware:
/// a bank with module accounts and a community pool, the escrow and denom
/// trace bookkeeping of the transfer module, and a channel layer that
/// collects sent packets and written acknowledgements for a relayer to pick up.
#[derive(Clone, Debug)]
pub struct MockContext {
    /// Host chain identifier.
    chain_id: String,

    /// Bech32 prefix of the accounts of this chain.
    address_prefix: String,

    /// Time of the block being executed.
    host_timestamp: Timestamp,

    /// Account balances, indexed by address and denomination.
    balances: BTreeMap<(String, String), Amount>,

    community_pool: BTreeMap<String, Amount>,

    /// Total amount held in escrow, per denomination.
    total_escrow: BTreeMap<String, Amount>,

    /// Denomination traces, indexed by their `ibc/{hash}` denomination.
    denom_traces: BTreeMap<String, DenomTrace>,

    channels: BTreeMap<(PortId, ChannelId), MockChannelEnd>,

    /// Tracks the sequence number for the next packet to be sent.
    next_sequence_send: BTreeMap<(PortId, ChannelId), Sequence>,

    /// Packets sent and neither acknowledged nor timed out yet.
    packet_commitments: BTreeMap<(PortId, ChannelId, Sequence), Packet>,

    /// Acknowledgements of received packets, indexed by the destination end of the packet.
    acknowledgements: BTreeMap<(PortId, ChannelId, Sequence), Acknowledgement>,

    /// Packets sent since the relayer last picked them up.
    sent_packets: Vec<Packet>,

    /// Acknowledgements written since the relayer last picked them up.
    written_acknowledgements: Vec<(Packet, Acknowledgement)>,

    store: MemoryStore,

    params: Params,

    forward_flags: ForwardFlags,
}

impl MockContext {
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            address_prefix: "cosmos".to_string(),
            host_timestamp: MOCK_HOST_TIMESTAMP,
            balances: BTreeMap::new(),
            community_pool: BTreeMap::new(),
            total_escrow: BTreeMap::new(),
            denom_traces: BTreeMap::new(),
            channels: BTreeMap::new(),
            next_sequence_send: BTreeMap::new(),
            packet_commitments: BTreeMap::new(),
            acknowledgements: BTreeMap::new(),
            sent_packets: Vec::new(),
            written_acknowledgements: Vec::new(),
            store: MemoryStore::new(),
            params: Params::default(),
            forward_flags: ForwardFlags::default(),
        }
    }

    pub fn with_address_prefix(mut self, address_prefix: impl Into<String>) -> Self {
        self.address_prefix = address_prefix.into();
        self
    }

    /// Opens an ICS20 channel end connected to `counterparty_port`/`counterparty_channel`.
    pub fn with_channel(
        mut self,
        port_id: PortId,
        channel_id: ChannelId,
        counterparty_port: PortId,
        counterparty_channel: ChannelId,
    ) -> Self {
        self.add_channel(port_id, channel_id, counterparty_port, counterparty_channel);
        self
    }

    pub fn with_balance(mut self, account: &Signer, coin: Coin) -> Self {
        self.mint_coins(account, &coin)
            .expect("minting into an account never overflows in tests");
        self
    }

    /// Puts `coin` in the escrow account of `port_id`/`channel_id`, as if
    /// it had been sent over that channel.
    pub fn with_escrow(mut self, port_id: &PortId, channel_id: &ChannelId, coin: Coin) -> Self {
        let escrow_address = self
            .escrow_address(port_id, channel_id)
            .expect("escrow address of a valid channel");
        self.mint_coins(&escrow_address, &coin)
            .expect("minting into an account never overflows in tests");
        self.escrow_token(&coin)
            .expect("escrowing never overflows in tests");
        self
    }

    pub fn with_denom_trace(mut self, trace: DenomTrace) -> Self {
        self.set_denom_trace(trace);
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_forward_flags(mut self, flags: ForwardFlags) -> Self {
        self.forward_flags = flags;
        self
    }

    pub fn with_host_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.host_timestamp = timestamp;
        self
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn address_prefix(&self) -> &str {
        &self.address_prefix
    }

    pub fn add_channel(
        &mut self,
        port_id: PortId,
        channel_id: ChannelId,
        counterparty_port: PortId,
        counterparty_channel: ChannelId,
    ) {
        self.channels.insert(
            (port_id, channel_id),
            MockChannelEnd {
                counterparty: Counterparty::new(counterparty_port, Some(counterparty_channel)),
                version: Version::ics20(),
            },
        );
    }

    pub fn channel_end(&self, port_id: &PortId, channel_id: &ChannelId) -> Result<&MockChannelEnd, ChannelError> {
        self.channels
            .get(&(port_id.clone(), channel_id.clone()))
            .ok_or_else(|| ChannelError::channel_not_found(port_id.clone(), channel_id.clone()))
    }

    pub fn set_forward_flags(&mut self, flags: ForwardFlags) {
        self.forward_flags = flags;
    }

    pub fn balance(&self, account: &Signer, denom: &str) -> Amount {
        self.balances
            .get(&(account.to_string(), denom.to_string()))
            .copied()
            .unwrap_or_default()
    }

    pub fn community_pool_balance(&self, denom: &str) -> Amount {
        self.community_pool.get(denom).copied().unwrap_or_default()
    }

    pub fn escrow_address(&self, port_id: &PortId, channel_id: &ChannelId) -> Result<Signer, Ics20Error> {
        get_escrow_address(&self.address_prefix, port_id, channel_id)
    }

    pub fn escrow_balance(&self, port_id: &PortId, channel_id: &ChannelId, denom: &str) -> Amount {
        self.escrow_address(port_id, channel_id)
            .map(|address| self.balance(&address, denom))
            .unwrap_or_default()
    }

    /// The account of the module with the given name.
    pub fn module_address(module: &str) -> Signer {
        Signer::new(format!("module:{}", module))
    }

    pub fn mint_coins(&mut self, account: &Signer, coin: &Coin) -> Result<(), Ics20Error> {
        self.credit(account, coin)
    }

    /// Adds `coin` to the total escrow of its denomination.
    pub fn escrow_token(&mut self, coin: &Coin) -> Result<(), Ics20Error> {
        let total = self.total_escrow.entry(coin.denom.clone()).or_default();
        *total = total
            .checked_add(coin.amount)
            .ok_or_else(Ics20Error::amount_overflow)?;
        Ok(())
    }

    /// Removes `coin` from the total escrow of its denomination.
    pub fn unescrow_token(&mut self, coin: &Coin) -> Result<(), Ics20Error> {
        let total = self.get_total_escrow_for_denom(&coin.denom);
        let amount = total
            .amount
            .checked_sub(coin.amount)
            .ok_or_else(|| Ics20Error::negative_total_escrow(coin.denom.clone()))?;
        self.set_total_escrow_for_denom(Coin::new(coin.denom.clone(), amount));
        Ok(())
    }

    pub fn set_denom_trace(&mut self, trace: DenomTrace) {
        self.denom_traces.insert(trace.ibc_denom(), trace);
    }

    /// Packets sent since the last call, in the order they were sent.
    pub fn take_sent_packets(&mut self) -> Vec<Packet> {
        core::mem::take(&mut self.sent_packets)
    }

    pub fn sent_packets(&self) -> &[Packet] {
        &self.sent_packets
    }

    /// Acknowledgements written since the last call, in the order they were written.
    pub fn take_written_acknowledgements(&mut self) -> Vec<(Packet, Acknowledgement)> {
        core::mem::take(&mut self.written_acknowledgements)
    }

    /// The acknowledgement written for the packet received on `port_id`/`channel_id` with `sequence`.
    pub fn acknowledgement(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: Sequence,
    ) -> Option<&Acknowledgement> {
        self.acknowledgements
            .get(&(port_id.clone(), channel_id.clone(), sequence))
    }

    pub fn has_packet_commitment(&self, packet: &Packet) -> bool {
        self.packet_commitments.contains_key(&(
            packet.source_port.clone(),
            packet.source_channel.clone(),
            packet.sequence,
        ))
    }

    /// Deletes the commitment of a sent packet once it is acknowledged or timed out.
    pub fn delete_packet_commitment(&mut self, packet: &Packet) -> Result<(), ChannelError> {
        self.packet_commitments
            .remove(&(
                packet.source_port.clone(),
                packet.source_channel.clone(),
                packet.sequence,
            ))
            .map(|_| ())
            .ok_or_else(|| ChannelError::packet_commitment_not_found(packet.sequence))
    }

    /// Number of continuation records in the middleware store.
    pub fn in_flight_packet_count(&self) -> usize {
        self.store.len()
    }

    fn credit(&mut self, account: &Signer, coin: &Coin) -> Result<(), Ics20Error> {
        let balance = self
            .balances
            .entry((account.to_string(), coin.denom.clone()))
            .or_default();
        *balance = balance
            .checked_add(coin.amount)
            .ok_or_else(Ics20Error::amount_overflow)?;
        Ok(())
    }

    fn debit(&mut self, account: &Signer, coin: &Coin) -> Result<(), Ics20Error> {
        let key = (account.to_string(), coin.denom.clone());
        let balance = self.balances.get(&key).copied().unwrap_or_default();
        let remaining = balance.checked_sub(coin.amount).ok_or_else(|| {
            Ics20Error::insufficient_funds(account.to_string(), coin.denom.clone())
        })?;

        if remaining.is_zero() {
            self.balances.remove(&key);
        } else {
            self.balances.insert(key, remaining);
        }
        Ok(())
    }
}

impl BankKeeper for MockContext {
    fn send_coins(&mut self, from: &Signer, to: &Signer, amt: &Coin) -> Result<(), Ics20Error> {
        self.debit(from, amt)?;
        self.credit(to, amt)
    }

    fn send_coins_from_account_to_module(
        &mut self,
        from: &Signer,
        module: &str,
        amt: &Coin,
    ) -> Result<(), Ics20Error> {
        self.debit(from, amt)?;
        self.credit(&Self::module_address(module), amt)
    }

    fn burn_coins(&mut self, module: &str, amt: &Coin) -> Result<(), Ics20Error> {
        self.debit(&Self::module_address(module), amt)
    }
}

impl DistributionKeeper for MockContext {
    fn fund_community_pool(&mut self, amount: &Coin, depositor: &Signer) -> Result<(), Ics20Error> {
        self.debit(depositor, amount)?;

        let pool = self.community_pool.entry(amount.denom.clone()).or_default();
        *pool = pool
            .checked_add(amount.amount)
            .ok_or_else(Ics20Error::amount_overflow)?;
        Ok(())
    }
}

impl TransferKeeper for MockContext {
    fn transfer(&mut self, msg: MsgTransfer) -> Result<Sequence, Ics20Error> {
        send_transfer(self, msg)
    }

    fn denom_path_from_hash(&self, denom: &str) -> Result<String, Ics20Error> {
        let hash = denom
            .strip_prefix(DENOM_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|hash| hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| Ics20Error::invalid_denom_hash(denom.to_string()))?;

        self.denom_traces
            .get(&format!("{}/{}", DENOM_PREFIX, hash.to_uppercase()))
            .map(DenomTrace::full_denom_path)
            .ok_or_else(|| Ics20Error::denom_trace_not_found(denom.to_string()))
    }

    fn get_total_escrow_for_denom(&self, denom: &str) -> Coin {
        Coin::new(
            denom,
            self.total_escrow.get(denom).copied().unwrap_or_default(),
        )
    }

    fn set_total_escrow_for_denom(&mut self, coin: Coin) {
        self.total_escrow.insert(coin.denom, coin.amount);
    }
}

impl Ics4Wrapper for MockContext {
    fn send_packet(
        &mut self,
        source_port: &PortId,
        source_channel: &ChannelId,
        timeout_height: Height,
        timeout_timestamp: Timestamp,
        data: Vec<u8>,
    ) -> Result<Sequence, ChannelError> {
        if data.is_empty() {
            return Err(ChannelError::zero_packet_data());
        }

        let counterparty = self.channel_end(source_port, source_channel)?.counterparty.clone();
        let destination_channel = counterparty
            .channel_id()
            .cloned()
            .ok_or_else(|| ChannelError::channel_not_found(source_port.clone(), source_channel.clone()))?;

        let next_sequence = self
            .next_sequence_send
            .entry((source_port.clone(), source_channel.clone()))
            .or_insert_with(|| Sequence::from(1));
        let sequence = *next_sequence;
        *next_sequence = sequence.increment();

        let packet = Packet {
            sequence,
            source_port: source_port.clone(),
            source_channel: source_channel.clone(),
            destination_port: counterparty.port_id().clone(),
            destination_channel,
            data,
            timeout_height,
            timeout_timestamp,
        };

        self.packet_commitments.insert(
            (source_port.clone(), source_channel.clone(), sequence),
            packet.clone(),
        );
        self.sent_packets.push(packet);

        Ok(sequence)
    }

    fn write_acknowledgement(
        &mut self,
        packet: &Packet,
        acknowledgement: &Acknowledgement,
    ) -> Result<(), ChannelError> {
        let key = (
            packet.destination_port.clone(),
            packet.destination_channel.clone(),
            packet.sequence,
        );
        if self.acknowledgements.contains_key(&key) {
            return Err(ChannelError::acknowledgement_exists(packet.sequence));
        }

        self.acknowledgements.insert(key, acknowledgement.clone());
        self.written_acknowledgements
            .push((packet.clone(), acknowledgement.clone()));

        Ok(())
    }

    fn get_app_version(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<Version> {
        self.channel_end(port_id, channel_id)
            .ok()
            .map(|end| end.version.clone())
    }
}

impl ForwardContext for MockContext {
    type Store = MemoryStore;

    fn store(&self) -> &Self::Store {
        &self.store
    }

    fn store_mut(&mut self) -> &mut Self::Store {
        &mut self.store
    }

    fn host_timestamp(&self) -> Timestamp {
        self.host_timestamp
    }

    fn get_params(&self) -> Params {
        self.params.clone()
    }

    fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    fn forward_flags(&self) -> ForwardFlags {
        self.forward_flags
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::{MockContext, MOCK_HOST_TIMESTAMP};
    use crate::applications::packet_forward::context::{ForwardContext, ForwardFlags};
    use crate::applications::transfer::coin::Coin;
    use crate::applications::transfer::context::{BankKeeper, DistributionKeeper, TransferKeeper};
    use crate::applications::transfer::denom::DenomTrace;
    use crate::core::ics04_channel::acknowledgement::Acknowledgement;
    use crate::core::ics04_channel::context::Ics4Wrapper;
    use crate::core::ics24_host::identifier::{ChannelId, PortId};
    use crate::signer::Signer;
    use crate::timestamp::Timestamp;
    use crate::Height;

    #[test]
    fn bank_moves_funds() {
        let alice = Signer::new("cosmos1alice");
        let bob = Signer::new("cosmos1bob");
        let mut ctx = MockContext::new("chain-a").with_balance(&alice, Coin::new("uatom", 100u64));

        ctx.send_coins(&alice, &bob, &Coin::new("uatom", 30u64)).unwrap();
        assert_eq!(ctx.balance(&alice, "uatom"), 70u64.into());
        assert_eq!(ctx.balance(&bob, "uatom"), 30u64.into());

        assert!(ctx.send_coins(&bob, &alice, &Coin::new("uatom", 31u64)).is_err());

        ctx.fund_community_pool(&Coin::new("uatom", 5u64), &bob).unwrap();
        assert_eq!(ctx.community_pool_balance("uatom"), 5u64.into());

        ctx.send_coins_from_account_to_module(&bob, "transfer", &Coin::new("uatom", 25u64))
            .unwrap();
        ctx.burn_coins("transfer", &Coin::new("uatom", 25u64)).unwrap();
        assert!(ctx.balance(&bob, "uatom").is_zero());
        assert!(ctx.burn_coins("transfer", &Coin::new("uatom", 1u64)).is_err());
    }

    #[test]
    fn denom_path_lookup() {
        let trace = DenomTrace::parse("transfer/channel-0/uatom");
        let ctx = MockContext::new("chain-a").with_denom_trace(trace.clone());

        assert_eq!(
            ctx.denom_path_from_hash(&trace.ibc_denom()).unwrap(),
            "transfer/channel-0/uatom"
        );
        assert!(ctx.denom_path_from_hash("ibc/1234").is_err());
        assert!(ctx
            .denom_path_from_hash("ibc/0000000000000000000000000000000000000000000000000000000000000000")
            .is_err());
    }

    #[test]
    fn channel_layer_assigns_sequences_and_rejects_duplicate_acks() {
        let mut ctx = MockContext::new("chain-a").with_channel(
            PortId::transfer(),
            ChannelId::new(0),
            PortId::transfer(),
            ChannelId::new(7),
        );

        for expected in 1..=2u64 {
            let sequence = ctx
                .send_packet(
                    &PortId::transfer(),
                    &ChannelId::new(0),
                    Height::zero(),
                    Timestamp::none(),
                    b"data".to_vec(),
                )
                .unwrap();
            assert_eq!(sequence, expected.into());
        }

        let packets = ctx.take_sent_packets();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].destination_channel, ChannelId::new(7));
        assert!(ctx.has_packet_commitment(&packets[0]));
        assert!(ctx.take_sent_packets().is_empty());

        assert!(ctx
            .send_packet(&PortId::transfer(), &ChannelId::new(1), Height::zero(), Timestamp::none(), b"data".to_vec())
            .is_err());

        ctx.write_acknowledgement(&packets[0], &Acknowledgement::success()).unwrap();
        assert!(ctx.write_acknowledgement(&packets[0], &Acknowledgement::success()).is_err());
        assert_eq!(ctx.take_written_acknowledgements().len(), 1);
    }

    #[test]
    fn block_time_and_flags() {
        let ctx = MockContext::new("chain-a");
        assert_eq!(ctx.host_timestamp(), MOCK_HOST_TIMESTAMP);
        assert_eq!(ctx.forward_flags(), ForwardFlags::default());

        let flags = ForwardFlags {
            nonrefundable: true,
            ..ForwardFlags::default()
        };
        let ctx = ctx
            .with_host_timestamp(Timestamp::from_nanoseconds(5))
            .with_forward_flags(flags);
        assert_eq!(ctx.host_timestamp(), Timestamp::from_nanoseconds(5));
        assert_eq!(ctx.forward_flags(), flags);
    }
}
