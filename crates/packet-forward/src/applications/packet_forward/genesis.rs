//! Import and export of the middleware state.

use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

use ibc_packet_forward_proto::packetforward::v1::GenesisState as RawGenesisState;

use super::context::ForwardContext;
use super::error::Error;
use super::in_flight::InFlightPacket;
use super::keeper::Keeper;
use super::params::Params;
use super::store::KvStore;

/// The parameters and the continuation records of packets still in flight.
/// Records are keyed by the string form of their store key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    pub in_flight_packets: BTreeMap<String, InFlightPacket>,
}

impl GenesisState {
    pub fn new(params: Params, in_flight_packets: BTreeMap<String, InFlightPacket>) -> Self {
        Self {
            params,
            in_flight_packets,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.params.validate()?;

        for key in self.in_flight_packets.keys() {
            // channel/port/sequence
            let mut parts = key.split('/');
            let well_formed = matches!(
                (parts.next(), parts.next(), parts.next(), parts.next()),
                (Some(channel), Some(port), Some(sequence), None)
                    if !channel.is_empty() && !port.is_empty() && sequence.parse::<u64>().is_ok()
            );
            if !well_formed {
                return Err(Error::invalid_genesis_key(key.clone()));
            }
        }

        Ok(())
    }
}

impl TryFrom<RawGenesisState> for GenesisState {
    type Error = Error;

    fn try_from(raw: RawGenesisState) -> Result<Self, Self::Error> {
        let params = Params::try_from(raw.params.ok_or_else(Error::missing_params)?)?;

        let in_flight_packets = raw
            .in_flight_packets
            .into_iter()
            .map(|(key, packet)| Ok((key, InFlightPacket::try_from(packet)?)))
            .collect::<Result<BTreeMap<_, _>, Error>>()?;

        Ok(Self {
            params,
            in_flight_packets,
        })
    }
}

impl From<GenesisState> for RawGenesisState {
    fn from(value: GenesisState) -> Self {
        RawGenesisState {
            params: Some(value.params.into()),
            in_flight_packets: value
                .in_flight_packets
                .into_iter()
                .map(|(key, packet)| (key, packet.into()))
                .collect(),
        }
    }
}

impl Keeper {
    /// Stores the parameters and the continuation records of `state`.
    pub fn init_genesis<Ctx: ForwardContext>(&self, ctx: &mut Ctx, state: GenesisState) -> Result<(), Error> {
        state.validate()?;

        self.set_params(ctx, state.params);

        for (key, in_flight_packet) in state.in_flight_packets {
            ctx.store_mut()
                .set(key.into_bytes(), in_flight_packet.encode_vec());
        }

        Ok(())
    }

    /// Exports the parameters and every continuation record in the store.
    pub fn export_genesis<Ctx: ForwardContext>(&self, ctx: &Ctx) -> Result<GenesisState, Error> {
        let in_flight_packets = ctx
            .store()
            .iter()
            .map(|(key, value)| {
                let key = String::from_utf8(key.to_vec()).map_err(|_| Error::non_utf8_store_key())?;
                Ok((key, InFlightPacket::decode_vec(value)?))
            })
            .collect::<Result<BTreeMap<_, _>, Error>>()?;

        Ok(GenesisState {
            params: self.get_params(ctx),
            in_flight_packets,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use test_log::test;

    use super::GenesisState;
    use crate::applications::packet_forward::in_flight::tests::dummy_in_flight_packet;
    use crate::applications::packet_forward::keeper::Keeper;
    use crate::applications::packet_forward::params::{Decimal, Params};
    use crate::mock::context::MockContext;
    use ibc_packet_forward_proto::packetforward::v1::GenesisState as RawGenesisState;

    fn genesis_with_one_record() -> GenesisState {
        let mut in_flight_packets = BTreeMap::new();
        in_flight_packets.insert("channel-1/transfer/7".to_string(), dummy_in_flight_packet());
        GenesisState::new(Params::new(Decimal::percent(5)), in_flight_packets)
    }

    #[test]
    fn default_genesis_is_valid() {
        let state = GenesisState::default();
        assert!(state.validate().is_ok());
        assert!(state.params.fee_percentage.is_zero());
        assert!(state.in_flight_packets.is_empty());
    }

    #[test]
    fn validate_genesis() {
        assert!(genesis_with_one_record().validate().is_ok());

        let mut state = genesis_with_one_record();
        state.params = Params::new(Decimal::percent(101));
        assert!(state.validate().is_err());

        for key in ["", "channel-1/transfer", "channel-1/transfer/x", "channel-1/transfer/1/2"] {
            let mut state = GenesisState::default();
            state.in_flight_packets.insert(key.to_string(), dummy_in_flight_packet());
            assert!(state.validate().is_err(), "key {:?} should be rejected", key);
        }
    }

    #[test]
    fn raw_genesis_requires_params() {
        let raw = RawGenesisState::from(genesis_with_one_record());
        assert_eq!(GenesisState::try_from(raw.clone()).unwrap(), genesis_with_one_record());

        let raw = RawGenesisState { params: None, ..raw };
        assert!(GenesisState::try_from(raw).is_err());
    }

    #[test]
    fn init_then_export_genesis() {
        let keeper = Keeper::new("cosmos");
        let mut ctx = MockContext::new("chain-a");
        let state = genesis_with_one_record();

        keeper.init_genesis(&mut ctx, state.clone()).unwrap();
        assert_eq!(keeper.export_genesis(&ctx).unwrap(), state);

        let mut bad = GenesisState::default();
        bad.in_flight_packets.insert("nope".to_string(), dummy_in_flight_packet());
        assert!(keeper.init_genesis(&mut ctx, bad).is_err());
    }
}
