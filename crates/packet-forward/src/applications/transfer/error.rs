use flex_error::{define_error, TraceError};
use uint::FromDecStrErr;

use crate::core::ics04_channel::channel::Order;
use crate::core::ics04_channel::error as channel_error;
use crate::core::ics04_channel::Version;
use crate::core::ics24_host::identifier::{ChannelId, PortId};
use crate::signer::SignerError;

define_error! {
    #[derive(Debug, PartialEq, Eq)]
    Error {
        Channel
            [ channel_error::Error ]
            | _ | { "channel error" },

        Signer
            [ SignerError ]
            | _ | { "invalid account address" },

        InvalidAmount
            [ TraceError<FromDecStrErr> ]
            | _ | { "invalid amount" },

        EmptyAmount
            | _ | { "empty amount" },

        AmountOverflow
            | _ | { "amount overflow" },

        InsufficientFunds
            { address: String, denom: String }
            | e | {
                format_args!(
                    "insufficient {0} funds in account {1}",
                    e.denom, e.address)
            },

        NegativeTotalEscrow
            { denom: String }
            | e | {
                format_args!(
                    "total escrow for {0} cannot become negative",
                    e.denom)
            },

        DenomTraceNotFound
            { denom: String }
            | e | { format_args!("no denomination trace found for {0}", e.denom) },

        InvalidDenomHash
            { denom: String }
            | e | { format_args!("invalid denomination hash {0}", e.denom) },

        PacketDataSerialization
            [ TraceError<serde_json::Error> ]
            | _ | { "failed to serialize packet data" },

        PacketDataDeserialization
            [ TraceError<serde_json::Error> ]
            | _ | { "failed to deserialize packet data" },

        ChannelNotUnordered
            { order_type: Order }
            | e | { format_args!("expected '{0}' channel, got '{1}'", Order::Unordered, e.order_type) },

        InvalidVersion
            { version: Version }
            | e | { format_args!("expected version '{0}', got '{1}'", Version::ics20(), e.version) },

        InvalidPort
            { port_id: PortId, exp_port_id: PortId }
            | e | { format_args!("invalid port: '{0}', expected '{1}'", e.port_id, e.exp_port_id) },

        ChannelNotFound
            { port_id: PortId, channel_id: ChannelId }
            | e | { format_args!("channel not found for port '{0}' and channel '{1}'", e.port_id, e.channel_id) },

        CantCloseChannel
            | _ | { "channel cannot be closed" },
    }
}
