use flex_error::{define_error, TraceError};

use crate::applications::transfer::error::Error as Ics20Error;
use crate::core::ics02_client::error::Error as ClientError;
use crate::core::ics04_channel::error::Error as ChannelError;
use crate::core::ics24_host::error::ValidationError;
use crate::core::ics24_host::identifier::{ChannelId, PortId};
use crate::signer::SignerError;
use crate::timestamp::TimestampOverflowError;

define_error! {
    #[derive(Debug)]
    Error {
        Transfer
            [ Ics20Error ]
            | _ | { "transfer error" },

        Channel
            [ ChannelError ]
            | _ | { "channel error" },

        MetadataParse
            [ TraceError<serde_json::Error> ]
            | _ | { "error parsing forward metadata" },

        EmptyReceiver
            | _ | { "failed to validate metadata. receiver cannot be empty" },

        InvalidMetadataIdentifier
            [ ValidationError ]
            | _ | { "failed to validate metadata" },

        NextSerialization
            [ TraceError<serde_json::Error> ]
            | _ | { "error marshaling next as JSON" },

        OverrideReceiver
            [ SignerError ]
            | _ | { "failed to construct override receiver" },

        InvalidForwardAmount
            { amount: String }
            | e | { format_args!("error parsing amount for forward: {}", e.amount) },

        InvalidRetryAmount
            { amount: String }
            | e | { format_args!("error parsing amount from string for router retry: {}", e.amount) },

        InvalidRefundAmount
            { amount: String }
            | e | { format_args!("failed to parse amount from packet data for forward refund: {}", e.amount) },

        MemoParse
            [ TraceError<serde_json::Error> ]
            | _ | { "error unmarshaling memo json" },

        PacketDataEncode
            [ Ics20Error ]
            | _ | { "failed to encode packet data for the wrapped application" },

        FeeOverflow
            { amount: String }
            | e | { format_args!("fee computation overflows for amount {}", e.amount) },

        FeeDepositor
            [ SignerError ]
            | _ | { "invalid fee depositor address" },

        InsufficientFunds
            [ Ics20Error ]
            | _ | { "insufficient funds" },

        TimeoutOverflow
            [ TimestampOverflowError ]
            | _ | { "forward timeout overflows the block time" },

        MaxRetriesExceeded
            { channel_id: ChannelId, port_id: PortId }
            | e | {
                format_args!(
                    "giving up on packet on channel ({}) port ({}) after max retries",
                    e.channel_id, e.port_id)
            },

        RefundEscrowTransfer
            [ Ics20Error ]
            | _ | { "failed to send coins from escrow account to refund escrow account" },

        EscrowToModuleTransfer
            [ Ics20Error ]
            | _ | { "failed to send coins from escrow to module account for burn" },

        Burn
            [ Ics20Error ]
            | _ | { "cannot burn coins after a successful send from escrow account to module account" },

        NegativeTotalEscrow
            { denom: String }
            | e | { format_args!("total escrow for {} cannot become negative", e.denom) },

        InFlightPacketDecode
            [ TraceError<prost::DecodeError> ]
            | _ | { "failed to decode in-flight packet" },

        InvalidInFlightPacketIdentifier
            [ ValidationError ]
            | _ | { "invalid identifier in in-flight packet" },

        InvalidInFlightPacketHeight
            [ ClientError ]
            | _ | { "invalid timeout height in in-flight packet" },

        InvalidDecimal
            { value: String }
            | e | { format_args!("invalid decimal {}", e.value) },

        InvalidFeePercentage
            { value: String }
            | e | { format_args!("invalid fee percentage {}: must be between 0 and 1", e.value) },

        MissingParams
            | _ | { "missing params in genesis state" },

        InvalidGenesisKey
            { key: String }
            | e | { format_args!("invalid in-flight packet key {} in genesis state", e.key) },

        NonUtf8StoreKey
            | _ | { "in-flight packet store key is not valid UTF-8" },
    }
}

impl Error {
    /// The error message followed by the messages of its sources, as written
    /// in acknowledgements.
    pub fn message(&self) -> String {
        self.trace().to_string()
    }
}
