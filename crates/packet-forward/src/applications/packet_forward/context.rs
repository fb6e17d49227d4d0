use crate::applications::packet_forward::params::Params;
use crate::applications::packet_forward::store::KvStore;
use crate::applications::transfer::context::{BankKeeper, DistributionKeeper, TransferKeeper};
use crate::core::ics04_channel::context::Ics4Wrapper;
use crate::timestamp::Timestamp;

/// Hints set by outer layers of the middleware stack for the packet being received.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ForwardFlags {
    /// The wrapped transfer application already processed the packet.
    pub processed: bool,
    /// Funds can no longer be refunded if the forward fails.
    pub nonrefundable: bool,
    /// The inbound denomination is already the one to forward.
    pub disable_denom_composition: bool,
}

/// Captures all the dependencies which the packet-forward middleware requires
/// from the host chain.
pub trait ForwardContext: TransferKeeper + BankKeeper + DistributionKeeper + Ics4Wrapper {
    type Store: KvStore;

    /// The store of continuation records.
    fn store(&self) -> &Self::Store;

    fn store_mut(&mut self) -> &mut Self::Store;

    /// Time of the block being executed.
    fn host_timestamp(&self) -> Timestamp;

    fn get_params(&self) -> Params;

    fn set_params(&mut self, params: Params);

    fn forward_flags(&self) -> ForwardFlags {
        ForwardFlags::default()
    }
}
