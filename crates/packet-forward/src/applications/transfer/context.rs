use sha2::{Digest, Sha256};

use super::coin::Coin;
use super::error::Error as Ics20Error;
use super::msgs::transfer::MsgTransfer;
use super::VERSION;
use crate::core::ics04_channel::packet::Sequence;
use crate::core::ics24_host::identifier::{ChannelId, PortId};
use crate::signer::Signer;

/// The parts of the ICS20 transfer keeper a middleware stacked on top of the
/// transfer application relies on.
pub trait TransferKeeper {
    /// Escrows or burns `msg.token` from `msg.sender` and sends the
    /// corresponding transfer packet, returning its sequence.
    fn transfer(&mut self, msg: MsgTransfer) -> Result<Sequence, Ics20Error>;

    /// Resolves an `ibc/{hash}` denomination into its full denomination path.
    fn denom_path_from_hash(&self, denom: &str) -> Result<String, Ics20Error>;

    /// Returns the total amount of `denom` held in escrow across all channels.
    fn get_total_escrow_for_denom(&self, denom: &str) -> Coin;

    fn set_total_escrow_for_denom(&mut self, coin: Coin);
}

pub trait BankKeeper {
    /// This function should enable sending ibc fungible tokens from one account to another
    fn send_coins(&mut self, from: &Signer, to: &Signer, amt: &Coin) -> Result<(), Ics20Error>;

    /// Moves tokens from an account to the account of the named module
    fn send_coins_from_account_to_module(
        &mut self,
        from: &Signer,
        module: &str,
        amt: &Coin,
    ) -> Result<(), Ics20Error>;

    /// This function should enable burning of tokens held by the named module
    fn burn_coins(&mut self, module: &str, amt: &Coin) -> Result<(), Ics20Error>;
}

pub trait DistributionKeeper {
    /// Moves `amount` from the `depositor` account into the community pool.
    fn fund_community_pool(&mut self, amount: &Coin, depositor: &Signer) -> Result<(), Ics20Error>;
}

// https://github.com/cosmos/cosmos-sdk/blob/master/docs/architecture/adr-028-public-key-addresses.md
pub fn cosmos_adr028_escrow_address(port_id: &PortId, channel_id: &ChannelId) -> Vec<u8> {
    let contents = format!("{}/{}", port_id, channel_id);

    let mut hasher = Sha256::new();
    hasher.update(VERSION.as_bytes());
    hasher.update([0]);
    hasher.update(contents.as_bytes());

    let mut hash = hasher.finalize().to_vec();
    hash.truncate(20);
    hash
}

/// The bech32 address of the escrow account for the given channel end.
pub fn get_escrow_address(
    address_prefix: &str,
    port_id: &PortId,
    channel_id: &ChannelId,
) -> Result<Signer, Ics20Error> {
    Signer::from_address_bytes(address_prefix, &cosmos_adr028_escrow_address(port_id, channel_id))
        .map_err(Ics20Error::signer)
}
