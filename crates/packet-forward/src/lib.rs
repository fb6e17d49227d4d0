#![allow(clippy::large_enum_variant)]
#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    rust_2018_idioms
)]
#![forbid(unsafe_code)]

//! This library implements the packet-forward middleware for the InterBlockchain
//! Communication (IBC) protocol. The middleware sits between the channel layer of a
//! chain and its ICS20 fungible token transfer application. A transfer whose memo
//! carries a `forward` instruction is received on behalf of a derived intermediate
//! account and sent on to the next chain, possibly several hops away, while the
//! acknowledgement for the inbound packet is withheld until the outcome of the
//! outbound packet is known.
//!
//! The layout of this crate mirrors the classification of the [Interchain
//! Standards][ics-standards]:
//!
//! `Core` contains the host-facing types the middleware depends on: packets,
//! sequences, acknowledgements, identifiers, heights and the ICS26 callback
//! interface implemented by every IBC application and middleware.
//!
//! `Applications` contains the boundary of the ICS20 transfer application the
//! middleware wraps (denomination traces, packet data, escrow accounts and keeper
//! interfaces), and the packet-forward middleware itself.
//!
//! [ics-standards]: https://github.com/cosmos/ibc#interchain-standards

pub mod applications;
pub mod bigint;
pub mod config;
pub mod core;
pub mod signer;
pub mod timestamp;

mod serializers;

/// Re-export of ICS 002 Height domain type
pub type Height = crate::core::ics02_client::height::Height;

#[cfg(any(test, feature = "mocks"))]
pub mod mock; // Mock host chain and mock ICS20 application: for testing the middleware end to end.
