//! The packet-forward middleware: receives ICS20 transfers on behalf of a
//! derived intermediate account and forwards them to the next chain named in
//! the packet memo, retrying timed-out hops and withholding the inbound
//! acknowledgement until the outcome of the forward is known.

pub mod context;
pub mod error;
pub mod genesis;
pub mod in_flight;
pub mod keeper;
pub mod metadata;
pub mod middleware;
pub mod params;
pub mod receiver;
pub mod store;

/// Name of the middleware module. The misspelling is kept since it is an
/// input to the derivation of intermediate receiver accounts.
pub const MODULE_NAME: &str = "packetfowardmiddleware";

/// Prefix of every error acknowledgement written by the middleware.
pub const ERROR_ACK_PREFIX: &str = "packet-forward-middleware error";
