//! ICS 20: Fungible token transfer, as seen by a middleware wrapping the transfer application.

pub mod amount;
pub mod coin;
pub mod context;
pub mod denom;
pub mod error;
pub mod msgs;
pub mod packet;

/// Module identifier for the ICS20 application.
pub const MODULE_ID_STR: &str = "transfer";

/// The port identifier that the ICS20 applications
/// typically bind with.
pub const PORT_ID_STR: &str = "transfer";

/// ICS20 application current version.
pub const VERSION: &str = "ics20-1";
