//! ICS 04: Channel and packet semantics, as far as a packet-lifecycle
//! middleware observes them.

pub mod acknowledgement;
pub mod channel;
pub mod context;
pub mod error;
pub mod packet;

mod version;
pub use version::Version;
