//! The designs and logic pertaining to the transport, authentication, and
//! ordering layers of the IBC protocol that the middleware depends on.

pub mod ics02_client;
pub mod ics04_channel;
pub mod ics24_host;
pub mod ics26_routing;
