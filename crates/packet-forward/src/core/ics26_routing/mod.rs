//! ICS 26: Routing module callbacks, implemented by IBC applications and the
//! middlewares stacked on top of them.

pub mod context;
