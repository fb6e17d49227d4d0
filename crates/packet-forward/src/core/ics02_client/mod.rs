//! ICS 02: Client heights, as carried in packet timeouts.

pub mod error;
pub mod height;
