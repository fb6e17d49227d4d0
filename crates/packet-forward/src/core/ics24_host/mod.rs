//! ICS 24: Host defines the identifiers the middleware validates and keys its state by.

pub mod error;
pub mod identifier;
mod validate;
