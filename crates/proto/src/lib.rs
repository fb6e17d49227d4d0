//! Protobuf types of the state persisted by the IBC packet-forward middleware.
//!
//! The messages mirror the `packetforward.v1` schema, so that records written
//! by one implementation can be read back by any other one.

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::derive_partial_eq_without_eq)]
#![forbid(unsafe_code)]

pub mod packetforward {
    pub mod v1 {
        include!("prost/packetforward.v1.rs");
    }
}
