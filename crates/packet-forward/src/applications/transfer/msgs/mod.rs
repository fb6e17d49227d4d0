//! Message definitions for the ICS20 fungible token transfer application.

pub mod transfer;
