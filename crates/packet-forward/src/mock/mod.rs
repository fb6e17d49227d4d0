pub mod context;
pub mod network;
pub mod transfer;
