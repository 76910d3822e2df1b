//! Mock HTTP servers.

pub mod network;

pub use network::*;
