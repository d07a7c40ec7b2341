//! Client registry, per-client pumps, and the socket session that joins them.

pub mod client;
pub mod frame;
pub mod hub;
pub mod pumps;
pub mod session;
