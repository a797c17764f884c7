//! Relay server wiring

pub mod config;
pub mod relay;

pub use config::RelayConfig;
pub use relay::RelayServer;
