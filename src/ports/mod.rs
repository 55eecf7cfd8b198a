//! Port traits for the collaborators the engine depends on.

pub mod config_port;
pub mod market_data_port;
pub mod rule_store_port;
pub mod signal_port;
