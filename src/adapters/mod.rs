//! Concrete adapter implementations for ports.

pub mod file_config_adapter;
pub mod file_market_data;
pub mod json_rule_store;
pub mod static_signals;
