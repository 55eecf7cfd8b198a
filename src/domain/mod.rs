//! Core domain types and logic.

pub mod candle;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod match_result;
pub mod matcher;
pub mod rule;
pub mod rule_eval;
pub mod rule_validation;
pub mod scoring;
pub mod snapshot;
pub mod universe;
