//! Orchestrator output types.
//!
//! `MatchResult` serialises directly to the caller-facing JSON shape:
//! `{rule_id, executed_at, total_stocks_evaluated, matching_stocks, results,
//! execution_time_ms, success, ...}`.

use crate::domain::error::ScreenerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMatch {
    pub symbol: String,
    pub score: f64,
    pub matched_conditions: Vec<String>,
    pub current_price: f64,
    pub price_change: f64,
    pub change_percent: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    DataUnavailable(String),
    InsufficientHistory { have: usize, need: usize },
    MalformedSnapshot(String),
    DeadlineExceeded,
}

impl From<&ScreenerError> for SkipReason {
    fn from(err: &ScreenerError) -> Self {
        match err {
            ScreenerError::InsufficientHistory { have, need, .. } => SkipReason::InsufficientHistory {
                have: *have,
                need: *need,
            },
            ScreenerError::MalformedSnapshot(e) => SkipReason::MalformedSnapshot(e.reason.clone()),
            ScreenerError::DataUnavailable { reason, .. } => {
                SkipReason::DataUnavailable(reason.clone())
            }
            other => SkipReason::DataUnavailable(other.to_string()),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DataUnavailable(r) => write!(f, "data unavailable: {}", r),
            SkipReason::InsufficientHistory { have, need } => {
                write!(f, "insufficient history: have {}, need {}", have, need)
            }
            SkipReason::MalformedSnapshot(r) => write!(f, "malformed snapshot: {}", r),
            SkipReason::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub rule_id: String,
    pub rule_name: String,
    pub executed_at: DateTime<Utc>,
    #[serde(rename = "total_stocks_evaluated")]
    pub total_evaluated: usize,
    #[serde(rename = "matching_stocks")]
    pub matching_count: usize,
    #[serde(rename = "results")]
    pub matches: Vec<StockMatch>,
    pub partial_matches: Vec<StockMatch>,
    pub skipped: Vec<SkippedSymbol>,
    pub execution_time_ms: u64,
    pub timed_out: bool,
    pub success: bool,
}

impl MatchResult {
    pub fn symbols(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.symbol.as_str()).collect()
    }
}

/// Score descending, then symbol ascending.
pub fn rank_matches(matches: &mut [StockMatch]) {
    matches.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.symbol.cmp(&b.symbol)));
}
