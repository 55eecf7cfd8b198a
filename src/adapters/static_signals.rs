//! Static news and analyst signal sources.

use crate::domain::error::ScreenerError;
use crate::ports::signal_port::SignalPort;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const NEUTRAL: f64 = 50.0;

/// Every symbol scores neutral on both signals.
pub struct NeutralSignals;

impl SignalPort for NeutralSignals {
    fn news_score(&self, _symbol: &str) -> f64 {
        NEUTRAL
    }

    fn analyst_score(&self, _symbol: &str) -> f64 {
        NEUTRAL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SignalPair {
    #[serde(default = "neutral")]
    pub news: f64,
    #[serde(default = "neutral")]
    pub analyst: f64,
}

fn neutral() -> f64 {
    NEUTRAL
}

/// Per-symbol fixed signals; unknown symbols are neutral.
///
/// The JSON form is `{"AAPL": {"news": 70, "analyst": 80}, ...}`.
#[derive(Debug, Clone, Default)]
pub struct FixedSignals {
    signals: HashMap<String, SignalPair>,
}

impl FixedSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: &str, news: f64, analyst: f64) -> Self {
        self.signals
            .insert(symbol.to_uppercase(), SignalPair { news, analyst });
        self
    }

    pub fn from_json(content: &str) -> Result<Self, ScreenerError> {
        let raw: HashMap<String, SignalPair> = serde_json::from_str(content)?;
        Ok(Self {
            signals: raw
                .into_iter()
                .map(|(symbol, pair)| (symbol.to_uppercase(), pair))
                .collect(),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScreenerError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    fn pair(&self, symbol: &str) -> Option<&SignalPair> {
        self.signals.get(&symbol.to_uppercase())
    }
}

impl SignalPort for FixedSignals {
    fn news_score(&self, symbol: &str) -> f64 {
        self.pair(symbol).map_or(NEUTRAL, |p| p.news)
    }

    fn analyst_score(&self, symbol: &str) -> f64 {
        self.pair(symbol).map_or(NEUTRAL, |p| p.analyst)
    }
}
