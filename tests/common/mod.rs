#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use stockscreen::domain::candle::Candle;
use stockscreen::domain::error::ScreenerError;
use stockscreen::domain::rule::{Condition, Rule};
use stockscreen::domain::rule_eval::ConditionObserver;
use stockscreen::domain::rule_validation::{validate_rule, RuleDefinition};
use stockscreen::domain::snapshot::StockSnapshot;
use stockscreen::ports::market_data_port::{CandleRange, MarketDataPort, Resolution};
use stockscreen::ports::rule_store_port::{RuleFilter, RuleStorePort};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct MockMarketData {
    pub snapshots: HashMap<String, StockSnapshot>,
    pub candles: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
    pub candle_errors: HashMap<String, String>,
    pub delays: HashMap<String, Duration>,
    pub snapshot_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            snapshots: HashMap::new(),
            candles: HashMap::new(),
            errors: HashMap::new(),
            candle_errors: HashMap::new(),
            delays: HashMap::new(),
            snapshot_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_snapshot(mut self, snapshot: StockSnapshot) -> Self {
        self.snapshots.insert(snapshot.symbol.clone(), snapshot);
        self
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.candles.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn with_candle_error(mut self, symbol: &str, reason: &str) -> Self {
        self.candle_errors
            .insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn with_delay(mut self, symbol: &str, delay: Duration) -> Self {
        self.delays.insert(symbol.to_string(), delay);
        self
    }

    pub fn peak_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataPort for MockMarketData {
    async fn fetch_snapshot(&self, symbol: &str) -> Result<StockSnapshot, ScreenerError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .get(symbol)
            .copied()
            .unwrap_or(Duration::from_millis(1));
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(reason) = self.errors.get(symbol) {
            return Err(ScreenerError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        self.snapshots
            .get(symbol)
            .cloned()
            .ok_or_else(|| ScreenerError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "unknown symbol".to_string(),
            })
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        _resolution: Resolution,
        range: CandleRange,
    ) -> Result<Vec<Candle>, ScreenerError> {
        if let Some(reason) = self.candle_errors.get(symbol) {
            return Err(ScreenerError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        let candles = self.candles.get(symbol).cloned().unwrap_or_default();
        Ok(match range {
            CandleRange::Last(n) => {
                let start = candles.len().saturating_sub(n);
                candles[start..].to_vec()
            }
            CandleRange::Between { from, to } => candles
                .into_iter()
                .filter(|c| c.timestamp >= from && c.timestamp <= to)
                .collect(),
        })
    }

    async fn list_symbols(&self) -> Result<Vec<String>, ScreenerError> {
        let mut symbols: Vec<String> = self.snapshots.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// Rule store that records every stats update.
pub struct RecordingRuleStore {
    pub rules: Mutex<Vec<Rule>>,
    pub stats_calls: Mutex<Vec<(String, bool)>>,
    pub fail_stats: bool,
}

impl RecordingRuleStore {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules: Mutex::new(rules),
            stats_calls: Mutex::new(Vec::new()),
            fail_stats: false,
        }
    }

    pub fn failing_stats(mut self) -> Self {
        self.fail_stats = true;
        self
    }

    pub fn calls(&self) -> Vec<(String, bool)> {
        self.stats_calls.lock().unwrap().clone()
    }
}

impl RuleStorePort for RecordingRuleStore {
    fn get_rule(&self, id: &str) -> Result<Rule, ScreenerError> {
        self.rules
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| ScreenerError::RuleNotFound { id: id.to_string() })
    }

    fn list_rules(&self, filter: &RuleFilter) -> Result<Vec<Rule>, ScreenerError> {
        Ok(self
            .rules
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    fn increment_execution_stats(&self, id: &str, matched: bool) -> Result<(), ScreenerError> {
        self.stats_calls
            .lock()
            .unwrap()
            .push((id.to_string(), matched));
        if self.fail_stats {
            return Err(ScreenerError::Io(std::io::Error::other("store offline")));
        }
        let mut rules = self.rules.lock().unwrap();
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ScreenerError::RuleNotFound { id: id.to_string() })?;
        rule.record_execution(matched);
        Ok(())
    }
}

/// Records the field name of every leaf the logical pass visits.
#[derive(Default)]
pub struct CountingObserver {
    pub visited: Vec<(String, bool)>,
}

impl ConditionObserver for CountingObserver {
    fn observe(&mut self, condition: &Condition, passed: bool) {
        self.visited
            .push((condition.field_name().to_string(), passed));
    }
}

pub fn ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 15, 30, 0).unwrap()
}

pub fn make_snapshot(symbol: &str, price: f64) -> StockSnapshot {
    StockSnapshot {
        symbol: symbol.to_string(),
        current_price: price,
        change: price * 0.01,
        change_percent: 1.0,
        volume: 1_000_000.0,
        high: price * 1.02,
        low: price * 0.98,
        open: price * 0.99,
        previous_close: price * 0.99,
        timestamp: ts(),
        avg_volume: Some(800_000.0),
        sector: None,
        fundamentals: BTreeMap::new(),
        technicals: Default::default(),
    }
}

pub fn with_fundamentals(mut snapshot: StockSnapshot, values: &[(&str, f64)]) -> StockSnapshot {
    for (k, v) in values {
        snapshot.fundamentals.insert(k.to_string(), *v);
    }
    snapshot
}

/// Daily candles with closes rising by `step` from `start`.
pub fn make_candles(n: usize, start: f64, step: f64) -> Vec<Candle> {
    let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = start + step * i as f64;
            Candle {
                timestamp: first + ChronoDuration::days(i as i64),
                open: close - step / 2.0,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 10_000.0 + i as f64 * 100.0,
            }
        })
        .collect()
}

pub fn rule_from_json(value: serde_json::Value) -> Rule {
    let def: RuleDefinition = serde_json::from_value(value).unwrap();
    validate_rule(&def).unwrap()
}

/// Active rule: pe_ratio < 15 AND dividend_yield > 3, base 50, weights 20/15.
pub fn value_rule() -> Rule {
    rule_from_json(serde_json::json!({
        "id": "value-dividend",
        "name": "Value with dividend",
        "priority": 1,
        "status": "active",
        "conditions": {"operator": "AND", "conditions": [
            {"field": "pe_ratio", "operator": "less_than", "value": 15, "type": "fundamental"},
            {"field": "dividend_yield", "operator": "greater_than", "value": 3, "type": "fundamental"}
        ]},
        "scoring_config": {"base_score": 50, "condition_weights": {"pe_ratio": 20, "dividend_yield": 15}}
    }))
}

pub fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
