//! Rule matching orchestrator.
//!
//! Runs one rule across a universe of symbols and ranks the matches.
//!
//! - Snapshots are fetched with bounded concurrency so the provider's rate
//!   limits hold; evaluation itself is synchronous.
//! - A failure for one symbol (fetch error, malformed snapshot) is logged and
//!   the symbol is skipped. It is counted neither as evaluated nor as matched.
//! - An optional deadline bounds the whole batch. When it expires the run
//!   stops collecting and returns what it has, with `timed_out` set.
//! - Matches rank by condition score descending, ties by symbol ascending.

use crate::domain::error::ScreenerError;
use crate::domain::indicator::{MacdMode, Technicals};
use crate::domain::match_result::{
    rank_matches, MatchResult, SkipReason, SkippedSymbol, StockMatch,
};
use crate::domain::rule::{Rule, RuleStatus};
use crate::domain::rule_eval::{evaluate, Evaluation};
use crate::domain::snapshot::StockSnapshot;
use crate::ports::market_data_port::{CandleRange, MarketDataPort, Resolution};
use crate::ports::rule_store_port::RuleStorePort;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_HISTORY_CANDLES: usize = 100;

#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Maximum number of in-flight provider requests.
    pub concurrency: usize,
    /// Wall-clock budget for a whole batch.
    pub deadline: Option<Duration>,
    /// Candles requested when a rule needs technical indicators.
    pub history_candles: usize,
    pub resolution: Resolution,
    pub macd_mode: MacdMode,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            deadline: None,
            history_candles: DEFAULT_HISTORY_CANDLES,
            resolution: Resolution::Day,
            macd_mode: MacdMode::Standard,
        }
    }
}

pub struct RuleMatcher {
    config: MatcherConfig,
}

impl RuleMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Evaluate a rule against snapshots already in hand.
    pub fn match_snapshots(&self, rule: &Rule, universe: &[StockSnapshot]) -> MatchResult {
        let mut batch = Batch::start();
        for snapshot in universe {
            batch.evaluate(rule, snapshot);
        }
        batch.finish(rule, false)
    }

    /// Fetch every symbol from the provider and evaluate the rule.
    ///
    /// Fails only when the snapshot fetch failed for every symbol; candle
    /// failures during enrichment skip the symbol but never count as an outage.
    #[tracing::instrument(skip_all, fields(rule_id = %rule.id, symbols = symbols.len()))]
    pub async fn run(
        &self,
        rule: &Rule,
        symbols: &[String],
        provider: &dyn MarketDataPort,
    ) -> Result<MatchResult, ScreenerError> {
        let mut seen = HashSet::new();
        let universe: Vec<&String> = symbols.iter().filter(|s| seen.insert(s.as_str())).collect();

        let mut batch = Batch::start();
        let deadline = self
            .config
            .deadline
            .map(|d| tokio::time::Instant::now() + d);

        let mut fetches = stream::iter(universe.iter().copied())
            .map(|symbol| async move {
                let result = self.load_snapshot(rule, symbol, provider).await;
                (symbol, result)
            })
            .buffer_unordered(self.config.concurrency.max(1));

        let mut completed: HashSet<&str> = HashSet::new();
        let mut fetch_failures = 0usize;
        let mut timed_out = false;

        loop {
            let next = match deadline {
                Some(at) => match tokio::time::timeout_at(at, fetches.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        timed_out = true;
                        break;
                    }
                },
                None => fetches.next().await,
            };
            let Some((symbol, result)) = next else {
                break;
            };
            completed.insert(symbol.as_str());

            match result {
                Ok(snapshot) => batch.evaluate(rule, &snapshot),
                Err(failure) => {
                    if let LoadFailure::Snapshot(_) = failure {
                        fetch_failures += 1;
                    }
                    let err = failure.error();
                    warn!(symbol = %symbol, error = %err, "skipping symbol");
                    batch.skip(symbol, SkipReason::from(err));
                }
            }
        }
        drop(fetches);

        if timed_out {
            let pending: Vec<&String> = universe
                .iter()
                .copied()
                .filter(|s| !completed.contains(s.as_str()))
                .collect();
            warn!(
                pending = pending.len(),
                "deadline exceeded, returning partial results"
            );
            for symbol in pending {
                batch.skip(symbol, SkipReason::DeadlineExceeded);
            }
        } else if !universe.is_empty() && fetch_failures == universe.len() {
            return Err(ScreenerError::ProviderOutage {
                attempted: universe.len(),
            });
        }

        Ok(batch.finish(rule, timed_out))
    }

    /// Load a rule from the store, run it, and report the outcome back to
    /// the store's execution counters.
    pub async fn execute(
        &self,
        rule_id: &str,
        symbols: &[String],
        store: &dyn RuleStorePort,
        provider: &dyn MarketDataPort,
    ) -> Result<MatchResult, ScreenerError> {
        let rule = store.get_rule(rule_id)?;
        if rule.status == RuleStatus::Archived {
            return Err(ScreenerError::RuleArchived { id: rule.id });
        }

        let result = self.run(&rule, symbols, provider).await?;

        if let Err(err) = store.increment_execution_stats(&rule.id, result.matching_count > 0) {
            warn!(rule_id = %rule.id, error = %err, "failed to record execution stats");
        }
        Ok(result)
    }

    async fn load_snapshot(
        &self,
        rule: &Rule,
        symbol: &str,
        provider: &dyn MarketDataPort,
    ) -> Result<StockSnapshot, LoadFailure> {
        let snapshot = provider
            .fetch_snapshot(symbol)
            .await
            .map_err(LoadFailure::Snapshot)?;
        if !rule.requires_history() || !snapshot.technicals.is_empty() {
            return Ok(snapshot);
        }

        let candles = provider
            .fetch_candles(
                symbol,
                self.config.resolution,
                CandleRange::Last(self.config.history_candles),
            )
            .await
            .map_err(LoadFailure::Candles)?;
        debug!(symbol = %symbol, candles = candles.len(), "computed technicals");
        let technicals = Technicals::from_candles_with_mode(&candles, self.config.macd_mode);
        Ok(snapshot.with_technicals(technicals))
    }
}

/// Which provider call failed while loading a symbol.
enum LoadFailure {
    Snapshot(ScreenerError),
    Candles(ScreenerError),
}

impl LoadFailure {
    fn error(&self) -> &ScreenerError {
        match self {
            LoadFailure::Snapshot(err) | LoadFailure::Candles(err) => err,
        }
    }
}

/// Accumulates one run's evaluations.
struct Batch {
    started: Instant,
    executed_at: DateTime<Utc>,
    evaluated: usize,
    matches: Vec<StockMatch>,
    partial: Vec<StockMatch>,
    skipped: Vec<SkippedSymbol>,
}

impl Batch {
    fn start() -> Self {
        Self {
            started: Instant::now(),
            executed_at: Utc::now(),
            evaluated: 0,
            matches: Vec::new(),
            partial: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn evaluate(&mut self, rule: &Rule, snapshot: &StockSnapshot) {
        if let Err(err) = snapshot.validate() {
            warn!(symbol = %err.symbol, reason = %err.reason, "skipping malformed snapshot");
            self.skip(&snapshot.symbol, SkipReason::MalformedSnapshot(err.reason));
            return;
        }

        self.evaluated += 1;
        let eval = evaluate(rule, snapshot);
        let total = eval.matched_conditions.len() + eval.failed_conditions.len();

        if eval.matched {
            self.matches.push(stock_match(snapshot, &eval, total, true));
        } else if !eval.matched_conditions.is_empty() {
            self.partial.push(stock_match(snapshot, &eval, total, false));
        }
    }

    fn skip(&mut self, symbol: &str, reason: SkipReason) {
        self.skipped.push(SkippedSymbol {
            symbol: symbol.to_string(),
            reason,
        });
    }

    fn finish(mut self, rule: &Rule, timed_out: bool) -> MatchResult {
        rank_matches(&mut self.matches);
        rank_matches(&mut self.partial);
        self.skipped.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        let execution_time_ms = self.started.elapsed().as_millis() as u64;
        info!(
            rule_id = %rule.id,
            evaluated = self.evaluated,
            matched = self.matches.len(),
            skipped = self.skipped.len(),
            execution_time_ms,
            "rule run complete"
        );

        MatchResult {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            executed_at: self.executed_at,
            total_evaluated: self.evaluated,
            matching_count: self.matches.len(),
            matches: self.matches,
            partial_matches: self.partial,
            skipped: self.skipped,
            execution_time_ms,
            timed_out,
            success: true,
        }
    }
}

fn stock_match(snapshot: &StockSnapshot, eval: &Evaluation, total: usize, matched: bool) -> StockMatch {
    StockMatch {
        symbol: snapshot.symbol.clone(),
        score: eval.condition_score,
        matched_conditions: eval.matched_conditions.clone(),
        current_price: snapshot.current_price,
        price_change: snapshot.change,
        change_percent: snapshot.change_percent,
        reason: reasoning(eval, total, matched),
    }
}

fn reasoning(eval: &Evaluation, total: usize, matched: bool) -> String {
    let passed = eval.matched_conditions.len();
    let mut reason = if matched {
        format!("Matched {}/{} conditions", passed, total)
    } else {
        format!("Partially matched {}/{} conditions", passed, total)
    };
    if passed > 0 {
        reason.push_str(": ");
        reason.push_str(&eval.matched_conditions.join(", "));
    }
    if !eval.failed_conditions.is_empty() {
        reason.push_str("; failed: ");
        reason.push_str(&eval.failed_conditions.join(", "));
    }
    reason
}
