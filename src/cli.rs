//! CLI definition and dispatch.
//!
//! Every command prints its result as JSON on stdout; diagnostics and logs go
//! to stderr.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::file_market_data::FileMarketData;
use crate::adapters::json_rule_store::{read_definitions, JsonRuleStore};
use crate::adapters::static_signals::{FixedSignals, NeutralSignals};
use crate::domain::config_validation::{EngineConfig, DEFAULT_LOG_FORMAT, DEFAULT_LOG_LEVEL};
use crate::domain::error::ScreenerError;
use crate::domain::indicator::Technicals;
use crate::domain::match_result::MatchResult;
use crate::domain::matcher::RuleMatcher;
use crate::domain::rule::RuleStatus;
use crate::domain::rule_validation::{validate_rule, RuleDefinition};
use crate::domain::scoring::{rank, CompositeScorer, ScoreBreakdown};
use crate::domain::universe::{parse_single_symbol, resolve_universe};
use crate::logging::init_logging;
use crate::ports::market_data_port::{CandleRange, MarketDataPort};
use crate::ports::rule_store_port::{RuleFilter, RuleStorePort};
use crate::ports::signal_port::SignalPort;

#[derive(Parser, Debug)]
#[command(name = "stockscreen", about = "Rule-based stock screener and scorer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a stored rule against the symbol universe
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        rule: String,
        /// Comma-separated symbols; defaults to every known symbol
        #[arg(long)]
        symbols: Option<String>,
    },
    /// Validate a file of rule definitions
    Validate {
        #[arg(long)]
        rule_file: PathBuf,
    },
    /// Composite score for each symbol, ranked
    Score {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
    },
    /// Technical indicators computed from a symbol's candles
    Indicators {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
    },
    /// List stored rules
    ListRules {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Run {
            config,
            rule,
            symbols,
        } => cmd_run(&config, &rule, symbols.as_deref()),
        Command::Validate { rule_file } => return cmd_validate(&rule_file),
        Command::Score { config, symbols } => cmd_score(&config, symbols.as_deref()),
        Command::Indicators { config, symbol } => cmd_indicators(&config, &symbol),
        Command::ListRules {
            config,
            status,
            tag,
        } => cmd_list_rules(&config, status.as_deref(), tag),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load and validate a config file, then start logging from it.
pub fn load_config(path: &Path) -> Result<EngineConfig, ScreenerError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    let config = EngineConfig::from_config(&adapter)?;
    init_logging(&config.log_level, &config.log_format);
    info!(path = %path.display(), "loaded config");
    Ok(config)
}

pub fn build_market_data(config: &EngineConfig) -> Result<FileMarketData, ScreenerError> {
    config.require_data()?;
    FileMarketData::from_paths(config.snapshots.as_deref(), config.candles_dir.as_deref())
}

pub fn build_signals(config: &EngineConfig) -> Result<Box<dyn SignalPort>, ScreenerError> {
    Ok(match &config.signals {
        Some(path) => Box::new(FixedSignals::from_file(path)?),
        None => Box::new(NeutralSignals),
    })
}

fn runtime() -> Result<tokio::runtime::Runtime, ScreenerError> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn emit<T: Serialize>(value: &T) -> Result<(), ScreenerError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_run(config_path: &Path, rule_id: &str, symbols: Option<&str>) -> Result<(), ScreenerError> {
    let config = load_config(config_path)?;
    let store = JsonRuleStore::from_file(config.require_rules()?)?;
    let provider = build_market_data(&config)?;

    let result = runtime()?.block_on(execute_rule(&config, rule_id, symbols, &store, &provider))?;
    store.save()?;
    emit(&result)
}

/// Resolve the universe and execute a stored rule against it.
pub async fn execute_rule(
    config: &EngineConfig,
    rule_id: &str,
    symbols: Option<&str>,
    store: &dyn RuleStorePort,
    provider: &dyn MarketDataPort,
) -> Result<MatchResult, ScreenerError> {
    let universe = resolve_universe(symbols, provider).await?;
    info!(rule_id, symbols = universe.len(), "executing rule");
    RuleMatcher::new(config.matcher.clone())
        .execute(rule_id, &universe, store, provider)
        .await
}

#[derive(Debug, Serialize)]
pub struct RuleIssue {
    pub index: usize,
    pub id: String,
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub valid: Vec<String>,
    pub errors: Vec<RuleIssue>,
}

/// Validate every definition independently, collecting all failures.
pub fn validate_definitions(definitions: &[RuleDefinition]) -> ValidationReport {
    let mut report = ValidationReport::default();
    for (index, def) in definitions.iter().enumerate() {
        match validate_rule(def) {
            Ok(rule) => report.valid.push(rule.id),
            Err(e) => {
                eprintln!("{}", e.display_with_context(&def.id));
                report.errors.push(RuleIssue {
                    index,
                    id: def.id.clone(),
                    path: e.path,
                    message: e.message,
                });
            }
        }
    }
    report
}

fn cmd_validate(rule_file: &Path) -> ExitCode {
    init_logging(DEFAULT_LOG_LEVEL, DEFAULT_LOG_FORMAT);

    let definitions = match std::fs::read_to_string(rule_file)
        .map_err(ScreenerError::from)
        .and_then(|content| read_definitions(&content))
    {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let report = validate_definitions(&definitions);
    if let Err(e) = emit(&report) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if report.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(4)
    }
}

fn cmd_score(config_path: &Path, symbols: Option<&str>) -> Result<(), ScreenerError> {
    let config = load_config(config_path)?;
    let provider = build_market_data(&config)?;
    let signals = build_signals(&config)?;

    let breakdowns = runtime()?.block_on(score_symbols(symbols, &provider, signals.as_ref()))?;
    emit(&breakdowns)
}

/// Composite-score every symbol in the universe. Symbols whose data cannot
/// be fetched are logged and left out.
pub async fn score_symbols(
    symbols: Option<&str>,
    provider: &dyn MarketDataPort,
    signals: &dyn SignalPort,
) -> Result<Vec<ScoreBreakdown>, ScreenerError> {
    let universe = resolve_universe(symbols, provider).await?;
    let scorer = CompositeScorer::new(signals);

    let mut breakdowns = Vec::with_capacity(universe.len());
    for symbol in &universe {
        let snapshot = match provider.fetch_snapshot(symbol).await {
            Ok(s) => s,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "skipping symbol");
                continue;
            }
        };
        if let Err(e) = snapshot.validate() {
            warn!(symbol = %symbol, reason = %e.reason, "skipping malformed snapshot");
            continue;
        }
        breakdowns.push(scorer.score_snapshot(&snapshot));
    }

    rank(&mut breakdowns);
    Ok(breakdowns)
}

#[derive(Debug, Serialize)]
pub struct IndicatorReport {
    pub symbol: String,
    pub candles: usize,
    pub as_of: Option<DateTime<Utc>>,
    pub technicals: Technicals,
}

fn cmd_indicators(config_path: &Path, symbol: &str) -> Result<(), ScreenerError> {
    let config = load_config(config_path)?;
    let provider = build_market_data(&config)?;
    let symbol = parse_single_symbol(symbol)?;

    let report = runtime()?.block_on(compute_indicators(&config, &symbol, &provider))?;
    emit(&report)
}

pub async fn compute_indicators(
    config: &EngineConfig,
    symbol: &str,
    provider: &dyn MarketDataPort,
) -> Result<IndicatorReport, ScreenerError> {
    let candles = provider
        .fetch_candles(
            symbol,
            config.matcher.resolution,
            CandleRange::Last(config.matcher.history_candles),
        )
        .await?;

    Ok(IndicatorReport {
        symbol: symbol.to_string(),
        candles: candles.len(),
        as_of: candles.last().map(|c| c.timestamp),
        technicals: Technicals::from_candles_with_mode(&candles, config.matcher.macd_mode),
    })
}

fn cmd_list_rules(
    config_path: &Path,
    status: Option<&str>,
    tag: Option<String>,
) -> Result<(), ScreenerError> {
    let config = load_config(config_path)?;
    let store = JsonRuleStore::from_file(config.require_rules()?)?;
    let filter = build_filter(status, tag)?;

    let definitions: Vec<RuleDefinition> = store
        .list_rules(&filter)?
        .iter()
        .map(|r| r.to_definition())
        .collect();
    emit(&definitions)
}

pub fn build_filter(status: Option<&str>, tag: Option<String>) -> Result<RuleFilter, ScreenerError> {
    let status = match status {
        Some(s) => Some(RuleStatus::parse(s).ok_or_else(|| ScreenerError::ConfigInvalid {
            section: "cli".to_string(),
            key: "status".to_string(),
            reason: format!("unknown status '{}', expected active, draft or archived", s),
        })?),
        None => None,
    };
    Ok(RuleFilter { status, tag })
}
