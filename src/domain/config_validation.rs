//! Engine configuration: validation and typed construction.
//!
//! Every key is checked before a run so bad values surface as config errors
//! instead of odd runtime behaviour.

use crate::domain::error::ScreenerError;
use crate::domain::indicator::MacdMode;
use crate::domain::matcher::{MatcherConfig, DEFAULT_CONCURRENCY, DEFAULT_HISTORY_CANDLES};
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::Resolution;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_FORMAT: &str = "pretty";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["pretty", "json"];

/// Typed view of a validated configuration file.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub matcher: MatcherConfig,
    pub snapshots: Option<PathBuf>,
    pub candles_dir: Option<PathBuf>,
    pub signals: Option<PathBuf>,
    pub rules_path: Option<PathBuf>,
    pub log_level: String,
    pub log_format: String,
}

impl EngineConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ScreenerError> {
        validate_engine_config(config)?;

        let deadline_ms = int_value(config, "engine", "deadline_ms", 0)?;
        let resolution = match non_empty(config, "engine", "resolution") {
            Some(code) => parse_resolution(&code)?,
            None => Resolution::Day,
        };
        let macd_mode = match non_empty(config, "engine", "macd_mode") {
            Some(mode) => parse_macd_mode(&mode)?,
            None => MacdMode::Standard,
        };

        Ok(Self {
            matcher: MatcherConfig {
                concurrency: int_value(config, "engine", "concurrency", DEFAULT_CONCURRENCY as i64)?
                    as usize,
                deadline: (deadline_ms > 0).then(|| Duration::from_millis(deadline_ms as u64)),
                history_candles: int_value(
                    config,
                    "engine",
                    "history_candles",
                    DEFAULT_HISTORY_CANDLES as i64,
                )? as usize,
                resolution,
                macd_mode,
            },
            snapshots: non_empty(config, "data", "snapshots").map(PathBuf::from),
            candles_dir: non_empty(config, "data", "candles_dir").map(PathBuf::from),
            signals: non_empty(config, "data", "signals").map(PathBuf::from),
            rules_path: non_empty(config, "rules", "path").map(PathBuf::from),
            log_level: non_empty(config, "logging", "level")
                .map(|l| l.to_lowercase())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format: non_empty(config, "logging", "format")
                .map(|f| f.to_lowercase())
                .unwrap_or_else(|| DEFAULT_LOG_FORMAT.to_string()),
        })
    }

    /// Data sources are needed by every command that touches market data.
    pub fn require_data(&self) -> Result<(), ScreenerError> {
        if self.snapshots.is_none() && self.candles_dir.is_none() {
            return Err(ScreenerError::ConfigMissing {
                section: "data".to_string(),
                key: "snapshots".to_string(),
            });
        }
        Ok(())
    }

    pub fn require_rules(&self) -> Result<&PathBuf, ScreenerError> {
        self.rules_path
            .as_ref()
            .ok_or_else(|| ScreenerError::ConfigMissing {
                section: "rules".to_string(),
                key: "path".to_string(),
            })
    }
}

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    validate_concurrency(config)?;
    validate_deadline(config)?;
    validate_history_candles(config)?;
    validate_resolution(config)?;
    validate_macd_mode(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_concurrency(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    let value = int_value(config, "engine", "concurrency", DEFAULT_CONCURRENCY as i64)?;
    if value < 1 {
        return Err(invalid("engine", "concurrency", "concurrency must be at least 1"));
    }
    Ok(())
}

fn validate_deadline(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    let value = int_value(config, "engine", "deadline_ms", 0)?;
    if value < 0 {
        return Err(invalid("engine", "deadline_ms", "deadline_ms must be non-negative"));
    }
    Ok(())
}

fn validate_history_candles(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    let value = int_value(
        config,
        "engine",
        "history_candles",
        DEFAULT_HISTORY_CANDLES as i64,
    )?;
    if value < 2 {
        return Err(invalid(
            "engine",
            "history_candles",
            "history_candles must be at least 2",
        ));
    }
    Ok(())
}

fn validate_resolution(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    if let Some(code) = non_empty(config, "engine", "resolution") {
        parse_resolution(&code)?;
    }
    Ok(())
}

fn validate_macd_mode(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    if let Some(mode) = non_empty(config, "engine", "macd_mode") {
        parse_macd_mode(&mode)?;
    }
    Ok(())
}

fn validate_logging(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    if let Some(level) = non_empty(config, "logging", "level") {
        if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            return Err(invalid(
                "logging",
                "level",
                &format!("unknown level '{}', expected one of {}", level, LOG_LEVELS.join(", ")),
            ));
        }
    }
    if let Some(format) = non_empty(config, "logging", "format") {
        if !LOG_FORMATS.contains(&format.to_lowercase().as_str()) {
            return Err(invalid(
                "logging",
                "format",
                &format!("unknown format '{}', expected pretty or json", format),
            ));
        }
    }
    Ok(())
}

fn parse_resolution(code: &str) -> Result<Resolution, ScreenerError> {
    Resolution::parse(code).ok_or_else(|| {
        invalid(
            "engine",
            "resolution",
            &format!("unknown resolution '{}', expected 1, 5, 15, 30, 60, D, W or M", code),
        )
    })
}

fn parse_macd_mode(mode: &str) -> Result<MacdMode, ScreenerError> {
    match mode.to_lowercase().as_str() {
        "standard" => Ok(MacdMode::Standard),
        "legacy" => Ok(MacdMode::Legacy),
        _ => Err(invalid(
            "engine",
            "macd_mode",
            &format!("unknown macd_mode '{}', expected standard or legacy", mode),
        )),
    }
}

/// Integer key with a default. A present but non-numeric value is an error,
/// not a silent fallback.
fn int_value(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, ScreenerError> {
    match non_empty(config, section, key) {
        None => Ok(default),
        Some(s) => s
            .parse::<i64>()
            .map_err(|_| invalid(section, key, &format!("'{}' is not an integer", s))),
    }
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn invalid(section: &str, key: &str, reason: &str) -> ScreenerError {
    ScreenerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
