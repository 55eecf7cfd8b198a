//! Domain error types.

/// A rule definition error, pinned to the JSON path of the offending node.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid rule at {path}: {message}")]
pub struct RuleError {
    pub message: String,
    pub path: String,
}

impl RuleError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Format the error with the rule id it belongs to, for CLI output.
    pub fn display_with_context(&self, rule_id: &str) -> String {
        format!(
            "rule '{rule_id}'\n  at {path}\n  {message}",
            rule_id = rule_id,
            path = self.path,
            message = self.message
        )
    }
}

/// A snapshot that cannot be evaluated at all.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("malformed snapshot for {symbol}: {reason}")]
pub struct SnapshotError {
    pub symbol: String,
    pub reason: String,
}

/// Top-level error type for stockscreen.
#[derive(Debug, thiserror::Error)]
pub enum ScreenerError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    RuleInvalid(#[from] RuleError),

    #[error("invalid symbol list: {0}")]
    InvalidSymbols(#[from] crate::domain::universe::UniverseError),

    #[error("rule not found: {id}")]
    RuleNotFound { id: String },

    #[error("rule {id} is archived and cannot be executed")]
    RuleArchived { id: String },

    #[error("data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("insufficient history for {symbol}: have {have} candles, need {need}")]
    InsufficientHistory {
        symbol: String,
        have: usize,
        need: usize,
    },

    #[error(transparent)]
    MalformedSnapshot(#[from] SnapshotError),

    #[error("market data provider failed for all {attempted} symbols")]
    ProviderOutage { attempted: usize },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScreenerError {
    /// Errors that only affect one symbol and must not abort a batch.
    pub fn is_symbol_scoped(&self) -> bool {
        matches!(
            self,
            ScreenerError::DataUnavailable { .. }
                | ScreenerError::InsufficientHistory { .. }
                | ScreenerError::MalformedSnapshot(_)
        )
    }
}

impl From<&ScreenerError> for std::process::ExitCode {
    fn from(err: &ScreenerError) -> Self {
        let code: u8 = match err {
            ScreenerError::Io(_) | ScreenerError::Json(_) => 1,
            ScreenerError::ConfigParse { .. }
            | ScreenerError::ConfigMissing { .. }
            | ScreenerError::ConfigInvalid { .. }
            | ScreenerError::InvalidSymbols(_) => 2,
            ScreenerError::DataUnavailable { .. }
            | ScreenerError::InsufficientHistory { .. }
            | ScreenerError::ProviderOutage { .. } => 3,
            ScreenerError::RuleInvalid(_)
            | ScreenerError::RuleNotFound { .. }
            | ScreenerError::RuleArchived { .. } => 4,
            ScreenerError::MalformedSnapshot(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}
