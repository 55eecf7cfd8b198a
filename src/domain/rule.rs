//! Typed rule model.
//!
//! A [`Rule`] is only ever built by [`crate::domain::rule_validation::validate_rule`],
//! so every condition here references a known field with an operator valid
//! for that field's value kind:
//! - `Condition`: a leaf predicate, tagged by data type
//! - `ConditionGroup`: AND/OR over an ordered list of nodes (groups may nest)
//! - `ScoringConfig`: base score plus per-field weights
//! - `Rule`: the definition with lifecycle and execution counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Whether a field carries a number or a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TechnicalField {
    Rsi,
    Sma20,
    Sma50,
    Ema12,
    Ema26,
    Macd,
    MacdSignal,
    MacdHistogram,
    BollingerUpper,
    BollingerMiddle,
    BollingerLower,
    StochasticK,
    PriceVsSma20,
}

impl TechnicalField {
    pub const ALL: [TechnicalField; 13] = [
        TechnicalField::Rsi,
        TechnicalField::Sma20,
        TechnicalField::Sma50,
        TechnicalField::Ema12,
        TechnicalField::Ema26,
        TechnicalField::Macd,
        TechnicalField::MacdSignal,
        TechnicalField::MacdHistogram,
        TechnicalField::BollingerUpper,
        TechnicalField::BollingerMiddle,
        TechnicalField::BollingerLower,
        TechnicalField::StochasticK,
        TechnicalField::PriceVsSma20,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TechnicalField::Rsi => "rsi",
            TechnicalField::Sma20 => "sma_20",
            TechnicalField::Sma50 => "sma_50",
            TechnicalField::Ema12 => "ema_12",
            TechnicalField::Ema26 => "ema_26",
            TechnicalField::Macd => "macd",
            TechnicalField::MacdSignal => "macd_signal",
            TechnicalField::MacdHistogram => "macd_histogram",
            TechnicalField::BollingerUpper => "bollinger_upper",
            TechnicalField::BollingerMiddle => "bollinger_middle",
            TechnicalField::BollingerLower => "bollinger_lower",
            TechnicalField::StochasticK => "stochastic_k",
            TechnicalField::PriceVsSma20 => "price_vs_sma_20",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FundamentalField {
    PeRatio,
    PbRatio,
    PsRatio,
    DividendYield,
    MarketCap,
    Eps,
    Beta,
    Roe,
    DebtToEquity,
    RevenueGrowth,
    ProfitMargin,
    Sector,
}

impl FundamentalField {
    pub const ALL: [FundamentalField; 12] = [
        FundamentalField::PeRatio,
        FundamentalField::PbRatio,
        FundamentalField::PsRatio,
        FundamentalField::DividendYield,
        FundamentalField::MarketCap,
        FundamentalField::Eps,
        FundamentalField::Beta,
        FundamentalField::Roe,
        FundamentalField::DebtToEquity,
        FundamentalField::RevenueGrowth,
        FundamentalField::ProfitMargin,
        FundamentalField::Sector,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FundamentalField::PeRatio => "pe_ratio",
            FundamentalField::PbRatio => "pb_ratio",
            FundamentalField::PsRatio => "ps_ratio",
            FundamentalField::DividendYield => "dividend_yield",
            FundamentalField::MarketCap => "market_cap",
            FundamentalField::Eps => "eps",
            FundamentalField::Beta => "beta",
            FundamentalField::Roe => "roe",
            FundamentalField::DebtToEquity => "debt_to_equity",
            FundamentalField::RevenueGrowth => "revenue_growth",
            FundamentalField::ProfitMargin => "profit_margin",
            FundamentalField::Sector => "sector",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn kind(self) -> ValueKind {
        match self {
            FundamentalField::Sector => ValueKind::Text,
            _ => ValueKind::Number,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketField {
    Price,
    Change,
    ChangePercent,
    Volume,
    AvgVolume,
    VolumeRatio,
    High,
    Low,
    Open,
    PreviousClose,
    DayRangePercent,
    Symbol,
}

impl MarketField {
    pub const ALL: [MarketField; 12] = [
        MarketField::Price,
        MarketField::Change,
        MarketField::ChangePercent,
        MarketField::Volume,
        MarketField::AvgVolume,
        MarketField::VolumeRatio,
        MarketField::High,
        MarketField::Low,
        MarketField::Open,
        MarketField::PreviousClose,
        MarketField::DayRangePercent,
        MarketField::Symbol,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MarketField::Price => "price",
            MarketField::Change => "change",
            MarketField::ChangePercent => "change_percent",
            MarketField::Volume => "volume",
            MarketField::AvgVolume => "avg_volume",
            MarketField::VolumeRatio => "volume_ratio",
            MarketField::High => "high",
            MarketField::Low => "low",
            MarketField::Open => "open",
            MarketField::PreviousClose => "previous_close",
            MarketField::DayRangePercent => "day_range_percent",
            MarketField::Symbol => "symbol",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn kind(self) -> ValueKind {
        match self {
            MarketField::Symbol => ValueKind::Text,
            _ => ValueKind::Number,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeField {
    Hour,
    MinuteOfDay,
    DayOfWeek,
    DayOfMonth,
}

impl TimeField {
    pub const ALL: [TimeField; 4] = [
        TimeField::Hour,
        TimeField::MinuteOfDay,
        TimeField::DayOfWeek,
        TimeField::DayOfMonth,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TimeField::Hour => "hour",
            TimeField::MinuteOfDay => "minute_of_day",
            TimeField::DayOfWeek => "day_of_week",
            TimeField::DayOfMonth => "day_of_month",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Inclusive range of values the field can take.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            TimeField::Hour => (0.0, 23.0),
            TimeField::MinuteOfDay => (0.0, 1439.0),
            TimeField::DayOfWeek => (0.0, 6.0),
            TimeField::DayOfMonth => (1.0, 31.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NumericTest {
    Equals(f64),
    NotEquals(f64),
    GreaterThan(f64),
    GreaterThanOrEqual(f64),
    LessThan(f64),
    LessThanOrEqual(f64),
    Between { lower: f64, upper: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextTest {
    Equals(String),
    NotEquals(String),
    In(Vec<String>),
    Contains(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    Numeric(NumericTest),
    Text(TextTest),
}

/// A single predicate over one snapshot field, tagged by data type.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Technical {
        field: TechnicalField,
        test: NumericTest,
    },
    Fundamental {
        field: FundamentalField,
        test: Test,
    },
    Market {
        field: MarketField,
        test: Test,
    },
    Time {
        field: TimeField,
        test: NumericTest,
    },
}

impl Condition {
    pub fn field_name(&self) -> &'static str {
        match self {
            Condition::Technical { field, .. } => field.name(),
            Condition::Fundamental { field, .. } => field.name(),
            Condition::Market { field, .. } => field.name(),
            Condition::Time { field, .. } => field.name(),
        }
    }

    pub fn condition_type(&self) -> ConditionType {
        match self {
            Condition::Technical { .. } => ConditionType::Technical,
            Condition::Fundamental { .. } => ConditionType::Fundamental,
            Condition::Market { .. } => ConditionType::Market,
            Condition::Time { .. } => ConditionType::Time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    Technical,
    Fundamental,
    Market,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Logic {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::And => write!(f, "AND"),
            Logic::Or => write!(f, "OR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    Leaf(Condition),
    Group(ConditionGroup),
}

/// AND/OR over an ordered, non-empty list of nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionGroup {
    pub logic: Logic,
    pub nodes: Vec<ConditionNode>,
}

impl ConditionGroup {
    /// Leaf conditions in evaluation order, descending into nested groups.
    pub fn leaves(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }
}

fn collect_leaves<'a>(group: &'a ConditionGroup, out: &mut Vec<&'a Condition>) {
    for node in &group.nodes {
        match node {
            ConditionNode::Leaf(c) => out.push(c),
            ConditionNode::Group(g) => collect_leaves(g, out),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Priority {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Priority::High),
            2 => Some(Priority::Medium),
            3 => Some(Priority::Low),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    Active,
    Draft,
    Archived,
}

impl RuleStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Some(RuleStatus::Active),
            "draft" => Some(RuleStatus::Draft),
            "archived" => Some(RuleStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub base_score: f64,
    #[serde(default)]
    pub condition_weights: BTreeMap<String, f64>,
}

impl ScoringConfig {
    pub fn weight(&self, field: &str) -> f64 {
        self.condition_weights.get(field).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleActions {
    #[serde(default)]
    pub primary_action: String,
    #[serde(default)]
    pub secondary_actions: Vec<String>,
    #[serde(default)]
    pub notifications: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub status: RuleStatus,
    pub conditions: ConditionGroup,
    pub scoring: ScoringConfig,
    pub actions: RuleActions,
    pub tags: Vec<String>,
    pub execution_count: u64,
    pub success_count: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Rule {
    /// Field names of every leaf condition, in evaluation order.
    pub fn condition_fields(&self) -> Vec<&'static str> {
        self.conditions
            .leaves()
            .into_iter()
            .map(Condition::field_name)
            .collect()
    }

    /// True when evaluation needs indicator values computed from candles.
    pub fn requires_history(&self) -> bool {
        self.conditions
            .leaves()
            .iter()
            .any(|c| matches!(c, Condition::Technical { .. }))
    }

    pub fn record_execution(&mut self, matched: bool) {
        self.execution_count += 1;
        if matched {
            self.success_count += 1;
        }
    }
}
