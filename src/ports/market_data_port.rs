//! Market data port.

use crate::domain::candle::Candle;
use crate::domain::error::ScreenerError;
use crate::domain::snapshot::StockSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

/// Candle resolution, using the provider's resolution codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Minute60,
    Day,
    Week,
    Month,
}

impl Resolution {
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "1" => Some(Resolution::Minute1),
            "5" => Some(Resolution::Minute5),
            "15" => Some(Resolution::Minute15),
            "30" => Some(Resolution::Minute30),
            "60" => Some(Resolution::Minute60),
            "D" => Some(Resolution::Day),
            "W" => Some(Resolution::Week),
            "M" => Some(Resolution::Month),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Resolution::Minute1 => "1",
            Resolution::Minute5 => "5",
            Resolution::Minute15 => "15",
            Resolution::Minute30 => "30",
            Resolution::Minute60 => "60",
            Resolution::Day => "D",
            Resolution::Week => "W",
            Resolution::Month => "M",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Which candles to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleRange {
    /// The most recent `n` candles.
    Last(usize),
    /// Candles with `from <= timestamp <= to`.
    Between {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

/// Source of per-symbol market data. Implementations may be rate limited
/// and may fail for individual symbols.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    async fn fetch_snapshot(&self, symbol: &str) -> Result<StockSnapshot, ScreenerError>;

    /// Candles in strictly increasing timestamp order.
    async fn fetch_candles(
        &self,
        symbol: &str,
        resolution: Resolution,
        range: CandleRange,
    ) -> Result<Vec<Candle>, ScreenerError>;

    async fn list_symbols(&self) -> Result<Vec<String>, ScreenerError>;
}
