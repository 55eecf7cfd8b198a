//! Per-symbol market snapshot and field resolution.
//!
//! A snapshot is transient: it is rebuilt each evaluation cycle from the
//! market data provider and never persisted by the engine.

use crate::domain::candle::{self, Candle};
use crate::domain::error::{ScreenerError, SnapshotError};
use crate::domain::indicator::Technicals;
use crate::domain::rule::{FundamentalField, MarketField, TechnicalField, TimeField};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of prior candles averaged for `avg_volume` when deriving a snapshot.
pub const AVG_VOLUME_WINDOW: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub symbol: String,
    pub current_price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub change_percent: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    #[serde(default)]
    pub open: f64,
    #[serde(default)]
    pub previous_close: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fundamentals: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Technicals::is_empty")]
    pub technicals: Technicals,
}

/// A resolved field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Number(f64),
    Text(&'a str),
}

impl StockSnapshot {
    /// Derive a snapshot from candle history: the last candle is current, the
    /// one before supplies the previous close. Technicals are left empty; the
    /// matcher computes them over its configured window and MACD mode.
    pub fn from_candles(symbol: &str, candles: &[Candle]) -> Result<Self, ScreenerError> {
        if candles.len() < 2 {
            return Err(ScreenerError::InsufficientHistory {
                symbol: symbol.to_string(),
                have: candles.len(),
                need: 2,
            });
        }
        if let Some(idx) = candle::first_out_of_order(candles) {
            return Err(ScreenerError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("candle {} is not after its predecessor", idx),
            });
        }

        let last = &candles[candles.len() - 1];
        let previous_close = candles[candles.len() - 2].close;
        let change = last.close - previous_close;
        let change_percent = if previous_close != 0.0 {
            change / previous_close * 100.0
        } else {
            0.0
        };

        let prior = &candles[..candles.len() - 1];
        let avg_volume = candle::average_volume(prior, prior.len().min(AVG_VOLUME_WINDOW));

        Ok(Self {
            symbol: symbol.to_string(),
            current_price: last.close,
            change,
            change_percent,
            volume: last.volume,
            high: last.high,
            low: last.low,
            open: last.open,
            previous_close,
            timestamp: last.timestamp,
            avg_volume,
            sector: None,
            fundamentals: BTreeMap::new(),
            technicals: Technicals::default(),
        })
    }

    pub fn with_technicals(mut self, technicals: Technicals) -> Self {
        self.technicals = technicals;
        self
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        let fail = |reason: String| SnapshotError {
            symbol: self.symbol.clone(),
            reason,
        };

        if self.symbol.trim().is_empty() {
            return Err(fail("symbol is empty".to_string()));
        }
        if !self.current_price.is_finite() || self.current_price < 0.0 {
            return Err(fail(format!("invalid current price {}", self.current_price)));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(fail(format!("invalid volume {}", self.volume)));
        }
        for (name, v) in [
            ("change", self.change),
            ("change_percent", self.change_percent),
            ("high", self.high),
            ("low", self.low),
            ("open", self.open),
            ("previous_close", self.previous_close),
        ] {
            if !v.is_finite() {
                return Err(fail(format!("{} is not finite", name)));
            }
        }
        if self.high < self.low {
            return Err(fail(format!(
                "high {} is below low {}",
                self.high, self.low
            )));
        }
        Ok(())
    }

    /// volume / avg_volume, absent when either side is degenerate.
    pub fn volume_ratio(&self) -> Option<f64> {
        match self.avg_volume {
            Some(avg) if avg > 0.0 && self.volume > 0.0 => Some(self.volume / avg),
            _ => None,
        }
    }

    pub fn technical(&self, field: TechnicalField) -> Option<f64> {
        let t = &self.technicals;
        let value = match field {
            TechnicalField::Rsi => t.rsi_14,
            TechnicalField::Sma20 => t.sma_20,
            TechnicalField::Sma50 => t.sma_50,
            TechnicalField::Ema12 => t.ema_12,
            TechnicalField::Ema26 => t.ema_26,
            TechnicalField::Macd => t.macd.map(|m| m.line),
            TechnicalField::MacdSignal => t.macd.map(|m| m.signal),
            TechnicalField::MacdHistogram => t.macd.map(|m| m.histogram),
            TechnicalField::BollingerUpper => t.bollinger.map(|b| b.upper),
            TechnicalField::BollingerMiddle => t.bollinger.map(|b| b.middle),
            TechnicalField::BollingerLower => t.bollinger.map(|b| b.lower),
            TechnicalField::StochasticK => t.stochastic_k,
            TechnicalField::PriceVsSma20 => t
                .sma_20
                .filter(|sma| *sma != 0.0)
                .map(|sma| (self.current_price - sma) / sma * 100.0),
        };
        value.filter(|v| v.is_finite())
    }

    pub fn fundamental(&self, field: FundamentalField) -> Option<FieldValue<'_>> {
        match field {
            FundamentalField::Sector => self.sector.as_deref().map(FieldValue::Text),
            _ => self
                .fundamentals
                .get(field.name())
                .copied()
                .filter(|v| v.is_finite())
                .map(FieldValue::Number),
        }
    }

    pub fn market(&self, field: MarketField) -> Option<FieldValue<'_>> {
        let value = match field {
            MarketField::Symbol => return Some(FieldValue::Text(&self.symbol)),
            MarketField::Price => Some(self.current_price),
            MarketField::Change => Some(self.change),
            MarketField::ChangePercent => Some(self.change_percent),
            MarketField::Volume => Some(self.volume),
            MarketField::AvgVolume => self.avg_volume,
            MarketField::VolumeRatio => self.volume_ratio(),
            MarketField::High => Some(self.high),
            MarketField::Low => Some(self.low),
            MarketField::Open => Some(self.open),
            MarketField::PreviousClose => Some(self.previous_close),
            MarketField::DayRangePercent => {
                if self.low > 0.0 {
                    Some((self.high - self.low) / self.low * 100.0)
                } else {
                    None
                }
            }
        };
        value.filter(|v| v.is_finite()).map(FieldValue::Number)
    }

    /// Time attributes of the snapshot timestamp, in UTC.
    pub fn time(&self, field: TimeField) -> f64 {
        let ts = self.timestamp;
        match field {
            TimeField::Hour => ts.hour() as f64,
            TimeField::MinuteOfDay => (ts.hour() * 60 + ts.minute()) as f64,
            TimeField::DayOfWeek => ts.weekday().num_days_from_monday() as f64,
            TimeField::DayOfMonth => ts.day() as f64,
        }
    }
}
