//! OHLCV candle representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

pub fn highs(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.high).collect()
}

pub fn lows(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.low).collect()
}

/// Mean volume of the last `period` candles.
pub fn average_volume(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }
    let window = &candles[candles.len() - period..];
    Some(window.iter().map(|c| c.volume).sum::<f64>() / period as f64)
}

/// Returns the index of the first candle whose timestamp does not strictly
/// increase over its predecessor.
pub fn first_out_of_order(candles: &[Candle]) -> Option<usize> {
    candles
        .windows(2)
        .position(|w| w[1].timestamp <= w[0].timestamp)
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle(day: u32, close: f64, volume: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume,
        }
    }

    #[test]
    fn typical_price() {
        let c = Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000.0,
        };
        let expected = (110.0 + 90.0 + 105.0) / 3.0;
        assert!((c.typical_price() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn column_helpers() {
        let candles = vec![candle(1, 10.0, 100.0), candle(2, 12.0, 200.0)];
        assert_eq!(closes(&candles), vec![10.0, 12.0]);
        assert_eq!(highs(&candles), vec![11.0, 13.0]);
        assert_eq!(lows(&candles), vec![9.0, 11.0]);
    }

    #[test]
    fn average_volume_window() {
        let candles = vec![
            candle(1, 10.0, 100.0),
            candle(2, 10.0, 200.0),
            candle(3, 10.0, 400.0),
        ];
        assert_eq!(average_volume(&candles, 2), Some(300.0));
        assert_eq!(average_volume(&candles, 4), None);
        assert_eq!(average_volume(&candles, 0), None);
    }

    #[test]
    fn detects_out_of_order() {
        let ordered = vec![candle(1, 1.0, 1.0), candle(2, 1.0, 1.0)];
        assert_eq!(first_out_of_order(&ordered), None);

        let dup = vec![candle(1, 1.0, 1.0), candle(2, 1.0, 1.0), candle(2, 1.0, 1.0)];
        assert_eq!(first_out_of_order(&dup), Some(2));
    }
}
