//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(12) - EMA(26), both with first-price warm-up
//! Signal Line = EMA(9) of the MACD line from bar 26 onward
//! Histogram = MACD Line - Signal Line
//!
//! [`MacdMode::Legacy`] reproduces the older output where the signal line was
//! never smoothed: signal equals the line and the histogram is zero.

use crate::domain::indicator::ema::ema_series;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MacdMode {
    #[default]
    Standard,
    Legacy,
}

pub fn macd(prices: &[f64]) -> Option<Macd> {
    macd_with_mode(prices, MacdMode::Standard)
}

pub fn macd_with_mode(prices: &[f64], mode: MacdMode) -> Option<Macd> {
    if prices.len() < DEFAULT_SLOW {
        return None;
    }

    let fast = ema_series(prices, DEFAULT_FAST);
    let slow = ema_series(prices, DEFAULT_SLOW);
    let line_series: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let line = *line_series.last()?;

    match mode {
        MacdMode::Legacy => Some(Macd {
            line,
            signal: line,
            histogram: 0.0,
        }),
        MacdMode::Standard => {
            let signal = *ema_series(&line_series[DEFAULT_SLOW - 1..], DEFAULT_SIGNAL).last()?;
            Some(Macd {
                line,
                signal,
                histogram: line - signal,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::ema::ema;

    fn trending(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn macd_insufficient() {
        assert_eq!(macd(&trending(25)), None);
        assert_eq!(macd(&[]), None);
    }

    #[test]
    fn macd_line_is_ema_difference() {
        let prices = trending(40);
        let m = macd(&prices).unwrap();
        let expected = ema(&prices, 12).unwrap() - ema(&prices, 26).unwrap();
        assert!((m.line - expected).abs() < 1e-10);
    }

    #[test]
    fn macd_uptrend_positive_line() {
        let m = macd(&trending(40)).unwrap();
        assert!(m.line > 0.0);
    }

    #[test]
    fn macd_histogram_is_line_minus_signal() {
        let m = macd(&trending(40)).unwrap();
        assert!((m.histogram - (m.line - m.signal)).abs() < 1e-12);
    }

    #[test]
    fn macd_signal_smoothed_in_standard_mode() {
        let m = macd(&trending(60)).unwrap();
        // Accelerating line in an uptrend: the smoothed signal lags behind.
        assert!(m.signal < m.line);
        assert!(m.histogram > 0.0);
    }

    #[test]
    fn macd_legacy_mode_degenerates() {
        let m = macd_with_mode(&trending(40), MacdMode::Legacy).unwrap();
        assert_eq!(m.signal, m.line);
        assert_eq!(m.histogram, 0.0);
    }

    #[test]
    fn macd_flat_prices_zero() {
        let m = macd(&[50.0; 30]).unwrap();
        assert!(m.line.abs() < 1e-12);
        assert!(m.signal.abs() < 1e-12);
        assert!(m.histogram.abs() < 1e-12);
    }
}
