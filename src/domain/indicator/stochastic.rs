//! Stochastic Oscillator %K.
//!
//! %K = (close - lowest_low) / (highest_high - lowest_low) * 100 over the
//! trailing n bars. A flat window (zero range) yields 50.

pub const DEFAULT_STOCHASTIC_PERIOD: usize = 14;

pub fn stochastic(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<f64> {
    let len = closes.len();
    if period == 0 || len < period || highs.len() != len || lows.len() != len {
        return None;
    }

    let start = len - period;
    let highest = highs[start..]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let lowest = lows[start..].iter().copied().fold(f64::INFINITY, f64::min);
    let range = highest - lowest;

    if range == 0.0 {
        return Some(50.0);
    }

    Some((closes[len - 1] - lowest) / range * 100.0)
}
