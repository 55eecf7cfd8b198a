//! RSI (Relative Strength Index).
//!
//! Simple averages of gain and loss over the first n price changes (no
//! Wilder smoothing afterwards):
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Needs n + 1 prices.

pub const DEFAULT_RSI_PERIOD: usize = 14;

pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;

    for w in prices[..=period].windows(2) {
        let change = w[1] - w[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    Some(100.0 - (100.0 / (1.0 + avg_gain / avg_loss)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_all_gains_no_losses() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let v = rsi(&prices, 14).unwrap();
        assert!((v - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let v = rsi(&prices, 14).unwrap();
        assert!(v.abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_flat_prices_is_100() {
        let v = rsi(&[50.0; 15], 14).unwrap();
        assert!((v - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_uses_first_period_deltas_only() {
        // First two deltas: +2, -1 -> avg_gain 1.0, avg_loss 0.5 -> RSI 66.67.
        // The trailing crash must not move the value.
        let v = rsi(&[10.0, 12.0, 11.0, 1.0], 2).unwrap();
        let expected = 100.0 - 100.0 / (1.0 + 2.0);
        assert!((v - expected).abs() < 1e-10);
    }

    #[test]
    fn rsi_known_calculation() {
        let prices = [
            44.0, 44.25, 44.50, 43.75, 44.50, 44.25, 44.75, 45.25, 45.50, 45.25, 45.50, 46.0,
            46.25, 46.0, 46.50,
        ];
        let v = rsi(&prices, 14).unwrap();
        assert!(v > 50.0 && v < 100.0, "RSI should be in bullish territory");
    }

    #[test]
    fn rsi_insufficient() {
        let prices: Vec<f64> = (0..14).map(|i| i as f64).collect();
        assert_eq!(rsi(&prices, 14), None);
        assert_eq!(rsi(&[], 14), None);
    }

    #[test]
    fn rsi_zero_period() {
        assert_eq!(rsi(&[100.0, 101.0], 0), None);
    }
}
