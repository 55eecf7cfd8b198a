//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the first price (not an SMA), then
//! EMA[i] = P[i]*k + EMA[i-1]*(1-k) over the entire sequence.
//! Stored results depend on this warm-up, so it must not change.

/// Full EMA recurrence, one value per input price.
pub fn ema_series(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.is_empty() {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut values = Vec::with_capacity(prices.len());
    let mut ema = prices[0];
    values.push(ema);

    for &price in &prices[1..] {
        ema = price * k + ema * (1.0 - k);
        values.push(ema);
    }

    values
}

/// Final EMA value; `None` when fewer than `period` prices are available.
pub fn ema(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    ema_series(prices, period).last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_seed_is_first_price() {
        let series = ema_series(&[10.0, 20.0, 30.0], 3);
        assert!((series[0] - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recursive_calculation() {
        let prices = [10.0, 20.0, 30.0, 40.0, 50.0];
        let k = 2.0 / 4.0;

        let mut expected = 10.0;
        for p in &prices[1..] {
            expected = p * k + expected * (1.0 - k);
        }

        let v = ema(&prices, 3).unwrap();
        assert!((v - expected).abs() < 1e-12);
    }

    #[test]
    fn ema_warms_up_from_first_point_not_sma() {
        // 10, 20, 30 with k = 0.5: 10 -> 15 -> 22.5 (an SMA seed would give 20)
        let v = ema(&[10.0, 20.0, 30.0], 3).unwrap();
        assert!((v - 22.5).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_period_1() {
        let v = ema(&[10.0, 20.0, 30.0], 1).unwrap();
        assert!((v - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_equal_prices() {
        let v = ema(&[100.0; 5], 3).unwrap();
        assert!((v - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_insufficient() {
        assert_eq!(ema(&[10.0, 20.0], 3), None);
    }

    #[test]
    fn ema_empty_and_period_0() {
        assert!(ema_series(&[], 3).is_empty());
        assert!(ema_series(&[1.0], 0).is_empty());
        assert_eq!(ema(&[1.0, 2.0], 0), None);
    }
}
