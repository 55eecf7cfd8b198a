//! Standard Deviation.
//!
//! Population standard deviation over the last n prices.
//! STDDEV(n) = sqrt(sum((P[i] - SMA(n))^2) / n)

pub fn std_dev(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let window = &prices[prices.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let variance = window
        .iter()
        .map(|p| {
            let diff = p - mean;
            diff * diff
        })
        .sum::<f64>()
        / period as f64;

    Some(variance.sqrt())
}
