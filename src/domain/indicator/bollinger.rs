//! Bollinger Bands.
//!
//! - Middle: SMA over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation (divides by N, not N-1).
//! Default parameters: period=20, multiplier=2.0

use crate::domain::indicator::{sma::sma, stddev::std_dev};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BOLLINGER_PERIOD: usize = 20;
pub const DEFAULT_BOLLINGER_MULT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

pub fn bollinger(prices: &[f64], period: usize, mult: f64) -> Option<Bands> {
    let middle = sma(prices, period)?;
    let sd = std_dev(prices, period)?;

    Some(Bands {
        upper: middle + mult * sd,
        middle,
        lower: middle - mult * sd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_constant_values() {
        let b = bollinger(&[100.0; 5], 3, 2.0).unwrap();
        assert!((b.middle - 100.0).abs() < f64::EPSILON);
        assert!((b.upper - 100.0).abs() < f64::EPSILON);
        assert!((b.lower - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bollinger_basic_calculation() {
        let b = bollinger(&[10.0, 20.0, 30.0], 3, 2.0).unwrap();

        let expected_middle: f64 = 20.0;
        let variance: f64 = (100.0 + 0.0 + 100.0) / 3.0;
        let stddev = variance.sqrt();

        assert!((b.middle - expected_middle).abs() < 1e-10);
        assert!((b.upper - (expected_middle + 2.0 * stddev)).abs() < 1e-10);
        assert!((b.lower - (expected_middle - 2.0 * stddev)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_multiplier_variations() {
        let b1 = bollinger(&[10.0, 20.0, 30.0], 3, 1.0).unwrap();
        let b2 = bollinger(&[10.0, 20.0, 30.0], 3, 2.0).unwrap();
        assert!(((b2.upper - b2.middle) - 2.0 * (b1.upper - b1.middle)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_symmetry() {
        let b = bollinger(&[10.0, 20.0, 30.0, 25.0], 3, 2.0).unwrap();
        assert!(((b.upper - b.middle) - (b.middle - b.lower)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_insufficient() {
        assert_eq!(bollinger(&[10.0, 20.0], 20, 2.0), None);
        assert_eq!(bollinger(&[10.0, 20.0], 0, 2.0), None);
    }
}
