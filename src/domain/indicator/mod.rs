//! Technical indicator implementations.
//!
//! Every calculator is a pure function over an ordered price sequence and
//! returns `None` when the history is too short, never panicking:
//! - `sma`, `ema`, `rsi`: single values
//! - `macd`: line, signal and histogram
//! - `bollinger`: upper, middle and lower bands
//! - `stochastic`: %K over a trailing high/low window
//!
//! [`Technicals`] bundles the values a snapshot carries into rule evaluation.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod stochastic;

pub use bollinger::{bollinger, Bands, DEFAULT_BOLLINGER_MULT, DEFAULT_BOLLINGER_PERIOD};
pub use ema::{ema, ema_series};
pub use macd::{macd, macd_with_mode, Macd, MacdMode};
pub use rsi::{rsi, DEFAULT_RSI_PERIOD};
pub use sma::sma;
pub use stddev::std_dev;
pub use stochastic::{stochastic, DEFAULT_STOCHASTIC_PERIOD};

use crate::domain::candle::{self, Candle};
use serde::{Deserialize, Serialize};

/// Indicator values derived from a symbol's candle history.
///
/// Each field is absent when the history was too short to compute it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Technicals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsi_14: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sma_20: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sma_50: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema_12: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema_26: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macd: Option<Macd>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bollinger: Option<Bands>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stochastic_k: Option<f64>,
}

impl Technicals {
    pub fn from_candles(candles: &[Candle]) -> Self {
        Self::from_candles_with_mode(candles, MacdMode::Standard)
    }

    pub fn from_candles_with_mode(candles: &[Candle], mode: MacdMode) -> Self {
        let closes = candle::closes(candles);
        let highs = candle::highs(candles);
        let lows = candle::lows(candles);

        Self {
            rsi_14: rsi(&closes, DEFAULT_RSI_PERIOD),
            sma_20: sma(&closes, 20),
            sma_50: sma(&closes, 50),
            ema_12: ema(&closes, 12),
            ema_26: ema(&closes, 26),
            macd: macd_with_mode(&closes, mode),
            bollinger: bollinger(&closes, DEFAULT_BOLLINGER_PERIOD, DEFAULT_BOLLINGER_MULT),
            stochastic_k: stochastic(&highs, &lows, &closes, DEFAULT_STOCHASTIC_PERIOD),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
