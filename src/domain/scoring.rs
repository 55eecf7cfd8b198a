//! Composite stock scoring.
//!
//! Blends five sub-scores, each on a 0-100 scale, with fixed weights:
//!
//! | component | weight |
//! |-----------|--------|
//! | momentum  | 0.25   |
//! | volume    | 0.20   |
//! | technical | 0.20   |
//! | news      | 0.20   |
//! | analyst   | 0.15   |
//!
//! News and analyst sub-scores come from a [`SignalPort`]. Degenerate inputs
//! (zero volume, zero average volume, zero day range) fall back to
//! price-derived values instead of failing.

use crate::domain::snapshot::StockSnapshot;
use crate::ports::signal_port::SignalPort;
use serde::{Deserialize, Serialize};

/// Component weights of the overall score. They sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub momentum: f64,
    pub volume: f64,
    pub technical: f64,
    pub news: f64,
    pub analyst: f64,
}

pub const WEIGHTS: ScoreWeights = ScoreWeights {
    momentum: 0.25,
    volume: 0.20,
    technical: 0.20,
    news: 0.20,
    analyst: 0.15,
};

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.momentum + self.volume + self.technical + self.news + self.analyst
    }
}

/// change_percent at or below this maps to 0, its negation maps to 100.
const MOMENTUM_RANGE_PCT: f64 = 5.0;
const NEUTRAL_SIGNAL: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub symbol: String,
    pub overall_score: f64,
    pub momentum_score: f64,
    pub volume_score: f64,
    pub technical_score: f64,
    pub news_score: f64,
    pub analyst_score: f64,
    pub sector: Option<String>,
}

pub struct CompositeScorer<'a> {
    signals: &'a dyn SignalPort,
}

impl<'a> CompositeScorer<'a> {
    pub fn new(signals: &'a dyn SignalPort) -> Self {
        Self { signals }
    }

    /// Score using the snapshot's own average volume, if it has one.
    pub fn score_snapshot(&self, snapshot: &StockSnapshot) -> ScoreBreakdown {
        self.score(snapshot, snapshot.avg_volume.unwrap_or(0.0))
    }

    pub fn score(&self, snapshot: &StockSnapshot, avg_volume: f64) -> ScoreBreakdown {
        let momentum = momentum_score(snapshot, avg_volume);
        let volume = volume_score(snapshot.volume, avg_volume);
        let technical = technical_score(snapshot);
        let news = clamp_signal(self.signals.news_score(&snapshot.symbol));
        let analyst = clamp_signal(self.signals.analyst_score(&snapshot.symbol));

        let overall = (WEIGHTS.momentum * momentum
            + WEIGHTS.volume * volume
            + WEIGHTS.technical * technical
            + WEIGHTS.news * news
            + WEIGHTS.analyst * analyst)
            .round();

        ScoreBreakdown {
            symbol: snapshot.symbol.clone(),
            overall_score: overall,
            momentum_score: momentum,
            volume_score: volume,
            technical_score: technical,
            news_score: news,
            analyst_score: analyst,
            sector: snapshot.sector.clone(),
        }
    }
}

/// Orders breakdowns by overall score descending, then symbol ascending.
pub fn rank(breakdowns: &mut [ScoreBreakdown]) {
    breakdowns.sort_by(|a, b| {
        b.overall_score
            .total_cmp(&a.overall_score)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}

/// change_percent in [-5, 5] mapped linearly onto [0, 100], clamped.
pub fn price_momentum(change_percent: f64) -> f64 {
    if !change_percent.is_finite() {
        return NEUTRAL_SIGNAL;
    }
    let scaled = (change_percent + MOMENTUM_RANGE_PCT) / (2.0 * MOMENTUM_RANGE_PCT) * 100.0;
    scaled.clamp(0.0, 100.0)
}

/// Relative volume on a 0-100 scale; twice the average volume or more is 100.
///
/// With no usable volume data, the size of the price move stands in for
/// trading activity.
pub fn volume_momentum(volume: f64, avg_volume: f64, change_percent: f64) -> f64 {
    if is_usable(volume) && is_usable(avg_volume) {
        let ratio = volume / avg_volume;
        return (ratio / 2.0).min(1.0) * 100.0;
    }
    if !change_percent.is_finite() {
        return NEUTRAL_SIGNAL;
    }
    (change_percent.abs() / MOMENTUM_RANGE_PCT).min(1.0) * 100.0
}

pub fn momentum_score(snapshot: &StockSnapshot, avg_volume: f64) -> f64 {
    let price = price_momentum(snapshot.change_percent);
    let volume = volume_momentum(snapshot.volume, avg_volume, snapshot.change_percent);
    0.7 * price + 0.3 * volume
}

pub fn volume_score(volume: f64, avg_volume: f64) -> f64 {
    if !is_usable(volume) || !is_usable(avg_volume) {
        return 20.0;
    }
    let ratio = volume / avg_volume;
    if ratio > 2.0 {
        100.0
    } else if ratio > 1.5 {
        80.0
    } else if ratio > 1.0 {
        60.0
    } else if ratio > 0.5 {
        40.0
    } else {
        20.0
    }
}

/// 0.6 × position within the day's range + 0.4 × price momentum.
/// A zero or inverted range scores on momentum alone.
pub fn technical_score(snapshot: &StockSnapshot) -> f64 {
    let momentum = price_momentum(snapshot.change_percent);
    let range = snapshot.high - snapshot.low;
    if !range.is_finite() || range <= 0.0 {
        return momentum;
    }
    let position = ((snapshot.current_price - snapshot.low) / range * 100.0).clamp(0.0, 100.0);
    0.6 * position + 0.4 * momentum
}

fn is_usable(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn clamp_signal(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 100.0)
    } else {
        NEUTRAL_SIGNAL
    }
}
