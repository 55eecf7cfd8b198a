//! News and analyst signal port.

/// Supplies the externally computed sub-scores of the composite score.
///
/// Implementations must be deterministic for a given symbol within a run and
/// should return values in `[0, 100]`; the scorer clamps anything outside.
pub trait SignalPort: Send + Sync {
    fn news_score(&self, symbol: &str) -> f64;
    fn analyst_score(&self, symbol: &str) -> f64;
}
