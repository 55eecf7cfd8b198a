//! Symbol universe resolution.
//!
//! A run's universe is either an explicit comma-separated symbol list or,
//! when none is given, every symbol the market data provider knows about.

use crate::domain::error::ScreenerError;
use crate::ports::market_data_port::MarketDataPort;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("symbol list is empty")]
    Empty,

    #[error("expected exactly one symbol, got {0}")]
    NotSingle(usize),
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    if input.trim().is_empty() {
        return Err(UniverseError::Empty);
    }

    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// Parse an argument that must name exactly one symbol.
pub fn parse_single_symbol(input: &str) -> Result<String, UniverseError> {
    let mut symbols = parse_symbols(input)?;
    match symbols.len() {
        1 => Ok(symbols.remove(0)),
        n => Err(UniverseError::NotSingle(n)),
    }
}

/// The explicit list when given, otherwise the provider's full listing in
/// sorted order.
pub async fn resolve_universe(
    explicit: Option<&str>,
    provider: &dyn MarketDataPort,
) -> Result<Vec<String>, ScreenerError> {
    if let Some(list) = explicit {
        return Ok(parse_symbols(list)?);
    }
    let mut symbols = provider.list_symbols().await?;
    symbols.sort();
    symbols.dedup();
    Ok(symbols)
}
