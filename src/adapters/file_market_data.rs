//! File-backed market data provider.
//!
//! Snapshots come from a JSON array file; candles from `<dir>/<SYMBOL>.csv`
//! with a `timestamp,open,high,low,close,volume` header. Timestamps are
//! RFC 3339 or plain `YYYY-MM-DD` dates (midnight UTC). A symbol with candles
//! but no snapshot entry gets a snapshot derived from its candles.

use crate::domain::candle::{self, Candle};
use crate::domain::error::ScreenerError;
use crate::domain::snapshot::StockSnapshot;
use crate::ports::market_data_port::{CandleRange, MarketDataPort, Resolution};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FileMarketData {
    snapshots: HashMap<String, StockSnapshot>,
    candles_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct CandleRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl FileMarketData {
    pub fn new(snapshots: Vec<StockSnapshot>, candles_dir: Option<PathBuf>) -> Self {
        Self {
            snapshots: snapshots
                .into_iter()
                .map(|s| (s.symbol.to_uppercase(), s))
                .collect(),
            candles_dir,
        }
    }

    pub fn from_paths(
        snapshots: Option<&Path>,
        candles_dir: Option<&Path>,
    ) -> Result<Self, ScreenerError> {
        let loaded = match snapshots {
            Some(path) => load_snapshots(path)?,
            None => Vec::new(),
        };
        Ok(Self::new(loaded, candles_dir.map(Path::to_path_buf)))
    }

    fn csv_path(&self, symbol: &str) -> Option<PathBuf> {
        self.candles_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.csv", symbol.to_uppercase())))
    }

    async fn read_all_candles(&self, symbol: &str) -> Result<Vec<Candle>, ScreenerError> {
        let path = self
            .csv_path(symbol)
            .ok_or_else(|| ScreenerError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no candle directory configured".to_string(),
            })?;
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ScreenerError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("failed to read {}: {}", path.display(), e),
            }
        })?;
        parse_candles(symbol, &content)
    }
}

pub fn load_snapshots(path: &Path) -> Result<Vec<StockSnapshot>, ScreenerError> {
    let content = std::fs::read_to_string(path)?;
    let snapshots: Vec<StockSnapshot> = serde_json::from_str(&content)?;
    debug!(path = %path.display(), count = snapshots.len(), "loaded snapshots");
    Ok(snapshots)
}

/// Parse a candle CSV, sorted by timestamp. Duplicate timestamps are rejected.
pub fn parse_candles(symbol: &str, content: &str) -> Result<Vec<Candle>, ScreenerError> {
    let bad = |reason: String| ScreenerError::DataUnavailable {
        symbol: symbol.to_string(),
        reason,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut candles = Vec::new();

    for (row, result) in rdr.deserialize::<CandleRecord>().enumerate() {
        let record = result.map_err(|e| bad(format!("CSV parse error: {}", e)))?;
        let timestamp = parse_timestamp(&record.timestamp)
            .ok_or_else(|| bad(format!("row {}: invalid timestamp '{}'", row + 1, record.timestamp)))?;
        candles.push(Candle {
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }

    candles.sort_by_key(|c| c.timestamp);
    if let Some(idx) = candle::first_out_of_order(&candles) {
        return Err(bad(format!(
            "duplicate timestamp {}",
            candles[idx].timestamp.to_rfc3339()
        )));
    }
    Ok(candles)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[async_trait]
impl MarketDataPort for FileMarketData {
    async fn fetch_snapshot(&self, symbol: &str) -> Result<StockSnapshot, ScreenerError> {
        if let Some(snapshot) = self.snapshots.get(&symbol.to_uppercase()) {
            return Ok(snapshot.clone());
        }
        if self.candles_dir.is_none() {
            return Err(ScreenerError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no snapshot found".to_string(),
            });
        }
        let candles = self.read_all_candles(symbol).await?;
        StockSnapshot::from_candles(&symbol.to_uppercase(), &candles)
    }

    /// The CSV holds a single resolution, so `resolution` is not used for
    /// selection.
    async fn fetch_candles(
        &self,
        symbol: &str,
        _resolution: Resolution,
        range: CandleRange,
    ) -> Result<Vec<Candle>, ScreenerError> {
        let candles = self.read_all_candles(symbol).await?;
        Ok(match range {
            CandleRange::Last(n) => {
                let start = candles.len().saturating_sub(n);
                candles[start..].to_vec()
            }
            CandleRange::Between { from, to } => candles
                .into_iter()
                .filter(|c| c.timestamp >= from && c.timestamp <= to)
                .collect(),
        })
    }

    async fn list_symbols(&self) -> Result<Vec<String>, ScreenerError> {
        let mut symbols: BTreeSet<String> = self.snapshots.keys().cloned().collect();

        if let Some(dir) = &self.candles_dir {
            let mut entries = tokio::fs::read_dir(dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    symbols.insert(stem.to_uppercase());
                }
            }
        }

        Ok(symbols.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    const CSV: &str = "timestamp,open,high,low,close,volume\n\
        2024-01-17,110.0,120.0,105.0,115.0,55000\n\
        2024-01-15,100.0,110.0,90.0,105.0,50000\n\
        2024-01-16T00:00:00Z,105.0,115.0,100.0,110.0,60000\n";

    fn setup() -> (TempDir, FileMarketData) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("BHP.csv"), CSV).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let snapshots_path = dir.path().join("snapshots.json");
        fs::write(
            &snapshots_path,
            r#"[{"symbol": "KO", "current_price": 60.0, "timestamp": "2024-01-17T15:00:00Z",
                 "fundamentals": {"pe_ratio": 22.5}}]"#,
        )
        .unwrap();

        let data =
            FileMarketData::from_paths(Some(snapshots_path.as_path()), Some(dir.path())).unwrap();
        (dir, data)
    }

    #[test]
    fn parse_candles_sorts_and_accepts_both_timestamp_forms() {
        let candles = parse_candles("BHP", CSV).unwrap();
        assert_eq!(candles.len(), 3);
        assert_eq!(
            candles[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(candles[1].close, 110.0);
        assert_eq!(candles[2].volume, 55000.0);
    }

    #[test]
    fn parse_candles_rejects_duplicates() {
        let csv = "timestamp,open,high,low,close,volume\n\
            2024-01-15,1,1,1,1,1\n\
            2024-01-15,1,1,1,1,1\n";
        assert!(matches!(
            parse_candles("X", csv),
            Err(ScreenerError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn parse_candles_rejects_bad_timestamp() {
        let csv = "timestamp,open,high,low,close,volume\n15/01/2024,1,1,1,1,1\n";
        let err = parse_candles("X", csv).unwrap_err();
        assert!(err.to_string().contains("invalid timestamp"));
    }

    #[tokio::test]
    async fn snapshot_from_file_entry() {
        let (_dir, data) = setup();
        let snap = data.fetch_snapshot("ko").await.unwrap();
        assert_eq!(snap.symbol, "KO");
        assert_eq!(snap.fundamentals.get("pe_ratio"), Some(&22.5));
    }

    #[tokio::test]
    async fn snapshot_derived_from_candles() {
        let (_dir, data) = setup();
        let snap = data.fetch_snapshot("BHP").await.unwrap();
        assert_eq!(snap.current_price, 115.0);
        assert_eq!(snap.previous_close, 110.0);
        assert_eq!(snap.change, 5.0);
    }

    #[tokio::test]
    async fn unknown_symbol_is_unavailable() {
        let (_dir, data) = setup();
        let err = data.fetch_snapshot("NOPE").await.unwrap_err();
        assert!(matches!(err, ScreenerError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn fetch_candles_ranges() {
        let (_dir, data) = setup();
        let last = data
            .fetch_candles("BHP", Resolution::Day, CandleRange::Last(2))
            .await
            .unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].close, 110.0);

        let day = Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap();
        let between = data
            .fetch_candles(
                "BHP",
                Resolution::Day,
                CandleRange::Between { from: day, to: day },
            )
            .await
            .unwrap();
        assert_eq!(between.len(), 1);
    }

    #[tokio::test]
    async fn list_symbols_merges_sources() {
        let (_dir, data) = setup();
        assert_eq!(data.list_symbols().await.unwrap(), vec!["BHP", "KO"]);
    }
}
