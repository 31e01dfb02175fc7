//! CSV file candle source.
//!
//! One file per symbol and timeframe, `<symbol>_<timeframe>.csv`, with a
//! header row and columns `timestamp,open,high,low,close,volume`. Timestamps
//! may be epoch milliseconds, RFC 3339, or `YYYY-MM-DD[ HH:MM[:SS]]` in UTC.

use crate::domain::error::SourceError;
use crate::domain::ohlcv::{Candle, CandleSeries};
use crate::domain::timeframe::Timeframe;
use crate::ports::candle_port::CandlePort;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::BTreeSet;
use std::path::PathBuf;

pub struct CsvAdapter {
    name: String,
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(name: impl Into<String>, base_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            base_path,
        }
    }

    fn csv_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path.join(format!("{symbol}_{timeframe}.csv"))
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw
            .parse::<i64>()
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn number(record: &csv::StringRecord, index: usize, column: &str) -> Result<f64, SourceError> {
    let raw = record.get(index).ok_or_else(|| SourceError::Malformed {
        reason: format!("missing {column} column"),
    })?;
    raw.trim().parse().map_err(|e| SourceError::Malformed {
        reason: format!("invalid {column} value '{raw}': {e}"),
    })
}

pub fn parse_candles(content: &str) -> Result<Vec<Candle>, SourceError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut candles = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| SourceError::Malformed {
            reason: format!("CSV parse error: {e}"),
        })?;

        let raw_ts = record.get(0).ok_or_else(|| SourceError::Malformed {
            reason: "missing timestamp column".into(),
        })?;
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| SourceError::Malformed {
            reason: format!("invalid timestamp '{raw_ts}'"),
        })?;

        candles.push(Candle {
            timestamp,
            open: number(&record, 1, "open")?,
            high: number(&record, 2, "high")?,
            low: number(&record, 3, "low")?,
            close: number(&record, 4, "close")?,
            volume: number(&record, 5, "volume")?,
        });
    }

    Ok(candles)
}

#[async_trait]
impl CandlePort for CsvAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), SourceError> {
        let meta = tokio::fs::metadata(&self.base_path)
            .await
            .map_err(|e| SourceError::Connection {
                reason: format!("{}: {e}", self.base_path.display()),
            })?;
        if !meta.is_dir() {
            return Err(SourceError::Connection {
                reason: format!("{} is not a directory", self.base_path.display()),
            });
        }
        Ok(())
    }

    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<CandleSeries, SourceError> {
        let path = self.csv_path(symbol, timeframe);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SourceError::Request {
                reason: format!("failed to read {}: {e}", path.display()),
            })?;

        let mut series = CandleSeries::new(symbol, timeframe, parse_candles(&content)?);
        series.truncate_to_latest(count);
        Ok(series)
    }

    async fn list_tradable_symbols(&self) -> Result<Vec<String>, SourceError> {
        let mut entries = tokio::fs::read_dir(&self.base_path)
            .await
            .map_err(|e| SourceError::Request {
                reason: format!("failed to read directory {}: {e}", self.base_path.display()),
            })?;

        let mut symbols = BTreeSet::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| SourceError::Request {
            reason: format!("directory entry error: {e}"),
        })? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(stem) = name.strip_suffix(".csv") else {
                continue;
            };
            if let Some((symbol, tf)) = stem.rsplit_once('_') {
                if !symbol.is_empty() && tf.parse::<Timeframe>().is_ok() {
                    symbols.insert(symbol.to_string());
                }
            }
        }

        Ok(symbols.into_iter().collect())
    }
}
