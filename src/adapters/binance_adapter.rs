//! Binance spot REST candle source (public market-data endpoints only).

use crate::domain::error::SourceError;
use crate::domain::ohlcv::{Candle, CandleSeries};
use crate::domain::timeframe::Timeframe;
use crate::ports::candle_port::CandlePort;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Largest page `/api/v3/klines` serves.
pub const MAX_KLINES_LIMIT: usize = 1000;

pub struct BinanceAdapter {
    name: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    #[serde(default)]
    pub quote_asset: String,
}

impl BinanceAdapter {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SourceError::Connection {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, SourceError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Request {
                reason: format!("GET {path}: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Request {
                reason: format!("GET {path}: HTTP {status}: {body}"),
            });
        }

        response.json::<Value>().await.map_err(|e| SourceError::Malformed {
            reason: format!("GET {path}: {e}"),
        })
    }
}

fn kline_number(row: &[Value], index: usize, column: &str) -> Result<f64, SourceError> {
    let value = row.get(index).ok_or_else(|| SourceError::Malformed {
        reason: format!("kline missing {column}"),
    })?;
    match value {
        Value::String(s) => s.parse().map_err(|_| SourceError::Malformed {
            reason: format!("kline {column} is not numeric: {s}"),
        }),
        Value::Number(n) => n.as_f64().ok_or_else(|| SourceError::Malformed {
            reason: format!("kline {column} out of range"),
        }),
        other => Err(SourceError::Malformed {
            reason: format!("kline {column} has unexpected type: {other}"),
        }),
    }
}

/// Parse a `/api/v3/klines` body: rows of
/// `[open_time_ms, open, high, low, close, volume, close_time_ms, ...]`.
pub fn parse_klines(body: &Value) -> Result<Vec<Candle>, SourceError> {
    let rows = body.as_array().ok_or_else(|| SourceError::Malformed {
        reason: "klines response is not an array".into(),
    })?;

    rows.iter()
        .map(|row| {
            let row = row.as_array().ok_or_else(|| SourceError::Malformed {
                reason: "kline row is not an array".into(),
            })?;
            let open_time = row
                .first()
                .and_then(Value::as_i64)
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .ok_or_else(|| SourceError::Malformed {
                    reason: "kline open time missing or invalid".into(),
                })?;
            Ok(Candle {
                timestamp: open_time,
                open: kline_number(row, 1, "open")?,
                high: kline_number(row, 2, "high")?,
                low: kline_number(row, 3, "low")?,
                close: kline_number(row, 4, "close")?,
                volume: kline_number(row, 5, "volume")?,
            })
        })
        .collect()
}

/// Symbols with status `TRADING`, in listing order.
pub fn tradable_symbols(info: ExchangeInfo) -> Vec<String> {
    info.symbols
        .into_iter()
        .filter(|s| s.status == "TRADING")
        .map(|s| s.symbol)
        .collect()
}

#[async_trait]
impl CandlePort for BinanceAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), SourceError> {
        self.get_json("/api/v3/ping", &[])
            .await
            .map(|_| ())
            .map_err(|e| SourceError::Connection {
                reason: e.to_string(),
            })
    }

    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<CandleSeries, SourceError> {
        let limit = count.clamp(1, MAX_KLINES_LIMIT);
        let body = self
            .get_json(
                "/api/v3/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", timeframe.as_str().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let mut series = CandleSeries::new(symbol, timeframe, parse_klines(&body)?);
        series.truncate_to_latest(count);
        Ok(series)
    }

    async fn list_tradable_symbols(&self) -> Result<Vec<String>, SourceError> {
        let body = self.get_json("/api/v3/exchangeInfo", &[]).await?;
        let info: ExchangeInfo =
            serde_json::from_value(body).map_err(|e| SourceError::Malformed {
                reason: format!("exchangeInfo: {e}"),
            })?;
        Ok(tradable_symbols(info))
    }
}
