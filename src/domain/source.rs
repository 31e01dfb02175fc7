//! Per-source settings: where candles come from and how hard to drive it.

use crate::domain::config_validation::{
    read_bool, read_f64, read_optional_usize, read_usize, source_section,
};
use crate::domain::error::TrendscanError;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 10.0;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_BINANCE_URL: &str = "https://api.binance.com";

#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    /// Directory of `<symbol>_<timeframe>.csv` files.
    Csv { path: PathBuf },
    /// Binance-compatible spot REST API.
    Binance {
        base_url: String,
        request_timeout: Duration,
    },
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Csv { .. } => "csv",
            SourceKind::Binance { .. } => "binance",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub name: String,
    pub kind: SourceKind,
    /// Screen the full tradable listing through the momentum filter.
    pub screen: bool,
    /// Keep only listed symbols ending with this quote asset.
    pub quote_filter: Option<String>,
    pub max_symbols: Option<usize>,
    pub watchlist: Vec<String>,
    /// Symbols processed at once.
    pub max_concurrency: usize,
    /// Candle requests per second across all workers; 0 disables the gate.
    pub requests_per_second: f64,
}

impl SourceSettings {
    pub fn new(name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            screen: true,
            quote_filter: None,
            max_symbols: None,
            watchlist: Vec::new(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

impl SourceSettings {
    /// Read `[source.<name>]`.
    pub fn from_config(config: &dyn ConfigPort, name: &str) -> Result<Self, TrendscanError> {
        let section = source_section(name);
        let sec = section.as_str();

        let kind = match config.get_string(sec, "kind").map(|k| k.trim().to_lowercase()) {
            None => return Err(TrendscanError::missing(sec, "kind")),
            Some(k) if k == "csv" => {
                let path = config
                    .get_string(sec, "path")
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| TrendscanError::missing(sec, "path"))?;
                SourceKind::Csv {
                    path: PathBuf::from(path.trim()),
                }
            }
            Some(k) if k == "binance" => SourceKind::Binance {
                base_url: config
                    .get_string(sec, "base_url")
                    .map(|u| u.trim().trim_end_matches('/').to_string())
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| DEFAULT_BINANCE_URL.to_string()),
                request_timeout: Duration::from_secs(read_usize(
                    config,
                    sec,
                    "request_timeout_secs",
                    DEFAULT_REQUEST_TIMEOUT.as_secs() as usize,
                )? as u64),
            },
            Some(other) => {
                return Err(TrendscanError::invalid(
                    sec,
                    "kind",
                    format!("unknown source kind '{other}' (expected csv or binance)"),
                ));
            }
        };

        let watchlist = match config.get_string(sec, "watchlist") {
            Some(raw) if !raw.trim().is_empty() => parse_symbols(&raw)
                .map_err(|e| TrendscanError::invalid(sec, "watchlist", e.to_string()))?,
            _ => Vec::new(),
        };

        Ok(Self {
            name: name.to_string(),
            kind,
            screen: read_bool(config, sec, "screen", true)?,
            quote_filter: config
                .get_string(sec, "quote_filter")
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            max_symbols: read_optional_usize(config, sec, "max_symbols")?,
            watchlist,
            max_concurrency: read_usize(config, sec, "max_concurrency", DEFAULT_MAX_CONCURRENCY)?,
            requests_per_second: read_f64(
                config,
                sec,
                "requests_per_second",
                DEFAULT_REQUESTS_PER_SECOND,
            )?,
        })
    }

    pub fn validate(&self) -> Result<(), TrendscanError> {
        let section = source_section(&self.name);
        let sec = section.as_str();

        if self.max_concurrency == 0 {
            return Err(TrendscanError::invalid(
                sec,
                "max_concurrency",
                "max_concurrency must be positive",
            ));
        }
        if self.requests_per_second < 0.0 {
            return Err(TrendscanError::invalid(
                sec,
                "requests_per_second",
                "requests_per_second must be non-negative",
            ));
        }
        if self.max_symbols == Some(0) {
            return Err(TrendscanError::invalid(
                sec,
                "max_symbols",
                "max_symbols must be positive",
            ));
        }
        if !self.screen && self.watchlist.is_empty() {
            return Err(TrendscanError::invalid(
                sec,
                "watchlist",
                "screening is disabled and no watchlist is set",
            ));
        }
        if let SourceKind::Binance { request_timeout, .. } = &self.kind {
            if request_timeout.is_zero() {
                return Err(TrendscanError::invalid(
                    sec,
                    "request_timeout_secs",
                    "request_timeout_secs must be positive",
                ));
            }
        }
        Ok(())
    }
}
