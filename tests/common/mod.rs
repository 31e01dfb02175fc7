#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
pub use trendscan::domain::error::SourceError;
pub use trendscan::domain::ohlcv::{Candle, CandleSeries};
use trendscan::domain::orchestrator::SourceHandle;
use trendscan::domain::source::{SourceKind, SourceSettings};
pub use trendscan::domain::timeframe::Timeframe;
use trendscan::ports::candle_port::CandlePort;

/// In-memory candle source. Symbols without data return an empty series.
pub struct MockCandlePort {
    pub name: String,
    pub series: HashMap<String, Vec<Candle>>,
    pub per_timeframe: HashMap<(String, Timeframe), Vec<Candle>>,
    pub errors: HashMap<String, String>,
    pub timeframe_errors: HashMap<(String, Timeframe), String>,
    pub delays: HashMap<String, Duration>,
    pub listed: Vec<String>,
    pub connect_error: Option<String>,
    pub connect_delay: Option<Duration>,
    pub list_error: Option<String>,
    pub requests: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl MockCandlePort {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            series: HashMap::new(),
            per_timeframe: HashMap::new(),
            errors: HashMap::new(),
            timeframe_errors: HashMap::new(),
            delays: HashMap::new(),
            listed: Vec::new(),
            connect_error: None,
            connect_delay: None,
            list_error: None,
            requests: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Same candles on every timeframe; also adds the symbol to the listing.
    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.series.insert(symbol.to_string(), candles);
        self.listed.push(symbol.to_string());
        self
    }

    pub fn with_timeframe_candles(mut self, symbol: &str, tf: Timeframe, candles: Vec<Candle>) -> Self {
        self.per_timeframe.insert((symbol.to_string(), tf), candles);
        self
    }

    pub fn with_listed(mut self, symbols: &[&str]) -> Self {
        self.listed = symbols.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn with_timeframe_error(mut self, symbol: &str, tf: Timeframe, reason: &str) -> Self {
        self.timeframe_errors
            .insert((symbol.to_string(), tf), reason.to_string());
        self
    }

    pub fn with_delay(mut self, symbol: &str, delay: Duration) -> Self {
        self.delays.insert(symbol.to_string(), delay);
        self
    }

    pub fn with_connect_error(mut self, reason: &str) -> Self {
        self.connect_error = Some(reason.to_string());
        self
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn with_list_error(mut self, reason: &str) -> Self {
        self.list_error = Some(reason.to_string());
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandlePort for MockCandlePort {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), SourceError> {
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.connect_error {
            Some(reason) => Err(SourceError::Connection {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<CandleSeries, SourceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(symbol) {
            tokio::time::sleep(*delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if let Some(reason) = self.errors.get(symbol) {
            return Err(SourceError::Request {
                reason: reason.clone(),
            });
        }
        let key = (symbol.to_string(), timeframe);
        if let Some(reason) = self.timeframe_errors.get(&key) {
            return Err(SourceError::Request {
                reason: reason.clone(),
            });
        }

        let candles = self
            .per_timeframe
            .get(&key)
            .or_else(|| self.series.get(symbol))
            .cloned()
            .unwrap_or_default();
        let mut series = CandleSeries::new(symbol, timeframe, candles);
        series.truncate_to_latest(count);
        Ok(series)
    }

    async fn list_tradable_symbols(&self) -> Result<Vec<String>, SourceError> {
        match &self.list_error {
            Some(reason) => Err(SourceError::Request {
                reason: reason.clone(),
            }),
            None => Ok(self.listed.clone()),
        }
    }
}

pub fn settings(name: &str) -> SourceSettings {
    let mut s = SourceSettings::new(
        name,
        SourceKind::Csv {
            path: PathBuf::from("unused"),
        },
    );
    s.requests_per_second = 0.0;
    s
}

pub fn watchlist_settings(name: &str, symbols: &[&str]) -> SourceSettings {
    let mut s = settings(name);
    s.screen = false;
    s.watchlist = symbols.iter().map(|s| s.to_string()).collect();
    s
}

pub fn handle(port: MockCandlePort, settings: SourceSettings) -> SourceHandle {
    SourceHandle::new(Arc::new(port), settings)
}

pub fn shared_handle(port: &Arc<MockCandlePort>, settings: SourceSettings) -> SourceHandle {
    SourceHandle::new(Arc::clone(port) as Arc<dyn CandlePort>, settings)
}

pub fn make_candle(i: usize, high: f64, low: f64, close: f64) -> Candle {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Candle {
        timestamp: start + ChronoDuration::hours(i as i64),
        open: close,
        high,
        low,
        close,
        volume: 1000.0,
    }
}

/// Closes step up by 1 each bar.
pub fn rising_candles(n: usize, start_price: f64) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let c = start_price + i as f64;
            make_candle(i, c + 1.0, c - 1.0, c)
        })
        .collect()
}

/// Closes step down by 1 each bar.
pub fn falling_candles(n: usize, start_price: f64) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let c = start_price - i as f64;
            make_candle(i, c + 1.0, c - 1.0, c)
        })
        .collect()
}

pub fn flat_candles(n: usize, price: f64) -> Vec<Candle> {
    (0..n)
        .map(|i| make_candle(i, price + 1.0, price - 1.0, price))
        .collect()
}

/// Candles in `<symbol>_<timeframe>.csv` layout.
pub fn candles_csv(candles: &[Candle]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for c in candles {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            c.timestamp.timestamp_millis(),
            c.open,
            c.high,
            c.low,
            c.close,
            c.volume
        ));
    }
    out
}
