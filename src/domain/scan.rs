//! Scan results as handed to the reporting side.

use crate::domain::indicator::IndicatorSet;
use crate::domain::mtfa::OverallTrend;
use crate::domain::trend::{TimeframeTrend, TrendLabel};
use crate::domain::timeframe::Timeframe;
use crate::domain::universe::UniverseMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub source_name: String,
    pub symbol: String,
    pub mode: UniverseMode,
    /// Base-timeframe readings.
    pub indicators: IndicatorSet,
    pub qualifies: bool,
    pub timeframe_trends: Vec<TimeframeTrend>,
    pub overall_trend: OverallTrend,
    pub last_candle: Option<DateTime<Utc>>,
}

impl ScanResult {
    pub fn trend_on(&self, timeframe: Timeframe) -> Option<TrendLabel> {
        self.timeframe_trends
            .iter()
            .find(|t| t.timeframe == timeframe)
            .map(|t| t.label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source_name: String,
    /// Qualifying symbols from the tradable-set screen, in listing order.
    pub screened: Vec<ScanResult>,
    /// Every watchlist symbol, in watchlist order.
    pub watchlist: Vec<ScanResult>,
    pub skipped: Vec<SkippedSymbol>,
}

impl SourceReport {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            ..Self::default()
        }
    }

    pub fn results(&self) -> impl Iterator<Item = &ScanResult> {
        self.screened.iter().chain(self.watchlist.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    pub failed_sources: Vec<SourceFailure>,
    /// Flat, deduplicated, in order of first appearance.
    pub qualifying_symbols: Vec<String>,
    pub timed_out: bool,
}

impl ScanReport {
    pub fn new(
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        sources: Vec<SourceReport>,
        failed_sources: Vec<SourceFailure>,
        timed_out: bool,
    ) -> Self {
        let mut seen = HashSet::new();
        let qualifying_symbols = sources
            .iter()
            .flat_map(|s| s.results())
            .filter(|r| r.qualifies)
            .filter(|r| seen.insert(r.symbol.clone()))
            .map(|r| r.symbol.clone())
            .collect();

        Self {
            started_at,
            finished_at,
            sources,
            failed_sources,
            qualifying_symbols,
            timed_out,
        }
    }

    pub fn results(&self) -> impl Iterator<Item = &ScanResult> {
        self.sources.iter().flat_map(|s| s.results())
    }

    pub fn source(&self, name: &str) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source_name == name)
    }
}
