//! Scan cycle orchestration.
//!
//! A cycle walks the configured sources in order. Each source is connected,
//! its universes resolved, and every symbol scanned on a bounded worker pool
//! whose candle requests share the source's [`RequestGate`]. Failures are
//! contained at the narrowest scope: a bad symbol is skipped, a bad source is
//! recorded, and the cycle always produces a [`ScanReport`].
//!
//! Phases: `Idle -> SourceLoop -> SymbolLoop -> SourceLoop ... -> Aggregating -> Done`.

use crate::domain::criteria::ScanCriteria;
use crate::domain::error::TrendscanError;
use crate::domain::indicator_helpers::compute_indicator_set;
use crate::domain::momentum;
use crate::domain::mtfa;
use crate::domain::rate_limit::RequestGate;
use crate::domain::scan::{ScanReport, ScanResult, SkippedSymbol, SourceFailure, SourceReport};
use crate::domain::source::SourceSettings;
use crate::domain::timeframe::Timeframe;
use crate::domain::trend::{classify_candles, classify_series, TimeframeTrend, TrendLabel};
use crate::domain::universe::{resolve_screen_universe, watchlist_universe, SymbolUniverse, UniverseMode};
use crate::ports::candle_port::CandlePort;
use chrono::Utc;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    SourceLoop,
    SymbolLoop,
    Aggregating,
    Done,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanPhase::Idle => "idle",
            ScanPhase::SourceLoop => "source_loop",
            ScanPhase::SymbolLoop => "symbol_loop",
            ScanPhase::Aggregating => "aggregating",
            ScanPhase::Done => "done",
        };
        f.write_str(s)
    }
}

/// A configured source paired with the port that serves it.
#[derive(Clone)]
pub struct SourceHandle {
    pub port: Arc<dyn CandlePort>,
    pub settings: SourceSettings,
}

impl SourceHandle {
    pub fn new(port: Arc<dyn CandlePort>, settings: SourceSettings) -> Self {
        Self { port, settings }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }
}

/// Everything one symbol worker needs. Cheap to clone.
#[derive(Clone)]
pub struct SymbolContext {
    pub port: Arc<dyn CandlePort>,
    pub gate: RequestGate,
    pub criteria: Arc<ScanCriteria>,
    pub source_name: String,
    pub mode: UniverseMode,
}

impl SymbolContext {
    /// Scan one symbol. `Ok(None)` means a Screen symbol that did not pass
    /// the momentum filter.
    pub async fn scan(&self, symbol: &str) -> Result<Option<ScanResult>, TrendscanError> {
        let criteria = self.criteria.as_ref();

        self.gate.acquire().await;
        let base = self
            .port
            .get_candles(symbol, criteria.base_timeframe, criteria.candle_count)
            .await
            .map_err(|e| TrendscanError::SymbolCompute {
                source_name: self.source_name.clone(),
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;

        let indicators = compute_indicator_set(&base.candles, criteria);
        let verdict = momentum::evaluate(&indicators, criteria);
        debug!(
            source = %self.source_name,
            symbol,
            adx = ?indicators.adx,
            roc = ?indicators.roc,
            rsi = ?indicators.rsi,
            qualifies = verdict.qualifies(),
            "momentum verdict"
        );

        if self.mode == UniverseMode::Screen && !verdict.qualifies() {
            return Ok(None);
        }

        let mut timeframe_trends = Vec::new();
        for timeframe in criteria.classified_timeframes() {
            let trend = if timeframe == criteria.base_timeframe {
                classify_series(&base, criteria)
            } else {
                TimeframeTrend {
                    timeframe,
                    label: self.classify_remote(symbol, timeframe).await,
                }
            };
            timeframe_trends.push(trend);
        }

        let label_on = |tf: Timeframe| {
            timeframe_trends
                .iter()
                .find(|t| t.timeframe == tf)
                .map_or(TrendLabel::Unknown, |t| t.label)
        };
        let overall_trend = mtfa::aggregate(criteria.mtfa_timeframes.map(label_on));

        Ok(Some(ScanResult {
            source_name: self.source_name.clone(),
            symbol: symbol.to_string(),
            mode: self.mode,
            indicators,
            qualifies: verdict.qualifies(),
            timeframe_trends,
            overall_trend,
            last_candle: base.last().map(|c| c.timestamp),
        }))
    }

    async fn classify_remote(&self, symbol: &str, timeframe: Timeframe) -> TrendLabel {
        self.gate.acquire().await;
        match self
            .port
            .get_candles(symbol, timeframe, self.criteria.candle_count)
            .await
        {
            Ok(series) => classify_candles(&series.candles, &self.criteria),
            Err(e) => {
                warn!(
                    source = %self.source_name,
                    symbol,
                    %timeframe,
                    error = %e,
                    "timeframe fetch failed, trend unknown"
                );
                TrendLabel::Unknown
            }
        }
    }
}

/// Marks a source as being scanned; released on drop.
struct CycleLease {
    registry: Arc<Mutex<HashSet<String>>>,
    source_name: String,
}

impl Drop for CycleLease {
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.remove(&self.source_name);
    }
}

struct UniverseOutcome {
    results: Vec<ScanResult>,
    skipped: Vec<SkippedSymbol>,
    timed_out: bool,
}

struct SourceOutcome {
    report: SourceReport,
    timed_out: bool,
}

/// Runs scan cycles. Clones share the in-flight registry, so two cycles can
/// never scan the same source at once.
#[derive(Clone)]
pub struct Scanner {
    criteria: Arc<ScanCriteria>,
    in_flight: Arc<Mutex<HashSet<String>>>,
    phase: Arc<watch::Sender<ScanPhase>>,
}

impl Scanner {
    pub fn new(criteria: ScanCriteria) -> Self {
        let (phase, _) = watch::channel(ScanPhase::Idle);
        Self {
            criteria: Arc::new(criteria),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            phase: Arc::new(phase),
        }
    }

    pub fn criteria(&self) -> &ScanCriteria {
        &self.criteria
    }

    pub fn phase(&self) -> ScanPhase {
        *self.phase.borrow()
    }

    pub fn watch_phase(&self) -> watch::Receiver<ScanPhase> {
        self.phase.subscribe()
    }

    fn enter(&self, phase: ScanPhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            info!(from = %previous, to = %phase, "scan phase");
        }
    }

    fn try_lease(&self, source_name: &str) -> Option<CycleLease> {
        let mut registry = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !registry.insert(source_name.to_string()) {
            return None;
        }
        Some(CycleLease {
            registry: Arc::clone(&self.in_flight),
            source_name: source_name.to_string(),
        })
    }

    /// Run one full cycle over `sources` in order. Never fails: every
    /// problem is recorded in the returned report.
    pub async fn run_cycle(&self, sources: &[SourceHandle]) -> ScanReport {
        let started_at = Utc::now();
        let deadline = self.criteria.cycle_timeout.map(|d| Instant::now() + d);
        info!(sources = sources.len(), "scan cycle started");
        self.enter(ScanPhase::SourceLoop);

        let mut reports = Vec::new();
        let mut failures = Vec::new();
        let mut timed_out = false;

        for handle in sources {
            let source_name = handle.name().to_string();

            if timed_out || deadline.is_some_and(|d| Instant::now() >= d) {
                timed_out = true;
                let err = TrendscanError::CycleTimeout {
                    source_name: source_name.clone(),
                };
                warn!(source = %source_name, "skipping source: {err}");
                failures.push(SourceFailure {
                    source_name,
                    reason: err.to_string(),
                });
                continue;
            }

            match self.scan_source(handle, deadline).await {
                Ok(outcome) => {
                    if outcome.timed_out {
                        timed_out = true;
                        failures.push(SourceFailure {
                            source_name: source_name.clone(),
                            reason: TrendscanError::CycleTimeout {
                                source_name: source_name.clone(),
                            }
                            .to_string(),
                        });
                    }
                    info!(
                        source = %source_name,
                        screened = outcome.report.screened.len(),
                        watchlist = outcome.report.watchlist.len(),
                        skipped = outcome.report.skipped.len(),
                        "source scanned"
                    );
                    reports.push(outcome.report);
                }
                Err(err) => {
                    if matches!(err, TrendscanError::CycleTimeout { .. }) {
                        timed_out = true;
                    }
                    warn!(source = %source_name, "source failed: {err}");
                    failures.push(SourceFailure {
                        source_name,
                        reason: err.to_string(),
                    });
                }
            }
            self.enter(ScanPhase::SourceLoop);
        }

        self.enter(ScanPhase::Aggregating);
        let report = ScanReport::new(started_at, Utc::now(), reports, failures, timed_out);
        info!(
            qualifying = report.qualifying_symbols.len(),
            failed_sources = report.failed_sources.len(),
            timed_out,
            "scan cycle finished"
        );
        self.enter(ScanPhase::Done);
        report
    }

    async fn scan_source(
        &self,
        handle: &SourceHandle,
        deadline: Option<Instant>,
    ) -> Result<SourceOutcome, TrendscanError> {
        let settings = &handle.settings;
        let timeout_err = || TrendscanError::CycleTimeout {
            source_name: settings.name.clone(),
        };

        let Some(_lease) = self.try_lease(&settings.name) else {
            return Err(TrendscanError::SourceBusy {
                source_name: settings.name.clone(),
            });
        };

        within(deadline, handle.port.connect())
            .await
            .ok_or_else(timeout_err)?
            .map_err(|e| TrendscanError::SourceConnection {
                source_name: settings.name.clone(),
                reason: e.to_string(),
            })?;

        let gate = RequestGate::new(settings.requests_per_second);
        let mut universes = Vec::new();
        if settings.screen {
            gate.acquire().await;
            let universe = within(deadline, resolve_screen_universe(handle.port.as_ref(), settings))
                .await
                .ok_or_else(timeout_err)?
                .map_err(|e| TrendscanError::SourceConnection {
                    source_name: settings.name.clone(),
                    reason: format!("listing tradable symbols: {e}"),
                })?;
            universes.push(universe);
        }
        universes.extend(watchlist_universe(settings));

        let mut report = SourceReport::new(settings.name.clone());
        let mut timed_out = false;
        for universe in &universes {
            info!(
                source = %settings.name,
                mode = %universe.mode,
                symbols = universe.count(),
                rate_limited = gate.is_limited(),
                "scanning universe"
            );
            self.enter(ScanPhase::SymbolLoop);
            let outcome = self.scan_universe(handle, universe, &gate, deadline).await;

            match universe.mode {
                UniverseMode::Screen => report.screened = outcome.results,
                UniverseMode::Watchlist => report.watchlist = outcome.results,
            }
            report.skipped.extend(outcome.skipped);

            if outcome.timed_out {
                timed_out = true;
                break;
            }
        }

        Ok(SourceOutcome { report, timed_out })
    }

    async fn scan_universe(
        &self,
        handle: &SourceHandle,
        universe: &SymbolUniverse,
        gate: &RequestGate,
        deadline: Option<Instant>,
    ) -> UniverseOutcome {
        let ctx = SymbolContext {
            port: Arc::clone(&handle.port),
            gate: gate.clone(),
            criteria: Arc::clone(&self.criteria),
            source_name: universe.source_name.clone(),
            mode: universe.mode,
        };
        let semaphore = Arc::new(Semaphore::new(handle.settings.max_concurrency.max(1)));

        let mut tasks = JoinSet::new();
        for (index, symbol) in universe.symbols.iter().enumerate() {
            let ctx = ctx.clone();
            let semaphore = Arc::clone(&semaphore);
            let symbol = symbol.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (
                        index,
                        Err(TrendscanError::SymbolCompute {
                            source_name: ctx.source_name.clone(),
                            symbol,
                            reason: "worker pool closed".to_string(),
                        }),
                    );
                };
                (index, ctx.scan(&symbol).await)
            });
        }

        let mut slots: Vec<Option<Result<Option<ScanResult>, TrendscanError>>> =
            (0..universe.count()).map(|_| None).collect();
        let mut timed_out = false;

        loop {
            let next = within(deadline, tasks.join_next()).await;
            let Some(joined) = next else {
                tasks.abort_all();
                timed_out = true;
                warn!(source = %universe.source_name, "cycle deadline reached, aborting symbol tasks");
                break;
            };
            let Some(joined) = joined else {
                break;
            };
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => warn!(source = %universe.source_name, error = %e, "symbol task failed"),
            }
        }

        let mut results = Vec::new();
        let mut skipped = Vec::new();
        for (symbol, slot) in universe.symbols.iter().zip(slots) {
            match slot {
                Some(Ok(Some(result))) => results.push(result),
                Some(Ok(None)) => {}
                Some(Err(err)) => {
                    warn!(source = %universe.source_name, symbol = %symbol, "skipping symbol: {err}");
                    skipped.push(SkippedSymbol {
                        symbol: symbol.clone(),
                        reason: err.to_string(),
                    });
                }
                None => skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: if timed_out {
                        "cycle deadline exceeded".to_string()
                    } else {
                        "symbol task aborted".to_string()
                    },
                }),
            }
        }

        UniverseOutcome {
            results,
            skipped,
            timed_out,
        }
    }
}

/// `None` when the deadline passes first.
async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}
