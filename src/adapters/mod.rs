//! Concrete adapter implementations for ports.

#[cfg(feature = "binance")]
pub mod binance_adapter;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod json_report_adapter;

use crate::domain::error::{SourceError, TrendscanError};
use crate::domain::ohlcv::CandleSeries;
use crate::domain::orchestrator::SourceHandle;
use crate::domain::source::{SourceKind, SourceSettings};
use crate::domain::timeframe::Timeframe;
use crate::ports::candle_port::CandlePort;
use async_trait::async_trait;
use std::sync::Arc;

/// Build the candle port a source's settings describe.
pub fn build_candle_port(settings: &SourceSettings) -> Result<Arc<dyn CandlePort>, TrendscanError> {
    match &settings.kind {
        SourceKind::Csv { path } => Ok(Arc::new(csv_adapter::CsvAdapter::new(
            settings.name.clone(),
            path.clone(),
        ))),
        #[cfg(feature = "binance")]
        SourceKind::Binance {
            base_url,
            request_timeout,
        } => {
            let adapter = binance_adapter::BinanceAdapter::new(
                settings.name.clone(),
                base_url.clone(),
                *request_timeout,
            )
            .map_err(|e| TrendscanError::SourceConnection {
                source_name: settings.name.clone(),
                reason: e.to_string(),
            })?;
            Ok(Arc::new(adapter))
        }
        #[cfg(not(feature = "binance"))]
        SourceKind::Binance { .. } => Err(TrendscanError::invalid(
            &crate::domain::config_validation::source_section(&settings.name),
            "kind",
            "binance support is not compiled in (enable the `binance` feature)",
        )),
    }
}

/// Stands in for a source whose port could not be built. Every call fails,
/// so the cycle records the source as failed and moves on.
pub struct UnavailablePort {
    name: String,
    reason: String,
}

impl UnavailablePort {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }

    fn error(&self) -> SourceError {
        SourceError::Connection {
            reason: self.reason.clone(),
        }
    }
}

#[async_trait]
impl CandlePort for UnavailablePort {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), SourceError> {
        Err(self.error())
    }

    async fn get_candles(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        _count: usize,
    ) -> Result<CandleSeries, SourceError> {
        Err(self.error())
    }

    async fn list_tradable_symbols(&self) -> Result<Vec<String>, SourceError> {
        Err(self.error())
    }
}

/// Configuration errors abort the run; any other build failure only takes
/// its own source out of the cycle.
fn port_or_unavailable(
    settings: &SourceSettings,
    built: Result<Arc<dyn CandlePort>, TrendscanError>,
) -> Result<Arc<dyn CandlePort>, TrendscanError> {
    match built {
        Ok(port) => Ok(port),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            tracing::warn!(source = %settings.name, "source unavailable: {err}");
            Ok(Arc::new(UnavailablePort::new(
                settings.name.clone(),
                err.to_string(),
            )))
        }
    }
}

pub fn build_source_handles(
    settings: Vec<SourceSettings>,
) -> Result<Vec<SourceHandle>, TrendscanError> {
    settings
        .into_iter()
        .map(|s| {
            let port = port_or_unavailable(&s, build_candle_port(&s))?;
            Ok(SourceHandle::new(port, s))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::criteria::ScanCriteria;
    use crate::domain::orchestrator::Scanner;
    use std::path::PathBuf;

    fn csv_settings(name: &str) -> SourceSettings {
        SourceSettings::new(
            name,
            SourceKind::Csv {
                path: PathBuf::from("data"),
            },
        )
    }

    #[test]
    fn config_errors_still_abort() {
        let settings = csv_settings("files");
        let built = Err(TrendscanError::invalid("source.files", "kind", "unsupported"));
        assert!(port_or_unavailable(&settings, built).is_err());
    }

    #[tokio::test]
    async fn build_failure_becomes_failed_source() {
        let broken = csv_settings("spot");
        let port = port_or_unavailable(
            &broken,
            Err(TrendscanError::SourceConnection {
                source_name: "spot".into(),
                reason: "failed to build HTTP client: no TLS backend".into(),
            }),
        )
        .unwrap();
        assert_eq!(port.name(), "spot");

        let report = Scanner::new(ScanCriteria::default())
            .run_cycle(&[SourceHandle::new(port, broken)])
            .await;

        assert!(report.sources.is_empty());
        assert_eq!(report.failed_sources.len(), 1);
        assert_eq!(report.failed_sources[0].source_name, "spot");
        assert!(report.failed_sources[0].reason.contains("no TLS backend"));
    }

    #[test]
    fn handles_keep_configuration_order() {
        let handles =
            build_source_handles(vec![csv_settings("b"), csv_settings("a")]).unwrap();
        let names: Vec<_> = handles.iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
