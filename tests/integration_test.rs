//! Integration tests for the scan cycle.
//!
//! Tests cover:
//! - Partial source failure (connection, listing) without aborting the cycle
//! - Screen vs watchlist universes
//! - Symbol-level and timeframe-level fetch failures
//! - Deterministic result order and bounded concurrency
//! - Cycle deadline, overlapping-cycle refusal, request gating

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use trendscan::domain::criteria::ScanCriteria;
use trendscan::domain::mtfa::OverallTrend;
use trendscan::domain::orchestrator::{ScanPhase, Scanner};
use trendscan::domain::trend::TrendLabel;
use trendscan::domain::universe::UniverseMode;

fn scanner() -> Scanner {
    Scanner::new(ScanCriteria::default())
}

mod partial_failure {
    use super::*;

    #[tokio::test]
    async fn failing_source_does_not_block_others() {
        let a = handle(
            MockCandlePort::new("a").with_connect_error("terminal not running"),
            settings("a"),
        );
        let b = handle(
            MockCandlePort::new("b")
                .with_candles("BTCUSDT", rising_candles(100, 100.0))
                .with_candles("ETHUSDT", rising_candles(100, 50.0)),
            settings("b"),
        );

        let report = scanner().run_cycle(&[a, b]).await;

        assert_eq!(report.sources.len(), 1);
        assert_eq!(report.sources[0].source_name, "b");
        assert_eq!(report.failed_sources.len(), 1);
        assert_eq!(report.failed_sources[0].source_name, "a");
        assert!(report.failed_sources[0].reason.contains("terminal not running"));
        assert_eq!(report.qualifying_symbols, vec!["BTCUSDT", "ETHUSDT"]);
        assert!(!report.timed_out);
    }

    #[tokio::test]
    async fn listing_failure_is_a_source_failure() {
        let a = handle(
            MockCandlePort::new("a").with_list_error("exchangeInfo unavailable"),
            settings("a"),
        );

        let report = scanner().run_cycle(&[a]).await;

        assert!(report.sources.is_empty());
        assert!(report.failed_sources[0].reason.contains("exchangeInfo unavailable"));
    }

    #[tokio::test]
    async fn base_fetch_failure_skips_symbol() {
        let port = MockCandlePort::new("a")
            .with_candles("UP", rising_candles(100, 100.0))
            .with_error("BAD", "symbol not found");
        let report = scanner()
            .run_cycle(&[handle(port, watchlist_settings("a", &["BAD", "UP"]))])
            .await;

        let source = &report.sources[0];
        assert_eq!(source.watchlist.len(), 1);
        assert_eq!(source.watchlist[0].symbol, "UP");
        assert_eq!(source.skipped.len(), 1);
        assert_eq!(source.skipped[0].symbol, "BAD");
        assert!(source.skipped[0].reason.contains("symbol not found"));
        assert!(report.failed_sources.is_empty());
    }

    #[tokio::test]
    async fn secondary_timeframe_failure_is_unknown() {
        let port = MockCandlePort::new("a")
            .with_candles("UP", rising_candles(100, 100.0))
            .with_timeframe_error("UP", Timeframe::W1, "no weekly history");
        let report = scanner()
            .run_cycle(&[handle(port, watchlist_settings("a", &["UP"]))])
            .await;

        let result = &report.sources[0].watchlist[0];
        assert_eq!(result.trend_on(Timeframe::W1), Some(TrendLabel::Unknown));
        assert_eq!(result.trend_on(Timeframe::D1), Some(TrendLabel::Bullish));
        assert_eq!(result.overall_trend, OverallTrend::Bullish);
        assert!(report.sources[0].skipped.is_empty());
    }
}

mod universes {
    use super::*;

    #[tokio::test]
    async fn screen_keeps_only_qualifying() {
        let port = MockCandlePort::new("spot")
            .with_candles("UP", rising_candles(100, 100.0))
            .with_candles("DOWN", falling_candles(100, 300.0))
            .with_candles("FLAT", flat_candles(100, 100.0));

        let report = scanner().run_cycle(&[handle(port, settings("spot"))]).await;

        let source = &report.sources[0];
        assert_eq!(source.screened.len(), 1);
        let up = &source.screened[0];
        assert_eq!(up.symbol, "UP");
        assert_eq!(up.mode, UniverseMode::Screen);
        assert!(up.qualifies);
        assert_eq!(up.overall_trend, OverallTrend::StrongBullish);
        assert_eq!(
            up.timeframe_trends.len(),
            ScanCriteria::default().classified_timeframes().len()
        );
        assert!(up.last_candle.is_some());
        assert!(source.skipped.is_empty());
    }

    #[tokio::test]
    async fn watchlist_keeps_every_symbol() {
        let port = MockCandlePort::new("fx")
            .with_candles("DOWN", falling_candles(100, 300.0))
            .with_candles("FLAT", flat_candles(100, 100.0))
            .with_candles("UP", rising_candles(100, 100.0));

        let report = scanner()
            .run_cycle(&[handle(port, watchlist_settings("fx", &["DOWN", "FLAT", "UP"]))])
            .await;

        let source = &report.sources[0];
        assert!(source.screened.is_empty());
        let symbols: Vec<_> = source.watchlist.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["DOWN", "FLAT", "UP"]);

        assert!(!source.watchlist[0].qualifies);
        assert_eq!(source.watchlist[0].overall_trend, OverallTrend::StrongBearish);
        assert_eq!(source.watchlist[1].overall_trend, OverallTrend::Mixed);
        assert_eq!(
            source.watchlist[1].trend_on(Timeframe::H1),
            Some(TrendLabel::Neutral)
        );
        assert!(source.watchlist[2].qualifies);
        assert_eq!(report.qualifying_symbols, vec!["UP"]);
    }

    #[tokio::test]
    async fn screen_and_watchlist_on_one_source() {
        let port = MockCandlePort::new("mixed")
            .with_candles("UP", rising_candles(100, 100.0))
            .with_candles("DOWN", falling_candles(100, 300.0));
        let mut s = settings("mixed");
        s.watchlist = vec!["DOWN".to_string()];

        let report = scanner().run_cycle(&[handle(port, s)]).await;

        let source = &report.sources[0];
        assert_eq!(source.screened.len(), 1);
        assert_eq!(source.watchlist.len(), 1);
        assert_eq!(source.watchlist[0].mode, UniverseMode::Watchlist);
    }

    #[tokio::test]
    async fn quote_filter_and_cap_limit_screen() {
        let port = MockCandlePort::new("spot")
            .with_candles("AUSDT", rising_candles(100, 100.0))
            .with_candles("BBTC", rising_candles(100, 100.0))
            .with_candles("CUSDT", rising_candles(100, 100.0))
            .with_candles("DUSDT", rising_candles(100, 100.0));
        let mut s = settings("spot");
        s.quote_filter = Some("USDT".to_string());
        s.max_symbols = Some(2);

        let report = scanner().run_cycle(&[handle(port, s)]).await;

        let symbols: Vec<_> = report.sources[0]
            .screened
            .iter()
            .map(|r| r.symbol.as_str())
            .collect();
        assert_eq!(symbols, vec!["AUSDT", "CUSDT"]);
    }

    #[tokio::test]
    async fn short_history_never_qualifies() {
        let port = MockCandlePort::new("spot").with_candles("NEW", rising_candles(20, 100.0));
        let report = scanner().run_cycle(&[handle(port, settings("spot"))]).await;
        assert!(report.sources[0].screened.is_empty());
        assert!(report.qualifying_symbols.is_empty());
    }

    #[tokio::test]
    async fn qualifying_symbols_deduplicated_across_sources() {
        let a = handle(
            MockCandlePort::new("a").with_candles("BTCUSD", rising_candles(100, 100.0)),
            settings("a"),
        );
        let b = handle(
            MockCandlePort::new("b")
                .with_candles("XAUUSD", rising_candles(100, 100.0))
                .with_candles("BTCUSD", rising_candles(100, 100.0)),
            settings("b"),
        );

        let report = scanner().run_cycle(&[a, b]).await;

        assert_eq!(report.results().count(), 3);
        assert_eq!(report.qualifying_symbols, vec!["BTCUSD", "XAUUSD"]);
    }
}

mod concurrency {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn results_follow_input_order() {
        let symbols = ["S1", "S2", "S3", "S4"];
        let mut port = MockCandlePort::new("a");
        for (i, s) in symbols.iter().enumerate() {
            port = port
                .with_candles(s, rising_candles(100, 100.0))
                .with_delay(s, Duration::from_millis(400 - 100 * i as u64));
        }

        let report = scanner()
            .run_cycle(&[handle(port, watchlist_settings("a", &symbols))])
            .await;

        let order: Vec<_> = report.sources[0]
            .watchlist
            .iter()
            .map(|r| r.symbol.as_str())
            .collect();
        assert_eq!(order, symbols);
    }

    #[tokio::test(start_paused = true)]
    async fn worker_pool_is_bounded() {
        let symbols = ["S1", "S2", "S3", "S4", "S5", "S6"];
        let mut port = MockCandlePort::new("a");
        for s in symbols {
            port = port
                .with_candles(s, rising_candles(100, 100.0))
                .with_delay(s, Duration::from_millis(50));
        }
        let port = Arc::new(port);
        let mut s = watchlist_settings("a", &symbols);
        s.max_concurrency = 2;

        let report = scanner().run_cycle(&[shared_handle(&port, s)]).await;

        assert_eq!(report.sources[0].watchlist.len(), 6);
        assert!(port.peak_concurrency() <= 2, "peak {}", port.peak_concurrency());
        assert!(port.peak_concurrency() >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn request_gate_paces_requests() {
        let port = Arc::new(MockCandlePort::new("a").with_candles("UP", rising_candles(100, 100.0)));
        let mut s = watchlist_settings("a", &["UP"]);
        s.requests_per_second = 2.0;

        let start = tokio::time::Instant::now();
        let report = scanner().run_cycle(&[shared_handle(&port, s)]).await;
        let elapsed = start.elapsed();

        // base fetch plus one per other classified timeframe
        let expected = ScanCriteria::default().classified_timeframes().len();
        assert_eq!(port.request_count(), expected);
        assert_eq!(report.sources[0].watchlist.len(), 1);
        // two immediate, the rest at 500ms intervals
        let min = Duration::from_millis(500 * (expected as u64 - 2));
        assert!(elapsed >= min, "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_deadline_keeps_collected_results() {
        let criteria = ScanCriteria {
            cycle_timeout: Some(Duration::from_secs(5)),
            ..ScanCriteria::default()
        };
        let a = handle(
            MockCandlePort::new("a")
                .with_candles("FAST", rising_candles(100, 100.0))
                .with_candles("SLOW", rising_candles(100, 100.0))
                .with_delay("SLOW", Duration::from_secs(60)),
            watchlist_settings("a", &["FAST", "SLOW"]),
        );
        let b = handle(
            MockCandlePort::new("b").with_candles("LATE", rising_candles(100, 100.0)),
            watchlist_settings("b", &["LATE"]),
        );

        let report = Scanner::new(criteria).run_cycle(&[a, b]).await;

        assert!(report.timed_out);
        let source = &report.sources[0];
        assert_eq!(source.watchlist.len(), 1);
        assert_eq!(source.watchlist[0].symbol, "FAST");
        assert_eq!(source.skipped.len(), 1);
        assert_eq!(source.skipped[0].symbol, "SLOW");
        assert!(source.skipped[0].reason.contains("deadline"));

        let failed: Vec<_> = report
            .failed_sources
            .iter()
            .map(|f| f.source_name.as_str())
            .collect();
        assert_eq!(failed, vec!["a", "b"]);
        assert!(report.failed_sources[1].reason.contains("deadline"));
        assert_eq!(report.qualifying_symbols, vec!["FAST"]);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_cycle_is_refused() {
        let port = Arc::new(
            MockCandlePort::new("a")
                .with_candles("UP", rising_candles(100, 100.0))
                .with_connect_delay(Duration::from_secs(10)),
        );
        let handles = vec![shared_handle(&port, watchlist_settings("a", &["UP"]))];
        let scanner = scanner();

        let first = {
            let scanner = scanner.clone();
            let handles = handles.clone();
            tokio::spawn(async move { scanner.run_cycle(&handles).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        let second = scanner.run_cycle(&handles).await;
        assert!(second.sources.is_empty());
        assert_eq!(second.failed_sources.len(), 1);
        assert!(second.failed_sources[0].reason.contains("still being scanned"));

        let first = first.await.unwrap();
        assert_eq!(first.sources[0].watchlist.len(), 1);

        // lease released once the first cycle finished
        let third = scanner.run_cycle(&handles).await;
        assert_eq!(third.sources.len(), 1);
        assert!(third.failed_sources.is_empty());
    }

    #[tokio::test]
    async fn cycle_ends_in_done_phase() {
        let scanner = scanner();
        let phases = scanner.watch_phase();
        let port = MockCandlePort::new("a").with_candles("UP", rising_candles(100, 100.0));

        scanner.run_cycle(&[handle(port, settings("a"))]).await;

        assert_eq!(scanner.phase(), ScanPhase::Done);
        assert_eq!(*phases.borrow(), ScanPhase::Done);
    }
}
