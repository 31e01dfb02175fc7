//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::build_source_handles;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::config_validation::{source_names, validate_config};
use crate::domain::criteria::ScanCriteria;
use crate::domain::error::TrendscanError;
use crate::domain::orchestrator::{Scanner, SourceHandle, SymbolContext};
use crate::domain::rate_limit::RequestGate;
use crate::domain::source::SourceSettings;
use crate::domain::universe::{filter_tradable, UniverseMode};
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "trendscan", about = "Multi-source trend and momentum scanner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one scan cycle over every configured source
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Only scan these sources (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// List the symbols a source would screen
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        source: String,
    },
    /// Scan one symbol regardless of the momentum filter
    Inspect {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        source: String,
        #[arg(long)]
        symbol: String,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Scan {
            config,
            output,
            sources,
            compact,
        } => run_scan(&config, output, &sources, compact),
        Command::ListSymbols { config, source } => run_list_symbols(&config, &source),
        Command::Inspect {
            config,
            source,
            symbol,
        } => run_inspect(&config, &source, &symbol),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: TrendscanError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, TrendscanError> {
    FileConfigAdapter::from_file(path).map_err(|e| TrendscanError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Validated criteria and every source's settings, in configuration order.
pub fn load_settings(
    config: &FileConfigAdapter,
) -> Result<(ScanCriteria, Vec<SourceSettings>), TrendscanError> {
    validate_config(config)?;
    let criteria = ScanCriteria::from_config(config)?;
    let sources = source_names(config)?
        .iter()
        .map(|name| SourceSettings::from_config(config, name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((criteria, sources))
}

fn select_sources(
    all: Vec<SourceSettings>,
    wanted: &[String],
) -> Result<Vec<SourceSettings>, TrendscanError> {
    if wanted.is_empty() {
        return Ok(all);
    }
    wanted
        .iter()
        .map(|name| {
            all.iter()
                .find(|s| s.name.eq_ignore_ascii_case(name))
                .cloned()
                .ok_or_else(|| {
                    TrendscanError::invalid("sources", "names", format!("no source named '{name}'"))
                })
        })
        .collect()
}

fn block_on<F: Future>(fut: F) -> Result<F::Output, TrendscanError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(fut))
}

fn prepare(
    config_path: &PathBuf,
    wanted: &[String],
) -> Result<(ScanCriteria, Vec<SourceHandle>), TrendscanError> {
    tracing::info!(path = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    let (criteria, settings) = load_settings(&config)?;
    let handles = build_source_handles(select_sources(settings, wanted)?)?;
    Ok((criteria, handles))
}

fn run_scan(config_path: &PathBuf, output: Option<PathBuf>, wanted: &[String], compact: bool) -> ExitCode {
    let (criteria, handles) = match prepare(config_path, wanted) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    let scanner = Scanner::new(criteria);
    let report = match block_on(scanner.run_cycle(&handles)) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    let mut reporter = JsonReportAdapter::new(output);
    if compact {
        reporter = reporter.compact();
    }
    if let Err(e) = reporter.emit(&report) {
        return fail(e);
    }

    eprintln!(
        "{} qualifying symbol(s) across {} source(s); {} source(s) failed",
        report.qualifying_symbols.len(),
        report.sources.len(),
        report.failed_sources.len()
    );

    // every source failing is a source error for the whole run
    if report.sources.is_empty() && !report.failed_sources.is_empty() {
        return ExitCode::from(3);
    }
    ExitCode::SUCCESS
}

fn find_source(config_path: &PathBuf, source: &str) -> Result<(ScanCriteria, SourceHandle), TrendscanError> {
    let (criteria, mut handles) = prepare(config_path, &[source.to_string()])?;
    let handle = handles.pop().ok_or_else(|| {
        TrendscanError::invalid("sources", "names", format!("no source named '{source}'"))
    })?;
    Ok((criteria, handle))
}

fn run_list_symbols(config_path: &PathBuf, source: &str) -> ExitCode {
    let (_, handle) = match find_source(config_path, source) {
        Ok(h) => h,
        Err(e) => return fail(e),
    };

    let listed = block_on(async {
        handle.port.connect().await?;
        handle.port.list_tradable_symbols().await
    });
    let symbols = match listed {
        Ok(Ok(symbols)) => symbols,
        Ok(Err(e)) => {
            return fail(TrendscanError::SourceConnection {
                source_name: handle.settings.name.clone(),
                reason: e.to_string(),
            });
        }
        Err(e) => return fail(e),
    };

    let symbols = filter_tradable(
        symbols,
        handle.settings.quote_filter.as_deref(),
        handle.settings.max_symbols,
    );
    if symbols.is_empty() {
        eprintln!("No tradable symbols on {}", handle.settings.name);
    } else {
        for symbol in &symbols {
            println!("{symbol}");
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

fn run_inspect(config_path: &PathBuf, source: &str, symbol: &str) -> ExitCode {
    let (criteria, handle) = match find_source(config_path, source) {
        Ok(h) => h,
        Err(e) => return fail(e),
    };

    let ctx = SymbolContext {
        port: Arc::clone(&handle.port),
        gate: RequestGate::new(handle.settings.requests_per_second),
        criteria: Arc::new(criteria),
        source_name: handle.settings.name.clone(),
        mode: UniverseMode::Watchlist,
    };

    let scanned = block_on(async {
        ctx.port
            .connect()
            .await
            .map_err(|e| TrendscanError::SourceConnection {
                source_name: ctx.source_name.clone(),
                reason: e.to_string(),
            })?;
        ctx.scan(symbol).await
    });

    let result = match scanned {
        Ok(Ok(Some(result))) => result,
        Ok(Ok(None)) => {
            eprintln!("{symbol}: no result");
            return ExitCode::from(4);
        }
        Ok(Err(e)) | Err(e) => return fail(e),
    };

    let missing = result.indicators.missing();
    if !missing.is_empty() {
        eprintln!("{symbol}: unavailable indicators: {}", missing.join(", "));
    }
    match serde_json::to_string_pretty(&result) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(TrendscanError::Report {
            reason: e.to_string(),
        }),
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let (criteria, sources) = match load_settings(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    eprintln!(
        "  base timeframe: {} ({} candles)",
        criteria.base_timeframe, criteria.candle_count
    );
    eprintln!(
        "  thresholds: ADX >= {}, ROC > {}, RSI >= {}",
        criteria.adx_trending_threshold,
        criteria.roc_momentum_threshold,
        criteria.rsi_confirmation_threshold
    );
    let mtfa: Vec<_> = criteria.mtfa_timeframes.iter().map(|t| t.as_str()).collect();
    eprintln!("  mtfa timeframes: {}", mtfa.join(", "));
    for s in &sources {
        eprintln!(
            "  source {}: kind={}, screen={}, watchlist={} symbol(s), concurrency={}",
            s.name,
            s.kind.label(),
            s.screen,
            s.watchlist.len(),
            s.max_concurrency
        );
    }
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
