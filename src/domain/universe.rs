//! Symbol universes: the full tradable set of a source, or a fixed watchlist.
//!
//! Parses symbol lists from configuration and narrows a source's tradable
//! listing to the symbols a screen should visit.

use crate::domain::error::SourceError;
use crate::domain::source::SourceSettings;
use crate::ports::candle_port::CandlePort;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniverseMode {
    /// Every tradable symbol; only those passing the momentum filter are kept.
    Screen,
    /// Fixed list; every symbol is fully classified and kept.
    Watchlist,
}

impl fmt::Display for UniverseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniverseMode::Screen => f.write_str("screen"),
            UniverseMode::Watchlist => f.write_str("watchlist"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SymbolUniverse {
    pub source_name: String,
    pub symbols: Vec<String>,
    pub mode: UniverseMode,
}

impl SymbolUniverse {
    pub fn count(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

/// Split a comma-separated symbol list. Case and inner spaces are kept
/// because broker symbols such as "Volatility 10 Index" or "GBPUSD+" are
/// matched verbatim.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let symbol = token.trim();
        if symbol.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        if !seen.insert(symbol.to_string()) {
            return Err(UniverseError::DuplicateSymbol(symbol.to_string()));
        }
        symbols.push(symbol.to_string());
    }

    Ok(symbols)
}

/// Apply the quote-asset filter and size cap to a tradable listing,
/// preserving listing order.
pub fn filter_tradable(
    listed: Vec<String>,
    quote_filter: Option<&str>,
    max_symbols: Option<usize>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let filtered = listed
        .into_iter()
        .filter(|s| quote_filter.is_none_or(|q| s.ends_with(q)))
        .filter(|s| seen.insert(s.clone()));

    match max_symbols {
        Some(cap) => filtered.take(cap).collect(),
        None => filtered.collect(),
    }
}

pub async fn resolve_screen_universe(
    port: &dyn CandlePort,
    settings: &SourceSettings,
) -> Result<SymbolUniverse, SourceError> {
    let listed = port.list_tradable_symbols().await?;
    let symbols = filter_tradable(
        listed,
        settings.quote_filter.as_deref(),
        settings.max_symbols,
    );
    Ok(SymbolUniverse {
        source_name: settings.name.clone(),
        symbols,
        mode: UniverseMode::Screen,
    })
}

pub fn watchlist_universe(settings: &SourceSettings) -> Option<SymbolUniverse> {
    if settings.watchlist.is_empty() {
        return None;
    }
    Some(SymbolUniverse {
        source_name: settings.name.clone(),
        symbols: settings.watchlist.clone(),
        mode: UniverseMode::Watchlist,
    })
}
