//! Domain error types.
//!
//! Insufficient history is not an error: indicators report it as `None` and
//! the classifier as `TrendLabel::Unknown`.

/// Failure reported by a candle source.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    #[error("connection failed: {reason}")]
    Connection { reason: String },

    #[error("request failed: {reason}")]
    Request { reason: String },

    #[error("malformed response: {reason}")]
    Malformed { reason: String },
}

/// Top-level error type for trendscan.
#[derive(Debug, thiserror::Error)]
pub enum TrendscanError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("source {source_name} unavailable: {reason}")]
    SourceConnection { source_name: String, reason: String },

    #[error("source {source_name} is still being scanned by another cycle")]
    SourceBusy { source_name: String },

    #[error("scan cycle deadline exceeded before source {source_name} finished")]
    CycleTimeout { source_name: String },

    #[error("failed to scan {symbol} on {source_name}: {reason}")]
    SymbolCompute {
        source_name: String,
        symbol: String,
        reason: String,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrendscanError {
    /// Configuration problems stop the run; everything else only degrades
    /// the completeness of one cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TrendscanError::ConfigParse { .. }
                | TrendscanError::ConfigMissing { .. }
                | TrendscanError::ConfigInvalid { .. }
        )
    }

    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TrendscanError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing(section: &str, key: &str) -> Self {
        TrendscanError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&TrendscanError> for std::process::ExitCode {
    fn from(err: &TrendscanError) -> Self {
        let code: u8 = match err {
            TrendscanError::Io(_) | TrendscanError::Report { .. } => 1,
            TrendscanError::ConfigParse { .. }
            | TrendscanError::ConfigMissing { .. }
            | TrendscanError::ConfigInvalid { .. } => 2,
            TrendscanError::SourceConnection { .. }
            | TrendscanError::SourceBusy { .. }
            | TrendscanError::CycleTimeout { .. } => 3,
            TrendscanError::SymbolCompute { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
