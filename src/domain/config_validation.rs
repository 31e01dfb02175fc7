//! Configuration parsing and validation.
//!
//! Every key is checked before a cycle starts; a bad value is fatal and
//! reported with its section and key.

use crate::domain::criteria::ScanCriteria;
use crate::domain::error::TrendscanError;
use crate::domain::source::SourceSettings;
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;
use std::str::FromStr;

pub const SCAN_SECTION: &str = "scan";
pub const SOURCES_SECTION: &str = "sources";

pub fn source_section(name: &str) -> String {
    format!("source.{name}")
}

/// Build and validate the scan criteria and every configured source.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TrendscanError> {
    let criteria = ScanCriteria::from_config(config)?;
    criteria.validate()?;

    let names = source_names(config)?;
    for name in &names {
        SourceSettings::from_config(config, name)?.validate()?;
    }

    for section in unlisted_source_sections(config, &names) {
        tracing::warn!(section = %section, "source section is not listed in [sources] names, ignoring");
    }
    Ok(())
}

/// `[source.*]` sections that `[sources] names` does not mention.
pub fn unlisted_source_sections(config: &dyn ConfigPort, names: &[String]) -> Vec<String> {
    config
        .sections()
        .into_iter()
        .filter(|section| {
            section
                .strip_prefix("source.")
                .is_some_and(|name| !names.iter().any(|n| n.eq_ignore_ascii_case(name)))
        })
        .collect()
}

/// Source names from `[sources] names`, in configuration order.
pub fn source_names(config: &dyn ConfigPort) -> Result<Vec<String>, TrendscanError> {
    let names = config
        .get_list(SOURCES_SECTION, "names")
        .ok_or_else(|| TrendscanError::missing(SOURCES_SECTION, "names"))?;
    if names.is_empty() {
        return Err(TrendscanError::invalid(
            SOURCES_SECTION,
            "names",
            "at least one source is required",
        ));
    }

    let mut seen = Vec::with_capacity(names.len());
    for name in names {
        if seen.iter().any(|n: &String| n.eq_ignore_ascii_case(&name)) {
            return Err(TrendscanError::invalid(
                SOURCES_SECTION,
                "names",
                format!("duplicate source: {name}"),
            ));
        }
        seen.push(name);
    }
    Ok(seen)
}

fn read_parsed<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    expected: &str,
) -> Result<Option<T>, TrendscanError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| TrendscanError::invalid(section, key, format!("expected {expected}, got '{raw}'"))),
    }
}

pub(crate) fn read_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, TrendscanError> {
    Ok(read_parsed(config, section, key, "a non-negative integer")?.unwrap_or(default))
}

pub(crate) fn read_optional_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<usize>, TrendscanError> {
    read_parsed(config, section, key, "a non-negative integer")
}

pub(crate) fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, TrendscanError> {
    let value = read_parsed::<f64>(config, section, key, "a number")?.unwrap_or(default);
    if !value.is_finite() {
        return Err(TrendscanError::invalid(section, key, "value must be finite"));
    }
    Ok(value)
}

pub(crate) fn read_bool(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: bool,
) -> Result<bool, TrendscanError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            "" => Ok(default),
            _ => Err(TrendscanError::invalid(
                section,
                key,
                format!("expected true/false, got '{raw}'"),
            )),
        },
    }
}

pub(crate) fn read_timeframe(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Timeframe,
) -> Result<Timeframe, TrendscanError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| TrendscanError::invalid(section, key, format!("{e}"))),
    }
}

pub(crate) fn read_timeframes(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<Vec<Timeframe>>, TrendscanError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => Timeframe::parse_list(&raw)
            .map(Some)
            .map_err(|e| TrendscanError::invalid(section, key, format!("{e}"))),
    }
}
