//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values
//! - `IndicatorSet`: The latest value of every indicator the scanner uses
//!
//! A value that cannot be computed (not enough candles, zero denominator) is
//! `None`, never a placeholder number.

pub mod dmi;
pub mod ema;
pub mod roc;
pub mod rsi;
pub mod smoothing;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ema(usize),
    Rsi(usize),
    Roc(usize),
    Adx(usize),
    PlusDi(usize),
    MinusDi(usize),
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn empty(indicator_type: IndicatorType) -> Self {
        Self {
            indicator_type,
            values: Vec::new(),
        }
    }

    /// Value at the most recent bar, if it could be computed.
    pub fn latest(&self) -> Option<f64> {
        self.values.last().and_then(|p| p.value)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Roc(period) => write!(f, "ROC({})", period),
            IndicatorType::Adx(period) => write!(f, "ADX({})", period),
            IndicatorType::PlusDi(period) => write!(f, "+DI({})", period),
            IndicatorType::MinusDi(period) => write!(f, "-DI({})", period),
        }
    }
}

/// Latest indicator readings for one (symbol, timeframe).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub ema: Option<f64>,
    pub rsi: Option<f64>,
    pub roc: Option<f64>,
}

impl IndicatorSet {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.adx.is_some()
            && self.plus_di.is_some()
            && self.minus_di.is_some()
            && self.ema.is_some()
            && self.rsi.is_some()
            && self.roc.is_some()
    }

    /// Names of the fields that could not be computed, for diagnostics.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("adx", self.adx),
            ("plus_di", self.plus_di),
            ("minus_di", self.minus_di),
            ("ema", self.ema),
            ("rsi", self.rsi),
            ("roc", self.roc),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}
