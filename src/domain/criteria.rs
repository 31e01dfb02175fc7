//! Scan criteria: indicator periods, thresholds and timeframes for one run.

use crate::domain::config_validation::{
    read_bool, read_f64, read_timeframe, read_timeframes, read_usize, SCAN_SECTION,
};
use crate::domain::error::TrendscanError;
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;
use std::time::Duration;

pub const DEFAULT_EMA_PERIOD: usize = 50;
pub const DEFAULT_ADX_PERIOD: usize = 14;
pub const DEFAULT_ADX_TRENDING_THRESHOLD: f64 = 25.0;
pub const DEFAULT_ROC_PERIOD: usize = 14;
pub const DEFAULT_ROC_MOMENTUM_THRESHOLD: f64 = 0.5;
pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_RSI_CONFIRMATION_THRESHOLD: f64 = 55.0;
pub const DEFAULT_CANDLE_COUNT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanCriteria {
    pub ema_period: usize,
    pub adx_period: usize,
    pub adx_trending_threshold: f64,
    pub roc_period: usize,
    pub roc_momentum_threshold: f64,
    pub rsi_period: usize,
    pub rsi_confirmation_threshold: f64,
    pub candle_count: usize,
    /// Timeframe the momentum filter runs on.
    pub base_timeframe: Timeframe,
    /// Timeframes classified for qualifying symbols, in report order.
    pub timeframes: Vec<Timeframe>,
    /// Long, medium, short.
    pub mtfa_timeframes: [Timeframe; 3],
    pub require_full_history: bool,
    pub cycle_timeout: Option<Duration>,
}

impl Default for ScanCriteria {
    fn default() -> Self {
        Self {
            ema_period: DEFAULT_EMA_PERIOD,
            adx_period: DEFAULT_ADX_PERIOD,
            adx_trending_threshold: DEFAULT_ADX_TRENDING_THRESHOLD,
            roc_period: DEFAULT_ROC_PERIOD,
            roc_momentum_threshold: DEFAULT_ROC_MOMENTUM_THRESHOLD,
            rsi_period: DEFAULT_RSI_PERIOD,
            rsi_confirmation_threshold: DEFAULT_RSI_CONFIRMATION_THRESHOLD,
            candle_count: DEFAULT_CANDLE_COUNT,
            base_timeframe: Timeframe::H1,
            timeframes: vec![
                Timeframe::M15,
                Timeframe::M30,
                Timeframe::H1,
                Timeframe::H4,
                Timeframe::D1,
                Timeframe::W1,
            ],
            mtfa_timeframes: [Timeframe::W1, Timeframe::D1, Timeframe::H4],
            require_full_history: false,
            cycle_timeout: None,
        }
    }
}

impl ScanCriteria {
    /// Read `[scan]`, falling back to the defaults for absent keys.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TrendscanError> {
        let defaults = Self::default();
        let s = SCAN_SECTION;

        let timeframes = read_timeframes(config, s, "timeframes")?.unwrap_or(defaults.timeframes);
        let mtfa_timeframes = match read_timeframes(config, s, "mtfa_timeframes")? {
            None => defaults.mtfa_timeframes,
            Some(list) => <[Timeframe; 3]>::try_from(list).map_err(|list| {
                TrendscanError::invalid(
                    s,
                    "mtfa_timeframes",
                    format!("exactly 3 distinct timeframes required, got {}", list.len()),
                )
            })?,
        };
        let cycle_timeout = match read_usize(config, s, "cycle_timeout_secs", 0)? {
            0 => None,
            secs => Some(Duration::from_secs(secs as u64)),
        };

        Ok(Self {
            ema_period: read_usize(config, s, "ema_period", defaults.ema_period)?,
            adx_period: read_usize(config, s, "adx_period", defaults.adx_period)?,
            adx_trending_threshold: read_f64(
                config,
                s,
                "adx_trending_threshold",
                defaults.adx_trending_threshold,
            )?,
            roc_period: read_usize(config, s, "roc_period", defaults.roc_period)?,
            roc_momentum_threshold: read_f64(
                config,
                s,
                "roc_momentum_threshold",
                defaults.roc_momentum_threshold,
            )?,
            rsi_period: read_usize(config, s, "rsi_period", defaults.rsi_period)?,
            rsi_confirmation_threshold: read_f64(
                config,
                s,
                "rsi_confirmation_threshold",
                defaults.rsi_confirmation_threshold,
            )?,
            candle_count: read_usize(config, s, "candle_count", defaults.candle_count)?,
            base_timeframe: read_timeframe(config, s, "base_timeframe", defaults.base_timeframe)?,
            timeframes,
            mtfa_timeframes,
            require_full_history: read_bool(
                config,
                s,
                "require_full_history",
                defaults.require_full_history,
            )?,
            cycle_timeout,
        })
    }

    /// Every timeframe a qualifying symbol needs: the report timeframes
    /// followed by any MTFA timeframe not already listed.
    pub fn classified_timeframes(&self) -> Vec<Timeframe> {
        let mut out = self.timeframes.clone();
        for tf in self.mtfa_timeframes {
            if !out.contains(&tf) {
                out.push(tf);
            }
        }
        out
    }

    pub fn validate(&self) -> Result<(), TrendscanError> {
        let periods = [
            ("ema_period", self.ema_period),
            ("adx_period", self.adx_period),
            ("roc_period", self.roc_period),
            ("rsi_period", self.rsi_period),
            ("candle_count", self.candle_count),
        ];
        for (key, value) in periods {
            if value == 0 {
                return Err(TrendscanError::invalid("scan", key, format!("{key} must be positive")));
            }
        }

        if !(0.0..=100.0).contains(&self.adx_trending_threshold) {
            return Err(TrendscanError::invalid(
                "scan",
                "adx_trending_threshold",
                "adx_trending_threshold must be between 0 and 100",
            ));
        }
        if !(0.0..=100.0).contains(&self.rsi_confirmation_threshold) {
            return Err(TrendscanError::invalid(
                "scan",
                "rsi_confirmation_threshold",
                "rsi_confirmation_threshold must be between 0 and 100",
            ));
        }
        if !self.roc_momentum_threshold.is_finite() {
            return Err(TrendscanError::invalid(
                "scan",
                "roc_momentum_threshold",
                "roc_momentum_threshold must be finite",
            ));
        }
        if self.timeframes.is_empty() {
            return Err(TrendscanError::invalid(
                "scan",
                "timeframes",
                "at least one timeframe is required",
            ));
        }

        let [a, b, c] = self.mtfa_timeframes;
        if a == b || b == c || a == c {
            return Err(TrendscanError::invalid(
                "scan",
                "mtfa_timeframes",
                "mtfa_timeframes must be three distinct timeframes",
            ));
        }
        Ok(())
    }
}
