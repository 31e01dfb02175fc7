//! Shared helper functions for indicator calculations.

use crate::domain::criteria::ScanCriteria;
use crate::domain::indicator::dmi::calculate_dmi;
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::roc::calculate_roc;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::IndicatorSet;
use crate::domain::ohlcv::Candle;

/// True range per bar; the first bar has no previous close and uses high - low.
pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            if i == 0 {
                candle.high - candle.low
            } else {
                candle.true_range(candles[i - 1].close)
            }
        })
        .collect()
}

/// Latest value of every scanner indicator for one series.
pub fn compute_indicator_set(candles: &[Candle], criteria: &ScanCriteria) -> IndicatorSet {
    if criteria.require_full_history && candles.len() < criteria.candle_count {
        return IndicatorSet::unavailable();
    }

    let dmi = calculate_dmi(candles, criteria.adx_period);
    IndicatorSet {
        adx: dmi.adx.latest(),
        plus_di: dmi.plus_di.latest(),
        minus_di: dmi.minus_di.latest(),
        ema: calculate_ema(candles, criteria.ema_period).latest(),
        rsi: calculate_rsi(candles, criteria.rsi_period).latest(),
        roc: calculate_roc(candles, criteria.roc_period).latest(),
    }
}
