//! Exponential Moving Average of closing price.
//!
//! k = 2/(n+1), seeded with the first close, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are unavailable.

use crate::domain::indicator::smoothing::smooth;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Candle;

pub fn calculate_ema(candles: &[Candle], period: usize) -> IndicatorSeries {
    if period == 0 || candles.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Ema(period));
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let smoothed = smooth(&closes, period);

    let values = candles
        .iter()
        .zip(smoothed)
        .enumerate()
        .map(|(i, (candle, ema))| IndicatorPoint {
            timestamp: candle.timestamp,
            value: (i + 1 >= period).then_some(ema),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}
