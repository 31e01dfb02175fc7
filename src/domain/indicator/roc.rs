//! ROC (Rate of Change) indicator implementation.
//!
//! ROC(n)[i] = ((C[i] - C[i-n]) / C[i-n]) * 100
//! If C[i-n] == 0: unavailable
//! Warmup: first n bars unavailable.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Candle;

pub fn calculate_roc(candles: &[Candle], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(candles.len());

    for (i, candle) in candles.iter().enumerate() {
        let value = if period > 0 && i >= period {
            let prev_close = candles[i - period].close;
            (prev_close != 0.0).then(|| ((candle.close - prev_close) / prev_close) * 100.0)
        } else {
            None
        };

        values.push(IndicatorPoint {
            timestamp: candle.timestamp,
            value,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Roc(period),
        values,
    }
}
