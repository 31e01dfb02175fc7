//! RSI (Relative Strength Index) indicator implementation.
//!
//! Average gain/loss are simple means over the last n close-to-close changes:
//! - gain[i] = max(C[i] - C[i-1], 0), loss[i] = max(C[i-1] - C[i], 0)
//! - avg_gain = mean(gain over last n), avg_loss = mean(loss over last n)
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, or 0 when avg_gain is also 0 (no movement)
//!
//! Warmup: a value needs 2n bars, so the first 2n-1 bars are unavailable.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Candle;

pub fn min_bars(period: usize) -> usize {
    2 * period
}

pub fn calculate_rsi(candles: &[Candle], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values: candles
                .iter()
                .map(|c| IndicatorPoint {
                    timestamp: c.timestamp,
                    value: None,
                })
                .collect(),
        };
    }

    let mut gains = vec![0.0; candles.len()];
    let mut losses = vec![0.0; candles.len()];
    for i in 1..candles.len() {
        let change = candles[i].close - candles[i - 1].close;
        if change > 0.0 {
            gains[i] = change;
        } else {
            losses[i] = -change;
        }
    }

    let mut values = Vec::with_capacity(candles.len());
    for (i, candle) in candles.iter().enumerate() {
        let value = if i + 1 >= min_bars(period) {
            let window = (i + 1 - period)..=i;
            let avg_gain = gains[window.clone()].iter().sum::<f64>() / period as f64;
            let avg_loss = losses[window].iter().sum::<f64>() / period as f64;
            Some(rsi_from_averages(avg_gain, avg_loss))
        } else {
            None
        };
        values.push(IndicatorPoint {
            timestamp: candle.timestamp,
            value,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain > 0.0 { 100.0 } else { 0.0 };
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}
