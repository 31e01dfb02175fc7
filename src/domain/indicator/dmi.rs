//! Directional Movement Index: +DI, -DI and ADX.
//!
//! +DM[i] = H[i]-H[i-1] when that is positive and larger than L[i-1]-L[i], else 0
//! -DM[i] = L[i-1]-L[i] when that is positive and larger than H[i]-H[i-1], else 0
//! ±DI = 100 * smooth(±DM, n) / ATR(n), unavailable while ATR is 0
//! DX  = 100 * |+DI - -DI| / (+DI + -DI), unavailable while the sum is 0
//! ADX = smooth(DX, n)
//!
//! Warmup: every output needs 2n bars.

use crate::domain::indicator::smoothing::{smooth, smooth_partial};
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::indicator_helpers::true_ranges;
use crate::domain::ohlcv::Candle;

#[derive(Debug, Clone)]
pub struct DmiSeries {
    pub plus_di: IndicatorSeries,
    pub minus_di: IndicatorSeries,
    pub adx: IndicatorSeries,
}

pub fn min_bars(period: usize) -> usize {
    2 * period
}

/// (+DM, -DM) per bar; both are 0 on the first bar.
pub fn directional_movement(candles: &[Candle]) -> (Vec<f64>, Vec<f64>) {
    let mut plus = vec![0.0; candles.len()];
    let mut minus = vec![0.0; candles.len()];
    for i in 1..candles.len() {
        let up = candles[i].high - candles[i - 1].high;
        let down = candles[i - 1].low - candles[i].low;
        if up > down && up > 0.0 {
            plus[i] = up;
        }
        if down > up && down > 0.0 {
            minus[i] = down;
        }
    }
    (plus, minus)
}

pub fn calculate_dmi(candles: &[Candle], period: usize) -> DmiSeries {
    if period == 0 || candles.is_empty() {
        return DmiSeries {
            plus_di: IndicatorSeries::empty(IndicatorType::PlusDi(period)),
            minus_di: IndicatorSeries::empty(IndicatorType::MinusDi(period)),
            adx: IndicatorSeries::empty(IndicatorType::Adx(period)),
        };
    }

    let atr = smooth(&true_ranges(candles), period);
    let (plus_dm, minus_dm) = directional_movement(candles);
    let plus_sm = smooth(&plus_dm, period);
    let minus_sm = smooth(&minus_dm, period);

    let di = |dm: &[f64]| -> Vec<Option<f64>> {
        dm.iter()
            .zip(&atr)
            .map(|(&dm, &atr)| (atr != 0.0).then(|| 100.0 * dm / atr))
            .collect()
    };
    let plus_di = di(&plus_sm);
    let minus_di = di(&minus_sm);

    let dx: Vec<Option<f64>> = plus_di
        .iter()
        .zip(&minus_di)
        .map(|(p, m)| match (p, m) {
            (Some(p), Some(m)) if p + m != 0.0 => Some(100.0 * (p - m).abs() / (p + m)),
            _ => None,
        })
        .collect();
    let adx = smooth_partial(&dx, period);

    let warm = min_bars(period);
    let to_series = |indicator_type: IndicatorType, raw: &[Option<f64>]| IndicatorSeries {
        indicator_type,
        values: candles
            .iter()
            .zip(raw)
            .enumerate()
            .map(|(i, (candle, &value))| IndicatorPoint {
                timestamp: candle.timestamp,
                value: if i + 1 >= warm { value } else { None },
            })
            .collect(),
    };

    DmiSeries {
        plus_di: to_series(IndicatorType::PlusDi(period), &plus_di),
        minus_di: to_series(IndicatorType::MinusDi(period), &minus_di),
        adx: to_series(IndicatorType::Adx(period), &adx),
    }
}
