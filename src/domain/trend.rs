//! Per-timeframe trend classification from close, EMA and directional indicators.

use crate::domain::criteria::ScanCriteria;
use crate::domain::indicator::IndicatorSet;
use crate::domain::indicator_helpers::compute_indicator_set;
use crate::domain::ohlcv::{Candle, CandleSeries};
use crate::domain::timeframe::Timeframe;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendLabel {
    Bullish,
    Bearish,
    Neutral,
    Unknown,
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendLabel::Bullish => "Bullish",
            TrendLabel::Bearish => "Bearish",
            TrendLabel::Neutral => "Neutral",
            TrendLabel::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeframeTrend {
    pub timeframe: Timeframe,
    pub label: TrendLabel,
}

/// Bullish: close above EMA with +DI leading. Bearish: close below EMA with
/// -DI leading. Anything else is Neutral; a missing input is Unknown.
pub fn classify(
    close: Option<f64>,
    ema: Option<f64>,
    plus_di: Option<f64>,
    minus_di: Option<f64>,
) -> TrendLabel {
    let (Some(close), Some(ema), Some(plus), Some(minus)) = (close, ema, plus_di, minus_di) else {
        return TrendLabel::Unknown;
    };

    if close > ema && plus > minus {
        TrendLabel::Bullish
    } else if close < ema && minus > plus {
        TrendLabel::Bearish
    } else {
        TrendLabel::Neutral
    }
}

pub fn classify_indicators(close: Option<f64>, indicators: &IndicatorSet) -> TrendLabel {
    classify(close, indicators.ema, indicators.plus_di, indicators.minus_di)
}

pub fn classify_candles(candles: &[Candle], criteria: &ScanCriteria) -> TrendLabel {
    let indicators = compute_indicator_set(candles, criteria);
    classify_indicators(candles.last().map(|c| c.close), &indicators)
}

pub fn classify_series(series: &CandleSeries, criteria: &ScanCriteria) -> TimeframeTrend {
    TimeframeTrend {
        timeframe: series.timeframe,
        label: classify_candles(&series.candles, criteria),
    }
}
