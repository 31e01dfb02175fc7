//! Trend-strength and momentum gate evaluated on the base timeframe.

use crate::domain::criteria::ScanCriteria;
use crate::domain::indicator::IndicatorSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MomentumVerdict {
    pub is_trending: bool,
    pub has_momentum: bool,
}

impl MomentumVerdict {
    pub fn qualifies(&self) -> bool {
        self.is_trending && self.has_momentum
    }
}

/// ADX >= trending threshold; ROC > momentum threshold and RSI >= confirmation
/// threshold. An unavailable reading fails its gate.
pub fn evaluate(indicators: &IndicatorSet, criteria: &ScanCriteria) -> MomentumVerdict {
    let is_trending = indicators
        .adx
        .is_some_and(|adx| adx >= criteria.adx_trending_threshold);

    let has_momentum = match (indicators.roc, indicators.rsi) {
        (Some(roc), Some(rsi)) => {
            roc > criteria.roc_momentum_threshold && rsi >= criteria.rsi_confirmation_threshold
        }
        _ => false,
    };

    MomentumVerdict {
        is_trending,
        has_momentum,
    }
}
