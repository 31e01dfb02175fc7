//! Multi-timeframe consensus over three reference timeframes.

use crate::domain::trend::TrendLabel;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverallTrend {
    StrongBullish,
    Bullish,
    StrongBearish,
    Bearish,
    Mixed,
}

impl fmt::Display for OverallTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverallTrend::StrongBullish => "Strong Bullish",
            OverallTrend::Bullish => "Bullish",
            OverallTrend::StrongBearish => "Strong Bearish",
            OverallTrend::Bearish => "Bearish",
            OverallTrend::Mixed => "Mixed",
        };
        f.write_str(s)
    }
}

/// Neutral and Unknown count toward neither side.
pub fn aggregate(labels: [TrendLabel; 3]) -> OverallTrend {
    let bullish = labels.iter().filter(|l| **l == TrendLabel::Bullish).count();
    let bearish = labels.iter().filter(|l| **l == TrendLabel::Bearish).count();

    match (bullish, bearish) {
        (3, _) => OverallTrend::StrongBullish,
        (_, 3) => OverallTrend::StrongBearish,
        (b, s) if b > s => OverallTrend::Bullish,
        (b, s) if s > b => OverallTrend::Bearish,
        _ => OverallTrend::Mixed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TrendLabel::*;

    #[test]
    fn unanimous_is_strong() {
        assert_eq!(aggregate([Bullish, Bullish, Bullish]), OverallTrend::StrongBullish);
        assert_eq!(aggregate([Bearish, Bearish, Bearish]), OverallTrend::StrongBearish);
    }

    #[test]
    fn majority_wins() {
        assert_eq!(aggregate([Bullish, Bullish, Bearish]), OverallTrend::Bullish);
        assert_eq!(aggregate([Bearish, Neutral, Bearish]), OverallTrend::Bearish);
        assert_eq!(aggregate([Unknown, Bullish, Neutral]), OverallTrend::Bullish);
    }

    #[test]
    fn equal_counts_are_mixed() {
        assert_eq!(aggregate([Bullish, Bearish, Neutral]), OverallTrend::Mixed);
        assert_eq!(aggregate([Neutral, Neutral, Neutral]), OverallTrend::Mixed);
        assert_eq!(aggregate([Unknown, Unknown, Unknown]), OverallTrend::Mixed);
    }

    #[test]
    fn display() {
        assert_eq!(OverallTrend::StrongBearish.to_string(), "Strong Bearish");
    }
}
