//! Candle intervals understood by every candle source.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "2h")]
    H2,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
    #[serde(rename = "1M")]
    Mn1,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown timeframe: {0}")]
pub struct ParseTimeframeError(pub String);

impl Timeframe {
    pub const ALL: [Timeframe; 10] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H2,
        Timeframe::H4,
        Timeframe::D1,
        Timeframe::W1,
        Timeframe::Mn1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H2 => "2h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
            Timeframe::Mn1 => "1M",
        }
    }

    /// Parse a comma-separated list, keeping order and dropping repeats.
    pub fn parse_list(input: &str) -> Result<Vec<Timeframe>, ParseTimeframeError> {
        let mut out = Vec::new();
        for token in input.split(',') {
            let tf: Timeframe = token.trim().parse()?;
            if !out.contains(&tf) {
                out.push(tf);
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1M" (month) and "1m" (minute) differ only by case.
        match s {
            "1M" | "MN1" | "1mo" | "1mon" => return Ok(Timeframe::Mn1),
            "1m" | "M1" => return Ok(Timeframe::M1),
            _ => {}
        }
        match s.to_lowercase().as_str() {
            "5m" | "m5" => Ok(Timeframe::M5),
            "15m" | "m15" => Ok(Timeframe::M15),
            "30m" | "m30" => Ok(Timeframe::M30),
            "1h" | "h1" | "1hr" | "60m" => Ok(Timeframe::H1),
            "2h" | "h2" | "2hr" => Ok(Timeframe::H2),
            "4h" | "h4" | "4hr" => Ok(Timeframe::H4),
            "1d" | "d1" | "d" => Ok(Timeframe::D1),
            "1w" | "w1" | "w" => Ok(Timeframe::W1),
            _ => Err(ParseTimeframeError(s.to_string())),
        }
    }
}
