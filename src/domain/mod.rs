//! Core domain types and logic.

pub mod ohlcv;
pub mod timeframe;
pub mod indicator;
pub mod indicator_helpers;
pub mod criteria;
pub mod trend;
pub mod mtfa;
pub mod momentum;
pub mod universe;
pub mod source;
pub mod scan;
pub mod rate_limit;
pub mod orchestrator;
pub mod config_validation;
pub mod error;
