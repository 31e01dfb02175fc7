//! Candle source port trait.

use crate::domain::error::SourceError;
use crate::domain::ohlcv::CandleSeries;
use crate::domain::timeframe::Timeframe;
use async_trait::async_trait;

/// A market-data backend: a broker terminal, an exchange API, or files.
///
/// Implementations must be safe to call from many symbol workers at once.
#[async_trait]
pub trait CandlePort: Send + Sync {
    fn name(&self) -> &str;

    /// Establish or verify the session. Called once per cycle before any
    /// other request.
    async fn connect(&self) -> Result<(), SourceError>;

    /// Up to `count` most recent candles, oldest first. Fewer is not an error.
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<CandleSeries, SourceError>;

    /// Every symbol currently open for trading, in the source's listing order.
    async fn list_tradable_symbols(&self) -> Result<Vec<String>, SourceError>;
}
