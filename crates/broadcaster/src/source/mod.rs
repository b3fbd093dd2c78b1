//! Snapshot sources: where each tick's market data comes from

use async_trait::async_trait;
use tickercast_protocol::{MarketSnapshot, Ticker};

use crate::error::SourceError;

pub mod synthetic;
pub mod yahoo;

pub use synthetic::SyntheticSource;
pub use yahoo::YahooChartSource;

/// Produces one snapshot for a ticker.
///
/// Implementations return errors rather than panicking; the broadcaster skips
/// the tick on any error. Network-backed sources must bound their own
/// latency with a timeout.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, ticker: &Ticker) -> Result<MarketSnapshot, SourceError>;
}
