use std::num::NonZeroUsize;
use std::sync::Mutex;

use async_trait::async_trait;
use lru::LruCache;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tickercast_protocol::{Bar, MarketSnapshot, Ticker};

use crate::error::SourceError;
use crate::source::SnapshotSource;

/// Minutes in a regular US session; the walk starts a new day after this many bars
pub const SESSION_BARS: usize = 390;

/// Largest per-bar move as a fraction of price
const MAX_STEP: f64 = 0.004;

/// Walks kept at once; the least recently fetched ticker is forgotten first
pub const MAX_WALKS: usize = 32;

struct Walk {
    yesterday_close: f64,
    bars: Vec<Bar>,
}

struct Inner {
    rng: StdRng,
    walks: LruCache<Ticker, Walk>,
}

/// Offline random-walk source. Every fetch appends one 1-minute bar for the
/// ticker; a ticker seen for the first time, or forgotten after
/// [`MAX_WALKS`] others, starts at a random price.
pub struct SyntheticSource {
    inner: Mutex<Inner>,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Deterministic walk for tests and demos
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            inner: Mutex::new(Inner {
                rng,
                walks: LruCache::new(NonZeroUsize::new(MAX_WALKS).unwrap_or(NonZeroUsize::MIN)),
            }),
        }
    }

    fn next_snapshot(&self, ticker: &Ticker) -> Result<MarketSnapshot, SourceError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| SourceError::Upstream("synthetic state poisoned".to_string()))?;
        let Inner { rng, walks } = &mut *guard;

        let walk = walks.get_or_insert_mut(ticker.clone(), || Walk {
            yesterday_close: rng.random_range(20.0..500.0),
            bars: Vec::with_capacity(SESSION_BARS),
        });

        if walk.bars.len() >= SESSION_BARS {
            if let Some(last) = walk.bars.last() {
                walk.yesterday_close = last.close;
            }
            walk.bars.clear();
        }

        let open = walk
            .bars
            .last()
            .map_or(walk.yesterday_close, |b| b.close);
        let close = (open * (1.0 + rng.random_range(-MAX_STEP..MAX_STEP))).max(0.01);
        let wick = open.max(close) * rng.random_range(0.0..MAX_STEP / 2.0);
        walk.bars.push(Bar {
            open,
            high: open.max(close) + wick,
            low: (open.min(close) - wick).max(0.01),
            close,
        });

        MarketSnapshot::from_bars(ticker.clone(), &walk.bars, walk.yesterday_close)
            .map_err(|e| SourceError::Upstream(format!("synthetic walk: {}", e)))
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotSource for SyntheticSource {
    async fn fetch(&self, ticker: &Ticker) -> Result<MarketSnapshot, SourceError> {
        self.next_snapshot(ticker)
    }
}
