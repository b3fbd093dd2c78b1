//! Data-plane codec: one JSON object per datagram.
//!
//! ```json
//! {"v":1,"ticker":"AAPL","open":189.5,"high":191.2,"low":188.9,"latest":190.75,"yesterday_close":189.1,"prices":[189.5,189.8]}
//! ```
//!
//! Decoding is strict: unknown versions, unknown or missing fields and
//! snapshots that break the high/low bounds are rejected.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, EncodeError};
use crate::snapshot::MarketSnapshot;
use crate::ticker::Ticker;

pub const WIRE_VERSION: u8 = 1;

/// Default datagram bound in bytes.
pub const DEFAULT_MAX_DATAGRAM: usize = 4096;

#[derive(Serialize)]
struct Outgoing<'a> {
    v: u8,
    #[serde(flatten)]
    snapshot: &'a MarketSnapshot,
}

#[derive(Deserialize)]
struct VersionProbe {
    v: u8,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Incoming {
    #[allow(dead_code)]
    v: u8,
    ticker: String,
    open: f64,
    high: f64,
    low: f64,
    latest: f64,
    yesterday_close: f64,
    prices: Vec<f64>,
}

/// An encoded datagram and how many of the oldest samples were cut to fit.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub payload: Bytes,
    pub samples_dropped: usize,
}

fn to_wire(snapshot: &MarketSnapshot) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&Outgoing {
        v: WIRE_VERSION,
        snapshot,
    })
}

/// Encode a snapshot into at most `max_bytes`.
///
/// When the full series does not fit, the oldest samples are dropped until it
/// does. Fails only if the snapshot does not fit with an empty series.
pub fn encode_snapshot(snapshot: &MarketSnapshot, max_bytes: usize) -> Result<Encoded, EncodeError> {
    let full = to_wire(snapshot)?;
    if full.len() <= max_bytes {
        return Ok(Encoded {
            payload: Bytes::from(full),
            samples_dropped: 0,
        });
    }

    let bare = to_wire(&snapshot.with_newest_prices(0))?;
    if bare.len() > max_bytes {
        return Err(EncodeError::TooLarge {
            size: bare.len(),
            max: max_bytes,
        });
    }

    // Encoded length grows with the number of samples kept; `fits` always
    // fits and `overflows` never does.
    let total = snapshot.prices().len();
    let (mut fits, mut overflows) = (0usize, total);
    let mut best = bare;
    while overflows - fits > 1 {
        let mid = fits + (overflows - fits) / 2;
        let candidate = to_wire(&snapshot.with_newest_prices(mid))?;
        if candidate.len() <= max_bytes {
            fits = mid;
            best = candidate;
        } else {
            overflows = mid;
        }
    }

    Ok(Encoded {
        payload: Bytes::from(best),
        samples_dropped: total - fits,
    })
}

/// Strictly decode one datagram. Nothing in the payload is evaluated.
pub fn decode_snapshot(payload: &[u8]) -> Result<MarketSnapshot, DecodeError> {
    let probe: VersionProbe = serde_json::from_slice(payload)?;
    if probe.v != WIRE_VERSION {
        return Err(DecodeError::UnsupportedVersion(probe.v));
    }

    let wire: Incoming = serde_json::from_slice(payload)?;
    let ticker = Ticker::parse(&wire.ticker).map_err(DecodeError::InvalidTicker)?;

    Ok(MarketSnapshot::new(
        ticker,
        wire.open,
        wire.high,
        wire.low,
        wire.latest,
        wire.yesterday_close,
        wire.prices,
    )?)
}
