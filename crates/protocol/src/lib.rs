//! tickercast-protocol: Snapshot model and wire formats
//!
//! The data plane carries one JSON-encoded [`MarketSnapshot`] per datagram.
//! The control plane carries newline-delimited [`Ticker`] requests over TCP.

pub mod codec;
pub mod control;
pub mod error;
pub mod snapshot;
pub mod ticker;

pub use codec::{decode_snapshot, encode_snapshot, Encoded, DEFAULT_MAX_DATAGRAM, WIRE_VERSION};
pub use control::{TickerCodec, MAX_REQUEST_LEN};
pub use error::{ControlError, DecodeError, EncodeError, SnapshotError};
pub use snapshot::{round2, Bar, MarketSnapshot};
pub use ticker::{Ticker, MAX_TICKER_LEN};
