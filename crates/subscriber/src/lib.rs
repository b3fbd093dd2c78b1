//! tickercast-subscriber: consumes broadcast snapshots and requests tickers
//!
//! The receive loop keeps only the newest snapshot (depth-1 slot); a
//! consumer that falls behind skips straight to the latest one.

pub mod client;
pub mod control;
pub mod error;
pub mod feed;
pub mod receiver;
pub mod session;
pub mod view;

pub use client::SubscriberClient;
pub use control::ControlClient;
pub use error::ClientError;
pub use feed::{latest_slot, SnapshotFeed, SnapshotSlot};
pub use receiver::{receive_loop, ReceiveStats};
pub use session::{Market, MarketSession};
pub use view::{Direction, SnapshotView, TrendLine};
