//! tickercast-broadcaster: selected-ticker snapshot multicaster
//!
//! A tick loop fetches a snapshot of the currently selected ticker and
//! publishes it to the data-plane group; a TCP control plane lets any
//! subscriber change the selection.

pub mod broadcaster;
pub mod config;
pub mod control;
pub mod error;
pub mod metrics;
pub mod server;
pub mod source;
pub mod state;

pub use broadcaster::{Broadcaster, TickOutcome};
pub use config::{Config, SourceKind};
pub use control::{serve_connection, ConnectionSummary, ControlServer};
pub use error::{ConfigError, SourceError};
pub use server::{create_router, run_server, ServerState};
pub use source::{SnapshotSource, SyntheticSource, YahooChartSource};
pub use state::{BroadcastState, BroadcastStatus, SelectedTicker, StatusReport};
