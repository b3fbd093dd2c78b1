use std::sync::Arc;
use std::time::Duration;

use tickercast_middleware::Transport;
use tickercast_protocol::{encode_snapshot, Ticker};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::source::SnapshotSource;
use crate::state::{BroadcastStatus, SelectedTicker};

/// What one tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A datagram went out
    Sent { bytes: usize, samples_dropped: usize },
    /// Nothing was published: the source had no data or the snapshot could
    /// not be encoded within the datagram bound
    Skipped,
    /// The snapshot was encoded but the send failed
    SendFailed,
}

/// Publishes a snapshot of the selected ticker once per interval.
///
/// A failure inside a tick never ends the loop; the next tick starts fresh.
pub struct Broadcaster {
    source: Arc<dyn SnapshotSource>,
    transport: Arc<dyn Transport>,
    selected: SelectedTicker,
    interval: Duration,
    max_datagram: usize,
    status: Arc<BroadcastStatus>,
}

impl Broadcaster {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        transport: Arc<dyn Transport>,
        selected: SelectedTicker,
        interval: Duration,
        max_datagram: usize,
    ) -> Self {
        Self {
            source,
            transport,
            selected,
            interval,
            max_datagram,
            status: Arc::new(BroadcastStatus::new()),
        }
    }

    /// Handle for the control plane
    pub fn selected(&self) -> SelectedTicker {
        self.selected.clone()
    }

    /// Handle for the health server
    pub fn status_handle(&self) -> Arc<BroadcastStatus> {
        Arc::clone(&self.status)
    }

    fn datagram_bound(&self) -> usize {
        self.max_datagram.min(self.transport.max_payload())
    }

    /// Run one cycle: read the selection, fetch, encode, publish.
    pub async fn tick(&self) -> TickOutcome {
        self.status.mark_cycling();
        let ticker = self.selected.get();

        let snapshot = match self.source.fetch(&ticker).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(ticker = %ticker, kind = e.kind(), error = %e, "source failed, skipping tick");
                metrics::inc_tick(&format!("skipped_{}", e.kind()));
                self.status.record_skipped();
                return TickOutcome::Skipped;
            }
        };

        let encoded = match encode_snapshot(&snapshot, self.datagram_bound()) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "cannot encode snapshot, skipping tick");
                metrics::inc_tick("encode_failed");
                self.status.record_skipped();
                return TickOutcome::Skipped;
            }
        };

        if encoded.samples_dropped > 0 {
            debug!(
                ticker = %ticker,
                dropped = encoded.samples_dropped,
                kept = snapshot.prices().len() - encoded.samples_dropped,
                "price series truncated to fit datagram"
            );
        }

        let bytes = encoded.payload.len();
        match self.transport.publish(encoded.payload).await {
            Ok(()) => {
                metrics::inc_tick("sent");
                metrics::record_published(bytes, encoded.samples_dropped);
                self.status.record_sent();
                debug!(ticker = %ticker, bytes, latest = snapshot.latest(), "snapshot published");
                TickOutcome::Sent {
                    bytes,
                    samples_dropped: encoded.samples_dropped,
                }
            }
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "send failed");
                metrics::inc_tick("send_failed");
                self.status.record_send_failure();
                TickOutcome::SendFailed
            }
        }
    }

    /// Tick until `shutdown` is cancelled. A slow tick delays the next one
    /// instead of bursting to catch up.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            ticker = %self.selected.get(),
            interval_ms = self.interval.as_millis() as u64,
            max_datagram = self.datagram_bound(),
            "broadcaster started"
        );

        let mut previous: Option<Ticker> = None;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("broadcaster shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let current = self.selected.get();
                    if previous.as_ref().is_some_and(|p| p != &current) {
                        info!(ticker = %current, "broadcast ticker changed");
                    }
                    previous = Some(current);
                    self.tick().await;
                }
            }
        }
    }
}
