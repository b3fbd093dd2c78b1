use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tickercast_middleware::Transport;
use tickercast_protocol::{MarketSnapshot, Ticker};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::control::ControlClient;
use crate::error::ClientError;
use crate::feed::{latest_slot, SnapshotFeed};
use crate::receiver::{receive_loop, ReceiveStats};

/// Subscriber handle: a background receive loop feeding a depth-1 slot, plus
/// a control client for ticker requests.
///
/// Requests run on the caller's task and never block the receive loop.
pub struct SubscriberClient {
    feed: SnapshotFeed,
    control: ControlClient,
    stats: Arc<ReceiveStats>,
    shutdown: CancellationToken,
    receiver: Option<JoinHandle<()>>,
}

impl SubscriberClient {
    /// Subscribe to the data plane and start receiving. The control
    /// connection is opened on the first request.
    pub async fn start(
        transport: &dyn Transport,
        control_addr: SocketAddr,
        connect_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let subscription = transport.subscribe().await?;
        let (slot, feed) = latest_slot();
        let stats = Arc::new(ReceiveStats::default());
        let shutdown = CancellationToken::new();

        let receiver = {
            let stats = Arc::clone(&stats);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { receive_loop(subscription, slot, &stats, shutdown).await })
        };

        info!(control_addr = %control_addr, "subscriber started");
        Ok(Self {
            feed,
            control: ControlClient::new(control_addr, connect_timeout),
            stats,
            shutdown,
            receiver: Some(receiver),
        })
    }

    /// Ask the broadcaster to switch to `symbol`. Returns the normalised
    /// ticker that was sent.
    pub async fn request_ticker(&self, symbol: &str) -> Result<Ticker, ClientError> {
        let ticker = Ticker::parse(symbol).map_err(ClientError::InvalidTicker)?;
        self.control.request(&ticker).await?;
        Ok(ticker)
    }

    /// Wait for a snapshot newer than the last one returned; `None` once the
    /// receive loop has ended and nothing is left unread.
    pub async fn next_snapshot(&mut self) -> Option<MarketSnapshot> {
        self.feed.next().await
    }

    pub fn latest(&self) -> Option<MarketSnapshot> {
        self.feed.latest()
    }

    pub fn stats(&self) -> &ReceiveStats {
        &self.stats
    }

    /// Stop the receive loop and wait for it to finish
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(receiver) = self.receiver.take() {
            receiver.await.ok();
        }
    }
}

impl Drop for SubscriberClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
