use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tickercast_middleware::{Subscription, TransportError};
use tickercast_protocol::decode_snapshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::feed::SnapshotSlot;

/// Pause after a receive error so a persistent socket fault does not spin
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
pub struct ReceiveStats {
    received: AtomicU64,
    decode_failures: AtomicU64,
    receive_errors: AtomicU64,
}

impl ReceiveStats {
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    pub fn receive_errors(&self) -> u64 {
        self.receive_errors.load(Ordering::Relaxed)
    }
}

/// Receive, decode and publish into `slot` until the subscription closes or
/// `shutdown` fires. Undecodable datagrams are counted and dropped.
pub async fn receive_loop(
    mut subscription: Box<dyn Subscription>,
    slot: SnapshotSlot,
    stats: &ReceiveStats,
    shutdown: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("receive loop cancelled");
                return;
            }
            message = subscription.next() => message,
        };

        match message {
            Ok(message) => match decode_snapshot(&message.payload) {
                Ok(snapshot) => {
                    stats.received.fetch_add(1, Ordering::Relaxed);
                    slot.publish(snapshot);
                }
                Err(e) => {
                    stats.decode_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        source = ?message.source,
                        bytes = message.payload.len(),
                        error = %e,
                        "dropping undecodable datagram"
                    );
                }
            },
            Err(TransportError::Closed) => {
                info!("data-plane subscription closed");
                return;
            }
            Err(e) => {
                stats.receive_errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "receive failed");
                tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::latest_slot;
    use bytes::Bytes;
    use std::sync::Arc;
    use tickercast_middleware::{InMemoryTransport, Transport};

    fn datagram(ticker: &str, latest: f64) -> Bytes {
        Bytes::from(format!(
            r#"{{"v":1,"ticker":"{ticker}","open":{latest},"high":{latest},"low":{latest},"latest":{latest},"yesterday_close":{latest},"prices":[{latest}]}}"#
        ))
    }

    #[tokio::test]
    async fn test_malformed_datagram_does_not_stop_loop() {
        let transport = InMemoryTransport::new();
        let subscription = transport.subscribe().await.unwrap();
        let (slot, mut feed) = latest_slot();
        let stats = Arc::new(ReceiveStats::default());
        let shutdown = CancellationToken::new();

        let handle = {
            let stats = Arc::clone(&stats);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { receive_loop(subscription, slot, &stats, shutdown).await })
        };

        transport.publish(datagram("AAA", 1.0)).await.unwrap();
        assert_eq!(feed.next().await.unwrap().ticker().as_str(), "AAA");

        transport
            .publish(Bytes::from_static(b"{'ticker': 'EVIL', '__import__': 1}"))
            .await
            .unwrap();
        transport.publish(datagram("BBB", 2.0)).await.unwrap();
        assert_eq!(feed.next().await.unwrap().ticker().as_str(), "BBB");

        assert_eq!(stats.decode_failures(), 1);
        assert_eq!(stats.received(), 2);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_subscription_ends_loop() {
        let transport = InMemoryTransport::new();
        let subscription = transport.subscribe().await.unwrap();
        let (slot, _feed) = latest_slot();
        let stats = ReceiveStats::default();

        drop(transport);
        receive_loop(subscription, slot, &stats, CancellationToken::new()).await;
        assert_eq!(stats.received(), 0);
    }
}
