use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast;

use crate::error::TransportError;
use crate::transport::{Subscription, Transport, TransportMessage};

const CHANNEL_BUFFER_SIZE: usize = 1024;
const DEFAULT_MAX_PAYLOAD: usize = 65_507;

/// Process-local group. Every subscription sees every datagram published
/// after it subscribed; `published()` counts accepted publishes.
pub struct InMemoryTransport {
    tx: broadcast::Sender<TransportMessage>,
    sequence: AtomicU64,
    max_payload: usize,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            tx: broadcast::channel(CHANNEL_BUFFER_SIZE).0,
            sequence: AtomicU64::new(0),
            max_payload,
        }
    }

    /// Number of datagrams accepted by `publish`
    pub fn published(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    #[inline]
    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

struct InMemorySubscription {
    rx: broadcast::Receiver<TransportMessage>,
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn next(&mut self) -> Result<TransportMessage, TransportError> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => return Ok(msg),
                // Missed datagrams are superseded by the next one anyway
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return Err(TransportError::Closed),
            }
        }
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn publish(&self, payload: Bytes) -> Result<(), TransportError> {
        if payload.len() > self.max_payload {
            return Err(TransportError::Oversized {
                size: payload.len(),
                max: self.max_payload,
            });
        }
        let msg = TransportMessage {
            payload,
            source: None,
            sequence: Some(self.next_sequence()),
        };
        // No subscribers is not an error for a fire-and-forget group
        let _ = self.tx.send(msg);
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn Subscription>, TransportError> {
        Ok(Box::new(InMemorySubscription {
            rx: self.tx.subscribe(),
        }))
    }

    fn max_payload(&self) -> usize {
        self.max_payload
    }
}
