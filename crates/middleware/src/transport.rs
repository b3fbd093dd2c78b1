use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;

/// One received datagram
#[derive(Debug, Clone)]
pub struct TransportMessage {
    pub payload: Bytes,
    /// Sender address, when the transport knows it
    pub source: Option<SocketAddr>,
    /// Publish order, for transports that assign one
    pub sequence: Option<u64>,
}

/// Subscription handle for receiving datagrams
#[async_trait]
pub trait Subscription: Send + Sync {
    /// Receive next datagram (blocks until available)
    async fn next(&mut self) -> Result<TransportMessage, TransportError>;
}

/// One-to-many, fire-and-forget datagram transport.
///
/// No delivery or ordering guarantee: each payload must be self-contained.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one datagram to every current subscriber
    async fn publish(&self, payload: Bytes) -> Result<(), TransportError>;

    /// Join the group; the handle stays subscribed until dropped
    async fn subscribe(&self) -> Result<Box<dyn Subscription>, TransportError>;

    /// Largest payload `publish` accepts
    fn max_payload(&self) -> usize;
}
