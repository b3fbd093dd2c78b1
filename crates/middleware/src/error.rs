use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("bind failed: {0}")]
    Bind(String),
    #[error("group join failed: {0}")]
    Join(String),
    #[error("publish failed: {0}")]
    PublishFailed(String),
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
    #[error("datagram of {size} bytes exceeds {max}")]
    Oversized { size: usize, max: usize },
    #[error("transport closed")]
    Closed,
}
