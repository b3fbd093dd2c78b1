use thiserror::Error;
use tickercast_middleware::TransportError;
use tickercast_protocol::ControlError;

/// Subscriber-side failures. None of them stop the receive loop.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid ticker: {0}")]
    InvalidTicker(String),
    #[error("cannot connect to control plane at {addr}: {reason}")]
    Connect { addr: String, reason: String },
    #[error("connecting to control plane at {addr} timed out after {timeout_ms}ms")]
    ConnectTimeout { addr: String, timeout_ms: u64 },
    #[error("request failed: {0}")]
    Request(#[from] ControlError),
    #[error("data plane: {0}")]
    Transport(#[from] TransportError),
}
