use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("ticker: {0}")]
    Ticker(String),
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
    #[error("high {high} below series maximum {max}")]
    HighBelowMax { high: f64, max: f64 },
    #[error("low {low} above series minimum {min}")]
    LowAboveMin { low: f64, min: f64 },
    #[error("no bars")]
    NoBars,
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported wire version {0}")]
    UnsupportedVersion(u8),
    #[error("invalid ticker: {0}")]
    InvalidTicker(String),
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot needs {size} bytes without prices, bound is {max}")]
    TooLarge { size: usize, max: usize },
}

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("request exceeds {max} bytes")]
    LineTooLong { max: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
