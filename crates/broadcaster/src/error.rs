use thiserror::Error;

/// Failure of one `SnapshotSource::fetch`. Every variant skips the tick.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("no data for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("upstream timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl SourceError {
    pub fn unavailable(ticker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            ticker: ticker.into(),
            reason: reason.into(),
        }
    }

    /// Short label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataUnavailable { .. } => "data_unavailable",
            Self::Upstream(_) => "upstream",
            Self::Timeout { .. } => "timeout",
        }
    }
}

/// Startup-time configuration failure; fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("cannot bind {addr}: {reason}")]
    Bind { addr: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
