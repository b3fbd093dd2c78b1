//! Control plane: TCP listener accepting ticker-change requests.
//!
//! Each connection carries zero or more newline-terminated symbols; each
//! valid one replaces the broadcast selection, in arrival order. Connections
//! are served independently, so the last request applied wins.

use std::net::SocketAddr;

use futures_util::StreamExt;
use tickercast_protocol::{ControlError, TickerCodec};
use tokio::io::AsyncRead;
use tokio::net::TcpListener;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::metrics;
use crate::state::SelectedTicker;

/// Per-connection tally, for logs and tests
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub applied: usize,
    pub rejected: usize,
}

pub struct ControlServer {
    listener: TcpListener,
    selected: SelectedTicker,
}

impl ControlServer {
    pub async fn bind(addr: SocketAddr, selected: SelectedTicker) -> Result<Self, ConfigError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ConfigError::Bind {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { listener, selected })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` is cancelled. Open connections are
    /// dropped on shutdown.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(addr = ?self.listener.local_addr().ok(), "control server listening");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("control server shutting down");
                    break;
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            // Per-connection accept errors (e.g. ECONNABORTED) are transient
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    };

                    let selected = self.selected.clone();
                    let shutdown = shutdown.child_token();
                    tokio::spawn(async move {
                        metrics::control_connection_opened();
                        tokio::select! {
                            _ = shutdown.cancelled() => {}
                            summary = serve_connection(stream, &selected, peer) => {
                                debug!(
                                    peer = %peer,
                                    applied = summary.applied,
                                    rejected = summary.rejected,
                                    "control connection closed"
                                );
                            }
                        }
                        metrics::control_connection_closed();
                    });
                }
            }
        }
    }
}

/// Apply every request on one connection until EOF or a framing error.
///
/// Invalid symbols are logged and skipped; the connection stays open. An
/// over-long line or an I/O error closes it. Requests already applied stay
/// applied.
pub async fn serve_connection<R>(
    reader: R,
    selected: &SelectedTicker,
    peer: SocketAddr,
) -> ConnectionSummary
where
    R: AsyncRead + Unpin,
{
    let mut requests = FramedRead::new(reader, TickerCodec::new());
    let mut summary = ConnectionSummary::default();

    while let Some(frame) = requests.next().await {
        match frame {
            Ok(Ok(ticker)) => {
                let previous = selected.set(ticker.clone());
                summary.applied += 1;
                metrics::inc_control_request("applied");
                if previous != ticker {
                    info!(peer = %peer, from = %previous, to = %ticker, "ticker selected");
                }
            }
            Ok(Err(reason)) => {
                summary.rejected += 1;
                metrics::inc_control_request("rejected");
                warn!(peer = %peer, reason = %reason, "ignoring invalid ticker request");
            }
            Err(ControlError::LineTooLong { max }) => {
                summary.rejected += 1;
                metrics::inc_control_request("rejected");
                warn!(peer = %peer, max, "request line too long, closing connection");
                break;
            }
            Err(e) => {
                debug!(peer = %peer, error = %e, "control connection error");
                break;
            }
        }
    }

    summary
}
