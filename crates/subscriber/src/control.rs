use std::io::ErrorKind;
use std::mem::MaybeUninit;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::SinkExt;
use socket2::SockRef;
use tickercast_protocol::{Ticker, TickerCodec};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::FramedWrite;
use tracing::{debug, info, warn};

use crate::error::ClientError;

type Connection = FramedWrite<TcpStream, TickerCodec>;

/// Sends ticker-change requests over one lazily opened, reused connection.
///
/// A connection the broadcaster has closed is replaced before the next
/// request. A failed write drops the connection and the request is retried
/// once on a fresh one.
pub struct ControlClient {
    addr: SocketAddr,
    connect_timeout: Duration,
    conn: Mutex<Option<Connection>>,
}

impl ControlClient {
    pub fn new(addr: SocketAddr, connect_timeout: Duration) -> Self {
        Self {
            addr,
            connect_timeout,
            conn: Mutex::new(None),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    async fn connect(&self) -> Result<Connection, ClientError> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| ClientError::ConnectTimeout {
                addr: self.addr.to_string(),
                timeout_ms: self.connect_timeout.as_millis() as u64,
            })?
            .map_err(|e| ClientError::Connect {
                addr: self.addr.to_string(),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true).ok();
        info!(addr = %self.addr, "control connection opened");
        Ok(FramedWrite::new(stream, TickerCodec::new()))
    }

    /// A closed peer shows up as EOF or a reset on the read side; the
    /// broadcaster never writes, so pending data also counts as alive.
    fn peer_closed(stream: &TcpStream) -> bool {
        let mut buf = [MaybeUninit::<u8>::uninit(); 1];
        match SockRef::from(stream).peek(&mut buf) {
            Ok(0) => true,
            Ok(_) => false,
            Err(e) if e.kind() == ErrorKind::WouldBlock => false,
            Err(_) => true,
        }
    }

    pub async fn request(&self, ticker: &Ticker) -> Result<(), ClientError> {
        let mut conn = self.conn.lock().await;

        let mut last_error = None;
        for attempt in 0..2 {
            if conn
                .as_ref()
                .is_some_and(|framed| Self::peer_closed(framed.get_ref()))
            {
                info!(addr = %self.addr, "control connection closed by peer, reconnecting");
                *conn = None;
            }
            if conn.is_none() {
                *conn = Some(self.connect().await?);
            }
            let Some(framed) = conn.as_mut() else {
                continue;
            };

            match framed.send(ticker).await {
                Ok(()) => {
                    debug!(ticker = %ticker, attempt, "ticker requested");
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, attempt, "control write failed, reconnecting");
                    *conn = None;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.map_or_else(
            || ClientError::Connect {
                addr: self.addr.to_string(),
                reason: "no connection".to_string(),
            },
            ClientError::Request,
        ))
    }
}
