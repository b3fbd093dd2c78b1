use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use async_trait::async_trait;
use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::transport::{Subscription, Transport, TransportMessage};

/// Receive buffer, large enough for any IPv4 UDP payload
const RECV_BUFFER_SIZE: usize = 65_536;

#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Group address and port. A unicast address (e.g. loopback) skips the
    /// multicast join, which is useful on hosts without a multicast route.
    pub group: SocketAddrV4,
    /// Local interface for sending and joining; unspecified lets the OS pick
    pub interface: Ipv4Addr,
    pub ttl: u32,
    /// Deliver our own datagrams to subscribers on this host
    pub loopback: bool,
    pub max_payload: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            group: SocketAddrV4::new(Ipv4Addr::new(224, 1, 1, 1), 5001),
            interface: Ipv4Addr::UNSPECIFIED,
            ttl: 32,
            loopback: true,
            max_payload: 4096,
        }
    }
}

/// UDP multicast transport.
///
/// Publishing uses one socket created up front; every `subscribe` binds a
/// fresh socket to the group port with address/port reuse, so several
/// subscribers can share a host.
pub struct UdpTransport {
    config: UdpConfig,
    sender: UdpSocket,
}

impl UdpTransport {
    pub fn new(config: UdpConfig) -> Result<Self, TransportError> {
        let sender = sender_socket(&config).map_err(|e| TransportError::Bind(e.to_string()))?;
        Ok(Self { config, sender })
    }

    pub fn group(&self) -> SocketAddrV4 {
        self.config.group
    }
}

fn sender_socket(config: &UdpConfig) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_multicast_ttl_v4(config.ttl)?;
    socket.set_multicast_loop_v4(config.loopback)?;
    if !config.interface.is_unspecified() {
        socket.set_multicast_if_v4(&config.interface)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)).into())?;
    UdpSocket::from_std(socket.into())
}

fn receiver_socket(config: &UdpConfig) -> Result<UdpSocket, TransportError> {
    let bind_err = |e: io::Error| TransportError::Bind(e.to_string());

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(bind_err)?;
    socket.set_reuse_address(true).map_err(bind_err)?;
    #[cfg(unix)]
    socket.set_reuse_port(true).map_err(bind_err)?;
    socket.set_nonblocking(true).map_err(bind_err)?;
    socket
        .bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.group.port())).into())
        .map_err(bind_err)?;

    let group = config.group.ip();
    if group.is_multicast() {
        socket
            .join_multicast_v4(group, &config.interface)
            .map_err(|e| TransportError::Join(format!("{}: {}", group, e)))?;
        info!(group = %config.group, interface = %config.interface, "joined multicast group");
    } else {
        info!(addr = %config.group, "listening for unicast datagrams");
    }

    UdpSocket::from_std(socket.into()).map_err(bind_err)
}

struct UdpSubscription {
    socket: UdpSocket,
    buf: Vec<u8>,
}

#[async_trait]
impl Subscription for UdpSubscription {
    async fn next(&mut self) -> Result<TransportMessage, TransportError> {
        let (len, source) = self
            .socket
            .recv_from(&mut self.buf)
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;

        Ok(TransportMessage {
            payload: Bytes::copy_from_slice(&self.buf[..len]),
            source: Some(source),
            sequence: None,
        })
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn publish(&self, payload: Bytes) -> Result<(), TransportError> {
        if payload.len() > self.config.max_payload {
            return Err(TransportError::Oversized {
                size: payload.len(),
                max: self.config.max_payload,
            });
        }
        let sent = self
            .sender
            .send_to(&payload, SocketAddr::V4(self.config.group))
            .await
            .map_err(|e| TransportError::PublishFailed(e.to_string()))?;
        debug!(bytes = sent, group = %self.config.group, "datagram sent");
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn Subscription>, TransportError> {
        let socket = receiver_socket(&self.config)?;
        Ok(Box::new(UdpSubscription {
            socket,
            buf: vec![0u8; RECV_BUFFER_SIZE],
        }))
    }

    fn max_payload(&self) -> usize {
        self.config.max_payload
    }
}
