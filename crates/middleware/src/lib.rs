//! tickercast-middleware: Pluggable data-plane transport
//!
//! Provides the [`Transport`] abstraction used by the broadcaster and the
//! subscriber, a UDP multicast implementation, and an in-memory
//! implementation for testing.

pub mod error;
pub mod memory;
pub mod transport;
pub mod udp;

pub use error::TransportError;
pub use memory::InMemoryTransport;
pub use transport::{Subscription, Transport, TransportMessage};
pub use udp::{UdpConfig, UdpTransport};
