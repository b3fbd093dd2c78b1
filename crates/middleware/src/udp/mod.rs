mod transport;

pub use transport::{UdpConfig, UdpTransport};
