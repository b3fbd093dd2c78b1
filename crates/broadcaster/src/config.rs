use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tickercast_middleware::UdpConfig;
use tickercast_protocol::Ticker;
use tracing::info;

use crate::error::ConfigError;

/// Smallest datagram bound that still fits a snapshot header
const MIN_DATAGRAM_BYTES: usize = 512;
/// Largest IPv4 UDP payload
const MAX_DATAGRAM_BYTES: usize = 65_507;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Yahoo Finance chart API
    Yahoo,
    /// Offline random walk
    Synthetic,
}

/// tickercast-broadcaster: selected-ticker snapshot multicaster
#[derive(Parser, Debug, Clone)]
#[command(name = "tickercast-broadcaster")]
#[command(about = "Broadcasts market snapshots for one selected ticker over UDP multicast")]
pub struct Config {
    /// Control-plane listen address (ticker-change requests)
    #[arg(long, env = "TICKERCAST_CONTROL_ADDR", default_value = "0.0.0.0:5000")]
    pub control_addr: SocketAddr,

    /// Data-plane group address and port
    #[arg(long, env = "TICKERCAST_GROUP_ADDR", default_value = "224.1.1.1:5001")]
    pub group_addr: SocketAddr,

    /// Interface used for multicast sends
    #[arg(long, env = "TICKERCAST_INTERFACE", default_value = "0.0.0.0")]
    pub interface: IpAddr,

    /// Ticker broadcast until a subscriber selects another
    #[arg(long, env = "TICKERCAST_DEFAULT_TICKER", default_value = "AAPL")]
    pub default_ticker: String,

    /// Interval between broadcast ticks
    #[arg(long, env = "TICKERCAST_TICK_INTERVAL_MS", default_value = "1000")]
    pub tick_interval_ms: u64,

    /// Multicast time-to-live
    #[arg(long, env = "TICKERCAST_MULTICAST_TTL", default_value = "32")]
    pub multicast_ttl: u32,

    /// Datagram size bound; older price samples are dropped to fit
    #[arg(long, env = "TICKERCAST_MAX_DATAGRAM_BYTES", default_value = "4096")]
    pub max_datagram_bytes: usize,

    /// Snapshot source
    #[arg(long, env = "TICKERCAST_SOURCE", value_enum, default_value = "yahoo")]
    pub source: SourceKind,

    /// Yahoo Finance base URL
    #[arg(
        long,
        env = "TICKERCAST_YAHOO_BASE_URL",
        default_value = "https://query1.finance.yahoo.com"
    )]
    pub yahoo_base_url: String,

    /// Upstream request timeout in seconds
    #[arg(long, env = "TICKERCAST_UPSTREAM_TIMEOUT_SECS", default_value = "10")]
    pub upstream_timeout_secs: u64,

    /// Health/metrics listen address
    #[arg(long, env = "TICKERCAST_HEALTH_ADDR", default_value = "0.0.0.0:9090")]
    pub health_addr: SocketAddr,
}

impl Config {
    /// Check everything that can be checked before binding sockets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.group_v4()?;
        self.interface_v4()?;
        self.default_ticker()?;

        if self.tick_interval_ms == 0 {
            return Err(ConfigError::invalid("tick_interval_ms", "must be positive"));
        }
        if !(MIN_DATAGRAM_BYTES..=MAX_DATAGRAM_BYTES).contains(&self.max_datagram_bytes) {
            return Err(ConfigError::invalid(
                "max_datagram_bytes",
                format!(
                    "{} outside {}..={}",
                    self.max_datagram_bytes, MIN_DATAGRAM_BYTES, MAX_DATAGRAM_BYTES
                ),
            ));
        }
        if self.upstream_timeout_secs == 0 {
            return Err(ConfigError::invalid("upstream_timeout_secs", "must be positive"));
        }
        Ok(())
    }

    pub fn default_ticker(&self) -> Result<Ticker, ConfigError> {
        Ticker::parse(&self.default_ticker).map_err(|e| ConfigError::invalid("default_ticker", e))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn udp_config(&self) -> Result<UdpConfig, ConfigError> {
        Ok(UdpConfig {
            group: self.group_v4()?,
            interface: self.interface_v4()?,
            ttl: self.multicast_ttl,
            loopback: true,
            max_payload: self.max_datagram_bytes,
        })
    }

    fn group_v4(&self) -> Result<SocketAddrV4, ConfigError> {
        match self.group_addr {
            SocketAddr::V4(addr) => Ok(addr),
            SocketAddr::V6(addr) => Err(ConfigError::invalid(
                "group_addr",
                format!("{} is IPv6; only IPv4 groups are supported", addr),
            )),
        }
    }

    fn interface_v4(&self) -> Result<Ipv4Addr, ConfigError> {
        match self.interface {
            IpAddr::V4(ip) => Ok(ip),
            IpAddr::V6(ip) => Err(ConfigError::invalid(
                "interface",
                format!("{} is IPv6; only IPv4 interfaces are supported", ip),
            )),
        }
    }

    pub fn log_config(&self) {
        info!(
            control_addr = %self.control_addr,
            group_addr = %self.group_addr,
            interface = %self.interface,
            default_ticker = %self.default_ticker,
            tick_interval_ms = self.tick_interval_ms,
            max_datagram_bytes = self.max_datagram_bytes,
            source = ?self.source,
            health_addr = %self.health_addr,
            "configuration loaded"
        );
    }
}
