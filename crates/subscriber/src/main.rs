//! tickercast-subscriber binary entry point
//!
//! Prints every snapshot received from the group and sends each line typed
//! on stdin as a ticker-change request.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tickercast_middleware::{UdpConfig, UdpTransport};
use tickercast_subscriber::{SnapshotView, SubscriberClient};

#[derive(Parser, Debug)]
#[command(name = "tickercast-subscriber")]
#[command(about = "Receives tickercast snapshots and requests ticker changes")]
struct Args {
    /// Data-plane group address and port
    #[arg(long, env = "TICKERCAST_GROUP_ADDR", default_value = "224.1.1.1:5001")]
    group_addr: SocketAddr,

    /// Interface used to join the group
    #[arg(long, env = "TICKERCAST_INTERFACE", default_value = "0.0.0.0")]
    interface: Ipv4Addr,

    /// Broadcaster control-plane address
    #[arg(long, env = "TICKERCAST_CONTROL_ADDR", default_value = "127.0.0.1:5000")]
    control_addr: SocketAddr,

    /// Control-plane connect timeout in seconds
    #[arg(long, env = "TICKERCAST_CONNECT_TIMEOUT_SECS", default_value = "5")]
    connect_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let group = match args.group_addr {
        SocketAddr::V4(addr) => addr,
        SocketAddr::V6(addr) => bail!("{} is IPv6; only IPv4 groups are supported", addr),
    };

    let transport = UdpTransport::new(UdpConfig {
        group,
        interface: args.interface,
        ..UdpConfig::default()
    })
    .context("failed to create data-plane socket")?;

    let mut client = SubscriberClient::start(
        &transport,
        args.control_addr,
        Duration::from_secs(args.connect_timeout_secs),
    )
    .await
    .context("failed to join data plane")?;

    info!(group = %group, control_addr = %args.control_addr, "type a ticker and press enter to switch");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                break;
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match client.request_ticker(&line).await {
                        Ok(ticker) => info!(ticker = %ticker, "requested"),
                        Err(e) => warn!(error = %e, "request not sent"),
                    },
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        error!(error = %e, "stdin read failed");
                        stdin_open = false;
                    }
                }
            }
            snapshot = client.next_snapshot() => {
                match snapshot {
                    Some(snapshot) => println!("{}", SnapshotView::new(snapshot)),
                    None => {
                        warn!("data plane closed");
                        break;
                    }
                }
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
