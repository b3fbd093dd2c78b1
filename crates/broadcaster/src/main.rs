//! tickercast-broadcaster binary entry point

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tickercast_broadcaster::{
    run_server, Broadcaster, Config, ControlServer, SelectedTicker, ServerState, SnapshotSource,
    SourceKind, SyntheticSource, YahooChartSource,
};
use tickercast_middleware::UdpTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;
    config.log_config();

    let source: Arc<dyn SnapshotSource> = match config.source {
        SourceKind::Yahoo => Arc::new(
            YahooChartSource::new(&config.yahoo_base_url, config.upstream_timeout())
                .context("failed to create Yahoo source")?,
        ),
        SourceKind::Synthetic => Arc::new(SyntheticSource::new()),
    };

    let transport = UdpTransport::new(config.udp_config()?)
        .context("failed to create data-plane socket")?;

    let selected = SelectedTicker::new(config.default_ticker()?);
    let broadcaster = Arc::new(Broadcaster::new(
        source,
        Arc::new(transport),
        selected.clone(),
        config.tick_interval(),
        config.max_datagram_bytes,
    ));

    let control = ControlServer::bind(config.control_addr, selected.clone()).await?;
    let server_state = ServerState::new(selected, broadcaster.status_handle());

    let shutdown = CancellationToken::new();
    let mut tasks: JoinSet<anyhow::Result<()>> = JoinSet::new();

    {
        let shutdown = shutdown.clone();
        tasks.spawn(async move {
            control.run(shutdown).await;
            Ok(())
        });
    }
    {
        let shutdown = shutdown.clone();
        let addr = config.health_addr;
        tasks.spawn(async move {
            info!(addr = %addr, "health server listening");
            run_server(addr, server_state, shutdown)
                .await
                .with_context(|| format!("health server on {}", addr))
        });
    }
    {
        let shutdown = shutdown.clone();
        let broadcaster = Arc::clone(&broadcaster);
        tasks.spawn(async move {
            broadcaster.run(shutdown).await;
            Ok(())
        });
    }

    let mut sigterm = signal(SignalKind::terminate()).context("failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("failed to create SIGINT handler")?;

    let mut failure = None;
    tokio::select! {
        _ = sigterm.recv() => {
            info!("SIGTERM received, shutting down");
        }
        _ = sigint.recv() => {
            info!("SIGINT received, shutting down");
        }
        result = tasks.join_next() => {
            match result {
                Some(Ok(Ok(()))) => info!("Task exited, shutting down"),
                Some(Ok(Err(e))) => {
                    error!(error = %e, "Task failed, shutting down");
                    failure = Some(e);
                }
                Some(Err(e)) => {
                    error!(error = %e, "Task panicked, shutting down");
                    failure = Some(e.into());
                }
                None => {}
            }
        }
    }
    shutdown.cancel();

    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Task failed during shutdown"),
            Err(e) => error!(error = %e, "Task panicked during shutdown"),
        }
    }

    info!("Broadcaster stopped");
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
