//! carbond — the carbon exporter daemon.
//!
//! Loads a `carbon.toml`, registers the daemon's own process metrics and
//! pushes them to Graphite, either once or on the configured interval.
//!
//! # Usage
//!
//! ```text
//! carbond --config /etc/carbon.toml
//! carbond --config /etc/carbon.toml --once --json
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use carbon_core::CarbonConfig;
use carbon_export::{Exporter, Gauge, GaugeF64, Registry};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "carbond", about = "Push process metrics to a Graphite carbon server", version)]
struct Cli {
    /// Path to carbon.toml.
    #[arg(short, long, default_value = "carbon.toml")]
    config: PathBuf,

    /// Flush once and exit; exits non-zero if the server is unreachable.
    #[arg(long)]
    once: bool,

    /// With --once, print the flush report as JSON.
    #[arg(long, requires = "once")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("info,carbond=debug,carbon_export=debug")
                }),
        )
        .init();

    let cli = Cli::parse();

    let file = CarbonConfig::from_file(&cli.config)?;
    let config = file.export_config()?;
    info!(path = ?cli.config, address = %config.address, "config loaded");

    let registry = Arc::new(Registry::new());
    let uptime = Arc::new(GaugeF64::new());
    let started_at = Arc::new(Gauge::new());
    started_at.update(epoch_secs());
    registry.register("carbond.uptime_seconds", uptime.clone())?;
    registry.register("carbond.started_at", started_at)?;

    let started = Instant::now();
    let exporter = Exporter::new(config, registry)?;

    if cli.once {
        uptime.update(started.elapsed().as_secs_f64());
        let report = exporter.once().await?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            info!(metrics = report.metrics, lines = report.lines, "flushed once");
        }
        return Ok(());
    }

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut uptime_shutdown = shutdown_rx.clone();

    // Uptime refresh loop.
    let uptime_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = ticker.tick() => uptime.update(started.elapsed().as_secs_f64()),
                _ = uptime_shutdown.changed() => break,
            }
        }
    });

    // Flush loop.
    let exporter_handle = tokio::spawn(async move {
        exporter.run(shutdown_rx).await;
    });

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!(error = %e, "failed to listen for ctrl-c, shutting down"),
    }
    let _ = shutdown_tx.send(true);

    let _ = uptime_handle.await;
    let _ = exporter_handle.await;

    info!("carbond stopped");
    Ok(())
}

fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
