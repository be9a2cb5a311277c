//! Flush loop — pushes every metric of a source to carbon on an interval.
//!
//! Each flush cycle opens its own TCP connection, writes one metric at a
//! time (flushing the buffer after each), and closes the connection at
//! the end whatever happened in between.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use carbon_core::{ExportConfig, MetricSnapshot};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::{ExportError, ExportResult};
use crate::format::{FormatContext, format_metric};
use crate::registry::MetricSource;

/// Outcome of one flush cycle that reached the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Unix seconds stamped on every line of the cycle.
    pub timestamp: u64,
    /// Metrics enumerated from the source.
    pub metrics: usize,
    /// Lines successfully handed to the connection.
    pub lines: usize,
    /// Metrics whose write or flush failed.
    pub failed: usize,
}

/// Exports a metric source to a carbon server.
pub struct Exporter {
    config: ExportConfig,
    source: Arc<dyn MetricSource>,
}

impl Exporter {
    /// Create an exporter. The config is validated here so flush cycles
    /// never see a zero interval or duration unit.
    pub fn new(config: ExportConfig, source: Arc<dyn MetricSource>) -> ExportResult<Self> {
        config.validate()?;
        Ok(Self { config, source })
    }

    /// Perform a single flush cycle.
    ///
    /// Returns [`ExportError::Connect`] if the server is unreachable, in
    /// which case the source is not enumerated. Write failures on
    /// individual metrics are counted in the report, not returned.
    pub async fn once(&self) -> ExportResult<FlushReport> {
        flush(&self.config, self.source.as_ref()).await
    }

    /// Run flush cycles until `shutdown` fires or its sender is dropped.
    ///
    /// The first cycle runs one full interval after the call, not
    /// immediately. Failed cycles are logged and the loop carries on.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.flush_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            address = %self.config.address,
            interval_ms = period.as_millis() as u64,
            prefix = %self.config.prefix,
            "carbon exporter started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.once().await {
                        Ok(report) => debug!(
                            metrics = report.metrics,
                            lines = report.lines,
                            failed = report.failed,
                            "flush cycle complete"
                        ),
                        Err(e) => error!(error = %e, "flush cycle failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("carbon exporter shutting down");
                    break;
                }
            }
        }
    }
}

async fn flush(config: &ExportConfig, source: &dyn MetricSource) -> ExportResult<FlushReport> {
    let timestamp = epoch_secs();

    let stream = TcpStream::connect(config.address.as_str())
        .await
        .map_err(|e| ExportError::Connect {
            address: config.address.clone(),
            source: e,
        })?;
    let mut writer = BufWriter::new(stream);

    // Take every snapshot up front so no source lock is held across awaits.
    let mut snapshots: Vec<(String, MetricSnapshot)> = Vec::new();
    source.each(&mut |name, snapshot| snapshots.push((name.to_string(), snapshot)));

    let ctx = FormatContext::new(config, timestamp)?;
    let report = write_cycle(&mut writer, &ctx, &snapshots).await;

    if let Err(e) = writer.shutdown().await {
        debug!(error = %e, "error closing carbon connection");
    }

    debug!(
        address = %config.address,
        metrics = report.metrics,
        lines = report.lines,
        timestamp,
        "metrics flushed to carbon"
    );
    Ok(report)
}

/// Serialize and write every snapshot, flushing after each metric.
///
/// A failed metric is logged and counted; later metrics are still written.
async fn write_cycle<W>(
    writer: &mut W,
    ctx: &FormatContext<'_>,
    snapshots: &[(String, MetricSnapshot)],
) -> FlushReport
where
    W: AsyncWrite + Unpin,
{
    let mut report = FlushReport {
        timestamp: ctx.timestamp(),
        metrics: snapshots.len(),
        ..FlushReport::default()
    };

    for (name, snapshot) in snapshots {
        let lines = format_metric(ctx, name, snapshot);
        match write_lines(writer, &lines).await {
            Ok(()) => report.lines += lines.len(),
            Err(e) => {
                report.failed += 1;
                warn!(metric = %name, error = %e, "failed to write metric");
            }
        }
    }

    report
}

/// Write one metric's lines and flush them to the socket.
async fn write_lines<W>(writer: &mut W, lines: &[String]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    for line in lines {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    writer.flush().await
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
