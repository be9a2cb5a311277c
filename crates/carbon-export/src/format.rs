//! Graphite plaintext protocol serialization.
//!
//! Renders one metric snapshot into lines of the form
//! `<prefix>.<name>.<field><tags> <value> <timestamp>`, one per field.
//! Tags follow Graphite's `name;k=v;k2=v2` convention and are appended
//! verbatim after the field name.

use std::fmt::Display;

use carbon_core::{
    ConfigResult, ExportConfig, HistogramSnapshot, MeterSnapshot, MetricSnapshot, TimerSnapshot,
};
use tracing::warn;

/// Per-cycle inputs to the serializer.
///
/// Only built from an [`ExportConfig`] that passes validation, so the flush
/// interval and duration unit are never zero and percentiles lie in [0, 1].
#[derive(Debug, Clone)]
pub struct FormatContext<'a> {
    prefix: &'a str,
    timestamp: u64,
    flush_seconds: f64,
    unit_nanos: i64,
    percentiles: &'a [f64],
}

impl<'a> FormatContext<'a> {
    pub fn new(config: &'a ExportConfig, timestamp: u64) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            prefix: &config.prefix,
            timestamp,
            flush_seconds: config.flush_seconds(),
            unit_nanos: config.duration_unit_nanos(),
            percentiles: &config.percentiles,
        })
    }

    /// Unix seconds stamped on every line of the cycle.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// Split a raw metric name into its path and its tag suffix.
///
/// Only the first `;` separates the two; the returned suffix keeps the
/// leading `;`. Names without tags yield an empty suffix.
pub fn split_name_and_tags(raw: &str) -> (&str, &str) {
    match raw.find(';') {
        Some(idx) => raw.split_at(idx),
        None => (raw, ""),
    }
}

/// Field key for a percentile fraction: `p * 100` in its shortest decimal
/// form with the first `.` dropped (0.5 → "50", 0.999 → "999").
pub fn percentile_key(p: f64) -> String {
    format!("{}", p * 100.0).replacen('.', "", 1)
}

/// Render one metric into wire lines (without trailing newlines).
///
/// Unsupported kinds are logged and produce no lines.
pub fn format_metric(
    ctx: &FormatContext<'_>,
    raw_name: &str,
    snapshot: &MetricSnapshot,
) -> Vec<String> {
    let (name, tags) = split_name_and_tags(raw_name);
    let mut out = LineWriter {
        ctx,
        name,
        tags,
        lines: Vec::new(),
    };

    match snapshot {
        MetricSnapshot::Counter(count) => {
            out.push("count", count);
            out.push("count_ps", fixed2(*count as f64 / ctx.flush_seconds));
        }
        MetricSnapshot::Gauge(value) => out.push("value", value),
        MetricSnapshot::GaugeF64(value) => out.push("value", value),
        MetricSnapshot::Histogram(h) => write_histogram(&mut out, h),
        MetricSnapshot::Meter(m) => write_meter(&mut out, m),
        MetricSnapshot::Timer(t) => write_timer(&mut out, t),
        MetricSnapshot::Unsupported { .. } => {
            warn!(
                metric = %raw_name,
                kind = snapshot.kind(),
                "unable to record metric of unsupported kind"
            );
        }
    }

    out.lines
}

struct LineWriter<'c, 'a> {
    ctx: &'c FormatContext<'a>,
    name: &'c str,
    tags: &'c str,
    lines: Vec<String>,
}

impl LineWriter<'_, '_> {
    fn push(&mut self, field: &str, value: impl Display) {
        self.lines.push(format!(
            "{}.{}.{}{} {} {}",
            self.ctx.prefix, self.name, field, self.tags, value, self.ctx.timestamp
        ));
    }

    fn push_percentiles(&mut self, h: &HistogramSnapshot, scale: f64) {
        let ctx = self.ctx;
        for (&p, value) in ctx.percentiles.iter().zip(h.percentiles(ctx.percentiles)) {
            let field = format!("{}-percentile", percentile_key(p));
            self.push(&field, fixed2(value / scale));
        }
    }
}

fn write_histogram(out: &mut LineWriter<'_, '_>, h: &HistogramSnapshot) {
    out.push("count", h.count());
    out.push("min", h.min());
    out.push("max", h.max());
    out.push("mean", fixed2(h.mean()));
    out.push("std-dev", fixed2(h.std_dev()));
    out.push_percentiles(h, 1.0);
}

fn write_meter(out: &mut LineWriter<'_, '_>, m: &MeterSnapshot) {
    out.push("count", m.count);
    out.push("one-minute", fixed2(m.rate1));
    out.push("five-minute", fixed2(m.rate5));
    out.push("fifteen-minute", fixed2(m.rate15));
    out.push("mean", fixed2(m.rate_mean));
}

fn write_timer(out: &mut LineWriter<'_, '_>, t: &TimerSnapshot) {
    let unit = out.ctx.unit_nanos;
    let unit_f = unit as f64;
    let h = &t.durations;

    out.push("count", t.count());
    out.push("count_ps", fixed2(t.count() as f64 / out.ctx.flush_seconds));
    out.push("min", h.min() / unit);
    out.push("max", h.max() / unit);
    out.push("mean", fixed2(h.mean() / unit_f));
    out.push("std-dev", fixed2(h.std_dev() / unit_f));
    out.push_percentiles(h, unit_f);
    out.push("one-minute", fixed2(t.rate.rate1));
    out.push("five-minute", fixed2(t.rate.rate5));
    out.push("fifteen-minute", fixed2(t.rate.rate15));
    out.push("mean-rate", fixed2(t.rate.rate_mean));
}

fn fixed2(v: f64) -> String {
    format!("{v:.2}")
}
