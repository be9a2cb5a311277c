//! carbon-export — pushes in-process metrics to a Graphite carbon server.
//!
//! Every flush cycle opens a TCP connection, enumerates a [`MetricSource`],
//! renders each metric snapshot as plaintext protocol lines and writes them
//! out, flushing after each metric.
//!
//! # Architecture
//!
//! ```text
//! Exporter
//!   ├── once() → one flush cycle → FlushReport / ExportError
//!   └── run()  → owned interval, one cycle per tick until shutdown
//!
//! Serializer
//!   └── format_metric() → "<prefix>.<name>.<field><tags> <value> <ts>"
//!
//! Registry (MetricSource)
//!   └── each() ← name-sorted enumeration of Arc<dyn Metric>
//! ```

pub mod error;
pub mod exporter;
pub mod format;
pub mod registry;

pub use error::{ExportError, ExportResult};
pub use exporter::{Exporter, FlushReport};
pub use format::{FormatContext, format_metric, percentile_key, split_name_and_tags};
pub use registry::{Counter, Gauge, GaugeF64, Metric, MetricSource, Registry};
