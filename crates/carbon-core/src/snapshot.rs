//! Point-in-time metric snapshots, one variant per exportable kind.

/// An immutable view of one metric at enumeration time.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricSnapshot {
    /// Monotonic event count.
    Counter(i64),
    /// Instantaneous integer value.
    Gauge(i64),
    /// Instantaneous floating-point value.
    GaugeF64(f64),
    Histogram(HistogramSnapshot),
    Meter(MeterSnapshot),
    /// Duration histogram fused with an event-rate meter.
    Timer(TimerSnapshot),
    /// A metric kind this exporter has no line format for.
    ///
    /// Sources use this to surface metrics they cannot translate; the
    /// serializer reports it and emits nothing.
    Unsupported { kind: String },
}

impl MetricSnapshot {
    /// Short name of the metric kind, for diagnostics.
    pub fn kind(&self) -> &str {
        match self {
            MetricSnapshot::Counter(_) => "counter",
            MetricSnapshot::Gauge(_) => "gauge",
            MetricSnapshot::GaugeF64(_) => "gauge_f64",
            MetricSnapshot::Histogram(_) => "histogram",
            MetricSnapshot::Meter(_) => "meter",
            MetricSnapshot::Timer(_) => "timer",
            MetricSnapshot::Unsupported { kind } => kind.as_str(),
        }
    }
}

/// Distribution summary over a sample of integer values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistogramSnapshot {
    count: i64,
    min: i64,
    max: i64,
    mean: f64,
    std_dev: f64,
    /// Sorted ascending.
    sample: Vec<i64>,
}

impl HistogramSnapshot {
    /// Summarize `sample`. `count` is the total number of recorded values,
    /// which may exceed the sample size when the source uses a reservoir.
    pub fn from_samples(count: i64, mut sample: Vec<i64>) -> Self {
        sample.sort_unstable();

        let (min, max) = match (sample.first(), sample.last()) {
            (Some(&min), Some(&max)) => (min, max),
            _ => (0, 0),
        };

        let (mean, std_dev) = if sample.is_empty() {
            (0.0, 0.0)
        } else {
            let n = sample.len() as f64;
            let mean = sample.iter().map(|&v| v as f64).sum::<f64>() / n;
            let variance = sample
                .iter()
                .map(|&v| {
                    let d = v as f64 - mean;
                    d * d
                })
                .sum::<f64>()
                / n;
            (mean, variance.sqrt())
        };

        Self {
            count,
            min,
            max,
            mean,
            std_dev,
            sample,
        }
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation of the sample.
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Value at fraction `p` of the sample, linearly interpolated.
    ///
    /// Uses the `p * (n + 1)` rank: ranks below 1 (or NaN) clamp to the
    /// minimum and ranks at or past `n` clamp to the maximum. An empty
    /// sample yields 0.
    pub fn percentile(&self, p: f64) -> f64 {
        let n = self.sample.len();
        if n == 0 {
            return 0.0;
        }

        let pos = p * (n as f64 + 1.0);
        if !(pos >= 1.0) {
            self.sample[0] as f64
        } else if pos >= n as f64 {
            self.sample[n - 1] as f64
        } else {
            let lower = self.sample[pos as usize - 1] as f64;
            let upper = self.sample[pos as usize] as f64;
            lower + (pos - pos.floor()) * (upper - lower)
        }
    }

    /// [`percentile`](Self::percentile) for each fraction, in input order.
    pub fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        ps.iter().map(|&p| self.percentile(p)).collect()
    }
}

/// Event count and exponentially-weighted rates, in events per second.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeterSnapshot {
    pub count: i64,
    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,
}

/// Durations (nanoseconds) plus the rate at which they were recorded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimerSnapshot {
    pub durations: HistogramSnapshot,
    pub rate: MeterSnapshot,
}

impl TimerSnapshot {
    /// Number of recorded durations.
    pub fn count(&self) -> i64 {
        self.durations.count()
    }
}
