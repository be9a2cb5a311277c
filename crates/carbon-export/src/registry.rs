//! Metric sources: the enumeration seam the exporter reads from, and a
//! small name-keyed registry implementing it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use carbon_core::MetricSnapshot;
use tracing::debug;

use crate::error::{ExportError, ExportResult};

/// Anything that can produce a point-in-time snapshot of itself.
pub trait Metric: Send + Sync {
    fn snapshot(&self) -> MetricSnapshot;
}

/// A set of named metrics the exporter enumerates once per flush cycle.
///
/// Implementations call `visit` once per registered metric. The exporter
/// never mutates the source and adds no locking of its own.
pub trait MetricSource: Send + Sync {
    fn each(&self, visit: &mut dyn FnMut(&str, MetricSnapshot));
}

/// A fixed snapshot is a metric whose value never changes.
impl Metric for MetricSnapshot {
    fn snapshot(&self) -> MetricSnapshot {
        self.clone()
    }
}

/// Thread-safe registry of named metrics, enumerated in name order.
#[derive(Default)]
pub struct Registry {
    metrics: RwLock<BTreeMap<String, Arc<dyn Metric>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric under `name`. Fails if the name is taken.
    pub fn register(&self, name: &str, metric: Arc<dyn Metric>) -> ExportResult<()> {
        let mut metrics = self.metrics.write().expect("registry lock");
        if metrics.contains_key(name) {
            return Err(ExportError::DuplicateMetric(name.to_string()));
        }
        metrics.insert(name.to_string(), metric);
        debug!(metric = %name, "registered metric");
        Ok(())
    }

    /// Return the metric registered under `name`, registering `make()` first
    /// if there is none.
    pub fn get_or_register<F>(&self, name: &str, make: F) -> Arc<dyn Metric>
    where
        F: FnOnce() -> Arc<dyn Metric>,
    {
        let mut metrics = self.metrics.write().expect("registry lock");
        metrics.entry(name.to_string()).or_insert_with(make).clone()
    }

    /// Remove a metric. Unknown names are ignored.
    pub fn unregister(&self, name: &str) {
        let mut metrics = self.metrics.write().expect("registry lock");
        if metrics.remove(name).is_some() {
            debug!(metric = %name, "unregistered metric");
        }
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let metrics = self.metrics.read().expect("registry lock");
        metrics.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.metrics.read().expect("registry lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetricSource for Registry {
    fn each(&self, visit: &mut dyn FnMut(&str, MetricSnapshot)) {
        // Clone the handles so snapshots are taken without holding the lock.
        let metrics: Vec<(String, Arc<dyn Metric>)> = {
            let metrics = self.metrics.read().expect("registry lock");
            metrics
                .iter()
                .map(|(name, metric)| (name.clone(), metric.clone()))
                .collect()
        };
        for (name, metric) in metrics {
            visit(&name, metric.snapshot());
        }
    }
}

/// Monotonic event counter.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self, n: i64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

impl Metric for Counter {
    fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot::Counter(self.count())
    }
}

/// Last-written integer value.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Metric for Gauge {
    fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot::Gauge(self.value())
    }
}

/// Last-written floating-point value, stored as raw bits.
#[derive(Debug, Default)]
pub struct GaugeF64 {
    bits: AtomicU64,
}

impl GaugeF64 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl Metric for GaugeF64 {
    fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot::GaugeF64(self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: &dyn MetricSource) -> Vec<(String, MetricSnapshot)> {
        let mut out = Vec::new();
        source.each(&mut |name, snapshot| out.push((name.to_string(), snapshot)));
        out
    }

    #[test]
    fn register_and_unregister() {
        let registry = Registry::new();
        registry.register("hits", Arc::new(Counter::new())).unwrap();
        assert_eq!(registry.len(), 1);

        registry.unregister("hits");
        assert!(registry.is_empty());

        // Unknown names are a no-op.
        registry.unregister("hits");
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = Registry::new();
        registry.register("hits", Arc::new(Counter::new())).unwrap();
        let err = registry.register("hits", Arc::new(Gauge::new())).unwrap_err();
        assert!(matches!(err, ExportError::DuplicateMetric(ref n) if n == "hits"));
    }

    #[test]
    fn get_or_register_reuses_existing() {
        let registry = Registry::new();
        let counter = Arc::new(Counter::new());
        counter.inc(3);
        registry.register("hits", counter.clone()).unwrap();

        let found = registry.get_or_register("hits", || Arc::new(Counter::new()));
        assert_eq!(found.snapshot(), MetricSnapshot::Counter(3));

        let fresh = registry.get_or_register("misses", || Arc::new(Gauge::new()));
        assert_eq!(fresh.snapshot(), MetricSnapshot::Gauge(0));
        assert_eq!(registry.names(), vec!["hits", "misses"]);
    }

    #[test]
    fn enumeration_is_name_ordered_and_live() {
        let registry = Registry::new();
        let counter = Arc::new(Counter::new());
        registry.register("b.counter", counter.clone()).unwrap();
        registry
            .register("a.fixed", Arc::new(MetricSnapshot::GaugeF64(1.5)))
            .unwrap();

        counter.inc(2);
        let first = collect(&registry);
        assert_eq!(
            first,
            vec![
                ("a.fixed".to_string(), MetricSnapshot::GaugeF64(1.5)),
                ("b.counter".to_string(), MetricSnapshot::Counter(2)),
            ]
        );

        counter.inc(5);
        let second = collect(&registry);
        assert_eq!(second[1].1, MetricSnapshot::Counter(7));
    }

    #[test]
    fn counter_and_gauges() {
        let counter = Counter::new();
        counter.inc(10);
        counter.inc(-3);
        assert_eq!(counter.count(), 7);
        counter.clear();
        assert_eq!(counter.count(), 0);

        let gauge = Gauge::new();
        gauge.update(-42);
        assert_eq!(gauge.snapshot(), MetricSnapshot::Gauge(-42));

        let gauge = GaugeF64::new();
        assert_eq!(gauge.value(), 0.0);
        gauge.update(3.25);
        assert_eq!(gauge.snapshot(), MetricSnapshot::GaugeF64(3.25));
    }
}
