//! Observability surface (§6): counters, gauges, and histograms,
//! exposed via `prometheus`. One registry constructed explicitly and
//! threaded through the scheduler and worker constructors rather than a
//! process-wide static (§9, "Global mutable state").

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};

pub struct Metrics {
    pub registry: Registry,
    pub firings_created: IntCounter,
    pub leases_acquired: IntCounter,
    pub runs_succeeded: IntCounter,
    pub runs_failed: IntCounter,
    pub queue_depth: IntGauge,
    pub scheduler_lag_seconds: IntGauge,
    pub active_leases: IntGauge,
    pub run_duration_seconds: Histogram,
    pub lease_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let firings_created = IntCounter::new("ordinaut_firings_created_total", "Firings inserted into due_work").unwrap();
        let leases_acquired = IntCounter::new("ordinaut_leases_acquired_total", "Leases acquired by workers").unwrap();
        let runs_succeeded = IntCounter::new("ordinaut_runs_succeeded_total", "Runs that completed successfully").unwrap();
        let runs_failed = IntCounter::new("ordinaut_runs_failed_total", "Runs that completed with failure").unwrap();
        let queue_depth = IntGauge::new("ordinaut_queue_depth", "Eligible, unclaimed firings").unwrap();
        let scheduler_lag_seconds =
            IntGauge::new("ordinaut_scheduler_lag_seconds", "Age of the oldest eligible, unclaimed firing").unwrap();
        let active_leases = IntGauge::new("ordinaut_active_leases", "Firings currently leased").unwrap();
        let run_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "ordinaut_run_duration_seconds",
            "Wall-clock duration of pipeline executions",
        ))
        .unwrap();
        let lease_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "ordinaut_lease_duration_seconds",
            "Configured lease durations observed at claim time",
        ))
        .unwrap();

        for collector in [
            Box::new(firings_created.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(leases_acquired.clone()),
            Box::new(runs_succeeded.clone()),
            Box::new(runs_failed.clone()),
            Box::new(queue_depth.clone()),
            Box::new(scheduler_lag_seconds.clone()),
            Box::new(active_leases.clone()),
            Box::new(run_duration_seconds.clone()),
            Box::new(lease_duration_seconds.clone()),
        ] {
            registry.register(collector).expect("metric names are unique and registered once");
        }

        Self {
            registry,
            firings_created,
            leases_acquired,
            runs_succeeded,
            runs_failed,
            queue_depth,
            scheduler_lag_seconds,
            active_leases,
            run_duration_seconds,
            lease_duration_seconds,
        }
    }

    /// Renders the registry in Prometheus text exposition format.
    pub fn render(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).expect("prometheus text encoding cannot fail");
        String::from_utf8(buffer).expect("prometheus text encoding is always valid utf-8")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_registered_metric_names() {
        let metrics = Metrics::new();
        metrics.firings_created.inc();
        let rendered = metrics.render();
        assert!(rendered.contains("ordinaut_firings_created_total"));
    }
}
