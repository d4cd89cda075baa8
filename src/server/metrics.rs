//! Prometheus metrics for the provider host.

use prometheus::{IntCounter, IntGauge, Registry, TextEncoder};

use crate::provider::FlushReport;

pub struct Metrics {
    registry: Registry,
    entries: IntGauge,
    render_passes: IntCounter,
    evictions: IntCounter,
    removals: IntCounter,
    mounts: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let entries = IntGauge::new("keep_alive_entries", "Entries currently retained")?;
        let render_passes = IntCounter::new(
            "keep_alive_render_passes_total",
            "Render passes committed to the off-screen surface",
        )?;
        let evictions = IntCounter::new(
            "keep_alive_evictions_total",
            "Entries evicted by the capacity bound",
        )?;
        let removals = IntCounter::new(
            "keep_alive_removals_total",
            "Entries removed by owner key",
        )?;
        let mounts = IntCounter::new(
            "keep_alive_mount_events_total",
            "Mount notifications emitted",
        )?;

        registry.register(Box::new(entries.clone()))?;
        registry.register(Box::new(render_passes.clone()))?;
        registry.register(Box::new(evictions.clone()))?;
        registry.register(Box::new(removals.clone()))?;
        registry.register(Box::new(mounts.clone()))?;

        Ok(Self {
            registry,
            entries,
            render_passes,
            evictions,
            removals,
            mounts,
        })
    }

    /// Fold one flush into the counters.
    pub fn observe(&self, report: &FlushReport, entries: usize) {
        self.entries.set(entries as i64);
        self.render_passes.inc_by(report.render_passes);
        self.evictions.inc_by(report.evicted.len() as u64);
        self.removals.inc_by(report.removed.len() as u64);
        self.mounts.inc_by(report.mounted.len() as u64);
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_and_render() {
        let metrics = Metrics::new().unwrap();
        let report = FlushReport {
            render_passes: 2,
            evicted: vec!["a".into()],
            mounted: vec!["b".into(), "c".into()],
            ..Default::default()
        };
        metrics.observe(&report, 2);

        let text = metrics.render().unwrap();
        assert!(text.contains("keep_alive_entries 2"));
        assert!(text.contains("keep_alive_render_passes_total 2"));
        assert!(text.contains("keep_alive_evictions_total 1"));
        assert!(text.contains("keep_alive_mount_events_total 2"));
    }
}
