//! Render counters and timings.
//!
//! Everything is reported through the `metrics` facade; a local copy of the
//! counters backs [`OverlayMetrics::snapshot`] for callers without an exporter.

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Which render path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderKind {
    Binary,
    Flat,
    Composite,
}

impl RenderKind {
    pub fn label(&self) -> &'static str {
        match self {
            RenderKind::Binary => "binary",
            RenderKind::Flat => "flat",
            RenderKind::Composite => "composite",
        }
    }
}

/// Per-engine counters.
#[derive(Debug, Default)]
pub struct OverlayMetrics {
    renders: AtomicU64,
    no_data: AtomicU64,
    failures: AtomicU64,
    layers_skipped: AtomicU64,
    projection_builds: AtomicU64,
    cache_loads: AtomicU64,
}

impl OverlayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished render.
    pub fn record_render(&self, kind: RenderKind, elapsed: Duration) {
        self.renders.fetch_add(1, Ordering::Relaxed);
        counter!("overlay_renders_total", "kind" => kind.label()).increment(1);
        histogram!("overlay_render_duration_ms", "kind" => kind.label()).record(elapsed.as_secs_f64() * 1000.0);
    }

    /// Record a request that resolved to "nothing to draw".
    pub fn record_no_data(&self, kind: RenderKind) {
        self.no_data.fetch_add(1, Ordering::Relaxed);
        counter!("overlay_no_data_total", "kind" => kind.label()).increment(1);
    }

    pub fn record_failure(&self, kind: RenderKind) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        counter!("overlay_render_errors_total", "kind" => kind.label()).increment(1);
    }

    /// Record a composite layer dropped without aborting the render.
    pub fn record_layer_skipped(&self, layer: &'static str) {
        self.layers_skipped.fetch_add(1, Ordering::Relaxed);
        counter!("overlay_layer_skipped_total", "layer" => layer).increment(1);
    }

    pub fn record_projection_build(&self, elapsed: Duration, from_cache: bool) {
        if from_cache {
            self.cache_loads.fetch_add(1, Ordering::Relaxed);
        } else {
            self.projection_builds.fetch_add(1, Ordering::Relaxed);
        }
        let source = if from_cache { "cache" } else { "built" };
        histogram!("overlay_projection_build_seconds", "source" => source).record(elapsed.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            renders: self.renders.load(Ordering::Relaxed),
            no_data: self.no_data.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            layers_skipped: self.layers_skipped.load(Ordering::Relaxed),
            projection_builds: self.projection_builds.load(Ordering::Relaxed),
            cache_loads: self.cache_loads.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub renders: u64,
    pub no_data: u64,
    pub failures: u64,
    pub layers_skipped: u64,
    /// Index maps built from coordinates.
    pub projection_builds: u64,
    /// Index maps read back from the on-disk cache.
    pub cache_loads: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let m = OverlayMetrics::new();
        m.record_render(RenderKind::Flat, Duration::from_millis(3));
        m.record_no_data(RenderKind::Binary);
        m.record_layer_skipped("contour");
        m.record_layer_skipped("barbs");
        let s = m.snapshot();
        assert_eq!((s.renders, s.no_data, s.layers_skipped, s.failures), (1, 1, 2, 0));
    }
}
