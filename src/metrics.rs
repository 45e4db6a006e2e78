//! Resolution metrics.
//!
//! The resolver reports through [`ResolutionMetrics`]. [`FacadeMetrics`]
//! forwards to whatever recorder the host installed for the `metrics` crate;
//! [`InMemoryMetrics`] keeps tallies for tests and the CLI summary.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tracing::warn;

use crate::resolution::ResolveMode;

/// Counter of resolve batches, labelled by `mode`.
pub const RUNS_TOTAL: &str = "entity_resolution_runs_total";
/// Counter of per-entity outcomes, labelled by `status`.
pub const OUTCOMES_TOTAL: &str = "entity_resolution_outcomes_total";
/// Histogram of best scores for resolved and ambiguous entities.
pub const CONFIDENCE: &str = "entity_resolution_confidence";
/// Histogram of batch latency in seconds, labelled by `mode`.
pub const LATENCY_SECONDS: &str = "entity_resolution_latency_seconds";

/// Sink for resolver metrics.
pub trait ResolutionMetrics: Send + Sync {
    /// One batch started.
    fn record_run(&self, mode: ResolveMode);

    /// One entity finished with `status` (`resolved`, `ambiguous`,
    /// `unmatched`, `missing`, `invalid_id` or `error`).
    fn record_outcome(&self, status: &'static str);

    /// Best score of a resolved or ambiguous entity.
    fn observe_confidence(&self, score: f32);

    /// Wall time of a whole batch.
    fn observe_latency(&self, mode: ResolveMode, seconds: f64);
}

/// Emits through the `metrics` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeMetrics;

impl ResolutionMetrics for FacadeMetrics {
    fn record_run(&self, mode: ResolveMode) {
        ::metrics::counter!(RUNS_TOTAL, "mode" => mode.as_str()).increment(1);
    }

    fn record_outcome(&self, status: &'static str) {
        ::metrics::counter!(OUTCOMES_TOTAL, "status" => status).increment(1);
    }

    fn observe_confidence(&self, score: f32) {
        ::metrics::histogram!(CONFIDENCE).record(f64::from(score));
    }

    fn observe_latency(&self, mode: ResolveMode, seconds: f64) {
        ::metrics::histogram!(LATENCY_SECONDS, "mode" => mode.as_str()).record(seconds);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl ResolutionMetrics for NoopMetrics {
    fn record_run(&self, _mode: ResolveMode) {}

    fn record_outcome(&self, _status: &'static str) {}

    fn observe_confidence(&self, _score: f32) {}

    fn observe_latency(&self, _mode: ResolveMode, _seconds: f64) {}
}

/// Point-in-time copy of [`InMemoryMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Batches per mode.
    pub runs: BTreeMap<&'static str, u64>,
    /// Entities per outcome.
    pub outcomes: BTreeMap<&'static str, u64>,
    /// Every confidence observation, in order.
    pub confidences: Vec<f32>,
    /// Every latency observation, in order.
    pub latencies: Vec<(ResolveMode, f64)>,
}

/// Thread-safe in-process tallies.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    state: Mutex<MetricsSnapshot>,
}

fn acquire<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("metrics mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

impl InMemoryMetrics {
    /// Creates empty tallies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches recorded for `mode`.
    #[must_use]
    pub fn runs(&self, mode: ResolveMode) -> u64 {
        acquire(&self.state).runs.get(mode.as_str()).copied().unwrap_or(0)
    }

    /// Entities recorded with `status`.
    #[must_use]
    pub fn outcomes(&self, status: &str) -> u64 {
        acquire(&self.state).outcomes.get(status).copied().unwrap_or(0)
    }

    /// Copies the current tallies.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        acquire(&self.state).clone()
    }
}

impl ResolutionMetrics for InMemoryMetrics {
    fn record_run(&self, mode: ResolveMode) {
        *acquire(&self.state).runs.entry(mode.as_str()).or_insert(0) += 1;
    }

    fn record_outcome(&self, status: &'static str) {
        *acquire(&self.state).outcomes.entry(status).or_insert(0) += 1;
    }

    fn observe_confidence(&self, score: f32) {
        acquire(&self.state).confidences.push(score);
    }

    fn observe_latency(&self, mode: ResolveMode, seconds: f64) {
        acquire(&self.state).latencies.push((mode, seconds));
    }
}
