//! Process-wide counters for fleet activity.
//!
//! Increment at the call site; [`Metrics::flush`] logs a snapshot as one
//! `info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    tasks_created: AtomicU64,
    tasks_executed: AtomicU64,
    tasks_failed: AtomicU64,
    benchmarks_run: AtomicU64,
    tests_executed: AtomicU64,
    degradations_flagged: AtomicU64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub tasks_created: u64,
    pub tasks_executed: u64,
    pub tasks_failed: u64,
    pub benchmarks_run: u64,
    pub tests_executed: u64,
    pub degradations_flagged: u64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            tasks_created: AtomicU64::new(0),
            tasks_executed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            benchmarks_run: AtomicU64::new(0),
            tests_executed: AtomicU64::new(0),
            degradations_flagged: AtomicU64::new(0),
        }
    }

    pub fn inc_tasks_created(&self) {
        self.tasks_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts every execute call that reached a terminal state.
    pub fn inc_tasks_executed(&self) {
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tasks_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_benchmarks_run(&self) {
        self.benchmarks_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_tests_executed(&self, n: u64) {
        self.tests_executed.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "tests_executed", n, "counter incremented");
    }

    pub fn inc_degradations(&self) {
        self.degradations_flagged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_created: self.tasks_created.load(Ordering::Relaxed),
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            benchmarks_run: self.benchmarks_run.load(Ordering::Relaxed),
            tests_executed: self.tests_executed.load(Ordering::Relaxed),
            degradations_flagged: self.degradations_flagged.load(Ordering::Relaxed),
        }
    }

    /// Log all counters as a single event.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            tasks_created = s.tasks_created,
            tasks_executed = s.tasks_executed,
            tasks_failed = s.tasks_failed,
            benchmarks_run = s.benchmarks_run,
            tests_executed = s.tests_executed,
            degradations_flagged = s.degradations_flagged,
        );
    }

    pub fn reset(&self) {
        for counter in [
            &self.tasks_created,
            &self.tasks_executed,
            &self.tasks_failed,
            &self.benchmarks_run,
            &self.tests_executed,
            &self.degradations_flagged,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
