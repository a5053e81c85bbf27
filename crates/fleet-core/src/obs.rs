//! Structured lifecycle events.
//!
//! Every event is an `info!` (or `warn!`) with an `event` field naming it,
//! so JSON logs can be filtered on `event`.

use fleet_state::{BenchmarkCategory, TaskStatus};
use tracing::{info, warn, Span};

/// Span tagging everything a benchmark run logs with its id and agent.
///
/// Attach with `tracing::Instrument` so the span follows the future across
/// await points and worker threads.
pub fn benchmark_span(benchmark_id: &str, agent_id: &str) -> Span {
    tracing::info_span!(
        "fleet.benchmark",
        benchmark_id = %benchmark_id,
        agent_id = %agent_id
    )
}

pub fn emit_task_created(task_id: &str, agent_id: Option<&str>) {
    info!(
        event = "task.created",
        task_id = %task_id,
        agent_id = agent_id.unwrap_or("unassigned"),
    );
}

pub fn emit_task_transition(task_id: &str, from: TaskStatus, to: TaskStatus) {
    info!(
        event = "task.transition",
        task_id = %task_id,
        from = from.as_str(),
        to = to.as_str(),
    );
}

pub fn emit_task_executed(task_id: &str, status: TaskStatus, duration_seconds: f64) {
    info!(
        event = "task.executed",
        task_id = %task_id,
        status = status.as_str(),
        duration_seconds,
    );
}

pub fn emit_benchmark_started(benchmark_id: &str, agent_id: &str, test_count: usize) {
    info!(
        event = "benchmark.started",
        benchmark_id = %benchmark_id,
        agent_id = %agent_id,
        test_count,
    );
}

pub fn emit_benchmark_finished(
    benchmark_id: &str,
    category: BenchmarkCategory,
    pass_rate: f64,
    average_score: f64,
    total_duration_seconds: f64,
) {
    info!(
        event = "benchmark.finished",
        benchmark_id = %benchmark_id,
        category = category.as_str(),
        pass_rate,
        average_score,
        total_duration_seconds,
    );
}

pub fn emit_benchmark_degraded(
    benchmark_id: &str,
    agent_id: &str,
    baseline: f64,
    pass_rate: f64,
    p_value: Option<f64>,
) {
    warn!(
        event = "benchmark.degraded",
        benchmark_id = %benchmark_id,
        agent_id = %agent_id,
        baseline,
        pass_rate,
        p_value = p_value.unwrap_or(f64::NAN),
    );
}

pub fn emit_baseline_updated(agent_id: &str, previous: Option<f64>, pass_rate: f64) {
    info!(
        event = "baseline.updated",
        agent_id = %agent_id,
        previous = previous.unwrap_or(0.0),
        pass_rate,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    use tracing::Instrument;

    #[tokio::test]
    async fn benchmark_span_wraps_a_future() {
        async { emit_benchmark_started("bench-1", "claude_code", 6) }
            .instrument(benchmark_span("bench-1", "claude_code"))
            .await;
    }
}
