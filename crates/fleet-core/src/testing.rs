//! Record builders shared by unit tests.

use chrono::{Duration, Utc};
use fleet_state::{AgentBenchmark, BenchmarkCategory, BenchmarkStatus};

/// A completed QA run with the given average score and pass rate.
pub(crate) fn benchmark_with(agent_id: &str, average_score: f64, pass_rate: f64) -> AgentBenchmark {
    AgentBenchmark {
        id: uuid::Uuid::new_v4().to_string(),
        agent_id: agent_id.to_string(),
        agent_name: agent_id.to_string(),
        agent_version: None,
        category: BenchmarkCategory::Qa,
        total_tests: 10,
        passed_tests: (pass_rate * 10.0).round() as u32,
        failed_tests: 10 - (pass_rate * 10.0).round() as u32,
        pass_rate,
        average_score,
        total_duration_seconds: 10.0,
        average_response_time: 1.0,
        min_response_time: 0.5,
        max_response_time: 1.5,
        test_results: Vec::new(),
        is_degraded: false,
        degradation_p_value: None,
        baseline_pass_rate: None,
        estimated_cost_usd: None,
        total_tokens: None,
        suite_digest: "suite".to_string(),
        status: BenchmarkStatus::Completed,
        created_at: Utc::now() - Duration::minutes(5),
        completed_at: Some(Utc::now()),
        notes: None,
        tags: Vec::new(),
    }
}
