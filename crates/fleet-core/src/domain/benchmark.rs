//! Benchmark run requests, outcomes, comparisons, reports and alerts.

use chrono::{DateTime, Utc};
use fleet_state::{AgentBenchmark, BenchmarkCategory, BenchmarkTest};
use serde::{Deserialize, Serialize};

fn default_max_duration() -> f64 {
    300.0
}

fn default_true() -> bool {
    true
}

/// Request to benchmark one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub agent_id: String,
    #[serde(default)]
    pub agent_version: Option<String>,
    /// Explicit catalog test ids. Unknown ids are dropped; empty means
    /// "select by category".
    #[serde(default)]
    pub test_ids: Vec<String>,
    /// Category filter applied when `test_ids` is empty. Empty means all.
    #[serde(default)]
    pub categories: Vec<BenchmarkCategory>,
    /// Ad-hoc tests run after the catalog tests without being registered.
    #[serde(default)]
    pub custom_tests: Vec<BenchmarkTest>,
    /// Per-test execution budget.
    #[serde(default = "default_max_duration")]
    pub max_duration_seconds: f64,
    #[serde(default = "default_true")]
    pub enable_cost_tracking: bool,
    #[serde(default = "default_true")]
    pub enable_degradation_check: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl BenchmarkConfig {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_version: None,
            test_ids: Vec::new(),
            categories: Vec::new(),
            custom_tests: Vec::new(),
            max_duration_seconds: default_max_duration(),
            enable_cost_tracking: true,
            enable_degradation_check: true,
            notes: None,
            tags: Vec::new(),
        }
    }

    pub fn with_test_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.test_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_categories(mut self, categories: Vec<BenchmarkCategory>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_custom_tests(mut self, tests: Vec<BenchmarkTest>) -> Self {
        self.custom_tests = tests;
        self
    }

    pub fn with_max_duration(mut self, seconds: f64) -> Self {
        self.max_duration_seconds = seconds;
        self
    }
}

/// What an executor reports for one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub passed: bool,
    pub score: f64,
    pub duration_seconds: f64,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl TestOutcome {
    pub fn passed(score: f64, duration_seconds: f64) -> Self {
        Self {
            passed: true,
            score,
            duration_seconds,
            output: None,
            error: None,
        }
    }

    pub fn failed(score: f64, duration_seconds: f64, error: impl Into<String>) -> Self {
        Self {
            passed: false,
            score,
            duration_seconds,
            output: None,
            error: Some(error.into()),
        }
    }
}

/// Head-to-head comparison of two agents' latest runs in one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub agent_1: AgentBenchmark,
    pub agent_2: AgentBenchmark,
    /// `agent_1.average_score - agent_2.average_score`
    pub comparison_score: f64,
    pub winner: Option<String>,
    pub insights: Vec<String>,
}

/// One row of a report's ranking table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRanking {
    /// 1-based position
    pub rank: u32,
    pub agent_id: String,
    pub agent_name: String,
    pub average_score: f64,
    pub average_pass_rate: f64,
    pub benchmark_count: u32,
}

/// Multi-agent report over a set of benchmark runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub id: String,
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub benchmarks: Vec<AgentBenchmark>,
    pub rankings: Vec<AgentRanking>,
    pub summary: String,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Severity tier of a degradation alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Tier for a degradation percentage: `>20` critical, `>10` high,
    /// `>5` medium, else low.
    pub fn from_degradation(percentage: f64) -> Self {
        if percentage > 20.0 {
            Severity::Critical
        } else if percentage > 10.0 {
            Severity::High
        } else if percentage > 5.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Derived alert for a degraded run. Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationAlert {
    pub id: String,
    pub benchmark_id: String,
    pub agent_id: String,
    pub agent_name: String,
    pub category: BenchmarkCategory,
    pub detected_at: DateTime<Utc>,
    pub baseline_pass_rate: f64,
    pub current_pass_rate: f64,
    pub degradation_percentage: f64,
    /// 0.0 when the run carries no p-value
    pub p_value: f64,
    pub severity: Severity,
    pub recommended_actions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_tiers() {
        assert_eq!(Severity::from_degradation(25.0), Severity::Critical);
        assert_eq!(Severity::from_degradation(15.0), Severity::High);
        assert_eq!(Severity::from_degradation(7.0), Severity::Medium);
        assert_eq!(Severity::from_degradation(2.0), Severity::Low);
        // Boundaries are exclusive.
        assert_eq!(Severity::from_degradation(20.0), Severity::High);
        assert_eq!(Severity::from_degradation(5.0), Severity::Low);
    }

    #[test]
    fn config_defaults_from_minimal_json() {
        let config: BenchmarkConfig =
            serde_json::from_value(serde_json::json!({"agent_id": "claude_code"})).unwrap();
        assert_eq!(config, BenchmarkConfig::new("claude_code"));
        assert_eq!(config.max_duration_seconds, 300.0);
        assert!(config.enable_cost_tracking);
        assert!(config.enable_degradation_check);
    }
}
