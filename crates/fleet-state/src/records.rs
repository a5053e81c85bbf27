//! Persisted records shared by every store backend.
//!
//! These are the entities the engines read and write through
//! [`crate::storage_traits`]: tasks, catalog tests, benchmark runs with their
//! per-test results, and per-agent baselines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form JSON object used for task context, task results and test metrics.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Completed, failed and cancelled tasks are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl std::str::FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(format!("unknown task priority: {other}")),
        }
    }
}

/// A unit of requested work and its lifecycle bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier (UUID v4 string).
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Identifier of the assigned agent, if the scheduler found one.
    pub agent_id: Option<String>,
    /// Display name of the assigned agent.
    pub assigned_agent: Option<String>,
    /// Ordered capability tags. The first entry doubles as an agent hint.
    pub skill_requirements: Vec<String>,
    pub context: JsonMap,
    pub result: Option<JsonMap>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// `completed_at - started_at` in seconds; unset when never started.
    pub duration_seconds: Option<f64>,
}

impl Task {
    /// Create a pending, unassigned task with a fresh identifier.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::default(),
            agent_id: None,
            assigned_agent: None,
            skill_requirements: Vec::new(),
            context: JsonMap::new(),
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            duration_seconds: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Benchmark catalog
// ---------------------------------------------------------------------------

/// Category a benchmark test belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkCategory {
    CodeGeneration,
    Qa,
    Reasoning,
    Writing,
    Translation,
    Summarization,
    General,
}

impl BenchmarkCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CodeGeneration => "code_generation",
            Self::Qa => "qa",
            Self::Reasoning => "reasoning",
            Self::Writing => "writing",
            Self::Translation => "translation",
            Self::Summarization => "summarization",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for BenchmarkCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BenchmarkCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code_generation" => Ok(Self::CodeGeneration),
            "qa" => Ok(Self::Qa),
            "reasoning" => Ok(Self::Reasoning),
            "writing" => Ok(Self::Writing),
            "translation" => Ok(Self::Translation),
            "summarization" => Ok(Self::Summarization),
            "general" => Ok(Self::General),
            other => Err(format!("unknown benchmark category: {other}")),
        }
    }
}

/// Difficulty label of a catalog test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

fn default_max_score() -> f64 {
    1.0
}

/// A catalog test definition. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkTest {
    pub id: String,
    pub name: String,
    pub category: BenchmarkCategory,
    pub description: String,
    #[serde(default)]
    pub input_data: JsonMap,
    #[serde(default)]
    pub expected_output: Option<String>,
    #[serde(default)]
    pub evaluation_criteria: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
}

// ---------------------------------------------------------------------------
// Benchmark runs
// ---------------------------------------------------------------------------

/// Outcome of executing one catalog test against an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_id: String,
    pub test_name: String,
    pub passed: bool,
    /// Score in 0.0–1.0.
    pub score: f64,
    pub duration_seconds: f64,
    pub output: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub metrics: JsonMap,
}

/// Status of a benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Aggregate record of one benchmark run against one agent.
///
/// # Invariants
///
/// `passed_tests + failed_tests == total_tests`. `pass_rate`, `average_score`
/// and the response-time statistics are derived from `test_results` by the
/// runner and are never set independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentBenchmark {
    pub id: String,
    pub agent_id: String,
    pub agent_name: String,
    pub agent_version: Option<String>,
    pub category: BenchmarkCategory,

    pub total_tests: u32,
    pub passed_tests: u32,
    pub failed_tests: u32,
    pub pass_rate: f64,
    pub average_score: f64,

    pub total_duration_seconds: f64,
    pub average_response_time: f64,
    pub min_response_time: f64,
    pub max_response_time: f64,

    pub test_results: Vec<TestResult>,

    pub is_degraded: bool,
    pub degradation_p_value: Option<f64>,
    pub baseline_pass_rate: Option<f64>,

    pub estimated_cost_usd: Option<f64>,
    pub total_tokens: Option<u64>,

    /// SHA-256 over the canonical JSON of the test definitions that ran.
    pub suite_digest: String,

    pub status: BenchmarkStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// Baselines
// ---------------------------------------------------------------------------

/// Best pass rate observed for an agent, with the run that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineRecord {
    pub agent_id: String,
    pub pass_rate: f64,
    /// `total_tests` of the run that set this baseline.
    pub sample_size: u32,
    pub benchmark_id: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }

    #[test]
    fn new_task_is_pending_and_unassigned() {
        let task = Task::new("write docs");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert!(task.agent_id.is_none());
        assert!(task.started_at.is_none());
        assert!(uuid::Uuid::parse_str(&task.id).is_ok());
    }

    #[test]
    fn category_wire_names_match_display() {
        let json = serde_json::to_string(&BenchmarkCategory::CodeGeneration).expect("serialize");
        assert_eq!(json, "\"code_generation\"");
        assert_eq!(
            "code_generation".parse::<BenchmarkCategory>(),
            Ok(BenchmarkCategory::CodeGeneration)
        );
        assert!("poetry".parse::<BenchmarkCategory>().is_err());
    }

    #[test]
    fn benchmark_test_defaults_apply_on_deserialize() {
        let test: BenchmarkTest = serde_json::from_value(serde_json::json!({
            "id": "qa_900",
            "name": "Capital cities",
            "category": "qa",
            "description": "Name the capital"
        }))
        .expect("deserialize");

        assert_eq!(test.difficulty, Difficulty::Medium);
        assert_eq!(test.max_score, 1.0);
        assert!(test.evaluation_criteria.is_empty());
    }
}
