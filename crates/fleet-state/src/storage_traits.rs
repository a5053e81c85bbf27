//! Storage trait definitions for Agent Fleet
//!
//! These traits define the repository abstractions the engines depend on:
//! - `TaskStore`: Task records and their lifecycle fields
//! - `BenchmarkStore`: Benchmark run aggregates
//! - `BaselineStore`: Best observed pass rate per agent (compare-and-set)
//! - `TestCatalog`: Registered benchmark test definitions
//!
//! All traits are async and backend-agnostic. In-memory fakes live in the
//! `fakes` module; `SurrealStore` implements every trait against SurrealDB.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::records::{
    AgentBenchmark, BaselineRecord, BenchmarkCategory, BenchmarkTest, Task, TaskStatus,
};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// TaskStore
// ---------------------------------------------------------------------------

/// Filter for [`TaskStore::list_tasks`]. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub agent_id: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.status.map(|s| task.status == s).unwrap_or(true)
            && self
                .agent_id
                .as_deref()
                .map(|a| task.agent_id.as_deref() == Some(a))
                .unwrap_or(true)
    }
}

/// Task persistence.
///
/// Guarantees:
/// - `insert_task` fails with `AlreadyExists` when the id is taken.
/// - `update_task` replaces the whole record; fails with `TaskNotFound` if absent.
/// - `list_tasks` returns newest first (`created_at` descending).
///
/// Stores do not enforce lifecycle rules; the task engine does.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: &Task) -> StorageResult<()>;

    async fn update_task(&self, task: &Task) -> StorageResult<()>;

    /// Returns `StorageError::TaskNotFound` if absent.
    async fn get_task(&self, task_id: &str) -> StorageResult<Task>;

    async fn list_tasks(&self, filter: &TaskFilter) -> StorageResult<Vec<Task>>;

    /// Returns `StorageError::TaskNotFound` if absent.
    async fn delete_task(&self, task_id: &str) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// BenchmarkStore
// ---------------------------------------------------------------------------

/// Filter for [`BenchmarkStore::list_benchmarks`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BenchmarkFilter {
    pub agent_id: Option<String>,
    pub category: Option<BenchmarkCategory>,
}

impl BenchmarkFilter {
    pub fn for_agent(agent_id: impl Into<String>, category: BenchmarkCategory) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            category: Some(category),
        }
    }

    pub fn matches(&self, benchmark: &AgentBenchmark) -> bool {
        self.agent_id
            .as_deref()
            .map(|a| benchmark.agent_id == a)
            .unwrap_or(true)
            && self
                .category
                .map(|c| benchmark.category == c)
                .unwrap_or(true)
    }
}

/// Benchmark run persistence.
///
/// Guarantees:
/// - `insert_benchmark` fails with `AlreadyExists` when the id is taken.
/// - `list_benchmarks` returns newest first (`created_at` descending).
#[async_trait]
pub trait BenchmarkStore: Send + Sync {
    async fn insert_benchmark(&self, benchmark: &AgentBenchmark) -> StorageResult<()>;

    /// Replace a stored run; fails with `BenchmarkNotFound` if absent.
    async fn update_benchmark(&self, benchmark: &AgentBenchmark) -> StorageResult<()>;

    async fn get_benchmark(&self, benchmark_id: &str) -> StorageResult<AgentBenchmark>;

    async fn list_benchmarks(&self, filter: &BenchmarkFilter)
        -> StorageResult<Vec<AgentBenchmark>>;

    async fn delete_benchmark(&self, benchmark_id: &str) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// BaselineStore
// ---------------------------------------------------------------------------

/// Per-agent baseline persistence.
///
/// Writes go through compare-and-set so that two runs finishing at the same
/// time for one agent cannot lose an update: the caller reads the current
/// value, decides, and retries when the swap reports a conflict.
#[async_trait]
pub trait BaselineStore: Send + Sync {
    async fn get_baseline(&self, agent_id: &str) -> StorageResult<Option<BaselineRecord>>;

    /// Store `record` only if the current pass rate for `record.agent_id`
    /// equals `expected` (`None` meaning "no baseline yet").
    ///
    /// Returns `Ok(false)` when the stored value changed underneath the caller.
    async fn compare_and_set_baseline(
        &self,
        expected: Option<f64>,
        record: BaselineRecord,
    ) -> StorageResult<bool>;

    async fn list_baselines(&self) -> StorageResult<Vec<BaselineRecord>>;
}

// ---------------------------------------------------------------------------
// TestCatalog
// ---------------------------------------------------------------------------

/// Registry of benchmark test definitions.
///
/// Semantics:
/// - Tests are immutable once registered; re-registering an id fails with
///   `DuplicateTest`.
/// - `list_tests` returns tests in registration order.
#[async_trait]
pub trait TestCatalog: Send + Sync {
    async fn register_test(&self, test: BenchmarkTest) -> StorageResult<()>;

    /// Returns `StorageError::TestNotFound` if absent.
    async fn get_test(&self, test_id: &str) -> StorageResult<BenchmarkTest>;

    async fn list_tests(
        &self,
        category: Option<BenchmarkCategory>,
    ) -> StorageResult<Vec<BenchmarkTest>>;
}
