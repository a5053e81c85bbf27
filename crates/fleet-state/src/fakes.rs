//! In-memory implementations of the storage traits
//!
//! Provides `MemoryTaskStore`, `MemoryBenchmarkStore`, `MemoryBaselineStore`
//! and `MemoryTestCatalog`. They satisfy the trait contracts without any
//! external dependencies and back the engines in tests and single-process use.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::records::{AgentBenchmark, BaselineRecord, BenchmarkCategory, BenchmarkTest, Task};
use crate::storage_traits::*;

/// Poisoned locks only happen after a panic while holding the guard; the data
/// is plain records so continuing with the inner value is fine.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// MemoryTaskStore
// ---------------------------------------------------------------------------

/// Records keyed by id, each stamped with its insertion order so listings
/// stay deterministic when `created_at` ties.
#[derive(Debug)]
struct Sequenced<T> {
    items: HashMap<String, (u64, T)>,
    next_seq: u64,
}

impl<T> Default for Sequenced<T> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<T> Sequenced<T> {
    fn insert(&mut self, id: &str, item: T) -> bool {
        if self.items.contains_key(id) {
            return false;
        }
        self.next_seq += 1;
        self.items.insert(id.to_string(), (self.next_seq, item));
        true
    }

    fn replace(&mut self, id: &str, item: T) -> bool {
        match self.items.get_mut(id) {
            Some(slot) => {
                slot.1 = item;
                true
            }
            None => false,
        }
    }
}

/// In-memory task store. Listing is newest first, insertion order breaking ties.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<Sequenced<Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn insert_task(&self, task: &Task) -> StorageResult<()> {
        let mut tasks = lock(&self.tasks);
        if !tasks.insert(&task.id, task.clone()) {
            return Err(StorageError::AlreadyExists {
                id: task.id.clone(),
            });
        }
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> StorageResult<()> {
        let mut tasks = lock(&self.tasks);
        if !tasks.replace(&task.id, task.clone()) {
            return Err(StorageError::TaskNotFound {
                task_id: task.id.clone(),
            });
        }
        Ok(())
    }

    async fn get_task(&self, task_id: &str) -> StorageResult<Task> {
        let tasks = lock(&self.tasks);
        tasks
            .items
            .get(task_id)
            .map(|(_, t)| t.clone())
            .ok_or_else(|| StorageError::TaskNotFound {
                task_id: task_id.to_string(),
            })
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StorageResult<Vec<Task>> {
        let tasks = lock(&self.tasks);
        let mut matching: Vec<&(u64, Task)> = tasks
            .items
            .values()
            .filter(|(_, t)| filter.matches(t))
            .collect();
        matching.sort_by(|a, b| {
            b.1.created_at
                .cmp(&a.1.created_at)
                .then_with(|| b.0.cmp(&a.0))
        });
        Ok(matching.into_iter().map(|(_, t)| t.clone()).collect())
    }

    async fn delete_task(&self, task_id: &str) -> StorageResult<()> {
        let mut tasks = lock(&self.tasks);
        tasks
            .items
            .remove(task_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::TaskNotFound {
                task_id: task_id.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// MemoryBenchmarkStore
// ---------------------------------------------------------------------------

/// In-memory benchmark store. Listing is newest first, insertion order breaking ties.
#[derive(Debug, Default)]
pub struct MemoryBenchmarkStore {
    benchmarks: Mutex<Sequenced<AgentBenchmark>>,
}

impl MemoryBenchmarkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BenchmarkStore for MemoryBenchmarkStore {
    async fn insert_benchmark(&self, benchmark: &AgentBenchmark) -> StorageResult<()> {
        let mut benchmarks = lock(&self.benchmarks);
        if !benchmarks.insert(&benchmark.id, benchmark.clone()) {
            return Err(StorageError::AlreadyExists {
                id: benchmark.id.clone(),
            });
        }
        Ok(())
    }

    async fn update_benchmark(&self, benchmark: &AgentBenchmark) -> StorageResult<()> {
        let mut benchmarks = lock(&self.benchmarks);
        if !benchmarks.replace(&benchmark.id, benchmark.clone()) {
            return Err(StorageError::BenchmarkNotFound {
                benchmark_id: benchmark.id.clone(),
            });
        }
        Ok(())
    }

    async fn get_benchmark(&self, benchmark_id: &str) -> StorageResult<AgentBenchmark> {
        let benchmarks = lock(&self.benchmarks);
        benchmarks
            .items
            .get(benchmark_id)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| StorageError::BenchmarkNotFound {
                benchmark_id: benchmark_id.to_string(),
            })
    }

    async fn list_benchmarks(
        &self,
        filter: &BenchmarkFilter,
    ) -> StorageResult<Vec<AgentBenchmark>> {
        let benchmarks = lock(&self.benchmarks);
        let mut matching: Vec<&(u64, AgentBenchmark)> = benchmarks
            .items
            .values()
            .filter(|(_, b)| filter.matches(b))
            .collect();
        matching.sort_by(|a, b| {
            b.1.created_at
                .cmp(&a.1.created_at)
                .then_with(|| b.0.cmp(&a.0))
        });
        Ok(matching.into_iter().map(|(_, b)| b.clone()).collect())
    }

    async fn delete_benchmark(&self, benchmark_id: &str) -> StorageResult<()> {
        let mut benchmarks = lock(&self.benchmarks);
        benchmarks
            .items
            .remove(benchmark_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::BenchmarkNotFound {
                benchmark_id: benchmark_id.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// MemoryBaselineStore
// ---------------------------------------------------------------------------

/// In-memory baseline store backed by a `HashMap<agent_id, BaselineRecord>`.
///
/// The compare-and-set runs under a single mutex, which makes it atomic.
#[derive(Debug, Default)]
pub struct MemoryBaselineStore {
    baselines: Mutex<HashMap<String, BaselineRecord>>,
}

impl MemoryBaselineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaselineStore for MemoryBaselineStore {
    async fn get_baseline(&self, agent_id: &str) -> StorageResult<Option<BaselineRecord>> {
        let baselines = lock(&self.baselines);
        Ok(baselines.get(agent_id).cloned())
    }

    async fn compare_and_set_baseline(
        &self,
        expected: Option<f64>,
        record: BaselineRecord,
    ) -> StorageResult<bool> {
        let mut baselines = lock(&self.baselines);
        let current = baselines.get(&record.agent_id).map(|b| b.pass_rate);
        if current != expected {
            return Ok(false);
        }
        baselines.insert(record.agent_id.clone(), record);
        Ok(true)
    }

    async fn list_baselines(&self) -> StorageResult<Vec<BaselineRecord>> {
        let baselines = lock(&self.baselines);
        let mut all: Vec<BaselineRecord> = baselines.values().cloned().collect();
        all.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(all)
    }
}

// ---------------------------------------------------------------------------
// MemoryTestCatalog
// ---------------------------------------------------------------------------

/// In-memory catalog keeping tests in registration order.
#[derive(Debug, Default)]
pub struct MemoryTestCatalog {
    tests: Mutex<Vec<BenchmarkTest>>,
}

impl MemoryTestCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TestCatalog for MemoryTestCatalog {
    async fn register_test(&self, test: BenchmarkTest) -> StorageResult<()> {
        let mut tests = lock(&self.tests);
        if tests.iter().any(|t| t.id == test.id) {
            return Err(StorageError::DuplicateTest { test_id: test.id });
        }
        tests.push(test);
        Ok(())
    }

    async fn get_test(&self, test_id: &str) -> StorageResult<BenchmarkTest> {
        let tests = lock(&self.tests);
        tests
            .iter()
            .find(|t| t.id == test_id)
            .cloned()
            .ok_or_else(|| StorageError::TestNotFound {
                test_id: test_id.to_string(),
            })
    }

    async fn list_tests(
        &self,
        category: Option<BenchmarkCategory>,
    ) -> StorageResult<Vec<BenchmarkTest>> {
        let tests = lock(&self.tests);
        Ok(tests
            .iter()
            .filter(|t| category.map(|c| t.category == c).unwrap_or(true))
            .cloned()
            .collect())
    }
}
