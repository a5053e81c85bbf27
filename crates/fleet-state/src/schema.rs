//! Row definitions for the fleet SurrealDB tables
//!
//! Tables:
//! - tasks: Task documents with their lookup columns lifted out
//! - benchmarks: Benchmark run aggregates
//! - baselines: One row per agent holding the best observed pass rate
//! - benchmark_tests: Registered catalog tests
//!
//! Each row keeps the columns the queries filter or sort on next to a
//! `document` holding the full record as JSON. The record types in
//! [`crate::records`] stay free of database concerns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::records::{AgentBenchmark, BaselineRecord, BenchmarkTest, Task};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

// ---------------------------------------------------------------------------
// tasks
// ---------------------------------------------------------------------------

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub task_id: String,
    /// Lowercase status name, mirrored for filtering
    pub status: String,
    pub agent_id: Option<String>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    /// Full task as JSON
    pub document: serde_json::Value,
}

impl TaskRow {
    pub fn from_task(task: &Task) -> Result<Self, StorageError> {
        Ok(Self {
            id: None,
            task_id: task.id.clone(),
            status: task.status.as_str().to_string(),
            agent_id: task.agent_id.clone(),
            created_at: task.created_at,
            document: serde_json::to_value(task)?,
        })
    }

    pub fn into_task(self) -> Result<Task, StorageError> {
        Ok(serde_json::from_value(self.document)?)
    }
}

// ---------------------------------------------------------------------------
// benchmarks
// ---------------------------------------------------------------------------

/// Benchmark run row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub benchmark_id: String,
    pub agent_id: String,
    pub category: String,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    pub document: serde_json::Value,
}

impl BenchmarkRow {
    pub fn from_benchmark(benchmark: &AgentBenchmark) -> Result<Self, StorageError> {
        Ok(Self {
            id: None,
            benchmark_id: benchmark.id.clone(),
            agent_id: benchmark.agent_id.clone(),
            category: benchmark.category.as_str().to_string(),
            created_at: benchmark.created_at,
            document: serde_json::to_value(benchmark)?,
        })
    }

    pub fn into_benchmark(self) -> Result<AgentBenchmark, StorageError> {
        Ok(serde_json::from_value(self.document)?)
    }
}

// ---------------------------------------------------------------------------
// baselines
// ---------------------------------------------------------------------------

/// Baseline row. `agent_id` is unique; `pass_rate` is the compare-and-set key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub agent_id: String,
    pub pass_rate: f64,
    pub sample_size: u32,
    pub benchmark_id: String,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl From<BaselineRecord> for BaselineRow {
    fn from(record: BaselineRecord) -> Self {
        Self {
            id: None,
            agent_id: record.agent_id,
            pass_rate: record.pass_rate,
            sample_size: record.sample_size,
            benchmark_id: record.benchmark_id,
            updated_at: record.updated_at,
        }
    }
}

impl From<BaselineRow> for BaselineRecord {
    fn from(row: BaselineRow) -> Self {
        Self {
            agent_id: row.agent_id,
            pass_rate: row.pass_rate,
            sample_size: row.sample_size,
            benchmark_id: row.benchmark_id,
            updated_at: row.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// benchmark_tests
// ---------------------------------------------------------------------------

/// Catalog test row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub test_id: String,
    pub category: String,
    #[serde(with = "surreal_datetime")]
    pub registered_at: DateTime<Utc>,
    pub document: serde_json::Value,
}

impl TestRow {
    pub fn from_test(test: &BenchmarkTest) -> Result<Self, StorageError> {
        Ok(Self {
            id: None,
            test_id: test.id.clone(),
            category: test.category.as_str().to_string(),
            registered_at: Utc::now(),
            document: serde_json::to_value(test)?,
        })
    }

    pub fn into_test(self) -> Result<BenchmarkTest, StorageError> {
        Ok(serde_json::from_value(self.document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{BenchmarkCategory, TaskStatus};

    #[test]
    fn task_row_lifts_lookup_columns() {
        let mut task = Task::new("summarize logs");
        task.status = TaskStatus::Running;
        task.agent_id = Some("claude_code".to_string());

        let row = TaskRow::from_task(&task).expect("row");
        assert_eq!(row.task_id, task.id);
        assert_eq!(row.status, "running");
        assert_eq!(row.agent_id.as_deref(), Some("claude_code"));

        let back = row.into_task().expect("task");
        assert_eq!(back, task);
    }

    #[test]
    fn test_row_records_category_name() {
        let test = BenchmarkTest {
            id: "tr_001".to_string(),
            name: "Translate greeting".to_string(),
            category: BenchmarkCategory::Translation,
            description: "Translate hello to French".to_string(),
            input_data: Default::default(),
            expected_output: Some("bonjour".to_string()),
            evaluation_criteria: vec![],
            difficulty: Default::default(),
            max_score: 1.0,
        };
        let row = TestRow::from_test(&test).expect("row");
        assert_eq!(row.category, "translation");
        assert_eq!(row.into_test().expect("test"), test);
    }
}
