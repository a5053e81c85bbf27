//! SurrealDB-backed implementation of every storage trait
//!
//! Uses the rows in [`crate::schema`] for persistence, converting to/from
//! [`crate::records`] types at the boundary.

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::handle::{self, CloudConfig};
use crate::records::{AgentBenchmark, BaselineRecord, BenchmarkCategory, BenchmarkTest, Task};
use crate::schema::{BaselineRow, BenchmarkRow, TaskRow, TestRow};
use crate::storage_traits::{
    BaselineStore, BenchmarkFilter, BenchmarkStore, StorageResult, TaskFilter, TaskStore,
    TestCatalog,
};

fn backend(e: surrealdb::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// SurrealDB-backed store for tasks, benchmarks, baselines and catalog tests.
#[derive(Clone)]
pub struct SurrealStore {
    db: Surreal<Any>,
}

impl SurrealStore {
    /// Wrap an existing connection whose schema is already initialized.
    pub fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `fleet/main`, and runs `init_schema`.
    pub async fn in_memory() -> crate::Result<Self> {
        let db = handle::connect_in_memory().await?;
        info!("SurrealStore connected (in-memory)");
        Ok(Self { db })
    }

    /// Connect to an explicit engine URL.
    pub async fn connect(url: &str) -> crate::Result<Self> {
        let db = handle::connect_url(url).await?;
        info!("SurrealStore connected ({})", url);
        Ok(Self { db })
    }

    /// Connect to SurrealDB Cloud.
    pub async fn setup_cloud(config: CloudConfig) -> crate::Result<Self> {
        let db = handle::connect_cloud(&config).await?;
        Ok(Self { db })
    }

    /// Create from environment variables.
    ///
    /// Uses the env-var chain of [`handle::connect_from_env`].
    pub async fn from_env() -> crate::Result<Self> {
        let db = handle::connect_from_env().await?;
        Ok(Self { db })
    }

    // -- private helpers -----------------------------------------------------

    async fn fetch_task(&self, task_id: &str) -> StorageResult<Option<TaskRow>> {
        let tid = task_id.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM tasks WHERE task_id = $tid")
            .bind(("tid", tid))
            .await
            .map_err(backend)?;
        let rows: Vec<TaskRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_benchmark(&self, benchmark_id: &str) -> StorageResult<Option<BenchmarkRow>> {
        let bid = benchmark_id.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM benchmarks WHERE benchmark_id = $bid")
            .bind(("bid", bid))
            .await
            .map_err(backend)?;
        let rows: Vec<BenchmarkRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_test(&self, test_id: &str) -> StorageResult<Option<TestRow>> {
        let tid = test_id.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM benchmark_tests WHERE test_id = $tid")
            .bind(("tid", tid))
            .await
            .map_err(backend)?;
        let rows: Vec<TestRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().next())
    }
}

// ---------------------------------------------------------------------------
// TaskStore
// ---------------------------------------------------------------------------

#[async_trait]
impl TaskStore for SurrealStore {
    async fn insert_task(&self, task: &Task) -> StorageResult<()> {
        if self.fetch_task(&task.id).await?.is_some() {
            return Err(StorageError::AlreadyExists {
                id: task.id.clone(),
            });
        }

        debug!(task_id = %task.id, "inserting task");
        let row = TaskRow::from_task(task)?;
        let _created: Option<TaskRow> = self
            .db
            .create("tasks")
            .content(row)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> StorageResult<()> {
        let row = TaskRow::from_task(task)?;
        let tid = task.id.clone();

        let mut res = self
            .db
            .query("UPDATE tasks CONTENT $row WHERE task_id = $tid RETURN AFTER")
            .bind(("row", row))
            .bind(("tid", tid))
            .await
            .map_err(backend)?;
        let updated: Vec<TaskRow> = res.take(0).map_err(backend)?;

        if updated.is_empty() {
            return Err(StorageError::TaskNotFound {
                task_id: task.id.clone(),
            });
        }
        Ok(())
    }

    async fn get_task(&self, task_id: &str) -> StorageResult<Task> {
        self.fetch_task(task_id)
            .await?
            .ok_or_else(|| StorageError::TaskNotFound {
                task_id: task_id.to_string(),
            })?
            .into_task()
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StorageResult<Vec<Task>> {
        let mut conditions = Vec::new();
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        if filter.agent_id.is_some() {
            conditions.push("agent_id = $aid");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let sql = format!("SELECT * FROM tasks{where_clause} ORDER BY created_at DESC");

        let mut query = self.db.query(sql);
        if let Some(status) = filter.status {
            query = query.bind(("status", status.as_str().to_string()));
        }
        if let Some(agent_id) = &filter.agent_id {
            query = query.bind(("aid", agent_id.clone()));
        }

        let mut res = query.await.map_err(backend)?;
        let rows: Vec<TaskRow> = res.take(0).map_err(backend)?;
        rows.into_iter().map(TaskRow::into_task).collect()
    }

    async fn delete_task(&self, task_id: &str) -> StorageResult<()> {
        let tid = task_id.to_string();
        let mut res = self
            .db
            .query("DELETE tasks WHERE task_id = $tid RETURN BEFORE")
            .bind(("tid", tid))
            .await
            .map_err(backend)?;
        let removed: Vec<TaskRow> = res.take(0).map_err(backend)?;

        if removed.is_empty() {
            return Err(StorageError::TaskNotFound {
                task_id: task_id.to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BenchmarkStore
// ---------------------------------------------------------------------------

#[async_trait]
impl BenchmarkStore for SurrealStore {
    async fn insert_benchmark(&self, benchmark: &AgentBenchmark) -> StorageResult<()> {
        if self.fetch_benchmark(&benchmark.id).await?.is_some() {
            return Err(StorageError::AlreadyExists {
                id: benchmark.id.clone(),
            });
        }

        debug!(benchmark_id = %benchmark.id, agent_id = %benchmark.agent_id, "inserting benchmark");
        let row = BenchmarkRow::from_benchmark(benchmark)?;
        let _created: Option<BenchmarkRow> = self
            .db
            .create("benchmarks")
            .content(row)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn update_benchmark(&self, benchmark: &AgentBenchmark) -> StorageResult<()> {
        let row = BenchmarkRow::from_benchmark(benchmark)?;
        let bid = benchmark.id.clone();

        let mut res = self
            .db
            .query("UPDATE benchmarks CONTENT $row WHERE benchmark_id = $bid RETURN AFTER")
            .bind(("row", row))
            .bind(("bid", bid))
            .await
            .map_err(backend)?;
        let updated: Vec<BenchmarkRow> = res.take(0).map_err(backend)?;

        if updated.is_empty() {
            return Err(StorageError::BenchmarkNotFound {
                benchmark_id: benchmark.id.clone(),
            });
        }
        Ok(())
    }

    async fn get_benchmark(&self, benchmark_id: &str) -> StorageResult<AgentBenchmark> {
        self.fetch_benchmark(benchmark_id)
            .await?
            .ok_or_else(|| StorageError::BenchmarkNotFound {
                benchmark_id: benchmark_id.to_string(),
            })?
            .into_benchmark()
    }

    async fn list_benchmarks(
        &self,
        filter: &BenchmarkFilter,
    ) -> StorageResult<Vec<AgentBenchmark>> {
        let mut conditions = Vec::new();
        if filter.agent_id.is_some() {
            conditions.push("agent_id = $aid");
        }
        if filter.category.is_some() {
            conditions.push("category = $cat");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let sql = format!("SELECT * FROM benchmarks{where_clause} ORDER BY created_at DESC");

        let mut query = self.db.query(sql);
        if let Some(agent_id) = &filter.agent_id {
            query = query.bind(("aid", agent_id.clone()));
        }
        if let Some(category) = filter.category {
            query = query.bind(("cat", category.as_str().to_string()));
        }

        let mut res = query.await.map_err(backend)?;
        let rows: Vec<BenchmarkRow> = res.take(0).map_err(backend)?;
        rows.into_iter().map(BenchmarkRow::into_benchmark).collect()
    }

    async fn delete_benchmark(&self, benchmark_id: &str) -> StorageResult<()> {
        let bid = benchmark_id.to_string();
        let mut res = self
            .db
            .query("DELETE benchmarks WHERE benchmark_id = $bid RETURN BEFORE")
            .bind(("bid", bid))
            .await
            .map_err(backend)?;
        let removed: Vec<BenchmarkRow> = res.take(0).map_err(backend)?;

        if removed.is_empty() {
            return Err(StorageError::BenchmarkNotFound {
                benchmark_id: benchmark_id.to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BaselineStore
// ---------------------------------------------------------------------------

#[async_trait]
impl BaselineStore for SurrealStore {
    async fn get_baseline(&self, agent_id: &str) -> StorageResult<Option<BaselineRecord>> {
        let aid = agent_id.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM baselines WHERE agent_id = $aid")
            .bind(("aid", aid))
            .await
            .map_err(backend)?;
        let rows: Vec<BaselineRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().next().map(BaselineRecord::from))
    }

    async fn compare_and_set_baseline(
        &self,
        expected: Option<f64>,
        record: BaselineRecord,
    ) -> StorageResult<bool> {
        let agent_id = record.agent_id.clone();
        let row = BaselineRow::from(record);

        match expected {
            Some(expected) => {
                // The WHERE guard makes the swap conditional within one statement.
                let mut res = self
                    .db
                    .query(
                        "UPDATE baselines CONTENT $row \
                         WHERE agent_id = $aid AND pass_rate = $expected RETURN AFTER",
                    )
                    .bind(("row", row))
                    .bind(("aid", agent_id))
                    .bind(("expected", expected))
                    .await
                    .map_err(backend)?;
                let updated: Vec<BaselineRow> = res.take(0).map_err(backend)?;
                Ok(!updated.is_empty())
            }
            None => {
                let created: Result<Option<BaselineRow>, surrealdb::Error> =
                    self.db.create("baselines").content(row).await;
                match created {
                    Ok(_) => Ok(true),
                    // The unique index on agent_id rejects a second first-write.
                    Err(e) => match self.get_baseline(&agent_id).await? {
                        Some(_) => Ok(false),
                        None => Err(backend(e)),
                    },
                }
            }
        }
    }

    async fn list_baselines(&self) -> StorageResult<Vec<BaselineRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM baselines ORDER BY agent_id ASC")
            .await
            .map_err(backend)?;
        let rows: Vec<BaselineRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().map(BaselineRecord::from).collect())
    }
}

// ---------------------------------------------------------------------------
// TestCatalog
// ---------------------------------------------------------------------------

#[async_trait]
impl TestCatalog for SurrealStore {
    async fn register_test(&self, test: BenchmarkTest) -> StorageResult<()> {
        if self.fetch_test(&test.id).await?.is_some() {
            return Err(StorageError::DuplicateTest { test_id: test.id });
        }

        let row = TestRow::from_test(&test)?;
        let created: Result<Option<TestRow>, surrealdb::Error> =
            self.db.create("benchmark_tests").content(row).await;
        match created {
            Ok(_) => Ok(()),
            Err(e) => match self.fetch_test(&test.id).await? {
                Some(_) => Err(StorageError::DuplicateTest { test_id: test.id }),
                None => Err(backend(e)),
            },
        }
    }

    async fn get_test(&self, test_id: &str) -> StorageResult<BenchmarkTest> {
        self.fetch_test(test_id)
            .await?
            .ok_or_else(|| StorageError::TestNotFound {
                test_id: test_id.to_string(),
            })?
            .into_test()
    }

    async fn list_tests(
        &self,
        category: Option<BenchmarkCategory>,
    ) -> StorageResult<Vec<BenchmarkTest>> {
        let rows: Vec<TestRow> = if let Some(category) = category {
            let cat = category.as_str().to_string();
            let mut res = self
                .db
                .query(
                    "SELECT * FROM benchmark_tests WHERE category = $cat \
                     ORDER BY registered_at ASC, test_id ASC",
                )
                .bind(("cat", cat))
                .await
                .map_err(backend)?;
            res.take(0).map_err(backend)?
        } else {
            let mut res = self
                .db
                .query("SELECT * FROM benchmark_tests ORDER BY registered_at ASC, test_id ASC")
                .await
                .map_err(backend)?;
            res.take(0).map_err(backend)?
        };

        rows.into_iter().map(TestRow::into_test).collect()
    }
}
