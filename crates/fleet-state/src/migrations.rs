//! SurrealDB schema migrations and initialization
//!
//! Sets up every fleet table with its unique and lookup indexes.

use crate::error::StateError;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all fleet tables in SurrealDB
///
/// Called on every connection. Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing fleet SurrealDB schema");

    init_tasks_table(db).await?;
    init_benchmarks_table(db).await?;
    init_baselines_table(db).await?;
    init_benchmark_tests_table(db).await?;

    info!("fleet schema initialization complete");
    Ok(())
}

/// Initialize `tasks` table
///
/// Schema:
/// ```text
/// TABLE tasks {
///   task_id:     STRING (unique)
///   status:      STRING (indexed)
///   agent_id:    STRING? (indexed)
///   created_at:  DATETIME (indexed)
///   document:    OBJECT
/// }
/// ```
async fn init_tasks_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing tasks table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS tasks SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_task_id ON TABLE tasks COLUMNS task_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_task_status ON TABLE tasks COLUMNS status;
        DEFINE INDEX IF NOT EXISTS idx_task_agent ON TABLE tasks COLUMNS agent_id;
        DEFINE INDEX IF NOT EXISTS idx_task_created_at ON TABLE tasks COLUMNS created_at;
    "#;

    run(db, sql).await
}

/// Initialize `benchmarks` table
///
/// Schema:
/// ```text
/// TABLE benchmarks {
///   benchmark_id: STRING (unique)
///   agent_id:     STRING (indexed with category)
///   category:     STRING
///   created_at:   DATETIME (indexed)
///   document:     OBJECT
/// }
/// ```
async fn init_benchmarks_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing benchmarks table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS benchmarks SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_benchmark_id ON TABLE benchmarks COLUMNS benchmark_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_benchmark_agent_category ON TABLE benchmarks COLUMNS agent_id, category;
        DEFINE INDEX IF NOT EXISTS idx_benchmark_created_at ON TABLE benchmarks COLUMNS created_at;
    "#;

    run(db, sql).await
}

/// Initialize `baselines` table
///
/// At most one row per agent; the unique index makes concurrent first
/// writes for the same agent collide instead of duplicating.
async fn init_baselines_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing baselines table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS baselines SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_baseline_agent ON TABLE baselines COLUMNS agent_id UNIQUE;
    "#;

    run(db, sql).await
}

/// Initialize `benchmark_tests` table
async fn init_benchmark_tests_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing benchmark_tests table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS benchmark_tests SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_test_id ON TABLE benchmark_tests COLUMNS test_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_test_category ON TABLE benchmark_tests COLUMNS category;
    "#;

    run(db, sql).await
}

async fn run(db: &Surreal<Any>, sql: &str) -> Result<()> {
    db.query(sql)
        .await
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?
        .check()
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?;
    Ok(())
}
