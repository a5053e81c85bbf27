//! Fleet-State: persistence layer for Agent Fleet
//!
//! This crate owns every record the fleet engines read and write: tasks,
//! benchmark runs, per-agent baselines and the benchmark test catalog.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: record integrity and atomic baseline updates. Lifecycle rules live
//! in `fleet-core`; stores only persist what they are given.
//!
//! ## Key Components
//!
//! - `storage_traits`: `TaskStore`, `BenchmarkStore`, `BaselineStore`, `TestCatalog`
//! - `fakes`: in-memory implementations of every trait
//! - `SurrealStore`: SurrealDB implementation (mem, surrealkv, cloud)

mod error;
pub mod fakes;
pub mod handle;
pub mod migrations;
pub mod records;
mod schema;
pub mod storage_traits;
mod surreal_store;

pub use error::{StateError, StorageError};
pub use handle::{AuthScope, CloudConfig};
pub use records::{
    AgentBenchmark, BaselineRecord, BenchmarkCategory, BenchmarkStatus, BenchmarkTest,
    Difficulty, JsonMap, Task, TaskPriority, TaskStatus, TestResult,
};
pub use storage_traits::{
    BaselineStore, BenchmarkFilter, BenchmarkStore, StorageResult, TaskFilter, TaskStore,
    TestCatalog,
};
pub use surreal_store::SurrealStore;

/// Result type for fleet-state connection and schema operations
pub type Result<T> = std::result::Result<T, StateError>;
