//! Error types for fleet-state

use thiserror::Error;

/// Errors raised while connecting to or preparing the database
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

/// Errors returned by the storage traits.
///
/// Every backend maps its failures onto these variants so the engines can
/// distinguish "record does not exist" from "the store is broken".
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("benchmark not found: {benchmark_id}")]
    BenchmarkNotFound { benchmark_id: String },

    #[error("benchmark test not found: {test_id}")]
    TestNotFound { test_id: String },

    #[error("benchmark test already registered: {test_id}")]
    DuplicateTest { test_id: String },

    #[error("record already exists: {id}")]
    AlreadyExists { id: String },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Whether the error reports a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::TaskNotFound { .. }
                | StorageError::BenchmarkNotFound { .. }
                | StorageError::TestNotFound { .. }
        )
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<StateError> for StorageError {
    fn from(err: StateError) -> Self {
        StorageError::Backend(err.to_string())
    }
}
