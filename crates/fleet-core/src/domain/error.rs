//! Domain-level error taxonomy for Agent Fleet.

use fleet_state::StorageError;

/// Agent Fleet domain errors.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("benchmark not found: {0}")]
    BenchmarkNotFound(String),

    #[error("benchmark test not found: {0}")]
    TestNotFound(String),

    #[error("no benchmark results: {0}")]
    NoBenchmarkResults(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("agent unavailable: {0}")]
    AgentUnavailable(String),

    #[error("execution failed: {0}")]
    ExecutionFailure(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl FleetError {
    /// Whether the error reports a missing entity, including missing records
    /// surfaced by the storage layer.
    pub fn is_not_found(&self) -> bool {
        match self {
            FleetError::TaskNotFound(_)
            | FleetError::AgentNotFound(_)
            | FleetError::BenchmarkNotFound(_)
            | FleetError::TestNotFound(_)
            | FleetError::NoBenchmarkResults(_) => true,
            FleetError::Storage(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Lift storage "not found" errors into the matching domain variant.
    pub(crate) fn from_storage(err: StorageError) -> Self {
        match err {
            StorageError::TaskNotFound { task_id } => FleetError::TaskNotFound(task_id),
            StorageError::BenchmarkNotFound { benchmark_id } => {
                FleetError::BenchmarkNotFound(benchmark_id)
            }
            StorageError::TestNotFound { test_id } => FleetError::TestNotFound(test_id),
            StorageError::DuplicateTest { test_id } => {
                FleetError::InvalidRequest(format!("benchmark test already registered: {test_id}"))
            }
            other => FleetError::Storage(other),
        }
    }
}

/// Result type for Agent Fleet domain operations.
pub type Result<T> = std::result::Result<T, FleetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_not_found_maps_to_domain_variant() {
        let err = FleetError::from_storage(StorageError::TaskNotFound {
            task_id: "t-1".to_string(),
        });
        assert!(matches!(err, FleetError::TaskNotFound(ref id) if id == "t-1"));
        assert!(err.is_not_found());
    }

    #[test]
    fn duplicate_test_is_an_invalid_request() {
        let err = FleetError::from_storage(StorageError::DuplicateTest {
            test_id: "qa_001".to_string(),
        });
        assert!(matches!(err, FleetError::InvalidRequest(_)));
        assert!(err.to_string().contains("qa_001"));
    }

    #[test]
    fn backend_errors_are_not_not_found() {
        let err = FleetError::from(StorageError::Backend("disk full".to_string()));
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("disk full"));
    }
}
