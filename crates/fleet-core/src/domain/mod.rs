//! Domain models for Agent Fleet.
//!
//! Canonical definitions for the entities the engines exchange:
//! - `Agent`: A worker and its availability, read through `AgentSource`
//! - `TaskCreate` / `TaskUpdate` / `TaskExecutionResult`: Task requests and outcomes
//! - `BenchmarkConfig` / `TestOutcome`: Benchmark run inputs
//! - `BenchmarkComparison` / `BenchmarkReport` / `DegradationAlert`: Derived views
//!
//! Persisted records (tasks, benchmark runs, baselines) live in `fleet_state`.

pub mod agent;
pub mod benchmark;
pub mod error;
pub mod task;

pub use agent::{default_roster, Agent, AgentKind, AgentSource, AgentStatus, StaticAgentSource};
pub use benchmark::{
    AgentRanking, BenchmarkComparison, BenchmarkConfig, BenchmarkReport, DegradationAlert,
    Severity, TestOutcome,
};
pub use error::{FleetError, Result};
pub use task::{TaskCreate, TaskExecutionResult, TaskUpdate};
