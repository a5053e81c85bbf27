//! Agent Fleet core library
//!
//! Task scheduling and lifecycle, benchmark execution, baseline tracking,
//! degradation alerts and reporting over the `fleet-state` stores.

pub mod catalog;
pub mod comparator;
pub mod config;
pub mod cost;
pub mod degradation;
pub mod domain;
pub mod execution;
pub mod metrics;
pub mod obs;
pub mod reporting;
pub mod runner;
pub mod scheduler;
pub mod stats;
pub mod task_engine;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use catalog::{seed_standard_tests, standard_tests, suite_digest};
pub use comparator::{compare_agents, compare_benchmarks};
pub use config::FleetConfig;
pub use cost::{CostEstimate, CostModel, FlatRateCostModel};
pub use degradation::{degradation_alerts, is_degraded, two_proportion_p_value};
pub use domain::{
    default_roster, Agent, AgentKind, AgentRanking, AgentSource, AgentStatus, BenchmarkComparison,
    BenchmarkConfig, BenchmarkReport, DegradationAlert, FleetError, Result, Severity,
    StaticAgentSource, TaskCreate, TaskExecutionResult, TaskUpdate, TestOutcome,
};
pub use execution::{SimulatedExecutor, TaskExecutor, TestExecutor};
pub use reporting::{generate_report, rankings, render_report_md, write_report_json};
pub use runner::BenchmarkRunner;
pub use scheduler::{strategy_by_name, HintThenFirstActive, SchedulingStrategy};
pub use stats::RunStats;
pub use task_engine::TaskEngine;

pub use metrics::METRICS;
pub use telemetry::init_tracing;

/// Agent Fleet version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
