//! Execution contracts for tasks and benchmark tests.
//!
//! The engines never talk to an agent runtime directly. They call these
//! traits, which production wires to real agents and tests replace with
//! deterministic stubs.

use std::sync::Mutex;

use async_trait::async_trait;
use fleet_state::{BenchmarkTest, JsonMap, Task};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use crate::domain::{Agent, Result, TestOutcome};

/// Runs a task on an agent and returns its result payload.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute_task(&self, agent: &Agent, task: &Task) -> Result<JsonMap>;
}

/// Runs one benchmark test against an agent.
#[async_trait]
pub trait TestExecutor: Send + Sync {
    async fn execute_test(&self, agent_id: &str, test: &BenchmarkTest) -> Result<TestOutcome>;
}

/// Probability a simulated test passes.
pub const SIMULATED_PASS_PROBABILITY: f64 = 0.8;

/// Stand-in executor used when no agent runtime is attached.
///
/// Tests pass with probability 0.8. Passing scores fall in [0.7, 1.0),
/// failing scores in [0.0, 0.5), and reported durations in [0.5, 3.0)
/// seconds. Nothing actually sleeps. A seed makes the sequence reproducible.
pub struct SimulatedExecutor {
    rng: Mutex<StdRng>,
}

impl SimulatedExecutor {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    fn draw(&self) -> TestOutcome {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let passed = rng.gen_bool(SIMULATED_PASS_PROBABILITY);
        let score = if passed {
            rng.gen_range(0.7..1.0)
        } else {
            rng.gen_range(0.0..0.5)
        };
        let duration_seconds = rng.gen_range(0.5..3.0);

        TestOutcome {
            passed,
            score,
            duration_seconds,
            output: passed.then(|| "simulated output".to_string()),
            error: (!passed).then(|| "simulated error".to_string()),
        }
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl TaskExecutor for SimulatedExecutor {
    async fn execute_task(&self, agent: &Agent, task: &Task) -> Result<JsonMap> {
        let mut result = JsonMap::new();
        result.insert("task".to_string(), Value::String(task.title.clone()));
        result.insert("agent".to_string(), Value::String(agent.name.clone()));
        result.insert(
            "output".to_string(),
            Value::String(format!(
                "Task '{}' executed successfully by {}",
                task.title, agent.name
            )),
        );
        result.insert("context".to_string(), Value::Object(task.context.clone()));
        Ok(result)
    }
}

#[async_trait]
impl TestExecutor for SimulatedExecutor {
    async fn execute_test(&self, _agent_id: &str, _test: &BenchmarkTest) -> Result<TestOutcome> {
        Ok(self.draw())
    }
}
