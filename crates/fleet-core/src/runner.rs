//! Benchmark execution against one agent.
//!
//! A run resolves its tests from the catalog, executes them with bounded
//! concurrency, aggregates the results, checks for regression against the
//! agent's baseline and raises the baseline when the run beats it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleet_state::{
    AgentBenchmark, BaselineRecord, BaselineStore, BenchmarkCategory, BenchmarkFilter,
    BenchmarkStatus, BenchmarkStore, BenchmarkTest, JsonMap, TestCatalog, TestResult,
};
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, warn, Instrument};

use crate::catalog::suite_digest;
use crate::cost::{CostModel, FlatRateCostModel};
use crate::degradation::{is_degraded, two_proportion_p_value, DEFAULT_DEGRADATION_FACTOR};
use crate::domain::{AgentSource, BenchmarkConfig, FleetError, Result, TestOutcome};
use crate::execution::TestExecutor;
use crate::metrics::METRICS;
use crate::obs;
use crate::stats::RunStats;

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Compare-and-set attempts before a baseline update gives up.
const BASELINE_CAS_ATTEMPTS: usize = 16;

/// Runs benchmarks and owns the benchmark, baseline and catalog operations.
pub struct BenchmarkRunner {
    catalog: Arc<dyn TestCatalog>,
    benchmarks: Arc<dyn BenchmarkStore>,
    baselines: Arc<dyn BaselineStore>,
    agents: Arc<dyn AgentSource>,
    executor: Arc<dyn TestExecutor>,
    cost_model: Arc<dyn CostModel>,
    degradation_factor: f64,
    max_concurrency: usize,
}

impl BenchmarkRunner {
    pub fn new(
        catalog: Arc<dyn TestCatalog>,
        benchmarks: Arc<dyn BenchmarkStore>,
        baselines: Arc<dyn BaselineStore>,
        agents: Arc<dyn AgentSource>,
        executor: Arc<dyn TestExecutor>,
    ) -> Self {
        Self {
            catalog,
            benchmarks,
            baselines,
            agents,
            executor,
            cost_model: Arc::new(FlatRateCostModel::default()),
            degradation_factor: DEFAULT_DEGRADATION_FACTOR,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_cost_model(mut self, cost_model: Arc<dyn CostModel>) -> Self {
        self.cost_model = cost_model;
        self
    }

    pub fn with_degradation_factor(mut self, factor: f64) -> Self {
        self.degradation_factor = factor;
        self
    }

    /// Tests in flight at once. Zero is treated as one.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Tests a run with `config` would execute, in execution order.
    ///
    /// Explicit ids win over categories; unknown ids are dropped. Custom
    /// tests are appended.
    pub async fn resolve_tests(&self, config: &BenchmarkConfig) -> Result<Vec<BenchmarkTest>> {
        let mut tests = if config.test_ids.is_empty() {
            let all = self
                .catalog
                .list_tests(None)
                .await
                .map_err(FleetError::from_storage)?;
            if config.categories.is_empty() {
                all
            } else {
                all.into_iter()
                    .filter(|t| config.categories.contains(&t.category))
                    .collect()
            }
        } else {
            let mut found = Vec::with_capacity(config.test_ids.len());
            for id in &config.test_ids {
                match self.catalog.get_test(id).await {
                    Ok(test) => found.push(test),
                    Err(e) if e.is_not_found() => debug!(test_id = %id, "unknown test id dropped"),
                    Err(e) => return Err(FleetError::from_storage(e)),
                }
            }
            found
        };
        tests.extend(config.custom_tests.iter().cloned());
        Ok(tests)
    }

    /// Run a benchmark and store the completed record.
    pub async fn run(&self, config: BenchmarkConfig) -> Result<AgentBenchmark> {
        if config.agent_id.trim().is_empty() {
            return Err(FleetError::InvalidRequest("agent_id must not be empty".to_string()));
        }
        let budget = Duration::try_from_secs_f64(config.max_duration_seconds)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| {
                FleetError::InvalidRequest(format!(
                    "max_duration_seconds must be positive, got {}",
                    config.max_duration_seconds
                ))
            })?;

        let tests = self.resolve_tests(&config).await?;
        let Some(first) = tests.first() else {
            return Err(FleetError::InvalidRequest(
                "no benchmark tests matched the request".to_string(),
            ));
        };
        let category = first.category;

        let agent_name = self
            .agents
            .get_agent(&config.agent_id)
            .await?
            .map(|a| a.name)
            .unwrap_or_else(|| config.agent_id.clone());

        let benchmark = AgentBenchmark {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: config.agent_id.clone(),
            agent_name,
            agent_version: config.agent_version.clone(),
            category,
            total_tests: 0,
            passed_tests: 0,
            failed_tests: 0,
            pass_rate: 0.0,
            average_score: 0.0,
            total_duration_seconds: 0.0,
            average_response_time: 0.0,
            min_response_time: 0.0,
            max_response_time: 0.0,
            test_results: Vec::new(),
            is_degraded: false,
            degradation_p_value: None,
            baseline_pass_rate: None,
            estimated_cost_usd: None,
            total_tokens: None,
            suite_digest: suite_digest(&tests)?,
            status: BenchmarkStatus::Running,
            created_at: Utc::now(),
            completed_at: None,
            notes: config.notes.clone(),
            tags: config.tags.clone(),
        };

        let span = obs::benchmark_span(&benchmark.id, &benchmark.agent_id);
        self.complete_run(benchmark, &config, &tests, budget)
            .instrument(span)
            .await
    }

    async fn complete_run(
        &self,
        mut benchmark: AgentBenchmark,
        config: &BenchmarkConfig,
        tests: &[BenchmarkTest],
        budget: Duration,
    ) -> Result<AgentBenchmark> {
        self.benchmarks
            .insert_benchmark(&benchmark)
            .await
            .map_err(FleetError::from_storage)?;
        obs::emit_benchmark_started(&benchmark.id, &benchmark.agent_id, tests.len());

        if let Err(e) = self.finish_run(&mut benchmark, config, tests, budget).await {
            self.mark_failed(&mut benchmark, &e).await;
            return Err(e);
        }

        METRICS.inc_benchmarks_run();
        METRICS.add_tests_executed(u64::from(benchmark.total_tests));
        obs::emit_benchmark_finished(
            &benchmark.id,
            benchmark.category,
            benchmark.pass_rate,
            benchmark.average_score,
            benchmark.total_duration_seconds,
        );
        Ok(benchmark)
    }

    async fn finish_run(
        &self,
        benchmark: &mut AgentBenchmark,
        config: &BenchmarkConfig,
        tests: &[BenchmarkTest],
        budget: Duration,
    ) -> Result<()> {
        benchmark.test_results = self.execute_all(&config.agent_id, tests, budget).await;
        RunStats::from_results(&benchmark.test_results).apply_to(benchmark);

        if config.enable_cost_tracking {
            let estimate = self.cost_model.estimate(tests);
            benchmark.estimated_cost_usd = Some(estimate.usd);
            benchmark.total_tokens = Some(estimate.tokens);
        }

        if config.enable_degradation_check {
            self.check_degradation(benchmark).await?;
        }

        benchmark.status = BenchmarkStatus::Completed;
        benchmark.completed_at = Some(Utc::now());
        self.benchmarks
            .update_benchmark(benchmark)
            .await
            .map_err(FleetError::from_storage)?;

        self.raise_baseline(benchmark).await?;
        Ok(())
    }

    /// Close out a run that errored after its record was stored. The write is
    /// best effort; the original error is what the caller sees.
    async fn mark_failed(&self, benchmark: &mut AgentBenchmark, error: &FleetError) {
        benchmark.status = BenchmarkStatus::Failed;
        benchmark.completed_at.get_or_insert_with(Utc::now);
        warn!(benchmark_id = %benchmark.id, error = %error, "benchmark run failed");
        if let Err(e) = self.benchmarks.update_benchmark(benchmark).await {
            warn!(benchmark_id = %benchmark.id, error = %e, "could not record failed benchmark");
        }
    }

    /// Execute every test, at most `max_concurrency` at a time. Results keep
    /// the order of `tests`.
    async fn execute_all(
        &self,
        agent_id: &str,
        tests: &[BenchmarkTest],
        budget: Duration,
    ) -> Vec<TestResult> {
        let sem = Arc::new(Semaphore::new(self.max_concurrency));
        let mut handles = Vec::with_capacity(tests.len());

        for test in tests.iter().cloned() {
            let sem = Arc::clone(&sem);
            let executor = Arc::clone(&self.executor);
            let agent_id = agent_id.to_string();
            let handle = tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.ok();
                let outcome =
                    tokio::time::timeout(budget, executor.execute_test(&agent_id, &test)).await;
                let outcome = match outcome {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(e)) => TestOutcome::failed(0.0, 0.0, e.to_string()),
                    Err(_) => TestOutcome::failed(
                        0.0,
                        budget.as_secs_f64(),
                        format!("timed out after {:.1}s", budget.as_secs_f64()),
                    ),
                };
                to_result(&agent_id, &test, outcome)
            });
            handles.push(handle);
        }

        futures::future::join_all(handles)
            .await
            .into_iter()
            .zip(tests)
            .map(|(joined, test)| match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(test_id = %test.id, error = %e, "test task aborted");
                    let outcome = TestOutcome::failed(0.0, 0.0, format!("test task aborted: {e}"));
                    to_result(agent_id, test, outcome)
                }
            })
            .collect()
    }

    async fn check_degradation(&self, benchmark: &mut AgentBenchmark) -> Result<()> {
        let Some(baseline) = self
            .baselines
            .get_baseline(&benchmark.agent_id)
            .await
            .map_err(FleetError::from_storage)?
        else {
            return Ok(());
        };

        benchmark.baseline_pass_rate = Some(baseline.pass_rate);
        benchmark.is_degraded =
            is_degraded(benchmark.pass_rate, baseline.pass_rate, self.degradation_factor);
        if benchmark.is_degraded {
            benchmark.degradation_p_value = two_proportion_p_value(
                baseline.pass_rate,
                baseline.sample_size,
                benchmark.pass_rate,
                benchmark.total_tests,
            );
            METRICS.inc_degradations();
            obs::emit_benchmark_degraded(
                &benchmark.id,
                &benchmark.agent_id,
                baseline.pass_rate,
                benchmark.pass_rate,
                benchmark.degradation_p_value,
            );
        }
        Ok(())
    }

    /// Raise the agent's baseline to this run's pass rate if it is higher.
    /// Returns whether the baseline changed.
    async fn raise_baseline(&self, benchmark: &AgentBenchmark) -> Result<bool> {
        for _ in 0..BASELINE_CAS_ATTEMPTS {
            let current = self
                .baselines
                .get_baseline(&benchmark.agent_id)
                .await
                .map_err(FleetError::from_storage)?;
            let expected = current.map(|b| b.pass_rate);
            if expected.is_some_and(|rate| benchmark.pass_rate <= rate) {
                return Ok(false);
            }

            let record = BaselineRecord {
                agent_id: benchmark.agent_id.clone(),
                pass_rate: benchmark.pass_rate,
                sample_size: benchmark.total_tests,
                benchmark_id: benchmark.id.clone(),
                updated_at: Utc::now(),
            };
            let swapped = self
                .baselines
                .compare_and_set_baseline(expected, record)
                .await
                .map_err(FleetError::from_storage)?;
            if swapped {
                obs::emit_baseline_updated(&benchmark.agent_id, expected, benchmark.pass_rate);
                return Ok(true);
            }
            debug!(agent_id = %benchmark.agent_id, "baseline changed concurrently, retrying");
        }
        Err(FleetError::Storage(fleet_state::StorageError::Backend(format!(
            "baseline for {} kept changing during update",
            benchmark.agent_id
        ))))
    }

    pub async fn baseline(&self, agent_id: &str) -> Result<Option<BaselineRecord>> {
        self.baselines
            .get_baseline(agent_id)
            .await
            .map_err(FleetError::from_storage)
    }

    /// Every stored baseline, one per agent.
    pub async fn list_baselines(&self) -> Result<Vec<BaselineRecord>> {
        self.baselines
            .list_baselines()
            .await
            .map_err(FleetError::from_storage)
    }

    pub async fn get_benchmark(&self, benchmark_id: &str) -> Result<AgentBenchmark> {
        self.benchmarks
            .get_benchmark(benchmark_id)
            .await
            .map_err(FleetError::from_storage)
    }

    /// Stored runs matching `filter`, newest first.
    pub async fn list_benchmarks(&self, filter: &BenchmarkFilter) -> Result<Vec<AgentBenchmark>> {
        self.benchmarks
            .list_benchmarks(filter)
            .await
            .map_err(FleetError::from_storage)
    }

    pub async fn delete_benchmark(&self, benchmark_id: &str) -> Result<()> {
        self.benchmarks
            .delete_benchmark(benchmark_id)
            .await
            .map_err(FleetError::from_storage)
    }

    pub async fn list_tests(&self, category: Option<BenchmarkCategory>) -> Result<Vec<BenchmarkTest>> {
        self.catalog
            .list_tests(category)
            .await
            .map_err(FleetError::from_storage)
    }

    pub async fn get_test(&self, test_id: &str) -> Result<BenchmarkTest> {
        self.catalog
            .get_test(test_id)
            .await
            .map_err(FleetError::from_storage)
    }

    /// Register a new catalog test. A taken id is an invalid request.
    pub async fn register_test(&self, test: BenchmarkTest) -> Result<BenchmarkTest> {
        if test.id.trim().is_empty() {
            return Err(FleetError::InvalidRequest("test id must not be empty".to_string()));
        }
        if test.max_score.is_nan() || test.max_score <= 0.0 {
            return Err(FleetError::InvalidRequest(format!(
                "max_score must be positive for test {}",
                test.id
            )));
        }
        self.catalog
            .register_test(test.clone())
            .await
            .map_err(FleetError::from_storage)?;
        Ok(test)
    }

    pub fn benchmark_store(&self) -> Arc<dyn BenchmarkStore> {
        Arc::clone(&self.benchmarks)
    }

    pub fn agent_source(&self) -> Arc<dyn AgentSource> {
        Arc::clone(&self.agents)
    }
}

/// Build the stored result for one outcome. Scores are clamped to [0, 1].
fn to_result(agent_id: &str, test: &BenchmarkTest, outcome: TestOutcome) -> TestResult {
    let score = if outcome.score.is_finite() {
        outcome.score.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let duration_seconds = if outcome.duration_seconds.is_finite() {
        outcome.duration_seconds.max(0.0)
    } else {
        0.0
    };

    let mut metrics = JsonMap::new();
    metrics.insert(
        "difficulty".to_string(),
        Value::String(test.difficulty.as_str().to_string()),
    );
    metrics.insert("agent_id".to_string(), Value::String(agent_id.to_string()));
    metrics.insert(
        "category".to_string(),
        Value::String(test.category.as_str().to_string()),
    );

    TestResult {
        test_id: test.id.clone(),
        test_name: test.name.clone(),
        passed: outcome.passed,
        score,
        duration_seconds,
        output: outcome.output,
        error: outcome.error,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{seed_standard_tests, standard_tests};
    use crate::domain::StaticAgentSource;
    use async_trait::async_trait;
    use fleet_state::fakes::{
        MemoryBaselineStore, MemoryBenchmarkStore, MemoryTestCatalog,
    };

    struct Scripted(fn(&BenchmarkTest) -> Result<TestOutcome>);

    #[async_trait]
    impl TestExecutor for Scripted {
        async fn execute_test(&self, _agent_id: &str, test: &BenchmarkTest) -> Result<TestOutcome> {
            (self.0)(test)
        }
    }

    async fn runner(script: fn(&BenchmarkTest) -> Result<TestOutcome>) -> BenchmarkRunner {
        let catalog = Arc::new(MemoryTestCatalog::new());
        seed_standard_tests(catalog.as_ref()).await.unwrap();
        BenchmarkRunner::new(
            catalog,
            Arc::new(MemoryBenchmarkStore::new()),
            Arc::new(MemoryBaselineStore::new()),
            Arc::new(StaticAgentSource::with_default_roster()),
            Arc::new(Scripted(script)),
        )
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let test = &standard_tests()[0];
        let high = to_result("a", test, TestOutcome::passed(1.7, 1.0));
        let low = to_result("a", test, TestOutcome::failed(-0.2, 1.0, "x"));
        let nan = to_result("a", test, TestOutcome::passed(f64::NAN, 1.0));
        assert_eq!(high.score, 1.0);
        assert_eq!(low.score, 0.0);
        assert_eq!(nan.score, 0.0);
        assert_eq!(high.metrics["difficulty"], "easy");
        assert_eq!(high.metrics["category"], "code_generation");
        assert_eq!(high.metrics["agent_id"], "a");
    }

    #[tokio::test]
    async fn explicit_ids_drop_unknown_and_keep_order() {
        let runner = runner(|_| Ok(TestOutcome::passed(1.0, 0.1))).await;
        let config = BenchmarkConfig::new("claude_code").with_test_ids(["qa_002", "nope", "code_001"]);
        let tests = runner.resolve_tests(&config).await.unwrap();
        let ids: Vec<&str> = tests.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["qa_002", "code_001"]);
    }

    #[tokio::test]
    async fn category_filter_selects_matching_tests() {
        let runner = runner(|_| Ok(TestOutcome::passed(1.0, 0.1))).await;
        let config = BenchmarkConfig::new("claude_code")
            .with_categories(vec![BenchmarkCategory::Qa, BenchmarkCategory::Reasoning]);
        let tests = runner.resolve_tests(&config).await.unwrap();
        assert_eq!(tests.len(), 3);
        assert!(tests.iter().all(|t| t.category != BenchmarkCategory::CodeGeneration));
    }

    #[tokio::test]
    async fn empty_selection_is_invalid() {
        let runner = runner(|_| Ok(TestOutcome::passed(1.0, 0.1))).await;
        let config = BenchmarkConfig::new("claude_code").with_test_ids(["missing"]);
        let err = runner.run(config).await.unwrap_err();
        assert!(matches!(err, FleetError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn non_positive_budget_is_invalid() {
        let runner = runner(|_| Ok(TestOutcome::passed(1.0, 0.1))).await;
        let err = runner
            .run(BenchmarkConfig::new("claude_code").with_max_duration(0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn executor_errors_become_failed_results() {
        let runner = runner(|t| {
            if t.category == BenchmarkCategory::Qa {
                Err(FleetError::ExecutionFailure("provider down".to_string()))
            } else {
                Ok(TestOutcome::passed(0.9, 0.5))
            }
        })
        .await;

        let run = runner.run(BenchmarkConfig::new("gemini_cli")).await.unwrap();
        assert_eq!(run.status, BenchmarkStatus::Completed);
        assert_eq!(run.total_tests, 6);
        assert_eq!(run.failed_tests, 2);
        let qa = run.test_results.iter().find(|r| r.test_id == "qa_001").unwrap();
        assert!(!qa.passed);
        assert!(qa.error.as_deref().unwrap().contains("provider down"));
    }

    #[tokio::test]
    async fn run_records_category_name_cost_and_digest() {
        let runner = runner(|_| Ok(TestOutcome::passed(0.8, 0.2))).await;
        let config = BenchmarkConfig::new("open_code").with_test_ids(["reason_001", "qa_001"]);
        let run = runner.run(config).await.unwrap();

        assert_eq!(run.category, BenchmarkCategory::Reasoning);
        assert_eq!(run.agent_name, "OpenCode");
        assert_eq!(run.estimated_cost_usd, Some(0.002));
        assert_eq!(run.total_tokens, Some(200));
        assert_eq!(run.suite_digest.len(), 64);
        assert!(run.completed_at.is_some());

        let stored = runner.get_benchmark(&run.id).await.unwrap();
        assert_eq!(stored, run);
    }

    #[tokio::test]
    async fn unknown_agent_name_falls_back_to_id() {
        let runner = runner(|_| Ok(TestOutcome::passed(0.8, 0.2))).await;
        let mut config = BenchmarkConfig::new("mystery_bot");
        config.enable_cost_tracking = false;
        let run = runner.run(config).await.unwrap();
        assert_eq!(run.agent_name, "mystery_bot");
        assert_eq!(run.estimated_cost_usd, None);
        assert_eq!(run.total_tokens, None);
    }

    #[tokio::test]
    async fn duplicate_registration_is_invalid() {
        let runner = runner(|_| Ok(TestOutcome::passed(1.0, 0.1))).await;
        let err = runner
            .register_test(standard_tests().remove(0))
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::InvalidRequest(_)));
    }
}
