//! Fleet configuration.
//!
//! Loaded from a TOML file when one is given, otherwise defaults. A few
//! environment variables override individual values after the file is read.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cost::FlatRateCostModel;
use crate::degradation::DEFAULT_DEGRADATION_FACTOR;
use crate::domain::{default_roster, Agent, FleetError, Result};
use crate::scheduler::HintThenFirstActive;

/// Path of the config file when `--config` is not given.
pub const CONFIG_ENV: &str = "FLEET_CONFIG";
pub const MAX_CONCURRENCY_ENV: &str = "FLEET_MAX_CONCURRENCY";
pub const DEGRADATION_FACTOR_ENV: &str = "FLEET_DEGRADATION_FACTOR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub scheduler: SchedulerConfig,
    pub benchmark: BenchmarkSettings,
    pub reporting: ReportingConfig,
    pub task: TaskConfig,
    pub agents: Vec<Agent>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            benchmark: BenchmarkSettings::default(),
            reporting: ReportingConfig::default(),
            task: TaskConfig::default(),
            agents: default_roster(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub strategy: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            strategy: HintThenFirstActive::NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkSettings {
    pub degradation_factor: f64,
    pub max_concurrency: usize,
    pub default_max_duration_seconds: f64,
    pub cost_per_test_usd: f64,
    pub tokens_per_test: u64,
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self {
            degradation_factor: DEFAULT_DEGRADATION_FACTOR,
            max_concurrency: 4,
            default_max_duration_seconds: 300.0,
            cost_per_test_usd: FlatRateCostModel::DEFAULT_USD_PER_TEST,
            tokens_per_test: FlatRateCostModel::DEFAULT_TOKENS_PER_TEST,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Top mean score below this triggers the prompt-tuning recommendation.
    pub low_score_threshold: f64,
    /// Mean response time above this triggers the caching recommendation.
    pub slow_response_seconds: f64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            low_score_threshold: 0.8,
            slow_response_seconds: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub execution_timeout_seconds: f64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            execution_timeout_seconds: 300.0,
        }
    }
}

impl FleetConfig {
    /// Parse TOML and validate.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| FleetError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else from `$FLEET_CONFIG` if set, else
    /// defaults; then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV).ok();
        let path = path.or(env_path.as_deref().map(Path::new));

        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    FleetError::Config(format!("read {}: {}", path.display(), e))
                })?;
                toml::from_str(&content).map_err(|e| FleetError::Config(e.to_string()))?
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `FLEET_MAX_CONCURRENCY` and `FLEET_DEGRADATION_FACTOR` as
    /// returned by `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(MAX_CONCURRENCY_ENV) {
            self.benchmark.max_concurrency = raw.trim().parse().map_err(|_| {
                FleetError::Config(format!("{MAX_CONCURRENCY_ENV} is not an integer: {raw}"))
            })?;
        }
        if let Some(raw) = lookup(DEGRADATION_FACTOR_ENV) {
            self.benchmark.degradation_factor = raw.trim().parse().map_err(|_| {
                FleetError::Config(format!("{DEGRADATION_FACTOR_ENV} is not a number: {raw}"))
            })?;
        }
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.benchmark.max_concurrency == 0 {
            errors.push("benchmark.max_concurrency must be greater than 0");
        }
        let factor = self.benchmark.degradation_factor;
        if !(factor > 0.0 && factor <= 1.0) {
            errors.push("benchmark.degradation_factor must be in (0, 1]");
        }
        if self.benchmark.default_max_duration_seconds <= 0.0 {
            errors.push("benchmark.default_max_duration_seconds must be positive");
        }
        if self.benchmark.cost_per_test_usd < 0.0 {
            errors.push("benchmark.cost_per_test_usd must not be negative");
        }
        if self.task.execution_timeout_seconds <= 0.0 {
            errors.push("task.execution_timeout_seconds must be positive");
        }
        if !(0.0..=1.0).contains(&self.reporting.low_score_threshold) {
            errors.push("reporting.low_score_threshold must be between 0.0 and 1.0");
        }
        if crate::scheduler::strategy_by_name(&self.scheduler.strategy).is_none() {
            errors.push("scheduler.strategy is not a known strategy");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FleetError::Config(errors.join("; ")))
        }
    }

    pub fn cost_model(&self) -> FlatRateCostModel {
        FlatRateCostModel::new(self.benchmark.cost_per_test_usd, self.benchmark.tokens_per_test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = FleetConfig::default();
        config.validate().unwrap();
        assert_eq!(config.benchmark.max_concurrency, 4);
        assert_eq!(config.benchmark.degradation_factor, 0.95);
        assert_eq!(config.agents.len(), 4);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = FleetConfig::from_toml_str(
            r#"
            [benchmark]
            max_concurrency = 1

            [reporting]
            slow_response_seconds = 5.0

            [[agents]]
            id = "local_llm"
            name = "Local LLM"
            status = "busy"
            "#,
        )
        .unwrap();

        assert_eq!(config.benchmark.max_concurrency, 1);
        assert_eq!(config.benchmark.degradation_factor, 0.95);
        assert_eq!(config.reporting.slow_response_seconds, 5.0);
        assert_eq!(config.reporting.low_score_threshold, 0.8);
        assert_eq!(config.agents.len(), 1);
        assert_eq!(config.agents[0].id, "local_llm");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = FleetConfig::default();
        config.benchmark.max_concurrency = 0;
        config.benchmark.degradation_factor = 1.5;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_concurrency"));
        assert!(err.contains("degradation_factor"));

        let mut config = FleetConfig::default();
        config.benchmark.degradation_factor = 0.0;
        assert!(config.validate().is_err());

        let mut config = FleetConfig::default();
        config.scheduler.strategy = "random".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            (MAX_CONCURRENCY_ENV, "8"),
            (DEGRADATION_FACTOR_ENV, "0.9"),
        ]
        .into_iter()
        .collect();

        let mut config = FleetConfig::default();
        config
            .apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.benchmark.max_concurrency, 8);
        assert_eq!(config.benchmark.degradation_factor, 0.9);
    }

    #[test]
    fn malformed_env_override_is_a_config_error() {
        let mut config = FleetConfig::default();
        let err = config
            .apply_env_overrides(|k| (k == MAX_CONCURRENCY_ENV).then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, FleetError::Config(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.toml");
        std::fs::write(&path, "[task]\nexecution_timeout_seconds = 12.5\n").unwrap();

        let config = FleetConfig::load(Some(&path)).unwrap();
        assert_eq!(config.task.execution_timeout_seconds, 12.5);
    }

    #[test]
    fn load_missing_file_fails() {
        let err = FleetConfig::load(Some(Path::new("/nonexistent/fleet.toml"))).unwrap_err();
        assert!(matches!(err, FleetError::Config(_)));
    }
}
