//! Agent Fleet CLI
//!
//! The `fleet` command manages tasks and benchmark runs for a pool of agents.
//!
//! ## Commands
//!
//! - `task`: create, list, inspect, update, execute, cancel and delete tasks
//! - `bench`: run benchmarks, manage the test catalog, compare agents,
//!   build reports and rankings, list degradation alerts

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};

use fleet_core::config::FleetConfig;
use fleet_core::reporting::{render_report_md, write_report_json, write_report_md};
use fleet_core::{
    compare_agents, degradation_alerts, generate_report, rankings, seed_standard_tests,
    strategy_by_name, BenchmarkConfig, BenchmarkRunner, SimulatedExecutor, StaticAgentSource,
    TaskCreate, TaskEngine, TaskUpdate, METRICS,
};
use fleet_state::{
    BenchmarkCategory, BenchmarkFilter, BenchmarkTest, JsonMap, SurrealStore, TaskFilter,
    TaskPriority, TaskStatus,
};

#[derive(Parser)]
#[command(name = "fleet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Agent Fleet: task scheduling and benchmark regression tracking", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Path to a TOML config file
    #[arg(short, long, global = true, env = "FLEET_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for the simulated executor
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Run and analyse benchmarks
    Bench {
        #[command(subcommand)]
        action: BenchAction,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Create a task and assign it to an agent
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// low, medium, high or urgent
        #[arg(short, long, default_value = "medium")]
        priority: TaskPriority,

        /// Required skill; the first one also names a preferred agent id
        #[arg(short, long = "skill")]
        skills: Vec<String>,

        /// Context as a JSON object
        #[arg(long)]
        context: Option<String>,

        /// Accepted but not used for scheduling
        #[arg(long)]
        preferred_agent: Option<String>,
    },

    /// List tasks, newest first
    List {
        #[arg(long)]
        status: Option<TaskStatus>,

        #[arg(long)]
        agent: Option<String>,
    },

    /// Show one task
    Get { id: String },

    /// Change fields of a task
    Update {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        status: Option<TaskStatus>,

        #[arg(long)]
        priority: Option<TaskPriority>,

        #[arg(long)]
        agent: Option<String>,

        /// Result as a JSON object
        #[arg(long)]
        result: Option<String>,

        #[arg(long)]
        error: Option<String>,
    },

    /// Execute a task on its assigned agent
    Execute { id: String },

    /// Cancel a task
    Cancel { id: String },

    /// Delete a task
    Delete { id: String },
}

#[derive(Subcommand)]
enum BenchAction {
    /// List catalog tests
    Tests {
        #[arg(long)]
        category: Option<BenchmarkCategory>,
    },

    /// Register a catalog test from a JSON file
    Register {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Benchmark one agent
    Run {
        #[arg(short, long)]
        agent: String,

        #[arg(long)]
        agent_version: Option<String>,

        /// Catalog test id to run (repeatable)
        #[arg(short, long = "test")]
        tests: Vec<String>,

        /// Category filter when no test ids are given (repeatable)
        #[arg(long = "category")]
        categories: Vec<BenchmarkCategory>,

        /// JSON file with an array of extra tests
        #[arg(long)]
        custom: Option<PathBuf>,

        /// Per-test budget in seconds (default from config)
        #[arg(long)]
        max_duration: Option<f64>,

        #[arg(long)]
        no_cost: bool,

        #[arg(long)]
        no_degradation_check: bool,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List benchmark runs, newest first
    List {
        #[arg(long)]
        agent: Option<String>,

        #[arg(long)]
        category: Option<BenchmarkCategory>,
    },

    /// Show one benchmark run
    Get { id: String },

    /// Delete a benchmark run
    Delete { id: String },

    /// Compare the latest completed runs of two agents
    Compare {
        agent_1: String,
        agent_2: String,

        #[arg(long)]
        category: BenchmarkCategory,
    },

    /// Build a multi-agent report
    Report {
        #[arg(long)]
        category: Option<BenchmarkCategory>,

        /// Print Markdown instead of JSON
        #[arg(long)]
        markdown: bool,

        /// Also write the report to this path (.md for Markdown, else JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the top agents
    Rankings {
        #[arg(long)]
        category: Option<BenchmarkCategory>,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// List degradation alerts
    Alerts,

    /// Show the best pass rate recorded for each agent
    Baselines,
}

/// Engines wired to the configured store, roster and executor.
struct App {
    config: FleetConfig,
    tasks: TaskEngine,
    runner: BenchmarkRunner,
}

impl App {
    async fn build(config: FleetConfig, seed: Option<u64>) -> Result<Self> {
        let store = Arc::new(
            SurrealStore::from_env()
                .await
                .context("Failed to connect to fleet database")?,
        );
        let added = seed_standard_tests(store.as_ref())
            .await
            .context("Failed to seed standard benchmark tests")?;
        if added > 0 {
            info!(added, "seeded standard benchmark tests");
        }

        let agents = Arc::new(StaticAgentSource::new(config.agents.clone()));
        let executor = Arc::new(SimulatedExecutor::new(seed));
        let strategy = strategy_by_name(&config.scheduler.strategy)
            .ok_or_else(|| anyhow!("unknown scheduler strategy: {}", config.scheduler.strategy))?;
        let timeout = Duration::try_from_secs_f64(config.task.execution_timeout_seconds)
            .context("Invalid task.execution_timeout_seconds")?;

        let tasks = TaskEngine::new(store.clone(), agents.clone(), executor.clone())
            .with_strategy(strategy)
            .with_execution_timeout(timeout);
        let runner = BenchmarkRunner::new(store.clone(), store.clone(), store, agents, executor)
            .with_cost_model(Arc::new(config.cost_model()))
            .with_degradation_factor(config.benchmark.degradation_factor)
            .with_max_concurrency(config.benchmark.max_concurrency);

        debug!(strategy = tasks.strategy_name(), "engines ready");
        Ok(Self {
            config,
            tasks,
            runner,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    fleet_core::init_tracing(cli.json, fleet_core::telemetry::level_for(cli.verbose));

    let config = FleetConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    let app = App::build(config, cli.seed).await?;

    let outcome = match cli.command {
        Commands::Task { action } => cmd_task(&app, action).await,
        Commands::Bench { action } => cmd_bench(&app, action).await,
    };
    METRICS.flush();
    outcome
}

async fn cmd_task(app: &App, action: TaskAction) -> Result<()> {
    match action {
        TaskAction::Create {
            title,
            description,
            priority,
            skills,
            context,
            preferred_agent,
        } => {
            let request = TaskCreate {
                title,
                description,
                priority,
                skill_requirements: skills,
                context: parse_object(context.as_deref(), "context")?.unwrap_or_default(),
                preferred_agent_id: preferred_agent,
            };
            let task = app.tasks.create(request).await.context("Failed to create task")?;
            print_json(&task)
        }
        TaskAction::List { status, agent } => {
            let filter = TaskFilter {
                status,
                agent_id: agent,
            };
            print_json(&app.tasks.list(&filter).await?)
        }
        TaskAction::Get { id } => print_json(&app.tasks.get(&id).await?),
        TaskAction::Update {
            id,
            title,
            description,
            status,
            priority,
            agent,
            result,
            error,
        } => {
            let update = TaskUpdate {
                title,
                description,
                status,
                priority,
                agent_id: agent,
                result: parse_object(result.as_deref(), "result")?,
                error,
            };
            let task = app
                .tasks
                .update(&id, update)
                .await
                .with_context(|| format!("Failed to update task {id}"))?;
            print_json(&task)
        }
        TaskAction::Execute { id } => {
            let outcome = app
                .tasks
                .execute(&id)
                .await
                .with_context(|| format!("Failed to execute task {id}"))?;
            print_json(&outcome)
        }
        TaskAction::Cancel { id } => print_json(&app.tasks.cancel(&id).await?),
        TaskAction::Delete { id } => {
            app.tasks.delete(&id).await?;
            println!("Deleted task {id}");
            Ok(())
        }
    }
}

async fn cmd_bench(app: &App, action: BenchAction) -> Result<()> {
    let store = app.runner.benchmark_store();
    match action {
        BenchAction::Tests { category } => print_json(&app.runner.list_tests(category).await?),
        BenchAction::Register { file } => {
            let test: BenchmarkTest = read_json(&file)?;
            let test = app
                .runner
                .register_test(test)
                .await
                .context("Failed to register benchmark test")?;
            print_json(&test)
        }
        BenchAction::Run {
            agent,
            agent_version,
            tests,
            categories,
            custom,
            max_duration,
            no_cost,
            no_degradation_check,
            notes,
            tags,
        } => {
            let custom_tests: Vec<BenchmarkTest> = match custom {
                Some(path) => read_json(&path)?,
                None => Vec::new(),
            };
            let config = BenchmarkConfig {
                agent_id: agent,
                agent_version,
                test_ids: tests,
                categories,
                custom_tests,
                max_duration_seconds: max_duration
                    .unwrap_or(app.config.benchmark.default_max_duration_seconds),
                enable_cost_tracking: !no_cost,
                enable_degradation_check: !no_degradation_check,
                notes,
                tags,
            };
            let run = app.runner.run(config).await.context("Benchmark run failed")?;
            print_json(&run)
        }
        BenchAction::List { agent, category } => {
            let filter = BenchmarkFilter {
                agent_id: agent,
                category,
            };
            print_json(&app.runner.list_benchmarks(&filter).await?)
        }
        BenchAction::Get { id } => print_json(&app.runner.get_benchmark(&id).await?),
        BenchAction::Delete { id } => {
            app.runner.delete_benchmark(&id).await?;
            println!("Deleted benchmark {id}");
            Ok(())
        }
        BenchAction::Compare {
            agent_1,
            agent_2,
            category,
        } => {
            let comparison = compare_agents(store.as_ref(), &agent_1, &agent_2, category)
                .await
                .with_context(|| format!("Failed to compare {agent_1} and {agent_2}"))?;
            print_json(&comparison)
        }
        BenchAction::Report {
            category,
            markdown,
            output,
        } => {
            let report = generate_report(store.as_ref(), category, &app.config.reporting)
                .await
                .context("Failed to build report")?;
            if let Some(path) = output {
                if path.extension().is_some_and(|ext| ext == "md") {
                    write_report_md(&path, &report)?;
                } else {
                    write_report_json(&path, &report)?;
                }
                info!(path = %path.display(), "report written");
            }
            if markdown {
                print!("{}", render_report_md(&report));
                Ok(())
            } else {
                print_json(&report)
            }
        }
        BenchAction::Rankings { category, limit } => {
            print_json(&rankings(store.as_ref(), category, limit).await?)
        }
        BenchAction::Alerts => print_json(&degradation_alerts(store.as_ref()).await?),
        BenchAction::Baselines => print_json(&app.runner.list_baselines().await?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn parse_object(raw: Option<&str>, what: &str) -> Result<Option<JsonMap>> {
    raw.map(|s| {
        serde_json::from_str::<JsonMap>(s)
            .with_context(|| format!("{what} must be a JSON object"))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_task_create_with_skills_and_priority() {
        let cli = Cli::try_parse_from([
            "fleet", "task", "create", "--title", "Fix bug", "-s", "gemini_cli", "-s", "rust",
            "--priority", "urgent",
        ])
        .unwrap();
        match cli.command {
            Commands::Task {
                action:
                    TaskAction::Create {
                        title,
                        skills,
                        priority,
                        ..
                    },
            } => {
                assert_eq!(title, "Fix bug");
                assert_eq!(skills, vec!["gemini_cli", "rust"]);
                assert_eq!(priority, TaskPriority::Urgent);
            }
            _ => panic!("expected task create"),
        }
    }

    #[test]
    fn parses_bench_run_filters() {
        let cli = Cli::try_parse_from([
            "fleet", "--seed", "7", "bench", "run", "--agent", "claude_code", "--category", "qa",
            "--category", "reasoning", "--no-cost",
        ])
        .unwrap();
        assert_eq!(cli.seed, Some(7));
        match cli.command {
            Commands::Bench {
                action:
                    BenchAction::Run {
                        agent,
                        categories,
                        no_cost,
                        ..
                    },
            } => {
                assert_eq!(agent, "claude_code");
                assert_eq!(
                    categories,
                    vec![BenchmarkCategory::Qa, BenchmarkCategory::Reasoning]
                );
                assert!(no_cost);
            }
            _ => panic!("expected bench run"),
        }
    }

    #[test]
    fn parses_bench_baselines() {
        let cli = Cli::try_parse_from(["fleet", "bench", "baselines"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Bench {
                action: BenchAction::Baselines
            }
        ));
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(Cli::try_parse_from(["fleet", "task", "list", "--status", "done"]).is_err());
    }

    #[test]
    fn parse_object_requires_an_object() {
        assert!(parse_object(Some(r#"{"a": 1}"#), "context").unwrap().is_some());
        assert!(parse_object(Some("[1, 2]"), "context").is_err());
        assert!(parse_object(None, "context").unwrap().is_none());
    }

    #[test]
    fn read_json_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.json");
        std::fs::write(&path, "not json").unwrap();
        let err = read_json::<BenchmarkTest>(&path).unwrap_err();
        assert!(format!("{err:#}").contains("test.json"));
    }
}
