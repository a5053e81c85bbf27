//! Task lifecycle: create, schedule, transition, execute.
//!
//! States move `pending -> running -> {completed, failed, cancelled}` and
//! never return to `pending`. All writes to one task id are serialised by a
//! per-id async lock held across the read, the transition and the write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fleet_state::{JsonMap, Task, TaskFilter, TaskStatus, TaskStore};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

use crate::domain::{
    Agent, AgentSource, FleetError, Result, TaskCreate, TaskExecutionResult, TaskUpdate,
};
use crate::execution::TaskExecutor;
use crate::metrics::METRICS;
use crate::obs;
use crate::scheduler::{HintThenFirstActive, SchedulingStrategy};

/// Error recorded on a task whose agent is missing or not active.
pub const AGENT_NOT_AVAILABLE: &str = "Agent not available";

/// Default budget for one task execution.
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(300);

/// One async mutex per key, created on first use.
#[derive(Debug, Default)]
pub(crate) struct KeyedLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    pub(crate) async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self
                .inner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            map.entry(key.to_string()).or_default().clone()
        };
        mutex.lock_owned().await
    }

    pub(crate) fn forget(&self, key: &str) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
    }
}

/// Move `task` to `status` at `now`, keeping the timestamp rules.
///
/// `started_at` is set the first time the task enters `running`.
/// `completed_at` is set the first time it enters a terminal state, and
/// `duration_seconds` follows from it when `started_at` is known.
/// Returns the previous status.
pub fn transition(task: &mut Task, status: TaskStatus, now: DateTime<Utc>) -> Result<TaskStatus> {
    let from = task.status;
    if status == TaskStatus::Pending && from != TaskStatus::Pending {
        return Err(FleetError::InvalidRequest(format!(
            "task {} cannot move from {} back to pending",
            task.id, from
        )));
    }
    if status == TaskStatus::Running && from.is_terminal() {
        return Err(FleetError::InvalidRequest(format!(
            "task {} is already {}",
            task.id, from
        )));
    }

    task.status = status;
    if status == TaskStatus::Running && task.started_at.is_none() {
        task.started_at = Some(now);
    }
    if status.is_terminal() {
        let completed = *task.completed_at.get_or_insert(now);
        if let Some(started) = task.started_at {
            let millis = (completed - started).num_milliseconds().max(0);
            task.duration_seconds = Some(millis as f64 / 1000.0);
        }
    }
    Ok(from)
}

/// Merge `update` into `task`. Only supplied fields change.
pub fn apply_update(task: &mut Task, update: TaskUpdate, now: DateTime<Utc>) -> Result<()> {
    if let Some(status) = update.status {
        transition(task, status, now)?;
    }
    if let Some(title) = update.title {
        task.title = title;
    }
    if let Some(description) = update.description {
        task.description = Some(description);
    }
    if let Some(priority) = update.priority {
        task.priority = priority;
    }
    if let Some(agent_id) = update.agent_id {
        task.agent_id = Some(agent_id);
    }
    if let Some(result) = update.result {
        task.result = Some(result);
    }
    if let Some(error) = update.error {
        task.error = Some(error);
    }
    Ok(())
}

/// Creates, schedules and executes tasks against an injected store,
/// agent source, scheduling policy and executor.
pub struct TaskEngine {
    store: Arc<dyn TaskStore>,
    agents: Arc<dyn AgentSource>,
    strategy: Arc<dyn SchedulingStrategy>,
    executor: Arc<dyn TaskExecutor>,
    execution_timeout: Duration,
    locks: KeyedLocks,
}

impl TaskEngine {
    pub fn new(
        store: Arc<dyn TaskStore>,
        agents: Arc<dyn AgentSource>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        Self {
            store,
            agents,
            strategy: Arc::new(HintThenFirstActive),
            executor,
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
            locks: KeyedLocks::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn SchedulingStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Create a pending task and assign it an agent if the strategy finds one.
    pub async fn create(&self, request: TaskCreate) -> Result<Task> {
        if request.title.trim().is_empty() {
            return Err(FleetError::InvalidRequest(
                "task title must not be empty".to_string(),
            ));
        }

        let mut task = Task::new(request.title);
        task.description = request.description;
        task.priority = request.priority;
        task.skill_requirements = request.skill_requirements;
        task.context = request.context;

        let candidates = self.agents.list_agents(None).await?;
        match self.strategy.select(&task, &candidates) {
            Some(agent) => {
                task.agent_id = Some(agent.id.clone());
                task.assigned_agent = Some(agent.name.clone());
            }
            None => debug!(task_id = %task.id, "no active agent; task left unassigned"),
        }

        self.store
            .insert_task(&task)
            .await
            .map_err(FleetError::from_storage)?;

        METRICS.inc_tasks_created();
        obs::emit_task_created(&task.id, task.agent_id.as_deref());
        Ok(task)
    }

    pub async fn get(&self, task_id: &str) -> Result<Task> {
        self.store
            .get_task(task_id)
            .await
            .map_err(FleetError::from_storage)
    }

    /// Tasks matching `filter`, newest first.
    pub async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        self.store
            .list_tasks(filter)
            .await
            .map_err(FleetError::from_storage)
    }

    /// Apply a partial update.
    pub async fn update(&self, task_id: &str, update: TaskUpdate) -> Result<Task> {
        let _guard = self.locks.lock(task_id).await;
        let mut task = self.get(task_id).await?;
        let from = task.status;

        let agent_changed = update.agent_id.is_some();
        apply_update(&mut task, update, Utc::now())?;
        if agent_changed {
            task.assigned_agent = match task.agent_id.as_deref() {
                Some(id) => self.agents.get_agent(id).await?.map(|a| a.name),
                None => None,
            };
        }

        self.persist(&task).await?;
        if from != task.status {
            obs::emit_task_transition(&task.id, from, task.status);
        }
        Ok(task)
    }

    /// Cancel a task. A task already in a terminal state is returned as is.
    pub async fn cancel(&self, task_id: &str) -> Result<Task> {
        let _guard = self.locks.lock(task_id).await;
        let mut task = self.get(task_id).await?;
        if task.status.is_terminal() {
            debug!(task_id = %task_id, status = %task.status, "cancel ignored for terminal task");
            return Ok(task);
        }

        let from = transition(&mut task, TaskStatus::Cancelled, Utc::now())?;
        self.persist(&task).await?;
        obs::emit_task_transition(&task.id, from, task.status);
        Ok(task)
    }

    pub async fn delete(&self, task_id: &str) -> Result<()> {
        let guard = self.locks.lock(task_id).await;
        self.store
            .delete_task(task_id)
            .await
            .map_err(FleetError::from_storage)?;
        drop(guard);
        self.locks.forget(task_id);
        Ok(())
    }

    /// Run a task on its assigned agent.
    ///
    /// The task enters `running` first. A missing or inactive agent, an
    /// executor error and a timeout all end in `failed` with the reason in
    /// `error`; they are reported in the returned result, not as `Err`.
    pub async fn execute(&self, task_id: &str) -> Result<TaskExecutionResult> {
        let _guard = self.locks.lock(task_id).await;
        let mut task = self.get(task_id).await?;
        if task.status.is_terminal() {
            return Err(FleetError::InvalidRequest(format!(
                "task {} is already {}",
                task.id, task.status
            )));
        }

        let agent = match task.agent_id.as_deref() {
            Some(id) => self.agents.get_agent(id).await?,
            None => None,
        };

        let from = transition(&mut task, TaskStatus::Running, Utc::now())?;
        self.persist(&task).await?;
        if from != TaskStatus::Running {
            obs::emit_task_transition(&task.id, from, TaskStatus::Running);
        }

        let started = Instant::now();
        let outcome = match agent.filter(Agent::is_active) {
            None => Err(AGENT_NOT_AVAILABLE.to_string()),
            Some(agent) => self.run_executor(&agent, &task).await,
        };

        let now = Utc::now();
        match outcome {
            Ok(result) => {
                transition(&mut task, TaskStatus::Completed, now)?;
                task.result = Some(result);
            }
            Err(error) => {
                warn!(task_id = %task.id, error = %error, "task execution failed");
                transition(&mut task, TaskStatus::Failed, now)?;
                task.error = Some(error);
                METRICS.inc_tasks_failed();
            }
        }
        self.persist(&task).await?;

        let duration_seconds = task
            .duration_seconds
            .unwrap_or_else(|| started.elapsed().as_secs_f64());
        METRICS.inc_tasks_executed();
        obs::emit_task_transition(&task.id, TaskStatus::Running, task.status);
        obs::emit_task_executed(&task.id, task.status, duration_seconds);

        Ok(TaskExecutionResult {
            task_id: task.id.clone(),
            agent_id: task.agent_id.clone().unwrap_or_else(|| "unknown".to_string()),
            status: task.status,
            result: task.result.clone(),
            error: task.error.clone(),
            duration_seconds,
            timestamp: now,
        })
    }

    async fn run_executor(&self, agent: &Agent, task: &Task) -> std::result::Result<JsonMap, String> {
        let call = self.executor.execute_task(agent, task);
        match tokio::time::timeout(self.execution_timeout, call).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "execution timed out after {:.1}s",
                self.execution_timeout.as_secs_f64()
            )),
        }
    }

    async fn persist(&self, task: &Task) -> Result<()> {
        self.store
            .update_task(task)
            .await
            .map_err(FleetError::from_storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn running_sets_started_once() {
        let mut task = Task::new("t");
        transition(&mut task, TaskStatus::Running, at(0)).unwrap();
        transition(&mut task, TaskStatus::Running, at(5)).unwrap();
        assert_eq!(task.started_at, Some(at(0)));
    }

    #[test]
    fn terminal_sets_completed_and_duration() {
        let mut task = Task::new("t");
        transition(&mut task, TaskStatus::Running, at(0)).unwrap();
        transition(&mut task, TaskStatus::Completed, at(3)).unwrap();
        assert_eq!(task.completed_at, Some(at(3)));
        assert_eq!(task.duration_seconds, Some(3.0));
        assert!(task.completed_at >= task.started_at);
    }

    #[test]
    fn reentering_terminal_keeps_completed_at() {
        let mut task = Task::new("t");
        transition(&mut task, TaskStatus::Running, at(0)).unwrap();
        transition(&mut task, TaskStatus::Failed, at(2)).unwrap();
        transition(&mut task, TaskStatus::Completed, at(9)).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.completed_at, Some(at(2)));
        assert_eq!(task.duration_seconds, Some(2.0));
    }

    #[test]
    fn terminal_without_start_has_no_duration() {
        let mut task = Task::new("t");
        transition(&mut task, TaskStatus::Cancelled, at(1)).unwrap();
        assert_eq!(task.completed_at, Some(at(1)));
        assert_eq!(task.started_at, None);
        assert_eq!(task.duration_seconds, None);
    }

    #[test]
    fn no_path_back_to_pending() {
        let mut task = Task::new("t");
        transition(&mut task, TaskStatus::Pending, at(0)).unwrap();
        transition(&mut task, TaskStatus::Running, at(0)).unwrap();
        let err = transition(&mut task, TaskStatus::Pending, at(1)).unwrap_err();
        assert!(matches!(err, FleetError::InvalidRequest(_)));
        assert_eq!(task.status, TaskStatus::Running);
    }

    #[test]
    fn terminal_task_cannot_restart() {
        let mut task = Task::new("t");
        transition(&mut task, TaskStatus::Completed, at(0)).unwrap();
        assert!(transition(&mut task, TaskStatus::Running, at(1)).is_err());
    }

    #[test]
    fn partial_update_touches_only_given_fields() {
        let mut task = Task::new("original");
        task.description = Some("keep me".to_string());
        let update = TaskUpdate {
            title: Some("renamed".to_string()),
            error: Some("oops".to_string()),
            ..Default::default()
        };
        apply_update(&mut task, update, Utc::now()).unwrap();
        assert_eq!(task.title, "renamed");
        assert_eq!(task.description.as_deref(), Some("keep me"));
        assert_eq!(task.error.as_deref(), Some("oops"));
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn sub_second_durations_are_kept() {
        let mut task = Task::new("t");
        transition(&mut task, TaskStatus::Running, at(0)).unwrap();
        let done = at(0) + ChronoDuration::milliseconds(250);
        transition(&mut task, TaskStatus::Completed, done).unwrap();
        assert_eq!(task.duration_seconds, Some(0.25));
    }

    #[tokio::test]
    async fn keyed_locks_serialise_same_key() {
        let locks = KeyedLocks::default();
        let guard = locks.lock("a").await;
        let other = tokio::time::timeout(Duration::from_millis(20), locks.lock("a")).await;
        assert!(other.is_err());
        let different = tokio::time::timeout(Duration::from_millis(20), locks.lock("b")).await;
        assert!(different.is_ok());
        drop(guard);
        locks.lock("a").await;
    }
}
