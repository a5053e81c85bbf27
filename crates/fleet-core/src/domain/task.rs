//! Task requests and execution outcomes.

use chrono::{DateTime, Utc};
use fleet_state::{JsonMap, TaskPriority, TaskStatus};
use serde::{Deserialize, Serialize};

/// Request to create a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    /// First entry is treated as an agent id hint by the default scheduler.
    #[serde(default)]
    pub skill_requirements: Vec<String>,
    #[serde(default)]
    pub context: JsonMap,
    /// Accepted for wire compatibility; scheduling does not consult it.
    #[serde(default)]
    pub preferred_agent_id: Option<String>,
}

impl TaskCreate {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skill_requirements = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// Partial update. Only `Some` fields change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub result: Option<JsonMap>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Outcome of executing a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskExecutionResult {
    pub task_id: String,
    /// `"unknown"` when the task had no assigned agent.
    pub agent_id: String,
    pub status: TaskStatus,
    pub result: Option<JsonMap>,
    pub error: Option<String>,
    pub duration_seconds: f64,
    pub timestamp: DateTime<Utc>,
}
