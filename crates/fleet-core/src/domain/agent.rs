//! Agents and the source the engines read them from.
//!
//! The fleet does not own agent records. It reads them through
//! [`AgentSource`], which a deployment backs with whatever registry it has.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::Result;

/// Availability of an agent at the moment it is observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Active,
    Inactive,
    Busy,
    Error,
}

impl std::str::FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "busy" => Ok(Self::Busy),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown agent status: {other}")),
        }
    }
}

/// Kind of agent. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    #[default]
    AiAgent,
    Editor,
    Assistant,
    Automation,
}

/// A worker tasks can be assigned to and benchmarks run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: AgentKind,
    #[serde(default)]
    pub status: AgentStatus,
    /// Capability tags
    #[serde(default)]
    pub skills: Vec<String>,
}

impl Agent {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            skills: vec![id.clone()],
            id,
            name: name.into(),
            kind: AgentKind::default(),
            status: AgentStatus::Active,
        }
    }

    pub fn with_kind(mut self, kind: AgentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }
}

/// The four agents every fresh fleet starts with.
pub fn default_roster() -> Vec<Agent> {
    vec![
        Agent::new("claude_code", "Claude Code").with_kind(AgentKind::AiAgent),
        Agent::new("gemini_cli", "Gemini CLI").with_kind(AgentKind::AiAgent),
        Agent::new("open_code", "OpenCode").with_kind(AgentKind::Editor),
        Agent::new("codebuddy", "CodeBuddy").with_kind(AgentKind::Assistant),
    ]
}

/// Read-only view of the agent registry.
#[async_trait]
pub trait AgentSource: Send + Sync {
    /// List agents in registry order, optionally restricted to one status.
    async fn list_agents(&self, status: Option<AgentStatus>) -> Result<Vec<Agent>>;

    /// Look up a single agent by id.
    async fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>> {
        Ok(self
            .list_agents(None)
            .await?
            .into_iter()
            .find(|a| a.id == agent_id))
    }
}

/// Fixed in-process agent list.
///
/// Status changes go through [`StaticAgentSource::set_status`] so tests can
/// flip availability between calls.
#[derive(Debug, Default)]
pub struct StaticAgentSource {
    agents: std::sync::RwLock<Vec<Agent>>,
}

impl StaticAgentSource {
    pub fn new(agents: Vec<Agent>) -> Self {
        Self {
            agents: std::sync::RwLock::new(agents),
        }
    }

    /// Source holding [`default_roster`].
    pub fn with_default_roster() -> Self {
        Self::new(default_roster())
    }

    /// Change an agent's status. Returns `false` if the id is unknown.
    pub fn set_status(&self, agent_id: &str, status: AgentStatus) -> bool {
        let mut agents = self
            .agents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match agents.iter_mut().find(|a| a.id == agent_id) {
            Some(agent) => {
                agent.status = status;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl AgentSource for StaticAgentSource {
    async fn list_agents(&self, status: Option<AgentStatus>) -> Result<Vec<Agent>> {
        let agents = self
            .agents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(agents
            .iter()
            .filter(|a| status.map(|s| a.status == s).unwrap_or(true))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_roster_is_all_active() {
        let roster = default_roster();
        let ids: Vec<&str> = roster.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["claude_code", "gemini_cli", "open_code", "codebuddy"]);
        assert!(roster.iter().all(Agent::is_active));
        assert_eq!(roster[2].kind, AgentKind::Editor);
    }

    #[tokio::test]
    async fn static_source_filters_by_status() {
        let source = StaticAgentSource::with_default_roster();
        assert!(source.set_status("gemini_cli", AgentStatus::Busy));
        assert!(!source.set_status("nobody", AgentStatus::Busy));

        let active = source.list_agents(Some(AgentStatus::Active)).await.unwrap();
        assert_eq!(active.len(), 3);
        assert!(active.iter().all(|a| a.id != "gemini_cli"));

        let busy = source.get_agent("gemini_cli").await.unwrap().unwrap();
        assert_eq!(busy.status, AgentStatus::Busy);
        assert!(source.get_agent("ghost").await.unwrap().is_none());
    }

    #[test]
    fn agent_deserializes_with_defaults() {
        let agent: Agent =
            serde_json::from_value(serde_json::json!({"id": "bot", "name": "Bot"})).unwrap();
        assert_eq!(agent.status, AgentStatus::Active);
        assert_eq!(agent.kind, AgentKind::AiAgent);
        assert!(agent.skills.is_empty());
    }
}
