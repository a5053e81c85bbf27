//! Agent selection for new tasks.
//!
//! Scheduling is a pure decision over the task and the live agent list. The
//! task engine holds an `Arc<dyn SchedulingStrategy>` so deployments can swap
//! policies without touching lifecycle code.

use fleet_state::Task;

use crate::domain::Agent;

/// Picks the agent a new task is assigned to.
pub trait SchedulingStrategy: Send + Sync {
    /// Stable policy name, as used in configuration.
    fn name(&self) -> &'static str;

    /// Select an agent from `candidates`, or `None` to leave the task
    /// unassigned. Must not fail and must not have side effects.
    fn select<'a>(&self, task: &Task, candidates: &'a [Agent]) -> Option<&'a Agent>;
}

/// Default policy.
///
/// 1. The first skill requirement is read as an agent id. If that agent is
///    among the candidates and active, it wins regardless of position.
/// 2. Otherwise the first active candidate in input order.
#[derive(Debug, Clone, Copy, Default)]
pub struct HintThenFirstActive;

impl HintThenFirstActive {
    pub const NAME: &'static str = "hint_then_first_active";
}

impl SchedulingStrategy for HintThenFirstActive {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn select<'a>(&self, task: &Task, candidates: &'a [Agent]) -> Option<&'a Agent> {
        if let Some(hint) = task.skill_requirements.first() {
            if let Some(agent) = candidates.iter().find(|a| &a.id == hint && a.is_active()) {
                return Some(agent);
            }
        }
        candidates.iter().find(|a| a.is_active())
    }
}

/// Resolve a strategy by its configured name.
pub fn strategy_by_name(name: &str) -> Option<std::sync::Arc<dyn SchedulingStrategy>> {
    match name {
        HintThenFirstActive::NAME => Some(std::sync::Arc::new(HintThenFirstActive)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{default_roster, AgentStatus};

    fn task_with_skills(skills: &[&str]) -> Task {
        let mut task = Task::new("t");
        task.skill_requirements = skills.iter().map(|s| s.to_string()).collect();
        task
    }

    #[test]
    fn hint_selects_matching_active_agent_regardless_of_position() {
        let roster = default_roster();
        let task = task_with_skills(&["codebuddy", "python"]);
        let chosen = HintThenFirstActive.select(&task, &roster).unwrap();
        assert_eq!(chosen.id, "codebuddy");
    }

    #[test]
    fn inactive_hint_falls_back_to_first_active() {
        let mut roster = default_roster();
        roster[3].status = AgentStatus::Busy;
        roster[0].status = AgentStatus::Inactive;
        let task = task_with_skills(&["codebuddy"]);
        let chosen = HintThenFirstActive.select(&task, &roster).unwrap();
        assert_eq!(chosen.id, "gemini_cli");
    }

    #[test]
    fn unknown_hint_falls_back_to_first_active() {
        let roster = default_roster();
        let task = task_with_skills(&["rust"]);
        let chosen = HintThenFirstActive.select(&task, &roster).unwrap();
        assert_eq!(chosen.id, "claude_code");
    }

    #[test]
    fn no_hint_and_no_active_agents_selects_none() {
        let roster: Vec<Agent> = default_roster()
            .into_iter()
            .map(|a| a.with_status(AgentStatus::Error))
            .collect();
        assert!(HintThenFirstActive.select(&Task::new("t"), &roster).is_none());
        assert!(HintThenFirstActive.select(&Task::new("t"), &[]).is_none());
    }

    #[test]
    fn only_first_skill_is_a_hint() {
        let roster = default_roster();
        let task = task_with_skills(&["python", "open_code"]);
        let chosen = HintThenFirstActive.select(&task, &roster).unwrap();
        assert_eq!(chosen.id, "claude_code");
    }

    #[test]
    fn strategy_lookup_by_name() {
        let strategy = strategy_by_name("hint_then_first_active").unwrap();
        assert_eq!(strategy.name(), HintThenFirstActive::NAME);
        assert!(strategy_by_name("round_robin").is_none());
    }
}
