//! Head-to-head comparison of two agents.

use fleet_state::{AgentBenchmark, BenchmarkCategory, BenchmarkFilter, BenchmarkStatus, BenchmarkStore};

use crate::domain::{BenchmarkComparison, FleetError, Result};

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// Compare two runs. Positive `comparison_score` favours `a`; equal scores
/// have no winner.
pub fn compare_benchmarks(a: AgentBenchmark, b: AgentBenchmark) -> BenchmarkComparison {
    let comparison_score = a.average_score - b.average_score;
    let winner = if a.average_score > b.average_score {
        Some(a.agent_id.clone())
    } else if b.average_score > a.average_score {
        Some(b.agent_id.clone())
    } else {
        None
    };

    let mut insights = vec![
        format!("{} average score: {}", a.agent_name, percent(a.average_score)),
        format!("{} average score: {}", b.agent_name, percent(b.average_score)),
        format!(
            "Response time difference: {:.2}s",
            (a.average_response_time - b.average_response_time).abs()
        ),
    ];
    if a.pass_rate != b.pass_rate {
        insights.push(format!(
            "Pass rate difference: {}",
            percent((a.pass_rate - b.pass_rate).abs())
        ));
    }
    if a.suite_digest != b.suite_digest {
        insights.push("Test suites differ; scores may not be directly comparable".to_string());
    }

    BenchmarkComparison {
        agent_1: a,
        agent_2: b,
        comparison_score,
        winner,
        insights,
    }
}

/// Most recent completed run of `agent_id` in `category`.
pub async fn latest_completed(
    store: &dyn BenchmarkStore,
    agent_id: &str,
    category: BenchmarkCategory,
) -> Result<Option<AgentBenchmark>> {
    let runs = store
        .list_benchmarks(&BenchmarkFilter::for_agent(agent_id, category))
        .await
        .map_err(FleetError::from_storage)?;
    Ok(runs
        .into_iter()
        .find(|b| b.status == BenchmarkStatus::Completed))
}

/// Compare the latest completed runs of two agents in one category.
pub async fn compare_agents(
    store: &dyn BenchmarkStore,
    agent_1: &str,
    agent_2: &str,
    category: BenchmarkCategory,
) -> Result<BenchmarkComparison> {
    let missing = |agent: &str| {
        FleetError::NoBenchmarkResults(format!("no completed {category} benchmark for {agent}"))
    };
    let a = latest_completed(store, agent_1, category)
        .await?
        .ok_or_else(|| missing(agent_1))?;
    let b = latest_completed(store, agent_2, category)
        .await?
        .ok_or_else(|| missing(agent_2))?;
    Ok(compare_benchmarks(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::benchmark_with;

    #[test]
    fn higher_average_wins() {
        let a = benchmark_with("claude_code", 0.9, 1.0);
        let b = benchmark_with("gemini_cli", 0.7, 0.8);
        let cmp = compare_benchmarks(a, b);
        assert!((cmp.comparison_score - 0.2).abs() < 1e-9);
        assert_eq!(cmp.winner.as_deref(), Some("claude_code"));
        assert_eq!(cmp.insights[0], "claude_code average score: 90.0%");
        assert!(cmp.insights.iter().any(|i| i.starts_with("Pass rate difference: 20.0%")));
    }

    #[test]
    fn tie_has_no_winner() {
        let a = benchmark_with("claude_code", 0.8, 1.0);
        let b = benchmark_with("gemini_cli", 0.8, 1.0);
        let cmp = compare_benchmarks(a, b);
        assert_eq!(cmp.winner, None);
        assert_eq!(cmp.comparison_score, 0.0);
        assert_eq!(cmp.insights.len(), 3);
    }

    #[test]
    fn differing_suites_are_called_out() {
        let a = benchmark_with("claude_code", 0.8, 1.0);
        let mut b = benchmark_with("gemini_cli", 0.6, 1.0);
        b.suite_digest = "other".to_string();
        let cmp = compare_benchmarks(a, b);
        assert_eq!(cmp.winner.as_deref(), Some("claude_code"));
        assert!(cmp.insights.iter().any(|i| i.contains("suites differ")));
    }
}
