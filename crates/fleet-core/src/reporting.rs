//! Multi-agent benchmark reports and their artifacts.
//!
//! [`build_report`] is pure; [`generate_report`] reads the store and calls it.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use fleet_state::{AgentBenchmark, BenchmarkCategory, BenchmarkFilter, BenchmarkStatus, BenchmarkStore};

use crate::config::ReportingConfig;
use crate::domain::{AgentRanking, BenchmarkReport, FleetError, Result};
use crate::stats::mean;

/// Rank agents by mean `average_score`, highest first.
///
/// Agents keep the order in which they first appear in `benchmarks` when
/// their scores tie.
pub fn rank_agents(benchmarks: &[AgentBenchmark]) -> Vec<AgentRanking> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&AgentBenchmark>> = HashMap::new();
    for b in benchmarks {
        let group = groups.entry(b.agent_id.as_str()).or_default();
        if group.is_empty() {
            order.push(b.agent_id.as_str());
        }
        group.push(b);
    }

    let mut rankings: Vec<AgentRanking> = order
        .into_iter()
        .map(|agent_id| {
            let runs = &groups[agent_id];
            AgentRanking {
                rank: 0,
                agent_id: agent_id.to_string(),
                agent_name: runs[0].agent_name.clone(),
                average_score: mean(runs.iter().map(|b| b.average_score)).unwrap_or(0.0),
                average_pass_rate: mean(runs.iter().map(|b| b.pass_rate)).unwrap_or(0.0),
                benchmark_count: runs.len() as u32,
            }
        })
        .collect();

    // sort_by is stable
    rankings.sort_by(|a, b| b.average_score.total_cmp(&a.average_score));
    for (i, r) in rankings.iter_mut().enumerate() {
        r.rank = i as u32 + 1;
    }
    rankings
}

/// Build a report over `benchmarks` as of `now`.
pub fn build_report(
    benchmarks: Vec<AgentBenchmark>,
    thresholds: &ReportingConfig,
    now: DateTime<Utc>,
) -> Result<BenchmarkReport> {
    if benchmarks.is_empty() {
        return Err(FleetError::NoBenchmarkResults(
            "no benchmarks match the report filter".to_string(),
        ));
    }

    let rankings = rank_agents(&benchmarks);
    let mut summary = format!(
        "Analyzed {} benchmark(s) across {} agent(s).",
        benchmarks.len(),
        rankings.len()
    );
    if let Some(top) = rankings.first() {
        summary.push_str(&format!(
            " Top performer: {} with an average score of {:.1}%.",
            top.agent_name,
            top.average_score * 100.0
        ));
    }

    let mean_response = mean(benchmarks.iter().map(|b| b.average_response_time)).unwrap_or(0.0);
    let mean_pass_rate = mean(benchmarks.iter().map(|b| b.pass_rate)).unwrap_or(0.0);
    let degraded = benchmarks.iter().filter(|b| b.is_degraded).count();

    let mut insights = vec![
        format!("Mean response time: {:.2}s", mean_response),
        format!("Mean pass rate: {:.1}%", mean_pass_rate * 100.0),
    ];
    if degraded > 0 {
        insights.push(format!("{degraded} benchmark(s) show performance degradation"));
    }

    let mut recommendations = Vec::new();
    if rankings
        .first()
        .is_some_and(|top| top.average_score < thresholds.low_score_threshold)
    {
        recommendations.push(
            "Top score is below target; optimise prompts and supplied context".to_string(),
        );
    }
    if mean_response > thresholds.slow_response_seconds {
        recommendations.push(
            "Response times are high; consider caching or batching requests".to_string(),
        );
    }

    Ok(BenchmarkReport {
        id: uuid::Uuid::new_v4().to_string(),
        title: format!("Agent Benchmark Report - {}", now.format("%Y-%m-%d")),
        generated_at: now,
        benchmarks,
        rankings,
        summary,
        insights,
        recommendations,
    })
}

async fn completed_benchmarks(
    store: &dyn BenchmarkStore,
    category: Option<BenchmarkCategory>,
) -> Result<Vec<AgentBenchmark>> {
    let filter = BenchmarkFilter {
        agent_id: None,
        category,
    };
    let runs = store
        .list_benchmarks(&filter)
        .await
        .map_err(FleetError::from_storage)?;
    Ok(runs
        .into_iter()
        .filter(|b| b.status == BenchmarkStatus::Completed)
        .collect())
}

/// Report over every completed run, optionally limited to one category.
pub async fn generate_report(
    store: &dyn BenchmarkStore,
    category: Option<BenchmarkCategory>,
    thresholds: &ReportingConfig,
) -> Result<BenchmarkReport> {
    let benchmarks = completed_benchmarks(store, category).await?;
    build_report(benchmarks, thresholds, Utc::now())
}

/// The top `limit` rankings.
pub async fn rankings(
    store: &dyn BenchmarkStore,
    category: Option<BenchmarkCategory>,
    limit: usize,
) -> Result<Vec<AgentRanking>> {
    let benchmarks = completed_benchmarks(store, category).await?;
    if benchmarks.is_empty() {
        return Err(FleetError::NoBenchmarkResults(
            "no benchmarks match the ranking filter".to_string(),
        ));
    }
    let mut ranked = rank_agents(&benchmarks);
    ranked.truncate(limit);
    Ok(ranked)
}

/// Render a report as Markdown.
pub fn render_report_md(report: &BenchmarkReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", report.title));
    out.push_str(&format!("{}\n\n", report.summary));

    out.push_str("## Rankings\n\n");
    out.push_str("| Rank | Agent | Avg score | Avg pass rate | Runs |\n");
    out.push_str("|---:|---|---:|---:|---:|\n");
    for r in &report.rankings {
        out.push_str(&format!(
            "| {} | {} | {:.1}% | {:.1}% | {} |\n",
            r.rank,
            r.agent_name,
            r.average_score * 100.0,
            r.average_pass_rate * 100.0,
            r.benchmark_count
        ));
    }
    out.push('\n');

    if !report.insights.is_empty() {
        out.push_str("## Insights\n");
        for i in &report.insights {
            out.push_str(&format!("- {}\n", i));
        }
        out.push('\n');
    }

    if !report.recommendations.is_empty() {
        out.push_str("## Recommendations\n");
        for r in &report.recommendations {
            out.push_str(&format!("- {}\n", r));
        }
    }
    out
}

/// Write the report as pretty JSON.
pub fn write_report_json(path: &Path, report: &BenchmarkReport) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize benchmark report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

pub fn write_report_md(path: &Path, report: &BenchmarkReport) -> anyhow::Result<()> {
    std::fs::write(path, render_report_md(report)).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::benchmark_with;

    fn thresholds() -> ReportingConfig {
        ReportingConfig::default()
    }

    #[test]
    fn agents_ranked_by_mean_score() {
        let runs = vec![
            benchmark_with("gemini_cli", 0.6, 0.5),
            benchmark_with("claude_code", 0.9, 1.0),
            benchmark_with("gemini_cli", 0.8, 0.7),
        ];
        let ranked = rank_agents(&runs);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].agent_id, "claude_code");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].agent_id, "gemini_cli");
        assert_eq!(ranked[1].benchmark_count, 2);
        assert!((ranked[1].average_score - 0.7).abs() < 1e-9);
        assert!((ranked[1].average_pass_rate - 0.6).abs() < 1e-9);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let runs = vec![
            benchmark_with("open_code", 0.75, 1.0),
            benchmark_with("codebuddy", 0.75, 1.0),
            benchmark_with("claude_code", 0.75, 1.0),
        ];
        let ids: Vec<String> = rank_agents(&runs).into_iter().map(|r| r.agent_id).collect();
        assert_eq!(ids, vec!["open_code", "codebuddy", "claude_code"]);
    }

    #[test]
    fn empty_report_is_not_found() {
        let err = build_report(Vec::new(), &thresholds(), Utc::now()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn report_summary_insights_and_recommendations() {
        let mut slow = benchmark_with("gemini_cli", 0.5, 0.5);
        slow.average_response_time = 4.0;
        slow.is_degraded = true;
        let runs = vec![benchmark_with("claude_code", 0.7, 0.9), slow];

        let now = DateTime::parse_from_rfc3339("2026-03-14T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let report = build_report(runs, &thresholds(), now).unwrap();

        assert_eq!(report.title, "Agent Benchmark Report - 2026-03-14");
        assert!(report.summary.contains("Top performer: claude_code"));
        assert!(report.insights.contains(&"Mean response time: 2.50s".to_string()));
        assert!(report.insights.contains(&"Mean pass rate: 70.0%".to_string()));
        assert!(report.insights.iter().any(|i| i.starts_with("1 benchmark(s)")));
        assert_eq!(report.recommendations.len(), 2);
    }

    #[test]
    fn healthy_report_has_no_recommendations() {
        let report =
            build_report(vec![benchmark_with("claude_code", 0.95, 1.0)], &thresholds(), Utc::now())
                .unwrap();
        assert!(report.recommendations.is_empty());
        assert_eq!(report.insights.len(), 2);
    }

    #[test]
    fn markdown_and_json_artifacts() {
        let report =
            build_report(vec![benchmark_with("claude_code", 0.9, 1.0)], &thresholds(), Utc::now())
                .unwrap();
        let md = render_report_md(&report);
        assert!(md.starts_with("# Agent Benchmark Report - "));
        assert!(md.contains("| 1 | claude_code | 90.0% | 100.0% | 1 |"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report_json(&path, &report).unwrap();
        let parsed: BenchmarkReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.id, report.id);
        assert_eq!(parsed.rankings, report.rankings);
    }
}
