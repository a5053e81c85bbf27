//! Regression detection against per-agent baselines.
//!
//! A run is degraded when its pass rate falls below `baseline * factor`.
//! Alerts are derived from stored runs on demand; nothing here writes.

use chrono::Utc;
use fleet_state::{AgentBenchmark, BenchmarkFilter, BenchmarkStatus, BenchmarkStore};

use crate::domain::{DegradationAlert, FleetError, Result, Severity};

/// Default fraction of the baseline a run must reach to not be degraded.
pub const DEFAULT_DEGRADATION_FACTOR: f64 = 0.95;

/// Fixed remediation list attached to every alert.
pub const RECOMMENDED_ACTIONS: [&str; 4] = [
    "Check the agent configuration and prompts",
    "Verify API keys and permissions",
    "Contact the provider to confirm service status",
    "Consider switching to a backup agent",
];

/// `pass_rate < baseline * factor`
pub fn is_degraded(pass_rate: f64, baseline: f64, factor: f64) -> bool {
    pass_rate < baseline * factor
}

/// `(baseline - current) / baseline * 100`, or 0 for a zero baseline.
pub fn degradation_percentage(baseline: f64, current: f64) -> f64 {
    if baseline <= 0.0 {
        return 0.0;
    }
    (baseline - current) / baseline * 100.0
}

/// Error function, Abramowitz and Stegun 7.1.26 (max error 1.5e-7).
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

/// Standard normal CDF.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// One-sided two-proportion z-test of H0 "current rate >= baseline rate".
///
/// Uses the pooled proportion. Small values mean the drop is unlikely to be
/// noise. `None` when either sample is empty or the pooled variance is zero.
pub fn two_proportion_p_value(
    baseline_rate: f64,
    baseline_n: u32,
    current_rate: f64,
    current_n: u32,
) -> Option<f64> {
    if baseline_n == 0 || current_n == 0 {
        return None;
    }
    let n1 = f64::from(baseline_n);
    let n2 = f64::from(current_n);
    let pooled = (baseline_rate * n1 + current_rate * n2) / (n1 + n2);
    let variance = pooled * (1.0 - pooled) * (1.0 / n1 + 1.0 / n2);
    if variance <= 0.0 {
        return None;
    }
    let z = (current_rate - baseline_rate) / variance.sqrt();
    Some(normal_cdf(z).clamp(0.0, 1.0))
}

/// Alert for one run, if it is a completed, degraded run with a baseline.
pub fn alert_for(benchmark: &AgentBenchmark) -> Option<DegradationAlert> {
    if benchmark.status != BenchmarkStatus::Completed || !benchmark.is_degraded {
        return None;
    }
    let baseline = benchmark.baseline_pass_rate?;
    let percentage = degradation_percentage(baseline, benchmark.pass_rate);

    Some(DegradationAlert {
        id: uuid::Uuid::new_v4().to_string(),
        benchmark_id: benchmark.id.clone(),
        agent_id: benchmark.agent_id.clone(),
        agent_name: benchmark.agent_name.clone(),
        category: benchmark.category,
        detected_at: benchmark.completed_at.unwrap_or_else(Utc::now),
        baseline_pass_rate: baseline,
        current_pass_rate: benchmark.pass_rate,
        degradation_percentage: percentage,
        p_value: benchmark.degradation_p_value.unwrap_or(0.0),
        severity: Severity::from_degradation(percentage),
        recommended_actions: RECOMMENDED_ACTIONS.iter().map(|s| s.to_string()).collect(),
    })
}

/// One alert per degraded run, in input order. No deduplication.
pub fn alerts_from(benchmarks: &[AgentBenchmark]) -> Vec<DegradationAlert> {
    benchmarks.iter().filter_map(alert_for).collect()
}

/// Alerts over every stored run, newest first.
pub async fn degradation_alerts(store: &dyn BenchmarkStore) -> Result<Vec<DegradationAlert>> {
    let benchmarks = store
        .list_benchmarks(&BenchmarkFilter::default())
        .await
        .map_err(FleetError::from_storage)?;
    Ok(alerts_from(&benchmarks))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_iff_below_factor_of_baseline() {
        assert!(is_degraded(0.84, 0.9, 0.95));
        assert!(!is_degraded(0.86, 0.9, 0.95));
        assert!(!is_degraded(0.9, 0.9, 0.95));
        assert!(is_degraded(0.0, 0.9, DEFAULT_DEGRADATION_FACTOR));
        // factor 1.0 flags any drop
        assert!(is_degraded(0.89, 0.9, 1.0));
    }

    #[test]
    fn percentage_of_total_collapse_is_100() {
        assert!((degradation_percentage(0.9, 0.0) - 100.0).abs() < 1e-12);
        assert!((degradation_percentage(0.8, 0.6) - 25.0).abs() < 1e-9);
        assert_eq!(degradation_percentage(0.0, 0.0), 0.0);
    }

    #[test]
    fn normal_cdf_reference_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(-1.645) - 0.05).abs() < 1e-3);
    }

    #[test]
    fn p_value_small_for_large_drop() {
        let p = two_proportion_p_value(0.9, 100, 0.5, 100).unwrap();
        assert!(p < 0.001, "p = {p}");
    }

    #[test]
    fn p_value_half_for_no_change() {
        let p = two_proportion_p_value(0.7, 50, 0.7, 50).unwrap();
        assert!((p - 0.5).abs() < 1e-6);
    }

    #[test]
    fn p_value_undefined_without_samples_or_variance() {
        assert_eq!(two_proportion_p_value(0.9, 0, 0.5, 10), None);
        assert_eq!(two_proportion_p_value(0.9, 10, 0.5, 0), None);
        assert_eq!(two_proportion_p_value(1.0, 10, 1.0, 10), None);
        assert_eq!(two_proportion_p_value(0.0, 10, 0.0, 10), None);
    }
}
