//! Aggregate statistics over per-test results.
//!
//! Every derived field of an [`AgentBenchmark`] is computed here from its
//! `test_results`, so counts, rates and timings can never drift apart.

use fleet_state::{AgentBenchmark, TestResult};

/// Aggregates derived from a list of test results.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunStats {
    pub total_tests: u32,
    pub passed_tests: u32,
    pub failed_tests: u32,
    pub pass_rate: f64,
    pub average_score: f64,
    pub total_duration_seconds: f64,
    pub average_response_time: f64,
    pub min_response_time: f64,
    pub max_response_time: f64,
}

impl RunStats {
    /// Compute aggregates. An empty slice yields all zeros.
    pub fn from_results(results: &[TestResult]) -> Self {
        if results.is_empty() {
            return Self::default();
        }

        let total = results.len() as u32;
        let passed = results.iter().filter(|r| r.passed).count() as u32;
        let n = f64::from(total);

        let total_duration: f64 = results.iter().map(|r| r.duration_seconds).sum();
        let score_sum: f64 = results.iter().map(|r| r.score).sum();
        let min = results
            .iter()
            .map(|r| r.duration_seconds)
            .fold(f64::INFINITY, f64::min);
        let max = results
            .iter()
            .map(|r| r.duration_seconds)
            .fold(f64::NEG_INFINITY, f64::max);

        Self {
            total_tests: total,
            passed_tests: passed,
            failed_tests: total - passed,
            pass_rate: f64::from(passed) / n,
            average_score: score_sum / n,
            total_duration_seconds: total_duration,
            average_response_time: total_duration / n,
            min_response_time: min,
            max_response_time: max,
        }
    }

    /// Overwrite the derived fields of `benchmark`.
    pub fn apply_to(&self, benchmark: &mut AgentBenchmark) {
        benchmark.total_tests = self.total_tests;
        benchmark.passed_tests = self.passed_tests;
        benchmark.failed_tests = self.failed_tests;
        benchmark.pass_rate = self.pass_rate;
        benchmark.average_score = self.average_score;
        benchmark.total_duration_seconds = self.total_duration_seconds;
        benchmark.average_response_time = self.average_response_time;
        benchmark.min_response_time = self.min_response_time;
        benchmark.max_response_time = self.max_response_time;
    }
}

/// Arithmetic mean; `None` for an empty iterator.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0u32), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / f64::from(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(passed: bool, score: f64, duration: f64) -> TestResult {
        TestResult {
            test_id: "t".to_string(),
            test_name: "t".to_string(),
            passed,
            score,
            duration_seconds: duration,
            output: None,
            error: None,
            metrics: Default::default(),
        }
    }

    #[test]
    fn aggregates_counts_rates_and_timings() {
        let stats = RunStats::from_results(&[
            result(true, 0.9, 1.0),
            result(false, 0.2, 3.0),
            result(true, 0.7, 2.0),
            result(true, 1.0, 2.0),
        ]);

        assert_eq!(stats.total_tests, 4);
        assert_eq!(stats.passed_tests, 3);
        assert_eq!(stats.failed_tests, 1);
        assert_eq!(stats.passed_tests + stats.failed_tests, stats.total_tests);
        assert!((stats.pass_rate - 0.75).abs() < 1e-12);
        assert!((stats.average_score - 0.7).abs() < 1e-12);
        assert!((stats.total_duration_seconds - 8.0).abs() < 1e-12);
        assert!((stats.average_response_time - 2.0).abs() < 1e-12);
        assert_eq!(stats.min_response_time, 1.0);
        assert_eq!(stats.max_response_time, 3.0);
    }

    #[test]
    fn empty_results_are_all_zero() {
        assert_eq!(RunStats::from_results(&[]), RunStats::default());
    }

    #[test]
    fn all_failing_run_has_zero_pass_rate() {
        let stats = RunStats::from_results(&[result(false, 0.1, 1.0), result(false, 0.3, 1.0)]);
        assert_eq!(stats.pass_rate, 0.0);
        assert_eq!(stats.failed_tests, 2);
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean(Vec::<f64>::new()), None);
        assert_eq!(mean(vec![1.0, 2.0, 6.0]), Some(3.0));
    }
}
