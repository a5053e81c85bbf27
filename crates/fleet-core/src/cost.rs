//! Cost estimation for benchmark runs.

use fleet_state::BenchmarkTest;

/// Estimated spend of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    pub usd: f64,
    pub tokens: u64,
}

/// Prices a benchmark run from the tests it executed.
pub trait CostModel: Send + Sync {
    fn estimate(&self, tests: &[BenchmarkTest]) -> CostEstimate;
}

/// Same price and token count for every test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatRateCostModel {
    pub usd_per_test: f64,
    pub tokens_per_test: u64,
}

impl FlatRateCostModel {
    pub const DEFAULT_USD_PER_TEST: f64 = 0.001;
    pub const DEFAULT_TOKENS_PER_TEST: u64 = 100;

    pub fn new(usd_per_test: f64, tokens_per_test: u64) -> Self {
        Self {
            usd_per_test,
            tokens_per_test,
        }
    }
}

impl Default for FlatRateCostModel {
    fn default() -> Self {
        Self::new(Self::DEFAULT_USD_PER_TEST, Self::DEFAULT_TOKENS_PER_TEST)
    }
}

impl CostModel for FlatRateCostModel {
    fn estimate(&self, tests: &[BenchmarkTest]) -> CostEstimate {
        let n = tests.len() as u64;
        CostEstimate {
            usd: self.usd_per_test * n as f64,
            tokens: self.tokens_per_test * n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::standard_tests;

    #[test]
    fn flat_rate_scales_with_test_count() {
        let estimate = FlatRateCostModel::default().estimate(&standard_tests());
        assert!((estimate.usd - 0.006).abs() < 1e-12);
        assert_eq!(estimate.tokens, 600);
    }

    #[test]
    fn no_tests_cost_nothing() {
        let estimate = FlatRateCostModel::new(0.5, 1_000).estimate(&[]);
        assert_eq!(estimate, CostEstimate { usd: 0.0, tokens: 0 });
    }
}
