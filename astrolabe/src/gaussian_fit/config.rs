use serde::{Deserialize, Serialize};

use super::Error;
use crate::optimizer::OptimizerConfig;

/// Configuration for [`GaussianFitter`](super::GaussianFitter).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussianFitConfig {
    /// Upper bound on generations per fit.
    pub generations: usize,
    /// Probability that a genotype is mutated at all. A mutated genotype
    /// perturbs each parameter with probability one half.
    pub mutation_rate: f64,
    /// Squared parameter distance below which consecutive bests count as
    /// unchanged.
    pub error_tolerance: f64,
    /// Number of recent bests that must all agree with the current best
    /// before the fit stops early.
    pub error_smoothing: usize,
    /// Population search settings.
    pub optimizer: OptimizerConfig,
}

impl Default for GaussianFitConfig {
    fn default() -> Self {
        Self {
            generations: 100,
            mutation_rate: 0.3,
            error_tolerance: 1e-4,
            error_smoothing: 5,
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl GaussianFitConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.generations == 0 {
            return Err(Error::InvalidConfig(
                "generations must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(Error::InvalidConfig(format!(
                "mutation_rate must be in [0, 1], got {}",
                self.mutation_rate
            )));
        }
        if !(self.error_tolerance.is_finite() && self.error_tolerance >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "error_tolerance must be finite and non-negative, got {}",
                self.error_tolerance
            )));
        }
        if self.error_smoothing == 0 {
            return Err(Error::InvalidConfig(
                "error_smoothing must be at least 1".to_string(),
            ));
        }
        self.optimizer.validate()?;
        Ok(())
    }
}
