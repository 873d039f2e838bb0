//! Configuration for the population search.

use serde::{Deserialize, Serialize};

use super::Error;

/// Population search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Number of candidates per generation.
    pub population_size: usize,
    /// Candidates drawn per tournament; the fittest of them becomes a parent.
    pub tournament_size: usize,
    /// Fittest candidates copied unchanged into the next generation.
    pub elite_count: usize,
    /// Score offspring on the rayon thread pool.
    pub parallel: bool,
    /// Random seed for reproducible runs. If None, uses the OS entropy source.
    pub seed: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            population_size: 2000,
            tournament_size: 3,
            elite_count: 1,
            parallel: true,
            seed: None,
        }
    }
}

impl OptimizerConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), Error> {
        if self.population_size == 0 {
            return Err(Error::InvalidConfig(
                "population_size must be at least 1".to_string(),
            ));
        }
        if self.tournament_size == 0 {
            return Err(Error::InvalidConfig(
                "tournament_size must be at least 1".to_string(),
            ));
        }
        if self.elite_count >= self.population_size {
            return Err(Error::InvalidConfig(format!(
                "elite_count ({}) must be smaller than population_size ({})",
                self.elite_count, self.population_size
            )));
        }
        Ok(())
    }
}
