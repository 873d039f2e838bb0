//! 1D Gaussian profile fitting by population search.
//!
//! Fits `peak * exp(-0.5 * ((x - mu) / sigma)^2)` to sampled `(x, y)` data.
//! Fitness is the inverse sum of squared residuals, so a perfect fit scores
//! `+inf`. Evolution stops after `generations` or as soon as the last
//! `error_smoothing` bests all lie within `error_tolerance` (squared parameter
//! distance) of the current best.

mod config;


use std::collections::VecDeque;

use num_traits::AsPrimitive;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::sigma_to_fwhm;
use crate::optimizer::{self, Optimizer, Problem};

pub use config::GaussianFitConfig;

/// Relative size of a single parameter perturbation.
const MUTATION_SCALE: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("Profile has no samples")]
    EmptyData,

    #[error("Profile has {x} x samples but {y} y samples")]
    LengthMismatch { x: usize, y: usize },

    #[error("No finite fit found after {generations} generations")]
    NoFiniteFit { generations: usize },

    #[error("Invalid Gaussian fit config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Optimizer(#[from] optimizer::Error),
}

/// Parameters of a 1D Gaussian profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Gaussian {
    pub peak: f64,
    pub mu: f64,
    pub sigma: f64,
}

impl Gaussian {
    pub const fn new(peak: f64, mu: f64, sigma: f64) -> Self {
        Self { peak, mu, sigma }
    }

    /// Profile value at `x`.
    #[inline]
    pub fn evaluate(&self, x: f64) -> f64 {
        let z = (x - self.mu) / self.sigma;
        self.peak * (-0.5 * z * z).exp()
    }

    /// Full width at half maximum.
    pub fn fwhm(&self) -> f64 {
        sigma_to_fwhm(self.sigma.abs())
    }

    /// Squared Euclidean distance between parameter vectors.
    pub fn distance_sq(&self, other: &Gaussian) -> f64 {
        (self.peak - other.peak).powi(2) + (self.mu - other.mu).powi(2) + (self.sigma - other.sigma).powi(2)
    }

    pub fn is_finite(&self) -> bool {
        self.peak.is_finite() && self.mu.is_finite() && self.sigma.is_finite()
    }

    /// Sum of squared residuals against samples `(x[i], y[i])`.
    pub fn residual(&self, x: &[f64], y: &[f64]) -> f64 {
        x.iter()
            .zip(y)
            .map(|(&x, &y)| (y - self.evaluate(x)).powi(2))
            .sum()
    }

    /// Estimate from intensity-weighted moments.
    ///
    /// Peak is the largest sample; mean and spread use `y` clamped at zero
    /// as weights. Returns `None` when the weights sum to zero or the spread
    /// is not positive.
    pub fn from_moments(x: &[f64], y: &[f64]) -> Option<Self> {
        let (mut sum_w, mut sum_wx) = (0.0, 0.0);
        for (&x, &y) in x.iter().zip(y) {
            let w = y.max(0.0);
            sum_w += w;
            sum_wx += w * x;
        }
        if sum_w <= 0.0 || !sum_w.is_finite() {
            return None;
        }
        let mu = sum_wx / sum_w;

        let variance = x
            .iter()
            .zip(y)
            .map(|(&x, &y)| y.max(0.0) * (x - mu).powi(2))
            .sum::<f64>()
            / sum_w;
        let sigma = variance.sqrt();
        let peak = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let estimate = Self::new(peak, mu, sigma);
        (estimate.is_finite() && sigma > 0.0).then_some(estimate)
    }
}

/// Outcome of a profile fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianFit {
    pub gaussian: Gaussian,
    /// Sum of squared residuals of `gaussian` against the data.
    pub residual: f64,
    /// `1 / residual`; `+inf` for an exact fit.
    pub fitness: f64,
    /// Generations evolved.
    pub generations: usize,
    /// Whether the convergence window was satisfied before the generation cap.
    pub converged: bool,
}

/// Least-squares fit of a Gaussian over fixed samples.
struct ProfileProblem {
    x: Vec<f64>,
    y: Vec<f64>,
    mutation_rate: f64,
}

impl Problem for ProfileProblem {
    type Genotype = Gaussian;

    fn fitness(&self, genotype: &Gaussian) -> f64 {
        1.0 / genotype.residual(&self.x, &self.y)
    }

    fn mutate<R: Rng + ?Sized>(&self, genotype: &Gaussian, rng: &mut R) -> Gaussian {
        let mut out = *genotype;
        let mutate = self.mutation_rate >= rng.random::<f64>();
        if !mutate {
            return out;
        }
        for param in [&mut out.peak, &mut out.mu, &mut out.sigma] {
            if rng.random_bool(0.5) {
                *param += *param * ((rng.random::<f64>() - 0.5) * 2.0) * MUTATION_SCALE;
            }
        }
        out
    }

    fn crossover<R: Rng + ?Sized>(&self, a: &Gaussian, b: &Gaussian, rng: &mut R) -> Gaussian {
        let mut pick = |left: f64, right: f64| if rng.random_bool(0.5) { left } else { right };
        Gaussian {
            peak: pick(a.peak, b.peak),
            mu: pick(a.mu, b.mu),
            sigma: pick(a.sigma, b.sigma),
        }
    }
}

/// Fits a [`Gaussian`] to a sampled profile.
pub struct GaussianFitter {
    optimizer: Optimizer<ProfileProblem>,
    config: GaussianFitConfig,
}

impl GaussianFitter {
    /// Prepare a fit of `y` against `x`.
    ///
    /// Without a `seed` the initial guess draws each parameter uniformly from
    /// `[0, 1)`.
    pub fn new<X, Y>(x: &[X], y: &[Y], seed: Option<Gaussian>, config: GaussianFitConfig) -> Result<Self, Error>
    where
        X: AsPrimitive<f64>,
        Y: AsPrimitive<f64>,
    {
        config.validate()?;
        if x.len() != y.len() {
            return Err(Error::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.is_empty() {
            return Err(Error::EmptyData);
        }

        let seed = seed.unwrap_or_else(|| {
            let mut rng: ChaCha8Rng = match config.optimizer.seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_os_rng(),
            };
            Gaussian::new(rng.random(), rng.random(), rng.random())
        });

        let problem = ProfileProblem {
            x: x.iter().map(|v| v.as_()).collect(),
            y: y.iter().map(|v| v.as_()).collect(),
            mutation_rate: config.mutation_rate,
        };
        let optimizer = Optimizer::new(problem, vec![seed], config.optimizer)?;

        tracing::debug!(samples = x.len(), ?seed, "Gaussian fit prepared");
        Ok(Self { optimizer, config })
    }

    /// Evolve until convergence or the generation cap.
    pub fn run(&mut self) -> Result<GaussianFit, Error> {
        let mut history = VecDeque::with_capacity(self.config.error_smoothing + 1);
        for generation in 1..=self.config.generations {
            if self.step(generation, &mut history) {
                return self.finish(generation, true);
            }
        }
        self.finish(self.config.generations, false)
    }

    /// [`run`](Self::run), yielding to the async runtime between generations.
    pub async fn go(&mut self) -> Result<GaussianFit, Error> {
        let mut history = VecDeque::with_capacity(self.config.error_smoothing + 1);
        for generation in 1..=self.config.generations {
            if self.step(generation, &mut history) {
                return self.finish(generation, true);
            }
            tokio::task::yield_now().await;
        }
        self.finish(self.config.generations, false)
    }

    pub fn config(&self) -> &GaussianFitConfig {
        &self.config
    }

    /// Advance one generation; returns whether the fit has converged.
    fn step(&mut self, generation: usize, history: &mut VecDeque<Gaussian>) -> bool {
        let Some(best) = self.optimizer.evolve().map(|c| c.genotype) else {
            tracing::debug!(generation, "Gaussian fit: no valid candidate");
            return false;
        };

        let converged = history.len() >= self.config.error_smoothing
            && history
                .iter()
                .all(|previous| previous.distance_sq(&best) < self.config.error_tolerance);

        history.push_back(best);
        if history.len() > self.config.error_smoothing {
            history.pop_front();
        }

        tracing::debug!(
            generation,
            peak = best.peak,
            mu = best.mu,
            sigma = best.sigma,
            mean_fitness = ?self.optimizer.mean_fitness(),
            "Gaussian fit generation"
        );
        converged
    }

    fn finish(&self, generations: usize, converged: bool) -> Result<GaussianFit, Error> {
        let Some(best) = self.optimizer.best().filter(|c| c.genotype.is_finite()) else {
            tracing::warn!(generations, "Gaussian fit found no finite candidate");
            return Err(Error::NoFiniteFit { generations });
        };

        let problem = self.optimizer.problem();
        let fit = GaussianFit {
            gaussian: best.genotype,
            residual: best.genotype.residual(&problem.x, &problem.y),
            fitness: best.fitness,
            generations,
            converged,
        };
        tracing::debug!(?fit, "Gaussian fit finished");
        Ok(fit)
    }
}
