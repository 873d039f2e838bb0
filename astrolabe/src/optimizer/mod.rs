//! Generic population-based (genetic) search.
//!
//! An [`Optimizer`] holds a fixed-size population of scored genotypes and
//! advances it one generation per [`Optimizer::evolve`] call:
//!
//! - the `elite_count` fittest candidates survive unchanged;
//! - every other slot is refilled by crossing two tournament winners and
//!   mutating the child;
//! - offspring are scored, in parallel when configured.
//!
//! What a genotype is, how it is scored and how it varies is supplied by a
//! [`Problem`]. Higher fitness is better. NaN and `-inf` fitness mark a
//! candidate as invalid; `+inf` is a valid (perfect) score.

mod config;


use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use thiserror::Error;

pub use config::OptimizerConfig;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("Optimizer needs at least one seed genotype")]
    EmptySeed,

    #[error("Invalid optimizer config: {0}")]
    InvalidConfig(String),
}

/// The search space explored by an [`Optimizer`].
pub trait Problem: Sync {
    type Genotype: Clone + Send + Sync;

    /// Score of `genotype`; higher is better.
    fn fitness(&self, genotype: &Self::Genotype) -> f64;

    /// A randomly perturbed copy of `genotype`.
    fn mutate<R: Rng + ?Sized>(&self, genotype: &Self::Genotype, rng: &mut R) -> Self::Genotype;

    /// A child combining `a` and `b`.
    fn crossover<R: Rng + ?Sized>(
        &self,
        a: &Self::Genotype,
        b: &Self::Genotype,
        rng: &mut R,
    ) -> Self::Genotype;
}

/// Whether `fitness` can be ranked: not NaN and not `-inf`.
#[inline]
pub fn is_valid_fitness(fitness: f64) -> bool {
    !fitness.is_nan() && fitness != f64::NEG_INFINITY
}

/// A scored genotype.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<G> {
    pub genotype: G,
    pub fitness: f64,
}

impl<G> Candidate<G> {
    #[inline]
    pub fn is_valid(&self) -> bool {
        is_valid_fitness(self.fitness)
    }

    /// Fitness for ranking, with invalid scores below every valid one.
    #[inline]
    fn rank(&self) -> f64 {
        if self.is_valid() {
            self.fitness
        } else {
            f64::NEG_INFINITY
        }
    }
}

pub struct Optimizer<P: Problem> {
    problem: P,
    config: OptimizerConfig,
    population: Vec<Candidate<P::Genotype>>,
    best: Option<Candidate<P::Genotype>>,
    generation: usize,
    rng: ChaCha8Rng,
}

impl<P: Problem> Optimizer<P> {
    /// Build and score the initial population.
    ///
    /// The seeds come first; remaining slots hold mutated copies of the seeds
    /// taken in turn. Seeds beyond `population_size` are ignored.
    pub fn new(problem: P, seeds: Vec<P::Genotype>, config: OptimizerConfig) -> Result<Self, Error> {
        config.validate()?;
        if seeds.is_empty() {
            return Err(Error::EmptySeed);
        }

        let mut rng: ChaCha8Rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };

        let genotypes: Vec<P::Genotype> = (0..config.population_size)
            .map(|i| {
                let seed = &seeds[i % seeds.len()];
                if i < seeds.len() {
                    seed.clone()
                } else {
                    problem.mutate(seed, &mut rng)
                }
            })
            .collect();
        let population = score(&problem, genotypes, config.parallel);

        let mut optimizer = Self {
            problem,
            config,
            population,
            best: None,
            generation: 0,
            rng,
        };
        optimizer.update_best();

        tracing::debug!(
            population = config.population_size,
            seeds = seeds.len(),
            best = ?optimizer.best.as_ref().map(|c| c.fitness),
            "Optimizer initialized"
        );
        Ok(optimizer)
    }

    /// Advance one generation and return the best candidate seen so far.
    pub fn evolve(&mut self) -> Option<&Candidate<P::Genotype>> {
        let Self {
            problem,
            config,
            population,
            rng,
            ..
        } = self;

        let mut next = elites(population, config.elite_count);

        let offspring_count = population.len() - next.len();
        let mut offspring = Vec::with_capacity(offspring_count);
        for _ in 0..offspring_count {
            let a = tournament(population, config.tournament_size, rng);
            let b = tournament(population, config.tournament_size, rng);
            let child = problem.crossover(&population[a].genotype, &population[b].genotype, rng);
            offspring.push(problem.mutate(&child, rng));
        }

        next.extend(score(problem, offspring, config.parallel));
        *population = next;

        self.generation += 1;
        self.update_best();
        self.best()
    }

    /// Highest valid-fitness candidate seen in any generation.
    ///
    /// `None` while no candidate has had a valid fitness. Never decreases
    /// across generations.
    pub fn best(&self) -> Option<&Candidate<P::Genotype>> {
        self.best.as_ref()
    }

    /// Mean fitness of the valid candidates in the current generation.
    pub fn mean_fitness(&self) -> Option<f64> {
        let (sum, count) = self
            .population
            .iter()
            .filter(|c| c.is_valid())
            .fold((0.0, 0usize), |(sum, count), c| (sum + c.fitness, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Number of completed `evolve` calls.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn population_size(&self) -> usize {
        self.population.len()
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    fn update_best(&mut self) {
        let Some(current) = self
            .population
            .iter()
            .filter(|c| c.is_valid())
            .max_by(|a, b| a.fitness.total_cmp(&b.fitness))
        else {
            return;
        };

        let improved = self
            .best
            .as_ref()
            .is_none_or(|best| current.fitness > best.fitness);
        if improved {
            self.best = Some(current.clone());
        }
    }
}

/// Score `genotypes` with the problem's fitness function.
fn score<P: Problem>(problem: &P, genotypes: Vec<P::Genotype>, parallel: bool) -> Vec<Candidate<P::Genotype>> {
    let evaluate = |genotype: P::Genotype| {
        let fitness = problem.fitness(&genotype);
        Candidate { genotype, fitness }
    };

    if parallel {
        genotypes.into_par_iter().map(evaluate).collect()
    } else {
        genotypes.into_iter().map(evaluate).collect()
    }
}

/// Copies of the `count` fittest valid candidates, fittest first.
fn elites<G: Clone>(population: &[Candidate<G>], count: usize) -> Vec<Candidate<G>> {
    let mut order: Vec<usize> = (0..population.len())
        .filter(|&i| population[i].is_valid())
        .collect();
    order.sort_unstable_by(|&a, &b| population[b].fitness.total_cmp(&population[a].fitness));

    let mut next = Vec::with_capacity(population.len());
    next.extend(order.iter().take(count).map(|&i| population[i].clone()));
    next
}

/// Index of the fittest of `size` uniformly drawn candidates.
fn tournament<G, R: Rng + ?Sized>(population: &[Candidate<G>], size: usize, rng: &mut R) -> usize {
    let mut winner = rng.random_range(0..population.len());
    for _ in 1..size {
        let challenger = rng.random_range(0..population.len());
        if population[challenger].rank() > population[winner].rank() {
            winner = challenger;
        }
    }
    winner
}
