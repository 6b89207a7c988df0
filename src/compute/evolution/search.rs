//! (1+λ) evolution strategy for CGP filters.
//!
//! Each run starts from a random population, keeps the best individual as
//! elite, and then for every generation fills the population with mutated
//! copies of the elite. A child replaces the elite when it is at least as good,
//! so neutral mutations can drift through the search space.

use std::collections::BTreeSet;
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::compute::Topology;
use crate::schema::{
    CgpConfig, Chromosome, ConfigError, EvolutionProgress, EvolutionResult, EvolutionStats,
    PARAM_IN, RunSummary,
};

use super::fitness::{FitnessEvaluator, FitnessScratch, TrainingSet, WORST_FITNESS};
use super::genome::ChromosomeRng;

/// A chromosome together with its fitness.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub chromosome: Chromosome,
    pub fitness: u64,
}

/// How a child replaced the elite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replacement {
    /// Strictly lower fitness.
    Improved,
    /// Equal fitness; lets the search drift across neutral networks.
    Neutral,
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine {
    config: CgpConfig,
    topology: Topology,
    rng: ChromosomeRng,
    evaluator: FitnessEvaluator,
    damaged: BTreeSet<u32>,
    seed: u64,
    scratch: FitnessScratch,
}

impl EvolutionEngine {
    /// Create a new evolution engine.
    pub fn new(config: CgpConfig, training: TrainingSet) -> Result<Self, ConfigError> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(rand::random);
        let topology = Topology::new(config.geometry(), config.l_back);

        Ok(Self {
            config,
            topology,
            rng: ChromosomeRng::new(seed),
            evaluator: FitnessEvaluator::new(training),
            damaged: BTreeSet::new(),
            seed,
            scratch: FitnessScratch::new(),
        })
    }

    /// Force the given blocks to stay damaged in every chromosome.
    ///
    /// Indices that do not address a block of this grid are ignored.
    pub fn with_damaged(mut self, damaged: BTreeSet<u32>) -> Self {
        let geometry = self.topology.geometry();
        let (valid, invalid): (BTreeSet<u32>, BTreeSet<u32>) = damaged
            .into_iter()
            .partition(|&i| i >= PARAM_IN && i < geometry.signal_count());
        if !invalid.is_empty() {
            warn!("Ignoring damaged indices outside the grid: {:?}", invalid);
        }
        self.damaged = valid;
        self
    }

    /// Seed used by the random generator.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &CgpConfig {
        &self.config
    }

    pub fn damaged(&self) -> &BTreeSet<u32> {
        &self.damaged
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    /// Generate the initial population of a run.
    fn initialize(&mut self) -> Vec<Chromosome> {
        (0..self.config.population_size)
            .map(|_| self.rng.random_chromosome(&self.topology, &self.damaged))
            .collect()
    }

    /// Score every chromosome of the population.
    fn evaluate_population(&mut self, population: &[Chromosome]) -> Vec<u64> {
        let evaluator = &self.evaluator;
        if self.config.parallel {
            population
                .par_iter()
                .map_init(FitnessScratch::new, |scratch, chromosome| {
                    evaluator.evaluate(chromosome, scratch)
                })
                .collect()
        } else {
            let scratch = &mut self.scratch;
            population
                .iter()
                .map(|chromosome| evaluator.evaluate(chromosome, scratch))
                .collect()
        }
    }

    /// Index and fitness of the best individual; the first one wins ties.
    fn best_of(fitness: &[u64]) -> (usize, u64) {
        let mut best = (0, WORST_FITNESS);
        for (i, &f) in fitness.iter().enumerate() {
            if i == 0 || f < best.1 {
                best = (i, f);
            }
        }
        best
    }

    /// Execute one complete run and return its elite.
    fn run_once<F>(&mut self, run: usize, best_so_far: u64, callback: &mut F) -> (Candidate, RunSummary)
    where
        F: FnMut(&EvolutionProgress),
    {
        info!("Evolution run {}/{}", run + 1, self.config.runs);

        let mut population = self.initialize();
        debug!(
            "Evaluating initial population of {} individuals",
            population.len()
        );
        let fitness = self.evaluate_population(&population);
        let (best_index, best_fitness) = Self::best_of(&fitness);

        let mut elite = Candidate {
            chromosome: population[best_index].clone(),
            fitness: best_fitness,
        };
        let mut summary = RunSummary {
            run,
            initial_fitness: elite.fitness,
            final_fitness: elite.fitness,
            replacements: 0,
            improvements: 0,
        };

        callback(&self.progress(run, 0, &elite, best_fitness, best_so_far));

        for generation in 1..=self.config.generations {
            for child in population.iter_mut() {
                child.clone_from(&elite.chromosome);
                self.rng.mutate(
                    child,
                    &self.topology,
                    &self.damaged,
                    self.config.max_mutations,
                );
            }

            let fitness = self.evaluate_population(&population);
            let previous = elite.fitness;
            match Self::offer(&mut elite, &population, &fitness) {
                Some(Replacement::Improved) => {
                    summary.replacements += 1;
                    summary.improvements += 1;
                    debug!(
                        "Run {} generation {}: fitness {} -> {}",
                        run, generation, previous, elite.fitness
                    );
                }
                Some(Replacement::Neutral) => summary.replacements += 1,
                None => {}
            }
            let generation_best = fitness.iter().copied().min().unwrap_or(WORST_FITNESS);

            callback(&self.progress(run, generation, &elite, generation_best, best_so_far));
        }

        summary.final_fitness = elite.fitness;
        info!("Best fitness in run {}: {}", run + 1, elite.fitness);
        (elite, summary)
    }

    /// Replace `elite` with the best child if it is at least as good.
    fn offer(
        elite: &mut Candidate,
        population: &[Chromosome],
        fitness: &[u64],
    ) -> Option<Replacement> {
        let (child_index, child_fitness) = Self::best_of(fitness);
        if population.is_empty() || child_fitness > elite.fitness {
            return None;
        }
        let kind = if child_fitness < elite.fitness {
            Replacement::Improved
        } else {
            Replacement::Neutral
        };
        elite.chromosome.clone_from(&population[child_index]);
        elite.fitness = child_fitness;
        Some(kind)
    }

    fn progress(
        &self,
        run: usize,
        generation: usize,
        elite: &Candidate,
        generation_best: u64,
        best_so_far: u64,
    ) -> EvolutionProgress {
        EvolutionProgress {
            run,
            total_runs: self.config.runs,
            generation,
            total_generations: self.config.generations,
            elite_fitness: elite.fitness,
            generation_best,
            best_fitness: best_so_far.min(elite.fitness),
        }
    }

    /// Run evolution with progress callback.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> EvolutionResult
    where
        F: FnMut(&EvolutionProgress),
    {
        let start_time = Instant::now();
        info!(
            "Starting {} evolution runs on a {}x{} grid (l_back {}, seed {})",
            self.config.runs, self.config.cols, self.config.rows, self.config.l_back, self.seed
        );
        info!(
            "Training on {} image pairs",
            self.evaluator.training().len()
        );
        if !self.damaged.is_empty() {
            info!("Damaged blocks: {:?}", self.damaged);
        }

        let mut runs = Vec::with_capacity(self.config.runs);

        // A validated config always has at least one run.
        let (mut best, summary) = self.run_once(0, WORST_FITNESS, &mut callback);
        let mut best_run = 0;
        runs.push(summary);

        for run in 1..self.config.runs {
            let (elite, summary) = self.run_once(run, best.fitness, &mut callback);
            runs.push(summary);
            if elite.fitness < best.fitness {
                best = elite;
                best_run = run;
            }
        }

        let elapsed = start_time.elapsed().as_secs_f64();
        let total_evaluations = self.config.runs as u64
            * (self.config.generations as u64 + 1)
            * self.config.population_size as u64;

        info!(
            "Evolution finished: best fitness {} from run {} ({:.2}s)",
            best.fitness,
            best_run + 1,
            elapsed
        );

        EvolutionResult {
            best_fitness: best.fitness,
            best: best.chromosome,
            best_run,
            runs,
            stats: EvolutionStats {
                runs: self.config.runs,
                generations: self.config.generations,
                total_evaluations,
                best_fitness: best.fitness,
                elapsed_seconds: elapsed,
                evaluations_per_second: total_evaluations as f64 / elapsed.max(f64::EPSILON),
                seed: self.seed,
            },
        }
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> EvolutionResult {
        self.run_with_callback(|_| {})
    }
}
