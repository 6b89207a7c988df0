//! Progress and result types reported by the evolution engine.

use serde::{Deserialize, Serialize};

use super::Chromosome;

/// Snapshot passed to progress callbacks after every generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Current run (0-based).
    pub run: usize,
    /// Total runs planned.
    pub total_runs: usize,
    /// Generation just completed; 0 is the initial population.
    pub generation: usize,
    /// Total generations per run.
    pub total_generations: usize,
    /// Fitness of the current run's elite.
    pub elite_fitness: u64,
    /// Best child fitness in this generation.
    pub generation_best: u64,
    /// Best fitness over all runs so far.
    pub best_fitness: u64,
}

/// Outcome of a single evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run index (0-based).
    pub run: usize,
    /// Fitness of the initial elite.
    pub initial_fitness: u64,
    /// Fitness of the final elite.
    pub final_fitness: u64,
    /// Times the elite was replaced by an equal or better child.
    pub replacements: usize,
    /// Times the elite was replaced by a strictly better child.
    pub improvements: usize,
}

/// Statistics over all runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Runs executed.
    pub runs: usize,
    /// Generations per run.
    pub generations: usize,
    /// Total chromosome evaluations performed.
    pub total_evaluations: u64,
    /// Best fitness achieved.
    pub best_fitness: u64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Evaluations per second.
    pub evaluations_per_second: f64,
    /// Seed the random generator was initialized with.
    pub seed: u64,
}

/// Final result of evolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Best chromosome over all runs.
    pub best: Chromosome,
    /// Its fitness.
    pub best_fitness: u64,
    /// Run that produced it.
    pub best_run: usize,
    /// Per-run summaries, in run order.
    pub runs: Vec<RunSummary>,
    /// Aggregate statistics.
    pub stats: EvolutionStats,
}
