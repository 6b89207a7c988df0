//! Evolutionary search for image filters.
//!
//! # Overview
//!
//! - **Genome Operations** (`genome`): Random chromosomes, point mutation, damage
//! - **Fitness** (`fitness`): Pixel error against training image pairs
//! - **Search** (`search`): Multi-run (1+λ) evolution strategy
//!
//! # Example
//!
//! ```rust,no_run
//! use cgp_filter::compute::evolution::{EvolutionEngine, TrainingSet};
//! use cgp_filter::schema::{CgpConfig, Image};
//!
//! let input = Image::filled(16, 16, 100);
//! let target = Image::filled(16, 16, 50);
//! let training = TrainingSet::new(vec![input], vec![target]).unwrap();
//!
//! let mut engine = EvolutionEngine::new(CgpConfig::default(), training).unwrap();
//! let result = engine.run_with_callback(|progress| {
//!     if progress.generation % 1000 == 0 {
//!         println!("Run {} generation {}: fitness = {}",
//!             progress.run, progress.generation, progress.elite_fitness);
//!     }
//! });
//!
//! println!("Best fitness: {}", result.best_fitness);
//! ```

mod fitness;
mod genome;
mod search;

pub use fitness::{FitnessEvaluator, FitnessScratch, TrainingSet, TrainingSetError, WORST_FITNESS};
pub use genome::ChromosomeRng;
pub use search::{Candidate, EvolutionEngine};
