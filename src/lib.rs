//! CGP filter - Evolutionary design of image filters.
//!
//! This crate evolves 3x3 neighborhood image filters with Cartesian Genetic
//! Programming. A filter is a grid of two-input blocks operating on 8-bit
//! values; the grid is searched with a (1+λ) evolution strategy that
//! minimizes pixel error against training image pairs. Blocks can be marked
//! damaged to study how well evolution routes around faults.
//!
//! # Architecture
//!
//! - `schema`: Chromosome, configuration, image and result types
//! - `compute`: Block functions, topology, circuit evaluation and evolution
//! - `storage`: Chromosome and image files
//!
//! # Example
//!
//! ```rust,no_run
//! use cgp_filter::{
//!     compute::{CircuitEvaluator, evolution::{EvolutionEngine, TrainingSet}},
//!     schema::CgpConfig,
//!     storage::{load_image, save_chromosome, save_image},
//! };
//!
//! let input = load_image("noisy.png").unwrap();
//! let target = load_image("clean.png").unwrap();
//! let training = TrainingSet::new(vec![input.clone()], vec![target]).unwrap();
//!
//! let mut engine = EvolutionEngine::new(CgpConfig::default(), training).unwrap();
//! let result = engine.run();
//! save_chromosome(&result.best, "filter.chr").unwrap();
//!
//! let filtered = CircuitEvaluator::new().use_filter(&result.best, &input);
//! save_image(&filtered, "filtered.png").unwrap();
//! ```

pub mod compute;
pub mod schema;
pub mod storage;

// Re-export commonly used types
pub use compute::evolution::{EvolutionEngine, FitnessEvaluator, TrainingSet};
pub use compute::{CircuitEvaluator, Topology};
pub use schema::{CgpConfig, Chromosome, Function, Image};
