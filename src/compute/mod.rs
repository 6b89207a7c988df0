//! Compute module - Circuit evaluation, topology and evolutionary search.

mod circuit;
mod function;
mod topology;

pub mod evolution;

pub use circuit::*;
pub use topology::*;
