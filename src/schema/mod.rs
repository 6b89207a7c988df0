//! Schema module - Configuration, chromosome and image types for CGP filters.

mod chromosome;
mod config;
mod evolution;
mod function;
mod image;

pub use chromosome::*;
pub use config::*;
pub use evolution::*;
pub use function::*;
pub use image::*;
