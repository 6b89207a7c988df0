//! Storage module - Chromosome and image files.

mod chromosome_file;
mod image_file;

pub use chromosome_file::*;
pub use image_file::*;
