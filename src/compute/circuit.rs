//! Circuit evaluation and filter application.
//!
//! A [`CircuitEvaluator`] owns the block output cache used while evaluating a
//! chromosome. It is reused across pixels of an image, but each in-flight
//! evaluation needs its own evaluator.

use std::collections::BTreeSet;

use crate::schema::{Chromosome, Image, PARAM_IN};

/// Number of neighborhood samples fed to the circuit.
pub const NEIGHBORHOOD: usize = PARAM_IN as usize;

/// Scratch state for evaluating CGP circuits.
#[derive(Debug, Clone, Default)]
pub struct CircuitEvaluator {
    /// Cached block outputs, indexed by `signal - PARAM_IN`.
    outputs: Vec<u8>,
}

impl CircuitEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the live blocks for one neighborhood and return the output.
    ///
    /// `live` must be the result of [`Chromosome::used_blocks`] for
    /// `chromosome`.
    pub fn apply(
        &mut self,
        chromosome: &Chromosome,
        live: &BTreeSet<u32>,
        inputs: &[u8; NEIGHBORHOOD],
    ) -> u8 {
        let blocks = chromosome.geometry().block_count();
        if self.outputs.len() != blocks {
            self.outputs.resize(blocks, 0);
        }

        let all = chromosome.blocks();
        for &index in live {
            let slot = (index - PARAM_IN) as usize;
            let block = &all[slot];
            let x = self.signal(block.in1, inputs);
            let y = self.signal(block.in2, inputs);
            self.outputs[slot] = block.function.eval(x, y);
        }

        self.signal(chromosome.output(), inputs)
    }

    /// Resolve a signal index to a primary input or cached block output.
    #[inline]
    fn signal(&self, index: u32, inputs: &[u8; NEIGHBORHOOD]) -> u8 {
        if index < PARAM_IN {
            inputs[index as usize]
        } else {
            self.outputs[(index - PARAM_IN) as usize]
        }
    }

    /// Apply the filter to every pixel of `image`, writing into `result`.
    ///
    /// `result` is resized to the image size.
    pub fn use_filter_into(
        &mut self,
        chromosome: &Chromosome,
        live: &BTreeSet<u32>,
        image: &Image,
        result: &mut Vec<u8>,
    ) {
        let (width, height) = (image.width(), image.height());
        result.clear();
        result.resize(width * height, 0);

        let mut inputs = [0u8; NEIGHBORHOOD];
        for y in 0..height {
            for x in 0..width {
                gather_neighborhood(image, x, y, &mut inputs);
                result[y * width + x] = self.apply(chromosome, live, &inputs);
            }
        }
    }

    /// Apply the filter to `image` and return the filtered image.
    pub fn use_filter(&mut self, chromosome: &Chromosome, image: &Image) -> Image {
        let live = chromosome.used_blocks();
        let mut pixels = Vec::new();
        self.use_filter_into(chromosome, &live, image, &mut pixels);
        Image::from_raw(image.width(), image.height(), pixels)
    }
}

/// Collect the 3x3 neighborhood of `(x, y)` in row-major order.
///
/// Coordinates outside the image are clamped to the nearest edge pixel. An
/// empty image yields an all-zero neighborhood.
#[inline]
pub fn gather_neighborhood(image: &Image, x: usize, y: usize, inputs: &mut [u8; NEIGHBORHOOD]) {
    if image.is_empty() {
        inputs.fill(0);
        return;
    }

    let max_x = image.width() - 1;
    let max_y = image.height() - 1;
    let x = x.min(max_x);
    let y = y.min(max_y);
    let xs = [x.saturating_sub(1), x, (x + 1).min(max_x)];
    let ys = [y.saturating_sub(1), y, (y + 1).min(max_y)];

    let mut cnt = 0;
    for &sy in &ys {
        for &sx in &xs {
            inputs[cnt] = image.get(sx, sy);
            cnt += 1;
        }
    }
}
