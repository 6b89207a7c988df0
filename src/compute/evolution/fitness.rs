//! Fitness evaluation against training image pairs.
//!
//! Fitness is the sum of absolute per-pixel differences between the filtered
//! training inputs and their targets. Lower is better; `u64::MAX` marks a
//! candidate whose error could not be represented.

use std::collections::BTreeSet;

use log::debug;

use crate::compute::CircuitEvaluator;
use crate::schema::{Chromosome, Image};

/// Fitness value meaning "worst possible".
pub const WORST_FITNESS: u64 = u64::MAX;

/// Training set construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrainingSetError {
    #[error("Training set is empty")]
    Empty,
    #[error("{inputs} input images but {targets} target images")]
    CountMismatch { inputs: usize, targets: usize },
    #[error("Pair {index}: input {input} is {input_size:?} but target {target} is {target_size:?}")]
    SizeMismatch {
        index: usize,
        input: String,
        target: String,
        input_size: (usize, usize),
        target_size: (usize, usize),
    },
}

/// Input images paired with the desired filter outputs.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    inputs: Vec<Image>,
    targets: Vec<Image>,
}

impl TrainingSet {
    /// Pair inputs with targets. Both lists must match in length and sizes.
    pub fn new(inputs: Vec<Image>, targets: Vec<Image>) -> Result<Self, TrainingSetError> {
        if inputs.len() != targets.len() {
            return Err(TrainingSetError::CountMismatch {
                inputs: inputs.len(),
                targets: targets.len(),
            });
        }
        if inputs.is_empty() {
            return Err(TrainingSetError::Empty);
        }
        for (index, (input, target)) in inputs.iter().zip(&targets).enumerate() {
            if !input.same_size(target) {
                return Err(TrainingSetError::SizeMismatch {
                    index,
                    input: input.label(),
                    target: target.label(),
                    input_size: (input.width(), input.height()),
                    target_size: (target.width(), target.height()),
                });
            }
        }
        Ok(Self { inputs, targets })
    }

    /// Iterate over `(input, target)` pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (&Image, &Image)> {
        self.inputs.iter().zip(&self.targets)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Per-evaluation scratch buffers.
#[derive(Debug, Default)]
pub struct FitnessScratch {
    circuit: CircuitEvaluator,
    result: Vec<u8>,
}

impl FitnessScratch {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Scores chromosomes against a training set.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    training: TrainingSet,
}

impl FitnessEvaluator {
    /// Create a new fitness evaluator.
    pub fn new(training: TrainingSet) -> Self {
        Self { training }
    }

    pub fn training(&self) -> &TrainingSet {
        &self.training
    }

    /// Fitness of `chromosome`, allocating fresh scratch buffers.
    pub fn fitness(&self, chromosome: &Chromosome) -> u64 {
        self.evaluate(chromosome, &mut FitnessScratch::new())
    }

    /// Fitness of `chromosome` using caller-owned scratch buffers.
    pub fn evaluate(&self, chromosome: &Chromosome, scratch: &mut FitnessScratch) -> u64 {
        let live = chromosome.used_blocks();
        self.evaluate_live(chromosome, &live, scratch)
    }

    fn evaluate_live(
        &self,
        chromosome: &Chromosome,
        live: &BTreeSet<u32>,
        scratch: &mut FitnessScratch,
    ) -> u64 {
        let mut fitness = 0u64;

        for (input, target) in self.training.pairs() {
            if input.is_empty() {
                debug!("Skipping empty training image {}", input.label());
                continue;
            }

            scratch
                .circuit
                .use_filter_into(chromosome, live, input, &mut scratch.result);

            let diffs = target
                .pixels()
                .iter()
                .zip(&scratch.result)
                .map(|(&want, &got)| want.abs_diff(got) as u64);
            fitness = add_error(fitness, diffs);
            if fitness == WORST_FITNESS {
                return WORST_FITNESS;
            }
        }

        fitness
    }
}

/// Add pixel errors to `fitness`, returning [`WORST_FITNESS`] on overflow.
fn add_error(fitness: u64, diffs: impl Iterator<Item = u64>) -> u64 {
    let mut sum = fitness;
    for diff in diffs {
        match sum.checked_add(diff) {
            Some(next) => sum = next,
            None => return WORST_FITNESS,
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Block, Function, Geometry};

    fn single_block(function: Function, input: u32) -> Chromosome {
        Chromosome::new(
            Geometry::new(1, 1),
            vec![Block {
                in1: input,
                in2: input,
                function,
            }],
            9,
        )
        .unwrap()
    }

    fn image(width: usize, height: usize, pixels: &[u8]) -> Image {
        Image::new(width, height, pixels.to_vec()).unwrap()
    }

    #[test]
    fn test_exact_match_is_zero() {
        let input = image(3, 2, &[10, 20, 30, 40, 50, 60]);
        let training = TrainingSet::new(vec![input.clone()], vec![input]).unwrap();
        let evaluator = FitnessEvaluator::new(training);
        assert_eq!(evaluator.fitness(&single_block(Function::Identity, 4)), 0);
    }

    #[test]
    fn test_all_zero_pixel() {
        let zero = image(1, 1, &[0]);
        let training = TrainingSet::new(vec![zero.clone()], vec![zero]).unwrap();
        let evaluator = FitnessEvaluator::new(training);
        for input in 0..9 {
            assert_eq!(evaluator.fitness(&single_block(Function::Identity, input)), 0);
        }
    }

    #[test]
    fn test_sums_absolute_differences() {
        let input = image(2, 1, &[10, 200]);
        let target = image(2, 1, &[15, 100]);
        let training = TrainingSet::new(vec![input.clone(), input], vec![target.clone(), target])
            .unwrap();
        let evaluator = FitnessEvaluator::new(training);
        // Identity gives 10, 200 → |15-10| + |100-200| = 105, twice.
        assert_eq!(evaluator.fitness(&single_block(Function::Identity, 4)), 210);
        // Constant 255 → 240 + 155 = 395, twice.
        assert_eq!(evaluator.fitness(&single_block(Function::MaxVal, 4)), 790);
        // Damaged → 15 + 100 = 115, twice.
        assert_eq!(evaluator.fitness(&single_block(Function::Damaged, 4)), 230);
    }

    #[test]
    fn test_skips_empty_images() {
        let empty = Image::filled(0, 3, 0);
        let pixel = image(1, 1, &[9]);
        let training =
            TrainingSet::new(vec![empty.clone(), pixel], vec![empty, image(1, 1, &[4])]).unwrap();
        let evaluator = FitnessEvaluator::new(training);
        assert_eq!(evaluator.fitness(&single_block(Function::Identity, 4)), 5);
    }

    #[test]
    fn test_scratch_reuse_matches_fresh() {
        let input = image(3, 3, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let target = image(3, 3, &[9, 8, 7, 6, 5, 4, 3, 2, 1]);
        let training = TrainingSet::new(vec![input], vec![target]).unwrap();
        let evaluator = FitnessEvaluator::new(training);

        let mut scratch = FitnessScratch::new();
        for function in Function::ALL {
            let chromosome = single_block(function, 0);
            assert_eq!(
                evaluator.evaluate(&chromosome, &mut scratch),
                evaluator.fitness(&chromosome)
            );
        }
    }

    #[test]
    fn test_training_set_validation() {
        let a = image(2, 2, &[0; 4]);
        let b = image(2, 1, &[0; 2]);
        assert_eq!(
            TrainingSet::new(vec![a.clone()], vec![]).unwrap_err(),
            TrainingSetError::CountMismatch {
                inputs: 1,
                targets: 0
            }
        );
        assert_eq!(
            TrainingSet::new(vec![], vec![]).unwrap_err(),
            TrainingSetError::Empty
        );
        assert!(matches!(
            TrainingSet::new(vec![a], vec![b]),
            Err(TrainingSetError::SizeMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn test_error_sum_saturates() {
        let start = u64::MAX - 3;
        assert_eq!(add_error(start, [2, 2].into_iter()), WORST_FITNESS);
        assert_eq!(add_error(start, [1, 2].into_iter()), u64::MAX);
        assert_eq!(add_error(start, [3, 0, 0].into_iter()), u64::MAX);
        assert_eq!(add_error(u64::MAX, [0].into_iter()), u64::MAX);
        assert_eq!(add_error(10, [1, 255, 4].into_iter()), 270);
        assert_eq!(add_error(7, std::iter::empty()), 7);
    }
}
