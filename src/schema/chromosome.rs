//! Chromosome representation for CGP filters.
//!
//! A chromosome describes a `cols x rows` grid of blocks stored column by
//! column. Signal indices `0..PARAM_IN` are the primary inputs (the 3x3
//! neighborhood of a pixel) and `PARAM_IN..PARAM_IN + cols * rows` are block
//! outputs, so block `b` produces signal `PARAM_IN + b`.
//!
//! The flat gene layout is `(in1, in2, function)` per block followed by a
//! single output selector.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::Function;

/// Number of primary inputs (3x3 kernel).
pub const PARAM_IN: u32 = 9;

/// Number of outputs.
pub const PARAM_OUT: u32 = 1;

/// Number of genes encoding one block.
pub const BLOCK_GENES: usize = 3;

/// Grid dimensions of a CGP circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry {
    /// Number of columns.
    pub cols: u32,
    /// Number of rows.
    pub rows: u32,
}

impl Geometry {
    pub fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows }
    }

    /// Total number of blocks.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Number of addressable signals (primary inputs plus block outputs).
    #[inline]
    pub fn signal_count(&self) -> u32 {
        PARAM_IN + self.cols * self.rows
    }

    /// Number of genes in the flat encoding.
    #[inline]
    pub fn gene_count(&self) -> usize {
        self.block_count() * BLOCK_GENES + PARAM_OUT as usize
    }

    /// Column containing the block with the given signal index.
    #[inline]
    pub fn column_of_block(&self, block: u32) -> u32 {
        (block - PARAM_IN) / self.rows
    }

    /// First signal index produced by a block in `column`.
    #[inline]
    pub fn first_signal_of_column(&self, column: u32) -> u32 {
        PARAM_IN + column * self.rows
    }
}

/// One computational unit: two inputs and a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub in1: u32,
    pub in2: u32,
    pub function: Function,
}

/// Chromosome decoding and validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChromosomeError {
    #[error("Grid dimensions must be non-zero (got {cols}x{rows})")]
    EmptyGeometry { cols: u32, rows: u32 },
    #[error("Expected {expected} genes, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("Block {block} has unknown function code {code}")]
    UnknownFunction { block: u32, code: u32 },
    #[error("Block {block} input {input} does not reference an earlier column")]
    InvalidInput { block: u32, input: u32 },
    #[error("Output selector {output} is outside 0..{limit}")]
    InvalidOutput { output: u32, limit: u32 },
    #[error("Signal {index} is not a block")]
    NotABlock { index: u32 },
}

/// Structured chromosome: block records plus a separate output selector.
///
/// Deserialization goes through [`Chromosome::new`], so decoded chromosomes
/// are always valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ChromosomeParts")]
pub struct Chromosome {
    geometry: Geometry,
    blocks: Vec<Block>,
    output: u32,
}

/// Unvalidated serialized form of a [`Chromosome`].
#[derive(Deserialize)]
struct ChromosomeParts {
    geometry: Geometry,
    blocks: Vec<Block>,
    output: u32,
}

impl TryFrom<ChromosomeParts> for Chromosome {
    type Error = ChromosomeError;

    fn try_from(parts: ChromosomeParts) -> Result<Self, Self::Error> {
        Chromosome::new(parts.geometry, parts.blocks, parts.output)
    }
}

impl Chromosome {
    /// Build a chromosome from parts, checking every index invariant.
    pub fn new(
        geometry: Geometry,
        blocks: Vec<Block>,
        output: u32,
    ) -> Result<Self, ChromosomeError> {
        let chromosome = Self {
            geometry,
            blocks,
            output,
        };
        chromosome.validate()?;
        Ok(chromosome)
    }

    /// Build from parts without validation. Callers guarantee the invariants.
    pub(crate) fn from_parts_unchecked(geometry: Geometry, blocks: Vec<Block>, output: u32) -> Self {
        Self {
            geometry,
            blocks,
            output,
        }
    }

    /// Decode the flat gene layout.
    pub fn from_genes(geometry: Geometry, genes: &[u32]) -> Result<Self, ChromosomeError> {
        if geometry.cols == 0 || geometry.rows == 0 {
            return Err(ChromosomeError::EmptyGeometry {
                cols: geometry.cols,
                rows: geometry.rows,
            });
        }
        if genes.len() != geometry.gene_count() {
            return Err(ChromosomeError::LengthMismatch {
                expected: geometry.gene_count(),
                found: genes.len(),
            });
        }

        let (block_genes, output) = genes.split_at(geometry.block_count() * BLOCK_GENES);
        let blocks = block_genes
            .chunks_exact(BLOCK_GENES)
            .enumerate()
            .map(|(i, chunk)| {
                let function =
                    Function::from_code(chunk[2]).ok_or(ChromosomeError::UnknownFunction {
                        block: PARAM_IN + i as u32,
                        code: chunk[2],
                    })?;
                Ok(Block {
                    in1: chunk[0],
                    in2: chunk[1],
                    function,
                })
            })
            .collect::<Result<Vec<_>, ChromosomeError>>()?;

        Self::new(geometry, blocks, output[0])
    }

    /// Encode into the flat gene layout.
    pub fn to_genes(&self) -> Vec<u32> {
        let mut genes = Vec::with_capacity(self.geometry.gene_count());
        for block in &self.blocks {
            genes.push(block.in1);
            genes.push(block.in2);
            genes.push(block.function.code());
        }
        genes.push(self.output);
        genes
    }

    /// Check structural invariants: acyclic connectivity and index ranges.
    pub fn validate(&self) -> Result<(), ChromosomeError> {
        let geometry = self.geometry;
        if geometry.cols == 0 || geometry.rows == 0 {
            return Err(ChromosomeError::EmptyGeometry {
                cols: geometry.cols,
                rows: geometry.rows,
            });
        }
        if self.blocks.len() != geometry.block_count() {
            return Err(ChromosomeError::LengthMismatch {
                expected: geometry.gene_count(),
                found: self.blocks.len() * BLOCK_GENES + PARAM_OUT as usize,
            });
        }

        for (i, block) in self.blocks.iter().enumerate() {
            let index = PARAM_IN + i as u32;
            let limit = geometry.first_signal_of_column(geometry.column_of_block(index));
            for input in [block.in1, block.in2] {
                if input >= limit {
                    return Err(ChromosomeError::InvalidInput {
                        block: index,
                        input,
                    });
                }
            }
        }

        if self.output >= geometry.signal_count() {
            return Err(ChromosomeError::InvalidOutput {
                output: self.output,
                limit: geometry.signal_count(),
            });
        }

        Ok(())
    }

    #[inline]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// All blocks in index order.
    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Output selector.
    #[inline]
    pub fn output(&self) -> u32 {
        self.output
    }

    /// Number of genes in the flat encoding.
    #[inline]
    pub fn gene_count(&self) -> usize {
        self.geometry.gene_count()
    }

    /// Block at signal index `index` (first block is `PARAM_IN`).
    #[inline]
    pub fn block(&self, index: u32) -> Option<&Block> {
        index
            .checked_sub(PARAM_IN)
            .and_then(|i| self.blocks.get(i as usize))
    }

    /// Mutable block at signal index `index`.
    ///
    /// Callers changing inputs must keep them pointing at earlier columns.
    #[inline]
    pub(crate) fn block_mut(&mut self, index: u32) -> Option<&mut Block> {
        index
            .checked_sub(PARAM_IN)
            .and_then(|i| self.blocks.get_mut(i as usize))
    }

    /// Point the circuit output at another signal.
    pub fn set_output(&mut self, output: u32) -> Result<(), ChromosomeError> {
        if output >= self.geometry.signal_count() {
            return Err(ChromosomeError::InvalidOutput {
                output,
                limit: self.geometry.signal_count(),
            });
        }
        self.output = output;
        Ok(())
    }

    /// Set the output selector. Callers guarantee it is below the signal count.
    #[inline]
    pub(crate) fn set_output_unchecked(&mut self, output: u32) {
        debug_assert!(output < self.geometry.signal_count());
        self.output = output;
    }

    /// Mark the block at `index` as damaged.
    pub fn damage_block(&mut self, index: u32) -> Result<(), ChromosomeError> {
        let block = self
            .block_mut(index)
            .ok_or(ChromosomeError::NotABlock { index })?;
        block.function = Function::Damaged;
        Ok(())
    }

    /// Indices of blocks whose function is `Damaged`.
    pub fn damaged_blocks(&self) -> BTreeSet<u32> {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| block.function.is_damaged())
            .map(|(i, _)| PARAM_IN + i as u32)
            .collect()
    }

    /// Blocks that influence the output, in ascending index order.
    ///
    /// Evaluating blocks in this order always finds their inputs already
    /// computed because inputs only reference earlier columns.
    pub fn used_blocks(&self) -> BTreeSet<u32> {
        let mut used = BTreeSet::new();
        let mut process = VecDeque::new();
        process.push_back(self.output);

        while let Some(index) = process.pop_front() {
            if index < PARAM_IN {
                continue;
            }
            if used.insert(index)
                && let Some(block) = self.block(index)
            {
                process.push_back(block.in1);
                process.push_back(block.in2);
            }
        }

        used
    }

    /// Summary of size, live blocks and damage.
    pub fn status(&self) -> ChromosomeStatus {
        let live = self.used_blocks();
        let damaged = self.damaged_blocks();
        let damaged_live = live.intersection(&damaged).copied().collect();
        ChromosomeStatus {
            cols: self.geometry.cols,
            rows: self.geometry.rows,
            genes: self.gene_count(),
            blocks: self.blocks.len(),
            output: self.output,
            live: live.into_iter().collect(),
            damaged: damaged.into_iter().collect(),
            damaged_live,
        }
    }
}

/// Report produced by [`Chromosome::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChromosomeStatus {
    pub cols: u32,
    pub rows: u32,
    /// Chromosome length in genes.
    pub genes: usize,
    pub blocks: usize,
    pub output: u32,
    /// Blocks reachable from the output.
    pub live: Vec<u32>,
    pub damaged: Vec<u32>,
    /// Damaged blocks that still affect the output.
    pub damaged_live: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x2 grid: block 9 = x0 | x4, block 10 = max(x1, x2),
    /// block 11 = avg(9, 10), block 12 = identity(x3); output 11.
    fn sample() -> Chromosome {
        let genes = [0, 4, 3, 1, 2, 14, 9, 10, 13, 3, 3, 1, 11];
        Chromosome::from_genes(Geometry::new(2, 2), &genes).unwrap()
    }

    #[test]
    fn test_geometry_counts() {
        let geometry = Geometry::new(4, 3);
        assert_eq!(geometry.block_count(), 12);
        assert_eq!(geometry.signal_count(), 21);
        assert_eq!(geometry.gene_count(), 37);
        assert_eq!(geometry.column_of_block(9), 0);
        assert_eq!(geometry.column_of_block(12), 1);
        assert_eq!(geometry.first_signal_of_column(2), 15);
    }

    #[test]
    fn test_gene_roundtrip() {
        let chromosome = sample();
        assert_eq!(
            chromosome.to_genes(),
            vec![0, 4, 3, 1, 2, 14, 9, 10, 13, 3, 3, 1, 11]
        );
        assert_eq!(chromosome.block(11).unwrap().function, Function::IntAvg);
        assert!(chromosome.block(8).is_none());
        assert!(chromosome.block(13).is_none());
    }

    #[test]
    fn test_used_blocks() {
        let chromosome = sample();
        let used: Vec<u32> = chromosome.used_blocks().into_iter().collect();
        assert_eq!(used, vec![9, 10, 11]);
    }

    #[test]
    fn test_used_blocks_output_on_input() {
        let mut chromosome = sample();
        chromosome.set_output(4).unwrap();
        assert!(chromosome.used_blocks().is_empty());
    }

    #[test]
    fn test_rejects_same_column_input() {
        // Block 10 (column 0) reads block 9 (column 0).
        let genes = [0, 0, 1, 9, 0, 1, 0, 0, 1, 0, 0, 1, 10];
        let err = Chromosome::from_genes(Geometry::new(2, 2), &genes).unwrap_err();
        assert_eq!(
            err,
            ChromosomeError::InvalidInput {
                block: 10,
                input: 9
            }
        );
    }

    #[test]
    fn test_rejects_bad_output_and_function() {
        let genes = [0, 0, 1, 13];
        assert_eq!(
            Chromosome::from_genes(Geometry::new(1, 1), &genes).unwrap_err(),
            ChromosomeError::InvalidOutput {
                output: 13,
                limit: 10
            }
        );

        let genes = [0, 0, 17, 9];
        assert_eq!(
            Chromosome::from_genes(Geometry::new(1, 1), &genes).unwrap_err(),
            ChromosomeError::UnknownFunction { block: 9, code: 17 }
        );

        assert!(matches!(
            Chromosome::from_genes(Geometry::new(1, 1), &[0, 0, 1]),
            Err(ChromosomeError::LengthMismatch {
                expected: 4,
                found: 3
            })
        ));
    }

    #[test]
    fn test_damage_block() {
        let mut chromosome = sample();
        assert!(chromosome.damaged_blocks().is_empty());

        chromosome.damage_block(10).unwrap();
        chromosome.damage_block(12).unwrap();
        let damaged: Vec<u32> = chromosome.damaged_blocks().into_iter().collect();
        assert_eq!(damaged, vec![10, 12]);

        assert_eq!(
            chromosome.damage_block(3),
            Err(ChromosomeError::NotABlock { index: 3 })
        );
    }

    #[test]
    fn test_status() {
        let mut chromosome = sample();
        chromosome.damage_block(10).unwrap();
        chromosome.damage_block(12).unwrap();

        let status = chromosome.status();
        assert_eq!(status.genes, 13);
        assert_eq!(status.blocks, 4);
        assert_eq!(status.live, vec![9, 10, 11]);
        assert_eq!(status.damaged, vec![10, 12]);
        assert_eq!(status.damaged_live, vec![10]);
    }

    #[test]
    fn test_json_decoding_validates() {
        let json = serde_json::to_string(&sample()).unwrap();
        let decoded: Chromosome = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, sample());

        // Block 9 reading the later block 11 must be rejected.
        let forward = json.replacen("\"in1\":0", "\"in1\":11", 1);
        assert_ne!(forward, json);
        assert!(serde_json::from_str::<Chromosome>(&forward).is_err());

        let bad_output = json.replace("\"output\":11", "\"output\":40");
        assert_ne!(bad_output, json);
        assert!(serde_json::from_str::<Chromosome>(&bad_output).is_err());
    }
}
