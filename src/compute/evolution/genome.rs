//! Chromosome generation, mutation and damage.

use std::collections::BTreeSet;

use rand::prelude::*;

use crate::compute::Topology;
use crate::schema::{BLOCK_GENES, Block, Chromosome, Function, PARAM_IN};

/// Random number generator wrapper for chromosome operations.
pub struct ChromosomeRng {
    rng: StdRng,
}

impl ChromosomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Generate a random chromosome.
    ///
    /// Inputs are drawn from each column's connection table. Blocks listed in
    /// `damaged` get the `Damaged` function, all others a random working one.
    pub fn random_chromosome(&mut self, topology: &Topology, damaged: &BTreeSet<u32>) -> Chromosome {
        let geometry = topology.geometry();
        let mut blocks = Vec::with_capacity(geometry.block_count());

        for col in 0..geometry.cols {
            let table = topology.column(col);
            for row in 0..geometry.rows {
                let index = geometry.first_signal_of_column(col) + row;
                let in1 = *table.choose(&mut self.rng).unwrap_or(&0);
                let in2 = *table.choose(&mut self.rng).unwrap_or(&0);
                let function = if damaged.contains(&index) {
                    Function::Damaged
                } else {
                    self.random_function()
                };
                blocks.push(Block { in1, in2, function });
            }
        }

        let output = self.random_output(topology);
        Chromosome::from_parts_unchecked(geometry, blocks, output)
    }

    /// Uniform function excluding `Damaged`.
    pub fn random_function(&mut self) -> Function {
        Function::GENERATABLE[self.rng.gen_range(0..Function::GENERATABLE.len())]
    }

    /// Uniform output selector over every signal.
    fn random_output(&mut self, topology: &Topology) -> u32 {
        self.rng.gen_range(0..topology.geometry().signal_count())
    }

    /// Apply between 1 and `mutation_max` point mutations.
    ///
    /// Function genes of damaged blocks are never touched. If the drawn
    /// mutations leave the chromosome unchanged, single mutations are repeated
    /// until it differs. Returns the number of point mutations that changed a
    /// gene value.
    pub fn mutate(
        &mut self,
        chromosome: &mut Chromosome,
        topology: &Topology,
        damaged: &BTreeSet<u32>,
        mutation_max: u32,
    ) -> usize {
        let before = chromosome.clone();
        let count = self.rng.gen_range(1..=mutation_max.max(1));
        let mut changed = 0;
        for _ in 0..count {
            if self.mutate_gene(chromosome, topology, damaged) {
                changed += 1;
            }
        }
        while *chromosome == before {
            if self.mutate_gene(chromosome, topology, damaged) {
                changed += 1;
            }
        }
        changed
    }

    /// Mutate one randomly selected gene. Returns whether its value changed.
    fn mutate_gene(
        &mut self,
        chromosome: &mut Chromosome,
        topology: &Topology,
        damaged: &BTreeSet<u32>,
    ) -> bool {
        let block_genes = chromosome.geometry().block_count() * BLOCK_GENES;
        let gene = self.rng.gen_range(0..chromosome.gene_count());

        if gene >= block_genes {
            let output = self.random_output(topology);
            let changed = output != chromosome.output();
            chromosome.set_output_unchecked(output);
            return changed;
        }

        let index = PARAM_IN + (gene / BLOCK_GENES) as u32;
        let slot = gene % BLOCK_GENES;
        if slot == 2 && damaged.contains(&index) {
            return false;
        }

        let value = match slot {
            0 | 1 => {
                let table = topology.column(topology.column_of_gene(gene));
                Gene::Input(*table.choose(&mut self.rng).unwrap_or(&0))
            }
            _ => Gene::Function(self.random_function()),
        };

        let Some(block) = chromosome.block_mut(index) else {
            return false;
        };
        match (slot, value) {
            (0, Gene::Input(v)) => std::mem::replace(&mut block.in1, v) != v,
            (1, Gene::Input(v)) => std::mem::replace(&mut block.in2, v) != v,
            (_, Gene::Function(f)) => std::mem::replace(&mut block.function, f) != f,
            _ => false,
        }
    }

    /// Mark one random non-damaged block as damaged.
    ///
    /// Returns the damaged block index, or `None` if every block is already
    /// damaged.
    pub fn damage_random_block(&mut self, chromosome: &mut Chromosome) -> Option<u32> {
        let candidates: Vec<u32> = chromosome
            .blocks()
            .iter()
            .enumerate()
            .filter(|(_, block)| !block.function.is_damaged())
            .map(|(i, _)| PARAM_IN + i as u32)
            .collect();

        let index = *candidates.choose(&mut self.rng)?;
        chromosome.damage_block(index).ok()?;
        Some(index)
    }
}

/// New value drawn for a block gene.
enum Gene {
    Input(u32),
    Function(Function),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Geometry;
    use proptest::prelude::*;

    fn topology() -> Topology {
        Topology::new(Geometry::new(5, 3), 2)
    }

    fn assert_respects_topology(chromosome: &Chromosome, topology: &Topology) {
        chromosome.validate().unwrap();
        for (i, block) in chromosome.blocks().iter().enumerate() {
            let index = PARAM_IN + i as u32;
            assert!(topology.allows(index, block.in1));
            assert!(topology.allows(index, block.in2));
        }
        assert!(chromosome.output() < topology.geometry().signal_count());
    }

    #[test]
    fn test_random_chromosome() {
        let topology = topology();
        let mut rng = ChromosomeRng::new(42);
        for _ in 0..50 {
            let chromosome = rng.random_chromosome(&topology, &BTreeSet::new());
            assert_eq!(chromosome.gene_count(), 5 * 3 * 3 + 1);
            assert_respects_topology(&chromosome, &topology);
            assert!(chromosome.damaged_blocks().is_empty());
        }
    }

    #[test]
    fn test_random_chromosome_forces_damaged() {
        let topology = topology();
        let damaged: BTreeSet<u32> = [9, 14, 23].into_iter().collect();
        let mut rng = ChromosomeRng::new(7);
        let chromosome = rng.random_chromosome(&topology, &damaged);
        assert_eq!(chromosome.damaged_blocks(), damaged);
    }

    #[test]
    fn test_mutation_keeps_invariants_and_changes_something() {
        let topology = topology();
        let mut rng = ChromosomeRng::new(1);
        let mut chromosome = rng.random_chromosome(&topology, &BTreeSet::new());

        for _ in 0..500 {
            let before = chromosome.clone();
            let changed = rng.mutate(&mut chromosome, &topology, &BTreeSet::new(), 3);
            assert!(changed >= 1);
            assert_ne!(before, chromosome);
            assert_respects_topology(&chromosome, &topology);
        }
    }

    #[test]
    fn test_mutation_never_repairs_damaged_blocks() {
        let topology = topology();
        let damaged: BTreeSet<u32> = [10, 11, 20].into_iter().collect();
        let mut rng = ChromosomeRng::new(3);
        let mut chromosome = rng.random_chromosome(&topology, &damaged);

        for _ in 0..2000 {
            rng.mutate(&mut chromosome, &topology, &damaged, 5);
            for &index in &damaged {
                assert_eq!(chromosome.block(index).unwrap().function, Function::Damaged);
            }
        }
    }

    #[test]
    fn test_mutation_never_introduces_damaged() {
        let topology = topology();
        let mut rng = ChromosomeRng::new(11);
        let mut chromosome = rng.random_chromosome(&topology, &BTreeSet::new());
        for _ in 0..2000 {
            rng.mutate(&mut chromosome, &topology, &BTreeSet::new(), 4);
        }
        assert!(chromosome.damaged_blocks().is_empty());
    }

    #[test]
    fn test_damage_random_block() {
        let topology = Topology::new(Geometry::new(2, 1), 1);
        let mut rng = ChromosomeRng::new(5);
        let mut chromosome = rng.random_chromosome(&topology, &BTreeSet::new());

        let first = rng.damage_random_block(&mut chromosome).unwrap();
        let second = rng.damage_random_block(&mut chromosome).unwrap();
        assert_ne!(first, second);
        assert_eq!(chromosome.damaged_blocks().len(), 2);
        assert_eq!(rng.damage_random_block(&mut chromosome), None);
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let topology = topology();
        let a = ChromosomeRng::new(99).random_chromosome(&topology, &BTreeSet::new());
        let b = ChromosomeRng::new(99).random_chromosome(&topology, &BTreeSet::new());
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_used_blocks_are_reachable(
            seed in any::<u64>(),
            cols in 1u32..8,
            rows in 1u32..5,
            l_back in 0u32..8,
        ) {
            let geometry = Geometry::new(cols, rows);
            let topology = Topology::new(geometry, l_back);
            let chromosome = ChromosomeRng::new(seed).random_chromosome(&topology, &BTreeSet::new());
            let used = chromosome.used_blocks();

            for &index in &used {
                prop_assert!(index >= PARAM_IN && index < geometry.signal_count());
                // Reached either directly from the output or through another used block.
                let referenced = index == chromosome.output()
                    || used.iter().any(|&other| {
                        let block = chromosome.block(other).unwrap();
                        block.in1 == index || block.in2 == index
                    });
                prop_assert!(referenced);
            }

            // Hops from the output: each step moves to an earlier column.
            let mut hops = std::collections::BTreeMap::new();
            if used.contains(&chromosome.output()) {
                hops.insert(chromosome.output(), 1u32);
            }
            for &index in used.iter().rev() {
                let depth = hops[&index];
                let block = chromosome.block(index).unwrap();
                for input in [block.in1, block.in2] {
                    if input >= PARAM_IN {
                        let entry = hops.entry(input).or_insert(depth + 1);
                        *entry = (*entry).min(depth + 1);
                    }
                }
            }
            prop_assert_eq!(hops.len(), used.len());
            for &depth in hops.values() {
                prop_assert!(depth <= cols);
            }

            // Inputs point to earlier columns, so the output block is the largest.
            if let Some(&top) = used.iter().next_back() {
                prop_assert!(top == chromosome.output());
            }
        }
    }
}
