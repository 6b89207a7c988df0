//! Column connectivity tables for a CGP grid.
//!
//! A block in column `i` may read any primary input and any block output from
//! columns `[i - l_back, i)`. Because no column reads itself or a later column,
//! every circuit built from these tables is acyclic.

use crate::schema::{BLOCK_GENES, Geometry, PARAM_IN};

/// Precomputed legal connection indices per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    geometry: Geometry,
    l_back: u32,
    columns: Vec<Vec<u32>>,
}

impl Topology {
    /// Build connection tables for the given grid and look-back.
    pub fn new(geometry: Geometry, l_back: u32) -> Self {
        let columns = (0..geometry.cols)
            .map(|col| {
                let first = geometry.first_signal_of_column(col.saturating_sub(l_back));
                let end = geometry.first_signal_of_column(col);
                (0..PARAM_IN).chain(first..end).collect()
            })
            .collect();

        Self {
            geometry,
            l_back,
            columns,
        }
    }

    #[inline]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    #[inline]
    pub fn l_back(&self) -> u32 {
        self.l_back
    }

    /// Legal input indices for blocks in `column`.
    #[inline]
    pub fn column(&self, column: u32) -> &[u32] {
        &self.columns[column as usize]
    }

    /// Legal input indices for the block with signal index `block`.
    #[inline]
    pub fn inputs_for_block(&self, block: u32) -> &[u32] {
        self.column(self.geometry.column_of_block(block))
    }

    /// Column owning the flat gene at `gene` (block region only).
    #[inline]
    pub fn column_of_gene(&self, gene: usize) -> u32 {
        (gene / (self.geometry.rows as usize * BLOCK_GENES)) as u32
    }

    /// Whether `block` may read signal `source`.
    pub fn allows(&self, block: u32, source: u32) -> bool {
        self.inputs_for_block(block).binary_search(&source).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_column_reads_inputs_only() {
        let topology = Topology::new(Geometry::new(4, 2), 1);
        assert_eq!(topology.column(0), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_look_back_window() {
        let topology = Topology::new(Geometry::new(4, 2), 2);
        // Column 3 sees columns 1 and 2: blocks 11..15.
        let expected: Vec<u32> = (0..9).chain(11..15).collect();
        assert_eq!(topology.column(3), expected.as_slice());
        // Column 1 is clipped at column 0.
        let expected: Vec<u32> = (0..9).chain(9..11).collect();
        assert_eq!(topology.column(1), expected.as_slice());
    }

    #[test]
    fn test_full_connectivity_when_l_back_exceeds_cols() {
        let topology = Topology::new(Geometry::new(3, 3), 10);
        let expected: Vec<u32> = (0..9).chain(9..15).collect();
        assert_eq!(topology.column(2), expected.as_slice());
    }

    #[test]
    fn test_zero_l_back_reads_inputs_only() {
        let topology = Topology::new(Geometry::new(3, 2), 0);
        for col in 0..3 {
            assert_eq!(topology.column(col).len(), PARAM_IN as usize);
        }
    }

    #[test]
    fn test_look_back_and_rows_widen_tables() {
        let topology = Topology::new(Geometry::new(3, 2), 1);
        assert_eq!(topology.column(2).len(), 9 + 2);
        assert_eq!(Topology::new(Geometry::new(3, 2), 2).column(2).len(), 9 + 4);
        assert_eq!(Topology::new(Geometry::new(3, 4), 1).column(2).len(), 9 + 4);
    }

    #[test]
    fn test_gene_and_block_columns() {
        let topology = Topology::new(Geometry::new(3, 2), 1);
        assert_eq!(topology.column_of_gene(0), 0);
        assert_eq!(topology.column_of_gene(5), 0);
        assert_eq!(topology.column_of_gene(6), 1);
        assert_eq!(topology.column_of_gene(17), 2);
        assert!(topology.allows(13, 11));
        assert!(topology.allows(13, 0));
        assert!(!topology.allows(13, 9));
        assert!(!topology.allows(13, 13));
    }

    proptest! {
        #[test]
        fn prop_tables_only_reach_earlier_columns(
            cols in 1u32..8,
            rows in 1u32..6,
            l_back in 0u32..10,
        ) {
            let geometry = Geometry::new(cols, rows);
            let topology = Topology::new(geometry, l_back);
            for col in 0..cols {
                let table = topology.column(col);
                prop_assert_eq!(&table[..PARAM_IN as usize], &(0..PARAM_IN).collect::<Vec<_>>()[..]);
                for &index in &table[PARAM_IN as usize..] {
                    let source_col = geometry.column_of_block(index);
                    prop_assert!(source_col < col);
                    prop_assert!(col - source_col <= l_back);
                }
                let visible = l_back.min(col) * rows;
                prop_assert_eq!(table.len(), (PARAM_IN + visible) as usize);
            }
        }
    }
}
