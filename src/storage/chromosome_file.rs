//! Binary chromosome files.
//!
//! Layout, all little-endian `u32`:
//!
//! ```text
//! cols | rows | genes[3 * cols * rows + 1]
//! ```
//!
//! There is no magic or version field; the file is fully described by its
//! geometry header.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::schema::{Chromosome, Geometry, PARAM_IN};

/// Size of the geometry header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Encoded size of `chromosome` in bytes.
pub fn encoded_size(chromosome: &Chromosome) -> usize {
    HEADER_SIZE + chromosome.gene_count() * 4
}

/// Write a chromosome to output.
pub fn write_chromosome<W: Write>(chromosome: &Chromosome, w: &mut W) -> io::Result<()> {
    let geometry = chromosome.geometry();
    w.write_all(&geometry.cols.to_le_bytes())?;
    w.write_all(&geometry.rows.to_le_bytes())?;
    for gene in chromosome.to_genes() {
        w.write_all(&gene.to_le_bytes())?;
    }
    Ok(())
}

/// Read a chromosome from input.
///
/// The whole input must be consumed: trailing bytes are rejected, as are
/// chromosomes that fail validation.
pub fn read_chromosome<R: Read>(r: &mut R) -> io::Result<Chromosome> {
    let mut buf4 = [0u8; 4];

    r.read_exact(&mut buf4)?;
    let cols = u32::from_le_bytes(buf4);

    r.read_exact(&mut buf4)?;
    let rows = u32::from_le_bytes(buf4);

    let gene_count = checked_gene_count(cols, rows).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Chromosome geometry {}x{} is too large", cols, rows),
        )
    })?;

    // Capacity is bounded so a corrupt header cannot force a huge allocation.
    let mut genes = Vec::with_capacity(gene_count.min(1 << 16));
    for _ in 0..gene_count {
        r.read_exact(&mut buf4)?;
        genes.push(u32::from_le_bytes(buf4));
    }

    let mut extra = [0u8; 1];
    if r.read(&mut extra)? != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Trailing bytes after chromosome",
        ));
    }

    Chromosome::from_genes(Geometry::new(cols, rows), &genes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Gene count for a geometry, or `None` if signal indices would not fit `u32`.
fn checked_gene_count(cols: u32, rows: u32) -> Option<usize> {
    let blocks = cols.checked_mul(rows)?;
    blocks.checked_add(PARAM_IN)?;
    usize::try_from(blocks).ok()?.checked_mul(3)?.checked_add(1)
}

/// Save a chromosome to a file.
pub fn save_chromosome<P: AsRef<Path>>(chromosome: &Chromosome, path: P) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_chromosome(chromosome, &mut writer)?;
    writer.flush()
}

/// Load a chromosome from a file.
pub fn load_chromosome<P: AsRef<Path>>(path: P) -> io::Result<Chromosome> {
    let mut reader = BufReader::new(File::open(path)?);
    read_chromosome(&mut reader)
}
