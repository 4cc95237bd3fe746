//! Sequence preparation: read the selected files, rename every record to a
//! PanSN identifier and write the combined, indexed and compressed FASTA the
//! external tools consume.

use crate::bio::fasta::{parse_fasta, write_fasta, write_fasta_index};
use crate::bio::{PanSnName, Sequence, SequenceRecord};
use crate::MineGraphError;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const COMBINED_FASTA: &str = "panSN_output.fasta";
pub const REPEAT_FASTA: &str = "repeat_input.fasta";

#[derive(Debug, Clone)]
pub struct PreparedInput {
    pub records: Vec<SequenceRecord>,
    pub combined_fasta: PathBuf,
    pub compressed_fasta: PathBuf,
    pub index: PathBuf,
    /// Subset handed to repeat annotation
    pub repeat_fasta: PathBuf,
    pub repeat_count: usize,
}

impl PreparedInput {
    /// Number of haplotypes the graph builder should expect
    pub fn haplotypes(&self) -> usize {
        self.records.len()
    }

    pub fn repeat_records(&self) -> &[SequenceRecord] {
        &self.records[..self.repeat_count]
    }
}

/// Records of one file, renamed. Empty records are dropped with a warning.
pub fn read_records(path: &Path) -> Result<Vec<SequenceRecord>, MineGraphError> {
    let sequences = parse_fasta(path)?;
    let total = sequences.len();

    let records: Vec<SequenceRecord> = sequences
        .into_iter()
        .filter_map(|seq| {
            if seq.is_empty() {
                warn!("Dropping empty record {} in {}", seq.id, path.display());
                return None;
            }
            let name = PanSnName::for_record(path, &seq.id);
            Some(SequenceRecord::new(
                name.to_string(),
                seq.id,
                path.to_path_buf(),
                seq.sequence,
            ))
        })
        .collect();

    if records.is_empty() {
        return Err(MineGraphError::Configuration(format!(
            "{} contains no sequences ({} empty records)",
            path.display(),
            total
        )));
    }
    debug!("{}: {} records", path.display(), records.len());
    Ok(records)
}

/// Read all files in parallel, keeping file order, and reject identifier collisions
pub fn load_records(files: &[PathBuf]) -> Result<Vec<SequenceRecord>, MineGraphError> {
    let per_file: Vec<Vec<SequenceRecord>> = files
        .par_iter()
        .map(|path| read_records(path))
        .collect::<Result<_, _>>()?;

    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut records = Vec::new();
    for record in per_file.into_iter().flatten() {
        if let Some(previous) = seen.get(record.id()) {
            return Err(MineGraphError::NamingConflict(format!(
                "identifier {} produced by both {} ({}) and {} ({})",
                record.id(),
                previous.display(),
                record.original_id(),
                record.source().display(),
                record.original_id()
            )));
        }
        seen.insert(record.id().to_string(), record.source().to_path_buf());
        records.push(record);
    }
    Ok(records)
}

/// Load, rename and write the prepared FASTA files into `out_dir`
pub fn prepare(
    files: &[PathBuf],
    out_dir: &Path,
    repeat_downsample: Option<usize>,
) -> Result<PreparedInput, MineGraphError> {
    info!("Preparing {} sequence files", files.len());
    let records = load_records(files)?;
    fs::create_dir_all(out_dir)?;

    let fasta: Vec<Sequence> = records.iter().map(SequenceRecord::to_fasta).collect();
    let combined_fasta = out_dir.join(COMBINED_FASTA);
    write_fasta(&combined_fasta, &fasta)?;

    let index = out_dir.join(format!("{}.fai", COMBINED_FASTA));
    write_fasta_index(&index, &fasta)?;

    let compressed_fasta = out_dir.join(format!("{}.gz", COMBINED_FASTA));
    write_fasta(&compressed_fasta, &fasta)?;

    let repeat_count = repeat_downsample
        .map(|n| n.clamp(1, records.len()))
        .unwrap_or(records.len());
    let repeat_fasta = out_dir.join(REPEAT_FASTA);
    write_fasta(&repeat_fasta, &fasta[..repeat_count])?;

    info!(
        "Prepared {} sequences ({} bp) into {}",
        records.len(),
        records.iter().map(SequenceRecord::len).sum::<usize>(),
        combined_fasta.display()
    );

    Ok(PreparedInput {
        records,
        combined_fasta,
        compressed_fasta,
        index,
        repeat_fasta,
        repeat_count,
    })
}
