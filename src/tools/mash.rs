use super::{run_tool, DistanceEstimator, Tool};
use crate::bio::fasta::write_fasta;
use crate::bio::SequenceRecord;
use crate::core::divergence::DistanceMatrix;
use crate::MineGraphError;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// `mash triangle -i` over the prepared sequences
pub struct MashEstimator {
    binary_path: PathBuf,
    kmer_size: usize,
    sketch_size: usize,
    threads: usize,
}

impl MashEstimator {
    pub fn new(binary_path: PathBuf, kmer_size: usize, sketch_size: usize, threads: usize) -> Self {
        Self {
            binary_path,
            kmer_size,
            sketch_size,
            threads,
        }
    }
}

impl DistanceEstimator for MashEstimator {
    fn name(&self) -> &str {
        "mash"
    }

    fn estimate(&self, records: &[SequenceRecord]) -> Result<DistanceMatrix, MineGraphError> {
        let scratch = tempfile::Builder::new().prefix("minegraph-mash").tempdir()?;
        let input = scratch.path().join("sequences.fasta");
        let fasta: Vec<_> = records.iter().map(SequenceRecord::to_fasta).collect();
        write_fasta(&input, &fasta)?;

        let output = run_tool(
            Tool::Mash,
            &self.binary_path,
            [
                "triangle".to_string(),
                "-i".to_string(),
                "-k".to_string(),
                self.kmer_size.to_string(),
                "-s".to_string(),
                self.sketch_size.to_string(),
                "-p".to_string(),
                self.threads.max(1).to_string(),
                input.to_string_lossy().to_string(),
            ],
            Some(scratch.path()),
        )?;

        let text = String::from_utf8_lossy(&output.stdout);
        let (names, rows) = parse_triangle(&text)?;
        debug!("mash reported {} sequences", names.len());
        reorder(records, names, rows)
    }
}

/// Parse `mash triangle` output into names and a full square matrix
pub fn parse_triangle(text: &str) -> Result<(Vec<String>, Vec<Vec<f64>>), MineGraphError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let count: usize = lines
        .next()
        .and_then(|l| l.trim().parse().ok())
        .ok_or_else(|| MineGraphError::Parse("mash triangle output lacks a count line".into()))?;

    let mut names = Vec::with_capacity(count);
    let mut rows = vec![vec![0.0; count]; count];

    for (i, line) in lines.enumerate() {
        if i >= count {
            return Err(MineGraphError::Parse(format!(
                "mash triangle output has more than {} rows",
                count
            )));
        }
        let mut fields = line.split('\t');
        let name = fields.next().unwrap_or_default().trim().to_string();
        let values: Vec<f64> = fields
            .map(|f| {
                f.trim().parse::<f64>().map_err(|_| {
                    MineGraphError::Parse(format!("invalid mash distance '{}' for {}", f, name))
                })
            })
            .collect::<Result<_, _>>()?;
        if values.len() != i {
            return Err(MineGraphError::Parse(format!(
                "mash row {} ({}) has {} distances, expected {}",
                i,
                name,
                values.len(),
                i
            )));
        }
        for (j, d) in values.into_iter().enumerate() {
            rows[i][j] = d;
            rows[j][i] = d;
        }
        names.push(name);
    }

    if names.len() != count {
        return Err(MineGraphError::Parse(format!(
            "mash triangle announced {} rows but produced {}",
            count,
            names.len()
        )));
    }

    Ok((names, rows))
}

/// Put the matrix into the order of `records`
fn reorder(
    records: &[SequenceRecord],
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
) -> Result<DistanceMatrix, MineGraphError> {
    let position: HashMap<&str, usize> = names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();

    let order = records
        .iter()
        .map(|r| {
            position.get(r.id()).copied().ok_or_else(|| {
                MineGraphError::Parse(format!("mash output is missing sequence {}", r.id()))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ordered_rows = order
        .iter()
        .map(|&i| order.iter().map(|&j| rows[i][j]).collect())
        .collect();

    DistanceMatrix::from_rows(
        records.iter().map(|r| r.id().to_string()).collect(),
        ordered_rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "3\nb#1#c\na#1#c\t0.0125\nc#1#c\t0.0310\t0.0200\n";

    #[test]
    fn test_parse_triangle() {
        let (names, rows) = parse_triangle(TRIANGLE).unwrap();
        assert_eq!(names, vec!["b#1#c", "a#1#c", "c#1#c"]);
        assert_eq!(rows[0][1], 0.0125);
        assert_eq!(rows[2][0], 0.0310);
        assert_eq!(rows[1][2], 0.0200);
    }

    #[test]
    fn test_reorder_to_record_order() {
        let (names, rows) = parse_triangle(TRIANGLE).unwrap();
        let records = vec![
            SequenceRecord::from_parts("a#1#c", b"A"),
            SequenceRecord::from_parts("b#1#c", b"A"),
            SequenceRecord::from_parts("c#1#c", b"A"),
        ];
        let matrix = reorder(&records, names, rows).unwrap();
        assert_eq!(matrix.get(0, 1), 0.0125);
        assert_eq!(matrix.get(0, 2), 0.0200);
        assert_eq!(matrix.max_divergence(), 0.0310);
    }

    #[test]
    fn test_truncated_output() {
        assert!(parse_triangle("3\nb#1#c\na#1#c\t0.01\n").is_err());
        assert!(parse_triangle("").is_err());
    }
}
