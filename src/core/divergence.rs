//! Pairwise divergence estimation and its reduction to an identity threshold.

use crate::bio::SequenceRecord;
use crate::core::sketch::MinHashSketch;
use crate::tools::traits::DistanceEstimator;
use crate::MineGraphError;
use rayon::prelude::*;
use serde::Serialize;
use std::io::Write;
use tracing::{debug, info};

const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Square, symmetric matrix of pairwise distances with a zero diagonal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceMatrix {
    ids: Vec<String>,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// All-zero matrix over `ids`
    pub fn new(ids: Vec<String>) -> Self {
        let n = ids.len();
        Self {
            ids,
            values: vec![0.0; n * n],
        }
    }

    /// Build from full rows, checking the matrix invariants
    pub fn from_rows(ids: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, MineGraphError> {
        let n = ids.len();
        if rows.len() != n || rows.iter().any(|r| r.len() != n) {
            return Err(MineGraphError::Parse(format!(
                "distance matrix over {} sequences is not square",
                n
            )));
        }

        let matrix = Self {
            ids,
            values: rows.into_iter().flatten().collect(),
        };
        matrix.validate()?;
        Ok(matrix)
    }

    fn validate(&self) -> Result<(), MineGraphError> {
        let n = self.len();
        for i in 0..n {
            if self.get(i, i) != 0.0 {
                return Err(MineGraphError::Parse(format!(
                    "self-distance of {} is {}, expected 0",
                    self.ids[i],
                    self.get(i, i)
                )));
            }
            for j in (i + 1)..n {
                let (a, b) = (self.get(i, j), self.get(j, i));
                if !(0.0..=1.0).contains(&a) || !(0.0..=1.0).contains(&b) {
                    return Err(MineGraphError::Parse(format!(
                        "distance between {} and {} is outside [0, 1]",
                        self.ids[i], self.ids[j]
                    )));
                }
                if (a - b).abs() > SYMMETRY_TOLERANCE {
                    return Err(MineGraphError::Parse(format!(
                        "distance matrix is not symmetric at ({}, {})",
                        self.ids[i], self.ids[j]
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.len() + j]
    }

    pub fn get_by_id(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.ids.iter().position(|id| id == a)?;
        let j = self.ids.iter().position(|id| id == b)?;
        Some(self.get(i, j))
    }

    /// Set both (i, j) and (j, i); the diagonal stays zero
    pub fn set_pair(&mut self, i: usize, j: usize, distance: f64) {
        if i == j {
            return;
        }
        let n = self.len();
        let d = distance.clamp(0.0, 1.0);
        self.values[i * n + j] = d;
        self.values[j * n + i] = d;
    }

    /// Largest off-diagonal entry (0 for fewer than two sequences)
    pub fn max_divergence(&self) -> f64 {
        let n = self.len();
        (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .map(|(i, j)| self.get(i, j))
            .fold(0.0, f64::max)
    }

    /// Tab-separated square matrix with a header row
    pub fn write_tsv<W: Write>(&self, writer: &mut W) -> Result<(), MineGraphError> {
        write!(writer, "id")?;
        for id in &self.ids {
            write!(writer, "\t{}", id)?;
        }
        writeln!(writer)?;
        for (i, id) in self.ids.iter().enumerate() {
            write!(writer, "{}", id)?;
            for j in 0..self.len() {
                write!(writer, "\t{:.6}", self.get(i, j))?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

/// `1 - max_divergence`, never below `floor` and never above 1
pub fn identity_threshold(max_divergence: f64, floor: f64) -> f64 {
    (1.0 - max_divergence).max(floor).min(1.0)
}

#[derive(Debug, Clone, Serialize)]
pub struct DivergenceEstimate {
    pub matrix: DistanceMatrix,
    pub max_divergence: f64,
    pub identity_threshold: f64,
}

/// Run the estimator over all records and reduce the matrix to a threshold
pub fn estimate_divergence(
    records: &[SequenceRecord],
    estimator: &dyn DistanceEstimator,
    floor: f64,
) -> Result<DivergenceEstimate, MineGraphError> {
    if records.len() < 2 {
        return Err(MineGraphError::InsufficientInput(format!(
            "divergence needs at least 2 sequences, got {}",
            records.len()
        )));
    }

    info!(
        "Estimating pairwise divergence of {} sequences with {}",
        records.len(),
        estimator.name()
    );
    let matrix = estimator.estimate(records)?;
    if matrix.len() != records.len() {
        return Err(MineGraphError::Parse(format!(
            "{} returned a {}x{} matrix for {} sequences",
            estimator.name(),
            matrix.len(),
            matrix.len(),
            records.len()
        )));
    }

    let max_divergence = matrix.max_divergence();
    let threshold = identity_threshold(max_divergence, floor);
    info!(
        "Maximum divergence {:.4} -> identity threshold {:.4}",
        max_divergence, threshold
    );

    Ok(DivergenceEstimate {
        matrix,
        max_divergence,
        identity_threshold: threshold,
    })
}

/// In-process MinHash estimator; sketches are computed in parallel
#[derive(Debug, Clone)]
pub struct MinHashEstimator {
    pub kmer_size: usize,
    pub sketch_size: usize,
}

impl MinHashEstimator {
    pub fn new(kmer_size: usize, sketch_size: usize) -> Self {
        Self {
            kmer_size,
            sketch_size,
        }
    }
}

impl DistanceEstimator for MinHashEstimator {
    fn name(&self) -> &str {
        "minhash"
    }

    fn estimate(&self, records: &[SequenceRecord]) -> Result<DistanceMatrix, MineGraphError> {
        let sketches: Vec<MinHashSketch> = records
            .par_iter()
            .map(|r| {
                let sketch =
                    MinHashSketch::from_sequence(r.sequence(), self.kmer_size, self.sketch_size)?;
                debug!("Sketched {} ({} hashes)", r.id(), sketch.hashes().len());
                Ok(sketch)
            })
            .collect::<Result<_, MineGraphError>>()?;

        let n = records.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();
        let distances: Vec<f64> = pairs
            .par_iter()
            .map(|&(i, j)| sketches[i].distance(&sketches[j]))
            .collect();

        let mut matrix = DistanceMatrix::new(records.iter().map(|r| r.id().to_string()).collect());
        for (&(i, j), d) in pairs.iter().zip(distances) {
            matrix.set_pair(i, j, d);
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("s{}#1#c", i)).collect()
    }

    #[test]
    fn test_max_divergence() {
        let matrix = DistanceMatrix::from_rows(
            ids(3),
            vec![
                vec![0.0, 0.02, 0.10],
                vec![0.02, 0.0, 0.05],
                vec![0.10, 0.05, 0.0],
            ],
        )
        .unwrap();
        assert_eq!(matrix.max_divergence(), 0.10);
        assert_eq!(matrix.get_by_id("s2#1#c", "s0#1#c"), Some(0.10));
    }

    #[test]
    fn test_asymmetric_matrix_rejected() {
        let err = DistanceMatrix::from_rows(ids(2), vec![vec![0.0, 0.1], vec![0.2, 0.0]]).unwrap_err();
        assert!(matches!(err, MineGraphError::Parse(_)));
    }

    #[test]
    fn test_nonzero_diagonal_rejected() {
        assert!(DistanceMatrix::from_rows(ids(2), vec![vec![0.1, 0.1], vec![0.1, 0.0]]).is_err());
    }

    #[test]
    fn test_identity_threshold_clamps() {
        assert!((identity_threshold(0.05, 0.7) - 0.95).abs() < 1e-12);
        assert_eq!(identity_threshold(0.9, 0.7), 0.7);
        assert_eq!(identity_threshold(0.0, 0.7), 1.0);
    }

    #[test]
    fn test_single_sequence_is_insufficient() {
        let records = vec![SequenceRecord::from_parts("a#1#c", b"ACGTACGT")];
        let estimator = MinHashEstimator::new(5, 100);
        let err = estimate_divergence(&records, &estimator, 0.7).unwrap_err();
        assert!(matches!(err, MineGraphError::InsufficientInput(_)));
    }

    #[test]
    fn test_identical_sequences_give_full_identity() {
        let seq = b"ATGGCGTACGATCGATCGGCTAGCTAGGCTTACGATCGACTAGCATCG";
        let records = vec![
            SequenceRecord::from_parts("a#1#c", seq),
            SequenceRecord::from_parts("b#1#c", seq),
        ];
        let estimate =
            estimate_divergence(&records, &MinHashEstimator::new(11, 500), 0.7).unwrap();
        assert_eq!(estimate.max_divergence, 0.0);
        assert_eq!(estimate.identity_threshold, 1.0);
    }

    #[test]
    fn test_oversized_kmer_is_configuration_error() {
        let records = vec![
            SequenceRecord::from_parts("a#1#c", b"ACGTACGTAC"),
            SequenceRecord::from_parts("b#1#c", b"ACGTACGTAC"),
        ];
        let err = estimate_divergence(&records, &MinHashEstimator::new(40, 100), 0.7).unwrap_err();
        assert!(matches!(err, MineGraphError::Configuration(_)), "got {:?}", err);
    }

    #[test]
    fn test_tsv_output() {
        let mut matrix = DistanceMatrix::new(ids(2));
        matrix.set_pair(0, 1, 0.25);
        let mut out = Vec::new();
        matrix.write_tsv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "id\ts0#1#c\ts1#1#c\ns0#1#c\t0.000000\t0.250000\ns1#1#c\t0.250000\t0.000000\n"
        );
    }
}
