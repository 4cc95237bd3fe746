//! Bottom-k MinHash sketches over canonical nucleotide k-mers.
//!
//! Distances follow the Mash estimator: with Jaccard estimate `j`,
//! `D = -1/k * ln(2j / (1 + j))`, saturating at 1 when no hashes are shared.

use crate::MineGraphError;
use xxhash_rust::xxh3::xxh3_64;

pub const MAX_KMER_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinHashSketch {
    kmer_size: usize,
    sketch_size: usize,
    /// Sorted ascending, deduplicated, at most `sketch_size` entries
    hashes: Vec<u64>,
}

#[inline]
fn encode_base(base: u8) -> Option<u64> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

impl MinHashSketch {
    /// Sketch a sequence. Windows containing non-ACGT symbols are skipped.
    pub fn from_sequence(
        sequence: &[u8],
        kmer_size: usize,
        sketch_size: usize,
    ) -> Result<Self, MineGraphError> {
        if !(1..=MAX_KMER_SIZE).contains(&kmer_size) {
            return Err(MineGraphError::Configuration(format!(
                "k-mer size must be between 1 and {}, got {}",
                MAX_KMER_SIZE, kmer_size
            )));
        }

        let mask = if kmer_size == 32 {
            u64::MAX
        } else {
            (1u64 << (2 * kmer_size)) - 1
        };
        let shift = 2 * (kmer_size as u64 - 1);

        let mut forward = 0u64;
        let mut reverse = 0u64;
        let mut valid = 0usize;
        let mut hashes = Vec::with_capacity(sequence.len().saturating_sub(kmer_size) + 1);

        for &base in sequence {
            match encode_base(base) {
                Some(code) => {
                    forward = ((forward << 2) | code) & mask;
                    reverse = (reverse >> 2) | ((3 - code) << shift);
                    valid += 1;
                }
                None => {
                    valid = 0;
                    forward = 0;
                    reverse = 0;
                    continue;
                }
            }

            if valid >= kmer_size {
                let canonical = forward.min(reverse);
                hashes.push(xxh3_64(&canonical.to_le_bytes()));
            }
        }

        hashes.sort_unstable();
        hashes.dedup();
        hashes.truncate(sketch_size);

        Ok(Self {
            kmer_size,
            sketch_size,
            hashes,
        })
    }

    pub fn kmer_size(&self) -> usize {
        self.kmer_size
    }

    pub fn hashes(&self) -> &[u64] {
        &self.hashes
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Jaccard estimate from the bottom-k of the union of both sketches
    pub fn jaccard(&self, other: &MinHashSketch) -> f64 {
        let limit = self.sketch_size.min(other.sketch_size);
        let (a, b) = (&self.hashes, &other.hashes);
        let (mut i, mut j) = (0, 0);
        let mut union = 0usize;
        let mut shared = 0usize;

        while union < limit && (i < a.len() || j < b.len()) {
            match (a.get(i), b.get(j)) {
                (Some(x), Some(y)) if x == y => {
                    shared += 1;
                    i += 1;
                    j += 1;
                }
                (Some(x), Some(y)) if x < y => i += 1,
                (Some(_), Some(_)) => j += 1,
                (Some(_), None) => i += 1,
                (None, Some(_)) => j += 1,
                (None, None) => break,
            }
            union += 1;
        }

        if union == 0 {
            0.0
        } else {
            shared as f64 / union as f64
        }
    }

    /// Mash distance in [0, 1]
    pub fn distance(&self, other: &MinHashSketch) -> f64 {
        let j = self.jaccard(other);
        if j <= 0.0 {
            return 1.0;
        }
        let d = -(2.0 * j / (1.0 + j)).ln() / self.kmer_size as f64;
        d.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEQ: &[u8] = b"ATGGCGTACGATCGATCGGCTAGCTAGGCTTACGATCGACTAGCATCGACTGACTGGACTAGC";

    fn revcomp(seq: &[u8]) -> Vec<u8> {
        seq.iter()
            .rev()
            .map(|b| match b {
                b'A' => b'T',
                b'C' => b'G',
                b'G' => b'C',
                b'T' => b'A',
                other => *other,
            })
            .collect()
    }

    #[test]
    fn test_identical_sequences_have_zero_distance() {
        let a = MinHashSketch::from_sequence(SEQ, 11, 100).unwrap();
        let b = MinHashSketch::from_sequence(SEQ, 11, 100).unwrap();
        assert_eq!(a.jaccard(&b), 1.0);
        assert_eq!(a.distance(&b), 0.0);
    }

    #[test]
    fn test_reverse_complement_is_canonical() {
        let a = MinHashSketch::from_sequence(SEQ, 11, 100).unwrap();
        let b = MinHashSketch::from_sequence(&revcomp(SEQ), 11, 100).unwrap();
        assert_eq!(a.hashes(), b.hashes());
    }

    #[test]
    fn test_unrelated_sequences_are_distant() {
        let a = MinHashSketch::from_sequence(&[b'A'; 64], 11, 100).unwrap();
        let b = MinHashSketch::from_sequence(&[b'C'; 64], 11, 100).unwrap();
        // AAAA.. and CCCC.. share no canonical k-mers (GGGG.. is C's complement)
        assert_eq!(a.distance(&b), 1.0);
    }

    #[test]
    fn test_single_mismatch_increases_distance() {
        let mut mutated = SEQ.to_vec();
        mutated[30] = if mutated[30] == b'A' { b'C' } else { b'A' };
        let a = MinHashSketch::from_sequence(SEQ, 11, 1000).unwrap();
        let b = MinHashSketch::from_sequence(&mutated, 11, 1000).unwrap();
        let d = a.distance(&b);
        assert!(d > 0.0 && d < 0.2, "distance was {}", d);
    }

    #[test]
    fn test_ambiguous_bases_break_kmers() {
        let sketch = MinHashSketch::from_sequence(b"ACGTNACGT", 5, 10).unwrap();
        assert!(sketch.is_empty());
    }

    #[test]
    fn test_invalid_kmer_size_is_rejected() {
        for k in [0, MAX_KMER_SIZE + 1] {
            let err = MinHashSketch::from_sequence(SEQ, k, 100).unwrap_err();
            assert!(matches!(err, MineGraphError::Configuration(_)), "k={}: {:?}", k, err);
        }
        assert!(MinHashSketch::from_sequence(SEQ, MAX_KMER_SIZE, 100).is_ok());
    }
}
