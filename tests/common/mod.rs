//! Shared setup for the integration tests
//!
//! Builds a temporary data directory with FASTA inputs and provides
//! hand-written GFA graphs for the fixture graph builder.
#![allow(dead_code)]

use minegraph::core::config::Config;
use minegraph::core::context::RunContext;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestEnvironment {
    temp_dir: TempDir,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("data");
        fs::create_dir_all(&data_dir).expect("Failed to create data dir");
        let output_dir = temp_dir.path().join("results");

        TestEnvironment {
            temp_dir,
            data_dir,
            output_dir,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a single-record FASTA file into the data directory
    pub fn add_fasta(&self, file_name: &str, header: &str, sequence: &[u8]) -> PathBuf {
        let path = self.data_dir.join(file_name);
        let mut text = format!(">{}\n", header).into_bytes();
        text.extend_from_slice(sequence);
        text.push(b'\n');
        fs::write(&path, text).expect("Failed to write FASTA");
        path
    }

    pub fn add_file(&self, file_name: &str, contents: &str) -> PathBuf {
        let path = self.root().join(file_name);
        fs::write(&path, contents).expect("Failed to write file");
        path
    }

    pub fn context(&self, config: Config) -> RunContext {
        RunContext::new(config, &self.data_dir, &self.output_dir)
    }
}

/// Deterministic pseudo-random DNA
pub fn random_dna(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 33) as usize % 4]
        })
        .collect()
}

/// GFA with one P line per (name, steps) pair; links are derived from the paths
pub fn gfa_from_paths(segments: &[(u64, &str)], paths: &[(&str, &[u64])]) -> String {
    let mut out = String::from("H\tVN:Z:1.0\n");
    for (id, seq) in segments {
        out.push_str(&format!("S\t{}\t{}\n", id, seq));
    }
    let mut links = std::collections::BTreeSet::new();
    for (_, steps) in paths {
        for pair in steps.windows(2) {
            links.insert((pair[0], pair[1]));
        }
    }
    for (a, b) in links {
        out.push_str(&format!("L\t{}\t+\t{}\t+\t0M\n", a, b));
    }
    for (name, steps) in paths {
        let steps: Vec<String> = steps.iter().map(|s| format!("{}+", s)).collect();
        out.push_str(&format!("P\t{}\t{}\t*\n", name, steps.join(",")));
    }
    out
}

/// Three paths over a linear 4-node chain
pub fn chain_gfa() -> String {
    gfa_from_paths(
        &[(1, "ACGTA"), (2, "CC"), (3, "GTTA"), (4, "TTGCA")],
        &[
            ("s1#1#chr", &[1, 2, 3, 4]),
            ("s2#1#chr", &[1, 2, 3, 4]),
            ("s3#1#chr", &[1, 2, 3, 4]),
        ],
    )
}

/// Three 20 bp paths; s2 carries T instead of A at position 10
pub fn snp_gfa() -> String {
    gfa_from_paths(
        &[(1, "ACGTTGCAG"), (2, "A"), (3, "T"), (4, "CCGTAGGCTA")],
        &[
            ("s1#1#chr", &[1, 2, 4]),
            ("s2#1#chr", &[1, 3, 4]),
            ("s3#1#chr", &[1, 2, 4]),
        ],
    )
}
