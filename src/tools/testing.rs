//! Fixture-backed doubles for the external tools
//!
//! These let the pipeline run end to end without mash, RepeatMasker or pggb
//! installed. Each double counts its invocations so tests can assert that a
//! failing run never reached a tool.

use super::traits::{
    BuildRequest, DistanceEstimator, GraphBuilder, MsaBuilder, RepeatAnnotator, TreeBuilder,
};
use crate::bio::fasta::parse_fasta;
use crate::bio::SequenceRecord;
use crate::core::divergence::DistanceMatrix;
use crate::core::repeats::RepeatInterval;
use crate::MineGraphError;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

fn fixture_failure(tool: &str, reason: &str) -> MineGraphError {
    MineGraphError::ToolInvocation {
        tool: tool.to_string(),
        status: "exit status: 1".to_string(),
        stderr: reason.to_string(),
    }
}

/// Returns either a fixed pairwise distance or distances looked up by id pair
#[derive(Default)]
pub struct FixtureDistanceEstimator {
    default_distance: f64,
    pairs: HashMap<(String, String), f64>,
    fail: bool,
    calls: AtomicUsize,
}

impl FixtureDistanceEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same distance for every off-diagonal pair
    pub fn uniform(distance: f64) -> Self {
        Self {
            default_distance: distance,
            ..Self::default()
        }
    }

    pub fn with_distance(mut self, a: &str, b: &str, distance: f64) -> Self {
        self.pairs.insert((a.to_string(), b.to_string()), distance);
        self.pairs.insert((b.to_string(), a.to_string()), distance);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DistanceEstimator for FixtureDistanceEstimator {
    fn name(&self) -> &str {
        "fixture-distance"
    }

    fn estimate(&self, records: &[SequenceRecord]) -> Result<DistanceMatrix, MineGraphError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(fixture_failure(self.name(), "fixture configured to fail"));
        }

        let mut matrix = DistanceMatrix::new(records.iter().map(|r| r.id().to_string()).collect());
        for i in 0..records.len() {
            for j in (i + 1)..records.len() {
                let key = (records[i].id().to_string(), records[j].id().to_string());
                let d = self.pairs.get(&key).copied().unwrap_or(self.default_distance);
                matrix.set_pair(i, j, d);
            }
        }
        Ok(matrix)
    }
}

/// Returns canned intervals per sequence id, or fails for selected ids
#[derive(Default)]
pub struct FixtureRepeatAnnotator {
    intervals: HashMap<String, Vec<RepeatInterval>>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FixtureRepeatAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_intervals(mut self, sequence_id: &str, intervals: Vec<RepeatInterval>) -> Self {
        self.intervals.insert(sequence_id.to_string(), intervals);
        self
    }

    pub fn failing_on(mut self, sequence_id: &str) -> Self {
        self.failing.insert(sequence_id.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RepeatAnnotator for FixtureRepeatAnnotator {
    fn name(&self) -> &str {
        "fixture-repeats"
    }

    fn annotate(&self, record: &SequenceRecord) -> Result<Vec<RepeatInterval>, MineGraphError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(record.id()) {
            return Err(fixture_failure(self.name(), &format!("cannot annotate {}", record.id())));
        }
        Ok(self.intervals.get(record.id()).cloned().unwrap_or_default())
    }
}

/// Copies a prepared GFA into the requested output directory
pub struct FixtureGraphBuilder {
    gfa: String,
    requests: Mutex<Vec<BuildRequest>>,
}

impl FixtureGraphBuilder {
    pub fn from_gfa(gfa: impl Into<String>) -> Self {
        Self {
            gfa: gfa.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, MineGraphError> {
        Ok(Self::from_gfa(fs::read_to_string(path)?))
    }

    /// Requests seen so far, in call order
    pub fn requests(&self) -> Vec<BuildRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.requests().len()
    }
}

impl GraphBuilder for FixtureGraphBuilder {
    fn name(&self) -> &str {
        "fixture-graph"
    }

    fn build(&self, request: &BuildRequest) -> Result<PathBuf, MineGraphError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        fs::create_dir_all(&request.output_dir)?;
        let path = request.output_dir.join("fixture.smooth.final.gfa");
        fs::write(&path, &self.gfa)?;
        Ok(path)
    }
}

/// "Aligns" by copying the input through unchanged
#[derive(Default)]
pub struct FixtureMsaBuilder;

impl MsaBuilder for FixtureMsaBuilder {
    fn name(&self) -> &str {
        "fixture-msa"
    }

    fn align(&self, input: &Path, output: &Path, _threads: usize) -> Result<(), MineGraphError> {
        fs::copy(input, output)?;
        Ok(())
    }
}

/// Writes a star tree over the alignment's sequence names
#[derive(Default)]
pub struct FixtureTreeBuilder;

impl TreeBuilder for FixtureTreeBuilder {
    fn name(&self) -> &str {
        "fixture-tree"
    }

    fn infer(
        &self,
        alignment: &Path,
        output_prefix: &Path,
        _threads: usize,
    ) -> Result<PathBuf, MineGraphError> {
        let names: Vec<String> = parse_fasta(alignment)?
            .into_iter()
            .map(|s| s.id.replace('#', "_"))
            .collect();
        let mut tree = output_prefix.as_os_str().to_owned();
        tree.push(".treefile");
        let tree = PathBuf::from(tree);
        fs::write(&tree, format!("({});\n", names.join(",")))?;
        Ok(tree)
    }
}
