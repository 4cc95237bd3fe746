/// Capability interfaces for the external collaborators of a run
///
/// Each external program (distance estimator, repeat annotator, graph builder,
/// MSA and tree engines) sits behind one of these traits so the pipeline can be
/// driven by fixture-backed doubles in tests.
use crate::bio::SequenceRecord;
use crate::core::divergence::DistanceMatrix;
use crate::core::optimizer::OptimizedParameters;
use crate::core::repeats::RepeatInterval;
use crate::MineGraphError;
use std::path::{Path, PathBuf};

/// Pairwise distance estimation over a whole batch of sequences
pub trait DistanceEstimator: Send + Sync {
    fn name(&self) -> &str;

    /// Square matrix in the same order as `records`
    fn estimate(&self, records: &[SequenceRecord]) -> Result<DistanceMatrix, MineGraphError>;
}

/// Repeat annotation of one sequence at a time
pub trait RepeatAnnotator: Send + Sync {
    fn name(&self) -> &str;

    fn annotate(&self, record: &SequenceRecord) -> Result<Vec<RepeatInterval>, MineGraphError>;
}

/// Everything the graph builder needs for one run
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Combined, indexed FASTA of all prepared sequences
    pub input_fasta: PathBuf,
    pub output_dir: PathBuf,
    pub parameters: OptimizedParameters,
    pub haplotypes: usize,
    pub threads: usize,
}

/// Pangenome graph construction
pub trait GraphBuilder: Send + Sync {
    fn name(&self) -> &str;

    /// Build the graph and return the path of the produced GFA file
    fn build(&self, request: &BuildRequest) -> Result<PathBuf, MineGraphError>;
}

/// Multiple sequence alignment of a FASTA file
pub trait MsaBuilder: Send + Sync {
    fn name(&self) -> &str;

    fn align(&self, input: &Path, output: &Path, threads: usize) -> Result<(), MineGraphError>;
}

/// Phylogenetic tree inference from an alignment
pub trait TreeBuilder: Send + Sync {
    fn name(&self) -> &str;

    /// Infer a tree and return the path of the Newick file
    fn infer(
        &self,
        alignment: &Path,
        output_prefix: &Path,
        threads: usize,
    ) -> Result<PathBuf, MineGraphError>;
}
