//! End-to-end run: prepare, estimate, optimize, build, analyze.
//!
//! Every run stages its outputs in a [`RunWorkspace`]; external programs are
//! reached only through the capability traits held by a [`ToolSet`].

use crate::bio::fasta::write_fasta;
use crate::bio::Sequence;
use crate::core::analysis::{run_analysis, AnalysisOutputs};
use crate::core::config::{save_config, Config, DistanceBackend, RepeatBackend};
use crate::core::context::RunContext;
use crate::core::divergence::{estimate_divergence, MinHashEstimator};
use crate::core::manifest::{resolve_inputs, Manifest};
use crate::core::optimizer::{optimize, BuilderParams, OptimizedParameters, ParameterBounds};
use crate::core::preparer::{prepare, PreparedInput};
use crate::core::repeats::{estimate_repeats, TandemRepeatScanner};
use crate::graph::consensus::Consensus;
use crate::graph::Graph;
use crate::report::{path_sequences, write_json};
use crate::tools::{
    BuildRequest, DistanceEstimator, GraphBuilder, IqTreeBuilder, MafftAligner, MashEstimator,
    MsaBuilder, PggbBuilder, RepeatAnnotator, RepeatMaskerAnnotator, Tool, TreeBuilder,
};
use crate::utils::workspace::RunWorkspace;
use crate::MineGraphError;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub const DISTANCE_MATRIX: &str = "distance_matrix.tsv";
pub const REPEATS_JSON: &str = "repeats.json";
pub const PARAMS_YAML: &str = "params.yaml";
pub const PHYLO_INPUT: &str = "phylo_input.fasta";
pub const ALIGNMENT: &str = "alignment.fasta";
pub const TREE_PREFIX: &str = "tree";
/// Effective configuration, saved under `metadata/`
pub const CONFIG_FILE: &str = "config.toml";

/// Minimum number of sequences handed to tree inference
const MIN_TREE_SEQUENCES: usize = 3;

/// The external collaborators of one run
#[derive(Clone)]
pub struct ToolSet {
    pub distance: Arc<dyn DistanceEstimator>,
    pub repeats: Arc<dyn RepeatAnnotator>,
    pub builder: Option<Arc<dyn GraphBuilder>>,
    pub msa: Option<Arc<dyn MsaBuilder>>,
    pub tree: Option<Arc<dyn TreeBuilder>>,
}

impl ToolSet {
    pub fn new(distance: Arc<dyn DistanceEstimator>, repeats: Arc<dyn RepeatAnnotator>) -> Self {
        Self {
            distance,
            repeats,
            builder: None,
            msa: None,
            tree: None,
        }
    }

    pub fn with_builder(mut self, builder: Arc<dyn GraphBuilder>) -> Self {
        self.builder = Some(builder);
        self
    }

    pub fn with_phylogeny(mut self, msa: Arc<dyn MsaBuilder>, tree: Arc<dyn TreeBuilder>) -> Self {
        self.msa = Some(msa);
        self.tree = Some(tree);
        self
    }

    /// Distance and repeat backends selected in the config
    pub fn for_estimation(config: &Config, threads: usize) -> Result<Self, MineGraphError> {
        let est = &config.estimation;
        let distance: Arc<dyn DistanceEstimator> = match config.tools.distance {
            DistanceBackend::Native => Arc::new(MinHashEstimator::new(est.kmer_size, est.sketch_size)),
            DistanceBackend::Mash => Arc::new(MashEstimator::new(
                Tool::Mash.resolve(config.tools.mash.as_deref())?,
                est.kmer_size,
                est.sketch_size,
                threads,
            )),
        };
        let repeats: Arc<dyn RepeatAnnotator> = match config.tools.repeats {
            RepeatBackend::Native => Arc::new(TandemRepeatScanner::new(
                est.max_repeat_period,
                est.min_repeat_copies,
                est.min_repeat_length,
            )),
            RepeatBackend::RepeatMasker => Arc::new(RepeatMaskerAnnotator::new(
                Tool::RepeatMasker.resolve(config.tools.repeatmasker.as_deref())?,
                config.tools.repeatmasker_species.clone(),
            )),
        };
        Ok(Self::new(distance, repeats))
    }

    /// Full tool set: estimation backends, pggb, and MAFFT/IQ-TREE when
    /// phylogeny is enabled
    pub fn from_config(config: &Config, threads: usize) -> Result<Self, MineGraphError> {
        let mut tools = Self::for_estimation(config, threads)?.with_builder(Arc::new(
            PggbBuilder::new(Tool::Pggb.resolve(config.tools.pggb.as_deref())?),
        ));
        if config.analysis.phylogeny {
            tools = tools.with_phylogeny(
                Arc::new(MafftAligner::new(Tool::Mafft.resolve(config.tools.mafft.as_deref())?)),
                Arc::new(IqTreeBuilder::new(Tool::IqTree.resolve(config.tools.iqtree.as_deref())?)),
            );
        }
        Ok(tools)
    }
}

pub struct Pipeline {
    context: RunContext,
    tools: ToolSet,
}

impl Pipeline {
    pub fn new(context: RunContext, tools: ToolSet) -> Self {
        Self { context, tools }
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Selected input files in run order
    pub fn resolve_inputs(&self) -> Result<Vec<PathBuf>, MineGraphError> {
        let manifest = match &self.context.manifest {
            Some(path) => Some(Manifest::load(path)?),
            None => None,
        };
        resolve_inputs(&self.context.data_dir, manifest.as_ref())
    }

    pub fn prepare(&mut self, files: &[PathBuf], out_dir: &Path) -> Result<PreparedInput, MineGraphError> {
        let prepared = prepare(files, out_dir, self.context.config.estimation.repeat_downsample)?;
        self.context.summary.inputs = files.to_vec();
        self.context.summary.sequences = prepared.records.len();
        Ok(prepared)
    }

    /// Divergence and repeat estimation run concurrently, then the optimizer
    /// combines them. Writes the matrix, the repeat intervals and `params.yaml`.
    pub fn estimate(
        &mut self,
        prepared: &PreparedInput,
        out_dir: &Path,
    ) -> Result<OptimizedParameters, MineGraphError> {
        let config = &self.context.config;
        let tools = &self.tools;
        let show_progress = self.context.show_progress;

        let (divergence, repeats) = rayon::join(
            || estimate_divergence(&prepared.records, tools.distance.as_ref(), config.bounds.min_identity),
            || {
                estimate_repeats(
                    prepared.repeat_records(),
                    tools.repeats.as_ref(),
                    config.bounds.fallback_segment,
                    show_progress,
                )
            },
        );
        let divergence = divergence?;

        let parameters = optimize(
            divergence.identity_threshold,
            repeats.segment_length,
            &ParameterBounds::from(&config.bounds),
        );

        fs::create_dir_all(out_dir)?;
        let mut writer = BufWriter::new(File::create(out_dir.join(DISTANCE_MATRIX))?);
        divergence.matrix.write_tsv(&mut writer)?;
        writer.flush()?;
        write_json(&out_dir.join(REPEATS_JSON), &repeats)?;

        let params = BuilderParams::new(&parameters, prepared.haplotypes(), self.context.threads());
        fs::write(out_dir.join(PARAMS_YAML), serde_yaml::to_string(&params)?)?;

        let summary = &mut self.context.summary;
        summary.max_divergence = Some(divergence.max_divergence);
        summary.identity_threshold = Some(divergence.identity_threshold);
        summary.longest_repeat = repeats.longest_repeat;
        summary.excluded_from_repeats = repeats.excluded;
        summary.parameters = Some(parameters);
        Ok(parameters)
    }

    pub fn build_graph(
        &mut self,
        prepared: &PreparedInput,
        parameters: OptimizedParameters,
        out_dir: &Path,
    ) -> Result<PathBuf, MineGraphError> {
        let builder = self.tools.builder.as_ref().ok_or_else(|| {
            MineGraphError::Configuration("no graph builder configured".to_string())
        })?;
        let request = BuildRequest {
            input_fasta: prepared.combined_fasta.clone(),
            output_dir: out_dir.to_path_buf(),
            parameters,
            haplotypes: prepared.haplotypes(),
            threads: self.context.threads(),
        };
        info!(
            "Building graph with {} (identity {:.1}%, segment {})",
            builder.name(),
            parameters.identity_percent(),
            parameters.segment_length
        );
        builder.build(&request)
    }

    /// Reports go to `<root>/analysis`, exports to `<root>/exports`
    pub fn analyze(
        &mut self,
        gfa: &Path,
        parameters: Option<OptimizedParameters>,
        root: &Path,
    ) -> Result<AnalysisOutputs, MineGraphError> {
        let outputs = run_analysis(gfa, &self.context.config.analysis, root, parameters)?;
        let stats = &outputs.report.statistics;
        let summary = &mut self.context.summary;
        summary.graph_nodes = Some(stats.node_count);
        summary.graph_edges = Some(stats.edge_count);
        summary.graph_paths = Some(stats.path_count);
        summary.polymorphisms = Some(outputs.report.variants.records.len());
        summary.consensus_length = Some(outputs.report.consensus.sequence.len());
        Ok(outputs)
    }

    /// Align the path sequences with the consensus and infer a tree.
    ///
    /// Returns `None` when no MSA/tree engines are configured or there are
    /// too few sequences.
    pub fn phylogeny(
        &mut self,
        graph: &Graph,
        consensus: &Consensus,
        out_dir: &Path,
    ) -> Result<Option<PathBuf>, MineGraphError> {
        let (msa, tree) = match (&self.tools.msa, &self.tools.tree) {
            (Some(msa), Some(tree)) => (msa, tree),
            _ => {
                info!("Phylogeny not configured, skipping MSA and tree inference");
                return Ok(None);
            }
        };

        let mut sequences: Vec<Sequence> = path_sequences(graph);
        if !consensus.is_empty() {
            sequences.push(consensus.to_fasta());
        }
        if sequences.len() < MIN_TREE_SEQUENCES {
            info!(
                "Only {} sequences, skipping tree inference (needs {})",
                sequences.len(),
                MIN_TREE_SEQUENCES
            );
            return Ok(None);
        }

        fs::create_dir_all(out_dir)?;
        let input = out_dir.join(PHYLO_INPUT);
        write_fasta(&input, &sequences)?;

        let threads = self.context.threads();
        let alignment = out_dir.join(ALIGNMENT);
        info!("Aligning {} sequences with {}", sequences.len(), msa.name());
        msa.align(&input, &alignment, threads)?;
        info!("Inferring tree with {}", tree.name());
        let treefile = tree.infer(&alignment, &out_dir.join(TREE_PREFIX), threads)?;
        Ok(Some(treefile))
    }

    /// Run `stage` inside a fresh workspace; finalize on success, keep the
    /// partial directory and record the error otherwise
    fn staged<F>(&mut self, command: &str, stage: F) -> Result<PathBuf, MineGraphError>
    where
        F: FnOnce(&mut Self, &RunWorkspace) -> Result<(), MineGraphError>,
    {
        let mut workspace = RunWorkspace::create(&self.context.output_dir, command)?;
        save_config(
            workspace.get_path("metadata").join(CONFIG_FILE),
            &self.context.config,
        )?;
        match stage(self, &workspace) {
            Ok(()) => workspace.finalize(&self.context.summary),
            Err(e) => {
                if let Err(meta) = workspace.mark_error(&e.to_string()) {
                    warn!("Could not record failure metadata: {}", meta);
                }
                warn!("Partial results kept at {}", workspace.root().display());
                Err(e)
            }
        }
    }

    /// Full pipeline. Inputs are resolved before any output is written or any
    /// tool runs.
    pub fn run(&mut self) -> Result<PathBuf, MineGraphError> {
        let files = self.resolve_inputs()?;
        if self.tools.builder.is_none() {
            return Err(MineGraphError::Configuration(
                "no graph builder configured".to_string(),
            ));
        }

        self.staged("run", |pipeline, workspace| {
            let prepared = pipeline.prepare(&files, &workspace.get_path("prepared"))?;
            let parameters = pipeline.estimate(&prepared, &workspace.get_path("estimation"))?;
            let gfa = pipeline.build_graph(&prepared, parameters, &workspace.get_path("graph"))?;
            let outputs = pipeline.analyze(&gfa, Some(parameters), workspace.root())?;

            let phylogeny_dir = workspace.get_path("phylogeny");
            if let Some(tree) = pipeline.phylogeny(&outputs.graph, &outputs.report.consensus, &phylogeny_dir)? {
                pipeline.context.summary.tree = tree.strip_prefix(workspace.root()).ok().map(Path::to_path_buf);
            }
            Ok(())
        })
    }

    /// Preparation only
    pub fn prepare_only(&mut self) -> Result<PathBuf, MineGraphError> {
        let files = self.resolve_inputs()?;
        self.staged("prepare", |pipeline, workspace| {
            pipeline.prepare(&files, &workspace.get_path("prepared"))?;
            Ok(())
        })
    }

    /// Preparation and estimation; the parameters land in the run summary and
    /// `estimation/params.yaml`
    pub fn optimize_only(&mut self) -> Result<(PathBuf, OptimizedParameters), MineGraphError> {
        let files = self.resolve_inputs()?;
        let mut parameters = None;
        let dir = self.staged("optimize", |pipeline, workspace| {
            let prepared = pipeline.prepare(&files, &workspace.get_path("prepared"))?;
            parameters = Some(pipeline.estimate(&prepared, &workspace.get_path("estimation"))?);
            Ok(())
        })?;
        let parameters = parameters.ok_or_else(|| {
            MineGraphError::InsufficientInput("estimation produced no parameters".to_string())
        })?;
        Ok((dir, parameters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::gfa::{write_gfa, PathStyle};
    use crate::graph::tests::bubble;
    use crate::tools::testing::{
        FixtureDistanceEstimator, FixtureGraphBuilder, FixtureMsaBuilder, FixtureRepeatAnnotator,
        FixtureTreeBuilder,
    };
    use crate::utils::workspace::{is_complete, partial_path, SUMMARY_FILE};
    use tempfile::TempDir;

    fn bubble_gfa() -> String {
        let mut out = Vec::new();
        write_gfa(&bubble(), PathStyle::Paths, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn write_inputs(dir: &Path) {
        fs::write(dir.join("a.fasta"), ">chr\nACGTATTCA\n").unwrap();
        fs::write(dir.join("b.fasta"), ">chr\nACGTGTTCA\n").unwrap();
        fs::write(dir.join("c.fasta"), ">chr\nACGTATTCA\n").unwrap();
    }

    fn context(dir: &TempDir) -> RunContext {
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        write_inputs(&data);
        RunContext::new(Config::default(), &data, &dir.path().join("results"))
    }

    #[test]
    fn test_run_with_fixtures() {
        let dir = TempDir::new().unwrap();
        let builder = Arc::new(FixtureGraphBuilder::from_gfa(bubble_gfa()));
        let tools = ToolSet::new(
            Arc::new(FixtureDistanceEstimator::uniform(0.05)),
            Arc::new(FixtureRepeatAnnotator::new()),
        )
        .with_builder(builder.clone())
        .with_phylogeny(Arc::new(FixtureMsaBuilder), Arc::new(FixtureTreeBuilder));

        let mut pipeline = Pipeline::new(context(&dir), tools);
        let results = pipeline.run().unwrap();

        assert!(is_complete(&results));
        assert!(!partial_path(&results).exists());
        assert!(results.join(SUMMARY_FILE).is_file());
        assert!(results.join("estimation").join(PARAMS_YAML).is_file());
        assert!(results.join("phylogeny").join("tree.treefile").is_file());
        assert!(results.join("metadata").join(CONFIG_FILE).is_file());

        let requests = builder.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].haplotypes, 3);
        assert!((requests[0].parameters.mapping_identity - 0.95).abs() < 1e-9);
        assert_eq!(requests[0].parameters.segment_length, 5000);

        let summary = &pipeline.context().summary;
        assert_eq!(summary.sequences, 3);
        assert_eq!(summary.graph_nodes, Some(4));
        assert_eq!(summary.polymorphisms, Some(1));
    }

    #[test]
    fn test_failed_build_leaves_partial() {
        let dir = TempDir::new().unwrap();
        let tools = ToolSet::new(
            Arc::new(FixtureDistanceEstimator::uniform(0.05)),
            Arc::new(FixtureRepeatAnnotator::new()),
        )
        .with_builder(Arc::new(FixtureGraphBuilder::from_gfa("S\t1\tACGT\nL\t1\t+\t9\t+\t0M\n")));

        let mut pipeline = Pipeline::new(context(&dir), tools);
        let err = pipeline.run().unwrap_err();
        assert!(matches!(err, MineGraphError::GraphIntegrity(_)));

        let results = dir.path().join("results");
        assert!(!results.exists());
        let partial = partial_path(&results);
        assert!(partial.join("prepared").join("panSN_output.fasta").is_file());
        let metadata = fs::read_to_string(partial.join("metadata/workspace.json")).unwrap();
        assert!(metadata.contains("Failed"));
    }

    #[test]
    fn test_optimize_only() {
        let dir = TempDir::new().unwrap();
        let tools = ToolSet::new(
            Arc::new(FixtureDistanceEstimator::uniform(0.5)),
            Arc::new(FixtureRepeatAnnotator::new()),
        );
        let mut pipeline = Pipeline::new(context(&dir), tools);
        let (results, params) = pipeline.optimize_only().unwrap();

        // 1 - 0.5 is below the 0.7 identity floor
        assert!((params.mapping_identity - 0.7).abs() < 1e-9);
        let yaml = fs::read_to_string(results.join("estimation").join(PARAMS_YAML)).unwrap();
        assert!(yaml.contains("percent_identity: 70"));
    }

    #[test]
    fn test_run_without_builder_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let tools = ToolSet::new(
            Arc::new(FixtureDistanceEstimator::uniform(0.0)),
            Arc::new(FixtureRepeatAnnotator::new()),
        );
        let mut pipeline = Pipeline::new(context(&dir), tools);
        assert!(matches!(pipeline.run(), Err(MineGraphError::Configuration(_))));
        assert!(!partial_path(&dir.path().join("results")).exists());
    }
}
