//! Explicit per-run state passed through every stage.

use crate::core::config::Config;
use crate::core::optimizer::OptimizedParameters;
use crate::utils::parallel::effective_threads;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Everything one run knows: its inputs, settings and what the stages found so far
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub manifest: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub show_progress: bool,
    pub summary: RunSummary,
}

/// Accumulated results, written as the run summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub inputs: Vec<PathBuf>,
    pub sequences: usize,
    pub max_divergence: Option<f64>,
    pub identity_threshold: Option<f64>,
    pub longest_repeat: Option<usize>,
    pub excluded_from_repeats: Vec<String>,
    pub parameters: Option<OptimizedParameters>,
    pub graph_nodes: Option<usize>,
    pub graph_edges: Option<usize>,
    pub graph_paths: Option<usize>,
    pub polymorphisms: Option<usize>,
    pub consensus_length: Option<usize>,
    pub tree: Option<PathBuf>,
}

impl RunContext {
    pub fn new(config: Config, data_dir: &Path, output_dir: &Path) -> Self {
        Self {
            config,
            data_dir: data_dir.to_path_buf(),
            manifest: None,
            output_dir: output_dir.to_path_buf(),
            show_progress: false,
            summary: RunSummary::default(),
        }
    }

    pub fn with_manifest(mut self, manifest: Option<PathBuf>) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Worker threads for this run (0 in the config means all cores)
    pub fn threads(&self) -> usize {
        effective_threads(self.config.performance.threads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let mut config = Config::default();
        config.performance.threads = 3;
        let ctx = RunContext::new(config, Path::new("data"), Path::new("out"))
            .with_manifest(Some(PathBuf::from("data/manifest.csv")))
            .with_progress(true);
        assert_eq!(ctx.threads(), 3);
        assert!(ctx.show_progress);
        assert_eq!(ctx.manifest.as_deref(), Some(Path::new("data/manifest.csv")));
        assert!(ctx.summary.parameters.is_none());
    }
}
