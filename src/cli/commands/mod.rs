pub mod analyze;
pub mod optimize;
pub mod prepare;
pub mod run;

use crate::core::config::{load_config, Config};
use crate::core::context::RunContext;
use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};

/// Flags shared by the commands that read an input directory
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Directory holding the FASTA files
    #[arg(value_name = "DATA_DIR")]
    pub data_dir: PathBuf,

    /// CSV/XLSX manifest with a `fasta_files` column selecting and ordering inputs
    #[arg(short, long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Results directory
    #[arg(short, long, value_name = "DIR", default_value = "minegraph_results")]
    pub output: PathBuf,
}

/// Config from file (or defaults) with the global thread flag applied
pub fn load_effective_config(path: Option<&Path>, threads: usize) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    if threads > 0 {
        config.performance.threads = threads;
    }
    config.validate()?;
    Ok(config)
}

pub fn build_context(input: &InputArgs, config: Config, show_progress: bool) -> RunContext {
    RunContext::new(config, &input.data_dir, &input.output)
        .with_manifest(input.manifest.clone())
        .with_progress(show_progress)
}
