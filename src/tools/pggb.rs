use super::{run_tool, BuildRequest, GraphBuilder, Tool};
use crate::MineGraphError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const FINAL_GFA_SUFFIX: &str = ".smooth.final.gfa";

pub struct PggbBuilder {
    binary_path: PathBuf,
}

impl PggbBuilder {
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    fn arguments(request: &BuildRequest) -> Vec<String> {
        vec![
            "-i".to_string(),
            request.input_fasta.to_string_lossy().to_string(),
            "-o".to_string(),
            request.output_dir.to_string_lossy().to_string(),
            "-p".to_string(),
            format!("{}", request.parameters.identity_percent()),
            "-s".to_string(),
            request.parameters.segment_length.to_string(),
            "-n".to_string(),
            request.haplotypes.to_string(),
            "-t".to_string(),
            request.threads.max(1).to_string(),
        ]
    }
}

impl GraphBuilder for PggbBuilder {
    fn name(&self) -> &str {
        "pggb"
    }

    fn build(&self, request: &BuildRequest) -> Result<PathBuf, MineGraphError> {
        fs::create_dir_all(&request.output_dir)?;
        info!(
            "Building graph with pggb: -p {} -s {} -n {}",
            request.parameters.identity_percent(),
            request.parameters.segment_length,
            request.haplotypes
        );

        run_tool(Tool::Pggb, &self.binary_path, Self::arguments(request), None)?;
        find_output_gfa(&request.output_dir)
    }
}

/// The final smoothed GFA in `dir`, or the only other GFA when pggb named it differently
pub fn find_output_gfa(dir: &Path) -> Result<PathBuf, MineGraphError> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |ext| ext == "gfa"))
        .collect();
    candidates.sort();

    if let Some(final_gfa) = candidates
        .iter()
        .find(|p| p.to_string_lossy().ends_with(FINAL_GFA_SUFFIX))
    {
        return Ok(final_gfa.clone());
    }

    candidates.into_iter().next().ok_or_else(|| {
        MineGraphError::GraphIntegrity(format!("graph builder left no GFA in {}", dir.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::optimizer::OptimizedParameters;
    use tempfile::TempDir;

    #[test]
    fn test_arguments() {
        let request = BuildRequest {
            input_fasta: PathBuf::from("/work/panSN_output.fasta.gz"),
            output_dir: PathBuf::from("/work/graph"),
            parameters: OptimizedParameters {
                mapping_identity: 0.95,
                segment_length: 3000,
            },
            haplotypes: 7,
            threads: 16,
        };
        let args = PggbBuilder::arguments(&request);
        assert_eq!(
            args,
            vec![
                "-i",
                "/work/panSN_output.fasta.gz",
                "-o",
                "/work/graph",
                "-p",
                "95",
                "-s",
                "3000",
                "-n",
                "7",
                "-t",
                "16"
            ]
        );
    }

    #[test]
    fn test_prefers_final_gfa() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x.seqwish.gfa"), "H\n").unwrap();
        fs::write(dir.path().join("x.smooth.final.gfa"), "H\n").unwrap();
        fs::write(dir.path().join("x.log"), "").unwrap();
        let found = find_output_gfa(dir.path()).unwrap();
        assert!(found.ends_with("x.smooth.final.gfa"));
    }

    #[test]
    fn test_missing_gfa() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            find_output_gfa(dir.path()),
            Err(MineGraphError::GraphIntegrity(_))
        ));
    }
}
