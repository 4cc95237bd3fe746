use super::{run_tool, MsaBuilder, Tool, TreeBuilder};
use crate::MineGraphError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// `mafft --auto`, alignment captured from stdout
pub struct MafftAligner {
    binary_path: PathBuf,
}

impl MafftAligner {
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }
}

impl MsaBuilder for MafftAligner {
    fn name(&self) -> &str {
        "mafft"
    }

    fn align(&self, input: &Path, output: &Path, threads: usize) -> Result<(), MineGraphError> {
        info!("Aligning {} with MAFFT", input.display());
        let result = run_tool(
            Tool::Mafft,
            &self.binary_path,
            [
                "--auto".to_string(),
                "--thread".to_string(),
                threads.max(1).to_string(),
                input.to_string_lossy().to_string(),
            ],
            None,
        )?;

        if result.stdout.is_empty() {
            return Err(MineGraphError::ToolInvocation {
                tool: Tool::Mafft.display_name().to_string(),
                status: "empty output".to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        fs::write(output, &result.stdout)?;
        Ok(())
    }
}

pub struct IqTreeBuilder {
    binary_path: PathBuf,
}

impl IqTreeBuilder {
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }
}

impl TreeBuilder for IqTreeBuilder {
    fn name(&self) -> &str {
        "iqtree"
    }

    fn infer(
        &self,
        alignment: &Path,
        output_prefix: &Path,
        threads: usize,
    ) -> Result<PathBuf, MineGraphError> {
        info!("Inferring tree from {} with IQ-TREE", alignment.display());
        run_tool(
            Tool::IqTree,
            &self.binary_path,
            [
                "-s".to_string(),
                alignment.to_string_lossy().to_string(),
                "-pre".to_string(),
                output_prefix.to_string_lossy().to_string(),
                "-nt".to_string(),
                threads.max(1).to_string(),
                "-redo".to_string(),
            ],
            None,
        )?;

        let tree = treefile_path(output_prefix);
        if !tree.exists() {
            return Err(MineGraphError::ToolInvocation {
                tool: Tool::IqTree.display_name().to_string(),
                status: "missing output".to_string(),
                stderr: format!("{} was not written", tree.display()),
            });
        }
        Ok(tree)
    }
}

fn treefile_path(prefix: &Path) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(".treefile");
    PathBuf::from(name)
}
