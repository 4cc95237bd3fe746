//! External tool integration
//!
//! Adapters that run mash, RepeatMasker, pggb, MAFFT and IQ-TREE as child
//! processes behind the capability traits in [`traits`], plus fixture-backed
//! doubles in [`testing`].

pub mod mash;
pub mod pggb;
pub mod phylo;
pub mod repeatmasker;
pub mod testing;
pub mod traits;

pub use mash::MashEstimator;
pub use pggb::PggbBuilder;
pub use phylo::{IqTreeBuilder, MafftAligner};
pub use repeatmasker::RepeatMaskerAnnotator;
pub use traits::{
    BuildRequest, DistanceEstimator, GraphBuilder, MsaBuilder, RepeatAnnotator, TreeBuilder,
};

use crate::MineGraphError;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// External programs a run may invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tool {
    Mash,
    RepeatMasker,
    Pggb,
    Mafft,
    IqTree,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Mash => "mash",
            Tool::RepeatMasker => "repeatmasker",
            Tool::Pggb => "pggb",
            Tool::Mafft => "mafft",
            Tool::IqTree => "iqtree",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Tool::Mash => "Mash",
            Tool::RepeatMasker => "RepeatMasker",
            Tool::Pggb => "PGGB",
            Tool::Mafft => "MAFFT",
            Tool::IqTree => "IQ-TREE",
        }
    }

    pub fn binary_name(&self) -> &'static str {
        match self {
            Tool::Mash => "mash",
            Tool::RepeatMasker => "RepeatMasker",
            Tool::Pggb => "pggb",
            Tool::Mafft => "mafft",
            Tool::IqTree => "iqtree2",
        }
    }

    /// Locate the binary: an explicit path wins, otherwise search `PATH`
    pub fn resolve(&self, configured: Option<&Path>) -> Result<PathBuf, MineGraphError> {
        match configured {
            Some(path) if path.exists() => Ok(path.to_path_buf()),
            Some(path) => Err(MineGraphError::Configuration(format!(
                "{} binary not found at {}",
                self.display_name(),
                path.display()
            ))),
            None => which::which(self.binary_name()).map_err(|_| {
                MineGraphError::Configuration(format!(
                    "{} ({}) is not on PATH; set tools.{} in the config",
                    self.display_name(),
                    self.binary_name(),
                    self.name()
                ))
            }),
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Run a tool to completion, mapping a non-zero exit to `ToolInvocation`
pub fn run_tool<I, S>(
    tool: Tool,
    binary: &Path,
    args: I,
    working_dir: Option<&Path>,
) -> Result<Output, MineGraphError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(binary);
    cmd.args(args);
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }
    debug!("Running {:?}", cmd);

    let output = cmd.output().map_err(|e| MineGraphError::ToolInvocation {
        tool: tool.display_name().to_string(),
        status: "not started".to_string(),
        stderr: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(MineGraphError::ToolInvocation {
            tool: tool.display_name().to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}
