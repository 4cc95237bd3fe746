/// Staging directory for a run's outputs.
///
/// Everything is written under `<results>.partial/`. Only a successful run is
/// renamed to `<results>/` and gets a `RUN_COMPLETE` marker, so a directory
/// without the marker is never a finished result.
use crate::MineGraphError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const PARTIAL_SUFFIX: &str = ".partial";
pub const COMPLETE_MARKER: &str = "RUN_COMPLETE";
pub const SUMMARY_FILE: &str = "run_summary.json";

const SUBDIRS: &[&str] = &[
    "prepared",
    "estimation",
    "graph",
    "analysis",
    "exports",
    "phylogeny",
    "metadata",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkspaceStatus {
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: WorkspaceStatus,
    pub error_message: Option<String>,
}

#[derive(Debug)]
pub struct RunWorkspace {
    root: PathBuf,
    final_dir: PathBuf,
    metadata: RunMetadata,
}

/// `<dir>.partial` next to `dir`
pub fn partial_path(final_dir: &Path) -> PathBuf {
    let mut name: OsString = final_dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("results"));
    name.push(PARTIAL_SUFFIX);
    final_dir.with_file_name(name)
}

pub fn is_complete(dir: &Path) -> bool {
    dir.join(COMPLETE_MARKER).is_file()
}

impl RunWorkspace {
    pub fn create(final_dir: &Path, command: &str) -> Result<Self, MineGraphError> {
        if is_complete(final_dir) {
            return Err(MineGraphError::Configuration(format!(
                "{} already holds a completed run; choose another output directory",
                final_dir.display()
            )));
        }

        let root = partial_path(final_dir);
        if root.exists() {
            warn!("Removing stale partial results at {}", root.display());
            fs::remove_dir_all(&root)?;
        }
        for subdir in SUBDIRS {
            fs::create_dir_all(root.join(subdir))?;
        }

        let workspace = Self {
            root,
            final_dir: final_dir.to_path_buf(),
            metadata: RunMetadata {
                command: command.to_string(),
                started_at: Utc::now(),
                finished_at: None,
                status: WorkspaceStatus::Active,
                error_message: None,
            },
        };
        workspace.save_metadata()?;
        Ok(workspace)
    }

    /// Directory receiving outputs while the run is in progress
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn final_dir(&self) -> &Path {
        &self.final_dir
    }

    pub fn get_path(&self, component: &str) -> PathBuf {
        self.root.join(component)
    }

    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    pub fn save_metadata(&self) -> Result<(), MineGraphError> {
        let path = self.get_path("metadata").join("workspace.json");
        fs::write(path, serde_json::to_string_pretty(&self.metadata)?)?;
        Ok(())
    }

    /// Record the failure; the partial directory stays for inspection
    pub fn mark_error(&mut self, error: &str) -> Result<(), MineGraphError> {
        self.metadata.status = WorkspaceStatus::Failed;
        self.metadata.error_message = Some(error.to_string());
        self.metadata.finished_at = Some(Utc::now());
        self.save_metadata()
    }

    /// Write the summary, promote the partial directory and drop the marker last
    pub fn finalize<T: Serialize>(mut self, summary: &T) -> Result<PathBuf, MineGraphError> {
        fs::write(
            self.root.join(SUMMARY_FILE),
            serde_json::to_string_pretty(summary)?,
        )?;
        self.metadata.status = WorkspaceStatus::Completed;
        self.metadata.finished_at = Some(Utc::now());
        self.save_metadata()?;

        if self.final_dir.exists() {
            warn!(
                "Replacing incomplete results at {}",
                self.final_dir.display()
            );
            fs::remove_dir_all(&self.final_dir)?;
        }
        fs::rename(&self.root, &self.final_dir)?;
        fs::write(
            self.final_dir.join(COMPLETE_MARKER),
            format!("{}\n", Utc::now().to_rfc3339()),
        )?;

        info!("Results written to {}", self.final_dir.display());
        Ok(self.final_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/data/results")),
            PathBuf::from("/data/results.partial")
        );
    }

    #[test]
    fn test_finalize_promotes_partial() {
        let dir = TempDir::new().unwrap();
        let results = dir.path().join("results");
        let workspace = RunWorkspace::create(&results, "run").unwrap();
        let partial = workspace.root().to_path_buf();
        assert!(partial.join("graph").is_dir());
        assert!(!is_complete(&results));

        fs::write(workspace.get_path("analysis").join("report.txt"), "ok").unwrap();
        let final_dir = workspace.finalize(&serde_json::json!({"nodes": 4})).unwrap();

        assert_eq!(final_dir, results);
        assert!(is_complete(&results));
        assert!(!partial.exists());
        assert!(results.join("analysis/report.txt").is_file());
        assert!(results.join(SUMMARY_FILE).is_file());
    }

    #[test]
    fn test_failed_run_stays_partial() {
        let dir = TempDir::new().unwrap();
        let results = dir.path().join("results");
        let mut workspace = RunWorkspace::create(&results, "run").unwrap();
        workspace.mark_error("pggb failed").unwrap();

        assert!(!results.exists());
        let metadata = fs::read_to_string(workspace.get_path("metadata").join("workspace.json")).unwrap();
        assert!(metadata.contains("Failed"));
        assert!(metadata.contains("pggb failed"));
    }

    #[test]
    fn test_completed_results_are_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let results = dir.path().join("results");
        RunWorkspace::create(&results, "run")
            .unwrap()
            .finalize(&serde_json::json!({}))
            .unwrap();
        assert!(matches!(
            RunWorkspace::create(&results, "run"),
            Err(MineGraphError::Configuration(_))
        ));
    }
}
