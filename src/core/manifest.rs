//! Input manifest: which sequence files take part in a run, and in what order.

use crate::MineGraphError;
use calamine::{open_workbook_auto, Data, Reader};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Column holding the file names in CSV/XLSX manifests
pub const FASTA_COLUMN: &str = "fasta_files";

const FASTA_EXTENSIONS: &[&str] = &[".fasta", ".fa", ".fna", ".fas"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub entries: Vec<String>,
}

impl Manifest {
    /// Load a CSV or XLSX manifest
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MineGraphError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let entries = match ext.as_deref() {
            Some("csv") => Self::read_csv(path)?,
            Some("xlsx") | Some("xls") => Self::read_workbook(path)?,
            _ => {
                return Err(MineGraphError::Configuration(format!(
                    "Unsupported manifest format for {}: use CSV or XLSX",
                    path.display()
                )))
            }
        };

        info!("Manifest {} selects {} files", path.display(), entries.len());
        Ok(Self { entries })
    }

    fn read_csv(path: &Path) -> Result<Vec<String>, MineGraphError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| manifest_error(path, e))?;

        let headers = reader.headers().map_err(|e| manifest_error(path, e))?.clone();
        let column = headers
            .iter()
            .position(|h| h.trim() == FASTA_COLUMN)
            .ok_or_else(|| missing_column(path))?;

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| manifest_error(path, e))?;
            if let Some(value) = record.get(column).map(str::trim) {
                if !value.is_empty() {
                    entries.push(value.to_string());
                }
            }
        }
        Ok(entries)
    }

    fn read_workbook(path: &Path) -> Result<Vec<String>, MineGraphError> {
        let mut workbook = open_workbook_auto(path).map_err(|e| manifest_error(path, e))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| {
                MineGraphError::Configuration(format!("{} has no worksheets", path.display()))
            })?
            .map_err(|e| manifest_error(path, e))?;

        let mut rows = range.rows();
        let header = rows.next().ok_or_else(|| missing_column(path))?;
        let column = header
            .iter()
            .position(|cell| cell.to_string().trim() == FASTA_COLUMN)
            .ok_or_else(|| missing_column(path))?;

        let mut entries = Vec::new();
        for row in rows {
            match row.get(column) {
                None | Some(Data::Empty) => {}
                Some(cell) => {
                    let value = cell.to_string();
                    let value = value.trim();
                    if !value.is_empty() {
                        entries.push(value.to_string());
                    }
                }
            }
        }
        Ok(entries)
    }
}

fn manifest_error<E: std::fmt::Display>(path: &Path, err: E) -> MineGraphError {
    MineGraphError::Configuration(format!("Cannot read manifest {}: {}", path.display(), err))
}

fn missing_column(path: &Path) -> MineGraphError {
    MineGraphError::Configuration(format!(
        "Manifest {} is missing the '{}' column",
        path.display(),
        FASTA_COLUMN
    ))
}

pub fn is_fasta_file(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n.to_ascii_lowercase(),
        None => return false,
    };
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    FASTA_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Resolve the ordered list of input files.
///
/// With a manifest, every entry must exist in `data_dir`; without one, all
/// FASTA files in `data_dir` are used, sorted by name.
pub fn resolve_inputs(
    data_dir: &Path,
    manifest: Option<&Manifest>,
) -> Result<Vec<PathBuf>, MineGraphError> {
    if !data_dir.is_dir() {
        return Err(MineGraphError::Configuration(format!(
            "Input directory {} does not exist",
            data_dir.display()
        )));
    }

    let files = match manifest {
        Some(manifest) => {
            let mut seen = HashSet::new();
            let mut files = Vec::with_capacity(manifest.entries.len());
            for entry in &manifest.entries {
                if !seen.insert(entry.as_str()) {
                    debug!("Skipping repeated manifest entry {}", entry);
                    continue;
                }
                let path = data_dir.join(entry);
                if !path.is_file() {
                    return Err(MineGraphError::Configuration(format!(
                        "Manifest entry '{}' not found in {}",
                        entry,
                        data_dir.display()
                    )));
                }
                files.push(path);
            }
            files
        }
        None => {
            let mut files: Vec<PathBuf> = fs::read_dir(data_dir)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && is_fasta_file(path))
                .collect();
            files.sort();
            files
        }
    };

    if files.is_empty() {
        return Err(MineGraphError::Configuration(format!(
            "No FASTA files selected from {}",
            data_dir.display()
        )));
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), ">x\nACGT\n").unwrap();
    }

    #[test]
    fn test_csv_manifest() {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("selected.csv");
        fs::write(
            &manifest_path,
            "species,fasta_files\nrice,b.fasta\nmaize,a.fasta\n,\n",
        )
        .unwrap();

        let manifest = Manifest::load(&manifest_path).unwrap();
        assert_eq!(manifest.entries, vec!["b.fasta", "a.fasta"]);
    }

    #[test]
    fn test_csv_without_column() {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("selected.csv");
        fs::write(&manifest_path, "files\na.fasta\n").unwrap();

        let err = Manifest::load(&manifest_path).unwrap_err();
        assert!(matches!(err, MineGraphError::Configuration(_)));
        assert!(err.to_string().contains(FASTA_COLUMN));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = Manifest::load("list.txt").unwrap_err();
        assert!(matches!(err, MineGraphError::Configuration(_)));
    }

    #[test]
    fn test_manifest_order_is_kept() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.fasta");
        touch(dir.path(), "b.fasta");
        let manifest = Manifest {
            entries: vec!["b.fasta".into(), "a.fasta".into(), "b.fasta".into()],
        };

        let files = resolve_inputs(dir.path(), Some(&manifest)).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["b.fasta", "a.fasta"]);
    }

    #[test]
    fn test_missing_manifest_entry() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.fasta");
        let manifest = Manifest {
            entries: vec!["a.fasta".into(), "ghost.fasta".into()],
        };

        let err = resolve_inputs(dir.path(), Some(&manifest)).unwrap_err();
        assert!(matches!(err, MineGraphError::Configuration(_)));
        assert!(err.to_string().contains("ghost.fasta"));
    }

    #[test]
    fn test_directory_scan() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "z.fa");
        touch(dir.path(), "a.fasta");
        touch(dir.path(), "notes.txt");
        fs::write(dir.path().join("m.fna.gz"), b"").unwrap();

        let files = resolve_inputs(dir.path(), None).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.fasta", "m.fna.gz", "z.fa"]);
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            resolve_inputs(dir.path(), None),
            Err(MineGraphError::Configuration(_))
        ));
    }
}
