//! PanSN-style sequence identifiers (`sample#haplotype#contig`).
//!
//! Every prepared sequence is renamed so that its sample (derived from the
//! source file) and contig (derived from the FASTA header) stay recoverable
//! from the identifier alone.

use crate::MineGraphError;
use std::fmt;
use std::path::Path;

pub const DELIMITER: char = '#';

/// Haplotype index assigned to organelle assemblies
pub const DEFAULT_HAPLOTYPE: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PanSnName {
    pub sample: String,
    pub haplotype: u32,
    pub contig: String,
}

impl PanSnName {
    pub fn new(sample: &str, haplotype: u32, contig: &str) -> Self {
        Self {
            sample: sanitize_component(sample),
            haplotype,
            contig: sanitize_component(contig),
        }
    }

    /// Name for a record read from `source` whose header token is `header_id`
    pub fn for_record(source: &Path, header_id: &str) -> Self {
        Self::new(&sample_name(source), DEFAULT_HAPLOTYPE, header_id)
    }

    pub fn parse(name: &str) -> Result<Self, MineGraphError> {
        let mut parts = name.splitn(3, DELIMITER);
        let (Some(sample), Some(haplotype), Some(contig)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(MineGraphError::Parse(format!(
                "'{}' is not a sample{}haplotype{}contig name",
                name, DELIMITER, DELIMITER
            )));
        };

        let haplotype = haplotype.parse::<u32>().map_err(|_| {
            MineGraphError::Parse(format!("Invalid haplotype '{}' in '{}'", haplotype, name))
        })?;

        Ok(Self {
            sample: sample.to_string(),
            haplotype,
            contig: contig.to_string(),
        })
    }
}

impl fmt::Display for PanSnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.sample, DELIMITER, self.haplotype, DELIMITER, self.contig
        )
    }
}

/// Sample component for a source file: the file name without FASTA/compression extensions
pub fn sample_name(source: &Path) -> String {
    let mut name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    for ext in [".gz", ".fasta", ".fa", ".fna", ".fas"] {
        if let Some(stripped) = name.strip_suffix(ext) {
            name = stripped.to_string();
        }
    }

    sanitize_component(&name)
}

/// Replace characters that would break PanSN parsing or FASTA headers
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c == DELIMITER || c.is_whitespace() || c == '>' {
                '_'
            } else {
                c
            }
        })
        .collect();

    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_for_record() {
        let name = PanSnName::for_record(
            &PathBuf::from("/data/Oryza_sativa chloroplast.fasta.gz"),
            "NC_001320.1",
        );
        assert_eq!(name.to_string(), "Oryza_sativa_chloroplast#1#NC_001320.1");
    }

    #[test]
    fn test_parse_round_trip() {
        let name = PanSnName::new("Zea_mays", 1, "X86563.2");
        let parsed = PanSnName::parse(&name.to_string()).unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn test_delimiter_in_component_is_replaced() {
        let name = PanSnName::new("a#b", 1, "c#d");
        assert_eq!(name.to_string(), "a_b#1#c_d");
    }

    #[test]
    fn test_parse_rejects_short_names() {
        assert!(PanSnName::parse("sample#1").is_err());
        assert!(PanSnName::parse("sample#x#contig").is_err());
    }

    #[test]
    fn test_empty_component() {
        assert_eq!(sanitize_component("   "), "unnamed");
    }
}
