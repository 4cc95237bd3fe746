//! Configuration types for minegraph

use crate::MineGraphError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub estimation: EstimationConfig,
    #[serde(default)]
    pub bounds: BoundsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimationConfig {
    /// k-mer length used for distance sketches
    #[serde(default = "default_kmer_size")]
    pub kmer_size: usize,
    /// Number of minimum hashes kept per sketch
    #[serde(default = "default_sketch_size")]
    pub sketch_size: usize,
    /// Longest repeat unit the native scanner looks for
    #[serde(default = "default_max_repeat_period")]
    pub max_repeat_period: usize,
    #[serde(default = "default_min_repeat_copies")]
    pub min_repeat_copies: usize,
    /// Shortest tandem run (in bases) reported as a repeat
    #[serde(default = "default_min_repeat_length")]
    pub min_repeat_length: usize,
    /// Only annotate repeats on the first N prepared sequences (None = all)
    #[serde(default)]
    pub repeat_downsample: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundsConfig {
    #[serde(default = "default_min_identity")]
    pub min_identity: f64,
    #[serde(default = "default_max_identity")]
    pub max_identity: f64,
    #[serde(default = "default_min_segment")]
    pub min_segment: usize,
    #[serde(default = "default_max_segment")]
    pub max_segment: usize,
    /// Segment length used when no repeats are detected at all
    #[serde(default = "default_fallback_segment")]
    pub fallback_segment: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Percentage of paths (0-100) a node must appear in to join the consensus
    #[serde(default = "default_consensus_quantile")]
    pub consensus_quantile: f64,
    /// Number of largest nodes kept for visualization
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
    /// Path used as the VCF coordinate system (first path when unset)
    #[serde(default)]
    pub reference_path: Option<String>,
    /// Run MSA and tree inference after analysis
    #[serde(default)]
    pub phylogeny: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceBackend {
    Native,
    Mash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatBackend {
    Native,
    RepeatMasker,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_distance_backend")]
    pub distance: DistanceBackend,
    #[serde(default = "default_repeat_backend")]
    pub repeats: RepeatBackend,
    #[serde(default)]
    pub mash: Option<PathBuf>,
    #[serde(default)]
    pub repeatmasker: Option<PathBuf>,
    #[serde(default = "default_repeatmasker_species")]
    pub repeatmasker_species: String,
    #[serde(default)]
    pub pggb: Option<PathBuf>,
    #[serde(default)]
    pub mafft: Option<PathBuf>,
    #[serde(default)]
    pub iqtree: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Worker threads (0 = all available)
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_kmer_size() -> usize { 21 }
fn default_sketch_size() -> usize { 1000 }
fn default_max_repeat_period() -> usize { 100 }
fn default_min_repeat_copies() -> usize { 2 }
fn default_min_repeat_length() -> usize { 20 }
fn default_min_identity() -> f64 { 0.7 }
fn default_max_identity() -> f64 { 1.0 }
fn default_min_segment() -> usize { 100 }
fn default_max_segment() -> usize { 100_000 }
fn default_fallback_segment() -> usize { 5000 }
fn default_consensus_quantile() -> f64 { 50.0 }
fn default_top_n() -> usize { 100 }
fn default_histogram_bins() -> usize { 20 }
fn default_distance_backend() -> DistanceBackend { DistanceBackend::Native }
fn default_repeat_backend() -> RepeatBackend { RepeatBackend::Native }
fn default_repeatmasker_species() -> String { "viridiplantae".to_string() }
fn default_threads() -> usize { 16 }

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            kmer_size: default_kmer_size(),
            sketch_size: default_sketch_size(),
            max_repeat_period: default_max_repeat_period(),
            min_repeat_copies: default_min_repeat_copies(),
            min_repeat_length: default_min_repeat_length(),
            repeat_downsample: None,
        }
    }
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            min_identity: default_min_identity(),
            max_identity: default_max_identity(),
            min_segment: default_min_segment(),
            max_segment: default_max_segment(),
            fallback_segment: default_fallback_segment(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            consensus_quantile: default_consensus_quantile(),
            top_n: default_top_n(),
            histogram_bins: default_histogram_bins(),
            reference_path: None,
            phylogeny: false,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            distance: default_distance_backend(),
            repeats: default_repeat_backend(),
            mash: None,
            repeatmasker: None,
            repeatmasker_species: default_repeatmasker_species(),
            pggb: None,
            mafft: None,
            iqtree: None,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
        }
    }
}

impl Config {
    /// Reject settings no run could satisfy
    pub fn validate(&self) -> Result<(), MineGraphError> {
        let b = &self.bounds;
        if !(b.min_identity > 0.0 && b.min_identity <= b.max_identity && b.max_identity <= 1.0) {
            return Err(MineGraphError::Configuration(format!(
                "identity bounds must satisfy 0 < min ({}) <= max ({}) <= 1",
                b.min_identity, b.max_identity
            )));
        }
        if b.min_segment == 0 || b.min_segment > b.max_segment {
            return Err(MineGraphError::Configuration(format!(
                "segment bounds must satisfy 1 <= min ({}) <= max ({})",
                b.min_segment, b.max_segment
            )));
        }
        if b.fallback_segment == 0 {
            return Err(MineGraphError::Configuration(
                "fallback segment length must be positive".to_string(),
            ));
        }
        let q = self.analysis.consensus_quantile;
        if !(0.0..=100.0).contains(&q) {
            return Err(MineGraphError::Configuration(format!(
                "consensus quantile {} is outside 0-100",
                q
            )));
        }
        let e = &self.estimation;
        if e.kmer_size == 0 || e.kmer_size > 32 {
            return Err(MineGraphError::Configuration(format!(
                "k-mer size {} is outside 1-32",
                e.kmer_size
            )));
        }
        if e.sketch_size == 0 || e.max_repeat_period == 0 || e.min_repeat_copies < 2 {
            return Err(MineGraphError::Configuration(
                "sketch size and repeat period must be positive and repeats need at least 2 copies"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, MineGraphError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        MineGraphError::Configuration(format!("Cannot read config {}: {}", path.display(), e))
    })?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| MineGraphError::Configuration(format!("Failed to parse config: {}", e)))?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), MineGraphError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| MineGraphError::Configuration(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.estimation.kmer_size, 21);
        assert_eq!(config.bounds.min_identity, 0.7);
        assert_eq!(config.bounds.fallback_segment, 5000);
        assert_eq!(config.analysis.consensus_quantile, 50.0);
        assert_eq!(config.tools.distance, DistanceBackend::Native);
        assert_eq!(config.tools.repeatmasker_species, "viridiplantae");
        assert_eq!(config.performance.threads, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[bounds]\nmin_identity = 0.85\n\n[tools]\nrepeats = \"repeatmasker\"\n"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.bounds.min_identity, 0.85);
        assert_eq!(config.bounds.max_segment, 100_000);
        assert_eq!(config.tools.repeats, RepeatBackend::RepeatMasker);
        assert_eq!(config.analysis.top_n, 100);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let mut config = Config::default();
        config.bounds.min_segment = 10_000;
        config.bounds.max_segment = 100;
        assert!(matches!(
            config.validate(),
            Err(MineGraphError::Configuration(_))
        ));
    }

    #[test]
    fn test_quantile_out_of_range() {
        let mut config = Config::default();
        config.analysis.consensus_quantile = 150.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.analysis.reference_path = Some("Zea_mays#1#chloroplast".into());
        save_config(file.path(), &config).unwrap();

        let loaded = load_config(file.path()).unwrap();
        assert_eq!(
            loaded.analysis.reference_path.as_deref(),
            Some("Zea_mays#1#chloroplast")
        );
    }
}
