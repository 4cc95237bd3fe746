//! Combination of the two estimates into the graph-builder parameter pair.

use crate::core::config::BoundsConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterBounds {
    pub min_identity: f64,
    pub max_identity: f64,
    pub min_segment: usize,
    pub max_segment: usize,
}

impl From<&BoundsConfig> for ParameterBounds {
    fn from(config: &BoundsConfig) -> Self {
        Self {
            min_identity: config.min_identity,
            max_identity: config.max_identity,
            min_segment: config.min_segment,
            max_segment: config.max_segment,
        }
    }
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self::from(&BoundsConfig::default())
    }
}

/// Mapping identity in (0, 1] and segment length >= 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizedParameters {
    pub mapping_identity: f64,
    pub segment_length: usize,
}

impl OptimizedParameters {
    /// Identity as the percentage the graph builder expects, truncated to one
    /// decimal so it never exceeds `mapping_identity`
    pub fn identity_percent(&self) -> f64 {
        // 1e-9 keeps exact tenths such as 0.95 from dropping to 94.9
        ((self.mapping_identity * 1000.0) + 1e-9).floor() / 10.0
    }
}

/// Clamp both candidates into their bounds. Pure and deterministic.
pub fn optimize(
    identity_threshold: f64,
    segment_candidate: usize,
    bounds: &ParameterBounds,
) -> OptimizedParameters {
    let mapping_identity = identity_threshold.clamp(bounds.min_identity, bounds.max_identity);
    let segment_length = segment_candidate
        .clamp(bounds.min_segment, bounds.max_segment)
        .max(1);

    info!(
        "Optimized parameters: identity {:.4} (candidate {:.4}), segment {} (candidate {})",
        mapping_identity, identity_threshold, segment_length, segment_candidate
    );

    OptimizedParameters {
        mapping_identity,
        segment_length,
    }
}

/// Contents of `params.yaml` handed to the graph builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderParams {
    pub percent_identity: f64,
    pub segment_length: usize,
    pub haplotypes: usize,
    pub threads: usize,
}

impl BuilderParams {
    pub fn new(parameters: &OptimizedParameters, haplotypes: usize, threads: usize) -> Self {
        Self {
            percent_identity: parameters.identity_percent(),
            segment_length: parameters.segment_length,
            haplotypes,
            threads,
        }
    }
}
