pub mod bio;
pub mod cli;
pub mod core;
pub mod graph;
pub mod report;
pub mod tools;
pub mod utils;

pub use crate::core::{
    config::Config, context::RunContext, optimizer::OptimizedParameters, pipeline::Pipeline,
};
pub use crate::graph::Graph;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MineGraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Insufficient input: {0}")]
    InsufficientInput(String),

    #[error("Naming conflict: {0}")]
    NamingConflict(String),

    #[error("Graph integrity error: {0}")]
    GraphIntegrity(String),

    #[error("Path traversal error: {0}")]
    PathTraversal(String),

    #[error("{tool} failed ({status}): {stderr}")]
    ToolInvocation {
        tool: String,
        status: String,
        stderr: String,
    },
}

impl MineGraphError {
    /// Process exit code used by the CLI for this error class
    pub fn exit_code(&self) -> i32 {
        match self {
            MineGraphError::Configuration(_) => 2,
            MineGraphError::Io(_) => 3,
            MineGraphError::Parse(_)
            | MineGraphError::Serialization(_)
            | MineGraphError::GraphIntegrity(_)
            | MineGraphError::PathTraversal(_) => 4,
            MineGraphError::NamingConflict(_) | MineGraphError::InsufficientInput(_) => 5,
            MineGraphError::ToolInvocation { .. } => 6,
        }
    }
}

impl From<serde_json::Error> for MineGraphError {
    fn from(err: serde_json::Error) -> Self {
        MineGraphError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for MineGraphError {
    fn from(err: serde_yaml::Error) -> Self {
        MineGraphError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for MineGraphError {
    fn from(err: csv::Error) -> Self {
        MineGraphError::Serialization(err.to_string())
    }
}

impl From<std::fmt::Error> for MineGraphError {
    fn from(err: std::fmt::Error) -> Self {
        MineGraphError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MineGraphError>;
