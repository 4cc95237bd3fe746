pub mod analysis;
pub mod config;
pub mod context;
pub mod divergence;
pub mod manifest;
pub mod optimizer;
pub mod pipeline;
pub mod preparer;
pub mod repeats;
pub mod sketch;

pub use config::Config;
pub use context::{RunContext, RunSummary};
pub use optimizer::{optimize, OptimizedParameters, ParameterBounds};
pub use pipeline::{Pipeline, ToolSet};
