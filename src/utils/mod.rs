pub mod parallel;
pub mod workspace;

pub use workspace::{RunWorkspace, WorkspaceStatus};
