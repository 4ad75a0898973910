//! GitHub Actions client and payload types.

pub mod client;
pub mod types;

pub use client::GitHubClient;
pub use types::{HeadCommit, WorkflowRun};
