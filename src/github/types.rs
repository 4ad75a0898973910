//! GitHub Actions payload types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::runs::Environment;

/// A single workflow run as returned by the Actions API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkflowRun {
    /// Run id.
    pub id: u64,
    /// Workflow display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Lifecycle status: queued, in_progress, completed.
    #[serde(default)]
    pub status: Option<String>,
    /// Outcome once completed: success, failure, cancelled...
    #[serde(default)]
    pub conclusion: Option<String>,
    /// Commit the run was built from.
    #[serde(default)]
    pub head_sha: Option<String>,
    /// Web URL of the run.
    #[serde(default)]
    pub html_url: Option<String>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Head commit details.
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,
}

/// Commit summary embedded in a run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HeadCommit {
    /// Commit message.
    #[serde(default)]
    pub message: Option<String>,
}

impl WorkflowRun {
    /// Environment tag derived from the run name.
    pub fn env(&self) -> Environment {
        Environment::from_run_name(self.name.as_deref())
    }

    /// Commit hash, if GitHub reported a non-empty one.
    pub fn commit_sha(&self) -> Option<&str> {
        self.head_sha.as_deref().filter(|sha| !sha.is_empty())
    }

    /// Head commit message.
    pub fn commit_message(&self) -> Option<&str> {
        self.head_commit.as_ref()?.message.as_deref()
    }
}
