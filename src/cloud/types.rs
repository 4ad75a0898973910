//! Cypress Cloud payload types.

use serde::Deserialize;
use serde_json::Value;

/// Run listing for a project.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudRunList {
    /// Recorded runs, newest first. Absent is treated as empty.
    #[serde(default)]
    pub runs: Vec<CloudRun>,
}

/// A recorded test run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CloudRun {
    /// Opaque run identifier (numeric or string depending on API version).
    #[serde(default)]
    pub id: Option<Value>,
    /// Web URL of the run.
    #[serde(default)]
    pub url: Option<String>,
    /// Commit the run was recorded against.
    #[serde(default)]
    pub commit: Option<CloudCommit>,
}

/// Commit metadata of a cloud run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CloudCommit {
    /// Commit hash.
    #[serde(default)]
    pub sha: Option<String>,
}

impl CloudRun {
    /// Commit hash recorded with this run.
    pub fn commit_sha(&self) -> Option<&str> {
        self.commit.as_ref()?.sha.as_deref()
    }
}
