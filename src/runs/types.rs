//! Dashboard-facing run types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::github::WorkflowRun;

/// Deployment environment a workflow targets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Environment {
    /// QA environment.
    Qa,
    /// Development environment.
    #[default]
    Dev,
}

impl Environment {
    /// `qa` when the lowercased run name contains "qa", otherwise `dev`.
    pub fn from_run_name(name: Option<&str>) -> Self {
        match name {
            Some(name) if name.to_lowercase().contains("qa") => Environment::Qa,
            _ => Environment::Dev,
        }
    }

    /// Lowercase tag, also used to match run names.
    pub fn tag(self) -> &'static str {
        match self {
            Environment::Qa => "qa",
            Environment::Dev => "dev",
        }
    }
}

/// A workflow run merged with its cloud run URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelatedRun {
    /// Workflow run id.
    pub id: u64,
    /// Workflow name.
    pub name: Option<String>,
    /// Lifecycle status, `unknown` when GitHub omitted it.
    pub status: String,
    /// Outcome, `pending` until the run completes.
    pub conclusion: String,
    /// GitHub web URL.
    pub url: Option<String>,
    /// Cypress Cloud web URL, if one was correlated.
    pub cypress_url: Option<String>,
    /// Environment tag.
    pub env: Environment,
    /// Head commit message.
    pub message: Option<String>,
    /// When the run was created.
    pub created_at: Option<DateTime<Utc>>,
}

impl CorrelatedRun {
    /// Merge a workflow run with its resolved cloud URL.
    pub fn new(run: &WorkflowRun, cypress_url: Option<String>) -> Self {
        Self {
            id: run.id,
            name: run.name.clone(),
            status: run.status.clone().unwrap_or_else(|| "unknown".to_string()),
            conclusion: run
                .conclusion
                .clone()
                .unwrap_or_else(|| "pending".to_string()),
            url: run.html_url.clone(),
            cypress_url,
            env: run.env(),
            message: run.commit_message().map(str::to_string),
            created_at: run.created_at,
        }
    }
}
