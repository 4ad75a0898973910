//! GitHub Actions REST client.

use axum::body::Bytes;
use reqwest::header::ACCEPT;
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::Url;

use crate::auth::Token;
use crate::config::Config;
use crate::error::{upstream_body, GitHubError};
use crate::metrics;

use super::types::WorkflowRun;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// GitHub Actions API client scoped to one repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    /// Shared HTTP client.
    http: reqwest::Client,
    /// API base URL, always ending in `/`.
    api_url: Url,
    /// Repository in `owner/name` form.
    repo: String,
    /// Branch filter for listings.
    branch: String,
    /// Bearer token.
    token: Token,
}

impl GitHubClient {
    /// Create a client from config, reusing the given HTTP client.
    pub fn new(http: reqwest::Client, config: &Config) -> Result<Self, GitHubError> {
        Ok(Self {
            http,
            api_url: base_url(&config.github_api_url)?,
            repo: config.github_repo.clone(),
            branch: config.github_branch.clone(),
            token: Token::new(&config.github_token),
        })
    }

    /// Repository this client reads from.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Branch used for listings and dispatches.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    fn actions_url(&self, path: &str) -> Result<Url, GitHubError> {
        Ok(self
            .api_url
            .join(&format!("repos/{}/actions/{}", self.repo, path))?)
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        self.token
            .authorize(self.http.get(url))
            .header(ACCEPT, GITHUB_ACCEPT)
    }

    /// List the most recent runs on the configured branch, newest first.
    #[instrument(skip(self), fields(repo = %self.repo))]
    pub async fn list_runs(&self, per_page: u32) -> Result<Vec<WorkflowRun>, GitHubError> {
        let _timer = metrics::timer_upstream("github");
        let url = self.actions_url("runs")?;

        let response = self
            .get(url)
            .query(&[("branch", self.branch.as_str())])
            .query(&[("per_page", per_page)])
            .send()
            .await?;
        let response = check_status(response).await?;
        let text = response.text().await?;

        let runs = parse_run_list(&text)?;
        debug!(count = runs.len(), "Listed workflow runs");
        Ok(runs)
    }

    /// Fetch a single run by id.
    #[instrument(skip(self), fields(repo = %self.repo))]
    pub async fn get_run(&self, run_id: u64) -> Result<WorkflowRun, GitHubError> {
        let _timer = metrics::timer_upstream("github");
        let url = self.actions_url(&format!("runs/{run_id}"))?;

        let response = check_status(self.get(url).send().await?).await?;
        let text = response.text().await?;

        serde_json::from_str(&text)
            .map_err(|e| GitHubError::Malformed(format!("workflow run {run_id}: {e}")))
    }

    /// Download the zipped log archive of a run.
    #[instrument(skip(self), fields(repo = %self.repo))]
    pub async fn download_logs(&self, run_id: u64) -> Result<Bytes, GitHubError> {
        let _timer = metrics::timer_upstream("github_logs");
        let url = self.actions_url(&format!("runs/{run_id}/logs"))?;

        let response = check_status(self.get(url).send().await?).await?;
        let archive = response.bytes().await?;

        debug!(bytes = archive.len(), "Downloaded log archive");
        Ok(archive)
    }

    /// Start a workflow on the configured branch. GitHub answers 204 without a run id.
    #[instrument(skip(self), fields(repo = %self.repo))]
    pub async fn dispatch(&self, workflow: &str) -> Result<(), GitHubError> {
        let _timer = metrics::timer_upstream("github");
        let url = self.actions_url(&format!("workflows/{workflow}/dispatches"))?;

        let response = self
            .token
            .authorize(self.http.post(url))
            .header(ACCEPT, GITHUB_ACCEPT)
            .json(&json!({ "ref": self.branch }))
            .send()
            .await?;
        check_status(response).await?;

        debug!(workflow, git_ref = %self.branch, "Workflow dispatched");
        Ok(())
    }
}

/// Parse a base URL so that relative joins keep its path.
pub(crate) fn base_url(raw: &str) -> Result<Url, url::ParseError> {
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{raw}/"))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GitHubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(GitHubError::Status {
        status,
        body: upstream_body(text),
    })
}

fn parse_run_list(text: &str) -> Result<Vec<WorkflowRun>, GitHubError> {
    let mut payload: Value = serde_json::from_str(text)
        .map_err(|e| GitHubError::Malformed(format!("run listing is not JSON: {e}")))?;

    match payload.get_mut("workflow_runs").map(Value::take) {
        Some(runs @ Value::Array(_)) => serde_json::from_value(runs)
            .map_err(|e| GitHubError::Malformed(format!("invalid workflow run: {e}"))),
        _ => Err(GitHubError::Malformed(
            "workflow_runs is missing or not an array".to_string(),
        )),
    }
}
