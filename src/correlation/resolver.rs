//! Tiered cloud run resolution.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use strum::{Display, IntoStaticStr};
use tracing::{debug, instrument, warn};

use crate::cloud::{CloudClient, CloudRun};
use crate::error::CorrelationError;
use crate::github::{GitHubClient, WorkflowRun};
use crate::metrics;

use super::archive::scan_log_archive;
use super::pattern::CloudUrlPattern;

/// Which tier produced a cloud URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CorrelationSource {
    /// Matched by commit hash against the cloud run listing.
    CloudApi,
    /// Extracted from the run's log archive.
    RunLogs,
}

/// Outcome of resolving one workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Correlation {
    /// Cloud run URL, if any tier found one.
    pub url: Option<String>,
    /// Tier that found it.
    pub source: Option<CorrelationSource>,
}

impl Correlation {
    fn found(url: String, source: CorrelationSource) -> Self {
        Self {
            url: Some(url),
            source: Some(source),
        }
    }

    fn record(self) -> Self {
        let label = self.source.map(<&'static str>::from).unwrap_or("none");
        metrics::inc_correlations(label);
        self
    }
}

/// First cloud run recorded against `sha` that carries a URL.
pub fn match_by_commit<'a>(cloud_runs: &'a [CloudRun], sha: &str) -> Option<&'a CloudRun> {
    cloud_runs
        .iter()
        .find(|run| run.commit_sha() == Some(sha) && run.url.is_some())
}

/// Maps workflow runs to cloud run URLs.
#[derive(Debug, Clone)]
pub struct Resolver {
    github: GitHubClient,
    cloud: Option<CloudClient>,
    pattern: CloudUrlPattern,
    cloud_run_limit: u32,
}

impl Resolver {
    /// Create a resolver. Without a cloud client only log scanning is used.
    pub fn new(
        github: GitHubClient,
        cloud: Option<CloudClient>,
        pattern: CloudUrlPattern,
        cloud_run_limit: u32,
    ) -> Self {
        Self {
            github,
            cloud,
            pattern,
            cloud_run_limit,
        }
    }

    /// Recent cloud runs, or `None` when unconfigured or the listing failed.
    pub async fn cloud_runs(&self) -> Option<Vec<CloudRun>> {
        let cloud = self.cloud.as_ref()?;
        match cloud.list_runs(self.cloud_run_limit).await {
            Ok(runs) => Some(runs),
            Err(e) => {
                warn!(error = %e, "Failed to fetch Cypress Cloud runs");
                None
            }
        }
    }

    /// Resolve a single run, fetching the cloud listing only when a commit hash is known.
    #[instrument(skip(self, run), fields(run_id = run.id))]
    pub async fn resolve(&self, run: &WorkflowRun) -> Correlation {
        let cloud_runs = match run.commit_sha() {
            Some(_) => self.cloud_runs().await,
            None => None,
        };
        self.resolve_with(run, cloud_runs.as_deref()).await
    }

    /// Resolve a run against an already fetched cloud listing.
    pub async fn resolve_with(
        &self,
        run: &WorkflowRun,
        cloud_runs: Option<&[CloudRun]>,
    ) -> Correlation {
        if let (Some(sha), Some(cloud_runs)) = (run.commit_sha(), cloud_runs) {
            if let Some(url) = match_by_commit(cloud_runs, sha).and_then(|c| c.url.clone()) {
                debug!(run_id = run.id, %url, "Correlated via cloud API");
                return Correlation::found(url, CorrelationSource::CloudApi).record();
            }
        }

        match self.scan_logs(run.id).await {
            Ok(Some(url)) => {
                debug!(run_id = run.id, %url, "Correlated via run logs");
                Correlation::found(url, CorrelationSource::RunLogs).record()
            }
            Ok(None) => Correlation::default().record(),
            Err(e) => {
                warn!(run_id = run.id, error = %e, "Failed to scan run logs");
                Correlation::default().record()
            }
        }
    }

    /// Resolve many runs with one shared cloud listing, preserving input order.
    ///
    /// At most `concurrency` runs are resolved at once.
    pub async fn resolve_all(&self, runs: &[WorkflowRun], concurrency: usize) -> Vec<Correlation> {
        let cloud_runs = if runs.iter().any(|run| run.commit_sha().is_some()) {
            self.cloud_runs().await
        } else {
            None
        };
        let cloud_runs = cloud_runs.as_deref();

        let pending: Vec<_> = runs
            .iter()
            .map(|run| self.resolve_with(run, cloud_runs))
            .collect();

        stream::iter(pending)
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    async fn scan_logs(&self, run_id: u64) -> Result<Option<String>, CorrelationError> {
        let archive = self.github.download_logs(run_id).await?;
        let pattern = self.pattern.clone();

        tokio::task::spawn_blocking(move || scan_log_archive(&archive, &pattern))
            .await
            .map_err(|e| CorrelationError::Io(std::io::Error::other(e)))?
    }
}
