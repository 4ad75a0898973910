//! Cypress Cloud REST client.

use reqwest::header::ACCEPT;
use tracing::{debug, instrument};
use url::Url;

use crate::auth::Token;
use crate::config::Config;
use crate::error::CloudError;
use crate::github::client::base_url;
use crate::metrics;

use super::types::{CloudRun, CloudRunList};

/// Cypress Cloud API client scoped to one project.
#[derive(Debug, Clone)]
pub struct CloudClient {
    http: reqwest::Client,
    api_url: Url,
    project_id: String,
    record_key: Token,
}

impl CloudClient {
    /// Create a client when both project id and record key are configured.
    pub fn from_config(http: reqwest::Client, config: &Config) -> Result<Option<Self>, CloudError> {
        let (Some(project_id), Some(record_key)) =
            (&config.cypress_project_id, &config.cypress_record_key)
        else {
            return Ok(None);
        };

        Ok(Some(Self {
            http,
            api_url: base_url(&config.cypress_api_url)?,
            project_id: project_id.clone(),
            record_key: Token::new(record_key),
        }))
    }

    /// Project this client lists runs for.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// List the most recent recorded runs of the project.
    #[instrument(skip(self), fields(project = %self.project_id))]
    pub async fn list_runs(&self, limit: u32) -> Result<Vec<CloudRun>, CloudError> {
        let _timer = metrics::timer_upstream("cypress");
        let url = self
            .api_url
            .join(&format!("projects/{}/runs", self.project_id))?;

        let response = self
            .record_key
            .authorize(self.http.get(url))
            .query(&[("limit", limit)])
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CloudError::Status(response.status()));
        }

        let list: CloudRunList = response.json().await?;
        debug!(count = list.runs.len(), "Listed cloud runs");
        Ok(list.runs)
    }
}
