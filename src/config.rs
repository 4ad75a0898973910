//! Application configuration loaded from environment variables.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::runs::Environment;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === GitHub Actions ===
    /// Bearer token for the GitHub API.
    pub github_token: String,

    /// Repository in `owner/name` form.
    pub github_repo: String,

    /// GitHub API base URL.
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Branch used for run listings and as the dispatch ref.
    #[serde(default = "default_branch")]
    pub github_branch: String,

    /// Workflow file dispatched for the qa environment.
    #[serde(default = "default_qa_workflow")]
    pub qa_workflow: String,

    /// Workflow file dispatched for the dev environment.
    #[serde(default = "default_dev_workflow")]
    pub dev_workflow: String,

    // === Cypress Cloud ===
    /// Cypress Cloud project id.
    #[serde(default)]
    pub cypress_project_id: Option<String>,

    /// Cypress Cloud record key.
    #[serde(default)]
    pub cypress_record_key: Option<String>,

    /// Cypress Cloud API base URL.
    #[serde(default = "default_cypress_api_url")]
    pub cypress_api_url: String,

    /// Cypress Cloud web host, used to recognise run URLs in logs.
    #[serde(default = "default_cypress_cloud_url")]
    pub cypress_cloud_url: String,

    /// Number of recent cloud runs listed for commit matching.
    #[serde(default = "default_cloud_run_limit")]
    pub cloud_run_limit: u32,

    // === Dashboard ===
    /// Maximum runs returned by /history.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    /// Origins that receive an Access-Control-Allow-Origin header.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Capacity of the in-memory recent-run store.
    #[serde(default = "default_run_store_capacity")]
    pub run_store_capacity: usize,

    /// Concurrent log-archive scans per history request.
    #[serde(default = "default_log_scan_concurrency")]
    pub log_scan_concurrency: usize,

    // === Trigger polling ===
    /// Wait after a dispatch before the first lookup.
    #[serde(default = "default_trigger_initial_delay_ms")]
    pub trigger_initial_delay_ms: u64,

    /// First interval between lookups; doubles after each miss.
    #[serde(default = "default_trigger_poll_interval_ms")]
    pub trigger_poll_interval_ms: u64,

    /// Total lookup budget after the initial delay. 0 = single lookup.
    #[serde(default = "default_trigger_poll_timeout_ms")]
    pub trigger_poll_timeout_ms: u64,

    /// How far a new run's `created_at` may trail the dispatch time.
    #[serde(default = "default_trigger_clock_skew_ms")]
    pub trigger_clock_skew_ms: u64,

    // === Server Configuration ===
    /// Timeout for every outbound request.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_qa_workflow() -> String {
    "qa.yml".to_string()
}

fn default_dev_workflow() -> String {
    "dev.yml".to_string()
}

fn default_cypress_api_url() -> String {
    "https://api.cypress.io".to_string()
}

fn default_cypress_cloud_url() -> String {
    "https://cloud.cypress.io".to_string()
}

fn default_cloud_run_limit() -> u32 {
    20
}

fn default_history_limit() -> u32 {
    10
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "https://mribeiroh.github.io".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

fn default_run_store_capacity() -> usize {
    20
}

fn default_log_scan_concurrency() -> usize {
    4
}

fn default_trigger_initial_delay_ms() -> u64 {
    3000
}

fn default_trigger_poll_interval_ms() -> u64 {
    2000
}

fn default_trigger_poll_timeout_ms() -> u64 {
    15_000
}

fn default_trigger_clock_skew_ms() -> u64 {
    10_000
}

fn default_http_timeout_ms() -> u64 {
    30_000
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Ok(envy::from_env()?)
    }

    /// Configuration with every optional value at its default.
    pub fn with_credentials(github_token: impl Into<String>, github_repo: impl Into<String>) -> Self {
        Self {
            github_token: github_token.into(),
            github_repo: github_repo.into(),
            github_api_url: default_github_api_url(),
            github_branch: default_branch(),
            qa_workflow: default_qa_workflow(),
            dev_workflow: default_dev_workflow(),
            cypress_project_id: None,
            cypress_record_key: None,
            cypress_api_url: default_cypress_api_url(),
            cypress_cloud_url: default_cypress_cloud_url(),
            cloud_run_limit: default_cloud_run_limit(),
            history_limit: default_history_limit(),
            allowed_origins: default_allowed_origins(),
            run_store_capacity: default_run_store_capacity(),
            log_scan_concurrency: default_log_scan_concurrency(),
            trigger_initial_delay_ms: default_trigger_initial_delay_ms(),
            trigger_poll_interval_ms: default_trigger_poll_interval_ms(),
            trigger_poll_timeout_ms: default_trigger_poll_timeout_ms(),
            trigger_clock_skew_ms: default_trigger_clock_skew_ms(),
            http_timeout_ms: default_http_timeout_ms(),
            port: default_port(),
        }
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.github_token.trim().is_empty() {
            return Err(ConfigError::Invalid("GITHUB_TOKEN is required".to_string()));
        }

        let mut parts = self.github_repo.split('/');
        let well_formed = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
        );
        if !well_formed {
            return Err(ConfigError::Invalid(
                "GITHUB_REPO must be in owner/name form".to_string(),
            ));
        }

        if self.qa_workflow.is_empty() || self.dev_workflow.is_empty() {
            return Err(ConfigError::Invalid(
                "QA_WORKFLOW and DEV_WORKFLOW must not be empty".to_string(),
            ));
        }

        if !(1..=100).contains(&self.history_limit) {
            return Err(ConfigError::Invalid(
                "HISTORY_LIMIT must be between 1 and 100".to_string(),
            ));
        }

        if self.cloud_run_limit == 0 {
            return Err(ConfigError::Invalid(
                "CLOUD_RUN_LIMIT must be at least 1".to_string(),
            ));
        }

        if self.run_store_capacity == 0 {
            return Err(ConfigError::Invalid(
                "RUN_STORE_CAPACITY must be at least 1".to_string(),
            ));
        }

        if self.log_scan_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "LOG_SCAN_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        if self.trigger_poll_timeout_ms > 0 && self.trigger_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "TRIGGER_POLL_INTERVAL_MS must be at least 1 when polling is enabled".to_string(),
            ));
        }

        if self.trigger_clock_skew_ms > 300_000 {
            return Err(ConfigError::Invalid(
                "TRIGGER_CLOCK_SKEW_MS must not exceed 300000".to_string(),
            ));
        }

        if self.allowed_origins.iter().all(|o| o.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "ALLOWED_ORIGINS must list at least one origin".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether both Cypress Cloud credentials are present.
    pub fn cloud_enabled(&self) -> bool {
        self.cypress_project_id.is_some() && self.cypress_record_key.is_some()
    }

    /// Workflow file dispatched for an environment.
    pub fn workflow_for(&self, env: Environment) -> &str {
        match env {
            Environment::Qa => &self.qa_workflow,
            Environment::Dev => &self.dev_workflow,
        }
    }

    /// Outbound request timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}
