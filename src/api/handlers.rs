//! HTTP API handlers.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cloud::CloudClient;
use crate::config::Config;
use crate::correlation::{CloudUrlPattern, Resolver};
use crate::error::{ApiError, ConfigError, Result};
use crate::github::GitHubClient;
use crate::metrics;
use crate::runs::{
    poll_for_run, select_triggered_run, CorrelatedRun, Environment, PollSchedule, RunStore,
};
use crate::utils::build_http_client;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<Config>,
    /// GitHub Actions client.
    pub github: GitHubClient,
    /// Cloud run resolver.
    pub resolver: Resolver,
    /// Recently served runs.
    pub store: Arc<RunStore>,
    /// Prometheus render handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Build clients and the resolver from config.
    pub fn from_config(config: Config) -> std::result::Result<Self, ConfigError> {
        let http = build_http_client(&config)?;

        let github = GitHubClient::new(http.clone(), &config)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let cloud = CloudClient::from_config(http, &config)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let pattern = CloudUrlPattern::new(&config.cypress_cloud_url)
            .map_err(|e| ConfigError::Invalid(format!("CYPRESS_CLOUD_URL: {e}")))?;

        let resolver = Resolver::new(github.clone(), cloud, pattern, config.cloud_run_limit);
        let store = Arc::new(RunStore::new(config.run_store_capacity));

        Ok(Self {
            config: Arc::new(config),
            github,
            resolver,
            store,
            metrics: None,
        })
    }

    /// Attach a Prometheus handle for the /metrics endpoint.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Run list response.
#[derive(Debug, Serialize)]
pub struct RunListResponse {
    /// Always true.
    pub success: bool,
    /// Runs in provider order.
    pub runs: Vec<CorrelatedRun>,
}

/// Trigger response.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    /// Always true.
    pub success: bool,
    /// The located run.
    #[serde(flatten)]
    pub run: CorrelatedRun,
}

/// Trigger request body. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct TriggerRequest {
    /// `qa` or `dev`; defaults to `dev`.
    #[serde(default)]
    pub env: Option<String>,
    /// Free-form note, logged with the dispatch.
    #[serde(default)]
    pub message: Option<String>,
}

impl TriggerRequest {
    /// Parse a possibly empty JSON body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice::<Option<Self>>(body)
            .map(Option::unwrap_or_default)
            .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))
    }

    /// Requested environment.
    pub fn environment(&self) -> Result<Environment> {
        match self.env.as_deref() {
            None => Ok(Environment::default()),
            Some(raw) => Environment::from_str(raw.trim())
                .map_err(|_| ApiError::BadRequest(format!("unknown env '{raw}'"))),
        }
    }
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Prometheus exposition, 404 when no recorder is installed.
pub async fn metrics_text(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => ApiError::NotFound("metrics are disabled".to_string()).into_response(),
    }
}

/// Latest run on the branch, correlated.
pub async fn status(State(state): State<AppState>) -> Result<Json<CorrelatedRun>> {
    metrics::inc_http_requests("status");

    let runs = state.github.list_runs(1).await?;
    let run = runs
        .first()
        .ok_or_else(|| ApiError::NotFound("No workflow runs found".to_string()))?;

    let correlation = state.resolver.resolve(run).await;
    Ok(Json(CorrelatedRun::new(run, correlation.url)))
}

/// Most recent runs, capped and in provider order, correlated.
pub async fn history(State(state): State<AppState>) -> Result<Json<RunListResponse>> {
    metrics::inc_http_requests("history");

    let limit = state.config.history_limit;
    let mut runs = state.github.list_runs(limit).await?;
    runs.truncate(limit as usize);

    let correlations = state
        .resolver
        .resolve_all(&runs, state.config.log_scan_concurrency)
        .await;

    let runs = runs
        .iter()
        .zip(correlations)
        .map(|(run, correlation)| CorrelatedRun::new(run, correlation.url))
        .collect();

    Ok(Json(RunListResponse {
        success: true,
        runs,
    }))
}

/// Single run by id, correlated.
pub async fn run_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CorrelatedRun>> {
    metrics::inc_http_requests("run");

    let run_id = id
        .parse::<u64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid run id '{id}'")))?;

    let run = state.github.get_run(run_id).await?;
    let correlation = state.resolver.resolve(&run).await;

    let envelope = CorrelatedRun::new(&run, correlation.url);
    state.store.record(envelope.clone());
    Ok(Json(envelope))
}

/// Dispatch the workflow for an environment, then locate and correlate its run.
pub async fn trigger(State(state): State<AppState>, body: Bytes) -> Result<Json<TriggerResponse>> {
    metrics::inc_http_requests("trigger");

    let request = TriggerRequest::parse(&body)?;
    let env = request.environment()?;
    let workflow = state.config.workflow_for(env);

    let schedule = PollSchedule::from_config(&state.config);
    let since = schedule.cutoff(Utc::now());

    info!(%env, workflow, message = ?request.message, "Dispatching workflow");
    state.github.dispatch(workflow).await?;
    metrics::inc_dispatches(env.tag());

    let per_page = state.config.history_limit;
    let github = &state.github;

    let run = poll_for_run(schedule, || async move {
        let runs = github.list_runs(per_page).await?;
        Ok::<_, ApiError>(select_triggered_run(&runs, env, since).cloned())
    })
    .await?
    .ok_or_else(|| {
        warn!(%env, "Dispatched run did not appear");
        ApiError::NotFound(format!("No {env} run found"))
    })?;

    let correlation = state.resolver.resolve(&run).await;
    let envelope = CorrelatedRun::new(&run, correlation.url);
    state.store.record(envelope.clone());

    Ok(Json(TriggerResponse {
        success: true,
        run: envelope,
    }))
}

/// Runs served recently by this instance, newest first.
pub async fn recent(State(state): State<AppState>) -> Json<RunListResponse> {
    metrics::inc_http_requests("recent");

    Json(RunListResponse {
        success: true,
        runs: state.store.list(),
    })
}
