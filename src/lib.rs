//! QA dashboard API.
//!
//! Serves a static dashboard with GitHub Actions workflow runs merged with the
//! Cypress Cloud runs they recorded:
//!
//! ```text
//! GET  /status      latest run on the branch
//! GET  /history     last N runs, provider order
//! GET  /run/{id}    one run
//! POST /trigger     dispatch qa/dev workflow, then locate its run
//! GET  /recent      runs served by this instance
//! ```
//!
//! Every run is correlated to its cloud run by commit hash, falling back to a
//! scan of the run's log archive.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`github`]: GitHub Actions client
//! - [`cloud`]: Cypress Cloud client
//! - [`correlation`]: Workflow run to cloud run resolution
//! - [`runs`]: Response envelopes, run store, trigger polling
//! - [`api`]: HTTP API and CORS gate
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod auth;
pub mod cloud;
pub mod config;
pub mod correlation;
pub mod error;
pub mod github;
pub mod metrics;
pub mod runs;
pub mod utils;

pub use config::Config;
pub use error::{ApiError, Result};
