//! QA dashboard API entry point.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use qa_dashboard_api::api::{create_router, AppState};
use qa_dashboard_api::config::Config;
use qa_dashboard_api::metrics;
use qa_dashboard_api::runs::CorrelatedRun;
use qa_dashboard_api::utils::shutdown_signal;

/// QA dashboard API.
#[derive(Parser, Debug)]
#[command(name = "qa-dashboard-api")]
#[command(about = "Serves GitHub Actions runs correlated with Cypress Cloud runs")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// Listen port; overrides PORT.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Resolve the cloud run of one workflow run (diagnostic).
    Correlate {
        /// Workflow run id.
        run_id: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("qa_dashboard_api=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Some(Command::Serve { port }) => cmd_serve(port).await,
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::Correlate { run_id }) => cmd_correlate(run_id).await,
        None => cmd_serve(None).await,
    }
}

fn load_config() -> anyhow::Result<Config> {
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    Ok(config)
}

/// Run the HTTP server until a shutdown signal arrives.
async fn cmd_serve(port_override: Option<u16>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let mut config = load_config()?;
    if let Some(port) = port_override {
        config.port = port;
    }

    info!("Repository: {} (branch {})", config.github_repo, config.github_branch);
    info!(
        "Cypress Cloud: {}",
        if config.cloud_enabled() { "enabled" } else { "disabled, log scan only" }
    );
    info!("Allowed origins: {}", config.allowed_origins.join(", "));

    let port = config.port;
    let mut state = AppState::from_config(config)?;

    // Initialize metrics
    match metrics::install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => warn!("Metrics disabled: {}", e),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("QA DASHBOARD API - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  GitHub API: {}", config.github_api_url);
    println!("  Repository: {}", config.github_repo);
    println!("  Branch: {}", config.github_branch);
    println!("  GitHub Token: present");
    println!("  QA Workflow: {}", config.qa_workflow);
    println!("  Dev Workflow: {}", config.dev_workflow);
    match &config.cypress_project_id {
        Some(project) => println!("  Cypress Project: {}", project),
        None => println!("  Cypress Project: not set"),
    }
    println!(
        "  Cypress Record Key: {}",
        if config.cypress_record_key.is_some() { "present" } else { "not set" }
    );
    if !config.cloud_enabled() {
        println!("  WARNING: Cypress Cloud lookups disabled, only log scanning will be used");
    }
    println!("  History Limit: {}", config.history_limit);
    println!("  Allowed Origins: {}", config.allowed_origins.join(", "));
    println!(
        "  Trigger Polling: {}ms delay, {}ms interval, {}ms budget, {}ms clock skew",
        config.trigger_initial_delay_ms,
        config.trigger_poll_interval_ms,
        config.trigger_poll_timeout_ms,
        config.trigger_clock_skew_ms
    );
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Resolve and print the cloud run of one workflow run.
async fn cmd_correlate(run_id: u64) -> anyhow::Result<()> {
    let config = load_config()?;
    let state = AppState::from_config(config)?;

    let run = state.github.get_run(run_id).await?;
    println!("Run {}: {}", run.id, run.name.as_deref().unwrap_or("<unnamed>"));
    println!("  Commit: {}", run.commit_sha().unwrap_or("<none>"));

    let correlation = state.resolver.resolve(&run).await;
    match (&correlation.url, correlation.source) {
        (Some(url), Some(source)) => println!("  Cloud run: {} (via {})", url, source),
        _ => println!("  Cloud run: not found"),
    }

    let envelope = CorrelatedRun::new(&run, correlation.url);
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}
