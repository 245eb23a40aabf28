// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Retail Identity Node
//!
//! Entry point for the `retail-identity-node` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the store, and serves the HTTP API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     start the HTTP service
//! - `keygen`  print a fresh server key
//! - `version` print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use retail_identity::config::{ServerKey, SIGNING_ALGORITHM, SYMMETRIC_ALGORITHM};
use retail_identity::crypto::FieldCipher;
use retail_identity::identity::DidDeriver;
use retail_identity::ledger::SledLedger;
use retail_identity::storage::RetailerDb;
use retail_identity::verification::FormatGateway;
use retail_identity::RegistrationService;

use cli::{Commands, RetailNodeCli};
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real deployments set the environment.
    dotenv::dotenv().ok();
    let cli = RetailNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Keygen => {
            println!("{}", ServerKey::generate().to_hex());
            Ok(())
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the identity service: API server and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_LOG_DIRECTIVE, args.log_format);

    // --- Server key ---
    let server_key =
        ServerKey::parse(&args.server_key).context("RETAIL_ID_SERVER_KEY is missing or malformed")?;
    let cipher = FieldCipher::new(&server_key);
    drop(server_key);

    anyhow::ensure!(
        !args.did_method.is_empty()
            && args
                .did_method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
        "DID method must be lowercase alphanumeric, got '{}'",
        args.did_method
    );

    tracing::info!(
        port = args.port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        did_method = %args.did_method,
        admin_enabled = args.admin_token.is_some(),
        "starting retail-identity-node"
    );

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let store = Arc::new(
        RetailerDb::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?,
    );
    let ledger = Arc::new(SledLedger::new(store.handle()).context("failed to open ledger journal")?);
    tracing::info!(
        path = %db_path.display(),
        retailers = store.retailer_count(),
        ledger_entries = ledger.len(),
        "database opened"
    );

    // --- Service ---
    let service = RegistrationService::new(
        store,
        Arc::new(FormatGateway::new()),
        ledger,
        cipher,
    )
    .with_did_deriver(DidDeriver::new(args.did_method.clone()));

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);

    // --- Application state ---
    let app_state = api::AppState::new(
        env!("CARGO_PKG_VERSION"),
        Arc::new(service),
        Arc::clone(&node_metrics),
        args.admin_token.as_deref(),
    );
    if app_state.admin_token_digest.is_none() {
        tracing::warn!("no admin token configured, admin endpoints disabled");
    }

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("retail-identity-node stopped");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("retail-identity-node {}", env!("CARGO_PKG_VERSION"));
    println!("signing    {}", SIGNING_ALGORITHM);
    println!("envelopes  {}", SYMMETRIC_ALGORITHM);
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that signal is never delivered and the other one still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
