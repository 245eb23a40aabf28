//! # CLI Interface
//!
//! Defines the command-line argument structure for `retail-identity-node`
//! using `clap` derive. Supports three subcommands: `run`, `keygen`, and
//! `version`.
//!
//! Every `run` flag falls back to a `RETAIL_ID_*` environment variable, and
//! a `.env` file in the working directory is loaded before parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use retail_identity::config::{DEFAULT_API_PORT, DEFAULT_DID_METHOD, DEFAULT_METRICS_PORT};

use crate::logging::LogFormat;

/// Retailer identity service.
///
/// Registers retailers behind credential verification, issues their DIDs,
/// seals their PII, and serves public profiles over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "retail-identity-node",
    about = "Retailer DID and credential envelope service",
    version,
    propagate_version = true
)]
pub struct RetailNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP service.
    Run(RunArgs),
    /// Print a fresh random server key (hex) and exit.
    Keygen,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// 32-byte AES-256 server key, as 64 hex characters or base64.
    ///
    /// Required. The service refuses to start without it.
    #[arg(long, env = "RETAIL_ID_SERVER_KEY", hide_env_values = true)]
    pub server_key: String,

    /// Bearer token for the administrative endpoints.
    ///
    /// When unset, decrypt and ledger resubmission are disabled.
    #[arg(long, env = "RETAIL_ID_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    /// Directory holding the sled database.
    #[arg(long, short = 'd', env = "RETAIL_ID_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Port for the REST API.
    #[arg(long, short = 'p', env = "RETAIL_ID_PORT", default_value_t = DEFAULT_API_PORT)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "RETAIL_ID_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// DID method for newly registered retailers.
    #[arg(long, env = "RETAIL_ID_DID_METHOD", default_value = DEFAULT_DID_METHOD)]
    pub did_method: String,

    /// Log output format.
    #[arg(long, value_enum, env = "RETAIL_ID_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}
