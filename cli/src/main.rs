//! apibatch CLI: run many independent API calls in one invocation.
//!
//! # Commands
//! ```text
//! apibatch batch      --base-url <url> [--batch <-|@file>] [--parallel N] ...
//! apibatch operations --spec <url|@file>
//! ```
//!
//! # Exit codes
//! `0` every item succeeded, `1` network or HTTP failure, `2` usage error,
//! `3` authentication failure only.

use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};

use apibatch_batch::BatchError;
use apibatch_core::error::{ExitCode, GatewayError};

mod cmd_batch;
mod cmd_operations;
mod logging;

#[derive(Parser)]
#[command(
    name = "apibatch",
    about = "Run many API calls from one batch file",
    long_about = "
apibatch: issue many independent HTTP requests against one API in a single
invocation, with per-request overrides and bounded concurrency. The exit
status reflects the worst outcome across all requests.

ENVIRONMENT VARIABLES:
  APIBATCH_BASE_URL   API base URL
  APIBATCH_TOKEN      Bearer token sent with every request
  APIBATCH_SPEC_URL   OpenAPI document used to resolve \"op\" identifiers
  APIBATCH_LOG        Log filter directives (default: warn)
",
    version
)]
struct Cli {
    /// Log filter, e.g. "info" or "warn,apibatch_http=debug"
    #[arg(long, global = true, env = "APIBATCH_LOG", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a batch of API calls
    Batch(cmd_batch::BatchArgs),

    /// List the operation identifiers of an OpenAPI document
    Operations {
        /// OpenAPI JSON document (http(s) URL, @file or path)
        #[arg(long, env = "APIBATCH_SPEC_URL")]
        spec: String,
        /// Bearer token used when fetching the document
        #[arg(long, env = "APIBATCH_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> process::ExitCode {
    let cli = Cli::parse();

    logging::init_tracing(&logging::LogConfig {
        level: cli.log_level.clone(),
        json: cli.log_json,
    });

    let result = match cli.command {
        Commands::Batch(args) => cmd_batch::run(args).await,
        Commands::Operations { spec, token, json } => {
            cmd_operations::run(&spec, token, json).await
        }
    };

    match result {
        Ok(()) => process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::ExitCode::from(exit_code_of(&e).as_i32() as u8)
        }
    }
}

/// Map a wiring error to its exit classification. Anything the libraries
/// did not classify is a usage error.
fn exit_code_of(err: &anyhow::Error) -> ExitCode {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<BatchError>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<GatewayError>() {
            return e.exit_code();
        }
    }
    ExitCode::Usage
}
