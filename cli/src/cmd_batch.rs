//! `apibatch batch`: read a batch, execute it, print ordered results.

use std::io::{self, BufWriter};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use apibatch_batch::{
    write_results, BatchError, BatchRunner, BatchSource, ExecutionDefaults, OutputFormat,
};
use apibatch_core::duration::parse_duration;
use apibatch_http::{HttpClientConfig, HttpGateway, OpenApiSource};

/// Connection settings shared by every call in the batch.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// API base URL that item paths are resolved against
    #[arg(long, env = "APIBATCH_BASE_URL")]
    pub base_url: String,

    /// Bearer token sent with every request
    #[arg(long, env = "APIBATCH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// OpenAPI JSON document used to resolve "op" identifiers (URL, @file or path)
    #[arg(long, env = "APIBATCH_SPEC_URL")]
    pub spec: Option<String>,

    /// Extra header for every request, "Key: value" (repeatable)
    #[arg(long = "header", value_name = "KEY:VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Echo response headers in each result
    #[arg(long)]
    pub include_headers: bool,

    /// Cut response bodies longer than this many bytes
    #[arg(long, default_value_t = 1024 * 1024)]
    pub max_body_bytes: usize,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Batch source: "-" for stdin, "@file" or a path
    #[arg(long, value_name = "SOURCE", default_value = "-", conflicts_with = "batch_json")]
    pub batch: String,

    /// Batch given inline as a JSON array or newline-delimited JSON
    #[arg(long, value_name = "JSON")]
    pub batch_json: Option<String>,

    /// Per-request timeout, e.g. "30s" or "1m30s"
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Retry attempts after the first try
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub retry: i64,

    /// Initial delay between retries, doubled after each attempt
    #[arg(long, default_value = "500ms", value_parser = parse_duration)]
    pub retry_backoff: Duration,

    /// Confirm every call; allows retrying POST and PATCH
    #[arg(long)]
    pub yes: bool,

    /// Resolve every item without sending anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output format: ndjson or json
    #[arg(long, default_value = "ndjson", value_parser = OutputFormat::from_str)]
    pub format: OutputFormat,

    /// Print the json array on one line
    #[arg(long)]
    pub compact: bool,

    /// Number of requests in flight at once
    #[arg(long, default_value_t = 1)]
    pub parallel: usize,
}

impl BatchArgs {
    pub fn execution_defaults(&self) -> ExecutionDefaults {
        ExecutionDefaults {
            timeout: self.timeout,
            retry: self.retry,
            retry_backoff: self.retry_backoff,
            yes: self.yes,
            dry_run: self.dry_run,
            format: self.format,
            compact: self.compact,
            parallelism: self.parallel,
        }
    }

    fn source(&self) -> BatchSource {
        match &self.batch_json {
            Some(inline) => BatchSource::Inline(inline.clone().into_bytes()),
            None => BatchSource::parse(&self.batch),
        }
    }
}

pub async fn run(args: BatchArgs) -> Result<()> {
    let defaults = args.execution_defaults();
    defaults.validate()?;

    let conn = &args.connection;
    let config = HttpClientConfig {
        token: conn.token.clone(),
        default_headers: conn.headers.clone(),
        include_headers: conn.include_headers,
        max_body_bytes: conn.max_body_bytes,
        ..HttpClientConfig::default()
    };
    let gateway = HttpGateway::new(conn.base_url.clone(), config)?;

    let mut runner = BatchRunner::new(Arc::new(gateway), defaults.clone());
    if let Some(spec) = &conn.spec {
        tracing::debug!(location = %spec, "operations resolve through API description");
        let source = OpenApiSource::from_location(spec)?.with_token(conn.token.clone());
        runner = runner.with_operations(Arc::new(source));
    }

    let descriptors = args.source().read_descriptors().await?;
    let report = runner.run(descriptors).await?;

    let stdout = io::stdout();
    write_results(
        BufWriter::new(stdout.lock()),
        &report.results,
        defaults.format,
        defaults.compact,
    )
    .map_err(BatchError::Output)?;

    report.check()?;
    Ok(())
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid header {raw:?}, want Key:value"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid header {raw:?}, empty key"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
