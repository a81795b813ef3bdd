//! Batch-wide execution defaults.

use std::str::FromStr;
use std::time::Duration;

use crate::error::BatchError;

/// Output encoding of the result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON object per line.
    #[default]
    Ndjson,
    /// A single JSON array.
    Json,
}

impl FromStr for OutputFormat {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ndjson" | "jsonl" => Ok(Self::Ndjson),
            "json" => Ok(Self::Json),
            other => Err(BatchError::usage(format!(
                "unknown output format {other:?} (want ndjson or json)"
            ))),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ndjson => write!(f, "ndjson"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Settings every item starts from. Built once per run and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionDefaults {
    pub timeout: Duration,
    /// Retry attempts after the first try. Signed so that a negative flag
    /// value reaches validation instead of failing to parse.
    pub retry: i64,
    pub retry_backoff: Duration,
    /// Confirm every call, allowing non-idempotent methods to be retried.
    pub yes: bool,
    /// Dry-run every item regardless of its own flag.
    pub dry_run: bool,
    pub format: OutputFormat,
    pub compact: bool,
    /// Number of concurrent workers; 1 runs items strictly in order.
    pub parallelism: usize,
}

impl Default for ExecutionDefaults {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: 0,
            retry_backoff: Duration::from_millis(500),
            yes: false,
            dry_run: false,
            format: OutputFormat::Ndjson,
            compact: false,
            parallelism: 1,
        }
    }
}

impl ExecutionDefaults {
    /// Pre-flight checks, run before anything is dispatched.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.parallelism < 1 {
            return Err(BatchError::usage("--parallel must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(BatchError::usage("--timeout must be greater than 0"));
        }
        if self.retry < 0 {
            return Err(BatchError::usage("--retry must be 0 or greater"));
        }
        if self.retry > i64::from(u32::MAX) {
            return Err(BatchError::usage("--retry is too large"));
        }
        if self.retry > 0 && self.retry_backoff.is_zero() {
            return Err(BatchError::usage(
                "--retry-backoff must be greater than 0 when --retry is set",
            ));
        }
        Ok(())
    }
}
