//! Batch-level errors.
//!
//! Failures of individual calls never appear here; they are recorded in
//! their [`CallResult`](crate::CallResult). A `BatchError` either stops the
//! run before any call is dispatched, or reports the aggregate outcome of a
//! finished run.

use apibatch_core::error::{ExitCode, GatewayError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    /// Malformed input or invalid batch-wide settings.
    #[error("{0}")]
    Usage(String),

    /// The batch source could not be read.
    #[error("read batch {source_name}: {error}")]
    Read {
        source_name: String,
        #[source]
        error: std::io::Error,
    },

    /// The operation map could not be built.
    #[error("load operations: {0}")]
    Operations(#[source] GatewayError),

    /// Results could not be written.
    #[error("write results: {0}")]
    Output(#[from] std::io::Error),

    /// The run finished but at least one call did not succeed.
    #[error("one or more batch requests failed")]
    Failed { code: ExitCode },
}

impl BatchError {
    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Exit classification of this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Usage(_) | Self::Read { .. } => ExitCode::Usage,
            Self::Operations(e) => e.exit_code(),
            Self::Output(_) => ExitCode::Failure,
            Self::Failed { code } => *code,
        }
    }
}
