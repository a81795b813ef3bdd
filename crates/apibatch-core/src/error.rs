//! Gateway error types and exit classification.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::GatewayResponse;

/// Process-level outcome class of one call, or of a whole batch.
///
/// Serialized as its numeric process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum ExitCode {
    /// Everything succeeded.
    Success,
    /// Transport failure, timeout, or a non-2xx status not otherwise classified.
    Failure,
    /// Malformed input, invalid flags or overrides.
    Usage,
    /// The remote API rejected the credentials.
    Auth,
}

impl ExitCode {
    /// Numeric process exit status.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Usage => 2,
            Self::Auth => 3,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

impl TryFrom<i32> for ExitCode {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Success),
            1 => Ok(Self::Failure),
            2 => Ok(Self::Usage),
            3 => Ok(Self::Auth),
            other => Err(format!("unknown exit code {other}")),
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Usage => write!(f, "usage"),
            Self::Auth => write!(f, "auth"),
        }
    }
}

/// Errors that can occur while executing a single API call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request could not be built from its inputs.
    #[error("{0}")]
    Usage(String),

    /// HTTP 401/403 returned by the API.
    #[error("HTTP {status}: {message}")]
    Unauthorized {
        status: u16,
        message: String,
        response: Box<GatewayResponse>,
    },

    /// Any other non-2xx status returned by the API.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        response: Box<GatewayResponse>,
    },

    /// Request timed out after the configured duration. `attempts` counts
    /// every try, including the one that timed out.
    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64, attempts: u32 },

    /// HTTP request failed (connection refused, DNS, TLS, etc.).
    #[error("HTTP error: {message}")]
    Http { message: String, attempts: u32 },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    /// Exit classification of this failure.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Usage(_) => ExitCode::Usage,
            Self::Unauthorized { .. } => ExitCode::Auth,
            Self::Status { .. }
            | Self::Timeout { .. }
            | Self::Http { .. }
            | Self::Deserialization(_)
            | Self::Other(_) => ExitCode::Failure,
        }
    }

    /// Returns `true` if this error is transient and worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// The API's reply, when the failure came from an HTTP status.
    pub fn response(&self) -> Option<&GatewayResponse> {
        match self {
            Self::Unauthorized { response, .. } | Self::Status { response, .. } => {
                Some(response.as_ref())
            }
            _ => None,
        }
    }

    /// HTTP status, when one was obtained.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status, .. } | Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// How many tries were made before giving up, when a request was sent.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Timeout { attempts, .. } | Self::Http { attempts, .. } => Some(*attempts),
            _ => self.response().map(|reply| reply.attempts),
        }
    }
}
