//! Resolved request and reply types exchanged with a [`Gateway`](crate::Gateway).

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Methods the gateway may retry without explicit confirmation.
const IDEMPOTENT_METHODS: &[&str] = &["GET", "HEAD", "OPTIONS", "PUT", "DELETE", "TRACE"];

/// Returns `true` if `method` can be repeated safely.
pub fn is_idempotent_method(method: &str) -> bool {
    IDEMPOTENT_METHODS
        .iter()
        .any(|m| m.eq_ignore_ascii_case(method))
}

/// A fully resolved API call, ready for a single gateway invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub method: String,
    /// Path relative to the gateway's base URL, or an absolute URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub content_type: Option<String>,
    pub timeout: Duration,
    /// Retry attempts after the first try.
    pub retry: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_backoff: Duration,
    /// Caller confirmed the call, allowing non-idempotent methods to be retried.
    pub confirmed: bool,
}

impl GatewayRequest {
    /// Create a request with no query, headers or body and a single attempt.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            content_type: None,
            timeout: Duration::from_secs(30),
            retry: 0,
            retry_backoff: Duration::from_millis(500),
            confirmed: false,
        }
    }

    pub fn is_idempotent(&self) -> bool {
        is_idempotent_method(&self.method)
    }

    /// Retries this request may use: the configured count for idempotent or
    /// confirmed calls, zero otherwise.
    pub fn allowed_retries(&self) -> u32 {
        if self.is_idempotent() || self.confirmed {
            self.retry
        } else {
            0
        }
    }
}

/// The response part of a result envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInfo {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    pub body: String,
    /// Length of the full response body, before any truncation.
    pub bytes: usize,
    pub truncated: bool,
}

/// What a gateway reports back for one executed call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayResponse {
    /// Fully resolved URL the request was sent to.
    pub url: String,
    /// Number of attempts made, including the first.
    pub attempts: u32,
    pub response: ResponseInfo,
}

impl GatewayResponse {
    pub fn status(&self) -> u16 {
        self.response.status
    }
}
