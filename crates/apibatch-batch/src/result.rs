//! Per-item result envelope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use apibatch_core::error::ExitCode;
use apibatch_core::request::ResponseInfo;

/// The request part of a result envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    pub method: String,
    pub url: String,
}

/// Outcome of one batch item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResult {
    /// Position in the batch. Never serialized.
    #[serde(skip)]
    pub index: usize,
    pub id: String,
    pub ok: bool,
    pub code: ExitCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timing_ms: u64,
    pub request: RequestInfo,
    pub response: ResponseInfo,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stats: BTreeMap<String, Value>,
}

impl CallResult {
    /// A failed result with no HTTP exchange.
    pub fn failure(
        index: usize,
        id: impl Into<String>,
        code: ExitCode,
        error: impl Into<String>,
        request: RequestInfo,
    ) -> Self {
        Self {
            index,
            id: id.into(),
            ok: false,
            code,
            status: None,
            error: Some(error.into()),
            timing_ms: 0,
            request,
            response: ResponseInfo::default(),
            stats: BTreeMap::new(),
        }
    }
}
