//! Operation listing from an OpenAPI (JSON) document.
//!
//! The document is read from a URL or a local file. Every
//! `paths.<path>.<method>.operationId` becomes one [`Operation`].

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use apibatch_core::error::GatewayError;
use apibatch_core::operation::{Operation, OperationSource};
use apibatch_core::request::{GatewayResponse, ResponseInfo};

use crate::client::status_error;

const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Url(String),
    File(PathBuf),
}

/// Loads operations from an OpenAPI document.
pub struct OpenApiSource {
    location: Location,
    http: reqwest::Client,
    token: Option<String>,
}

impl OpenApiSource {
    /// `http(s)://…` is fetched; `@path` or a bare path is read from disk.
    pub fn from_location(location: &str) -> Result<Self, GatewayError> {
        let location = if location.starts_with("http://") || location.starts_with("https://") {
            Location::Url(location.to_string())
        } else {
            let path = location.strip_prefix('@').unwrap_or(location);
            if path.is_empty() {
                return Err(GatewayError::Usage("empty API description location".into()));
            }
            Location::File(PathBuf::from(path))
        };
        let http = reqwest::Client::builder()
            .user_agent(concat!("apibatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            location,
            http,
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` when fetching over HTTP.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    async fn fetch(&self, url: &str) -> Result<String, GatewayError> {
        let mut builder = self.http.get(url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| GatewayError::Http {
                message: e.to_string(),
                attempts: 1,
            })?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GatewayError::Http {
                message: e.to_string(),
                attempts: 1,
            })?;
        if !status.is_success() {
            let reply = GatewayResponse {
                url: url.to_string(),
                attempts: 1,
                response: ResponseInfo {
                    status: status.as_u16(),
                    headers: None,
                    bytes: text.len(),
                    body: text,
                    truncated: false,
                },
            };
            return Err(status_error(status, reply));
        }
        Ok(text)
    }
}

/// Collect operations from a parsed OpenAPI document, ordered by path key.
pub fn operations_from_document(doc: &Value) -> Result<Vec<Operation>, GatewayError> {
    let paths = doc
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| GatewayError::Other("API description has no `paths` object".into()))?;

    let mut ops = Vec::new();
    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            continue;
        };
        for (method, operation) in item {
            if !HTTP_METHODS.contains(&method.as_str()) {
                continue;
            }
            if let Some(id) = operation.get("operationId").and_then(Value::as_str) {
                ops.push(Operation::new(id, method.as_str(), path.as_str()));
            }
        }
    }
    Ok(ops)
}

#[async_trait]
impl OperationSource for OpenApiSource {
    async fn load(&self) -> Result<Vec<Operation>, GatewayError> {
        let text = match &self.location {
            Location::Url(url) => self.fetch(url).await?,
            Location::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                GatewayError::Usage(format!(
                    "read API description {}: {e}",
                    path.display()
                ))
            })?,
        };
        let doc: Value = serde_json::from_str(&text)?;
        let ops = operations_from_document(&doc)?;
        tracing::debug!(operations = ops.len(), "parsed API description");
        Ok(ops)
    }
}
