//! HTTP gateway client backed by `reqwest`.
//!
//! Features:
//! - Per-request timeout, query, headers and body
//! - Automatic retry with exponential backoff for transient errors
//!   (idempotent methods, or any method once the caller confirmed it)
//! - Bearer token and default headers applied to every call
//! - Response bodies capped at a configurable size

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};

use apibatch_core::error::GatewayError;
use apibatch_core::gateway::Gateway;
use apibatch_core::policy::{RetryConfig, RetryPolicy};
use apibatch_core::request::{GatewayRequest, GatewayResponse, ResponseInfo};

/// Configuration for `HttpGateway`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Sent as `Authorization: Bearer <token>` when set.
    pub token: Option<String>,
    /// Headers added to every request before the request's own headers.
    pub default_headers: Vec<(String, String)>,
    /// Echo response headers back in the response descriptor.
    pub include_headers: bool,
    /// Response bodies longer than this are cut and flagged `truncated`.
    pub max_body_bytes: usize,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            token: None,
            default_headers: Vec::new(),
            include_headers: false,
            max_body_bytes: 1024 * 1024,
            user_agent: concat!("apibatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Gateway client for one API base URL.
///
/// Cheap to share: the inner `reqwest::Client` pools connections and is
/// safe for concurrent use.
pub struct HttpGateway {
    base_url: String,
    http: reqwest::Client,
    config: HttpClientConfig,
}

impl HttpGateway {
    /// Create a new client for the given API base URL.
    pub fn new(base_url: impl Into<String>, config: HttpClientConfig) -> Result<Self, GatewayError> {
        let base_url = base_url.into();
        Url::parse(&base_url)
            .map_err(|e| GatewayError::Usage(format!("invalid base URL {base_url:?}: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GatewayError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            http,
            config,
        })
    }

    /// Create with default configuration.
    pub fn default_for(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        Self::new(base_url, HttpClientConfig::default())
    }

    /// Headers for one request. Later layers replace earlier ones by name:
    /// default headers, then the request's own headers, then the bearer
    /// token (skipped when the request set `Authorization`), then the
    /// request's content type.
    fn request_headers(&self, req: &GatewayRequest) -> Result<HeaderMap, GatewayError> {
        let mut map = HeaderMap::new();
        for (name, value) in self.config.default_headers.iter().chain(req.headers.iter()) {
            map.insert(header_name(name)?, header_value(name, value)?);
        }
        if let Some(token) = &self.config.token {
            if !map.contains_key(AUTHORIZATION) {
                let mut value = header_value("Authorization", &format!("Bearer {token}"))?;
                value.set_sensitive(true);
                map.insert(AUTHORIZATION, value);
            }
        }
        if let Some(content_type) = &req.content_type {
            map.insert(CONTENT_TYPE, header_value("Content-Type", content_type)?);
        }
        Ok(map)
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        headers: &HeaderMap,
        req: &GatewayRequest,
        attempt: u32,
    ) -> Result<GatewayResponse, GatewayError> {
        let mut builder = self
            .http
            .request(method.clone(), url)
            .timeout(req.timeout)
            .headers(headers.clone());
        if let Some(body) = &req.body {
            builder = builder.body(body.clone());
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| map_send_error(e, req, attempt))?;

        let status = resp.status();
        let headers = self.config.include_headers.then(|| {
            resp.headers()
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_string(),
                        String::from_utf8_lossy(v.as_bytes()).into_owned(),
                    )
                })
                .collect::<BTreeMap<_, _>>()
        });
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| map_send_error(e, req, attempt))?;
        let (body, truncated) = truncate_body(&bytes, self.config.max_body_bytes);

        let reply = GatewayResponse {
            url: url.to_string(),
            attempts: attempt,
            response: ResponseInfo {
                status: status.as_u16(),
                headers,
                body,
                bytes: bytes.len(),
                truncated,
            },
        };

        if status.is_success() {
            Ok(reply)
        } else {
            Err(status_error(status, reply))
        }
    }
}

/// Classify a non-2xx reply.
pub(crate) fn status_error(status: StatusCode, reply: GatewayResponse) -> GatewayError {
    let message = status.canonical_reason().unwrap_or("unexpected status").to_string();
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        GatewayError::Unauthorized {
            status: status.as_u16(),
            message,
            response: Box::new(reply),
        }
    } else {
        GatewayError::Status {
            status: status.as_u16(),
            message,
            response: Box::new(reply),
        }
    }
}

fn header_name(name: &str) -> Result<HeaderName, GatewayError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| GatewayError::Usage(format!("invalid header name {name:?}")))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, GatewayError> {
    HeaderValue::from_str(value)
        .map_err(|_| GatewayError::Usage(format!("invalid value for header {name:?}")))
}

fn map_send_error(e: reqwest::Error, req: &GatewayRequest, attempts: u32) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout {
            ms: req.timeout.as_millis() as u64,
            attempts,
        }
    } else if e.is_builder() {
        GatewayError::Usage(format!("invalid request: {e}"))
    } else {
        GatewayError::Http {
            message: e.to_string(),
            attempts,
        }
    }
}

fn truncate_body(bytes: &[u8], limit: usize) -> (String, bool) {
    if bytes.len() > limit {
        (String::from_utf8_lossy(&bytes[..limit]).into_owned(), true)
    } else {
        (String::from_utf8_lossy(bytes).into_owned(), false)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn execute(&self, req: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let url = self.resolve_url(&req.path, &req.query)?;
        let method = Method::from_bytes(req.method.as_bytes())
            .map_err(|_| GatewayError::Usage(format!("invalid HTTP method {:?}", req.method)))?;
        let headers = self.request_headers(&req)?;
        let retry = RetryPolicy::new(RetryConfig::new(req.allowed_retries(), req.retry_backoff));

        // Retry loop
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.send_once(&method, &url, &headers, &req, attempt).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() => match retry.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            url = %url,
                            "retrying request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        if attempt > 1 {
                            tracing::error!(attempt, error = %e, url = %url, "max retries exceeded");
                        }
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    fn resolve_url(&self, path: &str, query: &[(String, String)]) -> Result<String, GatewayError> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };
        let mut url = Url::parse(&raw)
            .map_err(|e| GatewayError::Usage(format!("invalid URL {raw:?}: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn resolve_joins_base_and_path() {
        let gw = HttpGateway::default_for("https://api.example.com/v1/").unwrap();
        assert_eq!(
            gw.resolve_url("/users", &[]).unwrap(),
            "https://api.example.com/v1/users"
        );
        assert_eq!(
            gw.resolve_url("users", &pairs(&[("limit", "5"), ("q", "a b")])).unwrap(),
            "https://api.example.com/v1/users?limit=5&q=a+b"
        );
    }

    #[test]
    fn resolve_keeps_absolute_urls() {
        let gw = HttpGateway::default_for("https://api.example.com").unwrap();
        assert_eq!(
            gw.resolve_url("https://other.example.com/x", &[]).unwrap(),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn invalid_base_url_is_usage_error() {
        let err = HttpGateway::default_for("not a url").err().unwrap();
        assert!(matches!(err, GatewayError::Usage(_)));
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate_body(b"abcdef", 4), ("abcd".to_string(), true));
        assert_eq!(truncate_body(b"abc", 4), ("abc".to_string(), false));
    }

    #[test]
    fn forbidden_is_auth_failure() {
        let err = status_error(StatusCode::FORBIDDEN, GatewayResponse::default());
        assert!(matches!(err, GatewayError::Unauthorized { status: 403, .. }));
        let err = status_error(StatusCode::NOT_FOUND, GatewayResponse::default());
        assert!(matches!(err, GatewayError::Status { status: 404, .. }));
    }

    #[test]
    fn request_headers_are_set_once() {
        let gw = HttpGateway::new(
            "https://api.example.com",
            HttpClientConfig {
                token: Some("s3cret".into()),
                default_headers: pairs(&[("Content-Type", "text/plain"), ("X-Env", "prod")]),
                ..Default::default()
            },
        )
        .unwrap();
        let mut req = GatewayRequest::new("POST", "/users");
        req.headers = pairs(&[("x-env", "staging"), ("Content-Type", "text/csv")]);
        req.content_type = Some("application/json".into());

        let map = gw.request_headers(&req).unwrap();
        assert_eq!(map.get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(map[CONTENT_TYPE], "application/json");
        assert_eq!(map.get_all("x-env").iter().count(), 1);
        assert_eq!(map["x-env"], "staging");
        assert_eq!(map.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(map[AUTHORIZATION], "Bearer s3cret");
    }

    #[test]
    fn request_authorization_replaces_token() {
        let gw = HttpGateway::new(
            "https://api.example.com",
            HttpClientConfig {
                token: Some("s3cret".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let mut req = GatewayRequest::new("GET", "/me");
        req.headers = pairs(&[("Authorization", "Basic dXNlcjpwdw==")]);

        let map = gw.request_headers(&req).unwrap();
        assert_eq!(map.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(map[AUTHORIZATION], "Basic dXNlcjpwdw==");
    }

    #[test]
    fn invalid_header_is_usage_error() {
        let gw = HttpGateway::default_for("https://api.example.com").unwrap();
        let mut req = GatewayRequest::new("GET", "/x");
        req.headers = pairs(&[("bad header", "v")]);
        assert!(matches!(
            gw.request_headers(&req),
            Err(GatewayError::Usage(_))
        ));
    }
}
