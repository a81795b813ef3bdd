//! `HttpGateway` and `OpenApiSource` against a local mock HTTP server.

use std::io::Write;
use std::time::Duration;

use apibatch_core::{ExitCode, Gateway, GatewayError, GatewayRequest, OperationMap};
use apibatch_http::{HttpClientConfig, HttpGateway, OpenApiSource};
use mockito::Matcher;

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn gateway(url: &str, config: HttpClientConfig) -> HttpGateway {
    HttpGateway::new(url, config).expect("valid base url")
}

fn fast_retries(mut req: GatewayRequest, retry: u32) -> GatewayRequest {
    req.retry = retry;
    req.retry_backoff = Duration::from_millis(1);
    req
}

// ─── Gateway ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_with_query_and_headers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/users")
        .match_query(Matcher::UrlEncoded("limit".into(), "2".into()))
        .match_header("x-team", "core")
        .match_header("authorization", "Bearer s3cret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("x-request-id", "abc")
        .with_body(r#"[{"id":1},{"id":2}]"#)
        .create_async()
        .await;

    let gw = gateway(
        &server.url(),
        HttpClientConfig {
            token: Some("s3cret".into()),
            include_headers: true,
            ..Default::default()
        },
    );
    let mut req = GatewayRequest::new("GET", "/users");
    req.query.push(("limit".into(), "2".into()));
    req.headers.push(("x-team".into(), "core".into()));

    let resp = gw.execute(req).await.expect("request succeeds");
    mock.assert_async().await;

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.attempts, 1);
    assert_eq!(resp.url, format!("{}/users?limit=2", server.url()));
    assert_eq!(resp.response.body, r#"[{"id":1},{"id":2}]"#);
    assert_eq!(resp.response.bytes, 19);
    assert!(!resp.response.truncated);
    let headers = resp.response.headers.expect("headers echoed");
    assert_eq!(headers.get("x-request-id").map(String::as_str), Some("abc"));
}

#[tokio::test]
async fn post_sends_body_and_content_type() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/orders")
        .match_header("content-type", "application/json")
        .match_body(r#"{"sku":"A1"}"#)
        .with_status(201)
        .with_body("created")
        .create_async()
        .await;

    let gw = gateway(&server.url(), HttpClientConfig::default());
    let mut req = GatewayRequest::new("POST", "orders");
    req.body = Some(r#"{"sku":"A1"}"#.into());
    req.content_type = Some("application/json".into());

    let resp = gw.execute(req).await.expect("request succeeds");
    mock.assert_async().await;
    assert_eq!(resp.status(), 201);
    assert!(resp.response.headers.is_none());
}

#[tokio::test]
async fn not_found_keeps_reply() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/missing")
        .with_status(404)
        .with_body("no such thing")
        .create_async()
        .await;

    let gw = gateway(&server.url(), HttpClientConfig::default());
    let err = gw
        .execute(GatewayRequest::new("GET", "/missing"))
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), ExitCode::Failure);
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.response().unwrap().response.body, "no such thing");
}

#[tokio::test]
async fn unauthorized_is_auth_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/me")
        .with_status(401)
        .create_async()
        .await;

    let gw = gateway(&server.url(), HttpClientConfig::default());
    let err = gw.execute(GatewayRequest::new("GET", "/me")).await.unwrap_err();
    assert!(matches!(err, GatewayError::Unauthorized { status: 401, .. }));
    assert_eq!(err.exit_code(), ExitCode::Auth);
}

#[tokio::test]
async fn idempotent_requests_are_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/flaky")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let gw = gateway(&server.url(), HttpClientConfig::default());
    let req = fast_retries(GatewayRequest::new("GET", "/flaky"), 2);
    let err = gw.execute(req).await.unwrap_err();

    mock.assert_async().await;
    assert_eq!(err.status(), Some(503));
    assert_eq!(err.response().unwrap().attempts, 3);
}

#[tokio::test]
async fn unconfirmed_post_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/charge")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let gw = gateway(&server.url(), HttpClientConfig::default());
    let req = fast_retries(GatewayRequest::new("POST", "/charge"), 2);
    gw.execute(req).await.unwrap_err();
    mock.assert_async().await;
}

#[tokio::test]
async fn confirmed_post_is_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/charge")
        .with_status(502)
        .expect(2)
        .create_async()
        .await;

    let gw = gateway(&server.url(), HttpClientConfig::default());
    let mut req = fast_retries(GatewayRequest::new("POST", "/charge"), 1);
    req.confirmed = true;
    gw.execute(req).await.unwrap_err();
    mock.assert_async().await;
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/bad")
        .with_status(400)
        .expect(1)
        .create_async()
        .await;

    let gw = gateway(&server.url(), HttpClientConfig::default());
    let req = fast_retries(GatewayRequest::new("GET", "/bad"), 3);
    gw.execute(req).await.unwrap_err();
    mock.assert_async().await;
}

#[tokio::test]
async fn large_bodies_are_truncated() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/big")
        .with_status(200)
        .with_body("0123456789")
        .create_async()
        .await;

    let gw = gateway(
        &server.url(),
        HttpClientConfig {
            max_body_bytes: 4,
            ..Default::default()
        },
    );
    let resp = gw.execute(GatewayRequest::new("GET", "/big")).await.unwrap();
    assert_eq!(resp.response.body, "0123");
    assert_eq!(resp.response.bytes, 10);
    assert!(resp.response.truncated);
}

#[tokio::test]
async fn connection_refused_is_network_failure() {
    let gw = gateway("http://127.0.0.1:1", HttpClientConfig::default());
    let err = gw.execute(GatewayRequest::new("GET", "/x")).await.unwrap_err();
    assert!(matches!(err, GatewayError::Http { attempts: 1, .. }));
    assert_eq!(err.exit_code(), ExitCode::Failure);
}

#[tokio::test]
async fn network_failure_counts_every_attempt() {
    let gw = gateway("http://127.0.0.1:1", HttpClientConfig::default());
    let err = gw
        .execute(fast_retries(GatewayRequest::new("GET", "/x"), 2))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Http { .. }));
    assert_eq!(err.attempts(), Some(3));
}

#[tokio::test]
async fn item_headers_replace_defaults() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/users")
        .match_header("x-env", "staging")
        .match_header("authorization", "Basic dXNlcjpwdw==")
        .match_header("content-type", "application/json")
        .with_status(201)
        .create_async()
        .await;

    let gw = gateway(
        &server.url(),
        HttpClientConfig {
            token: Some("s3cret".into()),
            default_headers: vec![
                ("X-Env".into(), "prod".into()),
                ("Content-Type".into(), "text/plain".into()),
            ],
            ..Default::default()
        },
    );
    let mut req = GatewayRequest::new("POST", "/users");
    req.headers.push(("x-env".into(), "staging".into()));
    req.headers
        .push(("Authorization".into(), "Basic dXNlcjpwdw==".into()));
    req.body = Some("{}".into());
    req.content_type = Some("application/json".into());

    let resp = gw.execute(req).await.expect("request succeeds");
    mock.assert_async().await;
    assert_eq!(resp.status(), 201);
}

#[tokio::test]
async fn invalid_method_is_usage_error() {
    let gw = gateway("http://127.0.0.1:1", HttpClientConfig::default());
    let err = gw
        .execute(GatewayRequest::new("GE T", "/x"))
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::Usage);
}

// ─── OpenAPI source ───────────────────────────────────────────────────────────

const OPENAPI_DOC: &str = r#"{
  "openapi": "3.0.0",
  "paths": {
    "/users": { "get": { "operationId": "listUsers" } },
    "/users/{id}": { "delete": { "operationId": "deleteUser" } }
  }
}"#;

#[tokio::test]
async fn operations_from_url() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/openapi.json")
        .with_status(200)
        .with_body(OPENAPI_DOC)
        .create_async()
        .await;

    let source = OpenApiSource::from_location(&format!("{}/openapi.json", server.url())).unwrap();
    let map = OperationMap::load(&source).await.unwrap();
    let op = map.get("deleteuser").expect("case-insensitive lookup");
    assert_eq!(op.method, "DELETE");
    assert_eq!(op.path, "/users/{id}");
}

#[tokio::test]
async fn operations_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(OPENAPI_DOC.as_bytes()).unwrap();

    let location = format!("@{}", file.path().display());
    let source = OpenApiSource::from_location(&location).unwrap();
    let map = OperationMap::load(&source).await.unwrap();
    assert_eq!(map.get("listUsers").unwrap().path, "/users");
}

#[tokio::test]
async fn unreachable_description_fails() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/openapi.json")
        .with_status(500)
        .create_async()
        .await;

    let source = OpenApiSource::from_location(&format!("{}/openapi.json", server.url())).unwrap();
    let err = OperationMap::load(&source).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}
