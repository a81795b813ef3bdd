//! The `Gateway` trait: the single-call executor used by the batch engine.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::request::{GatewayRequest, GatewayResponse};

/// Executes one resolved API call, including its own retries.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`: one instance is shared by every
/// batch worker and used concurrently.
///
/// # Object Safety
/// The trait is object-safe and can be stored as `Arc<dyn Gateway>`.
#[async_trait]
pub trait Gateway: Send + Sync + 'static {
    /// Perform the HTTP exchange for `req`.
    ///
    /// Non-2xx replies are returned as [`GatewayError::Status`] or
    /// [`GatewayError::Unauthorized`], carrying the reply.
    async fn execute(&self, req: GatewayRequest) -> Result<GatewayResponse, GatewayError>;

    /// Resolve `path` and `query` to the URL `execute` would call, without
    /// sending anything.
    fn resolve_url(&self, path: &str, query: &[(String, String)]) -> Result<String, GatewayError>;
}
