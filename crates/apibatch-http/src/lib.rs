//! apibatch-http: HTTP implementations of the apibatch collaborators.
//!
//! - [`HttpGateway`]: executes single API calls with `reqwest`, retrying
//!   transient failures
//! - [`OpenApiSource`]: lists operations from an OpenAPI JSON document

pub mod client;
pub mod openapi;

pub use client::{HttpClientConfig, HttpGateway};
pub use openapi::OpenApiSource;
