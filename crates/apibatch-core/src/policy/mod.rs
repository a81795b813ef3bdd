//! Reliability policies applied by gateway implementations.

pub mod retry;

pub use retry::{RetryConfig, RetryPolicy};
