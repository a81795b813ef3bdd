//! apibatch-core: foundation traits and types for apibatch.
//!
//! # Overview
//!
//! apibatch issues many independent HTTP requests against one remote API in
//! a single invocation. The core crate defines:
//!
//! - [`Gateway`]: the async trait every single-call executor implements
//! - [`GatewayRequest`] / [`GatewayResponse`]: the resolved request and its reply
//! - [`GatewayError`] / [`ExitCode`]: structured failures and their classification
//! - [`OperationSource`] / [`OperationMap`]: operation identifier lookup
//! - [`policy`] module: retry backoff
//! - [`duration`] module: `"750ms"`-style duration strings

pub mod duration;
pub mod error;
pub mod gateway;
pub mod operation;
pub mod policy;
pub mod request;

pub use duration::{parse_duration, DurationError};
pub use error::{ExitCode, GatewayError};
pub use gateway::Gateway;
pub use operation::{Operation, OperationMap, OperationSource};
pub use request::{is_idempotent_method, GatewayRequest, GatewayResponse, ResponseInfo};
