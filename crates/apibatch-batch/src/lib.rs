//! # apibatch-batch
//!
//! Runs many independent API calls in one invocation.
//!
//! ## Pipeline
//! ```text
//! bytes → [source] → descriptors → (operation map) → [plan] → work items
//!       → [scheduler × executor] → ordered results → [aggregate] → exit code
//!                                                 → [output]    → ndjson / json
//! ```
//!
//! ## Features
//! - JSON array or newline-delimited JSON input from stdin, a file, or bytes
//! - Per-item timeout / retry / backoff / confirmation overrides
//! - Bounded worker pool; output order always equals input order
//! - One failing item never affects its siblings
//!
//! ## Usage
//! ```no_run
//! use std::sync::Arc;
//!
//! use apibatch_batch::{write_results, BatchError, BatchRunner, BatchSource, ExecutionDefaults};
//! use apibatch_core::Gateway;
//!
//! async fn run(gateway: Arc<dyn Gateway>) -> Result<(), BatchError> {
//!     let runner = BatchRunner::new(gateway, ExecutionDefaults::default());
//!     let descriptors = BatchSource::parse("@calls.ndjson").read_descriptors().await?;
//!     let report = runner.run(descriptors).await?;
//!     write_results(std::io::stdout(), &report.results, Default::default(), false)?;
//!     report.check()
//! }
//! ```

pub mod aggregate;
pub mod defaults;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod output;
pub mod overrides;
pub mod plan;
pub mod result;
pub mod runner;
pub mod scheduler;
pub mod source;

pub use aggregate::aggregate;
pub use defaults::{ExecutionDefaults, OutputFormat};
pub use descriptor::{CallDescriptor, ItemId};
pub use error::BatchError;
pub use output::write_results;
pub use result::{CallResult, RequestInfo};
pub use runner::{BatchReport, BatchRunner};
pub use source::{parse_batch, BatchSource};
