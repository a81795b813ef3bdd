//! Batch runner: descriptors in, ordered results and an exit code out.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use apibatch_core::error::ExitCode;
use apibatch_core::gateway::Gateway;
use apibatch_core::operation::{OperationMap, OperationSource};

use crate::aggregate::aggregate;
use crate::defaults::ExecutionDefaults;
use crate::descriptor::CallDescriptor;
use crate::error::BatchError;
use crate::executor::{execute_item, lost_result};
use crate::plan::{needs_operations, plan_items};
use crate::result::CallResult;
use crate::scheduler::run_indexed;

/// Results of a finished batch, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub results: Vec<CallResult>,
    pub exit: ExitCode,
}

impl BatchReport {
    /// `Err` carrying the aggregate code if any item failed.
    pub fn check(&self) -> Result<(), BatchError> {
        if self.exit.is_success() {
            Ok(())
        } else {
            Err(BatchError::Failed { code: self.exit })
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.ok).count()
    }
}

/// Executes batches against one gateway.
#[derive(Clone)]
pub struct BatchRunner {
    gateway: Arc<dyn Gateway>,
    operations: Option<Arc<dyn OperationSource>>,
    defaults: Arc<ExecutionDefaults>,
}

impl BatchRunner {
    pub fn new(gateway: Arc<dyn Gateway>, defaults: ExecutionDefaults) -> Self {
        Self {
            gateway,
            operations: None,
            defaults: Arc::new(defaults),
        }
    }

    /// Resolve `op` identifiers through `source`. It is only consulted when
    /// a batch actually names an operation.
    pub fn with_operations(mut self, source: Arc<dyn OperationSource>) -> Self {
        self.operations = Some(source);
        self
    }

    /// Run every descriptor and collect the results.
    ///
    /// Returns `Err` only for batch-wide problems (invalid defaults, an empty
    /// batch, an unknown operation or an unloadable API description). In
    /// that case nothing was executed.
    pub async fn run(&self, descriptors: Vec<CallDescriptor>) -> Result<BatchReport, BatchError> {
        self.defaults.validate()?;
        if descriptors.is_empty() {
            return Err(BatchError::usage("batch contains no requests"));
        }

        let operations = if needs_operations(&descriptors) {
            Some(self.load_operations().await?)
        } else {
            None
        };

        let items = plan_items(descriptors, &self.defaults, operations.as_ref())?;
        let items = Arc::new(items);
        let total = items.len();
        let parallelism = self.defaults.parallelism;
        debug!(items = total, parallelism, "dispatching batch");

        let started = Instant::now();
        let slots = {
            let gateway = Arc::clone(&self.gateway);
            let items = Arc::clone(&items);
            run_indexed(total, parallelism, move |idx| {
                let gateway = Arc::clone(&gateway);
                let items = Arc::clone(&items);
                async move { execute_item(gateway.as_ref(), &items[idx]).await }
            })
            .await
        };

        let results: Vec<CallResult> = slots
            .into_iter()
            .zip(items.iter())
            .map(|(slot, item)| slot.unwrap_or_else(|| lost_result(item, self.gateway.as_ref())))
            .collect();

        let exit = aggregate(&results);
        let report = BatchReport { results, exit };
        info!(
            total,
            succeeded = report.succeeded(),
            failed = total - report.succeeded(),
            exit = %exit,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        Ok(report)
    }

    async fn load_operations(&self) -> Result<OperationMap, BatchError> {
        let source = self.operations.as_ref().ok_or_else(|| {
            BatchError::usage("batch names an operation but no API description is configured")
        })?;
        let map = OperationMap::load(source.as_ref())
            .await
            .map_err(BatchError::Operations)?;
        debug!(operations = map.len(), "loaded operations");
        Ok(map)
    }
}
