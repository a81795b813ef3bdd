//! Turns parsed descriptors into immutable work items.
//!
//! Operation identifiers are resolved here, before dispatch: an unknown
//! operation rejects the whole batch. Everything else that can go wrong with
//! a single descriptor (bad overrides, malformed query or header entries, a
//! missing path) is kept on that item as a usage failure.
//!
//! When a descriptor names both an operation and an explicit `method` or
//! `path`, the explicit value wins field by field; the operation still has
//! to exist.

use apibatch_core::operation::OperationMap;
use apibatch_core::request::GatewayRequest;

use crate::defaults::ExecutionDefaults;
use crate::descriptor::{non_blank, CallDescriptor};
use crate::error::BatchError;
use crate::overrides::{item_error, resolve_overrides};

/// A request that passed item-level validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCall {
    pub request: GatewayRequest,
    pub dry_run: bool,
}

/// One unit of work, addressed by its position in the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub index: usize,
    pub id: String,
    /// Resolved method, empty when it could not be determined.
    pub method: String,
    /// Resolved path, empty when it could not be determined.
    pub path: String,
    pub plan: Result<PlannedCall, String>,
}

/// Returns `true` if any descriptor names an operation.
pub fn needs_operations(descriptors: &[CallDescriptor]) -> bool {
    descriptors.iter().any(|d| d.operation().is_some())
}

/// Build the work items for a batch.
pub fn plan_items(
    descriptors: Vec<CallDescriptor>,
    defaults: &ExecutionDefaults,
    operations: Option<&OperationMap>,
) -> Result<Vec<WorkItem>, BatchError> {
    descriptors
        .into_iter()
        .enumerate()
        .map(|(index, descriptor)| plan_item(index, descriptor, defaults, operations))
        .collect()
}

fn plan_item(
    index: usize,
    descriptor: CallDescriptor,
    defaults: &ExecutionDefaults,
    operations: Option<&OperationMap>,
) -> Result<WorkItem, BatchError> {
    let id = descriptor.display_id(index);

    let operation = match descriptor.operation() {
        Some(op_id) => {
            let map = operations.ok_or_else(|| {
                BatchError::usage(format!(
                    "batch item {id}: operation {op_id:?} given but no API description is configured"
                ))
            })?;
            let op = map.get(op_id).ok_or_else(|| {
                BatchError::usage(format!("batch item {id}: unknown operation {op_id:?}"))
            })?;
            Some(op)
        }
        None => None,
    };

    let path = non_blank(descriptor.path.as_deref())
        .map(str::to_string)
        .or_else(|| operation.map(|op| op.path.clone()));
    let method = non_blank(descriptor.method.as_deref())
        .map(str::to_ascii_uppercase)
        .or_else(|| operation.map(|op| op.method.clone()))
        .or_else(|| path.as_ref().map(|_| "GET".to_string()))
        .unwrap_or_default();

    let plan = match &path {
        Some(path) => build_call(&descriptor, &method, path, defaults),
        None => Err(item_error("either \"path\" or \"op\" is required")),
    };

    Ok(WorkItem {
        index,
        id,
        method,
        path: path.unwrap_or_default(),
        plan,
    })
}

fn build_call(
    descriptor: &CallDescriptor,
    method: &str,
    path: &str,
    defaults: &ExecutionDefaults,
) -> Result<PlannedCall, String> {
    let settings = resolve_overrides(descriptor, defaults)?;

    let query = descriptor
        .query
        .iter()
        .map(|entry| split_pair(entry, '=', "query"))
        .collect::<Result<Vec<_>, _>>()?;
    let headers = descriptor
        .headers
        .iter()
        .map(|entry| split_pair(entry, ':', "header"))
        .collect::<Result<Vec<_>, _>>()?;

    let mut request = GatewayRequest::new(method, path);
    request.query = query;
    request.headers = headers;
    request.body = descriptor.body.clone();
    request.content_type = non_blank(descriptor.content_type.as_deref()).map(str::to_string);
    request.timeout = settings.timeout;
    request.retry = settings.retry;
    request.retry_backoff = settings.retry_backoff;
    request.confirmed = settings.confirmed;

    Ok(PlannedCall {
        request,
        dry_run: settings.dry_run,
    })
}

/// Split `key<sep>value`; the key must not be empty.
fn split_pair(entry: &str, sep: char, kind: &str) -> Result<(String, String), String> {
    let (key, value) = entry
        .split_once(sep)
        .ok_or_else(|| item_error(format!("invalid {kind} {entry:?}, want key{sep}value")))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(item_error(format!("invalid {kind} {entry:?}, empty key")));
    }
    let value = if sep == ':' { value.trim() } else { value };
    Ok((key.to_string(), value.to_string()))
}
