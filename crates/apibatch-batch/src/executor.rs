//! Single-item executor: one work item in, one [`CallResult`] out.
//!
//! Nothing escapes this boundary. Validation failures, gateway errors and
//! dry runs all end up as a result carrying its own classification.

use std::collections::BTreeMap;
use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use apibatch_core::error::{ExitCode, GatewayError};
use apibatch_core::gateway::Gateway;

use crate::overrides::item_error;
use crate::plan::{PlannedCall, WorkItem};
use crate::result::{CallResult, RequestInfo};

/// Execute `item` against `gateway`.
pub async fn execute_item(gateway: &dyn Gateway, item: &WorkItem) -> CallResult {
    let started = Instant::now();
    let mut result = match &item.plan {
        Err(msg) => {
            debug!(index = item.index, id = %item.id, error = %msg, "item rejected");
            CallResult::failure(
                item.index,
                &item.id,
                ExitCode::Usage,
                msg,
                echo_request(gateway, item),
            )
        }
        Ok(call) if call.dry_run => dry_run(gateway, item, call),
        Ok(call) => send(gateway, item, call).await,
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    result.timing_ms = elapsed_ms;
    result.stats.insert("durationMs".into(), Value::from(elapsed_ms));
    result
}

/// Result for an item whose worker never reported back.
pub fn lost_result(item: &WorkItem, gateway: &dyn Gateway) -> CallResult {
    CallResult::failure(
        item.index,
        &item.id,
        ExitCode::Failure,
        "batch worker stopped before the request completed",
        echo_request(gateway, item),
    )
}

fn dry_run(gateway: &dyn Gateway, item: &WorkItem, call: &PlannedCall) -> CallResult {
    let url = match gateway.resolve_url(&call.request.path, &call.request.query) {
        Ok(url) => url,
        Err(e) => return gateway_failure(gateway, item, e),
    };
    debug!(index = item.index, id = %item.id, %url, "dry run");
    let mut result = CallResult {
        index: item.index,
        id: item.id.clone(),
        ok: true,
        code: ExitCode::Success,
        status: None,
        error: None,
        timing_ms: 0,
        request: RequestInfo {
            method: call.request.method.clone(),
            url,
        },
        response: Default::default(),
        stats: BTreeMap::new(),
    };
    result.stats.insert("dryRun".into(), Value::Bool(true));
    result
}

async fn send(gateway: &dyn Gateway, item: &WorkItem, call: &PlannedCall) -> CallResult {
    debug!(
        index = item.index,
        id = %item.id,
        method = %call.request.method,
        path = %call.request.path,
        "sending request"
    );
    match gateway.execute(call.request.clone()).await {
        Ok(reply) => {
            let mut stats = BTreeMap::new();
            stats.insert("attempts".into(), Value::from(reply.attempts));
            stats.insert("bytes".into(), Value::from(reply.response.bytes));
            CallResult {
                index: item.index,
                id: item.id.clone(),
                ok: true,
                code: ExitCode::Success,
                status: Some(reply.status()),
                error: None,
                timing_ms: 0,
                request: RequestInfo {
                    method: call.request.method.clone(),
                    url: reply.url,
                },
                response: reply.response,
                stats,
            }
        }
        Err(e) => gateway_failure(gateway, item, e),
    }
}

fn gateway_failure(gateway: &dyn Gateway, item: &WorkItem, e: GatewayError) -> CallResult {
    let code = e.exit_code();
    let message = match &e {
        GatewayError::Usage(msg) => item_error(msg),
        other => other.to_string(),
    };
    debug!(index = item.index, id = %item.id, %code, error = %message, "request failed");

    let mut result = CallResult::failure(
        item.index,
        &item.id,
        code,
        message,
        echo_request(gateway, item),
    );
    result.status = e.status();
    if let Some(attempts) = e.attempts() {
        result.stats.insert("attempts".into(), Value::from(attempts));
    }
    if let Some(reply) = e.response() {
        result.request.url = reply.url.clone();
        result.response = reply.response.clone();
        result.stats.insert("bytes".into(), Value::from(reply.response.bytes));
    }
    result
}

/// Best-effort request echo for results without a reply.
fn echo_request(gateway: &dyn Gateway, item: &WorkItem) -> RequestInfo {
    let query = item
        .plan
        .as_ref()
        .map(|call| call.request.query.as_slice())
        .unwrap_or_default();
    let url = if item.path.is_empty() {
        String::new()
    } else {
        gateway
            .resolve_url(&item.path, query)
            .unwrap_or_else(|_| item.path.clone())
    };
    RequestInfo {
        method: item.method.clone(),
        url,
    }
}
