//! Per-item override resolution.
//!
//! Each override in a descriptor replaces the batch default when present.
//! An invalid override fails only its own item.

use std::time::Duration;

use apibatch_core::duration::parse_duration;

use crate::defaults::ExecutionDefaults;
use crate::descriptor::CallDescriptor;

/// Prefix of every item-level validation message.
pub const ITEM_ERROR_PREFIX: &str = "batch item: ";

pub(crate) fn item_error(msg: impl std::fmt::Display) -> String {
    format!("{ITEM_ERROR_PREFIX}{msg}")
}

/// Settings one item executes with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub timeout: Duration,
    pub retry: u32,
    pub retry_backoff: Duration,
    pub confirmed: bool,
    pub dry_run: bool,
}

/// Merge `descriptor`'s overrides into `defaults`.
///
/// Returns the item-level error message on an invalid override.
pub fn resolve_overrides(
    descriptor: &CallDescriptor,
    defaults: &ExecutionDefaults,
) -> Result<EffectiveSettings, String> {
    let timeout = match descriptor.timeout.as_deref() {
        Some(raw) => positive_duration("timeout", raw)?,
        None => defaults.timeout,
    };

    let retry = match descriptor.retry {
        Some(n) if n < 0 => return Err(item_error(format!("retry must be 0 or greater, got {n}"))),
        Some(n) => u32::try_from(n).map_err(|_| item_error(format!("retry {n} is too large")))?,
        None => u32::try_from(defaults.retry).unwrap_or(0),
    };

    let retry_backoff = match descriptor.retry_backoff.as_deref() {
        Some(raw) => positive_duration("retryBackoff", raw)?,
        None => defaults.retry_backoff,
    };
    if retry > 0 && retry_backoff.is_zero() {
        return Err(item_error("retryBackoff must be greater than 0 when retry is set"));
    }

    Ok(EffectiveSettings {
        timeout,
        retry,
        retry_backoff,
        confirmed: descriptor.yes.unwrap_or(defaults.yes),
        dry_run: descriptor.dry_run || defaults.dry_run,
    })
}

fn positive_duration(field: &str, raw: &str) -> Result<Duration, String> {
    let value = parse_duration(raw).map_err(|e| item_error(format!("invalid {field}: {e}")))?;
    if value.is_zero() {
        return Err(item_error(format!("{field} must be greater than 0, got {raw:?}")));
    }
    Ok(value)
}
