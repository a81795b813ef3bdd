//! Batch-level exit code from per-item results.

use apibatch_core::error::ExitCode;

use crate::result::CallResult;

/// Combine item outcomes into one exit code.
///
/// Any usage failure wins. Otherwise any failure that is not an
/// authentication failure gives `Failure`. Authentication failures alone
/// give `Auth`. A batch where every item succeeded gives `Success`.
pub fn aggregate(results: &[CallResult]) -> ExitCode {
    let mut usage = false;
    let mut failure = false;
    let mut auth = false;

    for result in results {
        match effective_code(result) {
            ExitCode::Success => {}
            ExitCode::Usage => usage = true,
            ExitCode::Auth => auth = true,
            ExitCode::Failure => failure = true,
        }
    }

    match (usage, failure, auth) {
        (true, _, _) => ExitCode::Usage,
        (false, true, _) => ExitCode::Failure,
        (false, false, true) => ExitCode::Auth,
        (false, false, false) => ExitCode::Success,
    }
}

fn effective_code(result: &CallResult) -> ExitCode {
    match (result.ok, result.code) {
        (false, ExitCode::Success) => ExitCode::Failure,
        (_, code) => code,
    }
}
