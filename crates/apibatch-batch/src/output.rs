//! Result serialization.

use std::io::{self, Write};

use crate::defaults::OutputFormat;
use crate::result::CallResult;

/// Write `results` to `out` in `format`.
///
/// `ndjson` is one compact object per line, always. `json` is a single
/// array, indented unless `compact` is set. The output ends with a newline.
pub fn write_results<W: Write>(
    mut out: W,
    results: &[CallResult],
    format: OutputFormat,
    compact: bool,
) -> io::Result<()> {
    match format {
        OutputFormat::Ndjson => {
            for result in results {
                serde_json::to_writer(&mut out, result)?;
                out.write_all(b"\n")?;
            }
        }
        OutputFormat::Json => {
            if compact {
                serde_json::to_writer(&mut out, results)?;
            } else {
                serde_json::to_writer_pretty(&mut out, results)?;
            }
            out.write_all(b"\n")?;
        }
    }
    out.flush()
}
