//! Batch source reader: raw bytes → ordered call descriptors.
//!
//! Input is either one JSON array of descriptors, or newline-delimited JSON
//! with one descriptor per non-blank line. Any syntax error rejects the whole
//! input; nothing is executed from a partially valid batch.

use std::path::PathBuf;

use tokio::io::AsyncReadExt;

use crate::descriptor::CallDescriptor;
use crate::error::BatchError;

/// Where batch bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSource {
    /// All of standard input.
    Stdin,
    /// A file on disk.
    File(PathBuf),
    /// Bytes already in memory.
    Inline(Vec<u8>),
}

impl BatchSource {
    /// `-` is stdin; `@path` or a bare path is a file.
    pub fn parse(arg: &str) -> Self {
        match arg {
            "-" => Self::Stdin,
            other => Self::File(PathBuf::from(other.strip_prefix('@').unwrap_or(other))),
        }
    }

    fn name(&self) -> String {
        match self {
            Self::Stdin => "stdin".to_string(),
            Self::File(path) => path.display().to_string(),
            Self::Inline(_) => "inline batch".to_string(),
        }
    }

    /// Read the full content of the source.
    pub async fn read(&self) -> Result<Vec<u8>, BatchError> {
        let read_err = |error| BatchError::Read {
            source_name: self.name(),
            error,
        };
        match self {
            Self::Stdin => {
                let mut buf = Vec::new();
                tokio::io::stdin()
                    .read_to_end(&mut buf)
                    .await
                    .map_err(read_err)?;
                Ok(buf)
            }
            Self::File(path) => tokio::fs::read(path).await.map_err(read_err),
            Self::Inline(bytes) => Ok(bytes.clone()),
        }
    }

    /// Read and parse the source.
    pub async fn read_descriptors(&self) -> Result<Vec<CallDescriptor>, BatchError> {
        let bytes = self.read().await?;
        let descriptors = parse_batch(&bytes)?;
        tracing::debug!(source = %self.name(), items = descriptors.len(), "read batch");
        Ok(descriptors)
    }
}

/// Parse batch bytes into descriptors, preserving input order.
pub fn parse_batch(bytes: &[u8]) -> Result<Vec<CallDescriptor>, BatchError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| BatchError::usage(format!("batch input is not valid UTF-8: {e}")))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(BatchError::usage("batch input is empty"));
    }

    let descriptors = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<CallDescriptor>>(trimmed)
            .map_err(|e| BatchError::usage(format!("invalid batch JSON array: {e}")))?
    } else {
        let mut descriptors = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let descriptor = serde_json::from_str::<CallDescriptor>(line).map_err(|e| {
                BatchError::usage(format!("invalid batch line {}: {e}", line_no + 1))
            })?;
            descriptors.push(descriptor);
        }
        descriptors
    };

    if descriptors.is_empty() {
        return Err(BatchError::usage("batch input contains no requests"));
    }
    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn usage_message(err: BatchError) -> String {
        match err {
            BatchError::Usage(msg) => msg,
            other => panic!("expected usage error, got {other:?}"),
        }
    }

    #[test]
    fn source_specs() {
        assert_eq!(BatchSource::parse("-"), BatchSource::Stdin);
        assert_eq!(
            BatchSource::parse("@calls.json"),
            BatchSource::File("calls.json".into())
        );
        assert_eq!(
            BatchSource::parse("calls.json"),
            BatchSource::File("calls.json".into())
        );
    }

    #[test]
    fn json_array() {
        let batch = parse_batch(br#"  [{"id":1,"path":"/a"},{"id":2,"path":"/b"}]  "#).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].path.as_deref(), Some("/b"));
    }

    #[test]
    fn ndjson_skips_blank_lines() {
        let input = b"\n{\"path\":\"/a\"}\n\n   \n{\"path\":\"/b\"}\r\n";
        let batch = parse_batch(input).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].path.as_deref(), Some("/a"));
    }

    #[test]
    fn null_fields_do_not_reject_batch() {
        let input = br#"[{"path":"/a","query":null},{"path":"/b","headers":null,"dryRun":null}]"#;
        let batch = parse_batch(input).unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch[0].query.is_empty());
        assert!(batch[1].headers.is_empty());
        assert!(!batch[1].dry_run);
    }

    #[test]
    fn ndjson_error_names_line() {
        let input = b"{\"path\":\"/a\"}\n\n{\"path\": oops}\n";
        let msg = usage_message(parse_batch(input).unwrap_err());
        assert!(msg.starts_with("invalid batch line 3:"), "{msg}");
    }

    #[test]
    fn malformed_array_rejected() {
        let msg = usage_message(parse_batch(b"[{\"path\":\"/a\"},").unwrap_err());
        assert!(msg.starts_with("invalid batch JSON array"), "{msg}");
    }

    #[test]
    fn empty_input_rejected() {
        assert!(matches!(parse_batch(b""), Err(BatchError::Usage(_))));
        assert!(matches!(parse_batch(b"  \n\t "), Err(BatchError::Usage(_))));
        assert!(matches!(parse_batch(b"[]"), Err(BatchError::Usage(_))));
    }

    #[tokio::test]
    async fn reads_file_and_inline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"id\":\"x\",\"path\":\"/x\"}}").unwrap();

        let arg = format!("@{}", file.path().display());
        let batch = BatchSource::parse(&arg).read_descriptors().await.unwrap();
        assert_eq!(batch[0].display_id(0), "x");

        let inline = BatchSource::Inline(br#"[{"path":"/y"}]"#.to_vec());
        let batch = inline.read_descriptors().await.unwrap();
        assert_eq!(batch[0].display_id(0), "1");
    }

    #[tokio::test]
    async fn missing_file_is_usage_error() {
        let err = BatchSource::parse("@/definitely/not/here.ndjson")
            .read()
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Read { .. }));
        assert_eq!(err.exit_code(), apibatch_core::ExitCode::Usage);
    }
}
