//! `apibatch operations`: list the operation identifiers a batch can use.

use anyhow::Result;

use apibatch_core::operation::OperationSource;
use apibatch_http::OpenApiSource;

pub async fn run(spec: &str, token: Option<String>, json: bool) -> Result<()> {
    let source = OpenApiSource::from_location(spec)?.with_token(token);
    let mut ops = source.load().await?;
    ops.sort_by(|a, b| a.id.cmp(&b.id));

    if json {
        let list: Vec<_> = ops
            .iter()
            .map(|op| {
                serde_json::json!({
                    "op": op.id,
                    "method": op.method,
                    "path": op.path,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    let width = ops.iter().map(|op| op.id.len()).max().unwrap_or(0);
    for op in &ops {
        println!("{:<width$}  {:<7} {}", op.id, op.method, op.path);
    }
    Ok(())
}
