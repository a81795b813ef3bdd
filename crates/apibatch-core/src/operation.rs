//! Operation identifier lookup.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::GatewayError;

/// One named API operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub id: String,
    pub method: String,
    pub path: String,
}

impl Operation {
    pub fn new(id: impl Into<String>, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
        }
    }
}

/// Anything that can list the operations an API exposes.
#[async_trait]
pub trait OperationSource: Send + Sync {
    async fn load(&self) -> Result<Vec<Operation>, GatewayError>;
}

/// Operation identifier → (method, path) index.
///
/// Every operation is reachable by its original identifier and by the
/// lower-cased identifier. When two operations collide on a key the first
/// one listed keeps it.
#[derive(Debug, Clone, Default)]
pub struct OperationMap {
    entries: HashMap<String, Operation>,
}

impl OperationMap {
    pub fn from_operations(ops: impl IntoIterator<Item = Operation>) -> Self {
        let mut entries = HashMap::new();
        for op in ops {
            let lower = op.id.to_lowercase();
            entries.entry(op.id.clone()).or_insert_with(|| op.clone());
            entries.entry(lower).or_insert(op);
        }
        Self { entries }
    }

    /// Fetch all operations from `source` and index them.
    pub async fn load(source: &dyn OperationSource) -> Result<Self, GatewayError> {
        let ops = source.load().await?;
        tracing::debug!(operations = ops.len(), "loaded operation map");
        Ok(Self::from_operations(ops))
    }

    /// Look `id` up exactly, then case-insensitively.
    pub fn get(&self, id: &str) -> Option<&Operation> {
        self.entries
            .get(id)
            .or_else(|| self.entries.get(&id.to_lowercase()))
    }

    /// Number of keys in the index (original and lower-cased).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
