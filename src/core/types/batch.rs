//! Ordered batches of table operations.

use crate::core::error::{Result, TableError};
use crate::core::types::{OperationKind, TableOperation};

/// Maximum number of operations the service accepts in one batch.
pub const MAX_BATCH_OPERATIONS: usize = 100;

/// An ordered group of operations sent as one changeset.
///
/// Invariants enforced by [`TableBatch::push`]:
/// - at most [`MAX_BATCH_OPERATIONS`] operations;
/// - every operation targets the same partition key;
/// - a retrieve is only allowed as the sole operation (sent as a query, without
///   a changeset).
#[derive(Clone, Debug, Default)]
pub struct TableBatch {
    operations: Vec<TableOperation>,
}

impl TableBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation, checking the batch invariants.
    pub fn push(&mut self, operation: TableOperation) -> Result<()> {
        if self.operations.len() >= MAX_BATCH_OPERATIONS {
            return Err(TableError::InvalidOperation(format!(
                "A batch cannot contain more than {} operations",
                MAX_BATCH_OPERATIONS
            )));
        }

        if let Some(first) = self.operations.first() {
            if first.kind() == OperationKind::Retrieve
                || operation.kind() == OperationKind::Retrieve
            {
                return Err(TableError::InvalidOperation(
                    "A batch containing a retrieve cannot contain any other operation".to_string(),
                ));
            }
            if first.partition_key() != operation.partition_key() {
                return Err(TableError::InvalidOperation(format!(
                    "All operations in a batch must share one partition key; expected '{}', got '{}'",
                    first.partition_key(),
                    operation.partition_key()
                )));
            }
        }

        self.operations.push(operation);
        Ok(())
    }

    /// Builder form of [`TableBatch::push`].
    pub fn with(mut self, operation: TableOperation) -> Result<Self> {
        self.push(operation)?;
        Ok(self)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// A single-retrieve batch is sent without a changeset wrapper.
    #[inline]
    pub fn is_query(&self) -> bool {
        self.operations.len() == 1 && self.operations[0].kind() == OperationKind::Retrieve
    }

    pub fn get(&self, index: usize) -> Option<&TableOperation> {
        self.operations.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut TableOperation> {
        self.operations.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TableOperation> {
        self.operations.iter()
    }

    pub fn operations(&self) -> &[TableOperation] {
        &self.operations
    }
}

impl<'a> IntoIterator for &'a TableBatch {
    type Item = &'a TableOperation;
    type IntoIter = std::slice::Iter<'a, TableOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DynamicEntity;

    fn insert(pk: &str, rk: &str) -> TableOperation {
        TableOperation::insert(DynamicEntity::new(pk, rk), false)
    }

    #[test]
    fn test_push_preserves_order() {
        let mut batch = TableBatch::new();
        batch.push(insert("p", "1")).unwrap();
        batch.push(insert("p", "2")).unwrap();
        let rows: Vec<_> = batch.iter().map(|op| op.row_key().to_string()).collect();
        assert_eq!(rows, vec!["1", "2"]);
        assert!(!batch.is_query());
    }

    #[test]
    fn test_single_retrieve_is_query() {
        let batch = TableBatch::new()
            .with(TableOperation::retrieve("p", "1").unwrap())
            .unwrap();
        assert!(batch.is_query());
    }

    #[test]
    fn test_retrieve_must_be_alone() {
        let mut batch = TableBatch::new();
        batch.push(insert("p", "1")).unwrap();
        let err = batch
            .push(TableOperation::retrieve("p", "2").unwrap())
            .unwrap_err();
        assert!(matches!(err, TableError::InvalidOperation(_)));

        let mut batch = TableBatch::new();
        batch.push(TableOperation::retrieve("p", "2").unwrap()).unwrap();
        assert!(batch.push(insert("p", "1")).is_err());
    }

    #[test]
    fn test_partition_key_must_match() {
        let mut batch = TableBatch::new();
        batch.push(insert("p", "1")).unwrap();
        assert!(batch.push(insert("q", "2")).is_err());
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_max_operations() {
        let mut batch = TableBatch::new();
        for i in 0..MAX_BATCH_OPERATIONS {
            batch.push(insert("p", &i.to_string())).unwrap();
        }
        assert!(batch.push(insert("p", "overflow")).is_err());
    }
}
