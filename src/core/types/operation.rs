//! Single table operations.
//!
//! A [`TableOperation`] is one request unit of a batch: the kind of change,
//! the target entity and the per-kind options (echo-content for inserts,
//! projection and resolver for retrieves).
//!
//! | Kind | Batch method | Body | `If-Match` |
//! |------|--------------|------|------------|
//! | `Insert` | `POST` | yes | no |
//! | `Replace` | `PUT` | yes | yes |
//! | `Merge` | `MERGE` | yes | yes |
//! | `InsertOrReplace` | `PUT` | yes | no |
//! | `InsertOrMerge` | `MERGE` | yes | no |
//! | `Delete` | `DELETE` | no | yes |
//! | `Retrieve` | `GET` | no | no |
//! | `RotateEncryptionKey` | `MERGE` | yes | yes |

use crate::core::error::{Result, TableError};
use crate::core::types::{DynamicEntity, EntityResolver};
use std::fmt;

/// Kind of a table operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Insert,
    Replace,
    Merge,
    InsertOrMerge,
    InsertOrReplace,
    Delete,
    Retrieve,
    RotateEncryptionKey,
}

impl OperationKind {
    /// Method written on the part's request line.
    ///
    /// Merge-family kinds use the literal `MERGE`; tunnelling over `POST` is
    /// a transport concern.
    pub fn batch_method(&self) -> &'static str {
        match self {
            OperationKind::Insert => "POST",
            OperationKind::Replace | OperationKind::InsertOrReplace => "PUT",
            OperationKind::Merge
            | OperationKind::InsertOrMerge
            | OperationKind::RotateEncryptionKey => "MERGE",
            OperationKind::Delete => "DELETE",
            OperationKind::Retrieve => "GET",
        }
    }

    /// Whether an ETag precondition is sent for this kind.
    #[inline]
    pub fn requires_if_match(&self) -> bool {
        matches!(
            self,
            OperationKind::Delete
                | OperationKind::Replace
                | OperationKind::Merge
                | OperationKind::RotateEncryptionKey
        )
    }

    /// Whether the part carries a JSON entity body.
    #[inline]
    pub fn has_body(&self) -> bool {
        !matches!(self, OperationKind::Delete | OperationKind::Retrieve)
    }

    /// Kinds that cannot carry client-side encryption.
    #[inline]
    pub fn is_merge_family(&self) -> bool {
        matches!(self, OperationKind::Merge | OperationKind::InsertOrMerge)
    }

    /// Kinds addressed by `(PartitionKey, RowKey)` in the resource URI.
    #[inline]
    pub fn is_keyed(&self) -> bool {
        !matches!(self, OperationKind::Insert)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Insert => "Insert",
            OperationKind::Replace => "Replace",
            OperationKind::Merge => "Merge",
            OperationKind::InsertOrMerge => "InsertOrMerge",
            OperationKind::InsertOrReplace => "InsertOrReplace",
            OperationKind::Delete => "Delete",
            OperationKind::Retrieve => "Retrieve",
            OperationKind::RotateEncryptionKey => "RotateEncryptionKey",
        };
        f.write_str(name)
    }
}

/// One operation of a table batch.
///
/// Operations are immutable once built, except for the entity's ETag and
/// Timestamp which are refreshed from the response.
#[derive(Clone, Debug)]
pub struct TableOperation {
    kind: OperationKind,
    entity: DynamicEntity,
    echo_content: bool,
    select_columns: Option<Vec<String>>,
    resolver: EntityResolver,
}

impl TableOperation {
    fn build(kind: OperationKind, entity: DynamicEntity) -> Self {
        TableOperation {
            kind,
            entity,
            echo_content: false,
            select_columns: None,
            resolver: EntityResolver::default(),
        }
    }

    fn conditional(kind: OperationKind, entity: DynamicEntity) -> Result<Self> {
        if entity.etag.as_deref().map_or(true, str::is_empty) {
            return Err(TableError::InvalidOperation(format!(
                "{} requires an ETag; use \"*\" to match any version",
                kind
            )));
        }
        Ok(Self::build(kind, entity))
    }

    /// Insert an entity. With `echo_content` the service returns the created entity.
    pub fn insert(entity: DynamicEntity, echo_content: bool) -> Self {
        let mut op = Self::build(OperationKind::Insert, entity);
        op.echo_content = echo_content;
        op
    }

    /// Replace an existing entity, conditional on its ETag.
    pub fn replace(entity: DynamicEntity) -> Result<Self> {
        Self::conditional(OperationKind::Replace, entity)
    }

    /// Merge properties into an existing entity, conditional on its ETag.
    pub fn merge(entity: DynamicEntity) -> Result<Self> {
        Self::conditional(OperationKind::Merge, entity)
    }

    pub fn insert_or_merge(entity: DynamicEntity) -> Result<Self> {
        Ok(Self::build(OperationKind::InsertOrMerge, entity))
    }

    pub fn insert_or_replace(entity: DynamicEntity) -> Result<Self> {
        Ok(Self::build(OperationKind::InsertOrReplace, entity))
    }

    /// Delete an entity, conditional on its ETag.
    pub fn delete(entity: DynamicEntity) -> Result<Self> {
        Self::conditional(OperationKind::Delete, entity)
    }

    /// Retrieve a single entity by key.
    pub fn retrieve(partition_key: impl Into<String>, row_key: impl Into<String>) -> Result<Self> {
        Ok(Self::build(
            OperationKind::Retrieve,
            DynamicEntity::new(partition_key, row_key),
        ))
    }

    /// Replace the encryption metadata of an entity with a re-wrapped key.
    ///
    /// The entity carries only the new metadata properties.
    pub fn rotate_encryption_key(entity: DynamicEntity) -> Result<Self> {
        Self::conditional(OperationKind::RotateEncryptionKey, entity)
    }

    /// Resolver used for retrieve and echo-content results.
    pub fn with_resolver(mut self, resolver: EntityResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Restrict a retrieve to the given columns.
    pub fn with_select_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    #[inline]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    #[inline]
    pub fn echo_content(&self) -> bool {
        self.echo_content
    }

    pub fn entity(&self) -> &DynamicEntity {
        &self.entity
    }

    pub(crate) fn entity_mut(&mut self) -> &mut DynamicEntity {
        &mut self.entity
    }

    pub fn partition_key(&self) -> &str {
        &self.entity.partition_key
    }

    pub fn row_key(&self) -> &str {
        &self.entity.row_key
    }

    pub fn select_columns(&self) -> Option<&[String]> {
        self.select_columns.as_deref()
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    /// Whether the response part for this operation carries an entity body.
    #[inline]
    pub fn expects_entity(&self) -> bool {
        match self.kind {
            OperationKind::Retrieve => true,
            OperationKind::Insert => self.echo_content,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_methods() {
        assert_eq!(OperationKind::Insert.batch_method(), "POST");
        assert_eq!(OperationKind::Replace.batch_method(), "PUT");
        assert_eq!(OperationKind::InsertOrReplace.batch_method(), "PUT");
        assert_eq!(OperationKind::Merge.batch_method(), "MERGE");
        assert_eq!(OperationKind::InsertOrMerge.batch_method(), "MERGE");
        assert_eq!(OperationKind::RotateEncryptionKey.batch_method(), "MERGE");
        assert_eq!(OperationKind::Delete.batch_method(), "DELETE");
        assert_eq!(OperationKind::Retrieve.batch_method(), "GET");
    }

    #[test]
    fn test_if_match_kinds() {
        assert!(OperationKind::Delete.requires_if_match());
        assert!(OperationKind::RotateEncryptionKey.requires_if_match());
        assert!(!OperationKind::InsertOrMerge.requires_if_match());
        assert!(!OperationKind::Insert.requires_if_match());
    }

    #[test]
    fn test_body_kinds() {
        assert!(!OperationKind::Delete.has_body());
        assert!(!OperationKind::Retrieve.has_body());
        assert!(OperationKind::Merge.has_body());
    }

    #[test]
    fn test_delete_requires_etag() {
        let err = TableOperation::delete(DynamicEntity::new("p", "r")).unwrap_err();
        assert!(matches!(err, TableError::InvalidOperation(_)));

        let op = TableOperation::delete(DynamicEntity::new("p", "r").with_etag("*")).unwrap();
        assert_eq!(op.kind(), OperationKind::Delete);
    }

    #[test]
    fn test_empty_keys_are_accepted() {
        let op = TableOperation::retrieve("", "").unwrap();
        assert_eq!(op.partition_key(), "");
        assert_eq!(op.row_key(), "");

        let op = TableOperation::delete(DynamicEntity::new("p", "").with_etag("*")).unwrap();
        assert_eq!(op.row_key(), "");
        assert!(TableOperation::insert_or_replace(DynamicEntity::new("", "r")).is_ok());
    }

    #[test]
    fn test_expects_entity() {
        let entity = DynamicEntity::new("p", "r");
        assert!(TableOperation::insert(entity.clone(), true).expects_entity());
        assert!(!TableOperation::insert(entity.clone(), false).expects_entity());
        assert!(TableOperation::retrieve("p", "r").unwrap().expects_entity());
        assert!(!TableOperation::insert_or_merge(entity).unwrap().expects_entity());
    }

    #[test]
    fn test_select_columns() {
        let op = TableOperation::retrieve("p", "r")
            .unwrap()
            .with_select_columns(["Name", "Age"]);
        assert_eq!(op.select_columns().unwrap(), &["Name", "Age"]);
    }
}
