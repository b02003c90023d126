//! Per-operation results.

use crate::core::types::ResolvedEntity;
use std::any::Any;
use std::fmt;

/// Outcome of one operation, index-aligned with its batch.
#[derive(Default)]
pub struct TableResult {
    pub status: u16,
    pub etag: Option<String>,
    /// Resolved entity for retrieves and echo-content inserts.
    pub result: Option<ResolvedEntity>,
}

impl TableResult {
    pub fn new(status: u16) -> Self {
        TableResult {
            status,
            etag: None,
            result: None,
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Borrow the resolved entity as `T`.
    pub fn entity<T: Any>(&self) -> Option<&T> {
        self.result.as_ref().and_then(|r| r.downcast_ref::<T>())
    }

    /// Take the resolved entity as `T`, leaving `None` behind on success.
    pub fn take_entity<T: Any>(&mut self) -> Option<T> {
        match self.result.take()?.downcast::<T>() {
            Ok(entity) => Some(*entity),
            Err(other) => {
                self.result = Some(other);
                None
            }
        }
    }

    #[inline]
    pub fn has_entity(&self) -> bool {
        self.result.is_some()
    }
}

impl fmt::Debug for TableResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableResult")
            .field("status", &self.status)
            .field("etag", &self.etag)
            .field("has_entity", &self.result.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DynamicEntity;

    #[test]
    fn test_entity_downcast() {
        let mut result = TableResult::new(200);
        result.result = Some(Box::new(DynamicEntity::new("p", "r")));
        assert_eq!(result.entity::<DynamicEntity>().unwrap().row_key, "r");
        assert!(result.entity::<String>().is_none());
    }

    #[test]
    fn test_take_entity_wrong_type_keeps_value() {
        let mut result = TableResult::new(200);
        result.result = Some(Box::new(DynamicEntity::new("p", "r")));
        assert!(result.take_entity::<String>().is_none());
        assert!(result.has_entity());
        assert!(result.take_entity::<DynamicEntity>().is_some());
        assert!(!result.has_entity());
    }

    #[test]
    fn test_debug_hides_payload() {
        let result = TableResult::new(204).with_etag("W/\"x\"");
        let debug = format!("{:?}", result);
        assert!(debug.contains("204"));
        assert!(debug.contains("has_entity"));
    }
}
