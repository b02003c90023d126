//! Typed entity property values.

use crate::core::types::EdmType;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

/// Ordered property bag of an entity.
///
/// Iteration order is insertion order, which is also the order properties
/// are written to the wire.
pub type PropertyMap = IndexMap<String, EntityProperty>;

/// A single typed property value.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityProperty {
    String(String),
    Binary(Vec<u8>),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Double(f64),
    Guid(Uuid),
    Int32(i32),
    Int64(i64),
    /// A null value that still carries its declared type. Never written.
    Null(EdmType),
}

impl EntityProperty {
    /// EDM type of this value.
    pub fn edm_type(&self) -> EdmType {
        match self {
            EntityProperty::String(_) => EdmType::String,
            EntityProperty::Binary(_) => EdmType::Binary,
            EntityProperty::Boolean(_) => EdmType::Boolean,
            EntityProperty::DateTime(_) => EdmType::DateTime,
            EntityProperty::Double(_) => EdmType::Double,
            EntityProperty::Guid(_) => EdmType::Guid,
            EntityProperty::Int32(_) => EdmType::Int32,
            EntityProperty::Int64(_) => EdmType::Int64,
            EntityProperty::Null(edm_type) => *edm_type,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, EntityProperty::Null(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            EntityProperty::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            EntityProperty::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            EntityProperty::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            EntityProperty::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            EntityProperty::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_guid(&self) -> Option<Uuid> {
        match self {
            EntityProperty::Guid(g) => Some(*g),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            EntityProperty::Int32(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer value, widening `Int32` to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            EntityProperty::Int64(i) => Some(*i),
            EntityProperty::Int32(i) => Some(i64::from(*i)),
            _ => None,
        }
    }
}

impl From<&str> for EntityProperty {
    fn from(value: &str) -> Self {
        EntityProperty::String(value.to_string())
    }
}

impl From<String> for EntityProperty {
    fn from(value: String) -> Self {
        EntityProperty::String(value)
    }
}

impl From<Vec<u8>> for EntityProperty {
    fn from(value: Vec<u8>) -> Self {
        EntityProperty::Binary(value)
    }
}

impl From<bool> for EntityProperty {
    fn from(value: bool) -> Self {
        EntityProperty::Boolean(value)
    }
}

impl From<DateTime<Utc>> for EntityProperty {
    fn from(value: DateTime<Utc>) -> Self {
        EntityProperty::DateTime(value)
    }
}

impl From<f64> for EntityProperty {
    fn from(value: f64) -> Self {
        EntityProperty::Double(value)
    }
}

impl From<Uuid> for EntityProperty {
    fn from(value: Uuid) -> Self {
        EntityProperty::Guid(value)
    }
}

impl From<i32> for EntityProperty {
    fn from(value: i32) -> Self {
        EntityProperty::Int32(value)
    }
}

impl From<i64> for EntityProperty {
    fn from(value: i64) -> Self {
        EntityProperty::Int64(value)
    }
}

impl<T> From<Option<T>> for EntityProperty
where
    T: Into<EntityProperty> + DefaultEdmType,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => EntityProperty::Null(T::EDM_TYPE),
        }
    }
}

/// Static EDM type of a Rust value type, used for typed nulls.
pub trait DefaultEdmType {
    const EDM_TYPE: EdmType;
}

macro_rules! default_edm_type {
    ($($ty:ty => $edm:ident),* $(,)?) => {
        $(impl DefaultEdmType for $ty {
            const EDM_TYPE: EdmType = EdmType::$edm;
        })*
    };
}

default_edm_type! {
    String => String,
    Vec<u8> => Binary,
    bool => Boolean,
    DateTime<Utc> => DateTime,
    f64 => Double,
    Uuid => Guid,
    i32 => Int32,
    i64 => Int64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edm_type_of_values() {
        assert_eq!(EntityProperty::from("x").edm_type(), EdmType::String);
        assert_eq!(EntityProperty::from(5i64).edm_type(), EdmType::Int64);
        assert_eq!(EntityProperty::from(5i32).edm_type(), EdmType::Int32);
        assert_eq!(EntityProperty::from(vec![1u8]).edm_type(), EdmType::Binary);
    }

    #[test]
    fn test_typed_null_from_option() {
        let value: EntityProperty = Option::<i64>::None.into();
        assert!(value.is_null());
        assert_eq!(value.edm_type(), EdmType::Int64);

        let value: EntityProperty = Some(7i64).into();
        assert_eq!(value.as_i64(), Some(7));
    }

    #[test]
    fn test_as_i64_widens_int32() {
        assert_eq!(EntityProperty::Int32(-4).as_i64(), Some(-4));
        assert_eq!(EntityProperty::from("4").as_i64(), None);
    }

    #[test]
    fn test_property_map_keeps_insertion_order() {
        let mut map = PropertyMap::new();
        map.insert("z".into(), 1.into());
        map.insert("a".into(), 2.into());
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }
}
