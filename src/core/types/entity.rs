//! Table entities and entity resolvers.
//!
//! Every entity is addressed by a partition key and a row key, carries the
//! service-maintained `Timestamp` and an opaque ETag, and holds a bag of typed
//! properties.
//!
//! Typed entities implement [`TableEntity`]. Rust has no runtime reflection,
//! so a typed entity declares its own property → EDM type map through
//! [`TableEntity::edm_type_map`]; the codec uses it to type values that arrive
//! without annotations (no-metadata JSON).
//!
//! [`DynamicEntity`] is the untyped form the codec works with. Operations are
//! built from it and retrieve results default to it.

use crate::core::error::Result;
use crate::core::types::{EdmType, PropertyMap};
use chrono::{DateTime, Utc};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A typed entity stored in a table.
pub trait TableEntity {
    fn partition_key(&self) -> &str;

    fn row_key(&self) -> &str;

    fn set_keys(&mut self, partition_key: String, row_key: String);

    fn etag(&self) -> Option<&str>;

    fn set_etag(&mut self, etag: Option<String>);

    fn timestamp(&self) -> Option<DateTime<Utc>>;

    fn set_timestamp(&mut self, timestamp: Option<DateTime<Utc>>);

    /// Properties to write, in wire order. Keys and timestamp are excluded.
    fn write_properties(&self) -> PropertyMap;

    /// Populate the entity from decoded properties.
    fn read_properties(&mut self, properties: PropertyMap) -> Result<()>;

    /// Declared EDM type per property name.
    fn edm_type_map() -> HashMap<String, EdmType>
    where
        Self: Sized,
    {
        HashMap::new()
    }
}

/// Untyped entity: keys, system fields and an ordered property bag.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DynamicEntity {
    pub partition_key: String,
    pub row_key: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub properties: PropertyMap,
}

impl DynamicEntity {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        DynamicEntity {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            ..Default::default()
        }
    }

    /// Snapshot a typed entity into its untyped form.
    pub fn from_entity<T: TableEntity + ?Sized>(entity: &T) -> Self {
        DynamicEntity {
            partition_key: entity.partition_key().to_string(),
            row_key: entity.row_key().to_string(),
            timestamp: entity.timestamp(),
            etag: entity.etag().map(str::to_string),
            properties: entity.write_properties(),
        }
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<crate::core::types::EntityProperty>,
    ) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&crate::core::types::EntityProperty> {
        self.properties.get(name)
    }
}

impl TableEntity for DynamicEntity {
    fn partition_key(&self) -> &str {
        &self.partition_key
    }

    fn row_key(&self) -> &str {
        &self.row_key
    }

    fn set_keys(&mut self, partition_key: String, row_key: String) {
        self.partition_key = partition_key;
        self.row_key = row_key;
    }

    fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    fn set_etag(&mut self, etag: Option<String>) {
        self.etag = etag;
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    fn set_timestamp(&mut self, timestamp: Option<DateTime<Utc>>) {
        self.timestamp = timestamp;
    }

    fn write_properties(&self) -> PropertyMap {
        self.properties.clone()
    }

    fn read_properties(&mut self, properties: PropertyMap) -> Result<()> {
        self.properties = properties;
        Ok(())
    }
}

/// Type-erased value produced by an [`EntityResolver`].
pub type ResolvedEntity = Box<dyn Any + Send + Sync>;

type ResolveFn = dyn Fn(
        &str,
        &str,
        Option<DateTime<Utc>>,
        PropertyMap,
        Option<String>,
    ) -> Result<ResolvedEntity>
    + Send
    + Sync;

/// Turns decoded entity fields into the caller's result type.
///
/// The resolver is invoked with `(partition_key, row_key, timestamp,
/// properties, etag)`. Resolvers built with [`EntityResolver::typed`] also
/// expose the target type's declared EDM map so untyped payloads can be
/// decoded against it.
#[derive(Clone)]
pub struct EntityResolver {
    type_id: TypeId,
    type_name: &'static str,
    reflect: Option<fn() -> HashMap<String, EdmType>>,
    resolve: Arc<ResolveFn>,
}

impl EntityResolver {
    /// Resolve into a [`DynamicEntity`].
    pub fn dynamic() -> Self {
        Self::custom(|pk, rk, timestamp, properties, etag| {
            Ok(DynamicEntity {
                partition_key: pk.to_string(),
                row_key: rk.to_string(),
                timestamp,
                etag,
                properties,
            })
        })
    }

    /// Resolve into a typed entity, typing untyped values with its declared EDM map.
    pub fn typed<T>() -> Self
    where
        T: TableEntity + Default + Send + Sync + 'static,
    {
        EntityResolver {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            reflect: Some(T::edm_type_map),
            resolve: Arc::new(
                |pk: &str,
                 rk: &str,
                 timestamp: Option<DateTime<Utc>>,
                 properties: PropertyMap,
                 etag: Option<String>| {
                    let mut entity = T::default();
                    entity.set_keys(pk.to_string(), rk.to_string());
                    entity.set_timestamp(timestamp);
                    entity.set_etag(etag);
                    entity.read_properties(properties)?;
                    Ok(Box::new(entity) as ResolvedEntity)
                },
            ),
        }
    }

    /// Resolve with a caller-supplied function.
    pub fn custom<R, F>(f: F) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&str, &str, Option<DateTime<Utc>>, PropertyMap, Option<String>) -> Result<R>
            + Send
            + Sync
            + 'static,
    {
        EntityResolver {
            type_id: TypeId::of::<R>(),
            type_name: std::any::type_name::<R>(),
            reflect: None,
            resolve: Arc::new(
                move |pk: &str,
                      rk: &str,
                      timestamp: Option<DateTime<Utc>>,
                      properties: PropertyMap,
                      etag: Option<String>| {
                    f(pk, rk, timestamp, properties, etag).map(|r| Box::new(r) as ResolvedEntity)
                },
            ),
        }
    }

    /// Type id of the value this resolver produces.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Builder for the declared EDM map of the target type, if any.
    pub fn reflected_types(&self) -> Option<fn() -> HashMap<String, EdmType>> {
        self.reflect
    }

    pub fn resolve(
        &self,
        partition_key: &str,
        row_key: &str,
        timestamp: Option<DateTime<Utc>>,
        properties: PropertyMap,
        etag: Option<String>,
    ) -> Result<ResolvedEntity> {
        (self.resolve)(partition_key, row_key, timestamp, properties, etag)
    }
}

impl Default for EntityResolver {
    fn default() -> Self {
        Self::dynamic()
    }
}

impl fmt::Debug for EntityResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityResolver")
            .field("type_name", &self.type_name)
            .field("has_reflected_types", &self.reflect.is_some())
            .finish()
    }
}
