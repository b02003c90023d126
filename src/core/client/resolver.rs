//! EDM type resolution for untyped payload values.
//!
//! A no-metadata payload carries bare JSON values. Each one is typed by a
//! [`PropertyResolver`] chosen once per entity:
//!
//! | Variant | Source | Chosen when |
//! |---------|--------|-------------|
//! | `User` | caller function `(pk, rk, name, value) -> Option<EdmType>` | a property resolver is set on the request |
//! | `Reflected` | the target type's declared EDM map, via [`EdmTypeCache`] | the entity resolver is typed and declares properties |
//! | `RawString` | nothing | otherwise |
//!
//! A variant that has no answer for a property leaves it to JSON inference,
//! so string values stay strings.

use crate::core::types::{EdmType, EntityResolver};
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied per-property type function.
pub type PropertyResolverFn =
    Arc<dyn Fn(&str, &str, &str, &str) -> Option<EdmType> + Send + Sync>;

/// Per-entity type resolution strategy.
#[derive(Clone)]
pub enum PropertyResolver {
    User(PropertyResolverFn),
    Reflected(Arc<HashMap<String, EdmType>>),
    RawString,
}

impl PropertyResolver {
    /// Pick the strategy for entities produced by `entity_resolver`.
    ///
    /// Reflected maps are served from `cache` when one is given and rebuilt
    /// otherwise.
    pub fn select(
        user: Option<&PropertyResolverFn>,
        entity_resolver: &EntityResolver,
        cache: Option<&EdmTypeCache>,
    ) -> Self {
        if let Some(f) = user {
            return PropertyResolver::User(f.clone());
        }

        if let Some(reflect) = entity_resolver.reflected_types() {
            let map = match cache {
                Some(cache) => cache.get_or_insert_with(entity_resolver.type_id(), reflect),
                None => Arc::new(reflect()),
            };
            if !map.is_empty() {
                return PropertyResolver::Reflected(map);
            }
        }

        PropertyResolver::RawString
    }

    /// Declared type of `property`, if this strategy knows it.
    pub fn resolve(
        &self,
        partition_key: &str,
        row_key: &str,
        property: &str,
        value: &str,
    ) -> Option<EdmType> {
        match self {
            PropertyResolver::User(f) => f(partition_key, row_key, property, value),
            PropertyResolver::Reflected(map) => map.get(property).copied(),
            PropertyResolver::RawString => None,
        }
    }
}

impl fmt::Debug for PropertyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyResolver::User(_) => f.write_str("User(..)"),
            PropertyResolver::Reflected(map) => f.debug_tuple("Reflected").field(map).finish(),
            PropertyResolver::RawString => f.write_str("RawString"),
        }
    }
}

/// Shared cache of declared EDM maps, keyed by entity type.
///
/// Cloning shares the underlying map. Concurrent first builds of the same
/// type may both run; the first stored map wins.
#[derive(Clone, Debug, Default)]
pub struct EdmTypeCache {
    entries: Arc<DashMap<TypeId, Arc<HashMap<String, EdmType>>>>,
}

impl EdmTypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert_with<F>(&self, type_id: TypeId, build: F) -> Arc<HashMap<String, EdmType>>
    where
        F: FnOnce() -> HashMap<String, EdmType>,
    {
        if let Some(entry) = self.entries.get(&type_id) {
            tracing::trace!("EDM type cache hit for {:?}", type_id);
            return entry.value().clone();
        }

        tracing::trace!("EDM type cache miss for {:?}", type_id);
        let built = Arc::new(build());
        self.entries.entry(type_id).or_insert(built).value().clone()
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.entries.contains_key(&type_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
