//! Entity rehydration.
//!
//! Turns the JSON object of a retrieved (or echoed) entity into the caller's
//! result type:
//!
//! 1. system fields are taken by exact name (`PartitionKey`, `RowKey`,
//!    `Timestamp`); `odata.*` members are skipped, `odata.etag` backs up a
//!    missing `ETag` header;
//! 2. with an encryption policy, the two metadata properties are consumed and
//!    the listed properties decrypted;
//! 3. every other value is typed by its `@odata.type` annotation, then by the
//!    [`PropertyResolver`], then by JSON inference, and decoded;
//! 4. the operation's [`EntityResolver`] builds the result.
//!
//! No-metadata payloads skip step 3's annotations entirely.

use crate::core::client::resolver::{EdmTypeCache, PropertyResolver, PropertyResolverFn};
use crate::core::encryption::{
    decrypt_value, extract_encryption_details, is_metadata_property, EncryptedPropertyDetails,
    EncryptionPolicy,
};
use crate::core::error::{Result, TableError};
use crate::core::protocol::constants::properties;
use crate::core::protocol::headers::is_no_metadata;
use crate::core::protocol::property_codec::{decode, decode_str, infer};
use crate::core::types::{EdmType, EntityProperty, EntityResolver, PropertyMap, ResolvedEntity};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Per-call inputs of response reading.
#[derive(Clone, Copy, Default)]
pub struct ReadContext<'a> {
    pub property_resolver: Option<&'a PropertyResolverFn>,
    pub encryption: Option<&'a dyn EncryptionPolicy>,
    /// Reject entities that arrive without encryption metadata.
    pub require_encryption: bool,
    /// `None` when type caching is disabled.
    pub cache: Option<&'a EdmTypeCache>,
    pub cancellation: Option<&'a CancellationToken>,
    pub enable_logging: bool,
}

impl ReadContext<'_> {
    /// Fail with [`TableError::Cancelled`] once cancellation was requested.
    pub fn check_cancelled(&self) -> Result<()> {
        match self.cancellation {
            Some(token) if token.is_cancelled() => Err(TableError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Rehydrate an entity body as sent in a response part.
///
/// The `Content-Type` selects between the no-metadata and the OData paths.
pub fn rehydrate_body(
    body: &[u8],
    content_type: Option<&str>,
    etag: Option<&str>,
    resolver: &EntityResolver,
    ctx: &ReadContext<'_>,
) -> Result<ResolvedEntity> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Object(raw) = value else {
        return Err(TableError::MalformedResponse(
            "entity payload is not a JSON object".to_string(),
        ));
    };

    let no_metadata = content_type.map_or(false, is_no_metadata);
    rehydrate(raw, etag.map(str::to_string), resolver, no_metadata, ctx)
}

/// Rehydrate an already parsed entity object.
pub fn rehydrate(
    raw: Map<String, Value>,
    etag: Option<String>,
    resolver: &EntityResolver,
    no_metadata: bool,
    ctx: &ReadContext<'_>,
) -> Result<ResolvedEntity> {
    let annotations = if no_metadata {
        HashMap::new()
    } else {
        collect_annotations(&raw)
    };

    let partition_key = system_string(&raw, properties::PARTITION_KEY);
    let row_key = system_string(&raw, properties::ROW_KEY);
    let timestamp = system_timestamp(&raw)?;
    let etag = etag.or_else(|| {
        raw.get(properties::ETAG)
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    let encryption = match ctx.encryption {
        Some(policy) => read_encryption_details(policy, &raw, &partition_key, &row_key)?
            .map(|details| (policy, details)),
        None => None,
    };
    if ctx.require_encryption && encryption.is_none() {
        return Err(TableError::EncryptionPolicyViolation(format!(
            "entity ({}, {}) is not encrypted but encryption is required",
            partition_key, row_key
        )));
    }

    let property_resolver = PropertyResolver::select(ctx.property_resolver, resolver, ctx.cache);
    let mut decoded = PropertyMap::with_capacity(raw.len());

    for (name, value) in &raw {
        if is_system_member(name) {
            continue;
        }
        if encryption.is_some() && is_metadata_property(name) {
            continue;
        }

        let property = match &encryption {
            Some((policy, details)) if details.is_encrypted(name) => decrypt_property(
                *policy,
                details,
                &property_resolver,
                &partition_key,
                &row_key,
                name,
                value,
            )?,
            _ => {
                let edm_type = annotations
                    .get(name.as_str())
                    .copied()
                    .or_else(|| {
                        property_resolver.resolve(&partition_key, &row_key, name, &raw_text(value))
                    })
                    .unwrap_or_else(|| infer(value));
                decode(name, value, edm_type)?
            }
        };
        decoded.insert(name.clone(), property);
    }

    if ctx.enable_logging {
        tracing::debug!(
            "Rehydrated entity ({}, {}) with {} properties as {}",
            partition_key,
            row_key,
            decoded.len(),
            resolver.type_name()
        );
    }

    resolver.resolve(&partition_key, &row_key, timestamp, decoded, etag)
}

fn collect_annotations(raw: &Map<String, Value>) -> HashMap<&str, EdmType> {
    raw.iter()
        .filter_map(|(key, value)| {
            let name = key.strip_suffix(properties::TYPE_ANNOTATION_SUFFIX)?;
            let edm_type = value.as_str()?.parse().ok()?;
            Some((name, edm_type))
        })
        .collect()
}

fn is_system_member(name: &str) -> bool {
    name == properties::PARTITION_KEY
        || name == properties::ROW_KEY
        || name == properties::TIMESTAMP
        || name.starts_with(properties::ODATA_PREFIX)
        || name.contains("@odata.")
}

fn system_string(raw: &Map<String, Value>, name: &str) -> String {
    raw.get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn system_timestamp(raw: &Map<String, Value>) -> Result<Option<DateTime<Utc>>> {
    match raw.get(properties::TIMESTAMP) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(decode(properties::TIMESTAMP, value, EdmType::DateTime)?.as_datetime()),
    }
}

fn read_encryption_details(
    policy: &dyn EncryptionPolicy,
    raw: &Map<String, Value>,
    partition_key: &str,
    row_key: &str,
) -> Result<Option<EncryptedPropertyDetails>> {
    let key_details = raw
        .get(properties::ENCRYPTION_KEY_DETAILS)
        .and_then(Value::as_str);
    let property_details = raw
        .get(properties::ENCRYPTION_PROPERTY_DETAILS)
        .and_then(Value::as_str);

    match (key_details, property_details) {
        (Some(key_details), Some(property_details)) => {
            let property_details =
                base64::engine::general_purpose::STANDARD.decode(property_details)?;
            extract_encryption_details(
                policy,
                partition_key,
                row_key,
                key_details,
                &property_details,
            )
            .map(Some)
        }
        (None, None) => Ok(None),
        _ => Err(TableError::Encryption(format!(
            "entity ({}, {}) carries incomplete encryption metadata",
            partition_key, row_key
        ))),
    }
}

fn decrypt_property(
    policy: &dyn EncryptionPolicy,
    details: &EncryptedPropertyDetails,
    property_resolver: &PropertyResolver,
    partition_key: &str,
    row_key: &str,
    name: &str,
    value: &Value,
) -> Result<EntityProperty> {
    let ciphertext = match decode(name, value, EdmType::Binary)? {
        EntityProperty::Binary(bytes) => bytes,
        _ => {
            return Err(TableError::property_format(
                name,
                raw_text(value),
                EdmType::Binary,
            ))
        }
    };
    let plaintext = decrypt_value(policy, details, partition_key, row_key, name, &ciphertext)?;
    let edm_type = property_resolver
        .resolve(partition_key, row_key, name, &plaintext)
        .unwrap_or(EdmType::String);
    decode_str(name, &plaintext, edm_type)
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
