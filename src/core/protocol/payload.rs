//! JSON entity payloads.
//!
//! Writes the body of one operation: keys first for inserts, then the
//! entity's properties in iteration order. Each value that JSON cannot type
//! on its own is preceded by its `<name>@odata.type` annotation:
//!
//! ```text
//! {"PartitionKey":"p","RowKey":"1","Age@odata.type":"Edm.Int64","Age":"36","Name":"Ada"}
//! ```

use crate::core::encryption::{encrypt_entity, EncryptionPolicy};
use crate::core::error::{Result, TableError};
use crate::core::protocol::constants::properties;
use crate::core::protocol::property_codec;
use crate::core::types::{OperationKind, PropertyMap, TableOperation};
use bytes::Bytes;
use serde_json::{Map, Value};

/// Build the JSON object written for `operation`.
///
/// Null properties are omitted. With an encryption policy, the properties of
/// non-merge kinds are encrypted first; merge-family kinds are rejected
/// because a merge cannot keep the encrypted-property list consistent.
pub fn write_entity(
    operation: &TableOperation,
    encryption: Option<&dyn EncryptionPolicy>,
) -> Result<Map<String, Value>> {
    let kind = operation.kind();
    let entity = operation.entity();

    let encrypted;
    let properties: &PropertyMap = match encryption {
        Some(_) if kind.is_merge_family() => {
            return Err(TableError::EncryptionPolicyViolation(format!(
                "{} operations cannot be used with client-side encryption",
                kind
            )));
        }
        // Key rotation only carries re-wrapped metadata.
        Some(policy) if kind != OperationKind::RotateEncryptionKey => {
            encrypted = encrypt_entity(
                policy,
                &entity.partition_key,
                &entity.row_key,
                &entity.properties,
            )?;
            &encrypted
        }
        _ => &entity.properties,
    };

    let mut object = Map::new();

    // Empty strings are valid keys.
    if kind == OperationKind::Insert {
        object.insert(
            properties::PARTITION_KEY.to_string(),
            Value::String(entity.partition_key.clone()),
        );
        object.insert(
            properties::ROW_KEY.to_string(),
            Value::String(entity.row_key.clone()),
        );
    }

    for (name, value) in properties {
        if let Some((wire, annotation)) = property_codec::encode(value) {
            if let Some(edm_type) = annotation {
                object.insert(
                    format!("{}{}", name, properties::TYPE_ANNOTATION_SUFFIX),
                    Value::String(edm_type.as_str().to_string()),
                );
            }
            object.insert(name.clone(), wire);
        }
    }

    Ok(object)
}

/// Serialize the body of `operation` as one line of compact JSON.
pub fn serialize_entity_body(
    operation: &TableOperation,
    encryption: Option<&dyn EncryptionPolicy>,
) -> Result<Bytes> {
    let object = write_entity(operation, encryption)?;
    Ok(Bytes::from(serde_json::to_vec(&Value::Object(object))?))
}
