//! Client-side property encryption.
//!
//! The codec does not implement any cipher itself. An [`EncryptionPolicy`]
//! supplies key generation, key wrapping and the symmetric primitive; this
//! module applies it to entity properties and manages the two reserved
//! metadata properties that travel with an encrypted entity.
//!
//! # Encrypted Entity Layout
//!
//! | Property | Type | Content |
//! |----------|------|---------|
//! | `_ClientEncryptionMetadata1` | `String` | wrapped content key, as produced by the policy |
//! | `_ClientEncryptionMetadata2` | `Binary` | encrypted JSON array of the encrypted property names |
//! | each encrypted property | `Binary` | ciphertext of the UTF-8 string value |
//!
//! Every ciphertext is bound to its entity and property through the context
//! string `partition_key + row_key + property_name`.

use crate::core::error::{Result, TableError};
use crate::core::protocol::constants::properties;
use crate::core::types::{EntityProperty, PropertyMap};
use std::collections::HashSet;
use std::fmt;

/// Symmetric content key of one entity.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey(Vec<u8>);

impl ContentKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        ContentKey(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey({} bytes)", self.0.len())
    }
}

/// Key management and cipher used for client-side encryption.
pub trait EncryptionPolicy: Send + Sync {
    /// Whether `property` of the given entity is stored encrypted.
    fn should_encrypt(&self, partition_key: &str, row_key: &str, property: &str) -> bool;

    /// Create a fresh content key and its wrapped, serialized form.
    fn generate_key(&self) -> Result<(ContentKey, String)>;

    /// Recover a content key from its wrapped form.
    fn unwrap_key(&self, key_details: &str) -> Result<ContentKey>;

    fn encrypt(&self, key: &ContentKey, context: &str, plaintext: &[u8]) -> Result<Vec<u8>>;

    fn decrypt(&self, key: &ContentKey, context: &str, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// Properties flagged as encrypted on one entity, with the key to read them.
#[derive(Debug)]
pub struct EncryptedPropertyDetails {
    pub key: ContentKey,
    pub properties: HashSet<String>,
}

impl EncryptedPropertyDetails {
    #[inline]
    pub fn is_encrypted(&self, property: &str) -> bool {
        self.properties.contains(property)
    }
}

/// Whether `name` is one of the reserved encryption metadata properties.
#[inline]
pub fn is_metadata_property(name: &str) -> bool {
    name == properties::ENCRYPTION_KEY_DETAILS || name == properties::ENCRYPTION_PROPERTY_DETAILS
}

fn context(partition_key: &str, row_key: &str, property: &str) -> String {
    format!("{}{}{}", partition_key, row_key, property)
}

/// Encrypt the properties selected by `policy`.
///
/// Returns the properties to write: selected values replaced by ciphertext,
/// followed by the two metadata properties. When nothing is selected the
/// properties are returned unchanged and no metadata is added.
pub fn encrypt_entity(
    policy: &dyn EncryptionPolicy,
    partition_key: &str,
    row_key: &str,
    source: &PropertyMap,
) -> Result<PropertyMap> {
    if let Some(name) = source.keys().find(|name| is_metadata_property(name)) {
        return Err(TableError::Encryption(format!(
            "'{}' is reserved for encryption metadata",
            name
        )));
    }

    let mut selected = Vec::new();
    for (name, value) in source {
        if value.is_null() || !policy.should_encrypt(partition_key, row_key, name) {
            continue;
        }
        if !matches!(value, EntityProperty::String(_)) {
            return Err(TableError::Encryption(format!(
                "Property '{}' is {}; only string properties can be encrypted",
                name,
                value.edm_type()
            )));
        }
        selected.push(name.clone());
    }

    if selected.is_empty() {
        return Ok(source.clone());
    }

    let (key, key_details) = policy.generate_key()?;
    let mut output = PropertyMap::with_capacity(source.len() + 2);

    for (name, value) in source {
        let written = match value {
            EntityProperty::String(s) if selected.contains(name) => {
                let ciphertext = policy.encrypt(
                    &key,
                    &context(partition_key, row_key, name),
                    s.as_bytes(),
                )?;
                EntityProperty::Binary(ciphertext)
            }
            other => other.clone(),
        };
        output.insert(name.clone(), written);
    }

    let names = serde_json::to_vec(&selected)?;
    let encrypted_names = policy.encrypt(
        &key,
        &context(partition_key, row_key, properties::ENCRYPTION_PROPERTY_DETAILS),
        &names,
    )?;

    output.insert(
        properties::ENCRYPTION_KEY_DETAILS.to_string(),
        EntityProperty::String(key_details),
    );
    output.insert(
        properties::ENCRYPTION_PROPERTY_DETAILS.to_string(),
        EntityProperty::Binary(encrypted_names),
    );

    Ok(output)
}

/// Recover the content key and the encrypted property names of an entity.
pub fn extract_encryption_details(
    policy: &dyn EncryptionPolicy,
    partition_key: &str,
    row_key: &str,
    key_details: &str,
    property_details: &[u8],
) -> Result<EncryptedPropertyDetails> {
    let key = policy.unwrap_key(key_details)?;
    let names = policy.decrypt(
        &key,
        &context(partition_key, row_key, properties::ENCRYPTION_PROPERTY_DETAILS),
        property_details,
    )?;
    let names: Vec<String> = serde_json::from_slice(&names).map_err(|e| {
        TableError::Encryption(format!("Invalid encrypted property list: {}", e))
    })?;

    Ok(EncryptedPropertyDetails {
        key,
        properties: names.into_iter().collect(),
    })
}

/// Decrypt one property into its plaintext string form.
pub fn decrypt_value(
    policy: &dyn EncryptionPolicy,
    details: &EncryptedPropertyDetails,
    partition_key: &str,
    row_key: &str,
    property: &str,
    ciphertext: &[u8],
) -> Result<String> {
    let plaintext = policy.decrypt(
        &details.key,
        &context(partition_key, row_key, property),
        ciphertext,
    )?;
    String::from_utf8(plaintext).map_err(|_| {
        TableError::Encryption(format!("Decrypted value of '{}' is not UTF-8", property))
    })
}
