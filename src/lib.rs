//! table_batch_rs: Table service batch protocol codec.
//!
//! Encodes entity operations as an OData `multipart/mixed` batch and decodes
//! the service's multipart response, one result per operation.

pub mod core;

// Top-level re-exports for common usage
pub use crate::core::client::{
    CodecConfig, EdmTypeCache, PropertyResolverFn, TableCodec, TableRequestOptions,
};
pub use crate::core::encryption::{ContentKey, EncryptionPolicy};
pub use crate::core::error::{Result, TableError};
pub use crate::core::protocol::{Classification, FormattedBatch, PayloadFormat};
pub use crate::core::traits::TableTransport;
pub use crate::core::types;
pub use crate::core::types::{
    DynamicEntity, EdmType, EntityProperty, EntityResolver, OperationKind, PropertyMap,
    TableBatch, TableEntity, TableOperation, TableRequest, TableResponse, TableResult,
};
