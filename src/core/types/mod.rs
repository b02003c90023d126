//! Core data types for the Table batch codec.
//!
//! # Type Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         TableBatch                          │
//! │  (ordered, single partition, retrieve only when alone)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       TableOperation                        │
//! │  (kind, DynamicEntity, echo-content, resolver, projection)  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        TableResult                          │
//! │  (status, etag, resolved entity)                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`EdmType`] | OData scalar type tag |
//! | [`EntityProperty`] | Typed property value |
//! | [`DynamicEntity`] | Untyped entity (keys, timestamp, etag, properties) |
//! | [`TableEntity`] | Trait for typed entities |
//! | [`EntityResolver`] | Turns decoded fields into the caller's type |
//! | [`TableOperation`] | One batch operation |
//! | [`TableBatch`] | Ordered operation list |
//! | [`TableResult`] | Per-operation outcome |
//! | [`TableRequest`] / [`TableResponse`] | Transport-level HTTP messages |

mod batch;
mod edm;
mod entity;
mod operation;
mod property;
mod request;
mod response;
mod result;

pub use batch::{TableBatch, MAX_BATCH_OPERATIONS};
pub use bytes::Bytes;
pub use edm::EdmType;
pub use entity::{DynamicEntity, EntityResolver, ResolvedEntity, TableEntity};
pub use operation::{OperationKind, TableOperation};
pub use property::{DefaultEdmType, EntityProperty, PropertyMap};
pub use request::TableRequest;
pub use response::TableResponse;
pub use result::TableResult;
