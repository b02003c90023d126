//! Table service batch protocol codec.
//!
//! Serializes an ordered list of entity operations into a single
//! `multipart/mixed` OData batch request, and parses the multipart response
//! back into one result per operation.
//!
//! # Modules
//!
//! - [`types`] - Entities, operations, batches, results and HTTP messages
//! - [`protocol`] - Property codec, envelope writer, part reader, status rules
//! - [`client`] - Rehydration, batch and single response semantics, the codec facade
//! - [`encryption`] - Client-side property encryption flow
//! - [`error`] - The [`TableError`](error::TableError) type
//!
//! # Quick Start
//!
//! ```ignore
//! use table_batch_rs::{CodecConfig, TableBatch, TableCodec, TableOperation, TableRequestOptions};
//!
//! let codec = TableCodec::new(CodecConfig::new(endpoint, "people"));
//! let mut batch = TableBatch::new().with(TableOperation::insert(entity, false))?;
//!
//! let results = codec
//!     .execute_batch(&transport, &mut batch, &TableRequestOptions::default())
//!     .await?;
//! for result in results {
//!     println!("{} {:?}", result.status, result.etag);
//! }
//! ```

pub mod client;
pub mod encryption;
pub mod error;
pub mod protocol;
pub mod traits;
pub mod types;

pub use client::{CodecConfig, TableCodec, TableRequestOptions};
pub use error::{Result, TableError};
pub use traits::TableTransport;
pub use types::{DynamicEntity, TableBatch, TableOperation, TableResult};
