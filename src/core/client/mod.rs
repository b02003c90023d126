//! Response semantics and the codec facade.
//!
//! The `protocol` module knows the wire; this module knows what the parts
//! mean for each operation kind.
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── codec     - TableCodec facade and batch execution
//! ├── config    - Codec configuration and per-call options
//! ├── batch     - Batch response reading and failure attribution
//! ├── single    - Single-operation response processing
//! ├── rehydrate - JSON to entity conversion
//! └── resolver  - EDM type resolution and the shared type cache
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TableCodec`] | Serializes batches and parses their responses |
//! | [`CodecConfig`] | Codec configuration options |
//! | [`TableRequestOptions`] | Encryption, resolver and cancellation per call |
//! | [`EdmTypeCache`] | Declared EDM maps shared across reads |
//!
//! # Examples
//!
//! ```
//! use table_batch_rs::{CodecConfig, DynamicEntity, TableBatch, TableCodec, TableOperation,
//!     TableRequestOptions};
//!
//! let codec = TableCodec::new(CodecConfig::new("https://acct.table.core.windows.net", "people"));
//! let batch = TableBatch::new()
//!     .with(TableOperation::insert(DynamicEntity::new("p", "1").with_property("Age", 42), false))
//!     .unwrap();
//!
//! let formatted = codec.serialize_batch(&batch, &TableRequestOptions::default()).unwrap();
//! assert!(formatted.content_type.starts_with("multipart/mixed; boundary=batch_"));
//! ```

pub mod batch;
pub mod codec;
pub mod config;
pub mod rehydrate;
pub mod resolver;
pub mod single;

pub use batch::read_batch;
pub use codec::TableCodec;
pub use config::{CodecConfig, TableRequestOptions};
pub use rehydrate::{rehydrate, rehydrate_body, ReadContext};
pub use resolver::{EdmTypeCache, PropertyResolver, PropertyResolverFn};
pub use single::{postprocess_single_response, preprocess_single_response};
