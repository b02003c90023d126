//! Configuration for the Table batch codec.
//!
//! [`CodecConfig`] holds the settings that stay fixed for a codec instance;
//! [`TableRequestOptions`] carries what varies per call.
//!
//! # Configuration Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `base_uri` | `""` | Table endpoint, e.g. `https://acct.table.core.windows.net` |
//! | `table_name` | `""` | Table addressed by every part |
//! | `payload_format` | `JsonMinimalMetadata` | `Accept` format of each part |
//! | `data_service_version` | `3.0` | `DataServiceVersion` of each part |
//! | `disable_type_cache` | false | Rebuild declared EDM maps on every read |
//! | `enable_logging` | false | Log parts and failures through `tracing` |
//! | `require_encryption` | false | Reject unencrypted entities on read |
//!
//! # Examples
//!
//! ```
//! use table_batch_rs::{CodecConfig, PayloadFormat};
//!
//! let config = CodecConfig {
//!     base_uri: "https://acct.table.core.windows.net".into(),
//!     table_name: "people".into(),
//!     payload_format: PayloadFormat::JsonNoMetadata,
//!     ..Default::default()
//! };
//! assert_eq!(config.data_service_version, "3.0");
//! assert!(!config.disable_type_cache);
//! ```

use crate::core::client::resolver::PropertyResolverFn;
use crate::core::encryption::EncryptionPolicy;
use crate::core::protocol::constants::media;
use crate::core::protocol::headers::PayloadFormat;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Settings of a [`TableCodec`](crate::TableCodec).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecConfig {
    /// Table service endpoint, without a trailing slash.
    pub base_uri: String,

    /// Table every operation of a batch targets.
    pub table_name: String,

    /// JSON shape requested for response bodies.
    pub payload_format: PayloadFormat,

    /// Value of the per-part `DataServiceVersion` header.
    pub data_service_version: String,

    /// Disable the shared EDM type cache.
    ///
    /// When set, declared EDM maps are rebuilt for every entity read.
    pub disable_type_cache: bool,

    /// Enable logging.
    ///
    /// When enabled, parts and batch failures are logged using the `tracing` crate.
    pub enable_logging: bool,

    /// Reject entities read without encryption metadata.
    pub require_encryption: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            base_uri: String::new(),
            table_name: String::new(),
            payload_format: PayloadFormat::default(),
            data_service_version: media::DEFAULT_DATA_SERVICE_VERSION.to_string(),
            disable_type_cache: false,
            enable_logging: false,
            require_encryption: false,
        }
    }
}

impl CodecConfig {
    pub fn new(base_uri: impl Into<String>, table_name: impl Into<String>) -> Self {
        CodecConfig {
            base_uri: base_uri.into().trim_end_matches('/').to_string(),
            table_name: table_name.into(),
            ..Default::default()
        }
    }
}

/// Per-call options.
#[derive(Clone, Default)]
pub struct TableRequestOptions {
    /// Client-side encryption applied on write and undone on read.
    pub encryption_policy: Option<Arc<dyn EncryptionPolicy>>,

    /// Per-property EDM type resolver for untyped payloads.
    pub property_resolver: Option<PropertyResolverFn>,

    /// Checked between response parts.
    pub cancellation: Option<CancellationToken>,
}

impl TableRequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encryption_policy(mut self, policy: Arc<dyn EncryptionPolicy>) -> Self {
        self.encryption_policy = Some(policy);
        self
    }

    pub fn with_property_resolver(mut self, resolver: PropertyResolverFn) -> Self {
        self.property_resolver = Some(resolver);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

impl fmt::Debug for TableRequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableRequestOptions")
            .field("encryption_policy", &self.encryption_policy.is_some())
            .field("property_resolver", &self.property_resolver.is_some())
            .field("cancellation", &self.cancellation)
            .finish()
    }
}
