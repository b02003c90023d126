//! Protocol constants: header names, reserved property names and media types.

/// HTTP header names used by the batch envelope.
pub mod headers {
    pub const ACCEPT: &str = "Accept";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const CONTENT_TRANSFER_ENCODING: &str = "Content-Transfer-Encoding";
    pub const DATA_SERVICE_VERSION: &str = "DataServiceVersion";
    pub const MAX_DATA_SERVICE_VERSION: &str = "MaxDataServiceVersion";
    pub const ETAG: &str = "ETag";
    pub const IF_MATCH: &str = "If-Match";
    pub const PREFER: &str = "Prefer";
}

/// Reserved entity property names.
pub mod properties {
    pub const PARTITION_KEY: &str = "PartitionKey";
    pub const ROW_KEY: &str = "RowKey";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const ETAG: &str = "odata.etag";
    /// Prefix shared by OData metadata members (`odata.metadata`, `odata.type`, ...).
    pub const ODATA_PREFIX: &str = "odata.";
    /// Suffix of a property type annotation (`Age@odata.type`).
    pub const TYPE_ANNOTATION_SUFFIX: &str = "@odata.type";
    /// Wrapped content key and algorithm details of an encrypted entity.
    pub const ENCRYPTION_KEY_DETAILS: &str = "_ClientEncryptionMetadata1";
    /// Encrypted list of the entity's encrypted property names.
    pub const ENCRYPTION_PROPERTY_DETAILS: &str = "_ClientEncryptionMetadata2";
}

/// Media types and fixed header values.
pub mod media {
    pub const MULTIPART_MIXED: &str = "multipart/mixed";
    pub const APPLICATION_HTTP: &str = "application/http";
    pub const APPLICATION_JSON: &str = "application/json";
    pub const BINARY: &str = "binary";
    pub const RETURN_CONTENT: &str = "return-content";
    pub const RETURN_NO_CONTENT: &str = "return-no-content";
    pub const NO_METADATA: &str = "odata=nometadata";
    pub const HTTP_VERSION: &str = "HTTP/1.1";
    pub const DEFAULT_DATA_SERVICE_VERSION: &str = "3.0";
    pub const MAX_DATA_SERVICE_VERSION: &str = "3.0;NetFx";
}

/// Boundary prefixes of the outer batch and the inner changeset.
pub const BATCH_BOUNDARY_PREFIX: &str = "batch_";
pub const CHANGESET_BOUNDARY_PREFIX: &str = "changeset_";

/// Line terminator of the multipart body.
pub const CRLF: &str = "\r\n";

/// Path segment of the batch endpoint.
pub const BATCH_PATH: &str = "$batch";
