//! The codec facade.
//!
//! [`TableCodec`] binds a [`CodecConfig`] and a shared [`EdmTypeCache`] to the
//! wire-level writer and reader, and drives an injected [`TableTransport`]
//! for a full batch round trip.

use crate::core::client::batch::{read_batch, read_parts};
use crate::core::client::config::{CodecConfig, TableRequestOptions};
use crate::core::client::rehydrate::ReadContext;
use crate::core::client::resolver::EdmTypeCache;
use crate::core::client::single;
use crate::core::error::{Result, TableError};
use crate::core::protocol::constants::{headers, media, BATCH_PATH};
use crate::core::protocol::error_info::parse_extended_error;
use crate::core::protocol::formatter::{format_batch, BatchFormatOptions, FormattedBatch};
use crate::core::protocol::headers::parse_boundary;
use crate::core::protocol::parser::PartReader;
use crate::core::protocol::payload::serialize_entity_body;
use crate::core::traits::TableTransport;
use crate::core::types::{
    Bytes, TableBatch, TableOperation, TableRequest, TableResponse, TableResult,
};
use std::io::{BufRead, Cursor};

/// Status of an accepted batch request.
const BATCH_ACCEPTED: u16 = 202;

/// Batch codec bound to one table.
#[derive(Clone, Debug)]
pub struct TableCodec {
    config: CodecConfig,
    cache: EdmTypeCache,
}

impl TableCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self::with_cache(config, EdmTypeCache::new())
    }

    /// Create a codec sharing `cache` with other codecs.
    pub fn with_cache(config: CodecConfig, cache: EdmTypeCache) -> Self {
        TableCodec { config, cache }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn cache(&self) -> &EdmTypeCache {
        &self.cache
    }

    fn format_options<'a>(&'a self, options: &'a TableRequestOptions) -> BatchFormatOptions<'a> {
        BatchFormatOptions {
            base_uri: &self.config.base_uri,
            table_name: &self.config.table_name,
            payload_format: self.config.payload_format,
            data_service_version: &self.config.data_service_version,
            encryption: options.encryption_policy.as_deref(),
        }
    }

    fn read_context<'a>(&'a self, options: &'a TableRequestOptions) -> ReadContext<'a> {
        ReadContext {
            property_resolver: options.property_resolver.as_ref(),
            encryption: options.encryption_policy.as_deref(),
            require_encryption: self.config.require_encryption,
            cache: (!self.config.disable_type_cache).then_some(&self.cache),
            cancellation: options.cancellation.as_ref(),
            enable_logging: self.config.enable_logging,
        }
    }

    /// Serialize `batch` into a multipart/mixed request body.
    pub fn serialize_batch(
        &self,
        batch: &TableBatch,
        options: &TableRequestOptions,
    ) -> Result<FormattedBatch> {
        let formatted = format_batch(batch, &self.format_options(options))?;

        if self.config.enable_logging {
            for (index, operation) in batch.iter().enumerate() {
                tracing::debug!(
                    "Serialized batch part {}: {} {}",
                    index,
                    operation.kind(),
                    operation.row_key()
                );
            }
        }

        Ok(formatted)
    }

    /// Parse a multipart batch response into one result per operation.
    pub fn parse_batch_response<R: BufRead>(
        &self,
        reader: R,
        batch: &mut TableBatch,
        options: &TableRequestOptions,
    ) -> Result<Vec<TableResult>> {
        read_batch(reader, batch, &self.read_context(options))
    }

    /// Serialize the JSON body of a single operation.
    pub fn serialize_entity(
        &self,
        operation: &TableOperation,
        options: &TableRequestOptions,
    ) -> Result<Bytes> {
        serialize_entity_body(operation, options.encryption_policy.as_deref())
    }

    /// See [`single::preprocess_single_response`].
    pub fn preprocess_single_response(
        &self,
        operation: &mut TableOperation,
        response: &TableResponse,
        supplied: TableError,
    ) -> Result<TableResult> {
        single::preprocess_single_response(operation, response, supplied)
    }

    /// See [`single::postprocess_single_response`].
    pub fn postprocess_single_response(
        &self,
        operation: &mut TableOperation,
        result: TableResult,
        response: &TableResponse,
        options: &TableRequestOptions,
    ) -> Result<TableResult> {
        let ctx = self.read_context(options);
        single::postprocess_single_response(operation, result, response, &ctx)
    }

    /// Build the `POST .../$batch` request for `batch`.
    pub fn batch_request(
        &self,
        batch: &TableBatch,
        options: &TableRequestOptions,
    ) -> Result<TableRequest> {
        let formatted = self.serialize_batch(batch, options)?;
        let uri = format!("{}/{}", self.config.base_uri.trim_end_matches('/'), BATCH_PATH);

        Ok(TableRequest::new("POST", uri)
            .with_header(headers::CONTENT_TYPE, formatted.content_type)
            .with_header(headers::ACCEPT, self.config.payload_format.accept_header())
            .with_header(
                headers::DATA_SERVICE_VERSION,
                self.config.data_service_version.as_str(),
            )
            .with_header(headers::MAX_DATA_SERVICE_VERSION, media::MAX_DATA_SERVICE_VERSION)
            .with_body(formatted.body))
    }

    /// Send `batch` through `transport` and parse the response.
    ///
    /// The outer response must be `202 Accepted`; any other status becomes
    /// [`TableError::Http`] carrying the service's error message when one is
    /// present. The response must announce its multipart boundary in
    /// `Content-Type`. Results come back in request order.
    pub async fn execute_batch(
        &self,
        transport: &dyn TableTransport,
        batch: &mut TableBatch,
        options: &TableRequestOptions,
    ) -> Result<Vec<TableResult>> {
        let request = self.batch_request(batch, options)?;

        if self.config.enable_logging {
            tracing::debug!(
                "Sending batch of {} operations to {}",
                batch.len(),
                request.uri
            );
        }

        let response = transport.send(request).await?;

        if response.status != BATCH_ACCEPTED {
            let message = parse_extended_error(&response.body, response.content_type())
                .and_then(|info| info.plain_message().map(str::to_string))
                .or_else(|| response.body_str().map(str::to_string))
                .unwrap_or_default();
            if self.config.enable_logging {
                tracing::warn!("Batch request returned {}: {}", response.status, message);
            }
            return Err(TableError::Http {
                status: response.status,
                message,
            });
        }

        let boundary = response
            .content_type()
            .and_then(parse_boundary)
            .ok_or_else(|| {
                TableError::MalformedResponse(format!(
                    "batch response Content-Type {:?} carries no multipart boundary",
                    response.content_type()
                ))
            })?;
        let parts = PartReader::with_boundary(Cursor::new(response.body.as_ref()), boundary);

        read_parts(parts, batch, &self.read_context(options))
    }
}
