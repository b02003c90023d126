//! Batch envelope formatter.
//!
//! Converts a [`TableBatch`] into the multipart/mixed request body:
//!
//! ```text
//! --batch_<id>
//! Content-Type: multipart/mixed; boundary=changeset_<id>
//!
//! --changeset_<id>
//! Content-Type: application/http
//! Content-Transfer-Encoding: binary
//!
//! POST https://acct.table.core.windows.net/people HTTP/1.1
//! Accept: application/json;odata=minimalmetadata
//! Prefer: return-no-content
//! Content-Type: application/json
//! DataServiceVersion: 3.0
//!
//! {"PartitionKey":"p","RowKey":"1","x":5}
//!
//! --changeset_<id>--
//! --batch_<id>--
//! ```
//!
//! A batch holding a single retrieve is a query: its part is written directly
//! inside the batch boundary, without a changeset.

use crate::core::encryption::EncryptionPolicy;
use crate::core::error::{Result, TableError};
use crate::core::protocol::constants::{self, headers, media};
use crate::core::protocol::headers::{multipart_content_type, prefer_header, PayloadFormat};
use crate::core::protocol::payload::serialize_entity_body;
use crate::core::protocol::uri::{escape_resource_uri, resource_uri};
use crate::core::types::{OperationKind, TableBatch, TableOperation};
use bytes::{Bytes, BytesMut};
use uuid::Uuid;

/// Inputs of the envelope that do not come from the batch itself.
#[derive(Clone, Copy)]
pub struct BatchFormatOptions<'a> {
    pub base_uri: &'a str,
    pub table_name: &'a str,
    pub payload_format: PayloadFormat,
    pub data_service_version: &'a str,
    pub encryption: Option<&'a dyn EncryptionPolicy>,
}

/// A serialized batch body and the request `Content-Type` announcing it.
#[derive(Clone, Debug)]
pub struct FormattedBatch {
    pub body: Bytes,
    pub content_type: String,
    pub batch_boundary: String,
    /// `None` for queries.
    pub changeset_boundary: Option<String>,
}

/// Format `batch` into a multipart/mixed body.
///
/// Entity bodies are produced before anything is written, so an encoding or
/// encryption policy failure never yields a partial body.
pub fn format_batch(
    batch: &TableBatch,
    options: &BatchFormatOptions<'_>,
) -> Result<FormattedBatch> {
    if batch.is_empty() {
        return Err(TableError::EmptyBatch);
    }

    let bodies = batch
        .iter()
        .map(|op| {
            if op.kind().has_body() {
                serialize_entity_body(op, options.encryption).map(Some)
            } else {
                Ok(None)
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let batch_boundary = format!("{}{}", constants::BATCH_BOUNDARY_PREFIX, Uuid::new_v4());
    let changeset_boundary = if batch.is_query() {
        None
    } else {
        Some(format!(
            "{}{}",
            constants::CHANGESET_BOUNDARY_PREFIX,
            Uuid::new_v4()
        ))
    };

    let mut buffer = BytesMut::new();
    write_line(&mut buffer, &format!("--{}", batch_boundary));

    if let Some(changeset) = &changeset_boundary {
        write_header(
            &mut buffer,
            headers::CONTENT_TYPE,
            &multipart_content_type(changeset),
        );
        write_line(&mut buffer, "");
    }

    for (operation, body) in batch.iter().zip(&bodies) {
        if let Some(changeset) = &changeset_boundary {
            write_line(&mut buffer, &format!("--{}", changeset));
        }
        format_part(&mut buffer, operation, body.as_ref(), options);
    }

    if let Some(changeset) = &changeset_boundary {
        write_line(&mut buffer, &format!("--{}--", changeset));
    }
    write_line(&mut buffer, &format!("--{}--", batch_boundary));

    Ok(FormattedBatch {
        body: buffer.freeze(),
        content_type: multipart_content_type(&batch_boundary),
        batch_boundary,
        changeset_boundary,
    })
}

fn format_part(
    buffer: &mut BytesMut,
    operation: &TableOperation,
    body: Option<&Bytes>,
    options: &BatchFormatOptions<'_>,
) {
    let kind = operation.kind();

    write_header(buffer, headers::CONTENT_TYPE, media::APPLICATION_HTTP);
    write_header(buffer, headers::CONTENT_TRANSFER_ENCODING, media::BINARY);
    write_line(buffer, "");

    let uri = resource_uri(options.base_uri, options.table_name, operation);
    write_line(
        buffer,
        &format!(
            "{} {} {}",
            kind.batch_method(),
            escape_resource_uri(&uri),
            media::HTTP_VERSION
        ),
    );

    write_header(buffer, headers::ACCEPT, options.payload_format.accept_header());
    if kind == OperationKind::Insert {
        write_header(buffer, headers::PREFER, prefer_header(operation.echo_content()));
    }
    if body.is_some() {
        write_header(buffer, headers::CONTENT_TYPE, media::APPLICATION_JSON);
    }
    write_header(buffer, headers::DATA_SERVICE_VERSION, options.data_service_version);

    if kind.requires_if_match() {
        if let Some(etag) = operation.entity().etag.as_deref().filter(|e| !e.is_empty()) {
            write_header(buffer, headers::IF_MATCH, etag);
        }
    }

    write_line(buffer, "");

    if let Some(body) = body {
        buffer.extend_from_slice(body);
        buffer.extend_from_slice(constants::CRLF.as_bytes());
        write_line(buffer, "");
    }
}

fn write_header(buffer: &mut BytesMut, key: &str, value: &str) {
    buffer.extend_from_slice(key.as_bytes());
    buffer.extend_from_slice(b": ");
    buffer.extend_from_slice(value.as_bytes());
    buffer.extend_from_slice(constants::CRLF.as_bytes());
}

fn write_line(buffer: &mut BytesMut, line: &str) {
    buffer.extend_from_slice(line.as_bytes());
    buffer.extend_from_slice(constants::CRLF.as_bytes());
}
