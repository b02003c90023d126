//! Batch response processing.
//!
//! Maps the parts yielded by [`PartReader`] back onto the operations of the
//! batch, positionally. The first failed part aborts the read with
//! [`TableError::BatchOperationFailed`]; results of later operations are never
//! produced.
//!
//! # Per-Part Flow
//!
//! ```text
//! part i ──► classify(kind, echo, status)
//!              ├─ Success        ──► ETag → result (+ entity unless Retrieve)
//!              │                     body → rehydrate (Retrieve, echo Insert)
//!              │                     no-echo Insert → Timestamp from ETag
//!              ├─ SuccessEmpty   ──► empty result (Retrieve 404)
//!              └─ FailError /
//!                 FailUnexpected ──► extended error → BatchOperationFailed
//! ```

use crate::core::client::rehydrate::{rehydrate_body, ReadContext};
use crate::core::error::{Result, TableError};
use crate::core::protocol::classify::{classify, Classification};
use crate::core::protocol::constants::properties;
use crate::core::protocol::error_info::parse_extended_error;
use crate::core::protocol::headers::parse_etag_timestamp;
use crate::core::protocol::parser::{BatchPart, PartReader};
use crate::core::protocol::property_codec::parse_datetime;
use crate::core::types::{OperationKind, TableBatch, TableOperation, TableResult};
use chrono::{DateTime, Utc};
use std::io::BufRead;

/// Read a batch response into one result per operation, in request order.
///
/// Successful parts refresh the ETag (and for non-echo inserts the
/// Timestamp) of the corresponding operation's entity.
pub fn read_batch<R: BufRead>(
    reader: R,
    batch: &mut TableBatch,
    ctx: &ReadContext<'_>,
) -> Result<Vec<TableResult>> {
    read_parts(PartReader::new(reader), batch, ctx)
}

/// [`read_batch`] over a reader already set up, e.g. with the announced boundary.
pub fn read_parts<R: BufRead>(
    mut parts: PartReader<R>,
    batch: &mut TableBatch,
    ctx: &ReadContext<'_>,
) -> Result<Vec<TableResult>> {
    let mut results = Vec::with_capacity(batch.len());
    let mut index = 0;

    loop {
        ctx.check_cancelled()?;

        let Some(part) = parts.next_part()? else {
            break;
        };

        let operation = batch.get_mut(index).ok_or_else(|| {
            TableError::MalformedResponse(format!(
                "response carries more parts than the {} operations of the batch",
                index
            ))
        })?;

        let kind = operation.kind();
        let classification = classify(kind, operation.echo_content(), part.status);

        if ctx.enable_logging {
            tracing::debug!(
                "Batch part {}: {} answered {} ({:?})",
                index,
                kind,
                part.status,
                classification
            );
        }

        if classification.is_failure() {
            return Err(batch_failure(index, &part, classification, ctx));
        }
        let result = match classification {
            Classification::Success => process_success(operation, &part, ctx)?,
            _ => TableResult::new(part.status),
        };
        results.push(result);

        index += 1;
    }

    if results.len() != batch.len() {
        return Err(TableError::MalformedResponse(format!(
            "response answered {} of {} operations",
            results.len(),
            batch.len()
        )));
    }

    Ok(results)
}

fn process_success(
    operation: &mut TableOperation,
    part: &BatchPart,
    ctx: &ReadContext<'_>,
) -> Result<TableResult> {
    let kind = operation.kind();
    let mut result = TableResult::new(part.status);
    let etag = part.etag().map(str::to_string);
    result.etag = etag.clone();

    // The entity is updated only after the body rehydrates.
    let mut body_timestamp = None;
    if operation.expects_entity() {
        let body = part.body.as_deref().ok_or_else(|| {
            TableError::MalformedResponse(format!(
                "{} response part with status {} has no entity body",
                kind, part.status
            ))
        })?;

        result.result = Some(rehydrate_body(
            body,
            part.content_type(),
            etag.as_deref(),
            operation.resolver(),
            ctx,
        )?);

        if kind == OperationKind::Insert {
            body_timestamp = timestamp_from_body(body);
        }
    }

    if kind != OperationKind::Retrieve {
        let echo_content = operation.echo_content();
        let entity = operation.entity_mut();
        if let Some(etag) = &etag {
            entity.etag = Some(etag.clone());
            if kind == OperationKind::Insert && !echo_content {
                if let Some(timestamp) = parse_etag_timestamp(etag) {
                    entity.timestamp = Some(timestamp);
                }
            }
        }
        if body_timestamp.is_some() {
            entity.timestamp = body_timestamp;
        }
    }

    Ok(result)
}

fn timestamp_from_body(body: &[u8]) -> Option<DateTime<Utc>> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    parse_datetime(value.get(properties::TIMESTAMP)?.as_str()?)
}

/// Build the error for a failed part.
///
/// The service prefixes its message with the index of the failing operation;
/// that index wins over the position of the part, since a changeset failure
/// is answered by a single part.
fn batch_failure(
    index: usize,
    part: &BatchPart,
    classification: Classification,
    ctx: &ReadContext<'_>,
) -> TableError {
    let info = part
        .body
        .as_deref()
        .and_then(|body| parse_extended_error(body, part.content_type()));

    let failed_index = info
        .as_ref()
        .and_then(|i| i.operation_index())
        .unwrap_or(index);
    let code = info.as_ref().and_then(|i| i.code.clone());
    let message = info
        .as_ref()
        .and_then(|i| i.plain_message())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} {}", part.status, part.reason).trim().to_string());
    let retryable = classification.is_retryable();

    if ctx.enable_logging {
        tracing::warn!(
            "Batch operation {} failed with status {} ({:?}, retryable: {}): {}",
            failed_index,
            part.status,
            code,
            retryable,
            message
        );
    }

    TableError::BatchOperationFailed {
        index: failed_index,
        status: part.status,
        code,
        message,
        retryable,
    }
}
