//! Single-operation response processing.
//!
//! Unlike the batch reader, single operations do not classify failures
//! locally: the executor hands in the error it built for the response, and
//! that error is returned unchanged when the status does not fit the
//! operation kind.

use crate::core::client::rehydrate::{rehydrate_body, ReadContext};
use crate::core::error::{Result, TableError};
use crate::core::protocol::classify::expected_status;
use crate::core::protocol::constants::properties;
use crate::core::protocol::headers::parse_etag_timestamp;
use crate::core::protocol::property_codec::parse_datetime;
use crate::core::types::{OperationKind, TableOperation, TableResponse, TableResult};

/// Validate the status of a single response and propagate its ETag.
pub fn preprocess_single_response(
    operation: &mut TableOperation,
    response: &TableResponse,
    supplied: TableError,
) -> Result<TableResult> {
    let kind = operation.kind();
    let accepted = match kind {
        OperationKind::Retrieve => response.status == 200 || response.status == 404,
        _ => response.status == expected_status(kind, operation.echo_content()),
    };
    if !accepted {
        return Err(supplied);
    }

    let mut result = TableResult::new(response.status);
    result.etag = response.etag().map(str::to_string);

    if kind != OperationKind::Retrieve {
        if let Some(etag) = &result.etag {
            operation.entity_mut().etag = Some(etag.clone());
            if kind == OperationKind::Insert && !operation.echo_content() {
                if let Some(timestamp) = parse_etag_timestamp(etag) {
                    operation.entity_mut().timestamp = Some(timestamp);
                }
            }
        }
    }

    Ok(result)
}

/// Rehydrate the body of a successful retrieve or echo-content insert.
///
/// Other results pass through untouched.
pub fn postprocess_single_response(
    operation: &mut TableOperation,
    mut result: TableResult,
    response: &TableResponse,
    ctx: &ReadContext<'_>,
) -> Result<TableResult> {
    let has_entity = match operation.kind() {
        OperationKind::Retrieve => result.status == 200,
        OperationKind::Insert => operation.echo_content() && result.status == 201,
        _ => false,
    };
    if !has_entity {
        return Ok(result);
    }

    let resolved = rehydrate_body(
        &response.body,
        response.content_type(),
        result.etag.as_deref(),
        operation.resolver(),
        ctx,
    )?;

    if operation.kind() == OperationKind::Insert {
        let timestamp = serde_json::from_slice::<serde_json::Value>(&response.body)
            .ok()
            .and_then(|v| v.get(properties::TIMESTAMP)?.as_str().and_then(parse_datetime));
        if timestamp.is_some() {
            operation.entity_mut().timestamp = timestamp;
        }
    }

    result.result = Some(resolved);
    Ok(result)
}
