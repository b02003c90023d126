//! Resource URIs of batch parts.
//!
//! Each part of a changeset addresses its entity with an absolute URI:
//!
//! ```text
//! POST   https://acct.table.core.windows.net/people HTTP/1.1
//! DELETE https://acct.table.core.windows.net/people(PartitionKey='p',RowKey='2') HTTP/1.1
//! GET    https://acct.table.core.windows.net/people(PartitionKey='p',RowKey='1')?$select=Name HTTP/1.1
//! ```

use crate::core::protocol::constants::properties;
use crate::core::types::TableOperation;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped on the part request line.
///
/// The resource path keeps its reserved characters (`/ ( ) ' , = ? $ :`), so
/// only characters that can never appear unescaped in a URI are encoded.
const RESOURCE_URI: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Build the unescaped resource URI of an operation.
///
/// Inserts address the table itself; every other kind addresses the entity
/// by key. A retrieve with a projection always selects the system columns.
pub fn resource_uri(base_uri: &str, table_name: &str, operation: &TableOperation) -> String {
    let mut uri = format!("{}/{}", base_uri.trim_end_matches('/'), table_name);

    if operation.kind().is_keyed() {
        uri.push_str(&format!(
            "(PartitionKey='{}',RowKey='{}')",
            escape_key(operation.partition_key()),
            escape_key(operation.row_key())
        ));
    }

    if let Some(columns) = operation.select_columns() {
        let mut selected: Vec<&str> = columns.iter().map(String::as_str).collect();
        for system in [
            properties::PARTITION_KEY,
            properties::ROW_KEY,
            properties::TIMESTAMP,
        ] {
            if !selected.contains(&system) {
                selected.push(system);
            }
        }
        uri.push_str("?$select=");
        uri.push_str(&selected.join(","));
    }

    uri
}

/// Percent-escape a resource URI for the part request line.
///
/// A literal `%` must reach the service unescaped, so the `%25` produced by
/// the escaping pass is collapsed back to `%`.
pub fn escape_resource_uri(uri: &str) -> String {
    utf8_percent_encode(uri, RESOURCE_URI)
        .to_string()
        .replace("%25", "%")
}

/// Single quotes inside key literals are doubled.
fn escape_key(key: &str) -> String {
    key.replace('\'', "''")
}
