//! Wire-level pieces of the Table batch protocol.

pub mod classify;
pub mod constants;
pub mod error_info;
pub mod formatter;
pub mod headers;
pub mod parser;
pub mod payload;
pub mod property_codec;
pub mod uri;

pub use classify::{classify, expected_status, Classification};
pub use error_info::{parse_extended_error, ExtendedErrorInfo};
pub use formatter::{format_batch, BatchFormatOptions, FormattedBatch};
pub use headers::{parse_etag_timestamp, PayloadFormat};
pub use parser::{parse_status_line, BatchPart, PartReader, ReadState};
pub use payload::{serialize_entity_body, write_entity};
