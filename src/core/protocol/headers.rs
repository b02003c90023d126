//! Header values of the batch protocol.
//!
//! # Header Formats
//!
//! | Header | Format | Example |
//! |--------|--------|---------|
//! | Content-Type (batch) | `multipart/mixed; boundary=<token>` | `multipart/mixed; boundary=batch_1f0c…` |
//! | Accept | `application/json;odata=<format>` | `application/json;odata=nometadata` |
//! | Prefer | `return-content` / `return-no-content` | `return-no-content` |
//! | ETag | weak ETag with an embedded timestamp | `W/"datetime'2013-09-24T21%3A38%3A05.3563587Z'"` |

use crate::core::protocol::constants::media;
use crate::core::protocol::property_codec::parse_datetime;
use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;

const ETAG_TIMESTAMP_PREFIX: &str = "W/\"datetime'";
const ETAG_TIMESTAMP_SUFFIX: &str = "'\"";

/// JSON payload shape negotiated through the `Accept` header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PayloadFormat {
    /// Minimal metadata: only non-inferable types are annotated.
    #[default]
    JsonMinimalMetadata,
    /// Full metadata: every value is self-describing.
    JsonFullMetadata,
    /// No metadata: values carry no annotations at all.
    JsonNoMetadata,
}

impl PayloadFormat {
    pub fn accept_header(&self) -> &'static str {
        match self {
            PayloadFormat::JsonMinimalMetadata => "application/json;odata=minimalmetadata",
            PayloadFormat::JsonFullMetadata => "application/json;odata=fullmetadata",
            PayloadFormat::JsonNoMetadata => "application/json;odata=nometadata",
        }
    }
}

/// Whether a part's `Content-Type` announces a no-metadata JSON body.
pub fn is_no_metadata(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .contains(media::NO_METADATA)
}

/// `Content-Type` value of a multipart body delimited by `boundary`.
pub fn multipart_content_type(boundary: &str) -> String {
    format!("{}; boundary={}", media::MULTIPART_MIXED, boundary)
}

/// Extract the `boundary` parameter of a multipart `Content-Type`.
pub fn parse_boundary(content_type: &str) -> Option<&str> {
    content_type.split(';').find_map(|param| {
        let (name, value) = param.trim().split_once('=')?;
        if name.trim().eq_ignore_ascii_case("boundary") {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })
}

/// `Prefer` header value for an insert.
pub fn prefer_header(echo_content: bool) -> &'static str {
    if echo_content {
        media::RETURN_CONTENT
    } else {
        media::RETURN_NO_CONTENT
    }
}

/// Derive the entity timestamp embedded in a service ETag.
///
/// The service issues ETags of the form
/// `W/"datetime'2013-09-24T21%3A38%3A05.3563587Z'"`; any other shape yields `None`.
pub fn parse_etag_timestamp(etag: &str) -> Option<DateTime<Utc>> {
    let encoded = etag
        .strip_prefix(ETAG_TIMESTAMP_PREFIX)?
        .strip_suffix(ETAG_TIMESTAMP_SUFFIX)?;
    let decoded = percent_decode_str(encoded).decode_utf8().ok()?;
    parse_datetime(&decoded)
}
