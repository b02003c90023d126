//! HTTP response returned by the transport.

use crate::core::protocol::constants::headers;
use bytes::Bytes;
use std::collections::BTreeMap;

/// Raw HTTP response: status, headers and the buffered body.
#[derive(Clone, Debug)]
pub struct TableResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl TableResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        TableResponse {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn etag(&self) -> Option<&str> {
        self.header(headers::ETAG).filter(|v| !v.is_empty())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(headers::CONTENT_TYPE)
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

impl Default for TableResponse {
    fn default() -> Self {
        TableResponse {
            status: 200,
            headers: BTreeMap::new(),
            body: Bytes::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_case_insensitive() {
        let response = TableResponse::new(204, "").with_header("ETag", "W/\"1\"");
        assert_eq!(response.header("etag"), Some("W/\"1\""));
        assert_eq!(response.etag(), Some("W/\"1\""));
    }

    #[test]
    fn test_empty_etag_is_absent() {
        let response = TableResponse::new(204, "").with_header("ETag", "");
        assert_eq!(response.etag(), None);
    }

    #[test]
    fn test_default() {
        let response = TableResponse::default();
        assert_eq!(response.status, 200);
        assert_eq!(response.body_str(), Some(""));
    }
}
