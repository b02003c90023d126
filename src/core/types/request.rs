//! HTTP request handed to the transport.

use bytes::Bytes;
use std::collections::BTreeMap;

/// A fully built HTTP request, ready for signing and sending.
#[derive(Clone, Debug, Default)]
pub struct TableRequest {
    pub method: String,
    pub uri: String,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl TableRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        TableRequest {
            method: method.into(),
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
