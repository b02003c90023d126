//! Batch response reader.
//!
//! Line-oriented state machine that splits a multipart/mixed batch response
//! into its HTTP parts. The reader knows nothing about operations; it only
//! yields [`BatchPart`]s in wire order.
//!
//! # Parsing Flow
//!
//! 1. **SkipPreamble**: skip everything up to the outer batch boundary
//! 2. **FindStatusLine**: skip MIME headers and boundaries until `HTTP/1.1 <status> <reason>`
//! 3. **ReadHeaders**: collect part headers until the blank line
//! 4. **ReadBody**: collect the body up to the next boundary (skipped for 204)
//! 5. **SkipTrailer**: skip to the next boundary, or stop at the closing batch boundary
//!
//! ```text
//! --batchresponse_1
//! Content-Type: multipart/mixed; boundary=changesetresponse_2
//!
//! --changesetresponse_2
//! Content-Type: application/http
//! Content-Transfer-Encoding: binary
//!
//! HTTP/1.1 204 No Content
//! ETag: W/"datetime'2024-01-01T00%3A00%3A00Z'"
//!
//! --changesetresponse_2--
//! --batchresponse_1--
//! ```
//!
//! End of stream inside the headers or the body of a part is a malformed
//! response; end of stream between parts ends the read.

use crate::core::error::{Result, TableError};
use crate::core::protocol::constants::headers;
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::io::BufRead;

static STATUS_LINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^HTTP/\d(?:\.\d)? (\d{3})(?: (.*))?$").unwrap());

/// Position of the reader in the response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    SkipPreamble,
    FindStatusLine,
    ReadHeaders,
    ReadBody,
    SkipTrailer,
    Done,
}

/// One HTTP response embedded in the batch response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchPart {
    pub status: u16,
    pub reason: String,
    /// Header names are lowercased.
    pub headers: BTreeMap<String, String>,
    pub body: Option<Bytes>,
}

impl BatchPart {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn etag(&self) -> Option<&str> {
        self.header(headers::ETAG).filter(|v| !v.is_empty())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(headers::CONTENT_TYPE)
    }
}

/// Parse `HTTP/1.1 <status> <reason>`.
pub fn parse_status_line(line: &str) -> Option<(u16, String)> {
    let captures = STATUS_LINE_REGEX.captures(line.trim_end())?;
    let status = captures.get(1)?.as_str().parse().ok()?;
    let reason = captures
        .get(2)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    Some((status, reason))
}

/// Pull reader over the parts of a batch response.
pub struct PartReader<R> {
    reader: R,
    state: ReadState,
    /// Outer boundary, announced up front or learned from the first delimiter line.
    batch_boundary: Option<String>,
    pending: Option<String>,
    line_number: usize,
}

impl<R: BufRead> PartReader<R> {
    pub fn new(reader: R) -> Self {
        PartReader {
            reader,
            state: ReadState::SkipPreamble,
            batch_boundary: None,
            pending: None,
            line_number: 0,
        }
    }

    /// Reader that requires the first delimiter to be `--<boundary>`.
    pub fn with_boundary(reader: R, boundary: impl Into<String>) -> Self {
        PartReader {
            batch_boundary: Some(boundary.into()),
            ..Self::new(reader)
        }
    }

    pub fn state(&self) -> ReadState {
        self.state
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read the next part, or `None` once the envelope is exhausted.
    pub fn next_part(&mut self) -> Result<Option<BatchPart>> {
        let mut status = 0;
        let mut reason = String::new();
        let mut headers = BTreeMap::new();
        let mut body: Vec<String> = Vec::new();

        loop {
            match self.state {
                ReadState::SkipPreamble => match self.read_line()? {
                    Some(line) if line.starts_with("--") => {
                        let found = line[2..].trim_end().to_string();
                        if let Some(expected) = &self.batch_boundary {
                            if *expected != found {
                                return Err(self.malformed(format!(
                                    "expected boundary '{}', found '{}'",
                                    expected, found
                                )));
                            }
                        } else {
                            self.batch_boundary = Some(found);
                        }
                        self.state = ReadState::FindStatusLine;
                    }
                    Some(_) => {}
                    None => {
                        return Err(TableError::MalformedResponse(
                            "no batch boundary found in response".to_string(),
                        ))
                    }
                },
                ReadState::FindStatusLine => match self.read_line()? {
                    Some(line) => {
                        if let Some((code, text)) = parse_status_line(&line) {
                            status = code;
                            reason = text;
                            self.state = ReadState::ReadHeaders;
                        } else if self.is_batch_end(&line) {
                            self.state = ReadState::Done;
                        }
                    }
                    None => self.state = ReadState::Done,
                },
                ReadState::ReadHeaders => match self.read_line()? {
                    Some(line) if line.trim().is_empty() => {
                        if status == 204 {
                            return Ok(Some(self.finish_part(status, reason, headers, body)));
                        }
                        self.state = ReadState::ReadBody;
                    }
                    Some(line) => {
                        let (name, value) = line.split_once(':').ok_or_else(|| {
                            self.malformed(format!("invalid part header '{}'", line))
                        })?;
                        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
                    }
                    None => return Err(self.malformed("end of stream inside part headers")),
                },
                ReadState::ReadBody => match self.read_line()? {
                    Some(line) if line.starts_with("--") => {
                        self.pending = Some(line);
                        return Ok(Some(self.finish_part(status, reason, headers, body)));
                    }
                    Some(line) => body.push(line),
                    None => return Err(self.malformed("end of stream inside part body")),
                },
                ReadState::SkipTrailer => match self.read_line()? {
                    Some(line) if self.is_batch_end(&line) => self.state = ReadState::Done,
                    Some(line) if line.starts_with("--") => self.state = ReadState::FindStatusLine,
                    Some(_) => {}
                    None => self.state = ReadState::Done,
                },
                ReadState::Done => return Ok(None),
            }
        }
    }

    fn finish_part(
        &mut self,
        status: u16,
        reason: String,
        headers: BTreeMap<String, String>,
        mut body: Vec<String>,
    ) -> BatchPart {
        self.state = ReadState::SkipTrailer;

        while body.last().map_or(false, |l| l.trim().is_empty()) {
            body.pop();
        }
        let body = if body.is_empty() {
            None
        } else {
            Some(Bytes::from(body.join("\n")))
        };

        BatchPart {
            status,
            reason,
            headers,
            body,
        }
    }

    fn is_batch_end(&self, line: &str) -> bool {
        match &self.batch_boundary {
            Some(boundary) => {
                line.trim_end()
                    .strip_prefix("--")
                    .and_then(|l| l.strip_suffix("--"))
                    == Some(boundary.as_str())
            }
            None => false,
        }
    }

    /// Next line without its terminator, honouring one line of pushback.
    fn read_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;

        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    fn malformed(&self, message: impl AsRef<str>) -> TableError {
        TableError::MalformedResponse(format!(
            "{} (line {}, state {:?})",
            message.as_ref(),
            self.line_number,
            self.state
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const RESPONSE: &str = "--batchresponse_1\r\n\
        Content-Type: multipart/mixed; boundary=changesetresponse_2\r\n\
        \r\n\
        --changesetresponse_2\r\n\
        Content-Type: application/http\r\n\
        Content-Transfer-Encoding: binary\r\n\
        \r\n\
        HTTP/1.1 201 Created\r\n\
        Content-Type: application/json;odata=nometadata;streaming=true;charset=utf-8\r\n\
        ETag: W/\"e1\"\r\n\
        \r\n\
        {\"PartitionKey\":\"p\",\"RowKey\":\"1\",\"x\":5}\r\n\
        --changesetresponse_2\r\n\
        Content-Type: application/http\r\n\
        Content-Transfer-Encoding: binary\r\n\
        \r\n\
        HTTP/1.1 204 No Content\r\n\
        ETag: W/\"e2\"\r\n\
        \r\n\
        --changesetresponse_2--\r\n\
        --batchresponse_1--\r\n";

    fn reader(text: &str) -> PartReader<Cursor<Vec<u8>>> {
        PartReader::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn test_parse_status_line() {
        assert_eq!(
            parse_status_line("HTTP/1.1 204 No Content"),
            Some((204, "No Content".to_string()))
        );
        assert_eq!(parse_status_line("HTTP/1.1 200"), Some((200, String::new())));
        assert_eq!(parse_status_line("Content-Type: application/http"), None);
        assert_eq!(parse_status_line("HTTP/1.1 abc"), None);
    }

    #[test]
    fn test_reads_parts_in_order() {
        let mut parts = reader(RESPONSE);
        assert_eq!(parts.state(), ReadState::SkipPreamble);

        let first = parts.next_part().unwrap().unwrap();
        assert_eq!(first.status, 201);
        assert_eq!(first.reason, "Created");
        assert_eq!(first.etag(), Some("W/\"e1\""));
        assert!(first.content_type().unwrap().contains("nometadata"));
        assert_eq!(
            first.body.as_deref(),
            Some(&b"{\"PartitionKey\":\"p\",\"RowKey\":\"1\",\"x\":5}"[..])
        );

        let second = parts.next_part().unwrap().unwrap();
        assert_eq!(second.status, 204);
        assert_eq!(second.etag(), Some("W/\"e2\""));
        assert!(second.body.is_none());

        assert!(parts.next_part().unwrap().is_none());
        assert_eq!(parts.state(), ReadState::Done);
        assert!(parts.next_part().unwrap().is_none());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut parts = reader(RESPONSE);
        let first = parts.next_part().unwrap().unwrap();
        assert_eq!(first.header("ETAG"), first.header("etag"));
    }

    #[test]
    fn test_query_response_without_changeset() {
        let text = "--batchresponse_9\r\n\
            Content-Type: application/http\r\n\
            Content-Transfer-Encoding: binary\r\n\
            \r\n\
            HTTP/1.1 404 Not Found\r\n\
            Content-Type: application/json\r\n\
            \r\n\
            {\"odata.error\":{\"code\":\"ResourceNotFound\"}}\r\n\
            --batchresponse_9--\r\n";
        let mut parts = reader(text);
        let part = parts.next_part().unwrap().unwrap();
        assert_eq!(part.status, 404);
        assert!(part.body.is_some());
        assert!(parts.next_part().unwrap().is_none());
    }

    #[test]
    fn test_lf_only_line_endings() {
        let text = RESPONSE.replace("\r\n", "\n");
        let mut parts = reader(&text);
        assert_eq!(parts.next_part().unwrap().unwrap().status, 201);
        assert_eq!(parts.next_part().unwrap().unwrap().status, 204);
        assert!(parts.next_part().unwrap().is_none());
    }

    #[test]
    fn test_truncated_headers_are_malformed() {
        let text = "--batchresponse_1\r\nHTTP/1.1 204 No Content\r\nETag: W/\"x\"\r\n";
        let err = reader(text).next_part().unwrap_err();
        assert!(matches!(err, TableError::MalformedResponse(_)));
    }

    #[test]
    fn test_truncated_body_is_malformed() {
        let text = "--batchresponse_1\r\nHTTP/1.1 201 Created\r\n\r\n{\"a\":1}\r\n";
        let err = reader(text).next_part().unwrap_err();
        assert!(matches!(err, TableError::MalformedResponse(_)));
    }

    #[test]
    fn test_missing_boundary_is_malformed() {
        let err = reader("HTTP/1.1 204 No Content\r\n").next_part().unwrap_err();
        assert!(matches!(err, TableError::MalformedResponse(_)));
    }

    #[test]
    fn test_stream_ending_between_parts() {
        let text = "--batchresponse_1\r\nHTTP/1.1 204 No Content\r\n\r\n";
        let mut parts = reader(text);
        assert_eq!(parts.next_part().unwrap().unwrap().status, 204);
        assert!(parts.next_part().unwrap().is_none());
    }

    #[test]
    fn test_announced_boundary() {
        let mut parts =
            PartReader::with_boundary(Cursor::new(RESPONSE.as_bytes().to_vec()), "batchresponse_1");
        assert_eq!(parts.next_part().unwrap().unwrap().status, 201);
        assert_eq!(parts.next_part().unwrap().unwrap().status, 204);
        assert!(parts.next_part().unwrap().is_none());
    }

    #[test]
    fn test_announced_boundary_mismatch() {
        let mut parts =
            PartReader::with_boundary(Cursor::new(RESPONSE.as_bytes().to_vec()), "batchresponse_x");
        let err = parts.next_part().unwrap_err();
        assert!(matches!(err, TableError::MalformedResponse(m) if m.contains("batchresponse_x")));
    }

    #[test]
    fn test_invalid_header_line() {
        let text = "--b\r\nHTTP/1.1 204 No Content\r\nnot a header\r\n\r\n";
        let err = reader(text).next_part().unwrap_err();
        assert!(matches!(err, TableError::MalformedResponse(_)));
    }
}
