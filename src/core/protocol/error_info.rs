//! Extended error information of failed parts.
//!
//! The service describes a failed operation in the part body, either as JSON
//!
//! ```text
//! {"odata.error":{"code":"EntityAlreadyExists","message":{"lang":"en-US","value":"1:The specified entity already exists."}}}
//! ```
//!
//! or as XML (`<error><code/><message/></error>`, any casing and namespace
//! prefix). Inside a changeset the message is prefixed with the zero-based
//! index of the failing operation.

use crate::core::protocol::constants::media;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

/// Error code and message reported by the service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtendedErrorInfo {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ExtendedErrorInfo {
    /// Index of the failing operation carried by the message prefix.
    pub fn operation_index(&self) -> Option<usize> {
        self.message.as_deref().and_then(operation_index)
    }

    /// Message with the index prefix removed.
    pub fn plain_message(&self) -> Option<&str> {
        let message = self.message.as_deref()?;
        match message.split_once(':') {
            Some((prefix, rest)) if is_index(prefix) => Some(rest),
            _ => Some(message),
        }
    }
}

/// Parse the error body of a failed part.
///
/// Returns `None` when the body is empty or in neither known shape.
pub fn parse_extended_error(body: &[u8], content_type: Option<&str>) -> Option<ExtendedErrorInfo> {
    let text = std::str::from_utf8(body).ok()?.trim();
    if text.is_empty() {
        return None;
    }

    let looks_like_json = match content_type {
        Some(ct) => ct.to_ascii_lowercase().starts_with(media::APPLICATION_JSON),
        None => text.starts_with('{'),
    };

    if looks_like_json {
        parse_json(text)
    } else {
        parse_xml(text)
    }
}

/// Leading `<digits>:` of an error message.
pub fn operation_index(message: &str) -> Option<usize> {
    let (prefix, _) = message.split_once(':')?;
    if is_index(prefix) {
        prefix.parse().ok()
    } else {
        None
    }
}

fn is_index(prefix: &str) -> bool {
    !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Deserialize)]
struct JsonErrorEnvelope {
    #[serde(rename = "odata.error", alias = "error")]
    error: JsonError,
}

#[derive(Deserialize)]
struct JsonError {
    code: Option<String>,
    message: Option<JsonErrorMessage>,
}

/// Plain string, or the localized `{"lang":..,"value":..}` form.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonErrorMessage {
    Plain(String),
    Localized { value: String },
}

fn parse_json(text: &str) -> Option<ExtendedErrorInfo> {
    let envelope: JsonErrorEnvelope = serde_json::from_str(text).ok()?;
    let message = envelope.error.message.map(|m| match m {
        JsonErrorMessage::Plain(s) => s,
        JsonErrorMessage::Localized { value } => value,
    });

    Some(ExtendedErrorInfo {
        code: envelope.error.code,
        message,
    })
}

fn parse_xml(text: &str) -> Option<ExtendedErrorInfo> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut info = ExtendedErrorInfo::default();
    let mut seen_error = false;
    let mut current = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                current = String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase();
                if current == "error" {
                    seen_error = true;
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().ok()?.to_string();
                match current.as_str() {
                    "code" if info.code.is_none() => info.code = Some(text),
                    "message" if info.message.is_none() => info.message = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current.clear(),
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }

    seen_error.then_some(info)
}
