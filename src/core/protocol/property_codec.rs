//! Property value codec.
//!
//! Converts a single [`EntityProperty`] to and from its JSON wire form,
//! applying OData EDM type annotations.
//!
//! # Encoding Rules
//!
//! | Type | Wire value | Annotation |
//! |------|------------|------------|
//! | `String` | JSON string | none |
//! | `Boolean` | JSON bool | none |
//! | `Int32` | JSON number | none |
//! | `Double` | JSON number (`"NaN"`, `"Infinity"`, `"-Infinity"` as strings) | only for non-finite |
//! | `Int64` | decimal string | `Edm.Int64` |
//! | `Binary` | base64 string | `Edm.Binary` |
//! | `Guid` | hyphenated string | `Edm.Guid` |
//! | `DateTime` | `YYYY-MM-DDTHH:MM:SS.fffffffZ` | `Edm.DateTime` |
//!
//! `Int64` travels as a string because JSON numbers lose precision above 2^53.
//! Date-times carry seven fractional digits (100 ns resolution); finer
//! precision is truncated on encode.
//!
//! Decoding never coerces: a value that does not parse as its target type is
//! reported as [`TableError::PropertyFormat`] naming the property, the raw
//! value and the type.

use crate::core::error::{Result, TableError};
use crate::core::types::{EdmType, EntityProperty};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::{Number, Value};
use uuid::Uuid;

const NAN: &str = "NaN";
const INFINITY: &str = "Infinity";
const NEG_INFINITY: &str = "-Infinity";

/// Encode a property into its wire value and optional type annotation.
///
/// Returns `None` for null values, which are never written.
pub fn encode(value: &EntityProperty) -> Option<(Value, Option<EdmType>)> {
    let wire = match value {
        EntityProperty::Null(_) => return None,
        EntityProperty::String(s) => Value::String(s.clone()),
        EntityProperty::Boolean(b) => Value::Bool(*b),
        EntityProperty::Int32(i) => Value::from(*i),
        EntityProperty::Double(d) => match Number::from_f64(*d) {
            Some(n) => Value::Number(n),
            None => {
                let wire = Value::String(format_non_finite(*d).to_string());
                return Some((wire, Some(EdmType::Double)));
            }
        },
        EntityProperty::Int64(i) => Value::String(i.to_string()),
        EntityProperty::Binary(b) => {
            Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
        EntityProperty::Guid(g) => Value::String(g.to_string()),
        EntityProperty::DateTime(dt) => Value::String(format_datetime(dt)),
    };

    let edm_type = value.edm_type();
    Some((wire, edm_type.requires_annotation().then_some(edm_type)))
}

/// Decode a wire value as `edm_type`.
///
/// `property` is only used to name the offending property in errors.
pub fn decode(property: &str, value: &Value, edm_type: EdmType) -> Result<EntityProperty> {
    let invalid = || TableError::property_format(property, raw_text(value), edm_type);

    match value {
        Value::Null => Ok(EntityProperty::Null(edm_type)),
        Value::String(s) => decode_str(property, s, edm_type),
        Value::Bool(b) => match edm_type {
            EdmType::Boolean => Ok(EntityProperty::Boolean(*b)),
            EdmType::String => Ok(EntityProperty::String(b.to_string())),
            _ => Err(invalid()),
        },
        Value::Number(n) => match edm_type {
            EdmType::Int32 => n
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .map(EntityProperty::Int32)
                .ok_or_else(invalid),
            EdmType::Int64 => n.as_i64().map(EntityProperty::Int64).ok_or_else(invalid),
            EdmType::Double => n.as_f64().map(EntityProperty::Double).ok_or_else(invalid),
            EdmType::String => Ok(EntityProperty::String(n.to_string())),
            _ => Err(invalid()),
        },
        Value::Array(_) | Value::Object(_) => Err(invalid()),
    }
}

/// Decode the string form of a value as `edm_type`.
pub fn decode_str(property: &str, raw: &str, edm_type: EdmType) -> Result<EntityProperty> {
    let invalid = || TableError::property_format(property, raw, edm_type);

    let value = match edm_type {
        EdmType::String => EntityProperty::String(raw.to_string()),
        EdmType::Binary => EntityProperty::Binary(
            base64::engine::general_purpose::STANDARD
                .decode(raw)
                .map_err(|_| invalid())?,
        ),
        EdmType::Boolean => match raw {
            "true" | "True" => EntityProperty::Boolean(true),
            "false" | "False" => EntityProperty::Boolean(false),
            _ => return Err(invalid()),
        },
        EdmType::DateTime => EntityProperty::DateTime(parse_datetime(raw).ok_or_else(invalid)?),
        EdmType::Double => EntityProperty::Double(match raw {
            NAN => f64::NAN,
            INFINITY => f64::INFINITY,
            NEG_INFINITY => f64::NEG_INFINITY,
            _ => raw.parse::<f64>().map_err(|_| invalid())?,
        }),
        EdmType::Guid => EntityProperty::Guid(Uuid::parse_str(raw).map_err(|_| invalid())?),
        EdmType::Int32 => EntityProperty::Int32(raw.parse::<i32>().map_err(|_| invalid())?),
        EdmType::Int64 => EntityProperty::Int64(raw.parse::<i64>().map_err(|_| invalid())?),
    };
    Ok(value)
}

/// EDM type implied by an unannotated JSON value.
///
/// Strings stay strings; integers that fit in 32 bits are `Int32`, larger ones
/// `Int64`; other numbers are `Double`.
pub fn infer(value: &Value) -> EdmType {
    match value {
        Value::Bool(_) => EdmType::Boolean,
        Value::Number(n) => match n.as_i64() {
            Some(i) if i32::try_from(i).is_ok() => EdmType::Int32,
            Some(_) => EdmType::Int64,
            None => EdmType::Double,
        },
        _ => EdmType::String,
    }
}

/// Round-trip date-time format with seven fractional digits.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    format!(
        "{}.{:07}Z",
        dt.format("%Y-%m-%dT%H:%M:%S"),
        dt.timestamp_subsec_nanos() / 100
    )
}

/// Parse an RFC 3339 date-time into UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn format_non_finite(d: f64) -> &'static str {
    if d.is_nan() {
        NAN
    } else if d.is_sign_positive() {
        INFINITY
    } else {
        NEG_INFINITY
    }
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
