//! OData Entity Data Model scalar types.
//!
//! JSON cannot tell an `Int64` from an `Int32`, or a GUID from a string, so
//! the Table service annotates such values with `<name>@odata.type`. The
//! [`EdmType`] enum is the closed set of scalar types the service accepts.
//!
//! | Type | Wire name | Needs annotation |
//! |------|-----------|------------------|
//! | `Binary` | `Edm.Binary` | yes |
//! | `Boolean` | `Edm.Boolean` | no |
//! | `DateTime` | `Edm.DateTime` | yes |
//! | `Double` | `Edm.Double` | only for non-finite values |
//! | `Guid` | `Edm.Guid` | yes |
//! | `Int32` | `Edm.Int32` | no |
//! | `Int64` | `Edm.Int64` | yes |
//! | `String` | `Edm.String` | no |

use std::fmt;
use std::str::FromStr;

/// OData EDM scalar type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdmType {
    Binary,
    Boolean,
    DateTime,
    Double,
    Guid,
    Int32,
    Int64,
    String,
}

impl EdmType {
    /// Wire name used in `@odata.type` annotations.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdmType::Binary => "Edm.Binary",
            EdmType::Boolean => "Edm.Boolean",
            EdmType::DateTime => "Edm.DateTime",
            EdmType::Double => "Edm.Double",
            EdmType::Guid => "Edm.Guid",
            EdmType::Int32 => "Edm.Int32",
            EdmType::Int64 => "Edm.Int64",
            EdmType::String => "Edm.String",
        }
    }

    /// Whether a value of this type always travels with a type annotation.
    #[inline]
    pub fn requires_annotation(&self) -> bool {
        matches!(
            self,
            EdmType::Binary | EdmType::DateTime | EdmType::Guid | EdmType::Int64
        )
    }
}

impl fmt::Display for EdmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdmType {
    type Err = String;

    /// Parses both the annotated form (`Edm.Int64`) and the bare name (`Int64`).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.strip_prefix("Edm.").unwrap_or(s);
        match name {
            "Binary" => Ok(EdmType::Binary),
            "Boolean" => Ok(EdmType::Boolean),
            "DateTime" => Ok(EdmType::DateTime),
            "Double" => Ok(EdmType::Double),
            "Guid" => Ok(EdmType::Guid),
            "Int32" => Ok(EdmType::Int32),
            "Int64" => Ok(EdmType::Int64),
            "String" => Ok(EdmType::String),
            other => Err(format!("Unknown EDM type: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(EdmType::Int64.as_str(), "Edm.Int64");
        assert_eq!(EdmType::DateTime.to_string(), "Edm.DateTime");
    }

    #[test]
    fn test_parse_annotated_and_bare() {
        assert_eq!("Edm.Guid".parse::<EdmType>().unwrap(), EdmType::Guid);
        assert_eq!("Binary".parse::<EdmType>().unwrap(), EdmType::Binary);
        assert!("Edm.Decimal".parse::<EdmType>().is_err());
    }

    #[test]
    fn test_requires_annotation() {
        assert!(EdmType::Int64.requires_annotation());
        assert!(EdmType::Binary.requires_annotation());
        assert!(!EdmType::Int32.requires_annotation());
        assert!(!EdmType::String.requires_annotation());
        assert!(!EdmType::Double.requires_annotation());
    }
}
