//! Simple-Type Conversion
//!
//! A closed table from [`SimpleKind`] to text conversion, replacing
//! name-based converter dispatch with one exhaustive match. Conversion
//! failures keep their original cause.

use chrono::DateTime;

use crate::error::ParseError;
use crate::parser::descriptor::SimpleKind;
use crate::parser::value::SimpleValue;

/// Convert element or attribute text to its simple value
pub fn convert(kind: SimpleKind, text: &str) -> Result<SimpleValue, ParseError> {
    let trimmed = text.trim();
    match kind {
        SimpleKind::String => Ok(SimpleValue::String(text.to_string())),
        SimpleKind::Int => trimmed
            .parse()
            .map(SimpleValue::Int)
            .map_err(|e| ParseError::conversion(text, "int", e)),
        SimpleKind::Long => trimmed
            .parse()
            .map(SimpleValue::Long)
            .map_err(|e| ParseError::conversion(text, "long", e)),
        SimpleKind::Float => trimmed
            .parse()
            .map(SimpleValue::Float)
            .map_err(|e| ParseError::conversion(text, "float", e)),
        SimpleKind::Double => trimmed
            .parse()
            .map(SimpleValue::Double)
            .map_err(|e| ParseError::conversion(text, "double", e)),
        SimpleKind::Bool => match trimmed {
            "true" | "1" => Ok(SimpleValue::Bool(true)),
            "false" | "0" => Ok(SimpleValue::Bool(false)),
            _ => Err(ParseError::conversion_plain(text, "boolean")),
        },
        SimpleKind::DateTime => DateTime::parse_from_rfc3339(trimmed)
            .map(SimpleValue::DateTime)
            .map_err(|e| ParseError::conversion(text, "dateTime", e)),
    }
}
