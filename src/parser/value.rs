//! Decoded Values
//!
//! The decoder's output model: a small closed tree mirroring what the
//! wire can carry. Struct fields keep descriptor order; map entries keep
//! wire order.

use chrono::{DateTime, FixedOffset};

use crate::core::QName;

/// A decoded simple value
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleValue {
    String(String),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    DateTime(DateTime<FixedOffset>),
}

/// A decoded element value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Simple(SimpleValue),
    Array(Vec<Value>),
    Map(Vec<(SimpleValue, Value)>),
    Struct(StructValue),
}

/// A decoded bean: its resolved type plus attribute and field values
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    pub type_name: QName,
    pub attributes: Vec<(QName, SimpleValue)>,
    pub fields: Vec<(QName, Value)>,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The simple value, if this is one
    pub fn as_simple(&self) -> Option<&SimpleValue> {
        match self {
            Value::Simple(s) => Some(s),
            _ => None,
        }
    }

    /// The string content, if this is a simple string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Simple(SimpleValue::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl StructValue {
    /// A field value by local name, descriptor order
    pub fn field(&self, local: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name.local_name() == local)
            .map(|(_, value)| value)
    }

    /// An attribute value by local name
    pub fn attribute(&self, local: &str) -> Option<&SimpleValue> {
        self.attributes
            .iter()
            .find(|(name, _)| name.local_name() == local)
            .map(|(_, value)| value)
    }
}
