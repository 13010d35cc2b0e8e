//! Deserialization Engine (read direction)
//!
//! Rebuilds values from a pull event stream under the guidance of a type
//! descriptor tree:
//! - StatefulReader: depth-tracking cursor wrapper
//! - TypeDescriptor / TypeRegistry: schema-derived decode metadata
//! - Decoder: the recursive element/type decoder

pub mod convert;
pub mod decode;
pub mod descriptor;
pub mod stateful;
pub mod value;

pub use convert::convert;
pub use decode::Decoder;
pub use descriptor::{
    AttributeField, CollectionKind, FieldDescriptor, OperationDescriptor, SimpleKind,
    TypeDescriptor, TypeKind, TypeRegistry,
};
pub use stateful::StatefulReader;
pub use value::{SimpleValue, StructValue, Value};
