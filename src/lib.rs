//! objstream - On-demand object-graph XML pull streams
//!
//! Two symmetric engines over one cursor contract:
//! Write: GraphReader projects a property list as a pull event stream,
//!        delegating each property to a specialized child reader
//! Read:  Decoder rebuilds values from any pull stream under a type
//!        descriptor tree, with xsi:nil and xsi:type handling

pub mod core;
pub mod dom;
pub mod error;
pub mod parser;
pub mod reader;

pub use crate::core::{EventKind, NamespaceScope, PrefixAllocator, QName, SharedScope};
pub use crate::dom::{XmlAttribute, XmlNode};
pub use crate::error::{ParseError, StreamError};
pub use crate::parser::{
    CollectionKind, Decoder, FieldDescriptor, OperationDescriptor, SimpleKind, SimpleValue,
    StatefulReader, StructValue, TypeDescriptor, TypeRegistry, Value,
};
pub use crate::reader::{
    Attr, AttrKey, AttrValue, BeanStream, BinaryValue, EventReader, GraphReader, ObjectGraph,
    Property, PropertyKey, PropertyValue, PullBean, WrappingReader,
};
