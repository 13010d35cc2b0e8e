//! DOM Module - owned document fragments
//!
//! Pre-built fragments that ride along in a property list, with their
//! native pull reader.

pub mod node;

pub use node::{NodeContent, NodeReader, XmlAttribute, XmlNode};
