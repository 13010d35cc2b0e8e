//! Serialization Engine (write direction)
//!
//! A family of cooperating pull readers that project an in-memory object
//! graph as a single logical event stream, on demand:
//! - GraphReader: the orchestrating state machine over a property list
//! - Leaf readers: fixed small machines for null, text, binary, and
//!   repeated-element values
//! - WrappingReader: adapts foreign readers into the contract

pub mod graph;
pub mod leaf;
pub mod wrapping;

pub use graph::{
    Attr, AttrKey, AttrValue, BeanStream, GraphReader, ObjectGraph, Property, PropertyKey,
    PropertyValue, PullBean,
};
pub use leaf::{
    AttachmentReader, BinaryValue, NullValueReader, RepeatedValueReader, TextValueReader,
};
pub use wrapping::WrappingReader;

use crate::core::{EventKind, QName, SharedScope};
use crate::error::StreamError;

/// The reader contract: a forward-only cursor over start-element,
/// characters, and end-element events.
///
/// A reader is always positioned on exactly one event; it starts on its
/// element's start event without any `next()` call. Accessors are valid
/// only in the states that semantically carry their data and fail with
/// [`StreamError::InvalidState`] elsewhere, except that leaf readers with
/// no attributes tolerate attribute queries with `Ok(None)`.
pub trait EventReader {
    /// Advance to the next event. Fatal once the final end-element has
    /// been produced.
    fn next(&mut self) -> Result<EventKind, StreamError>;

    /// The event the cursor is currently positioned on
    fn event_type(&self) -> EventKind;

    /// Whether another event can be produced
    fn has_next(&self) -> bool;

    /// Whether the reader has produced its final end-element
    fn is_done(&self) -> bool;

    /// Name of the current element event
    fn name(&self) -> Result<QName, StreamError>;

    /// Text of the current characters event
    fn text(&self) -> Result<String, StreamError>;

    /// Number of attributes on the current start element
    fn attribute_count(&self) -> usize;

    /// Name of the i-th attribute; `Ok(None)` when out of range
    fn attribute_name(&self, i: usize) -> Result<Option<QName>, StreamError>;

    /// Value of the i-th attribute; `Ok(None)` when out of range
    fn attribute_value(&self, i: usize) -> Result<Option<String>, StreamError>;

    /// Look an attribute up by name. A `None` URI matches on local name
    /// alone.
    fn attribute_value_by_name(&self, uri: Option<&str>, local: &str) -> Option<String> {
        for i in 0..self.attribute_count() {
            let Ok(Some(name)) = self.attribute_name(i) else {
                continue;
            };
            if name.local_name() == local && uri.map_or(true, |u| u == name.namespace_uri()) {
                return self.attribute_value(i).ok().flatten();
            }
        }
        None
    }

    /// Number of namespace declarations on the current start element
    fn namespace_count(&self) -> usize;

    /// Prefix of the i-th declaration; `Ok(None)` when out of range
    fn namespace_prefix(&self, i: usize) -> Result<Option<String>, StreamError>;

    /// URI of the i-th declaration; `Ok(None)` when out of range
    fn namespace_uri(&self, i: usize) -> Result<Option<String>, StreamError>;

    /// Resolve a prefix through the reader's in-scope namespaces
    fn resolve_namespace_uri(&self, prefix: &str) -> Option<String>;

    /// Attach the delegating parent's namespace scope. Must happen before
    /// [`EventReader::init`].
    fn set_parent_context(&mut self, parent: SharedScope);

    /// Populate the reader's own namespace scope. Split from construction
    /// because the parent scope cannot be assumed to exist at that point.
    fn init(&mut self);

    fn is_start_element(&self) -> bool {
        self.event_type() == EventKind::StartElement
    }

    fn is_end_element(&self) -> bool {
        self.event_type() == EventKind::EndElement
    }

    fn is_characters(&self) -> bool {
        self.event_type() == EventKind::Characters
    }
}
