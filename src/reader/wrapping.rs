//! Wrapping Adapter
//!
//! Adapts any foreign pull reader to the delegation contract. Every
//! operation forwards 1:1, except that a leading document-start event is
//! stripped at construction so the splice into a parent's stream never
//! re-introduces a document boundary. The wrapped reader's own namespace
//! handling is authoritative, so attaching a parent scope is a no-op.

use crate::core::{EventKind, QName, SharedScope};
use crate::error::StreamError;
use crate::reader::EventReader;

/// Foreign-reader adapter
pub struct WrappingReader {
    inner: Box<dyn EventReader>,
}

impl WrappingReader {
    /// Wrap a reader, skipping a leading document-start if present
    pub fn new(mut inner: Box<dyn EventReader>) -> Result<Self, StreamError> {
        if inner.event_type() == EventKind::StartDocument {
            inner.next()?;
        }
        Ok(WrappingReader { inner })
    }
}

impl EventReader for WrappingReader {
    fn next(&mut self) -> Result<EventKind, StreamError> {
        self.inner.next()
    }

    fn event_type(&self) -> EventKind {
        self.inner.event_type()
    }

    fn has_next(&self) -> bool {
        self.inner.has_next()
    }

    fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    fn name(&self) -> Result<QName, StreamError> {
        self.inner.name()
    }

    fn text(&self) -> Result<String, StreamError> {
        self.inner.text()
    }

    fn attribute_count(&self) -> usize {
        self.inner.attribute_count()
    }

    fn attribute_name(&self, i: usize) -> Result<Option<QName>, StreamError> {
        self.inner.attribute_name(i)
    }

    fn attribute_value(&self, i: usize) -> Result<Option<String>, StreamError> {
        self.inner.attribute_value(i)
    }

    fn namespace_count(&self) -> usize {
        self.inner.namespace_count()
    }

    fn namespace_prefix(&self, i: usize) -> Result<Option<String>, StreamError> {
        self.inner.namespace_prefix(i)
    }

    fn namespace_uri(&self, i: usize) -> Result<Option<String>, StreamError> {
        self.inner.namespace_uri(i)
    }

    fn resolve_namespace_uri(&self, prefix: &str) -> Option<String> {
        self.inner.resolve_namespace_uri(prefix)
    }

    fn set_parent_context(&mut self, _parent: SharedScope) {}

    fn init(&mut self) {}
}
