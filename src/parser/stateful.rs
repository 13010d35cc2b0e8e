//! Stateful Cursor Wrapper
//!
//! Layers a tag-name depth stack over any pull reader, so the decoder can
//! ask "am I back at the depth I started from" without trusting the
//! foreign reader's own bookkeeping. Built fresh (strict end-tag
//! matching) or mid-stream (the stack has no history for the enclosing
//! elements, so the checks are skipped).

use crate::core::{EventKind, QName};
use crate::error::ParseError;
use crate::reader::EventReader;

/// Depth-tracking wrapper over a pull reader
pub struct StatefulReader<R: EventReader> {
    inner: R,
    stack: Vec<QName>,
    prior_access: bool,
}

impl<R: EventReader> StatefulReader<R> {
    /// Wrap a reader that has not been advanced yet. End tags are checked
    /// strictly against the stack.
    pub fn fresh(inner: R) -> Self {
        Self::build(inner, false)
    }

    /// Wrap a reader that may already be positioned deep inside a
    /// document. The stack has no history for the enclosing elements, so
    /// pops are lenient.
    pub fn mid_stream(inner: R) -> Self {
        Self::build(inner, true)
    }

    fn build(inner: R, prior_access: bool) -> Self {
        let mut stack = Vec::new();
        // the current event was never seen by next(); account for it
        if inner.event_type() == EventKind::StartElement {
            if let Ok(name) = inner.name() {
                stack.push(name);
            }
        }
        StatefulReader {
            inner,
            stack,
            prior_access,
        }
    }

    /// Whether the wrapped reader was already mid-stream when wrapped
    pub fn prior_access(&self) -> bool {
        self.prior_access
    }

    /// Current nesting depth: the number of unclosed start tags seen
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn next(&mut self) -> Result<EventKind, ParseError> {
        let event = self.inner.next().map_err(ParseError::from)?;
        match event {
            EventKind::StartElement => {
                self.stack.push(self.inner.name()?);
            }
            EventKind::EndElement => {
                let name = self.inner.name()?;
                match self.stack.pop() {
                    Some(open) if open == name => {}
                    // mid-stream wrapping has no history to check against
                    _ if self.prior_access => {}
                    _ => return Err(ParseError::UnbalancedEnd(name.to_string())),
                }
            }
            _ => {}
        }
        Ok(event)
    }

    pub fn event_type(&self) -> EventKind {
        self.inner.event_type()
    }

    pub fn has_next(&self) -> bool {
        self.inner.has_next()
    }

    pub fn is_start_element(&self) -> bool {
        self.inner.is_start_element()
    }

    pub fn is_end_element(&self) -> bool {
        self.inner.is_end_element()
    }

    pub fn is_characters(&self) -> bool {
        self.inner.is_characters()
    }

    pub fn name(&self) -> Result<QName, ParseError> {
        Ok(self.inner.name()?)
    }

    pub fn text(&self) -> Result<String, ParseError> {
        Ok(self.inner.text()?)
    }

    pub fn attribute_value_by_name(&self, uri: Option<&str>, local: &str) -> Option<String> {
        self.inner.attribute_value_by_name(uri, local)
    }

    pub fn resolve_namespace_uri(&self, prefix: &str) -> Option<String> {
        self.inner.resolve_namespace_uri(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlNode;

    fn sample() -> XmlNode {
        let mut root = XmlNode::new(QName::local("outer"));
        root.push_child(XmlNode::text_element(QName::local("inner"), "x"));
        root
    }

    #[test]
    fn test_depth_tracks_tag_stack() {
        let node = sample();
        let mut reader = StatefulReader::fresh(node.reader());
        assert_eq!(reader.depth(), 0);

        reader.next().unwrap(); // <outer>
        assert_eq!(reader.depth(), 1);
        reader.next().unwrap(); // <inner>
        assert_eq!(reader.depth(), 2);
        reader.next().unwrap(); // characters
        assert_eq!(reader.depth(), 2);
        reader.next().unwrap(); // </inner>
        assert_eq!(reader.depth(), 1);
        reader.next().unwrap(); // </outer>
        assert_eq!(reader.depth(), 0);
    }

    #[test]
    fn test_fresh_seeds_current_start_element() {
        use crate::reader::{GraphReader, Property, PropertyValue};

        // a graph reader is already positioned on its root start element
        let graph = GraphReader::new(
            QName::local("rec"),
            vec![Property::local("v", PropertyValue::Text("1".to_string()))],
            vec![],
        );
        let reader = StatefulReader::fresh(graph);
        assert_eq!(reader.depth(), 1);
    }

    #[test]
    fn test_mid_stream_tolerates_unseen_ancestors() {
        let node = sample();
        let mut native = node.reader();
        // advance into the document before wrapping
        native.next().unwrap(); // <outer>
        native.next().unwrap(); // <inner>
        native.next().unwrap(); // characters

        let mut reader = StatefulReader::mid_stream(native);
        assert_eq!(reader.depth(), 0);
        reader.next().unwrap(); // </inner> pops nothing, no error
        reader.next().unwrap(); // </outer>
        assert_eq!(reader.depth(), 0);
    }
}
