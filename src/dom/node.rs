//! Owned Document Fragments
//!
//! A small owned element tree for property values that arrive as pre-built
//! fragments rather than live objects, plus `NodeReader`, the fragment's
//! native pull cursor. `NodeReader` reports a document-start event before
//! the root element, the way foreign tree readers do, so it is always
//! spliced into a parent stream through the wrapping adapter.

use crate::core::{EventKind, QName, SharedScope};
use crate::error::StreamError;
use crate::reader::EventReader;

/// An attribute as carried by a fragment or supplied externally
#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttribute {
    pub name: QName,
    pub value: String,
}

impl XmlAttribute {
    pub fn new(name: QName, value: &str) -> Self {
        XmlAttribute {
            name,
            value: value.to_string(),
        }
    }
}

/// An owned element: name, attributes, mixed content
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
    name: QName,
    attributes: Vec<XmlAttribute>,
    children: Vec<NodeContent>,
}

/// Mixed content of an element
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    Element(XmlNode),
    Text(String),
}

impl XmlNode {
    pub fn new(name: QName) -> Self {
        XmlNode {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Element with a single text child
    pub fn text_element(name: QName, text: &str) -> Self {
        let mut node = XmlNode::new(name);
        node.push_text(text);
        node
    }

    pub fn name(&self) -> &QName {
        &self.name
    }

    pub fn attributes(&self) -> &[XmlAttribute] {
        &self.attributes
    }

    pub fn children(&self) -> &[NodeContent] {
        &self.children
    }

    pub fn set_attribute(&mut self, name: QName, value: &str) {
        self.attributes.push(XmlAttribute::new(name, value));
    }

    pub fn push_child(&mut self, child: XmlNode) {
        self.children.push(NodeContent::Element(child));
    }

    pub fn push_text(&mut self, text: &str) {
        self.children.push(NodeContent::Text(text.to_string()));
    }

    /// The fragment's native reader, positioned on a document-start event
    pub fn reader(&self) -> NodeReader {
        NodeReader::new(self)
    }
}

/// Flattened event over a fragment tree
#[derive(Debug, Clone)]
enum NodeEvent {
    StartDocument,
    Start {
        name: QName,
        attributes: Vec<XmlAttribute>,
    },
    Text(String),
    End(QName),
}

/// Pull cursor over an owned fragment.
///
/// Events are flattened at construction; the tree is the backing store and
/// the reader is a plain index walk over it.
#[derive(Debug)]
pub struct NodeReader {
    events: Vec<NodeEvent>,
    index: usize,
}

impl NodeReader {
    pub fn new(node: &XmlNode) -> Self {
        let mut events = vec![NodeEvent::StartDocument];
        flatten(node, &mut events);
        NodeReader { events, index: 0 }
    }

    fn current(&self) -> &NodeEvent {
        &self.events[self.index]
    }
}

fn flatten(node: &XmlNode, out: &mut Vec<NodeEvent>) {
    out.push(NodeEvent::Start {
        name: node.name.clone(),
        attributes: node.attributes.clone(),
    });
    for child in &node.children {
        match child {
            NodeContent::Element(e) => flatten(e, out),
            NodeContent::Text(t) => out.push(NodeEvent::Text(t.clone())),
        }
    }
    out.push(NodeEvent::End(node.name.clone()));
}

impl EventReader for NodeReader {
    fn next(&mut self) -> Result<EventKind, StreamError> {
        if self.index + 1 >= self.events.len() {
            return Err(StreamError::PastEnd);
        }
        self.index += 1;
        Ok(self.event_type())
    }

    fn event_type(&self) -> EventKind {
        match self.current() {
            NodeEvent::StartDocument => EventKind::StartDocument,
            NodeEvent::Start { .. } => EventKind::StartElement,
            NodeEvent::Text(_) => EventKind::Characters,
            NodeEvent::End(_) => EventKind::EndElement,
        }
    }

    fn has_next(&self) -> bool {
        self.index + 1 < self.events.len()
    }

    fn is_done(&self) -> bool {
        self.index + 1 >= self.events.len()
    }

    fn name(&self) -> Result<QName, StreamError> {
        match self.current() {
            NodeEvent::Start { name, .. } | NodeEvent::End(name) => Ok(name.clone()),
            _ => Err(StreamError::invalid("name")),
        }
    }

    fn text(&self) -> Result<String, StreamError> {
        match self.current() {
            NodeEvent::Text(t) => Ok(t.clone()),
            _ => Err(StreamError::invalid("text")),
        }
    }

    fn attribute_count(&self) -> usize {
        match self.current() {
            NodeEvent::Start { attributes, .. } => attributes.len(),
            _ => 0,
        }
    }

    fn attribute_name(&self, i: usize) -> Result<Option<QName>, StreamError> {
        match self.current() {
            NodeEvent::Start { attributes, .. } => Ok(attributes.get(i).map(|a| a.name.clone())),
            _ => Ok(None),
        }
    }

    fn attribute_value(&self, i: usize) -> Result<Option<String>, StreamError> {
        match self.current() {
            NodeEvent::Start { attributes, .. } => Ok(attributes.get(i).map(|a| a.value.clone())),
            _ => Ok(None),
        }
    }

    fn namespace_count(&self) -> usize {
        0
    }

    fn namespace_prefix(&self, _i: usize) -> Result<Option<String>, StreamError> {
        Ok(None)
    }

    fn namespace_uri(&self, _i: usize) -> Result<Option<String>, StreamError> {
        Ok(None)
    }

    fn resolve_namespace_uri(&self, _prefix: &str) -> Option<String> {
        None
    }

    // the fragment is self-contained; its namespaces are baked into the
    // event list and a parent scope cannot be injected
    fn set_parent_context(&mut self, _parent: SharedScope) {}

    fn init(&mut self) {}
}
