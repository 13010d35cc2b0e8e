//! Orchestrating Graph Reader
//!
//! `GraphReader` projects one object's property list as a pull event
//! stream: its own start element, then each property's sub-stream spliced
//! in through a delegate reader, then its own end element. Nothing is
//! serialized ahead of time; a delegate is built only when the cursor
//! reaches its property.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::core::{EventKind, NamespaceScope, PrefixAllocator, QName, SharedScope};
use crate::dom::{XmlAttribute, XmlNode};
use crate::error::StreamError;
use crate::reader::leaf::{
    AttachmentReader, BinaryValue, NullValueReader, RepeatedValueReader, TextValueReader,
};
use crate::reader::wrapping::WrappingReader;
use crate::reader::EventReader;

/// How a property is named in the stream
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    /// A fully qualified element name
    Qualified(QName),
    /// A bare local name, no namespace
    Local(String),
    /// No element at all; the value is inline character data
    Text,
    /// The value carries its own name (fragments only)
    Node,
}

/// What a property holds
pub enum PropertyValue {
    /// An absent value, rendered as an empty element with `xsi:nil="true"`
    Null,
    /// A simple value already in lexical form
    Text(String),
    /// A binary attachment, stringified to base64 on demand
    Binary(BinaryValue),
    /// A homogeneous sequence; entries repeat the property's element name
    Array(Vec<PropertyValue>),
    /// A nested object that can produce its own compliant reader
    Bean(Box<dyn PullBean>),
    /// A pre-built document fragment with its own native reader
    Fragment(XmlNode),
    /// An arbitrary object exposed only as a property list
    Opaque(Box<dyn ObjectGraph>),
}

/// One (key, value) pair in an object's property list
pub struct Property {
    pub key: PropertyKey,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(key: PropertyKey, value: PropertyValue) -> Self {
        Property { key, value }
    }

    pub fn qualified(name: QName, value: PropertyValue) -> Self {
        Property::new(PropertyKey::Qualified(name), value)
    }

    pub fn local(name: &str, value: PropertyValue) -> Self {
        Property::new(PropertyKey::Local(name.to_string()), value)
    }

    pub fn text(value: &str) -> Self {
        Property::new(PropertyKey::Text, PropertyValue::Text(value.to_string()))
    }

    pub fn node(fragment: XmlNode) -> Self {
        Property::new(PropertyKey::Node, PropertyValue::Fragment(fragment))
    }
}

/// A nested object that serializes itself by handing out a reader
pub trait PullBean {
    /// Build a reader positioned on `name`'s start element
    fn pull_reader(&self, name: &QName) -> BeanStream;
}

/// What a bean hands back: its own compliant reader, which joins the
/// parent's namespace scope chain, or a foreign reader that is adapted
/// as-is.
pub enum BeanStream {
    Native(Box<dyn EventReader>),
    Foreign(Box<dyn EventReader>),
}

/// Fallback projection for values with no dedicated representation
pub trait ObjectGraph {
    /// Decompose into a property list for a nested orchestrating reader
    fn properties(&self) -> Vec<Property>;
}

/// How an attribute on the root element is named
#[derive(Debug, Clone, PartialEq)]
pub enum AttrKey {
    /// A bare local name
    Local(String),
    /// A fully qualified attribute name
    Qualified(QName),
    /// The value object carries the name itself
    Foreign,
}

/// What an attribute holds
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A plain string value
    Text(String),
    /// A QName value, rendered `prefix:local` against the in-scope
    /// namespaces when read
    Qualified(QName),
    /// An externally-supplied attribute object, name and value together
    Attribute(XmlAttribute),
}

/// One attribute on the orchestrated element
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub key: AttrKey,
    pub value: AttrValue,
}

impl Attr {
    pub fn new(key: AttrKey, value: AttrValue) -> Self {
        Attr { key, value }
    }

    pub fn local(name: &str, value: &str) -> Self {
        Attr::new(AttrKey::Local(name.to_string()), AttrValue::Text(value.to_string()))
    }

    pub fn qualified(name: QName, value: &str) -> Self {
        Attr::new(AttrKey::Qualified(name), AttrValue::Text(value.to_string()))
    }

    pub fn foreign(attribute: XmlAttribute) -> Self {
        Attr::new(AttrKey::Foreign, AttrValue::Attribute(attribute))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Delegated,
    Text,
    End,
}

/// The orchestrating reader: a four-state machine over a property list.
///
/// In `Start` it reports its own start element with the attributes and
/// namespace declarations accumulated by [`GraphReader::init`]. Each
/// `next()` from `Start` (or from a finished delegate) dispatches the next
/// property to a freshly built delegate and forwards that delegate's
/// events until it is done. When the list runs out the reader produces
/// its own end element and any further `next()` fails.
pub struct GraphReader {
    name: QName,
    properties: VecDeque<Property>,
    attributes: Vec<Attr>,
    state: State,
    child: Option<Box<dyn EventReader>>,
    current_text: String,
    context: SharedScope,
    // prefix -> uri pairs declared on this element, map semantics.
    // RefCell because reading a QName-valued attribute may mint a prefix.
    declared: RefCell<Vec<(String, String)>>,
    // complex-type namespace uri -> stable prefix, shared with nested readers
    type_prefixes: Rc<HashMap<String, String>>,
    allocator: PrefixAllocator,
}

impl GraphReader {
    /// Reader for an element with the given properties and attributes
    pub fn new(name: QName, properties: Vec<Property>, attributes: Vec<Attr>) -> Self {
        Self::with_known_types(name, properties, attributes, &[])
    }

    /// Reader that additionally pre-declares a prefix for each known
    /// complex-type namespace, so `xsi:type` values resolve anywhere in
    /// the stream
    pub fn with_known_types(
        name: QName,
        properties: Vec<Property>,
        attributes: Vec<Attr>,
        known_types: &[QName],
    ) -> Self {
        let allocator = PrefixAllocator::new();
        let mut type_prefixes = HashMap::new();
        let reader = GraphReader {
            name,
            properties: properties.into(),
            attributes,
            state: State::Start,
            child: None,
            current_text: String::new(),
            context: NamespaceScope::shared(),
            declared: RefCell::new(Vec::new()),
            type_prefixes: Rc::new(HashMap::new()),
            allocator: allocator.clone(),
        };
        for ty in known_types {
            if ty.namespace_uri().is_empty() {
                continue;
            }
            let prefix = match ty.prefix() {
                Some(p) => p.to_string(),
                None => allocator.next_prefix(),
            };
            reader.add_to_ns_map(&prefix, ty.namespace_uri());
            type_prefixes.insert(ty.namespace_uri().to_string(), prefix);
        }
        GraphReader {
            type_prefixes: Rc::new(type_prefixes),
            ..reader
        }
    }

    /// Nested reader built mid-stream; shares the outer reader's prefix
    /// allocator and known-type prefixes
    fn nested(
        name: QName,
        properties: Vec<Property>,
        type_prefixes: Rc<HashMap<String, String>>,
        allocator: PrefixAllocator,
    ) -> Self {
        GraphReader {
            name,
            properties: properties.into(),
            attributes: Vec::new(),
            state: State::Start,
            child: None,
            current_text: String::new(),
            context: NamespaceScope::shared(),
            declared: RefCell::new(Vec::new()),
            type_prefixes,
            allocator,
        }
    }

    /// Bind prefix -> uri in scope and record the declaration on this
    /// element, unless the binding is already in effect
    fn add_to_ns_map(&self, prefix: &str, uri: &str) {
        let in_effect = self.context.borrow().resolve_uri(prefix).as_deref() == Some(uri);
        if in_effect {
            return;
        }
        self.context.borrow_mut().register(prefix, uri);
        let mut declared = self.declared.borrow_mut();
        if let Some(entry) = declared.iter_mut().find(|(p, _)| p == prefix) {
            entry.1 = uri.to_string();
        } else {
            declared.push((prefix.to_string(), uri.to_string()));
        }
    }

    /// Prefixes declared on this element, sorted for stable iteration
    fn sorted_prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self
            .declared
            .borrow()
            .iter()
            .map(|(p, _)| p.clone())
            .collect();
        prefixes.sort();
        prefixes
    }

    /// Rewrite the property name's prefix when its namespace is a known
    /// complex-type namespace with a pre-declared prefix
    fn apply_type_prefix(&self, name: QName) -> QName {
        match self.type_prefixes.get(name.namespace_uri()) {
            Some(prefix) => name.reprefixed(prefix),
            None => name,
        }
    }

    /// Pop properties until one produces an event.
    ///
    /// Callers guarantee the list is non-empty on entry; an empty-array
    /// property is dropped and the loop continues with the next one, which
    /// is why this re-checks emptiness itself.
    fn process_properties(&mut self) -> Result<EventKind, StreamError> {
        loop {
            let property = match self.properties.pop_front() {
                Some(p) => p,
                None => {
                    self.state = State::End;
                    return Ok(EventKind::EndElement);
                }
            };

            let qname = match property.key {
                PropertyKey::Text => {
                    trace!("inline text property");
                    self.current_text = match property.value {
                        PropertyValue::Text(s) => s,
                        PropertyValue::Binary(b) => b.to_text().to_string(),
                        _ => {
                            return Err(StreamError::MismatchedProperty(
                                "a text key requires a text or binary value",
                            ))
                        }
                    };
                    self.state = State::Text;
                    return Ok(EventKind::Characters);
                }
                PropertyKey::Qualified(q) => Some(self.apply_type_prefix(q)),
                PropertyKey::Local(local) => Some(QName::local(&local)),
                PropertyKey::Node => None,
            };

            // fragments carry their own name; everything else needs one
            let delegate: Box<dyn EventReader> = match property.value {
                PropertyValue::Fragment(node) => {
                    trace!("delegating to fragment reader");
                    Box::new(WrappingReader::new(Box::new(node.reader()))?)
                }
                other => {
                    let name = match qname {
                        Some(q) => q,
                        None => {
                            return Err(StreamError::MismatchedProperty(
                                "a node key requires a fragment value",
                            ))
                        }
                    };
                    match other {
                        PropertyValue::Null => {
                            trace!(element = %name, "delegating to null reader");
                            let mut reader = NullValueReader::new(name);
                            reader.set_parent_context(self.context.clone());
                            reader.init();
                            Box::new(reader)
                        }
                        PropertyValue::Text(text) => {
                            trace!(element = %name, "delegating to text reader");
                            let mut reader = TextValueReader::new(name, text);
                            reader.set_parent_context(self.context.clone());
                            reader.init();
                            Box::new(reader)
                        }
                        PropertyValue::Binary(binary) => {
                            trace!(element = %name, "delegating to attachment reader");
                            let mut reader = AttachmentReader::new(name, binary);
                            reader.set_parent_context(self.context.clone());
                            reader.init();
                            Box::new(reader)
                        }
                        PropertyValue::Array(entries) => {
                            if entries.is_empty() {
                                trace!(element = %name, "skipping empty array property");
                                continue;
                            }
                            self.array_delegate(name, entries)?
                        }
                        PropertyValue::Bean(bean) => match bean.pull_reader(&name) {
                            BeanStream::Native(mut reader) => {
                                trace!(element = %name, "delegating to nested compliant reader");
                                reader.set_parent_context(self.context.clone());
                                reader.init();
                                reader
                            }
                            BeanStream::Foreign(reader) => {
                                trace!(element = %name, "wrapping foreign bean reader");
                                Box::new(WrappingReader::new(reader)?)
                            }
                        },
                        PropertyValue::Opaque(graph) => {
                            trace!(element = %name, "decomposing opaque value");
                            let nested = GraphReader::nested(
                                name,
                                graph.properties(),
                                self.type_prefixes.clone(),
                                self.allocator.clone(),
                            );
                            Box::new(WrappingReader::new(Box::new(nested))?)
                        }
                        // matched by the outer arm
                        PropertyValue::Fragment(_) => {
                            return Err(StreamError::MismatchedProperty(
                                "a node key requires a fragment value",
                            ))
                        }
                    }
                }
            };

            return self.splice(delegate);
        }
    }

    /// Delegate for an array property: simple entries repeat the property
    /// name through one reader; anything richer goes through a nested
    /// orchestrator keyed by a synthetic `array` element
    fn array_delegate(
        &self,
        name: QName,
        entries: Vec<PropertyValue>,
    ) -> Result<Box<dyn EventReader>, StreamError> {
        let all_simple = entries
            .iter()
            .all(|e| matches!(e, PropertyValue::Null | PropertyValue::Text(_)));
        if all_simple {
            trace!(element = %name, count = entries.len(), "delegating to repeated reader");
            let strings = entries
                .into_iter()
                .map(|e| match e {
                    PropertyValue::Text(s) => Some(s),
                    _ => None,
                })
                .collect();
            let mut reader = RepeatedValueReader::new(name, strings);
            reader.set_parent_context(self.context.clone());
            reader.init();
            return Ok(Box::new(reader));
        }

        trace!(element = %name, count = entries.len(), "delegating to nested array reader");
        let item_name = QName::new(name.namespace_uri(), "array");
        let items = entries
            .into_iter()
            .map(|value| Property::qualified(item_name.clone(), value))
            .collect();
        let nested = GraphReader::nested(
            name,
            items,
            self.type_prefixes.clone(),
            self.allocator.clone(),
        );
        Ok(Box::new(WrappingReader::new(Box::new(nested))?))
    }

    /// Install a delegate and report its first event, discarding a
    /// spurious leading document-start if the delegate reports one
    fn splice(&mut self, mut delegate: Box<dyn EventReader>) -> Result<EventKind, StreamError> {
        let event = if delegate.event_type() == EventKind::StartDocument {
            debug!("discarding leading document-start from delegate");
            delegate.next()?
        } else {
            delegate.event_type()
        };
        self.child = Some(delegate);
        self.state = State::Delegated;
        Ok(event)
    }
}

impl EventReader for GraphReader {
    fn next(&mut self) -> Result<EventKind, StreamError> {
        match self.state {
            State::Start => {
                if self.properties.is_empty() {
                    self.state = State::End;
                    Ok(EventKind::EndElement)
                } else {
                    self.process_properties()
                }
            }
            State::Delegated => {
                let child_done = self.child.as_ref().map_or(true, |c| c.is_done());
                if child_done {
                    if self.properties.is_empty() {
                        self.state = State::End;
                        Ok(EventKind::EndElement)
                    } else {
                        self.process_properties()
                    }
                } else {
                    match self.child.as_mut() {
                        Some(child) => child.next(),
                        None => Err(StreamError::PastEnd),
                    }
                }
            }
            State::Text => {
                if self.properties.is_empty() {
                    self.state = State::End;
                    Ok(EventKind::EndElement)
                } else {
                    self.process_properties()
                }
            }
            State::End => Err(StreamError::PastEnd),
        }
    }

    fn event_type(&self) -> EventKind {
        match self.state {
            State::Start => EventKind::StartElement,
            State::End => EventKind::EndElement,
            State::Text => EventKind::Characters,
            State::Delegated => self
                .child
                .as_ref()
                .map_or(EventKind::EndElement, |c| c.event_type()),
        }
    }

    fn has_next(&self) -> bool {
        match self.state {
            State::Delegated => match self.child.as_ref() {
                // a finished delegate still leaves this reader's own end
                Some(child) if child.is_done() => true,
                Some(child) => child.has_next(),
                None => false,
            },
            State::Start | State::Text => true,
            State::End => false,
        }
    }

    fn is_done(&self) -> bool {
        self.state == State::End
    }

    fn name(&self) -> Result<QName, StreamError> {
        match self.state {
            State::Delegated => match self.child.as_ref() {
                Some(child) => child.name(),
                None => Err(StreamError::invalid("name")),
            },
            State::Text => Err(StreamError::invalid("name")),
            State::Start | State::End => Ok(self.name.clone()),
        }
    }

    fn text(&self) -> Result<String, StreamError> {
        match self.state {
            State::Delegated => match self.child.as_ref() {
                Some(child) => child.text(),
                None => Err(StreamError::invalid("text")),
            },
            State::Text => Ok(self.current_text.clone()),
            State::Start | State::End => Err(StreamError::invalid("text")),
        }
    }

    fn attribute_count(&self) -> usize {
        match self.state {
            State::Delegated => self.child.as_ref().map_or(0, |c| c.attribute_count()),
            State::Start => self.attributes.len(),
            State::Text | State::End => 0,
        }
    }

    fn attribute_name(&self, i: usize) -> Result<Option<QName>, StreamError> {
        match self.state {
            State::Delegated => match self.child.as_ref() {
                Some(child) => child.attribute_name(i),
                None => Ok(None),
            },
            State::Start => {
                let Some(attr) = self.attributes.get(i) else {
                    return Ok(None);
                };
                match &attr.key {
                    AttrKey::Local(local) => Ok(Some(QName::local(local))),
                    AttrKey::Qualified(q) => Ok(Some(q.clone())),
                    AttrKey::Foreign => match &attr.value {
                        AttrValue::Attribute(a) => Ok(Some(a.name.clone())),
                        _ => Err(StreamError::MismatchedProperty(
                            "a foreign attribute key requires an attribute value",
                        )),
                    },
                }
            }
            State::Text | State::End => Err(StreamError::invalid("attribute_name")),
        }
    }

    fn attribute_value(&self, i: usize) -> Result<Option<String>, StreamError> {
        match self.state {
            State::Delegated => match self.child.as_ref() {
                Some(child) => child.attribute_value(i),
                None => Ok(None),
            },
            State::Start => {
                let Some(attr) = self.attributes.get(i) else {
                    return Ok(None);
                };
                match (&attr.key, &attr.value) {
                    (AttrKey::Foreign, AttrValue::Attribute(a)) => Ok(Some(a.value.clone())),
                    (AttrKey::Foreign, _) => Err(StreamError::MismatchedProperty(
                        "a foreign attribute key requires an attribute value",
                    )),
                    (_, AttrValue::Text(text)) => Ok(Some(text.clone())),
                    (AttrKey::Qualified(_), AttrValue::Qualified(value)) => {
                        // render against in-scope namespaces, declaring a
                        // fresh prefix if the value's namespace has none
                        let uri = value.namespace_uri();
                        if uri.is_empty() {
                            return Ok(Some(value.local_name().to_string()));
                        }
                        let prefix = match self.context.borrow().resolve_prefix(uri) {
                            Some(p) => p,
                            None => self.allocator.next_prefix(),
                        };
                        self.add_to_ns_map(&prefix, uri);
                        if prefix.is_empty() {
                            Ok(Some(value.local_name().to_string()))
                        } else {
                            Ok(Some(format!("{}:{}", prefix, value.local_name())))
                        }
                    }
                    _ => Err(StreamError::MismatchedProperty(
                        "a local attribute key requires a text value",
                    )),
                }
            }
            State::Text | State::End => Err(StreamError::invalid("attribute_value")),
        }
    }

    fn namespace_count(&self) -> usize {
        match self.state {
            State::Delegated => self.child.as_ref().map_or(0, |c| c.namespace_count()),
            _ => self.declared.borrow().len(),
        }
    }

    fn namespace_prefix(&self, i: usize) -> Result<Option<String>, StreamError> {
        match self.state {
            State::Delegated => match self.child.as_ref() {
                Some(child) => child.namespace_prefix(i),
                None => Ok(None),
            },
            State::Text => Err(StreamError::invalid("namespace_prefix")),
            State::Start | State::End => Ok(self.sorted_prefixes().get(i).cloned()),
        }
    }

    fn namespace_uri(&self, i: usize) -> Result<Option<String>, StreamError> {
        match self.state {
            State::Delegated => match self.child.as_ref() {
                Some(child) => child.namespace_uri(i),
                None => Ok(None),
            },
            State::Text => Err(StreamError::invalid("namespace_uri")),
            State::Start | State::End => {
                let Some(prefix) = self.sorted_prefixes().get(i).cloned() else {
                    return Ok(None);
                };
                Ok(self
                    .declared
                    .borrow()
                    .iter()
                    .find(|(p, _)| *p == prefix)
                    .map(|(_, uri)| uri.clone()))
            }
        }
    }

    fn resolve_namespace_uri(&self, prefix: &str) -> Option<String> {
        self.context.borrow().resolve_uri(prefix)
    }

    fn set_parent_context(&mut self, parent: SharedScope) {
        self.context.borrow_mut().set_parent(parent);
    }

    fn init(&mut self) {
        if !self.name.namespace_uri().is_empty() {
            self.add_to_ns_map(self.name.prefix().unwrap_or(""), self.name.namespace_uri());
        }
        for attr in &self.attributes {
            match &attr.key {
                AttrKey::Qualified(q) if !q.namespace_uri().is_empty() => {
                    self.add_to_ns_map(q.prefix().unwrap_or(""), q.namespace_uri());
                }
                AttrKey::Foreign => {
                    if let AttrValue::Attribute(a) = &attr.value {
                        if !a.name.namespace_uri().is_empty() {
                            self.add_to_ns_map(a.name.prefix().unwrap_or(""), a.name.namespace_uri());
                        }
                    }
                }
                _ => {}
            }
        }
    }
}
