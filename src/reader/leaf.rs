//! Leaf Readers
//!
//! Fixed small state machines, one per value kind, that the orchestrating
//! reader delegates to: a null marker, a plain text value, a lazily
//! stringified binary attachment, and a repeated-element walk over a
//! string sequence. Each has a handful of states and no branching beyond
//! its transition table.

use std::cell::OnceCell;
use std::rc::Rc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::core::{xsi, EventKind, NamespaceScope, QName, SharedScope};
use crate::error::StreamError;
use crate::reader::EventReader;

fn xsi_nil_name() -> QName {
    QName::with_prefix(xsi::URI, xsi::NIL, xsi::PREFIX)
}

/// A binary attachment value.
///
/// The text form is computed at most once per value, on first access, so
/// consumers that only look at metadata never pay for the encoding.
#[derive(Debug, Clone, Default)]
pub struct BinaryValue {
    bytes: Rc<Vec<u8>>,
    text: OnceCell<String>,
}

impl BinaryValue {
    pub fn new(bytes: Vec<u8>) -> Self {
        BinaryValue {
            bytes: Rc::new(bytes),
            text: OnceCell::new(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Base64 text form, computed lazily and cached
    pub fn to_text(&self) -> &str {
        self.text.get_or_init(|| BASE64.encode(self.bytes.as_slice()))
    }
}

impl PartialEq for BinaryValue {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

// ---------------------------------------------------------------------------
// Null value reader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NullState {
    Start,
    End,
}

/// Reader for a null property value: one element carrying exactly one
/// synthesized `xsi:nil="true"` attribute, then its end.
#[derive(Debug)]
pub struct NullValueReader {
    name: QName,
    state: NullState,
    context: NamespaceScope,
}

impl NullValueReader {
    pub fn new(name: QName) -> Self {
        NullValueReader {
            name,
            state: NullState::Start,
            context: NamespaceScope::new(),
        }
    }
}

impl EventReader for NullValueReader {
    fn next(&mut self) -> Result<EventKind, StreamError> {
        match self.state {
            NullState::Start => {
                self.state = NullState::End;
                Ok(EventKind::EndElement)
            }
            NullState::End => Err(StreamError::PastEnd),
        }
    }

    fn event_type(&self) -> EventKind {
        match self.state {
            NullState::Start => EventKind::StartElement,
            NullState::End => EventKind::EndElement,
        }
    }

    fn has_next(&self) -> bool {
        self.state == NullState::Start
    }

    fn is_done(&self) -> bool {
        self.state == NullState::End
    }

    fn name(&self) -> Result<QName, StreamError> {
        Ok(self.name.clone())
    }

    fn text(&self) -> Result<String, StreamError> {
        Err(StreamError::invalid("text"))
    }

    fn attribute_count(&self) -> usize {
        if self.state == NullState::Start {
            1
        } else {
            0
        }
    }

    fn attribute_name(&self, i: usize) -> Result<Option<QName>, StreamError> {
        if self.state == NullState::Start && i == 0 {
            Ok(Some(xsi_nil_name()))
        } else {
            Ok(None)
        }
    }

    fn attribute_value(&self, i: usize) -> Result<Option<String>, StreamError> {
        if self.state == NullState::Start && i == 0 {
            Ok(Some("true".to_string()))
        } else {
            Ok(None)
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

    fn resolve_namespace_uri(&self, prefix: &str) -> Option<String> {
        self.context.resolve_uri(prefix)
    }

    fn set_parent_context(&mut self, parent: SharedScope) {
        self.context.set_parent(parent);
    }

    fn init(&mut self) {
        register_own_name(&mut self.context, &self.name);
        self.context.register(xsi::PREFIX, xsi::URI);
    }
}

fn register_own_name(context: &mut NamespaceScope, name: &QName) {
    if !name.namespace_uri().is_empty() {
        let prefix = name.prefix().unwrap_or("");
        if context.resolve_uri(prefix).as_deref() != Some(name.namespace_uri()) {
            context.register(prefix, name.namespace_uri());
        }
    }
}

// ---------------------------------------------------------------------------
// Text value reader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextState {
    Start,
    Text,
    End,
}

/// Reader for a plain string property: start, characters, end.
#[derive(Debug)]
pub struct TextValueReader {
    name: QName,
    value: String,
    state: TextState,
    context: NamespaceScope,
}

impl TextValueReader {
    pub fn new(name: QName, value: String) -> Self {
        TextValueReader {
            name,
            value,
            state: TextState::Start,
            context: NamespaceScope::new(),
        }
    }
}

impl EventReader for TextValueReader {
    fn next(&mut self) -> Result<EventKind, StreamError> {
        match self.state {
            TextState::Start => {
                self.state = TextState::Text;
                Ok(EventKind::Characters)
            }
            TextState::Text => {
                self.state = TextState::End;
                Ok(EventKind::EndElement)
            }
            TextState::End => Err(StreamError::PastEnd),
        }
    }

    fn event_type(&self) -> EventKind {
        match self.state {
            TextState::Start => EventKind::StartElement,
            TextState::Text => EventKind::Characters,
            TextState::End => EventKind::EndElement,
        }
    }

    fn has_next(&self) -> bool {
        self.state != TextState::End
    }

    fn is_done(&self) -> bool {
        self.state == TextState::End
    }

    fn name(&self) -> Result<QName, StreamError> {
        if self.state == TextState::Text {
            Err(StreamError::invalid("name"))
        } else {
            Ok(self.name.clone())
        }
    }

    fn text(&self) -> Result<String, StreamError> {
        if self.state == TextState::Text {
            Ok(self.value.clone())
        } else {
            Err(StreamError::invalid("text"))
        }
    }

    fn attribute_count(&self) -> usize {
        0
    }

    fn attribute_name(&self, _i: usize) -> Result<Option<QName>, StreamError> {
        Ok(None)
    }

    fn attribute_value(&self, _i: usize) -> Result<Option<String>, StreamError> {
        Ok(None)
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

    fn resolve_namespace_uri(&self, prefix: &str) -> Option<String> {
        self.context.resolve_uri(prefix)
    }

    fn set_parent_context(&mut self, parent: SharedScope) {
        self.context.set_parent(parent);
    }

    fn init(&mut self) {
        register_own_name(&mut self.context, &self.name);
    }
}

// ---------------------------------------------------------------------------
// Attachment reader
// ---------------------------------------------------------------------------

/// Reader for a binary attachment: same three-state shape as
/// [`TextValueReader`], but the characters text is the attachment's base64
/// form, computed only when a consumer actually asks for it.
#[derive(Debug)]
pub struct AttachmentReader {
    name: QName,
    value: BinaryValue,
    state: TextState,
    context: NamespaceScope,
}

impl AttachmentReader {
    pub fn new(name: QName, value: BinaryValue) -> Self {
        AttachmentReader {
            name,
            value,
            state: TextState::Start,
            context: NamespaceScope::new(),
        }
    }
}

impl EventReader for AttachmentReader {
    fn next(&mut self) -> Result<EventKind, StreamError> {
        match self.state {
            TextState::Start => {
                self.state = TextState::Text;
                Ok(EventKind::Characters)
            }
            TextState::Text => {
                self.state = TextState::End;
                Ok(EventKind::EndElement)
            }
            TextState::End => Err(StreamError::PastEnd),
        }
    }

    fn event_type(&self) -> EventKind {
        match self.state {
            TextState::Start => EventKind::StartElement,
            TextState::Text => EventKind::Characters,
            TextState::End => EventKind::EndElement,
        }
    }

    fn has_next(&self) -> bool {
        self.state != TextState::End
    }

    fn is_done(&self) -> bool {
        self.state == TextState::End
    }

    fn name(&self) -> Result<QName, StreamError> {
        if self.state == TextState::Text {
            Err(StreamError::invalid("name"))
        } else {
            Ok(self.name.clone())
        }
    }

    fn text(&self) -> Result<String, StreamError> {
        if self.state == TextState::Text {
            Ok(self.value.to_text().to_string())
        } else {
            Err(StreamError::invalid("text"))
        }
    }

    fn attribute_count(&self) -> usize {
        0
    }

    fn attribute_name(&self, _i: usize) -> Result<Option<QName>, StreamError> {
        Ok(None)
    }

    fn attribute_value(&self, _i: usize) -> Result<Option<String>, StreamError> {
        Ok(None)
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

    fn resolve_namespace_uri(&self, prefix: &str) -> Option<String> {
        self.context.resolve_uri(prefix)
    }

    fn set_parent_context(&mut self, parent: SharedScope) {
        self.context.set_parent(parent);
    }

    fn init(&mut self) {
        register_own_name(&mut self.context, &self.name);
    }
}

// ---------------------------------------------------------------------------
// Repeated value reader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepeatState {
    Start,
    StartNil,
    Text,
    End,
    FinalEnd,
}

/// Reader for a homogeneous string sequence: the same element name
/// repeated once per entry, with one reader instance for the whole walk.
///
/// A `None` entry synthesizes `xsi:nil="true"` on its start element and
/// emits no text. The last entry's end element is terminal; every earlier
/// end element transitions back to the next entry's start.
#[derive(Debug)]
pub struct RepeatedValueReader {
    name: QName,
    entries: Vec<Option<String>>,
    index: usize,
    state: RepeatState,
    context: NamespaceScope,
}

impl RepeatedValueReader {
    pub fn new(name: QName, entries: Vec<Option<String>>) -> Self {
        let state = match entries.first() {
            Some(Some(_)) => RepeatState::Start,
            Some(None) => RepeatState::StartNil,
            None => RepeatState::FinalEnd,
        };
        RepeatedValueReader {
            name,
            entries,
            index: 0,
            state,
            context: NamespaceScope::new(),
        }
    }

    fn end_state(&self) -> RepeatState {
        if self.index + 1 >= self.entries.len() {
            RepeatState::FinalEnd
        } else {
            RepeatState::End
        }
    }
}

impl EventReader for RepeatedValueReader {
    fn next(&mut self) -> Result<EventKind, StreamError> {
        match self.state {
            RepeatState::Start => {
                self.state = RepeatState::Text;
                Ok(EventKind::Characters)
            }
            RepeatState::StartNil => {
                // null entry: no text, straight to its end element
                self.state = self.end_state();
                Ok(EventKind::EndElement)
            }
            RepeatState::Text => {
                self.state = self.end_state();
                Ok(EventKind::EndElement)
            }
            RepeatState::End => {
                self.index += 1;
                self.state = match self.entries[self.index] {
                    Some(_) => RepeatState::Start,
                    None => RepeatState::StartNil,
                };
                Ok(EventKind::StartElement)
            }
            RepeatState::FinalEnd => Err(StreamError::PastEnd),
        }
    }

    fn event_type(&self) -> EventKind {
        match self.state {
            RepeatState::Start | RepeatState::StartNil => EventKind::StartElement,
            RepeatState::Text => EventKind::Characters,
            RepeatState::End | RepeatState::FinalEnd => EventKind::EndElement,
        }
    }

    fn has_next(&self) -> bool {
        self.state != RepeatState::FinalEnd
    }

    fn is_done(&self) -> bool {
        self.state == RepeatState::FinalEnd
    }

    fn name(&self) -> Result<QName, StreamError> {
        if self.state == RepeatState::Text {
            Err(StreamError::invalid("name"))
        } else {
            Ok(self.name.clone())
        }
    }

    fn text(&self) -> Result<String, StreamError> {
        if self.state == RepeatState::Text {
            match &self.entries[self.index] {
                Some(s) => Ok(s.clone()),
                None => Err(StreamError::invalid("text")),
            }
        } else {
            Err(StreamError::invalid("text"))
        }
    }

    fn attribute_count(&self) -> usize {
        if self.state == RepeatState::StartNil {
            1
        } else {
            0
        }
    }

    fn attribute_name(&self, i: usize) -> Result<Option<QName>, StreamError> {
        if self.state == RepeatState::StartNil && i == 0 {
            Ok(Some(xsi_nil_name()))
        } else {
            Ok(None)
        }
    }

    fn attribute_value(&self, i: usize) -> Result<Option<String>, StreamError> {
        if self.state == RepeatState::StartNil && i == 0 {
            Ok(Some("true".to_string()))
        } else {
            Ok(None)
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

    fn resolve_namespace_uri(&self, prefix: &str) -> Option<String> {
        self.context.resolve_uri(prefix)
    }

    fn set_parent_context(&mut self, parent: SharedScope) {
        self.context.set_parent(parent);
    }

    fn init(&mut self) {
        register_own_name(&mut self.context, &self.name);
        if self.entries.iter().any(Option::is_none) {
            self.context.register(xsi::PREFIX, xsi::URI);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_reader_events() {
        let mut reader = NullValueReader::new(QName::local("gone"));
        assert_eq!(reader.event_type(), EventKind::StartElement);
        assert_eq!(reader.attribute_count(), 1);
        assert_eq!(
            reader.attribute_name(0).unwrap().unwrap().local_name(),
            "nil"
        );
        assert_eq!(reader.attribute_value(0).unwrap().as_deref(), Some("true"));
        assert_eq!(reader.next().unwrap(), EventKind::EndElement);
        assert!(reader.is_done());
        assert_eq!(reader.next(), Err(StreamError::PastEnd));
    }

    #[test]
    fn test_text_reader_events() {
        let mut reader = TextValueReader::new(QName::local("greeting"), "hello".to_string());
        assert_eq!(reader.event_type(), EventKind::StartElement);
        assert_eq!(reader.next().unwrap(), EventKind::Characters);
        assert_eq!(reader.text().unwrap(), "hello");
        // text access is idempotent while in the characters state
        assert_eq!(reader.text().unwrap(), "hello");
        assert_eq!(reader.next().unwrap(), EventKind::EndElement);
        assert_eq!(reader.next(), Err(StreamError::PastEnd));
    }

    #[test]
    fn test_text_reader_invalid_accessors() {
        let mut reader = TextValueReader::new(QName::local("x"), "v".to_string());
        assert!(reader.text().is_err());
        reader.next().unwrap();
        assert!(reader.name().is_err());
    }

    #[test]
    fn test_attachment_text_cached() {
        let value = BinaryValue::new(vec![1, 2, 3]);
        let first = value.to_text().to_string();
        assert_eq!(first, value.to_text());
        assert_eq!(first, "AQID");
    }

    #[test]
    fn test_attachment_reader_events() {
        let mut reader =
            AttachmentReader::new(QName::local("blob"), BinaryValue::new(b"hi".to_vec()));
        assert_eq!(reader.next().unwrap(), EventKind::Characters);
        assert_eq!(reader.text().unwrap(), "aGk=");
        assert_eq!(reader.next().unwrap(), EventKind::EndElement);
        assert!(reader.is_done());
    }

    #[test]
    fn test_repeated_reader_walk() {
        let name = QName::local("tags");
        let mut reader = RepeatedValueReader::new(
            name,
            vec![Some("a".to_string()), Some("b".to_string()), None],
        );
        assert_eq!(reader.event_type(), EventKind::StartElement);
        assert_eq!(reader.attribute_count(), 0);
        assert_eq!(reader.next().unwrap(), EventKind::Characters);
        assert_eq!(reader.text().unwrap(), "a");
        assert_eq!(reader.next().unwrap(), EventKind::EndElement);
        assert!(!reader.is_done());

        assert_eq!(reader.next().unwrap(), EventKind::StartElement);
        assert_eq!(reader.attribute_count(), 0);
        assert_eq!(reader.next().unwrap(), EventKind::Characters);
        assert_eq!(reader.text().unwrap(), "b");
        assert_eq!(reader.next().unwrap(), EventKind::EndElement);

        // the null entry carries xsi:nil and no text
        assert_eq!(reader.next().unwrap(), EventKind::StartElement);
        assert_eq!(reader.attribute_count(), 1);
        assert_eq!(reader.attribute_value(0).unwrap().as_deref(), Some("true"));
        assert_eq!(reader.next().unwrap(), EventKind::EndElement);
        assert!(reader.is_done());
        assert_eq!(reader.next(), Err(StreamError::PastEnd));
    }

    #[test]
    fn test_repeated_reader_single_entry_terminal() {
        let mut reader =
            RepeatedValueReader::new(QName::local("one"), vec![Some("x".to_string())]);
        reader.next().unwrap();
        assert_eq!(reader.next().unwrap(), EventKind::EndElement);
        assert!(reader.is_done());
    }
}
