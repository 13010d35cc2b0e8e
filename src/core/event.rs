//! Stream Events
//!
//! The reduced infoset token set a pull cursor moves over. The engines in
//! this crate only ever synthesize start-element, characters, and
//! end-element events; `StartDocument` exists so readers produced by
//! foreign sources can be recognized and their document boundary stripped
//! at the splice point.

/// One token in a pull stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Document boundary, only ever observed on foreign readers
    StartDocument,
    /// Start of an element
    StartElement,
    /// Text content between tags
    Characters,
    /// End of an element
    EndElement,
}

impl EventKind {
    /// Whether a name accessor is meaningful on this event
    pub fn carries_name(self) -> bool {
        matches!(self, EventKind::StartElement | EventKind::EndElement)
    }

    /// Whether a text accessor is meaningful on this event
    pub fn carries_text(self) -> bool {
        matches!(self, EventKind::Characters)
    }

    /// Whether attribute accessors are meaningful on this event
    pub fn carries_attributes(self) -> bool {
        matches!(self, EventKind::StartElement)
    }
}
