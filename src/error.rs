//! Error Types
//!
//! Two failure families: contract violations on the reader side (a consumer
//! driving a cursor incorrectly) and parsing problems on the decode side
//! (wire data that does not match its descriptor).

use thiserror::Error;

/// Contract violation while driving a pull reader.
///
/// These are caller bugs, not data errors: they are never caught internally
/// and never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    /// `next()` was called on a reader that already produced its final
    /// end-element.
    #[error("trying to advance beyond the end of the pull stream")]
    PastEnd,

    /// An accessor was called in a state that does not carry its data,
    /// e.g. `name()` while positioned on a characters event.
    #[error("`{accessor}` is not valid in the current reader state")]
    InvalidState { accessor: &'static str },

    /// A property or attribute pair combined key and value variants that
    /// have no defined meaning together.
    #[error("mismatched property pair: {0}")]
    MismatchedProperty(&'static str),
}

impl StreamError {
    pub(crate) fn invalid(accessor: &'static str) -> Self {
        StreamError::InvalidState { accessor }
    }
}

/// A problem while decoding an element stream against a type descriptor.
///
/// One error kind covers the whole decode taxonomy; each variant carries a
/// descriptive message and, for conversion failures, the original cause.
/// No partial result is ever returned alongside one of these.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The current element does not match the expected name and the
    /// descriptor offers no minOccurs=0 escape.
    #[error("unexpected element {found} but expected {expected}")]
    UnexpectedElement { expected: String, found: String },

    /// `xsi:nil` was set on an element whose descriptor is not nillable.
    #[error("element {0} can not be null")]
    NotNillable(String),

    /// A required attribute field was absent from the start tag.
    #[error("required attribute {0} is missing")]
    MissingAttribute(String),

    /// `xsi:type` named a type that is not in the registry.
    #[error("unknown extension type {0}")]
    UnknownType(String),

    /// Element text could not be converted to the descriptor's simple type.
    #[error("can not convert `{text}` to {target}")]
    Conversion {
        text: String,
        target: &'static str,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An end tag arrived that does not close the most recent start tag.
    #[error("unbalanced end element {0}")]
    UnbalancedEnd(String),

    /// A map entry carrier was missing its key or carried a non-simple key.
    #[error("malformed map entry: {0}")]
    MalformedMapEntry(&'static str),

    /// The underlying reader failed while the decoder was driving it.
    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl ParseError {
    pub(crate) fn conversion<E>(text: &str, target: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ParseError::Conversion {
            text: text.to_string(),
            target,
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn conversion_plain(text: &str, target: &'static str) -> Self {
        ParseError::Conversion {
            text: text.to_string(),
            target,
            source: None,
        }
    }
}
