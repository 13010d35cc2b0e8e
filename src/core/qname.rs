//! Qualified Names
//!
//! Expanded names for elements and attributes: namespace URI, local name,
//! and an advisory prefix. Equality and hashing ignore the prefix, so a
//! `QName` can key the type registry regardless of how it was spelled on
//! the wire.

use std::fmt;

/// Well-known XML Schema instance namespace
pub mod xsi {
    /// The XMLSchema-instance namespace URI
    pub const URI: &str = "http://www.w3.org/2001/XMLSchema-instance";
    /// Customary prefix for the instance namespace
    pub const PREFIX: &str = "xsi";
    /// Local name of the nil marker attribute
    pub const NIL: &str = "nil";
    /// Local name of the dynamic type attribute
    pub const TYPE: &str = "type";
}

/// A qualified name: `{namespace-uri}local-name` plus an advisory prefix
#[derive(Debug, Clone, Default)]
pub struct QName {
    namespace_uri: String,
    local_name: String,
    prefix: String,
}

impl QName {
    /// Create a name in a namespace, with no prefix
    pub fn new(namespace_uri: &str, local_name: &str) -> Self {
        QName {
            namespace_uri: namespace_uri.to_string(),
            local_name: local_name.to_string(),
            prefix: String::new(),
        }
    }

    /// Create a name in a namespace with an explicit prefix
    pub fn with_prefix(namespace_uri: &str, local_name: &str, prefix: &str) -> Self {
        QName {
            namespace_uri: namespace_uri.to_string(),
            local_name: local_name.to_string(),
            prefix: prefix.to_string(),
        }
    }

    /// Create a name with no namespace
    pub fn local(local_name: &str) -> Self {
        QName::new("", local_name)
    }

    /// Namespace URI, empty when the name is unqualified
    pub fn namespace_uri(&self) -> &str {
        &self.namespace_uri
    }

    /// Local part of the name
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Advisory prefix, if one was assigned
    pub fn prefix(&self) -> Option<&str> {
        if self.prefix.is_empty() {
            None
        } else {
            Some(&self.prefix)
        }
    }

    /// Same name with a different advisory prefix
    pub fn reprefixed(&self, prefix: &str) -> Self {
        QName::with_prefix(&self.namespace_uri, &self.local_name, prefix)
    }
}

/// Names compare by expanded name only; the prefix is presentation
impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace_uri == other.namespace_uri && self.local_name == other.local_name
    }
}

impl Eq for QName {}

impl std::hash::Hash for QName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.namespace_uri.hash(state);
        self.local_name.hash(state);
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_uri.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace_uri, self.local_name)
        }
    }
}

/// Split a lexical `prefix:local` name at the colon
pub fn split_lexical(name: &str) -> (Option<&str>, &str) {
    if let Some(pos) = memchr::memchr(b':', name.as_bytes()) {
        (Some(&name[..pos]), &name[pos + 1..])
    } else {
        (None, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_prefix() {
        let a = QName::with_prefix("urn:x", "item", "ns1");
        let b = QName::new("urn:x", "item");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_namespace() {
        let a = QName::new("urn:x", "item");
        let b = QName::new("urn:y", "item");
        assert_ne!(a, b);
    }

    #[test]
    fn test_split_lexical() {
        assert_eq!(split_lexical("p:Dependent"), (Some("p"), "Dependent"));
        assert_eq!(split_lexical("Dependent"), (None, "Dependent"));
    }

    #[test]
    fn test_display() {
        assert_eq!(QName::new("urn:x", "person").to_string(), "{urn:x}person");
        assert_eq!(QName::local("person").to_string(), "person");
    }
}
