//! Namespace Resolution
//!
//! Stack-based prefix/URI scope with parent delegation. Each reader owns
//! one scope; when it delegates to a child reader it hands the child a
//! shared handle to its own scope as the parent, so lookups walk outward
//! through the chain of enclosing elements.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Shared handle to a scope, passed from parent readers to children
pub type SharedScope = Rc<RefCell<NamespaceScope>>;

/// One lexical scope of prefix bindings
///
/// Prefixes and URIs are two parallel stacks pushed and popped together.
/// A later binding for an already-bound prefix shadows the earlier one;
/// local bindings shadow the parent chain.
#[derive(Debug, Default)]
pub struct NamespaceScope {
    prefixes: Vec<String>,
    uris: Vec<String>,
    parent: Option<SharedScope>,
}

impl NamespaceScope {
    /// Create an empty scope with no parent
    pub fn new() -> Self {
        NamespaceScope {
            prefixes: Vec::new(),
            uris: Vec::new(),
            parent: None,
        }
    }

    /// Create an empty scope behind a shared handle
    pub fn shared() -> SharedScope {
        Rc::new(RefCell::new(NamespaceScope::new()))
    }

    /// Attach the enclosing scope; lookups fall through to it on miss
    pub fn set_parent(&mut self, parent: SharedScope) {
        self.parent = Some(parent);
    }

    /// Bind a prefix to a URI in this scope.
    ///
    /// Re-registering an identical (prefix, uri) pair already bound here is
    /// a no-op. A different URI for a bound prefix pushes a new binding
    /// that shadows the old one for lookups.
    pub fn register(&mut self, prefix: &str, uri: &str) {
        if self.resolve_local(prefix).is_some_and(|u| u == uri) {
            return;
        }
        self.prefixes.push(prefix.to_string());
        self.uris.push(uri.to_string());
    }

    /// Remove the most recent binding. Callers that push must pop to
    /// balance, except construction-time scopes that are never popped.
    pub fn pop(&mut self) {
        self.prefixes.pop();
        self.uris.pop();
    }

    /// Number of bindings in this scope alone
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Whether this scope holds no bindings of its own
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    fn resolve_local(&self, prefix: &str) -> Option<&str> {
        // most recent binding wins
        for i in (0..self.prefixes.len()).rev() {
            if self.prefixes[i] == prefix {
                return Some(&self.uris[i]);
            }
        }
        None
    }

    /// Resolve a prefix to its URI, consulting the parent chain on miss
    pub fn resolve_uri(&self, prefix: &str) -> Option<String> {
        if let Some(uri) = self.resolve_local(prefix) {
            return Some(uri.to_string());
        }
        self.parent
            .as_ref()
            .and_then(|p| p.borrow().resolve_uri(prefix))
    }

    /// Resolve a URI to one of its prefixes, most recent local binding
    /// first, then the parent chain
    pub fn resolve_prefix(&self, uri: &str) -> Option<String> {
        for i in (0..self.uris.len()).rev() {
            if self.uris[i] == uri {
                return Some(self.prefixes[i].clone());
            }
        }
        self.parent
            .as_ref()
            .and_then(|p| p.borrow().resolve_prefix(uri))
    }

    /// All prefixes bound to a URI, in registration order, local scope
    /// first then the parent chain. The result is a plain snapshot; there
    /// is no removal through it.
    pub fn prefixes_for(&self, uri: &str) -> Vec<String> {
        let mut out = Vec::new();
        for i in 0..self.uris.len() {
            if self.uris[i] == uri {
                out.push(self.prefixes[i].clone());
            }
        }
        if let Some(parent) = &self.parent {
            out.extend(parent.borrow().prefixes_for(uri));
        }
        out
    }
}

/// Prefix number source for one top-level serialization.
///
/// Owned by the root reader and cloned into every nested reader it builds,
/// so prefixes are unique within one serialization without any process-wide
/// state. Cheap to clone; clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct PrefixAllocator {
    next: Rc<Cell<u32>>,
}

impl PrefixAllocator {
    pub fn new() -> Self {
        PrefixAllocator::default()
    }

    /// Mint the next `nsN` prefix
    pub fn next_prefix(&self) -> String {
        let n = self.next.get() + 1;
        self.next.set(n);
        format!("ns{n}")
    }
}
