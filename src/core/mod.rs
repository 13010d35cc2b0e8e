//! Core stream primitives
//!
//! Fundamental building blocks shared by both engines:
//! - Event: the reduced infoset token set
//! - QName: expanded names with prefix-agnostic equality
//! - Context: stack-based namespace scoping with parent delegation

pub mod context;
pub mod event;
pub mod qname;

pub use context::{NamespaceScope, PrefixAllocator, SharedScope};
pub use event::EventKind;
pub use qname::{split_lexical, xsi, QName};
