//! Type Descriptors
//!
//! Schema-derived metadata that drives the decoder: what a wire element's
//! value looks like (simple or bean), its cardinality, and its nested
//! field layout. Descriptors are built once at startup and shared
//! read-only through `Arc`s; the registry maps type names to descriptors
//! for `xsi:type` extension lookups.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::QName;

/// Leaf types with a direct text conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleKind {
    String,
    Int,
    Long,
    Float,
    Double,
    Bool,
    DateTime,
}

/// The host collection a repeated element decodes into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Array,
    List,
    Set,
    Collection,
    Map,
}

/// One attribute on a bean element
#[derive(Debug, Clone)]
pub struct AttributeField {
    pub name: QName,
    pub kind: SimpleKind,
    pub required: bool,
}

impl AttributeField {
    pub fn new(name: QName, kind: SimpleKind) -> Self {
        AttributeField {
            name,
            kind,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// One element field of a bean, or one operation parameter.
///
/// Cardinality and occurrence ride with the field, not the type: the
/// same type can be a required scalar in one place and a nillable
/// repeated element in another.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: QName,
    pub ty: Arc<TypeDescriptor>,
    pub array: Option<CollectionKind>,
    pub nillable: bool,
    pub min_occurs_zero: bool,
}

impl FieldDescriptor {
    pub fn new(name: QName, ty: Arc<TypeDescriptor>) -> Self {
        FieldDescriptor {
            name,
            ty,
            array: None,
            nillable: false,
            min_occurs_zero: false,
        }
    }

    /// Mark the field repeated, decoded into the given collection kind
    pub fn repeated(mut self, kind: CollectionKind) -> Self {
        self.array = Some(kind);
        self
    }

    pub fn nillable(mut self) -> Self {
        self.nillable = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.min_occurs_zero = true;
        self
    }
}

/// What a type's value looks like on the wire
#[derive(Debug)]
pub enum TypeKind {
    Simple(SimpleKind),
    Bean {
        attributes: Vec<AttributeField>,
        elements: Vec<FieldDescriptor>,
    },
}

/// One node of the descriptor tree
#[derive(Debug)]
pub struct TypeDescriptor {
    type_name: QName,
    kind: TypeKind,
}

impl TypeDescriptor {
    pub fn simple(type_name: QName, kind: SimpleKind) -> Arc<Self> {
        Arc::new(TypeDescriptor {
            type_name,
            kind: TypeKind::Simple(kind),
        })
    }

    pub fn bean(
        type_name: QName,
        attributes: Vec<AttributeField>,
        elements: Vec<FieldDescriptor>,
    ) -> Arc<Self> {
        Arc::new(TypeDescriptor {
            type_name,
            kind: TypeKind::Bean {
                attributes,
                elements,
            },
        })
    }

    pub fn type_name(&self) -> &QName {
        &self.type_name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }
}

/// One decodable operation: its wrapper element and parameter fields
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub element: QName,
    pub parameters: Vec<FieldDescriptor>,
}

impl OperationDescriptor {
    pub fn new(element: QName, parameters: Vec<FieldDescriptor>) -> Self {
        OperationDescriptor {
            element,
            parameters,
        }
    }
}

/// Type-name lookup for `xsi:type` extension resolution.
///
/// Populated at startup, read-only at decode time.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<QName, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    pub fn register(&mut self, descriptor: Arc<TypeDescriptor>) {
        self.types
            .insert(descriptor.type_name().clone(), descriptor);
    }

    pub fn lookup(&self, type_name: &QName) -> Option<Arc<TypeDescriptor>> {
        self.types.get(type_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup_ignores_prefix() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDescriptor::simple(
            QName::with_prefix("urn:t", "Widget", "t"),
            SimpleKind::String,
        ));
        // wire spellings with any prefix resolve to the same descriptor
        let found = registry.lookup(&QName::new("urn:t", "Widget"));
        assert!(found.is_some());
        assert!(registry.lookup(&QName::new("urn:t", "Gadget")).is_none());
    }

    #[test]
    fn test_field_builders() {
        let ty = TypeDescriptor::simple(QName::local("string"), SimpleKind::String);
        let field = FieldDescriptor::new(QName::local("tags"), ty)
            .repeated(CollectionKind::Array)
            .nillable()
            .optional();
        assert_eq!(field.array, Some(CollectionKind::Array));
        assert!(field.nillable);
        assert!(field.min_occurs_zero);
    }
}
