//! Recursive Element Decoder
//!
//! Consumes one logical element value per call against a type descriptor:
//! scalar, repeated, or map-entry sequence, with `xsi:nil` handling and
//! `xsi:type` extension lookup through the registry. Failures abort the
//! whole decode call; no partial value is returned.

use std::sync::Arc;

use tracing::trace;

use crate::core::{split_lexical, xsi, QName};
use crate::error::ParseError;
use crate::parser::convert::convert;
use crate::parser::descriptor::{
    AttributeField, CollectionKind, FieldDescriptor, OperationDescriptor, TypeDescriptor,
    TypeKind, TypeRegistry,
};
use crate::parser::stateful::StatefulReader;
use crate::parser::value::{SimpleValue, StructValue, Value};
use crate::reader::EventReader;

/// Descriptor-driven decoder over a stateful cursor
pub struct Decoder<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> Decoder<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Decoder { registry }
    }

    /// Decode an operation wrapper element: check its name, then walk the
    /// parameter fields in order, one decoded value per parameter
    pub fn decode_operation<R: EventReader>(
        &self,
        reader: &mut StatefulReader<R>,
        operation: &OperationDescriptor,
    ) -> Result<Vec<Value>, ParseError> {
        self.advance_to_first_element(reader)?;

        let found = reader.name()?;
        if found != operation.element {
            return Err(ParseError::UnexpectedElement {
                expected: operation.element.to_string(),
                found: found.to_string(),
            });
        }
        trace!(element = %operation.element, "decoding operation");
        reader.next()?;

        let start_depth = reader.depth();
        let mut values = Vec::with_capacity(operation.parameters.len());
        for parameter in &operation.parameters {
            values.push(self.decode_element(reader, parameter)?);
            self.advance_past_field(reader, parameter, start_depth)?;
        }
        Ok(values)
    }

    /// Decode one element value for a field descriptor.
    ///
    /// The cursor must be at or before the field's start tag; on return it
    /// is at the field's end tag (or, for repeated fields, possibly at the
    /// next sibling's start tag).
    pub fn decode_element<R: EventReader>(
        &self,
        reader: &mut StatefulReader<R>,
        field: &FieldDescriptor,
    ) -> Result<Value, ParseError> {
        while !reader.is_start_element() && !reader.is_end_element() {
            reader.next()?;
        }

        let found = reader.name()?;
        if found != field.name {
            if field.min_occurs_zero {
                // absent optional field; the cursor does not move
                return Ok(Value::Null);
            }
            return Err(ParseError::UnexpectedElement {
                expected: field.name.local_name().to_string(),
                found: found.to_string(),
            });
        }

        match field.array {
            Some(kind) => self.decode_repeated(reader, field, kind),
            None => self.decode_scalar(reader, field),
        }
    }

    fn decode_scalar<R: EventReader>(
        &self,
        reader: &mut StatefulReader<R>,
        field: &FieldDescriptor,
    ) -> Result<Value, ParseError> {
        if nil_attribute(reader) {
            while !reader.is_end_element() {
                reader.next()?;
            }
            if reader.has_next() {
                reader.next()?;
            }
            return if field.nillable {
                Ok(Value::Null)
            } else {
                Err(ParseError::NotNillable(field.name.to_string()))
            };
        }

        let ty = self.actual_type(reader, &field.ty)?;
        let value = self.element_value(reader, &ty)?;
        // consume through to this field's own end tag
        while !(reader.is_end_element() && reader.name()? == field.name) {
            reader.next()?;
        }
        Ok(value)
    }

    /// Decode a repeated field: entries are same-name siblings, each with
    /// its own `xsi:nil`/`xsi:type` handling
    fn decode_repeated<R: EventReader>(
        &self,
        reader: &mut StatefulReader<R>,
        field: &FieldDescriptor,
        kind: CollectionKind,
    ) -> Result<Value, ParseError> {
        let mut entries = Vec::new();
        loop {
            if nil_attribute(reader) {
                while !reader.is_end_element() {
                    reader.next()?;
                }
                if !field.nillable {
                    return Err(ParseError::NotNillable(field.name.to_string()));
                }
                entries.push(Value::Null);
            } else {
                let ty = self.actual_type(reader, &field.ty)?;
                let value = self.element_value(reader, &ty)?;
                while !(reader.is_end_element() && reader.name()? == field.name) {
                    reader.next()?;
                }
                entries.push(value);
            }

            // step past this entry's end tag and peek at the next sibling
            while !reader.is_end_element() {
                reader.next()?;
            }
            if !reader.has_next() {
                break;
            }
            reader.next()?;
            while !reader.is_start_element() && !reader.is_end_element() {
                if !reader.has_next() {
                    break;
                }
                reader.next()?;
            }
            if !reader.is_start_element() || reader.name()? != field.name {
                break;
            }
        }

        trace!(element = %field.name, count = entries.len(), "decoded repeated element");
        collect_entries(entries, kind)
    }

    /// Decode the value between an element's start and end tags.
    ///
    /// On entry the cursor is at the start tag; on return it is somewhere
    /// inside or at the end of the element's content, the callers' tail
    /// loops take it the rest of the way.
    fn element_value<R: EventReader>(
        &self,
        reader: &mut StatefulReader<R>,
        ty: &Arc<TypeDescriptor>,
    ) -> Result<Value, ParseError> {
        match ty.kind() {
            TypeKind::Simple(kind) => {
                reader.next()?;
                // an empty element carries the empty string
                let text = if reader.is_characters() {
                    reader.text()?
                } else {
                    String::new()
                };
                Ok(Value::Simple(convert(*kind, &text)?))
            }
            TypeKind::Bean {
                attributes,
                elements,
            } => {
                let decoded_attributes = self.read_attribute_fields(reader, attributes)?;
                reader.next()?;
                let fields = self.decode_bean_fields(reader, elements)?;
                Ok(Value::Struct(StructValue {
                    type_name: ty.type_name().clone(),
                    attributes: decoded_attributes,
                    fields,
                }))
            }
        }
    }

    fn decode_bean_fields<R: EventReader>(
        &self,
        reader: &mut StatefulReader<R>,
        elements: &[FieldDescriptor],
    ) -> Result<Vec<(QName, Value)>, ParseError> {
        while !reader.is_start_element() && !reader.is_end_element() {
            reader.next()?;
        }
        let start_depth = reader.depth();
        let mut fields = Vec::with_capacity(elements.len());
        for field in elements {
            let value = self.decode_element(reader, field)?;
            fields.push((field.name.clone(), value));
            self.advance_past_field(reader, field, start_depth)?;
        }
        Ok(fields)
    }

    /// Step off a field's end tag before decoding the next sibling, unless
    /// the reader's depth disagrees with where that end tag should sit
    fn advance_past_field<R: EventReader>(
        &self,
        reader: &mut StatefulReader<R>,
        field: &FieldDescriptor,
        start_depth: usize,
    ) -> Result<(), ParseError> {
        if reader.is_end_element()
            && reader.name()? == field.name
            && (reader.prior_access() || reader.depth() + 1 == start_depth)
            && reader.has_next()
        {
            reader.next()?;
        }
        Ok(())
    }

    /// Resolve `xsi:type` against the registry; the declared type stands
    /// when the attribute is absent or names the declared type itself
    fn actual_type<R: EventReader>(
        &self,
        reader: &StatefulReader<R>,
        declared: &Arc<TypeDescriptor>,
    ) -> Result<Arc<TypeDescriptor>, ParseError> {
        match type_attribute(reader) {
            Some(name) if name != *declared.type_name() => {
                trace!(declared = %declared.type_name(), actual = %name, "extension type");
                self.registry
                    .lookup(&name)
                    .ok_or_else(|| ParseError::UnknownType(name.to_string()))
            }
            _ => Ok(declared.clone()),
        }
    }

    fn read_attribute_fields<R: EventReader>(
        &self,
        reader: &StatefulReader<R>,
        attributes: &[AttributeField],
    ) -> Result<Vec<(QName, SimpleValue)>, ParseError> {
        let mut out = Vec::new();
        for attribute in attributes {
            let value = reader.attribute_value_by_name(
                Some(attribute.name.namespace_uri()),
                attribute.name.local_name(),
            );
            match value {
                Some(text) => out.push((attribute.name.clone(), convert(attribute.kind, &text)?)),
                None if attribute.required => {
                    return Err(ParseError::MissingAttribute(
                        attribute.name.local_name().to_string(),
                    ))
                }
                None => {}
            }
        }
        Ok(out)
    }

    fn advance_to_first_element<R: EventReader>(
        &self,
        reader: &mut StatefulReader<R>,
    ) -> Result<(), ParseError> {
        if reader.prior_access() {
            while !reader.is_start_element() && !reader.is_end_element() && reader.has_next() {
                reader.next()?;
            }
        } else {
            while reader.depth() == 0 && reader.has_next() {
                reader.next()?;
            }
        }
        Ok(())
    }
}

/// Whether the current start tag carries `xsi:nil` set to a true form.
/// Readers accept both `"true"` and `"1"`; the write side only ever
/// produces `"true"`.
fn nil_attribute<R: EventReader>(reader: &StatefulReader<R>) -> bool {
    matches!(
        reader
            .attribute_value_by_name(Some(xsi::URI), xsi::NIL)
            .as_deref(),
        Some("true") | Some("1")
    )
}

/// The `xsi:type` attribute as a resolved QName, if present. The lexical
/// `prefix:local` form resolves through the reader's in-scope namespaces.
fn type_attribute<R: EventReader>(reader: &StatefulReader<R>) -> Option<QName> {
    let text = reader.attribute_value_by_name(Some(xsi::URI), xsi::TYPE)?;
    if text.is_empty() {
        return None;
    }
    let (prefix, local) = split_lexical(&text);
    let uri = reader
        .resolve_namespace_uri(prefix.unwrap_or(""))
        .unwrap_or_default();
    Some(QName::new(&uri, local))
}

/// Assemble decoded entries into the field's collection kind.
///
/// An empty result, or a single all-null entry, collapses to `Null`:
/// primitive-valued arrays upstream cannot hold nulls, and the collapse is
/// kept uniform for every collection kind.
fn collect_entries(entries: Vec<Value>, kind: CollectionKind) -> Result<Value, ParseError> {
    let collapses = entries.is_empty() || (entries.len() == 1 && entries[0] == Value::Null);
    if collapses {
        return Ok(Value::Null);
    }
    match kind {
        CollectionKind::Array
        | CollectionKind::List
        | CollectionKind::Set
        | CollectionKind::Collection => Ok(Value::Array(entries)),
        CollectionKind::Map => {
            let mut map = Vec::with_capacity(entries.len());
            for entry in entries {
                let Value::Struct(carrier) = entry else {
                    return Err(ParseError::MalformedMapEntry(
                        "map entry is not a key/value carrier",
                    ));
                };
                let mut key = None;
                let mut value = None;
                for (name, field_value) in carrier.fields {
                    match name.local_name() {
                        "key" => key = Some(field_value),
                        "value" => value = Some(field_value),
                        _ => {}
                    }
                }
                let Some(Value::Simple(key)) = key else {
                    return Err(ParseError::MalformedMapEntry(
                        "map entry key is missing or not a simple value",
                    ));
                };
                map.push((key, value.unwrap_or(Value::Null)));
            }
            Ok(Value::Map(map))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::descriptor::SimpleKind;
    use crate::reader::{Attr, GraphReader, Property, PropertyValue};

    fn string_type() -> Arc<TypeDescriptor> {
        TypeDescriptor::simple(QName::new(xsi::URI, "string"), SimpleKind::String)
    }

    fn wrap(reader: GraphReader) -> StatefulReader<GraphReader> {
        StatefulReader::fresh(reader)
    }

    #[test]
    fn test_decode_scalar_string() {
        let graph = GraphReader::new(
            QName::local("op"),
            vec![Property::local("name", PropertyValue::Text("hello".to_string()))],
            vec![],
        );
        let mut reader = wrap(graph);
        reader.next().unwrap(); // onto <name>

        let registry = TypeRegistry::new();
        let decoder = Decoder::new(&registry);
        let field = FieldDescriptor::new(QName::local("name"), string_type());
        let value = decoder.decode_element(&mut reader, &field).unwrap();
        assert_eq!(value.as_str(), Some("hello"));
        // the cursor rests on the field's end tag
        assert!(reader.is_end_element());
        assert_eq!(reader.name().unwrap().local_name(), "name");
    }

    #[test]
    fn test_decode_mismatch_without_escape_fails() {
        let graph = GraphReader::new(
            QName::local("op"),
            vec![Property::local("other", PropertyValue::Text("x".to_string()))],
            vec![],
        );
        let mut reader = wrap(graph);
        reader.next().unwrap();

        let registry = TypeRegistry::new();
        let decoder = Decoder::new(&registry);
        let field = FieldDescriptor::new(QName::local("name"), string_type());
        let err = decoder.decode_element(&mut reader, &field).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedElement { .. }));
    }

    #[test]
    fn test_decode_mismatch_with_min_occurs_zero_is_absent() {
        let graph = GraphReader::new(
            QName::local("op"),
            vec![Property::local("other", PropertyValue::Text("x".to_string()))],
            vec![],
        );
        let mut reader = wrap(graph);
        reader.next().unwrap();

        let registry = TypeRegistry::new();
        let decoder = Decoder::new(&registry);
        let field = FieldDescriptor::new(QName::local("name"), string_type()).optional();
        let value = decoder.decode_element(&mut reader, &field).unwrap();
        assert!(value.is_null());
        // the cursor did not move past the mismatched element
        assert_eq!(reader.name().unwrap().local_name(), "other");
    }

    #[test]
    fn test_nil_scalar_requires_nillable() {
        let registry = TypeRegistry::new();
        let decoder = Decoder::new(&registry);

        let nillable = FieldDescriptor::new(QName::local("gone"), string_type()).nillable();
        let graph = GraphReader::new(
            QName::local("op"),
            vec![Property::local("gone", PropertyValue::Null)],
            vec![],
        );
        let mut reader = wrap(graph);
        reader.next().unwrap();
        assert!(decoder.decode_element(&mut reader, &nillable).unwrap().is_null());

        let strict = FieldDescriptor::new(QName::local("gone"), string_type());
        let graph = GraphReader::new(
            QName::local("op"),
            vec![Property::local("gone", PropertyValue::Null)],
            vec![],
        );
        let mut reader = wrap(graph);
        reader.next().unwrap();
        let err = decoder.decode_element(&mut reader, &strict).unwrap_err();
        assert!(matches!(err, ParseError::NotNillable(_)));
    }

    #[test]
    fn test_string_array_round_trip() {
        let graph = GraphReader::new(
            QName::local("op"),
            vec![Property::local(
                "tags",
                PropertyValue::Array(vec![
                    PropertyValue::Text("a".to_string()),
                    PropertyValue::Null,
                    PropertyValue::Text("b".to_string()),
                ]),
            )],
            vec![],
        );
        let mut reader = wrap(graph);
        reader.next().unwrap();

        let registry = TypeRegistry::new();
        let decoder = Decoder::new(&registry);
        let field = FieldDescriptor::new(QName::local("tags"), string_type())
            .repeated(CollectionKind::Array)
            .nillable();
        let value = decoder.decode_element(&mut reader, &field).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![
                Value::Simple(SimpleValue::String("a".to_string())),
                Value::Null,
                Value::Simple(SimpleValue::String("b".to_string())),
            ])
        );
    }

    #[test]
    fn test_all_null_array_collapses_to_null() {
        let graph = GraphReader::new(
            QName::local("op"),
            vec![Property::local(
                "tags",
                PropertyValue::Array(vec![PropertyValue::Null]),
            )],
            vec![],
        );
        let mut reader = wrap(graph);
        reader.next().unwrap();

        let registry = TypeRegistry::new();
        let decoder = Decoder::new(&registry);
        let field = FieldDescriptor::new(QName::local("tags"), string_type())
            .repeated(CollectionKind::Array)
            .nillable();
        let value = decoder.decode_element(&mut reader, &field).unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_unknown_extension_type_fails() {
        let graph = GraphReader::new(
            QName::local("op"),
            vec![Property::local(
                "item",
                PropertyValue::Text("x".to_string()),
            )],
            vec![Attr::qualified(
                QName::with_prefix(xsi::URI, xsi::TYPE, xsi::PREFIX),
                "Derived",
            )],
        );
        // the type attribute sits on the wrapper element here, so decode
        // the wrapper itself as the field
        let mut reader = wrap(graph);

        let registry = TypeRegistry::new();
        let decoder = Decoder::new(&registry);
        let bean = TypeDescriptor::bean(
            QName::local("Base"),
            vec![],
            vec![FieldDescriptor::new(QName::local("item"), string_type())],
        );
        let field = FieldDescriptor::new(QName::local("op"), bean);
        let err = decoder.decode_element(&mut reader, &field).unwrap_err();
        assert!(matches!(err, ParseError::UnknownType(_)));
        assert!(err.to_string().contains("unknown extension type"));
    }

    #[test]
    fn test_decode_bean_with_attributes() {
        let graph = GraphReader::new(
            QName::local("person"),
            vec![
                Property::local("name", PropertyValue::Text("ann".to_string())),
                Property::local("age", PropertyValue::Text("41".to_string())),
            ],
            vec![Attr::local("id", "7")],
        );
        let mut reader = wrap(graph);

        let registry = TypeRegistry::new();
        let decoder = Decoder::new(&registry);
        let int_type = TypeDescriptor::simple(QName::new(xsi::URI, "int"), SimpleKind::Int);
        let person = TypeDescriptor::bean(
            QName::local("Person"),
            vec![AttributeField::new(QName::local("id"), SimpleKind::Int).required()],
            vec![
                FieldDescriptor::new(QName::local("name"), string_type()),
                FieldDescriptor::new(QName::local("age"), int_type),
            ],
        );
        let field = FieldDescriptor::new(QName::local("person"), person);
        let value = decoder.decode_element(&mut reader, &field).unwrap();

        let Value::Struct(decoded) = value else {
            panic!("expected a struct");
        };
        assert_eq!(decoded.attribute("id"), Some(&SimpleValue::Int(7)));
        assert_eq!(decoded.field("name").and_then(Value::as_str), Some("ann"));
        assert_eq!(
            decoded.field("age").and_then(Value::as_simple),
            Some(&SimpleValue::Int(41))
        );
    }

    #[test]
    fn test_missing_required_attribute_fails() {
        let graph = GraphReader::new(QName::local("person"), vec![], vec![]);
        let mut reader = wrap(graph);

        let registry = TypeRegistry::new();
        let decoder = Decoder::new(&registry);
        let person = TypeDescriptor::bean(
            QName::local("Person"),
            vec![AttributeField::new(QName::local("id"), SimpleKind::Int).required()],
            vec![],
        );
        let field = FieldDescriptor::new(QName::local("person"), person);
        let err = decoder.decode_element(&mut reader, &field).unwrap_err();
        assert!(matches!(err, ParseError::MissingAttribute(_)));
    }

    #[test]
    fn test_decode_operation_parameters() {
        let graph = GraphReader::new(
            QName::new("urn:svc", "addRequest"),
            vec![
                Property::local("left", PropertyValue::Text("2".to_string())),
                Property::local("right", PropertyValue::Text("3".to_string())),
            ],
            vec![],
        );
        let mut reader = wrap(graph);

        let registry = TypeRegistry::new();
        let decoder = Decoder::new(&registry);
        let int_type = TypeDescriptor::simple(QName::new(xsi::URI, "int"), SimpleKind::Int);
        let operation = OperationDescriptor::new(
            QName::new("urn:svc", "addRequest"),
            vec![
                FieldDescriptor::new(QName::local("left"), int_type.clone()),
                FieldDescriptor::new(QName::local("right"), int_type),
            ],
        );
        let values = decoder.decode_operation(&mut reader, &operation).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Simple(SimpleValue::Int(2)),
                Value::Simple(SimpleValue::Int(3)),
            ]
        );
    }

    #[test]
    fn test_decode_operation_wrong_wrapper_fails() {
        let graph = GraphReader::new(QName::new("urn:svc", "subRequest"), vec![], vec![]);
        let mut reader = wrap(graph);

        let registry = TypeRegistry::new();
        let decoder = Decoder::new(&registry);
        let operation =
            OperationDescriptor::new(QName::new("urn:svc", "addRequest"), vec![]);
        let err = decoder.decode_operation(&mut reader, &operation).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedElement { .. }));
    }

    #[test]
    fn test_map_entries_unpack() {
        // each entry streams as an <entry><key>..</key><value>..</value></entry>
        struct Entry(&'static str, &'static str);
        impl crate::reader::ObjectGraph for Entry {
            fn properties(&self) -> Vec<Property> {
                vec![
                    Property::local("key", PropertyValue::Text(self.0.to_string())),
                    Property::local("value", PropertyValue::Text(self.1.to_string())),
                ]
            }
        }

        let graph = GraphReader::new(
            QName::local("op"),
            vec![
                Property::local("entries", PropertyValue::Opaque(Box::new(Entry("a", "1")))),
                Property::local("entries", PropertyValue::Opaque(Box::new(Entry("b", "2")))),
            ],
            vec![],
        );
        let mut reader = wrap(graph);
        reader.next().unwrap();

        let registry = TypeRegistry::new();
        let decoder = Decoder::new(&registry);
        let entry_type = TypeDescriptor::bean(
            QName::local("MapEntry"),
            vec![],
            vec![
                FieldDescriptor::new(QName::local("key"), string_type()),
                FieldDescriptor::new(QName::local("value"), string_type()),
            ],
        );
        let field = FieldDescriptor::new(QName::local("entries"), entry_type)
            .repeated(CollectionKind::Map);
        let value = decoder.decode_element(&mut reader, &field).unwrap();

        let Value::Map(entries) = value else {
            panic!("expected a map");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, SimpleValue::String("a".to_string()));
        assert_eq!(
            entries[1].1,
            Value::Simple(SimpleValue::String("2".to_string()))
        );
    }
}
