//! Collects every type name the finished object model depends on.
//!
//! This table is the only thing handed to the external metadata collaborator
//! for resolution: inherited type names and custom property types need an
//! instantiable type, attached-property names only need metadata.

use indexmap::IndexMap;

use crate::ir::{BindingKind, Object};
use crate::parse_util::SourceLocation;
use crate::string_pool::StringIndex;

#[derive(Debug, Clone)]
pub struct TypeReference {
    pub location: SourceLocation,
    pub needs_creation: bool,
}

#[derive(Debug, Default)]
pub struct TypeReferenceMap {
    references: IndexMap<StringIndex, TypeReference>,
}

impl TypeReferenceMap {
    /// Record a reference. The first recorded location wins; later mentions
    /// of the same name keep it.
    pub fn add(&mut self, name_index: StringIndex, location: SourceLocation) -> &mut TypeReference {
        self.references
            .entry(name_index)
            .or_insert_with(|| TypeReference {
                location,
                needs_creation: false,
            })
    }

    pub fn get(&self, name_index: StringIndex) -> Option<&TypeReference> {
        self.references.get(&name_index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StringIndex, &TypeReference)> {
        self.references.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

/// Single read-only pass over the object list.
pub fn collect_type_references(
    objects: &[Object],
    empty_string_index: StringIndex,
) -> TypeReferenceMap {
    let mut references = TypeReferenceMap::default();
    for obj in objects {
        if obj.inherited_type_name_index != empty_string_index {
            references
                .add(obj.inherited_type_name_index, obj.location)
                .needs_creation = true;
        }

        for prop in &obj.properties {
            if prop.prop_type.is_custom() {
                // The object location, not the property's, is reported for
                // unresolvable custom types.
                references
                    .add(prop.custom_type_name_index, obj.location)
                    .needs_creation = true;
            }
        }

        for binding in &obj.bindings {
            if binding.kind == BindingKind::AttachedProperty {
                references.add(binding.property_name_index, binding.location);
            }
        }
    }
    references
}
