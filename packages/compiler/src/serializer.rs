//! Lays the finished document out as one relocatable binary unit.
//!
//! The unit is a single flat buffer: the externally generated script unit
//! first (its header carries the fields patched here), then the import
//! table, the object offset table, and every object body. All internal
//! references are byte offsets or table indices, never pointers, so the
//! buffer can be mapped anywhere.
//!
//! Layout of one object body:
//! fixed header, function table (`u32` runtime indices), property records,
//! binding records, signal offset table (`u32`, relative to the object
//! start), then the variable-length signal records.

use bitflags::bitflags;

use crate::ir::{
    Binding, BindingKind, BindingValue, Document, Import, Object, Property, PropertyType, Signal,
};

// Field offsets inside the unit header. The external script-unit generator
// reserves this region at the start of its output.
pub const HEADER_FLAGS_OFFSET: usize = 8;
pub const HEADER_OFFSET_TO_IMPORTS: usize = 12;
pub const HEADER_N_IMPORTS: usize = 16;
pub const HEADER_OFFSET_TO_OBJECTS: usize = 20;
pub const HEADER_N_OBJECTS: usize = 24;
pub const HEADER_INDEX_OF_ROOT_OBJECT: usize = 28;
pub const UNIT_HEADER_SIZE: usize = 32;

pub const IMPORT_ENTRY_SIZE: usize = 24;
pub const PROPERTY_ENTRY_SIZE: usize = 28;
pub const BINDING_ENTRY_SIZE: usize = 32;
pub const OBJECT_HEADER_SIZE: usize = 52;
pub const SIGNAL_HEADER_SIZE: usize = 12;
pub const PARAMETER_ENTRY_SIZE: usize = 16;

// Object header field offsets, relative to the object start.
pub const OBJECT_INHERITED_TYPE_NAME: usize = 0;
pub const OBJECT_ID_INDEX: usize = 4;
pub const OBJECT_INDEX_OF_DEFAULT_PROPERTY: usize = 8;
pub const OBJECT_LOCATION: usize = 12;
pub const OBJECT_LOCATION_OF_ID_PROPERTY: usize = 16;
pub const OBJECT_N_FUNCTIONS: usize = 20;
pub const OBJECT_OFFSET_TO_FUNCTIONS: usize = 24;
pub const OBJECT_N_PROPERTIES: usize = 28;
pub const OBJECT_OFFSET_TO_PROPERTIES: usize = 32;
pub const OBJECT_N_BINDINGS: usize = 36;
pub const OBJECT_OFFSET_TO_BINDINGS: usize = 40;
pub const OBJECT_N_SIGNALS: usize = 44;
pub const OBJECT_OFFSET_TO_SIGNALS: usize = 48;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct UnitFlags: u32 {
        const IS_QML = 0x1;
        const IS_SINGLETON = 0x2;
    }
}

fn write_u32(buffer: &mut [u8], offset: usize, value: u32) {
    buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn write_i32(buffer: &mut [u8], offset: usize, value: i32) {
    buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn write_u64(buffer: &mut [u8], offset: usize, value: u64) {
    buffer[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

pub fn read_u32(buffer: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(buffer[offset..offset + 4].try_into().unwrap())
}

fn signal_size(signal: &Signal) -> usize {
    SIGNAL_HEADER_SIZE + signal.parameters.len() * PARAMETER_ENTRY_SIZE
}

/// The fixed-size part of one object body, i.e. everything before its
/// signal records.
fn object_size_excluding_signals(object: &Object) -> usize {
    OBJECT_HEADER_SIZE
        + object.functions.len() * 4
        + object.properties.len() * PROPERTY_ENTRY_SIZE
        + object.bindings.len() * BINDING_ENTRY_SIZE
        + object.signals.len() * 4
}

pub struct QmlUnitGenerator<'a> {
    document: &'a Document,
}

impl<'a> QmlUnitGenerator<'a> {
    pub fn new(document: &'a Document) -> Self {
        QmlUnitGenerator { document }
    }

    /// Produce the final unit. `js_unit` is the external script compiler's
    /// output (its header region is patched in place);
    /// `runtime_function_indices` maps the document's local function list
    /// to the indices the script compiler assigned.
    pub fn generate(&self, js_unit: Vec<u8>, runtime_function_indices: &[u32]) -> Vec<u8> {
        assert!(
            js_unit.len() >= UNIT_HEADER_SIZE,
            "script unit is missing its header region"
        );

        let document = self.document;
        let unit_size = js_unit.len();
        let import_table_size = document.imports.len() * IMPORT_ENTRY_SIZE;
        let object_offset_table_size = document.objects.len() * 4;

        // Phase one: every object's absolute offset in the final buffer.
        let body_base = unit_size + import_table_size + object_offset_table_size;
        let mut object_offsets = Vec::with_capacity(document.objects.len());
        let mut objects_size = 0usize;
        for object in &document.objects {
            object_offsets.push((body_base + objects_size) as u32);
            objects_size += object_size_excluding_signals(object);
            objects_size += object.signals.iter().map(signal_size).sum::<usize>();
        }

        // Phase two: one allocation, then flat copies.
        let total_size = body_base + objects_size;
        let mut data = js_unit;
        data.resize(total_size, 0);

        let mut flags = UnitFlags::from_bits_retain(read_u32(&data, HEADER_FLAGS_OFFSET));
        flags |= UnitFlags::IS_QML;
        if document
            .pragmas
            .iter()
            .any(|p| p.kind == crate::ir::PragmaKind::Singleton)
        {
            flags |= UnitFlags::IS_SINGLETON;
        }
        write_u32(&mut data, HEADER_FLAGS_OFFSET, flags.bits());
        write_u32(&mut data, HEADER_OFFSET_TO_IMPORTS, unit_size as u32);
        write_u32(&mut data, HEADER_N_IMPORTS, document.imports.len() as u32);
        write_u32(
            &mut data,
            HEADER_OFFSET_TO_OBJECTS,
            (unit_size + import_table_size) as u32,
        );
        write_u32(&mut data, HEADER_N_OBJECTS, document.objects.len() as u32);
        write_u32(
            &mut data,
            HEADER_INDEX_OF_ROOT_OBJECT,
            document.index_of_root_object as u32,
        );

        let mut import_ptr = unit_size;
        for import in &document.imports {
            write_import(&mut data, import_ptr, import);
            import_ptr += IMPORT_ENTRY_SIZE;
        }

        let mut table_ptr = unit_size + import_table_size;
        for (object, offset) in document.objects.iter().zip(&object_offsets) {
            write_u32(&mut data, table_ptr, *offset);
            table_ptr += 4;
            write_object(&mut data, *offset as usize, object, runtime_function_indices);
        }

        data
    }
}

fn write_import(buffer: &mut [u8], at: usize, import: &Import) {
    write_u32(buffer, at, import.kind as u32);
    write_u32(buffer, at + 4, import.uri_index);
    write_u32(buffer, at + 8, import.qualifier_index);
    write_i32(buffer, at + 12, import.major_version);
    write_i32(buffer, at + 16, import.minor_version);
    write_u32(buffer, at + 20, import.location.packed());
}

fn write_object(buffer: &mut [u8], at: usize, object: &Object, runtime_function_indices: &[u32]) {
    write_u32(buffer, at + OBJECT_INHERITED_TYPE_NAME, object.inherited_type_name_index);
    write_u32(buffer, at + OBJECT_ID_INDEX, object.id_index);
    write_i32(buffer, at + OBJECT_INDEX_OF_DEFAULT_PROPERTY, object.index_of_default_property);
    write_u32(buffer, at + OBJECT_LOCATION, object.location.packed());
    write_u32(
        buffer,
        at + OBJECT_LOCATION_OF_ID_PROPERTY,
        object.location_of_id_property.packed(),
    );

    let offset_to_functions = OBJECT_HEADER_SIZE;
    let offset_to_properties = offset_to_functions + object.functions.len() * 4;
    let offset_to_bindings = offset_to_properties + object.properties.len() * PROPERTY_ENTRY_SIZE;
    let offset_to_signals = offset_to_bindings + object.bindings.len() * BINDING_ENTRY_SIZE;

    write_u32(buffer, at + OBJECT_N_FUNCTIONS, object.functions.len() as u32);
    write_u32(buffer, at + OBJECT_OFFSET_TO_FUNCTIONS, offset_to_functions as u32);
    write_u32(buffer, at + OBJECT_N_PROPERTIES, object.properties.len() as u32);
    write_u32(buffer, at + OBJECT_OFFSET_TO_PROPERTIES, offset_to_properties as u32);
    write_u32(buffer, at + OBJECT_N_BINDINGS, object.bindings.len() as u32);
    write_u32(buffer, at + OBJECT_OFFSET_TO_BINDINGS, offset_to_bindings as u32);
    write_u32(buffer, at + OBJECT_N_SIGNALS, object.signals.len() as u32);
    write_u32(buffer, at + OBJECT_OFFSET_TO_SIGNALS, offset_to_signals as u32);

    let mut function_ptr = at + offset_to_functions;
    for function in &object.functions {
        write_u32(buffer, function_ptr, runtime_function_indices[function.index]);
        function_ptr += 4;
    }

    let mut property_ptr = at + offset_to_properties;
    for property in &object.properties {
        write_property(buffer, property_ptr, property);
        property_ptr += PROPERTY_ENTRY_SIZE;
    }

    let mut binding_ptr = at + offset_to_bindings;
    for binding in &object.bindings {
        write_binding(buffer, binding_ptr, binding, runtime_function_indices);
        binding_ptr += BINDING_ENTRY_SIZE;
    }

    // Signal offset table, then the records it points at.
    let mut offset_table_ptr = at + offset_to_signals;
    let mut signal_ptr = at + offset_to_signals + object.signals.len() * 4;
    for signal in &object.signals {
        write_u32(buffer, offset_table_ptr, (signal_ptr - at) as u32);
        offset_table_ptr += 4;

        write_u32(buffer, signal_ptr, signal.name_index);
        write_u32(buffer, signal_ptr + 4, signal.parameters.len() as u32);
        write_u32(buffer, signal_ptr + 8, signal.location.packed());

        let mut parameter_ptr = signal_ptr + SIGNAL_HEADER_SIZE;
        for parameter in &signal.parameters {
            write_u32(buffer, parameter_ptr, parameter.name_index);
            write_u32(buffer, parameter_ptr + 4, parameter.param_type as u32);
            write_u32(buffer, parameter_ptr + 8, parameter.custom_type_name_index);
            write_u32(buffer, parameter_ptr + 12, parameter.location.packed());
            parameter_ptr += PARAMETER_ENTRY_SIZE;
        }

        signal_ptr += signal_size(signal);
    }
}

fn write_property(buffer: &mut [u8], at: usize, property: &Property) {
    write_u32(buffer, at, property.name_index);
    write_u32(buffer, at + 4, property.prop_type as u32);
    // Custom types and aliases share the third slot.
    let custom_or_alias = if property.prop_type == PropertyType::Alias {
        property.alias_id_value_index
    } else {
        property.custom_type_name_index
    };
    write_u32(buffer, at + 8, custom_or_alias);
    write_u32(buffer, at + 12, property.alias_property_value_index);
    write_u32(buffer, at + 16, property.flags.bits());
    write_u32(buffer, at + 20, property.location.packed());
    write_u32(buffer, at + 24, property.alias_location.packed());
}

fn write_binding(buffer: &mut [u8], at: usize, binding: &Binding, runtime_function_indices: &[u32]) {
    write_u32(buffer, at, binding.property_name_index);
    write_u32(buffer, at + 4, binding.kind as u32);
    write_u32(buffer, at + 8, binding.flags.bits());

    // Script bindings are remapped from the document's local function list
    // to the indices assigned by the external script compiler.
    let value: u64 = match binding.value {
        BindingValue::Invalid => 0,
        BindingValue::Boolean(b) => b as u64,
        BindingValue::Number(n) => n.to_bits(),
        BindingValue::String(index) => index as u64,
        BindingValue::Script(index) => {
            debug_assert_eq!(binding.kind, BindingKind::Script);
            runtime_function_indices[index] as u64
        }
        BindingValue::Object(index) => index as u64,
    };
    write_u64(buffer, at + 12, value);

    write_u32(buffer, at + 20, binding.string_index);
    write_u32(buffer, at + 24, binding.location.packed());
    write_u32(buffer, at + 28, binding.value_location.packed());
}
