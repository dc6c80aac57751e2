//! The in-memory object model produced by the builder.
//!
//! Objects live in one arena (the document's ordered object list) and refer
//! to each other only by integer index, never by reference. That keeps the
//! model trivially relocatable and makes the serializer a flat copy.

use std::collections::HashSet;

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::ast;
use crate::parse_util::SourceLocation;
use crate::string_pool::{StringIndex, StringPool};

/// Index of an object in the document's object list.
pub type ObjectIndex = usize;

/// Index into the document's compiled-function-or-expression list.
pub type FunctionIndex = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u32)]
pub enum PropertyType {
    Int = 0,
    Bool,
    Real,
    String,
    Url,
    Color,
    DateTime,
    Rect,
    Point,
    Size,
    Font,
    Vector2D,
    Vector3D,
    Vector4D,
    Quaternion,
    Matrix4x4,
    Variant,
    Var,
    Alias,
    Custom,
    CustomList,
}

impl PropertyType {
    /// Custom and CustomList types carry a type name that must be resolved
    /// by the external metadata collaborator.
    pub fn is_custom(self) -> bool {
        self >= PropertyType::Custom
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct PropertyFlags: u32 {
        const IS_READ_ONLY = 0x1;
    }
}

#[derive(Debug, Clone)]
pub struct Property {
    pub name_index: StringIndex,
    pub prop_type: PropertyType,
    /// Set only when `prop_type.is_custom()`.
    pub custom_type_name_index: StringIndex,
    /// For Alias properties: the interned target id.
    pub alias_id_value_index: StringIndex,
    /// For Alias properties: the interned dotted path past the id (may be
    /// the empty string for a bare `alias a: someId`).
    pub alias_property_value_index: StringIndex,
    pub flags: PropertyFlags,
    pub location: SourceLocation,
    pub alias_location: SourceLocation,
}

impl Property {
    pub fn is_read_only(&self) -> bool {
        self.flags.contains(PropertyFlags::IS_READ_ONLY)
    }
}

#[derive(Debug, Clone)]
pub struct SignalParameter {
    pub name_index: StringIndex,
    pub param_type: PropertyType,
    pub custom_type_name_index: StringIndex,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct Signal {
    pub name_index: StringIndex,
    pub parameters: SmallVec<[SignalParameter; 4]>,
    pub location: SourceLocation,
}

impl Signal {
    pub fn parameter_string_list(&self, pool: &StringPool) -> Vec<String> {
        self.parameters
            .iter()
            .map(|p| pool.string_at(p.name_index).to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BindingKind {
    Invalid = 0,
    Boolean,
    Number,
    String,
    Script,
    Object,
    GroupProperty,
    AttachedProperty,
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct BindingFlags: u32 {
        const IS_SIGNAL_HANDLER_EXPRESSION = 0x1;
        const IS_SIGNAL_HANDLER_OBJECT = 0x2;
        const IS_ON_ASSIGNMENT = 0x4;
        const INITIALIZER_FOR_READ_ONLY_DECLARATION = 0x8;
        const IS_LIST_ITEM = 0x10;
    }
}

/// The classified right-hand side of a binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BindingValue {
    Invalid,
    Boolean(bool),
    Number(f64),
    /// Interned string literal.
    String(StringIndex),
    /// Index into the document's function list; remapped to the external
    /// script compiler's runtime index at serialization time.
    Script(FunctionIndex),
    Object(ObjectIndex),
}

#[derive(Debug, Clone)]
pub struct Binding {
    /// Empty-string index means the enclosing object's default property.
    pub property_name_index: StringIndex,
    pub kind: BindingKind,
    pub value: BindingValue,
    /// For String bindings the literal, for Script bindings the raw source
    /// text of the expression.
    pub string_index: StringIndex,
    pub flags: BindingFlags,
    pub location: SourceLocation,
    pub value_location: SourceLocation,
}

/// A function declared in an object body. The declaration itself lives in
/// the document's function list; this records its slot and name.
#[derive(Debug, Clone)]
pub struct Function {
    pub name_index: StringIndex,
    pub index: FunctionIndex,
    pub location: SourceLocation,
}

/// An entry for the external script compiler: either a binding expression
/// statement or a declared (possibly synthesized) function.
#[derive(Debug, Clone)]
pub enum CompiledFunctionOrExpression {
    Statement(ast::Statement),
    Function(ast::FunctionDeclaration),
}

impl CompiledFunctionOrExpression {
    pub fn as_function(&self) -> Option<&ast::FunctionDeclaration> {
        match self {
            CompiledFunctionOrExpression::Function(f) => Some(f),
            CompiledFunctionOrExpression::Statement(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ImportKind {
    Library = 0,
    File,
    Script,
}

#[derive(Debug, Clone)]
pub struct Import {
    pub kind: ImportKind,
    pub uri_index: StringIndex,
    pub qualifier_index: StringIndex,
    /// -1 when the import carries no version (file and script imports).
    pub major_version: i32,
    pub minor_version: i32,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PragmaKind {
    Singleton,
}

#[derive(Debug, Clone)]
pub struct Pragma {
    pub kind: PragmaKind,
    pub location: SourceLocation,
}

/// Index value meaning "no default property declared".
pub const NO_DEFAULT_PROPERTY: i32 = -1;

/// One component object: a typed instance, or a synthetic group/attached
/// placeholder when `inherited_type_name_index` is the empty string.
#[derive(Debug, Clone, Default)]
pub struct Object {
    pub inherited_type_name_index: StringIndex,
    pub id_index: StringIndex,
    pub index_of_default_property: i32,
    pub properties: Vec<Property>,
    pub signals: Vec<Signal>,
    pub bindings: Vec<Binding>,
    pub functions: Vec<Function>,
    /// New property/signal/function declarations are routed to this object
    /// instead, modelling `prop { property int x }` declaring `x` on the
    /// enclosing object rather than the initializer object.
    pub declarations_override: Option<ObjectIndex>,
    pub location: SourceLocation,
    pub location_of_id_property: SourceLocation,

    property_names: HashSet<StringIndex>,
    signal_names: HashSet<StringIndex>,
    binding_names: HashSet<StringIndex>,
}

impl Object {
    pub fn new(
        inherited_type_name_index: StringIndex,
        id_index: StringIndex,
        location: SourceLocation,
    ) -> Self {
        Object {
            inherited_type_name_index,
            id_index,
            index_of_default_property: NO_DEFAULT_PROPERTY,
            location,
            ..Object::default()
        }
    }

    pub fn has_signal_named(&self, name_index: StringIndex) -> bool {
        self.signal_names.contains(&name_index)
    }

    /// Append a signal declaration; the name must be unique on this object.
    pub fn append_signal(&mut self, signal: Signal) -> Result<(), &'static str> {
        if !self.signal_names.insert(signal.name_index) {
            return Err("Duplicate signal name");
        }
        self.signals.push(signal);
        Ok(())
    }

    /// Append a property declaration, returning its index in the property
    /// list. Name uniqueness and the lowercase rule are enforced here;
    /// default-property accounting is the builder's job because its error
    /// location differs.
    pub fn append_property(&mut self, property: Property, name: &str) -> Result<usize, &'static str> {
        if self.property_names.contains(&property.name_index) {
            return Err("Duplicate property name");
        }
        if name.chars().next().is_some_and(char::is_uppercase) {
            return Err("Property names cannot begin with an upper case letter");
        }
        self.property_names.insert(property.name_index);
        self.properties.push(property);
        Ok(self.properties.len() - 1)
    }

    pub fn append_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    /// Append a binding. Plain value bindings may only set a property once;
    /// list items, default-property bindings, group/attached placeholders
    /// and `on` assignments are exempt from that rule.
    pub fn append_binding(
        &mut self,
        binding: Binding,
        is_list_binding: bool,
        bind_to_default_property: bool,
    ) -> Result<(), &'static str> {
        let exempt = is_list_binding
            || bind_to_default_property
            || binding.kind == BindingKind::GroupProperty
            || binding.kind == BindingKind::AttachedProperty
            || binding.flags.contains(BindingFlags::IS_ON_ASSIGNMENT);
        if !exempt && !self.binding_names.insert(binding.property_name_index) {
            return Err("Property value set multiple times");
        }
        self.bindings.push(binding);
        Ok(())
    }
}

/// The fully built model for one component file, consumed exactly once by
/// the unit serializer.
#[derive(Debug)]
pub struct Document {
    pub code: String,
    pub url: String,
    pub imports: Vec<Import>,
    pub pragmas: Vec<Pragma>,
    pub objects: Vec<Object>,
    pub functions: Vec<CompiledFunctionOrExpression>,
    pub string_pool: StringPool,
    pub index_of_root_object: ObjectIndex,
    pub type_references: crate::type_references::TypeReferenceMap,
}

impl Document {
    pub fn string_at(&self, index: StringIndex) -> &str {
        self.string_pool.string_at(index)
    }
}
