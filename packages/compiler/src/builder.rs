//! Builds the object model from a parsed syntax tree.
//!
//! One builder pass produces the complete `Document`: the object arena,
//! imports, pragmas, the function/expression list for the external script
//! compiler, and the type-reference table. Errors are accumulated; any
//! error means the whole compilation fails and no document is returned.
//!
//! The current object and the current property-declaration context are
//! threaded through the visit calls as an explicit [`VisitContext`], so
//! nested traversals cannot leave a stale cursor behind.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{
    self, qualified_id_to_string, ImportNode, Member, ObjectDefinition, PragmaNode, PublicMember,
    QualifiedId, QualifiedIdSegment,
};
use crate::ir::{
    Binding, BindingFlags, BindingKind, BindingValue, CompiledFunctionOrExpression, Document,
    Function, Import, ImportKind, Object, ObjectIndex, Pragma, PragmaKind, Property, PropertyFlags,
    PropertyType, Signal, SignalParameter, NO_DEFAULT_PROPERTY,
};
use crate::parse_util::{CompileError, SourceSpan};
use crate::string_pool::{StringIndex, StringPool};
use crate::type_references::collect_type_references;

/// `on` followed by optional underscores and an uppercase letter marks a
/// signal-handler property name (`onClicked`, `on_activated`).
static SIGNAL_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^on_*\p{Lu}").unwrap());

/// Built-in property type names. Matched by exact comparison before any
/// custom-type fallback.
const BUILTIN_TYPES: &[(&str, PropertyType)] = &[
    ("int", PropertyType::Int),
    ("bool", PropertyType::Bool),
    ("double", PropertyType::Real),
    ("real", PropertyType::Real),
    ("string", PropertyType::String),
    ("url", PropertyType::Url),
    ("color", PropertyType::Color),
    // Date, time and datetime values are all surfaced as one datetime type,
    // so only "date" is accepted here.
    ("date", PropertyType::DateTime),
    ("rect", PropertyType::Rect),
    ("point", PropertyType::Point),
    ("size", PropertyType::Size),
    ("font", PropertyType::Font),
    ("vector2d", PropertyType::Vector2D),
    ("vector3d", PropertyType::Vector3D),
    ("vector4d", PropertyType::Vector4D),
    ("quaternion", PropertyType::Quaternion),
    ("matrix4x4", PropertyType::Matrix4x4),
    ("variant", PropertyType::Variant),
    ("var", PropertyType::Var),
];

const SCRIPT_EXTENSION: &str = ".js";

const ALIAS_REFERENCE_ERROR: &str = "Invalid alias reference. An alias reference must be \
     specified as <id>, <id>.<property> or <id>.<value property>.<property>";

/// Whether a binding's property name has the `on<Signal>` handler shape.
pub fn is_signal_property_name(name: &str) -> bool {
    name.len() >= 3 && SIGNAL_NAME_PATTERN.is_match(name)
}

fn first_char_is_upper(s: &str) -> bool {
    s.chars().next().is_some_and(char::is_uppercase)
}

/// The traversal cursor: which object members are appended to, and the
/// flags of the property declaration currently being initialized (if any).
#[derive(Debug, Clone, Copy)]
struct VisitContext {
    object: ObjectIndex,
    declaration: Option<PropertyFlags>,
}

impl VisitContext {
    fn with_object(self, object: ObjectIndex) -> Self {
        VisitContext { object, ..self }
    }
}

pub struct DocumentBuilder {
    url: String,
    source: String,
    pool: StringPool,
    empty_string_index: StringIndex,
    imports: Vec<Import>,
    pragmas: Vec<Pragma>,
    objects: Vec<Object>,
    functions: Vec<CompiledFunctionOrExpression>,
    illegal_names: HashSet<String>,
    errors: Vec<CompileError>,
}

impl DocumentBuilder {
    pub fn new(illegal_names: HashSet<String>) -> Self {
        DocumentBuilder {
            url: String::new(),
            source: String::new(),
            pool: StringPool::new(),
            empty_string_index: 0,
            imports: Vec::new(),
            pragmas: Vec::new(),
            objects: Vec::new(),
            functions: Vec::new(),
            illegal_names,
            errors: Vec::new(),
        }
    }

    /// Build the document for one component file. The program must come
    /// from a successful parse; its root member is an object definition.
    pub fn build(
        mut self,
        program: &ast::Program,
        code: String,
        url: &str,
    ) -> Result<Document, Vec<CompileError>> {
        self.url = url.to_string();
        self.source = code;
        self.empty_string_index = self.pool.register("");

        for header in &program.headers {
            match header {
                ast::Header::Import(node) => self.visit_import(node),
                ast::Header::Pragma(node) => self.visit_pragma(node),
            }
        }

        if program.members.len() > 1 {
            let location = member_location(&program.members[1]);
            self.record_error(location, "Unexpected object definition");
            return Err(self.errors);
        }

        // An empty or non-object root is a parser contract breach, not
        // malformed user input.
        let root = match program.members.first() {
            Some(Member::ObjectDefinition(def)) => def,
            _ => panic!("parser handed over a program without a root object definition"),
        };

        let root_location = root.qualified_type_name[0].location;
        let index_of_root_object = self.define_object(
            Some(&root.qualified_type_name),
            root_location,
            &root.initializer,
            None,
        );

        let type_references = collect_type_references(&self.objects, self.empty_string_index);

        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        Ok(Document {
            code: self.source,
            url: self.url,
            imports: self.imports,
            pragmas: self.pragmas,
            objects: self.objects,
            functions: self.functions,
            string_pool: self.pool,
            index_of_root_object,
            type_references,
        })
    }

    fn record_error(&mut self, location: SourceSpan, message: impl Into<String>) {
        self.errors
            .push(CompileError::new(&self.url, location.start(), message));
    }

    fn string_at(&self, index: StringIndex) -> &str {
        self.pool.string_at(index)
    }

    /// Create a new object in the arena and traverse its initializer.
    /// Passing `declarations_override` routes any property/signal/function
    /// declarations made inside the initializer to that object instead.
    fn define_object(
        &mut self,
        qualified_type_name: Option<&QualifiedId>,
        location: SourceSpan,
        initializer: &[Member],
        declarations_override: Option<ObjectIndex>,
    ) -> ObjectIndex {
        let type_name = qualified_type_name
            .map(|id| qualified_id_to_string(id))
            .unwrap_or_default();
        let type_name_index = self.pool.register(&type_name);

        let mut object = Object::new(type_name_index, self.empty_string_index, location.start());
        object.declarations_override = declarations_override;
        self.objects.push(object);
        let index = self.objects.len() - 1;

        let ctx = VisitContext {
            object: index,
            declaration: None,
        };
        for member in initializer {
            self.visit_member(member, ctx);
        }

        self.sanity_check_function_names(index);

        index
    }

    fn visit_member(&mut self, member: &Member, ctx: VisitContext) {
        match member {
            Member::ObjectDefinition(def) => self.visit_object_definition(def, ctx),
            Member::ObjectBinding {
                qualified_id,
                qualified_type_name,
                initializer,
                is_on_assignment,
            } => {
                let location = qualified_type_name[0].location;
                let index =
                    self.define_object(Some(qualified_type_name), location, initializer, None);
                self.append_object_binding(qualified_id, index, *is_on_assignment, ctx);
            }
            Member::ArrayBinding {
                qualified_id,
                members,
            } => self.visit_array_binding(qualified_id, members, ctx),
            Member::ScriptBinding {
                qualified_id,
                statement,
            } => self.append_script_binding(qualified_id, statement, ctx),
            Member::PublicMember(node) => self.visit_public_member(node, ctx),
            Member::SourceElement(node) => self.visit_source_element(node, ctx),
        }
    }

    /// The grammar cannot distinguish `Item { ... }` (a new typed object
    /// bound to the default property) from `font { ... }` (a value
    /// initializer for the `font` property): the split is purely lexical,
    /// on the case of the final name segment.
    fn visit_object_definition(&mut self, def: &ObjectDefinition, ctx: VisitContext) {
        let last_segment = def
            .qualified_type_name
            .last()
            .expect("qualified type names have at least one segment");

        if first_char_is_upper(&last_segment.name) {
            let location = def.qualified_type_name[0].location;
            let index =
                self.define_object(Some(&def.qualified_type_name), location, &def.initializer, None);
            self.append_binding_object(
                location,
                self.empty_string_index,
                index,
                false,
                false,
                ctx,
            );
        } else {
            let location = def.qualified_type_name[0].location;
            // Declarations inside the initializer belong to the enclosing
            // object, not the synthetic value object.
            let index = self.define_object(None, location, &def.initializer, Some(ctx.object));
            self.append_object_binding(&def.qualified_type_name, index, false, ctx);
        }
    }

    fn visit_array_binding(
        &mut self,
        qualified_id: &[QualifiedIdSegment],
        members: &[ObjectDefinition],
        ctx: VisitContext,
    ) {
        let Some((terminal, target)) = self.resolve_qualified_id(qualified_id, ctx) else {
            return;
        };
        let name_index = self.pool.register(&terminal.name);
        let list_ctx = ctx.with_object(target);

        for def in members {
            let location = def.qualified_type_name[0].location;
            let index =
                self.define_object(Some(&def.qualified_type_name), location, &def.initializer, None);
            self.append_binding_object(terminal.location, name_index, index, true, false, list_ctx);
        }
    }

    fn append_object_binding(
        &mut self,
        qualified_id: &[QualifiedIdSegment],
        object_index: ObjectIndex,
        is_on_assignment: bool,
        ctx: VisitContext,
    ) {
        let Some((terminal, target)) = self.resolve_qualified_id(qualified_id, ctx) else {
            return;
        };
        let name_index = self.pool.register(&terminal.name);
        self.append_binding_object(
            terminal.location,
            name_index,
            object_index,
            false,
            is_on_assignment,
            ctx.with_object(target),
        );
    }

    fn append_script_binding(
        &mut self,
        qualified_id: &[QualifiedIdSegment],
        statement: &ast::Statement,
        ctx: VisitContext,
    ) {
        let Some((terminal, target)) = self.resolve_qualified_id(qualified_id, ctx) else {
            return;
        };
        let name_index = self.pool.register(&terminal.name);
        self.append_binding_script(terminal.location, name_index, statement, ctx.with_object(target));
    }

    fn append_binding_script(
        &mut self,
        name_location: SourceSpan,
        property_name_index: StringIndex,
        statement: &ast::Statement,
        ctx: VisitContext,
    ) {
        if self.string_at(property_name_index) == "id" {
            self.set_id(ctx.object, statement);
            return;
        }

        let bind_to_default_property = property_name_index == self.empty_string_index;

        let mut binding = Binding {
            property_name_index,
            kind: BindingKind::Invalid,
            value: BindingValue::Invalid,
            string_index: self.empty_string_index,
            flags: BindingFlags::empty(),
            location: name_location.start(),
            value_location: Default::default(),
        };
        self.set_binding_value(&mut binding, statement, ctx);

        let target = self.bindings_target(ctx);
        if let Err(message) =
            self.objects[target].append_binding(binding, false, bind_to_default_property)
        {
            self.record_error(name_location, message);
        }
    }

    fn append_binding_object(
        &mut self,
        name_location: SourceSpan,
        property_name_index: StringIndex,
        object_index: ObjectIndex,
        is_list_item: bool,
        is_on_assignment: bool,
        ctx: VisitContext,
    ) {
        if self.string_at(property_name_index) == "id" {
            self.record_error(name_location, "Invalid component id specification");
            return;
        }

        let bind_to_default_property = property_name_index == self.empty_string_index;
        let bound = &self.objects[object_index];

        let mut flags = BindingFlags::empty();
        if let Some(declaration) = ctx.declaration {
            if declaration.contains(PropertyFlags::IS_READ_ONLY) {
                flags |= BindingFlags::INITIALIZER_FOR_READ_ONLY_DECLARATION;
            }
        }
        if is_on_assignment {
            flags |= BindingFlags::IS_ON_ASSIGNMENT;
        }
        if is_list_item {
            flags |= BindingFlags::IS_LIST_ITEM;
        }

        // No type name on the bound object means it is a value initializer
        // for a grouped property.
        let kind = if bound.inherited_type_name_index == self.empty_string_index {
            BindingKind::GroupProperty
        } else {
            BindingKind::Object
        };

        let binding = Binding {
            property_name_index,
            kind,
            value: BindingValue::Object(object_index),
            string_index: self.empty_string_index,
            flags,
            location: name_location.start(),
            value_location: bound.location,
        };

        let target = self.bindings_target(ctx);
        if let Err(message) =
            self.objects[target].append_binding(binding, is_list_item, bind_to_default_property)
        {
            self.record_error(name_location, message);
        }
    }

    /// Classify a statement-shaped right-hand side: an exact string,
    /// boolean or (possibly negated) numeric literal becomes a constant
    /// binding, everything else is registered as script.
    fn set_binding_value(
        &mut self,
        binding: &mut Binding,
        statement: &ast::Statement,
        ctx: VisitContext,
    ) {
        binding.value_location = statement.location.start();

        if let Some(declaration) = ctx.declaration {
            if declaration.contains(PropertyFlags::IS_READ_ONLY) {
                binding.flags |= BindingFlags::INITIALIZER_FOR_READ_ONLY_DECLARATION;
            }
        }

        if let Some(expr) = statement.expression() {
            match &expr.kind {
                ast::ExpressionKind::StringLiteral(value) => {
                    binding.kind = BindingKind::String;
                    let index = self.pool.register(value);
                    binding.value = BindingValue::String(index);
                    binding.string_index = index;
                }
                ast::ExpressionKind::TrueLiteral => {
                    binding.kind = BindingKind::Boolean;
                    binding.value = BindingValue::Boolean(true);
                }
                ast::ExpressionKind::FalseLiteral => {
                    binding.kind = BindingKind::Boolean;
                    binding.value = BindingValue::Boolean(false);
                }
                ast::ExpressionKind::NumberLiteral(value) => {
                    binding.kind = BindingKind::Number;
                    binding.value = BindingValue::Number(*value);
                }
                ast::ExpressionKind::UnaryMinus(inner) => {
                    if let ast::ExpressionKind::NumberLiteral(value) = inner.kind {
                        binding.kind = BindingKind::Number;
                        binding.value = BindingValue::Number(-value);
                    }
                }
                _ => {}
            }
        }

        if binding.kind == BindingKind::Invalid {
            binding.kind = BindingKind::Script;
            self.functions
                .push(CompiledFunctionOrExpression::Statement(statement.clone()));
            binding.value = BindingValue::Script(self.functions.len() - 1);
            binding.string_index = self.pool.register(statement.location.text(&self.source));
        }
    }

    fn bindings_target(&self, ctx: VisitContext) -> ObjectIndex {
        if ctx.declaration.is_some() {
            if let Some(override_index) = self.objects[ctx.object].declarations_override {
                return override_index;
            }
        }
        ctx.object
    }

    /// Divert an `id: value` binding into the object's id slot. The value
    /// must reduce to an identifier-shaped string at compile time.
    fn set_id(&mut self, object: ObjectIndex, statement: &ast::Statement) {
        let location = statement.location;

        let text = match statement.expression() {
            Some(expr) => match &expr.kind {
                ast::ExpressionKind::StringLiteral(value) => value.clone(),
                _ => expr.location.text(&self.source).to_string(),
            },
            None => location.text(&self.source).to_string(),
        };

        if text.is_empty() {
            self.record_error(location, "Invalid empty ID");
            return;
        }

        let first = text.chars().next().unwrap();
        if first.is_alphabetic() && !first.is_lowercase() {
            self.record_error(location, "IDs cannot start with an uppercase letter");
            return;
        }
        if !first.is_alphabetic() && first != '_' {
            self.record_error(location, "IDs must start with a letter or underscore");
            return;
        }
        for ch in text.chars().skip(1) {
            if !ch.is_alphanumeric() && ch != '_' {
                self.record_error(location, "IDs must contain only letters, numbers, and underscores");
                return;
            }
        }

        if self.illegal_names.contains(&text) {
            self.record_error(location, "ID illegally masks global JavaScript property");
            return;
        }

        let id_index = self.pool.register(&text);
        let obj = &mut self.objects[object];
        obj.id_index = id_index;
        obj.location_of_id_property = location.start();
    }

    /// Expand the dotted left-hand side of a binding into a chain of
    /// synthetic group/attached objects, returning the terminal segment and
    /// the object it should be bound on.
    fn resolve_qualified_id(
        &mut self,
        qualified_id: &[QualifiedIdSegment],
        ctx: VisitContext,
    ) -> Option<(QualifiedIdSegment, ObjectIndex)> {
        if qualified_id[0].name == "id" && qualified_id.len() > 1 {
            self.record_error(qualified_id[0].location, "Invalid use of id property");
            return None;
        }

        let mut index = 0;
        let mut current_name = qualified_id[0].name.clone();

        // A leading import qualifier and the following type name form one
        // namespaced reference, resolved to the concrete type later.
        if qualified_id.len() > 1 {
            let is_qualifier = self.imports.iter().any(|import| {
                import.qualifier_index != self.empty_string_index
                    && self.pool.string_at(import.qualifier_index) == current_name
            });
            if is_qualifier {
                index = 1;
                let type_segment = &qualified_id[1];
                current_name.push('.');
                current_name.push_str(&type_segment.name);

                if !first_char_is_upper(&type_segment.name) {
                    self.record_error(type_segment.location, "Expected type name");
                    return None;
                }
            }
        }

        let mut object = ctx.object;
        while index + 1 < qualified_id.len() {
            let segment = &qualified_id[index];
            let kind = if first_char_is_upper(&segment.name) {
                BindingKind::AttachedProperty
            } else {
                BindingKind::GroupProperty
            };

            let synthetic = self.define_object(None, SourceSpan::default(), &[], None);
            let binding = Binding {
                property_name_index: self.pool.register(&current_name),
                kind,
                value: BindingValue::Object(synthetic),
                string_index: self.empty_string_index,
                flags: BindingFlags::empty(),
                location: segment.location.start(),
                value_location: Default::default(),
            };

            if let Err(message) = self.objects[object].append_binding(binding, false, false) {
                self.record_error(segment.location, message);
                return None;
            }
            object = synthetic;

            index += 1;
            current_name = qualified_id[index].name.clone();
        }

        Some((qualified_id[index].clone(), object))
    }

    fn visit_public_member(&mut self, node: &PublicMember, ctx: VisitContext) {
        match node {
            PublicMember::Signal {
                name,
                name_token,
                type_token,
                parameters,
            } => self.visit_signal_declaration(name, *name_token, *type_token, parameters, ctx),
            PublicMember::Property { .. } => self.visit_property_declaration(node, ctx),
        }
    }

    fn visit_signal_declaration(
        &mut self,
        name: &str,
        name_token: SourceSpan,
        type_token: SourceSpan,
        parameters: &[ast::ParameterNode],
        ctx: VisitContext,
    ) {
        let mut signal = Signal {
            name_index: self.pool.register(name),
            parameters: Default::default(),
            location: type_token.start(),
        };

        for parameter in parameters {
            if parameter.type_name.is_empty() {
                self.record_error(type_token, "Expected parameter type");
                return;
            }

            let builtin = BUILTIN_TYPES
                .iter()
                .find(|(type_name, _)| *type_name == parameter.type_name);

            let (param_type, custom_type_name_index) = match builtin {
                Some((_, param_type)) => (*param_type, self.empty_string_index),
                None => {
                    if first_char_is_upper(&parameter.type_name) {
                        // An object type; resolved lazily during the
                        // metadata pass.
                        (PropertyType::Custom, self.pool.register(&parameter.type_name))
                    } else {
                        let message =
                            format!("Invalid signal parameter type: {}", parameter.type_name);
                        self.record_error(type_token, message);
                        return;
                    }
                }
            };

            signal.parameters.push(SignalParameter {
                name_index: self.pool.register(&parameter.name),
                param_type,
                custom_type_name_index,
                location: parameter.identifier_token.start(),
            });
        }

        if first_char_is_upper(name) {
            self.record_error(name_token, "Signal names cannot begin with an upper case letter");
            return;
        }
        if self.illegal_names.contains(name) {
            self.record_error(name_token, "Illegal signal name");
            return;
        }

        let target = self.declarations_target(ctx.object);
        if let Err(message) = self.objects[target].append_signal(signal) {
            self.record_error(name_token, message);
        }
    }

    fn visit_property_declaration(&mut self, node: &PublicMember, ctx: VisitContext) {
        let PublicMember::Property {
            first_token,
            type_modifier,
            type_modifier_token,
            member_type,
            type_token,
            name,
            name_token,
            is_default,
            default_token,
            is_readonly,
            statement,
            binding,
            semicolon_token,
        } = node
        else {
            unreachable!("signal declarations are handled separately");
        };

        let mut prop_type = None;
        if member_type == "alias" {
            prop_type = Some(PropertyType::Alias);
        }
        if prop_type.is_none() {
            prop_type = BUILTIN_TYPES
                .iter()
                .find(|(type_name, _)| type_name == member_type)
                .map(|(_, t)| *t);
        }

        if prop_type.is_none() && first_char_is_upper(member_type) {
            prop_type = match type_modifier.as_deref() {
                None => Some(PropertyType::Custom),
                Some("list") => Some(PropertyType::CustomList),
                Some(_) => {
                    self.record_error(*type_modifier_token, "Invalid property type modifier");
                    return;
                }
            };
        } else if type_modifier.is_some() {
            self.record_error(*type_modifier_token, "Unexpected property type modifier");
            return;
        }

        let Some(prop_type) = prop_type else {
            self.record_error(*type_token, "Expected property type");
            return;
        };

        let mut flags = PropertyFlags::empty();
        if *is_readonly {
            flags |= PropertyFlags::IS_READ_ONLY;
        }

        let custom_type_name_index = if prop_type.is_custom() {
            self.pool.register(member_type)
        } else {
            self.empty_string_index
        };

        let mut property = Property {
            name_index: self.pool.register(name),
            prop_type,
            custom_type_name_index,
            alias_id_value_index: self.empty_string_index,
            alias_property_value_index: self.empty_string_index,
            flags,
            location: first_token.start(),
            alias_location: Default::default(),
        };

        if prop_type == PropertyType::Alias {
            if !self.decompose_alias(&mut property, *first_token, statement.as_ref(), binding.as_deref(), *semicolon_token) {
                return;
            }
        } else if let Some(statement) = statement {
            let declaration_ctx = VisitContext {
                object: ctx.object,
                declaration: Some(property.flags),
            };
            self.append_binding_script(*name_token, property.name_index, statement, declaration_ctx);
        }

        if self.illegal_names.contains(name) {
            self.record_error(*name_token, "Illegal property name");
            return;
        }

        let target = self.declarations_target(ctx.object);
        let index = match self.objects[target].append_property(property, name) {
            Ok(index) => index,
            Err(message) => {
                self.record_error(*name_token, message);
                return;
            }
        };

        if *is_default {
            if self.objects[target].index_of_default_property != NO_DEFAULT_PROPERTY {
                self.record_error(*default_token, "Duplicate default property");
                return;
            }
            self.objects[target].index_of_default_property = index as i32;
        }

        if let Some(binding) = binding {
            // Inline object initializers (`property Item o: Item {}`) are
            // traversed with the declaration context active so that their
            // bindings land on the declaring object.
            let declaration_ctx = VisitContext {
                object: ctx.object,
                declaration: Some(flags),
            };
            self.visit_member(binding, declaration_ctx);
        }
    }

    /// Split an alias right-hand side into its target id and the dotted
    /// property path behind it. Only 1–3 identifier segments are legal.
    fn decompose_alias(
        &mut self,
        property: &mut Property,
        declaration_location: SourceSpan,
        statement: Option<&ast::Statement>,
        binding: Option<&Member>,
        semicolon_token: SourceSpan,
    ) -> bool {
        if statement.is_none() && binding.is_none() {
            self.record_error(declaration_location, "No property alias location");
            return false;
        }

        let rhs_location = if let Some(member) = binding {
            member_location(member)
        } else if let Some(statement) = statement {
            statement.location
        } else {
            semicolon_token
        };
        property.alias_location = rhs_location.start();

        let alias_parts = match statement.and_then(ast::Statement::expression) {
            Some(expr) => {
                let parts = ast::expression_to_string_list(expr);
                if parts.is_empty() {
                    if statement_is_script(statement.unwrap()) {
                        self.record_error(rhs_location, ALIAS_REFERENCE_ERROR);
                    } else {
                        self.record_error(rhs_location, "Invalid alias location");
                    }
                    return false;
                }
                parts
            }
            None => {
                self.record_error(rhs_location, ALIAS_REFERENCE_ERROR);
                return false;
            }
        };

        if alias_parts.is_empty() || alias_parts.len() > 3 {
            self.record_error(rhs_location, ALIAS_REFERENCE_ERROR);
            return false;
        }

        property.alias_id_value_index = self.pool.register(&alias_parts[0]);

        let mut property_value = alias_parts.get(1).cloned().unwrap_or_default();
        if alias_parts.len() == 3 {
            property_value.push('.');
            property_value.push_str(&alias_parts[2]);
        }
        property.alias_property_value_index = self.pool.register(&property_value);
        true
    }

    fn visit_source_element(&mut self, node: &ast::SourceElement, ctx: VisitContext) {
        let Some(declaration) = &node.function else {
            self.record_error(node.location, "JavaScript declaration outside Script element");
            return;
        };

        self.functions
            .push(CompiledFunctionOrExpression::Function(declaration.clone()));
        let function = Function {
            name_index: self.pool.register(&declaration.name),
            index: self.functions.len() - 1,
            location: declaration.identifier_token.start(),
        };

        let target = self.declarations_target(ctx.object);
        self.objects[target].append_function(function);
    }

    /// Where new declarations go: the object's declarations override if it
    /// has one, otherwise the object itself.
    fn declarations_target(&self, object: ObjectIndex) -> ObjectIndex {
        self.objects[object].declarations_override.unwrap_or(object)
    }

    /// Validate the method names declared on one object once its whole
    /// initializer has been traversed.
    fn sanity_check_function_names(&mut self, object: ObjectIndex) {
        let mut function_names: HashSet<StringIndex> = HashSet::new();
        let functions = self.objects[object].functions.clone();
        for function in &functions {
            let declaration = self.functions[function.index]
                .as_function()
                .expect("object function entries always reference declarations")
                .clone();

            let location = declaration.identifier_token;
            if !function_names.insert(function.name_index)
                || self.objects[object].has_signal_named(function.name_index)
            {
                self.record_error(location, "Duplicate method name");
                return;
            }
            if first_char_is_upper(&declaration.name) {
                self.record_error(location, "Method names cannot begin with an upper case letter");
                return;
            }
            if self.illegal_names.contains(&declaration.name) {
                self.record_error(location, "Illegal method name");
                return;
            }
        }
    }

    fn visit_import(&mut self, node: &ImportNode) {
        let (kind, uri) = if let Some(file_name) = &node.file_name {
            let kind = if file_name.ends_with(SCRIPT_EXTENSION) {
                ImportKind::Script
            } else {
                ImportKind::File
            };
            (kind, file_name.clone())
        } else {
            let uri = node
                .uri
                .as_ref()
                .map(|id| qualified_id_to_string(id))
                .unwrap_or_default();
            (ImportKind::Library, uri)
        };

        let mut qualifier_index = self.empty_string_index;
        if let Some(qualifier) = &node.qualifier {
            if !first_char_is_upper(qualifier) {
                self.record_error(node.qualifier_token, "Invalid import qualifier ID");
                return;
            }
            qualifier_index = self.pool.register(qualifier);

            // Script-import qualifiers are the names scripts are reached
            // by; they must be globally unique.
            let is_script = kind == ImportKind::Script;
            let clashes = self.imports.iter().any(|other| {
                let other_is_script = other.kind == ImportKind::Script;
                (is_script || other_is_script)
                    && self.pool.string_at(other.qualifier_index) == qualifier.as_str()
            });
            if clashes {
                self.record_error(node.qualifier_token, "Script import qualifiers must be unique.");
                return;
            }
        } else if kind == ImportKind::Script {
            self.record_error(node.file_name_token, "Script import requires a qualifier");
            return;
        }

        let (major_version, minor_version) = match &node.version {
            Some(text) => extract_version(text),
            None => {
                if kind == ImportKind::Library {
                    self.record_error(node.qualifier_token, "Library import requires a version");
                    return;
                }
                // Versionless file/script imports are recorded as -1/-1 so
                // the loader can tell them apart from version 0.0.
                (-1, -1)
            }
        };

        self.imports.push(Import {
            kind,
            uri_index: self.pool.register(&uri),
            qualifier_index,
            major_version,
            minor_version,
            location: node.import_token.start(),
        });
    }

    fn visit_pragma(&mut self, node: &PragmaNode) {
        match node.name.as_deref() {
            Some("Singleton") => self.pragmas.push(Pragma {
                kind: PragmaKind::Singleton,
                location: node.pragma_token.start(),
            }),
            _ => self.record_error(node.pragma_token, "Pragma requires a valid qualifier"),
        }
    }
}

/// `2.1` → (2, 1); a missing minor component defaults to 0.
fn extract_version(text: &str) -> (i32, i32) {
    match text.split_once('.') {
        Some((major, minor)) => (major.parse().unwrap_or(0), minor.parse().unwrap_or(0)),
        None => (text.parse().unwrap_or(0), 0),
    }
}

/// Whether a statement needs the script compiler, i.e. is not one of the
/// constant literal shapes the classifier folds.
fn statement_is_script(statement: &ast::Statement) -> bool {
    let Some(expr) = statement.expression() else {
        return true;
    };
    match &expr.kind {
        ast::ExpressionKind::StringLiteral(_)
        | ast::ExpressionKind::TrueLiteral
        | ast::ExpressionKind::FalseLiteral
        | ast::ExpressionKind::NumberLiteral(_) => false,
        ast::ExpressionKind::UnaryMinus(inner) => {
            !matches!(inner.kind, ast::ExpressionKind::NumberLiteral(_))
        }
        _ => true,
    }
}

fn member_location(member: &Member) -> SourceSpan {
    match member {
        Member::ObjectDefinition(def) => def.qualified_type_name[0].location,
        Member::ObjectBinding { qualified_id, .. }
        | Member::ArrayBinding { qualified_id, .. }
        | Member::ScriptBinding { qualified_id, .. } => qualified_id[0].location,
        Member::PublicMember(PublicMember::Signal { type_token, .. }) => *type_token,
        Member::PublicMember(PublicMember::Property { first_token, .. }) => *first_token,
        Member::SourceElement(element) => element.location,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_property_names() {
        assert!(is_signal_property_name("onClicked"));
        assert!(is_signal_property_name("on_Activated"));
        assert!(!is_signal_property_name("on"));
        assert!(!is_signal_property_name("onclicked"));
        assert!(!is_signal_property_name("on___"));
        assert!(!is_signal_property_name("clicked"));
    }

    #[test]
    fn version_extraction() {
        assert_eq!(extract_version("2.1"), (2, 1));
        assert_eq!(extract_version("3"), (3, 0));
        assert_eq!(extract_version("1.15"), (1, 15));
    }
}
