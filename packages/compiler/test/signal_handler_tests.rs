//! Signal handler conversion: `on<Signal>` bindings become functions once
//! external metadata is available.

#[path = "utils/mod.rs"]
mod utils;

use std::collections::{HashMap, HashSet};

use qml_compiler::ir::{
    BindingFlags, BindingKind, CompiledFunctionOrExpression, Document,
};
use qml_compiler::metadata::{
    PropertyCache, PropertyCaches, PropertyData, ResolvedTypes, TypeInformation,
};
use qml_compiler::parse_util::CompileError;
use qml_compiler::SignalHandlerConverter;
use utils::*;

/// Metadata stub: a flat member table with optional override chains and a
/// revision block list.
#[derive(Default)]
struct StubCache {
    class_name: String,
    members: HashMap<String, PropertyData>,
    overrides: HashMap<i32, PropertyData>,
    signals_by_index: HashMap<i32, PropertyData>,
    parameter_names: HashMap<i32, Vec<String>>,
    revision_blocked: HashSet<i32>,
    next_index: i32,
}

impl StubCache {
    fn new(class_name: &str) -> Self {
        StubCache {
            class_name: class_name.to_string(),
            ..StubCache::default()
        }
    }

    fn allocate(&mut self) -> i32 {
        self.next_index += 1;
        self.next_index
    }

    fn add_signal(&mut self, name: &str, parameters: &[&str]) -> PropertyData {
        let core_index = self.allocate();
        let data = PropertyData {
            core_index,
            notify_index: -1,
            is_function: true,
            is_signal: true,
            is_final: false,
            is_direct: true,
        };
        self.members.insert(name.to_string(), data);
        self.parameter_names.insert(
            core_index,
            parameters.iter().map(|p| p.to_string()).collect(),
        );
        data
    }

    /// A plain property with an auto-generated change signal.
    fn add_property(&mut self, name: &str) -> PropertyData {
        let notify_index = self.allocate();
        let notify = PropertyData {
            core_index: notify_index,
            notify_index: -1,
            is_function: true,
            is_signal: true,
            is_final: false,
            is_direct: true,
        };
        self.signals_by_index.insert(notify_index, notify);
        self.parameter_names.insert(notify_index, Vec::new());

        let core_index = self.allocate();
        let data = PropertyData {
            core_index,
            notify_index,
            is_function: false,
            is_signal: false,
            is_final: false,
            is_direct: true,
        };
        self.members.insert(name.to_string(), data);
        data
    }

    fn block(&mut self, data: PropertyData) {
        self.revision_blocked.insert(data.core_index);
    }

    fn add_override(&mut self, shadowing: PropertyData, shadowed: PropertyData) {
        self.overrides.insert(shadowing.core_index, shadowed);
    }
}

impl PropertyCache for StubCache {
    fn property(&self, name: &str) -> Option<PropertyData> {
        self.members.get(name).copied()
    }

    fn override_data(&self, data: &PropertyData) -> Option<PropertyData> {
        self.overrides.get(&data.core_index).copied()
    }

    fn is_allowed_in_revision(&self, data: &PropertyData) -> bool {
        !self.revision_blocked.contains(&data.core_index)
    }

    fn signal(&self, signal_index: i32) -> Option<PropertyData> {
        self.signals_by_index.get(&signal_index).copied()
    }

    fn signal_parameter_names(&self, data: &PropertyData) -> Vec<String> {
        self.parameter_names
            .get(&data.core_index)
            .cloned()
            .unwrap_or_default()
    }

    fn class_name(&self) -> &str {
        &self.class_name
    }
}

struct StubType {
    module: String,
    major: i32,
    minor: i32,
    attached: Option<StubCache>,
}

impl StubType {
    fn new(module: &str, major: i32, minor: i32) -> Self {
        StubType {
            module: module.to_string(),
            major,
            minor,
            attached: None,
        }
    }

    fn with_attached(mut self, cache: StubCache) -> Self {
        self.attached = Some(cache);
        self
    }
}

impl TypeInformation for StubType {
    fn is_singleton(&self) -> bool {
        false
    }

    fn is_composite_singleton(&self) -> bool {
        false
    }

    fn enum_value(&self, _name: &str) -> Option<i32> {
        None
    }

    fn attached_property_cache(&self) -> Option<&dyn PropertyCache> {
        self.attached.as_ref().map(|c| c as &dyn PropertyCache)
    }

    fn module(&self) -> &str {
        &self.module
    }

    fn major_version(&self) -> i32 {
        self.major
    }

    fn minor_version(&self) -> i32 {
        self.minor
    }
}

fn convert(
    document: &mut Document,
    resolved_types: &ResolvedTypes<'_>,
    root_cache: &dyn PropertyCache,
) -> Result<(), Vec<CompileError>> {
    let mut caches: PropertyCaches<'_> = HashMap::new();
    caches.insert(document.index_of_root_object, root_cache);
    SignalHandlerConverter::new(document, resolved_types, &caches).convert()
}

fn string_index(document: &Document, value: &str) -> u32 {
    document
        .string_pool
        .iter()
        .position(|s| s == value)
        .expect("string should be interned") as u32
}

mod expression_handlers {
    use super::*;

    #[test]
    fn known_signal_becomes_a_function_with_its_parameters() {
        let mut doc = build_ok(&program(
            vec![],
            object_def(&["Item"], vec![script_binding(&["onClicked"], script_stmt())]),
        ));
        let mut cache = StubCache::new("Item");
        cache.add_signal("clicked", &["x", "y"]);

        convert(&mut doc, &HashMap::new(), &cache).expect("conversion should succeed");

        let binding = &doc.objects[0].bindings[0];
        assert_eq!(doc.string_at(binding.property_name_index), "clicked");
        assert!(binding.flags.contains(BindingFlags::IS_SIGNAL_HANDLER_EXPRESSION));

        let CompiledFunctionOrExpression::Function(declaration) = &doc.functions[0] else {
            panic!("statement should have been rewritten into a function");
        };
        assert_eq!(declaration.name, "clicked");
        assert_eq!(declaration.formals, ["x", "y"]);
        assert_eq!(declaration.body.len(), 1);
    }

    #[test]
    fn unknown_signal_is_left_as_a_property_assignment() {
        let mut doc = build_ok(&program(
            vec![],
            object_def(&["Item"], vec![script_binding(&["onFrobbed"], script_stmt())]),
        ));
        let cache = StubCache::new("Item");

        convert(&mut doc, &HashMap::new(), &cache).expect("conversion should succeed");

        let binding = &doc.objects[0].bindings[0];
        assert_eq!(doc.string_at(binding.property_name_index), "onFrobbed");
        assert!(binding.flags.is_empty());
        assert!(matches!(
            doc.functions[0],
            CompiledFunctionOrExpression::Statement(_)
        ));
    }

    #[test]
    fn underscore_prefixed_handlers_keep_their_underscores() {
        let mut doc = build_ok(&program(
            vec![],
            object_def(&["Item"], vec![script_binding(&["on_Activated"], script_stmt())]),
        ));
        let mut cache = StubCache::new("Item");
        cache.add_signal("_activated", &[]);

        convert(&mut doc, &HashMap::new(), &cache).expect("conversion should succeed");

        let binding = &doc.objects[0].bindings[0];
        assert_eq!(doc.string_at(binding.property_name_index), "_activated");
    }

    #[test]
    fn constant_valued_handlers_are_rejected() {
        let mut doc = build_ok(&program(
            vec![],
            object_def(&["Item"], vec![script_binding(&["onClicked"], number_stmt(5.0))]),
        ));
        let mut cache = StubCache::new("Item");
        cache.add_signal("clicked", &[]);

        let errors = convert(&mut doc, &HashMap::new(), &cache)
            .expect_err("conversion should fail");
        assert_eq!(messages(&errors), ["Incorrectly specified signal assignment"]);
    }
}

mod custom_signals {
    use super::*;

    #[test]
    fn signals_declared_in_the_file_are_found() {
        let mut doc = build_ok(&program(
            vec![],
            object_def(
                &["Item"],
                vec![
                    signal_decl("frobbed", &[("int", "amount")]),
                    script_binding(&["onFrobbed"], script_stmt()),
                ],
            ),
        ));
        let cache = StubCache::new("Item");

        convert(&mut doc, &HashMap::new(), &cache).expect("conversion should succeed");

        let CompiledFunctionOrExpression::Function(declaration) = &doc.functions[0] else {
            panic!("expected a synthesized function");
        };
        assert_eq!(declaration.name, "frobbed");
        assert_eq!(declaration.formals, ["amount"]);
    }

    #[test]
    fn declared_property_change_handlers_have_no_parameters() {
        let mut doc = build_ok(&program(
            vec![],
            object_def(
                &["Item"],
                vec![
                    property_decl("width", "int"),
                    script_binding(&["onWidthChanged"], script_stmt()),
                ],
            ),
        ));
        let cache = StubCache::new("Item");

        convert(&mut doc, &HashMap::new(), &cache).expect("conversion should succeed");

        let CompiledFunctionOrExpression::Function(declaration) = &doc.functions[0] else {
            panic!("expected a synthesized function");
        };
        assert_eq!(declaration.name, "widthChanged");
        assert!(declaration.formals.is_empty());
    }

    #[test]
    fn explicit_signal_wins_over_the_changed_suffix_fallback() {
        let mut doc = build_ok(&program(
            vec![],
            object_def(
                &["Item"],
                vec![
                    signal_decl("countChanged", &[("int", "count")]),
                    property_decl("count", "int"),
                    script_binding(&["onCountChanged"], script_stmt()),
                ],
            ),
        ));
        let cache = StubCache::new("Item");

        convert(&mut doc, &HashMap::new(), &cache).expect("conversion should succeed");

        let CompiledFunctionOrExpression::Function(declaration) = &doc.functions[0] else {
            panic!("expected a synthesized function");
        };
        // The explicitly declared signal's parameter list is used, not the
        // empty list of the property's change signal.
        assert_eq!(declaration.formals, ["count"]);
    }
}

mod versioning {
    use super::*;

    #[test]
    fn later_revision_signal_is_an_error_naming_the_module() {
        let mut doc = build_ok(&program(
            vec![],
            object_def(&["Item"], vec![script_binding(&["onActivated"], script_stmt())]),
        ));
        let mut cache = StubCache::new("Item");
        let signal = cache.add_signal("activated", &[]);
        cache.block(signal);

        let item_type = StubType::new("My.Module", 1, 0);
        let mut types: ResolvedTypes<'_> = HashMap::new();
        types.insert(string_index(&doc, "Item"), &item_type);

        let errors = convert(&mut doc, &types, &cache).expect_err("conversion should fail");
        assert_eq!(
            messages(&errors),
            ["\"Item.onActivated\" is not available in My.Module 1.0."]
        );
    }

    #[test]
    fn later_revision_signal_without_type_info_gets_the_generic_message() {
        let mut doc = build_ok(&program(
            vec![],
            object_def(&["Item"], vec![script_binding(&["onActivated"], script_stmt())]),
        ));
        let mut cache = StubCache::new("Item");
        let signal = cache.add_signal("activated", &[]);
        cache.block(signal);

        let errors = convert(&mut doc, &HashMap::new(), &cache)
            .expect_err("conversion should fail");
        assert_eq!(
            messages(&errors),
            ["\"Item.onActivated\" is not available due to component versioning."]
        );
    }

    #[test]
    fn shadowed_property_of_the_same_name_falls_through_to_assignment() {
        let mut doc = build_ok(&program(
            vec![],
            object_def(&["Item"], vec![script_binding(&["onActivated"], script_stmt())]),
        ));
        let mut cache = StubCache::new("Item");
        let signal = cache.add_signal("activated", &[]);
        cache.block(signal);
        let property = PropertyData {
            core_index: 99,
            notify_index: -1,
            is_function: false,
            is_signal: false,
            is_final: false,
            is_direct: true,
        };
        cache.add_override(signal, property);

        convert(&mut doc, &HashMap::new(), &cache).expect("conversion should succeed");

        let binding = &doc.objects[0].bindings[0];
        assert_eq!(doc.string_at(binding.property_name_index), "onActivated");
        assert!(binding.flags.is_empty());
    }
}

mod object_handlers {
    use super::*;

    #[test]
    fn object_valued_handlers_connect_to_the_default_method() {
        let mut doc = build_ok(&program(
            vec![],
            object_def(
                &["Item"],
                vec![object_binding(&["onClicked"], &["Receiver"], vec![])],
            ),
        ));
        let mut cache = StubCache::new("Item");
        cache.add_signal("clicked", &[]);

        convert(&mut doc, &HashMap::new(), &cache).expect("conversion should succeed");

        let binding = &doc.objects[0].bindings[0];
        assert_eq!(doc.string_at(binding.property_name_index), "clicked");
        assert_eq!(binding.kind, BindingKind::Object);
        assert!(binding.flags.contains(BindingFlags::IS_SIGNAL_HANDLER_OBJECT));
    }
}

mod attached_handlers {
    use super::*;

    #[test]
    fn handlers_inside_attached_scopes_use_the_attached_type() {
        let mut doc = build_ok(&program(
            vec![],
            object_def(
                &["Item"],
                vec![script_binding(&["Keys", "onPressed"], script_stmt())],
            ),
        ));
        let mut attached = StubCache::new("KeysAttached");
        attached.add_signal("pressed", &["event"]);
        let keys_type = StubType::new("My.Module", 1, 0).with_attached(attached);

        let mut types: ResolvedTypes<'_> = HashMap::new();
        types.insert(string_index(&doc, "Keys"), &keys_type);
        let root_cache = StubCache::new("Item");

        convert(&mut doc, &types, &root_cache).expect("conversion should succeed");

        // The handler binding lives on the synthetic attached object.
        let attached_object = &doc.objects[1];
        let binding = &attached_object.bindings[0];
        assert_eq!(doc.string_at(binding.property_name_index), "pressed");
        assert!(binding.flags.contains(BindingFlags::IS_SIGNAL_HANDLER_EXPRESSION));

        let CompiledFunctionOrExpression::Function(declaration) = &doc.functions[0] else {
            panic!("expected a synthesized function");
        };
        assert_eq!(declaration.formals, ["event"]);
    }

    #[test]
    fn unresolvable_attached_scopes_are_an_error() {
        let mut doc = build_ok(&program(
            vec![],
            object_def(
                &["Item"],
                vec![script_binding(&["Keys", "onPressed"], script_stmt())],
            ),
        ));
        let root_cache = StubCache::new("Item");

        let errors = convert(&mut doc, &HashMap::new(), &root_cache)
            .expect_err("conversion should fail");
        assert_eq!(messages(&errors), ["Non-existent attached object"]);
    }
}
