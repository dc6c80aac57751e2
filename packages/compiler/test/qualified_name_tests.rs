//! Dotted binding targets: synthetic group and attached objects.

#[path = "utils/mod.rs"]
mod utils;

use qml_compiler::ir::{BindingKind, BindingValue};
use utils::*;

mod group_properties {
    use super::*;

    #[test]
    fn dotted_path_synthesizes_one_group_object() {
        let doc = build_ok(&program(
            vec![],
            object_def(
                &["Text"],
                vec![script_binding(&["font", "pixelSize"], number_stmt(12.0))],
            ),
        ));

        // Root plus exactly one synthetic object.
        assert_eq!(doc.objects.len(), 2);
        let root = &doc.objects[0];
        assert_eq!(root.bindings.len(), 1);

        let group_binding = &root.bindings[0];
        assert_eq!(doc.string_at(group_binding.property_name_index), "font");
        assert_eq!(group_binding.kind, BindingKind::GroupProperty);

        let BindingValue::Object(group_index) = group_binding.value else {
            panic!("expected object value");
        };
        let group = &doc.objects[group_index];
        assert_eq!(doc.string_at(group.inherited_type_name_index), "");
        assert_eq!(group.bindings.len(), 1);

        let value_binding = &group.bindings[0];
        assert_eq!(doc.string_at(value_binding.property_name_index), "pixelSize");
        assert_eq!(value_binding.kind, BindingKind::Number);
        assert_eq!(value_binding.value, BindingValue::Number(12.0));
    }

    #[test]
    fn deep_paths_chain_group_objects() {
        let doc = build_ok(&program(
            vec![],
            object_def(
                &["Item"],
                vec![script_binding(&["anchors", "margins", "left"], number_stmt(4.0))],
            ),
        ));
        assert_eq!(doc.objects.len(), 3);

        let BindingValue::Object(first) = doc.objects[0].bindings[0].value else {
            panic!("expected object value");
        };
        let BindingValue::Object(second) = doc.objects[first].bindings[0].value else {
            panic!("expected object value");
        };
        let leaf = &doc.objects[second].bindings[0];
        assert_eq!(doc.string_at(leaf.property_name_index), "left");
    }

    #[test]
    fn sibling_paths_each_get_their_own_group_object() {
        let doc = build_ok(&program(
            vec![],
            object_def(
                &["Text"],
                vec![
                    script_binding(&["font", "pixelSize"], number_stmt(12.0)),
                    script_binding(&["font", "bold"], bool_stmt(true)),
                ],
            ),
        ));
        // Group bindings are exempt from the one-value-per-property rule;
        // each dotted binding creates its own placeholder.
        assert_eq!(doc.objects.len(), 3);
        let root = &doc.objects[0];
        assert_eq!(root.bindings.len(), 2);
        assert!(root
            .bindings
            .iter()
            .all(|b| b.kind == BindingKind::GroupProperty));
    }
}

mod attached_properties {
    use super::*;

    #[test]
    fn uppercase_segments_mark_attached_scopes() {
        let doc = build_ok(&program(
            vec![],
            object_def(
                &["Item"],
                vec![script_binding(&["Keys", "enabled"], bool_stmt(true))],
            ),
        ));
        let binding = &doc.objects[0].bindings[0];
        assert_eq!(doc.string_at(binding.property_name_index), "Keys");
        assert_eq!(binding.kind, BindingKind::AttachedProperty);
    }

    #[test]
    fn namespaced_attached_types_fold_the_qualifier() {
        let doc = build_ok(&program(
            vec![import_library(&["My", "Module"], Some("1.0"), Some("Q"))],
            object_def(
                &["Item"],
                vec![script_binding(&["Q", "Keys", "enabled"], bool_stmt(true))],
            ),
        ));
        let binding = &doc.objects[0].bindings[0];
        assert_eq!(doc.string_at(binding.property_name_index), "Q.Keys");
        assert_eq!(binding.kind, BindingKind::AttachedProperty);
        // One synthetic object, reached through the folded name.
        assert_eq!(doc.objects.len(), 2);
    }

    #[test]
    fn qualifier_must_be_followed_by_a_type_name() {
        let errors = build_err(&program(
            vec![import_library(&["My", "Module"], Some("1.0"), Some("Q"))],
            object_def(
                &["Item"],
                vec![script_binding(&["Q", "keys", "enabled"], bool_stmt(true))],
            ),
        ));
        assert_eq!(messages(&errors), ["Expected type name"]);
    }
}

mod id_paths {
    use super::*;

    #[test]
    fn id_as_a_non_terminal_segment_is_an_error() {
        let errors = build_err(&program(
            vec![],
            object_def(
                &["Item"],
                vec![script_binding(&["id", "x"], number_stmt(1.0))],
            ),
        ));
        assert_eq!(messages(&errors), ["Invalid use of id property"]);
    }
}
