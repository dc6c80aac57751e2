//! Rewrites `on<Signal>` bindings into callable handler functions.
//!
//! This pass runs once the external metadata collaborator has resolved the
//! document's type references: only then is it known which names are
//! signals, which are properties, and which are not available in the
//! imported revision.

use std::collections::HashMap;

use crate::ast;
use crate::builder::is_signal_property_name;
use crate::ir::{Binding, BindingFlags, BindingKind, BindingValue, CompiledFunctionOrExpression, Document, ObjectIndex};
use crate::metadata::{PropertyCache, PropertyCaches, PropertyResolver, ResolvedTypes};
use crate::parse_util::{CompileError, SourceLocation};

pub struct SignalHandlerConverter<'a> {
    document: &'a mut Document,
    resolved_types: &'a ResolvedTypes<'a>,
    property_caches: &'a PropertyCaches<'a>,
    errors: Vec<CompileError>,
}

impl<'a> SignalHandlerConverter<'a> {
    pub fn new(
        document: &'a mut Document,
        resolved_types: &'a ResolvedTypes<'a>,
        property_caches: &'a PropertyCaches<'a>,
    ) -> Self {
        SignalHandlerConverter {
            document,
            resolved_types,
            property_caches,
            errors: Vec::new(),
        }
    }

    /// Convert handler bindings on every typed object in the document.
    /// An error stops further binding processing for that object; other
    /// objects are still converted.
    pub fn convert(mut self) -> Result<(), Vec<CompileError>> {
        let resolved_types = self.resolved_types;
        let property_caches = self.property_caches;

        for index in 0..self.document.objects.len() {
            let type_name_index = self.document.objects[index].inherited_type_name_index;
            let element_name = self.document.string_at(type_name_index).to_string();
            if element_name.is_empty() {
                // Synthetic group/attached placeholder.
                continue;
            }
            if let Some(type_info) = resolved_types.get(&type_name_index) {
                if !type_info.accepts_signal_handlers() {
                    continue;
                }
            }
            let Some(cache) = property_caches.get(&index) else {
                continue;
            };
            self.convert_object(index, &element_name, *cache);
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn record_error(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.errors
            .push(CompileError::new(&self.document.url, location, message));
    }

    fn convert_object(
        &mut self,
        object_index: ObjectIndex,
        type_name: &str,
        cache: &dyn PropertyCache,
    ) -> bool {
        let mut bindings = std::mem::take(&mut self.document.objects[object_index].bindings);
        let ok = self.convert_bindings(object_index, type_name, cache, &mut bindings);
        self.document.objects[object_index].bindings = bindings;
        ok
    }

    fn convert_bindings(
        &mut self,
        object_index: ObjectIndex,
        type_name: &str,
        cache: &dyn PropertyCache,
        bindings: &mut [Binding],
    ) -> bool {
        let resolved_types = self.resolved_types;

        // Signals declared in the file itself, name to parameter names.
        // Built lazily, only when a lookup needs it.
        let mut custom_signals: Option<HashMap<String, Vec<String>>> = None;

        for binding in bindings.iter_mut() {
            let property_name = self
                .document
                .string_at(binding.property_name_index)
                .to_string();

            if binding.kind == BindingKind::AttachedProperty {
                let BindingValue::Object(attached_index) = binding.value else {
                    unreachable!("attached-property bindings always reference an object");
                };
                let attached_cache = resolved_types
                    .get(&binding.property_name_index)
                    .and_then(|info| info.attached_property_cache());
                let Some(attached_cache) = attached_cache else {
                    self.record_error(binding.location, "Non-existent attached object");
                    return false;
                };
                if !self.convert_object(attached_index, &property_name, attached_cache) {
                    return false;
                }
                continue;
            }

            if !is_signal_property_name(&property_name) {
                continue;
            }

            // Strip the "on" prefix and lower-case the first alphabetic
            // character; leading underscores stay as they are.
            let mut rest: Vec<char> = property_name[2..].chars().collect();
            for ch in rest.iter_mut() {
                if ch.is_uppercase() {
                    *ch = ch.to_lowercase().next().unwrap_or(*ch);
                    break;
                }
            }
            let handler_name: String = rest.into_iter().collect();

            let resolver = PropertyResolver::new(cache);
            let mut not_in_revision = false;
            let parameters: Vec<String>;

            if let Some(signal) = resolver.signal(&handler_name, &mut not_in_revision) {
                parameters = cache.signal_parameter_names(&signal);
            } else {
                if not_in_revision {
                    // The name exists in a later revision. If it is also a
                    // plain property, leave the binding as an assignment.
                    if resolver.property(&handler_name, None).is_some() {
                        continue;
                    }

                    let message = match resolved_types
                        .get(&self.document.objects[object_index].inherited_type_name_index)
                    {
                        Some(info) => format!(
                            "\"{}.{}\" is not available in {} {}.{}.",
                            type_name,
                            property_name,
                            info.module(),
                            info.major_version(),
                            info.minor_version()
                        ),
                        None => format!(
                            "\"{}.{}\" is not available due to component versioning.",
                            type_name, property_name
                        ),
                    };
                    self.record_error(binding.location, message);
                    return false;
                }

                // Fall back to signals (and change signals of properties)
                // declared in the component file itself.
                let signals = custom_signals.get_or_insert_with(|| {
                    let obj = &self.document.objects[object_index];
                    let mut map = HashMap::new();
                    for signal in &obj.signals {
                        map.insert(
                            self.document.string_pool.string_at(signal.name_index).to_string(),
                            signal.parameter_string_list(&self.document.string_pool),
                        );
                    }
                    for property in &obj.properties {
                        // A property's change signal has no parameters.
                        map.insert(
                            self.document.string_pool.string_at(property.name_index).to_string(),
                            Vec::new(),
                        );
                    }
                    map
                });

                let entry = signals.get(&handler_name).or_else(|| {
                    handler_name
                        .strip_suffix("Changed")
                        .and_then(|alternate| signals.get(alternate))
                });

                match entry {
                    // No signal of this name anywhere; keep the binding as
                    // a regular property assignment.
                    None => continue,
                    Some(names) => parameters = names.clone(),
                }
            }

            binding.property_name_index = self.document.string_pool.register(&handler_name);

            // Binding an object to a signal connects the signal to the
            // object's default method.
            if binding.kind == BindingKind::Object {
                binding.flags |= BindingFlags::IS_SIGNAL_HANDLER_OBJECT;
                continue;
            }

            if binding.kind != BindingKind::Script {
                self.record_error(binding.location, "Incorrectly specified signal assignment");
                return false;
            }

            let BindingValue::Script(script_index) = binding.value else {
                unreachable!("script bindings always carry a function index");
            };
            let statement = match &self.document.functions[script_index] {
                CompiledFunctionOrExpression::Statement(statement) => statement.clone(),
                CompiledFunctionOrExpression::Function(_) => {
                    unreachable!("handler bindings reference unconverted statements")
                }
            };

            let declaration = ast::FunctionDeclaration {
                name: handler_name,
                identifier_token: statement.location,
                formals: parameters,
                body: vec![statement],
            };
            self.document.functions[script_index] =
                CompiledFunctionOrExpression::Function(declaration);
            binding.flags |= BindingFlags::IS_SIGNAL_HANDLER_EXPRESSION;
        }

        true
    }
}
