//! Interfaces to the external type/metadata system.
//!
//! The compiler never inspects types itself; it asks these traits. A
//! `PropertyCache` answers member lookups for one concrete type, a
//! `TypeInformation` describes a resolved type name. Both are implemented
//! outside this crate (and by lightweight stubs in the tests).

use std::collections::HashMap;

use crate::string_pool::StringIndex;

/// Metadata for a single member (property, method or signal) of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyData {
    /// Index of the member in its property cache; an opaque accessor handle
    /// for the runtime's fast path.
    pub core_index: i32,
    /// The member's change-notification signal, or -1 if it has none.
    pub notify_index: i32,
    pub is_function: bool,
    pub is_signal: bool,
    /// Non-overridable in the declared type. Only final members may be
    /// accessed through a compile-time accessor.
    pub is_final: bool,
    /// Declared directly on the inspected type, not inherited.
    pub is_direct: bool,
}

/// Member lookup for one concrete type.
pub trait PropertyCache {
    /// The most-derived member of this name, or `None`.
    fn property(&self, name: &str) -> Option<PropertyData>;

    /// The member this one overrides, or `None` at the end of the chain.
    fn override_data(&self, data: &PropertyData) -> Option<PropertyData>;

    /// Whether the member's declaring revision is visible to this
    /// compilation.
    fn is_allowed_in_revision(&self, data: &PropertyData) -> bool;

    /// The signal with the given signal index (used to map a property's
    /// notify index back to its change signal).
    fn signal(&self, signal_index: i32) -> Option<PropertyData>;

    /// Parameter names of the signal behind `data`, in declaration order.
    fn signal_parameter_names(&self, data: &PropertyData) -> Vec<String>;

    /// Type name for diagnostics.
    fn class_name(&self) -> &str;
}

/// Description of a resolved type name.
pub trait TypeInformation {
    fn is_singleton(&self) -> bool;

    fn is_composite_singleton(&self) -> bool;

    /// The value of an enum member of this type, if `name` is one.
    fn enum_value(&self, name: &str) -> Option<i32>;

    /// Member metadata for this type's attached object, if the type has
    /// attached properties.
    fn attached_property_cache(&self) -> Option<&dyn PropertyCache>;

    /// Whether `on<Signal>` bindings on objects of this type may be
    /// rewritten into handlers. Types with a custom parser can opt out.
    fn accepts_signal_handlers(&self) -> bool {
        true
    }

    /// Module name and version, for versioning diagnostics.
    fn module(&self) -> &str;
    fn major_version(&self) -> i32;
    fn minor_version(&self) -> i32;
}

/// Types resolved by the external collaborator, keyed by the interned type
/// name (an object's inherited type or an attached-property name).
pub type ResolvedTypes<'a> = HashMap<StringIndex, &'a dyn TypeInformation>;

/// Property caches for component objects, keyed by object index. Synthetic
/// group/attached objects have no entry.
pub type PropertyCaches<'a> = HashMap<usize, &'a dyn PropertyCache>;

/// Member lookup with the override and revision rules the compiler needs:
/// methods shadow properties and vice versa, and members from incompatible
/// revisions are invisible (but remembered, for better diagnostics).
pub struct PropertyResolver<'a> {
    cache: &'a dyn PropertyCache,
}

impl<'a> PropertyResolver<'a> {
    pub fn new(cache: &'a dyn PropertyCache) -> Self {
        PropertyResolver { cache }
    }

    /// The first non-method member of this name.
    pub fn property(&self, name: &str, not_in_revision: Option<&mut bool>) -> Option<PropertyData> {
        if let Some(flag) = not_in_revision {
            *flag = false;
            return self.lookup(name, false, flag);
        }
        let mut ignored = false;
        self.lookup(name, false, &mut ignored)
    }

    /// The first signal of this name; falls back to the change signal of
    /// `<name minus "Changed">` when the direct lookup misses.
    pub fn signal(&self, name: &str, not_in_revision: &mut bool) -> Option<PropertyData> {
        *not_in_revision = false;

        let mut d = self.cache.property(name);
        while let Some(data) = d {
            if data.is_function {
                break;
            }
            d = self.cache.override_data(&data);
        }

        if let Some(data) = d {
            if !self.cache.is_allowed_in_revision(&data) {
                *not_in_revision = true;
                return None;
            }
            if data.is_signal {
                return Some(data);
            }
        }

        if let Some(property_name) = name.strip_suffix("Changed") {
            let d = self.property(property_name, Some(not_in_revision));
            if let Some(data) = d {
                return self.cache.signal(data.notify_index);
            }
        }

        None
    }

    fn lookup(&self, name: &str, want_function: bool, not_in_revision: &mut bool) -> Option<PropertyData> {
        let mut d = self.cache.property(name);
        while let Some(data) = d {
            if data.is_function == want_function {
                break;
            }
            d = self.cache.override_data(&data);
        }

        match d {
            Some(data) if !self.cache.is_allowed_in_revision(&data) => {
                *not_in_revision = true;
                None
            }
            other => other,
        }
    }
}
