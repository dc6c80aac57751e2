//! Static resolution of free identifiers in embedded script bodies.
//!
//! The external script compiler consults this resolver once per free
//! identifier. Resolution is strictly lexical: a name resolves to what was
//! visible at compile time in the declared types, never to a subtype's
//! override. Anything that cannot be proven safe statically returns
//! `None`, telling the caller to emit a dynamic name lookup instead.

use std::collections::HashSet;

use crate::metadata::{PropertyCache, PropertyData, TypeInformation};
use crate::parse_util::{CompileError, SourceLocation};

/// Compiler configuration for the resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolverConfig {
    /// Emit a warning when a property misses the fast path only because it
    /// is not marked final.
    pub lookup_hints: bool,
}

/// Ids a compiled function depends on; the runtime uses this set to know
/// when the function must be re-evaluated.
#[derive(Debug, Default)]
pub struct FunctionDependencies {
    pub id_object_dependencies: HashSet<u32>,
}

/// One component id declared in the current file.
pub struct IdMapping<'a> {
    pub name: String,
    pub id_index: u32,
    /// Member metadata for the id's type, when statically known. Enables
    /// further member resolution through the id.
    pub cache: Option<&'a dyn PropertyCache>,
}

/// What an identifier hit in the import table.
pub enum ImportQueryResult<'a> {
    /// A qualified script import; the value is the script slot.
    Script(u32),
    /// A type or singleton name.
    Type(&'a dyn TypeInformation),
    /// An import namespace qualifier; members are resolved through it.
    Namespace(u32),
}

/// Lookup into the file's import table, implemented by the import system.
pub trait ImportTable {
    fn query(&self, name: &str) -> Option<ImportQueryResult<'_>>;
}

/// A successfully resolved identifier. Each variant gives the caller
/// enough to generate a direct access.
pub enum ResolvedName<'a> {
    /// A component id. Read-only: ids cannot be reassigned from script.
    IdObject {
        id_index: u32,
        cache: Option<&'a dyn PropertyCache>,
    },
    ImportedScript(u32),
    /// Singletons are loaded through their getter; composite singletons
    /// additionally treat every member as final.
    TypeReference(&'a dyn TypeInformation),
    ImportNamespace(u32),
    ScopeProperty(PropertyData),
    ContextProperty(PropertyData),
}

/// Outcome of a member lookup against one property cache.
pub enum MemberLookup {
    Resolved(PropertyData),
    /// The member exists but cannot be accessed through a compile-time
    /// accessor; the name must not resolve further out either.
    ForceDynamic,
    NotFound,
}

pub struct IdentifierResolver<'a> {
    imports: &'a dyn ImportTable,
    ids: Vec<IdMapping<'a>>,
    scope_object: Option<&'a dyn PropertyCache>,
    context_object: Option<&'a dyn PropertyCache>,
    config: ResolverConfig,
    url: String,
    warnings: Vec<CompileError>,
}

impl<'a> IdentifierResolver<'a> {
    pub fn new(imports: &'a dyn ImportTable, url: &str, config: ResolverConfig) -> Self {
        IdentifierResolver {
            imports,
            ids: Vec::new(),
            scope_object: None,
            context_object: None,
            config,
            url: url.to_string(),
            warnings: Vec::new(),
        }
    }

    /// Enter the scope of one component: its declared ids and the context
    /// object of the enclosing hierarchy. Resets the object scope.
    pub fn begin_context_scope(
        &mut self,
        ids: Vec<IdMapping<'a>>,
        context_object: Option<&'a dyn PropertyCache>,
    ) {
        self.ids = ids;
        self.context_object = context_object;
        self.scope_object = None;
    }

    /// Enter the scope of the object whose function or binding is being
    /// compiled.
    pub fn begin_object_scope(&mut self, scope_object: Option<&'a dyn PropertyCache>) {
        self.scope_object = scope_object;
    }

    /// Resolve one free identifier. Lookup order: component ids, the
    /// import table, the scope object's members, the context object's
    /// members. `None` means the caller emits a dynamic runtime lookup.
    pub fn resolve(
        &mut self,
        name: &str,
        dependencies: &mut FunctionDependencies,
    ) -> Option<ResolvedName<'a>> {
        for mapping in &self.ids {
            if mapping.name == name {
                dependencies.id_object_dependencies.insert(mapping.id_index);
                return Some(ResolvedName::IdObject {
                    id_index: mapping.id_index,
                    cache: mapping.cache,
                });
            }
        }

        let imports: &'a dyn ImportTable = self.imports;
        if let Some(result) = imports.query(name) {
            return Some(match result {
                ImportQueryResult::Script(index) => ResolvedName::ImportedScript(index),
                ImportQueryResult::Type(info) => ResolvedName::TypeReference(info),
                ImportQueryResult::Namespace(handle) => ResolvedName::ImportNamespace(handle),
            });
        }

        if let Some(scope) = self.scope_object {
            match self.resolve_member(scope, name, false) {
                MemberLookup::Resolved(data) => return Some(ResolvedName::ScopeProperty(data)),
                // The scope object declares the name; resolving it against
                // the context object instead would break lexical scoping.
                MemberLookup::ForceDynamic => return None,
                MemberLookup::NotFound => {}
            }
        }

        if let Some(context) = self.context_object {
            match self.resolve_member(context, name, false) {
                MemberLookup::Resolved(data) => return Some(ResolvedName::ContextProperty(data)),
                MemberLookup::ForceDynamic => return None,
                MemberLookup::NotFound => {}
            }
        }

        None
    }

    /// Look a member up in one property cache under the static-access
    /// rules: methods always go through the dynamic path, members from
    /// incompatible revisions are invisible, and non-final members are
    /// unsafe unless `all_properties_final` (composite types, id objects
    /// of known type) vouches for the whole cache.
    pub fn resolve_member(
        &mut self,
        cache: &dyn PropertyCache,
        name: &str,
        all_properties_final: bool,
    ) -> MemberLookup {
        let Some(data) = cache.property(name) else {
            return MemberLookup::NotFound;
        };

        if data.is_function {
            return MemberLookup::ForceDynamic;
        }
        if !cache.is_allowed_in_revision(&data) {
            return MemberLookup::NotFound;
        }

        if !data.is_final && !all_properties_final {
            if self.config.lookup_hints && data.is_direct {
                let message = format!(
                    "Hint: Access to property {} of {} could be accelerated if it was marked as FINAL",
                    name,
                    cache.class_name()
                );
                self.warnings
                    .push(CompileError::warning(&self.url, SourceLocation::default(), message));
            }
            return MemberLookup::ForceDynamic;
        }

        MemberLookup::Resolved(data)
    }

    /// Diagnostics accumulated so far (lookup hints); draining them is the
    /// caller's responsibility.
    pub fn take_warnings(&mut self) -> Vec<CompileError> {
        std::mem::take(&mut self.warnings)
    }
}
