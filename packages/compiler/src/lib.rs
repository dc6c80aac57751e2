#![deny(clippy::all)]

//! Compiler for a declarative component-description language.
//!
//! Takes the syntax tree of one component file (objects, properties,
//! signals, bindings, embedded script expressions), builds a normalized
//! in-memory object model, rewrites signal-handler bindings once external
//! type metadata is available, and serializes the result into a compact,
//! position-independent binary unit for the runtime loader.
//!
//! The lexer/parser, the type metadata system and the script-to-code
//! compiler are external collaborators, reached through the narrow
//! interfaces in [`ast`], [`metadata`] and [`resolver`].

pub mod ast;
pub mod builder;
pub mod ir;
pub mod metadata;
pub mod parse_util;
pub mod resolver;
pub mod serializer;
pub mod signal_handlers;
pub mod string_pool;
pub mod type_references;

pub use builder::DocumentBuilder;
pub use ir::Document;
pub use parse_util::{CompileError, ErrorLevel, SourceLocation, SourceSpan};
pub use serializer::QmlUnitGenerator;
pub use signal_handlers::SignalHandlerConverter;
pub use string_pool::{StringIndex, StringPool};
