//! Syntax-tree types consumed by the object model builder.
//!
//! The lexer and grammar parser live outside this crate; they hand over one
//! `Program` per component file. The shapes here are the narrow contract
//! with that parser: a closed set of node kinds, each carrying the source
//! spans the builder needs for diagnostics and raw-text slicing.

use smallvec::SmallVec;

use crate::parse_util::SourceSpan;

/// One segment of a dotted name (`Text`, `font.pixelSize`, `Q.Item`).
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedIdSegment {
    pub name: String,
    pub location: SourceSpan,
}

impl QualifiedIdSegment {
    pub fn new(name: impl Into<String>, location: SourceSpan) -> Self {
        QualifiedIdSegment {
            name: name.into(),
            location,
        }
    }
}

/// A dotted name. Never empty for well-formed parser output.
pub type QualifiedId = SmallVec<[QualifiedIdSegment; 2]>;

/// Join a qualified id back into its dotted textual form.
pub fn qualified_id_to_string(id: &[QualifiedIdSegment]) -> String {
    let mut s = String::new();
    for (i, segment) in id.iter().enumerate() {
        if i > 0 {
            s.push('.');
        }
        s.push_str(&segment.name);
    }
    s
}

/// A whole component file: header items followed by top-level members.
/// A valid file has exactly one top-level member, the root object.
#[derive(Debug, Clone)]
pub struct Program {
    pub headers: Vec<Header>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone)]
pub enum Header {
    Import(ImportNode),
    Pragma(PragmaNode),
}

/// `import "file.qml"`, `import "lib.js" as Util` or `import Module.Name 2.1 as Q`.
#[derive(Debug, Clone)]
pub struct ImportNode {
    /// Set for file/script imports.
    pub file_name: Option<String>,
    /// Set for library (URI) imports.
    pub uri: Option<QualifiedId>,
    /// The `as Qualifier`, if present.
    pub qualifier: Option<String>,
    /// The raw version token text (`"2.1"`), if present.
    pub version: Option<String>,
    pub import_token: SourceSpan,
    pub file_name_token: SourceSpan,
    pub qualifier_token: SourceSpan,
}

/// `pragma Singleton`. The name is `None` when the parser saw a bare
/// `pragma` with no qualifier.
#[derive(Debug, Clone)]
pub struct PragmaNode {
    pub name: Option<String>,
    pub pragma_token: SourceSpan,
}

/// The members a parser can produce inside an object initializer (or at the
/// top level, where only an object definition is legal).
#[derive(Debug, Clone)]
pub enum Member {
    /// `Item { ... }` or `font { ... }` — which of the two it is can only be
    /// decided lexically, by the case of the final name segment.
    ObjectDefinition(ObjectDefinition),
    /// `prop: Type { ... }`, or `Behavior on prop { ... }` when
    /// `is_on_assignment` is set.
    ObjectBinding {
        qualified_id: QualifiedId,
        qualified_type_name: QualifiedId,
        initializer: Vec<Member>,
        is_on_assignment: bool,
    },
    /// `prop: [ A {}, B {} ]`.
    ArrayBinding {
        qualified_id: QualifiedId,
        members: Vec<ObjectDefinition>,
    },
    /// `prop: expression`.
    ScriptBinding {
        qualified_id: QualifiedId,
        statement: Statement,
    },
    /// `property int x` / `signal clicked(int x, int y)`.
    PublicMember(PublicMember),
    /// A script source element, normally a function declaration.
    SourceElement(SourceElement),
}

#[derive(Debug, Clone)]
pub struct ObjectDefinition {
    pub qualified_type_name: QualifiedId,
    pub initializer: Vec<Member>,
}

#[derive(Debug, Clone)]
pub enum PublicMember {
    Signal {
        name: String,
        name_token: SourceSpan,
        type_token: SourceSpan,
        parameters: Vec<ParameterNode>,
    },
    Property {
        /// Span of the first token of the declaration (`default`,
        /// `readonly` or `property`).
        first_token: SourceSpan,
        /// `list` in `property list<Item> children`.
        type_modifier: Option<String>,
        type_modifier_token: SourceSpan,
        member_type: String,
        type_token: SourceSpan,
        name: String,
        name_token: SourceSpan,
        is_default: bool,
        default_token: SourceSpan,
        is_readonly: bool,
        /// `property int x: 42` — the value statement, if any.
        statement: Option<Statement>,
        /// `property Item x: Item { ... }` — an inline object initializer.
        binding: Option<Box<Member>>,
        semicolon_token: SourceSpan,
    },
}

#[derive(Debug, Clone)]
pub struct ParameterNode {
    pub type_name: String,
    pub name: String,
    pub identifier_token: SourceSpan,
}

/// A source element inside an object body. Only function declarations are
/// accepted by the builder; anything else is a compile error.
#[derive(Debug, Clone)]
pub struct SourceElement {
    pub function: Option<FunctionDeclaration>,
    pub location: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub name: String,
    pub identifier_token: SourceSpan,
    pub formals: Vec<String>,
    pub body: Vec<Statement>,
}

/// A statement-shaped right-hand side. The builder only inspects the
/// expression forms the binding classifier cares about; everything else is
/// opaque script compiled by the external script compiler.
#[derive(Debug, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub location: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Expression(Expression),
    /// A block or any other statement form. Never a compile-time constant.
    Other,
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub location: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    StringLiteral(String),
    NumberLiteral(f64),
    TrueLiteral,
    FalseLiteral,
    Identifier(String),
    /// `base.name` member access.
    FieldMember {
        base: Box<Expression>,
        name: String,
    },
    UnaryMinus(Box<Expression>),
    /// Any other expression form; opaque to the builder.
    Other,
}

impl Statement {
    pub fn expression(&self) -> Option<&Expression> {
        match &self.kind {
            StatementKind::Expression(expr) => Some(expr),
            StatementKind::Other => None,
        }
    }
}

/// Flatten an identifier chain (`a`, `a.b`, `a.b.c`) into its parts.
/// Returns an empty list for any other expression shape.
pub fn expression_to_string_list(expr: &Expression) -> Vec<String> {
    match &expr.kind {
        ExpressionKind::Identifier(name) => vec![name.clone()],
        ExpressionKind::FieldMember { base, name } => {
            let mut parts = expression_to_string_list(base);
            if parts.is_empty() {
                return parts;
            }
            parts.push(name.clone());
            parts
        }
        _ => Vec::new(),
    }
}
