//! Shared helpers for building syntax trees by hand.
//!
//! The grammar parser is an external collaborator, so tests construct the
//! `ast` shapes it would produce.

#![allow(dead_code)]

use std::collections::HashSet;

use qml_compiler::ast::*;
use qml_compiler::ir::Document;
use qml_compiler::parse_util::{CompileError, SourceSpan};
use qml_compiler::DocumentBuilder;

pub fn span() -> SourceSpan {
    SourceSpan::default()
}

pub fn sp(line: u32, column: u32) -> SourceSpan {
    SourceSpan::new(line, column, 0, 0)
}

pub fn seg(name: &str) -> QualifiedIdSegment {
    QualifiedIdSegment::new(name, span())
}

pub fn qid(names: &[&str]) -> QualifiedId {
    names.iter().map(|n| seg(n)).collect()
}

pub fn expr(kind: ExpressionKind) -> Expression {
    Expression {
        kind,
        location: span(),
    }
}

pub fn stmt(kind: ExpressionKind) -> Statement {
    Statement {
        kind: StatementKind::Expression(expr(kind)),
        location: span(),
    }
}

pub fn number_stmt(value: f64) -> Statement {
    stmt(ExpressionKind::NumberLiteral(value))
}

pub fn string_stmt(value: &str) -> Statement {
    stmt(ExpressionKind::StringLiteral(value.to_string()))
}

pub fn bool_stmt(value: bool) -> Statement {
    stmt(if value {
        ExpressionKind::TrueLiteral
    } else {
        ExpressionKind::FalseLiteral
    })
}

pub fn ident_stmt(name: &str) -> Statement {
    stmt(ExpressionKind::Identifier(name.to_string()))
}

/// An opaque script expression (anything the classifier can't fold).
pub fn script_stmt() -> Statement {
    stmt(ExpressionKind::Other)
}

/// `a.b.c` as a field-member chain.
pub fn field_chain(parts: &[&str]) -> Expression {
    let mut iter = parts.iter();
    let mut result = expr(ExpressionKind::Identifier(iter.next().unwrap().to_string()));
    for part in iter {
        result = expr(ExpressionKind::FieldMember {
            base: Box::new(result),
            name: part.to_string(),
        });
    }
    result
}

pub fn field_chain_stmt(parts: &[&str]) -> Statement {
    Statement {
        kind: StatementKind::Expression(field_chain(parts)),
        location: span(),
    }
}

pub fn script_binding(path: &[&str], statement: Statement) -> Member {
    Member::ScriptBinding {
        qualified_id: qid(path),
        statement,
    }
}

pub fn object_def(type_name: &[&str], members: Vec<Member>) -> ObjectDefinition {
    ObjectDefinition {
        qualified_type_name: qid(type_name),
        initializer: members,
    }
}

pub fn object_member(type_name: &[&str], members: Vec<Member>) -> Member {
    Member::ObjectDefinition(object_def(type_name, members))
}

pub fn object_binding(path: &[&str], type_name: &[&str], members: Vec<Member>) -> Member {
    Member::ObjectBinding {
        qualified_id: qid(path),
        qualified_type_name: qid(type_name),
        initializer: members,
        is_on_assignment: false,
    }
}

pub fn property_node(
    type_modifier: Option<&str>,
    member_type: &str,
    name: &str,
    is_default: bool,
    is_readonly: bool,
    statement: Option<Statement>,
    binding: Option<Member>,
) -> Member {
    Member::PublicMember(PublicMember::Property {
        first_token: span(),
        type_modifier: type_modifier.map(str::to_string),
        type_modifier_token: span(),
        member_type: member_type.to_string(),
        type_token: span(),
        name: name.to_string(),
        name_token: span(),
        is_default,
        default_token: span(),
        is_readonly,
        statement,
        binding: binding.map(Box::new),
        semicolon_token: span(),
    })
}

pub fn property_decl(name: &str, member_type: &str) -> Member {
    property_node(None, member_type, name, false, false, None, None)
}

pub fn property_with_value(name: &str, member_type: &str, statement: Statement) -> Member {
    property_node(None, member_type, name, false, false, Some(statement), None)
}

pub fn alias_property(name: &str, statement: Statement) -> Member {
    property_node(None, "alias", name, false, false, Some(statement), None)
}

pub fn signal_decl(name: &str, parameters: &[(&str, &str)]) -> Member {
    Member::PublicMember(PublicMember::Signal {
        name: name.to_string(),
        name_token: span(),
        type_token: span(),
        parameters: parameters
            .iter()
            .map(|(type_name, param_name)| ParameterNode {
                type_name: type_name.to_string(),
                name: param_name.to_string(),
                identifier_token: span(),
            })
            .collect(),
    })
}

pub fn function_decl(name: &str, formals: &[&str]) -> Member {
    Member::SourceElement(SourceElement {
        function: Some(FunctionDeclaration {
            name: name.to_string(),
            identifier_token: span(),
            formals: formals.iter().map(|f| f.to_string()).collect(),
            body: Vec::new(),
        }),
        location: span(),
    })
}

pub fn import_file(file_name: &str, qualifier: Option<&str>) -> Header {
    Header::Import(ImportNode {
        file_name: Some(file_name.to_string()),
        uri: None,
        qualifier: qualifier.map(str::to_string),
        version: None,
        import_token: span(),
        file_name_token: span(),
        qualifier_token: span(),
    })
}

pub fn import_library(uri: &[&str], version: Option<&str>, qualifier: Option<&str>) -> Header {
    Header::Import(ImportNode {
        file_name: None,
        uri: Some(qid(uri)),
        qualifier: qualifier.map(str::to_string),
        version: version.map(str::to_string),
        import_token: span(),
        file_name_token: span(),
        qualifier_token: span(),
    })
}

pub fn pragma(name: Option<&str>) -> Header {
    Header::Pragma(PragmaNode {
        name: name.map(str::to_string),
        pragma_token: span(),
    })
}

pub fn program(headers: Vec<Header>, root: ObjectDefinition) -> Program {
    Program {
        headers,
        members: vec![Member::ObjectDefinition(root)],
    }
}

pub fn build(program: &Program) -> Result<Document, Vec<CompileError>> {
    build_with_illegal_names(program, HashSet::new())
}

pub fn build_with_illegal_names(
    program: &Program,
    illegal_names: HashSet<String>,
) -> Result<Document, Vec<CompileError>> {
    DocumentBuilder::new(illegal_names).build(program, String::new(), "test.qml")
}

pub fn build_ok(program: &Program) -> Document {
    build(program).expect("compilation should succeed")
}

pub fn build_err(program: &Program) -> Vec<CompileError> {
    build(program).expect_err("compilation should fail")
}

/// All error messages, in recording order.
pub fn messages(errors: &[CompileError]) -> Vec<String> {
    errors.iter().map(|e| e.message.clone()).collect()
}
