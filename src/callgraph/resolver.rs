// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Static resolution of call targets.

use tree_sitter::Node;

use super::decls::{FuncKey, FunctionDecl};
use crate::program::{ImportTable, PackageId, Program};
use crate::syntax::nodes::{call_arguments, named_children, node_text, selector_parts};

/// What is in scope where an expression appears.
pub struct CallContext<'a> {
    pub program: &'a Program,
    pub package: PackageId,
    pub imports: &'a ImportTable,
    pub receiver_var: Option<&'a str>,
    pub receiver_type: Option<&'a str>,
}

/// How `x.M` binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorTarget {
    /// A function or method key in a loaded package.
    Resolved(FuncKey),
    /// A package or type outside the program.
    External,
    /// A method whose receiver type is not known from the syntax.
    Dynamic(String),
}

/// A type as written: `T`, `*T`, `T[int]` or `pkg.T`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TypeName {
    package: Option<String>,
    name: String,
}

/// A declaration of a local name.
#[derive(Debug, Clone, Copy)]
struct LocalDecl<'t> {
    type_node: Option<Node<'t>>,
    value: Option<Node<'t>>,
}

impl LocalDecl<'_> {
    fn type_name(&self, source: &str) -> Option<TypeName> {
        match self.type_node {
            Some(node) => type_name(node, source),
            None => value_type(self.value?, source),
        }
    }
}

impl<'a> CallContext<'a> {
    pub fn for_decl(
        program: &'a Program,
        package: PackageId,
        imports: &'a ImportTable,
        decl: &'a FunctionDecl<'_>,
    ) -> Self {
        Self {
            program,
            package,
            imports,
            receiver_var: decl.receiver_var.as_deref(),
            receiver_type: decl.receiver_type.as_deref(),
        }
    }

    /// Context for package-level initializers.
    pub fn package_level(program: &'a Program, package: PackageId, imports: &'a ImportTable) -> Self {
        Self {
            program,
            package,
            imports,
            receiver_var: None,
            receiver_type: None,
        }
    }

    /// Resolve an expression naming a function: `f`, `pkg.F`, `recv.M` or `x.M`
    /// for a local `x` of a known type.
    ///
    /// The key is only a candidate; whether it names a loaded function is up to the graph.
    /// A name declared in an enclosing local scope never resolves to a package function.
    pub fn resolve_target(&self, expr: Node<'_>, source: &str) -> Option<FuncKey> {
        match expr.kind() {
            "identifier" => {
                let name = node_text(expr, source);
                if local_decl(expr, name, source).is_some() {
                    return None;
                }
                Some(FuncKey::function(self.package, name))
            }
            "selector_expression" => match self.resolve_selector(expr, source)? {
                SelectorTarget::Resolved(key) => Some(key),
                _ => None,
            },
            "parenthesized_expression" => {
                let inner = expr.named_child(0)?;
                self.resolve_target(inner, source)
            }
            _ => None,
        }
    }

    /// Resolve the target of a `call_expression`.
    pub fn resolve_call(&self, call: Node<'_>, source: &str) -> Option<FuncKey> {
        let function = call.child_by_field_name("function")?;
        self.resolve_target(function, source)
    }

    pub fn resolve_selector(&self, expr: Node<'_>, source: &str) -> Option<SelectorTarget> {
        if expr.kind() != "selector_expression" {
            return None;
        }
        let field = node_text(expr.child_by_field_name("field")?, source);
        let Some((operand, _)) = selector_parts(expr, source) else {
            return Some(SelectorTarget::Dynamic(field.to_string()));
        };
        let operand_node = expr.child_by_field_name("operand")?;

        if let Some(decl) = local_decl(operand_node, operand, source) {
            return Some(self.method_of(decl.type_name(source), field));
        }
        if let (Some(var), Some(receiver)) = (self.receiver_var, self.receiver_type) {
            if operand == var {
                return Some(SelectorTarget::Resolved(FuncKey::method(self.package, receiver, field)));
            }
        }
        if let Some(path) = self.imports.path_for(operand) {
            return Some(match self.program.package_by_import_path(path) {
                Some(package) => SelectorTarget::Resolved(FuncKey::function(package, field)),
                None => SelectorTarget::External,
            });
        }
        match self.package_var_type(operand) {
            Some(type_name) => Some(self.method_of(type_name, field)),
            None => Some(SelectorTarget::Dynamic(field.to_string())),
        }
    }

    /// Method name of a selector call whose callee cannot be pinned to one declaration.
    ///
    /// Only meaningful once the graph has no node for the resolved key.
    pub fn dynamic_method(&self, call: Node<'_>, source: &str) -> Option<String> {
        let function = call.child_by_field_name("function")?;
        match self.resolve_selector(function, source)? {
            SelectorTarget::Dynamic(name) => Some(name),
            SelectorTarget::Resolved(key) if key.receiver.is_some() => Some(key.name),
            _ => None,
        }
    }

    fn method_of(&self, type_name: Option<TypeName>, field: &str) -> SelectorTarget {
        match type_name {
            Some(TypeName { package: None, name }) => {
                SelectorTarget::Resolved(FuncKey::method(self.package, name, field))
            }
            Some(TypeName {
                package: Some(alias),
                name,
            }) => match self
                .imports
                .path_for(&alias)
                .and_then(|path| self.program.package_by_import_path(path))
            {
                Some(package) => SelectorTarget::Resolved(FuncKey::method(package, name, field)),
                None => SelectorTarget::External,
            },
            None => SelectorTarget::Dynamic(field.to_string()),
        }
    }

    /// Type of a package-level variable; `Some(None)` when declared without a readable type.
    fn package_var_type(&self, name: &str) -> Option<Option<TypeName>> {
        for file_id in &self.program.package(self.package).files {
            let file = self.program.file(*file_id);
            for item in named_children(file.root()) {
                if item.kind() != "var_declaration" {
                    continue;
                }
                if let Some(decl) = declared_in(item, item, name, file.text()) {
                    return Some(decl.type_name(file.text()));
                }
            }
        }
        None
    }
}

/// The innermost local declaration of `name` visible at `at`.
///
/// Walks outwards through enclosing blocks, clauses and parameter lists up to the
/// enclosing function declaration. Only declarations that end before `at` count,
/// so `x := x` still refers to the outer `x`.
fn local_decl<'t>(at: Node<'t>, name: &str, source: &str) -> Option<LocalDecl<'t>> {
    let mut current = at.parent();
    while let Some(scope) = current {
        let mut found = None;
        for earlier in named_children(scope) {
            if earlier.end_byte() > at.start_byte() {
                break;
            }
            if let Some(decl) = declared_in(earlier, scope, name, source) {
                found = Some(decl);
            }
        }
        if found.is_some() {
            return found;
        }
        if matches!(scope.kind(), "function_declaration" | "method_declaration") {
            return None;
        }
        current = scope.parent();
    }
    None
}

fn declared_in<'t>(node: Node<'t>, scope: Node<'t>, name: &str, source: &str) -> Option<LocalDecl<'t>> {
    match node.kind() {
        "short_var_declaration" => {
            let names = list_items(node.child_by_field_name("left")?);
            let index = names.iter().position(|n| node_text(*n, source) == name)?;
            let values = node
                .child_by_field_name("right")
                .map(list_items)
                .unwrap_or_default();
            Some(LocalDecl {
                type_node: None,
                value: (values.len() == names.len()).then(|| values[index]),
            })
        }
        "var_declaration" | "const_declaration" => named_children(node)
            .into_iter()
            .flat_map(|child| {
                if child.kind().ends_with("_spec_list") {
                    named_children(child)
                } else {
                    vec![child]
                }
            })
            .find_map(|spec| spec_decl(spec, name, source)),
        "for_clause" => {
            let init = node.child_by_field_name("initializer")?;
            declared_in(init, scope, name, source)
        }
        "range_clause" | "receive_statement" => {
            let left = node.child_by_field_name("left")?;
            let right = node.child_by_field_name("right")?;
            let operator = source.get(left.end_byte()..right.start_byte())?;
            (operator.contains(":=")
                && list_items(left).iter().any(|n| node_text(*n, source) == name))
            .then_some(LocalDecl {
                type_node: None,
                value: None,
            })
        }
        "parameter_list" => named_children(node)
            .into_iter()
            .filter(|d| matches!(d.kind(), "parameter_declaration" | "variadic_parameter_declaration"))
            .find_map(|d| {
                let mut cursor = d.walk();
                let declares = d
                    .children_by_field_name("name", &mut cursor)
                    .any(|n| node_text(n, source) == name);
                declares.then(|| LocalDecl {
                    type_node: d.child_by_field_name("type"),
                    value: None,
                })
            }),
        "expression_list" if scope.kind() == "type_switch_statement" => list_items(node)
            .iter()
            .any(|n| node_text(*n, source) == name)
            .then_some(LocalDecl {
                type_node: None,
                value: None,
            }),
        _ => None,
    }
}

fn spec_decl<'t>(spec: Node<'t>, name: &str, source: &str) -> Option<LocalDecl<'t>> {
    if !matches!(spec.kind(), "var_spec" | "const_spec") {
        return None;
    }
    let mut cursor = spec.walk();
    let names: Vec<Node<'t>> = spec.children_by_field_name("name", &mut cursor).collect();
    let index = names.iter().position(|n| node_text(*n, source) == name)?;
    let values = spec
        .child_by_field_name("value")
        .map(list_items)
        .unwrap_or_default();
    Some(LocalDecl {
        type_node: spec.child_by_field_name("type"),
        value: (values.len() == names.len()).then(|| values[index]),
    })
}

fn list_items(node: Node<'_>) -> Vec<Node<'_>> {
    if node.kind() == "expression_list" {
        named_children(node)
    } else {
        vec![node]
    }
}

fn type_name(node: Node<'_>, source: &str) -> Option<TypeName> {
    match node.kind() {
        "type_identifier" | "identifier" => Some(TypeName {
            package: None,
            name: node_text(node, source).to_string(),
        }),
        "qualified_type" => Some(TypeName {
            package: Some(node_text(node.child_by_field_name("package")?, source).to_string()),
            name: node_text(node.child_by_field_name("name")?, source).to_string(),
        }),
        "pointer_type" | "parenthesized_type" => type_name(node.named_child(0)?, source),
        "generic_type" => type_name(node.child_by_field_name("type")?, source),
        _ => None,
    }
}

/// Type of `T{}`, `&T{}` or `new(T)`.
fn value_type(value: Node<'_>, source: &str) -> Option<TypeName> {
    match value.kind() {
        "composite_literal" => type_name(value.child_by_field_name("type")?, source),
        "unary_expression" => {
            let operator = value.child_by_field_name("operator")?;
            if node_text(operator, source) != "&" {
                return None;
            }
            value_type(value.child_by_field_name("operand")?, source)
        }
        "call_expression" => {
            let function = value.child_by_field_name("function")?;
            if function.kind() != "identifier" || node_text(function, source) != "new" {
                return None;
            }
            type_name(*call_arguments(value).first()?, source)
        }
        "parenthesized_expression" => value_type(value.named_child(0)?, source),
        _ => None,
    }
}

/// Whether `node` is the function being called by its parent call expression.
pub fn is_call_target(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "call_expression" => parent
            .child_by_field_name("function")
            .map(|f| f.id() == node.id())
            .unwrap_or(false),
        "parenthesized_expression" => is_call_target(parent),
        _ => false,
    }
}

/// Whether an identifier is the operand of a selector (`pkg` in `pkg.F`).
pub fn is_selector_operand(node: Node<'_>) -> bool {
    node.parent()
        .filter(|p| p.kind() == "selector_expression")
        .and_then(|p| p.child_by_field_name("operand"))
        .map(|operand| operand.id() == node.id())
        .unwrap_or(false)
}

/// Whether an identifier declares a name rather than referring to one.
pub fn is_declaration_name(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "parameter_declaration"
        | "variadic_parameter_declaration"
        | "var_spec"
        | "const_spec"
        | "type_spec"
        | "function_declaration"
        | "method_declaration"
        | "labeled_statement"
        | "range_clause" => true,
        "expression_list" => parent
            .parent()
            .filter(|gp| matches!(gp.kind(), "short_var_declaration" | "range_clause"))
            .and_then(|gp| gp.child_by_field_name("left"))
            .map(|left| left.id() == parent.id())
            .unwrap_or(false),
        "short_var_declaration" => parent
            .child_by_field_name("left")
            .map(|left| left.id() == node.id())
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::syntax::nodes::descendants;
    use crate::syntax::{GoParser, SourceFile};

    fn parse(src: &str) -> SourceFile {
        let mut parser = GoParser::new().unwrap();
        SourceFile::parse(&mut parser, "main.go", PathBuf::from("main.go"), src.to_string()).unwrap()
    }

    /// Function expressions of every call, in source order.
    fn callees<'t>(file: &'t SourceFile) -> Vec<Node<'t>> {
        descendants(file.root())
            .into_iter()
            .filter(|n| n.kind() == "call_expression")
            .filter_map(|n| n.child_by_field_name("function"))
            .collect()
    }

    fn shadowed(file: &SourceFile, function: Node<'_>) -> bool {
        let name = node_text(function, file.text());
        local_decl(function, name, file.text()).is_some()
    }

    #[test]
    fn test_locals_shadow_package_functions() {
        let file = parse(
            "package main\n\nfunc helper(run func()) {\n\tfetch := func(s string) string { return s }\n\tfetch(\"c\")\n\trun()\n\tload()\n}\n",
        );
        let calls = callees(&file);
        assert_eq!(calls.len(), 3);
        assert!(shadowed(&file, calls[0]));
        assert!(shadowed(&file, calls[1]));
        assert!(!shadowed(&file, calls[2]));
    }

    #[test]
    fn test_declaration_must_precede_use() {
        let file = parse(
            "package main\n\nfunc main() {\n\tfetch()\n\tfetch := 1\n\t_ = fetch\n\tif ok := check(); ok {\n\t\tok()\n\t}\n\tfor i := range items() {\n\t\ti()\n\t}\n}\n",
        );
        let calls = callees(&file);
        let names: Vec<&str> = calls.iter().map(|c| node_text(*c, file.text())).collect();
        assert_eq!(names, vec!["fetch", "check", "ok", "items", "i"]);
        assert!(!shadowed(&file, calls[0]));
        assert!(!shadowed(&file, calls[1]));
        assert!(shadowed(&file, calls[2]));
        assert!(!shadowed(&file, calls[3]));
        assert!(shadowed(&file, calls[4]));
    }

    #[test]
    fn test_local_variable_types() {
        let file = parse(
            "package main\n\nfunc main(c *Client, h http.Handler) {\n\ta := &Server{}\n\tvar b Store\n\td := new(Cache)\n\te := List[int]{}\n\tf := build()\n\ta.x()\n\tb.x()\n\tc.x()\n\td.x()\n\te.x()\n\tf.x()\n\th.x()\n}\n",
        );
        let src = file.text();
        let types: Vec<Option<TypeName>> = callees(&file)
            .into_iter()
            .filter(|f| f.kind() == "selector_expression")
            .map(|f| {
                let operand = f.child_by_field_name("operand").unwrap();
                local_decl(operand, node_text(operand, src), src)
                    .unwrap()
                    .type_name(src)
            })
            .collect();
        let local = |name: &str| {
            Some(TypeName {
                package: None,
                name: name.to_string(),
            })
        };
        assert_eq!(types[0], local("Server"));
        assert_eq!(types[1], local("Store"));
        assert_eq!(types[2], local("Client"));
        assert_eq!(types[3], local("Cache"));
        assert_eq!(types[4], local("List"));
        assert_eq!(types[5], None);
        assert_eq!(
            types[6],
            Some(TypeName {
                package: Some("http".to_string()),
                name: "Handler".to_string(),
            })
        );
    }
}
