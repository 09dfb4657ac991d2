// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Helpers for navigating tree-sitter Go syntax trees.

use tree_sitter::Node;

/// Get the source text covered by a node.
pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    source.get(node.byte_range()).unwrap_or("")
}

/// Named children of a node, without comments.
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// All named descendants of `node` (including `node`), in document order.
pub fn descendants<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        out.push(current);
        let mut cursor = current.walk();
        let children: Vec<Node<'t>> = current.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    out
}

/// Whether two nodes are the same node of the same tree.
pub fn same_node(a: Node<'_>, b: Node<'_>) -> bool {
    a.id() == b.id()
}

/// Statements directly contained in a `block`.
///
/// Newer grammar versions wrap block contents in a `statement_list` node; older
/// ones list statements directly under the block. Both shapes are accepted.
pub fn block_statements<'t>(block: Node<'t>) -> Vec<Node<'t>> {
    let mut statements = Vec::new();
    for child in named_children(block) {
        if child.kind() == "statement_list" {
            statements.extend(named_children(child));
        } else {
            statements.push(child);
        }
    }
    statements
}

/// Every statement sequence inside `body`: blocks and case clause bodies.
pub fn statement_sequences<'t>(body: Node<'t>) -> Vec<Vec<Node<'t>>> {
    let mut sequences = Vec::new();
    for node in descendants(body) {
        match node.kind() {
            "block" => sequences.push(block_statements(node)),
            "statement_list" => {
                let under_block = node.parent().map(|p| p.kind() == "block").unwrap_or(false);
                if !under_block {
                    sequences.push(named_children(node));
                }
            }
            _ => {}
        }
    }
    sequences
}

/// Byte offset of the start of the line containing `byte`.
pub fn line_start(source: &str, byte: usize) -> usize {
    source[..byte].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Byte offset of the newline ending the line containing `byte` (or end of input).
pub fn line_end(source: &str, byte: usize) -> usize {
    source[byte..].find('\n').map(|i| byte + i).unwrap_or(source.len())
}

/// Leading whitespace of the line containing `byte`.
pub fn indentation(source: &str, byte: usize) -> &str {
    let start = line_start(source, byte);
    let line = &source[start..line_end(source, start)];
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

/// Whether only whitespace precedes `byte` on its line.
pub fn starts_line(source: &str, byte: usize) -> bool {
    source[line_start(source, byte)..byte].trim().is_empty()
}

/// Whether the rest of the line after `byte` is blank or a line comment.
pub fn rest_of_line_is_trivia(source: &str, byte: usize) -> bool {
    let rest = source[byte..line_end(source, byte)].trim();
    rest.is_empty() || rest.starts_with("//")
}

/// Whether `name` is a valid Go identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

/// The call made by a simple statement, if it has exactly one.
///
/// Recognized shapes: `f(...)`, `x := f(...)`, `x = f(...)`, `x, err := f(...)`.
pub fn statement_call<'t>(stmt: Node<'t>) -> Option<Node<'t>> {
    match stmt.kind() {
        "short_var_declaration" | "assignment_statement" => {
            let right = stmt.child_by_field_name("right")?;
            let values = if right.kind() == "expression_list" {
                named_children(right)
            } else {
                vec![right]
            };
            match values.as_slice() {
                [only] if only.kind() == "call_expression" => Some(*only),
                _ => None,
            }
        }
        "expression_statement" => {
            let expr = named_children(stmt).into_iter().next()?;
            (expr.kind() == "call_expression").then_some(expr)
        }
        _ => None,
    }
}

/// Identifiers on the left-hand side of an assignment or short declaration.
pub fn assigned_names(stmt: Node<'_>, source: &str) -> Vec<String> {
    let left = match stmt.kind() {
        "short_var_declaration" | "assignment_statement" => stmt.child_by_field_name("left"),
        _ => None,
    };
    let Some(left) = left else {
        return Vec::new();
    };
    let targets = if left.kind() == "expression_list" {
        named_children(left)
    } else {
        vec![left]
    };
    targets
        .into_iter()
        .filter(|n| n.kind() == "identifier")
        .map(|n| node_text(n, source).to_string())
        .collect()
}

/// Arguments of a call expression.
pub fn call_arguments<'t>(call: Node<'t>) -> Vec<Node<'t>> {
    call.child_by_field_name("arguments")
        .map(named_children)
        .unwrap_or_default()
}

/// `(operand, field)` of a call whose function is `operand.field` with an identifier operand.
pub fn selector_call<'a>(call: Node<'_>, source: &'a str) -> Option<(&'a str, &'a str)> {
    let function = call.child_by_field_name("function")?;
    selector_parts(function, source)
}

/// `(operand, field)` of a selector expression with an identifier operand.
pub fn selector_parts<'a>(node: Node<'_>, source: &'a str) -> Option<(&'a str, &'a str)> {
    if node.kind() != "selector_expression" {
        return None;
    }
    let operand = node.child_by_field_name("operand")?;
    let field = node.child_by_field_name("field")?;
    if operand.kind() != "identifier" {
        return None;
    }
    Some((node_text(operand, source), node_text(field, source)))
}

/// A declared parameter group, e.g. `a, b int` or `opts ...Option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGroup {
    pub names: Vec<String>,
    pub type_text: String,
    pub variadic: bool,
}

impl ParamGroup {
    /// Number of parameters this group declares.
    pub fn arity(&self) -> usize {
        self.names.len().max(1)
    }
}

/// Parameter groups of a `parameter_list` node.
pub fn parameter_groups(list: Node<'_>, source: &str) -> Vec<ParamGroup> {
    named_children(list)
        .into_iter()
        .filter(|n| {
            n.kind() == "parameter_declaration" || n.kind() == "variadic_parameter_declaration"
        })
        .map(|decl| {
            let mut cursor = decl.walk();
            let names = decl
                .children_by_field_name("name", &mut cursor)
                .map(|n| node_text(n, source).to_string())
                .collect();
            let type_text = decl
                .child_by_field_name("type")
                .map(|t| node_text(t, source).to_string())
                .unwrap_or_default();
            ParamGroup {
                names,
                type_text,
                variadic: decl.kind() == "variadic_parameter_declaration",
            }
        })
        .collect()
}

/// Names declared at the top level of a file: functions, types, vars and consts.
pub fn top_level_names(root: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    for item in named_children(root) {
        match item.kind() {
            "function_declaration" => {
                if let Some(name) = item.child_by_field_name("name") {
                    names.push(node_text(name, source).to_string());
                }
            }
            "var_declaration" | "const_declaration" | "type_declaration" => {
                for node in descendants(item) {
                    if matches!(node.kind(), "var_spec" | "const_spec" | "type_spec" | "type_alias") {
                        let mut cursor = node.walk();
                        for name in node.children_by_field_name("name", &mut cursor) {
                            names.push(node_text(name, source).to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    names
}
