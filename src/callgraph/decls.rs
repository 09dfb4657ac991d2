// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Function declarations of a file.

use tree_sitter::Node;

use crate::program::PackageId;
use crate::syntax::nodes::{named_children, node_text, parameter_groups, ParamGroup};

/// Identity of a function across edits: package, receiver type, and name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncKey {
    pub package: PackageId,
    pub receiver: Option<String>,
    pub name: String,
}

impl FuncKey {
    pub fn function(package: PackageId, name: impl Into<String>) -> Self {
        Self {
            package,
            receiver: None,
            name: name.into(),
        }
    }

    pub fn method(package: PackageId, receiver: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package,
            receiver: Some(receiver.into()),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for FuncKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.receiver {
            Some(receiver) => write!(f, "({}).{}", receiver, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A `func` or method declaration, borrowed from a syntax tree.
#[derive(Debug, Clone)]
pub struct FunctionDecl<'t> {
    pub node: Node<'t>,
    pub name: String,
    /// Receiver type without pointer or type parameters.
    pub receiver_type: Option<String>,
    pub receiver_var: Option<String>,
    pub params: Option<Node<'t>>,
    pub body: Option<Node<'t>>,
}

impl<'t> FunctionDecl<'t> {
    pub fn key(&self, package: PackageId) -> FuncKey {
        FuncKey {
            package,
            receiver: self.receiver_type.clone(),
            name: self.name.clone(),
        }
    }

    pub fn param_groups(&self, source: &str) -> Vec<ParamGroup> {
        self.params
            .map(|list| parameter_groups(list, source))
            .unwrap_or_default()
    }
}

/// Every function and method declaration at the top level of a file.
pub fn function_decls<'t>(root: Node<'t>, source: &str) -> Vec<FunctionDecl<'t>> {
    named_children(root)
        .into_iter()
        .filter_map(|node| match node.kind() {
            "function_declaration" => Some(FunctionDecl {
                node,
                name: node_text(node.child_by_field_name("name")?, source).to_string(),
                receiver_type: None,
                receiver_var: None,
                params: node.child_by_field_name("parameters"),
                body: node.child_by_field_name("body"),
            }),
            "method_declaration" => {
                let (receiver_var, receiver_type) = receiver(node, source)?;
                Some(FunctionDecl {
                    node,
                    name: node_text(node.child_by_field_name("name")?, source).to_string(),
                    receiver_type: Some(receiver_type),
                    receiver_var,
                    params: node.child_by_field_name("parameters"),
                    body: node.child_by_field_name("body"),
                })
            }
            _ => None,
        })
        .collect()
}

/// `(s *Server)` -> `(Some("s"), "Server")`; `(List[T])` -> `(None, "List")`.
fn receiver(method: Node<'_>, source: &str) -> Option<(Option<String>, String)> {
    let list = method.child_by_field_name("receiver")?;
    let group = parameter_groups(list, source).into_iter().next()?;
    let type_name = group
        .type_text
        .trim_start_matches('*')
        .split('[')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    if type_name.is_empty() {
        return None;
    }
    let var = group.names.into_iter().next().filter(|n| n != "_");
    Some((var, type_name))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::syntax::{GoParser, SourceFile};

    #[test]
    fn test_function_decls() {
        let src = "package store\n\ntype List[T any] struct{}\n\nfunc New() *Store { return nil }\n\nfunc (s *Store) Get(key string) string { return key }\n\nfunc (List[T]) Len() int { return 0 }\n";
        let mut parser = GoParser::new().unwrap();
        let file = SourceFile::parse(&mut parser, "store.go", PathBuf::from("store.go"), src.to_string()).unwrap();
        let decls = function_decls(file.root(), file.text());
        assert_eq!(decls.len(), 3);

        assert_eq!(decls[0].name, "New");
        assert!(decls[0].receiver_type.is_none());

        assert_eq!(decls[1].name, "Get");
        assert_eq!(decls[1].receiver_type.as_deref(), Some("Store"));
        assert_eq!(decls[1].receiver_var.as_deref(), Some("s"));
        assert_eq!(decls[1].param_groups(file.text())[0].names, vec!["key"]);

        assert_eq!(decls[2].receiver_type.as_deref(), Some("List"));
        assert!(decls[2].receiver_var.is_none());
    }

    #[test]
    fn test_func_key_display() {
        let key = FuncKey::method(PackageId(0), "Store", "Get");
        assert_eq!(key.to_string(), "(Store).Get");
        assert_eq!(FuncKey::function(PackageId(0), "main").to_string(), "main");
    }
}
