// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Whole-program call graph.
//!
//! Functions live in an arena addressed by [`FuncId`]. Edges are kept in both
//! directions so propagation can walk from a callee to its callers. Cycles are
//! kept as-is; traversals use explicit visited sets.

mod decls;
mod resolver;

pub use decls::{function_decls, FuncKey, FunctionDecl};
pub use resolver::{is_call_target, CallContext, SelectorTarget};

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::program::{FileId, Program};
use crate::syntax::nodes::{descendants, named_children, node_text};
use resolver::{is_declaration_name, is_selector_operand};

/// Methods that commonly satisfy standard library interfaces; their signatures are fixed.
const INTERFACE_METHODS: &[&str] = &[
    "ServeHTTP",
    "String",
    "Error",
    "Read",
    "Write",
    "Close",
    "Len",
    "Less",
    "Swap",
    "MarshalJSON",
    "UnmarshalJSON",
    "Format",
    "GoString",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncId(pub usize);

/// How a function is invoked from outside the program's own code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// `func main()` of a `main` package.
    Main,
    /// `func(w http.ResponseWriter, r *http.Request)`; `request` is the request parameter name.
    HttpHandler { request: Option<String> },
    /// `TestXxx`, `BenchmarkXxx`, `FuzzXxx` or `ExampleXxx` in a test file.
    Test,
}

/// A function in the call graph.
#[derive(Debug, Clone)]
pub struct FunctionNode {
    pub id: FuncId,
    pub key: FuncKey,
    pub file: FileId,
    pub line: usize,
    pub is_test_file: bool,
    pub entry: Option<EntryKind>,
    /// Position a new parameter takes: after the fixed parameters, before a variadic one.
    pub handle_index: usize,
    /// All parameters are named (Go forbids mixing named and unnamed ones).
    pub named_params: bool,
    /// Already declares a parameter with the tracing handle's name.
    pub has_handle_param: bool,
    pub has_body: bool,
    pub callees: BTreeSet<FuncId>,
    pub callers: BTreeSet<FuncId>,
}

/// Call graph over every loaded function, tests included.
#[derive(Debug, Default)]
pub struct CallGraph {
    nodes: Vec<FunctionNode>,
    index: HashMap<FuncKey, FuncId>,
    value_refs: BTreeSet<FuncId>,
    interface_methods: HashSet<String>,
    /// Method names called through a value whose type is not known.
    dynamic_methods: HashSet<String>,
}

impl CallGraph {
    /// Build the graph from the current state of `program`.
    pub fn build(program: &Program, handle_name: &str) -> Self {
        let mut graph = Self::default();

        for file_id in program.file_ids() {
            let file = program.file(file_id);
            let package = program.package_of(file_id);
            let imports = program.imports(file_id);
            let http = imports.name_for("net/http").map(str::to_string);

            for decl in function_decls(file.root(), file.text()) {
                if decl.name == "_" {
                    continue;
                }
                let key = decl.key(package.id);
                if graph.index.contains_key(&key) {
                    debug!(function = %key, file = %file.path, "duplicate declaration ignored");
                    continue;
                }
                let groups = decl.param_groups(file.text());
                let handle_index: usize = groups
                    .iter()
                    .filter(|g| !g.variadic)
                    .map(|g| g.arity())
                    .sum();
                let named_params = groups.iter().all(|g| !g.names.is_empty());
                let has_handle_param = groups
                    .iter()
                    .any(|g| g.names.iter().any(|n| n == handle_name));

                let entry = if file.is_test() {
                    is_test_function(&decl).then_some(EntryKind::Test)
                } else if package.name == "main" && decl.name == "main" && decl.receiver_type.is_none()
                {
                    Some(EntryKind::Main)
                } else {
                    http_handler_request(&groups, http.as_deref())
                        .map(|request| EntryKind::HttpHandler { request })
                };

                let id = FuncId(graph.nodes.len());
                graph.index.insert(key.clone(), id);
                graph.nodes.push(FunctionNode {
                    id,
                    key,
                    file: file_id,
                    line: decl.node.start_position().row + 1,
                    is_test_file: file.is_test(),
                    entry,
                    handle_index,
                    named_params,
                    has_handle_param,
                    has_body: decl.body.is_some(),
                    callees: BTreeSet::new(),
                    callers: BTreeSet::new(),
                });
            }
        }

        for file_id in program.file_ids() {
            graph.add_file_edges(program, file_id);
        }

        debug!(
            functions = graph.nodes.len(),
            value_refs = graph.value_refs.len(),
            "call graph built"
        );
        graph
    }

    fn add_file_edges(&mut self, program: &Program, file_id: FileId) {
        let file = program.file(file_id);
        let source = file.text();
        let package = program.package_of(file_id);
        let imports = program.imports(file_id);

        for node in descendants(file.root()) {
            if matches!(node.kind(), "method_spec" | "method_elem") {
                if let Some(name) = node.child_by_field_name("name") {
                    self.interface_methods.insert(node_text(name, source).to_string());
                }
            }
        }

        let decls = function_decls(file.root(), source);
        for decl in &decls {
            let Some(caller) = self.lookup(&decl.key(package.id)) else {
                continue;
            };
            let ctx = CallContext::for_decl(program, package.id, &imports, decl);
            let Some(body) = decl.body else {
                continue;
            };
            for node in descendants(body) {
                match node.kind() {
                    "call_expression" => {
                        match ctx
                            .resolve_call(node, source)
                            .and_then(|key| self.lookup(&key))
                        {
                            Some(callee) => {
                                self.nodes[caller.0].callees.insert(callee);
                                self.nodes[callee.0].callers.insert(caller);
                            }
                            None => self.record_dynamic_call(&ctx, node, source),
                        }
                    }
                    "identifier" | "selector_expression" => {
                        self.record_value_ref(&ctx, node, source);
                    }
                    _ => {}
                }
            }
        }

        // Package-level initializers can take function values too.
        let package_level = CallContext::package_level(program, package.id, &imports);
        for item in named_children(file.root()) {
            if matches!(item.kind(), "var_declaration" | "const_declaration") {
                for node in descendants(item) {
                    match node.kind() {
                        "identifier" | "selector_expression" => {
                            self.record_value_ref(&package_level, node, source);
                        }
                        "call_expression" => {
                            let resolved = package_level
                                .resolve_call(node, source)
                                .and_then(|key| self.lookup(&key));
                            if resolved.is_none() {
                                self.record_dynamic_call(&package_level, node, source);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn record_dynamic_call(&mut self, ctx: &CallContext<'_>, call: tree_sitter::Node<'_>, source: &str) {
        if let Some(name) = ctx.dynamic_method(call, source) {
            if self.dynamic_methods.insert(name.clone()) {
                debug!(method = %name, "method called through a value of unknown type");
            }
        }
    }

    fn record_value_ref(&mut self, ctx: &CallContext<'_>, node: tree_sitter::Node<'_>, source: &str) {
        if is_call_target(node) || is_declaration_name(node) {
            return;
        }
        if node.kind() == "identifier" && is_selector_operand(node) {
            return;
        }
        if let Some(id) = ctx
            .resolve_target(node, source)
            .and_then(|key| self.lookup(&key))
        {
            if self.value_refs.insert(id) {
                debug!(function = %self.nodes[id.0].key, "function used as a value");
            }
        }
    }

    pub fn lookup(&self, key: &FuncKey) -> Option<FuncId> {
        self.index.get(key).copied()
    }

    pub fn node(&self, id: FuncId) -> &FunctionNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[FunctionNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn callers(&self, id: FuncId) -> &BTreeSet<FuncId> {
        &self.nodes[id.0].callers
    }

    pub fn callees(&self, id: FuncId) -> &BTreeSet<FuncId> {
        &self.nodes[id.0].callees
    }

    pub fn is_value_ref(&self, id: FuncId) -> bool {
        self.value_refs.contains(&id)
    }

    /// Whether a function's signature must not change.
    ///
    /// Functions used as values, interface implementations, methods sharing a name with
    /// a call through a value of unknown type, `init`, bodiless declarations and
    /// functions with unnamed parameters are left alone. Entry points are never barriers.
    pub fn is_barrier(&self, id: FuncId) -> bool {
        let node = self.node(id);
        if node.entry.is_some() {
            return false;
        }
        let is_method = node.key.receiver.is_some();
        let implements_interface = is_method
            && (self.interface_methods.contains(&node.key.name)
                || INTERFACE_METHODS.contains(&node.key.name.as_str()));
        let called_dynamically = is_method && self.dynamic_methods.contains(&node.key.name);
        let is_init = !is_method && node.key.name == "init";
        self.value_refs.contains(&id)
            || !node.named_params
            || !node.has_body
            || implements_interface
            || called_dynamically
            || is_init
    }

    /// Non-test entry points: `main` functions and HTTP handlers.
    pub fn entry_points(&self) -> Vec<FuncId> {
        self.nodes
            .iter()
            .filter(|n| {
                !n.is_test_file
                    && matches!(n.entry, Some(EntryKind::Main) | Some(EntryKind::HttpHandler { .. }))
            })
            .map(|n| n.id)
            .collect()
    }

    /// Functions reachable from an entry point along call edges.
    pub fn reachable_from_entries(&self) -> BTreeSet<FuncId> {
        let mut seen: BTreeSet<FuncId> = BTreeSet::new();
        let mut queue: VecDeque<FuncId> = self.entry_points().into_iter().collect();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            for callee in self.callees(id) {
                if !seen.contains(callee) {
                    queue.push_back(*callee);
                }
            }
        }
        seen
    }
}

fn is_test_function(decl: &FunctionDecl<'_>) -> bool {
    decl.receiver_type.is_none()
        && ["Test", "Benchmark", "Fuzz", "Example"]
            .iter()
            .any(|prefix| decl.name.starts_with(prefix))
}

/// Request parameter name if the parameters are `(http.ResponseWriter, *http.Request)`.
///
/// `http` is the local name of `net/http` in the file.
pub fn http_handler_request(
    groups: &[crate::syntax::nodes::ParamGroup],
    http: Option<&str>,
) -> Option<Option<String>> {
    let http = http?;
    let mut params: Vec<(Option<&str>, &str)> = Vec::new();
    for group in groups {
        if group.names.is_empty() {
            params.push((None, group.type_text.as_str()));
        } else {
            for name in &group.names {
                params.push((Some(name.as_str()), group.type_text.as_str()));
            }
        }
    }
    match params.as_slice() {
        [(_, writer), (request, req_type)]
            if *writer == format!("{}.ResponseWriter", http)
                && *req_type == format!("*{}.Request", http) =>
        {
            Some(request.filter(|n| *n != "_").map(str::to_string))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{LoadOptions, PackageLoader};
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn load(files: &[(&str, &str)]) -> (TempDir, Program) {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "go.mod", "module example.com/app\n");
        for (rel, content) in files {
            write(tmp.path(), rel, content);
        }
        let program = PackageLoader::new(tmp.path(), LoadOptions::default())
            .unwrap()
            .load()
            .unwrap();
        (tmp, program)
    }

    fn id(graph: &CallGraph, program: &Program, pkg: &str, name: &str) -> FuncId {
        let package = program.package_by_import_path(pkg).unwrap();
        graph.lookup(&FuncKey::function(package, name)).unwrap()
    }

    #[test]
    fn test_edges_across_packages() {
        let (_tmp, program) = load(&[
            (
                "main.go",
                "package main\n\nimport \"example.com/app/store\"\n\nfunc main() {\n\trun()\n}\n\nfunc run() {\n\tstore.Load(1)\n}\n",
            ),
            ("store/store.go", "package store\n\nfunc Load(id int) {\n\tLoad(id - 1)\n}\n"),
        ]);
        let graph = CallGraph::build(&program, "nrTxn");
        let main = id(&graph, &program, "example.com/app", "main");
        let run = id(&graph, &program, "example.com/app", "run");
        let load = id(&graph, &program, "example.com/app/store", "Load");

        assert!(graph.callees(main).contains(&run));
        assert!(graph.callers(load).contains(&run));
        // Recursion is an ordinary edge.
        assert!(graph.callers(load).contains(&load));
        assert_eq!(graph.node(main).entry, Some(EntryKind::Main));
        assert_eq!(graph.node(load).handle_index, 1);

        let reachable = graph.reachable_from_entries();
        assert!(reachable.contains(&load));
    }

    #[test]
    fn test_method_calls_through_receiver() {
        let (_tmp, program) = load(&[(
            "svc.go",
            "package svc\n\ntype S struct{}\n\nfunc (s *S) A() {\n\ts.B()\n}\n\nfunc (s *S) B() {}\n",
        )]);
        let graph = CallGraph::build(&program, "nrTxn");
        let package = program.package_by_import_path("example.com/app").unwrap();
        let a = graph.lookup(&FuncKey::method(package, "S", "A")).unwrap();
        let b = graph.lookup(&FuncKey::method(package, "S", "B")).unwrap();
        assert!(graph.callees(a).contains(&b));
    }

    #[test]
    fn test_http_handlers_and_value_refs() {
        let (_tmp, program) = load(&[(
            "main.go",
            "package main\n\nimport \"net/http\"\n\nfunc index(w http.ResponseWriter, r *http.Request) {}\n\nfunc helper() {}\n\nvar hooks = []func(){helper}\n\nfunc main() {\n\thttp.HandleFunc(\"/\", index)\n}\n",
        )]);
        let graph = CallGraph::build(&program, "nrTxn");
        let index = id(&graph, &program, "example.com/app", "index");
        let helper = id(&graph, &program, "example.com/app", "helper");
        assert_eq!(
            graph.node(index).entry,
            Some(EntryKind::HttpHandler { request: Some("r".to_string()) })
        );
        assert!(graph.is_value_ref(index));
        assert!(!graph.is_barrier(index));
        assert!(graph.is_value_ref(helper));
        assert!(graph.is_barrier(helper));
        assert_eq!(graph.entry_points().len(), 2);
    }

    #[test]
    fn test_method_calls_through_typed_locals() {
        let (_tmp, program) = load(&[(
            "main.go",
            "package main\n\ntype Server struct{}\n\nfunc (s *Server) fetch() {}\n\nfunc (s *Server) stop() {}\n\nfunc main() {\n\tsrv := &Server{}\n\tsrv.fetch()\n\tcurrent().stop()\n}\n\nfunc current() *Server { return nil }\n",
        )]);
        let graph = CallGraph::build(&program, "nrTxn");
        let package = program.package_by_import_path("example.com/app").unwrap();
        let main = id(&graph, &program, "example.com/app", "main");
        let fetch = graph.lookup(&FuncKey::method(package, "Server", "fetch")).unwrap();
        let stop = graph.lookup(&FuncKey::method(package, "Server", "stop")).unwrap();

        assert!(graph.callers(fetch).contains(&main));
        assert!(!graph.is_barrier(fetch));
        // The receiver of `current().stop()` is not known from the syntax.
        assert!(graph.callers(stop).is_empty());
        assert!(graph.is_barrier(stop));
    }

    #[test]
    fn test_shadowing_local_adds_no_edge() {
        let (_tmp, program) = load(&[(
            "main.go",
            "package main\n\nfunc main() {\n\tfetch := func(s string) string { return s }\n\tfetch(\"c\")\n}\n\nfunc fetch(url string) string { return url }\n",
        )]);
        let graph = CallGraph::build(&program, "nrTxn");
        let fetch = id(&graph, &program, "example.com/app", "fetch");
        assert!(graph.callers(fetch).is_empty());
        assert!(!graph.is_value_ref(fetch));
    }

    #[test]
    fn test_init_is_a_barrier() {
        let (_tmp, program) = load(&[(
            "main.go",
            "package main\n\nfunc init() {\n\tsetup()\n}\n\nfunc main() {}\n\nfunc setup() {}\n",
        )]);
        let graph = CallGraph::build(&program, "nrTxn");
        let init = id(&graph, &program, "example.com/app", "init");
        let setup = id(&graph, &program, "example.com/app", "setup");
        assert!(graph.node(init).entry.is_none());
        assert!(graph.is_barrier(init));
        assert!(graph.callers(setup).contains(&init));
        assert!(!graph.is_barrier(setup));
    }

    #[test]
    fn test_interface_methods_are_barriers() {
        let (_tmp, program) = load(&[(
            "shape.go",
            "package shape\n\ntype Shape interface {\n\tArea() float64\n}\n\ntype Sq struct{}\n\nfunc (s Sq) Area() float64 { return 0 }\n\nfunc (s Sq) Side() float64 { return 0 }\n",
        )]);
        let graph = CallGraph::build(&program, "nrTxn");
        let package = program.package_by_import_path("example.com/app").unwrap();
        let area = graph.lookup(&FuncKey::method(package, "Sq", "Area")).unwrap();
        let side = graph.lookup(&FuncKey::method(package, "Sq", "Side")).unwrap();
        assert!(graph.is_barrier(area));
        assert!(!graph.is_barrier(side));
    }

    #[test]
    fn test_unreachable_function_not_in_entry_set() {
        let (_tmp, program) = load(&[(
            "main.go",
            "package main\n\nfunc main() {}\n\nfunc orphan() {\n\tworker()\n}\n\nfunc worker() {}\n",
        )]);
        let graph = CallGraph::build(&program, "nrTxn");
        let worker = id(&graph, &program, "example.com/app", "worker");
        let orphan = id(&graph, &program, "example.com/app", "orphan");
        let reachable = graph.reachable_from_entries();
        assert!(!reachable.contains(&worker));
        assert!(!reachable.contains(&orphan));
        assert!(graph.callers(worker).contains(&orphan));
    }

    #[test]
    fn test_test_functions_are_test_entries() {
        let (_tmp, program) = load(&[
            ("calc.go", "package calc\n\nfunc Add(a, b int) int { return a + b }\n"),
            (
                "calc_test.go",
                "package calc\n\nimport \"testing\"\n\nfunc TestAdd(t *testing.T) {\n\tAdd(1, 2)\n}\n",
            ),
        ]);
        let graph = CallGraph::build(&program, "nrTxn");
        let test = id(&graph, &program, "example.com/app", "TestAdd");
        let add = id(&graph, &program, "example.com/app", "Add");
        assert_eq!(graph.node(test).entry, Some(EntryKind::Test));
        assert!(graph.node(test).is_test_file);
        assert!(graph.callers(add).contains(&test));
        assert_eq!(graph.node(add).handle_index, 2);
        assert!(graph.entry_points().is_empty());
    }
}
