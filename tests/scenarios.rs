// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end instrumentation of small Go workspaces.

use std::path::Path;

use go_instrument::callgraph::CallGraph;
use go_instrument::config::InstrumentConfig;
use go_instrument::detect::detect;
use go_instrument::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use go_instrument::engine::{EngineConfig, InstrumentationManager};
use go_instrument::integrations::{
    Catalog, GenerateContext, Injection, Integration, Placement, StatementView,
};
use go_instrument::pipeline::Pipeline;
use go_instrument::program::Program;
use go_instrument::syntax::{LoadOptions, PackageLoader};
use go_instrument::{InstrumentError, Result};
use tempfile::TempDir;

const GO_MOD: &str = "module example.com/app\n\ngo 1.22\n";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("go.mod"), GO_MOD).unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Run every engine stage in memory.
fn instrument(root: &Path) -> (Program, Vec<Diagnostic>) {
    instrument_with(root, EngineConfig::default())
}

fn instrument_with(root: &Path, config: EngineConfig) -> (Program, Vec<Diagnostic>) {
    let mut program = PackageLoader::new(root, LoadOptions::default())
        .unwrap()
        .load()
        .unwrap();
    let catalog = Catalog::builtin();
    let mut sink = DiagnosticSink::new();
    let detection = detect(&program, &catalog, &mut sink);
    let graph = CallGraph::build(&program, &config.handle_name);
    {
        let mut manager =
            InstrumentationManager::new(&mut program, &catalog, &config, detection, &mut sink)
                .unwrap();
        manager.run(&graph).unwrap();
    }
    let diagnostics = sink.flush();
    (program, diagnostics)
}

fn text(program: &Program, path: &str) -> String {
    let id = program.file_by_path(path).unwrap();
    program.file(id).text().to_string()
}

fn is_dirty(program: &Program, path: &str) -> bool {
    let id = program.file_by_path(path).unwrap();
    program.file(id).is_dirty()
}

/// Write every rewritten file back to disk.
fn write_back(root: &Path, program: &Program) {
    for id in program.dirty_files() {
        let file = program.file(id);
        std::fs::write(root.join(&file.path), file.text()).unwrap();
    }
}

const SLOG_MAIN: &str = r#"package main

import (
	"log/slog"
	"os"
)

func main() {
	opts := &slog.HandlerOptions{}
	handler := slog.NewTextHandler(os.Stdout, opts)
	log := slog.New(handler)
	log.Info("started")
}
"#;

const CLIENT_MAIN: &str = r#"package main

import (
	"fmt"
	"net/http"
)

func main() {
	body := load("http://example.com")
	fmt.Println(body)
}

func load(url string) string {
	return fetch(url)
}

func fetch(url string) string {
	resp, err := http.Get(url)
	if err != nil {
		return ""
	}
	defer resp.Body.Close()
	return resp.Status
}
"#;

const CLIENT_TEST: &str = r#"package main

import "testing"

func TestLoad(t *testing.T) {
	if load("http://127.0.0.1:1") != "" {
		t.Fatal("expected an empty status")
	}
}
"#;

#[test]
fn test_slog_handler_wrapped_and_later_use_rebound() {
    let ws = Workspace::new(&[("main.go", SLOG_MAIN)]);
    let (program, diagnostics) = instrument(ws.path());
    let main = text(&program, "main.go");

    assert!(main.contains(
        "\thandler := slog.NewTextHandler(os.Stdout, opts)\n\
         \tNRhandler := nrslog.WrapHandler(NewRelicAgent, handler)\n\
         \tlog := slog.New(NRhandler)\n"
    ));
    assert!(main.contains("\t\"github.com/newrelic/go-agent/v3/integrations/logcontext-v2/nrslog\"\n"));
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
}

#[test]
fn test_agent_bootstrapped_at_top_of_main() {
    let ws = Workspace::new(&[("main.go", SLOG_MAIN)]);
    let (program, _) = instrument(ws.path());
    let main = text(&program, "main.go");

    assert!(main.contains(
        "func main() {\n\
         \tNewRelicAgent, agentInitError := newrelic.NewApplication(newrelic.ConfigFromEnvironment())\n\
         \tif agentInitError != nil {\n\
         \t\tpanic(agentInitError)\n\
         \t}\n\
         \tdefer NewRelicAgent.Shutdown(5 * time.Second)\n\
         \topts := &slog.HandlerOptions{}\n"
    ));
    assert!(main.contains("\t\"github.com/newrelic/go-agent/v3/newrelic\"\n"));
    assert!(main.contains("\t\"time\"\n"));
}

#[test]
fn test_bootstrap_uses_app_name() {
    let ws = Workspace::new(&[("main.go", SLOG_MAIN)]);
    let config = EngineConfig {
        app_name: Some("orders".to_string()),
        ..Default::default()
    };
    let (program, _) = instrument_with(ws.path(), config);
    let main = text(&program, "main.go");

    assert!(main.contains(
        "newrelic.NewApplication(newrelic.ConfigFromEnvironment(), newrelic.ConfigAppName(\"orders\"))"
    ));
}

#[test]
fn test_bootstrap_can_be_disabled() {
    let ws = Workspace::new(&[("main.go", SLOG_MAIN)]);
    let config = EngineConfig {
        agent_bootstrap: false,
        ..Default::default()
    };
    let (program, _) = instrument_with(ws.path(), config);
    let main = text(&program, "main.go");

    assert!(main.contains("NRhandler := nrslog.WrapHandler(NewRelicAgent, handler)"));
    assert!(!main.contains("NewApplication"));
    assert!(!main.contains("\t\"time\"\n"));
}

#[test]
fn test_two_handlers_tracked_independently() {
    let ws = Workspace::new(&[(
        "main.go",
        r#"package main

import (
	"log/slog"
	"os"
)

func main() {
	text := slog.NewTextHandler(os.Stdout, nil)
	json := slog.NewJSONHandler(os.Stderr, nil)
	a := slog.New(text)
	b := slog.New(json)
	a.Info("a")
	b.Info("b")
}
"#,
    )]);
    let (program, _) = instrument(ws.path());
    let main = text(&program, "main.go");

    assert!(main.contains(
        "\ttext := slog.NewTextHandler(os.Stdout, nil)\n\tNRtext := nrslog.WrapHandler(NewRelicAgent, text)\n"
    ));
    assert!(main.contains(
        "\tjson := slog.NewJSONHandler(os.Stderr, nil)\n\tNRjson := nrslog.WrapHandler(NewRelicAgent, json)\n"
    ));
    assert!(main.contains("\ta := slog.New(NRtext)\n"));
    assert!(main.contains("\tb := slog.New(NRjson)\n"));
}

#[test]
fn test_reassignment_ends_tracking() {
    let ws = Workspace::new(&[(
        "main.go",
        r#"package main

import (
	"log/slog"
	"os"
)

func main() {
	handler := slog.NewTextHandler(os.Stdout, nil)
	first := slog.New(handler)
	handler = slog.NewTextHandler(os.Stderr, nil)
	second := slog.New(handler)
	first.Info("one")
	second.Info("two")
}
"#,
    )]);
    let (program, _) = instrument(ws.path());
    let main = text(&program, "main.go");

    assert!(main.contains("\tfirst := slog.New(NRhandler)\n"));
    assert!(main.contains(
        "\thandler = slog.NewTextHandler(os.Stderr, nil)\n\tNRhandler1 := nrslog.WrapHandler(NewRelicAgent, handler)\n"
    ));
    assert!(main.contains("\tsecond := slog.New(NRhandler1)\n"));
}

#[test]
fn test_synthesized_name_avoids_existing_identifier() {
    let ws = Workspace::new(&[(
        "main.go",
        r#"package main

import (
	"log/slog"
	"os"
)

func main() {
	NRhandler := "taken"
	handler := slog.NewTextHandler(os.Stdout, nil)
	log := slog.New(handler)
	log.Info(NRhandler)
}
"#,
    )]);
    let (program, _) = instrument(ws.path());
    let main = text(&program, "main.go");

    assert!(main.contains("\tNRhandler1 := nrslog.WrapHandler(NewRelicAgent, handler)\n"));
    assert!(main.contains("\tlog := slog.New(NRhandler1)\n"));
    assert!(main.contains("\tlog.Info(NRhandler)\n"));
}

#[test]
fn test_unmodeled_reference_is_reported_and_left_alone() {
    let ws = Workspace::new(&[(
        "main.go",
        r#"package main

import (
	"log/slog"
	"os"
)

func main() {
	handler := slog.NewTextHandler(os.Stdout, nil)
	if handler == nil {
		return
	}
	log := slog.New(handler)
	log.Info("ok")
}
"#,
    )]);
    let (program, diagnostics) = instrument(ws.path());
    let main = text(&program, "main.go");

    assert!(main.contains("\tif handler == nil {\n"));
    assert!(main.contains("\tlog := slog.New(NRhandler)\n"));
    assert_eq!(
        diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::InjectionAmbiguity)
            .count(),
        1
    );
}

#[test]
fn test_handle_propagates_from_main_to_matched_call() {
    let ws = Workspace::new(&[("main.go", CLIENT_MAIN)]);
    let (program, _) = instrument(ws.path());
    let main = text(&program, "main.go");

    assert!(main.contains(
        "\tdefer NewRelicAgent.Shutdown(5 * time.Second)\n\
         \tnrTxn := NewRelicAgent.StartTransaction(\"main\")\n\
         \tdefer nrTxn.End()\n\
         \tbody := load(\"http://example.com\", nrTxn)\n"
    ));
    assert!(main.contains(
        "func load(url string, nrTxn *newrelic.Transaction) string {\n\treturn fetch(url, nrTxn)\n}"
    ));
    assert!(main.contains(
        "func fetch(url string, nrTxn *newrelic.Transaction) string {\n\
         \tnrSegment := nrTxn.StartSegment(\"http.Get\")\n\
         \tresp, err := http.Get(url)\n\
         \tnrSegment.End()\n"
    ));
    assert_eq!(main.matches("nrTxn *newrelic.Transaction").count(), 2);
}

#[test]
fn test_test_call_sites_receive_nil_handle() {
    let ws = Workspace::new(&[("main.go", CLIENT_MAIN), ("main_test.go", CLIENT_TEST)]);
    let (program, _) = instrument(ws.path());
    let test = text(&program, "main_test.go");

    assert!(test.contains("\tif load(\"http://127.0.0.1:1\", nil) != \"\" {\n"));
    // No instrumentation and no new imports in test code.
    assert!(!test.contains("newrelic"));
}

#[test]
fn test_goroutines_receive_their_own_transaction() {
    let ws = Workspace::new(&[(
        "main.go",
        r#"package main

import "net/http"

func main() {
	done := make(chan bool)
	go func() {
		ping("http://example.com")
		done <- true
	}()
	go ping("http://example.org")
	<-done
}

func ping(url string) {
	http.Get(url)
}
"#,
    )]);
    let (program, _) = instrument(ws.path());
    let main = text(&program, "main.go");

    assert!(main.contains(
        "\tgo func(nrTxn *newrelic.Transaction) {\n\
         \t\tping(\"http://example.com\", nrTxn)\n\
         \t\tdone <- true\n\
         \t}(nrTxn.NewGoroutine())\n"
    ));
    assert!(main.contains("\tgo ping(\"http://example.org\", nrTxn.NewGoroutine())\n"));
    assert!(main.contains("func ping(url string, nrTxn *newrelic.Transaction) {"));
}

#[test]
fn test_http_handler_creates_transaction_from_request() {
    let ws = Workspace::new(&[(
        "main.go",
        r#"package main

import "net/http"

func main() {
	http.HandleFunc("/", index)
	http.ListenAndServe(":8080", nil)
}

func index(w http.ResponseWriter, r *http.Request) {
	fetch()
	w.WriteHeader(http.StatusOK)
}

func fetch() {
	http.Get("http://example.com")
}
"#,
    )]);
    let (program, _) = instrument(ws.path());
    let main = text(&program, "main.go");

    assert!(main.contains("\thttp.HandleFunc(newrelic.WrapHandleFunc(NewRelicAgent, \"/\", index))\n"));
    assert!(main.contains(
        "func index(w http.ResponseWriter, r *http.Request) {\n\
         \tnrTxn := newrelic.FromContext(r.Context())\n\
         \tfetch(nrTxn)\n"
    ));
    assert!(main.contains("func fetch(nrTxn *newrelic.Transaction) {"));
    assert!(main.contains("NewRelicAgent, agentInitError := newrelic.NewApplication("));
}

#[test]
fn test_function_used_as_value_is_a_barrier() {
    let ws = Workspace::new(&[(
        "main.go",
        r#"package main

import "net/http"

func main() {
	run(fetch)
	fetch("http://example.org")
}

func run(f func(string)) {
	f("http://example.com")
}

func fetch(url string) {
	http.Get(url)
}
"#,
    )]);
    let (program, diagnostics) = instrument(ws.path());

    assert!(!is_dirty(&program, "main.go"));
    assert!(diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::PropagationBarrier));
}

#[test]
fn test_unreachable_function_is_not_modified() {
    let ws = Workspace::new(&[(
        "main.go",
        r#"package main

import "net/http"

func main() {
}

func unused() {
	http.Get("http://example.com")
}
"#,
    )]);
    let (program, diagnostics) = instrument(ws.path());

    assert!(!is_dirty(&program, "main.go"));
    assert_eq!(
        diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::UnreachableMatch)
            .count(),
        1
    );
}

#[test]
fn test_unmatched_file_is_left_out() {
    let ws = Workspace::new(&[
        ("main.go", SLOG_MAIN),
        (
            "util.go",
            "package main\n\nimport \"strings\"\n\nfunc upper(s string) string {\n\treturn strings.ToUpper(s)\n}\n",
        ),
    ]);
    let (program, _) = instrument(ws.path());

    assert!(is_dirty(&program, "main.go"));
    assert!(!is_dirty(&program, "util.go"));
}

#[test]
fn test_second_run_is_a_no_op() {
    let ws = Workspace::new(&[
        ("main.go", CLIENT_MAIN),
        ("main_test.go", CLIENT_TEST),
        ("log.go", &SLOG_MAIN.replace("func main()", "func setupLogging()")),
    ]);
    let (program, _) = instrument(ws.path());
    assert!(!program.dirty_files().is_empty());
    write_back(ws.path(), &program);

    let (again, _) = instrument(ws.path());
    let dirty: Vec<&str> = again
        .dirty_files()
        .into_iter()
        .map(|id| again.file(id).path.as_str())
        .collect();
    assert!(dirty.is_empty(), "changed on second run: {:?}", dirty);
}

#[test]
fn test_slog_outside_main_is_ignored() {
    let ws = Workspace::new(&[(
        "logging.go",
        &SLOG_MAIN
            .replace("package main", "package logging")
            .replace("func main()", "func Setup()"),
    )]);
    let (program, _) = instrument(ws.path());
    assert!(!is_dirty(&program, "logging.go"));
}

#[test]
fn test_pipeline_writes_patch_with_git_headers() {
    let ws = Workspace::new(&[("main.go", CLIENT_MAIN), ("main_test.go", CLIENT_TEST)]);
    let report = Pipeline::new(ws.path(), InstrumentConfig::default())
        .run(&|_| {})
        .unwrap();

    let patch = std::fs::read_to_string(&report.output_path).unwrap();
    assert!(patch.contains("--- a/main.go\n+++ b/main.go\n"));
    assert!(patch.contains("--- a/main_test.go\n+++ b/main_test.go\n"));
    assert!(patch.find("a/main.go").unwrap() < patch.find("a/main_test.go").unwrap());
    assert!(patch.contains("+\tnrTxn := NewRelicAgent.StartTransaction(\"main\")\n"));
    assert_eq!(report.files_changed, 2);
    assert_eq!(report.functions_rewritten, 2);
    assert!(report.required_modules.contains("github.com/newrelic/go-agent/v3"));

    // Sources on disk are untouched.
    let on_disk = std::fs::read_to_string(ws.path().join("main.go")).unwrap();
    assert_eq!(on_disk, CLIENT_MAIN);
}

#[test]
fn test_pipeline_output_is_deterministic() {
    let files = [("main.go", CLIENT_MAIN), ("main_test.go", CLIENT_TEST)];
    let first = Workspace::new(&files);
    let second = Workspace::new(&files);

    let a = Pipeline::new(first.path(), InstrumentConfig::default())
        .run(&|_| {})
        .unwrap();
    let b = Pipeline::new(second.path(), InstrumentConfig::default())
        .run(&|_| {})
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(a.output_path).unwrap(),
        std::fs::read_to_string(b.output_path).unwrap()
    );
}

#[test]
fn test_invalid_output_path_rejected_before_loading() {
    let ws = Workspace::new(&[("main.go", "package main\n\nfunc main( {\n")]);
    let config = InstrumentConfig {
        diff_file_name: "/nonexistent/dir/out.txt".to_string(),
        ..Default::default()
    };
    let result = Pipeline::new(ws.path(), config).run(&|_| {});

    assert!(matches!(result, Err(InstrumentError::OutputPathInvalid { .. })));
    assert!(!Path::new("/nonexistent/dir/out.txt").exists());
}

#[test]
fn test_syntax_error_is_a_load_failure() {
    let ws = Workspace::new(&[("main.go", "package main\n\nfunc main( {\n")]);
    let result = Pipeline::new(ws.path(), InstrumentConfig::default()).run(&|_| {});

    assert!(matches!(result, Err(InstrumentError::LoadFailure(_))));
    assert!(!ws.path().join("new-relic-instrumentation.diff").exists());
}

#[test]
fn test_init_passes_nil_to_rewritten_function() {
    let ws = Workspace::new(&[(
        "main.go",
        r#"package main

import "net/http"

func init() {
	fetch("http://example.com/a")
}

func main() {
	fetch("http://example.com/b")
}

func fetch(url string) {
	http.Get(url)
}
"#,
    )]);
    let (program, _) = instrument(ws.path());
    let main = text(&program, "main.go");

    assert!(main.contains("func init() {\n\tfetch(\"http://example.com/a\", nil)\n}"));
    assert!(main.contains("\tfetch(\"http://example.com/b\", nrTxn)\n"));
    assert!(main.contains("func fetch(url string, nrTxn *newrelic.Transaction) {"));
}

#[test]
fn test_package_level_initializer_passes_nil() {
    let ws = Workspace::new(&[(
        "main.go",
        r#"package main

import (
	"fmt"
	"net/http"
)

var status = fetch("http://example.com/a")

func main() {
	fmt.Println(status, fetch("http://example.com/b"))
}

func fetch(url string) string {
	resp, err := http.Get(url)
	if err != nil {
		return ""
	}
	return resp.Status
}
"#,
    )]);
    let (program, _) = instrument(ws.path());
    let main = text(&program, "main.go");

    assert!(main.contains("var status = fetch(\"http://example.com/a\", nil)\n"));
    assert!(main.contains("\tfmt.Println(status, fetch(\"http://example.com/b\", nrTxn))\n"));
    assert!(main.contains("func fetch(url string, nrTxn *newrelic.Transaction) string {"));
}

#[test]
fn test_method_called_through_local_variable_gains_handle() {
    let ws = Workspace::new(&[(
        "main.go",
        r#"package main

import "net/http"

type Server struct{}

func (s *Server) handle(w http.ResponseWriter, r *http.Request) {
	s.fetch()
}

func (s *Server) fetch() {
	http.Get("http://example.com")
}

func main() {
	srv := &Server{}
	srv.fetch()
	http.HandleFunc("/", srv.handle)
}
"#,
    )]);
    let (program, _) = instrument(ws.path());
    let main = text(&program, "main.go");

    assert!(main.contains("func (s *Server) fetch(nrTxn *newrelic.Transaction) {"));
    assert!(main.contains(
        "\tnrTxn := newrelic.FromContext(r.Context())\n\
         \ts.fetch(nrTxn)\n"
    ));
    assert!(main.contains("\tsrv := &Server{}\n\tsrv.fetch(nrTxn)\n"));
    assert!(!main.contains("srv.fetch()"));
}

#[test]
fn test_local_closure_shadows_package_function() {
    let ws = Workspace::new(&[(
        "main.go",
        r#"package main

import "net/http"

func main() {
	helper()
	fetch("http://example.com")
}

func helper() {
	fetch := func(s string) string { return s }
	fetch("c")
}

func fetch(url string) string {
	http.Get(url)
	return url
}
"#,
    )]);
    let (program, _) = instrument(ws.path());
    let main = text(&program, "main.go");

    assert!(main.contains(
        "func helper() {\n\tfetch := func(s string) string { return s }\n\tfetch(\"c\")\n}"
    ));
    assert!(main.contains("\thelper()\n\tfetch(\"http://example.com\", nrTxn)\n"));
    assert!(main.contains("func fetch(url string, nrTxn *newrelic.Transaction) string {"));
}

/// Appends text after every `fmt.Println` statement.
struct PrintlnSuffix {
    text: &'static str,
    name_base: Option<&'static str>,
}

impl Integration for PrintlnSuffix {
    fn name(&self) -> &'static str {
        "println-suffix"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &["fmt"]
    }

    fn matches(&self, stmt: &StatementView<'_, '_>) -> bool {
        stmt.node.kind() == "expression_statement"
            && matches!(stmt.package_call("fmt"), Some((_, "Println")))
    }

    fn is_instrumented(&self, _stmt: &StatementView<'_, '_>) -> bool {
        false
    }

    fn generate(&self, _stmt: &StatementView<'_, '_>, ctx: &mut GenerateContext<'_>) -> Result<Injection> {
        let text = match self.name_base {
            Some(base) => format!("{}{}", self.text, ctx.namer.fresh(base)?),
            None => self.text.to_string(),
        };
        Ok(Injection::default().with_edit(Placement::After, text))
    }
}

fn run_with(root: &Path, integration: PrintlnSuffix) -> Result<go_instrument::RunReport> {
    Pipeline::new(root, InstrumentConfig::default())
        .with_catalog(Catalog::new(vec![Box::new(integration)]))
        .run(&|_| {})
}

#[test]
fn test_unparseable_rewrite_aborts_without_patch() {
    let ws = Workspace::new(&[
        ("main.go", "package main\n\nfunc main() {\n\treport()\n}\n"),
        (
            "report.go",
            "package main\n\nimport \"fmt\"\n\nfunc report() {\n\tfmt.Println(\"done\")\n}\n",
        ),
    ]);
    let result = run_with(
        ws.path(),
        PrintlnSuffix {
            text: "fmt.Println((",
            name_base: None,
        },
    );

    match result {
        Err(InstrumentError::SerializationFailure { path, .. }) => assert_eq!(path, "report.go"),
        other => panic!("expected a serialization failure, got {:?}", other),
    }
    assert!(!ws.path().join("new-relic-instrumentation.diff").exists());
}

#[test]
fn test_name_exhaustion_skips_only_that_file() {
    let taken: Vec<String> = std::iter::once("taken".to_string())
        .chain((1..=100).map(|i| format!("taken{}", i)))
        .collect();
    let crowded = format!(
        "package main\n\nimport \"fmt\"\n\nvar {} int\n\nfunc crowded() {{\n\tfmt.Println(\"a\")\n}}\n",
        taken.join(", ")
    );
    let ws = Workspace::new(&[
        ("crowded.go", crowded.as_str()),
        (
            "main.go",
            "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"b\")\n}\n",
        ),
    ]);
    let report = run_with(
        ws.path(),
        PrintlnSuffix {
            text: "_ = ",
            name_base: Some("taken"),
        },
    )
    .unwrap();

    let patch = std::fs::read_to_string(&report.output_path).unwrap();
    assert!(patch.contains("+++ b/main.go\n"));
    assert!(patch.contains("+\t_ = taken\n"));
    assert!(!patch.contains("crowded.go"));
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::IdentifierCollision
            && d.file.as_deref() == Some("crowded.go")));
}
