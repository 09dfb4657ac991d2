// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Imports referenced by inserted code.

use std::collections::BTreeMap;

use tracing::debug;
use tree_sitter::Node;

use super::InstrumentationManager;
use crate::error::Result;
use crate::syntax::nodes::{
    line_end, line_start, named_children, node_text, rest_of_line_is_trivia, starts_line,
};
use crate::syntax::TextEdit;

impl InstrumentationManager<'_> {
    /// Add every missing import recorded while editing.
    pub(super) fn add_imports(&mut self) -> Result<()> {
        let pending: Vec<_> = self
            .required_imports
            .iter()
            .map(|(file, paths)| (*file, paths.clone()))
            .collect();

        for (file_id, required) in pending {
            let edits = {
                let file = self.program.file(file_id);
                let existing = self.program.imports(file_id);
                let missing: Vec<&str> = required
                    .iter()
                    .copied()
                    .filter(|path| !existing.has_path(path))
                    .collect();
                if missing.is_empty() {
                    continue;
                }
                debug!(file = %file.path, imports = ?missing, "adding imports");
                import_edit(file.text(), file.root(), &missing)
            };
            if edits.is_empty() {
                continue;
            }
            let result = self
                .program
                .file_mut(file_id)
                .apply(&mut self.parser, &edits);
            match result {
                Ok(()) => {}
                Err(err) if err.is_file_scoped() => self.record_file_error(file_id, &err),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

/// Edits adding `paths` to a file's imports, in gofmt order.
///
/// Paths go into the first parenthesized import block, each one into the group
/// holding imports of its kind (standard library or not) before the first larger
/// path. A lone `import "x"` becomes a sorted block; a file without imports gets a
/// new declaration after its package clause.
pub(super) fn import_edit(source: &str, root: Node<'_>, paths: &[&str]) -> Vec<TextEdit> {
    if paths.is_empty() {
        return Vec::new();
    }
    let mut paths = paths.to_vec();
    paths.sort_unstable();
    paths.dedup();

    let declarations: Vec<Node<'_>> = named_children(root)
        .into_iter()
        .filter(|n| n.kind() == "import_declaration")
        .collect();

    let list = declarations.iter().find_map(|decl| {
        named_children(*decl)
            .into_iter()
            .find(|n| n.kind() == "import_spec_list")
    });
    if let Some(list) = list {
        return block_edits(source, list, &paths);
    }

    if let Some(decl) = declarations.first() {
        let Some(spec) = named_children(*decl)
            .into_iter()
            .find(|n| n.kind() == "import_spec")
        else {
            return Vec::new();
        };
        let existing = spec_path(spec, source);
        let mut lines: Vec<(&str, String)> = paths
            .iter()
            .map(|p| (*p, format!("\t\"{}\"\n", p)))
            .collect();
        lines.push((existing, format!("\t{}\n", node_text(spec, source))));
        lines.sort_by(|a, b| a.0.cmp(b.0));
        let body: String = lines.into_iter().map(|(_, line)| line).collect();
        return vec![TextEdit::replace_node(*decl, format!("import (\n{})", body))];
    }

    let Some(package) = named_children(root)
        .into_iter()
        .find(|n| n.kind() == "package_clause")
    else {
        return Vec::new();
    };
    let declaration = match paths.as_slice() {
        [single] => format!("\n\nimport \"{}\"", single),
        _ => format!("\n\nimport (\n{})", spec_lines(&paths)),
    };
    vec![TextEdit::insert(package.end_byte(), declaration)]
}

/// Insertions into a parenthesized import block.
fn block_edits(source: &str, list: Node<'_>, paths: &[&str]) -> Vec<TextEdit> {
    let close = list.end_byte().saturating_sub(1);
    let specs: Vec<Node<'_>> = named_children(list)
        .into_iter()
        .filter(|n| n.kind() == "import_spec")
        .collect();
    let one_per_line = specs.iter().all(|spec| {
        starts_line(source, spec.start_byte()) && rest_of_line_is_trivia(source, spec.end_byte())
    });
    if specs.is_empty() || !one_per_line {
        let lines = spec_lines(paths);
        return vec![if starts_line(source, close) {
            TextEdit::insert(line_start(source, close), lines)
        } else {
            TextEdit::insert(close, format!("\n{}", lines))
        }];
    }

    let groups = spec_groups(source, &specs);
    let mut anchors: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for path in paths {
        let group = groups
            .iter()
            .find(|group| is_std(spec_path(group[0], source)) == is_std(path))
            .unwrap_or(&groups[groups.len() - 1]);
        let offset = match group.iter().find(|spec| spec_path(**spec, source) > *path) {
            Some(spec) => line_start(source, spec.start_byte()),
            None => {
                let last = group[group.len() - 1];
                (line_end(source, last.end_byte()) + 1).min(source.len())
            }
        };
        anchors.entry(offset).or_default().push(path);
    }
    anchors
        .into_iter()
        .map(|(offset, paths)| TextEdit::insert(offset, spec_lines(&paths)))
        .collect()
}

/// Runs of specs not separated by a blank line.
fn spec_groups<'t>(source: &str, specs: &[Node<'t>]) -> Vec<Vec<Node<'t>>> {
    let mut groups: Vec<Vec<Node<'t>>> = Vec::new();
    for spec in specs {
        let joined = match groups.last().and_then(|g| g.last()) {
            Some(prev) => !source[prev.end_byte()..spec.start_byte()].contains("\n\n"),
            None => false,
        };
        match groups.last_mut() {
            Some(group) if joined => group.push(*spec),
            _ => groups.push(vec![*spec]),
        }
    }
    groups
}

fn spec_path<'a>(spec: Node<'_>, source: &'a str) -> &'a str {
    spec.child_by_field_name("path")
        .map(|p| node_text(p, source).trim_matches(|c| c == '"' || c == '`'))
        .unwrap_or("")
}

/// Standard library paths have no dot in their first element.
fn is_std(path: &str) -> bool {
    !path.split('/').next().unwrap_or(path).contains('.')
}

fn spec_lines(paths: &[&str]) -> String {
    paths.iter().map(|p| format!("\t\"{}\"\n", p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{apply_edits, GoParser};

    fn add(src: &str, paths: &[&str]) -> String {
        let mut parser = GoParser::new().unwrap();
        let tree = parser.parse(src).unwrap();
        let edits = import_edit(src, tree.root_node(), paths);
        assert!(!edits.is_empty());
        let out = apply_edits(src, &edits).unwrap();
        assert!(!parser.parse(&out).unwrap().root_node().has_error(), "{out}");
        out
    }

    #[test]
    fn test_inserts_in_sorted_position() {
        let out = add(
            "package main\n\nimport (\n\t\"fmt\"\n\t\"net/http\"\n)\n\nfunc main() {}\n",
            &["time", "github.com/newrelic/go-agent/v3/newrelic"],
        );
        assert!(out.contains(
            "import (\n\t\"fmt\"\n\t\"github.com/newrelic/go-agent/v3/newrelic\"\n\t\"net/http\"\n\t\"time\"\n)"
        ));
    }

    #[test]
    fn test_respects_import_groups() {
        let out = add(
            "package main\n\nimport (\n\t\"log/slog\"\n\t\"os\"\n\n\t\"github.com/gin-gonic/gin\"\n)\n\nfunc main() {}\n",
            &["context", "github.com/newrelic/go-agent/v3/newrelic"],
        );
        assert!(out.contains(
            "import (\n\t\"context\"\n\t\"log/slog\"\n\t\"os\"\n\n\t\"github.com/gin-gonic/gin\"\n\t\"github.com/newrelic/go-agent/v3/newrelic\"\n)"
        ), "{out}");
    }

    #[test]
    fn test_appends_to_import_block() {
        let out = add(
            "package main\n\nimport (\n\t\"fmt\"\n)\n\nfunc main() {}\n",
            &["github.com/newrelic/go-agent/v3/newrelic", "time"],
        );
        assert!(out.contains(
            "import (\n\t\"fmt\"\n\t\"github.com/newrelic/go-agent/v3/newrelic\"\n\t\"time\"\n)"
        ));
    }

    #[test]
    fn test_converts_single_import() {
        let out = add(
            "package main\n\nimport \"fmt\"\n\nfunc main() {}\n",
            &["time"],
        );
        assert!(out.contains("import (\n\t\"fmt\"\n\t\"time\"\n)"));
    }

    #[test]
    fn test_keeps_alias_when_converting() {
        let out = add(
            "package main\n\nimport f \"fmt\"\n\nfunc main() {}\n",
            &["time"],
        );
        assert!(out.contains("import (\n\tf \"fmt\"\n\t\"time\"\n)"));
    }

    #[test]
    fn test_sorts_converted_single_import() {
        let out = add(
            "package main\n\nimport \"os\"\n\nfunc main() {}\n",
            &["time", "context"],
        );
        assert!(out.contains("import (\n\t\"context\"\n\t\"os\"\n\t\"time\"\n)"));
    }

    #[test]
    fn test_adds_declaration_after_package_clause() {
        let out = add("package main\n\nfunc main() {}\n", &["time"]);
        assert!(out.starts_with("package main\n\nimport \"time\"\n\nfunc main() {}"));

        let out = add("package main\n\nfunc main() {}\n", &["time", "context"]);
        assert!(out.starts_with("package main\n\nimport (\n\t\"context\"\n\t\"time\"\n)\n"));
    }
}
