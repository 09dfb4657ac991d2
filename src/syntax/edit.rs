// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Byte-span edits over Go source text.
//!
//! Every rewrite the engine performs compiles down to a [`TextEdit`]: replace the
//! bytes in `start..end` with `text`. Zero-length spans are insertions. Text outside
//! the edited spans is copied through unchanged, which is what keeps unedited regions
//! byte-identical in the final patch.

use tree_sitter::Node;

use super::nodes::{indentation, line_end, line_start, rest_of_line_is_trivia, starts_line};

/// A single byte-span replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl TextEdit {
    /// Insert `text` at `at`.
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            text: text.into(),
        }
    }

    /// Replace `start..end` with `text`.
    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Replace the full text of a node.
    pub fn replace_node(node: Node<'_>, text: impl Into<String>) -> Self {
        Self::replace(node.start_byte(), node.end_byte(), text)
    }

    pub fn is_insertion(&self) -> bool {
        self.start == self.end
    }
}

/// Apply a batch of edits computed against the same snapshot of `source`.
///
/// Insertions at the same offset keep the order in which they appear in `edits`,
/// and an insertion at the start of a replaced span lands before the replacement.
/// Overlapping spans are rejected.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> Result<String, String> {
    let mut ordered: Vec<(usize, &TextEdit)> = edits.iter().enumerate().collect();
    ordered.sort_by_key(|(seq, edit)| (edit.start, !edit.is_insertion(), *seq));

    let added: usize = edits.iter().map(|e| e.text.len()).sum();
    let mut output = String::with_capacity(source.len() + added);
    let mut cursor = 0usize;

    for (_, edit) in ordered {
        if edit.start > edit.end || edit.end > source.len() {
            return Err(format!(
                "edit span {}..{} is outside the source ({} bytes)",
                edit.start,
                edit.end,
                source.len()
            ));
        }
        if !source.is_char_boundary(edit.start) || !source.is_char_boundary(edit.end) {
            return Err(format!("edit span {}..{} splits a character", edit.start, edit.end));
        }
        if edit.start < cursor {
            return Err(format!(
                "edit at {}..{} overlaps a previous edit ending at {}",
                edit.start, edit.end, cursor
            ));
        }
        output.push_str(&source[cursor..edit.start]);
        output.push_str(&edit.text);
        cursor = edit.end;
    }

    output.push_str(&source[cursor..]);
    Ok(output)
}

/// Insert a statement on its own line right after `stmt`.
///
/// A trailing line comment stays attached to `stmt`.
pub fn insert_after_statement(source: &str, stmt: Node<'_>, statement: &str) -> TextEdit {
    let indent = indentation(source, stmt.start_byte());
    let at = if rest_of_line_is_trivia(source, stmt.end_byte()) {
        line_end(source, stmt.end_byte())
    } else {
        stmt.end_byte()
    };
    TextEdit::insert(at, format!("\n{}{}", indent, statement))
}

/// Insert a statement on its own line right before `stmt`.
pub fn insert_before_statement(source: &str, stmt: Node<'_>, statement: &str) -> TextEdit {
    let indent = indentation(source, stmt.start_byte());
    if starts_line(source, stmt.start_byte()) {
        TextEdit::insert(
            line_start(source, stmt.start_byte()),
            format!("{}{}\n", indent, statement),
        )
    } else {
        TextEdit::insert(stmt.start_byte(), format!("{}\n{}", statement, indent))
    }
}

/// Insert statements at the top of a block, before its first statement.
pub fn insert_at_block_start(
    source: &str,
    block: Node<'_>,
    first_statement: Option<Node<'_>>,
    statements: &[String],
) -> TextEdit {
    match first_statement {
        Some(first) => {
            let indent = indentation(source, first.start_byte());
            let mut text = String::new();
            for statement in statements {
                text.push_str(&format!("{}{}\n", indent, statement));
            }
            if starts_line(source, first.start_byte()) {
                TextEdit::insert(line_start(source, first.start_byte()), text)
            } else {
                TextEdit::insert(first.start_byte(), format!("{}{}", text.trim_start(), indent))
            }
        }
        None => {
            let outer = indentation(source, block.start_byte());
            let mut text = String::new();
            for statement in statements {
                text.push_str(&format!("\n{}\t{}", outer, statement));
            }
            let inner_start = block.start_byte() + 1;
            let inner_end = block.end_byte().saturating_sub(1).max(inner_start);
            if source[inner_start..inner_end].trim().is_empty() {
                // `{}` or `{ }`: open the block up.
                text.push('\n');
                text.push_str(outer);
                TextEdit::replace(inner_start, inner_end, text)
            } else {
                TextEdit::insert(inner_start, text)
            }
        }
    }
}
