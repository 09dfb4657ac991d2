// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Lossless Go source model.
//!
//! Source files are parsed with tree-sitter and edited by byte span, so any text
//! outside an edit (comments, blank lines, alignment) is preserved exactly.

pub mod edit;
pub mod loader;
pub mod nodes;
mod parser;
mod source;

pub use edit::{apply_edits, TextEdit};
pub use loader::{LoadOptions, PackageLoader};
pub use parser::GoParser;
pub use source::SourceFile;
