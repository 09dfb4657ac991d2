// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory model of the loaded Go program.
//!
//! A [`Program`] owns every [`SourceFile`] and groups them into [`Package`]s.
//! Files and packages are addressed by stable indices so later stages can keep
//! references across edits.

mod imports;

pub use imports::{default_package_name, ImportEntry, ImportTable};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::syntax::SourceFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(pub usize);

/// A Go package: one directory and one `package` clause.
#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    pub import_path: String,
    pub name: String,
    /// Directory relative to the root (`.` for the root itself).
    pub dir: String,
    /// External test package (`package foo_test`).
    pub is_test: bool,
    pub files: Vec<FileId>,
}

/// All loaded packages and files.
#[derive(Debug)]
pub struct Program {
    root: PathBuf,
    module_path: Option<String>,
    packages: Vec<Package>,
    files: Vec<SourceFile>,
    file_package: Vec<PackageId>,
}

impl Program {
    pub fn new(root: PathBuf, module_path: Option<String>) -> Self {
        Self {
            root,
            module_path,
            packages: Vec::new(),
            files: Vec::new(),
            file_package: Vec::new(),
        }
    }

    /// Add a package together with its files. Files are stored in the given order.
    pub fn add_package(
        &mut self,
        import_path: String,
        name: String,
        dir: String,
        is_test: bool,
        files: Vec<SourceFile>,
    ) -> PackageId {
        let id = PackageId(self.packages.len());
        let mut ids = Vec::with_capacity(files.len());
        for file in files {
            ids.push(FileId(self.files.len()));
            self.files.push(file);
            self.file_package.push(id);
        }
        self.packages.push(Package {
            id,
            import_path,
            name,
            dir,
            is_test,
            files: ids,
        });
        id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn module_path(&self) -> Option<&str> {
        self.module_path.as_deref()
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.0]
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0]
    }

    pub fn file_mut(&mut self, id: FileId) -> &mut SourceFile {
        &mut self.files[id.0]
    }

    pub fn file_ids(&self) -> impl Iterator<Item = FileId> {
        (0..self.files.len()).map(FileId)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn package_of(&self, file: FileId) -> &Package {
        &self.packages[self.file_package[file.0].0]
    }

    /// Find a file by its root-relative path.
    pub fn file_by_path(&self, path: &str) -> Option<FileId> {
        self.files.iter().position(|f| f.path == path).map(FileId)
    }

    /// The non-test package with the given import path.
    pub fn package_by_import_path(&self, import_path: &str) -> Option<PackageId> {
        self.packages
            .iter()
            .find(|p| !p.is_test && p.import_path == import_path)
            .map(|p| p.id)
    }

    /// Import table of a file, naming imports after the loaded packages where known.
    pub fn imports(&self, file: FileId) -> ImportTable {
        let source = self.file(file);
        ImportTable::from_file(source, |path| {
            self.package_by_import_path(path)
                .map(|id| self.package(id).name.clone())
        })
    }

    /// Every import path referenced anywhere in the program.
    pub fn all_import_paths(&self) -> BTreeSet<String> {
        self.file_ids()
            .flat_map(|id| self.imports(id).paths().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }

    /// Files that were edited during the run.
    pub fn dirty_files(&self) -> Vec<FileId> {
        self.file_ids().filter(|id| self.file(*id).is_dirty()).collect()
    }
}
