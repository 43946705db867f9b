use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::errors::{Error, Result};

/// A file attachment for one form-data file param: the declared field key
/// plus a local path. All filesystem access (readability probing, base-name
/// lookup, byte content) goes through this type, and every handle it opens
/// is dropped before the method returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileField {
    key: String,
    path: PathBuf,
}

impl FileField {
    pub fn new(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the entry carries no path at all. Mirrors the wire behavior
    /// of an empty form value: treated as absent by the validator.
    pub fn is_empty(&self) -> bool {
        self.path.as_os_str().is_empty()
    }

    /// Probe whether the file can currently be opened for reading.
    pub fn is_readable(&self) -> bool {
        fs::File::open(&self.path).is_ok()
    }

    /// Base name sent as the multipart filename.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string())
    }

    /// Path rendered for error messages.
    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    /// Full byte content, read in one scoped open.
    pub fn read(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(|source| Error::File {
            path: self.display_path(),
            source,
        })
    }
}

/// Ordered set of file attachments keyed by param name. Later inserts for
/// the same key replace the earlier entry, matching map semantics on the
/// caller side, while iteration keeps first-insertion order for
/// deterministic multipart bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet(Vec<FileField>);

impl FileSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, path: impl Into<PathBuf>) {
        self.push(FileField::new(key, path));
    }

    pub fn push(&mut self, field: FileField) {
        if let Some(existing) = self.0.iter_mut().find(|f| f.key == field.key) {
            *existing = field;
        } else {
            self.0.push(field);
        }
    }

    /// Builder-style insert for test and call-site ergonomics.
    pub fn with(mut self, key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.insert(key, path);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FileField> {
        self.0.iter().find(|f| f.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileField> {
        self.0.iter()
    }
}
