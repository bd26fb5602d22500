//! Core data types for the import pipeline.
//!
//! Copyright (c) 2025 Posit, PBC

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use sass_importer_runtime::SystemRuntime;
use serde::Serialize;

use crate::error::ImportError;
use crate::stylesheet::StyleSheet;

/// A source file and its text, as handed to the importer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAsset {
    pub path: PathBuf,
    pub content: String,
}

/// UTF-8 byte-order mark, as written by some Windows editors.
const BOM: char = '\u{FEFF}';

impl SourceAsset {
    /// A leading byte-order mark is dropped from `content`.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let mut content = content.into();
        if content.starts_with(BOM) {
            content.replace_range(..BOM.len_utf8(), "");
        }
        Self {
            path: path.into(),
            content,
        }
    }

    /// Read the asset at `path` through the runtime.
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than rejected, so
    /// legacy-encoded sources still reach the text fallback.
    pub fn load(runtime: &dyn SystemRuntime, path: &Path) -> Result<Self, ImportError> {
        let bytes = runtime
            .file_read(path)
            .map_err(|source| ImportError::ReadSource {
                path: path.to_path_buf(),
                source,
            })?;
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), "source is not valid UTF-8; decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Ok(Self::new(path, content))
    }

    /// Directory that import directives resolve against.
    ///
    /// A bare file name lives in the current directory, returned as an empty path.
    pub fn directory(&self) -> Option<&Path> {
        self.path.parent()
    }
}

/// A raw import target taken from one source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDirective {
    /// The quoted file name, exactly as written (may be empty)
    pub name: String,
    /// 1-based line number of the directive
    pub line: usize,
}

/// The deduplicated, resolved dependency set of one source file.
///
/// Every path existed on disk when the set was computed. Iteration order is
/// sorted so repeated resolutions compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImportSet {
    paths: BTreeSet<PathBuf>,
}

impl ImportSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resolved path. Returns `false` if it was already present.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        self.paths.insert(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Opaque raw-text artifact produced when compilation does not happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextAsset {
    pub text: String,
}

impl TextAsset {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// An object attached to an import result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportedAsset {
    StructuredStylesheet(StyleSheet),
    RawText(TextAsset),
}

impl ImportedAsset {
    pub fn as_stylesheet(&self) -> Option<&StyleSheet> {
        match self {
            ImportedAsset::StructuredStylesheet(sheet) => Some(sheet),
            ImportedAsset::RawText(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextAsset> {
        match self {
            ImportedAsset::RawText(text) => Some(text),
            ImportedAsset::StructuredStylesheet(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ImportedAsset::StructuredStylesheet(_) => "structured_stylesheet",
            ImportedAsset::RawText(_) => "raw_text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A diagnostic reported to the host alongside an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}
