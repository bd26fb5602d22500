/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Host callbacks for a single asset import.
 */

//! Host-side import context.
//!
//! The importer talks to its host only through [`AssetImportContext`]:
//! declaring content dependencies, attaching named objects, choosing the
//! main object, and reporting diagnostics. [`RecordedImport`] is the
//! in-memory implementation used by the command-line host and by tests.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::types::{Diagnostic, ImportedAsset};

/// Callbacks a host provides to one import invocation.
pub trait AssetImportContext {
    /// Path of the asset being imported.
    fn asset_path(&self) -> &Path;

    /// Declare `path` as a content dependency, so a change to it re-imports this asset.
    fn depends_on_source_asset(&mut self, path: &Path);

    /// Attach a named object to the import result.
    fn add_object_to_asset(&mut self, identifier: &str, object: ImportedAsset);

    /// Designate a previously added object as the primary result.
    fn set_main_object(&mut self, identifier: &str);

    /// Report a diagnostic. Hosts without a diagnostics surface may ignore it.
    fn log_diagnostic(&mut self, diagnostic: Diagnostic) {
        let _ = diagnostic;
    }
}

/// A named object attached to an import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedObject {
    pub identifier: String,
    #[serde(flatten)]
    pub object: ImportedAsset,
}

/// Everything one import reported to its host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedImport {
    pub asset_path: PathBuf,
    /// Dependencies in registration order
    pub dependencies: Vec<PathBuf>,
    pub objects: Vec<NamedObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_object: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl RecordedImport {
    pub fn new(asset_path: impl Into<PathBuf>) -> Self {
        Self {
            asset_path: asset_path.into(),
            dependencies: Vec::new(),
            objects: Vec::new(),
            main_object: None,
            diagnostics: Vec::new(),
        }
    }

    /// Look up an attached object by identifier
    pub fn object(&self, identifier: &str) -> Option<&ImportedAsset> {
        self.objects
            .iter()
            .find(|named| named.identifier == identifier)
            .map(|named| &named.object)
    }

    /// The object designated as main, if any
    pub fn main(&self) -> Option<&ImportedAsset> {
        self.main_object.as_deref().and_then(|id| self.object(id))
    }
}

impl AssetImportContext for RecordedImport {
    fn asset_path(&self) -> &Path {
        &self.asset_path
    }

    fn depends_on_source_asset(&mut self, path: &Path) {
        self.dependencies.push(path.to_path_buf());
    }

    fn add_object_to_asset(&mut self, identifier: &str, object: ImportedAsset) {
        // Re-adding an identifier replaces the earlier object
        self.objects.retain(|named| named.identifier != identifier);
        self.objects.push(NamedObject {
            identifier: identifier.to_string(),
            object,
        });
    }

    fn set_main_object(&mut self, identifier: &str) {
        self.main_object = Some(identifier.to_string());
    }

    fn log_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
