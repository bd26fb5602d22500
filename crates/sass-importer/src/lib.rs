//! SCSS/SASS asset import pipeline.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! This crate provides:
//! - Import graph resolution with SASS partial-file naming (`resolve`)
//! - External compiler invocation into a scoped temp file (`compiler`)
//! - Conversion of compiled CSS into a structured stylesheet (`stylesheet`, `css`)
//! - A raw-text fallback for partials and unresolvable sources (`fallback`)
//! - The per-file state machine sequencing all of the above (`importer`)

mod compiler;
mod config;
mod context;
mod css;
mod error;
mod fallback;
mod importer;
mod resolve;
mod stylesheet;
mod types;

pub use compiler::{COMPILER_FLAGS, CompilerOutput, SassCompiler, compiler_args};
pub use config::{
    AdapterFailurePolicy, CONFIG_FILE_NAME, CompilerFailurePolicy, ImporterConfig,
};
pub use context::{AssetImportContext, NamedObject, RecordedImport};
pub use css::{CssRuleImporter, parse_stylesheet};
pub use error::{AdapterError, CompilerError, ConfigError, ImportError, Result, UnresolvedImport};
pub use fallback::{TEXT_OBJECT, import_as_text};
pub use importer::{
    FallbackReason, IMPORTER_VERSION, ImportOutcome, ImportReport, ImportState, STYLESHEET_OBJECT,
    SassImporter,
};
pub use resolve::{ImportResolver, parse_directives};
pub use stylesheet::{
    AdapterOutcome, AtRuleBlock, Builtin, Declaration, Rule, StyleSheet, StyleSheetImporter,
    StyleSheetImporterProvider, StylesheetAdapter, Unavailable,
};
pub use types::{Diagnostic, ImportDirective, ImportSet, ImportedAsset, Severity, SourceAsset, TextAsset};
