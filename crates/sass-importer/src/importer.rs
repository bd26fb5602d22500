/*
 * importer.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Per-file import pipeline.
 */

//! The import state machine.
//!
//! ```text
//! Start ──▶ ResolvingImports ──ok──▶ CheckingPartial ──▶ Compiling ──▶ Adapting ──▶ Done
//!                  │                        │ partial                                ▲
//!                  └──unresolved──▶ Fallback ◀┘                                       │
//!                                      └──────────────────────────────────────────────┘
//! ```
//!
//! Each source file is imported exactly once with no retries. An unresolved
//! import or a partial file name redirects to the text fallback; dependencies
//! are declared only when resolution succeeded. A failure while adapting
//! compiled CSS does *not* redirect to the fallback: under the default policy
//! it is logged and the (possibly hollow) stylesheet is still the result.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use sass_importer_runtime::SystemRuntime;

use crate::compiler::SassCompiler;
use crate::config::{AdapterFailurePolicy, CompilerFailurePolicy, ImporterConfig};
use crate::context::AssetImportContext;
use crate::error::{CompilerError, ImportError, Result, UnresolvedImport};
use crate::fallback::import_as_text;
use crate::resolve::ImportResolver;
use crate::stylesheet::{
    AdapterOutcome, Builtin, StyleSheet, StyleSheetImporterProvider, StylesheetAdapter,
};
use crate::types::{Diagnostic, ImportSet, ImportedAsset, SourceAsset};

/// Import-format version. Hosts re-import cached results when it changes.
pub const IMPORTER_VERSION: u32 = 1;

/// Identifier of the structured stylesheet object.
pub const STYLESHEET_OBJECT: &str = "stylesheet";

/// Prefix and suffix of the scoped compiler-output file.
const TEMP_PREFIX: &str = "sass-importer-";
const TEMP_SUFFIX: &str = ".css";

static BUILTIN_PROVIDER: Builtin = Builtin::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportState {
    Start,
    ResolvingImports,
    CheckingPartial,
    Compiling,
    Adapting,
    Fallback,
    Done,
}

/// Why an import ended up as raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    UnresolvedImport { name: String },
    Partial,
}

/// Which branch produced the main object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "branch", rename_all = "snake_case")]
pub enum ImportOutcome {
    Structured {
        adapter: AdapterOutcome,
        /// Set when a compiler failure was tolerated.
        #[serde(skip_serializing_if = "Option::is_none")]
        compiler_failure: Option<String>,
    },
    Fallback(FallbackReason),
}

/// Summary of one import, returned alongside the host callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub outcome: ImportOutcome,
    /// Every state visited, `Start` through `Done`.
    pub states: Vec<ImportState>,
    pub dependencies: ImportSet,
}

impl ImportReport {
    pub fn is_fallback(&self) -> bool {
        matches!(self.outcome, ImportOutcome::Fallback(_))
    }
}

/// The SCSS/SASS importer.
///
/// Holds no per-import state, so one instance can serve concurrent imports
/// of independent files.
pub struct SassImporter<'a> {
    runtime: &'a dyn SystemRuntime,
    provider: &'a dyn StyleSheetImporterProvider,
    config: ImporterConfig,
}

impl<'a> SassImporter<'a> {
    /// Create an importer using the bundled stylesheet capability.
    pub fn new(runtime: &'a dyn SystemRuntime, config: ImporterConfig) -> Self {
        Self {
            runtime,
            provider: &BUILTIN_PROVIDER,
            config,
        }
    }

    /// Use a host-supplied stylesheet capability instead of the bundled one.
    pub fn with_provider(mut self, provider: &'a dyn StyleSheetImporterProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    /// Whether this importer handles `path` at all.
    pub fn handles(&self, path: &Path) -> bool {
        self.config.handles(path)
    }

    /// Resolve the import graph of one source without importing it.
    pub fn resolve(&self, source: &SourceAsset) -> std::result::Result<ImportSet, UnresolvedImport> {
        ImportResolver::new(self.runtime, &self.config).resolve(source)
    }

    /// Import the asset named by `ctx`, reporting results through `ctx`.
    ///
    /// On `Ok`, exactly one main object has been set. On `Err` (only under
    /// the escalating policies, or when the source cannot be read) no main
    /// object is set. The compiler-output file is gone in both cases.
    pub fn import_asset(&self, ctx: &mut dyn AssetImportContext) -> Result<ImportReport> {
        let asset_path = ctx.asset_path().to_path_buf();
        if asset_path.parent().is_none() {
            return Err(ImportError::NoParentDirectory(asset_path));
        }
        let source = SourceAsset::load(self.runtime, &asset_path)?;

        let mut states = Vec::new();
        let mut dependencies = ImportSet::new();
        let mut stage = Stage::Start;

        let outcome = loop {
            states.push(stage.state());
            stage = match stage {
                Stage::Start => Stage::ResolvingImports,

                Stage::ResolvingImports => match self.resolve(&source) {
                    Ok(imports) => {
                        for path in imports.iter() {
                            ctx.depends_on_source_asset(path);
                        }
                        dependencies = imports;
                        Stage::CheckingPartial
                    }
                    Err(unresolved) => {
                        info!(
                            asset = %asset_path.display(),
                            import = %unresolved.name,
                            "unresolved import; importing as text"
                        );
                        Stage::Fallback(FallbackReason::UnresolvedImport {
                            name: unresolved.name,
                        })
                    }
                },

                Stage::CheckingPartial => {
                    if self.config.is_partial(&asset_path) {
                        debug!(asset = %asset_path.display(), "partial file; importing as text");
                        Stage::Fallback(FallbackReason::Partial)
                    } else {
                        Stage::Compiling
                    }
                }

                Stage::Compiling => Stage::Adapting(self.compile(ctx, &source)?),

                Stage::Adapting(Compiled { css, failure }) => {
                    let adapter = self.adapt(ctx, &css)?;
                    break ImportOutcome::Structured {
                        adapter,
                        compiler_failure: failure,
                    };
                }

                Stage::Fallback(reason) => {
                    import_as_text(ctx, &source);
                    break ImportOutcome::Fallback(reason);
                }
            };
        };
        states.push(ImportState::Done);

        Ok(ImportReport {
            outcome,
            states,
            dependencies,
        })
    }

    /// Run the compiler into a scoped temp file and apply the failure policy.
    fn compile(&self, ctx: &mut dyn AssetImportContext, source: &SourceAsset) -> Result<Compiled> {
        let output = self.runtime.temp_file(TEMP_PREFIX, TEMP_SUFFIX)?;

        let result = match SassCompiler::new(self.runtime, &self.config)
            .compile(&source.path, output.path())
        {
            Ok(out) => match out.exit_error() {
                None => Ok(out.css),
                Some(err) => Err(PartialFailure { err, css: out.css }),
            },
            Err(err) => Err(PartialFailure::from(err)),
        };

        let compiled = match result {
            Ok(css) => Compiled { css, failure: None },
            Err(failure) => {
                let PartialFailure { err, css } = failure;
                match self.config.on_compiler_failure {
                    CompilerFailurePolicy::Fail => {
                        error!(asset = %source.path.display(), error = %err, "SASS compilation failed");
                        return Err(err.into());
                    }
                    CompilerFailurePolicy::Tolerate => {
                        warn!(asset = %source.path.display(), error = %err, "SASS compilation failed; continuing with partial output");
                        ctx.log_diagnostic(Diagnostic::warning(err.to_string()));
                        Compiled {
                            css,
                            failure: Some(err.to_string()),
                        }
                    }
                }
            }
        };

        if let Err(e) = output.close() {
            warn!(error = %e, "failed to remove compiler output file");
        }
        Ok(compiled)
    }

    /// Populate and register the structured stylesheet, applying the adapter policy.
    fn adapt(&self, ctx: &mut dyn AssetImportContext, css: &str) -> Result<AdapterOutcome> {
        let mut sheet = StyleSheet::new();
        let outcome = match StylesheetAdapter::new(self.provider).populate(&mut sheet, css) {
            Ok(outcome) => outcome,
            Err(err) => match self.config.on_adapter_failure {
                AdapterFailurePolicy::Log => {
                    error!(asset = %ctx.asset_path().display(), error = %err, "stylesheet conversion failed");
                    ctx.log_diagnostic(Diagnostic::error(err.to_string()));
                    AdapterOutcome::Failed
                }
                AdapterFailurePolicy::Escalate => return Err(err.into()),
            },
        };

        ctx.add_object_to_asset(STYLESHEET_OBJECT, ImportedAsset::StructuredStylesheet(sheet));
        ctx.set_main_object(STYLESHEET_OBJECT);
        Ok(outcome)
    }
}

/// Loop position, carrying what the next state needs.
enum Stage {
    Start,
    ResolvingImports,
    CheckingPartial,
    Compiling,
    Adapting(Compiled),
    Fallback(FallbackReason),
}

impl Stage {
    fn state(&self) -> ImportState {
        match self {
            Stage::Start => ImportState::Start,
            Stage::ResolvingImports => ImportState::ResolvingImports,
            Stage::CheckingPartial => ImportState::CheckingPartial,
            Stage::Compiling => ImportState::Compiling,
            Stage::Adapting(_) => ImportState::Adapting,
            Stage::Fallback(_) => ImportState::Fallback,
        }
    }
}

/// Compiled text carried from `Compiling` to `Adapting`.
#[derive(Debug)]
struct Compiled {
    css: String,
    failure: Option<String>,
}

/// A compiler failure together with whatever output was written.
struct PartialFailure {
    err: CompilerError,
    css: String,
}

impl From<CompilerError> for PartialFailure {
    fn from(err: CompilerError) -> Self {
        Self {
            err,
            css: String::new(),
        }
    }
}
