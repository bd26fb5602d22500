//! Error types for the import pipeline.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::PathBuf;
use std::time::Duration;

use sass_importer_runtime::RuntimeError;
use thiserror::Error;

/// An import directive names a file that matches none of the search candidates.
///
/// This fails resolution for the whole source file, not just the one import.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Could not resolve import '{name}'")]
pub struct UnresolvedImport {
    pub name: String,
}

/// Failures while running the external compiler.
#[derive(Debug, Error)]
pub enum CompilerError {
    /// Neither the environment override nor PATH yields the compiler
    #[error("SASS compiler '{0}' was not found (set the override variable or add it to PATH)")]
    NotFound(String),

    /// The compiler binary exists but could not be started
    #[error("Failed to start SASS compiler: {0}")]
    Spawn(#[source] RuntimeError),

    /// The compiler ran and reported failure
    #[error("SASS compilation failed (exit {code}): {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    /// The compiler exceeded the configured bounded wait
    #[error("SASS compiler did not finish within {0:?}")]
    TimedOut(Duration),

    /// The compiled output file could not be read back
    #[error("Failed to read compiled output: {0}")]
    ReadOutput(#[source] RuntimeError),
}

/// Failures while populating a structured stylesheet from compiled text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// No stylesheet-population capability is bound
    #[error("No stylesheet importer is available")]
    Unavailable,

    /// The compiled CSS could not be turned into rules
    #[error("Invalid CSS at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Failures loading importer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    #[error("Failed to parse importer config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors surfaced by [`crate::SassImporter::import_asset`].
///
/// Unresolved imports never reach the caller through this type during a
/// normal import; they redirect to the text fallback instead.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    UnresolvedImport(#[from] UnresolvedImport),

    #[error("Asset path {} has no parent directory", .0.display())]
    NoParentDirectory(PathBuf),

    #[error("Failed to read source asset {}: {source}", .path.display())]
    ReadSource {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    #[error(transparent)]
    Compiler(#[from] CompilerError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, ImportError>;
