/*
 * sass-importer-runtime
 * Copyright (c) 2025 Posit, PBC
 *
 * Runtime abstraction layer for the SASS importer.
 *
 * This crate provides a trait-based abstraction for the system operations the
 * import pipeline performs:
 *
 * - file reads and existence checks used by import resolution
 * - scoped temporary files for compiler output
 * - blocking subprocess execution with optional bounded wait
 * - binary discovery (environment override, then PATH)
 */

mod native;
mod traits;

// Re-export core types (API surface)
pub use traits::{
    CommandOutput, PathKind, RuntimeError, RuntimeResult, SystemRuntime, TempFile,
};

// Re-export runtime implementations
pub use native::NativeRuntime;

/// Create a default runtime for the current platform.
pub fn default_runtime() -> NativeRuntime {
    NativeRuntime::new()
}
