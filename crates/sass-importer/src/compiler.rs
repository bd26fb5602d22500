//! External SASS compiler invocation.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! The compiler runs as a blocking subprocess:
//!
//! ```text
//! sass --style expanded --no-source-map <input> <output>
//! ```
//!
//! No load-path flags are passed, so every import has to resolve relative to
//! the input file's own directory. The result is returned as data, including
//! the exit code; deciding whether a failed run is fatal is left to the caller.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use sass_importer_runtime::{RuntimeError, SystemRuntime};

use crate::config::ImporterConfig;
use crate::error::CompilerError;

/// Fixed flags placed before the input and output paths.
pub const COMPILER_FLAGS: [&str; 3] = ["--style", "expanded", "--no-source-map"];

/// Everything one compiler run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerOutput {
    pub code: i32,
    /// Drained so the child never blocks on a full pipe; not otherwise used.
    pub stdout: String,
    pub stderr: String,
    /// Contents of the output file after the run, possibly partial or empty.
    pub css: String,
}

impl CompilerOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// The non-zero exit as an error, for callers that treat it as fatal.
    pub fn exit_error(&self) -> Option<CompilerError> {
        (!self.success()).then(|| CompilerError::NonZeroExit {
            code: self.code,
            stderr: self.stderr.trim().to_string(),
        })
    }
}

/// Build the full argument vector for one compile.
pub fn compiler_args<'p>(input: &'p Path, output: &'p Path) -> Vec<&'p OsStr> {
    let mut args: Vec<&OsStr> = COMPILER_FLAGS.iter().map(|flag| OsStr::new(*flag)).collect();
    args.push(input.as_os_str());
    args.push(output.as_os_str());
    args
}

pub struct SassCompiler<'a> {
    runtime: &'a dyn SystemRuntime,
    config: &'a ImporterConfig,
}

impl<'a> SassCompiler<'a> {
    pub fn new(runtime: &'a dyn SystemRuntime, config: &'a ImporterConfig) -> Self {
        Self { runtime, config }
    }

    /// Locate the compiler binary (environment override, then PATH).
    pub fn locate(&self) -> Result<PathBuf, CompilerError> {
        self.runtime
            .find_binary(&self.config.compiler, &self.config.compiler_env)
            .ok_or_else(|| CompilerError::NotFound(self.config.compiler.clone()))
    }

    /// Compile `input` into the caller-owned file at `output` and read it back.
    ///
    /// Blocks until the compiler exits, or until the configured timeout
    /// kills it.
    pub fn compile(&self, input: &Path, output: &Path) -> Result<CompilerOutput, CompilerError> {
        let binary = self.locate()?;
        let args = compiler_args(input, output);

        tracing::debug!(compiler = %binary.display(), input = %input.display(), "running SASS compiler");
        let result = self
            .runtime
            .exec_command(&binary, &args, self.config.timeout())
            .map_err(|e| match e {
                RuntimeError::TimedOut { after, .. } => CompilerError::TimedOut(after),
                other => CompilerError::Spawn(other),
            })?;

        let css = self
            .runtime
            .file_read_string(output)
            .map_err(CompilerError::ReadOutput)?;

        Ok(CompilerOutput {
            code: result.code,
            stdout: result.stdout_string(),
            stderr: result.stderr_string(),
            css,
        })
    }
}
