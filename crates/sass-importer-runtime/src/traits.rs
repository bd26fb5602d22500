/*
 * traits.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Defines the SystemRuntime trait and supporting types for the runtime abstraction layer.
 *
 * The importer never touches the filesystem or spawns processes directly. It goes
 * through this trait so that hosts can substitute their own environment and tests
 * can script the external compiler.
 */

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The command could not be started at all (missing binary, permissions)
    #[error("Failed to start {}: {source}", .command.display())]
    SpawnFailed {
        command: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The command did not exit before the configured deadline and was killed
    #[error("{} did not exit within {after:?}", .command.display())]
    TimedOut { command: PathBuf, after: Duration },
}

/// Type of filesystem path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// Output from a command execution
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (0 = success, -1 when terminated by a signal)
    pub code: i32,
    /// Standard output
    pub stdout: Vec<u8>,
    /// Standard error
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Check if the command succeeded (exit code 0)
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Get stdout as a string (lossy UTF-8 conversion)
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Get stderr as a string (lossy UTF-8 conversion)
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// RAII guard for a temporary file that is removed on drop.
///
/// The guard is released on every exit path of the scope that owns it,
/// including early returns and unwinding.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    /// Whether to delete the file on drop
    cleanup: bool,
}

impl TempFile {
    /// Create a new TempFile guard for an already existing path
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cleanup: true,
        }
    }

    /// Get the path to the temporary file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now and report the outcome.
    ///
    /// A file that is already gone counts as released.
    pub fn close(mut self) -> RuntimeResult<()> {
        self.cleanup = false;
        remove_if_present(&self.path)
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.cleanup {
            if let Err(e) = remove_if_present(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove temporary file");
            }
        }
    }
}

fn remove_if_present(path: &Path) -> RuntimeResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RuntimeError::Io(e)),
    }
}

/// Trait defining the system operations the importer relies on.
///
/// Implementations provide the actual system interaction. `NativeRuntime` is
/// the default; hosts and tests wrap or replace it.
pub trait SystemRuntime: Send + Sync {
    // ═══════════════════════════════════════════════════════════════════════
    // FILE OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════

    /// Read entire file contents as bytes.
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Read file as string with UTF-8 encoding.
    ///
    /// Default implementation reads bytes and converts to string.
    fn file_read_string(&self, path: &Path) -> RuntimeResult<String> {
        let bytes = self.file_read(path)?;
        String::from_utf8(bytes).map_err(|e| {
            RuntimeError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid UTF-8 in file: {}", e),
            ))
        })
    }

    /// Write bytes to file (creates or overwrites).
    fn file_write(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()>;

    /// Check if path exists, optionally filtering by type.
    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool>;

    /// Check if path exists and is a file.
    ///
    /// Convenience method that calls `path_exists` with `PathKind::File`.
    fn is_file(&self, path: &Path) -> RuntimeResult<bool> {
        self.path_exists(path, Some(PathKind::File))
    }

    /// Check if path exists and is a directory.
    ///
    /// Convenience method that calls `path_exists` with `PathKind::Directory`.
    fn is_dir(&self, path: &Path) -> RuntimeResult<bool> {
        self.path_exists(path, Some(PathKind::Directory))
    }

    /// Create an empty temporary file whose name starts with `prefix` and
    /// ends with `suffix`. The returned guard removes it when dropped.
    fn temp_file(&self, prefix: &str, suffix: &str) -> RuntimeResult<TempFile>;

    // ═══════════════════════════════════════════════════════════════════════
    // PROCESS EXECUTION
    // ═══════════════════════════════════════════════════════════════════════

    /// Execute a command with full output capture, blocking until it exits.
    ///
    /// Both output streams are drained while the process runs so that a
    /// chatty child never stalls on a full pipe. The exit status is returned
    /// as data; a non-zero exit is *not* an error at this layer.
    ///
    /// With `timeout: None` the call waits indefinitely. With a limit, the
    /// child is killed once it elapses and `RuntimeError::TimedOut` is
    /// returned.
    fn exec_command(
        &self,
        command: &Path,
        args: &[&OsStr],
        timeout: Option<Duration>,
    ) -> RuntimeResult<CommandOutput>;

    // ═══════════════════════════════════════════════════════════════════════
    // ENVIRONMENT
    // ═══════════════════════════════════════════════════════════════════════

    /// Get single environment variable.
    fn env_get(&self, name: &str) -> RuntimeResult<Option<String>>;

    // ═══════════════════════════════════════════════════════════════════════
    // BINARY DISCOVERY
    // ═══════════════════════════════════════════════════════════════════════

    /// Find a binary by checking an environment variable first, then PATH.
    ///
    /// The `env_var` parameter names an environment variable that may contain
    /// the path to the binary (e.g., "SASS_IMPORTER_SASS" for sass).
    ///
    /// Default implementation checks the environment variable and explicit
    /// paths but does not search PATH. `NativeRuntime` overrides this to use
    /// `which::which()`.
    fn find_binary(&self, name: &str, env_var: &str) -> Option<PathBuf> {
        if let Ok(Some(path_str)) = self.env_get(env_var) {
            let path = PathBuf::from(path_str);
            if self.is_file(&path).unwrap_or(false) {
                return Some(path);
            }
        }
        let path = Path::new(name);
        if path.components().count() > 1 && self.is_file(path).unwrap_or(false) {
            return Some(path.to_path_buf());
        }
        None
    }
}
