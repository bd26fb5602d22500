/*
 * native.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * NativeRuntime implementation.
 *
 * This runtime provides full system access using std:
 * - std::fs for file operations
 * - std::process for command execution
 * - std::env for environment access
 */

use std::ffi::OsStr;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::traits::{CommandOutput, PathKind, RuntimeError, RuntimeResult, SystemRuntime, TempFile};

/// How often a bounded wait checks whether the child has exited.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Native runtime with full system access.
#[derive(Debug, Default)]
pub struct NativeRuntime {}

impl NativeRuntime {
    /// Create a new NativeRuntime with default settings.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SystemRuntime for NativeRuntime {
    // ═══════════════════════════════════════════════════════════════════════
    // FILE OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════

    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        fs::read(path).map_err(RuntimeError::from)
    }

    fn file_write(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, contents).map_err(RuntimeError::from)
    }

    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool> {
        match kind {
            None => Ok(path.exists()),
            Some(PathKind::File) => Ok(path.is_file()),
            Some(PathKind::Directory) => Ok(path.is_dir()),
        }
    }

    fn temp_file(&self, prefix: &str, suffix: &str) -> RuntimeResult<TempFile> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile()?;
        // Ownership of the path moves to our guard; the open handle is closed
        // here so the external process can replace the file.
        let path = file.into_temp_path().keep().map_err(|e| RuntimeError::Io(e.error))?;
        Ok(TempFile::new(path))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PROCESS EXECUTION
    // ═══════════════════════════════════════════════════════════════════════

    fn exec_command(
        &self,
        command: &Path,
        args: &[&OsStr],
        timeout: Option<Duration>,
    ) -> RuntimeResult<CommandOutput> {
        let child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RuntimeError::SpawnFailed {
                command: command.to_path_buf(),
                source,
            })?;

        match timeout {
            None => {
                // wait_with_output drains both pipes concurrently
                let output = child.wait_with_output()?;
                Ok(CommandOutput {
                    code: output.status.code().unwrap_or(-1),
                    stdout: output.stdout,
                    stderr: output.stderr,
                })
            }
            Some(limit) => wait_bounded(child, command, limit),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ENVIRONMENT
    // ═══════════════════════════════════════════════════════════════════════

    fn env_get(&self, name: &str) -> RuntimeResult<Option<String>> {
        Ok(std::env::var(name).ok())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // BINARY DISCOVERY
    // ═══════════════════════════════════════════════════════════════════════

    fn find_binary(&self, name: &str, env_var: &str) -> Option<PathBuf> {
        if let Ok(Some(path_str)) = self.env_get(env_var) {
            let path = PathBuf::from(path_str);
            if path.is_file() {
                return Some(path);
            }
            tracing::debug!(env_var, path = %path.display(), "ignoring override that is not a file");
        }
        which::which(name).ok()
    }
}

/// Wait for `child` for at most `limit`, draining its pipes on helper threads.
fn wait_bounded(mut child: Child, command: &Path, limit: Duration) -> RuntimeResult<CommandOutput> {
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + limit;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            // The reader threads finish on their own once the pipes close.
            let _ = child.kill();
            let _ = child.wait();
            return Err(RuntimeError::TimedOut {
                command: command.to_path_buf(),
                after: limit,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(CommandOutput {
        code: status.code().unwrap_or(-1),
        stdout: join_drain(stdout)?,
        stderr: join_drain(stderr)?,
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<io::Result<Vec<u8>>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn join_drain(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> RuntimeResult<Vec<u8>> {
    match handle {
        None => Ok(Vec::new()),
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::other("output reader thread panicked"))?
            .map_err(RuntimeError::from),
    }
}
