//! Importer configuration.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Configuration is read from a TOML file. Every field is optional:
//!
//! ```toml
//! compiler = "/opt/dart-sass/sass"
//! compiler_env = "SASS_IMPORTER_SASS"
//! extensions = ["scss", "sass"]
//! timeout_secs = 30
//! on_compiler_failure = "tolerate"
//! on_adapter_failure = "log"
//! ```

use std::path::Path;
use std::time::Duration;

use sass_importer_runtime::SystemRuntime;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default name of the config file looked up by hosts.
pub const CONFIG_FILE_NAME: &str = "sass-importer.toml";

/// What to do when the external compiler fails, is missing, or times out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerFailurePolicy {
    /// Surface the failure as an import error.
    #[default]
    Fail,
    /// Log a warning and adapt whatever output exists, possibly nothing.
    Tolerate,
}

/// What to do when populating the structured stylesheet fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterFailurePolicy {
    /// Record a diagnostic and keep the (possibly hollow) stylesheet.
    #[default]
    Log,
    /// Surface the failure as an import error.
    Escalate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    /// Compiler binary name (looked up on PATH) or explicit path.
    pub compiler: String,

    /// Environment variable holding a compiler path, checked before PATH.
    pub compiler_env: String,

    /// Handled source extensions, in resolution-candidate order.
    pub extensions: Vec<String>,

    /// File-name prefix marking partial (include-only) sources.
    pub partial_prefix: String,

    /// Keyword a line must start with to count as an import directive.
    pub import_keyword: String,

    /// Bounded wait for the compiler. `None` waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    pub on_compiler_failure: CompilerFailurePolicy,

    pub on_adapter_failure: AdapterFailurePolicy,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            compiler: "sass".to_string(),
            compiler_env: "SASS_IMPORTER_SASS".to_string(),
            extensions: vec!["scss".to_string(), "sass".to_string()],
            partial_prefix: "_".to_string(),
            import_keyword: "@import".to_string(),
            timeout_secs: None,
            on_compiler_failure: CompilerFailurePolicy::default(),
            on_adapter_failure: AdapterFailurePolicy::default(),
        }
    }
}

impl ImporterConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a config file through the runtime.
    pub fn load(runtime: &dyn SystemRuntime, path: &Path) -> Result<Self, ConfigError> {
        let content = runtime
            .file_read_string(path)
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&content)
    }

    /// The compiler wait limit, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Whether `path` has one of the handled source extensions.
    pub fn handles(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Whether `path` names a partial source that is never compiled standalone.
    pub fn is_partial(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&self.partial_prefix))
    }
}
