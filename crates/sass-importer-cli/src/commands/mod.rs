//! Command implementations for sass-import
//!
//! Each command handles the CLI surface and delegates to `sass-importer`.

pub mod deps;
pub mod import;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use sass_importer::{CONFIG_FILE_NAME, ImporterConfig};
use sass_importer_runtime::SystemRuntime;

use crate::ConfigArgs;

/// Build the importer config: explicit file, then ./sass-importer.toml, then
/// defaults, with command-line overrides applied last.
pub fn load_config(runtime: &dyn SystemRuntime, args: &ConfigArgs) -> Result<ImporterConfig> {
    let mut config = match &args.config {
        Some(path) => ImporterConfig::load(runtime, path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None if runtime.is_file(Path::new(CONFIG_FILE_NAME)).unwrap_or(false) => {
            debug!(file = CONFIG_FILE_NAME, "using config from current directory");
            ImporterConfig::load(runtime, Path::new(CONFIG_FILE_NAME))
                .with_context(|| format!("Failed to load config {CONFIG_FILE_NAME}"))?
        }
        None => ImporterConfig::default(),
    };

    if let Some(compiler) = &args.compiler {
        config.compiler = compiler.clone();
    }
    if let Some(secs) = args.timeout {
        config.timeout_secs = Some(secs);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sass_importer::CompilerFailurePolicy;
    use sass_importer_runtime::NativeRuntime;
    use tempfile::TempDir;

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("importer.toml");
        std::fs::write(
            &path,
            "compiler = \"dart-sass\"\ntimeout_secs = 30\non_compiler_failure = \"tolerate\"\n",
        )
        .unwrap();

        let runtime = NativeRuntime::new();
        let args = ConfigArgs {
            config: Some(path),
            compiler: None,
            timeout: Some(5),
        };
        let config = load_config(&runtime, &args).unwrap();

        assert_eq!(config.compiler, "dart-sass");
        assert_eq!(config.timeout_secs, Some(5));
        assert_eq!(config.on_compiler_failure, CompilerFailurePolicy::Tolerate);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let runtime = NativeRuntime::new();
        let args = ConfigArgs {
            config: Some(temp.path().join("absent.toml")),
            ..Default::default()
        };

        let err = load_config(&runtime, &args).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
