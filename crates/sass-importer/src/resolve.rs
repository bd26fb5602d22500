//! Import graph resolution.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Finds the `@import` directives of a source file and maps each one onto an
//! existing file next to it. For an import of `foo`, candidates are tried in
//! this order, first match wins:
//!
//! ```text
//! foo            (exact relative path)
//! _foo.scss      (partial, first extension)
//! foo.scss
//! _foo.sass      (partial, second extension)
//! foo.sass
//! ```
//!
//! A name that already has an extension only gets the partial/plain pair.
//! Only the first single-quoted target on a line is considered.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use sass_importer_runtime::SystemRuntime;

use crate::config::ImporterConfig;
use crate::error::UnresolvedImport;
use crate::types::{ImportDirective, ImportSet, SourceAsset};

/// First single-quoted substring on a line; captures the contents.
static SINGLE_QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']*)'").unwrap());

/// Extract import directives from source text.
///
/// A line qualifies only if it starts with `keyword` (no leading whitespace).
/// A qualifying line without a single-quoted target yields an empty name.
pub fn parse_directives(source: &str, keyword: &str) -> Vec<ImportDirective> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| line.starts_with(keyword))
        .map(|(index, line)| ImportDirective {
            name: SINGLE_QUOTED
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            line: index + 1,
        })
        .collect()
}

/// Resolves import directives against the filesystem through a runtime.
pub struct ImportResolver<'a> {
    runtime: &'a dyn SystemRuntime,
    config: &'a ImporterConfig,
}

impl<'a> ImportResolver<'a> {
    pub fn new(runtime: &'a dyn SystemRuntime, config: &'a ImporterConfig) -> Self {
        Self { runtime, config }
    }

    /// Candidate paths for `name` relative to `base`, in probe order.
    pub fn candidates(&self, base: &Path, name: &str) -> Vec<PathBuf> {
        let mut candidates = vec![base.join(name)];

        let names: Vec<String> = if Path::new(name).extension().is_none() {
            self.config
                .extensions
                .iter()
                .map(|ext| format!("{name}.{ext}"))
                .collect()
        } else {
            vec![name.to_string()]
        };

        for name in &names {
            candidates.push(base.join(self.partial_variant(name)));
            candidates.push(base.join(name));
        }
        candidates
    }

    /// `dir/foo.scss` becomes `dir/_foo.scss`; the prefix goes on the file name.
    fn partial_variant(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let partial = format!("{}{}", self.config.partial_prefix, file_name);
        match path.parent() {
            Some(parent) => parent.join(partial),
            None => PathBuf::from(partial),
        }
    }

    /// The first existing candidate for `name`, if any.
    pub fn resolve_import_path(&self, base: &Path, name: &str) -> Option<PathBuf> {
        self.candidates(base, name)
            .into_iter()
            .find(|candidate| self.runtime.is_file(candidate).unwrap_or(false))
    }

    /// Resolve every directive in `source`.
    ///
    /// Fails on the first directive that matches no candidate; the partial
    /// result is discarded.
    pub fn resolve(&self, source: &SourceAsset) -> Result<ImportSet, UnresolvedImport> {
        let base = source.directory().unwrap_or(Path::new(""));
        let mut imports = ImportSet::new();

        for directive in parse_directives(&source.content, &self.config.import_keyword) {
            match self.resolve_import_path(base, &directive.name) {
                Some(path) => {
                    tracing::trace!(import = %directive.name, resolved = %path.display(), "resolved import");
                    imports.insert(path);
                }
                None => {
                    tracing::debug!(
                        import = %directive.name,
                        line = directive.line,
                        source = %source.path.display(),
                        "import did not match any candidate"
                    );
                    return Err(UnresolvedImport {
                        name: directive.name,
                    });
                }
            }
        }

        Ok(imports)
    }
}
