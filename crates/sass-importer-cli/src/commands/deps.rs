/*
 * deps.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Deps command implementation
 */

//! `sass-import deps FILE`: resolve the import graph of one file without
//! compiling it.

use std::path::Path;

use anyhow::{Context, Result};

use sass_importer::{SassImporter, SourceAsset};
use sass_importer_runtime::default_runtime;

use crate::ConfigArgs;

/// Execute the deps command
pub fn execute(file: &Path, args: &ConfigArgs) -> Result<()> {
    let runtime = default_runtime();
    let config = super::load_config(&runtime, args)?;

    let source = SourceAsset::load(&runtime, file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let importer = SassImporter::new(&runtime, config);

    match importer.resolve(&source) {
        Ok(imports) => {
            for path in imports.iter() {
                println!("{}", path.display());
            }
            Ok(())
        }
        Err(unresolved) => anyhow::bail!("{}: {unresolved}", file.display()),
    }
}
