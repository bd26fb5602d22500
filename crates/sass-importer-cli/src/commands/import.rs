/*
 * import.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Import command implementation
 */

//! `sass-import import PATHS...`
//!
//! Imports each named file, plus every handled file found under directory
//! arguments. A file whose import fails is reported and the batch moves on;
//! the command fails at the end if any file did.

use std::path::PathBuf;

use anyhow::Result;
use serde_json::{Value, json};
use tracing::{error, info};
use walkdir::WalkDir;

use sass_importer::{
    FallbackReason, IMPORTER_VERSION, ImportOutcome, ImportReport, ImporterConfig, RecordedImport,
    SassImporter,
};
use sass_importer_runtime::{SystemRuntime, default_runtime};

use crate::ConfigArgs;

/// Arguments for the import command
#[derive(Debug)]
pub struct ImportArgs {
    pub paths: Vec<PathBuf>,
    /// Print recorded imports as a JSON array
    pub json: bool,
    pub config: ConfigArgs,
}

/// Execute the import command
pub fn execute(args: ImportArgs) -> Result<()> {
    let runtime = default_runtime();
    let config = super::load_config(&runtime, &args.config)?;
    let sources = discover_sources(&runtime, &args.paths, &config);
    let importer = SassImporter::new(&runtime, config);

    info!(count = sources.len(), "importing SASS sources");

    let mut failed = 0usize;
    let mut records = Vec::with_capacity(sources.len());
    for source in &sources {
        let mut ctx = RecordedImport::new(source);
        let result = importer.import_asset(&mut ctx);
        if let Err(e) = &result {
            error!(asset = %source.display(), error = %e, "import failed");
            failed += 1;
        }

        if args.json {
            records.push(json_record(&ctx, &result));
        } else {
            println!("{}", summary_line(&ctx, &result));
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&Value::Array(records))?);
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} imports failed", sources.len());
    }
    Ok(())
}

/// Expand `paths` into the list of sources to import.
///
/// Files named explicitly are always imported. Directories are walked and
/// contribute only files the importer handles, in sorted order.
pub fn discover_sources(
    runtime: &dyn SystemRuntime,
    paths: &[PathBuf],
    config: &ImporterConfig,
) -> Vec<PathBuf> {
    let mut sources = Vec::new();
    for path in paths {
        if !runtime.is_dir(path).unwrap_or(false) {
            sources.push(path.clone());
            continue;
        }

        let walker = WalkDir::new(path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e));

        for entry in walker.filter_map(|e| e.ok()) {
            if entry.file_type().is_file() && config.handles(entry.path()) {
                sources.push(entry.into_path());
            }
        }
    }
    sources
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// One human-readable line per imported file.
pub fn summary_line(ctx: &RecordedImport, result: &sass_importer::Result<ImportReport>) -> String {
    let asset = ctx.asset_path.display();
    let report = match result {
        Ok(report) => report,
        Err(e) => return format!("{asset}: error: {e}"),
    };

    let deps = report.dependencies.len();
    match &report.outcome {
        ImportOutcome::Structured {
            compiler_failure, ..
        } => {
            let rules = ctx
                .main()
                .and_then(|object| object.as_stylesheet())
                .map_or(0, |sheet| sheet.rules.len());
            let mut line = format!("{asset}: stylesheet ({rules} rules, {deps} dependencies)");
            if compiler_failure.is_some() {
                line.push_str(" [compiler failed]");
            }
            if !ctx.diagnostics.is_empty() {
                line.push_str(&format!(" [{} diagnostics]", ctx.diagnostics.len()));
            }
            line
        }
        ImportOutcome::Fallback(FallbackReason::Partial) => {
            format!("{asset}: text (partial, {deps} dependencies)")
        }
        ImportOutcome::Fallback(FallbackReason::UnresolvedImport { name }) => {
            format!("{asset}: text (unresolved import '{name}')")
        }
    }
}

fn json_record(ctx: &RecordedImport, result: &sass_importer::Result<ImportReport>) -> Value {
    match result {
        Ok(report) => json!({
            "importer_version": IMPORTER_VERSION,
            "import": ctx,
            "report": report,
        }),
        Err(e) => json!({
            "importer_version": IMPORTER_VERSION,
            "import": ctx,
            "error": e.to_string(),
        }),
    }
}
