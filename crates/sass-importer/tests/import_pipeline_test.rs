//! Integration tests for the per-file import pipeline.
//!
//! The external compiler is replaced by a runtime that wraps `NativeRuntime`
//! and answers `exec_command` by writing scripted CSS to the output path.
//! Everything else (source files, import resolution, temp files) uses the
//! real filesystem inside a `tempfile::TempDir`.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use sass_importer::{
    AdapterFailurePolicy, AdapterOutcome, AssetImportContext, CompilerError,
    CompilerFailurePolicy, Diagnostic, FallbackReason, ImportError, ImportOutcome, ImportState,
    ImportedAsset, ImporterConfig, RecordedImport, STYLESHEET_OBJECT, SassImporter, Severity,
    SourceAsset, TEXT_OBJECT, Unavailable,
};
use sass_importer_runtime::{
    CommandOutput, NativeRuntime, PathKind, RuntimeError, RuntimeResult, SystemRuntime, TempFile,
};
use tempfile::TempDir;

/// Runtime whose "compiler" writes canned output and records every call.
struct ScriptedCompiler {
    inner: NativeRuntime,
    installed: bool,
    css: String,
    code: i32,
    /// Argument vectors of every compiler run
    calls: Mutex<Vec<Vec<OsString>>>,
    /// Whether the output file existed when the compiler was started
    output_existed: Mutex<Vec<bool>>,
    /// Host callbacks and compiler runs, in the order they happened
    events: Mutex<Vec<String>>,
}

impl ScriptedCompiler {
    fn emitting(css: &str) -> Self {
        Self {
            inner: NativeRuntime::new(),
            installed: true,
            css: css.to_string(),
            code: 0,
            calls: Mutex::new(Vec::new()),
            output_existed: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
        }
    }

    fn failing(code: i32, partial_css: &str) -> Self {
        Self {
            code,
            ..Self::emitting(partial_css)
        }
    }

    fn missing() -> Self {
        Self {
            installed: false,
            ..Self::emitting("")
        }
    }

    fn calls(&self) -> Vec<Vec<OsString>> {
        self.calls.lock().unwrap().clone()
    }

    /// Output path of the most recent compiler run.
    fn last_output_path(&self) -> PathBuf {
        let calls = self.calls.lock().unwrap();
        PathBuf::from(calls.last().unwrap().last().unwrap())
    }
}

impl SystemRuntime for ScriptedCompiler {
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        self.inner.file_read(path)
    }

    fn file_write(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()> {
        self.inner.file_write(path, contents)
    }

    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool> {
        self.inner.path_exists(path, kind)
    }

    fn temp_file(&self, prefix: &str, suffix: &str) -> RuntimeResult<TempFile> {
        self.inner.temp_file(prefix, suffix)
    }

    fn exec_command(
        &self,
        _command: &Path,
        args: &[&OsStr],
        _timeout: Option<Duration>,
    ) -> RuntimeResult<CommandOutput> {
        let args: Vec<OsString> = args.iter().map(|a| a.to_os_string()).collect();
        let output = PathBuf::from(args.last().unwrap());
        self.output_existed.lock().unwrap().push(output.exists());
        self.events.lock().unwrap().push("compile".to_string());
        self.calls.lock().unwrap().push(args);

        fs::write(&output, &self.css)?;
        Ok(CommandOutput {
            code: self.code,
            stdout: b"Compiled.\n".to_vec(),
            stderr: if self.code == 0 {
                Vec::new()
            } else {
                b"Error: Undefined variable.".to_vec()
            },
        })
    }

    fn env_get(&self, name: &str) -> RuntimeResult<Option<String>> {
        self.inner.env_get(name)
    }

    fn find_binary(&self, name: &str, _env_var: &str) -> Option<PathBuf> {
        self.installed.then(|| PathBuf::from(name))
    }
}

/// Host context that logs its callbacks into the compiler's event list.
struct OrderedContext<'a> {
    inner: RecordedImport,
    events: &'a Mutex<Vec<String>>,
}

impl AssetImportContext for OrderedContext<'_> {
    fn asset_path(&self) -> &Path {
        self.inner.asset_path()
    }

    fn depends_on_source_asset(&mut self, path: &Path) {
        let name = path.file_name().unwrap().to_string_lossy();
        self.events.lock().unwrap().push(format!("depend {name}"));
        self.inner.depends_on_source_asset(path);
    }

    fn add_object_to_asset(&mut self, identifier: &str, object: ImportedAsset) {
        self.events.lock().unwrap().push(format!("object {identifier}"));
        self.inner.add_object_to_asset(identifier, object);
    }

    fn set_main_object(&mut self, identifier: &str) {
        self.events.lock().unwrap().push(format!("main {identifier}"));
        self.inner.set_main_object(identifier);
    }

    fn log_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.inner.log_diagnostic(diagnostic);
    }
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn stylesheet(ctx: &RecordedImport) -> &sass_importer::StyleSheet {
    ctx.main()
        .and_then(ImportedAsset::as_stylesheet)
        .expect("main object should be a structured stylesheet")
}

fn text(ctx: &RecordedImport) -> &str {
    ctx.main()
        .and_then(ImportedAsset::as_text)
        .map(|t| t.text.as_str())
        .expect("main object should be raw text")
}

#[test]
fn test_partial_variant_is_resolved_first() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.scss", "@import 'b';\n.a { @extend .b; }\n");
    write(dir.path(), "b.scss", ".b { color: blue; }");
    write(dir.path(), "_b.scss", ".b { color: red; }");

    let rt = ScriptedCompiler::emitting(".a, .b {\n  color: red;\n}\n");
    let importer = SassImporter::new(&rt, ImporterConfig::default());
    let mut ctx = RecordedImport::new(&a);
    let report = importer.import_asset(&mut ctx).unwrap();

    assert_eq!(ctx.dependencies, vec![dir.path().join("_b.scss")]);
    assert_eq!(report.dependencies.iter().collect::<Vec<_>>(), vec![dir.path().join("_b.scss").as_path()]);
    assert_eq!(ctx.main_object.as_deref(), Some(STYLESHEET_OBJECT));
}

#[test]
fn test_partial_without_imports_is_text() {
    let dir = TempDir::new().unwrap();
    let content = "$primary: #336699;\n@mixin center { display: flex; }\n";
    let partial = write(dir.path(), "_partial.scss", content);

    let rt = ScriptedCompiler::emitting("body{color:red}");
    let importer = SassImporter::new(&rt, ImporterConfig::default());
    let mut ctx = RecordedImport::new(&partial);
    let report = importer.import_asset(&mut ctx).unwrap();

    assert_eq!(text(&ctx), content);
    assert_eq!(ctx.main_object.as_deref(), Some(TEXT_OBJECT));
    assert_eq!(report.outcome, ImportOutcome::Fallback(FallbackReason::Partial));
    assert!(rt.calls().is_empty(), "partials are never compiled");
}

#[test]
fn test_unresolved_import_is_text_without_dependencies() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "_present.scss", "");
    let content = "@import 'present';\n@import 'missing';\nbody { color: red; }\n";
    let c = write(dir.path(), "c.scss", content);

    let rt = ScriptedCompiler::emitting("body{color:red}");
    let importer = SassImporter::new(&rt, ImporterConfig::default());
    let mut ctx = RecordedImport::new(&c);
    let report = importer.import_asset(&mut ctx).unwrap();

    assert_eq!(text(&ctx), content);
    assert!(ctx.dependencies.is_empty());
    assert!(report.dependencies.is_empty());
    assert_eq!(
        report.outcome,
        ImportOutcome::Fallback(FallbackReason::UnresolvedImport {
            name: "missing".to_string()
        })
    );
    assert_eq!(
        report.states,
        vec![
            ImportState::Start,
            ImportState::ResolvingImports,
            ImportState::Fallback,
            ImportState::Done
        ]
    );
    assert!(rt.calls().is_empty());
}

#[test]
fn test_compiled_output_becomes_stylesheet_and_temp_file_is_removed() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "_vars.scss", "$c: red;");
    let d = write(dir.path(), "d.scss", "@import 'vars';\nbody { color: $c; }\n");

    let rt = ScriptedCompiler::emitting("body{color:red}");
    let importer = SassImporter::new(&rt, ImporterConfig::default());
    let mut ctx = RecordedImport::new(&d);
    let report = importer.import_asset(&mut ctx).unwrap();

    let sheet = stylesheet(&ctx);
    assert_eq!(sheet.to_css(), "body {\n  color: red;\n}\n");
    assert!(!sheet.editable);
    assert_eq!(
        report.outcome,
        ImportOutcome::Structured {
            adapter: AdapterOutcome::Populated,
            compiler_failure: None
        }
    );
    assert_eq!(
        report.states,
        vec![
            ImportState::Start,
            ImportState::ResolvingImports,
            ImportState::CheckingPartial,
            ImportState::Compiling,
            ImportState::Adapting,
            ImportState::Done
        ]
    );

    assert_eq!(rt.output_existed.lock().unwrap().as_slice(), &[true]);
    assert!(!rt.last_output_path().exists());
}

#[test]
fn test_compiler_receives_fixed_arguments() {
    let dir = TempDir::new().unwrap();
    let site = write(dir.path(), "site.scss", "body { margin: 0; }");

    let rt = ScriptedCompiler::emitting("body{margin:0}");
    let importer = SassImporter::new(&rt, ImporterConfig::default());
    importer.import_asset(&mut RecordedImport::new(&site)).unwrap();

    let calls = rt.calls();
    assert_eq!(calls.len(), 1);
    let args = &calls[0];
    assert_eq!(args.len(), 5);
    assert_eq!(&args[..3], &["--style", "expanded", "--no-source-map"]);
    assert_eq!(args[3], site.as_os_str());
    assert!(!args.iter().any(|a| a.to_string_lossy().starts_with("--load-path")));
}

#[test]
fn test_partial_with_resolvable_imports_declares_dependencies_then_falls_back() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "_colors.scss", "$c: red;");
    let content = "@import 'colors';\n$accent: $c;\n";
    let partial = write(dir.path(), "_theme.scss", content);

    let rt = ScriptedCompiler::emitting("body{color:red}");
    let importer = SassImporter::new(&rt, ImporterConfig::default());
    let mut ctx = RecordedImport::new(&partial);
    importer.import_asset(&mut ctx).unwrap();

    assert_eq!(ctx.dependencies, vec![dir.path().join("_colors.scss")]);
    assert_eq!(text(&ctx), content);
    assert!(rt.calls().is_empty());
}

#[test]
fn test_partial_with_unresolvable_imports_is_text() {
    let dir = TempDir::new().unwrap();
    let content = "@import 'nowhere';\n";
    let partial = write(dir.path(), "_broken.scss", content);

    let rt = ScriptedCompiler::emitting("");
    let importer = SassImporter::new(&rt, ImporterConfig::default());
    let mut ctx = RecordedImport::new(&partial);
    importer.import_asset(&mut ctx).unwrap();

    assert_eq!(text(&ctx), content);
    assert!(ctx.dependencies.is_empty());
}

#[test]
fn test_resolution_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "_a.scss", "");
    write(dir.path(), "b.sass", "");
    write(dir.path(), "c.scss", "");
    let source = SourceAsset::new(
        dir.path().join("main.scss"),
        "@import 'c';\n@import 'a';\n@import 'b';\n@import 'a';\n",
    );

    let rt = NativeRuntime::new();
    let importer = SassImporter::new(&rt, ImporterConfig::default());
    let first = importer.resolve(&source).unwrap();
    let second = importer.resolve(&source).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_empty_compiled_output_still_yields_stylesheet() {
    let dir = TempDir::new().unwrap();
    let empty = write(dir.path(), "empty.scss", "// nothing to emit\n");

    let rt = ScriptedCompiler::emitting("");
    let importer = SassImporter::new(&rt, ImporterConfig::default());
    let mut ctx = RecordedImport::new(&empty);
    let report = importer.import_asset(&mut ctx).unwrap();

    assert!(stylesheet(&ctx).is_empty());
    assert!(matches!(
        report.outcome,
        ImportOutcome::Structured {
            adapter: AdapterOutcome::SkippedEmpty,
            ..
        }
    ));
}

#[test]
fn test_compiler_failure_fails_import_by_default() {
    let dir = TempDir::new().unwrap();
    let bad = write(dir.path(), "bad.scss", "body { color: $undefined; }");

    let rt = ScriptedCompiler::failing(65, "");
    let importer = SassImporter::new(&rt, ImporterConfig::default());
    let mut ctx = RecordedImport::new(&bad);
    let err = importer.import_asset(&mut ctx).unwrap_err();

    assert!(matches!(
        err,
        ImportError::Compiler(CompilerError::NonZeroExit { code: 65, .. })
    ));
    assert!(ctx.main_object.is_none());
    assert!(!rt.last_output_path().exists());
}

#[test]
fn test_tolerated_compiler_failure_keeps_partial_output() {
    let dir = TempDir::new().unwrap();
    let bad = write(dir.path(), "bad.scss", "body { color: red; }\n.x { color: $nope; }");

    let rt = ScriptedCompiler::failing(65, "body {\n  color: red;\n}\n");
    let config = ImporterConfig {
        on_compiler_failure: CompilerFailurePolicy::Tolerate,
        ..Default::default()
    };
    let importer = SassImporter::new(&rt, config);
    let mut ctx = RecordedImport::new(&bad);
    let report = importer.import_asset(&mut ctx).unwrap();

    assert_eq!(stylesheet(&ctx).rules.len(), 1);
    assert_eq!(ctx.diagnostics.len(), 1);
    assert_eq!(ctx.diagnostics[0].severity, Severity::Warning);
    match report.outcome {
        ImportOutcome::Structured {
            compiler_failure: Some(message),
            ..
        } => assert!(message.contains("exit 65")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!rt.last_output_path().exists());
}

#[test]
fn test_missing_compiler() {
    let dir = TempDir::new().unwrap();
    let site = write(dir.path(), "site.scss", "body { margin: 0; }");
    let rt = ScriptedCompiler::missing();

    let err = SassImporter::new(&rt, ImporterConfig::default())
        .import_asset(&mut RecordedImport::new(&site))
        .unwrap_err();
    assert!(matches!(err, ImportError::Compiler(CompilerError::NotFound(_))));

    let tolerant = ImporterConfig {
        on_compiler_failure: CompilerFailurePolicy::Tolerate,
        ..Default::default()
    };
    let mut ctx = RecordedImport::new(&site);
    SassImporter::new(&rt, tolerant).import_asset(&mut ctx).unwrap();
    assert!(stylesheet(&ctx).is_empty());
}

#[test]
fn test_adapter_failure_is_absorbed_not_redirected() {
    let dir = TempDir::new().unwrap();
    let site = write(dir.path(), "site.scss", "body { color: red; }");

    let rt = ScriptedCompiler::emitting("body { color red }");
    let importer = SassImporter::new(&rt, ImporterConfig::default());
    let mut ctx = RecordedImport::new(&site);
    let report = importer.import_asset(&mut ctx).unwrap();

    // Hollow structured result, never the text fallback
    assert!(stylesheet(&ctx).is_empty());
    assert!(ctx.object(TEXT_OBJECT).is_none());
    assert!(!report.is_fallback());
    assert_eq!(ctx.diagnostics.len(), 1);
    assert_eq!(ctx.diagnostics[0].severity, Severity::Error);
    assert!(matches!(
        report.outcome,
        ImportOutcome::Structured {
            adapter: AdapterOutcome::Failed,
            ..
        }
    ));
    assert!(!rt.last_output_path().exists());
}

#[test]
fn test_adapter_failure_can_escalate() {
    let dir = TempDir::new().unwrap();
    let site = write(dir.path(), "site.scss", "body { color: red; }");

    let rt = ScriptedCompiler::emitting("body { color red }");
    let config = ImporterConfig {
        on_adapter_failure: AdapterFailurePolicy::Escalate,
        ..Default::default()
    };
    let mut ctx = RecordedImport::new(&site);
    let err = SassImporter::new(&rt, config).import_asset(&mut ctx).unwrap_err();

    assert!(matches!(err, ImportError::Adapter(_)));
    assert!(ctx.main_object.is_none());
    assert!(!rt.last_output_path().exists());
}

#[test]
fn test_unavailable_capability_yields_empty_stylesheet() {
    let dir = TempDir::new().unwrap();
    let site = write(dir.path(), "site.scss", "body { color: red; }");

    let rt = ScriptedCompiler::emitting("body{color:red}");
    let importer = SassImporter::new(&rt, ImporterConfig::default()).with_provider(&Unavailable);
    let mut ctx = RecordedImport::new(&site);
    let report = importer.import_asset(&mut ctx).unwrap();

    assert!(stylesheet(&ctx).is_empty());
    assert!(matches!(
        report.outcome,
        ImportOutcome::Structured {
            adapter: AdapterOutcome::SkippedUnavailable,
            ..
        }
    ));
}

#[test]
fn test_unreadable_source_is_an_error() {
    let dir = TempDir::new().unwrap();
    let rt = ScriptedCompiler::emitting("");
    let err = SassImporter::new(&rt, ImporterConfig::default())
        .import_asset(&mut RecordedImport::new(dir.path().join("absent.scss")))
        .unwrap_err();

    assert!(matches!(
        err,
        ImportError::ReadSource {
            source: RuntimeError::Io(_),
            ..
        }
    ));
}

#[test]
fn test_concurrent_imports_share_one_importer() {
    let dir = TempDir::new().unwrap();
    let files: Vec<PathBuf> = (0..8)
        .map(|i| write(dir.path(), &format!("page{i}.scss"), "body { color: red; }"))
        .collect();

    let rt = ScriptedCompiler::emitting("body{color:red}");
    let importer = SassImporter::new(&rt, ImporterConfig::default());

    let results: Vec<RecordedImport> = std::thread::scope(|scope| {
        let handles: Vec<_> = files
            .iter()
            .map(|file| {
                let importer = &importer;
                scope.spawn(move || {
                    let mut ctx = RecordedImport::new(file);
                    importer.import_asset(&mut ctx).unwrap();
                    ctx
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.len(), 8);
    assert!(results.iter().all(|ctx| stylesheet(ctx).rules.len() == 1));
    for call in rt.calls() {
        assert!(!Path::new(call.last().unwrap()).exists());
    }
}

#[test]
fn test_dependencies_are_declared_before_compiling() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "_colors.scss", "$c: red;");
    write(dir.path(), "_layout.scss", "");
    let site = write(
        dir.path(),
        "site.scss",
        "@import 'layout';\n@import 'colors';\nbody { color: $c; }\n",
    );

    let rt = ScriptedCompiler::emitting("body{color:red}");
    let importer = SassImporter::new(&rt, ImporterConfig::default());
    let mut ctx = OrderedContext {
        inner: RecordedImport::new(&site),
        events: &rt.events,
    };
    importer.import_asset(&mut ctx).unwrap();

    let events = rt.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "depend _colors.scss",
            "depend _layout.scss",
            "compile",
            "object stylesheet",
            "main stylesheet",
        ]
    );
}

#[test]
fn test_byte_order_mark_does_not_hide_first_import() {
    let dir = TempDir::new().unwrap();
    let source = write(dir.path(), "a.scss", "\u{FEFF}@import 'missing';\nbody { color: red; }\n");

    let rt = ScriptedCompiler::emitting("body{color:red}");
    let importer = SassImporter::new(&rt, ImporterConfig::default());
    let mut ctx = RecordedImport::new(&source);
    let report = importer.import_asset(&mut ctx).unwrap();

    assert_eq!(
        report.outcome,
        ImportOutcome::Fallback(FallbackReason::UnresolvedImport {
            name: "missing".to_string()
        })
    );
    assert_eq!(text(&ctx), "@import 'missing';\nbody { color: red; }\n");
    assert!(rt.calls().is_empty());
}

#[test]
fn test_byte_order_mark_first_import_is_declared() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "_vars.scss", "$c: red;");
    let source = write(dir.path(), "d.scss", "\u{FEFF}@import 'vars';\nbody { color: $c; }\n");

    let rt = ScriptedCompiler::emitting("body{color:red}");
    let importer = SassImporter::new(&rt, ImporterConfig::default());
    let mut ctx = RecordedImport::new(&source);
    importer.import_asset(&mut ctx).unwrap();

    assert_eq!(ctx.dependencies, vec![dir.path().join("_vars.scss")]);
    assert_eq!(ctx.main_object.as_deref(), Some(STYLESHEET_OBJECT));
}

#[test]
fn test_non_utf8_partial_is_still_text() {
    let dir = TempDir::new().unwrap();
    let partial = dir.path().join("_latin.scss");
    fs::write(&partial, b"// caf\xe9\n$c: red;\n").unwrap();

    let rt = ScriptedCompiler::emitting("");
    let importer = SassImporter::new(&rt, ImporterConfig::default());
    let mut ctx = RecordedImport::new(&partial);
    let report = importer.import_asset(&mut ctx).unwrap();

    assert_eq!(report.outcome, ImportOutcome::Fallback(FallbackReason::Partial));
    assert_eq!(ctx.main_object.as_deref(), Some(TEXT_OBJECT));
    assert_eq!(text(&ctx), "// caf\u{FFFD}\n$c: red;\n");
}
