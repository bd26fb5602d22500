//! Structured stylesheet model and the capability that populates it.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Turning compiled CSS into a [`StyleSheet`] goes through a
//! [`StyleSheetImporter`] obtained at import time from a
//! [`StyleSheetImporterProvider`]. A provider may have nothing to offer, in
//! which case the stylesheet is left empty and the import still completes.

use std::fmt::Write as _;

use serde::Serialize;

use crate::css::CssRuleImporter;
use crate::error::AdapterError;

/// One `property: value` pair inside a rule block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub important: bool,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            important: false,
        }
    }
}

/// Body of an at-rule that has a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AtRuleBlock {
    /// Nested rules, e.g. `@media` or `@supports`
    Rules(Vec<Rule>),
    /// Plain declarations, e.g. `@font-face` or `@page`
    Declarations(Vec<Declaration>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    Style {
        selectors: Vec<String>,
        declarations: Vec<Declaration>,
    },
    At {
        name: String,
        prelude: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        block: Option<AtRuleBlock>,
    },
}

/// Parsed, host-facing representation of a compiled stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StyleSheet {
    pub rules: Vec<Rule>,
    /// Imported stylesheets are derived data and are not edited in place.
    pub editable: bool,
}

impl StyleSheet {
    /// An empty, non-editable stylesheet.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Style rules at any nesting depth, in source order.
    pub fn style_rules(&self) -> Vec<(&[String], &[Declaration])> {
        let mut out = Vec::new();
        collect_style_rules(&self.rules, &mut out);
        out
    }

    /// Render back to normalized, expanded CSS text.
    pub fn to_css(&self) -> String {
        let mut out = String::new();
        write_rules(&mut out, &self.rules, 0);
        out
    }
}

fn collect_style_rules<'a>(rules: &'a [Rule], out: &mut Vec<(&'a [String], &'a [Declaration])>) {
    for rule in rules {
        match rule {
            Rule::Style {
                selectors,
                declarations,
            } => out.push((selectors, declarations)),
            Rule::At {
                block: Some(AtRuleBlock::Rules(nested)),
                ..
            } => collect_style_rules(nested, out),
            Rule::At { .. } => {}
        }
    }
}

fn write_rules(out: &mut String, rules: &[Rule], depth: usize) {
    let indent = "  ".repeat(depth);
    for rule in rules {
        match rule {
            Rule::Style {
                selectors,
                declarations,
            } => {
                let _ = writeln!(out, "{indent}{} {{", selectors.join(", "));
                write_declarations(out, declarations, depth + 1);
                let _ = writeln!(out, "{indent}}}");
            }
            Rule::At {
                name,
                prelude,
                block,
            } => {
                let head = if prelude.is_empty() {
                    format!("@{name}")
                } else {
                    format!("@{name} {prelude}")
                };
                match block {
                    None => {
                        let _ = writeln!(out, "{indent}{head};");
                    }
                    Some(AtRuleBlock::Rules(nested)) => {
                        let _ = writeln!(out, "{indent}{head} {{");
                        write_rules(out, nested, depth + 1);
                        let _ = writeln!(out, "{indent}}}");
                    }
                    Some(AtRuleBlock::Declarations(declarations)) => {
                        let _ = writeln!(out, "{indent}{head} {{");
                        write_declarations(out, declarations, depth + 1);
                        let _ = writeln!(out, "{indent}}}");
                    }
                }
            }
        }
    }
}

fn write_declarations(out: &mut String, declarations: &[Declaration], depth: usize) {
    let indent = "  ".repeat(depth);
    for decl in declarations {
        let important = if decl.important { " !important" } else { "" };
        let _ = writeln!(out, "{indent}{}: {}{important};", decl.property, decl.value);
    }
}

/// Capability that fills a [`StyleSheet`] from compiled CSS text.
pub trait StyleSheetImporter: Send + Sync {
    fn import(&self, sheet: &mut StyleSheet, css: &str) -> Result<(), AdapterError>;
}

/// Late-bound lookup of the stylesheet-population capability.
///
/// `None` means the capability is absent and adaptation degrades to a no-op.
pub trait StyleSheetImporterProvider: Send + Sync {
    fn lookup(&self) -> Option<&dyn StyleSheetImporter>;
}

/// Provider with no capability bound.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

impl StyleSheetImporterProvider for Unavailable {
    fn lookup(&self) -> Option<&dyn StyleSheetImporter> {
        None
    }
}

/// Provider backed by the bundled CSS rule parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct Builtin {
    importer: CssRuleImporter,
}

impl Builtin {
    pub const fn new() -> Self {
        Self {
            importer: CssRuleImporter,
        }
    }
}

impl StyleSheetImporterProvider for Builtin {
    fn lookup(&self) -> Option<&dyn StyleSheetImporter> {
        Some(&self.importer)
    }
}

/// What happened when adapting compiled text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterOutcome {
    /// The capability ran and succeeded
    Populated,
    /// The compiled text was empty; nothing to do
    SkippedEmpty,
    /// No capability is bound; the stylesheet stays empty
    SkippedUnavailable,
    /// The capability failed and the failure was absorbed
    Failed,
}

/// Converts compiled text into a structured stylesheet via a provider.
pub struct StylesheetAdapter<'a> {
    provider: &'a dyn StyleSheetImporterProvider,
}

impl<'a> StylesheetAdapter<'a> {
    pub fn new(provider: &'a dyn StyleSheetImporterProvider) -> Self {
        Self { provider }
    }

    /// Populate `sheet` from `css`.
    ///
    /// Empty input or a missing capability leave `sheet` untouched and are
    /// not errors. Failures from the capability are returned to the caller,
    /// which decides whether to absorb them.
    pub fn populate(&self, sheet: &mut StyleSheet, css: &str) -> Result<AdapterOutcome, AdapterError> {
        if css.is_empty() {
            return Ok(AdapterOutcome::SkippedEmpty);
        }
        let Some(importer) = self.provider.lookup() else {
            tracing::debug!("no stylesheet importer bound; leaving stylesheet empty");
            return Ok(AdapterOutcome::SkippedUnavailable);
        };
        importer.import(sheet, css)?;
        Ok(AdapterOutcome::Populated)
    }
}
