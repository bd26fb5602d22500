//! Bundled CSS rule parser.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Parses the flat, expanded CSS the SASS compiler emits into [`Rule`]s.
//! It understands style rules, statement at-rules (`@charset "UTF-8";`),
//! at-rules containing rules (`@media`, `@supports`) and at-rules containing
//! declarations (`@font-face`). Comments are dropped. Nested style rules are
//! rejected; compiled output never contains them.

use crate::error::AdapterError;
use crate::stylesheet::{AtRuleBlock, Declaration, Rule, StyleSheet, StyleSheetImporter};

/// [`StyleSheetImporter`] backed by [`parse_stylesheet`].
///
/// The sheet is only replaced when parsing succeeds, so a failure leaves it
/// as it was (empty, for a freshly created sheet).
#[derive(Debug, Default, Clone, Copy)]
pub struct CssRuleImporter;

impl StyleSheetImporter for CssRuleImporter {
    fn import(&self, sheet: &mut StyleSheet, css: &str) -> Result<(), AdapterError> {
        sheet.rules = parse_stylesheet(css)?;
        Ok(())
    }
}

/// Parse compiled CSS into a list of top-level rules.
pub fn parse_stylesheet(css: &str) -> Result<Vec<Rule>, AdapterError> {
    let stripped = strip_comments(css)?;
    let mut parser = Parser {
        src: &stripped,
        pos: 0,
    };
    parser.rule_list(false)
}

fn line_at(src: &str, offset: usize) -> usize {
    1 + src.as_bytes()[..offset.min(src.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
}

fn parse_error(src: &str, offset: usize, message: impl Into<String>) -> AdapterError {
    AdapterError::Parse {
        line: line_at(src, offset),
        message: message.into(),
    }
}

/// Blank out `/* ... */` comments, keeping line breaks so line numbers hold.
fn strip_comments(css: &str) -> Result<String, AdapterError> {
    let mut out = String::with_capacity(css.len());
    let mut chars = css.char_indices().peekable();
    let mut quote: Option<char> = None;

    while let Some((offset, c)) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                out.push_str("  ");
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    if c == '*' && matches!(chars.peek(), Some((_, '/'))) {
                        chars.next();
                        out.push_str("  ");
                        closed = true;
                        break;
                    }
                    out.push(if c == '\n' { '\n' } else { ' ' });
                }
                if !closed {
                    return Err(parse_error(css, offset, "unterminated comment"));
                }
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// Split `s` on `sep` where it is not inside a string or brackets.
///
/// Returns each piece with its byte offset within `s`.
fn split_top_level(s: &str, sep: u8) -> Vec<(usize, &str)> {
    let bytes = s.as_bytes();
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 1;
            } else if b == q {
                quote = None;
            }
        } else {
            match b {
                b'"' | b'\'' => quote = Some(b),
                b'(' | b'[' => depth += 1,
                b')' | b']' => depth = depth.saturating_sub(1),
                _ if b == sep && depth == 0 => {
                    pieces.push((start, &s[start..i]));
                    start = i + 1;
                }
                _ => {}
            }
        }
        i += 1;
    }
    pieces.push((start, &s[start..]));
    pieces
}

fn split_at_rule(at: &str) -> (String, String) {
    let end = at
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(at.len());
    (at[..end].to_string(), at[end..].trim().to_string())
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, offset: usize, message: impl Into<String>) -> AdapterError {
        parse_error(self.src, offset, message)
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn rule_list(&mut self, nested: bool) -> Result<Vec<Rule>, AdapterError> {
        let mut rules = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None if nested => {
                    return Err(self.error(self.pos, "expected `}` before end of input"));
                }
                None => return Ok(rules),
                Some(b'}') if nested => {
                    self.pos += 1;
                    return Ok(rules);
                }
                Some(b'}') => return Err(self.error(self.pos, "unmatched `}`")),
                Some(_) => rules.push(self.rule()?),
            }
        }
    }

    fn rule(&mut self) -> Result<Rule, AdapterError> {
        let start = self.pos;
        let (prelude, terminator) = self.scan_until(b"{;}")?;
        let prelude = prelude.trim();

        if let Some(at) = prelude.strip_prefix('@') {
            let (name, rest) = split_at_rule(at);
            let block = match terminator {
                Some(b'{') => {
                    self.pos += 1;
                    Some(self.at_rule_block()?)
                }
                Some(b';') => {
                    self.pos += 1;
                    None
                }
                // A closing brace or end of input also ends a statement at-rule.
                _ => None,
            };
            return Ok(Rule::At {
                name,
                prelude: rest,
                block,
            });
        }

        match terminator {
            Some(b'{') if prelude.is_empty() => Err(self.error(start, "missing selector before `{`")),
            Some(b'{') => {
                self.pos += 1;
                let declarations = self.declaration_block()?;
                let selectors = split_top_level(prelude, b',')
                    .into_iter()
                    .map(|(_, s)| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                Ok(Rule::Style {
                    selectors,
                    declarations,
                })
            }
            _ => Err(self.error(start, format!("expected `{{` after `{prelude}`"))),
        }
    }

    fn at_rule_block(&mut self) -> Result<AtRuleBlock, AdapterError> {
        // Peek ahead: a `{` before the closing `}` means nested rules.
        let saved = self.pos;
        let (_, terminator) = self.scan_until(b"{}")?;
        self.pos = saved;

        if terminator == Some(b'{') {
            Ok(AtRuleBlock::Rules(self.rule_list(true)?))
        } else {
            Ok(AtRuleBlock::Declarations(self.declaration_block()?))
        }
    }

    fn declaration_block(&mut self) -> Result<Vec<Declaration>, AdapterError> {
        let body_start = self.pos;
        let (body, terminator) = self.scan_until(b"{}")?;
        match terminator {
            Some(b'}') => self.pos += 1,
            Some(_) => return Err(self.error(self.pos, "nested rules are not supported")),
            None => return Err(self.error(self.pos, "expected `}` before end of input")),
        }

        let mut declarations = Vec::new();
        for (offset, piece) in split_top_level(body, b';') {
            let trimmed = piece.trim();
            if trimmed.is_empty() {
                continue;
            }
            let leading = piece.len() - piece.trim_start().len();
            let at = body_start + offset + leading;

            let Some((property, value)) = trimmed.split_once(':') else {
                return Err(self.error(at, format!("expected `:` in declaration `{trimmed}`")));
            };
            let property = property.trim();
            if property.is_empty() {
                return Err(self.error(at, "declaration has no property name"));
            }

            let mut value = value.trim();
            let mut important = false;
            if let Some(stripped) = value.strip_suffix("!important") {
                value = stripped.trim_end();
                important = true;
            }

            declarations.push(Declaration {
                property: property.to_string(),
                value: value.to_string(),
                important,
            });
        }
        Ok(declarations)
    }

    /// Advance to the first byte in `terminators` outside strings and
    /// brackets, without consuming it. Returns the text skipped over.
    fn scan_until(&mut self, terminators: &[u8]) -> Result<(&'a str, Option<u8>), AdapterError> {
        let bytes = self.src.as_bytes();
        let start = self.pos;
        let mut depth = 0usize;
        let mut i = start;

        while i < bytes.len() {
            let b = bytes[i];
            match b {
                b'"' | b'\'' => {
                    i = self.skip_string(i)?;
                    continue;
                }
                b'(' | b'[' => depth += 1,
                b')' | b']' => depth = depth.saturating_sub(1),
                _ if depth == 0 && terminators.contains(&b) => {
                    self.pos = i;
                    return Ok((&self.src[start..i], Some(b)));
                }
                _ => {}
            }
            i += 1;
        }

        self.pos = bytes.len();
        Ok((&self.src[start..], None))
    }

    /// Index just past the string literal opening at `open`.
    fn skip_string(&self, open: usize) -> Result<usize, AdapterError> {
        let bytes = self.src.as_bytes();
        let quote = bytes[open];
        let mut i = open + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'\n' => break,
                b if b == quote => return Ok(i + 1),
                _ => i += 1,
            }
        }
        Err(self.error(open, "unterminated string"))
    }
}
