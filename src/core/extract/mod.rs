//! Heuristic symbol and call extraction.
//!
//! Extraction is line-oriented and delimiter-counting, not grammar-based:
//! declaration headers are matched with line-start patterns and body extents
//! are found by counting balanced braces (or indentation depth). Call sites
//! are any `identifier(` occurrence inside a body, minus a reserved-word
//! set. This trades soundness for working on partial or malformed input;
//! downstream consumers are tuned to exactly this false-positive profile,
//! so do not swap in a real parser without re-validating the fixtures.

mod braces;
mod indent;

pub use braces::BraceExtractor;
pub use indent::IndentExtractor;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::ir::{Symbol, SymbolKind, Syntax};
use crate::error::Result;

/// One call-like token observed inside a symbol's body
#[derive(Debug, Clone, PartialEq)]
pub struct RawCall {
    /// The called identifier text
    pub name: String,
    /// 1-based source line of the call site
    pub line: usize,
}

/// A symbol straight out of extraction, before contract binding and
/// call resolution
#[derive(Debug, Clone)]
pub struct ExtractedSymbol {
    pub id: String,
    pub file: String,
    pub kind: SymbolKind,
    pub name: String,
    pub class_name: Option<String>,
    pub exported: bool,
    /// Raw parameter-list text between the header parentheses
    pub raw_params: String,
    /// 1-based (start, end) line range
    pub source_range: (usize, usize),
    /// Unresolved call sites found inside this symbol's body
    pub calls: Vec<RawCall>,
}

impl ExtractedSymbol {
    pub fn into_symbol(self, params_contract: Option<String>) -> Symbol {
        Symbol {
            id: self.id,
            file: self.file,
            kind: self.kind,
            name: self.name,
            class_name: self.class_name,
            exported: self.exported,
            params_contract,
            source_range: self.source_range,
        }
    }
}

/// Trait implemented once per surface syntax. Both variants share the
/// same output shapes so everything downstream is syntax-agnostic.
pub trait SyntaxExtractor {
    /// Extract all symbols (with their call sites) from one file's text.
    ///
    /// `file` is the root-relative path used to build symbol ids.
    /// Malformed declarations degrade to "no symbol for this line".
    fn extract(&self, content: &str, file: &str) -> Result<Vec<ExtractedSymbol>>;

    /// Extension appended to extensionless import targets
    fn canonical_extension(&self) -> &'static str;
}

/// Build the extractor for a surface syntax
pub fn extractor_for(syntax: Syntax) -> Box<dyn SyntaxExtractor + Send + Sync> {
    match syntax {
        Syntax::Braces => Box::new(BraceExtractor::new()),
        Syntax::Indent => Box::new(IndentExtractor::new()),
    }
}

static CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_$][A-Za-z0-9_$]*)\s*\(").unwrap());

/// Scan one line of body text for call-like tokens, discarding reserved
/// words so control-flow headers never register as calls.
pub(crate) fn scan_calls_in_line(
    text: &str,
    line_number: usize,
    reserved: &[&str],
    out: &mut Vec<RawCall>,
) {
    for cap in CALL_RE.captures_iter(text) {
        let name = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
        if name.is_empty() || reserved.contains(&name) {
            continue;
        }
        out.push(RawCall {
            name: name.to_string(),
            line: line_number,
        });
    }
}

/// Capture the text between a balanced parenthesis pair starting at
/// `(start_line, start_col)` (the opening paren itself). Respects nesting
/// and spans up to `max_lines` lines. Returns the inner text plus the
/// 0-based position just after the closing paren, or `None` when the
/// list is unterminated (the caller then emits no symbol).
pub(crate) fn capture_paren_span(
    lines: &[String],
    start_line: usize,
    start_col: usize,
    max_lines: usize,
) -> Option<(String, usize, usize)> {
    let mut depth = 0usize;
    let mut inner = String::new();
    let last = (start_line + max_lines).min(lines.len());

    for (row, line) in lines.iter().enumerate().take(last).skip(start_line) {
        let col_offset = if row == start_line { start_col } else { 0 };
        for (col, ch) in line.char_indices().skip_while(|(c, _)| *c < col_offset) {
            match ch {
                '(' => {
                    depth += 1;
                    if depth > 1 {
                        inner.push(ch);
                    }
                }
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((inner, row, col + 1));
                    }
                    inner.push(ch);
                }
                _ => {
                    if depth > 0 {
                        inner.push(ch);
                    }
                }
            }
        }
        if depth > 0 {
            inner.push(' ');
        }
    }

    None
}
