//! Extractor for the indentation-delimited, dynamically-typed surface syntax.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{capture_paren_span, scan_calls_in_line, ExtractedSymbol, RawCall, SyntaxExtractor};
use crate::core::ir::{Symbol, SymbolKind};
use crate::error::Result;

static RESERVED: &[&str] = &[
    "if", "elif", "else", "for", "while", "def", "class", "return", "lambda", "with", "try",
    "except", "finally", "raise", "assert", "yield", "del", "not", "and", "or", "in", "is",
    "import", "from", "pass", "global", "nonlocal", "await", "async",
];

static DEF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)(?:async\s+)?def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());

static CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)class\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());

const MAX_PARAM_LINES: usize = 20;

pub struct IndentExtractor;

struct ClassContext {
    name: String,
    indent: usize,
    end_row: usize,
}

impl IndentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Blank `#` comments line-by-line, preserving line numbers
    fn blank_comments(content: &str) -> Vec<String> {
        content
            .lines()
            .map(|line| match line.find('#') {
                Some(pos) => line[..pos].to_string(),
                None => line.to_string(),
            })
            .collect()
    }

    fn indent_width(line: &str) -> usize {
        line.chars().take_while(|c| c.is_whitespace()).count()
    }

    /// Last line of the suite started at `header_row`: every following
    /// line indented deeper than the header belongs to the body; the
    /// suite ends at the last non-blank such line.
    fn suite_extent(lines: &[String], header_row: usize, header_indent: usize) -> usize {
        let mut end = header_row;
        for (r, line) in lines.iter().enumerate().skip(header_row + 1) {
            if line.trim().is_empty() {
                continue;
            }
            if Self::indent_width(line) <= header_indent {
                break;
            }
            end = r;
        }
        end
    }

    fn scan_body(
        lines: &[String],
        start_row: usize,
        end_row: usize,
        header_tail: Option<(usize, usize)>,
        calls: &mut Vec<RawCall>,
    ) {
        for (r, line) in lines.iter().enumerate().take(end_row + 1).skip(start_row) {
            if let Some((hr, hc)) = header_tail {
                if r < hr {
                    continue;
                }
                if r == hr {
                    scan_calls_in_line(line.get(hc..).unwrap_or(""), r + 1, RESERVED, calls);
                    continue;
                }
            }
            if DEF_RE.is_match(line) || CLASS_RE.is_match(line) {
                continue;
            }
            scan_calls_in_line(line, r + 1, RESERVED, calls);
        }
    }
}

impl SyntaxExtractor for IndentExtractor {
    fn extract(&self, content: &str, file: &str) -> Result<Vec<ExtractedSymbol>> {
        let lines = Self::blank_comments(content);
        let mut symbols = Vec::new();
        let mut classes: Vec<ClassContext> = Vec::new();

        for row in 0..lines.len() {
            let line = &lines[row];

            if let Some(caps) = CLASS_RE.captures(line) {
                let indent = caps[1].chars().count();
                let name = caps[2].to_string();
                let end_row = Self::suite_extent(&lines, row, indent);

                symbols.push(ExtractedSymbol {
                    id: Symbol::make_id(file, &name, None),
                    file: file.to_string(),
                    kind: SymbolKind::Class,
                    name: name.clone(),
                    class_name: None,
                    exported: !name.starts_with('_'),
                    raw_params: String::new(),
                    source_range: (row + 1, end_row + 1),
                    calls: Vec::new(),
                });
                classes.push(ClassContext { name, indent, end_row });
                continue;
            }

            let caps = match DEF_RE.captures(line) {
                Some(c) => c,
                None => continue,
            };
            let indent = caps[1].chars().count();
            let name = caps[2].to_string();
            let open = caps.get(0).unwrap().end() - 1;

            let (raw_params, close_row, close_col) =
                match capture_paren_span(&lines, row, open, MAX_PARAM_LINES) {
                    Some(span) => span,
                    None => continue, // unterminated parameter list
                };
            let end_row = Self::suite_extent(&lines, close_row, indent);

            // Innermost enclosing class suite makes this a method
            let owner = classes
                .iter()
                .filter(|c| row > 0 && row <= c.end_row && c.indent < indent)
                .last();

            let mut calls = Vec::new();
            Self::scan_body(&lines, close_row, end_row, Some((close_row, close_col)), &mut calls);

            // Drop the conventional receiver argument from the contract
            let raw_params = match owner {
                Some(_) => {
                    let trimmed = raw_params.trim();
                    let (first, rest) = match trimmed.split_once(',') {
                        Some((f, r)) => (f.trim(), Some(r)),
                        None => (trimmed, None),
                    };
                    if first == "self" || first == "cls" {
                        rest.map(|r| r.trim().to_string()).unwrap_or_default()
                    } else {
                        raw_params
                    }
                }
                None => raw_params,
            };

            symbols.push(ExtractedSymbol {
                id: Symbol::make_id(file, &name, owner.map(|c| c.name.as_str())),
                file: file.to_string(),
                kind: if owner.is_some() { SymbolKind::Method } else { SymbolKind::Function },
                name: name.clone(),
                class_name: owner.map(|c| c.name.clone()),
                exported: !name.starts_with('_'),
                raw_params,
                source_range: (row + 1, end_row + 1),
                calls,
            });
        }

        Ok(symbols)
    }

    fn canonical_extension(&self) -> &'static str {
        "py"
    }
}

impl Default for IndentExtractor {
    fn default() -> Self {
        Self::new()
    }
}
