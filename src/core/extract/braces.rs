//! Extractor for the brace-delimited, optionally-typed surface syntax.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{capture_paren_span, scan_calls_in_line, ExtractedSymbol, RawCall, SyntaxExtractor};
use crate::core::ir::{Symbol, SymbolKind};
use crate::error::Result;

/// Keywords and control-flow names that must never register as calls
static RESERVED: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "catch", "try", "finally", "return", "throw",
    "new", "typeof", "instanceof", "delete", "void", "in", "of", "function", "class", "await",
    "async", "yield", "super", "this",
];

static FN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][A-Za-z0-9_$]*)\s*\(").unwrap()
});

static CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][A-Za-z0-9_$]*)").unwrap()
});

static ARROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(export\s+)?const\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*=\s*(?:async\s*)?\(").unwrap()
});

static METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:(?:public|private|protected|static|async|get|set|override)\s+)*([A-Za-z_$][A-Za-z0-9_$]*)\s*\(").unwrap()
});

/// How many lines a parameter list may span before it counts as malformed
const MAX_PARAM_LINES: usize = 20;

/// How many lines past the header the opening brace may appear
const MAX_BRACE_LOOKAHEAD: usize = 3;

pub struct BraceExtractor;

impl BraceExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Blank out line and block comments, preserving line numbers, so
    /// commented-out declarations and calls are never extracted.
    fn blank_comments(content: &str) -> Vec<String> {
        let mut in_block = false;
        let mut out = Vec::new();

        for line in content.lines() {
            let mut kept = String::with_capacity(line.len());
            let chars: Vec<char> = line.chars().collect();
            let mut i = 0;

            while i < chars.len() {
                if in_block {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        in_block = false;
                        i += 2;
                    } else {
                        i += 1;
                    }
                } else if chars[i] == '/' && chars.get(i + 1) == Some(&'/') {
                    break;
                } else if chars[i] == '/' && chars.get(i + 1) == Some(&'*') {
                    in_block = true;
                    i += 2;
                } else {
                    kept.push(chars[i]);
                    i += 1;
                }
            }

            out.push(kept);
        }

        out
    }

    /// Find the extent of a brace-balanced body. Looks for the first `{`
    /// at or after `(row, col)` within a small lookahead, then counts
    /// braces until balance drops back to zero. An unterminated body is
    /// clamped to the last line rather than rejected.
    fn brace_extent(lines: &[String], row: usize, col: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut seen_open = false;
        let last_search = (row + MAX_BRACE_LOOKAHEAD + 1).min(lines.len());

        for (r, line) in lines.iter().enumerate().skip(row) {
            let start = if r == row { col } else { 0 };
            for (c, ch) in line.char_indices() {
                if c < start {
                    continue;
                }
                match ch {
                    '{' => {
                        seen_open = true;
                        depth += 1;
                    }
                    '}' => {
                        if seen_open {
                            depth = depth.saturating_sub(1);
                            if depth == 0 {
                                return Some(r);
                            }
                        }
                    }
                    _ => {}
                }
            }
            if !seen_open && r + 1 >= last_search {
                return None;
            }
        }

        if seen_open {
            Some(lines.len().saturating_sub(1))
        } else {
            None
        }
    }

    /// Scan body lines for calls, masking declaration headers so a nested
    /// function header never registers as a call to itself.
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
                    // Header line: only the text after the parameter list
                    // counts, so a declaration never calls itself
                    scan_calls_in_line(line.get(hc..).unwrap_or(""), r + 1, RESERVED, calls);
                    continue;
                }
            }
            // Nested declaration headers contribute no call sites
            if FN_RE.is_match(line) || ARROW_RE.is_match(line) || CLASS_RE.is_match(line) {
                continue;
            }
            scan_calls_in_line(line, r + 1, RESERVED, calls);
        }
    }

    fn extract_class(
        &self,
        lines: &[String],
        row: usize,
        file: &str,
        symbols: &mut Vec<ExtractedSymbol>,
    ) -> usize {
        let caps = match CLASS_RE.captures(&lines[row]) {
            Some(c) => c,
            None => return row + 1,
        };
        let exported = caps.get(1).is_some();
        let class_name = caps[2].to_string();
        let header_end = caps.get(0).map(|m| m.end()).unwrap_or(0);

        let end_row = match Self::brace_extent(lines, row, header_end) {
            Some(end) => end,
            None => return row + 1,
        };

        let mut method_rows: Vec<(usize, usize)> = Vec::new();
        let mut j = row + 1;
        while j <= end_row && j < lines.len() {
            let line = &lines[j];
            let caps = match METHOD_RE.captures(line) {
                Some(c) => c,
                None => {
                    j += 1;
                    continue;
                }
            };
            let name = caps[1].to_string();
            if RESERVED.contains(&name.as_str()) {
                j += 1;
                continue;
            }
            let open = match line[caps.get(1).unwrap().end()..].find('(') {
                Some(off) => caps.get(1).unwrap().end() + off,
                None => {
                    j += 1;
                    continue;
                }
            };
            let (raw_params, close_row, close_col) =
                match capture_paren_span(lines, j, open, MAX_PARAM_LINES) {
                    Some(span) => span,
                    None => {
                        j += 1;
                        continue;
                    }
                };
            let body_end = match Self::brace_extent(lines, close_row, close_col) {
                Some(end) => end,
                None => {
                    // Signature without a body (interface-style); not a symbol
                    j += 1;
                    continue;
                }
            };

            let mut calls = Vec::new();
            Self::scan_body(lines, close_row, body_end, Some((close_row, close_col)), &mut calls);

            symbols.push(ExtractedSymbol {
                id: Symbol::make_id(file, &name, Some(&class_name)),
                file: file.to_string(),
                kind: SymbolKind::Method,
                name,
                class_name: Some(class_name.clone()),
                exported,
                raw_params,
                source_range: (j + 1, body_end + 1),
                calls,
            });
            method_rows.push((j, body_end));
            j = body_end + 1;
        }

        // Class-body lines outside any method (field initializers etc.)
        // still belong to the class symbol's call scan
        let mut class_calls = Vec::new();
        for r in (row + 1)..=end_row.min(lines.len().saturating_sub(1)) {
            if method_rows.iter().any(|(s, e)| r >= *s && r <= *e) {
                continue;
            }
            Self::scan_body(lines, r, r, None, &mut class_calls);
        }

        symbols.push(ExtractedSymbol {
            id: Symbol::make_id(file, &class_name, None),
            file: file.to_string(),
            kind: SymbolKind::Class,
            name: class_name,
            class_name: None,
            exported,
            raw_params: String::new(),
            source_range: (row + 1, end_row + 1),
            calls: class_calls,
        });

        end_row + 1
    }

    fn extract_function(
        &self,
        lines: &[String],
        row: usize,
        file: &str,
        symbols: &mut Vec<ExtractedSymbol>,
    ) -> usize {
        let caps = match FN_RE.captures(&lines[row]) {
            Some(c) => c,
            None => return row + 1,
        };
        let exported = caps.get(1).is_some();
        let name = caps[2].to_string();
        let open = caps.get(0).unwrap().end() - 1;

        let (raw_params, close_row, close_col) =
            match capture_paren_span(lines, row, open, MAX_PARAM_LINES) {
                Some(span) => span,
                None => return row + 1, // unterminated parameter list
            };
        let body_end = match Self::brace_extent(lines, close_row, close_col) {
            Some(end) => end,
            None => return close_row + 1, // declaration without a body
        };

        let mut calls = Vec::new();
        Self::scan_body(lines, close_row, body_end, Some((close_row, close_col)), &mut calls);

        symbols.push(ExtractedSymbol {
            id: Symbol::make_id(file, &name, None),
            file: file.to_string(),
            kind: SymbolKind::Function,
            name,
            class_name: None,
            exported,
            raw_params,
            source_range: (row + 1, body_end + 1),
            calls,
        });

        body_end + 1
    }

    fn extract_arrow(
        &self,
        lines: &[String],
        row: usize,
        file: &str,
        symbols: &mut Vec<ExtractedSymbol>,
    ) -> usize {
        let caps = match ARROW_RE.captures(&lines[row]) {
            Some(c) => c,
            None => return row + 1,
        };
        let exported = caps.get(1).is_some();
        let name = caps[2].to_string();
        let open = caps.get(0).unwrap().end() - 1;

        let (raw_params, close_row, close_col) =
            match capture_paren_span(lines, row, open, MAX_PARAM_LINES) {
                Some(span) => span,
                None => return row + 1,
            };

        // Only treat this as a function binding when an arrow follows
        let tail = lines[close_row].get(close_col..).unwrap_or("");
        if !tail.trim_start().starts_with("=>")
            && !tail.trim_start().starts_with(":")
            && !tail.contains("=>")
        {
            return close_row + 1;
        }

        let body_end = match Self::brace_extent(lines, close_row, close_col) {
            // Expression-bodied arrow: the binding line is the whole body
            None => close_row,
            Some(end) => end,
        };

        let mut calls = Vec::new();
        Self::scan_body(lines, close_row, body_end, Some((close_row, close_col)), &mut calls);

        symbols.push(ExtractedSymbol {
            id: Symbol::make_id(file, &name, None),
            file: file.to_string(),
            kind: SymbolKind::Function,
            name,
            class_name: None,
            exported,
            raw_params,
            source_range: (row + 1, body_end + 1),
            calls,
        });

        body_end + 1
    }
}

impl SyntaxExtractor for BraceExtractor {
    fn extract(&self, content: &str, file: &str) -> Result<Vec<ExtractedSymbol>> {
        let lines = Self::blank_comments(content);
        let mut symbols = Vec::new();
        let mut row = 0;

        while row < lines.len() {
            let line = &lines[row];
            if CLASS_RE.is_match(line) {
                row = self.extract_class(&lines, row, file, &mut symbols);
            } else if FN_RE.is_match(line) {
                row = self.extract_function(&lines, row, file, &mut symbols);
            } else if ARROW_RE.is_match(line) {
                row = self.extract_arrow(&lines, row, file, &mut symbols);
            } else {
                row += 1;
            }
        }

        Ok(symbols)
    }

    fn canonical_extension(&self) -> &'static str {
        "ts"
    }
}

impl Default for BraceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(content: &str) -> Vec<ExtractedSymbol> {
        BraceExtractor::new().extract(content, "sample.ts").unwrap()
    }

    #[test]
    fn extracts_exported_function_with_calls() {
        let symbols = extract(
            "export function outer(a: number, b: string) {\n    helper(a);\n    other.format(b);\n}\n",
        );
        assert_eq!(symbols.len(), 1);
        let sym = &symbols[0];
        assert_eq!(sym.id, "sample::outer");
        assert_eq!(sym.kind, SymbolKind::Function);
        assert!(sym.exported);
        assert_eq!(sym.raw_params, "a: number, b: string");
        assert_eq!(sym.source_range, (1, 4));
        let names: Vec<&str> = sym.calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["helper", "format"]);
    }

    #[test]
    fn class_methods_carry_class_name() {
        let src = "export class Greeter {\n    greet(name: string) {\n        format(name);\n    }\n    _hidden() {\n        cleanup();\n    }\n}\n";
        let symbols = extract(src);
        let method = symbols.iter().find(|s| s.name == "greet").unwrap();
        assert_eq!(method.id, "sample::Greeter.greet");
        assert_eq!(method.class_name.as_deref(), Some("Greeter"));
        assert_eq!(method.kind, SymbolKind::Method);
        let class = symbols.iter().find(|s| s.name == "Greeter").unwrap();
        assert_eq!(class.kind, SymbolKind::Class);
        assert!(class.exported);
    }

    #[test]
    fn control_flow_never_registers_as_calls() {
        let symbols = extract(
            "function branchy(x) {\n    if (x) {\n        for (let i = 0; i < x; i++) {\n            work(i);\n        }\n    }\n    return x;\n}\n",
        );
        let names: Vec<&str> = symbols[0].calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["work"]);
    }

    #[test]
    fn commented_out_declarations_are_invisible() {
        let symbols = extract("// function ghost() { realCall(); }\nfunction real() {\n    live();\n}\n");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "real");
        assert!(symbols[0].calls.iter().all(|c| c.name != "realCall"));
    }

    #[test]
    fn block_comments_suppress_across_lines() {
        let symbols = extract("/*\nfunction ghost() {\n    phantom();\n}\n*/\nfunction real() {}\n");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "real");
    }

    #[test]
    fn unterminated_parameter_list_degrades_to_no_symbol() {
        let symbols = extract("function broken(a, b\n");
        assert!(symbols.is_empty());
    }

    #[test]
    fn arrow_const_binding_is_a_function() {
        let symbols = extract("export const sum = (a: number, b: number) => a + add(b);\n");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "sum");
        assert!(symbols[0].exported);
        assert_eq!(symbols[0].calls.len(), 1);
        assert_eq!(symbols[0].calls[0].name, "add");
    }

    #[test]
    fn extraction_is_idempotent() {
        let src = "export function a() {\n    b();\n}\nfunction b() {\n    c(1, 2);\n}\n";
        let first = extract(src);
        let second = extract(src);
        assert_eq!(first.len(), second.len());
        for (x, y) in first.iter().zip(second.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.calls, y.calls);
            assert_eq!(x.source_range, y.source_range);
        }
    }
}
