//! Parameter-list normalization and contract deduplication.
//!
//! Raw parameter text is split on top-level commas only (a bracket-depth
//! counter keeps generic arguments, callback signatures, and destructured
//! types intact), then each parameter is separated into name, annotation,
//! and default. Annotations are whitespace-normalized but never parsed
//! further; this layer deliberately has no type-system understanding.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::ir::{Contract, ContractProp};

static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\.\.\.)?\s*\*{0,2}([A-Za-z_$][A-Za-z0-9_$]*)\s*\??\s*$").unwrap()
});

static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Split parameter text on commas at bracket depth zero
pub fn split_top_level(params: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut current = String::new();

    for ch in params.chars() {
        match ch {
            '<' | '(' | '[' | '{' => {
                depth += 1;
                current.push(ch);
            }
            '>' | ')' | ']' | '}' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth <= 0 => {
                parts.push(current.clone());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }

    parts
}

/// Parse a raw parameter-list substring into ordered contract properties.
/// Parameters that don't look like `name[: type][= default]` (for example
/// destructured bindings without a name) are skipped rather than guessed.
pub fn parse_props(raw_params: &str) -> Vec<ContractProp> {
    let mut props = Vec::new();
    for part in split_top_level(raw_params) {
        // `name [: type] [= default]`; the default is stripped, with `=>`
        // kept apart from `=` so callback types survive
        let (declared, _default) = split_at_default(&part);
        let (name_part, type_part) = match find_top_level(declared, ':') {
            Some(pos) => (&declared[..pos], Some(&declared[pos + 1..])),
            None => (declared, None),
        };
        let name = match NAME_RE.captures(name_part.trim()) {
            Some(caps) => caps[1].to_string(),
            None => continue,
        };
        let raw_type = type_part
            .map(|t| WS_RE.replace_all(t.trim(), " ").to_string())
            .unwrap_or_default();
        props.push(ContractProp { name, raw_type });
    }
    props
}

/// Split off a default-value expression at the first top-level `=` that
/// is not part of `=>`, `==`, `<=`, or `>=`
fn split_at_default(part: &str) -> (&str, Option<&str>) {
    let chars: Vec<(usize, char)> = part.char_indices().collect();
    let mut depth: i32 = 0;
    for (i, &(byte, ch)) in chars.iter().enumerate() {
        match ch {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth -= 1,
            '=' if depth <= 0 => {
                let next = chars.get(i + 1).map(|&(_, c)| c);
                let prev = i.checked_sub(1).map(|p| chars[p].1);
                let fused = matches!(next, Some('>') | Some('='))
                    || matches!(prev, Some('=') | Some('<') | Some('>') | Some('!'));
                if !fused {
                    return (&part[..byte], Some(&part[byte + 1..]));
                }
            }
            _ => {}
        }
    }
    (part, None)
}

/// Byte offset of the first occurrence of `target` at bracket depth zero
fn find_top_level(text: &str, target: char) -> Option<usize> {
    let mut depth: i32 = 0;
    for (i, ch) in text.char_indices() {
        match ch {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth -= 1,
            c if c == target && depth <= 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Collects contracts across a whole extraction run, collapsing identical
/// normalized signatures under identical symbol names into one entry.
#[derive(Default)]
pub struct ContractBuilder {
    contracts: Vec<Contract>,
    index: HashMap<String, usize>,
}

impl ContractBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a symbol's raw parameter list, returning the contract id.
    /// Empty parameter lists bind no contract.
    pub fn bind(&mut self, symbol_name: &str, raw_params: &str) -> Option<String> {
        let props = parse_props(raw_params);
        if props.is_empty() {
            return None;
        }

        let id = contract_id(symbol_name, &props);
        if !self.index.contains_key(&id) {
            self.index.insert(id.clone(), self.contracts.len());
            self.contracts.push(Contract {
                id: id.clone(),
                kind: "params".to_string(),
                props,
            });
        }
        Some(id)
    }

    pub fn into_contracts(self) -> Vec<Contract> {
        self.contracts
    }
}

/// Deterministic contract id: owning symbol name plus a compacted
/// signature with type punctuation mapped to safe characters.
fn contract_id(symbol_name: &str, props: &[ContractProp]) -> String {
    let mut signature = String::new();
    for prop in props {
        signature.push('_');
        signature.push_str(&prop.name);
        if !prop.raw_type.is_empty() {
            signature.push('_');
            signature.push_str(&compact(&prop.raw_type));
        }
    }
    format!("{}_params{}", symbol_name, signature)
}

fn compact(raw_type: &str) -> String {
    let mut out = String::with_capacity(raw_type.len());
    let mut last_was_safe = true;
    for ch in raw_type.chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_was_safe = true;
        } else if last_was_safe {
            out.push('_');
            last_was_safe = false;
        }
    }
    out.trim_end_matches('_').to_string()
}
