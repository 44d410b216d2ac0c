//! Scope-aware call target resolution.
//!
//! Each call site gets a target symbol id using a fixed precedence:
//! same-file declaration, then the caller's import map, then a global
//! first-match fallback. Once a tier matches there is no backtracking;
//! the global tier can pick the wrong same-named symbol for genuinely
//! ambiguous names, which is the accepted trade-off for resolving calls
//! without a type or module system. An empty result is a first-class
//! terminal state, not an error.

use std::collections::HashMap;

use crate::core::ir::Symbol;

/// Symbol lookups by file and by bare name, built once per run.
///
/// First occurrence wins everywhere, so resolution order follows the
/// deterministic file-walk order.
pub struct SymbolTable {
    by_file: HashMap<String, HashMap<String, String>>,
    global: HashMap<String, String>,
}

impl SymbolTable {
    pub fn build(symbols: &[Symbol]) -> Self {
        let mut by_file: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut global: HashMap<String, String> = HashMap::new();

        for symbol in symbols {
            by_file
                .entry(symbol.file.clone())
                .or_default()
                .entry(symbol.name.clone())
                .or_insert_with(|| symbol.id.clone());
            global
                .entry(symbol.name.clone())
                .or_insert_with(|| symbol.id.clone());
        }

        Self { by_file, global }
    }

    fn in_file(&self, file: &str, name: &str) -> Option<&String> {
        self.by_file.get(file).and_then(|names| names.get(name))
    }
}

/// Resolve one call to a target symbol id; `""` when nothing matches.
pub fn resolve_call(
    table: &SymbolTable,
    imports: &HashMap<String, String>,
    caller_file: &str,
    call_name: &str,
) -> String {
    // Tier 1: a symbol with this name declared in the caller's own file
    if let Some(id) = table.in_file(caller_file, call_name) {
        return id.clone();
    }

    // Tier 2: the name is an import binding; look only inside the
    // imported file, with no fallback past this tier
    if let Some(imported_file) = imports.get(call_name) {
        return table
            .in_file(imported_file, call_name)
            .cloned()
            .unwrap_or_default();
    }

    // Tier 3: first symbol anywhere with a matching name
    table.global.get(call_name).cloned().unwrap_or_default()
}
