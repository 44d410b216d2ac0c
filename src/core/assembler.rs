//! Aggregates per-file extraction output into one canonical IR bundle.
//!
//! This is the hard ordering barrier of the pipeline: call resolution
//! needs the complete symbol table, so assembly runs only after every
//! file has been extracted.

use std::collections::HashMap;

use tracing::warn;

use crate::core::contracts::ContractBuilder;
use crate::core::extract::ExtractedSymbol;
use crate::core::ir::{CallEdge, Ir, Symbol};
use crate::core::resolver::{resolve_call, SymbolTable};

/// Everything extracted from one source file, in walk order
pub struct FileExtraction {
    /// Root-relative path
    pub file: String,
    pub symbols: Vec<ExtractedSymbol>,
    /// Local import binding → resolved root-relative path
    pub imports: HashMap<String, String>,
}

/// Two files whose basenames collide produced the same symbol id.
/// Both symbols are kept (analyzer dedup keeps the first), but the
/// collision is surfaced because it degrades resolver correctness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdCollision {
    pub id: String,
    pub first: String,
    pub second: String,
}

/// Build the IR from per-file extractions. Also returns the id
/// collisions found, for the engine to log or escalate.
pub fn assemble(extractions: Vec<FileExtraction>) -> (Ir, Vec<IdCollision>) {
    let mut files = Vec::new();
    let mut symbols: Vec<Symbol> = Vec::new();
    let mut contracts = ContractBuilder::new();
    let mut collisions = Vec::new();
    let mut seen_ids: HashMap<String, String> = HashMap::new();

    // Per-caller raw calls, kept until the full symbol table exists
    let mut pending_calls: Vec<(String, String, Vec<crate::core::extract::RawCall>)> = Vec::new();

    for extraction in &extractions {
        files.push(extraction.file.clone());

        for extracted in &extraction.symbols {
            match seen_ids.get(&extracted.id) {
                Some(first_file) if first_file != &extracted.file => {
                    let collision = IdCollision {
                        id: extracted.id.clone(),
                        first: first_file.clone(),
                        second: extracted.file.clone(),
                    };
                    warn!(
                        "Symbol id collision: {} declared in both {} and {}",
                        collision.id, collision.first, collision.second
                    );
                    collisions.push(collision);
                }
                Some(_) => {}
                None => {
                    seen_ids.insert(extracted.id.clone(), extracted.file.clone());
                }
            }

            let contract_id = contracts.bind(&extracted.name, &extracted.raw_params);
            pending_calls.push((
                extracted.id.clone(),
                extracted.file.clone(),
                extracted.calls.clone(),
            ));
            symbols.push(extracted.clone().into_symbol(contract_id));
        }
    }

    let table = SymbolTable::build(&symbols);
    let import_maps: HashMap<&str, &HashMap<String, String>> = extractions
        .iter()
        .map(|e| (e.file.as_str(), &e.imports))
        .collect();

    let mut calls = Vec::new();
    let empty = HashMap::new();
    for (frm, caller_file, raw_calls) in pending_calls {
        let imports = import_maps.get(caller_file.as_str()).copied().unwrap_or(&empty);
        for raw in raw_calls {
            let to = resolve_call(&table, imports, &caller_file, &raw.name);
            calls.push(CallEdge {
                frm: frm.clone(),
                to,
                name: raw.name,
                line: raw.line,
            });
        }
    }

    let ir = Ir {
        files,
        symbols,
        calls,
        contracts: contracts.into_contracts(),
    };
    (ir, collisions)
}
