//! Call-chain sequence synthesis.
//!
//! For every exported symbol, a depth-bounded DFS over the resolved call
//! graph emits an ordered list of beats for downstream visualization.
//! Every exported symbol yields at least one beat: symbols with no
//! resolved calls get a single synthetic no-op, which downstream
//! consumers rely on.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::ir::{CallEdge, Contract, Ir};
use crate::core::walker::Deadline;
use crate::error::Result;

/// One step of a synthesized call chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    /// 1-based position in the sequence
    pub beat: usize,
    /// `call:<name>`, or `noop` for the synthetic placeholder
    pub event: String,
    pub handler: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub beats: Vec<Beat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceEntry {
    pub movements: Vec<Movement>,
}

/// The sequence artifact consumed by diagram generators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceArtifact {
    pub generated_at: String,
    pub contracts: Vec<Contract>,
    /// Keyed by sanitized symbol id
    pub sequences: BTreeMap<String, SequenceEntry>,
}

pub struct SequenceSynthesizer {
    max_depth: usize,
}

impl SequenceSynthesizer {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn synthesize(&self, ir: &Ir, deadline: &Deadline) -> Result<SequenceArtifact> {
        // One caller-keyed index, reused for every traversal
        let mut calls_by_frm: HashMap<&str, Vec<&CallEdge>> = HashMap::new();
        for call in &ir.calls {
            calls_by_frm.entry(call.frm.as_str()).or_default().push(call);
        }

        let mut sequences = BTreeMap::new();
        for symbol in ir.symbols.iter().filter(|s| s.exported) {
            deadline.check()?;

            let mut beats = Vec::new();
            let mut visited = HashSet::new();
            let mut emitted = HashSet::new();
            visited.insert(symbol.id.as_str());
            self.trace(
                &symbol.id,
                0,
                &calls_by_frm,
                &mut visited,
                &mut emitted,
                &mut beats,
                deadline,
            )?;

            if beats.is_empty() {
                beats.push(Beat {
                    beat: 1,
                    event: "noop".to_string(),
                    handler: symbol.name.clone(),
                });
            }

            sequences.insert(
                sanitize_id(&symbol.id),
                SequenceEntry { movements: vec![Movement { beats }] },
            );
        }

        Ok(SequenceArtifact {
            generated_at: chrono::Utc::now().to_rfc3339(),
            contracts: ir.contracts.clone(),
            sequences,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn trace<'a>(
        &self,
        frm: &'a str,
        depth: usize,
        calls_by_frm: &HashMap<&'a str, Vec<&'a CallEdge>>,
        visited: &mut HashSet<&'a str>,
        emitted: &mut HashSet<(&'a str, &'a str, usize)>,
        beats: &mut Vec<Beat>,
        deadline: &Deadline,
    ) -> Result<()> {
        deadline.check()?;

        let edges = match calls_by_frm.get(frm) {
            Some(edges) => edges,
            None => return Ok(()),
        };

        for edge in edges {
            // Unresolved calls carry no beat; a symbol whose calls all
            // fail to resolve falls back to the synthetic no-op
            if !edge.is_resolved() {
                continue;
            }
            // The same call expression is never emitted twice, even when
            // reached over multiple DFS paths
            if !emitted.insert((edge.frm.as_str(), edge.name.as_str(), edge.line)) {
                continue;
            }
            beats.push(Beat {
                beat: beats.len() + 1,
                event: format!("call:{}", edge.name),
                handler: edge.name.clone(),
            });

            if depth + 1 < self.max_depth && visited.insert(edge.to.as_str()) {
                self.trace(
                    edge.to.as_str(),
                    depth + 1,
                    calls_by_frm,
                    visited,
                    emitted,
                    beats,
                    deadline,
                )?;
            }
        }

        Ok(())
    }
}

/// Downstream tooling keys sequences by a filesystem-safe symbol id
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ir::{Symbol, SymbolKind};

    fn symbol(id: &str, exported: bool) -> Symbol {
        Symbol {
            id: id.to_string(),
            file: "a.ts".to_string(),
            kind: SymbolKind::Function,
            name: id.rsplit("::").next().unwrap().to_string(),
            class_name: None,
            exported,
            params_contract: None,
            source_range: (1, 3),
        }
    }

    fn call(frm: &str, to: &str, name: &str, line: usize) -> CallEdge {
        CallEdge {
            frm: frm.to_string(),
            to: to.to_string(),
            name: name.to_string(),
            line,
        }
    }

    fn synthesize(ir: &Ir, max_depth: usize) -> SequenceArtifact {
        SequenceSynthesizer::new(max_depth)
            .synthesize(ir, &Deadline::new(None))
            .unwrap()
    }

    #[test]
    fn exported_symbol_without_calls_gets_a_noop_beat() {
        let ir = Ir {
            files: vec!["a.ts".to_string()],
            symbols: vec![symbol("a::idle", true)],
            calls: vec![],
            contracts: vec![],
        };
        let artifact = synthesize(&ir, 3);
        let entry = &artifact.sequences["a__idle"];
        let beats = &entry.movements[0].beats;
        assert_eq!(beats.len(), 1);
        assert_eq!(beats[0].event, "noop");
        assert_eq!(beats[0].handler, "idle");
        assert_eq!(beats[0].beat, 1);
    }

    #[test]
    fn unresolved_only_calls_fall_back_to_the_noop_beat() {
        let ir = Ir {
            files: vec!["a.ts".to_string()],
            symbols: vec![symbol("a::lonely", true)],
            calls: vec![call("a::lonely", "", "phantom", 2)],
            contracts: vec![],
        };
        let artifact = synthesize(&ir, 3);
        let beats = &artifact.sequences["a__lonely"].movements[0].beats;
        assert_eq!(beats.len(), 1);
        assert_eq!(beats[0].event, "noop");
        assert_eq!(beats[0].handler, "lonely");
    }

    #[test]
    fn unresolved_calls_emit_no_beats_among_resolved_ones() {
        let ir = Ir {
            files: vec!["a.ts".to_string()],
            symbols: vec![symbol("a::outer", true), symbol("a::mid", false)],
            calls: vec![
                call("a::outer", "", "mystery", 1),
                call("a::outer", "a::mid", "mid", 2),
            ],
            contracts: vec![],
        };
        let beats = &synthesize(&ir, 3).sequences["a__outer"].movements[0].beats;
        let events: Vec<&str> = beats.iter().map(|b| b.event.as_str()).collect();
        assert_eq!(events, vec!["call:mid"]);
    }

    #[test]
    fn chains_follow_resolved_edges_in_order() {
        let ir = Ir {
            files: vec!["a.ts".to_string()],
            symbols: vec![
                symbol("a::outer", true),
                symbol("a::mid", false),
                symbol("a::leaf", false),
            ],
            calls: vec![
                call("a::outer", "a::mid", "mid", 2),
                call("a::mid", "a::leaf", "leaf", 5),
            ],
            contracts: vec![],
        };
        let artifact = synthesize(&ir, 3);
        assert_eq!(artifact.sequences.len(), 1, "only exported symbols get sequences");
        let beats = &artifact.sequences["a__outer"].movements[0].beats;
        let events: Vec<&str> = beats.iter().map(|b| b.event.as_str()).collect();
        assert_eq!(events, vec!["call:mid", "call:leaf"]);
        assert_eq!(beats[1].beat, 2);
    }

    #[test]
    fn depth_cap_halts_recursion() {
        let ir = Ir {
            files: vec!["a.ts".to_string()],
            symbols: vec![
                symbol("a::l0", true),
                symbol("a::l1", false),
                symbol("a::l2", false),
                symbol("a::l3", false),
            ],
            calls: vec![
                call("a::l0", "a::l1", "l1", 1),
                call("a::l1", "a::l2", "l2", 2),
                call("a::l2", "a::l3", "l3", 3),
            ],
            contracts: vec![],
        };
        // max_depth 2: edges at depth 0 and 1 only
        let beats = &synthesize(&ir, 2).sequences["a__l0"].movements[0].beats;
        let events: Vec<&str> = beats.iter().map(|b| b.event.as_str()).collect();
        assert_eq!(events, vec!["call:l1", "call:l2"]);
    }

    #[test]
    fn cycles_do_not_recurse_forever() {
        let ir = Ir {
            files: vec!["a.ts".to_string()],
            symbols: vec![symbol("a::ping", true), symbol("a::pong", false)],
            calls: vec![
                call("a::ping", "a::pong", "pong", 1),
                call("a::pong", "a::ping", "ping", 2),
            ],
            contracts: vec![],
        };
        let beats = &synthesize(&ir, 10).sequences["a__ping"].movements[0].beats;
        let events: Vec<&str> = beats.iter().map(|b| b.event.as_str()).collect();
        // pong's call back into ping is emitted, but ping is not re-entered
        assert_eq!(events, vec!["call:pong", "call:ping"]);
    }

    #[test]
    fn duplicate_paths_emit_each_call_site_once() {
        let ir = Ir {
            files: vec!["a.ts".to_string()],
            symbols: vec![
                symbol("a::root", true),
                symbol("a::left", false),
                symbol("a::right", false),
                symbol("a::shared", false),
            ],
            calls: vec![
                call("a::root", "a::left", "left", 1),
                call("a::root", "a::right", "right", 2),
                call("a::left", "a::shared", "shared", 4),
                call("a::right", "a::shared", "shared", 4),
            ],
            contracts: vec![],
        };
        let beats = &synthesize(&ir, 5).sequences["a__root"].movements[0].beats;
        // The two shared() call sites are distinct (frm differs), so both
        // appear; each individual site appears exactly once
        let shared = beats.iter().filter(|b| b.event == "call:shared").count();
        assert_eq!(shared, 2);
        assert_eq!(beats.len(), 4);
    }

    #[test]
    fn sanitized_ids_are_filesystem_safe() {
        assert_eq!(sanitize_id("models::User.save"), "models__User_save");
    }
}
