//! Afferent/efferent coupling metrics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::ir::{CallEdge, Symbol};

/// Per-symbol dependency metrics over resolved edges only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingRecord {
    /// Fan-in: resolved calls targeting this symbol
    pub afferent: usize,
    /// Fan-out: resolved calls leaving this symbol
    pub efferent: usize,
    /// efferent / (afferent + efferent); 0.0 when isolated
    pub instability: f64,
}

/// Compute coupling for a deduplicated node set. Keys come back in
/// BTreeMap order so the serialized artifact is stable.
pub fn compute_coupling(nodes: &[&Symbol], calls: &[CallEdge]) -> BTreeMap<String, CouplingRecord> {
    let mut afferent: BTreeMap<&str, usize> = BTreeMap::new();
    let mut efferent: BTreeMap<&str, usize> = BTreeMap::new();

    for call in calls.iter().filter(|c| c.is_resolved()) {
        *efferent.entry(call.frm.as_str()).or_default() += 1;
        *afferent.entry(call.to.as_str()).or_default() += 1;
    }

    nodes
        .iter()
        .map(|node| {
            let fan_in = afferent.get(node.id.as_str()).copied().unwrap_or(0);
            let fan_out = efferent.get(node.id.as_str()).copied().unwrap_or(0);
            let total = fan_in + fan_out;
            let instability = if total == 0 {
                0.0
            } else {
                fan_out as f64 / total as f64
            };
            (
                node.id.clone(),
                CouplingRecord {
                    afferent: fan_in,
                    efferent: fan_out,
                    instability,
                },
            )
        })
        .collect()
}
