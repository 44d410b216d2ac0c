//! Connascence signals: five independent, threshold-based heuristics for
//! how separate pieces of code must agree to stay correct together.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::core::ir::{CallEdge, Contract, Symbol};

use super::anti_patterns::LongParameterListFinding;

/// Identifiers whose presence in a symbol's calls signals implicit
/// temporal coupling (deferred or interval scheduling)
static TIMER_CALLS: &[&str] = &[
    "setTimeout",
    "setInterval",
    "setImmediate",
    "requestAnimationFrame",
    "queueMicrotask",
    "sleep",
    "call_later",
    "call_soon",
    "after",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameSignal {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSignal {
    pub contract_id: String,
    pub prop_name: String,
    /// The literal masquerading as a type
    pub raw_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSignal {
    pub id: String,
    pub property_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmSignal {
    pub id: String,
    pub afferent: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSignal {
    pub id: String,
    pub timer_calls: Vec<String>,
}

/// All five categories; a symbol may appear under several at once
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connascence {
    pub name: Vec<NameSignal>,
    pub value: Vec<ValueSignal>,
    pub position: Vec<PositionSignal>,
    pub algorithm: Vec<AlgorithmSignal>,
    pub timing: Vec<TimingSignal>,
}

pub fn detect_connascence(
    nodes: &[&Symbol],
    calls: &[CallEdge],
    contracts: &[Contract],
    afferent_by_id: &HashMap<String, usize>,
    long_parameter_lists: &[LongParameterListFinding],
    config: &AnalysisConfig,
) -> Connascence {
    Connascence {
        name: name_signals(calls, config),
        value: value_signals(contracts),
        position: long_parameter_lists
            .iter()
            .map(|f| PositionSignal {
                id: f.id.clone(),
                property_count: f.property_count,
            })
            .collect(),
        algorithm: algorithm_signals(nodes, afferent_by_id, config),
        timing: timing_signals(nodes, calls),
    }
}

/// Names called often anywhere in the graph, resolution aside
fn name_signals(calls: &[CallEdge], config: &AnalysisConfig) -> Vec<NameSignal> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for call in calls {
        *counts.entry(call.name.as_str()).or_default() += 1;
    }

    let mut signals: Vec<NameSignal> = counts
        .into_iter()
        .filter(|(_, count)| *count >= config.connascence_name_calls)
        .map(|(name, count)| NameSignal { name: name.to_string(), count })
        .collect();
    signals.sort_by(|a, b| b.count.cmp(&a.count).then(a.name.cmp(&b.name)));
    signals
}

/// Contract props whose "type" is a quoted string or numeric literal
fn value_signals(contracts: &[Contract]) -> Vec<ValueSignal> {
    let mut signals = Vec::new();
    for contract in contracts {
        for prop in &contract.props {
            if is_literal(&prop.raw_type) {
                signals.push(ValueSignal {
                    contract_id: contract.id.clone(),
                    prop_name: prop.name.clone(),
                    raw_type: prop.raw_type.clone(),
                });
            }
        }
    }
    signals
}

fn is_literal(raw_type: &str) -> bool {
    let t = raw_type.trim();
    if t.is_empty() {
        return false;
    }
    if (t.starts_with('"') && t.ends_with('"') && t.len() >= 2)
        || (t.starts_with('\'') && t.ends_with('\'') && t.len() >= 2)
    {
        return true;
    }
    t.strip_prefix('-').unwrap_or(t).chars().all(|c| c.is_ascii_digit() || c == '.')
        && t.chars().any(|c| c.is_ascii_digit())
}

fn algorithm_signals(
    nodes: &[&Symbol],
    afferent_by_id: &HashMap<String, usize>,
    config: &AnalysisConfig,
) -> Vec<AlgorithmSignal> {
    nodes
        .iter()
        .filter_map(|node| {
            let afferent = afferent_by_id.get(&node.id).copied().unwrap_or(0);
            if afferent >= config.connascence_algorithm_fan_in {
                Some(AlgorithmSignal { id: node.id.clone(), afferent })
            } else {
                None
            }
        })
        .collect()
}

fn timing_signals(nodes: &[&Symbol], calls: &[CallEdge]) -> Vec<TimingSignal> {
    let mut timers_by_frm: HashMap<&str, Vec<String>> = HashMap::new();
    for call in calls {
        if TIMER_CALLS.contains(&call.name.as_str()) {
            let timers = timers_by_frm.entry(call.frm.as_str()).or_default();
            if !timers.contains(&call.name) {
                timers.push(call.name.clone());
            }
        }
    }

    nodes
        .iter()
        .filter_map(|node| {
            timers_by_frm.remove(node.id.as_str()).map(|timer_calls| TimingSignal {
                id: node.id.clone(),
                timer_calls,
            })
        })
        .collect()
}
