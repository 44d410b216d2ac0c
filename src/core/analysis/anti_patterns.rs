//! Threshold-based anti-pattern detectors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::core::ir::{CallEdge, Contract, Symbol};

use super::cycles::Cycle;

/// How many callees to report as god-function evidence
const TOP_CALLEES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalleeCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GodFunctionFinding {
    pub id: String,
    pub total_calls: usize,
    pub distinct_callees: usize,
    /// Most frequent callee names, as supporting evidence
    pub top_callees: Vec<CalleeCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongParameterListFinding {
    pub id: String,
    pub contract_id: String,
    pub property_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotgunSurgeryFinding {
    pub id: String,
    pub afferent: usize,
}

/// The four anti-pattern finding categories
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AntiPatterns {
    pub god_functions: Vec<GodFunctionFinding>,
    pub long_parameter_lists: Vec<LongParameterListFinding>,
    pub shotgun_surgery: Vec<ShotgunSurgeryFinding>,
    pub cycles: Vec<Cycle>,
}

pub fn detect_anti_patterns(
    nodes: &[&Symbol],
    calls: &[CallEdge],
    contracts: &[Contract],
    afferent_by_id: &HashMap<String, usize>,
    cycles: Vec<Cycle>,
    config: &AnalysisConfig,
) -> AntiPatterns {
    AntiPatterns {
        god_functions: detect_god_functions(nodes, calls, config),
        long_parameter_lists: detect_long_parameter_lists(nodes, contracts, config),
        shotgun_surgery: detect_shotgun_surgery(nodes, afferent_by_id, config),
        cycles,
    }
}

/// A symbol calling out both often and widely. Both thresholds must hold.
fn detect_god_functions(
    nodes: &[&Symbol],
    calls: &[CallEdge],
    config: &AnalysisConfig,
) -> Vec<GodFunctionFinding> {
    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for call in calls {
        outgoing.entry(call.frm.as_str()).or_default().push(call.name.as_str());
    }

    let mut findings = Vec::new();
    for node in nodes {
        let callees = match outgoing.get(node.id.as_str()) {
            Some(c) => c,
            None => continue,
        };
        let total_calls = callees.len();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for &name in callees {
            *counts.entry(name).or_default() += 1;
        }
        let distinct = counts.len();

        if total_calls >= config.god_function_calls && distinct >= config.god_function_callees {
            let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
            findings.push(GodFunctionFinding {
                id: node.id.clone(),
                total_calls,
                distinct_callees: distinct,
                top_callees: ranked
                    .into_iter()
                    .take(TOP_CALLEES)
                    .map(|(name, count)| CalleeCount { name: name.to_string(), count })
                    .collect(),
            });
        }
    }
    findings
}

fn detect_long_parameter_lists(
    nodes: &[&Symbol],
    contracts: &[Contract],
    config: &AnalysisConfig,
) -> Vec<LongParameterListFinding> {
    let prop_counts: HashMap<&str, usize> = contracts
        .iter()
        .map(|c| (c.id.as_str(), c.props.len()))
        .collect();

    nodes
        .iter()
        .filter_map(|node| {
            let contract_id = node.params_contract.as_deref()?;
            let count = *prop_counts.get(contract_id)?;
            if count >= config.long_parameter_list {
                Some(LongParameterListFinding {
                    id: node.id.clone(),
                    contract_id: contract_id.to_string(),
                    property_count: count,
                })
            } else {
                None
            }
        })
        .collect()
}

/// High fan-in: changing this symbol risks edits across many callers
fn detect_shotgun_surgery(
    nodes: &[&Symbol],
    afferent_by_id: &HashMap<String, usize>,
    config: &AnalysisConfig,
) -> Vec<ShotgunSurgeryFinding> {
    nodes
        .iter()
        .filter_map(|node| {
            let afferent = afferent_by_id.get(&node.id).copied().unwrap_or(0);
            if afferent >= config.shotgun_surgery_fan_in {
                Some(ShotgunSurgeryFinding { id: node.id.clone(), afferent })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ir::SymbolKind;

    fn symbol(id: &str, contract: Option<&str>) -> Symbol {
        Symbol {
            id: id.to_string(),
            file: "a.ts".to_string(),
            kind: SymbolKind::Function,
            name: "f".to_string(),
            class_name: None,
            exported: true,
            params_contract: contract.map(String::from),
            source_range: (1, 1),
        }
    }

    fn calls_from(frm: &str, names: &[&str]) -> Vec<CallEdge> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| CallEdge {
                frm: frm.to_string(),
                to: String::new(),
                name: name.to_string(),
                line: i + 1,
            })
            .collect()
    }

    #[test]
    fn god_function_boundary_flags_at_exactly_both_thresholds() {
        let config = AnalysisConfig::default();
        let sym = symbol("a::busy", None);
        let nodes = vec![&sym];

        // Exactly 10 calls across exactly 8 distinct callees
        let names = ["c1", "c2", "c3", "c4", "c5", "c6", "c7", "c8", "c1", "c2"];
        let findings = detect_god_functions(&nodes, &calls_from("a::busy", &names), &config);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].total_calls, 10);
        assert_eq!(findings[0].distinct_callees, 8);
        assert_eq!(findings[0].top_callees[0].count, 2);
    }

    #[test]
    fn god_function_below_call_threshold_is_not_flagged() {
        let config = AnalysisConfig::default();
        let sym = symbol("a::busy", None);
        let nodes = vec![&sym];

        // 9 calls to 8 distinct callees: call threshold not met
        let names = ["c1", "c2", "c3", "c4", "c5", "c6", "c7", "c8", "c1"];
        assert!(detect_god_functions(&nodes, &calls_from("a::busy", &names), &config).is_empty());
    }

    #[test]
    fn god_function_below_distinct_threshold_is_not_flagged() {
        let config = AnalysisConfig::default();
        let sym = symbol("a::busy", None);
        let nodes = vec![&sym];

        // 10 calls but only 7 distinct callees
        let names = ["c1", "c2", "c3", "c4", "c5", "c6", "c7", "c1", "c2", "c3"];
        assert!(detect_god_functions(&nodes, &calls_from("a::busy", &names), &config).is_empty());
    }

    #[test]
    fn long_parameter_list_flags_at_six_props() {
        let config = AnalysisConfig::default();
        let contract = Contract {
            id: "wide_params".to_string(),
            kind: "params".to_string(),
            props: (0..6)
                .map(|i| crate::core::ir::ContractProp {
                    name: format!("p{}", i),
                    raw_type: String::new(),
                })
                .collect(),
        };
        let sym = symbol("a::wide", Some("wide_params"));
        let findings = detect_long_parameter_lists(&[&sym], &[contract], &config);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].property_count, 6);
    }

    #[test]
    fn shotgun_surgery_uses_afferent_threshold() {
        let config = AnalysisConfig::default();
        let hot = symbol("a::hot", None);
        let cool = symbol("a::cool", None);
        let mut afferent = HashMap::new();
        afferent.insert("a::hot".to_string(), 8usize);
        afferent.insert("a::cool".to_string(), 7usize);

        let findings = detect_shotgun_surgery(&[&hot, &cool], &afferent, &config);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, "a::hot");
    }
}
