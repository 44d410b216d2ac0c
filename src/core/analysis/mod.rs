//! Graph analysis over the assembled IR.
//!
//! Rebuilds adjacency from the IR (which is read-only here), computes
//! coupling metrics and strongly-connected components, and runs the
//! anti-pattern and connascence detectors. Statistics are always
//! produced; an architecture-stage failure is caught and surfaced as an
//! `architecture_error` field instead of aborting the analysis.

mod anti_patterns;
mod connascence;
mod coupling;
mod cycles;

pub use anti_patterns::{
    AntiPatterns, CalleeCount, GodFunctionFinding, LongParameterListFinding,
    ShotgunSurgeryFinding,
};
pub use connascence::{
    AlgorithmSignal, Connascence, NameSignal, PositionSignal, TimingSignal, ValueSignal,
};
pub use coupling::CouplingRecord;
pub use cycles::{Cycle, CycleMember};

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::core::ir::{Ir, Symbol, SymbolKind};
use crate::error::{CallweaveError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallDistribution {
    pub resolved: usize,
    pub unresolved: usize,
    pub max_fan_out: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityStats {
    pub avg_calls_per_symbol: f64,
    pub max_fan_out: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageStats {
    /// Share of call edges with a resolved target
    pub resolved_ratio: f64,
    /// Share of symbols with a bound parameter contract
    pub contract_ratio: f64,
}

/// Base statistics, computable even when the architecture stage fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub files: usize,
    pub symbols: usize,
    pub calls: usize,
    pub contracts: usize,
    pub symbol_kinds: BTreeMap<String, usize>,
    pub call_distribution: CallDistribution,
    pub complexity: ComplexityStats,
    pub coverage: CoverageStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureSummary {
    pub analyzed_symbols: usize,
    pub resolved_edges: usize,
    pub cycles: usize,
    pub god_functions: usize,
    pub long_parameter_lists: usize,
    pub shotgun_surgery: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub summary: ArchitectureSummary,
    pub coupling: BTreeMap<String, CouplingRecord>,
    pub anti_patterns: AntiPatterns,
    pub connascence: Connascence,
}

/// The analysis artifact; `architecture_error` replaces `architecture`
/// when the architecture stage failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: String,
    pub statistics: Statistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<Architecture>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture_error: Option<String>,
}

pub struct GraphAnalyzer {
    config: AnalysisConfig,
}

impl GraphAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Analyze an IR bundle. Never fails outright: statistics are always
    /// present, and architecture failures degrade to a string field.
    pub fn analyze(&self, ir: &Ir) -> AnalysisReport {
        let statistics = compute_statistics(ir);

        let (architecture, architecture_error) = match self.analyze_architecture(ir) {
            Ok(architecture) => (Some(architecture), None),
            Err(e) => {
                debug!("Architecture analysis failed: {}", e);
                (None, Some(e.to_string()))
            }
        };

        AnalysisReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            statistics,
            architecture,
            architecture_error,
        }
    }

    fn analyze_architecture(&self, ir: &Ir) -> Result<Architecture> {
        let nodes = dedup_nodes(&ir.symbols);
        validate_edges(ir, &nodes)?;

        let coupling = coupling::compute_coupling(&nodes, &ir.calls);
        let afferent_by_id: HashMap<String, usize> = coupling
            .iter()
            .map(|(id, record)| (id.clone(), record.afferent))
            .collect();

        let cycles = cycles::find_cycles(&nodes, &ir.calls);
        let anti_patterns = anti_patterns::detect_anti_patterns(
            &nodes,
            &ir.calls,
            &ir.contracts,
            &afferent_by_id,
            cycles,
            &self.config,
        );
        let connascence = connascence::detect_connascence(
            &nodes,
            &ir.calls,
            &ir.contracts,
            &afferent_by_id,
            &anti_patterns.long_parameter_lists,
            &self.config,
        );

        let resolved_edges = ir.calls.iter().filter(|c| c.is_resolved()).count();
        let summary = ArchitectureSummary {
            analyzed_symbols: nodes.len(),
            resolved_edges,
            cycles: anti_patterns.cycles.len(),
            god_functions: anti_patterns.god_functions.len(),
            long_parameter_lists: anti_patterns.long_parameter_lists.len(),
            shotgun_surgery: anti_patterns.shotgun_surgery.len(),
        };

        Ok(Architecture { summary, coupling, anti_patterns, connascence })
    }
}

/// Keep only the first occurrence of each symbol id; guards against an
/// extractor emitting the same id twice
fn dedup_nodes(symbols: &[Symbol]) -> Vec<&Symbol> {
    let mut seen = HashSet::new();
    symbols
        .iter()
        .filter(|s| seen.insert(s.id.as_str()))
        .collect()
}

/// Structural sanity of the IR edge set: every resolved endpoint must be
/// a known symbol id
fn validate_edges(ir: &Ir, nodes: &[&Symbol]) -> Result<()> {
    let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    for call in &ir.calls {
        if !ids.contains(call.frm.as_str()) {
            return Err(CallweaveError::MalformedIr(format!(
                "call edge from unknown symbol id {:?}",
                call.frm
            )));
        }
        if call.is_resolved() && !ids.contains(call.to.as_str()) {
            return Err(CallweaveError::MalformedIr(format!(
                "call edge to unknown symbol id {:?}",
                call.to
            )));
        }
    }
    Ok(())
}

fn compute_statistics(ir: &Ir) -> Statistics {
    let mut symbol_kinds: BTreeMap<String, usize> = BTreeMap::new();
    for symbol in &ir.symbols {
        let kind = match symbol.kind {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
        };
        *symbol_kinds.entry(kind.to_string()).or_default() += 1;
    }

    let resolved = ir.calls.iter().filter(|c| c.is_resolved()).count();
    let unresolved = ir.calls.len() - resolved;

    let mut fan_out: HashMap<&str, usize> = HashMap::new();
    for call in &ir.calls {
        *fan_out.entry(call.frm.as_str()).or_default() += 1;
    }
    let max_fan_out = fan_out.values().copied().max().unwrap_or(0);

    let avg_calls_per_symbol = if ir.symbols.is_empty() {
        0.0
    } else {
        ir.calls.len() as f64 / ir.symbols.len() as f64
    };
    let resolved_ratio = if ir.calls.is_empty() {
        0.0
    } else {
        resolved as f64 / ir.calls.len() as f64
    };
    let contract_ratio = if ir.symbols.is_empty() {
        0.0
    } else {
        ir.symbols.iter().filter(|s| s.params_contract.is_some()).count() as f64
            / ir.symbols.len() as f64
    };

    Statistics {
        files: ir.files.len(),
        symbols: ir.symbols.len(),
        calls: ir.calls.len(),
        contracts: ir.contracts.len(),
        symbol_kinds,
        call_distribution: CallDistribution { resolved, unresolved, max_fan_out },
        complexity: ComplexityStats { avg_calls_per_symbol, max_fan_out },
        coverage: CoverageStats { resolved_ratio, contract_ratio },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ir::CallEdge;

    fn symbol(id: &str, kind: SymbolKind) -> Symbol {
        Symbol {
            id: id.to_string(),
            file: "a.ts".to_string(),
            kind,
            name: id.rsplit("::").next().unwrap().to_string(),
            class_name: None,
            exported: true,
            params_contract: None,
            source_range: (1, 4),
        }
    }

    fn call(frm: &str, to: &str, name: &str) -> CallEdge {
        CallEdge {
            frm: frm.to_string(),
            to: to.to_string(),
            name: name.to_string(),
            line: 2,
        }
    }

    fn fixture_ir() -> Ir {
        Ir {
            files: vec!["a.ts".to_string()],
            symbols: vec![
                symbol("a::f", SymbolKind::Function),
                symbol("a::g", SymbolKind::Function),
                symbol("a::C", SymbolKind::Class),
            ],
            calls: vec![
                call("a::f", "a::g", "g"),
                call("a::g", "", "mystery"),
            ],
            contracts: vec![],
        }
    }

    #[test]
    fn statistics_survive_architecture_failure() {
        let mut ir = fixture_ir();
        // Edge from a symbol id the IR does not declare
        ir.calls.push(call("ghost::nope", "a::f", "f"));

        let report = GraphAnalyzer::new(&AnalysisConfig::default()).analyze(&ir);
        assert!(report.architecture.is_none());
        let err = report.architecture_error.expect("error surfaced");
        assert!(err.contains("ghost::nope"));
        assert_eq!(report.statistics.symbols, 3);
        assert_eq!(report.statistics.files, 1);
    }

    #[test]
    fn healthy_ir_produces_full_architecture() {
        let report = GraphAnalyzer::new(&AnalysisConfig::default()).analyze(&fixture_ir());
        assert!(report.architecture_error.is_none());
        let architecture = report.architecture.unwrap();
        assert_eq!(architecture.summary.analyzed_symbols, 3);
        assert_eq!(architecture.summary.resolved_edges, 1);
        assert_eq!(architecture.coupling["a::f"].efferent, 1);
        assert_eq!(architecture.coupling["a::g"].afferent, 1);
    }

    #[test]
    fn duplicate_symbol_ids_keep_first_occurrence() {
        let mut ir = fixture_ir();
        let mut dup = symbol("a::f", SymbolKind::Method);
        dup.file = "other.ts".to_string();
        ir.symbols.push(dup);

        let report = GraphAnalyzer::new(&AnalysisConfig::default()).analyze(&ir);
        let architecture = report.architecture.unwrap();
        // Dedup: three unique ids, not four entries
        assert_eq!(architecture.summary.analyzed_symbols, 3);
        assert_eq!(architecture.coupling.len(), 3);
    }

    #[test]
    fn statistics_histogram_counts_kinds() {
        let report = GraphAnalyzer::new(&AnalysisConfig::default()).analyze(&fixture_ir());
        assert_eq!(report.statistics.symbol_kinds["function"], 2);
        assert_eq!(report.statistics.symbol_kinds["class"], 1);
        assert_eq!(report.statistics.call_distribution.resolved, 1);
        assert_eq!(report.statistics.call_distribution.unresolved, 1);
        assert!((report.statistics.coverage.resolved_ratio - 0.5).abs() < f64::EPSILON);
    }
}
