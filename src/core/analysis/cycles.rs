//! Cycle detection via Tarjan's strongly-connected-components algorithm.
//!
//! Implemented iteratively so pathological call graphs cannot blow the
//! stack. Only components with at least two members are reported.

use serde::{Deserialize, Serialize};

use crate::core::ir::{CallEdge, Symbol};

/// One member of a reported cycle, annotated for triage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleMember {
    pub id: String,
    pub file: String,
    pub source_range: (usize, usize),
}

/// A strongly-connected component of size > 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub members: Vec<CycleMember>,
}

/// Find all call cycles among the deduplicated nodes, following resolved
/// edges only.
pub fn find_cycles(nodes: &[&Symbol], calls: &[CallEdge]) -> Vec<Cycle> {
    let index_of: std::collections::HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for call in calls.iter().filter(|c| c.is_resolved()) {
        if let (Some(&from), Some(&to)) = (
            index_of.get(call.frm.as_str()),
            index_of.get(call.to.as_str()),
        ) {
            adjacency[from].push(to);
        }
    }
    for targets in &mut adjacency {
        targets.sort_unstable();
        targets.dedup();
    }

    let components = tarjan_scc(&adjacency);

    components
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|component| Cycle {
            members: component
                .into_iter()
                .map(|i| CycleMember {
                    id: nodes[i].id.clone(),
                    file: nodes[i].file.clone(),
                    source_range: nodes[i].source_range,
                })
                .collect(),
        })
        .collect()
}

/// Iterative Tarjan SCC. Returns components in discovery order, each as
/// a list of node indices.
fn tarjan_scc(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = adjacency.len();
    let mut index = vec![usize::MAX; n];
    let mut lowlink = vec![usize::MAX; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut components = Vec::new();

    // Explicit DFS frames: (node, position in its adjacency list)
    let mut frames: Vec<(usize, usize)> = Vec::new();

    for start in 0..n {
        if index[start] != usize::MAX {
            continue;
        }
        frames.push((start, 0));

        while let Some(&(v, pos)) = frames.last() {
            if pos == 0 && index[v] == usize::MAX {
                index[v] = next_index;
                lowlink[v] = next_index;
                next_index += 1;
                stack.push(v);
                on_stack[v] = true;
            }

            if let Some(&w) = adjacency[v].get(pos) {
                let top = frames.len() - 1;
                frames[top].1 = pos + 1;
                if index[w] == usize::MAX {
                    frames.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
                continue;
            }

            // All successors processed: close the frame
            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }
            if lowlink[v] == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                component.reverse();
                components.push(component);
            }
        }
    }

    components
}
