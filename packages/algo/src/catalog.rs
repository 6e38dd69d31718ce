//! Catalog Validation
//!
//! Structural checks over the prerequisite graph. Steps point at other steps
//! by `order`; the graph is expected to be acyclic with prerequisites always
//! referencing earlier orders. None of these findings stop the engine, a step
//! caught in a cycle simply never unlocks.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;

use crate::types::Gated;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CatalogIssue {
    /// Two or more steps share the same order
    #[serde(rename_all = "camelCase")]
    DuplicateOrder { order: u32, count: usize },
    #[serde(rename_all = "camelCase")]
    SelfPrerequisite { order: u32 },
    /// Prerequisite order that no step carries
    #[serde(rename_all = "camelCase")]
    UnknownPrerequisite { order: u32, missing: u32 },
    /// Prerequisite at the same or a later position; legal, but unusual
    #[serde(rename_all = "camelCase")]
    ForwardPrerequisite { order: u32, prerequisite: u32 },
    /// Orders that can never be unlocked because they sit on or behind a cycle
    #[serde(rename_all = "camelCase")]
    Cycle { orders: Vec<u32> },
}

impl CatalogIssue {
    /// Issues that make part of the catalog unreachable or ambiguous
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            CatalogIssue::DuplicateOrder { .. }
                | CatalogIssue::SelfPrerequisite { .. }
                | CatalogIssue::Cycle { .. }
        )
    }
}

pub fn validate_catalog<S: Gated>(steps: &[S]) -> Vec<CatalogIssue> {
    let mut issues = Vec::new();

    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for step in steps {
        *counts.entry(step.order()).or_default() += 1;
    }
    for (&order, &count) in &counts {
        if count > 1 {
            issues.push(CatalogIssue::DuplicateOrder { order, count });
        }
    }

    // order -> distinct prerequisite orders that exist in the catalog
    let mut edges: BTreeMap<u32, BTreeSet<u32>> = counts.keys().map(|&o| (o, BTreeSet::new())).collect();

    for step in steps {
        let order = step.order();
        for &prereq in step.prerequisite_orders() {
            if prereq == order {
                issues.push(CatalogIssue::SelfPrerequisite { order });
                continue;
            }
            if !counts.contains_key(&prereq) {
                issues.push(CatalogIssue::UnknownPrerequisite {
                    order,
                    missing: prereq,
                });
                continue;
            }
            if prereq > order {
                issues.push(CatalogIssue::ForwardPrerequisite {
                    order,
                    prerequisite: prereq,
                });
            }
            if let Some(deps) = edges.get_mut(&order) {
                deps.insert(prereq);
            }
        }
    }

    let stuck = unresolvable_orders(&edges);
    if !stuck.is_empty() {
        issues.push(CatalogIssue::Cycle { orders: stuck });
    }

    issues
}

/// Kahn's algorithm: whatever cannot be drained lies on or downstream of a cycle.
fn unresolvable_orders(edges: &BTreeMap<u32, BTreeSet<u32>>) -> Vec<u32> {
    let mut pending: BTreeMap<u32, usize> = edges.iter().map(|(&o, deps)| (o, deps.len())).collect();
    let mut dependents: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for (&order, deps) in edges {
        for &dep in deps {
            dependents.entry(dep).or_default().push(order);
        }
    }

    let mut ready: VecDeque<u32> = pending
        .iter()
        .filter(|(_, &n)| n == 0)
        .map(|(&o, _)| o)
        .collect();

    while let Some(order) = ready.pop_front() {
        pending.remove(&order);
        if let Some(children) = dependents.get(&order) {
            for child in children {
                if let Some(n) = pending.get_mut(child) {
                    *n -= 1;
                    if *n == 0 {
                        ready.push_back(*child);
                    }
                }
            }
        }
    }

    pending.into_keys().collect()
}
