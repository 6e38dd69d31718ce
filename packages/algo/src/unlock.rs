//! Unlock Resolver
//!
//! Decides which catalog steps are available to a learner given the set of
//! `order` values the learner has already completed. Everything here is pure
//! and deterministic; callers own the lookup of completed orders.

use std::collections::HashSet;

use crate::types::Gated;

/// A step with no prerequisites is always unlocked; otherwise every
/// prerequisite order must be present in `completed`.
pub fn is_unlocked<S: Gated + ?Sized>(step: &S, completed: &HashSet<u32>) -> bool {
    step.prerequisite_orders()
        .iter()
        .all(|order| completed.contains(order))
}

/// Collects the orders of every step whose id appears in `completed_ids`.
///
/// `order_of` maps an id to the step's order and returns `None` for ids the
/// catalog no longer knows about; those are skipped.
pub fn completed_orders<I, K, F>(completed_ids: I, mut order_of: F) -> HashSet<u32>
where
    I: IntoIterator<Item = K>,
    F: FnMut(&K) -> Option<u32>,
{
    completed_ids
        .into_iter()
        .filter_map(|id| order_of(&id))
        .collect()
}

/// Steps with a non-empty prerequisite list that is now fully satisfied.
///
/// This is the pure half of the post-completion propagation scan: the caller
/// still has to check stored progress to report only new unlocks.
pub fn satisfied_gated_steps<'a, S: Gated>(
    steps: &'a [S],
    completed: &'a HashSet<u32>,
) -> impl Iterator<Item = &'a S> + 'a {
    steps
        .iter()
        .filter(move |step| !step.prerequisite_orders().is_empty() && is_unlocked(*step, completed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StepNode;

    fn set(values: &[u32]) -> HashSet<u32> {
        values.iter().copied().collect()
    }

    #[test]
    fn step_without_prerequisites_is_unlocked() {
        let step = StepNode::new(1, vec![]);
        assert!(is_unlocked(&step, &HashSet::new()));
    }

    #[test]
    fn all_prerequisites_must_be_completed() {
        let step = StepNode::new(4, vec![2, 3]);
        assert!(!is_unlocked(&step, &set(&[2])));
        assert!(!is_unlocked(&step, &set(&[3])));
        assert!(is_unlocked(&step, &set(&[2, 3])));
        assert!(is_unlocked(&step, &set(&[1, 2, 3])));
    }

    #[test]
    fn completed_orders_skips_unknown_ids() {
        let catalog = [("a", 1u32), ("b", 2u32)];
        let orders = completed_orders(vec!["a", "zzz", "b"], |id| {
            catalog.iter().find(|(k, _)| k == id).map(|(_, o)| *o)
        });
        assert_eq!(orders, set(&[1, 2]));
    }

    #[test]
    fn satisfied_scan_ignores_ungated_steps() {
        let steps = vec![
            StepNode::new(1, vec![]),
            StepNode::new(2, vec![1]),
            StepNode::new(3, vec![1, 2]),
        ];
        let completed = set(&[1]);
        let found: Vec<u32> = satisfied_gated_steps(&steps, &completed)
            .map(|s| s.order)
            .collect();
        assert_eq!(found, vec![2]);
    }
}
