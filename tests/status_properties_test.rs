//! Property tests over random hierarchies and decision batches.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use codelist_builder::domain::{tree_rows, DecisionSet, Hierarchy, Mark, Update};

fn name(ix: usize) -> String {
    format!("n{ix:02}")
}

/// Random DAG rooted at `n00`: every other node gets parents among the nodes
/// before it, so every node is reachable and there are no cycles.
fn arb_hierarchy(max_nodes: usize, max_parents: usize) -> impl Strategy<Value = Hierarchy> {
    let parent_picks = prop::collection::vec(any::<usize>(), 1..=max_parents);
    prop::collection::vec(parent_picks, 1..max_nodes).prop_map(|parents| {
        let mut edges = Vec::new();
        for (k, picks) in parents.iter().enumerate() {
            let child = k + 1;
            for pick in picks {
                edges.push((name(pick % child), name(child)));
            }
        }
        Hierarchy::new(name(0), edges).expect("generated DAG is valid")
    })
}

fn arb_mark() -> impl Strategy<Value = Mark> {
    prop_oneof![Just(Mark::Clear), Just(Mark::Include), Just(Mark::Exclude)]
}

/// A hierarchy plus a batch of updates naming its nodes.
fn arb_case() -> impl Strategy<Value = (Hierarchy, Vec<Update>)> {
    arb_hierarchy(16, 3).prop_flat_map(|hierarchy| {
        let nodes: Vec<String> = hierarchy.nodes().iter().cloned().collect();
        let updates = prop::collection::vec((0..nodes.len(), arb_mark()), 0..12)
            .prop_map(move |raw| raw.into_iter().map(|(ix, mark)| (nodes[ix].clone(), mark)).collect());
        (Just(hierarchy), updates)
    })
}

fn decisions_from(updates: &[Update]) -> DecisionSet {
    let mut decisions = DecisionSet::default();
    decisions.apply_all(updates);
    decisions
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn batch_resolution_matches_per_node_resolution((hierarchy, updates) in arb_case()) {
        let decisions = decisions_from(&updates);

        let batch = hierarchy.resolve_statuses(&decisions);

        prop_assert_eq!(batch.len(), hierarchy.len());
        for node in hierarchy.nodes() {
            prop_assert_eq!(batch[node], hierarchy.node_status(node, &decisions), "node {}", node);
        }
    }

    #[test]
    fn explicit_decisions_take_precedence((hierarchy, updates) in arb_case()) {
        let decisions = decisions_from(&updates);

        let statuses = hierarchy.resolve_statuses(&decisions);

        for (code, status) in &statuses {
            prop_assert_eq!(status.is_explicit(), decisions.explicit_status(code).is_some());
        }
    }

    #[test]
    fn applied_batches_keep_decisions_disjoint((hierarchy, updates) in arb_case()) {
        let outcome = hierarchy
            .update_explicit_decisions(&DecisionSet::default(), &updates)
            .expect("all codes are nodes");

        prop_assert!(outcome.decisions.included().is_disjoint(outcome.decisions.excluded()));
        let last: BTreeMap<&str, Mark> = updates.iter().map(|(c, m)| (c.as_str(), *m)).collect();
        for (code, mark) in last {
            let expected = match mark {
                Mark::Include => Some(codelist_builder::domain::Status::Included),
                Mark::Exclude => Some(codelist_builder::domain::Status::Excluded),
                Mark::Clear => None,
            };
            prop_assert_eq!(outcome.decisions.explicit_status(code), expected);
        }
    }

    #[test]
    fn clearing_twice_equals_clearing_once((hierarchy, updates) in arb_case(), pick in any::<usize>()) {
        let nodes: Vec<&String> = hierarchy.nodes().iter().collect();
        let code = nodes[pick % nodes.len()].clone();
        let decisions = decisions_from(&updates);

        let once = hierarchy
            .update_explicit_decisions(&decisions, &[(code.clone(), Mark::Clear)])
            .expect("known code");
        let twice = hierarchy
            .update_explicit_decisions(&once.decisions, &[(code, Mark::Clear)])
            .expect("known code");

        prop_assert_eq!(once, twice);
    }

    #[test]
    fn ultimate_ancestors_cover_every_candidate((hierarchy, updates) in arb_case()) {
        let candidates: BTreeSet<String> = updates.into_iter().map(|(code, _)| code).collect();

        let roots = hierarchy.filter_to_ultimate_ancestors(&candidates);

        prop_assert!(roots.is_subset(&candidates));
        for root in &roots {
            prop_assert!(hierarchy.ancestors(root).is_disjoint(&candidates));
        }
        for candidate in &candidates {
            let covered = roots.contains(candidate)
                || hierarchy.ancestors(candidate).iter().any(|a| roots.contains(a));
            prop_assert!(covered, "candidate {} not covered", candidate);
        }
    }

    // few parents per node keeps the number of root-to-leaf paths small
    #[test]
    fn tree_from_root_shows_every_node(hierarchy in arb_hierarchy(10, 2)) {
        let included = BTreeSet::new();
        let terms = BTreeMap::new();

        let rows: Vec<_> = tree_rows(hierarchy.root(), &hierarchy, &included, &terms).collect();

        prop_assert!(rows[0].pipes.is_empty());
        let shown: BTreeSet<String> = rows.iter().map(|r| r.code.clone()).collect();
        prop_assert_eq!(&shown, hierarchy.nodes());
        for window in rows.windows(2) {
            prop_assert!(window[1].depth() <= window[0].depth() + 1);
        }
    }
}
