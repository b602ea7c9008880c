// tests/graph_properties.rs

mod common;
use crate::common::{StoreBuilder, position};

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use spkforge::dag::DependencyGraph;
use spkforge::depends::DependencyStore;
use spkforge::errors::SpkError;
use spkforge::types::Direction;

/// Edges of a random DAG: project `p<i>` may only depend on `p<j>` with
/// `j < i`, which rules out cycles.
fn dag_strategy(max_projects: usize) -> impl Strategy<Value = BTreeMap<String, Vec<String>>> {
    (1..=max_projects).prop_flat_map(|count| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), count).prop_map(
            move |raw| {
                let mut edges = BTreeMap::new();
                for (i, picks) in raw.into_iter().enumerate() {
                    let deps: BTreeSet<String> = if i == 0 {
                        BTreeSet::new()
                    } else {
                        picks.into_iter().map(|j| format!("p{}", j % i)).collect()
                    };
                    edges.insert(format!("p{i}"), deps.into_iter().collect());
                }
                edges
            },
        )
    })
}

fn store_for(edges: &BTreeMap<String, Vec<String>>) -> DependencyStore {
    let mut builder = StoreBuilder::new();
    for (project, deps) in edges {
        let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
        builder = builder.depends(project, &deps);
    }
    builder.build()
}

proptest! {
    #[test]
    fn forward_traversal_is_topological(edges in dag_strategy(12)) {
        let store = store_for(&edges);
        let roots: Vec<String> = edges.keys().cloned().collect();
        let order = DependencyGraph::new(&store, false)
            .traverse(&roots, 0, Direction::Forward)
            .unwrap();

        let unique: BTreeSet<&String> = order.iter().collect();
        prop_assert_eq!(unique.len(), order.len());
        prop_assert_eq!(order.len(), edges.len());

        for (project, deps) in edges.iter() {
            for dep in deps {
                prop_assert!(position(&order, dep) < position(&order, project));
            }
        }
    }

    #[test]
    fn backward_traversal_puts_dependents_first(edges in dag_strategy(10)) {
        let store = store_for(&edges);
        let order = DependencyGraph::new(&store, false)
            .traverse(&["p0".to_string()], 0, Direction::Backward)
            .unwrap();

        // Every reached dependent comes before what it depends on.
        for (project, deps) in edges.iter() {
            for dep in deps {
                if order.contains(project) && order.contains(dep) {
                    prop_assert!(position(&order, project) < position(&order, dep));
                }
            }
        }
        prop_assert_eq!(order.last().map(String::as_str), Some("p0"));
    }

    #[test]
    fn reorder_keeps_exactly_the_inputs(edges in dag_strategy(10), pick in any::<u16>()) {
        let store = store_for(&edges);
        let inputs: Vec<String> = edges
            .keys()
            .enumerate()
            .filter(|(i, _)| pick & (1 << (i % 16)) != 0)
            .map(|(_, k)| k.clone())
            .collect();

        let order = DependencyGraph::new(&store, false).reorder(&inputs).unwrap();
        let got: BTreeSet<&String> = order.iter().collect();
        let want: BTreeSet<&String> = inputs.iter().collect();
        prop_assert_eq!(got, want);
    }
}

#[test]
fn closing_edge_reports_exact_cycle_path() {
    let store = StoreBuilder::new()
        .depends("A", &["B"])
        .depends("B", &["C"])
        .depends("C", &["A"])
        .build();

    let err = DependencyGraph::new(&store, false)
        .traverse(&["A".to_string()], 0, Direction::Forward)
        .unwrap_err();
    match err {
        SpkError::CircularDependency { cycle } => assert_eq!(cycle, vec!["A", "B", "C", "A"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn diamond_builds_shared_dependency_first() {
    let store = StoreBuilder::new()
        .depends("P", &["A", "B"])
        .depends("A", &["C"])
        .depends("B", &["C"])
        .depends("C", &[])
        .build();

    let order = DependencyGraph::new(&store, false)
        .traverse(&["P".to_string()], 0, Direction::Forward)
        .unwrap();
    assert_eq!(order, vec!["C", "A", "B", "P"]);
}
