//! Availability-set packing.
//!
//! Minimising the number of sets is graph colouring, so this is a greedy
//! heuristic with a fixed tie-break: nodes are visited in graph order
//! (containers by id, then the public node) and displaced nodes go to the
//! first conflict-free set in creation order.

use crate::graph::{AvailabilitySet, Graph, PUBLIC_NODE};
use indexmap::{IndexMap, IndexSet};
use loom_core::{PlacementConstraint, PlacementRule};

/// Symmetric must-not-coexist adjacency derived from exclusive label rules.
///
/// The public node, when present, avoids every other node.
#[must_use]
pub fn avoid_map(graph: &Graph, placements: &[PlacementRule]) -> IndexMap<String, IndexSet<String>> {
    let mut avoid: IndexMap<String, IndexSet<String>> = IndexMap::new();
    let mut forbid = |a: &str, b: &str| {
        if a == b {
            return;
        }
        avoid.entry(a.to_string()).or_default().insert(b.to_string());
        avoid.entry(b.to_string()).or_default().insert(a.to_string());
    };

    for rule in placements.iter().filter(|r| r.exclusive) {
        let PlacementConstraint::Label(other) = &rule.constraint else {
            continue;
        };
        let targets = graph.nodes_with_label(&rule.target_label);
        let others = graph.nodes_with_label(other);
        for t in &targets {
            for o in &others {
                forbid(t, o);
            }
        }
    }

    if graph.has_public() {
        for name in graph.nodes.keys().filter(|n| n.as_str() != PUBLIC_NODE) {
            forbid(PUBLIC_NODE, name);
        }
    }
    avoid
}

/// Split the graph's availability sets so no set holds an avoided pair
pub fn pack(graph: &mut Graph, placements: &[PlacementRule]) {
    let avoid = avoid_map(graph, placements);
    let order: Vec<String> = graph.nodes.keys().cloned().collect();

    for name in &order {
        let Some(conflicts) = avoid.get(name) else {
            continue;
        };
        let Some(home) = graph.avail_set_of(name) else {
            continue;
        };

        let displaced: Vec<String> = graph.avail_sets[home]
            .nodes
            .iter()
            .filter(|member| conflicts.contains(*member))
            .cloned()
            .collect();

        for member in displaced {
            graph.avail_sets[home].nodes.shift_remove(&member);
            let member_avoid = avoid.get(&member);
            let fits = |set: &AvailabilitySet| {
                member_avoid.is_none_or(|bad| !set.nodes.iter().any(|n| bad.contains(n)))
            };
            match graph.avail_sets.iter().position(fits) {
                Some(idx) => {
                    graph.avail_sets[idx].nodes.insert(member);
                }
                None => graph.avail_sets.push([member].into_iter().collect()),
            }
        }
    }

    tracing::debug!(sets = graph.avail_sets.len(), "packed availability sets");
    graph.avoid = avoid;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, Topology};
    use loom_core::{Container, ContainerId};

    fn containers(labels: &[&str]) -> Vec<Container> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let mut c = Container::new(ContainerId::new(i as u32 + 1), "img", Vec::new());
                c.stamp_label(label);
                c
            })
            .collect()
    }

    fn set_of(graph: &Graph, node: &str) -> Vec<String> {
        let idx = graph.avail_set_of(node).unwrap();
        graph.avail_sets[idx].nodes.iter().cloned().collect()
    }

    #[test]
    fn test_exclusive_rule_splits_sets() {
        let cs = containers(&["red", "blue"]);
        let rules = vec![PlacementRule::label("blue", true, "red")];
        let graph = Graph::build(&Topology {
            containers: &cs,
            connections: &[],
            placements: &rules,
            machine_count: 0,
        });
        assert_eq!(graph.avail_sets.len(), 3);
        assert_eq!(set_of(&graph, "1"), vec!["1"]);
        assert_eq!(set_of(&graph, "2"), vec!["2"]);
        assert_eq!(set_of(&graph, PUBLIC_NODE), vec![PUBLIC_NODE]);
    }

    #[test]
    fn test_unconstrained_containers_share_a_set() {
        let cs = containers(&["a", "b", "c"]);
        let graph = Graph::build(&Topology {
            containers: &cs,
            connections: &[],
            placements: &[],
            machine_count: 0,
        });
        assert_eq!(graph.avail_sets.len(), 2);
        assert_eq!(set_of(&graph, "1"), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_displaced_nodes_reuse_sets() {
        // a conflicts with b and c, but b and c may share.
        let cs = containers(&["a", "b", "c"]);
        let rules = vec![
            PlacementRule::label("a", true, "b"),
            PlacementRule::label("a", true, "c"),
        ];
        let graph = Graph::build(&Topology {
            containers: &cs,
            connections: &[],
            placements: &rules,
            machine_count: 0,
        });
        assert_eq!(set_of(&graph, "2"), vec!["2", "3"]);
        assert_eq!(set_of(&graph, "1"), vec!["1"]);
    }

    #[test]
    fn test_colocation_rules_ignored() {
        let cs = containers(&["a", "b"]);
        let rules = vec![PlacementRule::label("a", false, "b")];
        let graph = Graph::build(&Topology {
            containers: &cs,
            connections: &[],
            placements: &rules,
            machine_count: 0,
        });
        assert_eq!(set_of(&graph, "1"), vec!["1", "2"]);
    }

    proptest::proptest! {
        #[test]
        fn prop_packing_is_safe(
            labels in proptest::collection::vec(0u8..5, 1..10),
            rules in proptest::collection::vec((0u8..5, 0u8..5), 0..10),
        ) {
            let mut graph = Graph::new();
            for (i, label) in labels.iter().enumerate() {
                graph.add_node(Node::new(i.to_string()).with_label(format!("l{label}")));
            }
            graph.add_node(Node::new(PUBLIC_NODE).with_label(PUBLIC_NODE));
            let rules: Vec<PlacementRule> = rules
                .iter()
                .map(|(a, b)| PlacementRule::label(format!("l{a}"), true, format!("l{b}")))
                .collect();

            pack(&mut graph, &rules);

            for set in &graph.avail_sets {
                for a in &set.nodes {
                    if let Some(bad) = graph.avoid.get(a) {
                        for b in &set.nodes {
                            proptest::prop_assert!(!bad.contains(b));
                        }
                    }
                }
            }
            let public = graph.avail_set_of(PUBLIC_NODE).unwrap();
            proptest::prop_assert_eq!(graph.avail_sets[public].len(), 1);
            let total: usize = graph.avail_sets.iter().map(AvailabilitySet::len).sum();
            proptest::prop_assert_eq!(total, graph.nodes.len());
        }
    }
}
