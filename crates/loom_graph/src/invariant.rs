//! Invariant checking against a finished graph.

use crate::error::InvariantError;
use crate::graph::Graph;
use loom_core::{Invariant, InvariantKind};

/// Check invariants in order, stopping at the first that fails.
///
/// # Errors
///
/// Returns the first invariant whose verdict differs from its desired value.
pub fn check_invariants(graph: &Graph, invariants: &[Invariant]) -> Result<(), InvariantError> {
    for invariant in invariants {
        if !holds(graph, invariant) {
            tracing::debug!(invariant = %invariant, "invariant failed");
            return Err(InvariantError {
                invariant: invariant.clone(),
            });
        }
    }
    Ok(())
}

/// Whether one invariant holds
#[must_use]
pub fn holds(graph: &Graph, invariant: &Invariant) -> bool {
    let label = |i: usize| invariant.labels.get(i).map_or("", String::as_str);
    match invariant.kind {
        InvariantKind::Reach => reach(graph, label(0), label(1), invariant.desired),
        InvariantKind::Between => {
            between(graph, label(0), label(1), label(2), invariant.desired)
        }
        InvariantKind::Enough => enough(graph) == invariant.desired,
    }
}

fn reach(graph: &Graph, from: &str, to: &str, desired: bool) -> bool {
    let targets = graph.nodes_with_label(to);
    graph.nodes_with_label(from).iter().all(|src| {
        let reachable = graph.reachable(src);
        targets.iter().all(|dst| reachable.contains(dst) == desired)
    })
}

fn between(graph: &Graph, from: &str, to: &str, via: &str, desired: bool) -> bool {
    let targets = graph.nodes_with_label(to);
    let on_path = |path: &Vec<String>| {
        path.iter()
            .any(|n| graph.nodes.get(n).is_some_and(|node| node.has_label(via)))
    };

    graph.nodes_with_label(from).iter().all(|src| {
        targets.iter().all(|dst| {
            let paths = graph.simple_paths(src, dst);
            if paths.is_empty() {
                return !desired;
            }
            if desired {
                paths.iter().all(&on_path)
            } else {
                !paths.iter().any(&on_path)
            }
        })
    })
}

fn enough(graph: &Graph) -> bool {
    let mut needed = graph.avail_sets.len();
    if graph.has_public() {
        needed = needed.saturating_sub(1);
    }
    graph.machine_count >= needed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, Topology};
    use loom_core::{Connection, Container, ContainerId, PlacementRule};

    fn inv(line: &str) -> Invariant {
        Invariant::parse_line(line).unwrap()
    }

    fn abc_chain(machines: usize) -> Graph {
        let containers: Vec<Container> = ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, l)| {
                let mut c = Container::new(ContainerId::new(i as u32 + 1), "img", Vec::new());
                c.stamp_label(l);
                c
            })
            .collect();
        let connections = vec![
            Connection::new("a", "b", 22, 22).unwrap(),
            Connection::new("b", "c", 22, 22).unwrap(),
        ];
        Graph::build(&Topology {
            containers: &containers,
            connections: &connections,
            placements: &[],
            machine_count: machines,
        })
    }

    #[test]
    fn test_reach_and_between_on_chain() {
        let graph = abc_chain(1);
        assert!(holds(&graph, &inv("reach true a c")));
        assert!(holds(&graph, &inv("reach false c a")));
        assert!(holds(&graph, &inv("between true a c b")));
        assert!(!holds(&graph, &inv("reach true c a")));
        assert!(!holds(&graph, &inv("between false a c b")));
    }

    #[test]
    fn test_check_reports_first_failure() {
        let graph = abc_chain(1);
        let invariants = vec![
            inv("reach true a c"),
            inv("reach true c a"),
            inv("reach true b a"),
        ];
        let err = check_invariants(&graph, &invariants).unwrap_err();
        assert_eq!(err.to_string(), "invariant failed: reach true \"c\" \"a\"");
    }

    #[test]
    fn test_enough_machines() {
        // One container set plus the public set: one machine suffices.
        assert!(holds(&abc_chain(1), &inv("enough")));
        assert!(!holds(&abc_chain(0), &inv("enough")));
        assert!(holds(&abc_chain(0), &inv("enough false")));
    }

    #[test]
    fn test_enough_with_exclusive_sets() {
        let containers: Vec<Container> = ["red", "blue"]
            .iter()
            .enumerate()
            .map(|(i, l)| {
                let mut c = Container::new(ContainerId::new(i as u32 + 1), "img", Vec::new());
                c.stamp_label(l);
                c
            })
            .collect();
        let rules = vec![PlacementRule::label("blue", true, "red")];
        let topology = Topology {
            containers: &containers,
            connections: &[],
            placements: &rules,
            machine_count: 0,
        };
        let graph = Graph::build(&topology);
        let err = check_invariants(&graph, &[inv("enough")]).unwrap_err();
        assert_eq!(err.to_string(), "invariant failed: enough");

        let graph = Graph::build(&Topology {
            machine_count: 2,
            ..topology
        });
        assert!(check_invariants(&graph, &[inv("enough")]).is_ok());
    }

    #[test]
    fn test_between_without_path() {
        let graph = abc_chain(1);
        assert!(!holds(&graph, &inv("between true c a b")));
        assert!(holds(&graph, &inv("between false c a b")));
    }

    proptest::proptest! {
        #[test]
        fn prop_between_vacuous_without_path(
            edges in proptest::collection::vec((0u8..6, 0u8..6), 0..14),
            via in 0u8..6,
        ) {
            let mut graph = Graph::new();
            for i in 0..6u8 {
                graph.add_node(Node::new(i.to_string()).with_label(format!("n{i}")));
            }
            for (a, b) in &edges {
                // Node 5 is never a destination, so nothing reaches it.
                if *b != 5 {
                    graph.add_edge(&a.to_string(), &b.to_string());
                }
            }
            let via = format!("n{via}");
            let yes = Invariant::new(InvariantKind::Between, true, vec!["n0".into(), "n5".into(), via.clone()]).unwrap();
            let no = Invariant::new(InvariantKind::Between, false, vec!["n0".into(), "n5".into(), via]).unwrap();
            proptest::prop_assert!(!holds(&graph, &yes));
            proptest::prop_assert!(holds(&graph, &no));
        }
    }
}
