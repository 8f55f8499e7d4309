//! Graphviz rendering of the communication graph.

use crate::graph::{Graph, PUBLIC_NODE};

/// Render the graph as a DOT digraph, one cluster per availability set.
#[must_use]
pub fn to_dot(graph: &Graph) -> String {
    let mut out = String::from("digraph G {\n");
    for (idx, set) in graph.avail_sets.iter().enumerate() {
        out.push_str(&format!("    subgraph cluster_{idx} {{\n"));
        for name in &set.nodes {
            out.push_str(&format!(
                "        \"{name}\" [label=\"{}\"];\n",
                node_text(graph, name)
            ));
        }
        out.push_str("    }\n");
    }
    for node in graph.nodes.values() {
        for dst in &node.edges {
            out.push_str(&format!("    \"{}\" -> \"{dst}\";\n", node.name));
        }
    }
    out.push_str("}\n");
    out
}

fn node_text(graph: &Graph, name: &str) -> String {
    let Some(node) = graph.nodes.get(name) else {
        return name.to_string();
    };
    if name == PUBLIC_NODE {
        return PUBLIC_NODE.to_string();
    }
    let labels: Vec<&str> = node.labels.iter().map(String::as_str).collect();
    let image = node.image.as_deref().unwrap_or("");
    let text = if labels.is_empty() {
        format!("{name}: {image}")
    } else {
        format!("{}: {image}", labels.join(","))
    };
    text.replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Topology;
    use loom_core::{Connection, Container, ContainerId};

    #[test]
    fn test_dot_output() {
        let mut web = Container::new(ContainerId::new(1), "nginx", Vec::new());
        web.stamp_label("web");
        let containers = vec![web];
        let conns = vec![Connection::new("public", "web", 80, 80).unwrap()];
        let graph = Graph::build(&Topology {
            containers: &containers,
            connections: &conns,
            placements: &[],
            machine_count: 1,
        });
        let dot = to_dot(&graph);
        assert!(dot.starts_with("digraph G {\n"));
        assert!(dot.contains("\"1\" [label=\"web: nginx\"];"));
        assert!(dot.contains("\"public\" [label=\"public\"];"));
        assert!(dot.contains("\"public\" -> \"1\";"));
        assert!(dot.contains("subgraph cluster_1"));
        assert!(dot.contains("    subgraph cluster_0 {\n"));
        assert!(dot.ends_with("    \"public\" -> \"1\";\n}\n"));
        assert_eq!(dot.matches('{').count(), dot.matches('}').count());
    }
}
