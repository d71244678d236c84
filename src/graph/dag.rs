//! Structural checks on the editor graph.
//!
//! These run before any template is fetched: a graph that references unknown
//! nodes or contains a cycle can never compile into a valid DAG.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::types::Graph;
use crate::emit::task_name;
use crate::error::{Error, Result};

/// Check the graph is well-formed.
///
/// Checks for:
/// - Non-empty, unique node IDs
/// - Node IDs that map to distinct DAG task names
/// - Edges referencing existing nodes
/// - No self-loops
/// - No circular dependencies
pub fn check_graph(graph: &Graph) -> Result<()> {
    let mut ids = HashSet::new();
    let mut task_names: HashMap<String, &str> = HashMap::new();
    for node in &graph.nodes {
        if node.id.is_empty() {
            return Err(Error::InvalidGraph("Node ID cannot be empty".into()));
        }
        if !ids.insert(node.id.as_str()) {
            return Err(Error::InvalidGraph(format!("Duplicate node ID: {}", node.id)));
        }
        let name = task_name(&node.id);
        if let Some(other) = task_names.insert(name.clone(), node.id.as_str()) {
            return Err(Error::InvalidGraph(format!(
                "Node IDs '{}' and '{}' both map to task name '{}'",
                other, node.id, name
            )));
        }
    }

    for edge in &graph.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !ids.contains(endpoint.as_str()) {
                return Err(Error::InvalidGraph(format!(
                    "Edge {} -> {} references non-existent node '{}'",
                    edge.source, edge.target, endpoint
                )));
            }
        }
        if edge.source == edge.target {
            return Err(Error::InvalidGraph(format!(
                "Node '{}' cannot depend on itself",
                edge.source
            )));
        }
    }

    if let Some(node_id) = find_cycle(graph) {
        return Err(Error::InvalidGraph(format!(
            "Graph has circular dependencies through node '{}'",
            node_id
        )));
    }

    Ok(())
}

/// Successors of each node, in edge order.
fn successors(graph: &Graph) -> HashMap<&str, Vec<&str>> {
    let mut next: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        next.entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }
    next
}

/// Return a node on a cycle, if there is one.
///
/// Depth-first with an explicit stack of `(node, next neighbor index)` frames,
/// so path length is bounded by the heap rather than the thread stack.
fn find_cycle(graph: &Graph) -> Option<String> {
    let next = successors(graph);
    let mut visited: HashSet<&str> = HashSet::new();
    let mut on_path: HashSet<&str> = HashSet::new();

    for node in &graph.nodes {
        let start = node.id.as_str();
        if !visited.insert(start) {
            continue;
        }
        on_path.insert(start);
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];

        while let Some(frame) = stack.last_mut() {
            let (node_id, index) = *frame;
            let neighbor = next.get(node_id).and_then(|n| n.get(index)).copied();
            match neighbor {
                Some(neighbor) => {
                    frame.1 += 1;
                    if on_path.contains(neighbor) {
                        return Some(neighbor.to_string());
                    }
                    if visited.insert(neighbor) {
                        on_path.insert(neighbor);
                        stack.push((neighbor, 0));
                    }
                }
                None => {
                    on_path.remove(node_id);
                    stack.pop();
                }
            }
        }
    }
    None
}

/// Node IDs in an order where every source comes before its targets.
///
/// Ties are broken by node input order. Expects an acyclic graph (see
/// [`check_graph`]); nodes on a cycle are left out.
pub fn execution_order(graph: &Graph) -> Vec<&str> {
    let position: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut in_degree: HashMap<&str, usize> =
        graph.nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
    let mut seen_edges = HashSet::new();
    let mut next: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        if !seen_edges.insert((edge.source.as_str(), edge.target.as_str())) {
            continue;
        }
        if let Some(degree) = in_degree.get_mut(edge.target.as_str()) {
            *degree += 1;
            next.entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
        }
    }

    // Ready set ordered by input position.
    let mut ready: BTreeMap<usize, &str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(&id, _)| (position[id], id))
        .collect();

    let mut order = Vec::with_capacity(graph.nodes.len());
    while let Some((_, id)) = ready.pop_first() {
        order.push(id);
        for &target in next.get(id).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(target) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(position[target], target);
                }
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node};

    fn node(id: &str) -> Node {
        Node {
            id: id.to_string(),
            template_name: "tp".to_string(),
            entrypoint: "main".to_string(),
            arguments: Default::default(),
        }
    }

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> Graph {
        Graph {
            nodes: ids.iter().map(|id| node(id)).collect(),
            edges: edges.iter().map(|(s, t)| Edge::new(*s, *t)).collect(),
        }
    }

    #[test]
    fn test_valid_graph() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("a", "c"), ("b", "c")]);
        assert!(check_graph(&g).is_ok());
    }

    #[test]
    fn test_duplicate_ids() {
        let g = graph(&["a", "a"], &[]);
        let err = check_graph(&g).unwrap_err();
        assert!(err.to_string().contains("Duplicate node ID: a"));
    }

    #[test]
    fn test_empty_id() {
        let g = graph(&[""], &[]);
        assert!(check_graph(&g).is_err());
    }

    #[test]
    fn test_missing_edge_endpoint() {
        let g = graph(&["a"], &[("a", "ghost")]);
        let err = check_graph(&g).unwrap_err();
        assert_eq!(err.code(), "INVALID_GRAPH");
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_self_loop() {
        let g = graph(&["a"], &[("a", "a")]);
        let err = check_graph(&g).unwrap_err();
        assert!(err.to_string().contains("itself"));
    }

    #[test]
    fn test_cycle() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let err = check_graph(&g).unwrap_err();
        assert!(err.to_string().contains("circular"));
    }

    #[test]
    fn test_colliding_task_names() {
        let g = graph(&["fit_1", "FIT-1"], &[]);
        let err = check_graph(&g).unwrap_err();
        assert_eq!(err.code(), "INVALID_GRAPH");
        let msg = err.to_string();
        assert!(msg.contains("fit_1"));
        assert!(msg.contains("FIT-1"));
        assert!(msg.contains("node-fit-1"));
    }

    #[test]
    fn test_long_chain_is_valid() {
        let ids: Vec<String> = (0..50_000).map(|i| format!("n{}", i)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let edges: Vec<(&str, &str)> = refs.windows(2).map(|w| (w[0], w[1])).collect();
        let g = graph(&refs, &edges);
        assert!(check_graph(&g).is_ok());
        assert_eq!(execution_order(&g).len(), 50_000);
    }

    #[test]
    fn test_long_chain_closing_cycle() {
        let ids: Vec<String> = (0..50_000).map(|i| format!("n{}", i)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut edges: Vec<(&str, &str)> = refs.windows(2).map(|w| (w[0], w[1])).collect();
        edges.push(("n49999", "n0"));
        let err = check_graph(&graph(&refs, &edges)).unwrap_err();
        assert!(err.to_string().contains("circular"));
    }

    #[test]
    fn test_cycle_reached_from_later_root() {
        let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("d", "c"), ("c", "d")]);
        let err = check_graph(&g).unwrap_err();
        assert!(err.to_string().contains("circular"));
    }

    #[test]
    fn test_duplicate_edges_are_not_a_cycle() {
        let g = graph(&["a", "b"], &[("a", "b"), ("a", "b")]);
        assert!(check_graph(&g).is_ok());
        assert_eq!(execution_order(&g), vec!["a", "b"]);
    }

    #[test]
    fn test_execution_order() {
        let g = graph(&["c", "a", "b"], &[("a", "b"), ("a", "c"), ("b", "c")]);
        assert_eq!(execution_order(&g), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_execution_order_keeps_input_order_for_independent_nodes() {
        let g = graph(&["z", "y", "x"], &[]);
        assert_eq!(execution_order(&g), vec!["z", "y", "x"]);
    }
}
