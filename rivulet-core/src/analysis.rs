//! Graph Analysis
//!
//! Converts a wired [`Graph`] into a plain vertex/edge structure that can be
//! handed to display or analysis tooling, either as JSON or as Graphviz DOT.
//!
//! The walk starts at each root in creation order and descends depth-first
//! through children in wiring order. A node reachable along several paths
//! (a diamond, or a zip with several parents) is visited once, but every
//! parent → child relation is recorded as its own edge.

use indexmap::IndexSet;
use serde::Serialize;

use crate::error::Result;
use crate::graph::{Graph, Node, Value};

/// A directed parent → child relation, by node name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// Name-level view of a graph's topology.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayGraph {
    /// Node names in first-visit order.
    pub vertices: Vec<String>,
    pub edges: Vec<Edge>,
}

impl DisplayGraph {
    /// Walk `graph` from its roots.
    pub fn from_graph<T: Value>(graph: &Graph<T>) -> Self {
        let mut visited = IndexSet::new();
        let mut edges = IndexSet::new();
        for root in graph.root_nodes() {
            visit(&root, &mut visited, &mut edges);
        }
        Self {
            vertices: visited.into_iter().collect(),
            edges: edges.into_iter().collect(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        self.edges.iter().any(|e| e.from == from && e.to == to)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render as a Graphviz `digraph`.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph rivulet {\n");
        for vertex in &self.vertices {
            out.push_str(&format!("    {};\n", quote(vertex)));
        }
        for edge in &self.edges {
            out.push_str(&format!("    {} -> {};\n", quote(&edge.from), quote(&edge.to)));
        }
        out.push('}');
        out.push('\n');
        out
    }
}

fn visit<T: Value>(node: &Node<T>, visited: &mut IndexSet<String>, edges: &mut IndexSet<Edge>) {
    if !visited.insert(node.name().to_string()) {
        return;
    }
    for child in node.children() {
        visit(&child, visited, edges);
        edges.insert(Edge {
            from: node.name().to_string(),
            to: child.name().to_string(),
        });
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> Graph<i32> {
        let graph: Graph<i32> = Graph::new();
        let src = graph.create_source("src").unwrap();
        let left = src.map_to(|x| x + 1, Some("left")).unwrap();
        let right = src.map_to(|x| x - 1, Some("right")).unwrap();
        let zip = left.join_with(&[right], |v| v[0] * v[1], Some("zip")).unwrap();
        zip.to_output(Some("out")).unwrap();
        graph
    }

    #[test]
    fn shared_child_is_visited_once() {
        let display = DisplayGraph::from_graph(&diamond());

        assert_eq!(display.vertices, vec!["src", "left", "zip", "out", "right"]);
        assert_eq!(display.edge_count(), 5);
        assert!(display.contains_edge("left", "zip"));
        assert!(display.contains_edge("right", "zip"));
        assert!(!display.contains_edge("zip", "left"));
    }

    #[test]
    fn edges_follow_depth_first_completion() {
        let display = DisplayGraph::from_graph(&diamond());
        let order: Vec<(&str, &str)> = display
            .edges
            .iter()
            .map(|e| (e.from.as_str(), e.to.as_str()))
            .collect();

        assert_eq!(
            order,
            vec![
                ("zip", "out"),
                ("left", "zip"),
                ("src", "left"),
                ("right", "zip"),
                ("src", "right"),
            ]
        );
    }

    #[test]
    fn isolated_source_is_a_vertex() {
        let graph: Graph<i32> = Graph::new();
        graph.create_source("lonely").unwrap();

        let display = DisplayGraph::from_graph(&graph);
        assert_eq!(display.vertices, vec!["lonely"]);
        assert!(display.edges.is_empty());
    }

    #[test]
    fn renders_dot() {
        let graph: Graph<i32> = Graph::new();
        let src = graph.create_source("say \"hi\"").unwrap();
        src.to_output(Some("out")).unwrap();

        let dot = DisplayGraph::from_graph(&graph).to_dot();
        assert_eq!(
            dot,
            "digraph rivulet {\n    \"say \\\"hi\\\"\";\n    \"out\";\n    \"say \\\"hi\\\"\" -> \"out\";\n}\n"
        );
    }

    #[test]
    fn renders_json() {
        let graph: Graph<i32> = Graph::new();
        let src = graph.create_source("src").unwrap();
        src.to_output(Some("out")).unwrap();

        let json = DisplayGraph::from_graph(&graph).to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["vertices"][1], "out");
        assert_eq!(parsed["edges"][0]["from"], "src");
        assert_eq!(parsed["edges"][0]["to"], "out");
    }
}
