//! Structural checks run at the end of a graph build.
//!
//! # Cycle Detection
//! Depth-first search over successor edges with an explicit recursion stack.
//! A successor already on the stack closes a cycle, and the stack segment
//! from that successor onward is reported as the cycle path.
//!
//! # Connectivity
//! Every vertex without a `cond` must be wired into the graph: start
//! vertices may not have dependencies, and any other vertex needs at least
//! one dependency or successor.

use std::collections::{HashMap, HashSet};

use crate::errors::BuildError;
use crate::graph::vertex::Vertex;

/// Returns the first cycle found, as a path of vertex ids that starts and
/// ends at the same vertex.
pub(crate) fn find_cycle(vertices: &[Vertex]) -> Option<Vec<String>> {
    let successors: HashMap<&str, Vec<&str>> = vertices
        .iter()
        .map(|v| {
            (
                v.id.as_str(),
                v.successors().iter().map(String::as_str).collect(),
            )
        })
        .collect();

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for vertex in vertices {
        if !visited.contains(vertex.id.as_str()) {
            if let Some(cycle) = dfs_cycle_detection(
                vertex.id.as_str(),
                &successors,
                &mut visited,
                &mut rec_stack,
                &mut path,
            ) {
                return Some(cycle);
            }
        }
    }
    None
}

fn dfs_cycle_detection<'a>(
    node: &'a str,
    successors: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = successors.get(node) {
        for &neighbor in neighbors {
            if !visited.contains(neighbor) {
                if let Some(cycle) = dfs_cycle_detection(neighbor, successors, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(neighbor) {
                let start = path.iter().position(|id| *id == neighbor).unwrap_or_default();
                let mut cycle: Vec<String> = path[start..].iter().map(|id| id.to_string()).collect();
                cycle.push(neighbor.to_string());
                return Some(cycle);
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    None
}

/// Checks that a vertex is connected according to its `start` flag.
pub(crate) fn verify_vertex(graph: &str, vertex: &Vertex) -> Result<(), BuildError> {
    if !vertex.cond.is_empty() {
        return Ok(());
    }
    let no_deps = vertex.deps().is_empty();
    if vertex.start {
        if !no_deps {
            return Err(BuildError::StartWithDeps {
                graph: graph.to_string(),
                vertex: vertex.id.clone(),
            });
        }
    } else if no_deps && vertex.successors().is_empty() {
        return Err(BuildError::Isolated {
            graph: graph.to_string(),
            vertex: vertex.id.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VertexConfig;
    use crate::graph::vertex::ResultKind;

    fn chain(edges: &[(&str, &str)], ids: &[&str]) -> Vec<Vertex> {
        let mut vertices: Vec<Vertex> = ids
            .iter()
            .map(|id| {
                Vertex::from_config(&VertexConfig {
                    id: id.to_string(),
                    ..Default::default()
                })
            })
            .collect();
        for (from, to) in edges {
            for v in vertices.iter_mut() {
                if v.id == *from {
                    v.successors.insert(to.to_string());
                }
                if v.id == *to {
                    v.deps.insert(from.to_string(), ResultKind::Any);
                }
            }
        }
        vertices
    }

    #[test]
    fn test_acyclic_graphs() {
        let linear = chain(&[("a", "b"), ("b", "c")], &["a", "b", "c"]);
        assert!(find_cycle(&linear).is_none());

        let diamond = chain(
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
            &["a", "b", "c", "d"],
        );
        assert!(find_cycle(&diamond).is_none());
    }

    #[test]
    fn test_cycles_report_path() {
        struct TestCase {
            name: &'static str,
            edges: Vec<(&'static str, &'static str)>,
            ids: Vec<&'static str>,
            expected: Vec<&'static str>,
        }

        let test_cases = vec![
            TestCase {
                name: "self loop",
                edges: vec![("a", "a")],
                ids: vec!["a"],
                expected: vec!["a", "a"],
            },
            TestCase {
                name: "simple",
                edges: vec![("a", "b"), ("b", "a")],
                ids: vec!["a", "b"],
                expected: vec!["a", "b", "a"],
            },
            TestCase {
                name: "tail into loop",
                edges: vec![("a", "b"), ("b", "c"), ("c", "d"), ("d", "b")],
                ids: vec!["a", "b", "c", "d"],
                expected: vec!["b", "c", "d", "b"],
            },
        ];

        for case in test_cases {
            let vertices = chain(&case.edges, &case.ids);
            let cycle = find_cycle(&vertices);
            assert_eq!(
                cycle,
                Some(case.expected.iter().map(|s| s.to_string()).collect()),
                "Unexpected cycle for '{}'",
                case.name
            );
        }
    }

    #[test]
    fn test_verify_vertex() {
        let mut vertices = chain(&[("a", "b")], &["a", "b", "lonely"]);

        assert!(verify_vertex("g", &vertices[0]).is_ok());
        assert!(verify_vertex("g", &vertices[1]).is_ok());
        assert!(matches!(
            verify_vertex("g", &vertices[2]),
            Err(BuildError::Isolated { .. })
        ));

        vertices[1].start = true;
        assert!(matches!(
            verify_vertex("g", &vertices[1]),
            Err(BuildError::StartWithDeps { .. })
        ));

        vertices[2].cond = "x > 1".into();
        assert!(verify_vertex("g", &vertices[2]).is_ok(), "cond vertices are exempt");
    }
}
