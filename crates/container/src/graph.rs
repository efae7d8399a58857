//! Dependency graph analysis.
//!
//! The container builds a graph from every adapter's reported dependency
//! requirements and runs a DFS cycle check over it before the first start.
//! Nodes keep a human-readable label so a cycle error names the actual
//! components instead of opaque keys.

use std::collections::{HashMap, HashSet};

use crate::errors::ContainerError;
use crate::key::ComponentKey;

#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: HashMap<ComponentKey, Vec<ComponentKey>>,
    reverse: HashMap<ComponentKey, Vec<ComponentKey>>,
    labels: HashMap<ComponentKey, String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(
        &mut self,
        from: ComponentKey,
        to: ComponentKey,
        from_label: impl Into<String>,
        to_label: impl Into<String>,
    ) {
        self.labels.entry(from.clone()).or_insert_with(|| from_label.into());
        self.labels.entry(to.clone()).or_insert_with(|| to_label.into());
        self.reverse
            .entry(to.clone())
            .or_default()
            .push(from.clone());
        self.edges.entry(from).or_default().push(to);
    }

    pub fn dependencies_of(&self, key: &ComponentKey) -> &[ComponentKey] {
        self.edges.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dependents_of(&self, key: &ComponentKey) -> &[ComponentKey] {
        self.reverse.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn label(&self, key: &ComponentKey) -> String {
        self.labels
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    pub fn node_count(&self) -> usize {
        let mut nodes: HashSet<&ComponentKey> = self.edges.keys().collect();
        for targets in self.edges.values() {
            nodes.extend(targets.iter());
        }
        nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// All elementary cycles reachable through the DFS forest. Each cycle is
    /// reported closed, first node repeated at the end.
    pub fn detect_cycles(&self) -> Vec<Vec<ComponentKey>> {
        let mut cycles = Vec::new();
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        let mut path = Vec::new();

        for node in self.edges.keys() {
            if !visited.contains(node) {
                self.dfs(node, &mut visited, &mut on_stack, &mut path, &mut cycles);
            }
        }
        cycles
    }

    fn dfs(
        &self,
        node: &ComponentKey,
        visited: &mut HashSet<ComponentKey>,
        on_stack: &mut HashSet<ComponentKey>,
        path: &mut Vec<ComponentKey>,
        cycles: &mut Vec<Vec<ComponentKey>>,
    ) {
        visited.insert(node.clone());
        on_stack.insert(node.clone());
        path.push(node.clone());

        for next in self.dependencies_of(node).to_vec() {
            if !visited.contains(&next) {
                self.dfs(&next, visited, on_stack, path, cycles);
            } else if on_stack.contains(&next) {
                if let Some(start) = path.iter().position(|entry| *entry == next) {
                    let mut cycle = path[start..].to_vec();
                    cycle.push(next.clone());
                    cycles.push(cycle);
                }
            }
        }

        path.pop();
        on_stack.remove(node);
    }

    /// Turn detected cycles into one cyclic-dependency error with labeled
    /// paths, or `Ok` when the graph is acyclic.
    pub fn ensure_acyclic(&self) -> Result<(), ContainerError> {
        let cycles = self.detect_cycles();
        if cycles.is_empty() {
            return Ok(());
        }
        let paths: Vec<String> = cycles
            .iter()
            .map(|cycle| {
                cycle
                    .iter()
                    .map(|key| self.label(key))
                    .collect::<Vec<_>>()
                    .join(" -> ")
            })
            .collect();
        Err(ContainerError::CyclicDependency {
            path: paths.join("; "),
        })
    }
}
