//! Dependency graph resolution and cycle reporting.

use crate::error::{ConfigError, ConfigResult};
use crate::field::{FieldId, FieldTree};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Directed dependency graph: each node maps to the nodes it depends on.
#[derive(Debug, Clone)]
pub struct Dependencies<K: Ord + Clone> {
    edges: BTreeMap<K, BTreeSet<K>>,
    dependents: BTreeMap<K, BTreeSet<K>>,
}

/// A dependency cycle, closed on its first node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle<K>(pub Vec<K>);

impl<K> Cycle<K> {
    pub fn path(&self) -> &[K] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<K> {
        self.0
    }
}

impl<K: Ord + Clone> Default for Dependencies<K> {
    fn default() -> Self {
        Self {
            edges: BTreeMap::new(),
            dependents: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> Dependencies<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `node` depends on every node of `deps`.
    ///
    /// Nodes are created as needed, including dependencies.
    pub fn add(&mut self, node: K, deps: impl IntoIterator<Item = K>) {
        let mut added = Vec::new();
        {
            let entry = self.edges.entry(node.clone()).or_default();
            for dep in deps {
                entry.insert(dep.clone());
                added.push(dep);
            }
        }
        for dep in added {
            self.edges.entry(dep.clone()).or_default();
            self.dependents.entry(dep).or_default().insert(node.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn contains(&self, node: &K) -> bool {
        self.edges.contains_key(node)
    }

    pub fn dependencies_of(&self, node: &K) -> Option<&BTreeSet<K>> {
        self.edges.get(node)
    }

    fn remove(&mut self, node: &K) {
        self.edges.remove(node);
        if let Some(dependents) = self.dependents.remove(node) {
            for dependent in dependents {
                if let Some(deps) = self.edges.get_mut(&dependent) {
                    deps.remove(node);
                }
            }
        }
    }

    /// Order every node after its dependencies.
    ///
    /// Each pass takes every node without remaining dependencies, in
    /// ascending order, and strikes it from the graph. A pass taking nothing
    /// while nodes remain means the remaining nodes form at least one cycle.
    pub fn resolve(mut self) -> Result<Vec<K>, Cycle<K>> {
        let mut resolved = Vec::with_capacity(self.edges.len());
        let mut passes = 0usize;

        while !self.edges.is_empty() {
            let ready: Vec<K> = self
                .edges
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(node, _)| node.clone())
                .collect();

            if ready.is_empty() {
                return Err(self.find_cycle());
            }

            for node in &ready {
                self.remove(node);
            }
            passes += 1;
            trace!(pass = passes, resolved = ready.len(), remaining = self.edges.len(), "Resolution pass");
            resolved.extend(ready);
        }

        Ok(resolved)
    }

    /// Every remaining node has a remaining dependency, so following the
    /// smallest one from the smallest node must revisit a node.
    fn find_cycle(&self) -> Cycle<K> {
        let mut walk: Vec<K> = Vec::new();
        let mut seen: BTreeMap<K, usize> = BTreeMap::new();
        let mut current = self.edges.keys().next().cloned();

        while let Some(node) = current {
            if let Some(&start) = seen.get(&node) {
                let mut cycle = walk.split_off(start);
                cycle.push(node);
                return Cycle(cycle);
            }
            seen.insert(node.clone(), walk.len());
            current = self
                .edges
                .get(&node)
                .and_then(|deps| deps.iter().next())
                .cloned();
            walk.push(node);
        }

        Cycle(walk)
    }
}

/// Processing order of the fields of `tree`: children before parents,
/// sources before targets. Pure injection targets are left out.
pub fn resolve(tree: &FieldTree, dependencies: Dependencies<FieldId>) -> ConfigResult<Vec<FieldId>> {
    let order = dependencies.resolve().map_err(|cycle| ConfigError::CyclicDependency {
        cycle: cycle
            .into_inner()
            .into_iter()
            .map(|id| tree.get(id).path().to_string())
            .collect(),
    })?;

    let order: Vec<FieldId> = order
        .into_iter()
        .filter(|id| !tree.get(*id).is_pure_injection_target())
        .collect();

    debug!(fields = tree.len(), resolved = order.len(), "Resolved field order");
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&'static str, &[&'static str])]) -> Dependencies<&'static str> {
        let mut deps = Dependencies::new();
        for (node, on) in edges {
            deps.add(*node, on.iter().copied());
        }
        deps
    }

    #[test]
    fn test_resolve_orders_dependencies_first() {
        let deps = graph(&[
            ("root", &["a", "b"]),
            ("a", &["a.x"]),
            ("b", &[]),
            ("a.x", &[]),
        ]);

        let order = deps.resolve().unwrap();
        assert_eq!(order, vec!["a.x", "b", "a", "root"]);
    }

    #[test]
    fn test_dependencies_are_created_on_add() {
        let deps = graph(&[("target", &["source"])]);
        assert!(deps.contains(&"source"));
        assert_eq!(deps.len(), 2);
        assert_eq!(deps.resolve().unwrap(), vec!["source", "target"]);
    }

    #[test]
    fn test_cycle_of_three() {
        let deps = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        let cycle = deps.resolve().unwrap_err();
        assert_eq!(cycle.path(), &["a", "b", "c", "a"]);
    }

    #[test]
    fn test_cycle_reached_from_outside() {
        let deps = graph(&[
            ("0", &["x", "ok"]),
            ("ok", &[]),
            ("x", &["y"]),
            ("y", &["z"]),
            ("z", &["y"]),
        ]);

        let cycle = deps.resolve().unwrap_err();
        assert_eq!(cycle.path(), &["y", "z", "y"]);
    }

    #[test]
    fn test_self_dependency() {
        let deps = graph(&[("a", &["a"])]);
        assert_eq!(deps.resolve().unwrap_err().path(), &["a", "a"]);
    }

    #[test]
    fn test_empty_graph() {
        let deps: Dependencies<u8> = Dependencies::new();
        assert!(deps.resolve().unwrap().is_empty());
    }
}
