//! Waits-for graph between running pipelines.
//!
//! A pipeline that resolves its children waits on their shared handles. The
//! ledger hands out a running handle no matter who started it, so a child may
//! already be waiting (directly or through other pipelines) on the parent
//! that is about to wait on it. Admitting that edge would deadlock both.
//!
//! Edges are added under one lock together with the reachability check, so
//! two pipelines racing to wait on each other cannot both be admitted.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::dependency::Dependency;

type Edges = HashMap<Dependency, HashSet<Dependency>>;

/// Which running pipeline is waiting on which.
#[derive(Debug, Default)]
pub(crate) struct WaitGraph {
    edges: Mutex<Edges>,
}

impl WaitGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records that `parent` waits on each child, in order, unless the child
    /// already waits on `parent`.
    ///
    /// Returns `(admitted, refused)`.
    pub(crate) fn admit(
        &self,
        parent: &Dependency,
        children: Vec<Dependency>,
    ) -> (Vec<Dependency>, Vec<Dependency>) {
        let mut edges = self.lock();
        let mut admitted = Vec::with_capacity(children.len());
        let mut refused = Vec::new();

        for child in children {
            if &child == parent || reaches(&edges, &child, parent) {
                refused.push(child);
            } else {
                edges.entry(parent.clone()).or_default().insert(child.clone());
                admitted.push(child);
            }
        }
        (admitted, refused)
    }

    /// Drops the edge `parent -> child` once `parent` stopped waiting on it.
    pub(crate) fn finished_waiting(&self, parent: &Dependency, child: &Dependency) {
        let mut edges = self.lock();
        if let Some(targets) = edges.get_mut(parent) {
            targets.remove(child);
            if targets.is_empty() {
                edges.remove(parent);
            }
        }
    }

    /// Drops every edge leaving `parent`.
    pub(crate) fn release(&self, parent: &Dependency) {
        self.lock().remove(parent);
    }

    /// Number of pipelines currently waiting on at least one other.
    pub(crate) fn waiting(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Edges> {
        // The map stays consistent across a panic; every mutation is a
        // single insert or remove.
        self.edges.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Depth-first search for a path `from -> .. -> to`.
fn reaches(edges: &Edges, from: &Dependency, to: &Dependency) -> bool {
    let mut stack = vec![from];
    let mut seen: HashSet<&Dependency> = HashSet::new();

    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if !seen.insert(node) {
            continue;
        }
        if let Some(targets) = edges.get(node) {
            stack.extend(targets.iter());
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(name: &str) -> Dependency {
        Dependency::new("g", name, "1")
    }

    #[test]
    fn test_admits_acyclic_edges() {
        let graph = WaitGraph::new();
        let (admitted, refused) = graph.admit(&dep("a"), vec![dep("b"), dep("c")]);
        assert_eq!(admitted, vec![dep("b"), dep("c")]);
        assert!(refused.is_empty());
        assert_eq!(graph.waiting(), 1);
    }

    #[test]
    fn test_refuses_direct_back_edge() {
        let graph = WaitGraph::new();
        graph.admit(&dep("a"), vec![dep("b")]);
        let (admitted, refused) = graph.admit(&dep("b"), vec![dep("a")]);
        assert!(admitted.is_empty());
        assert_eq!(refused, vec![dep("a")]);
    }

    #[test]
    fn test_refuses_edge_closing_cycle_across_branches() {
        // a waits on b and c; b waits on c; c must not wait on b.
        let graph = WaitGraph::new();
        graph.admit(&dep("a"), vec![dep("b"), dep("c")]);
        graph.admit(&dep("b"), vec![dep("c")]);
        let (admitted, refused) = graph.admit(&dep("c"), vec![dep("b"), dep("d")]);
        assert_eq!(admitted, vec![dep("d")]);
        assert_eq!(refused, vec![dep("b")]);
    }

    #[test]
    fn test_refuses_self_dependency() {
        let graph = WaitGraph::new();
        let (admitted, refused) = graph.admit(&dep("a"), vec![dep("a")]);
        assert!(admitted.is_empty());
        assert_eq!(refused, vec![dep("a")]);
    }

    #[test]
    fn test_finished_edges_no_longer_block() {
        let graph = WaitGraph::new();
        graph.admit(&dep("a"), vec![dep("b")]);
        graph.finished_waiting(&dep("a"), &dep("b"));
        assert_eq!(graph.waiting(), 0);

        let (admitted, _) = graph.admit(&dep("b"), vec![dep("a")]);
        assert_eq!(admitted, vec![dep("a")]);

        graph.release(&dep("b"));
        assert_eq!(graph.waiting(), 0);
    }
}
