//! Deterministic dependency ordering for job-graph deployments.
//!
//! A [`JobGraph`] takes the deployment's resource nodes and their `requires`
//! edges, computes one total order at construction time, and then hands nodes
//! out through a cursor. The same input always yields the same sequence:
//! nodes that become ready together are emitted in the order they were first
//! added, never in hash order. Because the emitted order and the cursor are
//! plain data, a graph can be serialized mid-traversal and resumed by a
//! different process without replaying any submissions.
//!
//! Cyclic input is rejected when the graph is built. No partially usable
//! graph ever escapes construction.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Resource;

/// Errors raised while building or traversing a [`JobGraph`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The `requires` edges contain at least one cycle.
    #[error("dependency cycle detected among nodes: {nodes:?}")]
    CycleDetected { nodes: Vec<String> },

    /// A node requires a node name that is not part of the graph.
    #[error("node '{node}' requires unknown node '{requires}'")]
    UnknownDependency { node: String, requires: String },

    /// Two nodes share the same name.
    #[error("duplicate node name '{node}'")]
    DuplicateNode { node: String },

    /// `next()` was called after every node had been emitted.
    #[error("traversal exhausted: all {total} node(s) already emitted")]
    Exhausted { total: usize },
}

/// Topologically ordered, cursor-tracking view of a deployment's job nodes.
///
/// The full order is fixed at construction; traversal only moves the cursor.
/// `reset()` rewinds the cursor without recomputing anything, so a re-run
/// (for example after falling back to another provider) replays the exact
/// sequence the previous attempt saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobGraph {
    order: Vec<String>,
    cursor: usize,
}

impl JobGraph {
    /// Build a graph from `(node, requires)` pairs.
    ///
    /// Rejects duplicate node names, edges to unknown nodes, and cycles.
    /// A node that requires itself is a cycle.
    pub fn build<I, S>(nodes: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (S, Vec<S>)>,
        S: Into<String>,
    {
        let nodes: Vec<(String, Vec<String>)> = nodes
            .into_iter()
            .map(|(name, requires)| {
                (
                    name.into(),
                    requires.into_iter().map(Into::into).collect(),
                )
            })
            .collect();

        let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
        for (position, (name, _)) in nodes.iter().enumerate() {
            if index.insert(name.as_str(), position).is_some() {
                return Err(GraphError::DuplicateNode { node: name.clone() });
            }
        }

        // dependents[d] lists nodes that must wait for d; in_degree counts
        // unmet requirements per node.
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        let mut in_degree: Vec<usize> = vec![0; nodes.len()];
        for (position, (name, requires)) in nodes.iter().enumerate() {
            for dependency in requires {
                let Some(&dep_position) = index.get(dependency.as_str()) else {
                    return Err(GraphError::UnknownDependency {
                        node: name.clone(),
                        requires: dependency.clone(),
                    });
                };
                dependents[dep_position].push(position);
                in_degree[position] += 1;
            }
        }

        // Kahn's algorithm. The ready set is a min-heap over insertion
        // position, which pins the order of nodes that become ready together
        // to the order they were added.
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(position, _)| Reverse(position))
            .collect();

        let mut order = Vec::with_capacity(nodes.len());
        let mut emitted = vec![false; nodes.len()];
        while let Some(Reverse(position)) = ready.pop() {
            emitted[position] = true;
            order.push(nodes[position].0.clone());
            for &dependent in &dependents[position] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        if order.len() != nodes.len() {
            let remaining = nodes
                .iter()
                .enumerate()
                .filter(|(position, _)| !emitted[*position])
                .map(|(_, (name, _))| name.clone())
                .collect();
            return Err(GraphError::CycleDetected { nodes: remaining });
        }

        Ok(Self { order, cursor: 0 })
    }

    /// Build a graph from persisted deployment resources.
    pub fn from_resources(resources: &[Resource]) -> Result<Self, GraphError> {
        Self::build(
            resources
                .iter()
                .map(|resource| (resource.node_name.clone(), resource.requires.clone())),
        )
    }

    /// Whether any node remains unemitted.
    pub fn has_next(&self) -> bool {
        self.cursor < self.order.len()
    }

    /// Advance the cursor and return the next node name.
    pub fn next(&mut self) -> Result<&str, GraphError> {
        if self.cursor >= self.order.len() {
            return Err(GraphError::Exhausted {
                total: self.order.len(),
            });
        }
        let node = self.order[self.cursor].as_str();
        self.cursor += 1;
        Ok(node)
    }

    /// The node the cursor last emitted, if traversal has started.
    pub fn current(&self) -> Option<&str> {
        if self.cursor == 0 {
            None
        } else {
            self.order.get(self.cursor - 1).map(String::as_str)
        }
    }

    /// Whether `current()` would return a node.
    pub fn has_current(&self) -> bool {
        self.cursor > 0
    }

    /// Rewind the cursor so the identical sequence replays from the start.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Total node count.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the graph has no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Nodes not yet emitted by the cursor.
    pub fn remaining(&self) -> usize {
        self.order.len() - self.cursor
    }

    /// The full emitted order, independent of the cursor.
    pub fn order(&self) -> &[String] {
        &self.order
    }
}
