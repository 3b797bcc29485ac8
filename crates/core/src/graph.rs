// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency graph construction and parallel-group analysis

use crate::node::{WorkflowEdge, WorkflowNode};
use std::collections::HashMap;

/// In-degree and adjacency bookkeeping for a node/edge list
///
/// Parallel edges between the same pair each count toward in-degree: every
/// edge is an independent dependency instance. Dangling endpoints are not
/// validated here; an edge from an unknown source leaves its target
/// permanently unready, an edge into an unknown target is inert.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    in_degree: HashMap<String, usize>,
    dependents: HashMap<String, Vec<String>>,
    dependencies: HashMap<String, Vec<String>>,
    // Node ids in input order, for stable iteration
    order: Vec<String>,
}

impl DependencyGraph {
    /// Build the graph from a node list and edge list
    pub fn build(nodes: &[WorkflowNode], edges: &[WorkflowEdge]) -> Self {
        let mut graph = Self {
            order: nodes.iter().map(|n| n.id.clone()).collect(),
            ..Self::default()
        };
        for node in nodes {
            graph.in_degree.insert(node.id.clone(), 0);
            graph.dependents.insert(node.id.clone(), Vec::new());
            graph.dependencies.insert(node.id.clone(), Vec::new());
        }
        for edge in edges {
            *graph.in_degree.entry(edge.target.clone()).or_insert(0) += 1;
            graph
                .dependents
                .entry(edge.source.clone())
                .or_default()
                .push(edge.target.clone());
            graph
                .dependencies
                .entry(edge.target.clone())
                .or_default()
                .push(edge.source.clone());
        }
        graph
    }

    /// Node ids with no incoming edges, in input order
    pub fn roots(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| self.in_degree(id) == 0)
            .cloned()
            .collect()
    }

    /// Count of incoming edges for a node
    pub fn in_degree(&self, id: &str) -> usize {
        self.in_degree.get(id).copied().unwrap_or(0)
    }

    /// Downstream neighbors of a node (one entry per edge)
    pub fn dependents(&self, id: &str) -> &[String] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Upstream neighbors of a node (one entry per edge)
    pub fn dependencies(&self, id: &str) -> &[String] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Node ids in input order
    pub fn node_ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Partition the graph into levels of nodes that can run concurrently
///
/// Repeatedly peels off all zero-in-degree nodes as one level and decrements
/// downstream in-degrees. A graph containing a cycle yields a partial
/// partition that does not cover every node; callers can compare the
/// partition's size against the node count to detect cycles.
pub fn parallel_groups(nodes: &[WorkflowNode], edges: &[WorkflowEdge]) -> Vec<Vec<String>> {
    let graph = DependencyGraph::build(nodes, edges);
    let mut degrees: HashMap<&str, usize> = graph
        .node_ids()
        .iter()
        .map(|id| (id.as_str(), graph.in_degree(id)))
        .collect();
    let mut remaining: Vec<&str> = graph.node_ids().iter().map(String::as_str).collect();
    let mut groups = Vec::new();

    while !remaining.is_empty() {
        let level: Vec<String> = remaining
            .iter()
            .filter(|id| degrees.get(*id).copied().unwrap_or(0) == 0)
            .map(|id| id.to_string())
            .collect();
        if level.is_empty() {
            // Cycle: nothing left at in-degree zero
            break;
        }
        for id in &level {
            for dependent in graph.dependents(id) {
                if let Some(degree) = degrees.get_mut(dependent.as_str()) {
                    *degree = degree.saturating_sub(1);
                }
            }
        }
        remaining.retain(|id| !level.iter().any(|l| l == id));
        groups.push(level);
    }

    groups
}

/// Size of the largest parallel group
pub fn max_parallelism(nodes: &[WorkflowNode], edges: &[WorkflowEdge]) -> usize {
    parallel_groups(nodes, edges)
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
