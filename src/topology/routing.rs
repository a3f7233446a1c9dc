//! Hop-count shortest paths between every ordered pair of nodes.
//!
//! Paths are found with a breadth-first search from each origin. A node's
//! predecessor is the first node that discovers it while walking neighbor
//! lists in adjacency order, so among equally short paths the one found
//! first wins. Callers should rely on path length, not on which of several
//! equal-length paths is returned.

use std::collections::VecDeque;

use log::warn;

use super::types::{NodeIndex, Topology};

/// Precomputed routes, immutable for the duration of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingTable {
    /// `paths[origin][destination]`, `None` when the destination is unreachable
    paths: Vec<Vec<Option<Vec<NodeIndex>>>>,
    gaps: usize,
}

impl RoutingTable {
    /// Compute all routes for a topology
    pub fn build(topology: &Topology) -> Self {
        let count = topology.node_count();
        let mut paths = Vec::with_capacity(count);
        let mut gaps = 0;

        for origin in 0..count {
            let predecessors = bfs_predecessors(topology, origin);
            let row: Vec<Option<Vec<NodeIndex>>> = (0..count)
                .map(|destination| trace_path(&predecessors, origin, destination))
                .collect();

            for (destination, path) in row.iter().enumerate() {
                if path.is_none() {
                    gaps += 1;
                    warn!(
                        "No route from {} to {}; packets between them will be dropped",
                        topology.node_id(origin),
                        topology.node_id(destination)
                    );
                }
            }
            paths.push(row);
        }

        Self { paths, gaps }
    }

    /// Route from `origin` to `destination`, both endpoints included
    pub fn path(&self, origin: NodeIndex, destination: NodeIndex) -> Option<&[NodeIndex]> {
        self.paths
            .get(origin)
            .and_then(|row| row.get(destination))
            .and_then(|path| path.as_deref())
    }

    /// Number of ordered pairs with no route
    pub fn gap_count(&self) -> usize {
        self.gaps
    }
}

fn bfs_predecessors(topology: &Topology, origin: NodeIndex) -> Vec<Option<NodeIndex>> {
    let mut visited = vec![false; topology.node_count()];
    let mut predecessors = vec![None; topology.node_count()];
    let mut queue = VecDeque::new();

    visited[origin] = true;
    queue.push_back(origin);
    while let Some(current) = queue.pop_front() {
        for &neighbor in topology.neighbors(current) {
            if !visited[neighbor] {
                visited[neighbor] = true;
                predecessors[neighbor] = Some(current);
                queue.push_back(neighbor);
            }
        }
    }

    predecessors
}

fn trace_path(
    predecessors: &[Option<NodeIndex>],
    origin: NodeIndex,
    destination: NodeIndex,
) -> Option<Vec<NodeIndex>> {
    let mut path = vec![destination];
    let mut current = destination;
    while current != origin {
        current = predecessors[current]?;
        path.push(current);
    }
    path.reverse();
    Some(path)
}
