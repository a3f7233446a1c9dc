//! Topology type definitions.
//!
//! Nodes and links are addressed by their position in the configuration, so
//! every per-node and per-link table in the crate is a plain `Vec` indexed by
//! [`NodeIndex`] or [`LinkIndex`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, NetworkConfig};

/// Position of a node in the configured node list
pub type NodeIndex = usize;

/// Position of a link in the configured link list
pub type LinkIndex = usize;

/// Which way a packet crosses an undirected link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// From the link's configured `from` endpoint to its `to` endpoint
    Forward,
    /// From `to` back to `from`
    Reverse,
}

/// A node as the topology sees it
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyNode {
    pub id: String,
    pub position: (f64, f64),
}

/// Static graph of nodes and undirected links
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: Vec<TopologyNode>,
    links: Vec<(NodeIndex, NodeIndex)>,
    adjacency: Vec<Vec<NodeIndex>>,
    by_id: HashMap<String, NodeIndex>,
    link_lookup: HashMap<(NodeIndex, NodeIndex), (LinkIndex, Direction)>,
}

impl Topology {
    /// Build the graph from a network configuration.
    ///
    /// Neighbor lists are filled in link-list order, `from` side first, which
    /// fixes the tie-break order used by the routing table.
    pub fn from_config(network: &NetworkConfig) -> Result<Self, ConfigError> {
        let mut nodes = Vec::with_capacity(network.nodes.len());
        let mut by_id = HashMap::with_capacity(network.nodes.len());
        for node in &network.nodes {
            if by_id.insert(node.id.clone(), nodes.len()).is_some() {
                return Err(ConfigError::DuplicateNode(node.id.clone()));
            }
            nodes.push(TopologyNode {
                id: node.id.clone(),
                position: node.position,
            });
        }

        let mut links = Vec::with_capacity(network.links.len());
        let mut adjacency = vec![Vec::new(); nodes.len()];
        let mut link_lookup = HashMap::with_capacity(network.links.len() * 2);
        for link in &network.links {
            let resolve = |id: &String| {
                by_id.get(id).copied().ok_or_else(|| ConfigError::UnknownNode {
                    link: link.label(),
                    node: id.clone(),
                })
            };
            let from = resolve(&link.from)?;
            let to = resolve(&link.to)?;
            if from == to || link_lookup.contains_key(&(from, to)) {
                return Err(ConfigError::InvalidLink(format!(
                    "link {} is a self loop or duplicate",
                    link.label()
                )));
            }

            let index = links.len();
            links.push((from, to));
            adjacency[from].push(to);
            adjacency[to].push(from);
            link_lookup.insert((from, to), (index, Direction::Forward));
            link_lookup.insert((to, from), (index, Direction::Reverse));
        }

        Ok(Self {
            nodes,
            links,
            adjacency,
            by_id,
            link_lookup,
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn nodes(&self) -> &[TopologyNode] {
        &self.nodes
    }

    /// Identifier of the node at `index`
    pub fn node_id(&self, index: NodeIndex) -> &str {
        &self.nodes[index].id
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.by_id.get(id).copied()
    }

    /// Neighbors in adjacency insertion order
    pub fn neighbors(&self, index: NodeIndex) -> &[NodeIndex] {
        &self.adjacency[index]
    }

    /// Endpoints of a link as configured
    pub fn endpoints(&self, link: LinkIndex) -> (NodeIndex, NodeIndex) {
        self.links[link]
    }

    /// The link joining two nodes and the direction of travel from `a` to `b`
    pub fn link_between(&self, a: NodeIndex, b: NodeIndex) -> Option<(LinkIndex, Direction)> {
        self.link_lookup.get(&(a, b)).copied()
    }
}
