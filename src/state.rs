//! Simulation state values.
//!
//! A [`SimulationState`] is a complete, self-contained snapshot. The engine
//! never mutates one in place; each tick reads the previous value and builds
//! its replacement.

use serde::Serialize;

use crate::topology::{NodeIndex, Topology};

/// A packet travelling along its precomputed route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Packet {
    pub id: u64,
    pub source: NodeIndex,
    pub destination: NodeIndex,
    /// Full route, `path[0] == source` and `path[last] == destination`
    pub path: Vec<NodeIndex>,
    /// Index into `path` of the node the packet currently sits at
    pub current_hop: usize,
    pub at_node: NodeIndex,
    pub ttl: u32,
}

impl Packet {
    /// Node the packet wants to move to next, if its route has one
    pub fn next_node(&self) -> Option<NodeIndex> {
        self.path.get(self.current_hop + 1).copied()
    }

    pub fn has_arrived(&self) -> bool {
        self.at_node == self.destination
    }

    /// Whether the route bookkeeping is internally consistent
    pub fn is_well_formed(&self) -> bool {
        self.path.first() == Some(&self.source)
            && self.path.last() == Some(&self.destination)
            && self.path.get(self.current_hop) == Some(&self.at_node)
    }
}

/// Per-node state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeState {
    pub id: String,
    pub position: (f64, f64),
    /// Packets blocked here waiting for link capacity, oldest first
    pub queue: Vec<Packet>,
    /// Packets originated here during the most recent tick
    pub generated: u64,
}

/// Per-link state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkState {
    pub from: NodeIndex,
    pub to: NodeIndex,
    /// Maximum packets per tick, both directions combined
    pub capacity: u32,
    /// Packets that crossed the link during the most recent tick
    pub load: u32,
}

/// Why a packet left the live set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DropReason {
    /// Reached its destination
    Delivered,
    /// Time-to-live ran out
    Expired,
    /// No route exists between source and destination
    RoutingGap,
    /// Route or hop index inconsistent with the topology
    Malformed,
}

/// Packet accounting, used both per tick and cumulatively
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickCounters {
    pub generated: u64,
    pub delivered: u64,
    pub expired: u64,
    pub routing_gaps: u64,
    pub malformed: u64,
    /// Packets that crossed a link
    pub advanced: u64,
    /// Packets held back for lack of capacity
    pub blocked: u64,
}

impl TickCounters {
    pub fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::Delivered => self.delivered += 1,
            DropReason::Expired => self.expired += 1,
            DropReason::RoutingGap => self.routing_gaps += 1,
            DropReason::Malformed => self.malformed += 1,
        }
    }

    /// Packets removed for any reason other than delivery
    pub fn lost(&self) -> u64 {
        self.expired + self.routing_gaps + self.malformed
    }

    pub fn accumulate(&mut self, other: &TickCounters) {
        self.generated += other.generated;
        self.delivered += other.delivered;
        self.expired += other.expired;
        self.routing_gaps += other.routing_gaps;
        self.malformed += other.malformed;
        self.advanced += other.advanced;
        self.blocked += other.blocked;
    }
}

/// Complete network state at a tick boundary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationState {
    /// Ticks completed since the last reset
    pub tick: u64,
    pub nodes: Vec<NodeState>,
    pub links: Vec<LinkState>,
    /// Packets that are not sitting in a node queue
    pub in_flight: Vec<Packet>,
    /// Identifier handed to the next generated packet
    pub next_packet_id: u64,
    /// Accounting for the most recent tick
    pub last_tick: TickCounters,
    /// Accounting since the last reset
    pub totals: TickCounters,
}

impl SimulationState {
    /// Empty state for a topology with the given per-link capacities
    pub fn initial(topology: &Topology, capacities: &[u32]) -> Self {
        let nodes = topology
            .nodes()
            .iter()
            .map(|node| NodeState {
                id: node.id.clone(),
                position: node.position,
                queue: Vec::new(),
                generated: 0,
            })
            .collect();
        let links = (0..topology.link_count())
            .map(|index| {
                let (from, to) = topology.endpoints(index);
                LinkState {
                    from,
                    to,
                    capacity: capacities.get(index).copied().unwrap_or(0),
                    load: 0,
                }
            })
            .collect();

        Self {
            tick: 0,
            nodes,
            links,
            in_flight: Vec::new(),
            next_packet_id: 0,
            last_tick: TickCounters::default(),
            totals: TickCounters::default(),
        }
    }

    /// Total packets queued across all nodes
    pub fn queued_count(&self) -> usize {
        self.nodes.iter().map(|n| n.queue.len()).sum()
    }

    /// Every live packet, queued or in flight
    pub fn live_count(&self) -> usize {
        self.queued_count() + self.in_flight.len()
    }

    pub fn live_packets(&self) -> impl Iterator<Item = &Packet> {
        self.nodes
            .iter()
            .flat_map(|n| n.queue.iter())
            .chain(self.in_flight.iter())
    }
}
