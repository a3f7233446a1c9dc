//! Packet admission and forwarding.
//!
//! [`advance`] turns one committed [`SimulationState`] into the next. Within a
//! tick, packets are considered in a fixed order: every node's queue in node
//! order (oldest first), then the previous tick's in-flight packets. Link
//! capacity is handed out first come, first served in that order. A packet
//! that cannot cross its next link stays queued at the node it is already at.

use log::{debug, trace};
use rand::Rng;

use crate::ledger::CapacityLedger;
use crate::state::{DropReason, LinkState, NodeState, Packet, SimulationState, TickCounters};
use crate::topology::{RoutingTable, Topology};
use crate::traffic::{Generated, TrafficModel};

/// Everything a tick reads besides the previous state
#[derive(Debug, Clone, Copy)]
pub struct TickInputs<'a> {
    pub topology: &'a Topology,
    pub routes: &'a RoutingTable,
    pub traffic: &'a TrafficModel,
    /// Capacity per link, in link order
    pub capacities: &'a [u32],
    pub packet_ttl: u32,
}

/// What happened to one candidate packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Advanced(Packet),
    Blocked(Packet),
    Dropped(DropReason),
}

/// Compute the state that follows `prev`
pub fn advance<R: Rng>(
    prev: &SimulationState,
    inputs: &TickInputs<'_>,
    rng: &mut R,
) -> SimulationState {
    let mut ledger = CapacityLedger::new(inputs.topology.link_count());
    let mut counters = TickCounters::default();

    let mut nodes: Vec<NodeState> = prev
        .nodes
        .iter()
        .map(|node| NodeState {
            id: node.id.clone(),
            position: node.position,
            queue: Vec::new(),
            generated: 0,
        })
        .collect();
    let mut in_flight = Vec::with_capacity(prev.in_flight.len());

    let candidates = prev
        .nodes
        .iter()
        .flat_map(|node| node.queue.iter())
        .chain(prev.in_flight.iter());

    for packet in candidates {
        match forward(packet, inputs, &mut ledger) {
            Disposition::Advanced(packet) => {
                counters.advanced += 1;
                in_flight.push(packet);
            }
            Disposition::Blocked(packet) => {
                counters.blocked += 1;
                let at = packet.at_node;
                nodes[at].queue.push(packet);
            }
            Disposition::Dropped(reason) => {
                trace!("packet {} dropped at {}: {:?}", packet.id, packet.at_node, reason);
                counters.record_drop(reason);
            }
        }
    }

    let mut next_packet_id = prev.next_packet_id;
    let node_count = inputs.topology.node_count();
    for (origin, node) in nodes.iter_mut().enumerate() {
        for _ in 0..inputs.traffic.packets_per_tick(origin) {
            let generated = inputs.traffic.generate(
                origin,
                node_count,
                inputs.routes,
                next_packet_id,
                inputs.packet_ttl,
                &mut *rng,
            );
            let Some(generated) = generated else {
                break;
            };
            next_packet_id += 1;
            node.generated += 1;
            counters.generated += 1;

            match generated {
                Generated::Packet(packet) => in_flight.push(packet),
                Generated::Unroutable { origin, destination } => {
                    trace!("no route from {} to {}, packet dropped", origin, destination);
                    counters.record_drop(DropReason::RoutingGap);
                }
            }
        }
    }

    let links: Vec<LinkState> = prev
        .links
        .iter()
        .zip(ledger.loads())
        .enumerate()
        .map(|(index, (link, load))| LinkState {
            from: link.from,
            to: link.to,
            capacity: inputs.capacities.get(index).copied().unwrap_or(link.capacity),
            load,
        })
        .collect();

    let mut totals = prev.totals;
    totals.accumulate(&counters);

    debug!(
        "tick {}: generated {}, advanced {}, blocked {}, delivered {}, lost {}",
        prev.tick + 1,
        counters.generated,
        counters.advanced,
        counters.blocked,
        counters.delivered,
        counters.lost()
    );

    SimulationState {
        tick: prev.tick + 1,
        nodes,
        links,
        in_flight,
        next_packet_id,
        last_tick: counters,
        totals,
    }
}

/// Decide the fate of one packet and record any link traversal in the ledger
pub fn forward(packet: &Packet, inputs: &TickInputs<'_>, ledger: &mut CapacityLedger) -> Disposition {
    if packet.has_arrived() {
        return Disposition::Dropped(DropReason::Delivered);
    }
    if packet.ttl == 0 {
        return Disposition::Dropped(DropReason::Expired);
    }
    if !packet.is_well_formed() {
        return Disposition::Dropped(DropReason::Malformed);
    }
    let Some(next) = packet.next_node() else {
        return Disposition::Dropped(DropReason::Malformed);
    };
    let Some((link, direction)) = inputs.topology.link_between(packet.at_node, next) else {
        return Disposition::Dropped(DropReason::Malformed);
    };

    let capacity = inputs.capacities.get(link).copied().unwrap_or(0);
    if ledger.try_admit(link, direction, capacity) {
        Disposition::Advanced(Packet {
            current_hop: packet.current_hop + 1,
            at_node: next,
            ttl: packet.ttl - 1,
            ..packet.clone()
        })
    } else {
        Disposition::Blocked(Packet {
            ttl: packet.ttl - 1,
            ..packet.clone()
        })
    }
}
