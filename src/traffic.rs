//! Traffic source model.
//!
//! Each node has a generation rate in packets per second of simulated time.
//! The number of packets a node originates in one tick is the rate divided by
//! the number of ticks per second, rounded down.

use std::time::Duration;

use rand::Rng;

use crate::config::{per_tick, validate_rate, validate_tick_duration, ConfigError, NetworkConfig};
use crate::state::Packet;
use crate::topology::{NodeIndex, RoutingTable};

/// Outcome of trying to originate one packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    /// A routable packet ready to enter the network
    Packet(Packet),
    /// The chosen destination has no route from the origin
    Unroutable {
        origin: NodeIndex,
        destination: NodeIndex,
    },
}

/// Per-node generation rates plus the tick length they are scaled by
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficModel {
    rates: Vec<f64>,
    tick_duration: Duration,
}

impl TrafficModel {
    pub fn new(rates: Vec<f64>, tick_duration: Duration) -> Self {
        Self {
            rates,
            tick_duration,
        }
    }

    /// Rates in configured node order
    pub fn from_config(network: &NetworkConfig, tick_duration: Duration) -> Self {
        Self::new(network.nodes.iter().map(|n| n.rate).collect(), tick_duration)
    }

    pub fn rate(&self, node: NodeIndex) -> f64 {
        self.rates.get(node).copied().unwrap_or(0.0)
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Change a node's rate; rejected without effect if the rate is invalid
    pub fn set_rate(&mut self, node: NodeIndex, node_id: &str, rate: f64) -> Result<(), ConfigError> {
        validate_rate(node_id, rate, self.tick_duration)?;
        match self.rates.get_mut(node) {
            Some(slot) => {
                *slot = rate;
                Ok(())
            }
            None => Err(ConfigError::InvalidNode(format!("unknown node '{}'", node_id))),
        }
    }

    /// Change the tick length every rate is scaled by.
    ///
    /// `node_ids` names the rates in node order for error reporting; nothing
    /// changes if any rate would exceed the per-tick ceiling.
    pub fn set_tick_duration(
        &mut self,
        tick_duration: Duration,
        node_ids: &[&str],
    ) -> Result<(), ConfigError> {
        validate_tick_duration(tick_duration)?;
        for (node, rate) in self.rates.iter().enumerate() {
            let node_id = node_ids.get(node).copied().unwrap_or("?");
            validate_rate(node_id, *rate, tick_duration)?;
        }
        self.tick_duration = tick_duration;
        Ok(())
    }

    /// Packets a node originates in one tick
    pub fn packets_per_tick(&self, node: NodeIndex) -> u64 {
        // rate / (1s / tick) == rate * tick_nanos / 1e9, which stays exact for whole results
        let count = per_tick(self.rate(node), self.tick_duration);
        if count.is_finite() && count > 0.0 {
            count.floor() as u64
        } else {
            0
        }
    }

    /// Originate one packet at `origin` with a uniformly random destination.
    ///
    /// Returns `None` when the network has no other node to send to.
    pub fn generate<R: Rng>(
        &self,
        origin: NodeIndex,
        node_count: usize,
        routes: &RoutingTable,
        id: u64,
        ttl: u32,
        rng: &mut R,
    ) -> Option<Generated> {
        let destination = pick_destination(origin, node_count, rng)?;
        let generated = match routes.path(origin, destination) {
            Some(path) => Generated::Packet(Packet {
                id,
                source: origin,
                destination,
                path: path.to_vec(),
                current_hop: 0,
                at_node: origin,
                ttl,
            }),
            None => Generated::Unroutable {
                origin,
                destination,
            },
        };
        Some(generated)
    }
}

/// Uniform choice among every node except `origin`
pub fn pick_destination<R: Rng>(
    origin: NodeIndex,
    node_count: usize,
    rng: &mut R,
) -> Option<NodeIndex> {
    if node_count < 2 {
        return None;
    }
    let choice = rng.gen_range(0..node_count - 1);
    Some(if choice >= origin { choice + 1 } else { choice })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::topology::Topology;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_packets_per_tick() {
        let model = TrafficModel::new(vec![50.0, 1000.0, 999.0, 0.0, 2.5], Duration::from_secs(1));
        assert_eq!(model.packets_per_tick(0), 50);
        assert_eq!(model.packets_per_tick(3), 0);
        assert_eq!(model.packets_per_tick(4), 2);

        let model = TrafficModel::new(vec![50.0, 1000.0, 999.0], Duration::from_millis(1));
        assert_eq!(model.packets_per_tick(0), 0);
        assert_eq!(model.packets_per_tick(1), 1);
        assert_eq!(model.packets_per_tick(2), 0);

        let model = TrafficModel::new(vec![30.0], Duration::from_millis(100));
        assert_eq!(model.packets_per_tick(0), 3);
        // Unknown nodes generate nothing
        assert_eq!(model.packets_per_tick(9), 0);
    }

    #[test]
    fn test_set_rate_validation() {
        let mut model = TrafficModel::new(vec![1.0, 2.0], Duration::from_secs(1));
        assert!(model.set_rate(1, "B", 7.0).is_ok());
        assert_eq!(model.rate(1), 7.0);

        assert!(model.set_rate(1, "B", -1.0).is_err());
        assert_eq!(model.rate(1), 7.0);
        assert!(model.set_rate(5, "Z", 1.0).is_err());

        // A rate that would materialize too many packets in one tick
        assert!(matches!(
            model.set_rate(0, "A", 1e15),
            Err(ConfigError::InvalidRate { .. })
        ));
        assert_eq!(model.rate(0), 1.0);
        assert_eq!(model.packets_per_tick(0), 1);
    }

    #[test]
    fn test_set_tick_duration() {
        let mut model = TrafficModel::new(vec![40.0, 500_000.0], Duration::from_secs(1));
        let ids = ["A", "B"];

        assert!(model.set_tick_duration(Duration::from_millis(100), &ids).is_ok());
        assert_eq!(model.packets_per_tick(0), 4);
        assert_eq!(model.packets_per_tick(1), 50_000);

        assert!(matches!(
            model.set_tick_duration(Duration::ZERO, &ids),
            Err(ConfigError::InvalidGeneral(_))
        ));
        // B would originate 1.5 million packets per tick
        assert_eq!(
            model.set_tick_duration(Duration::from_secs(3), &ids),
            Err(ConfigError::InvalidRate {
                node: "B".to_string(),
                rate: 500_000.0,
            })
        );
        assert_eq!(model.tick_duration(), Duration::from_millis(100));
    }

    #[test]
    fn test_destination_never_origin() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [0usize; 5];
        for _ in 0..2000 {
            let dest = pick_destination(2, 5, &mut rng).unwrap();
            assert_ne!(dest, 2);
            seen[dest] += 1;
        }
        // Every other node gets chosen
        for (node, count) in seen.iter().enumerate() {
            if node != 2 {
                assert!(*count > 300, "node {} chosen {} times", node, count);
            }
        }
        assert_eq!(pick_destination(0, 1, &mut rng), None);
    }

    #[test]
    fn test_generated_packet_starts_at_origin() {
        let config = Config::default();
        let topology = Topology::from_config(&config.network).unwrap();
        let routes = RoutingTable::build(&topology);
        let model = TrafficModel::from_config(&config.network, config.general.tick_duration);
        let mut rng = StdRng::seed_from_u64(11);

        for id in 0..50 {
            match model.generate(0, topology.node_count(), &routes, id, 100, &mut rng) {
                Some(Generated::Packet(packet)) => {
                    assert_eq!(packet.id, id);
                    assert_eq!(packet.current_hop, 0);
                    assert_eq!(packet.at_node, 0);
                    assert_eq!(packet.ttl, 100);
                    assert_ne!(packet.destination, 0);
                    assert!(packet.is_well_formed());
                }
                other => panic!("unexpected generation result: {:?}", other),
            }
        }
    }
}
