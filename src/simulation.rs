//! Simulation state container.
//!
//! [`Simulation`] owns the committed [`SimulationState`] together with the
//! fixed topology, the routing table, and the editable traffic rates and link
//! capacities. Each call to [`Simulation::tick`] replaces the committed state
//! wholesale with the engine's output.

use std::time::Duration;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{validate_capacity, validate_packet_ttl, Config, ConfigError};
use crate::engine::{self, TickInputs};
use crate::report::Snapshot;
use crate::state::SimulationState;
use crate::topology::{NodeIndex, RoutingTable, Topology};
use crate::traffic::TrafficModel;

#[derive(Debug)]
pub struct Simulation {
    /// Configuration restored by [`Simulation::reset`]
    config: Config,
    topology: Topology,
    routes: RoutingTable,
    traffic: TrafficModel,
    capacities: Vec<u32>,
    initial_capacities: Vec<u32>,
    packet_ttl: u32,
    seed: u64,
    rng: StdRng,
    state: SimulationState,
    running: bool,
}

impl Simulation {
    /// Build a paused simulation at tick zero.
    ///
    /// When the configuration carries no seed one is drawn at random and kept,
    /// so a reset replays the same destination sequence.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let topology = Topology::from_config(&config.network)?;
        let routes = RoutingTable::build(&topology);
        let traffic = TrafficModel::from_config(&config.network, config.general.tick_duration);
        let capacities = configured_capacities(&config)?;
        let packet_ttl = config.general.packet_ttl;
        let seed = config.general.seed.unwrap_or_else(rand::random);
        let state = SimulationState::initial(&topology, &capacities);

        info!(
            "Simulation ready: {} nodes, {} links, {} unroutable pairs, seed {}",
            topology.node_count(),
            topology.link_count(),
            routes.gap_count(),
            seed
        );

        Ok(Self {
            config,
            topology,
            routes,
            traffic,
            initial_capacities: capacities.clone(),
            capacities,
            packet_ttl,
            seed,
            rng: StdRng::seed_from_u64(seed),
            state,
            running: false,
        })
    }

    /// Resume scheduling ticks
    pub fn start(&mut self) {
        if !self.running {
            info!("Simulation started at tick {}", self.state.tick);
            self.running = true;
        }
    }

    /// Stop scheduling ticks; the committed state stays visible
    pub fn pause(&mut self) {
        if self.running {
            info!("Simulation paused at tick {}", self.state.tick);
            self.running = false;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Return to the initial configuration with no packets and a zero tick counter
    pub fn reset(&mut self) {
        self.running = false;
        self.traffic = TrafficModel::from_config(&self.config.network, self.config.general.tick_duration);
        self.capacities = self.initial_capacities.clone();
        self.packet_ttl = self.config.general.packet_ttl;
        self.rng = StdRng::seed_from_u64(self.seed);
        self.state = SimulationState::initial(&self.topology, &self.capacities);
        info!("Simulation reset");
    }

    /// Run exactly one tick and commit its result
    pub fn tick(&mut self) -> &SimulationState {
        let inputs = TickInputs {
            topology: &self.topology,
            routes: &self.routes,
            traffic: &self.traffic,
            capacities: &self.capacities,
            packet_ttl: self.packet_ttl,
        };
        let next = engine::advance(&self.state, &inputs, &mut self.rng);
        self.state = next;
        &self.state
    }

    /// Change a node's generation rate starting with the next tick
    pub fn set_node_rate(&mut self, node_id: &str, rate: f64) -> Result<(), ConfigError> {
        let node = self.node_index(node_id)?;
        self.traffic.set_rate(node, node_id, rate)?;
        debug!("Rate of {} set to {}", node_id, rate);
        Ok(())
    }

    /// Change a link's capacity starting with the next tick
    pub fn set_link_capacity(&mut self, from: &str, to: &str, capacity: i64) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownLink {
            from: from.to_string(),
            to: to.to_string(),
        };
        let a = self.topology.index_of(from).ok_or_else(unknown)?;
        let b = self.topology.index_of(to).ok_or_else(unknown)?;
        let (link, _) = self.topology.link_between(a, b).ok_or_else(unknown)?;

        validate_capacity(&format!("{}-{}", from, to), capacity)?;
        let capacity = u32::try_from(capacity).map_err(|_| ConfigError::InvalidCapacity {
            link: format!("{}-{}", from, to),
            capacity,
        })?;

        // The committed link keeps the capacity its load was admitted against
        self.capacities[link] = capacity;
        debug!("Capacity of {}-{} set to {}", from, to, capacity);
        Ok(())
    }

    /// Change the TTL given to packets generated from the next tick on
    pub fn set_packet_ttl(&mut self, packet_ttl: u32) -> Result<(), ConfigError> {
        validate_packet_ttl(packet_ttl)?;
        self.packet_ttl = packet_ttl;
        debug!("Packet TTL set to {}", packet_ttl);
        Ok(())
    }

    /// Change the tick length that rates are scaled by, starting with the next tick.
    ///
    /// Rejected if it is zero or if any current rate would exceed the per-tick
    /// ceiling at the new length. A paced [`Clock`](crate::clock::Clock) keeps
    /// the interval it was built with.
    pub fn set_tick_duration(&mut self, tick_duration: Duration) -> Result<(), ConfigError> {
        let ids: Vec<&str> = self.config.network.nodes.iter().map(|n| n.id.as_str()).collect();
        self.traffic.set_tick_duration(tick_duration, &ids)?;
        debug!("Tick duration set to {:?}", tick_duration);
        Ok(())
    }

    /// The last committed state
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_state(&self.state, &self.topology)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    pub fn traffic(&self) -> &TrafficModel {
        &self.traffic
    }

    /// Capacities the next tick will admit against
    pub fn capacities(&self) -> &[u32] {
        &self.capacities
    }

    pub fn packet_ttl(&self) -> u32 {
        self.packet_ttl
    }

    pub fn tick_duration(&self) -> Duration {
        self.traffic.tick_duration()
    }

    /// Seed in use for destination selection
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn node_index(&self, node_id: &str) -> Result<NodeIndex, ConfigError> {
        self.topology
            .index_of(node_id)
            .ok_or_else(|| ConfigError::InvalidNode(format!("unknown node '{}'", node_id)))
    }
}

fn configured_capacities(config: &Config) -> Result<Vec<u32>, ConfigError> {
    config
        .network
        .links
        .iter()
        .map(|link| {
            u32::try_from(link.capacity).map_err(|_| ConfigError::InvalidCapacity {
                link: link.label(),
                capacity: link.capacity,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> Simulation {
        let mut config = Config::default();
        config.general.seed = Some(seed);
        Simulation::new(config).unwrap()
    }

    #[test]
    fn test_new_is_paused_at_tick_zero() {
        let sim = seeded(1);
        assert!(!sim.is_running());
        assert_eq!(sim.state().tick, 0);
        assert_eq!(sim.state().live_count(), 0);
        assert_eq!(sim.capacities(), &[100, 80, 70, 90, 100, 60]);
    }

    #[test]
    fn test_start_pause() {
        let mut sim = seeded(1);
        sim.start();
        assert!(sim.is_running());
        sim.pause();
        assert!(!sim.is_running());

        // Manual stepping works while paused
        sim.tick();
        assert_eq!(sim.state().tick, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.network.links[0].capacity = -3;
        assert!(Simulation::new(config).is_err());
    }

    #[test]
    fn test_random_seed_is_recorded() {
        let sim = Simulation::new(Config::default()).unwrap();
        let mut again = Config::default();
        again.general.seed = Some(sim.seed());
        let mut replay = Simulation::new(again).unwrap();

        let mut sim = sim;
        for _ in 0..5 {
            sim.tick();
            replay.tick();
        }
        assert_eq!(sim.state(), replay.state());
    }

    #[test]
    fn test_set_node_rate() {
        let mut sim = seeded(2);
        sim.set_node_rate("A", 5.0).unwrap();
        assert_eq!(sim.traffic().rate(0), 5.0);
        sim.tick();
        assert_eq!(sim.state().nodes[0].generated, 5);

        assert!(sim.set_node_rate("A", -1.0).is_err());
        assert!(sim.set_node_rate("Z", 1.0).is_err());
        assert_eq!(sim.traffic().rate(0), 5.0);
    }

    #[test]
    fn test_set_link_capacity() {
        let mut sim = seeded(2);
        sim.set_link_capacity("B", "A", 7).unwrap();
        assert_eq!(sim.capacities()[0], 7);
        // The committed state changes only when the next tick runs
        assert_eq!(sim.state().links[0].capacity, 100);
        sim.tick();
        assert_eq!(sim.state().links[0].capacity, 7);

        assert!(matches!(
            sim.set_link_capacity("A", "E", 7),
            Err(ConfigError::UnknownLink { .. })
        ));
        assert!(matches!(
            sim.set_link_capacity("A", "B", -1),
            Err(ConfigError::InvalidCapacity { .. })
        ));
        assert_eq!(sim.capacities()[0], 7);
    }

    #[test]
    fn test_lowered_capacity_keeps_committed_load_within_limit() {
        let mut config = Config::default();
        config.general.seed = Some(4);
        for node in &mut config.network.nodes {
            node.rate *= 4.0;
        }
        let mut sim = Simulation::new(config).unwrap();
        for _ in 0..5 {
            sim.tick();
        }
        assert!(sim.state().links[0].load > 1);

        sim.set_link_capacity("A", "B", 1).unwrap();
        for link in &sim.state().links {
            assert!(link.load <= link.capacity);
        }
        for link in &sim.snapshot().links {
            assert!(link.load <= link.capacity);
            assert!(link.utilization <= 1.0);
        }

        sim.tick();
        assert_eq!(sim.state().links[0].capacity, 1);
        assert!(sim.state().links[0].load <= 1);
    }

    #[test]
    fn test_set_packet_ttl() {
        let mut sim = seeded(6);
        sim.set_packet_ttl(3).unwrap();
        assert_eq!(sim.packet_ttl(), 3);
        sim.tick();
        assert!(sim.state().live_packets().all(|p| p.ttl == 3));

        assert!(matches!(sim.set_packet_ttl(0), Err(ConfigError::InvalidGeneral(_))));
        assert_eq!(sim.packet_ttl(), 3);
    }

    #[test]
    fn test_set_tick_duration() {
        let mut sim = seeded(6);
        sim.set_tick_duration(Duration::from_millis(100)).unwrap();
        assert_eq!(sim.tick_duration(), Duration::from_millis(100));
        sim.tick();
        // A generates 50 per second
        assert_eq!(sim.state().nodes[0].generated, 5);

        assert!(matches!(
            sim.set_tick_duration(Duration::ZERO),
            Err(ConfigError::InvalidGeneral(_))
        ));
        sim.set_node_rate("E", 1_000_000.0).unwrap();
        assert!(matches!(
            sim.set_tick_duration(Duration::from_secs(2)),
            Err(ConfigError::InvalidRate { .. })
        ));
        assert_eq!(sim.tick_duration(), Duration::from_millis(100));
    }

    #[test]
    fn test_reset_restores_configuration() {
        let mut sim = seeded(3);
        let initial = sim.state().clone();

        sim.start();
        sim.set_node_rate("B", 500.0).unwrap();
        sim.set_link_capacity("A", "C", 1).unwrap();
        sim.set_packet_ttl(4).unwrap();
        sim.set_tick_duration(Duration::from_millis(250)).unwrap();
        for _ in 0..10 {
            sim.tick();
        }
        sim.reset();

        assert!(!sim.is_running());
        assert_eq!(sim.state(), &initial);
        assert_eq!(sim.traffic().rate(1), 30.0);
        assert_eq!(sim.capacities()[1], 80);
        assert_eq!(sim.packet_ttl(), 100);
        assert_eq!(sim.tick_duration(), Duration::from_secs(1));
    }
}
