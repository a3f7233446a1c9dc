use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Default wall-clock length of one tick
pub const DEFAULT_TICK_DURATION: Duration = Duration::from_millis(1000);

/// Default number of ticks a packet may live
pub const DEFAULT_PACKET_TTL: u32 = 100;

/// Most packets a single node may originate in one tick.
///
/// Every packet is materialized, so a rate above this at the configured tick
/// duration is rejected instead of exhausting memory.
pub const MAX_PACKETS_PER_TICK: f64 = 1_000_000.0;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Top-level simulation configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    pub network: NetworkConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_tick_duration(self.general.tick_duration)?;
        validate_packet_ttl(self.general.packet_ttl)?;

        self.network.validate(self.general.tick_duration)
    }

    /// Get the general configuration
    pub fn general(&self) -> &GeneralConfig {
        &self.general
    }
}

/// Timing and randomness settings shared by the whole run
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeneralConfig {
    #[serde(with = "humantime_serde", default = "default_tick_duration")]
    pub tick_duration: Duration,
    #[serde(default = "default_packet_ttl")]
    pub packet_ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub seed: Option<u64>,
}

fn default_tick_duration() -> Duration {
    DEFAULT_TICK_DURATION
}

fn default_packet_ttl() -> u32 {
    DEFAULT_PACKET_TTL
}

/// Nodes and links making up the fixed topology
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NetworkConfig {
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub links: Vec<LinkConfig>,
}

impl NetworkConfig {
    fn validate(&self, tick_duration: Duration) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::InvalidNetwork(
                "at least one node is required".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                return Err(ConfigError::InvalidNode("node id cannot be empty".to_string()));
            }
            if !ids.insert(node.id.as_str()) {
                return Err(ConfigError::DuplicateNode(node.id.clone()));
            }
            validate_rate(&node.id, node.rate, tick_duration)?;
        }

        let mut pairs = HashSet::new();
        for link in &self.links {
            for endpoint in [&link.from, &link.to] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(ConfigError::UnknownNode {
                        link: link.label(),
                        node: endpoint.clone(),
                    });
                }
            }
            if link.from == link.to {
                return Err(ConfigError::InvalidLink(format!(
                    "link {} connects a node to itself",
                    link.label()
                )));
            }
            let key = if link.from < link.to {
                (link.from.as_str(), link.to.as_str())
            } else {
                (link.to.as_str(), link.from.as_str())
            };
            if !pairs.insert(key) {
                return Err(ConfigError::InvalidLink(format!(
                    "duplicate link between {} and {}",
                    key.0, key.1
                )));
            }
            validate_capacity(&link.label(), link.capacity)?;
        }

        Ok(())
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// A traffic-generating node
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NodeConfig {
    pub id: String,
    /// Drawing coordinates; carried through to snapshots but never used by the engine
    #[serde(default)]
    pub position: (f64, f64),
    /// Packets generated per second of simulated time
    #[serde(default)]
    pub rate: f64,
}

/// An undirected link; both directions share `capacity` packets per tick
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LinkConfig {
    pub from: String,
    pub to: String,
    pub capacity: i64,
}

impl LinkConfig {
    pub fn label(&self) -> String {
        format!("{}-{}", self.from, self.to)
    }
}

/// Check a tick length before it is accepted
pub fn validate_tick_duration(tick_duration: Duration) -> Result<(), ConfigError> {
    if tick_duration.is_zero() {
        return Err(ConfigError::InvalidGeneral(
            "tick_duration must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Check a packet TTL before it is accepted
pub fn validate_packet_ttl(packet_ttl: u32) -> Result<(), ConfigError> {
    if packet_ttl == 0 {
        return Err(ConfigError::InvalidGeneral(
            "packet_ttl must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Packets per tick a rate works out to at the given tick length, before rounding
pub fn per_tick(rate: f64, tick_duration: Duration) -> f64 {
    rate * tick_duration.as_nanos() as f64 / NANOS_PER_SEC
}

/// Check a traffic rate before it is accepted at the given tick length
pub fn validate_rate(node: &str, rate: f64, tick_duration: Duration) -> Result<(), ConfigError> {
    if !rate.is_finite() || rate < 0.0 || per_tick(rate, tick_duration) > MAX_PACKETS_PER_TICK {
        return Err(ConfigError::InvalidRate {
            node: node.to_string(),
            rate,
        });
    }
    Ok(())
}

/// Check a link capacity before it is accepted
pub fn validate_capacity(link: &str, capacity: i64) -> Result<(), ConfigError> {
    if capacity < 0 || capacity > i64::from(u32::MAX) {
        return Err(ConfigError::InvalidCapacity {
            link: link.to_string(),
            capacity,
        });
    }
    Ok(())
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid network configuration: {0}")]
    InvalidNetwork(String),
    #[error("Invalid node configuration: {0}")]
    InvalidNode(String),
    #[error("Duplicate node id '{0}'")]
    DuplicateNode(String),
    #[error("Link {link} references unknown node '{node}'")]
    UnknownNode { link: String, node: String },
    #[error("Invalid link configuration: {0}")]
    InvalidLink(String),
    #[error("Unknown link between '{from}' and '{to}'")]
    UnknownLink { from: String, to: String },
    #[error("Invalid capacity {capacity} for link {link}")]
    InvalidCapacity { link: String, capacity: i64 },
    #[error("Invalid traffic rate {rate} for node {node}")]
    InvalidRate { node: String, rate: f64 },
}

/// Default implementations
impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            tick_duration: DEFAULT_TICK_DURATION,
            packet_ttl: DEFAULT_PACKET_TTL,
            seed: None,
        }
    }
}

impl Default for Config {
    /// The five-node reference network
    fn default() -> Self {
        let node = |id: &str, x: f64, y: f64, rate: f64| NodeConfig {
            id: id.to_string(),
            position: (x, y),
            rate,
        };
        let link = |from: &str, to: &str, capacity: i64| LinkConfig {
            from: from.to_string(),
            to: to.to_string(),
            capacity,
        };

        Self {
            general: GeneralConfig::default(),
            network: NetworkConfig {
                nodes: vec![
                    node("A", 50.0, 15.0, 50.0),
                    node("B", 20.0, 40.0, 30.0),
                    node("C", 35.0, 85.0, 40.0),
                    node("D", 65.0, 85.0, 20.0),
                    node("E", 80.0, 40.0, 60.0),
                ],
                links: vec![
                    link("A", "B", 100),
                    link("A", "C", 80),
                    link("B", "D", 70),
                    link("C", "D", 90),
                    link("C", "E", 100),
                    link("D", "E", 60),
                ],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parsing() {
        let yaml = r#"
general:
  tick_duration: "500ms"
  packet_ttl: 20
  seed: 7
network:
  nodes:
    - id: A
      position: [10, 20]
      rate: 4
    - id: B
  links:
    - from: A
      to: B
      capacity: 3
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.general.tick_duration, Duration::from_millis(500));
        assert_eq!(config.general.packet_ttl, 20);
        assert_eq!(config.general.seed, Some(7));
        assert_eq!(config.network.nodes[0].position, (10.0, 20.0));
        assert_eq!(config.network.nodes[1].rate, 0.0);
        assert_eq!(config.network.links[0].capacity, 3);
    }

    #[test]
    fn test_general_defaults() {
        let yaml = r#"
network:
  nodes:
    - id: A
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.general.tick_duration, DEFAULT_TICK_DURATION);
        assert_eq!(config.general.packet_ttl, DEFAULT_PACKET_TTL);
        assert_eq!(config.general.seed, None);
        assert!(config.network.links.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_reference_network() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.network.nodes.len(), 5);
        assert_eq!(config.network.links.len(), 6);
        assert_eq!(config.network.node("E").map(|n| n.rate), Some(60.0));
    }

    #[test]
    fn test_validation_errors() {
        // Duplicate node id
        let mut config = Config::default();
        config.network.nodes[1].id = "A".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateNode("A".to_string()))
        );

        // Link referencing unknown node
        let mut config = Config::default();
        config.network.links[0].to = "Z".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownNode { ref node, .. }) if node == "Z"
        ));

        // Negative capacity
        let mut config = Config::default();
        config.network.links[2].capacity = -1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCapacity { capacity: -1, .. })
        ));

        // Negative rate
        let mut config = Config::default();
        config.network.nodes[3].rate = -5.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRate { .. })));

        // Non-finite rate
        let mut config = Config::default();
        config.network.nodes[0].rate = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRate { .. })));

        // Duplicate link in reverse orientation
        let mut config = Config::default();
        config.network.links.push(LinkConfig {
            from: "B".to_string(),
            to: "A".to_string(),
            capacity: 10,
        });
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLink(_))));

        // Self loop
        let mut config = Config::default();
        config.network.links[0].to = "A".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLink(_))));

        // Zero tick duration
        let mut config = Config::default();
        config.general.tick_duration = Duration::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidGeneral(_))));

        // Zero TTL
        let mut config = Config::default();
        config.general.packet_ttl = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidGeneral(_))));

        // Empty network
        let mut config = Config::default();
        config.network.nodes.clear();
        config.network.links.clear();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidNetwork(_))));
    }

    #[test]
    fn test_rate_ceiling_per_tick() {
        let mut config = Config::default();
        config.network.nodes[0].rate = 1e15;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidRate {
                node: "A".to_string(),
                rate: 1e15,
            })
        );

        // The ceiling applies to packets per tick, so a shorter tick admits a larger rate
        config.general.tick_duration = Duration::from_nanos(1);
        assert!(config.validate().is_ok());

        let second = Duration::from_secs(1);
        assert!(validate_rate("A", MAX_PACKETS_PER_TICK, second).is_ok());
        assert!(validate_rate("A", MAX_PACKETS_PER_TICK + 1.0, second).is_err());
        assert!(validate_rate("A", 10.0, Duration::from_secs(1_000_000)).is_err());
    }

    #[test]
    fn test_zero_capacity_is_valid() {
        let mut config = Config::default();
        config.network.links[0].capacity = 0;
        assert!(config.validate().is_ok());
    }
}
