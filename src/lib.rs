//! # PacketSim - Discrete-time packet flow simulation
//!
//! This library models packets moving through a small, fixed network. Nodes
//! generate packets at configurable rates, every packet follows a precomputed
//! hop-count shortest path, and links admit a bounded number of packets per
//! tick across both directions combined.
//!
//! ## Tick Order
//!
//! Each tick, in this order:
//!
//! 1. Link loads start from zero.
//! 2. Queued packets (node order, oldest first) followed by the previous tick's
//!    in-flight packets become the candidates.
//! 3. Each candidate is delivered, expired, dropped as malformed, advanced one
//!    hop, or left queued at its current node when its next link is full.
//! 4. Every node generates its new packets.
//! 5. Link loads are published and the new state replaces the old one.
//!
//! ## Architecture
//!
//! - `config`: Configuration structures, defaults, and validation
//! - `config_loader`: YAML loading and writing
//! - `topology`: Node/link graph and routing table
//! - `traffic`: Per-node generation rates and destination selection
//! - `ledger`: Per-tick link capacity accounting
//! - `state`: Packets, nodes, links, and the full simulation state
//! - `engine`: The tick transition
//! - `simulation`: State container with start/pause/reset and parameter edits
//! - `clock`: Wall-clock tick scheduling
//! - `report`: Snapshots, summaries, JSON and text output
//!
//! ## Example Usage
//!
//! ```rust
//! use packetsim::config::Config;
//! use packetsim::simulation::Simulation;
//!
//! let mut config = Config::default();
//! config.general.seed = Some(42);
//!
//! let mut sim = Simulation::new(config)?;
//! for _ in 0..10 {
//!     sim.tick();
//! }
//! assert_eq!(sim.state().tick, 10);
//! println!("{}", sim.snapshot().render_table());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Invalid configuration and parameter edits are rejected with
//! [`config::ConfigError`] and leave the running state untouched. Problems
//! with individual packets inside a tick are never errors; they are counted
//! in the state's tick counters.

pub mod config;
pub mod config_loader;
pub mod topology;
pub mod traffic;
pub mod ledger;
pub mod state;
pub mod engine;
pub mod simulation;
pub mod clock;
pub mod report;
