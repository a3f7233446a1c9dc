//! Network topology module.
//!
//! This module holds the immutable node/link graph built from configuration
//! and the hop-count routing table precomputed over it.

pub mod types;
pub mod routing;

// Re-export key types and functions for easier access
pub use types::{Direction, LinkIndex, NodeIndex, Topology};
pub use routing::RoutingTable;
