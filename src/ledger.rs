//! Per-tick link capacity accounting.
//!
//! Counts are kept per direction of each link but admission always checks the
//! combined total, so both directions draw on one shared budget. A ledger
//! lives for a single tick.

use crate::topology::{Direction, LinkIndex};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapacityLedger {
    /// `[forward, reverse]` traversals per link
    counts: Vec<[u32; 2]>,
}

impl CapacityLedger {
    /// A ledger with every counter at zero
    pub fn new(link_count: usize) -> Self {
        Self {
            counts: vec![[0, 0]; link_count],
        }
    }

    /// Combined load on a link so far this tick
    pub fn load(&self, link: LinkIndex) -> u32 {
        self.counts
            .get(link)
            .map_or(0, |[forward, reverse]| forward + reverse)
    }

    /// Traversals of a link in one direction so far this tick
    pub fn directional(&self, link: LinkIndex, direction: Direction) -> u32 {
        self.counts.get(link).map_or(0, |c| c[slot(direction)])
    }

    /// Record one traversal if the link has room left; returns whether it was admitted
    pub fn try_admit(&mut self, link: LinkIndex, direction: Direction, capacity: u32) -> bool {
        if self.load(link) >= capacity {
            return false;
        }
        match self.counts.get_mut(link) {
            Some(counts) => {
                counts[slot(direction)] += 1;
                true
            }
            None => false,
        }
    }

    /// Combined loads in link order
    pub fn loads(&self) -> impl Iterator<Item = u32> + '_ {
        self.counts.iter().map(|[forward, reverse]| forward + reverse)
    }
}

fn slot(direction: Direction) -> usize {
    match direction {
        Direction::Forward => 0,
        Direction::Reverse => 1,
    }
}
