//! Snapshots and run reports.
//!
//! Turns committed simulation state into the flattened, name-resolved form a
//! presentation layer consumes, as JSON or as a text table.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::Serialize;

use crate::state::{SimulationState, TickCounters};
use crate::topology::Topology;

/// Per-node view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub id: String,
    pub position: (f64, f64),
    pub queue_length: usize,
    pub generated: u64,
}

/// Per-link view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkSnapshot {
    pub from: String,
    pub to: String,
    pub load: u32,
    pub capacity: u32,
    /// `load / capacity`, zero for a closed link
    pub utilization: f64,
}

/// Everything a presentation layer needs to draw one tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub nodes: Vec<NodeSnapshot>,
    pub links: Vec<LinkSnapshot>,
    pub in_flight: usize,
    pub queued: usize,
    pub last_tick: TickCounters,
    pub totals: TickCounters,
}

impl Snapshot {
    pub fn from_state(state: &SimulationState, topology: &Topology) -> Self {
        let nodes = state
            .nodes
            .iter()
            .map(|node| NodeSnapshot {
                id: node.id.clone(),
                position: node.position,
                queue_length: node.queue.len(),
                generated: node.generated,
            })
            .collect();
        let links = state
            .links
            .iter()
            .map(|link| LinkSnapshot {
                from: topology.node_id(link.from).to_string(),
                to: topology.node_id(link.to).to_string(),
                load: link.load,
                capacity: link.capacity,
                utilization: if link.capacity == 0 {
                    0.0
                } else {
                    f64::from(link.load) / f64::from(link.capacity)
                },
            })
            .collect();

        Self {
            tick: state.tick,
            nodes,
            links,
            in_flight: state.in_flight.len(),
            queued: state.queued_count(),
            last_tick: state.last_tick,
            totals: state.totals,
        }
    }

    /// Human-readable statistics table
    pub fn render_table(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push(format!("Tick {}", self.tick));
        lines.push(format!("{:<8} {:>8} {:>10}", "Node", "Queue", "Generated"));
        for node in &self.nodes {
            lines.push(format!(
                "{:<8} {:>8} {:>10}",
                node.id, node.queue_length, node.generated
            ));
        }

        lines.push(String::new());
        lines.push(format!("{:<8} {:>8} {:>10} {:>7}", "Link", "Load", "Capacity", "Util"));
        for link in &self.links {
            lines.push(format!(
                "{:<8} {:>8} {:>10} {:>6.0}%",
                format!("{}-{}", link.from, link.to),
                link.load,
                link.capacity,
                link.utilization * 100.0
            ));
        }

        lines.push(String::new());
        lines.push(format!(
            "In flight: {}  Queued: {}  Delivered: {}  Lost: {}",
            self.in_flight,
            self.queued,
            self.totals.delivered,
            self.totals.lost()
        ));

        lines.join("\n")
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub seed: u64,
    pub totals: TickCounters,
    /// Packets still queued or in flight at the end of the run
    pub live: usize,
    /// Delivered share of packets no longer live
    pub delivery_ratio: f64,
}

impl RunSummary {
    pub fn new(state: &SimulationState, seed: u64) -> Self {
        let finished = state.totals.delivered + state.totals.lost();
        Self {
            ticks: state.tick,
            seed,
            totals: state.totals,
            live: state.live_count(),
            delivery_ratio: if finished == 0 {
                0.0
            } else {
                state.totals.delivered as f64 / finished as f64
            },
        }
    }

    pub fn render_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        lines.push("=".repeat(48));
        lines.push("                PACKETSIM RUN SUMMARY".to_string());
        lines.push("=".repeat(48));
        lines.push(format!("Ticks:          {}", self.ticks));
        lines.push(format!("Seed:           {}", self.seed));
        lines.push(format!("Generated:      {}", self.totals.generated));
        lines.push(format!("Delivered:      {}", self.totals.delivered));
        lines.push(format!("Expired (TTL):  {}", self.totals.expired));
        lines.push(format!("Routing gaps:   {}", self.totals.routing_gaps));
        lines.push(format!("Malformed:      {}", self.totals.malformed));
        lines.push(format!("Still live:     {}", self.live));
        lines.push(format!("Delivery ratio: {:.1}%", self.delivery_ratio * 100.0));
        lines.join("\n")
    }
}

/// Write a run summary as pretty JSON
pub fn write_summary(summary: &RunSummary, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write summary to {}", output_path.display()))?;

    log::info!("Summary written to {}", output_path.display());
    Ok(())
}

/// Streams one JSON snapshot per line
pub struct SnapshotWriter {
    out: BufWriter<File>,
}

impl SnapshotWriter {
    pub fn create(output_path: &Path) -> Result<Self> {
        let file = File::create(output_path)
            .with_context(|| format!("Failed to create snapshot file {}", output_path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    pub fn write(&mut self, snapshot: &Snapshot) -> Result<()> {
        serde_json::to_writer(&mut self.out, snapshot).context("Failed to serialize snapshot")?;
        self.out.write_all(b"\n").context("Failed to write snapshot")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.out.flush().context("Failed to flush snapshots")?;
        Ok(())
    }
}
