//! Tick scheduling.
//!
//! The clock runs ticks one after another on the calling thread while the
//! simulation is running. A tick always finishes and commits before the
//! observer sees it and before the next one starts. Pausing only takes effect
//! between ticks.

use std::ops::ControlFlow;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::simulation::Simulation;
use crate::state::SimulationState;

/// Drives a [`Simulation`] at a fixed wall-clock interval, or as fast as possible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    interval: Option<Duration>,
}

impl Clock {
    /// One tick per `interval` of wall-clock time
    pub fn paced(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
        }
    }

    /// Ticks back to back with no sleeping
    pub fn unpaced() -> Self {
        Self { interval: None }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Run ticks until the simulation is paused or `max_ticks` have executed.
    ///
    /// The observer is handed every committed state; returning
    /// `ControlFlow::Break` pauses the simulation. Returns the number of ticks
    /// executed.
    pub fn run<F>(&self, sim: &mut Simulation, max_ticks: Option<u64>, mut observer: F) -> u64
    where
        F: FnMut(&SimulationState) -> ControlFlow<()>,
    {
        let mut executed = 0;
        while sim.is_running() && max_ticks.map_or(true, |max| executed < max) {
            let started = Instant::now();
            let state = sim.tick();
            executed += 1;

            if observer(state).is_break() {
                sim.pause();
                break;
            }

            if let Some(interval) = self.interval {
                let elapsed = started.elapsed();
                if elapsed < interval {
                    thread::sleep(interval - elapsed);
                } else {
                    debug!("tick took {:?}, longer than the {:?} interval", elapsed, interval);
                }
            }
        }
        executed
    }
}
