//! Run events and listeners.
//!
//! A driver reports what it does as `RunEvent`s:
//!
//! - `TileChosen`: once per collapsed cell, in round order
//! - `RunCompleted`: once, when the run ends without error
//! - `RunFailed`: once, when a contradiction stops the run
//!
//! Anything that places or renders tiles implements `RunListener` and is
//! passed to `CollapseDriver::step_observed` / `run_observed`.
//!
//! ```ignore
//! struct Printer;
//!
//! impl RunListener for Printer {
//!     fn on_event(&mut self, event: &RunEvent) {
//!         if let RunEvent::TileChosen(p) = event {
//!             println!("round {}: {} at {}", p.round, p.tile, p.position);
//!         }
//!     }
//! }
//! ```

use crate::catalog::TileId;
use crate::error::CollapseError;
use crate::grid::Position;
use crate::snapshot::GridSnapshot;

/// One collapse decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Zero-based round in which the cell was collapsed.
    pub round: usize,
    pub position: Position,
    pub tile: TileId,
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every cell holds exactly one tile.
    AllCollapsed,
    /// The round cap stopped the run with cells still open.
    IterationCapReached { remaining: usize },
}

impl Completion {
    pub fn is_full(&self) -> bool {
        matches!(self, Completion::AllCollapsed)
    }

    /// `Err(IterationCapReached)` for a capped run, for callers that treat it as a failure.
    pub fn into_result(self) -> Result<(), CollapseError> {
        match self {
            Completion::AllCollapsed => Ok(()),
            Completion::IterationCapReached { remaining } => {
                Err(CollapseError::IterationCapReached { remaining })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    TileChosen(Placement),
    RunCompleted {
        completion: Completion,
        snapshot: GridSnapshot,
    },
    RunFailed {
        position: Option<Position>,
        error: CollapseError,
    },
}

impl RunEvent {
    /// Whether this event ends the run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunEvent::TileChosen(_))
    }
}

/// Observer of a collapse run.
pub trait RunListener: Send + Sync {
    fn on_event(&mut self, event: &RunEvent);

    /// Called when the driver is reset for a new attempt.
    fn on_reset(&mut self) {}
}

/// Listener that ignores everything.
impl RunListener for () {
    fn on_event(&mut self, _event: &RunEvent) {}
}

/// Fan-out to several listeners, in registration order.
#[derive(Default)]
pub struct RunListeners {
    listeners: Vec<Box<dyn RunListener>>,
}

impl RunListeners {
    pub fn add(&mut self, listener: Box<dyn RunListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl RunListener for RunListeners {
    fn on_event(&mut self, event: &RunEvent) {
        for listener in &mut self.listeners {
            listener.on_event(event);
        }
    }

    fn on_reset(&mut self) {
        for listener in &mut self.listeners {
            listener.on_reset();
        }
    }
}

/// Records every event it sees.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<RunEvent>,
}

impl EventLog {
    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    /// Placements only, in round order.
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.events.iter().filter_map(|e| match e {
            RunEvent::TileChosen(p) => Some(p),
            _ => None,
        })
    }

    pub fn last(&self) -> Option<&RunEvent> {
        self.events.last()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, RunEvent> {
        self.events.drain(..)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl RunListener for EventLog {
    fn on_event(&mut self, event: &RunEvent) {
        self.events.push(event.clone());
    }

    fn on_reset(&mut self) {
        self.events.clear();
    }
}
