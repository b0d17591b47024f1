//! The collapse control loop.
//!
//! A `CollapseDriver` owns one grid and one RNG for the lifetime of a run.
//! Each call to `step` is one round:
//!
//! 1. Find the uncollapsed cells with the fewest candidates. None left: done.
//! 2. Pick one of them uniformly at random.
//! 3. Fail with `ContradictionDetected` if its candidate set is empty.
//! 4. Weighted-pick a tile and collapse the cell to it.
//! 5. Report `TileChosen`.
//! 6. Propagate (one pass, or to a fixpoint if configured).
//! 7. Count the round; stop once the round cap is reached.
//!
//! Rounds never overlap and the driver holds no hidden state outside its
//! fields, so a clone resumes exactly from the round it was taken at.

use crate::catalog::{TileCatalog, TileId};
use crate::config::RunConfig;
use crate::error::CollapseError;
use crate::events::{Completion, Placement, RunEvent, RunListener};
use crate::grid::{Grid, Position};
use crate::propagation::PropagationEngine;
use crate::rng::{CollapseRng, StdRandom};
use crate::snapshot::GridSnapshot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why a run stopped with an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub position: Option<Position>,
    pub error: CollapseError,
}

/// Lifecycle of a driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverState {
    Uninitialized,
    Running,
    Completed(Completion),
    Failed(Failure),
}

impl DriverState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DriverState::Completed(_) | DriverState::Failed(_))
    }
}

/// Shared flag for stopping `run_cancellable` between rounds.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs wave function collapse over one grid.
#[derive(Debug, Clone)]
pub struct CollapseDriver<R: CollapseRng = StdRandom> {
    catalog: Arc<TileCatalog>,
    config: RunConfig,
    grid: Option<Grid>,
    rng: R,
    round: usize,
    round_cap: usize,
    state: DriverState,
    history: Vec<Placement>,
}

impl CollapseDriver<StdRandom> {
    /// Driver seeded from `config.seed`, or from OS entropy when unset.
    pub fn from_config(catalog: Arc<TileCatalog>, config: RunConfig) -> Self {
        let rng = StdRandom::from_optional_seed(config.seed);
        Self::new(catalog, config, rng)
    }
}

impl<R: CollapseRng> CollapseDriver<R> {
    pub fn new(catalog: Arc<TileCatalog>, config: RunConfig, rng: R) -> Self {
        let round_cap = config.effective_round_cap();
        Self {
            catalog,
            config,
            grid: None,
            rng,
            round: 0,
            round_cap,
            state: DriverState::Uninitialized,
            history: Vec::new(),
        }
    }

    /// Build a fresh grid with every cell holding the full catalog.
    ///
    /// Calling this again discards the current grid and history but keeps
    /// the RNG stream. On error the driver stays `Uninitialized`.
    pub fn start(&mut self) -> Result<(), CollapseError> {
        self.config.validate()?;
        let grid = Grid::new(self.config.width, self.config.height, &self.catalog)?;

        tracing::debug!(
            "starting {}x{} run with {} tiles, round cap {}",
            grid.width(),
            grid.height(),
            self.catalog.len(),
            self.config.effective_round_cap()
        );

        self.grid = Some(grid);
        self.round = 0;
        self.round_cap = self.config.effective_round_cap();
        self.history.clear();
        self.state = DriverState::Running;
        Ok(())
    }

    /// Restrict a cell of the fresh grid before the first round (borders,
    /// fixed features). Returns whether the cell changed.
    ///
    /// Only valid after `start` and before any `step`. The restriction is not
    /// propagated here; the first round's pass carries it to the neighbors.
    /// Constraining a cell to nothing returns `ContradictionDetected` and
    /// leaves the empty cell in place, so the next `step` fails the run.
    pub fn constrain(&mut self, position: Position, allowed: &[TileId]) -> Result<bool, CollapseError> {
        match &self.state {
            DriverState::Uninitialized => return Err(CollapseError::NotStarted),
            DriverState::Running if self.round == 0 => {}
            _ => {
                return Err(CollapseError::InvalidConfiguration(
                    "cells can only be constrained before the first round".to_string(),
                ))
            }
        }
        let Some(grid) = self.grid.as_mut() else {
            return Err(CollapseError::NotStarted);
        };
        grid.constrain(position, allowed)
    }

    /// Start over with a new RNG. The caller's restart policy.
    pub fn reset(&mut self, rng: R) -> Result<(), CollapseError> {
        self.rng = rng;
        self.start()
    }

    /// Advance exactly one round.
    pub fn step(&mut self) -> Result<Option<Placement>, CollapseError> {
        self.step_observed(&mut ())
    }

    /// Advance one round, reporting events to `listener`.
    ///
    /// Returns the placement made, or `None` if the run was already complete
    /// (or completed without placing). Fails with `NotStarted` before `start`,
    /// and with the stored error once the run has failed.
    pub fn step_observed(
        &mut self,
        listener: &mut dyn RunListener,
    ) -> Result<Option<Placement>, CollapseError> {
        match &self.state {
            DriverState::Uninitialized => return Err(CollapseError::NotStarted),
            DriverState::Completed(_) => return Ok(None),
            DriverState::Failed(failure) => return Err(failure.error.clone()),
            DriverState::Running => {}
        }

        let Some(grid) = self.grid.as_mut() else {
            return Err(CollapseError::NotStarted);
        };

        let group = grid.min_entropy_group();
        if group.is_empty() {
            self.complete(listener);
            return Ok(None);
        }

        let position = group[self.rng.next_usize_max(group.len())];
        let candidates = grid
            .cell(position)
            .map(|cell| cell.candidates().to_vec())
            .unwrap_or_default();
        if candidates.is_empty() {
            let error = CollapseError::ContradictionDetected { position };
            return Err(self.fail(error, listener));
        }

        let tile = match self.catalog.weighted_pick(&candidates, &mut self.rng) {
            Ok(tile) => tile,
            Err(error) => return Err(self.fail(error, listener)),
        };

        grid.collapse(position, tile);
        let placement = Placement {
            round: self.round,
            position,
            tile,
        };
        self.history.push(placement);
        tracing::debug!(
            "round {}: {} = '{}' ({} candidates, {} tied)",
            self.round,
            position,
            self.catalog.name(tile),
            candidates.len(),
            group.len()
        );
        listener.on_event(&RunEvent::TileChosen(placement));

        let propagated =
            PropagationEngine::new(&self.catalog).propagate(grid, self.config.propagation);
        if let Err(error) = propagated {
            return Err(self.fail(error, listener));
        }

        self.round += 1;
        let done = grid.is_fully_collapsed();
        if done || self.round >= self.round_cap {
            self.complete(listener);
        }

        Ok(Some(placement))
    }

    /// Run to completion.
    pub fn run(&mut self) -> Result<Completion, CollapseError> {
        self.run_observed(&mut ())
    }

    /// Run to completion, reporting events to `listener`. Starts the run if needed.
    pub fn run_observed(&mut self, listener: &mut dyn RunListener) -> Result<Completion, CollapseError> {
        if self.state == DriverState::Uninitialized {
            self.start()?;
        }
        loop {
            match &self.state {
                DriverState::Completed(completion) => return Ok(*completion),
                DriverState::Failed(failure) => return Err(failure.error.clone()),
                _ => {}
            }
            self.step_observed(listener)?;
        }
    }

    /// Run until completion or until `cancel` is set.
    ///
    /// Cancellation is checked between rounds only; `Ok(None)` means the run
    /// was cancelled and the grid holds the last completed round.
    pub fn run_cancellable(
        &mut self,
        cancel: &CancelToken,
        listener: &mut dyn RunListener,
    ) -> Result<Option<Completion>, CollapseError> {
        if self.state == DriverState::Uninitialized {
            self.start()?;
        }
        loop {
            match &self.state {
                DriverState::Completed(completion) => return Ok(Some(*completion)),
                DriverState::Failed(failure) => return Err(failure.error.clone()),
                _ => {}
            }
            if cancel.is_cancelled() {
                tracing::debug!("run cancelled after {} rounds", self.round);
                return Ok(None);
            }
            self.step_observed(listener)?;
        }
    }

    fn complete(&mut self, listener: &mut dyn RunListener) {
        let remaining = self.grid.as_ref().map_or(0, Grid::uncollapsed_count);
        let completion = if remaining == 0 {
            tracing::info!("run completed in {} rounds", self.round);
            Completion::AllCollapsed
        } else {
            tracing::warn!(
                "round cap {} reached with {} cells uncollapsed",
                self.round_cap,
                remaining
            );
            Completion::IterationCapReached { remaining }
        };

        self.state = DriverState::Completed(completion);
        let snapshot = self.snapshot().unwrap_or_else(|| GridSnapshot {
            width: self.config.width,
            height: self.config.height,
            cells: Vec::new(),
        });
        listener.on_event(&RunEvent::RunCompleted {
            completion,
            snapshot,
        });
    }

    fn fail(&mut self, error: CollapseError, listener: &mut dyn RunListener) -> CollapseError {
        let position = error.position();
        tracing::debug!("run failed in round {}: {}", self.round, error);
        self.state = DriverState::Failed(Failure {
            position,
            error: error.clone(),
        });
        listener.on_event(&RunEvent::RunFailed {
            position,
            error: error.clone(),
        });
        error
    }

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == DriverState::Running
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Rounds completed so far.
    pub fn round(&self) -> usize {
        self.round
    }

    pub fn round_cap(&self) -> usize {
        self.round_cap
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn catalog(&self) -> &Arc<TileCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }

    /// Placements in round order.
    pub fn history(&self) -> &[Placement] {
        &self.history
    }

    pub fn snapshot(&self) -> Option<GridSnapshot> {
        self.grid
            .as_ref()
            .map(|grid| GridSnapshot::from_grid(grid, &self.catalog))
    }
}
