//! Bevy host for collapse runs.
//!
//! `CollapsePlugin` owns one `CollapseDriver` as a resource and advances it a
//! few rounds per `Update`. Results come out as messages:
//!
//! - `TileChosen`: one per collapsed cell, in round order
//! - `RunCompleted`: the run finished (fully, or at the round cap)
//! - `RunFailed`: a contradiction stopped the run
//!
//! Writing `RestartRun` starts a new attempt with a fresh RNG.
//!
//! # Example
//!
//! ```ignore
//! App::new()
//!     .add_plugins(MinimalPlugins)
//!     .add_plugins(CollapsePlugin::new(catalog, RunConfig::new(16, 16)).with_rounds_per_update(8))
//!     .add_systems(Update, place_tiles)
//!     .run();
//!
//! fn place_tiles(mut chosen: MessageReader<TileChosen>) {
//!     for tile in chosen.read() {
//!         info!("{} at {}", tile.name, tile.position);
//!     }
//! }
//! ```

mod playback;

pub use playback::{CollapsePlayback, MAX_ROUNDS_PER_UPDATE};

use bevy::prelude::*;
use collapse_core::{
    CollapseDriver, CollapseError, Completion, EventLog, GridSnapshot, Position, RunConfig,
    RunEvent, RunListener, RunListeners, StdRandom, TileCatalog, TileId,
};
use std::sync::Arc;

/// Runs a collapse inside the app's `Update` schedule.
pub struct CollapsePlugin {
    catalog: Arc<TileCatalog>,
    config: RunConfig,
    playback: CollapsePlayback,
}

impl CollapsePlugin {
    pub fn new(catalog: Arc<TileCatalog>, config: RunConfig) -> Self {
        Self {
            catalog,
            config,
            playback: CollapsePlayback::default(),
        }
    }

    pub fn with_rounds_per_update(mut self, rounds: usize) -> Self {
        self.playback.set_rounds_per_update(rounds);
        self
    }

    /// Start paused; set `CollapsePlayback::playing` to begin.
    pub fn paused(mut self) -> Self {
        self.playback.pause();
        self
    }
}

impl Plugin for CollapsePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ActiveRun::new(self.catalog.clone(), self.config.clone()));
        app.insert_resource(self.playback.clone());
        app.insert_resource(CollapseListeners::default());

        app.add_message::<TileChosen>()
            .add_message::<RunCompleted>()
            .add_message::<RunFailed>()
            .add_message::<RestartRun>();

        app.add_systems(Update, (handle_restart_requests, advance_rounds).chain());
    }
}

/// The driver of the current attempt.
#[derive(Resource)]
pub struct ActiveRun {
    driver: CollapseDriver<StdRandom>,
    /// Attempts started, counting the first.
    attempts: usize,
}

impl ActiveRun {
    pub fn new(catalog: Arc<TileCatalog>, config: RunConfig) -> Self {
        Self {
            driver: CollapseDriver::from_config(catalog, config),
            attempts: 1,
        }
    }

    pub fn driver(&self) -> &CollapseDriver<StdRandom> {
        &self.driver
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Discard the current attempt and start another.
    ///
    /// `seed: None` seeds the new attempt from OS entropy.
    pub fn restart(&mut self, seed: Option<u64>) -> Result<(), CollapseError> {
        self.attempts += 1;
        self.driver.reset(StdRandom::from_optional_seed(seed))
    }
}

/// Extra observers of the active run, beside the messages.
#[derive(Resource, Default)]
pub struct CollapseListeners(pub RunListeners);

/// A cell was collapsed.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct TileChosen {
    pub round: usize,
    pub position: Position,
    pub tile: TileId,
    pub name: String,
    /// Display handle from the catalog (prefab path, colour, ...).
    pub handle: Option<String>,
}

/// The current attempt finished without a contradiction.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct RunCompleted {
    pub completion: Completion,
    pub snapshot: GridSnapshot,
    pub attempt: usize,
}

/// The current attempt stopped on an error.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct RunFailed {
    pub position: Option<Position>,
    pub error: CollapseError,
    pub attempt: usize,
}

/// Request a new attempt.
#[derive(Message, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestartRun {
    /// Seed for the new attempt; `None` uses OS entropy.
    pub seed: Option<u64>,
}

fn handle_restart_requests(
    mut requests: MessageReader<RestartRun>,
    mut run: ResMut<ActiveRun>,
    mut playback: ResMut<CollapsePlayback>,
    mut listeners: ResMut<CollapseListeners>,
    mut failed: MessageWriter<RunFailed>,
) {
    // Only the latest request matters.
    let Some(request) = requests.read().last().copied() else {
        return;
    };

    playback.reset();
    listeners.0.on_reset();
    match run.restart(request.seed) {
        Ok(()) => info!("starting attempt {} (seed {:?})", run.attempts(), request.seed),
        Err(error) => {
            error!("attempt {} could not start: {}", run.attempts(), error);
            playback.finish();
            failed.write(RunFailed {
                position: error.position(),
                error,
                attempt: run.attempts(),
            });
        }
    }
}

fn advance_rounds(
    mut run: ResMut<ActiveRun>,
    mut playback: ResMut<CollapsePlayback>,
    mut listeners: ResMut<CollapseListeners>,
    mut chosen: MessageWriter<TileChosen>,
    mut completed: MessageWriter<RunCompleted>,
    mut failed: MessageWriter<RunFailed>,
) {
    if !playback.wants_rounds() {
        return;
    }

    let attempt = run.attempts();
    if !run.driver.is_running() && !run.driver.is_finished() {
        if let Err(error) = run.driver.start() {
            error!("collapse run could not start: {}", error);
            playback.finish();
            failed.write(RunFailed {
                position: error.position(),
                error,
                attempt,
            });
            return;
        }
    }

    let mut log = EventLog::default();
    for _ in 0..playback.rounds_per_update {
        if run.driver.is_finished() {
            break;
        }
        let stepped = run.driver.step_observed(&mut log);
        playback.advance();
        if stepped.is_err() {
            break;
        }
    }

    let catalog = run.driver.catalog().clone();
    for event in log.drain() {
        listeners.0.on_event(&event);
        match event {
            RunEvent::TileChosen(placement) => {
                let tile = catalog.tile(placement.tile);
                chosen.write(TileChosen {
                    round: placement.round,
                    position: placement.position,
                    tile: placement.tile,
                    name: catalog.name(placement.tile).to_string(),
                    handle: tile.and_then(|t| t.handle()).map(str::to_string),
                });
            }
            RunEvent::RunCompleted {
                completion,
                snapshot,
            } => {
                match completion {
                    Completion::AllCollapsed => {
                        info!("attempt {} completed after {} rounds", attempt, playback.rounds_played)
                    }
                    Completion::IterationCapReached { remaining } => warn!(
                        "attempt {} hit the round cap with {} cells open",
                        attempt, remaining
                    ),
                }
                playback.finish();
                completed.write(RunCompleted {
                    completion,
                    snapshot,
                    attempt,
                });
            }
            RunEvent::RunFailed { position, error } => {
                warn!("attempt {} failed: {}", attempt, error);
                playback.finish();
                failed.write(RunFailed {
                    position,
                    error,
                    attempt,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::message::Messages;

    #[derive(Resource, Default)]
    struct Collected {
        chosen: Vec<TileChosen>,
        completed: Vec<RunCompleted>,
        failed: Vec<RunFailed>,
    }

    fn collect(
        mut collected: ResMut<Collected>,
        mut chosen: MessageReader<TileChosen>,
        mut completed: MessageReader<RunCompleted>,
        mut failed: MessageReader<RunFailed>,
    ) {
        collected.chosen.extend(chosen.read().cloned());
        collected.completed.extend(completed.read().cloned());
        collected.failed.extend(failed.read().cloned());
    }

    fn test_app(catalog: TileCatalog, config: RunConfig, rounds: usize) -> App {
        let mut app = App::new();
        app.add_plugins(CollapsePlugin::new(Arc::new(catalog), config).with_rounds_per_update(rounds));
        app.init_resource::<Collected>();
        app.add_systems(PostUpdate, collect);
        app
    }

    fn floor() -> TileCatalog {
        TileCatalog::builder()
            .tile_with_handle("floor", 1, "#c2c3c7")
            .allow_all_sides("floor", "floor")
            .build()
            .unwrap()
    }

    #[test]
    fn test_rounds_are_paced_per_update() {
        let mut app = test_app(floor(), RunConfig::new(3, 3).with_seed(1), 4);

        app.update();
        assert_eq!(app.world().resource::<Collected>().chosen.len(), 4);
        app.update();
        assert_eq!(app.world().resource::<Collected>().chosen.len(), 8);
        app.update();

        let collected = app.world().resource::<Collected>();
        assert_eq!(collected.chosen.len(), 9);
        assert_eq!(collected.completed.len(), 1);
        assert_eq!(collected.completed[0].completion, Completion::AllCollapsed);
        assert_eq!(collected.chosen[0].handle.as_deref(), Some("#c2c3c7"));
        assert!(collected.failed.is_empty());

        let playback = app.world().resource::<CollapsePlayback>();
        assert!(playback.finished);
        assert_eq!(playback.rounds_played, 9);

        app.update();
        assert_eq!(app.world().resource::<Collected>().chosen.len(), 9);
    }

    #[test]
    fn test_paused_plugin_does_nothing() {
        let mut app = App::new();
        app.add_plugins(CollapsePlugin::new(Arc::new(floor()), RunConfig::new(2, 2)).paused());
        app.init_resource::<Collected>();
        app.add_systems(PostUpdate, collect);

        app.update();
        assert!(app.world().resource::<Collected>().chosen.is_empty());
        assert!(!app.world().resource::<ActiveRun>().driver().is_running());

        app.world_mut().resource_mut::<CollapsePlayback>().play();
        app.update();
        assert_eq!(app.world().resource::<Collected>().chosen.len(), 1);
    }

    #[test]
    fn test_failure_and_restart() {
        let catalog = TileCatalog::builder()
            .tile("A", 1)
            .tile("B", 1)
            .build()
            .unwrap();
        let mut app = test_app(catalog, RunConfig::new(2, 2).with_seed(0), 10);

        app.update();
        {
            let collected = app.world().resource::<Collected>();
            assert_eq!(collected.chosen.len(), 1);
            assert_eq!(collected.failed.len(), 1);
            assert!(matches!(
                collected.failed[0].error,
                CollapseError::ContradictionDetected { .. }
            ));
            assert_eq!(collected.failed[0].attempt, 1);
        }

        app.world_mut()
            .resource_mut::<Messages<RestartRun>>()
            .write(RestartRun { seed: Some(7) });
        app.update();

        let collected = app.world().resource::<Collected>();
        assert_eq!(collected.failed.len(), 2);
        assert_eq!(collected.failed[1].attempt, 2);
        assert_eq!(app.world().resource::<ActiveRun>().attempts(), 2);
    }
}
