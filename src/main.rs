//! Headless wave function collapse.
//!
//! Loads a tile catalog, fills a grid inside a headless Bevy app and prints
//! the result. Failed attempts are retried with a fresh seed.
//!
//! Usage:
//!   cargo run -- tiles.xml --width 24 --height 16 --seed 7 --png out.png
//!   cargo run -- tiles.json --config run.json --retries 10 --fixpoint

mod render;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use clap::Parser;
use collapse_bevy::{CollapsePlugin, RestartRun, RunCompleted, RunFailed};
use collapse_core::{
    load_catalog, Completion, LoadError, PropagationMode, RunConfig, TileCatalog,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "tile_collapse",
    version,
    about = "Fill a 2D grid with tiles by wave function collapse"
)]
struct Cli {
    /// Tile catalog: an XML tileset (.xml) or JSON tile list
    catalog: PathBuf,
    /// Run configuration (JSON); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    width: Option<usize>,
    #[arg(long)]
    height: Option<usize>,
    /// RNG seed; OS entropy when omitted
    #[arg(long)]
    seed: Option<u64>,
    /// Propagate to a fixpoint after each collapse instead of a single pass
    #[arg(long)]
    fixpoint: bool,
    #[arg(long)]
    round_cap: Option<usize>,
    /// Extra attempts after a contradiction
    #[arg(long, default_value_t = 0)]
    retries: usize,
    #[arg(long, default_value_t = 64)]
    rounds_per_frame: usize,
    /// Frame rate limit; 0 runs frames back to back
    #[arg(long, default_value_t = 0.0)]
    fps: f64,
    /// Write the result as a PNG
    #[arg(long)]
    png: Option<PathBuf>,
    #[arg(long, default_value_t = 8)]
    pixel_size: u32,
    /// Write the result as a JSON grid snapshot
    #[arg(long)]
    json: Option<PathBuf>,
    #[arg(long, default_value = "info")]
    log_filter: String,
}

/// Where and how to write the finished grid.
#[derive(Resource)]
struct RunOutput {
    catalog: Arc<TileCatalog>,
    png: Option<PathBuf>,
    pixel_size: u32,
    json: Option<PathBuf>,
}

/// Caller-side restart policy.
#[derive(Resource, Debug)]
struct RetryPolicy {
    retries_left: usize,
    /// Attempt `n` uses `base_seed + n - 1`; entropy when unset.
    base_seed: Option<u64>,
}

impl RetryPolicy {
    fn next_seed(&self, failed_attempt: usize) -> Option<u64> {
        self.base_seed
            .map(|seed| seed.wrapping_add(failed_attempt as u64))
    }
}

fn build_config(cli: &Cli) -> Result<RunConfig, LoadError> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(height) = cli.height {
        config.height = height;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.fixpoint {
        config.propagation = PropagationMode::Fixpoint;
    }
    if cli.round_cap.is_some() {
        config.round_cap = cli.round_cap;
    }
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let frame_time = if cli.fps > 0.0 {
        Duration::from_secs_f64(1.0 / cli.fps)
    } else {
        Duration::ZERO
    };

    let mut app = App::new();
    app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(frame_time)))
        .add_plugins(LogPlugin {
            filter: cli.log_filter.clone(),
            ..default()
        });

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load run config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.validate() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    let catalog = match load_catalog(&cli.catalog) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            error!("failed to load {}: {}", cli.catalog.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let asymmetries = catalog.validate();
    if !asymmetries.is_empty() {
        warn!("catalog has {} one-sided adjacency rules", asymmetries.len());
    }

    info!(
        "collapsing {}x{} grid with {} tiles",
        config.width,
        config.height,
        catalog.len()
    );

    // Without a fixed seed the plugin seeds from entropy; retries stay random too.
    app.insert_resource(RetryPolicy {
        retries_left: cli.retries,
        base_seed: config.seed,
    });
    app.insert_resource(RunOutput {
        catalog: catalog.clone(),
        png: cli.png.clone(),
        pixel_size: cli.pixel_size,
        json: cli.json.clone(),
    });
    app.add_plugins(
        CollapsePlugin::new(catalog, config).with_rounds_per_update(cli.rounds_per_frame),
    );
    app.add_systems(PostUpdate, (retry_on_failure, finish_run));

    match app.run() {
        AppExit::Success => ExitCode::SUCCESS,
        AppExit::Error(code) => ExitCode::from(code.get()),
    }
}

fn retry_on_failure(
    mut failed: MessageReader<RunFailed>,
    mut policy: ResMut<RetryPolicy>,
    mut restart: MessageWriter<RestartRun>,
    mut exit: MessageWriter<AppExit>,
) {
    for failure in failed.read() {
        if policy.retries_left == 0 {
            error!(
                "giving up after {} attempt(s): {}",
                failure.attempt, failure.error
            );
            exit.write(AppExit::error());
            return;
        }

        policy.retries_left -= 1;
        let seed = policy.next_seed(failure.attempt);
        warn!(
            "attempt {} failed ({}), retrying; {} retries left",
            failure.attempt, failure.error, policy.retries_left
        );
        restart.write(RestartRun { seed });
    }
}

fn finish_run(
    mut completed: MessageReader<RunCompleted>,
    output: Res<RunOutput>,
    mut exit: MessageWriter<AppExit>,
) {
    for done in completed.read() {
        print!("{}", done.snapshot.to_ascii());

        if let Completion::IterationCapReached { remaining } = done.completion {
            warn!("{} cells were left uncollapsed", remaining);
        }

        let mut ok = true;
        if let Some(path) = &output.png {
            match render::render_2d(&done.snapshot, &output.catalog, output.pixel_size) {
                Some(img) => match render::save_png(&img, path) {
                    Ok(()) => info!("wrote {}", path.display()),
                    Err(e) => {
                        error!("failed to write {}: {}", path.display(), e);
                        ok = false;
                    }
                },
                None => {
                    error!(
                        "{}x{} grid at {} px per cell is too large for a PNG",
                        done.snapshot.width, done.snapshot.height, output.pixel_size
                    );
                    ok = false;
                }
            }
        }
        if let Some(path) = &output.json {
            match done.snapshot.save_json(path) {
                Ok(()) => info!("wrote {}", path.display()),
                Err(e) => {
                    error!("failed to write {}: {}", path.display(), e);
                    ok = false;
                }
            }
        }

        exit.write(if ok { AppExit::Success } else { AppExit::error() });
    }
}
