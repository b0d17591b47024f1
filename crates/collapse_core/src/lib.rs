//! Wave function collapse over fixed-size 2D tile grids.
//!
//! Every cell starts with the full tile catalog as candidates. The driver
//! repeatedly collapses a minimum-entropy cell to a weighted-random tile and
//! propagates the adjacency constraints to the rest of the grid, until every
//! cell holds one tile, a contradiction is found, or the round cap is hit.
//!
//! # Modules
//!
//! - `catalog`: tiles, weights and per-direction adjacency
//! - `grid`, `cell`: the board and its per-position candidate sets
//! - `propagation`: candidate reduction between neighbors
//! - `driver`: the select/collapse/propagate loop and its state machine
//! - `events`: `TileChosen` / `RunCompleted` / `RunFailed` and listeners
//! - `loader`, `snapshot`, `config`: JSON and XML IO
//!
//! # Example
//!
//! ```ignore
//! use collapse_core::{CollapseDriver, RunConfig, StdRandom, TileCatalog};
//! use std::sync::Arc;
//!
//! let catalog = TileCatalog::builder()
//!     .tile("floor", 1)
//!     .allow_all_sides("floor", "floor")
//!     .build()?;
//! let mut driver = CollapseDriver::new(
//!     Arc::new(catalog),
//!     RunConfig::new(3, 3),
//!     StdRandom::from_u64_seed(42),
//! );
//! let completion = driver.run()?;
//! ```

pub mod catalog;
pub mod cell;
pub mod config;
pub mod direction;
pub mod driver;
pub mod error;
pub mod events;
pub mod grid;
pub mod loader;
pub mod propagation;
pub mod rng;
pub mod snapshot;

pub use catalog::{AsymmetryWarning, CatalogBuilder, Tile, TileCatalog, TileId, DEFAULT_WEIGHT};
pub use cell::Cell;
pub use config::RunConfig;
pub use direction::Direction;
pub use driver::{CancelToken, CollapseDriver, DriverState, Failure};
pub use error::{CollapseError, LoadError};
pub use events::{Completion, EventLog, Placement, RunEvent, RunListener, RunListeners};
pub use grid::{Grid, Position};
pub use loader::{catalog_from_json_str, catalog_from_tileset_xml, load_catalog, CatalogDef, TileDef};
pub use propagation::{PropagationEngine, PropagationMode, PropagationReport, Reduction};
pub use rng::{CollapseRng, SequenceRandom, StdRandom};
pub use snapshot::{CellSnapshot, GridSnapshot};
