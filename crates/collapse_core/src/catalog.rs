//! Tile catalog: the fixed set of tiles and their adjacency rules.
//!
//! A tile's identity is its position in the catalog (`TileId`), never its
//! contents. Each tile carries four adjacency lists, one per `Direction`,
//! naming the tiles allowed next to it on that side, and an integer weight
//! used by `weighted_pick` (1 unless stated otherwise).
//!
//! Adjacency is taken as given. A correct catalog is mirror-consistent (if
//! A allows B to its right, B allows A to its left) but nothing here
//! enforces that; `TileCatalog::validate` reports the gaps.

use crate::direction::Direction;
use crate::error::CollapseError;
use crate::rng::CollapseRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Positional identity of a tile in its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub usize);

impl TileId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Default weight for tiles declared without one.
pub const DEFAULT_WEIGHT: u32 = 1;

/// One placeable tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    name: String,
    weight: u32,
    /// Opaque display handle for the placement collaborator (prefab path, colour, ...).
    handle: Option<String>,
    /// Allowed neighbors, indexed by `Direction::index()`.
    neighbors: [Vec<TileId>; 4],
}

impl Tile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }

    /// Tiles allowed on the given side of this tile.
    pub fn neighbors(&self, direction: Direction) -> &[TileId] {
        &self.neighbors[direction.index()]
    }
}

/// A one-sided adjacency rule with no mirror entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsymmetryWarning {
    /// Tile whose list contains `neighbor`.
    pub tile: TileId,
    /// Side of `tile` the rule applies to.
    pub direction: Direction,
    /// Tile that does not list `tile` on the opposite side.
    pub neighbor: TileId,
}

/// Immutable, ordered set of tiles for one or more runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TileCatalog {
    tiles: Vec<Tile>,
}

impl TileCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.index())
    }

    /// All tile ids in catalog (insertion) order.
    pub fn ids(&self) -> impl Iterator<Item = TileId> + '_ {
        (0..self.tiles.len()).map(TileId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TileId, &Tile)> {
        self.tiles.iter().enumerate().map(|(i, t)| (TileId(i), t))
    }

    /// Look up a tile by name.
    pub fn id_of(&self, name: &str) -> Option<TileId> {
        self.tiles.iter().position(|t| t.name == name).map(TileId)
    }

    /// Tile name, or `"?"` for ids outside the catalog.
    pub fn name(&self, id: TileId) -> &str {
        self.tile(id).map(Tile::name).unwrap_or("?")
    }

    pub fn weight(&self, id: TileId) -> u32 {
        self.tile(id).map(Tile::weight).unwrap_or(0)
    }

    /// Tiles allowed on the `direction` side of `id`. Empty when unset.
    pub fn allowed_neighbors(&self, id: TileId, direction: Direction) -> &[TileId] {
        self.tile(id)
            .map(|t| t.neighbors(direction))
            .unwrap_or(&[])
    }

    /// Sum of the weights of `candidates`.
    pub fn total_weight(&self, candidates: &[TileId]) -> u64 {
        candidates.iter().map(|&id| self.weight(id) as u64).sum()
    }

    /// Map a draw in `[0, total_weight)` onto a candidate.
    ///
    /// Walks candidates in the given order, subtracting each weight from the
    /// draw, and returns the first tile whose weight exceeds what is left.
    /// Returns `None` when the draw is out of range.
    pub fn pick_at(&self, candidates: &[TileId], draw: u64) -> Option<TileId> {
        let mut remaining = draw;
        for &id in candidates {
            let weight = self.weight(id) as u64;
            if remaining < weight {
                return Some(id);
            }
            remaining -= weight;
        }
        None
    }

    /// Weighted random choice among `candidates`.
    ///
    /// If every candidate has weight 0 the choice is uniform.
    pub fn weighted_pick(
        &self,
        candidates: &[TileId],
        rng: &mut dyn CollapseRng,
    ) -> Result<TileId, CollapseError> {
        if candidates.is_empty() {
            return Err(CollapseError::EmptyCandidateSet);
        }

        let total = self.total_weight(candidates);
        if total == 0 {
            return Ok(candidates[rng.next_usize_max(candidates.len())]);
        }

        let draw = rng.next_int_max(total);
        self.pick_at(candidates, draw)
            .ok_or(CollapseError::EmptyCandidateSet)
    }

    /// Report every adjacency rule that is not mirrored by its neighbor.
    ///
    /// Each gap is also logged at `warn`. The algorithm runs fine on
    /// asymmetric catalogs; this is an authoring aid.
    pub fn validate(&self) -> Vec<AsymmetryWarning> {
        let mut warnings = Vec::new();

        for (id, tile) in self.iter() {
            for direction in Direction::ALL {
                for &neighbor in tile.neighbors(direction) {
                    let mirrored = self
                        .allowed_neighbors(neighbor, direction.opposite())
                        .contains(&id);
                    if !mirrored {
                        tracing::warn!(
                            "asymmetric adjacency: '{}' allows '{}' to its {}, but not the reverse",
                            tile.name(),
                            self.name(neighbor),
                            direction
                        );
                        warnings.push(AsymmetryWarning {
                            tile: id,
                            direction,
                            neighbor,
                        });
                    }
                }
            }
        }

        warnings
    }
}

struct PendingTile {
    name: String,
    weight: u32,
    handle: Option<String>,
}

/// Builder for `TileCatalog`, addressing tiles by name.
///
/// ```ignore
/// let catalog = TileCatalog::builder()
///     .tile("grass", 3)
///     .tile("sand", 1)
///     .allow_pair("grass", Direction::Right, "sand")
///     .build()?;
/// ```
#[derive(Default)]
pub struct CatalogBuilder {
    tiles: Vec<PendingTile>,
    rules: Vec<(String, Direction, String)>,
}

impl CatalogBuilder {
    /// Declare a tile. Declaration order is catalog order.
    pub fn tile(self, name: &str, weight: u32) -> Self {
        self.declare(name, weight, None)
    }

    /// Declare a tile with an opaque display handle.
    pub fn tile_with_handle(self, name: &str, weight: u32, handle: &str) -> Self {
        self.declare(name, weight, Some(handle.to_string()))
    }

    fn declare(mut self, name: &str, weight: u32, handle: Option<String>) -> Self {
        self.tiles.push(PendingTile {
            name: name.to_string(),
            weight,
            handle,
        });
        self
    }

    /// Allow `neighbor` on the `direction` side of `tile` (one-sided).
    pub fn allow(mut self, tile: &str, direction: Direction, neighbor: &str) -> Self {
        self.rules
            .push((tile.to_string(), direction, neighbor.to_string()));
        self
    }

    /// Allow `neighbor` on the `direction` side of `tile`, and the mirror rule.
    pub fn allow_pair(self, tile: &str, direction: Direction, neighbor: &str) -> Self {
        self.allow(tile, direction, neighbor)
            .allow(neighbor, direction.opposite(), tile)
    }

    /// Allow `neighbor` next to `tile` on every side, mirrored.
    pub fn allow_all_sides(mut self, tile: &str, neighbor: &str) -> Self {
        for direction in Direction::ALL {
            self = self.allow_pair(tile, direction, neighbor);
        }
        self
    }

    pub fn build(self) -> Result<TileCatalog, CollapseError> {
        let mut index: HashMap<&str, TileId> = HashMap::new();
        for (i, pending) in self.tiles.iter().enumerate() {
            if index.insert(pending.name.as_str(), TileId(i)).is_some() {
                return Err(CollapseError::InvalidConfiguration(format!(
                    "duplicate tile name '{}'",
                    pending.name
                )));
            }
        }

        let mut neighbors: Vec<[Vec<TileId>; 4]> = vec![Default::default(); self.tiles.len()];
        for (tile, direction, neighbor) in &self.rules {
            let from = *index
                .get(tile.as_str())
                .ok_or_else(|| CollapseError::UnknownTile(tile.clone()))?;
            let to = *index
                .get(neighbor.as_str())
                .ok_or_else(|| CollapseError::UnknownTile(neighbor.clone()))?;

            let list = &mut neighbors[from.index()][direction.index()];
            if !list.contains(&to) {
                list.push(to);
            }
        }

        let tiles = self
            .tiles
            .into_iter()
            .zip(neighbors)
            .map(|(pending, neighbors)| Tile {
                name: pending.name,
                weight: pending.weight,
                handle: pending.handle,
                neighbors,
            })
            .collect();

        Ok(TileCatalog { tiles })
    }
}
