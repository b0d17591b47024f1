//! Fixed-size 2D grid of cells.
//!
//! Cells are stored row-major: `index = x + y * width`. The grid never wraps;
//! cells on the border simply have fewer neighbors.

use crate::catalog::{TileCatalog, TileId};
use crate::cell::Cell;
use crate::direction::Direction;
use crate::error::CollapseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// `width * height` cells, every one starting with the full catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create a grid where every cell holds every tile of `catalog`.
    ///
    /// Fails with `InvalidConfiguration` for zero dimensions or an empty catalog.
    pub fn new(width: usize, height: usize, catalog: &TileCatalog) -> Result<Self, CollapseError> {
        if width == 0 || height == 0 {
            return Err(CollapseError::InvalidConfiguration(format!(
                "grid dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        if catalog.is_empty() {
            return Err(CollapseError::InvalidConfiguration(
                "tile catalog is empty".to_string(),
            ));
        }
        let len = width.checked_mul(height).ok_or_else(|| {
            CollapseError::InvalidConfiguration(format!("grid {}x{} is too large", width, height))
        })?;

        let all: Vec<TileId> = catalog.ids().collect();
        Ok(Self {
            width,
            height,
            cells: vec![Cell::new(all); len],
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Flat index of `position`, or `None` if out of bounds.
    #[inline]
    pub fn index_of(&self, position: Position) -> Option<usize> {
        if position.x < self.width && position.y < self.height {
            Some(position.x + position.y * self.width)
        } else {
            None
        }
    }

    #[inline]
    pub fn position_of(&self, index: usize) -> Position {
        Position::new(index % self.width, index / self.width)
    }

    pub fn cell(&self, position: Position) -> Option<&Cell> {
        self.index_of(position).map(|i| &self.cells[i])
    }

    pub(crate) fn cell_mut(&mut self, position: Position) -> Option<&mut Cell> {
        self.index_of(position).map(move |i| &mut self.cells[i])
    }

    /// Iterate cells in row-major order with their positions.
    pub fn cells(&self) -> impl Iterator<Item = (Position, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, c)| (self.position_of(i), c))
    }

    /// Position of the neighbor in `direction`, or `None` at the border.
    pub fn neighbor_position(&self, position: Position, direction: Direction) -> Option<Position> {
        let (dx, dy) = direction.offset();
        let x = position.x.checked_add_signed(dx)?;
        let y = position.y.checked_add_signed(dy)?;
        let neighbor = Position::new(x, y);
        self.index_of(neighbor).map(|_| neighbor)
    }

    /// Uncollapsed cells, ascending by candidate count.
    ///
    /// The sort is stable, so equal-entropy cells keep row-major order.
    /// Empty once every cell is collapsed.
    pub fn entropy_rank(&self) -> Vec<Position> {
        let mut open: Vec<(usize, Position)> = self
            .cells()
            .filter(|(_, cell)| !cell.is_collapsed())
            .map(|(pos, cell)| (cell.entropy(), pos))
            .collect();
        open.sort_by_key(|&(entropy, _)| entropy);
        open.into_iter().map(|(_, pos)| pos).collect()
    }

    /// The uncollapsed cells tied for the minimum candidate count.
    pub fn min_entropy_group(&self) -> Vec<Position> {
        let rank = self.entropy_rank();
        let Some(min) = rank.first().and_then(|&p| self.cell(p)).map(Cell::entropy) else {
            return Vec::new();
        };
        rank.into_iter()
            .take_while(|&p| self.cell(p).map(Cell::entropy) == Some(min))
            .collect()
    }

    pub fn uncollapsed_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_collapsed()).count()
    }

    pub fn is_fully_collapsed(&self) -> bool {
        self.cells.iter().all(Cell::is_collapsed)
    }

    /// Collapse the cell at `position` to `tile`.
    pub(crate) fn collapse(&mut self, position: Position, tile: TileId) {
        if let Some(cell) = self.cell_mut(position) {
            cell.collapse(tile);
        }
    }

    /// Restrict an uncollapsed cell to the tiles in `allowed`.
    ///
    /// Runs reach this through `CollapseDriver::constrain`. Returns whether
    /// the cell changed; fails if nothing remains, leaving the cell empty.
    pub fn constrain(&mut self, position: Position, allowed: &[TileId]) -> Result<bool, CollapseError> {
        let cell = self
            .cell_mut(position)
            .ok_or_else(|| CollapseError::InvalidConfiguration(format!("{} is outside the grid", position)))?;
        let changed = cell.retain(|t| allowed.contains(&t));
        if cell.is_contradiction() {
            return Err(CollapseError::ContradictionDetected { position });
        }
        Ok(changed)
    }
}
