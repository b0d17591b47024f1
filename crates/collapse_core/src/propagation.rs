//! Constraint propagation between neighboring cells.
//!
//! For a target cell and one of its neighbors, the tiles the target may
//! still hold are those in its own candidates that at least one of the
//! neighbor's candidates allows on the facing side:
//!
//! ```text
//! allowed = union of allowed_neighbors(t, opposite(dir)) for t in neighbor
//! target  = target ∩ allowed
//! ```
//!
//! A pass applies this once for every uncollapsed cell and every direction
//! that has a neighbor, in row-major order. Reductions are written back
//! immediately, so later cells in the same pass already see them.
//!
//! The default schedule is one pass per collapse (`SinglePass`), which can
//! leave cells under-constrained until a later round. `Fixpoint` repeats
//! passes until nothing changes.

use crate::catalog::{TileCatalog, TileId};
use crate::cell::Cell;
use crate::direction::Direction;
use crate::error::CollapseError;
use crate::grid::Grid;
use serde::{Deserialize, Serialize};

/// How much propagation runs after each collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationMode {
    /// Exactly one full-grid pass per round.
    #[default]
    SinglePass,
    /// Repeat passes until no cell changes.
    Fixpoint,
}

/// Result of reducing one cell against one neighbor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    pub candidates: Vec<TileId>,
    pub changed: bool,
}

/// Summary of a propagation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropagationReport {
    /// Full-grid passes run.
    pub passes: usize,
    /// Cell updates that removed at least one candidate, summed over passes.
    pub changed_cells: usize,
}

/// Applies adjacency constraints from a catalog to cells of a grid.
pub struct PropagationEngine<'a> {
    catalog: &'a TileCatalog,
    /// Scratch mask, `allowed[tile]`, reused between reductions.
    allowed: Vec<bool>,
}

impl<'a> PropagationEngine<'a> {
    pub fn new(catalog: &'a TileCatalog) -> Self {
        Self {
            catalog,
            allowed: vec![false; catalog.len()],
        }
    }

    /// Reduce `target` against `neighbor`, which lies in `toward_neighbor` from it.
    ///
    /// Does not modify either cell.
    pub fn reduce(&mut self, target: &Cell, neighbor: &Cell, toward_neighbor: Direction) -> Reduction {
        self.allowed.fill(false);
        let facing = toward_neighbor.opposite();
        for &t in neighbor.candidates() {
            for &a in self.catalog.allowed_neighbors(t, facing) {
                if let Some(slot) = self.allowed.get_mut(a.index()) {
                    *slot = true;
                }
            }
        }

        let candidates: Vec<TileId> = target
            .candidates()
            .iter()
            .copied()
            .filter(|t| self.allowed.get(t.index()).copied().unwrap_or(false))
            .collect();
        // The result is a filtered subset, so equal length means equal membership.
        let changed = candidates.len() != target.entropy();

        Reduction {
            candidates,
            changed,
        }
    }

    /// Run one full-grid pass.
    ///
    /// Fails on the first cell whose candidates become empty, leaving the
    /// grid as it was at that point.
    pub fn pass(&mut self, grid: &mut Grid) -> Result<usize, CollapseError> {
        let mut changed_cells = 0;

        for index in 0..grid.len() {
            let position = grid.position_of(index);
            if grid.cell(position).map_or(true, Cell::is_collapsed) {
                continue;
            }

            let mut cell_changed = false;
            for direction in Direction::ALL {
                let Some(neighbor_pos) = grid.neighbor_position(position, direction) else {
                    continue;
                };

                let reduction = match (grid.cell(position), grid.cell(neighbor_pos)) {
                    (Some(target), Some(neighbor)) => self.reduce(target, neighbor, direction),
                    _ => continue,
                };

                if reduction.changed {
                    cell_changed = true;
                    if let Some(cell) = grid.cell_mut(position) {
                        cell.replace_candidates(reduction.candidates);
                    }
                }

                if grid.cell(position).map_or(false, Cell::is_contradiction) {
                    return Err(CollapseError::ContradictionDetected { position });
                }
            }

            if cell_changed {
                changed_cells += 1;
            }
        }

        Ok(changed_cells)
    }

    /// Propagate according to `mode`.
    pub fn propagate(
        &mut self,
        grid: &mut Grid,
        mode: PropagationMode,
    ) -> Result<PropagationReport, CollapseError> {
        let mut report = PropagationReport::default();

        loop {
            let changed = self.pass(grid)?;
            report.passes += 1;
            report.changed_cells += changed;

            if mode == PropagationMode::SinglePass || changed == 0 {
                return Ok(report);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Position;

    /// Three terrain bands: land next to coast, coast next to sea.
    fn coast() -> TileCatalog {
        TileCatalog::builder()
            .tile("land", 1)
            .tile("coast", 1)
            .tile("sea", 1)
            .allow_all_sides("land", "land")
            .allow_all_sides("coast", "coast")
            .allow_all_sides("sea", "sea")
            .allow_all_sides("land", "coast")
            .allow_all_sides("coast", "sea")
            .build()
            .unwrap()
    }

    #[test]
    fn test_reduce_against_collapsed_neighbor() {
        let catalog = coast();
        let mut engine = PropagationEngine::new(&catalog);
        let target = Cell::new(catalog.ids().collect());
        let mut neighbor = Cell::new(catalog.ids().collect());
        neighbor.collapse(TileId(2)); // sea

        let reduction = engine.reduce(&target, &neighbor, Direction::Right);
        assert!(reduction.changed);
        assert_eq!(reduction.candidates, vec![TileId(1), TileId(2)]);
    }

    #[test]
    fn test_reduce_is_idempotent() {
        let catalog = coast();
        let mut engine = PropagationEngine::new(&catalog);
        let mut target = Cell::new(catalog.ids().collect());
        let mut neighbor = Cell::new(catalog.ids().collect());
        neighbor.collapse(TileId(0)); // land

        let first = engine.reduce(&target, &neighbor, Direction::Down);
        assert!(first.changed);
        target.replace_candidates(first.candidates);

        let second = engine.reduce(&target, &neighbor, Direction::Down);
        assert!(!second.changed);
        assert_eq!(second.candidates, target.candidates());
    }

    #[test]
    fn test_reduce_uses_facing_side() {
        // "a" allows "b" only to its right. A cell left of a collapsed "b"
        // may hold "a"; a cell to the right of it may not.
        let catalog = TileCatalog::builder()
            .tile("a", 1)
            .tile("b", 1)
            .allow_pair("a", Direction::Right, "b")
            .build()
            .unwrap();
        let mut engine = PropagationEngine::new(&catalog);
        let open = Cell::new(catalog.ids().collect());
        let mut b = Cell::new(catalog.ids().collect());
        b.collapse(TileId(1));

        let left_of_b = engine.reduce(&open, &b, Direction::Right);
        assert_eq!(left_of_b.candidates, vec![TileId(0)]);

        let right_of_b = engine.reduce(&open, &b, Direction::Left);
        assert!(right_of_b.candidates.is_empty());
    }

    #[test]
    fn test_single_pass_constrains_neighbors() {
        let catalog = coast();
        let mut grid = Grid::new(3, 1, &catalog).unwrap();
        grid.collapse(Position::new(0, 0), TileId(0)); // land

        let mut engine = PropagationEngine::new(&catalog);
        let report = engine.propagate(&mut grid, PropagationMode::SinglePass).unwrap();
        assert_eq!(report.passes, 1);

        let middle = grid.cell(Position::new(1, 0)).unwrap();
        assert_eq!(middle.candidates(), &[TileId(0), TileId(1)]);
        // Coast may sit beside anything, so the far cell keeps every tile.
        let far = grid.cell(Position::new(2, 0)).unwrap();
        assert_eq!(far.candidates(), &[TileId(0), TileId(1), TileId(2)]);
    }

    #[test]
    fn test_single_pass_can_under_propagate() {
        let catalog = coast();
        let mut grid = Grid::new(4, 1, &catalog).unwrap();
        grid.collapse(Position::new(3, 0), TileId(0)); // land at the far end

        let mut engine = PropagationEngine::new(&catalog);
        engine.propagate(&mut grid, PropagationMode::SinglePass).unwrap();
        // Only the direct neighbor is reduced: earlier cells were visited first.
        assert_eq!(grid.cell(Position::new(0, 0)).unwrap().entropy(), 3);
        assert_eq!(grid.cell(Position::new(1, 0)).unwrap().entropy(), 3);
        assert_eq!(grid.cell(Position::new(2, 0)).unwrap().entropy(), 2);
    }

    #[test]
    fn test_fixpoint_runs_until_stable() {
        let catalog = TileCatalog::builder()
            .tile("a", 1)
            .tile("b", 1)
            .allow_all_sides("a", "b")
            .build()
            .unwrap();
        let mut grid = Grid::new(4, 1, &catalog).unwrap();
        grid.collapse(Position::new(3, 0), TileId(0));

        let mut engine = PropagationEngine::new(&catalog);
        let report = engine.propagate(&mut grid, PropagationMode::Fixpoint).unwrap();
        assert!(report.passes > 1);

        let tiles: Vec<Vec<TileId>> = (0..4)
            .map(|x| grid.cell(Position::new(x, 0)).unwrap().candidates().to_vec())
            .collect();
        assert_eq!(
            tiles,
            vec![
                vec![TileId(1)],
                vec![TileId(0)],
                vec![TileId(1)],
                vec![TileId(0)]
            ]
        );

        // A further pass changes nothing.
        assert_eq!(engine.pass(&mut grid).unwrap(), 0);
    }

    #[test]
    fn test_pass_reports_contradiction() {
        let catalog = TileCatalog::builder()
            .tile("loner", 1)
            .tile("other", 1)
            .build()
            .unwrap();
        let mut grid = Grid::new(2, 1, &catalog).unwrap();
        grid.collapse(Position::new(0, 0), TileId(0));

        let mut engine = PropagationEngine::new(&catalog);
        let err = engine.pass(&mut grid).unwrap_err();
        assert_eq!(
            err,
            CollapseError::ContradictionDetected {
                position: Position::new(1, 0)
            }
        );
    }

    #[test]
    fn test_pass_skips_collapsed_cells() {
        let catalog = coast();
        let mut grid = Grid::new(2, 1, &catalog).unwrap();
        grid.collapse(Position::new(0, 0), TileId(0));
        grid.collapse(Position::new(1, 0), TileId(2)); // land beside sea, left alone

        let mut engine = PropagationEngine::new(&catalog);
        assert_eq!(engine.pass(&mut grid).unwrap(), 0);
        assert_eq!(
            grid.cell(Position::new(1, 0)).unwrap().collapsed_tile(),
            Some(TileId(2))
        );
    }
}
