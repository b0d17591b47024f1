//! Serializable view of a grid's tile assignments.

use crate::catalog::TileCatalog;
use crate::error::LoadError;
use crate::grid::{Grid, Position};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// One cell of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    /// Name of the collapsed tile, `None` while uncollapsed.
    pub tile: Option<String>,
    /// Candidates left when the snapshot was taken.
    pub remaining: usize,
}

/// Tile names by position, row-major, detached from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<CellSnapshot>,
}

impl GridSnapshot {
    pub fn from_grid(grid: &Grid, catalog: &TileCatalog) -> Self {
        let cells = grid
            .cells()
            .map(|(_, cell)| CellSnapshot {
                tile: cell
                    .collapsed_tile()
                    .map(|id| catalog.name(id).to_string()),
                remaining: cell.entropy(),
            })
            .collect();

        Self {
            width: grid.width(),
            height: grid.height(),
            cells,
        }
    }

    pub fn cell(&self, position: Position) -> Option<&CellSnapshot> {
        if position.x >= self.width || position.y >= self.height {
            return None;
        }
        self.cells.get(position.x + position.y * self.width)
    }

    /// Collapsed tile name at `position`.
    pub fn tile_at(&self, position: Position) -> Option<&str> {
        self.cell(position).and_then(|c| c.tile.as_deref())
    }

    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(|c| c.tile.is_some())
    }

    pub fn collapsed_count(&self) -> usize {
        self.cells.iter().filter(|c| c.tile.is_some()).count()
    }

    /// One character per cell: the first letter of the tile name, `.` if
    /// uncollapsed, `!` for an empty candidate set.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in self.cells.chunks(self.width.max(1)) {
            for cell in row {
                let ch = match &cell.tile {
                    Some(name) => name.chars().next().unwrap_or('?'),
                    None if cell.remaining == 0 => '!',
                    None => '.',
                };
                out.push(ch);
            }
            out.push('\n');
        }
        out
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let reader = BufReader::new(File::open(path)?);
        let snapshot: GridSnapshot = serde_json::from_reader(reader)?;
        let Some(expected) = snapshot.width.checked_mul(snapshot.height) else {
            return Err(LoadError::Json(format!(
                "snapshot size {}x{} overflows",
                snapshot.width, snapshot.height
            )));
        };
        if snapshot.cells.len() != expected {
            return Err(LoadError::Json(format!(
                "snapshot has {} cells, expected {}x{}",
                snapshot.cells.len(),
                snapshot.width,
                snapshot.height
            )));
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TileId;

    fn sample() -> (Grid, TileCatalog) {
        let catalog = TileCatalog::builder()
            .tile("grass", 1)
            .tile("water", 1)
            .build()
            .unwrap();
        let mut grid = Grid::new(2, 2, &catalog).unwrap();
        grid.collapse(Position::new(0, 0), TileId(0));
        grid.collapse(Position::new(1, 1), TileId(1));
        (grid, catalog)
    }

    #[test]
    fn test_from_grid() {
        let (grid, catalog) = sample();
        let snapshot = GridSnapshot::from_grid(&grid, &catalog);
        assert_eq!(snapshot.tile_at(Position::new(0, 0)), Some("grass"));
        assert_eq!(snapshot.tile_at(Position::new(1, 0)), None);
        assert_eq!(snapshot.tile_at(Position::new(1, 1)), Some("water"));
        assert_eq!(snapshot.tile_at(Position::new(2, 0)), None);
        assert_eq!(snapshot.collapsed_count(), 2);
        assert!(!snapshot.is_complete());
        assert_eq!(snapshot.cell(Position::new(0, 1)).unwrap().remaining, 2);
    }

    #[test]
    fn test_to_ascii() {
        let (grid, catalog) = sample();
        let snapshot = GridSnapshot::from_grid(&grid, &catalog);
        assert_eq!(snapshot.to_ascii(), "g.\n.w\n");
    }

    #[test]
    fn test_json_file_round_trip() {
        let (grid, catalog) = sample();
        let snapshot = GridSnapshot::from_grid(&grid, &catalog);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");

        snapshot.save_json(&path).unwrap();
        assert_eq!(GridSnapshot::load_json(&path).unwrap(), snapshot);
    }

    #[test]
    fn test_load_rejects_wrong_cell_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "width": 2, "height": 2, "cells": [] }"#).unwrap();
        assert!(matches!(
            GridSnapshot::load_json(&path),
            Err(LoadError::Json(_))
        ));
    }

    #[test]
    fn test_load_rejects_overflowing_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.json");
        std::fs::write(
            &path,
            r#"{ "width": 18446744073709551615, "height": 3, "cells": [] }"#,
        )
        .unwrap();
        assert!(matches!(
            GridSnapshot::load_json(&path),
            Err(LoadError::Json(msg)) if msg.contains("overflows")
        ));
    }
}
