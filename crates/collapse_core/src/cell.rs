//! State of a single grid position.

use crate::catalog::TileId;

/// One grid position: a collapsed flag and the tiles still possible there.
///
/// Candidates only ever shrink. Once collapsed the cell holds exactly one
/// tile and never changes again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    collapsed: bool,
    candidates: Vec<TileId>,
}

impl Cell {
    /// Create an uncollapsed cell with the given candidates.
    pub fn new(candidates: Vec<TileId>) -> Self {
        Self {
            collapsed: false,
            candidates,
        }
    }

    #[inline]
    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    #[inline]
    pub fn candidates(&self) -> &[TileId] {
        &self.candidates
    }

    /// Number of remaining candidates.
    #[inline]
    pub fn entropy(&self) -> usize {
        self.candidates.len()
    }

    #[inline]
    pub fn is_contradiction(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn contains(&self, tile: TileId) -> bool {
        self.candidates.contains(&tile)
    }

    /// The chosen tile, once collapsed.
    pub fn collapsed_tile(&self) -> Option<TileId> {
        if self.collapsed {
            self.candidates.first().copied()
        } else {
            None
        }
    }

    /// Fix the cell to a single tile.
    pub(crate) fn collapse(&mut self, tile: TileId) {
        debug_assert!(!self.collapsed, "cell collapsed twice");
        self.collapsed = true;
        self.candidates.clear();
        self.candidates.push(tile);
    }

    /// Keep only the candidates accepted by `keep`.
    ///
    /// No-op on collapsed cells. Returns `true` if anything was removed.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(TileId) -> bool) -> bool {
        if self.collapsed {
            return false;
        }
        let before = self.candidates.len();
        self.candidates.retain(|&t| keep(t));
        self.candidates.len() != before
    }

    /// Replace the candidates with a reduced set computed elsewhere.
    pub(crate) fn replace_candidates(&mut self, reduced: Vec<TileId>) {
        debug_assert!(!self.collapsed);
        debug_assert!(reduced.iter().all(|t| self.candidates.contains(t)));
        self.candidates = reduced;
    }
}
