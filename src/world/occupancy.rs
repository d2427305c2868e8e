//! Occupancy index
//!
//! A throwaway projection of the current avatar set onto the floor grid. It is
//! rebuilt wholesale from every presence snapshot and never mutated in place.

use super::avatar::Avatar;
use super::grid::{GridCell, GridConfig};
use std::collections::BTreeMap;
use uuid::Uuid;

/// An avatar claiming a cell, kept in precedence order per cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Claim {
    avatar_id: Uuid,
    created_at: u64,
}

/// A cell claimed by more than one avatar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellConflict {
    pub cell: GridCell,
    /// Keeps the cell
    pub winner: Uuid,
    /// Must move, in precedence order
    pub losers: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct OccupancyIndex {
    grid: GridConfig,
    claims: BTreeMap<GridCell, Vec<Claim>>,
    search_radius: u32,
}

impl OccupancyIndex {
    /// Build from the full avatar set. Unplaced avatars claim nothing.
    pub fn build<'a, I>(grid: GridConfig, avatars: I) -> Self
    where
        I: IntoIterator<Item = &'a Avatar>,
    {
        let mut claims: BTreeMap<GridCell, Vec<Claim>> = BTreeMap::new();
        for avatar in avatars {
            let Some(position) = avatar.position else {
                continue;
            };
            claims.entry(grid.to_cell(position)).or_default().push(Claim {
                avatar_id: avatar.id,
                created_at: avatar.created_at,
            });
        }

        for cell_claims in claims.values_mut() {
            cell_claims.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.avatar_id.cmp(&b.avatar_id))
            });
            cell_claims.dedup_by_key(|c| c.avatar_id);
        }

        Self {
            grid,
            claims,
            search_radius: grid.grid_size / 2,
        }
    }

    /// Build from the avatar set as seen by `avatar_id`: its own claim is
    /// left out so the cell it currently stands on counts as free for it.
    pub fn build_excluding<'a, I>(grid: GridConfig, avatars: I, avatar_id: Uuid) -> Self
    where
        I: IntoIterator<Item = &'a Avatar>,
    {
        Self::build(grid, avatars.into_iter().filter(|a| a.id != avatar_id))
    }

    /// Override the ring bound used by `nearest_free`
    pub fn with_search_radius(mut self, radius: u32) -> Self {
        self.search_radius = radius;
        self
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    /// Who holds the cell. For a contested cell this is the avatar with precedence.
    pub fn occupant_of(&self, cell: GridCell) -> Option<Uuid> {
        self.claims
            .get(&cell)
            .and_then(|claims| claims.first())
            .map(|claim| claim.avatar_id)
    }

    /// Every avatar claiming the cell, in precedence order
    pub fn claimants(&self, cell: GridCell) -> Vec<Uuid> {
        self.claims
            .get(&cell)
            .map(|claims| claims.iter().map(|c| c.avatar_id).collect())
            .unwrap_or_default()
    }

    pub fn is_free(&self, cell: GridCell) -> bool {
        self.grid.contains(cell) && !self.claims.contains_key(&cell)
    }

    pub fn occupied_count(&self) -> usize {
        self.claims.len()
    }

    /// Cells held by two or more avatars, in cell order
    pub fn conflicts(&self) -> Vec<CellConflict> {
        self.claims
            .iter()
            .filter(|(_, claims)| claims.len() > 1)
            .map(|(cell, claims)| CellConflict {
                cell: *cell,
                winner: claims[0].avatar_id,
                losers: claims[1..].iter().map(|c| c.avatar_id).collect(),
            })
            .collect()
    }

    /// Occupied cells with the avatar holding each
    pub fn iter(&self) -> impl Iterator<Item = (GridCell, Uuid)> + '_ {
        self.claims
            .iter()
            .filter_map(|(cell, claims)| claims.first().map(|c| (*cell, c.avatar_id)))
    }

    /// Expanding-ring search for the closest free cell.
    ///
    /// Rings are visited from radius 0 up to the search bound; within a ring the
    /// visiting order is fixed (see [`ring`]) so every client with the same
    /// snapshot lands on the same candidate. `None` means the grid is full
    /// within the bound.
    pub fn nearest_free(&self, origin: GridCell) -> Option<GridCell> {
        let origin = self.grid.clamp(origin);
        (0..=self.search_radius as i32)
            .flat_map(|radius| ring(origin, radius))
            .find(|cell| self.is_free(*cell))
    }
}

/// Cells at Chebyshev distance `radius` from `origin`, in visiting order.
///
/// The ring is walked clockwise with rows growing downward: top edge
/// left-to-right, right edge top-to-bottom, bottom edge right-to-left, left
/// edge bottom-to-top. The walk is entered at the east midpoint
/// `(col + radius, row)`, so the first candidate next to a taken origin is the
/// cell directly to its right. Cells may fall outside the grid; callers filter.
pub fn ring(origin: GridCell, radius: i32) -> Vec<GridCell> {
    if radius <= 0 {
        return vec![origin];
    }

    let (c, r) = (origin.col, origin.row);
    let top = r - radius;
    let bottom = r + radius;
    let left = c - radius;
    let right = c + radius;

    let mut walk = Vec::with_capacity((8 * radius) as usize);
    for col in left..=right {
        walk.push(GridCell::new(col, top));
    }
    for row in (top + 1)..=bottom {
        walk.push(GridCell::new(right, row));
    }
    for col in (left..right).rev() {
        walk.push(GridCell::new(col, bottom));
    }
    for row in ((top + 1)..bottom).rev() {
        walk.push(GridCell::new(left, row));
    }

    // East midpoint sits `radius` cells into the right edge
    let entry = (2 * radius + 1 + (radius - 1)) as usize;
    walk.rotate_left(entry);
    walk
}
