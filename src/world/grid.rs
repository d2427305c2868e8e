//! Floor grid coordinate mapping
//!
//! Converts continuous world positions to integer floor cells and back to the
//! exact world-space centre of a cell. Columns follow the X axis, rows follow
//! the Z axis. The venue has a single floor so every mapped position has `y == 0`.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance used when checking that a position sits on a cell centre
pub const ALIGNMENT_EPSILON: f32 = 1e-4;

/// One square of the venue floor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub col: i32,
    pub row: i32,
}

impl GridCell {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Chebyshev distance, which is the ring radius used by the free-cell search
    pub fn ring_distance(&self, other: &GridCell) -> i32 {
        (self.col - other.col).abs().max((self.row - other.row).abs())
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Fixed floor layout shared by every client
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Cells per side
    pub grid_size: u32,
    /// World units per cell edge
    pub cell_edge: f32,
    /// World coordinate of the centre of cell (0, 0) on both axes
    pub grid_offset: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::centered(20, 1.8)
    }
}

impl GridConfig {
    /// Layout whose centre cell sits on the world origin
    pub fn centered(grid_size: u32, cell_edge: f32) -> Self {
        Self {
            grid_size,
            cell_edge,
            grid_offset: -((grid_size / 2) as f32) * cell_edge,
        }
    }

    fn max_index(&self) -> i32 {
        self.grid_size.saturating_sub(1) as i32
    }

    fn axis_to_index(&self, value: f32) -> i32 {
        let raw = ((value - self.grid_offset) / self.cell_edge).round();
        // NaN saturates to 0 through the cast
        (raw as i32).clamp(0, self.max_index())
    }

    fn index_to_axis(&self, index: i32) -> f32 {
        self.grid_offset + index as f32 * self.cell_edge
    }

    /// Map a world position to the nearest cell, clamped into the grid
    pub fn to_cell(&self, world: Vec3) -> GridCell {
        GridCell::new(self.axis_to_index(world.x), self.axis_to_index(world.z))
    }

    /// World-space centre of a cell on the floor plane
    pub fn to_world(&self, cell: GridCell) -> Vec3 {
        Vec3::new(self.index_to_axis(cell.col), 0.0, self.index_to_axis(cell.row))
    }

    /// Snap an arbitrary position to its cell centre
    pub fn snap(&self, world: Vec3) -> Vec3 {
        self.to_world(self.to_cell(world))
    }

    /// True when the position is exactly a cell centre on the floor
    pub fn is_aligned(&self, world: Vec3) -> bool {
        if !world.is_finite() {
            return false;
        }
        let snapped = self.snap(world);
        (snapped - world).abs().max_element() <= ALIGNMENT_EPSILON
    }

    pub fn contains(&self, cell: GridCell) -> bool {
        let max = self.max_index();
        (0..=max).contains(&cell.col) && (0..=max).contains(&cell.row)
    }

    /// Clamp a cell into the grid
    pub fn clamp(&self, cell: GridCell) -> GridCell {
        let max = self.max_index();
        GridCell::new(cell.col.clamp(0, max), cell.row.clamp(0, max))
    }

    pub fn center_cell(&self) -> GridCell {
        let mid = (self.grid_size / 2) as i32;
        self.clamp(GridCell::new(mid, mid))
    }

    pub fn cell_count(&self) -> usize {
        (self.grid_size as usize) * (self.grid_size as usize)
    }

    /// Every valid cell in row-major order
    pub fn cells(&self) -> impl Iterator<Item = GridCell> {
        let size = self.grid_size as i32;
        (0..size).flat_map(move |row| (0..size).map(move |col| GridCell::new(col, row)))
    }
}
