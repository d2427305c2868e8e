//! The shared venue floor: avatars, grid mapping, occupancy and placement

pub mod avatar;
pub mod events;
pub mod grid;
pub mod occupancy;
pub mod placement;

pub use avatar::{Avatar, AvatarPatch, Customization, ModelRef, Rgb};
pub use events::*;
pub use grid::{GridCell, GridConfig};
pub use occupancy::{CellConflict, OccupancyIndex};
pub use placement::{PlacementCoordinator, PlacementError, PlacementResult};
