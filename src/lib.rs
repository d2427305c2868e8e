// Venue-Rust: shared venue floor engine
// Placement, model normalization and animation for a multi-visitor venue

pub mod animation;
pub mod app;
pub mod assets;
pub mod config;
pub mod networking;
pub mod utils;
pub mod world;

// Re-export commonly used types for convenience
pub use app::{AvatarView, VenueClient, VenueError, VenueResult};
pub use config::{load_layered, VenueSettings};
pub use networking::{LocalPresenceHub, PresenceSync};
pub use world::{GridCell, GridConfig, PlacementCoordinator, PlacementOutcome, VenueEvent};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
