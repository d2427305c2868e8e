pub mod settings;

// Re-export commonly used types
pub use settings::{
    AnimationSettings, AssetSettings, ConfigError, GridSettings, LoggingSettings, ModelSettings,
    PlacementSettings, VenueSettings, load_layered, load_venue_settings, read_settings_file,
    save_venue_settings, write_settings_file,
};
