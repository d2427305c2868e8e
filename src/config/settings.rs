use crate::world::grid::GridConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const CONFIG_FILE: &str = "venue.toml";
const ENV_PREFIX: &str = "VENUE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode settings: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Failed to decode settings: {0}")]
    Decode(#[from] toml::de::Error),

    #[error("Failed to merge settings: {0}")]
    Layered(#[from] ::config::ConfigError),
}

// =============================================================================
// Venue Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub grid_size: u32,
    pub cell_edge: f32,
    /// Centre of cell (0, 0); derived from the size when absent
    pub grid_offset: Option<f32>,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            grid_size: 20,
            cell_edge: 1.8,
            grid_offset: None,
        }
    }
}

impl GridSettings {
    pub fn to_grid(&self) -> GridConfig {
        let mut grid = GridConfig::centered(self.grid_size, self.cell_edge);
        if let Some(offset) = self.grid_offset {
            grid.grid_offset = offset;
        }
        grid
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementSettings {
    /// Conflict-driven retries before an avatar is parked on the centre cell
    pub max_attempts: u32,
    /// Ring bound for the free-cell search, half the grid when absent
    pub search_radius: Option<u32>,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            search_radius: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Canonical avatar height in world units
    pub target_height: f32,
    pub placeholder_width: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            target_height: 2.5,
            placeholder_width: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    pub crossfade_seconds: f32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self { crossfade_seconds: 0.3 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Directory of `.dae` models; the built-in mannequin is used when absent
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueSettings {
    pub grid: GridSettings,
    pub placement: PlacementSettings,
    pub model: ModelSettings,
    pub animation: AnimationSettings,
    pub assets: AssetSettings,
    pub logging: LoggingSettings,
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be a positive number, got {}", value),
        })
    }
}

impl VenueSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.grid_size == 0 {
            return Err(ConfigError::Invalid {
                field: "grid.grid_size",
                reason: "must be at least 1".to_string(),
            });
        }
        positive("grid.cell_edge", self.grid.cell_edge)?;
        if let Some(offset) = self.grid.grid_offset {
            if !offset.is_finite() {
                return Err(ConfigError::Invalid {
                    field: "grid.grid_offset",
                    reason: "must be finite".to_string(),
                });
            }
        }
        positive("model.target_height", self.model.target_height)?;
        positive("model.placeholder_width", self.model.placeholder_width)?;
        let crossfade = self.animation.crossfade_seconds;
        if !(crossfade.is_finite() && crossfade >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "animation.crossfade_seconds",
                reason: format!("must be zero or positive, got {}", crossfade),
            });
        }
        Ok(())
    }

    pub fn grid_config(&self) -> GridConfig {
        self.grid.to_grid()
    }
}

// Configuration file management
fn venue_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "venue", "venue-rust").map(|proj| proj.config_dir().join(CONFIG_FILE))
}

pub fn write_settings_file(path: &Path, settings: &VenueSettings) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let toml = toml::to_string_pretty(settings)?;
    fs::write(path, toml)?;
    Ok(())
}

pub fn read_settings_file(path: &Path) -> Result<VenueSettings, ConfigError> {
    let data = fs::read_to_string(path)?;
    let settings: VenueSettings = toml::from_str(&data)?;
    settings.validate()?;
    Ok(settings)
}

pub fn save_venue_settings(settings: &VenueSettings) -> Result<(), ConfigError> {
    if let Some(path) = venue_config_path() {
        write_settings_file(&path, settings)?;
        debug!("⚙️ Saved venue settings to {}", path.display());
    }
    Ok(())
}

pub fn load_venue_settings() -> Option<VenueSettings> {
    let path = venue_config_path()?;
    match read_settings_file(&path) {
        Ok(settings) => Some(settings),
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("⚙️ Ignoring unreadable settings at {}: {}", path.display(), e);
            None
        }
    }
}

/// Defaults, then an optional TOML file, then `VENUE__SECTION__KEY`
/// environment overrides.
pub fn load_layered(path: Option<&Path>) -> Result<VenueSettings, ConfigError> {
    let mut builder = ::config::Config::builder()
        .add_source(::config::Config::try_from(&VenueSettings::default())?);
    if let Some(path) = path {
        builder = builder.add_source(::config::File::from(path).required(false));
    }
    builder = builder.add_source(
        ::config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let settings: VenueSettings = builder.build()?.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}
