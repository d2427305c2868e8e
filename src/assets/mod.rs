//! Avatar model assets
//!
//! Raw models come from an [`AssetSource`], get normalized to the canonical
//! avatar footprint by the [`ModelNormalizer`] and are shared between every
//! avatar that uses the same asset.

pub mod cache;
pub mod collada;
pub mod model;
pub mod normalizer;
pub mod source;

pub use cache::{CacheStats, ModelCache};
pub use collada::DirectoryAssetSource;
pub use model::{ModelInstance, ModelPart, NormalizedModel, PartTags, RawModel, Transform, UpAxis};
pub use normalizer::ModelNormalizer;
pub use source::MemoryAssetSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier of a loadable model asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(pub String);

impl AssetRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AssetRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Error)]
pub enum AssetError {
    #[error("Asset not found: {reference}")]
    NotFound { reference: AssetRef },

    #[error("Failed to read asset {reference}: {reason}")]
    Io { reference: AssetRef, reason: String },

    #[error("Failed to parse asset {reference}: {reason}")]
    Parse { reference: AssetRef, reason: String },

    #[error("Asset {reference} has no geometry")]
    EmptyGeometry { reference: AssetRef },

    #[error("Asset {reference} has a degenerate bounding box (height {height})")]
    DegenerateBounds { reference: AssetRef, height: f32 },
}

pub type AssetResult<T> = Result<T, AssetError>;

/// Fetch-by-identifier for raw model data
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn load_asset(&self, reference: &AssetRef) -> AssetResult<RawModel>;

    /// Get source name for debugging
    fn name(&self) -> &'static str;
}
