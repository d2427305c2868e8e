//! Model normalization
//!
//! Assets arrive at whatever scale and up axis their author used. The
//! normalizer rescales each one to the canonical avatar height and lifts it so
//! its lowest point rests on the floor. Only the object transform changes;
//! vertex data is left untouched so the operation stays cheap and reversible.

use super::cache::{CacheStats, ModelCache};
use super::model::{NormalizedModel, RawModel};
use super::{AssetError, AssetRef, AssetResult, AssetSource};
use crate::config::settings::ModelSettings;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Heights below this are treated as degenerate
const MIN_MEASURED_HEIGHT: f32 = 1e-6;

/// Rescale and lift a raw model onto the floor.
///
/// Applying this to an already normalized model (same target) changes nothing
/// beyond floating-point noise.
pub fn normalize(mut model: RawModel, target_height: f32) -> AssetResult<NormalizedModel> {
    if model.vertex_count() == 0 {
        return Err(AssetError::EmptyGeometry { reference: model.reference.clone() });
    }

    model.transform.rotation = model.up_axis.to_y_up();

    let bounds = model
        .world_bounds()
        .ok_or_else(|| AssetError::EmptyGeometry { reference: model.reference.clone() })?;
    let measured_height = bounds.height();
    if !(measured_height.is_finite() && measured_height > MIN_MEASURED_HEIGHT) {
        return Err(AssetError::DegenerateBounds {
            reference: model.reference.clone(),
            height: measured_height,
        });
    }

    let factor = target_height / measured_height;
    model.transform.scale *= factor;

    let scaled = model
        .world_bounds()
        .ok_or_else(|| AssetError::EmptyGeometry { reference: model.reference.clone() })?;
    model.transform.translation.y -= scaled.min.y;

    debug!(
        "📐 Normalized {}: {} measured {:.4} -> scale {:.6}, lift {:.4}",
        model.reference, bounds, measured_height, model.transform.scale, model.transform.translation.y
    );

    Ok(NormalizedModel {
        scale: model.transform.scale,
        vertical_offset: model.transform.translation.y,
        model,
        placeholder: false,
    })
}

/// Loads, normalizes and caches avatar models
pub struct ModelNormalizer {
    source: Arc<dyn AssetSource>,
    cache: ModelCache<AssetRef, Arc<NormalizedModel>>,
    settings: ModelSettings,
}

impl std::fmt::Debug for ModelNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelNormalizer")
            .field("source", &self.source.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl ModelNormalizer {
    pub fn new(source: Arc<dyn AssetSource>, settings: ModelSettings) -> Self {
        info!(
            "🎨 Initializing ModelNormalizer over {} (target height {})",
            source.name(),
            settings.target_height
        );
        Self {
            source,
            cache: ModelCache::new(),
            settings,
        }
    }

    pub fn target_height(&self) -> f32 {
        self.settings.target_height
    }

    /// Load and normalize an asset, once per identifier
    pub async fn load(&self, reference: &AssetRef) -> AssetResult<Arc<NormalizedModel>> {
        let target = self.settings.target_height;
        self.cache
            .get_or_try_load(reference, || async {
                let raw = self.source.load_asset(reference).await?;
                let normalized = normalize(raw, target)?;
                info!(
                    "🎨 Model {} ready ({} clips, scale {:.6})",
                    reference,
                    normalized.clips().len(),
                    normalized.scale
                );
                Ok(Arc::new(normalized))
            })
            .await
    }

    /// Load an asset, falling back to the placeholder box on any failure.
    /// The error is handed back so the caller can decide whether to retry.
    pub async fn load_or_placeholder(
        &self,
        reference: &AssetRef,
    ) -> (Arc<NormalizedModel>, Option<AssetError>) {
        match self.load(reference).await {
            Ok(model) => (model, None),
            Err(e) => {
                warn!("🎨 Using placeholder for {}: {}", reference, e);
                (self.placeholder(reference), Some(e))
            }
        }
    }

    /// Placeholder shown while a model loads or after it failed
    pub fn placeholder(&self, reference: &AssetRef) -> Arc<NormalizedModel> {
        Arc::new(NormalizedModel::placeholder(
            reference.clone(),
            self.settings.target_height,
            self.settings.placeholder_width,
        ))
    }

    /// Cached model, if already loaded
    pub async fn cached(&self, reference: &AssetRef) -> Option<Arc<NormalizedModel>> {
        self.cache.get(reference).await
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}
