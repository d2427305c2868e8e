use super::model::{ModelPart, RawModel};
use super::{AssetError, AssetRef, AssetResult, AssetSource};
use crate::animation::AnimationClip;
use async_trait::async_trait;
use glam::Vec3;
use std::collections::HashMap;
use tracing::debug;

/// Asset source backed by models held in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryAssetSource {
    models: HashMap<AssetRef, RawModel>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, model: RawModel) {
        self.models.insert(model.reference.clone(), model);
    }

    pub fn with_model(mut self, model: RawModel) -> Self {
        self.insert(model);
        self
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[async_trait]
impl AssetSource for MemoryAssetSource {
    async fn load_asset(&self, reference: &AssetRef) -> AssetResult<RawModel> {
        debug!("📦 Loading {} from memory", reference);
        self.models
            .get(reference)
            .cloned()
            .ok_or_else(|| AssetError::NotFound { reference: reference.clone() })
    }

    fn name(&self) -> &'static str {
        "MemoryAssetSource"
    }
}

fn cuboid(min: Vec3, max: Vec3) -> Vec<Vec3> {
    crate::utils::Aabb::new(min, max).corners().to_vec()
}

/// Blocky humanoid standing from y = 0 to `height` in asset units, with a
/// reference pose plus idle and dance clips. Used by the simulator and tests.
pub fn mannequin(reference: impl Into<AssetRef>, height: f32) -> RawModel {
    let u = height / 8.0;
    let parts = vec![
        ModelPart::named("Body", cuboid(Vec3::new(-u, 3.0 * u, -0.5 * u), Vec3::new(u, 6.0 * u, 0.5 * u))),
        ModelPart::named("Head", cuboid(Vec3::new(-0.5 * u, 6.0 * u, -0.5 * u), Vec3::new(0.5 * u, 7.5 * u, 0.5 * u))),
        ModelPart::named("Hair", cuboid(Vec3::new(-0.55 * u, 7.2 * u, -0.55 * u), Vec3::new(0.55 * u, height, 0.55 * u))),
        ModelPart::named("Eyes", cuboid(Vec3::new(-0.3 * u, 6.8 * u, 0.5 * u), Vec3::new(0.3 * u, 7.0 * u, 0.55 * u))),
        ModelPart::named("Shirt", cuboid(Vec3::new(-1.05 * u, 4.0 * u, -0.55 * u), Vec3::new(1.05 * u, 6.0 * u, 0.55 * u))),
        ModelPart::named("Pants", cuboid(Vec3::new(-0.9 * u, 0.0, -0.5 * u), Vec3::new(0.9 * u, 4.0 * u, 0.5 * u))),
    ];
    RawModel::new(reference, parts).with_clips(vec![
        AnimationClip::classified("TPose", 1.0),
        AnimationClip::classified("Idle_01", 2.0),
        AnimationClip::classified("Dance_Shuffle", 4.0),
    ])
}
