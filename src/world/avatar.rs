use crate::assets::AssetRef;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Linear RGB colour, components in `[0, 1]`
pub type Rgb = [f32; 3];

/// Palette overrides chosen by the owning visitor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customization {
    pub skin: Option<Rgb>,
    pub hair: Option<Rgb>,
    pub clothing: Option<Rgb>,
    pub eyes: Option<Rgb>,
}

impl Customization {
    pub fn is_empty(&self) -> bool {
        self.skin.is_none() && self.hair.is_none() && self.clothing.is_none() && self.eyes.is_none()
    }
}

/// Which asset an avatar is rendered with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRef {
    pub asset: AssetRef,
    #[serde(default)]
    pub customization: Option<Customization>,
}

impl ModelRef {
    pub fn new(asset: impl Into<AssetRef>) -> Self {
        Self {
            asset: asset.into(),
            customization: None,
        }
    }

    pub fn with_customization(mut self, customization: Customization) -> Self {
        self.customization = Some(customization);
        self
    }
}

/// A visitor's avatar as shared through presence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    pub id: Uuid,
    pub name: String,
    /// Session that owns the avatar; only it may move or customize
    pub owner: Uuid,
    /// Cell-centre world position, `None` until first placement
    pub position: Option<Vec3>,
    pub model: ModelRef,
    /// Milliseconds since the UNIX epoch
    pub created_at: u64,
}

impl Avatar {
    pub fn new(id: Uuid, owner: Uuid, name: impl Into<String>, model: ModelRef) -> Self {
        Self {
            id,
            name: name.into(),
            owner,
            position: None,
            model,
            created_at: now_millis(),
        }
    }

    pub fn with_created_at(mut self, created_at: u64) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    /// Cell precedence: earlier creation wins, then the smaller id
    pub fn precedence(&self, other: &Avatar) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Merge a partial update into this record
    pub fn apply_patch(&mut self, patch: &AvatarPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(position) = patch.position {
            self.position = Some(position);
        }
        if let Some(model) = &patch.model {
            self.model = model.clone();
        }
        if let Some(customization) = &patch.customization {
            self.model.customization = Some(customization.clone());
        }
    }
}

/// Partial avatar update published through presence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvatarPatch {
    pub name: Option<String>,
    pub position: Option<Vec3>,
    pub model: Option<ModelRef>,
    pub customization: Option<Customization>,
}

impl AvatarPatch {
    pub fn position(position: Vec3) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn customization(customization: Customization) -> Self {
        Self {
            customization: Some(customization),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.position.is_none()
            && self.model.is_none()
            && self.customization.is_none()
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
