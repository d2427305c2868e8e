use super::AssetRef;
use crate::animation::AnimationClip;
use crate::utils::math::Aabb;
use crate::world::avatar::{Customization, Rgb};
use bitflags::bitflags;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

bitflags! {
    /// What a model part can be recoloured as
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PartTags: u8 {
        const CLOTHING = 1 << 0;
        const SKIN = 1 << 1;
        const HAIR = 1 << 2;
        const EYE = 1 << 3;
    }
}

impl PartTags {
    /// Derive tags from an authored part name. Sources call this once while
    /// loading; customization only ever reads the stored tags.
    pub fn classify(name: &str) -> PartTags {
        let name = name.to_ascii_lowercase();
        let mut tags = PartTags::empty();
        if name.contains("hair") {
            tags |= PartTags::HAIR;
        }
        if name.contains("eye") {
            tags |= PartTags::EYE;
        }
        if ["skin", "body", "face", "head", "hand"].iter().any(|k| name.contains(k)) {
            tags |= PartTags::SKIN;
        }
        if ["cloth", "shirt", "pants", "jacket", "dress", "shoe", "outfit"]
            .iter()
            .any(|k| name.contains(k))
        {
            tags |= PartTags::CLOTHING;
        }
        tags
    }
}

/// Which axis the asset was authored with pointing up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpAxis {
    #[default]
    Y,
    Z,
}

impl UpAxis {
    /// Rotation taking the authored up axis onto +Y
    pub fn to_y_up(self) -> Quat {
        match self {
            UpAxis::Y => Quat::IDENTITY,
            UpAxis::Z => Quat::from_rotation_x(-FRAC_PI_2),
        }
    }
}

/// Object-level transform: `translation + rotation * (scale * p)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: 1.0,
        }
    }
}

impl Transform {
    pub fn apply(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * (point * self.scale)
    }
}

#[derive(Debug, Clone)]
pub struct ModelPart {
    pub name: String,
    pub vertices: Vec<Vec3>,
    pub tags: PartTags,
    pub base_color: Rgb,
}

impl ModelPart {
    /// Part whose tags are derived from its name
    pub fn named(name: impl Into<String>, vertices: Vec<Vec3>) -> Self {
        let name = name.into();
        Self {
            tags: PartTags::classify(&name),
            name,
            vertices,
            base_color: [0.8, 0.8, 0.8],
        }
    }

    pub fn with_tags(mut self, tags: PartTags) -> Self {
        self.tags = tags;
        self
    }
}

/// A model as delivered by an asset source, native scale and orientation
#[derive(Debug, Clone)]
pub struct RawModel {
    pub reference: AssetRef,
    pub up_axis: UpAxis,
    pub parts: Vec<ModelPart>,
    pub clips: Vec<AnimationClip>,
    pub transform: Transform,
}

impl RawModel {
    pub fn new(reference: impl Into<AssetRef>, parts: Vec<ModelPart>) -> Self {
        Self {
            reference: reference.into(),
            up_axis: UpAxis::Y,
            parts,
            clips: Vec::new(),
            transform: Transform::default(),
        }
    }

    pub fn with_up_axis(mut self, up_axis: UpAxis) -> Self {
        self.up_axis = up_axis;
        self
    }

    pub fn with_clips(mut self, clips: Vec<AnimationClip>) -> Self {
        self.clips = clips;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(|p| p.vertices.len()).sum()
    }

    /// Bounds of the geometry in asset space
    pub fn local_bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.parts.iter().flat_map(|p| p.vertices.iter().copied()))
    }

    /// Bounds after the object transform, computed from every vertex
    pub fn world_bounds(&self) -> Option<Aabb> {
        let transform = self.transform;
        Aabb::from_points(
            self.parts
                .iter()
                .flat_map(|p| p.vertices.iter().map(move |v| transform.apply(*v))),
        )
    }
}

/// A model rescaled and lifted onto the floor
#[derive(Debug, Clone)]
pub struct NormalizedModel {
    pub model: RawModel,
    /// Uniform scale baked into the transform
    pub scale: f32,
    /// Vertical translation baked into the transform
    pub vertical_offset: f32,
    /// Fallback geometry shown while loading or after a failure
    pub placeholder: bool,
}

impl NormalizedModel {
    /// Box of the target height standing on the floor, with no clips
    pub fn placeholder(reference: impl Into<AssetRef>, target_height: f32, width: f32) -> Self {
        let h = width * 0.5;
        let corners = Aabb::new(Vec3::new(-h, 0.0, -h), Vec3::new(h, target_height, h)).corners();
        let model = RawModel::new(reference, vec![ModelPart {
            name: "placeholder".to_string(),
            vertices: corners.to_vec(),
            tags: PartTags::empty(),
            base_color: [0.5, 0.5, 0.5],
        }]);
        Self {
            model,
            scale: 1.0,
            vertical_offset: 0.0,
            placeholder: true,
        }
    }

    pub fn reference(&self) -> &AssetRef {
        &self.model.reference
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.model.clips
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.model.world_bounds()
    }
}

/// One avatar's view of a shared normalized model, carrying its own palette
#[derive(Debug, Clone)]
pub struct ModelInstance {
    base: Arc<NormalizedModel>,
    part_colors: Vec<Rgb>,
}

impl ModelInstance {
    pub fn new(base: Arc<NormalizedModel>) -> Self {
        let part_colors = base.model.parts.iter().map(|p| p.base_color).collect();
        Self { base, part_colors }
    }

    pub fn base(&self) -> &Arc<NormalizedModel> {
        &self.base
    }

    pub fn part_colors(&self) -> &[Rgb] {
        &self.part_colors
    }

    /// Recolour tagged parts. Returns how many parts changed colour.
    pub fn apply_customization(&mut self, customization: &Customization) -> usize {
        let slots = [
            (PartTags::SKIN, customization.skin),
            (PartTags::HAIR, customization.hair),
            (PartTags::CLOTHING, customization.clothing),
            (PartTags::EYE, customization.eyes),
        ];

        let mut changed = 0;
        for (part, color) in self.base.model.parts.iter().zip(self.part_colors.iter_mut()) {
            // First matching slot wins for parts carrying several tags
            let wanted = slots.iter().find_map(|(tag, value)| match value {
                Some(value) if part.tags.contains(*tag) => Some(*value),
                _ => None,
            });
            if let Some(value) = wanted {
                if *color != value {
                    *color = value;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Indices of parts carrying a tag
    pub fn parts_tagged(&self, tag: PartTags) -> Vec<usize> {
        self.base
            .model
            .parts
            .iter()
            .enumerate()
            .filter(|(_, p)| p.tags.contains(tag))
            .map(|(i, _)| i)
            .collect()
    }
}
