//! COLLADA assets on disk
//!
//! `<root>/<id>.dae` holds the geometry. An optional `<id>.clips.json` next to
//! it lists the animation clips, since clip names and durations are not
//! reliably recoverable from exported documents.

use super::model::{ModelPart, PartTags, RawModel, UpAxis};
use super::{AssetError, AssetRef, AssetResult, AssetSource};
use crate::animation::{AnimationClip, ClipCategory};
use async_trait::async_trait;
use collada::document::ColladaDocument;
use glam::Vec3;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct ClipEntry {
    name: String,
    duration: f32,
    #[serde(default)]
    category: Option<ClipCategory>,
}

#[derive(Debug, Clone)]
pub struct DirectoryAssetSource {
    root: PathBuf,
}

impl DirectoryAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, reference: &AssetRef, extension: &str) -> AssetResult<PathBuf> {
        let id = reference.as_str();
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(AssetError::NotFound { reference: reference.clone() });
        }
        Ok(self.root.join(format!("{}.{}", id, extension)))
    }

    async fn read_clips(&self, reference: &AssetRef) -> AssetResult<Vec<AnimationClip>> {
        let path = self.path_for(reference, "clips.json")?;
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("📦 No clip manifest for {}", reference);
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(AssetError::Io {
                    reference: reference.clone(),
                    reason: e.to_string(),
                })
            }
        };
        parse_clip_manifest(reference, &text)
    }
}

fn parse_clip_manifest(reference: &AssetRef, text: &str) -> AssetResult<Vec<AnimationClip>> {
    let entries: Vec<ClipEntry> = serde_json::from_str(text).map_err(|e| AssetError::Parse {
        reference: reference.clone(),
        reason: format!("clip manifest: {}", e),
    })?;
    Ok(entries
        .into_iter()
        .map(|entry| match entry.category {
            Some(category) => AnimationClip::new(entry.name, entry.duration, category),
            None => AnimationClip::classified(entry.name, entry.duration),
        })
        .collect())
}

/// Read `asset/up_axis`. Missing or unrecognised values mean Y-up.
fn detect_up_axis(document: &ColladaDocument) -> UpAxis {
    let root = &document.root_element;
    let ns = root.ns.as_deref();
    let axis = root
        .get_child("asset", ns)
        .and_then(|asset| asset.get_child("up_axis", ns))
        .map(|element| element.content_str());
    match axis.as_deref().map(str::trim) {
        Some(value) if value.eq_ignore_ascii_case("Z_UP") => UpAxis::Z,
        _ => UpAxis::Y,
    }
}

/// Parse a COLLADA document into model parts, one per geometry object
fn parse_document(reference: &AssetRef, text: &str) -> AssetResult<RawModel> {
    let document = ColladaDocument::from_str(text).map_err(|e| AssetError::Parse {
        reference: reference.clone(),
        reason: e.to_string(),
    })?;
    let objects = document.get_obj_set().ok_or_else(|| AssetError::Parse {
        reference: reference.clone(),
        reason: "document has no geometry library".to_string(),
    })?;

    let parts: Vec<ModelPart> = objects
        .objects
        .iter()
        .map(|object| {
            let name = if object.name.is_empty() { &object.id } else { &object.name };
            let vertices = object
                .vertices
                .iter()
                .map(|v| Vec3::new(v.x as f32, v.y as f32, v.z as f32))
                .collect();
            ModelPart::named(name.clone(), vertices)
        })
        .collect();

    let untagged = parts.iter().filter(|p| p.tags == PartTags::empty()).count();
    if untagged > 0 {
        debug!("📦 {} has {} parts without customization tags", reference, untagged);
    }

    Ok(RawModel::new(reference.clone(), parts).with_up_axis(detect_up_axis(&document)))
}

#[async_trait]
impl AssetSource for DirectoryAssetSource {
    async fn load_asset(&self, reference: &AssetRef) -> AssetResult<RawModel> {
        let path = self.path_for(reference, "dae")?;
        info!("📦 Loading {} from {}", reference, path.display());

        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound { reference: reference.clone() }
            } else {
                AssetError::Io {
                    reference: reference.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        // XML parsing is CPU bound
        let parse_ref = reference.clone();
        let model = tokio::task::spawn_blocking(move || parse_document(&parse_ref, &text))
            .await
            .map_err(|e| AssetError::Io {
                reference: reference.clone(),
                reason: format!("parse task failed: {}", e),
            })??;

        let clips = self.read_clips(reference).await?;
        if clips.is_empty() {
            warn!("📦 {} has no animation clips", reference);
        }
        Ok(model.with_clips(clips))
    }

    fn name(&self) -> &'static str {
        "DirectoryAssetSource"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_manifest_categories() {
        let reference = AssetRef::new("robot");
        let clips = parse_clip_manifest(
            &reference,
            r#"[
                {"name": "TPose", "duration": 1.0},
                {"name": "Idle_01", "duration": 2.0},
                {"name": "Groove", "duration": 3.0, "category": "Dance"}
            ]"#,
        )
        .unwrap();
        assert_eq!(clips.len(), 3);
        assert!(clips[0].is_reference_pose());
        assert_eq!(clips[1].category, ClipCategory::Idle);
        assert_eq!(clips[2].category, ClipCategory::Dance);

        let broken = parse_clip_manifest(&reference, "{not json");
        assert!(matches!(broken, Err(AssetError::Parse { .. })));
    }

    fn up_axis_of(asset: &str) -> UpAxis {
        let text = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">{}</COLLADA>"#,
            asset
        );
        detect_up_axis(&ColladaDocument::from_str(&text).unwrap())
    }

    #[test]
    fn test_up_axis_detection() {
        assert_eq!(up_axis_of("<asset><up_axis>Z_UP</up_axis></asset>"), UpAxis::Z);
        assert_eq!(up_axis_of("<asset><up_axis>Y_UP</up_axis></asset>"), UpAxis::Y);
        assert_eq!(up_axis_of("<asset></asset>"), UpAxis::Y);
        assert_eq!(up_axis_of(""), UpAxis::Y);
    }

    #[test]
    fn test_up_axis_tolerates_whitespace() {
        let asset = "<asset>\n  <unit meter=\"0.01\"/>\n  <up_axis>\n    Z_UP\n  </up_axis>\n</asset>";
        assert_eq!(up_axis_of(asset), UpAxis::Z);
    }

    #[tokio::test]
    async fn test_missing_file_and_bad_ids() {
        let source = DirectoryAssetSource::new(std::env::temp_dir().join("venue-rust-no-such-dir"));
        let missing = source.load_asset(&AssetRef::new("robot")).await;
        assert!(matches!(missing, Err(AssetError::NotFound { .. })));

        let escape = source.load_asset(&AssetRef::new("../etc/passwd")).await;
        assert!(matches!(escape, Err(AssetError::NotFound { .. })));
    }
}
