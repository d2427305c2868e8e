use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClipCategory {
    Idle,
    Locomotion,
    Dance,
    /// The asset's bind/T-pose. Never shown as a live animation.
    ReferencePose,
    Other,
}

impl ClipCategory {
    /// Categorize a clip by its authored name. Used once at load time when the
    /// asset does not declare categories itself. Only whole name words count,
    /// so "Forest_Walk" is locomotion and "Handstand" is nothing in particular.
    pub fn classify(name: &str) -> ClipCategory {
        let words = name_words(name);
        let has = |keys: &[&str]| words.iter().any(|w| keys.contains(&w.as_str()));
        let posed = words
            .windows(2)
            .any(|pair| pair[1] == "pose" && ["t", "a", "bind", "ref", "rest"].contains(&pair[0].as_str()));

        if posed || has(&["tpose", "apose", "bindpose", "refpose", "restpose", "reference"]) {
            ClipCategory::ReferencePose
        } else if has(&["dance", "dancing", "groove"]) {
            ClipCategory::Dance
        } else if has(&["idle", "breath", "breathing", "stand", "standing"]) {
            ClipCategory::Idle
        } else if has(&["walk", "walking", "run", "running", "jog", "locomotion", "strafe"]) {
            ClipCategory::Locomotion
        } else {
            ClipCategory::Other
        }
    }
}

/// Lowercase words of a clip name, split on punctuation, digits and case changes
fn name_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut word = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphabetic() {
            if !word.is_empty() {
                words.push(std::mem::take(&mut word));
            }
            continue;
        }
        if c.is_uppercase() && !word.is_empty() {
            let prev_lower = chars[i - 1].is_lowercase();
            // "TPose" splits as T + Pose
            let acronym_end = chars[i - 1].is_uppercase() && chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev_lower || acronym_end {
                words.push(std::mem::take(&mut word));
            }
        }
        word.extend(c.to_lowercase());
    }
    if !word.is_empty() {
        words.push(word);
    }
    words
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds
    pub duration: f32,
    pub category: ClipCategory,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration: f32, category: ClipCategory) -> Self {
        Self {
            name: name.into(),
            duration,
            category,
        }
    }

    /// Clip whose category comes from its name
    pub fn classified(name: impl Into<String>, duration: f32) -> Self {
        let name = name.into();
        let category = ClipCategory::classify(&name);
        Self::new(name, duration, category)
    }

    pub fn is_reference_pose(&self) -> bool {
        self.category == ClipCategory::ReferencePose
    }

    /// Wrap a playback time into the clip; zero-length clips hold at 0
    pub fn wrap_time(&self, time: f32) -> f32 {
        if self.duration > 0.0 && self.duration.is_finite() {
            time.rem_euclid(self.duration)
        } else {
            0.0
        }
    }
}
