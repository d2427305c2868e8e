//! Clip selection rules
//!
//! Pure function from (available clips, venue playing flag) to the state the
//! avatar should be in. Reference-pose clips are never returned.

use super::clip::{AnimationClip, ClipCategory};
use std::fmt;

/// Animation states an avatar can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationState {
    Idle,
    Locomotion,
    Dance,
    /// No usable clip; the avatar holds a neutral rest pose
    NoAnimation,
}

impl Default for AnimationState {
    fn default() -> Self {
        AnimationState::NoAnimation
    }
}

impl fmt::Display for AnimationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimationState::Idle => write!(f, "Idle"),
            AnimationState::Locomotion => write!(f, "Locomotion"),
            AnimationState::Dance => write!(f, "Dance"),
            AnimationState::NoAnimation => write!(f, "NoAnimation"),
        }
    }
}

/// Result of a selection: the state and the clip index backing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub state: AnimationState,
    pub clip: Option<usize>,
}

impl Selection {
    pub const NONE: Selection = Selection {
        state: AnimationState::NoAnimation,
        clip: None,
    };
}

fn first_of(clips: &[AnimationClip], category: ClipCategory) -> Option<usize> {
    clips.iter().position(|c| c.category == category)
}

/// Pick the clip to play.
///
/// 1. playing and a dance clip exists: dance
/// 2. an idle clip
/// 3. a locomotion clip
/// 4. the first clip in declaration order that is not a reference pose
/// 5. nothing
pub fn select(clips: &[AnimationClip], playing: bool) -> Selection {
    if playing {
        if let Some(i) = first_of(clips, ClipCategory::Dance) {
            return Selection { state: AnimationState::Dance, clip: Some(i) };
        }
    }
    if let Some(i) = first_of(clips, ClipCategory::Idle) {
        return Selection { state: AnimationState::Idle, clip: Some(i) };
    }
    if let Some(i) = first_of(clips, ClipCategory::Locomotion) {
        return Selection { state: AnimationState::Locomotion, clip: Some(i) };
    }
    match clips.iter().position(|c| !c.is_reference_pose()) {
        Some(i) => {
            // Only Dance (while not playing) or Other can reach this tier
            let state = match clips[i].category {
                ClipCategory::Dance => AnimationState::Dance,
                _ => AnimationState::Idle,
            };
            Selection { state, clip: Some(i) }
        }
        None => Selection::NONE,
    }
}
