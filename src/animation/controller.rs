//! Per-avatar animation playback
//!
//! Wraps [`select`] with playback state: which clip is active, which clips are
//! still fading out, and how far the current crossfade has progressed. Time
//! only moves when the render loop calls [`AnimationController::tick`].

use super::clip::AnimationClip;
use super::selector::{select, AnimationState, Selection};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Layer {
    clip: usize,
    time: f32,
    weight: f32,
    /// Weight when the current crossfade started
    from_weight: f32,
}

/// One clip to evaluate this frame
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSample {
    pub clip: usize,
    pub name: String,
    pub time: f32,
    pub weight: f32,
}

/// Everything the renderer needs to pose an avatar for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSample {
    pub state: AnimationState,
    /// Empty means the neutral rest pose
    pub layers: Vec<LayerSample>,
}

impl FrameSample {
    pub fn is_rest_pose(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn total_weight(&self) -> f32 {
        self.layers.iter().map(|l| l.weight).sum()
    }
}

#[derive(Debug, Clone)]
pub struct AnimationController {
    clips: Vec<AnimationClip>,
    crossfade: f32,
    playing: bool,
    state: AnimationState,
    active: Option<Layer>,
    fading: Vec<Layer>,
    fade_elapsed: f32,
    /// False until the first selection for the current clip set
    started: bool,
    transitions: u64,
}

impl AnimationController {
    pub fn new(crossfade_seconds: f32) -> Self {
        Self {
            clips: Vec::new(),
            crossfade: crossfade_seconds.max(0.0),
            playing: false,
            state: AnimationState::NoAnimation,
            active: None,
            fading: Vec::new(),
            fade_elapsed: 0.0,
            started: false,
            transitions: 0,
        }
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    /// Clip currently fading in or fully active
    pub fn current_clip(&self) -> Option<&AnimationClip> {
        self.active.and_then(|layer| self.clips.get(layer.clip))
    }

    pub fn is_transitioning(&self) -> bool {
        !self.fading.is_empty()
            || self.active.map(|l| l.weight < 1.0).unwrap_or(false)
    }

    /// Number of crossfades started since creation
    pub fn transition_count(&self) -> u64 {
        self.transitions
    }

    /// Replace the clip set. This is treated as a freshly loaded model: the
    /// first selection on it snaps to full weight with no fade.
    pub fn set_clips(&mut self, clips: Vec<AnimationClip>) {
        self.clips = clips;
        self.active = None;
        self.fading.clear();
        self.fade_elapsed = 0.0;
        self.started = false;
        self.reselect();
    }

    /// Follow the venue's shared playing flag
    pub fn set_playing(&mut self, playing: bool) {
        if self.playing != playing {
            self.playing = playing;
            self.reselect();
        }
    }

    /// Re-evaluate the selection rules and start a transition if needed
    pub fn reselect(&mut self) {
        let Selection { state, clip } = select(&self.clips, self.playing);

        if !self.started {
            self.started = true;
            self.state = state;
            self.active = clip.map(|clip| Layer {
                clip,
                time: 0.0,
                weight: 1.0,
                from_weight: 1.0,
            });
            debug!("🎞️ Initial animation state {} (clip {:?})", state, clip);
            return;
        }

        self.state = state;
        if self.active.map(|l| l.clip) == clip {
            return;
        }

        // Everything currently visible fades out from where it is now
        for layer in &mut self.fading {
            layer.from_weight = layer.weight;
        }
        if let Some(mut previous) = self.active.take() {
            previous.from_weight = previous.weight;
            self.fading.push(previous);
        }

        self.active = clip.map(|clip| {
            match self.fading.iter().position(|l| l.clip == clip) {
                // Coming back to a clip that is still fading out: resume it
                Some(i) => {
                    let mut layer = self.fading.remove(i);
                    layer.from_weight = layer.weight;
                    layer
                }
                None => Layer {
                    clip,
                    time: 0.0,
                    weight: 0.0,
                    from_weight: 0.0,
                },
            }
        });

        self.fade_elapsed = 0.0;
        self.transitions += 1;
        debug!("🎞️ Crossfading to {} (clip {:?})", state, clip);

        if self.crossfade <= 0.0 {
            self.apply_fade(1.0);
        }
    }

    fn apply_fade(&mut self, progress: f32) {
        if let Some(active) = &mut self.active {
            active.weight = if progress >= 1.0 {
                1.0
            } else {
                active.from_weight + (1.0 - active.from_weight) * progress
            };
        }
        for layer in &mut self.fading {
            layer.weight = layer.from_weight * (1.0 - progress);
        }
        if progress >= 1.0 {
            self.fading.clear();
        } else {
            self.fading.retain(|l| l.weight > 0.0);
        }
    }

    /// Advance playback by one rendered frame and report what to evaluate
    pub fn tick(&mut self, dt: f32) -> FrameSample {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };

        let clips = &self.clips;
        for layer in self.active.iter_mut().chain(self.fading.iter_mut()) {
            if let Some(clip) = clips.get(layer.clip) {
                layer.time = clip.wrap_time(layer.time + dt);
            }
        }

        if self.is_transitioning() {
            self.fade_elapsed += dt;
            let progress = if self.crossfade > 0.0 {
                (self.fade_elapsed / self.crossfade).min(1.0)
            } else {
                1.0
            };
            self.apply_fade(progress);
        }

        self.sample()
    }

    /// Current pose description without advancing time
    pub fn sample(&self) -> FrameSample {
        let layers = self
            .active
            .iter()
            .chain(self.fading.iter())
            .filter_map(|layer| {
                self.clips.get(layer.clip).map(|clip| LayerSample {
                    clip: layer.clip,
                    name: clip.name.clone(),
                    time: layer.time,
                    weight: layer.weight,
                })
            })
            .collect();

        FrameSample {
            state: self.state,
            layers,
        }
    }
}
