pub mod clip;
pub mod controller;
pub mod selector;

pub use clip::{AnimationClip, ClipCategory};
pub use controller::{AnimationController, FrameSample, LayerSample};
pub use selector::{select, AnimationState, Selection};
