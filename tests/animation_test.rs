use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use venue_rust::animation::{AnimationClip, AnimationController, AnimationState};

fn clips() -> Vec<AnimationClip> {
    vec![
        AnimationClip::classified("TPose", 1.0),
        AnimationClip::classified("BindPose", 1.0),
        AnimationClip::classified("Idle_01", 2.0),
        AnimationClip::classified("Walk_Cycle", 1.2),
        AnimationClip::classified("Dance_01", 3.5),
    ]
}

#[test]
fn test_tpose_never_played_first_frame() {
    let mut controller = AnimationController::new(0.3);
    controller.set_clips(vec![AnimationClip::classified("TPose", 1.0), AnimationClip::classified("Idle_01", 2.0)]);
    let frame = controller.tick(1.0 / 60.0);
    assert_eq!(frame.state, AnimationState::Idle);
    assert_eq!(frame.layers.len(), 1);
    assert_eq!(frame.layers[0].name, "Idle_01");
    assert_eq!(frame.layers[0].weight, 1.0);
}

/// Random playing toggles and frame deltas never surface a reference pose,
/// and the blended weights always add up to one.
#[test]
fn test_random_toggles_never_reference_pose() {
    for seed in 0..16u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut controller = AnimationController::new(rng.random_range(0.0..0.6));
        controller.set_clips(clips());

        for _ in 0..400 {
            if rng.random_bool(0.1) {
                controller.set_playing(!controller.is_playing());
            }
            let frame = controller.tick(rng.random_range(0.0..0.05));
            assert!(!frame.is_rest_pose());
            for layer in &frame.layers {
                assert!(!controller.clips()[layer.clip].is_reference_pose(), "played {}", layer.name);
                assert!(layer.weight >= 0.0 && layer.weight <= 1.0 + 1e-5);
            }
            assert!((frame.total_weight() - 1.0).abs() < 1e-4, "weights {:?}", frame.layers);
        }
    }
}

#[test]
fn test_only_reference_poses_rest() {
    let mut controller = AnimationController::new(0.3);
    controller.set_clips(vec![AnimationClip::classified("TPose", 1.0), AnimationClip::classified("A-Pose", 1.0)]);
    controller.set_playing(true);
    let frame = controller.tick(0.1);
    assert_eq!(frame.state, AnimationState::NoAnimation);
    assert!(frame.is_rest_pose());
}
