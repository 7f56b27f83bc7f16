//! Animation Layer System Tests
//!
//! Tests for:
//! - Two-phase update: one evaluation per skeleton per frame
//! - Dirty tracking and idempotent zero-delta frames
//! - Mask affinity, mapping fallback and rebuilds
//! - Procedural overrides, transform components and skin palettes
//! - Registry management, reset and scrubbing
//! - Introspection

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use glam::{Mat4, Quat, Vec3};

use gimbal::animation::channel::{
    BinaryAnimationChannel, BinaryState, ContinuousAnimationChannel, ProceduralAnimationChannel,
    ProceduralJointConfig,
};
use gimbal::animation::clip::{AnimationClip, JointTrack};
use gimbal::animation::layer::{AnimationLayer, ChannelGroup};
use gimbal::animation::mask::AnimationMask;
use gimbal::animation::model::{AnimatedModel, ModelMesh, SkeletonKey};
use gimbal::animation::skeleton::{JointSelection, Skeleton};
use gimbal::animation::skin::Skin;
use gimbal::animation::system::{AnimationLayerSystem, LayerSystemSettings};
use gimbal::animation::tracks::{InterpolationMode, KeyframeTrack};
use gimbal::animation::transform_component::TransformComponent;

const EPSILON: f32 = 1e-5;

const JOINTS: [&str; 4] = ["/jet", "/jet/gear", "/jet/gear/strut", "/jet/flap"];
const GEAR: usize = 1;
const STRUT: usize = 2;
const FLAP: usize = 3;

const BODY: usize = 0;
const DOOR: usize = 1;
const POD: usize = 2;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn mat_approx(a: Mat4, b: Mat4) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn airframe() -> Skeleton {
    let n = JOINTS.len();
    Skeleton::from_joint_paths(&JOINTS, vec![Mat4::IDENTITY; n], vec![Mat4::IDENTITY; n], None)
        .unwrap()
}

fn gear_clip() -> AnimationClip {
    AnimationClip::new("gear_down")
        .with_joint_track(
            "/jet/gear",
            JointTrack::default().with_rotation(
                KeyframeTrack::new(
                    vec![0.0, 3.0],
                    vec![Quat::IDENTITY, Quat::from_rotation_x(FRAC_PI_2)],
                    InterpolationMode::Linear,
                )
                .unwrap(),
            ),
        )
        .with_joint_track(
            "/jet/gear/strut",
            JointTrack::default().with_translation(
                KeyframeTrack::new(
                    vec![0.0, 3.0],
                    vec![Vec3::ZERO, Vec3::NEG_Y],
                    InterpolationMode::Linear,
                )
                .unwrap(),
            ),
        )
}

/// One skeleton, a bound skinned body, a door animated by its own transform
/// component and an unbound skinned pod that falls back to the only skeleton.
fn jet() -> (AnimatedModel, SkeletonKey) {
    let mut model = AnimatedModel::new();
    let skeleton = model.add_skeleton("airframe", airframe());

    let body = model.add_mesh(ModelMesh::new("body").with_skin(Skin::new(&JOINTS)));
    model.bind_mesh_to_skeleton(body, skeleton);
    model.add_mesh(
        ModelMesh::new("door").with_transform(
            TransformComponent::from_fn(
                1.0,
                |t| Mat4::from_translation(Vec3::new(t, 0.0, 0.0)),
                None,
            )
            .unwrap(),
        ),
    );
    model.add_mesh(ModelMesh::new("pod").with_skin(Skin::new(&["/jet/flap"])));

    model.add_clip(gear_clip());
    (model, skeleton)
}

fn gear_layer() -> AnimationLayer {
    AnimationLayer::new("gear")
        .with_channel(BinaryAnimationChannel::new(
            "gear_bay",
            AnimationMask::from_joints(["/jet/gear"]),
            3.0,
        ))
        .with_channel(BinaryAnimationChannel::new(
            "strut",
            AnimationMask::from_joints(["/jet/gear/strut"]),
            3.0,
        ))
}

fn flap_channel() -> ProceduralAnimationChannel {
    ProceduralAnimationChannel::new(
        "flap",
        AnimationMask::from_joints(["/jet/flap"]),
        vec![ProceduralJointConfig::new("/jet/flap", Vec3::X, FRAC_PI_4)],
    )
}

fn evaluations(model: &AnimatedModel, skeleton: SkeletonKey) -> u64 {
    model.skeleton(skeleton).unwrap().evaluation_count()
}

// ============================================================================
// Two-Phase Update
// ============================================================================

#[test]
fn two_channels_one_evaluation_per_frame() {
    init_logger();
    let (mut model, skeleton) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_layer(&model, gear_layer());

    // Channels start dirty, so the first frame poses the model
    system.update(&mut model, 0.0);
    assert_eq!(evaluations(&model, skeleton), 1);

    system.binary_channel_mut("gear_bay").unwrap().activate();
    system.binary_channel_mut("strut").unwrap().activate();
    system.update(&mut model, 1.5);
    assert_eq!(evaluations(&model, skeleton), 2);

    let poses = model.skeleton(skeleton).unwrap().local_poses();
    assert!(mat_approx(poses[GEAR], Mat4::from_rotation_x(FRAC_PI_4)));
    assert!(mat_approx(
        poses[STRUT],
        Mat4::from_translation(Vec3::new(0.0, -0.5, 0.0))
    ));
}

#[test]
fn stable_channels_do_not_evaluate() {
    let (mut model, skeleton) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_layer(&model, gear_layer());

    system.update(&mut model, 0.016);
    for _ in 0..10 {
        system.update(&mut model, 0.016);
    }
    assert_eq!(evaluations(&model, skeleton), 1);
}

#[test]
fn zero_delta_after_force_update_changes_nothing() {
    let (mut model, skeleton) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_layer(&model, gear_layer());
    system.register_channel(&model, flap_channel().with_initial_value(0.5));

    system.force_update_all_poses(&mut model);
    assert!(!system.has_dirty_channels());

    let pose = model.skeleton(skeleton).unwrap().current_pose().to_vec();
    let palette = model.mesh(BODY).unwrap().skin.as_ref().unwrap().palette().to_vec();
    let palette_updates = model.mesh(BODY).unwrap().skin.as_ref().unwrap().update_count();
    let count = evaluations(&model, skeleton);

    system.update(&mut model, 0.0);

    assert!(!system.has_dirty_channels());
    assert_eq!(evaluations(&model, skeleton), count);
    assert_eq!(model.skeleton(skeleton).unwrap().current_pose(), pose.as_slice());
    let skin = model.mesh(BODY).unwrap().skin.as_ref().unwrap();
    assert_eq!(skin.palette(), palette.as_slice());
    assert_eq!(skin.update_count(), palette_updates);
}

#[test]
fn later_channel_wins_on_shared_joint() {
    let (mut model, skeleton) = jet();
    let mut system = AnimationLayerSystem::new(&model);

    let mask = AnimationMask::from_joints(["/jet/gear"]);
    system.register_layer(
        &model,
        AnimationLayer::new("deployed").with_channel(
            BinaryAnimationChannel::new("down", mask.clone(), 3.0)
                .with_initial_state(BinaryState::Active),
        ),
    );
    system.register_layer(
        &model,
        AnimationLayer::new("stowed")
            .with_channel(BinaryAnimationChannel::new("up", mask, 3.0)),
    );

    system.update(&mut model, 0.0);
    let gear = model.skeleton(skeleton).unwrap().local_poses()[GEAR];
    assert!(mat_approx(gear, Mat4::IDENTITY), "Expected the stowed pose, got {gear:?}");
}

// ============================================================================
// Procedural Channels
// ============================================================================

#[test]
fn procedural_channel_overrides_flap() {
    let (mut model, skeleton) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_channel(&model, flap_channel().with_initial_value(1.0));

    system.force_update_all_poses(&mut model);

    let skeleton = model.skeleton(skeleton).unwrap();
    let expected = skeleton.rest_transforms()[FLAP] * Mat4::from_rotation_x(FRAC_PI_4);
    assert!(mat_approx(skeleton.local_poses()[FLAP], expected));
    assert!(mat_approx(skeleton.current_pose()[FLAP], expected));

    // Unbound pod follows the only skeleton
    let pod = model.mesh(POD).unwrap().skin.as_ref().unwrap();
    assert!(mat_approx(pod.palette()[0], expected));
}

#[test]
fn procedural_channel_moves_over_frames() {
    let (mut model, skeleton) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_channel(&model, flap_channel().with_transition_speed(1.0));
    system.update(&mut model, 0.0);

    system.procedural_channel_mut("flap").unwrap().set_value(1.0);
    system.update(&mut model, 0.5);

    let local = model.skeleton(skeleton).unwrap().local_poses()[FLAP];
    assert!(mat_approx(local, Mat4::from_rotation_x(0.5 * FRAC_PI_4)));
    assert_eq!(evaluations(&model, skeleton), 2);
}

// ============================================================================
// Meshes
// ============================================================================

#[test]
fn transform_component_follows_channel_time() {
    let (mut model, _) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_channel(
        &model,
        BinaryAnimationChannel::new("door", AnimationMask::from_meshes([DOOR]), 1.0)
            .with_time_range(0.0, 0.5),
    );

    system.set_channel_value("door", 1.0);
    system.update(&mut model, 0.0);

    let door = model.mesh(DOOR).unwrap().transform.as_ref().unwrap();
    assert!((door.current_transform().w_axis.x - 0.5).abs() < 1e-4);
}

#[test]
fn skin_palette_matches_evaluated_pose() {
    let (mut model, skeleton) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_layer(&model, gear_layer());
    system.set_channel_value("gear_bay", 1.0);
    system.update(&mut model, 0.0);

    let pose = model.skeleton(skeleton).unwrap().current_pose().to_vec();
    let skin = model.mesh(BODY).unwrap().skin.as_ref().unwrap();
    assert_eq!(skin.palette(), pose.as_slice());
    assert!(mat_approx(pose[GEAR], Mat4::from_rotation_x(FRAC_PI_2)));
}

// ============================================================================
// Mask Affinity and Mappings
// ============================================================================

#[test]
fn empty_joint_mask_maps_all_joints() {
    let (model, skeleton) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_channel(
        &model,
        BinaryAnimationChannel::new(
            "everything",
            AnimationMask::from_joints(Vec::<&str>::new()),
            1.0,
        ),
    );
    system.register_channel(
        &model,
        BinaryAnimationChannel::new("gear_only", AnimationMask::from_joints(["/jet/gear"]), 1.0),
    );

    let all = system.mapping("everything").unwrap();
    assert_eq!(all.targets()[0].skeleton, skeleton);
    assert_eq!(all.targets()[0].joints, JointSelection::All);

    let gear = system.mapping("gear_only").unwrap();
    assert_eq!(gear.targets()[0].joints, JointSelection::Indices(vec![GEAR]));
}

#[test]
fn mask_naming_no_skeleton_joint_targets_nothing() {
    let (mut model, skeleton) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_channel(
        &model,
        BinaryAnimationChannel::new("elsewhere", AnimationMask::from_joints(["/other/rig"]), 1.0),
    );

    assert!(system.mapping("elsewhere").unwrap().targets().is_empty());
    system.update(&mut model, 0.0);
    assert_eq!(evaluations(&model, skeleton), 0);
}

#[test]
fn unresolvable_clip_holds_pose() {
    let mut model = AnimatedModel::new();
    let skeleton = model.add_skeleton("bare", airframe());
    let mut system = AnimationLayerSystem::new(&model);
    system.register_channel(
        &model,
        BinaryAnimationChannel::new("gear", AnimationMask::empty(), 1.0),
    );

    assert!(system.channel("gear").unwrap().clip().is_none());
    system.set_channel_value("gear", 1.0);
    system.update(&mut model, 0.0);

    assert_eq!(evaluations(&model, skeleton), 0);
    assert!(model.skeleton(skeleton).unwrap().current_pose().is_empty());
    assert!(!system.has_dirty_channels());
}

#[test]
fn missing_mapping_uses_discovery() {
    init_logger();
    let (mut model, skeleton) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_layer(&model, gear_layer());
    system.invalidate_mappings();
    assert!(system.mapping("gear_bay").is_none());

    system.set_channel_value("gear_bay", 1.0);
    system.update(&mut model, 0.0);
    assert_eq!(evaluations(&model, skeleton), 1);
    let gear = model.skeleton(skeleton).unwrap().local_poses()[GEAR];
    assert!(mat_approx(gear, Mat4::from_rotation_x(FRAC_PI_2)));

    system.rebuild_mappings(&model);
    assert!(system.mapping("gear_bay").is_some());
}

#[test]
fn missing_mapping_is_skipped_without_fallback() {
    let (mut model, skeleton) = jet();
    let settings = LayerSystemSettings {
        allow_mapping_fallback: false,
        ..LayerSystemSettings::default()
    };
    let mut system = AnimationLayerSystem::with_settings(&model, settings);
    system.register_layer(&model, gear_layer());
    system.invalidate_mappings();

    system.update(&mut model, 0.0);
    assert_eq!(evaluations(&model, skeleton), 0);
    assert!(!system.has_dirty_channels());

    system.rebuild_mappings(&model);
    system.set_channel_value("strut", 1.0);
    system.update(&mut model, 0.0);
    assert_eq!(evaluations(&model, skeleton), 1);
}

#[test]
fn foreign_model_is_ignored() {
    let (model, _) = jet();
    let (mut other, other_skeleton) = jet();
    let mut system = AnimationLayerSystem::new(&model);

    assert!(system.register_channel(&other, flap_channel()).is_none());
    assert!(!system.register_layer(&other, gear_layer()));
    assert_eq!(system.channel_count(), 0);

    system.register_layer(&model, gear_layer());
    system.update(&mut other, 0.0);
    assert_eq!(evaluations(&other, other_skeleton), 0);
    assert!(system.has_dirty_channels());
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn clip_driven_channels_get_the_first_clip() {
    let (model, _) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_layer(&model, gear_layer());
    system.register_channel(&model, flap_channel());

    assert_eq!(system.channel("gear_bay").unwrap().clip().unwrap().name, "gear_down");
    assert!(system.channel("flap").unwrap().clip().is_none());
}

#[test]
fn registration_binds_first_clip_even_with_skeleton_clip() {
    let (mut model, skeleton) = jet();
    model.add_clip(AnimationClip::new("gear_up").with_duration(3.0));
    model.set_skeleton_clip(skeleton, "gear_up");
    let mut system = AnimationLayerSystem::new(&model);
    system.register_layer(&model, gear_layer());

    assert_eq!(system.channel("gear_bay").unwrap().clip().unwrap().name, "gear_down");
    let target = &system.mapping("gear_bay").unwrap().targets()[0];
    assert_eq!(target.clip.as_ref().unwrap().name, "gear_down");

    system.set_channel_value("gear_bay", 1.0);
    system.update(&mut model, 0.0);
    let gear = model.skeleton(skeleton).unwrap().local_poses()[GEAR];
    assert!(mat_approx(gear, Mat4::from_rotation_x(FRAC_PI_2)));
}

#[test]
fn re_registration_replaces_channel() {
    let (model, _) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_channel(
        &model,
        BinaryAnimationChannel::new("gear_bay", AnimationMask::empty(), 9.0),
    );
    system.register_layer(&model, gear_layer());

    assert_eq!(system.channel_count(), 2);
    assert_eq!(system.channel_ids(), vec!["gear_bay", "strut"]);
    let duration = system
        .channel("gear_bay")
        .and_then(|c| c.as_binary())
        .map(BinaryAnimationChannel::transition_duration);
    assert_eq!(duration, Some(3.0));
    assert_eq!(system.layer("gear").unwrap().channel_ids(), vec!["gear_bay", "strut"]);
}

#[test]
fn repeated_id_within_a_layer_keeps_the_last_channel() {
    let (model, _) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    let mask = AnimationMask::from_joints(["/jet/gear"]);
    system.register_layer(
        &model,
        AnimationLayer::new("dup")
            .with_channel(BinaryAnimationChannel::new("dup", mask.clone(), 1.0))
            .with_channel(BinaryAnimationChannel::new("dup", mask, 2.0)),
    );

    let layer = system.layer("dup").unwrap();
    assert_eq!(layer.len(), 1);
    assert_eq!(layer.channel_ids(), vec!["dup"]);
    assert_eq!(system.channel_count(), 1);
    let duration = system
        .channel("dup")
        .and_then(|c| c.as_binary())
        .map(BinaryAnimationChannel::transition_duration);
    assert_eq!(duration, Some(2.0));
}

#[test]
fn re_registering_a_layer_replaces_its_channels() {
    let (model, _) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_layer(&model, gear_layer());
    system.register_layer(
        &model,
        AnimationLayer::new("gear").with_channel(ContinuousAnimationChannel::new(
            "gear_trim",
            AnimationMask::empty(),
        )),
    );

    assert_eq!(system.layer_ids(), vec!["gear"]);
    assert!(!system.has_channel("gear_bay"));
    assert!(system.has_channel("gear_trim"));
    assert_eq!(system.channel_count(), 1);
}

#[test]
fn unregister_channel_and_layer() {
    let (model, _) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_layer(&model, gear_layer());
    system.register_layer(&model, AnimationLayer::new("flaps").with_channel(flap_channel()));

    let removed = system.unregister_channel("strut").unwrap();
    assert_eq!(removed.id(), "strut");
    assert_eq!(system.layer("gear").unwrap().len(), 1);
    assert!(system.unregister_channel("strut").is_none());

    assert!(system.unregister_layer("gear"));
    assert!(!system.has_layer("gear"));
    assert!(!system.has_channel("gear_bay"));
    assert!(!system.unregister_layer("gear"));

    // Remaining layer is still addressable after the index shift
    assert_eq!(system.layer("flaps").unwrap().channel_ids(), vec!["flap"]);
    assert_eq!(system.channel_count(), 1);
}

#[test]
fn layer_view_controls_group() {
    let (mut model, _) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_layer(&model, gear_layer());

    system.layer_mut("gear").unwrap().activate_all();
    assert!(system.layer_mut("gear").unwrap().is_animating());

    system.update(&mut model, 3.0);
    let layer = system.layer_mut("gear").unwrap();
    assert!(layer.is_active());
    assert_eq!(layer.progress(), Some(1.0));
    assert_eq!(layer.transition_duration(), Some(3.0));
}

// ============================================================================
// Reset and Scrubbing
// ============================================================================

#[test]
fn reset_returns_every_channel_to_rest() {
    let (mut model, skeleton) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_layer(
        &model,
        AnimationLayer::new("mixed")
            .with_channel(
                BinaryAnimationChannel::new(
                    "gear_bay",
                    AnimationMask::from_joints(["/jet/gear"]),
                    3.0,
                )
                .with_initial_state(BinaryState::Active),
            )
            .with_channel(
                ContinuousAnimationChannel::new(
                    "strut",
                    AnimationMask::from_joints(["/jet/gear/strut"]),
                )
                .with_initial_value(0.8),
            ),
    );
    system.register_channel(&model, flap_channel().with_initial_value(0.5));

    system.reset_all_channels(&mut model);

    let gear = system.channel("gear_bay").and_then(|c| c.as_binary()).unwrap();
    assert!(gear.is_inactive());
    assert_eq!(gear.progress(), 0.0);
    assert_eq!(system.channel("strut").and_then(|c| c.as_continuous()).unwrap().value(), 0.0);
    assert_eq!(system.channel("flap").and_then(|c| c.as_procedural()).unwrap().value(), -1.0);
    assert!(!system.has_dirty_channels());
    assert_eq!(evaluations(&model, skeleton), 1);

    let flap = model.skeleton(skeleton).unwrap().local_poses()[FLAP];
    assert!(mat_approx(flap, Mat4::from_rotation_x(-FRAC_PI_4)));
}

#[test]
fn set_channel_value_dispatches_by_kind() {
    let (model, _) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_channel(
        &model,
        BinaryAnimationChannel::new("gear_bay", AnimationMask::empty(), 3.0),
    );
    system.register_channel(
        &model,
        ContinuousAnimationChannel::new("trim", AnimationMask::empty()),
    );
    system.register_channel(&model, flap_channel());

    system.set_channel_value("gear_bay", 0.4);
    system.set_channel_value("trim", 0.75);
    system.set_channel_value("flap", 0.75);
    system.set_channel_value("missing", 0.5);

    let gear = system.channel("gear_bay").and_then(|c| c.as_binary()).unwrap();
    assert_eq!(gear.state(), BinaryState::Activating);
    assert!((gear.progress() - 0.4).abs() < EPSILON);
    let trim = system.channel("trim").and_then(|c| c.as_continuous()).unwrap();
    assert!((trim.target_value() - 0.75).abs() < EPSILON);
    let flap = system.channel("flap").and_then(|c| c.as_procedural()).unwrap();
    assert!((flap.target_value() - 0.5).abs() < EPSILON);
    assert_eq!(system.channel_count(), 3);
}

// ============================================================================
// Introspection
// ============================================================================

#[test]
fn debug_state_lists_layers_and_channels() {
    let (model, _) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_layer(&model, gear_layer());
    system.register_channel(&model, flap_channel());

    let dump = system.debug_state();
    assert!(dump.contains("Layers (1)"));
    assert!(dump.contains("gear: [gear_bay, strut]"));
    assert!(dump.contains("Channels (3)"));
    assert!(dump.contains("ProceduralAnimationChannel('flap'"));
}

#[test]
fn mask_coverage_counts_matched_joints() {
    let (model, skeleton) = jet();
    let mut system = AnimationLayerSystem::new(&model);
    system.register_layer(&model, gear_layer());
    system.register_channel(
        &model,
        BinaryAnimationChannel::new(
            "wide",
            AnimationMask::new(["/jet/gear", "/jet/flap"], [0, 2]),
            1.0,
        ),
    );

    let coverage = system.mask_coverage(&model);
    assert_eq!(coverage.len(), 3);

    let wide = coverage.iter().find(|c| c.channel == "wide").unwrap();
    assert_eq!(wide.mask_joints, 2);
    assert_eq!(wide.mask_meshes, 2);
    assert_eq!(wide.skeletons.len(), 1);
    assert_eq!(wide.skeletons[0].skeleton, skeleton);
    assert_eq!(wide.skeletons[0].name.as_deref(), Some("airframe"));
    assert_eq!(wide.skeletons[0].matched_joints, 2);
    assert_eq!(wide.skeletons[0].total_joints, 4);
}
