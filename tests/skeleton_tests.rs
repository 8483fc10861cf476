//! Skeleton Pose Tests
//!
//! Tests for:
//! - Joint-name resolution and mirrored bone remapping
//! - Skeleton-pose compounds (routing, duplicates, irregular names)
//! - End-to-end pose composition over a skeleton
//! - SkeletonInstance pose application and additive policy
//! - AnimationManager clip binding and AnimationSystem frame updates

use std::sync::Arc;

use bumpalo::Bump;
use glam::{Quat, Vec3};
use rustc_hash::FxHashSet;

use myth_animation::animation::{
    AnimatedValue, AnimationClip, AnimationManager, AnimationSystem, ComputedValue, ConstantValue, ControllerKey,
    ControllerRegistry, FrameContext, Keyframe, KeyframedValue, Mixer, SkeletonPoseCompoundValue, ValueFlags,
    ValueKind,
};
use myth_animation::scene::{JointEntry, Skeleton, SkeletonInstance};
use myth_animation::settings::{AdditivePolicy, BlendSettings, WeightTable};
use myth_animation::{AnimationError, Blendable, Transform};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn playing(registry: &mut ControllerRegistry, name: &str, priority: i32, contribution: f32) -> ControllerKey {
    let key = registry.create(name, 10.0);
    if let Some(mut c) = registry.get_mut(key) {
        c.set_priority(priority);
        c.set_contribution(contribution);
        c.play();
    }
    key
}

fn joint(name: &str, value: Transform) -> Box<dyn AnimatedValue<Transform>> {
    Box::new(ConstantValue::new(name, value))
}

/// Root, a left/right arm pair and a tail.
fn mirrored_skeleton() -> Skeleton {
    Skeleton::new(
        "biped",
        vec![
            JointEntry::new("Root", None),
            JointEntry::new("L_Arm", Some(0)).with_mirror(2),
            JointEntry::new("R_Arm", Some(0)).with_mirror(1),
            JointEntry::new("Tail", Some(0)),
        ],
    )
}

fn two_joint_skeleton() -> Arc<Skeleton> {
    Arc::new(Skeleton::new(
        "pair",
        vec![JointEntry::new("Hip", None), JointEntry::new("Spine", Some(0))],
    ))
}

// ============================================================================
// Skeleton
// ============================================================================

#[test]
fn skeleton_serials_are_unique_and_increasing() {
    let a = Skeleton::new("a", Vec::new());
    let b = Skeleton::new("b", Vec::new());
    assert!(b.serial() > a.serial());
}

#[test]
fn joint_lookup_ignores_case() {
    let skeleton = mirrored_skeleton();
    assert_eq!(skeleton.find_joint("l_arm"), Some(1));
    assert_eq!(skeleton.find_joint("TAIL"), Some(3));
    assert_eq!(skeleton.find_joint("Head"), None);
    assert_eq!(skeleton.mirror_of(1), Some(2));
    assert_eq!(skeleton.mirror_of(0), None);
}

// ============================================================================
// Compound: Resolution
// ============================================================================

fn arm_compound() -> SkeletonPoseCompoundValue {
    let mut compound = SkeletonPoseCompoundValue::new("arms", false);
    for name in ["l_arm", "ROOT", "r_arm", "Missing"] {
        compound.add_skeleton_value(joint(name, Transform::IDENTITY), 1.0).unwrap();
    }
    compound
}

#[test]
fn resolution_maps_names_to_bones() {
    let skeleton = mirrored_skeleton();
    let mut compound = arm_compound();
    compound.resolve_skeleton(&skeleton, false);
    let bones: Vec<_> = compound.bone_indices().collect();
    assert_eq!(bones, vec![Some(1), Some(0), Some(2), None]);
}

#[test]
fn mirrored_resolution_round_trips() {
    init_logging();
    let skeleton = mirrored_skeleton();
    let mut compound = arm_compound();

    compound.resolve_skeleton(&skeleton, false);
    let straight: Vec<_> = compound.bone_indices().collect();

    compound.resolve_skeleton(&skeleton, true);
    let mirrored: Vec<_> = compound.bone_indices().collect();
    // Joints without a counterpart fall back to themselves.
    assert_eq!(mirrored, vec![Some(2), Some(0), Some(1), None]);

    compound.resolve_skeleton(&skeleton, false);
    let again: Vec<_> = compound.bone_indices().collect();
    assert_eq!(again, straight);
}

#[test]
fn a_new_skeleton_invalidates_the_resolution() {
    let mut compound = arm_compound();
    compound.resolve_skeleton(&mirrored_skeleton(), false);

    let reordered = Skeleton::new(
        "reordered",
        vec![JointEntry::new("R_Arm", None), JointEntry::new("L_Arm", None)],
    );
    compound.resolve_skeleton(&reordered, false);
    let bones: Vec<_> = compound.bone_indices().collect();
    assert_eq!(bones, vec![Some(1), None, Some(0), None]);
}

// ============================================================================
// Compound: Membership
// ============================================================================

#[test]
fn compound_rejects_duplicate_joint_names() {
    let mut compound = SkeletonPoseCompoundValue::new("pose", false);
    compound.add_skeleton_value(joint("Hip", Transform::IDENTITY), 1.0).unwrap();

    let err = compound
        .add_skeleton_value(joint("hip", Transform::IDENTITY), 1.0)
        .unwrap_err();
    assert_eq!(err, AnimationError::DuplicateValue("hip".to_owned()));

    // Same name in the additive group is still a duplicate.
    let additive = ConstantValue::new("HIP", Transform::IDENTITY).additive();
    assert!(compound.add_skeleton_value(Box::new(additive), 1.0).is_err());
    assert_eq!(compound.len(), 1);
}

#[test]
fn compound_ignores_negligible_contributions() {
    let mut compound = SkeletonPoseCompoundValue::new("pose", false);
    compound.add_skeleton_value(joint("Hip", Transform::IDENTITY), 0.0).unwrap();
    assert!(compound.is_empty());
    assert!(compound.flags().contains(ValueFlags::DISABLED));
}

#[test]
fn compound_reports_pose_kind_and_additive_group() {
    let compound = SkeletonPoseCompoundValue::new("pose", true);
    assert_eq!(compound.kind(), ValueKind::Pose);
    assert!(compound.is_additive_group());
    assert!(compound.is_additive());
    assert!(compound.handles_mirroring());
}

#[test]
fn irregular_names_skip_homogeneous_values() {
    let mut compound = SkeletonPoseCompoundValue::new("pose", false);
    compound.add_skeleton_value(joint("Hip", Transform::IDENTITY), 1.0).unwrap();
    let uniform = ConstantValue::new("Spine", Transform::IDENTITY).with_flags(ValueFlags::HOMOGENEOUS);
    compound.add_skeleton_value(Box::new(uniform), 1.0).unwrap();

    let mut names = FxHashSet::default();
    compound.collect_irregular_names(&mut names);
    assert!(names.contains("Hip"));
    assert!(!names.contains("Spine"));
}

#[test]
fn joint_values_are_grouped_per_controller_and_additive_flag() {
    let mut registry = ControllerRegistry::new();
    let a = playing(&mut registry, "a", 0, 1.0);
    let b = playing(&mut registry, "b", 0, 1.0);

    let mut mixer = Mixer::new_skeleton_pose("pose");
    let weights = WeightTable::default();
    mixer.add_joint_value(a, joint("Hip", Transform::IDENTITY), weights.clone()).unwrap();
    mixer.add_joint_value(a, joint("Spine", Transform::IDENTITY), weights.clone()).unwrap();
    let additive = ConstantValue::new("Hip", Transform::IDENTITY).additive();
    mixer.add_joint_value(a, Box::new(additive), weights.clone()).unwrap();
    mixer.add_joint_value(b, joint("Hip", Transform::IDENTITY), weights.clone()).unwrap();

    assert_eq!(mixer.binding_count(), 3);
    assert_eq!(mixer.compound(a, false).map(SkeletonPoseCompoundValue::len), Some(2));
    assert_eq!(mixer.compound(a, true).map(SkeletonPoseCompoundValue::len), Some(1));
    assert_eq!(mixer.compound(b, false).map(SkeletonPoseCompoundValue::len), Some(1));
    assert!(mixer.compound(b, true).is_none());

    let err = mixer
        .add_joint_value(a, joint("spine", Transform::IDENTITY), weights)
        .unwrap_err();
    assert_eq!(err, AnimationError::DuplicateValue("spine".to_owned()));
}

// ============================================================================
// Pose Composition
// ============================================================================

#[test]
fn higher_priority_partial_pose_blends_over_full_background() {
    let mut registry = ControllerRegistry::new();
    let a = playing(&mut registry, "A", 0, 1.0);
    let b = playing(&mut registry, "B", 5, 0.5);
    let settings = BlendSettings::default();
    let skeleton = two_joint_skeleton();

    let ta = Transform::new(Quat::from_rotation_y(0.5), Vec3::new(1.0, 0.0, 0.0));
    let tb = Transform::new(Quat::from_rotation_x(1.0), Vec3::new(0.0, 2.0, 0.0));

    let mut mixer = Mixer::new_skeleton_pose("pose");
    mixer.add_joint_value(a, joint("Hip", ta), WeightTable::full(2)).unwrap();
    mixer.add_joint_value(b, joint("Hip", tb), WeightTable::full(2)).unwrap();

    let arena = Bump::new();
    let ctx = FrameContext::new(&registry, &arena, &settings).with_skeleton(&skeleton);
    let mut out = ComputedValue::alloc_seeded(&arena, &[Transform::IDENTITY; 2]);
    mixer.evaluate(&mut out, &ctx);

    // Running contribution 1.5: B blends over A by 0.5 / 1.5.
    let mut expected = ta.finalise();
    Transform::blend(&mut expected, &tb.finalise(), 0.5 / 1.5);
    assert_eq!(out.value[0], expected);
    assert_eq!(out.contribution[0], 1.5);

    // Untouched joints keep their seed.
    assert_eq!(out.value[1], Transform::IDENTITY);
    assert_eq!(out.contribution[1], 0.0);

    let contributions: Vec<_> = mixer
        .compound(b, false)
        .map(|c| c.contributions().collect())
        .unwrap_or_default();
    assert_eq!(contributions, vec![0.5]);
}

#[test]
fn mirrored_pose_lands_on_the_counterpart_joint() {
    let mut registry = ControllerRegistry::new();
    let a = playing(&mut registry, "a", 0, 1.0);
    if let Some(mut c) = registry.get_mut(a) {
        c.set_mirrored(true);
    }
    let settings = BlendSettings::default();
    let skeleton = mirrored_skeleton();

    let mut mixer = Mixer::new_skeleton_pose("pose");
    let reach = Transform::from_translation(Vec3::new(1.0, 0.5, 0.0));
    mixer.add_joint_value(a, joint("L_Arm", reach), WeightTable::default()).unwrap();

    let arena = Bump::new();
    let ctx = FrameContext::new(&registry, &arena, &settings).with_skeleton(&skeleton);
    let mut out = ComputedValue::alloc_seeded(&arena, &[Transform::IDENTITY; 4]);
    mixer.evaluate(&mut out, &ctx);

    assert_eq!(out.contribution[1], 0.0);
    assert_eq!(out.contribution[2], 1.0);
    assert!(approx_vec3(out.value[2].position, Vec3::new(-1.0, 0.5, 0.0)));
}

#[test]
fn per_bone_weights_scale_joint_contribution() {
    let mut registry = ControllerRegistry::new();
    let a = playing(&mut registry, "a", 0, 1.0);
    let settings = BlendSettings::default();
    let skeleton = two_joint_skeleton();

    let mut mixer = Mixer::new_skeleton_pose("pose");
    let weights = WeightTable::from_weights(&[0.25, 0.0]);
    let up = Transform::from_translation(Vec3::Y);
    mixer.add_joint_value(a, joint("Hip", up), weights.clone()).unwrap();
    mixer.add_joint_value(a, joint("Spine", up), weights).unwrap();

    let arena = Bump::new();
    let ctx = FrameContext::new(&registry, &arena, &settings).with_skeleton(&skeleton);
    let mut out = ComputedValue::alloc_seeded(&arena, &[Transform::IDENTITY; 2]);
    mixer.evaluate(&mut out, &ctx);

    assert!(approx(out.contribution[0], 0.25));
    assert_eq!(out.contribution[1], 0.0, "zero-weight bones are skipped");
}

#[test]
fn pose_without_a_skeleton_contributes_nothing() {
    init_logging();
    let mut registry = ControllerRegistry::new();
    let a = playing(&mut registry, "a", 0, 1.0);
    let settings = BlendSettings::default();

    let mut mixer = Mixer::new_skeleton_pose("pose");
    mixer
        .add_joint_value(a, joint("Hip", Transform::from_translation(Vec3::X)), WeightTable::default())
        .unwrap();

    let arena = Bump::new();
    let ctx = FrameContext::new(&registry, &arena, &settings);
    let mut out = ComputedValue::alloc_seeded(&arena, &[Transform::IDENTITY; 2]);
    mixer.evaluate(&mut out, &ctx);

    assert!(out.contribution.iter().all(|&c| c == 0.0));
    assert_eq!(out.value[0], Transform::IDENTITY);
}

// ============================================================================
// SkeletonInstance
// ============================================================================

#[test]
fn instance_starts_at_rest() {
    let rest = Transform::from_translation(Vec3::new(0.0, 1.0, 0.0));
    let skeleton = Arc::new(Skeleton::new("s", vec![JointEntry::new("Hip", None).with_rest(rest)]));
    let instance = SkeletonInstance::new(skeleton);
    assert_eq!(instance.local_transforms(), &[rest]);
    assert!(instance.pose_mixer().is_none());
}

#[test]
fn partial_contribution_moves_joints_part_way() {
    let mut registry = ControllerRegistry::new();
    let a = playing(&mut registry, "a", 0, 0.5);
    let settings = BlendSettings::default();

    let mut instance = SkeletonInstance::new(two_joint_skeleton());
    instance
        .add_animated_value(a, joint("Hip", Transform::from_translation(Vec3::new(2.0, 0.0, 0.0))), WeightTable::default())
        .unwrap();

    let arena = Bump::new();
    assert!(instance.update(1, &registry, &arena, &settings));
    let local = instance.local_transforms();
    assert!(approx_vec3(local[0].position, Vec3::new(1.0, 0.0, 0.0)), "got {}", local[0].position);
    assert!(approx_vec3(local[1].position, Vec3::ZERO));
}

#[test]
fn update_is_memoised_per_frame() {
    let mut registry = ControllerRegistry::new();
    let a = playing(&mut registry, "a", 0, 0.5);
    let settings = BlendSettings::default();

    let mut instance = SkeletonInstance::new(two_joint_skeleton());
    instance
        .add_animated_value(a, joint("Hip", Transform::from_translation(Vec3::X)), WeightTable::default())
        .unwrap();

    let arena = Bump::new();
    assert!(instance.update(7, &registry, &arena, &settings));
    let after_first = instance.local_transforms()[0];
    assert!(!instance.update(7, &registry, &arena, &settings));
    assert_eq!(instance.local_transforms()[0], after_first);

    assert!(instance.update(8, &registry, &arena, &settings));
    assert!(instance.local_transforms()[0].position.x > after_first.position.x);
}

fn layered_instance(registry: &mut ControllerRegistry) -> SkeletonInstance {
    let base = playing(registry, "base", 0, 1.0);
    let layer = playing(registry, "layer", 1, 1.0);

    let mut instance = SkeletonInstance::new(two_joint_skeleton());
    instance
        .add_animated_value(base, joint("Hip", Transform::from_translation(Vec3::X)), WeightTable::default())
        .unwrap();
    let nudge = ConstantValue::new("Hip", Transform::from_translation(Vec3::Y)).additive();
    instance
        .add_animated_value(layer, Box::new(nudge), WeightTable::default())
        .unwrap();
    instance
}

#[test]
fn layered_policy_adds_the_additive_pose() {
    let mut registry = ControllerRegistry::new();
    let mut instance = layered_instance(&mut registry);
    let settings = BlendSettings::default();
    assert_eq!(settings.additive_policy, AdditivePolicy::Layered);

    let arena = Bump::new();
    instance.update(1, &registry, &arena, &settings);
    assert!(instance.pose_mixer().is_some_and(Mixer::is_additive));
    let hip = instance.local_transforms()[0];
    assert!(approx_vec3(hip.position, Vec3::new(1.0, 1.0, 0.0)), "got {}", hip.position);
    assert!(hip.rotation.abs_diff_eq(Quat::IDENTITY, EPSILON));
}

#[test]
fn disabled_policy_ignores_the_additive_pose() {
    let mut registry = ControllerRegistry::new();
    let mut instance = layered_instance(&mut registry);
    let settings = BlendSettings {
        additive_policy: AdditivePolicy::Disabled,
        ..Default::default()
    };

    let arena = Bump::new();
    instance.update(1, &registry, &arena, &settings);
    let hip = instance.local_transforms()[0];
    assert!(approx_vec3(hip.position, Vec3::X), "got {}", hip.position);
}

// ============================================================================
// AnimationManager
// ============================================================================

fn walk_clip() -> AnimationClip {
    AnimationClip::new(
        "Walk",
        vec![
            KeyframedValue::new(
                "hip",
                vec![
                    Keyframe::new(0.0, Transform::IDENTITY),
                    Keyframe::new(1.0, Transform::from_translation(Vec3::new(2.0, 0.0, 0.0))),
                ],
            )
            .into(),
            KeyframedValue::new("blink", vec![Keyframe::new(0.0, 0.0_f32), Keyframe::new(0.5, 1.0)]).into(),
        ],
    )
}

#[test]
fn apply_clip_binds_joint_values_and_skips_other_shapes() {
    init_logging();
    let mut registry = ControllerRegistry::new();
    let settings = BlendSettings::default();
    let mut manager = AnimationManager::new("hero").with_skeleton(two_joint_skeleton());

    let key = manager.apply_clip(&mut registry, &walk_clip(), &settings).unwrap();
    assert_eq!(registry.get(key).map(|c| c.length()), Some(1.0));
    assert!(!registry.get(key).is_some_and(|c| c.is_active()));

    let compound_len = manager
        .skeleton_instance()
        .and_then(SkeletonInstance::pose_mixer)
        .and_then(|m| m.compound(key, false))
        .map(SkeletonPoseCompoundValue::len);
    assert_eq!(compound_len, Some(1));
}

#[test]
fn apply_clip_without_skeleton_fails() {
    let mut registry = ControllerRegistry::new();
    let settings = BlendSettings::default();
    let mut manager = AnimationManager::new("prop");

    let err = manager.apply_clip(&mut registry, &walk_clip(), &settings).unwrap_err();
    assert_eq!(err, AnimationError::MissingSkeleton);
    assert!(registry.is_empty());
    assert!(manager.controllers().is_empty());
}

#[test]
fn find_controller_ignores_case() {
    let mut registry = ControllerRegistry::new();
    let settings = BlendSettings::default();
    let mut manager = AnimationManager::new("hero").with_skeleton(two_joint_skeleton());
    let key = manager.apply_clip(&mut registry, &walk_clip(), &settings).unwrap();

    assert_eq!(manager.find_controller(&registry, "WALK"), Some(key));
    assert_eq!(manager.find_controller(&registry, "run"), None);
}

#[test]
fn remove_controller_unbinds_and_unregisters() {
    let mut registry = ControllerRegistry::new();
    let settings = BlendSettings::default();
    let mut manager = AnimationManager::new("hero").with_skeleton(two_joint_skeleton());
    let key = manager.apply_clip(&mut registry, &walk_clip(), &settings).unwrap();

    manager.remove_controller(&mut registry, key).unwrap();
    assert!(!registry.contains(key));
    let bindings = manager
        .skeleton_instance()
        .and_then(SkeletonInstance::pose_mixer)
        .map(Mixer::binding_count);
    assert_eq!(bindings, Some(0));

    let err = manager.remove_controller(&mut registry, key).unwrap_err();
    assert_eq!(err, AnimationError::ControllerNotFound);
}

#[test]
fn prune_forgets_controllers_removed_elsewhere() {
    let mut registry = ControllerRegistry::new();
    let settings = BlendSettings::default();
    let mut manager = AnimationManager::new("hero").with_skeleton(two_joint_skeleton());
    let key = manager.apply_clip(&mut registry, &walk_clip(), &settings).unwrap();

    registry.remove(key);
    manager.prune(&registry);
    assert!(manager.controllers().is_empty());
}

// ============================================================================
// AnimationSystem
// ============================================================================

#[test]
fn system_update_advances_and_applies_poses() {
    let mut system = AnimationSystem::default();
    let agent = system.add_manager(AnimationManager::new("hero").with_skeleton(two_joint_skeleton()));
    let key = system.managers[agent]
        .apply_clip(&mut system.controllers, &walk_clip(), &system.settings)
        .unwrap();
    if let Some(mut c) = system.controllers.get_mut(key) {
        c.play();
    }

    system.update(0.5);
    assert_eq!(system.frame(), 1);
    let hip = |system: &AnimationSystem| {
        system.managers[agent]
            .skeleton_instance()
            .map(|i| i.local_transforms()[0].position)
            .unwrap_or_default()
    };
    assert!(approx(hip(&system).x, 1.0), "got {}", hip(&system));

    // Running off the end of a non-looping clip stops it; joints hold.
    system.update(0.6);
    assert_eq!(system.frame(), 2);
    assert!(!system.controllers.get(key).is_some_and(|c| c.is_active()));
    assert!(approx(hip(&system).x, 1.0), "got {}", hip(&system));
}

#[test]
fn looping_controller_wraps_during_system_update() {
    let mut system = AnimationSystem::new(BlendSettings::default());
    let agent = system.add_manager(AnimationManager::new("hero").with_skeleton(two_joint_skeleton()));
    let key = system.managers[agent]
        .apply_clip(&mut system.controllers, &walk_clip(), &system.settings)
        .unwrap();
    if let Some(mut c) = system.controllers.get_mut(key) {
        c.set_looping(true);
        c.play();
    }

    system.update(0.75);
    system.update(0.75);
    let time = system.controllers.get(key).map_or(-1.0, |c| c.time());
    assert!(approx(time, 0.5), "got {time}");
}
