//! Applies composed poses to one animated skeleton.

use std::sync::Arc;

use bumpalo::Bump;

use crate::animation::computed::ComputedValue;
use crate::animation::controller::{ControllerKey, ControllerRegistry};
use crate::animation::mixer::Mixer;
use crate::animation::value::{AnimatedValue, FrameContext};
use crate::animation::values::{Blendable, Transform};
use crate::errors::Result;
use crate::scene::skeleton::Skeleton;
use crate::settings::{AdditivePolicy, BlendSettings, WeightTable};

/// Per-agent joint state driven by a skeleton-pose mixer.
#[derive(Debug)]
pub struct SkeletonInstance {
    skeleton: Arc<Skeleton>,
    /// Joint-local transforms, indexed like the skeleton's joints.
    local: Vec<Transform>,
    pose: Option<Mixer<Transform>>,
    last_frame: Option<u64>,
}

impl SkeletonInstance {
    /// Starts every joint at its rest transform.
    #[must_use]
    pub fn new(skeleton: Arc<Skeleton>) -> Self {
        let local = skeleton.rest_pose().collect();
        Self {
            skeleton,
            local,
            pose: None,
            last_frame: None,
        }
    }

    #[must_use]
    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    #[must_use]
    pub fn local_transforms(&self) -> &[Transform] {
        &self.local
    }

    #[must_use]
    pub fn pose_mixer(&self) -> Option<&Mixer<Transform>> {
        self.pose.as_ref()
    }

    /// Binds a joint value under `controller`, creating the pose mixer on
    /// first use.
    pub fn add_animated_value(
        &mut self,
        controller: ControllerKey,
        value: Box<dyn AnimatedValue<Transform>>,
        weights: WeightTable,
    ) -> Result<()> {
        let skeleton_name = &self.skeleton.name;
        self.pose
            .get_or_insert_with(|| Mixer::new_skeleton_pose(format!("{skeleton_name} pose")))
            .add_joint_value(controller, value, weights)
    }

    /// Unbinds everything `controller` drives. Returns the number of
    /// bindings removed.
    pub fn remove_controller(&mut self, controller: ControllerKey) -> usize {
        self.pose
            .as_mut()
            .map_or(0, |mixer| mixer.remove_value(controller))
    }

    pub fn reset_to_rest(&mut self) {
        for (local, rest) in self.local.iter_mut().zip(self.skeleton.rest_pose()) {
            *local = rest;
        }
    }

    /// Composes this frame's pose into an arena buffer seeded with the
    /// rest pose. `ctx` must carry this instance's skeleton.
    ///
    /// Returns `None` when nothing was ever bound.
    pub fn compute_pose<'a>(&mut self, ctx: &FrameContext<'a>) -> Option<ComputedValue<'a, Transform>> {
        let mixer = self.pose.as_mut()?;
        let mut pose = ComputedValue::alloc(ctx.arena, self.skeleton.joint_count());
        for (value, rest) in pose.value.iter_mut().zip(self.skeleton.rest_pose()) {
            *value = rest;
        }
        mixer.evaluate(&mut pose, ctx);
        Some(pose)
    }

    /// Writes a composed pose into the joint transforms.
    ///
    /// Each joint moves toward the pose by its contribution, capped at 1, so
    /// joints nobody animates stay where they are. With
    /// [`AdditivePolicy::Layered`] the additive layer, already attenuated by
    /// the compositor, is then added on top.
    pub fn apply_pose(&mut self, pose: &ComputedValue<'_, Transform>, policy: AdditivePolicy) {
        let layered = policy == AdditivePolicy::Layered
            && self.pose.as_ref().is_some_and(Mixer::is_additive);

        for (b, local) in self.local.iter_mut().enumerate().take(pose.len()) {
            let c = pose.contribution[b].min(1.0);
            if c > 0.0 {
                Transform::blend(local, &pose.value[b], c);
            }
            if layered {
                *local = Transform::blend_additive(*local, pose.additive_value[b], 1.0);
            }
            *local = local.finalise();
        }
    }

    /// Computes and applies this frame's pose.
    ///
    /// Memoised on `frame`: a second call for the same frame does nothing
    /// and returns `false`.
    pub fn update(
        &mut self,
        frame: u64,
        controllers: &ControllerRegistry,
        arena: &Bump,
        settings: &BlendSettings,
    ) -> bool {
        if self.last_frame == Some(frame) {
            return false;
        }
        self.last_frame = Some(frame);

        let skeleton = Arc::clone(&self.skeleton);
        let ctx = FrameContext::new(controllers, arena, settings).with_skeleton(&skeleton);
        let Some(pose) = self.compute_pose(&ctx) else {
            return false;
        };
        self.apply_pose(&pose, settings.additive_policy);
        true
    }
}
