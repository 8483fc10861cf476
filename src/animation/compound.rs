//! Skeleton-pose fan-in.
//!
//! A [`SkeletonPoseCompoundValue`] gathers every per-joint value one
//! controller drives into a single pose-shaped value, so a skeleton mixer
//! sees one binding per controller instead of one per joint.
//!
//! Joint names are resolved to bone indices lazily, once per
//! (skeleton serial, mirrored) pair.

use std::any::Any;

use rustc_hash::FxHashSet;

use crate::animation::computed::ComputedValue;
use crate::animation::controller::PlaybackController;
use crate::animation::value::{AnimatedValue, FrameContext, ValueFlags, ValueKind};
use crate::animation::values::Transform;
use crate::errors::{AnimationError, Result};
use crate::scene::skeleton::Skeleton;
use crate::settings::{CONTRIBUTION_EPSILON, weight_at};

#[derive(Debug)]
struct Entry {
    value: Box<dyn AnimatedValue<Transform>>,
    /// Contribution written on the last compute.
    contribution: f32,
    /// `None` until resolved, or when the skeleton has no such joint.
    bone: Option<usize>,
}

#[derive(Debug)]
pub struct SkeletonPoseCompoundValue {
    name: String,
    flags: ValueFlags,
    values: Vec<Entry>,
    additive_values: Vec<Entry>,
    resolved: Option<(u32, bool)>,
    dirty: bool,
}

impl SkeletonPoseCompoundValue {
    /// Creates an empty compound. An `additive` compound reports itself as
    /// additive to its mixer regardless of its current entries.
    #[must_use]
    pub fn new(name: impl Into<String>, additive: bool) -> Self {
        let flags = if additive {
            ValueFlags::ADDITIVE
        } else {
            ValueFlags::empty()
        };
        Self {
            name: name.into(),
            flags,
            values: Vec::new(),
            additive_values: Vec::new(),
            resolved: None,
            dirty: false,
        }
    }

    /// Adds one joint value.
    ///
    /// Values with a contribution below [`CONTRIBUTION_EPSILON`] are ignored.
    /// A joint name already present in either group is rejected.
    pub fn add_skeleton_value(
        &mut self,
        value: Box<dyn AnimatedValue<Transform>>,
        contribution: f32,
    ) -> Result<()> {
        if contribution < CONTRIBUTION_EPSILON {
            log::debug!(
                "Ignoring joint value '{}' with negligible contribution {contribution}",
                value.name()
            );
            return Ok(());
        }

        let name = value.name();
        if self.entries().any(|e| e.value.name().eq_ignore_ascii_case(name)) {
            return Err(AnimationError::DuplicateValue(name.to_owned()));
        }

        let entry = Entry {
            value,
            contribution,
            bone: None,
        };
        if entry.value.is_additive() {
            self.additive_values.push(entry);
        } else {
            self.values.push(entry);
        }

        self.resolved = None;
        self.dirty = true;
        Ok(())
    }

    /// Whether this compound was created for the additive group.
    #[must_use]
    pub fn is_additive_group(&self) -> bool {
        self.flags.contains(ValueFlags::ADDITIVE)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len() + self.additive_values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolved bone indices, base entries first, then additive entries.
    pub fn bone_indices(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.entries().map(|e| e.bone)
    }

    /// Last computed contribution per entry, in [`bone_indices`](Self::bone_indices) order.
    pub fn contributions(&self) -> impl Iterator<Item = f32> + '_ {
        self.entries().map(|e| e.contribution)
    }

    /// Maps every joint name to a bone index of `skeleton`.
    ///
    /// Cached per (skeleton serial, `mirrored`); calling again with the
    /// same pair is a no-op.
    pub fn resolve_skeleton(&mut self, skeleton: &Skeleton, mirrored: bool) {
        let key = (skeleton.serial(), mirrored);
        if self.resolved == Some(key) {
            return;
        }

        for entry in self.values.iter_mut().chain(self.additive_values.iter_mut()) {
            let name = entry.value.name();
            entry.bone = skeleton.find_joint(name).map(|bone| {
                if !mirrored {
                    return bone;
                }
                skeleton.mirror_of(bone).unwrap_or_else(|| {
                    log::warn!(
                        "Skeleton '{}' has no mirror joint for '{name}', playing it unmirrored",
                        skeleton.name
                    );
                    bone
                })
            });
        }

        log::debug!(
            "Resolved '{}' against skeleton '{}' (mirrored: {mirrored}): {}/{} joints bound",
            self.name,
            skeleton.name,
            self.entries().filter(|e| e.bone.is_some()).count(),
            self.len()
        );
        self.resolved = Some(key);
    }

    fn entries(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.values.iter().chain(self.additive_values.iter())
    }
}

impl AnimatedValue<Transform> for SkeletonPoseCompoundValue {
    fn name(&self) -> &str {
        &self.name
    }

    fn flags(&self) -> ValueFlags {
        if self.is_empty() {
            self.flags | ValueFlags::DISABLED
        } else {
            self.flags
        }
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Pose
    }

    fn compute(
        &mut self,
        out: &mut ComputedValue<'_, Transform>,
        controller: &PlaybackController,
        weights: &[f32],
        ctx: &FrameContext<'_>,
    ) {
        let Some(skeleton) = ctx.skeleton else {
            log::warn!("Pose '{}' computed without a skeleton", self.name);
            return;
        };
        let mirrored = controller.is_mirrored();
        self.resolve_skeleton(skeleton, mirrored);

        let negligible = ctx.settings.negligible_contribution;
        let lanes = out.len();
        for (entry, additive) in self
            .values
            .iter_mut()
            .map(|e| (e, false))
            .chain(self.additive_values.iter_mut().map(|e| (e, true)))
        {
            let Some(bone) = entry.bone.filter(|&b| b < lanes) else {
                continue;
            };
            let weight = weight_at(weights, bone);
            if weight <= negligible {
                continue;
            }

            let mut lane = out.lane(bone);
            entry.value.compute(&mut lane, controller, &[weight], ctx);
            if mirrored {
                lane.mirror(additive);
            }
            entry.contribution = lane.contribution[0];
        }
    }

    fn collect_irregular_names(&self, names: &mut FxHashSet<String>) {
        for entry in self.entries() {
            entry.value.collect_irregular_names(names);
        }
    }

    fn invalidate_cache(&mut self) {
        self.resolved = None;
        self.dirty = false;
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn handles_mirroring(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
