//! Mixers: the active/passive binding lists and their lazy ordering.
//!
//! A [`Mixer`] owns every [`BindingNode`] bound to it, split into an
//! *active* list (contributing, sorted by priority) and a *passive* list
//! (disabled or negligible). New bindings always start passive. The split
//! is rebuilt wholesale on the next compute after anything it depends on
//! changes:
//!
//! - a binding was added or removed
//! - a bound value reports itself dirty
//! - the controller registry revision moved (priority or contribution change)

use std::any::Any;
use std::cmp::Reverse;
use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::animation::binding::BindingNode;
use crate::animation::compositor;
use crate::animation::compound::SkeletonPoseCompoundValue;
use crate::animation::computed::ComputedValue;
use crate::animation::controller::{ControllerKey, ControllerRegistry, PlaybackController};
use crate::animation::value::{AnimatedValue, FrameContext, ValueFlags, ValueKind};
use crate::animation::values::{Blendable, Transform};
use crate::errors::{AnimationError, Result};
use crate::settings::{WeightTable, weight_at};

#[derive(Debug)]
pub struct Mixer<T: Blendable> {
    name: String,
    active: Vec<BindingNode<T>>,
    passive: VecDeque<BindingNode<T>>,
    dirty: bool,
    seen_revision: Option<u64>,
    disabled: bool,
    additive: bool,
    additive_priority: i32,
    next_serial: u64,
    skeleton_pose: bool,
}

impl<T: Blendable> Mixer<T> {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: Vec::new(),
            passive: VecDeque::new(),
            dirty: false,
            seen_revision: None,
            disabled: true,
            additive: false,
            additive_priority: i32::MAX,
            next_serial: 0,
            skeleton_pose: false,
        }
    }

    /// Binds `value` under `controller`.
    ///
    /// The binding starts passive; it is classified on the next re-sort.
    /// Binding a second value with the same name, controller and additive
    /// flag is rejected.
    pub fn add_value(
        &mut self,
        controller: ControllerKey,
        value: Box<dyn AnimatedValue<T>>,
        weights: WeightTable,
    ) -> Result<()> {
        let additive = value.is_additive();
        let duplicate = self.nodes().any(|n| {
            n.controller == controller
                && n.value.is_additive() == additive
                && n.value.name().eq_ignore_ascii_case(value.name())
        });
        if duplicate {
            log::debug!("Mixer '{}': '{}' is already bound, ignoring", self.name, value.name());
            return Err(AnimationError::DuplicateValue(value.name().to_owned()));
        }

        let serial = self.next_serial;
        self.next_serial += 1;
        self.passive
            .push_front(BindingNode::new(controller, value, weights, serial));
        self.dirty = true;
        Ok(())
    }

    /// Unbinds every value bound under `controller`, from both lists.
    /// Returns how many bindings were removed.
    pub fn remove_value(&mut self, controller: ControllerKey) -> usize {
        let before = self.binding_count();
        self.active.retain(|n| n.controller != controller);
        self.passive.retain(|n| n.controller != controller);
        let removed = before - self.binding_count();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    /// Whether the next compute will re-sort.
    #[must_use]
    pub fn needs_resort(&self, controllers: &ControllerRegistry) -> bool {
        self.dirty
            || self.seen_revision != Some(controllers.revision())
            || self.nodes().any(|n| n.value.is_dirty())
    }

    /// Rebuilds the active and passive lists.
    ///
    /// Active bindings end up sorted by priority, highest first; equal
    /// priorities keep registration order.
    pub fn resort(&mut self, controllers: &ControllerRegistry) {
        let mut working: Vec<BindingNode<T>> = Vec::with_capacity(self.binding_count());
        working.append(&mut self.active);
        working.extend(self.passive.drain(..));

        for mut node in working {
            if node.value.is_dirty() {
                node.value.invalidate_cache();
            }
            node.value.refresh(controllers);

            if node.is_passive(controllers) {
                if !controllers.contains(node.controller) {
                    log::warn!(
                        "Mixer '{}': '{}' is bound to a removed controller",
                        self.name,
                        node.value.name()
                    );
                }
                self.passive.push_back(node);
            } else {
                self.active.push(node);
            }
        }

        self.active.sort_by_cached_key(|n| {
            (Reverse(n.priority(controllers).unwrap_or(i32::MIN)), n.serial)
        });

        self.disabled = self.active.is_empty();
        self.additive_priority = self
            .active
            .iter()
            .filter(|n| n.value.is_additive())
            .filter_map(|n| n.priority(controllers))
            .min()
            .unwrap_or(i32::MAX);
        self.additive = self.additive_priority != i32::MAX;
        self.dirty = false;
        self.seen_revision = Some(controllers.revision());

        log::debug!(
            "Mixer '{}' re-sorted: {} active, {} passive",
            self.name,
            self.active.len(),
            self.passive.len()
        );
    }

    /// Composes every active binding into `out`.
    ///
    /// `out.value` seeds lanes that no binding writes.
    pub fn evaluate(&mut self, out: &mut ComputedValue<'_, T>, ctx: &FrameContext<'_>) {
        if self.needs_resort(ctx.controllers) {
            self.resort(ctx.controllers);
        }
        compositor::composite(&mut self.active, self.additive_priority, out, ctx);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True iff the active list was empty after the last re-sort.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// True iff some active binding was additive after the last re-sort.
    #[must_use]
    pub fn is_additive(&self) -> bool {
        self.additive
    }

    /// Lowest priority of an additive active binding, `i32::MAX` if none.
    #[must_use]
    pub fn additive_priority(&self) -> i32 {
        self.additive_priority
    }

    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.active.len() + self.passive.len()
    }

    pub fn active(&self) -> impl Iterator<Item = &BindingNode<T>> {
        self.active.iter()
    }

    pub fn passive(&self) -> impl Iterator<Item = &BindingNode<T>> {
        self.passive.iter()
    }

    fn nodes(&self) -> impl Iterator<Item = &BindingNode<T>> {
        self.active.iter().chain(self.passive.iter())
    }

    fn nodes_mut(&mut self) -> impl Iterator<Item = &mut BindingNode<T>> {
        self.active.iter_mut().chain(self.passive.iter_mut())
    }
}

impl Mixer<Transform> {
    /// A mixer whose joint values are gathered into one compound pose per
    /// controller. See [`add_joint_value`](Self::add_joint_value).
    #[must_use]
    pub fn new_skeleton_pose(name: impl Into<String>) -> Self {
        let mut mixer = Self::new(name);
        mixer.skeleton_pose = true;
        mixer
    }

    /// Binds a joint value.
    ///
    /// On a skeleton-pose mixer, channel values are routed into the compound
    /// pose for `(controller, additive)`, which is created and bound with
    /// `weights` on first use. Pose values, and everything on other mixers,
    /// are bound directly.
    pub fn add_joint_value(
        &mut self,
        controller: ControllerKey,
        value: Box<dyn AnimatedValue<Transform>>,
        weights: WeightTable,
    ) -> Result<()> {
        if !self.skeleton_pose || value.kind() != ValueKind::Channel {
            return self.add_value(controller, value, weights);
        }

        let additive = value.is_additive();
        let compound = self
            .nodes_mut()
            .filter(|n| n.controller == controller)
            .filter_map(|n| n.value.as_any_mut().downcast_mut::<SkeletonPoseCompoundValue>())
            .find(|c| c.is_additive_group() == additive);

        match compound {
            Some(compound) => compound.add_skeleton_value(value, 1.0)?,
            None => {
                let suffix = if additive { " (additive)" } else { "" };
                let mut compound =
                    SkeletonPoseCompoundValue::new(format!("{}{suffix}", self.name), additive);
                compound.add_skeleton_value(value, 1.0)?;
                self.add_value(controller, Box::new(compound), weights)?;
            }
        }
        self.dirty = true;
        Ok(())
    }

    /// The compound pose bound for `(controller, additive)`, if any.
    #[must_use]
    pub fn compound(&self, controller: ControllerKey, additive: bool) -> Option<&SkeletonPoseCompoundValue> {
        self.nodes()
            .filter(|n| n.controller == controller)
            .filter_map(|n| n.value.as_any().downcast_ref::<SkeletonPoseCompoundValue>())
            .find(|c| c.is_additive_group() == additive)
    }
}

impl<T: Blendable> AnimatedValue<T> for Mixer<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn flags(&self) -> ValueFlags {
        let mut flags = ValueFlags::empty();
        flags.set(ValueFlags::DISABLED, self.disabled);
        flags.set(ValueFlags::ADDITIVE, self.additive);
        flags
    }

    fn kind(&self) -> ValueKind {
        if self.skeleton_pose {
            ValueKind::Pose
        } else {
            ValueKind::Channel
        }
    }

    /// A nested mixer ignores the outer controller; its own bindings carry
    /// theirs. The outer weights scale the composed contribution.
    fn compute(
        &mut self,
        out: &mut ComputedValue<'_, T>,
        _controller: &PlaybackController,
        weights: &[f32],
        ctx: &FrameContext<'_>,
    ) {
        self.evaluate(out, ctx);
        for (b, c) in out.contribution.iter_mut().enumerate() {
            *c *= weight_at(weights, b);
        }
    }

    fn collect_irregular_names(&self, names: &mut FxHashSet<String>) {
        for node in self.nodes() {
            node.value.collect_irregular_names(names);
        }
    }

    fn invalidate_cache(&mut self) {
        self.dirty = true;
    }

    fn is_dirty(&self) -> bool {
        self.dirty || self.nodes().any(|n| n.value.is_dirty())
    }

    fn refresh(&mut self, controllers: &ControllerRegistry) {
        if self.needs_resort(controllers) {
            self.resort(controllers);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
