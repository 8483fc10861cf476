//! The animated value capability.
//!
//! Everything a mixer can bind implements [`AnimatedValue`]: plain leaf
//! values, generic mixers and the skeleton-pose compound value. Mixers are
//! themselves animated values, so they nest transparently.

use std::any::Any;

use bitflags::bitflags;
use bumpalo::Bump;
use rustc_hash::FxHashSet;

use crate::animation::computed::ComputedValue;
use crate::animation::controller::{ControllerRegistry, PlaybackController};
use crate::animation::values::Blendable;
use crate::scene::skeleton::Skeleton;
use crate::settings::BlendSettings;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ValueFlags: u8 {
        /// Never contributes; always classified passive.
        const DISABLED = 1 << 0;
        /// Uses the uniform default weight on every lane.
        const HOMOGENEOUS = 1 << 1;
        /// Layered on top of the base pose instead of blended against it.
        const ADDITIVE = 1 << 2;
    }
}

/// How a value is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A single named channel, e.g. one joint's transform.
    Channel,
    /// A multi-lane pose covering a whole skeleton.
    Pose,
}

/// Read-only state shared by every compute call within one frame.
#[derive(Clone, Copy)]
pub struct FrameContext<'a> {
    pub controllers: &'a ControllerRegistry,
    pub skeleton: Option<&'a Skeleton>,
    pub arena: &'a Bump,
    pub settings: &'a BlendSettings,
}

impl<'a> FrameContext<'a> {
    #[must_use]
    pub fn new(controllers: &'a ControllerRegistry, arena: &'a Bump, settings: &'a BlendSettings) -> Self {
        Self {
            controllers,
            skeleton: None,
            arena,
            settings,
        }
    }

    #[must_use]
    pub fn with_skeleton(mut self, skeleton: &'a Skeleton) -> Self {
        self.skeleton = Some(skeleton);
        self
    }
}

pub trait AnimatedValue<T: Blendable>: std::fmt::Debug + 'static {
    fn name(&self) -> &str;

    fn flags(&self) -> ValueFlags;

    fn kind(&self) -> ValueKind {
        ValueKind::Channel
    }

    /// Writes this value's lanes into `out`.
    ///
    /// `weights` scales the contribution per lane; lanes past its end are
    /// full weight.
    fn compute(
        &mut self,
        out: &mut ComputedValue<'_, T>,
        controller: &PlaybackController,
        weights: &[f32],
        ctx: &FrameContext<'_>,
    );

    /// Adds the names of channels that do not use the uniform default weight.
    fn collect_irregular_names(&self, names: &mut FxHashSet<String>) {
        if !self.flags().contains(ValueFlags::HOMOGENEOUS) {
            names.insert(self.name().to_owned());
        }
    }

    /// Drops any state derived from the value's inputs.
    fn invalidate_cache(&mut self) {}

    fn is_dirty(&self) -> bool {
        false
    }

    /// Brings derived ordering up to date with the controller set.
    /// Called on every bound value when the owning mixer re-sorts.
    fn refresh(&mut self, _controllers: &ControllerRegistry) {}

    fn is_additive(&self) -> bool {
        self.flags().contains(ValueFlags::ADDITIVE)
    }

    fn is_disabled(&self) -> bool {
        self.flags().contains(ValueFlags::DISABLED)
    }

    /// Values that apply controller mirroring themselves return `true`, and
    /// the compositor leaves their output alone.
    fn handles_mirroring(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
