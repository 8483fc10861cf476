//! Leaf animated values.
//!
//! Leaves are the only values that sample data. They write lane 0 of the
//! output with contribution `weights[0] * controller.contribution()`.

use std::any::Any;
use std::sync::Arc;

use crate::animation::computed::ComputedValue;
use crate::animation::controller::PlaybackController;
use crate::animation::value::{AnimatedValue, FrameContext, ValueFlags};
use crate::animation::values::Blendable;
use crate::settings::weight_at;

fn leaf_contribution(weights: &[f32], controller: &PlaybackController) -> f32 {
    weight_at(weights, 0) * controller.contribution()
}

// ============================================================================
// ConstantValue
// ============================================================================

/// A value that samples to the same thing at every time.
#[derive(Debug, Clone)]
pub struct ConstantValue<T> {
    name: String,
    flags: ValueFlags,
    value: T,
}

impl<T: Blendable> ConstantValue<T> {
    #[must_use]
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            flags: ValueFlags::empty(),
            value,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: ValueFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn additive(self) -> Self {
        let flags = self.flags | ValueFlags::ADDITIVE;
        self.with_flags(flags)
    }

    #[must_use]
    pub fn value(&self) -> T {
        self.value
    }

    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }
}

impl<T: Blendable> AnimatedValue<T> for ConstantValue<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn flags(&self) -> ValueFlags {
        self.flags
    }

    fn compute(
        &mut self,
        out: &mut ComputedValue<'_, T>,
        controller: &PlaybackController,
        weights: &[f32],
        _ctx: &FrameContext<'_>,
    ) {
        if out.is_empty() {
            return;
        }
        let c = leaf_contribution(weights, controller);
        out.output(0, self.is_additive(), self.value.finalise(), c);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// KeyframedValue
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
    /// Spline toward the next key. When unset the key holds until the next.
    pub interpolate_to_next: bool,
}

impl<T> Keyframe<T> {
    #[must_use]
    pub fn new(time: f32, value: T) -> Self {
        Self {
            time,
            value,
            interpolate_to_next: true,
        }
    }

    #[must_use]
    pub fn step(time: f32, value: T) -> Self {
        Self {
            time,
            value,
            interpolate_to_next: false,
        }
    }
}

/// A time-sorted list of keys sampled at the controller's time.
#[derive(Debug, Clone)]
pub struct KeyframedValue<T> {
    name: String,
    flags: ValueFlags,
    keys: Vec<Keyframe<T>>,
}

impl<T: Blendable> KeyframedValue<T> {
    /// Keys are sorted by time on construction.
    #[must_use]
    pub fn new(name: impl Into<String>, mut keys: Vec<Keyframe<T>>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            name: name.into(),
            flags: ValueFlags::empty(),
            keys,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: ValueFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn additive(self) -> Self {
        let flags = self.flags | ValueFlags::ADDITIVE;
        self.with_flags(flags)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn keys(&self) -> &[Keyframe<T>] {
        &self.keys
    }

    /// Time of the last key, or zero when empty.
    #[must_use]
    pub fn max_time(&self) -> f32 {
        self.keys.last().map_or(0.0, |k| k.time)
    }

    /// Samples at `time`. Times outside the keyed range clamp to the first
    /// or last key, and NaN reads as the first key. Returns `None` when
    /// there are no keys.
    #[must_use]
    pub fn sample(&self, time: f32) -> Option<T> {
        let first = self.keys.first()?;
        let last = self.keys.last()?;

        if self.keys.len() == 1 || time.is_nan() || time < first.time {
            return Some(first.value.finalise());
        }
        if time >= last.time {
            return Some(last.value.finalise());
        }

        // First key strictly after `time`; guaranteed in 1..len here.
        let next = self.keys.partition_point(|k| k.time <= time).max(1);
        let low = next - 1;
        let k1 = &self.keys[low];
        if !k1.interpolate_to_next {
            return Some(k1.value.finalise());
        }

        let k0 = &self.keys[low.saturating_sub(1)];
        let k2 = &self.keys[next];
        let k3 = &self.keys[(next + 1).min(self.keys.len() - 1)];

        let dt = k2.time - k1.time;
        let t = if dt > 0.0 { (time - k1.time) / dt } else { 0.0 };
        Some(T::interpolate_catmull_rom(k0.value, k1.value, k2.value, k3.value, t).finalise())
    }

    fn write(&self, out: &mut ComputedValue<'_, T>, controller: &PlaybackController, weights: &[f32]) {
        if out.is_empty() {
            return;
        }
        // No keys: the lane keeps its seed and contributes nothing.
        if let Some(value) = self.sample(controller.time()) {
            let c = leaf_contribution(weights, controller);
            out.output(0, self.flags.contains(ValueFlags::ADDITIVE), value, c);
        }
    }
}

impl<T: Blendable> AnimatedValue<T> for KeyframedValue<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn flags(&self) -> ValueFlags {
        self.flags
    }

    fn compute(
        &mut self,
        out: &mut ComputedValue<'_, T>,
        controller: &PlaybackController,
        weights: &[f32],
        _ctx: &FrameContext<'_>,
    ) {
        self.write(out, controller, weights);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Clip data is shared between every controller playing the clip.
impl<T: Blendable> AnimatedValue<T> for Arc<KeyframedValue<T>> {
    fn name(&self) -> &str {
        &self.name
    }

    fn flags(&self) -> ValueFlags {
        self.flags
    }

    fn compute(
        &mut self,
        out: &mut ComputedValue<'_, T>,
        controller: &PlaybackController,
        weights: &[f32],
        _ctx: &FrameContext<'_>,
    ) {
        self.write(out, controller, weights);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
