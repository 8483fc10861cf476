//! Frame-scoped compute buffers.
//!
//! A [`ComputedValue`] is a set of parallel per-lane slices (one lane per
//! bone for skeleton poses, a single lane for everything else). Buffers come
//! from the caller's [`Bump`] arena and are never freed individually; they
//! all go away when the arena is reset at the end of the frame.

use bumpalo::Bump;

use crate::animation::values::Blendable;

/// Per-lane output of one compute call.
#[derive(Debug)]
pub struct ComputedValue<'a, T> {
    pub value: &'a mut [T],
    pub additive_value: &'a mut [T],
    pub contribution: &'a mut [f32],
    /// Per-lane additive attenuation.
    pub additive_mix: &'a mut [f32],
}

impl<'a, T: Blendable> ComputedValue<'a, T> {
    /// Allocates `lanes` identity lanes with zero contribution.
    #[must_use]
    pub fn alloc(arena: &'a Bump, lanes: usize) -> Self {
        Self {
            value: arena.alloc_slice_fill_copy(lanes, T::IDENTITY),
            additive_value: arena.alloc_slice_fill_copy(lanes, T::IDENTITY),
            contribution: arena.alloc_slice_fill_copy(lanes, 0.0),
            additive_mix: arena.alloc_slice_fill_copy(lanes, 1.0),
        }
    }

    /// Allocates one lane per `seed` element, copying the seed into `value`.
    ///
    /// Lanes that are never written keep the seed, so callers can
    /// pre-initialise untouched bones (typically with the rest pose).
    #[must_use]
    pub fn alloc_seeded(arena: &'a Bump, seed: &[T]) -> Self {
        let lanes = seed.len();
        Self {
            value: arena.alloc_slice_copy(seed),
            additive_value: arena.alloc_slice_fill_copy(lanes, T::IDENTITY),
            contribution: arena.alloc_slice_fill_copy(lanes, 0.0),
            additive_mix: arena.alloc_slice_fill_copy(lanes, 1.0),
        }
    }

    /// Views a single-lane [`Sample`] as a computed value.
    #[must_use]
    pub fn from_sample(sample: &'a mut Sample<T>) -> Self {
        let Sample {
            value,
            additive_value,
            contribution,
            additive_mix,
        } = sample;
        Self {
            value: std::slice::from_mut(value),
            additive_value: std::slice::from_mut(additive_value),
            contribution: std::slice::from_mut(contribution),
            additive_mix: std::slice::from_mut(additive_mix),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Borrows lane `lane` as a single-lane view.
    ///
    /// # Panics
    ///
    /// Panics if `lane` is out of range.
    pub fn lane(&mut self, lane: usize) -> ComputedValue<'_, T> {
        ComputedValue {
            value: std::slice::from_mut(&mut self.value[lane]),
            additive_value: std::slice::from_mut(&mut self.additive_value[lane]),
            contribution: std::slice::from_mut(&mut self.contribution[lane]),
            additive_mix: std::slice::from_mut(&mut self.additive_mix[lane]),
        }
    }

    /// Writes one sampled value into `lane`.
    ///
    /// A base sample replaces the lane value and leaves `1 - contribution`
    /// of room for additive layers. An additive sample is scaled into the
    /// additive layer and contributes nothing to the base pose.
    pub fn output(&mut self, lane: usize, additive: bool, value: T, contribution: f32) {
        if additive {
            self.additive_value[lane] = value.scale_additive(contribution);
            self.contribution[lane] = 0.0;
            self.additive_mix[lane] = 1.0;
        } else {
            self.value[lane] = value;
            self.contribution[lane] = contribution;
            self.additive_mix[lane] = 1.0 - contribution;
        }
    }

    /// Mirrors either the additive layer or every base lane that carries a
    /// contribution. Base lanes with none still hold the caller's seed.
    pub fn mirror(&mut self, additive: bool) {
        if additive {
            for v in self.additive_value.iter_mut() {
                *v = v.mirror();
            }
            return;
        }
        for (v, &c) in self.value.iter_mut().zip(self.contribution.iter()) {
            if c > 0.0 {
                *v = v.mirror();
            }
        }
    }
}

/// Owned storage for a single-lane compute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<T> {
    pub value: T,
    pub additive_value: T,
    pub contribution: f32,
    pub additive_mix: f32,
}

impl<T: Blendable> Sample<T> {
    /// A sample that starts at `seed` with no contribution.
    #[must_use]
    pub fn new(seed: T) -> Self {
        Self {
            value: seed,
            additive_value: T::IDENTITY,
            contribution: 0.0,
            additive_mix: 1.0,
        }
    }
}

impl<T: Blendable> Default for Sample<T> {
    fn default() -> Self {
        Self::new(T::IDENTITY)
    }
}
