//! Blend Settings
//!
//! This module defines the frozen configuration that the compositor and the
//! skeleton consumer read every frame.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_animation::settings::{AdditivePolicy, BlendSettings};
//!
//! // Default: additive layers are applied on top of the blended pose
//! let settings = BlendSettings::default();
//!
//! // Keep the additive bookkeeping but never apply it to joints
//! let settings = BlendSettings {
//!     additive_policy: AdditivePolicy::Disabled,
//!     ..Default::default()
//! };
//! ```

use std::sync::Arc;

/// Maximum number of bones addressed by the default weight table.
pub const MAX_BONES: usize = 256;

/// Smallest contribution a playback controller may carry.
///
/// Controllers below this are classified passive by every mixer.
pub const CONTRIBUTION_EPSILON: f32 = 1e-6;

/// Floor applied to playback time scales.
pub const MIN_TIME_SCALE: f32 = 1e-6;

// ---------------------------------------------------------------------------
// WeightTable
// ---------------------------------------------------------------------------

/// An immutable per-lane weight table.
///
/// Lanes past the end of the table read as full weight, so a short table
/// only needs to list the bones it actually scales.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable(Arc<[f32]>);

impl WeightTable {
    /// A table of `lanes` full weights.
    #[must_use]
    pub fn full(lanes: usize) -> Self {
        Self(vec![1.0; lanes].into())
    }

    #[must_use]
    pub fn from_weights(weights: &[f32]) -> Self {
        Self(weights.into())
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self::full(MAX_BONES)
    }
}

/// Reads lane `lane` of a weight slice, treating missing lanes as full weight.
#[inline]
#[must_use]
pub fn weight_at(weights: &[f32], lane: usize) -> f32 {
    weights.get(lane).copied().unwrap_or(1.0)
}

// ---------------------------------------------------------------------------
// AdditivePolicy
// ---------------------------------------------------------------------------

/// Controls how a finished pose's additive layer reaches the joints.
///
/// The compositor always produces the additive transform and its per-bone
/// attenuation. This policy only governs the consumer.
///
/// | Policy     | Base pose | Additive layer                        |
/// |------------|-----------|---------------------------------------|
/// | `Disabled` | applied   | ignored                               |
/// | `Layered`  | applied   | already attenuated, added on top      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdditivePolicy {
    /// The additive layer is computed but never applied.
    Disabled,
    /// The attenuated additive layer is composed on top of the base pose.
    #[default]
    Layered,
}

// ---------------------------------------------------------------------------
// BlendSettings
// ---------------------------------------------------------------------------

/// Global blend configuration.
///
/// Passed by reference wherever a compute call needs thresholds or the
/// default weight table. It is never mutated during a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendSettings {
    /// Division guard used for all contribution normalisations.
    ///
    /// Default: `1e-6`
    pub epsilon: f32,

    /// A per-bone contribution at or below this is "effectively zero".
    ///
    /// Entries with no bone above it are dropped from their level, and
    /// compound entries with an incoming weight below it are skipped.
    ///
    /// Default: `1e-5`
    pub negligible_contribution: f32,

    /// Stage-A early exit: once every lane's running maximum contribution
    /// exceeds this, lower priority levels are not evaluated.
    ///
    /// Default: `0.9999`
    pub saturation_threshold: f32,

    /// How the consumer applies the additive layer.
    ///
    /// Default: [`AdditivePolicy::Layered`]
    pub additive_policy: AdditivePolicy,

    /// Full-weight table used whenever a binding does not supply its own.
    ///
    /// Default: [`MAX_BONES`] entries of `1.0`
    pub default_weights: WeightTable,
}

impl Default for BlendSettings {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            negligible_contribution: 1e-5,
            saturation_threshold: 0.9999,
            additive_policy: AdditivePolicy::default(),
            default_weights: WeightTable::default(),
        }
    }
}
