//! Priority-layered animation blend compositing.
//!
//! Once per frame, every animated skeleton combines all of its playing
//! clips into one array of joint-local transforms. Each clip is driven by
//! a [`PlaybackController`] with its own priority, contribution, mirroring
//! and additive settings.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use myth_animation::prelude::*;
//!
//! let skeleton = Arc::new(Skeleton::new("hero", joints));
//! let mut system = AnimationSystem::default();
//! let agent = system.add_manager(AnimationManager::new("hero").with_skeleton(skeleton));
//!
//! let walk = system.managers[agent].apply_clip(&mut system.controllers, &clip, &system.settings)?;
//! if let Some(mut c) = system.controllers.get_mut(walk) {
//!     c.set_looping(true);
//!     c.play();
//! }
//! system.update(1.0 / 60.0);
//! ```

pub mod animation;
pub mod errors;
pub mod scene;
pub mod settings;

pub use animation::{
    AnimatedValue, AnimationClip, AnimationManager, AnimationSystem, Blendable, ComputedValue, ControllerKey,
    ControllerRegistry, Mixer, PlaybackController, Transform,
};
pub use errors::{AnimationError, Result};
pub use scene::{JointEntry, Skeleton, SkeletonInstance};
pub use settings::{AdditivePolicy, BlendSettings, WeightTable};

pub mod prelude {
    pub use crate::animation::{
        AnimatedValue, AnimationClip, AnimationManager, AnimationSystem, Blendable, ClipValue, ComputedValue,
        ConstantValue, ControllerKey, ControllerRegistry, FrameContext, Keyframe, KeyframedValue, Mixer,
        PlaybackController, Sample, SkeletonPoseCompoundValue, Transform, ValueFlags, ValueKind,
    };
    pub use crate::errors::{AnimationError, Result};
    pub use crate::scene::{JointEntry, Skeleton, SkeletonInstance};
    pub use crate::settings::{AdditivePolicy, BlendSettings, WeightTable};
}
