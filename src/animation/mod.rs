//! Animation blend compositing.
//!
//! Leaf values sample data, mixers order their bindings by controller
//! priority, and the compositor folds everything active into one result.
//! Skeleton poses go through a compound value that fans per-joint values
//! into a single pose-shaped binding.

pub mod binding;
pub mod clip;
mod compositor;
pub mod compound;
pub mod computed;
pub mod controller;
pub mod keyframed;
pub mod manager;
pub mod mixer;
pub mod system;
pub mod value;
pub mod values;

pub use binding::BindingNode;
pub use clip::{AnimationClip, ClipValue};
pub use compound::SkeletonPoseCompoundValue;
pub use computed::{ComputedValue, Sample};
pub use controller::{ControllerFlags, ControllerGuard, ControllerKey, ControllerRegistry, PlaybackController};
pub use keyframed::{ConstantValue, Keyframe, KeyframedValue};
pub use manager::AnimationManager;
pub use mixer::Mixer;
pub use system::{AnimationSystem, ManagerKey};
pub use value::{AnimatedValue, FrameContext, ValueFlags, ValueKind};
pub use values::{Blendable, Transform};
