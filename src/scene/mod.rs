//! Skeleton data and per-agent skeleton state.

pub mod skeleton;
pub mod skeleton_instance;

pub use skeleton::{JointEntry, Skeleton};
pub use skeleton_instance::SkeletonInstance;
