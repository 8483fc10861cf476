use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::animation::keyframed::KeyframedValue;
use crate::animation::values::Transform;

/// One animated channel of a clip, shared by every controller playing it.
#[derive(Debug, Clone)]
pub enum ClipValue {
    Transform(Arc<KeyframedValue<Transform>>),
    Vector3(Arc<KeyframedValue<Vec3>>),
    Quaternion(Arc<KeyframedValue<Quat>>),
    Scalar(Arc<KeyframedValue<f32>>),
}

impl ClipValue {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Transform(v) => v.name(),
            Self::Vector3(v) => v.name(),
            Self::Quaternion(v) => v.name(),
            Self::Scalar(v) => v.name(),
        }
    }

    /// Short name of the sampled type, for diagnostics.
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Transform(_) => "transform",
            Self::Vector3(_) => "vector3",
            Self::Quaternion(_) => "quaternion",
            Self::Scalar(_) => "scalar",
        }
    }

    #[must_use]
    pub fn max_time(&self) -> f32 {
        match self {
            Self::Transform(v) => v.max_time(),
            Self::Vector3(v) => v.max_time(),
            Self::Quaternion(v) => v.max_time(),
            Self::Scalar(v) => v.max_time(),
        }
    }
}

impl From<KeyframedValue<Transform>> for ClipValue {
    fn from(value: KeyframedValue<Transform>) -> Self {
        Self::Transform(Arc::new(value))
    }
}

impl From<KeyframedValue<Vec3>> for ClipValue {
    fn from(value: KeyframedValue<Vec3>) -> Self {
        Self::Vector3(Arc::new(value))
    }
}

impl From<KeyframedValue<Quat>> for ClipValue {
    fn from(value: KeyframedValue<Quat>) -> Self {
        Self::Quaternion(Arc::new(value))
    }
}

impl From<KeyframedValue<f32>> for ClipValue {
    fn from(value: KeyframedValue<f32>) -> Self {
        Self::Scalar(Arc::new(value))
    }
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub length: f32,
    pub values: Vec<ClipValue>,
}

impl AnimationClip {
    /// The clip length defaults to the last key time across all values.
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<ClipValue>) -> Self {
        let length = values
            .iter()
            .map(ClipValue::max_time)
            .fold(0.0_f32, f32::max);

        Self {
            name: name.into(),
            length,
            values,
        }
    }

    #[must_use]
    pub fn with_length(mut self, length: f32) -> Self {
        self.length = length.max(0.0);
        self
    }
}
