use std::sync::atomic::{AtomicU32, Ordering};

use crate::animation::values::Transform;

static NEXT_SKELETON_SERIAL: AtomicU32 = AtomicU32::new(1);

#[derive(Debug, Clone, PartialEq)]
pub struct JointEntry {
    pub name: String,
    pub parent: Option<usize>,
    /// The joint's left/right counterpart, used when playback is mirrored.
    pub mirror: Option<usize>,
    /// Rest pose, joint-local.
    pub rest: Transform,
}

impl JointEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            parent,
            mirror: None,
            rest: Transform::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_mirror(mut self, mirror: usize) -> Self {
        self.mirror = Some(mirror);
        self
    }

    #[must_use]
    pub fn with_rest(mut self, rest: Transform) -> Self {
        self.rest = rest;
        self
    }
}

/// Read-only skeleton data shared by every instance of the skeleton.
///
/// Each skeleton receives a process-wide unique, monotonically increasing
/// serial. Pose bone caches are keyed by it, so a rebuilt skeleton (new
/// serial) invalidates them even if it reuses joint names.
#[derive(Debug)]
pub struct Skeleton {
    serial: u32,
    pub name: String,
    joints: Vec<JointEntry>,
}

impl Skeleton {
    #[must_use]
    pub fn new(name: impl Into<String>, joints: Vec<JointEntry>) -> Self {
        Self {
            serial: NEXT_SKELETON_SERIAL.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            joints,
        }
    }

    #[must_use]
    pub fn serial(&self) -> u32 {
        self.serial
    }

    #[must_use]
    pub fn joints(&self) -> &[JointEntry] {
        &self.joints
    }

    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Case-insensitive joint lookup.
    #[must_use]
    pub fn find_joint(&self, name: &str) -> Option<usize> {
        self.joints
            .iter()
            .position(|j| j.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn mirror_of(&self, index: usize) -> Option<usize> {
        self.joints.get(index).and_then(|j| j.mirror)
    }

    pub fn rest_pose(&self) -> impl Iterator<Item = Transform> + '_ {
        self.joints.iter().map(|j| j.rest)
    }
}
