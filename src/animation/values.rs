use glam::{Quat, Vec3};

/// A value type the compositor knows how to blend.
///
/// `IDENTITY` doubles as the neutral additive layer: adding it changes
/// nothing, and a lane nobody writes to keeps it.
pub trait Blendable: Copy + std::fmt::Debug + PartialEq + 'static {
    const IDENTITY: Self;

    /// Moves `start` toward `end` by `t` in place.
    fn blend(start: &mut Self, end: &Self, t: f32);

    /// Layers `adding` on top of `current`, scaled by `mix`.
    fn blend_additive(current: Self, adding: Self, mix: f32) -> Self;

    /// Reflects the value across the skeleton's sagittal plane.
    fn mirror(self) -> Self;

    /// Scales an additive sample by its contribution.
    fn scale_additive(self, contribution: f32) -> Self;

    fn finalise(self) -> Self {
        self
    }

    fn interpolate_catmull_rom(p0: Self, p1: Self, p2: Self, p3: Self, t: f32) -> Self;
}

#[inline]
fn catmull_rom_weights(t: f32) -> [f32; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}

impl Blendable for f32 {
    const IDENTITY: Self = 0.0;

    fn blend(start: &mut Self, end: &Self, t: f32) {
        if t >= 1.0 {
            *start = *end;
        } else if t > 0.0 {
            *start += (*end - *start) * t;
        }
    }

    fn blend_additive(current: Self, adding: Self, mix: f32) -> Self {
        current + adding * mix
    }

    fn mirror(self) -> Self {
        self
    }

    fn scale_additive(self, contribution: f32) -> Self {
        self * contribution
    }

    fn interpolate_catmull_rom(p0: Self, p1: Self, p2: Self, p3: Self, t: f32) -> Self {
        let [s0, s1, s2, s3] = catmull_rom_weights(t);
        s0 * p0 + s1 * p1 + s2 * p2 + s3 * p3
    }
}

impl Blendable for Vec3 {
    const IDENTITY: Self = Vec3::ZERO;

    fn blend(start: &mut Self, end: &Self, t: f32) {
        if t >= 1.0 {
            *start = *end;
        } else if t > 0.0 {
            *start = start.lerp(*end, t);
        }
    }

    fn blend_additive(current: Self, adding: Self, mix: f32) -> Self {
        current + adding * mix
    }

    fn mirror(self) -> Self {
        Vec3::new(-self.x, self.y, self.z)
    }

    fn scale_additive(self, contribution: f32) -> Self {
        self * contribution
    }

    fn interpolate_catmull_rom(p0: Self, p1: Self, p2: Self, p3: Self, t: f32) -> Self {
        let [s0, s1, s2, s3] = catmull_rom_weights(t);
        p0 * s0 + p1 * s1 + p2 * s2 + p3 * s3
    }
}

impl Blendable for Quat {
    const IDENTITY: Self = Quat::IDENTITY;

    fn blend(start: &mut Self, end: &Self, t: f32) {
        if t >= 1.0 {
            *start = *end;
        } else if t > 0.0 {
            *start = start.slerp(*end, t);
        }
    }

    fn blend_additive(current: Self, adding: Self, mix: f32) -> Self {
        adding.scale_additive(mix) * current
    }

    fn mirror(self) -> Self {
        Quat::from_xyzw(self.x, -self.y, -self.z, self.w)
    }

    fn scale_additive(self, contribution: f32) -> Self {
        let mut scaled = Quat::IDENTITY;
        Quat::blend(&mut scaled, &self, contribution);
        scaled
    }

    fn finalise(self) -> Self {
        self.normalize()
    }

    // Rotations do not take tangents; the spline degrades to a slerp between
    // the inner keys.
    fn interpolate_catmull_rom(_p0: Self, p1: Self, p2: Self, _p3: Self, t: f32) -> Self {
        p1.slerp(p2, t)
    }
}

/// A joint-local rigid transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub rotation: Quat,
    pub position: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        position: Vec3::ZERO,
    };

    #[must_use]
    pub fn new(rotation: Quat, position: Vec3) -> Self {
        Self { rotation, position }
    }

    #[must_use]
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            position: Vec3::ZERO,
        }
    }

    #[must_use]
    pub fn from_translation(position: Vec3) -> Self {
        Self {
            rotation: Quat::IDENTITY,
            position,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Blendable for Transform {
    const IDENTITY: Self = Transform::IDENTITY;

    fn blend(start: &mut Self, end: &Self, t: f32) {
        Quat::blend(&mut start.rotation, &end.rotation, t);
        Vec3::blend(&mut start.position, &end.position, t);
    }

    fn blend_additive(current: Self, adding: Self, mix: f32) -> Self {
        Self {
            rotation: Quat::blend_additive(current.rotation, adding.rotation, mix),
            position: Vec3::blend_additive(current.position, adding.position, mix),
        }
    }

    fn mirror(self) -> Self {
        Self {
            rotation: self.rotation.mirror(),
            position: self.position.mirror(),
        }
    }

    fn scale_additive(self, contribution: f32) -> Self {
        Self {
            rotation: self.rotation.scale_additive(contribution),
            position: self.position.scale_additive(contribution),
        }
    }

    fn finalise(self) -> Self {
        Self {
            rotation: self.rotation.normalize(),
            position: self.position,
        }
    }

    fn interpolate_catmull_rom(p0: Self, p1: Self, p2: Self, p3: Self, t: f32) -> Self {
        Self {
            rotation: Quat::interpolate_catmull_rom(p0.rotation, p1.rotation, p2.rotation, p3.rotation, t),
            position: Vec3::interpolate_catmull_rom(p0.position, p1.position, p2.position, p3.position, t),
        }
    }
}
