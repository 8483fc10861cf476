//! Playback controllers and the scene-level controller set.
//!
//! A [`PlaybackController`] is the state of one clip being played: time,
//! priority, contribution and a handful of flags. Controllers live in a
//! [`ControllerRegistry`] and are referred to everywhere else by
//! [`ControllerKey`].
//!
//! Every setter is total: out-of-range inputs are clamped rather than
//! rejected.

use bitflags::bitflags;
use slotmap::{SlotMap, new_key_type};

use crate::settings::{CONTRIBUTION_EPSILON, MIN_TIME_SCALE};

new_key_type! {
    pub struct ControllerKey;
}

bitflags! {
    /// Playback state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ControllerFlags: u8 {
        const ACTIVE = 1 << 0;
        const PAUSED = 1 << 1;
        const LOOPING = 1 << 2;
        const MIRRORED = 1 << 3;
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackController {
    name: String,
    time: f32,
    length: f32,
    time_scale: f32,
    priority: i32,
    contribution: f32,
    additive_mix: f32,
    flags: ControllerFlags,
}

impl PlaybackController {
    /// Creates an inactive controller for a clip of `length` seconds.
    #[must_use]
    pub fn new(name: impl Into<String>, length: f32) -> Self {
        Self {
            name: name.into(),
            time: 0.0,
            length: length.max(0.0),
            time_scale: 1.0,
            priority: 0,
            contribution: 1.0,
            additive_mix: 1.0,
            flags: ControllerFlags::empty(),
        }
    }

    // === Playback ===

    pub fn play(&mut self) {
        if self.is_active() {
            return;
        }
        self.flags.insert(ControllerFlags::ACTIVE);
        self.flags.remove(ControllerFlags::PAUSED);
        self.time = 0.0;
    }

    pub fn stop(&mut self) {
        if !self.is_active() {
            return;
        }
        self.flags.remove(ControllerFlags::ACTIVE | ControllerFlags::PAUSED);
        self.time = 0.0;
    }

    /// Pauses or resumes. Ignored while inactive.
    pub fn pause(&mut self, paused: bool) {
        if self.is_active() {
            self.flags.set(ControllerFlags::PAUSED, paused);
        }
    }

    /// Advances playback by `dt` seconds of scaled time.
    ///
    /// Running past the end wraps when looping and stops otherwise.
    pub fn advance(&mut self, dt: f32) {
        if !self.is_playing() {
            return;
        }

        let time = (self.time + dt * self.time_scale).max(0.0);
        if time < self.length {
            self.time = time;
        } else if self.is_looping() {
            self.time = if self.length > 0.0 { time % self.length } else { 0.0 };
        } else {
            self.stop();
        }
    }

    /// Seeks to `time`, clamped into `[0, length]`. Ignored while inactive.
    /// NaN seeks to the start.
    pub fn set_time(&mut self, time: f32) {
        if !self.is_active() {
            return;
        }
        self.time = if time.is_nan() {
            0.0
        } else {
            time.clamp(0.0, self.length)
        };
    }

    /// Seeks to a fraction of the clip length.
    pub fn set_time_fractional(&mut self, fraction: f32) {
        self.set_time(fraction * self.length);
    }

    // === Blend parameters ===

    /// Sets the contribution, clamped into `[CONTRIBUTION_EPSILON, 1]`.
    pub fn set_contribution(&mut self, contribution: f32) {
        // NaN collapses to the floor so the result stays in range.
        self.contribution = if contribution.is_nan() {
            CONTRIBUTION_EPSILON
        } else {
            contribution.clamp(CONTRIBUTION_EPSILON, 1.0)
        };
    }

    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale.max(MIN_TIME_SCALE);
    }

    /// Sets the additive mix, clamped into `[0, 1]`. NaN collapses to 0.
    pub fn set_additive_mix(&mut self, mix: f32) {
        self.additive_mix = if mix.is_nan() { 0.0 } else { mix.clamp(0.0, 1.0) };
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.flags.set(ControllerFlags::LOOPING, looping);
    }

    pub fn set_mirrored(&mut self, mirrored: bool) {
        self.flags.set(ControllerFlags::MIRRORED, mirrored);
    }

    // === Accessors ===

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    #[must_use]
    pub fn length(&self) -> f32 {
        self.length
    }

    #[must_use]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    #[must_use]
    pub fn contribution(&self) -> f32 {
        self.contribution
    }

    #[must_use]
    pub fn additive_mix(&self) -> f32 {
        self.additive_mix
    }

    #[must_use]
    pub fn flags(&self) -> ControllerFlags {
        self.flags
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.flags.contains(ControllerFlags::ACTIVE)
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.flags.contains(ControllerFlags::PAUSED)
    }

    /// Active and not paused.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.is_active() && !self.is_paused()
    }

    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.flags.contains(ControllerFlags::LOOPING)
    }

    #[must_use]
    pub fn is_mirrored(&self) -> bool {
        self.flags.contains(ControllerFlags::MIRRORED)
    }

    /// Below the passive threshold every mixer ignores this controller.
    #[must_use]
    pub fn is_negligible(&self) -> bool {
        self.contribution < CONTRIBUTION_EPSILON
    }
}

// ============================================================================
// Registry
// ============================================================================

/// The scene-level set of live controllers.
///
/// Mixers cache a sort order derived from controller priorities. The
/// registry keeps a revision counter that moves whenever something that
/// order depends on changes, so mixers know when to re-sort.
#[derive(Debug, Default)]
pub struct ControllerRegistry {
    controllers: SlotMap<ControllerKey, PlaybackController>,
    revision: u64,
}

impl ControllerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new inactive controller.
    pub fn create(&mut self, name: impl Into<String>, length: f32) -> ControllerKey {
        let name = name.into();
        log::trace!("Registering playback controller '{name}'");
        self.controllers.insert(PlaybackController::new(name, length))
    }

    /// Unregisters a controller. Bindings that still point at it go passive
    /// on their mixer's next re-sort.
    pub fn remove(&mut self, key: ControllerKey) -> Option<PlaybackController> {
        let removed = self.controllers.remove(key)?;
        self.revision = self.revision.wrapping_add(1);
        Some(removed)
    }

    #[must_use]
    pub fn get(&self, key: ControllerKey) -> Option<&PlaybackController> {
        self.controllers.get(key)
    }

    /// Mutable access through a guard that bumps the revision on drop if
    /// the controller's priority or passive classification changed.
    pub fn get_mut(&mut self, key: ControllerKey) -> Option<ControllerGuard<'_>> {
        let controller = self.controllers.get_mut(key)?;
        Some(ControllerGuard::new(controller, &mut self.revision))
    }

    #[must_use]
    pub fn contains(&self, key: ControllerKey) -> bool {
        self.controllers.contains_key(key)
    }

    /// Finds a controller by name, ignoring ASCII case.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<ControllerKey> {
        self.controllers
            .iter()
            .find(|(_, c)| c.name.eq_ignore_ascii_case(name))
            .map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ControllerKey, &PlaybackController)> {
        self.controllers.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Advances every controller. Playback state does not affect sort
    /// order, so the revision is left alone.
    pub fn advance_all(&mut self, dt: f32) {
        for controller in self.controllers.values_mut() {
            controller.advance(dt);
        }
    }
}

/// Mutable controller guard. See [`ControllerRegistry::get_mut`].
pub struct ControllerGuard<'a> {
    controller: &'a mut PlaybackController,
    revision: &'a mut u64,
    priority: i32,
    negligible: bool,
}

impl<'a> ControllerGuard<'a> {
    fn new(controller: &'a mut PlaybackController, revision: &'a mut u64) -> Self {
        let priority = controller.priority;
        let negligible = controller.is_negligible();
        Self {
            controller,
            revision,
            priority,
            negligible,
        }
    }
}

impl std::ops::Deref for ControllerGuard<'_> {
    type Target = PlaybackController;

    fn deref(&self) -> &Self::Target {
        self.controller
    }
}

impl std::ops::DerefMut for ControllerGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.controller
    }
}

impl Drop for ControllerGuard<'_> {
    fn drop(&mut self) {
        if self.controller.priority != self.priority
            || self.controller.is_negligible() != self.negligible
        {
            *self.revision = self.revision.wrapping_add(1);
        }
    }
}
