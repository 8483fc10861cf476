use bumpalo::Bump;
use slotmap::{SlotMap, new_key_type};

use crate::animation::controller::ControllerRegistry;
use crate::animation::manager::AnimationManager;
use crate::settings::BlendSettings;

new_key_type! {
    pub struct ManagerKey;
}

/// Animation system.
///
/// Owns the controller set, every per-agent manager and the frame arena,
/// and drives them once per simulation frame.
#[derive(Debug, Default)]
pub struct AnimationSystem {
    pub controllers: ControllerRegistry,
    pub managers: SlotMap<ManagerKey, AnimationManager>,
    pub settings: BlendSettings,
    arena: Bump,
    frame: u64,
}

impl AnimationSystem {
    #[must_use]
    pub fn new(settings: BlendSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn add_manager(&mut self, manager: AnimationManager) -> ManagerKey {
        self.managers.insert(manager)
    }

    /// Number of frames updated so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Advances every controller by `dt` seconds, applies every manager's
    /// pose, then releases the frame's transient buffers.
    pub fn update(&mut self, dt: f32) {
        self.frame += 1;
        self.controllers.advance_all(dt);

        for manager in self.managers.values_mut() {
            manager.update(self.frame, &self.controllers, &self.arena, &self.settings);
        }

        log::trace!(
            "Animation frame {} used {} arena bytes",
            self.frame,
            self.arena.allocated_bytes()
        );
        self.arena.reset();
    }
}
