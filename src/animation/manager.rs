//! Per-agent animation state.
//!
//! An [`AnimationManager`] owns the controllers it created for one agent
//! and the agent's [`SkeletonInstance`]. Playing a clip creates a
//! controller and binds each of the clip's values to the skeleton.

use std::sync::Arc;

use bumpalo::Bump;

use crate::animation::clip::{AnimationClip, ClipValue};
use crate::animation::controller::{ControllerKey, ControllerRegistry};
use crate::errors::{AnimationError, Result};
use crate::scene::skeleton::Skeleton;
use crate::scene::skeleton_instance::SkeletonInstance;
use crate::settings::BlendSettings;

#[derive(Debug)]
pub struct AnimationManager {
    name: String,
    skeleton: Option<SkeletonInstance>,
    controllers: Vec<ControllerKey>,
}

impl AnimationManager {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skeleton: None,
            controllers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_skeleton(mut self, skeleton: Arc<Skeleton>) -> Self {
        self.skeleton = Some(SkeletonInstance::new(skeleton));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn skeleton_instance(&self) -> Option<&SkeletonInstance> {
        self.skeleton.as_ref()
    }

    /// Controllers created by this manager, oldest first.
    #[must_use]
    pub fn controllers(&self) -> &[ControllerKey] {
        &self.controllers
    }

    /// Creates a controller for `clip` and binds the clip's values.
    ///
    /// Transform values go to the skeleton pose. Values of any other shape
    /// are logged and skipped; the rest of the clip still binds. The new
    /// controller is inactive until played.
    pub fn apply_clip(
        &mut self,
        registry: &mut ControllerRegistry,
        clip: &AnimationClip,
        settings: &BlendSettings,
    ) -> Result<ControllerKey> {
        let has_joints = clip
            .values
            .iter()
            .any(|v| matches!(v, ClipValue::Transform(_)));
        if has_joints && self.skeleton.is_none() {
            log::warn!(
                "Manager '{}': clip '{}' animates joints but no skeleton is attached",
                self.name,
                clip.name
            );
            return Err(AnimationError::MissingSkeleton);
        }

        let key = registry.create(clip.name.clone(), clip.length);
        for value in &clip.values {
            let result = match (value, self.skeleton.as_mut()) {
                (ClipValue::Transform(keys), Some(instance)) => instance.add_animated_value(
                    key,
                    Box::new(Arc::clone(keys)),
                    settings.default_weights.clone(),
                ),
                _ => Err(AnimationError::UnsupportedValue {
                    name: value.name().to_owned(),
                    shape: value.shape(),
                    target: "skeleton pose",
                }),
            };
            if let Err(err) = result {
                log::warn!("Manager '{}': clip '{}': {err}", self.name, clip.name);
            }
        }

        self.controllers.push(key);
        Ok(key)
    }

    /// Finds one of this manager's controllers by name, ignoring ASCII case.
    #[must_use]
    pub fn find_controller(&self, registry: &ControllerRegistry, name: &str) -> Option<ControllerKey> {
        self.controllers.iter().copied().find(|&key| {
            registry
                .get(key)
                .is_some_and(|c| c.name().eq_ignore_ascii_case(name))
        })
    }

    /// Unbinds a controller from every mixer and unregisters it.
    pub fn remove_controller(&mut self, registry: &mut ControllerRegistry, key: ControllerKey) -> Result<()> {
        let index = self
            .controllers
            .iter()
            .position(|&k| k == key)
            .ok_or(AnimationError::ControllerNotFound)?;
        self.controllers.remove(index);

        if let Some(instance) = self.skeleton.as_mut() {
            instance.remove_controller(key);
        }
        registry.remove(key);
        Ok(())
    }

    /// Forgets controllers that were unregistered elsewhere and unbinds
    /// their values.
    pub fn prune(&mut self, registry: &ControllerRegistry) {
        let (live, stale): (Vec<_>, Vec<_>) = self
            .controllers
            .iter()
            .copied()
            .partition(|&key| registry.contains(key));
        if stale.is_empty() {
            return;
        }

        if let Some(instance) = self.skeleton.as_mut() {
            for &key in &stale {
                instance.remove_controller(key);
            }
        }
        log::debug!("Manager '{}': pruned {} stale controllers", self.name, stale.len());
        self.controllers = live;
    }

    /// Applies this frame's pose. Memoised per `frame`.
    pub fn update(&mut self, frame: u64, registry: &ControllerRegistry, arena: &Bump, settings: &BlendSettings) {
        if let Some(instance) = self.skeleton.as_mut() {
            instance.update(frame, registry, arena, settings);
        }
    }
}
