use crate::animation::controller::{ControllerKey, ControllerRegistry};
use crate::animation::value::AnimatedValue;
use crate::animation::values::Blendable;
use crate::settings::WeightTable;

/// Links one controller to one animated value inside a mixer.
///
/// `serial` records registration order and breaks ties between bindings of
/// equal priority.
#[derive(Debug)]
pub struct BindingNode<T: Blendable> {
    pub controller: ControllerKey,
    pub value: Box<dyn AnimatedValue<T>>,
    pub weights: WeightTable,
    pub(crate) serial: u64,
}

impl<T: Blendable> BindingNode<T> {
    pub(crate) fn new(
        controller: ControllerKey,
        value: Box<dyn AnimatedValue<T>>,
        weights: WeightTable,
        serial: u64,
    ) -> Self {
        Self {
            controller,
            value,
            weights,
            serial,
        }
    }

    /// The bound controller's priority, or `None` once it is unregistered.
    #[must_use]
    pub fn priority(&self, controllers: &ControllerRegistry) -> Option<i32> {
        controllers.get(self.controller).map(|c| c.priority())
    }

    /// Passive bindings never reach the compositor.
    #[must_use]
    pub fn is_passive(&self, controllers: &ControllerRegistry) -> bool {
        if self.value.is_disabled() {
            return true;
        }
        match controllers.get(self.controller) {
            Some(controller) => controller.is_negligible(),
            None => true,
        }
    }
}
