//! Trigger bindings: edge-detected input conditions mapped to actions.
//!
//! A binding pairs a boolean condition closure with an activation policy and
//! an action factory. The scheduler samples every condition exactly once per
//! tick, before any scheduling decision, so all bindings observe the same
//! input snapshot. Every activation constructs a fresh action instance from
//! the factory; instances are never reused across activations.

use crate::action::{ActionId, BoxedAction};

/// Activation policy for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMode {
    /// Request the action every tick the condition holds (a no-op while the
    /// previous instance is still running) and cancel it when the condition
    /// drops.
    WhileTrue,
    /// Request the action once on the false-to-true transition.
    OnRising,
    /// Request the action once on the true-to-false transition.
    OnFalling,
    /// Request on the rising edge, cancel on the falling edge.
    OnRisingThenFalling,
}

type Condition = Box<dyn FnMut() -> bool>;
type Factory = Box<dyn FnMut() -> BoxedAction>;

/// One entry of the binding table.
pub struct Binding {
    pub(crate) mode: EdgeMode,
    pub(crate) condition: Condition,
    pub(crate) factory: Factory,
}

impl Binding {
    pub fn new(
        mode: EdgeMode,
        condition: impl FnMut() -> bool + 'static,
        factory: impl FnMut() -> BoxedAction + 'static,
    ) -> Self {
        Self {
            mode,
            condition: Box::new(condition),
            factory: Box::new(factory),
        }
    }

    pub fn while_true(
        condition: impl FnMut() -> bool + 'static,
        factory: impl FnMut() -> BoxedAction + 'static,
    ) -> Self {
        Self::new(EdgeMode::WhileTrue, condition, factory)
    }

    pub fn on_rising(
        condition: impl FnMut() -> bool + 'static,
        factory: impl FnMut() -> BoxedAction + 'static,
    ) -> Self {
        Self::new(EdgeMode::OnRising, condition, factory)
    }

    pub fn on_falling(
        condition: impl FnMut() -> bool + 'static,
        factory: impl FnMut() -> BoxedAction + 'static,
    ) -> Self {
        Self::new(EdgeMode::OnFalling, condition, factory)
    }

    pub fn on_rising_then_falling(
        condition: impl FnMut() -> bool + 'static,
        factory: impl FnMut() -> BoxedAction + 'static,
    ) -> Self {
        Self::new(EdgeMode::OnRisingThenFalling, condition, factory)
    }
}

/// Scheduler-private binding state: the previous condition sample and the
/// run the binding believes it started most recently.
pub(crate) struct BindingSlot {
    pub(crate) binding: Binding,
    pub(crate) previous: bool,
    pub(crate) live: Option<ActionId>,
}

impl BindingSlot {
    pub(crate) fn new(binding: Binding) -> Self {
        Self {
            binding,
            previous: false,
            live: None,
        }
    }
}
