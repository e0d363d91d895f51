//! Action abstraction module
//!
//! This module defines the Action trait and its building blocks:
//! - `Action`: the capability set every schedulable unit implements
//! - `FunctionalAction`: ad hoc actions built from closures
//! - `Sequence` / `Race` / `ParallelAll`: composite combinators

mod composite;
mod functional;

use std::fmt;

use uuid::Uuid;

use crate::mechanism::MechanismSet;

pub use composite::{ParallelAll, Race, Sequence};
pub use functional::FunctionalAction;

/// Action trait - the capability set the scheduler drives.
///
/// Actions are black boxes to the scheduler. Per tick the scheduler invokes
/// `on_execute` exactly once for every running action, then polls
/// `is_finished`. Hooks must be non-blocking: a body that stalls stalls every
/// mechanism on the robot.
pub trait Action {
    /// Human-readable name, used in logs and telemetry.
    fn name(&self) -> &str {
        "action"
    }

    /// Mechanisms this action must own while running. Fixed for the lifetime
    /// of the action.
    fn requirements(&self) -> &MechanismSet;

    /// Whether a conflicting schedule request may cancel this action.
    fn interruptible(&self) -> bool {
        true
    }

    /// Called once when the action is scheduled, before its first execute.
    fn on_start(&mut self) {}

    /// Called once per tick while the action is running.
    fn on_execute(&mut self) {}

    /// Called exactly once when the action leaves the running set.
    /// `interrupted` is true when it was cancelled rather than finishing.
    fn on_end(&mut self, _interrupted: bool) {}

    /// Whether the action has completed its work.
    fn is_finished(&mut self) -> bool;
}

/// Owned, type-erased action as the scheduler stores it.
pub type BoxedAction = Box<dyn Action>;

/// Identity of one scheduled run of an action.
///
/// A fresh ID is minted every time an action instance enters the running
/// set, so re-triggered bindings and telemetry can tell runs apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ActionId(Uuid);

impl ActionId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
