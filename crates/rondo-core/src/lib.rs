//! # Rondo core
//!
//! The command-arbitration core for a periodically ticked robot:
//!
//! - **Mechanism**: an exclusive-access resource (drivetrain, elevator, ...)
//!   with at most one owning action at a time and an optional default action.
//! - **Action**: a schedulable unit of behaviour with start/execute/end hooks
//!   and a finish predicate, bound to the set of mechanisms it requires.
//! - **Trigger binding**: maps an edge-detected input condition to an action
//!   activation policy.
//! - **Scheduler**: runs one arbitration-and-execute pass per tick, resolving
//!   mechanism conflicts by interrupting interruptible owners and silently
//!   dropping requests that cannot claim every required mechanism.
//!
//! The core is single-threaded and strictly synchronous: the embedding
//! process drives [`Scheduler::tick`] at a fixed rate and nothing inside a
//! tick blocks or suspends.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rondo_core::prelude::*;
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.register_mechanism("intake")?;
//! scheduler.register_default("intake", idle_action)?;
//! scheduler.bind(Binding::while_true(move || pad.borrow().button(Button::B), move || spin_action()));
//!
//! loop {
//!     scheduler.tick(); // once per control period
//! }
//! ```

pub mod action;
pub mod error;
pub mod mechanism;
pub mod scheduler;
pub mod telemetry;
pub mod trigger;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::action::{
        Action, ActionId, BoxedAction, FunctionalAction, ParallelAll, Race, Sequence,
    };
    pub use crate::error::SchedulerError;
    pub use crate::mechanism::{requires, MechanismId, MechanismSet};
    pub use crate::scheduler::Scheduler;
    pub use crate::telemetry::{BroadcastTelemetry, TelemetryEvent, TelemetrySink};
    pub use crate::trigger::{Binding, EdgeMode};
}

// Re-export key types at crate root
pub use action::{Action, ActionId, BoxedAction};
pub use error::SchedulerError;
pub use mechanism::{MechanismId, MechanismSet};
pub use scheduler::Scheduler;
pub use telemetry::{BroadcastTelemetry, TelemetryEvent, TelemetrySink};
pub use trigger::{Binding, EdgeMode};
