//! The scheduler - one arbitration-and-run pass per tick.
//!
//! Phase order inside [`Scheduler::tick`], fixed by contract:
//!
//! 1. Sample every binding condition once against the stored previous value.
//! 2. Resolve fired bindings into schedule requests and falling-edge cancels.
//! 3. All-or-nothing acquisition: a request claims every required mechanism
//!    or is dropped for this tick. Interruptible owners are cancelled
//!    (`on_end(true)`) before the new owner is installed; a single
//!    non-interruptible owner rejects the whole request.
//! 4. `on_start` for newly scheduled actions (before any execute runs).
//! 5. `on_execute` for every running action, in scheduling order.
//! 6. Finish sweep: finished actions release their mechanisms and get
//!    `on_end(false)`.
//! 7. Default bodies run for every mechanism left unowned.
//!
//! Scheduling conflicts are not errors. The losing request simply does not
//! start this tick; it is never queued.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::action::{ActionId, BoxedAction};
use crate::error::SchedulerError;
use crate::mechanism::MechanismId;
use crate::telemetry::{TelemetryEvent, TelemetrySink};
use crate::trigger::{Binding, BindingSlot, EdgeMode};

struct MechanismState {
    owner: Option<ActionId>,
    default_action: Option<BoxedAction>,
}

struct RunningEntry {
    id: ActionId,
    action: BoxedAction,
}

/// The orchestration core: mechanism ownership, the running set, and the
/// binding table.
#[derive(Default)]
pub struct Scheduler {
    mechanisms: BTreeMap<MechanismId, MechanismState>,
    running: Vec<RunningEntry>,
    bindings: Vec<BindingSlot>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    ticks: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a fire-and-forget telemetry sink.
    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Register a mechanism. Mechanisms are created once at startup and
    /// never removed.
    pub fn register_mechanism(
        &mut self,
        id: impl Into<MechanismId>,
    ) -> Result<(), SchedulerError> {
        let id = id.into();
        if self.mechanisms.contains_key(&id) {
            return Err(SchedulerError::DuplicateMechanism(id));
        }
        self.mechanisms.insert(
            id,
            MechanismState {
                owner: None,
                default_action: None,
            },
        );
        Ok(())
    }

    /// Set the fallback action for a mechanism. The action must require
    /// exactly that mechanism; anything else is a wiring error.
    pub fn register_default(
        &mut self,
        id: impl Into<MechanismId>,
        action: BoxedAction,
    ) -> Result<(), SchedulerError> {
        let id = id.into();
        let expected: crate::mechanism::MechanismSet = [id.clone()].into_iter().collect();
        if action.requirements() != &expected {
            return Err(SchedulerError::DefaultRequirements {
                mechanism: id,
                action: action.name().to_string(),
            });
        }
        let state = self
            .mechanisms
            .get_mut(&id)
            .ok_or(SchedulerError::UnknownMechanism(id))?;
        state.default_action = Some(action);
        Ok(())
    }

    /// Add a binding table entry. Conflicts are resolved at schedule time,
    /// not here.
    pub fn bind(&mut self, binding: Binding) {
        self.bindings.push(BindingSlot::new(binding));
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Whether the given run is still in the running set.
    pub fn is_running(&self, id: ActionId) -> bool {
        self.running.iter().any(|entry| entry.id == id)
    }

    /// Current owner of a mechanism, if any non-default action holds it.
    pub fn owner_of(&self, id: &MechanismId) -> Option<ActionId> {
        self.mechanisms.get(id).and_then(|state| state.owner)
    }

    /// Number of running actions.
    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Try to schedule an action immediately (outside the binding table;
    /// used for autonomous routines and tests). Returns the run ID on
    /// success and `None` when the action could not claim every required
    /// mechanism; the action is dropped in that case.
    pub fn schedule(&mut self, mut action: BoxedAction) -> Option<ActionId> {
        let requirements = action.requirements().clone();

        for mechanism in &requirements {
            if !self.mechanisms.contains_key(mechanism) {
                // A request naming an unregistered mechanism is a wiring
                // bug, not a runtime conflict. Loudly reject it.
                tracing::error!(
                    mechanism = %mechanism,
                    action = action.name(),
                    "schedule rejected: unknown mechanism"
                );
                self.emit(
                    TelemetryEvent::new("action_rejected")
                        .with_action(action.name())
                        .with_message(format!("unknown mechanism '{mechanism}'")),
                );
                return None;
            }
        }

        let mut owners: Vec<ActionId> = Vec::new();
        for mechanism in &requirements {
            if let Some(owner) = self.mechanisms[mechanism].owner {
                if !owners.contains(&owner) {
                    owners.push(owner);
                }
            }
        }

        for owner in &owners {
            let interruptible = self
                .running
                .iter()
                .find(|entry| entry.id == *owner)
                .map(|entry| entry.action.interruptible())
                .unwrap_or(true);
            if !interruptible {
                tracing::debug!(
                    action = action.name(),
                    "schedule rejected: mechanism held by non-interruptible owner"
                );
                self.emit(
                    TelemetryEvent::new("action_rejected")
                        .with_action(action.name())
                        .with_message("held by non-interruptible owner"),
                );
                return None;
            }
        }

        // Every required mechanism is claimable: interrupt the losers, then
        // install the new owner. on_end(true) completes before any
        // reassignment.
        for owner in owners {
            self.remove_running(owner, true);
        }

        let id = ActionId::new();
        for mechanism in &requirements {
            if let Some(state) = self.mechanisms.get_mut(mechanism) {
                state.owner = Some(id);
            }
        }
        action.on_start();
        tracing::trace!(action = action.name(), run = %id, "action started");
        self.emit(
            TelemetryEvent::new("action_started")
                .with_run_id(id)
                .with_action(action.name()),
        );
        self.running.push(RunningEntry { id, action });
        Some(id)
    }

    /// Cancel a run: `on_end(true)` fires and its mechanisms are released
    /// within this call. Unknown or already-ended IDs are a no-op.
    pub fn cancel(&mut self, id: ActionId) {
        self.remove_running(id, true);
    }

    /// One arbitration-and-run pass. Bounded: proportional to the number of
    /// bindings, running actions, and mechanisms; no I/O, no waiting.
    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);

        // Phases 1-2: one consistent input snapshot, then edge resolution.
        let mut requests: Vec<usize> = Vec::new();
        let mut cancels: Vec<ActionId> = Vec::new();
        {
            let running = &self.running;
            for (index, slot) in self.bindings.iter_mut().enumerate() {
                let value = (slot.binding.condition)();
                let rising = value && !slot.previous;
                let falling = !value && slot.previous;
                slot.previous = value;

                // Forget runs that ended on their own.
                slot.live = slot
                    .live
                    .filter(|id| running.iter().any(|entry| entry.id == *id));

                match slot.binding.mode {
                    EdgeMode::WhileTrue => {
                        if value && slot.live.is_none() {
                            requests.push(index);
                        } else if falling {
                            if let Some(id) = slot.live.take() {
                                cancels.push(id);
                            }
                        }
                    }
                    EdgeMode::OnRising => {
                        if rising {
                            requests.push(index);
                        }
                    }
                    EdgeMode::OnFalling => {
                        if falling {
                            requests.push(index);
                        }
                    }
                    EdgeMode::OnRisingThenFalling => {
                        if rising && slot.live.is_none() {
                            requests.push(index);
                        } else if falling {
                            if let Some(id) = slot.live.take() {
                                cancels.push(id);
                            }
                        }
                    }
                }
            }
        }

        for id in cancels {
            self.remove_running(id, true);
        }

        // Phases 3-4: acquisition and start, in binding order.
        for index in requests {
            let action = (self.bindings[index].binding.factory)();
            let scheduled = self.schedule(action);
            self.bindings[index].live = scheduled;
        }

        // Phase 5: every running action executes once, scheduling order.
        for entry in &mut self.running {
            entry.action.on_execute();
        }

        // Phase 6: finish sweep.
        let mut finished: Vec<ActionId> = Vec::new();
        for entry in &mut self.running {
            if entry.action.is_finished() {
                finished.push(entry.id);
            }
        }
        for id in finished {
            self.remove_running(id, false);
        }

        // Phase 7: default fallback for every unowned mechanism. Defaults
        // skip the ownership bookkeeping entirely; only their body runs.
        for state in self.mechanisms.values_mut() {
            if state.owner.is_none() {
                if let Some(default_action) = state.default_action.as_mut() {
                    default_action.on_execute();
                }
            }
        }
    }

    fn remove_running(&mut self, id: ActionId, interrupted: bool) -> bool {
        let Some(position) = self.running.iter().position(|entry| entry.id == id) else {
            return false;
        };
        let mut entry = self.running.remove(position);
        entry.action.on_end(interrupted);
        for state in self.mechanisms.values_mut() {
            if state.owner == Some(id) {
                state.owner = None;
            }
        }
        let phase = if interrupted {
            "action_interrupted"
        } else {
            "action_finished"
        };
        tracing::trace!(action = entry.action.name(), run = %id, phase, "action ended");
        self.emit(
            TelemetryEvent::new(phase)
                .with_run_id(id)
                .with_action(entry.action.name()),
        );
        true
    }

    fn emit(&self, event: TelemetryEvent) {
        if let Some(sink) = &self.telemetry {
            sink.record(event);
        }
    }
}
