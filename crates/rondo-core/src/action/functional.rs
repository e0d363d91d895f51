//! Closure-built actions.
//!
//! Most robot behaviours are a body closure over one mechanism's driver plus
//! a finish predicate; `FunctionalAction` packages those without a bespoke
//! type per behaviour.

use crate::action::Action;
use crate::mechanism::MechanismSet;

type Hook = Box<dyn FnMut()>;
type EndHook = Box<dyn FnMut(bool)>;
type Predicate = Box<dyn FnMut() -> bool>;

/// An action assembled from closures.
///
/// Built with `new` plus `with_*` setters, or via the [`instant`] and
/// [`run`] shorthands. Hooks default to no-ops; the finish predicate
/// defaults to "never finished" (run until interrupted).
///
/// [`instant`]: FunctionalAction::instant
/// [`run`]: FunctionalAction::run
pub struct FunctionalAction {
    name: String,
    requirements: MechanismSet,
    interruptible: bool,
    start: Option<Hook>,
    execute: Option<Hook>,
    end: Option<EndHook>,
    finished: Predicate,
}

impl FunctionalAction {
    /// Create an empty action with a name and requirement set.
    pub fn new(name: impl Into<String>, requirements: MechanismSet) -> Self {
        Self {
            name: name.into(),
            requirements,
            interruptible: true,
            start: None,
            execute: None,
            end: None,
            finished: Box::new(|| false),
        }
    }

    /// One-shot action: runs `body` on its single execute tick, then finishes.
    pub fn instant(
        name: impl Into<String>,
        requirements: MechanismSet,
        body: impl FnMut() + 'static,
    ) -> Self {
        Self::new(name, requirements)
            .with_execute(body)
            .with_finished(|| true)
    }

    /// Perpetual action: runs `body` every tick until interrupted.
    pub fn run(
        name: impl Into<String>,
        requirements: MechanismSet,
        body: impl FnMut() + 'static,
    ) -> Self {
        Self::new(name, requirements).with_execute(body)
    }

    /// Set the start hook.
    pub fn with_start(mut self, hook: impl FnMut() + 'static) -> Self {
        self.start = Some(Box::new(hook));
        self
    }

    /// Set the per-tick body.
    pub fn with_execute(mut self, hook: impl FnMut() + 'static) -> Self {
        self.execute = Some(Box::new(hook));
        self
    }

    /// Set the end hook; receives `interrupted`.
    pub fn with_end(mut self, hook: impl FnMut(bool) + 'static) -> Self {
        self.end = Some(Box::new(hook));
        self
    }

    /// Set the finish predicate.
    pub fn with_finished(mut self, predicate: impl FnMut() -> bool + 'static) -> Self {
        self.finished = Box::new(predicate);
        self
    }

    /// Mark the action as not cancellable by conflicting requests.
    pub fn non_interruptible(mut self) -> Self {
        self.interruptible = false;
        self
    }

    /// Box the action for scheduling.
    pub fn boxed(self) -> Box<dyn Action> {
        Box::new(self)
    }
}

impl Action for FunctionalAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> &MechanismSet {
        &self.requirements
    }

    fn interruptible(&self) -> bool {
        self.interruptible
    }

    fn on_start(&mut self) {
        if let Some(hook) = self.start.as_mut() {
            hook();
        }
    }

    fn on_execute(&mut self) {
        if let Some(hook) = self.execute.as_mut() {
            hook();
        }
    }

    fn on_end(&mut self, interrupted: bool) {
        if let Some(hook) = self.end.as_mut() {
            hook(interrupted);
        }
    }

    fn is_finished(&mut self) -> bool {
        (self.finished)()
    }
}
