//! Composite actions: sequence, race, parallel-all.
//!
//! Composites own their children exclusively and present the union of the
//! children's requirements to the scheduler, computed once at construction
//! and immutable afterwards. Concurrent composites reject construction when
//! two children claim the same mechanism; a sequence may reuse mechanisms
//! across stages since only one child is ever active.

use crate::action::{Action, BoxedAction};
use crate::error::SchedulerError;
use crate::mechanism::MechanismSet;

fn union(children: &[BoxedAction]) -> MechanismSet {
    children
        .iter()
        .flat_map(|child| child.requirements().iter().cloned())
        .collect()
}

fn disjoint_union(children: &[BoxedAction]) -> Result<MechanismSet, SchedulerError> {
    let mut set = MechanismSet::new();
    for child in children {
        for id in child.requirements() {
            if !set.insert(id.clone()) {
                return Err(SchedulerError::OverlappingRequirements(id.clone()));
            }
        }
    }
    Ok(set)
}

/// Runs children one after another; only the current child is active.
///
/// When the active child reports finished, its `on_end(false)` and the next
/// child's `on_start` both fire on that same tick, so there is never a tick
/// with no active stage. Interrupting the sequence interrupts only the
/// currently active child.
pub struct Sequence {
    name: String,
    children: Vec<BoxedAction>,
    index: usize,
    requirements: MechanismSet,
}

impl Sequence {
    pub fn new(children: Vec<BoxedAction>) -> Self {
        let requirements = union(&children);
        Self {
            name: "sequence".to_string(),
            children,
            index: 0,
            requirements,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn boxed(self) -> BoxedAction {
        Box::new(self)
    }
}

impl Action for Sequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> &MechanismSet {
        &self.requirements
    }

    fn on_start(&mut self) {
        self.index = 0;
        if let Some(child) = self.children.first_mut() {
            child.on_start();
        }
    }

    fn on_execute(&mut self) {
        let Some(child) = self.children.get_mut(self.index) else {
            return;
        };
        child.on_execute();
        if child.is_finished() {
            child.on_end(false);
            self.index += 1;
            if let Some(next) = self.children.get_mut(self.index) {
                next.on_start();
            }
        }
    }

    fn on_end(&mut self, interrupted: bool) {
        if interrupted {
            if let Some(child) = self.children.get_mut(self.index) {
                child.on_end(true);
            }
        }
    }

    fn is_finished(&mut self) -> bool {
        self.index >= self.children.len()
    }
}

/// Runs children concurrently; finishes when the first child does and
/// cancels the rest on that same tick.
pub struct Race {
    name: String,
    children: Vec<BoxedAction>,
    requirements: MechanismSet,
    winner: Option<usize>,
}

impl Race {
    /// Fails when two children require the same mechanism.
    pub fn new(children: Vec<BoxedAction>) -> Result<Self, SchedulerError> {
        let requirements = disjoint_union(&children)?;
        Ok(Self {
            name: "race".to_string(),
            children,
            requirements,
            winner: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn boxed(self) -> BoxedAction {
        Box::new(self)
    }
}

impl Action for Race {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> &MechanismSet {
        &self.requirements
    }

    fn on_start(&mut self) {
        self.winner = None;
        for child in &mut self.children {
            child.on_start();
        }
    }

    fn on_execute(&mut self) {
        if self.winner.is_some() {
            return;
        }
        for child in &mut self.children {
            child.on_execute();
        }
    }

    fn on_end(&mut self, interrupted: bool) {
        if interrupted && self.winner.is_none() {
            for child in &mut self.children {
                child.on_end(true);
            }
        }
    }

    fn is_finished(&mut self) -> bool {
        if self.winner.is_none() {
            let winner = self
                .children
                .iter_mut()
                .position(|child| child.is_finished());
            if let Some(index) = winner {
                for (i, child) in self.children.iter_mut().enumerate() {
                    child.on_end(i != index);
                }
                self.winner = Some(index);
            }
        }
        self.winner.is_some()
    }
}

/// Runs children concurrently; finishes once every child has finished.
///
/// Each child gets its `on_end(false)` on the tick it individually finishes,
/// not when the whole group does.
pub struct ParallelAll {
    name: String,
    children: Vec<(BoxedAction, bool)>,
    requirements: MechanismSet,
}

impl ParallelAll {
    /// Fails when two children require the same mechanism.
    pub fn new(children: Vec<BoxedAction>) -> Result<Self, SchedulerError> {
        let requirements = disjoint_union(&children)?;
        Ok(Self {
            name: "parallel".to_string(),
            children: children.into_iter().map(|child| (child, false)).collect(),
            requirements,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn boxed(self) -> BoxedAction {
        Box::new(self)
    }
}

impl Action for ParallelAll {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> &MechanismSet {
        &self.requirements
    }

    fn on_start(&mut self) {
        for (child, done) in &mut self.children {
            *done = false;
            child.on_start();
        }
    }

    fn on_execute(&mut self) {
        for (child, done) in &mut self.children {
            if !*done {
                child.on_execute();
            }
        }
    }

    fn on_end(&mut self, interrupted: bool) {
        if interrupted {
            for (child, done) in &mut self.children {
                if !*done {
                    child.on_end(true);
                }
            }
        }
    }

    fn is_finished(&mut self) -> bool {
        for (child, done) in &mut self.children {
            if !*done && child.is_finished() {
                child.on_end(false);
                *done = true;
            }
        }
        self.children.iter().all(|(_, done)| *done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mechanism::requires;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Scripted child that finishes after a fixed number of executes and
    /// records every lifecycle hook.
    struct Probe {
        label: &'static str,
        requirements: MechanismSet,
        ticks_to_finish: usize,
        executed: usize,
        log: Log,
    }

    impl Probe {
        fn boxed(
            label: &'static str,
            mechanism: &str,
            ticks_to_finish: usize,
            log: &Log,
        ) -> BoxedAction {
            Box::new(Self {
                label,
                requirements: requires([mechanism]),
                ticks_to_finish,
                executed: 0,
                log: log.clone(),
            })
        }
    }

    impl Action for Probe {
        fn name(&self) -> &str {
            self.label
        }

        fn requirements(&self) -> &MechanismSet {
            &self.requirements
        }

        fn on_start(&mut self) {
            self.executed = 0;
            self.log.borrow_mut().push(format!("{}:start", self.label));
        }

        fn on_execute(&mut self) {
            self.executed += 1;
            self.log.borrow_mut().push(format!("{}:exec", self.label));
        }

        fn on_end(&mut self, interrupted: bool) {
            self.log
                .borrow_mut()
                .push(format!("{}:end({})", self.label, interrupted));
        }

        fn is_finished(&mut self) -> bool {
            self.executed >= self.ticks_to_finish
        }
    }

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_sequence_requirements_are_union_of_children() {
        let log = log();
        let seq = Sequence::new(vec![
            Probe::boxed("a", "wrist", 1, &log),
            Probe::boxed("b", "elevator", 1, &log),
        ]);
        assert_eq!(seq.requirements(), &requires(["elevator", "wrist"]));
    }

    #[test]
    fn test_sequence_hands_off_on_the_finishing_tick() {
        let log = log();
        let mut seq = Sequence::new(vec![
            Probe::boxed("a", "wrist", 2, &log),
            Probe::boxed("b", "elevator", 1, &log),
        ]);

        seq.on_start();
        seq.on_execute();
        assert!(!seq.is_finished());
        seq.on_execute(); // a finishes here; b must start on this same call
        assert_eq!(
            log.borrow().as_slice(),
            [
                "a:start", "a:exec", "a:exec", "a:end(false)", "b:start"
            ]
        );

        seq.on_execute();
        assert!(seq.is_finished());
        assert_eq!(log.borrow().last().unwrap(), "b:end(false)");
    }

    #[test]
    fn test_sequence_interrupt_hits_only_active_child() {
        let log = log();
        let mut seq = Sequence::new(vec![
            Probe::boxed("a", "wrist", 1, &log),
            Probe::boxed("b", "elevator", 5, &log),
        ]);

        seq.on_start();
        seq.on_execute(); // a finishes, b starts
        seq.on_end(true);

        let entries = log.borrow();
        assert!(entries.contains(&"b:end(true)".to_string()));
        assert!(!entries.contains(&"a:end(true)".to_string()));
    }

    #[test]
    fn test_empty_sequence_is_immediately_finished() {
        let mut seq = Sequence::new(Vec::new());
        seq.on_start();
        assert!(seq.is_finished());
    }

    #[test]
    fn test_race_first_finisher_cancels_the_rest() {
        let log = log();
        let mut race = Race::new(vec![
            Probe::boxed("fast", "wrist", 1, &log),
            Probe::boxed("slow", "elevator", 10, &log),
        ])
        .unwrap();

        race.on_start();
        race.on_execute();
        assert!(race.is_finished());

        let entries = log.borrow();
        assert!(entries.contains(&"fast:end(false)".to_string()));
        assert!(entries.contains(&"slow:end(true)".to_string()));
    }

    #[test]
    fn test_race_rejects_overlapping_children() {
        let log = log();
        let result = Race::new(vec![
            Probe::boxed("a", "wrist", 1, &log),
            Probe::boxed("b", "wrist", 1, &log),
        ]);
        assert!(matches!(
            result,
            Err(SchedulerError::OverlappingRequirements(id)) if id.as_str() == "wrist"
        ));
    }

    #[test]
    fn test_parallel_all_waits_for_every_child() {
        let log = log();
        let mut group = ParallelAll::new(vec![
            Probe::boxed("a", "wrist", 1, &log),
            Probe::boxed("b", "elevator", 2, &log),
        ])
        .unwrap();

        group.on_start();
        group.on_execute();
        assert!(!group.is_finished()); // a done, b still running
        group.on_execute();
        assert!(group.is_finished());

        let entries = log.borrow();
        assert!(entries.contains(&"a:end(false)".to_string()));
        assert!(entries.contains(&"b:end(false)".to_string()));
        // a stopped executing once finished
        let a_execs = entries.iter().filter(|e| *e == "a:exec").count();
        assert_eq!(a_execs, 1);
    }

    #[test]
    fn test_parallel_all_interrupt_ends_only_unfinished_children() {
        let log = log();
        let mut group = ParallelAll::new(vec![
            Probe::boxed("a", "wrist", 1, &log),
            Probe::boxed("b", "elevator", 5, &log),
        ])
        .unwrap();

        group.on_start();
        group.on_execute();
        assert!(!group.is_finished());
        group.on_end(true);

        let entries = log.borrow();
        assert!(entries.contains(&"a:end(false)".to_string()));
        assert!(entries.contains(&"b:end(true)".to_string()));
        assert_eq!(
            entries.iter().filter(|e| e.contains("a:end")).count(),
            1
        );
    }
}
