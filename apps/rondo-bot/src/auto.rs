//! Autonomous routine registry. Routines are named action factories so a
//! fresh instance is built for every run; selecting one at startup is a
//! plain map lookup.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use rondo_config::RobotConfig;
use rondo_core::action::{FunctionalAction, Sequence};
use rondo_core::mechanism::{requires, MechanismSet};
use rondo_core::BoxedAction;

use crate::assembly::{elevator_to, report_fault, wrist_to, Drivers, Telemetry, CORAL_INTAKE};
use crate::drivers::RollerDriver;

type RoutineFactory = Box<dyn Fn() -> BoxedAction>;

#[derive(Default)]
pub struct AutoRegistry {
    routines: HashMap<String, RoutineFactory>,
}

impl AutoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, factory: impl Fn() -> BoxedAction + 'static) {
        self.routines.insert(name.into(), Box::new(factory));
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.routines.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a fresh instance of the named routine.
    pub fn build(&self, name: &str) -> Option<BoxedAction> {
        self.routines.get(name).map(|factory| factory())
    }
}

/// The routines the robot ships with.
pub fn standard_routines(drivers: &Drivers, config: &RobotConfig, telemetry: &Telemetry) -> AutoRegistry {
    let mut registry = AutoRegistry::new();

    registry.register("idle", || {
        FunctionalAction::run("auto_idle", MechanismSet::new(), || {}).boxed()
    });

    // Drive-less scoring routine: raise to L2, swing the wrist to the
    // scoring angle, then eject for half a second.
    let elevator = drivers.elevator.clone();
    let wrist = drivers.wrist.clone();
    let coral = drivers.coral.clone();
    let dt = config.tick.period_seconds();
    let eject_ticks = (0.5 / dt).ceil() as u32;
    let elevator_cfg = config.elevator.clone();
    let wrist_cfg = config.wrist.clone();
    let duty = config.intake.roller_duty;
    let sink = telemetry.clone();
    registry.register("score-l2", move || {
        Sequence::new(vec![
            elevator_to(
                "auto_elevator_l2",
                elevator.clone(),
                elevator_cfg.l2_height_m,
                elevator_cfg.tolerance_m,
                dt,
                sink.clone(),
            ),
            wrist_to(
                "auto_wrist_score",
                wrist.clone(),
                wrist_cfg.score_deg,
                wrist_cfg.tolerance_deg,
                dt,
                sink.clone(),
            ),
            timed_eject(coral.clone(), -duty, eject_ticks, sink.clone()),
        ])
        .with_name("auto_score_l2")
        .boxed()
    });

    registry
}

/// Run the coral rollers at `duty` for `ticks` ticks, then stop them. The
/// rollers are stopped on interruption too.
fn timed_eject(
    roller: Rc<RefCell<RollerDriver>>,
    duty: f64,
    ticks: u32,
    telemetry: Telemetry,
) -> BoxedAction {
    let elapsed = Rc::new(Cell::new(0u32));
    let start_count = elapsed.clone();
    let exec_count = elapsed.clone();
    let exec_roller = roller.clone();
    let exec_sink = telemetry.clone();
    FunctionalAction::new("coral_eject", requires([CORAL_INTAKE]))
        .with_start(move || start_count.set(0))
        .with_execute(move || {
            exec_count.set(exec_count.get() + 1);
            if let Err(err) = exec_roller.borrow_mut().run(duty) {
                report_fault(&exec_sink, CORAL_INTAKE, &err);
            }
        })
        .with_finished(move || elapsed.get() >= ticks)
        .with_end(move |_| {
            if let Err(err) = roller.borrow_mut().stop() {
                report_fault(&telemetry, CORAL_INTAKE, &err);
            }
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{Robot, ELEVATOR, WRIST};
    use rondo_core::{TelemetryEvent, TelemetrySink};
    use rondo_hid::GamepadSample;
    use std::sync::{Arc, Mutex};

    fn robot_and_registry() -> (Robot, AutoRegistry) {
        let config = RobotConfig::default();
        let robot = Robot::build(&config, None).unwrap();
        let registry = standard_routines(robot.drivers(), &config, &None);
        (robot, registry)
    }

    fn tick_idle(robot: &mut Robot, ticks: usize) {
        for _ in 0..ticks {
            robot.submit_input(GamepadSample::disconnected());
            robot.tick();
        }
    }

    #[test]
    fn test_registry_lists_and_builds_routines() {
        let (_robot, registry) = robot_and_registry();
        assert_eq!(registry.names(), vec!["idle", "score-l2"]);
        assert!(registry.build("score-l2").is_some());
        assert!(registry.build("missing").is_none());
    }

    #[test]
    fn test_score_l2_routine_runs_to_completion() {
        let (mut robot, registry) = robot_and_registry();
        let config = RobotConfig::default();

        robot.schedule(registry.build("score-l2").unwrap()).unwrap();
        // Elevator travel plus wrist swing plus the timed eject, with slack.
        tick_idle(&mut robot, 200);

        assert!(robot
            .drivers()
            .elevator
            .borrow()
            .at_setpoint(config.elevator.tolerance_m));
        assert_eq!(
            robot.drivers().elevator.borrow().setpoint(),
            config.elevator.l2_height_m
        );
        assert_eq!(robot.drivers().coral.borrow().duty(), 0.0);
        assert_eq!(robot.scheduler().running_count(), 0);
    }

    struct CollectingSink {
        events: Mutex<Vec<TelemetryEvent>>,
    }

    impl TelemetrySink for CollectingSink {
        fn record(&self, event: TelemetryEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_eject_stage_fault_is_telemetered() {
        let config = RobotConfig::default();
        let sink = Arc::new(CollectingSink {
            events: Mutex::new(Vec::new()),
        });
        let telemetry: Telemetry = Some(sink.clone());
        let mut robot = Robot::build(&config, telemetry.clone()).unwrap();
        let registry = standard_routines(robot.drivers(), &config, &telemetry);

        robot.drivers().coral.borrow_mut().arm_fault("stalled");
        robot.schedule(registry.build("score-l2").unwrap()).unwrap();

        // Deep enough into the routine that the eject stage is executing,
        // but before it finishes and the idle default touches the roller.
        tick_idle(&mut robot, 80);
        assert_eq!(robot.scheduler().running_count(), 1);

        let events = sink.events.lock().unwrap();
        assert!(events.iter().any(|event| {
            event.phase == "driver_fault" && event.metadata["mechanism"] == "coral_intake"
        }));
    }

    #[test]
    fn test_cancelling_auto_releases_every_mechanism() {
        let (mut robot, registry) = robot_and_registry();

        let id = robot.schedule(registry.build("score-l2").unwrap()).unwrap();
        tick_idle(&mut robot, 5);
        assert!(robot.scheduler().owner_of(&ELEVATOR.into()).is_some());

        robot.cancel(id);
        for mechanism in [ELEVATOR, WRIST, CORAL_INTAKE] {
            assert_eq!(robot.scheduler().owner_of(&mechanism.into()), None);
        }
        assert_eq!(robot.scheduler().running_count(), 0);
    }
}
