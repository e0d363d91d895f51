//! Robot assembly: constructs every mechanism, default action, and trigger
//! binding, and passes references explicitly. No process-wide singletons;
//! the assembly owns the scheduler and the driver handles, and tests build
//! one the same way the binary does.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::json;

use rondo_config::RobotConfig;
use rondo_core::action::{FunctionalAction, Sequence};
use rondo_core::mechanism::requires;
use rondo_core::{ActionId, BoxedAction, Binding, Scheduler, SchedulerError, TelemetryEvent, TelemetrySink};
use rondo_hid::{chassis_command, Button, DriveConfig, GamepadSample};

use crate::drivers::{AxisDriver, DriverError, ManualAxisDriver, RollerDriver, SwerveDriver};

pub const DRIVETRAIN: &str = "drivetrain";
pub const ELEVATOR: &str = "elevator";
pub const WRIST: &str = "wrist";
pub const CORAL_INTAKE: &str = "coral_intake";
pub const ALGAE_INTAKE: &str = "algae_intake";
pub const CLIMBER: &str = "climber";

pub(crate) type Telemetry = Option<Arc<dyn TelemetrySink>>;

/// Shared driver handles. Single-threaded by design, hence `Rc<RefCell<_>>`:
/// action bodies and tests borrow the same simulated hardware.
pub struct Drivers {
    pub swerve: Rc<RefCell<SwerveDriver>>,
    pub elevator: Rc<RefCell<AxisDriver>>,
    pub wrist: Rc<RefCell<AxisDriver>>,
    pub coral: Rc<RefCell<RollerDriver>>,
    pub algae: Rc<RefCell<RollerDriver>>,
    pub climber: Rc<RefCell<ManualAxisDriver>>,
}

impl Drivers {
    fn new(config: &RobotConfig) -> Self {
        Self {
            swerve: Rc::new(RefCell::new(SwerveDriver::new())),
            elevator: Rc::new(RefCell::new(AxisDriver::new(config.elevator.travel_mps))),
            wrist: Rc::new(RefCell::new(AxisDriver::new(config.wrist.slew_dps))),
            coral: Rc::new(RefCell::new(RollerDriver::new())),
            algae: Rc::new(RefCell::new(RollerDriver::new())),
            climber: Rc::new(RefCell::new(ManualAxisDriver::new(0.5))),
        }
    }
}

/// The assembled robot: scheduler, input snapshot, and driver handles.
pub struct Robot {
    scheduler: Scheduler,
    input: Rc<RefCell<GamepadSample>>,
    drivers: Drivers,
}

impl Robot {
    /// Wire up mechanisms, defaults, and the button map. Configuration
    /// errors here are fatal; the robot must not start half-bound.
    pub fn build(config: &RobotConfig, telemetry: Telemetry) -> Result<Self, SchedulerError> {
        let drivers = Drivers::new(config);
        let input: Rc<RefCell<GamepadSample>> = Rc::new(RefCell::new(GamepadSample::disconnected()));
        let dt = config.tick.period_seconds();

        let mut scheduler = Scheduler::new();
        if let Some(sink) = &telemetry {
            scheduler = scheduler.with_telemetry(sink.clone());
        }
        for mechanism in [DRIVETRAIN, ELEVATOR, WRIST, CORAL_INTAKE, ALGAE_INTAKE, CLIMBER] {
            scheduler.register_mechanism(mechanism)?;
        }

        register_defaults(&mut scheduler, config, &drivers, &input, &telemetry, dt)?;
        bind_driver_controls(&mut scheduler, config, &drivers, &input, &telemetry, dt);

        Ok(Self {
            scheduler,
            input,
            drivers,
        })
    }

    /// Publish this tick's controller snapshot. Sampled once per tick,
    /// before `tick()` evaluates any binding.
    pub fn submit_input(&self, sample: GamepadSample) {
        *self.input.borrow_mut() = sample;
    }

    /// One arbitration-and-run pass.
    pub fn tick(&mut self) {
        self.scheduler.tick();
    }

    pub fn schedule(&mut self, action: BoxedAction) -> Option<ActionId> {
        self.scheduler.schedule(action)
    }

    pub fn cancel(&mut self, id: ActionId) {
        self.scheduler.cancel(id);
    }

    pub fn drivers(&self) -> &Drivers {
        &self.drivers
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

fn register_defaults(
    scheduler: &mut Scheduler,
    config: &RobotConfig,
    drivers: &Drivers,
    input: &Rc<RefCell<GamepadSample>>,
    telemetry: &Telemetry,
    dt: f64,
) -> Result<(), SchedulerError> {
    // Drivetrain: field-centric drive from the latest gamepad snapshot.
    let drive_config = DriveConfig {
        max_speed: config.drive.max_speed_mps,
        max_angular_rate: config.drive.max_angular_rate_rps,
        deadband_fraction: config.drive.deadband_fraction,
    };
    let pad = input.clone();
    let swerve = drivers.swerve.clone();
    let sink = telemetry.clone();
    scheduler.register_default(
        DRIVETRAIN,
        FunctionalAction::run("drive_field_centric", requires([DRIVETRAIN]), move || {
            let command = chassis_command(&pad.borrow(), &drive_config);
            if let Err(err) = swerve.borrow_mut().apply(command) {
                report_fault(&sink, DRIVETRAIN, &err);
            }
            if let Some(sink) = &sink {
                sink.record(
                    TelemetryEvent::new("measurement")
                        .with_action("drive_field_centric")
                        .with_metadata(json!({
                            "vx": command.vx,
                            "vy": command.vy,
                            "omega": command.omega,
                            "speed": command.speed(),
                        })),
                );
            }
        })
        .boxed(),
    )?;

    // Elevator and wrist: closed-loop hold toward the commanded setpoint.
    let elevator = drivers.elevator.clone();
    let sink = telemetry.clone();
    scheduler.register_default(
        ELEVATOR,
        FunctionalAction::run("elevator_hold", requires([ELEVATOR]), move || {
            if let Err(err) = elevator.borrow_mut().track(dt) {
                report_fault(&sink, ELEVATOR, &err);
            }
        })
        .boxed(),
    )?;

    let wrist = drivers.wrist.clone();
    let sink = telemetry.clone();
    scheduler.register_default(
        WRIST,
        FunctionalAction::run("wrist_hold", requires([WRIST]), move || {
            if let Err(err) = wrist.borrow_mut().track(dt) {
                report_fault(&sink, WRIST, &err);
            }
        })
        .boxed(),
    )?;

    // Climber: manual drive from right-stick Y, stick-up winds in.
    let pad = input.clone();
    let climber = drivers.climber.clone();
    let sink = telemetry.clone();
    let max_duty = config.climber.max_duty;
    scheduler.register_default(
        CLIMBER,
        FunctionalAction::run("climb_manual", requires([CLIMBER]), move || {
            let duty = (-pad.borrow().axis(rondo_hid::Axis::RightY)).clamp(-max_duty, max_duty);
            if let Err(err) = climber.borrow_mut().apply(duty, dt) {
                report_fault(&sink, CLIMBER, &err);
            }
        })
        .boxed(),
    )?;

    // Both intakes idle stopped.
    scheduler.register_default(
        CORAL_INTAKE,
        roller_stop("coral_idle", CORAL_INTAKE, drivers.coral.clone(), telemetry.clone()),
    )?;
    scheduler.register_default(
        ALGAE_INTAKE,
        roller_stop("algae_idle", ALGAE_INTAKE, drivers.algae.clone(), telemetry.clone()),
    )?;

    Ok(())
}

fn bind_driver_controls(
    scheduler: &mut Scheduler,
    config: &RobotConfig,
    drivers: &Drivers,
    input: &Rc<RefCell<GamepadSample>>,
    telemetry: &Telemetry,
    dt: f64,
) {
    let duty = config.intake.roller_duty;

    // Coral intake: B runs rollers in, A runs them out, release stops
    // (the idle default takes over as soon as the action is cancelled).
    bind_roller(
        scheduler, input, Button::B,
        "coral_intake_in", CORAL_INTAKE, drivers.coral.clone(), duty, telemetry.clone(),
    );
    bind_roller(
        scheduler, input, Button::A,
        "coral_intake_out", CORAL_INTAKE, drivers.coral.clone(), -duty, telemetry.clone(),
    );

    // Algae intake: Y in, X out.
    bind_roller(
        scheduler, input, Button::Y,
        "algae_intake_in", ALGAE_INTAKE, drivers.algae.clone(), duty, telemetry.clone(),
    );
    bind_roller(
        scheduler, input, Button::X,
        "algae_intake_out", ALGAE_INTAKE, drivers.algae.clone(), -duty, telemetry.clone(),
    );

    // Wrist presets on the POV hat; the wrist hold default drives there.
    for (angle, degrees, name) in [
        (config.wrist.low_deg, 180, "wrist_low"),
        (config.wrist.mid_deg, 90, "wrist_mid"),
        (config.wrist.up_deg, 0, "wrist_up"),
    ] {
        let pad = input.clone();
        let wrist = drivers.wrist.clone();
        scheduler.bind(Binding::on_rising(
            move || pad.borrow().pov_at(degrees),
            move || wrist_preset(name, wrist.clone(), angle),
        ));
    }

    // Elevator presets on the bumpers.
    for (height, button, name) in [
        (config.elevator.l2_height_m, Button::RightBumper, "elevator_l2"),
        (config.elevator.l1_height_m, Button::LeftBumper, "elevator_l1"),
    ] {
        let pad = input.clone();
        let elevator = drivers.elevator.clone();
        scheduler.bind(Binding::on_rising(
            move || pad.borrow().button(button),
            move || elevator_preset(name, elevator.clone(), height),
        ));
    }

    // Back: stow everything, wrist first so it clears the superstructure.
    {
        let pad = input.clone();
        let wrist = drivers.wrist.clone();
        let elevator = drivers.elevator.clone();
        let sink = telemetry.clone();
        let wrist_cfg = config.wrist.clone();
        let elevator_cfg = config.elevator.clone();
        scheduler.bind(Binding::on_rising(
            move || pad.borrow().button(Button::Back),
            move || {
                Sequence::new(vec![
                    wrist_to("wrist_stow", wrist.clone(), wrist_cfg.stow_deg, wrist_cfg.tolerance_deg, dt, sink.clone()),
                    elevator_to("elevator_down", elevator.clone(), elevator_cfg.stow_height_m, elevator_cfg.tolerance_m, dt, sink.clone()),
                ])
                .with_name("stow_all")
                .boxed()
            },
        ));
    }

    // Start (on release): score coral at L2 - raise, settle, then swing the
    // wrist to the scoring angle.
    {
        let pad = input.clone();
        let wrist = drivers.wrist.clone();
        let elevator = drivers.elevator.clone();
        let sink = telemetry.clone();
        let wrist_cfg = config.wrist.clone();
        let elevator_cfg = config.elevator.clone();
        scheduler.bind(Binding::on_falling(
            move || pad.borrow().button(Button::Start),
            move || {
                Sequence::new(vec![
                    elevator_to("elevator_to_l2", elevator.clone(), elevator_cfg.l2_height_m, elevator_cfg.tolerance_m, dt, sink.clone()),
                    wrist_to("wrist_score", wrist.clone(), wrist_cfg.score_deg, wrist_cfg.tolerance_deg, dt, sink.clone()),
                ])
                .with_name("score_coral_l2")
                .boxed()
            },
        ));
    }
}

fn bind_roller(
    scheduler: &mut Scheduler,
    input: &Rc<RefCell<GamepadSample>>,
    button: Button,
    name: &'static str,
    mechanism: &'static str,
    roller: Rc<RefCell<RollerDriver>>,
    duty: f64,
    telemetry: Telemetry,
) {
    let pad = input.clone();
    scheduler.bind(Binding::while_true(
        move || pad.borrow().button(button),
        move || roller_run(name, mechanism, roller.clone(), duty, telemetry.clone()),
    ));
}

/// Perpetual roller action at a fixed duty; cancelled by the falling edge.
pub(crate) fn roller_run(
    name: &'static str,
    mechanism: &'static str,
    roller: Rc<RefCell<RollerDriver>>,
    duty: f64,
    telemetry: Telemetry,
) -> BoxedAction {
    FunctionalAction::run(name, requires([mechanism]), move || {
        if let Err(err) = roller.borrow_mut().run(duty) {
            report_fault(&telemetry, mechanism, &err);
        }
    })
    .boxed()
}

fn roller_stop(
    name: &'static str,
    mechanism: &'static str,
    roller: Rc<RefCell<RollerDriver>>,
    telemetry: Telemetry,
) -> BoxedAction {
    FunctionalAction::run(name, requires([mechanism]), move || {
        if let Err(err) = roller.borrow_mut().stop() {
            report_fault(&telemetry, mechanism, &err);
        }
    })
    .boxed()
}

fn wrist_preset(name: &'static str, wrist: Rc<RefCell<AxisDriver>>, angle: f64) -> BoxedAction {
    FunctionalAction::instant(name, requires([WRIST]), move || {
        wrist.borrow_mut().set_setpoint(angle);
    })
    .boxed()
}

fn elevator_preset(
    name: &'static str,
    elevator: Rc<RefCell<AxisDriver>>,
    height: f64,
) -> BoxedAction {
    FunctionalAction::instant(name, requires([ELEVATOR]), move || {
        elevator.borrow_mut().set_setpoint(height);
    })
    .boxed()
}

/// Drive the wrist to an angle and finish once it settles within tolerance.
pub(crate) fn wrist_to(
    name: &'static str,
    wrist: Rc<RefCell<AxisDriver>>,
    angle: f64,
    tolerance: f64,
    dt: f64,
    telemetry: Telemetry,
) -> BoxedAction {
    axis_move(name, WRIST, wrist, angle, tolerance, dt, telemetry)
}

/// Drive the elevator to a height and finish once it settles within
/// tolerance.
pub(crate) fn elevator_to(
    name: &'static str,
    elevator: Rc<RefCell<AxisDriver>>,
    height: f64,
    tolerance: f64,
    dt: f64,
    telemetry: Telemetry,
) -> BoxedAction {
    axis_move(name, ELEVATOR, elevator, height, tolerance, dt, telemetry)
}

fn axis_move(
    name: &'static str,
    mechanism: &'static str,
    axis: Rc<RefCell<AxisDriver>>,
    target: f64,
    tolerance: f64,
    dt: f64,
    telemetry: Telemetry,
) -> BoxedAction {
    let start_axis = axis.clone();
    let execute_axis = axis.clone();
    let finish_axis = axis;
    FunctionalAction::new(name, requires([mechanism]))
        .with_start(move || start_axis.borrow_mut().set_setpoint(target))
        .with_execute(move || {
            if let Err(err) = execute_axis.borrow_mut().track(dt) {
                report_fault(&telemetry, mechanism, &err);
            }
        })
        .with_finished(move || finish_axis.borrow().at_setpoint(tolerance))
        .boxed()
}

/// Driver faults are recoverable: log, telemeter, keep ownership. The
/// owning action decides for itself whether to react.
pub(crate) fn report_fault(telemetry: &Telemetry, mechanism: &str, err: &DriverError) {
    tracing::warn!(mechanism, error = %err, "mechanism driver fault");
    if let Some(sink) = telemetry {
        sink.record(
            TelemetryEvent::new("driver_fault")
                .with_message(err.to_string())
                .with_metadata(json!({ "mechanism": mechanism })),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rondo_hid::Axis;

    fn robot() -> Robot {
        Robot::build(&RobotConfig::default(), None).unwrap()
    }

    fn tick_with(robot: &mut Robot, sample: GamepadSample) {
        robot.submit_input(sample);
        robot.tick();
    }

    fn tick_idle(robot: &mut Robot, ticks: usize) {
        for _ in 0..ticks {
            tick_with(robot, GamepadSample::disconnected());
        }
    }

    #[test]
    fn test_coral_runs_while_b_held_and_stops_on_release() {
        let mut robot = robot();
        let duty = RobotConfig::default().intake.roller_duty;

        tick_with(&mut robot, GamepadSample::new().with_button(Button::B, true));
        assert_eq!(robot.drivers().coral.borrow().duty(), duty);

        // Release: the while-true binding cancels and the idle default stops
        // the roller on this same tick.
        tick_with(&mut robot, GamepadSample::disconnected());
        assert_eq!(robot.drivers().coral.borrow().duty(), 0.0);
        assert_eq!(robot.scheduler().owner_of(&CORAL_INTAKE.into()), None);
    }

    #[test]
    fn test_outtake_reverses_roller() {
        let mut robot = robot();
        tick_with(&mut robot, GamepadSample::new().with_button(Button::A, true));
        assert!(robot.drivers().coral.borrow().duty() < 0.0);
    }

    #[test]
    fn test_drive_default_commands_field_centric_velocity() {
        let mut robot = robot();
        let config = RobotConfig::default();

        tick_with(&mut robot, GamepadSample::new().with_axis(Axis::LeftY, -1.0));
        let commanded = robot.drivers().swerve.borrow().commanded();
        assert_eq!(commanded.vx, config.drive.max_speed_mps);
        assert_eq!(commanded.vy, 0.0);
    }

    #[test]
    fn test_pov_up_sets_wrist_preset_and_hold_tracks_there() {
        let mut robot = robot();
        let config = RobotConfig::default();

        tick_with(&mut robot, GamepadSample::new().with_pov(0));
        assert_eq!(robot.drivers().wrist.borrow().setpoint(), config.wrist.up_deg);

        tick_idle(&mut robot, 60);
        assert!(robot
            .drivers()
            .wrist
            .borrow()
            .at_setpoint(config.wrist.tolerance_deg));
    }

    #[test]
    fn test_bumper_sets_elevator_height() {
        let mut robot = robot();
        let config = RobotConfig::default();

        tick_with(
            &mut robot,
            GamepadSample::new().with_button(Button::RightBumper, true),
        );
        assert_eq!(
            robot.drivers().elevator.borrow().setpoint(),
            config.elevator.l2_height_m
        );
    }

    #[test]
    fn test_stow_sequence_moves_wrist_before_elevator() {
        let mut robot = robot();
        let config = RobotConfig::default();

        // Raise the elevator first so the stow has something to undo.
        tick_with(
            &mut robot,
            GamepadSample::new().with_button(Button::RightBumper, true),
        );
        tick_idle(&mut robot, 80);
        assert!(robot
            .drivers()
            .elevator
            .borrow()
            .at_setpoint(config.elevator.tolerance_m));

        tick_with(&mut robot, GamepadSample::new().with_button(Button::Back, true));
        // Stage one: wrist retargeted, elevator setpoint untouched.
        assert_eq!(robot.drivers().wrist.borrow().setpoint(), config.wrist.stow_deg);
        assert_eq!(
            robot.drivers().elevator.borrow().setpoint(),
            config.elevator.l2_height_m
        );

        tick_idle(&mut robot, 60);
        // Stage two reached: elevator heading home.
        assert_eq!(
            robot.drivers().elevator.borrow().setpoint(),
            config.elevator.stow_height_m
        );
        tick_idle(&mut robot, 80);
        assert!(robot
            .drivers()
            .elevator
            .borrow()
            .at_setpoint(config.elevator.tolerance_m));
        assert_eq!(robot.scheduler().running_count(), 0);
    }

    #[test]
    fn test_score_sequence_fires_on_start_release() {
        let mut robot = robot();
        let config = RobotConfig::default();

        tick_with(&mut robot, GamepadSample::new().with_button(Button::Start, true));
        assert_ne!(
            robot.drivers().elevator.borrow().setpoint(),
            config.elevator.l2_height_m
        );

        tick_with(&mut robot, GamepadSample::disconnected());
        assert_eq!(
            robot.drivers().elevator.borrow().setpoint(),
            config.elevator.l2_height_m
        );
    }

    #[test]
    fn test_driver_fault_keeps_ownership_and_does_not_panic() {
        let mut robot = robot();
        robot.drivers().coral.borrow_mut().arm_fault("stalled");

        for _ in 0..3 {
            tick_with(&mut robot, GamepadSample::new().with_button(Button::B, true));
        }
        assert!(robot.scheduler().owner_of(&CORAL_INTAKE.into()).is_some());
    }

    #[test]
    fn test_climber_follows_right_stick() {
        let mut robot = robot();
        tick_with(&mut robot, GamepadSample::new().with_axis(Axis::RightY, -1.0));
        assert_eq!(robot.drivers().climber.borrow().last_duty(), 1.0);
    }
}
