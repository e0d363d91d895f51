//! rondo-bot binary: loads configuration, assembles the robot, and runs the
//! 50 Hz control loop. The scheduler itself is single-threaded; tokio only
//! provides the interval timer and the telemetry channel.

mod assembly;
mod auto;
mod drivers;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use rondo_config::{load_config, RobotConfig};
use rondo_core::{BroadcastTelemetry, TelemetrySink};
use rondo_hid::{Axis, Button, GamepadSample, InputSource, ScriptedGamepad};

use assembly::Robot;
use auto::standard_routines;

#[derive(Debug, Parser)]
#[command(name = "rondo-bot", about = "Mechanism arbitration control loop")]
struct Cli {
    /// Path to the robot configuration file.
    #[arg(long, default_value = "rondo.yaml")]
    config: PathBuf,

    /// Autonomous routine to run at startup.
    #[arg(long)]
    auto: Option<String>,

    /// Ticks before the autonomous routine is cancelled.
    #[arg(long, default_value_t = 150)]
    auto_ticks: u64,

    /// Stop after this many ticks (runs forever when unset).
    #[arg(long)]
    ticks: Option<u64>,

    /// Feed a scripted demo gamepad instead of an idle one.
    #[arg(long)]
    demo: bool,

    /// List the available autonomous routines and exit.
    #[arg(long)]
    list_autos: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        load_config(&cli.config)
            .with_context(|| format!("loading config from {}", cli.config.display()))?
    } else {
        info!(path = %cli.config.display(), "config file not found, using defaults");
        RobotConfig::default()
    };

    let telemetry = BroadcastTelemetry::default().shared();
    let mut events = telemetry.subscribe();
    let sink: Arc<dyn TelemetrySink> = telemetry;

    let mut robot = Robot::build(&config, Some(sink.clone()))
        .context("assembling robot")?;
    let registry = standard_routines(robot.drivers(), &config, &Some(sink));

    if cli.list_autos {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let mut auto_run = None;
    if let Some(name) = &cli.auto {
        let action = registry
            .build(name)
            .with_context(|| format!("unknown autonomous routine {name:?}"))?;
        match robot.schedule(action) {
            Some(id) => {
                info!(routine = %name, "autonomous routine scheduled");
                auto_run = Some(id);
            }
            None => warn!(routine = %name, "autonomous routine rejected"),
        }
    }

    let mut script = cli.demo.then(demo_script);

    let mut interval = tokio::time::interval(config.tick.period());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(period_ms = config.tick.period_ms, "control loop starting");
    loop {
        interval.tick().await;

        if let Some(id) = auto_run {
            if robot.scheduler().ticks() >= cli.auto_ticks {
                robot.cancel(id);
                auto_run = None;
                info!("autonomous window closed");
            }
        }

        let sample = match script.as_mut() {
            Some(source) => source.sample(),
            None => GamepadSample::disconnected(),
        };
        robot.submit_input(sample);
        robot.tick();

        while let Ok(event) = events.try_recv() {
            debug!(
                phase = %event.phase,
                action = event.action.as_deref().unwrap_or("-"),
                metadata = %event.metadata,
                "telemetry"
            );
        }

        if let Some(limit) = cli.ticks {
            if robot.scheduler().ticks() >= limit {
                info!(ticks = robot.scheduler().ticks(), "tick limit reached, shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// A canned teleop session: drive forward, intake, raise to L2, score.
fn demo_script() -> ScriptedGamepad {
    ScriptedGamepad::default()
        .hold(GamepadSample::new().with_axis(Axis::LeftY, -0.8), 50)
        .hold(GamepadSample::new().with_button(Button::B, true), 25)
        .hold(GamepadSample::new().with_button(Button::RightBumper, true), 2)
        .hold(GamepadSample::disconnected(), 60)
        .hold(GamepadSample::new().with_button(Button::Start, true), 3)
        .hold(GamepadSample::disconnected(), 120)
}
