//! # Rondo config
//!
//! Externally supplied tuning for the robot: tick period, drive limits and
//! deadband, mechanism setpoints, and the controller port. The control core
//! owns no persisted state; everything here arrives at construction time and
//! an invalid file is fatal at startup.

mod loader;

use serde::{Deserialize, Serialize};

pub use loader::{load_config, validate_config, ConfigError};

/// Full robot configuration, one YAML document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RobotConfig {
    #[serde(default)]
    pub tick: TickConfig,
    #[serde(default)]
    pub hid: HidConfig,
    #[serde(default)]
    pub drive: DriveSection,
    #[serde(default)]
    pub elevator: ElevatorConfig,
    #[serde(default)]
    pub wrist: WristConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub climber: ClimberConfig,
}

/// Fixed-rate loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickConfig {
    /// Control period in milliseconds.
    pub period_ms: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self { period_ms: 20 }
    }
}

impl TickConfig {
    /// Control period in seconds, as action bodies integrate it.
    pub fn period_seconds(&self) -> f64 {
        self.period_ms as f64 / 1000.0
    }

    /// Control period as a duration, for the loop timer.
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.period_ms)
    }
}

/// Controller wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HidConfig {
    /// Driver-station port of the driver controller.
    pub driver_port: u8,
}

impl Default for HidConfig {
    fn default() -> Self {
        Self { driver_port: 0 }
    }
}

/// Drive pipeline limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveSection {
    /// Maximum translational speed, meters per second.
    pub max_speed_mps: f64,
    /// Maximum rotational rate, radians per second.
    pub max_angular_rate_rps: f64,
    /// Deadband as a fraction of each maximum.
    pub deadband_fraction: f64,
}

impl Default for DriveSection {
    fn default() -> Self {
        Self {
            max_speed_mps: 4.0,
            max_angular_rate_rps: std::f64::consts::PI,
            deadband_fraction: 0.1,
        }
    }
}

/// Elevator setpoints and closed-loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevatorConfig {
    /// Scoring height for level 1, meters.
    pub l1_height_m: f64,
    /// Scoring height for level 2, meters.
    pub l2_height_m: f64,
    /// Stowed/home height, meters.
    pub stow_height_m: f64,
    /// At-height tolerance, meters.
    pub tolerance_m: f64,
    /// Closed-loop travel speed, meters per second.
    pub travel_mps: f64,
}

impl Default for ElevatorConfig {
    fn default() -> Self {
        Self {
            l1_height_m: 0.46,
            l2_height_m: 0.81,
            stow_height_m: 0.0,
            tolerance_m: 0.02,
            travel_mps: 0.8,
        }
    }
}

/// Wrist setpoints and closed-loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WristConfig {
    /// Lowered angle, degrees.
    pub low_deg: f64,
    /// Mid angle, degrees.
    pub mid_deg: f64,
    /// Raised angle, degrees.
    pub up_deg: f64,
    /// Parked angle used by the stow sequence, degrees.
    pub stow_deg: f64,
    /// Scoring angle used by the score sequence, degrees.
    pub score_deg: f64,
    /// At-angle tolerance, degrees.
    pub tolerance_deg: f64,
    /// Closed-loop slew rate, degrees per second.
    pub slew_dps: f64,
}

impl Default for WristConfig {
    fn default() -> Self {
        Self {
            low_deg: -35.0,
            mid_deg: 20.0,
            up_deg: 75.0,
            stow_deg: 90.0,
            score_deg: 35.0,
            tolerance_deg: 2.0,
            slew_dps: 120.0,
        }
    }
}

/// Intake roller settings, shared by the coral and algae intakes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Roller duty cycle while intaking, (0, 1].
    pub roller_duty: f64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self { roller_duty: 0.8 }
    }
}

/// Climber settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClimberConfig {
    /// Cap on manual climb duty, (0, 1].
    pub max_duty: f64,
}

impl Default for ClimberConfig {
    fn default() -> Self {
        Self { max_duty: 1.0 }
    }
}
