//! Field-centric drive pipeline.
//!
//! A pure, stateless map from one gamepad sample to a chassis velocity
//! command: stick up/left is forward/left in the field frame, and the
//! triggers steer (left minus right, counterclockwise positive).

use serde::{Deserialize, Serialize};

use crate::gamepad::{Axis, GamepadSample};

/// Field-frame chassis velocity command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChassisSpeeds {
    /// Forward velocity, meters per second.
    pub vx: f64,
    /// Leftward velocity, meters per second.
    pub vy: f64,
    /// Counterclockwise rotational rate, radians per second.
    pub omega: f64,
}

impl ChassisSpeeds {
    pub const STOPPED: Self = Self {
        vx: 0.0,
        vy: 0.0,
        omega: 0.0,
    };

    /// Translational speed magnitude, meters per second.
    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }
}

/// Drive pipeline limits and deadband.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Maximum translational speed, meters per second.
    pub max_speed: f64,
    /// Maximum rotational rate, radians per second.
    pub max_angular_rate: f64,
    /// Deadband as a fraction of the respective maximum.
    pub deadband_fraction: f64,
}

// The deadband threshold is the fraction of the output limit, compared
// against the raw axis magnitude, and surviving values are not rescaled.
// Both quirks are load-bearing for tuned driver feel; changing either shifts
// the response curve. See the pinned values in the tests below.
fn deadband(raw: f64, threshold: f64) -> f64 {
    if raw.abs() < threshold {
        0.0
    } else {
        raw
    }
}

/// Map one gamepad sample to a field-centric chassis command.
///
/// `vx = -left_y * max_speed`, `vy = -left_x * max_speed`,
/// `omega = (left_trigger - right_trigger) * max_angular_rate`, each axis
/// deadbanded independently before scaling.
pub fn chassis_command(sample: &GamepadSample, config: &DriveConfig) -> ChassisSpeeds {
    let linear_threshold = config.deadband_fraction * config.max_speed;
    let angular_threshold = config.deadband_fraction * config.max_angular_rate;

    let forward = deadband(-sample.axis(Axis::LeftY), linear_threshold);
    let left = deadband(-sample.axis(Axis::LeftX), linear_threshold);
    let twist = deadband(
        sample.axis(Axis::LeftTrigger) - sample.axis(Axis::RightTrigger),
        angular_threshold,
    );

    ChassisSpeeds {
        vx: forward * config.max_speed,
        vy: left * config.max_speed,
        omega: twist * config.max_angular_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamepad::GamepadSample;

    fn config() -> DriveConfig {
        DriveConfig {
            max_speed: 4.0,
            max_angular_rate: 3.0,
            deadband_fraction: 0.1,
        }
    }

    #[test]
    fn test_below_threshold_clamps_to_zero() {
        // threshold = 0.1 * 4.0 = 0.4 against the raw sample
        let sample = GamepadSample::new().with_axis(Axis::LeftY, 0.3);
        let speeds = chassis_command(&sample, &config());
        assert_eq!(speeds.vx, 0.0);
    }

    #[test]
    fn test_above_threshold_scales_without_rescaling() {
        let sample = GamepadSample::new().with_axis(Axis::LeftY, 0.5);
        let speeds = chassis_command(&sample, &config());
        assert_eq!(speeds.vx, -2.0);
    }

    #[test]
    fn test_sign_convention_stick_up_left_is_forward_left() {
        let sample = GamepadSample::new()
            .with_axis(Axis::LeftY, -1.0)
            .with_axis(Axis::LeftX, -1.0);
        let speeds = chassis_command(&sample, &config());
        assert_eq!(speeds.vx, 4.0);
        assert_eq!(speeds.vy, 4.0);
    }

    #[test]
    fn test_triggers_set_rotation_left_positive() {
        let sample = GamepadSample::new()
            .with_axis(Axis::LeftTrigger, 1.0)
            .with_axis(Axis::RightTrigger, 0.25);
        let speeds = chassis_command(&sample, &config());
        assert_eq!(speeds.omega, 0.75 * 3.0);
    }

    #[test]
    fn test_rotation_deadband_uses_angular_limit() {
        // threshold = 0.1 * 3.0 = 0.3 against the raw trigger difference
        let sample = GamepadSample::new().with_axis(Axis::LeftTrigger, 0.2);
        let speeds = chassis_command(&sample, &config());
        assert_eq!(speeds.omega, 0.0);
    }

    #[test]
    fn test_axes_deadband_independently() {
        let sample = GamepadSample::new()
            .with_axis(Axis::LeftY, 0.8)
            .with_axis(Axis::LeftX, 0.2);
        let speeds = chassis_command(&sample, &config());
        assert_eq!(speeds.vx, -3.2);
        assert_eq!(speeds.vy, 0.0);
    }

    #[test]
    fn test_disconnected_sample_commands_stop() {
        let speeds = chassis_command(&GamepadSample::disconnected(), &config());
        assert_eq!(speeds, ChassisSpeeds::STOPPED);
    }
}
