//! Configuration loading and validation.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::RobotConfig;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load and validate robot configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<RobotConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: RobotConfig = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Reject configurations the robot must not start with.
pub fn validate_config(config: &RobotConfig) -> Result<(), ConfigError> {
    if config.tick.period_ms == 0 {
        return Err(ConfigError::Invalid(
            "tick.period_ms must be > 0".to_string(),
        ));
    }

    if config.drive.max_speed_mps <= 0.0 {
        return Err(ConfigError::Invalid(
            "drive.max_speed_mps must be > 0".to_string(),
        ));
    }

    if config.drive.max_angular_rate_rps <= 0.0 {
        return Err(ConfigError::Invalid(
            "drive.max_angular_rate_rps must be > 0".to_string(),
        ));
    }

    if !(0.0..1.0).contains(&config.drive.deadband_fraction) {
        return Err(ConfigError::Invalid(
            "drive.deadband_fraction must be in [0, 1)".to_string(),
        ));
    }

    if config.elevator.l2_height_m <= config.elevator.l1_height_m {
        return Err(ConfigError::Invalid(
            "elevator.l2_height_m must be above l1_height_m".to_string(),
        ));
    }

    if config.elevator.tolerance_m <= 0.0 {
        return Err(ConfigError::Invalid(
            "elevator.tolerance_m must be > 0".to_string(),
        ));
    }

    if config.elevator.travel_mps <= 0.0 {
        return Err(ConfigError::Invalid(
            "elevator.travel_mps must be > 0".to_string(),
        ));
    }

    if config.wrist.tolerance_deg <= 0.0 {
        return Err(ConfigError::Invalid(
            "wrist.tolerance_deg must be > 0".to_string(),
        ));
    }

    if config.wrist.slew_dps <= 0.0 {
        return Err(ConfigError::Invalid(
            "wrist.slew_dps must be > 0".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&config.intake.roller_duty) || config.intake.roller_duty == 0.0 {
        return Err(ConfigError::Invalid(
            "intake.roller_duty must be in (0, 1]".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&config.climber.max_duty) || config.climber.max_duty == 0.0 {
        return Err(ConfigError::Invalid(
            "climber.max_duty must be in (0, 1]".to_string(),
        ));
    }

    Ok(())
}
