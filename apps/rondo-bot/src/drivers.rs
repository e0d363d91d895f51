//! Simulated mechanism drivers.
//!
//! The control core only ever sees these through action bodies; swapping in
//! real motor-controller drivers changes nothing above this layer. The
//! simulated versions integrate simple first-order motion so closed-loop
//! hold and at-setpoint predicates behave meaningfully in tests and demo
//! runs. Every driver can be armed with a fault to exercise the recoverable
//! fault path: faults are reported upward, never panicked on.

use thiserror::Error;

use rondo_hid::ChassisSpeeds;

/// Recoverable hardware fault reported by a driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("hardware fault: {0}")]
    Fault(String),
}

/// Swerve drivetrain driver: accepts a chassis velocity command per tick.
#[derive(Debug, Default)]
pub struct SwerveDriver {
    commanded: ChassisSpeeds,
    fault: Option<String>,
}

impl SwerveDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, command: ChassisSpeeds) -> Result<(), DriverError> {
        if let Some(fault) = &self.fault {
            return Err(DriverError::Fault(fault.clone()));
        }
        self.commanded = command;
        Ok(())
    }

    /// Most recently accepted command.
    pub fn commanded(&self) -> ChassisSpeeds {
        self.commanded
    }

    pub fn arm_fault(&mut self, reason: impl Into<String>) {
        self.fault = Some(reason.into());
    }
}

/// Closed-loop axis driver (elevator in meters, wrist in degrees): slews the
/// position toward a setpoint at a bounded rate.
#[derive(Debug)]
pub struct AxisDriver {
    position: f64,
    setpoint: f64,
    max_rate: f64,
    fault: Option<String>,
}

impl AxisDriver {
    /// `max_rate` in position units per second.
    pub fn new(max_rate: f64) -> Self {
        Self {
            position: 0.0,
            setpoint: 0.0,
            max_rate,
            fault: None,
        }
    }

    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// One closed-loop step toward the setpoint.
    pub fn track(&mut self, dt: f64) -> Result<(), DriverError> {
        if let Some(fault) = &self.fault {
            return Err(DriverError::Fault(fault.clone()));
        }
        let error = self.setpoint - self.position;
        let step = (self.max_rate * dt).min(error.abs());
        self.position += step.copysign(error);
        Ok(())
    }

    pub fn at_setpoint(&self, tolerance: f64) -> bool {
        (self.setpoint - self.position).abs() <= tolerance
    }

    pub fn arm_fault(&mut self, reason: impl Into<String>) {
        self.fault = Some(reason.into());
    }
}

/// Open-loop axis driven by a duty cycle (the climber).
#[derive(Debug)]
pub struct ManualAxisDriver {
    position: f64,
    max_rate: f64,
    last_duty: f64,
    fault: Option<String>,
}

impl ManualAxisDriver {
    /// `max_rate` in position units per second at full duty.
    pub fn new(max_rate: f64) -> Self {
        Self {
            position: 0.0,
            max_rate,
            last_duty: 0.0,
            fault: None,
        }
    }

    pub fn apply(&mut self, duty: f64, dt: f64) -> Result<(), DriverError> {
        if let Some(fault) = &self.fault {
            return Err(DriverError::Fault(fault.clone()));
        }
        let duty = duty.clamp(-1.0, 1.0);
        self.last_duty = duty;
        self.position += duty * self.max_rate * dt;
        Ok(())
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn last_duty(&self) -> f64 {
        self.last_duty
    }

    pub fn arm_fault(&mut self, reason: impl Into<String>) {
        self.fault = Some(reason.into());
    }
}

/// Intake roller driver: holds whatever duty it was last commanded.
#[derive(Debug, Default)]
pub struct RollerDriver {
    duty: f64,
    fault: Option<String>,
}

impl RollerDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&mut self, duty: f64) -> Result<(), DriverError> {
        if let Some(fault) = &self.fault {
            return Err(DriverError::Fault(fault.clone()));
        }
        self.duty = duty.clamp(-1.0, 1.0);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), DriverError> {
        self.run(0.0)
    }

    pub fn duty(&self) -> f64 {
        self.duty
    }

    pub fn arm_fault(&mut self, reason: impl Into<String>) {
        self.fault = Some(reason.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_driver_slews_toward_setpoint() {
        let mut axis = AxisDriver::new(1.0);
        axis.set_setpoint(0.5);
        axis.track(0.1).unwrap();
        assert!((axis.position() - 0.1).abs() < 1e-9);
        for _ in 0..10 {
            axis.track(0.1).unwrap();
        }
        assert!(axis.at_setpoint(1e-9));
    }

    #[test]
    fn test_axis_driver_does_not_overshoot() {
        let mut axis = AxisDriver::new(10.0);
        axis.set_setpoint(0.05);
        axis.track(0.1).unwrap(); // full step would be 1.0
        assert!((axis.position() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_manual_axis_clamps_duty() {
        let mut climber = ManualAxisDriver::new(1.0);
        climber.apply(4.0, 1.0).unwrap();
        assert!((climber.position() - 1.0).abs() < 1e-9);
        assert_eq!(climber.last_duty(), 1.0);
    }

    #[test]
    fn test_armed_fault_surfaces_as_error() {
        let mut roller = RollerDriver::new();
        roller.arm_fault("stalled");
        assert!(matches!(roller.run(0.8), Err(DriverError::Fault(_))));
        assert_eq!(roller.duty(), 0.0);
    }
}
