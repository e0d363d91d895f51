//! # Rondo HID
//!
//! Operator input for the control core:
//!
//! - [`gamepad`]: the axis/button/POV sample model, the [`InputSource`]
//!   trait, and the disconnected-controller convention (all zeros, never an
//!   error).
//! - [`drive`]: the pure field-centric drive pipeline that turns a gamepad
//!   sample into a chassis velocity command.
//!
//! [`InputSource`]: gamepad::InputSource

pub mod drive;
pub mod gamepad;

pub use drive::{chassis_command, ChassisSpeeds, DriveConfig};
pub use gamepad::{Axis, Button, GamepadSample, InputSource, ScriptedGamepad};
