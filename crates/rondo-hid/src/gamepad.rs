//! Gamepad sampling model.
//!
//! A sample is one per-tick snapshot of a controller: continuous axes in
//! [-1, 1] (triggers in [0, 1]), momentary buttons, and the POV hat as an
//! angle in degrees. A disconnected controller yields the all-zero sample by
//! convention; input loss is never an error.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Continuous controller axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    LeftX,
    LeftY,
    RightX,
    RightY,
    LeftTrigger,
    RightTrigger,
}

/// Momentary controller buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    Back,
    Start,
}

/// One tick's snapshot of a controller.
#[derive(Debug, Clone, Default)]
pub struct GamepadSample {
    axes: HashMap<Axis, f64>,
    buttons: HashMap<Button, bool>,
    pov: Option<u16>,
}

impl GamepadSample {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sample a disconnected controller reports: every axis zero, every
    /// button released, no POV.
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Axis value; unsampled axes read as zero.
    pub fn axis(&self, axis: Axis) -> f64 {
        self.axes.get(&axis).copied().unwrap_or(0.0)
    }

    /// Button state; unsampled buttons read as released.
    pub fn button(&self, button: Button) -> bool {
        self.buttons.get(&button).copied().unwrap_or(false)
    }

    /// POV hat angle in degrees, when pressed.
    pub fn pov(&self) -> Option<u16> {
        self.pov
    }

    /// Whether the POV hat points at the given angle.
    pub fn pov_at(&self, degrees: u16) -> bool {
        self.pov == Some(degrees)
    }

    pub fn with_axis(mut self, axis: Axis, value: f64) -> Self {
        self.axes.insert(axis, value);
        self
    }

    pub fn with_button(mut self, button: Button, pressed: bool) -> Self {
        self.buttons.insert(button, pressed);
        self
    }

    pub fn with_pov(mut self, degrees: u16) -> Self {
        self.pov = Some(degrees);
        self
    }
}

/// Source of controller samples, polled exactly once per tick before any
/// binding is evaluated.
pub trait InputSource {
    fn sample(&mut self) -> GamepadSample;
}

/// Replays a fixed script of samples, then reports disconnected.
///
/// Used by tests and demo runs where no physical controller exists.
#[derive(Debug, Default)]
pub struct ScriptedGamepad {
    frames: VecDeque<GamepadSample>,
}

impl ScriptedGamepad {
    pub fn new(frames: impl IntoIterator<Item = GamepadSample>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Queue the same sample for `ticks` consecutive ticks.
    pub fn hold(mut self, sample: GamepadSample, ticks: usize) -> Self {
        for _ in 0..ticks {
            self.frames.push_back(sample.clone());
        }
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl InputSource for ScriptedGamepad {
    fn sample(&mut self) -> GamepadSample {
        self.frames
            .pop_front()
            .unwrap_or_else(GamepadSample::disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_sample_reads_all_zero() {
        let sample = GamepadSample::disconnected();
        assert_eq!(sample.axis(Axis::LeftY), 0.0);
        assert!(!sample.button(Button::A));
        assert_eq!(sample.pov(), None);
    }

    #[test]
    fn test_sample_builders() {
        let sample = GamepadSample::new()
            .with_axis(Axis::LeftTrigger, 0.75)
            .with_button(Button::Back, true)
            .with_pov(180);
        assert_eq!(sample.axis(Axis::LeftTrigger), 0.75);
        assert!(sample.button(Button::Back));
        assert!(sample.pov_at(180));
        assert!(!sample.pov_at(0));
    }

    #[test]
    fn test_scripted_gamepad_falls_back_to_disconnected() {
        let mut pad = ScriptedGamepad::new([GamepadSample::new().with_button(Button::B, true)]);
        assert!(pad.sample().button(Button::B));
        assert!(!pad.sample().button(Button::B));
        assert_eq!(pad.remaining(), 0);
    }

    #[test]
    fn test_scripted_hold_repeats_sample() {
        let mut pad = ScriptedGamepad::default()
            .hold(GamepadSample::new().with_button(Button::Y, true), 3);
        for _ in 0..3 {
            assert!(pad.sample().button(Button::Y));
        }
        assert!(!pad.sample().button(Button::Y));
    }
}
