//! Turret command model
//!
//! A [`Command`] is one intent for a turret: what to do (the [`Action`]) and
//! how long the device should be left alone afterwards. Commands are plain
//! `Copy` values and can be handed across threads freely.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Wire code of the motion (motor) category
pub const CATEGORY_MOTION: u8 = 0x02;
/// Wire code of the light (LED) category
pub const CATEGORY_LIGHT: u8 = 0x03;
/// Wire code of the shutdown sentinel. Never sent to a device.
pub const CATEGORY_SHUTDOWN: u8 = 0x99;

/// Which part of the turret a command controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Pan/tilt motors and the launcher
    Motion,
    /// The auxiliary light
    Light,
    /// Sequencer termination sentinel
    Shutdown,
}

impl Category {
    /// Wire code placed in the first payload byte
    pub const fn code(self) -> u8 {
        match self {
            Category::Motion => CATEGORY_MOTION,
            Category::Light => CATEGORY_LIGHT,
            Category::Shutdown => CATEGORY_SHUTDOWN,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Motion => f.write_str("motion"),
            Category::Light => f.write_str("light"),
            Category::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// Motor actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionAction {
    Down,
    Up,
    Left,
    Right,
    Fire,
    Stop,
}

impl MotionAction {
    pub const fn code(self) -> u8 {
        match self {
            MotionAction::Down => 0x01,
            MotionAction::Up => 0x02,
            MotionAction::Left => 0x04,
            MotionAction::Right => 0x08,
            MotionAction::Fire => 0x10,
            MotionAction::Stop => 0x20,
        }
    }

    /// True for the pan axis (left/right)
    pub const fn is_horizontal(self) -> bool {
        matches!(self, MotionAction::Left | MotionAction::Right)
    }

    /// True for the tilt axis (up/down)
    pub const fn is_vertical(self) -> bool {
        matches!(self, MotionAction::Up | MotionAction::Down)
    }
}

/// Light actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightAction {
    Off,
    On,
}

impl LightAction {
    pub const fn code(self) -> u8 {
        match self {
            LightAction::Off => 0x00,
            LightAction::On => 0x01,
        }
    }
}

impl From<bool> for LightAction {
    fn from(on: bool) -> Self {
        if on { LightAction::On } else { LightAction::Off }
    }
}

/// The sub-action of a command, tagged by category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Motion(MotionAction),
    Light(LightAction),
    Shutdown,
}

impl Action {
    pub const fn category(self) -> Category {
        match self {
            Action::Motion(_) => Category::Motion,
            Action::Light(_) => Category::Light,
            Action::Shutdown => Category::Shutdown,
        }
    }

    /// (category, value) wire codes
    pub const fn wire_codes(self) -> (u8, u8) {
        match self {
            Action::Motion(m) => (CATEGORY_MOTION, m.code()),
            Action::Light(l) => (CATEGORY_LIGHT, l.code()),
            Action::Shutdown => (CATEGORY_SHUTDOWN, 0x00),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Motion(m) => write!(f, "{:?}", m),
            Action::Light(l) => write!(f, "Light({:?})", l),
            Action::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// One queued intent for a turret
///
/// `requested_duration` is the pause the caller asks for after the command
/// has been sent. Zero means no pause. The sequencer may shorten it for
/// motions (see [`crate::limits::DurationLimits`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    action: Action,
    requested_duration: Duration,
}

impl Command {
    pub const fn new(action: Action, requested_duration: Duration) -> Self {
        Self {
            action,
            requested_duration,
        }
    }

    pub const fn motion(action: MotionAction, duration: Duration) -> Self {
        Self::new(Action::Motion(action), duration)
    }

    pub const fn light(action: LightAction, duration: Duration) -> Self {
        Self::new(Action::Light(action), duration)
    }

    /// The sequencer termination sentinel
    pub const fn shutdown() -> Self {
        Self::new(Action::Shutdown, Duration::ZERO)
    }

    pub const fn up(duration: Duration) -> Self {
        Self::motion(MotionAction::Up, duration)
    }

    pub const fn down(duration: Duration) -> Self {
        Self::motion(MotionAction::Down, duration)
    }

    pub const fn left(duration: Duration) -> Self {
        Self::motion(MotionAction::Left, duration)
    }

    pub const fn right(duration: Duration) -> Self {
        Self::motion(MotionAction::Right, duration)
    }

    pub const fn fire(cooldown: Duration) -> Self {
        Self::motion(MotionAction::Fire, cooldown)
    }

    pub const fn stop(duration: Duration) -> Self {
        Self::motion(MotionAction::Stop, duration)
    }

    pub const fn light_on(duration: Duration) -> Self {
        Self::light(LightAction::On, duration)
    }

    pub const fn light_off(duration: Duration) -> Self {
        Self::light(LightAction::Off, duration)
    }

    pub const fn action(&self) -> Action {
        self.action
    }

    pub const fn category(&self) -> Category {
        self.action.category()
    }

    pub const fn requested_duration(&self) -> Duration {
        self.requested_duration
    }

    pub const fn wire_codes(&self) -> (u8, u8) {
        self.action.wire_codes()
    }

    pub const fn is_shutdown(&self) -> bool {
        matches!(self.action, Action::Shutdown)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.action, self.requested_duration)
    }
}
