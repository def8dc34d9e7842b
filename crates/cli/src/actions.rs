//! What turretctl asks every turret to do

use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;
use driver::Turret;
use protocol::MotionAction;
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

/// Most missiles a single `fire` will launch
pub const MAX_SHOTS: u32 = 4;
/// Blinks when `blink` is given no count
pub const DEFAULT_BLINKS: u32 = 3;

/// Action names accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionKind {
    Left,
    Right,
    Up,
    Down,
    Light,
    Fire,
    Reset,
    Blink,
    Demo,
}

/// A parsed action, ready to be applied to any number of turrets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurretAction {
    /// Move for `duration`, then stop
    Move {
        direction: MotionAction,
        duration: Duration,
    },
    Light(bool),
    Fire(u32),
    Reset,
    Blink(u32),
    Demo,
}

impl TurretAction {
    /// Build an action from its name and optional argument
    pub fn parse(kind: ActionKind, value: Option<&str>) -> Result<Self> {
        let action = match kind {
            ActionKind::Left => Self::movement(MotionAction::Left, value)?,
            ActionKind::Right => Self::movement(MotionAction::Right, value)?,
            ActionKind::Up => Self::movement(MotionAction::Up, value)?,
            ActionKind::Down => Self::movement(MotionAction::Down, value)?,
            ActionKind::Light => TurretAction::Light(value == Some("on")),
            ActionKind::Fire => {
                let shots = parse_count(value, 1, "shots")?;
                if shots > MAX_SHOTS {
                    warn!("Only {} shots per fire, ignoring the rest", MAX_SHOTS);
                }
                TurretAction::Fire(shots.min(MAX_SHOTS))
            }
            ActionKind::Reset => TurretAction::Reset,
            ActionKind::Blink => TurretAction::Blink(parse_count(value, DEFAULT_BLINKS, "blinks")?),
            ActionKind::Demo => TurretAction::Demo,
        };
        Ok(action)
    }

    fn movement(direction: MotionAction, value: Option<&str>) -> Result<Self> {
        let millis = match value {
            Some(v) => v
                .parse::<u64>()
                .with_context(|| format!("Invalid duration '{}', expected milliseconds", v))?,
            None => 0,
        };
        Ok(TurretAction::Move {
            direction,
            duration: Duration::from_millis(millis),
        })
    }

    /// Queue this action on `turret`
    ///
    /// Returns once everything is queued, not once it has run.
    pub fn apply(&self, turret: &Turret) -> driver::Result<()> {
        match *self {
            TurretAction::Move {
                direction,
                duration,
            } => {
                match direction {
                    MotionAction::Left => turret.left(duration)?,
                    MotionAction::Right => turret.right(duration)?,
                    MotionAction::Up => turret.up(duration)?,
                    MotionAction::Down => turret.down(duration)?,
                    MotionAction::Fire => turret.fire(1)?,
                    MotionAction::Stop => {}
                }
                turret.stop()
            }
            TurretAction::Light(on) => turret.light(on),
            TurretAction::Fire(shots) => turret.fire(shots),
            TurretAction::Reset => turret.reset(),
            TurretAction::Blink(times) => turret.blink_on(times),
            TurretAction::Demo => Self::demo(turret),
        }
    }

    /// Light on, sweep left and right, light off
    fn demo(turret: &Turret) -> driver::Result<()> {
        let has_light = turret.family().has_light();
        if !has_light {
            info!(
                "{} has no light, running the sweep only",
                turret.human_readable_name()
            );
        }

        if has_light {
            turret.light(true)?;
        }
        turret.left(Duration::from_secs(1))?;
        turret.right(Duration::from_secs(1))?;
        turret.stop()?;
        if has_light {
            turret.light(false)?;
        }
        Ok(())
    }
}

impl fmt::Display for TurretAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurretAction::Move {
                direction,
                duration,
            } => write!(f, "{:?} for {:?}", direction, duration),
            TurretAction::Light(true) => f.write_str("light on"),
            TurretAction::Light(false) => f.write_str("light off"),
            TurretAction::Fire(shots) => write!(f, "fire x{}", shots),
            TurretAction::Reset => f.write_str("reset"),
            TurretAction::Blink(times) => write!(f, "blink x{}", times),
            TurretAction::Demo => f.write_str("demo"),
        }
    }
}

fn parse_count(value: Option<&str>, default: u32, what: &str) -> Result<u32> {
    match value {
        Some(v) => v
            .parse::<u32>()
            .map_err(|_| anyhow!("Invalid number of {} '{}'", what, v)),
        None => Ok(default),
    }
}
