//! Motion duration limits
//!
//! Some turret revisions do not detect the end of their travel, so driving a
//! motor longer than a full sweep strains it against the stop. Requests that
//! exceed an axis ceiling are cut down to a safe value strictly below it.
//! This is the only place these limits are applied.

use crate::command::{Action, MotionAction};
use crate::error::{ProtocolError, Result};
use std::time::Duration;

/// Time for a full horizontal sweep
pub const HORIZONTAL_CEILING: Duration = Duration::from_secs(8);
/// Horizontal duration used when a request exceeds the ceiling
pub const HORIZONTAL_SAFE: Duration = Duration::from_millis(6800);
/// Time for a full vertical sweep
pub const VERTICAL_CEILING: Duration = Duration::from_secs(2);
/// Vertical duration used when a request exceeds the ceiling
pub const VERTICAL_SAFE: Duration = Duration::from_millis(1500);

/// Per-axis ceilings and their safe replacements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationLimits {
    horizontal_ceiling: Duration,
    horizontal_safe: Duration,
    vertical_ceiling: Duration,
    vertical_safe: Duration,
}

impl Default for DurationLimits {
    fn default() -> Self {
        Self {
            horizontal_ceiling: HORIZONTAL_CEILING,
            horizontal_safe: HORIZONTAL_SAFE,
            vertical_ceiling: VERTICAL_CEILING,
            vertical_safe: VERTICAL_SAFE,
        }
    }
}

impl DurationLimits {
    /// Build custom limits
    ///
    /// Each safe value must be positive and strictly below its ceiling.
    pub fn new(
        horizontal_ceiling: Duration,
        horizontal_safe: Duration,
        vertical_ceiling: Duration,
        vertical_safe: Duration,
    ) -> Result<Self> {
        check_axis("horizontal", horizontal_ceiling, horizontal_safe)?;
        check_axis("vertical", vertical_ceiling, vertical_safe)?;

        Ok(Self {
            horizontal_ceiling,
            horizontal_safe,
            vertical_ceiling,
            vertical_safe,
        })
    }

    pub fn horizontal_ceiling(&self) -> Duration {
        self.horizontal_ceiling
    }

    pub fn horizontal_safe(&self) -> Duration {
        self.horizontal_safe
    }

    pub fn vertical_ceiling(&self) -> Duration {
        self.vertical_ceiling
    }

    pub fn vertical_safe(&self) -> Duration {
        self.vertical_safe
    }

    /// Effective pause for an action given the requested one
    ///
    /// Only pan and tilt motions are clamped; everything else passes through.
    ///
    /// # Example
    /// ```
    /// use protocol::{Action, DurationLimits, MotionAction};
    /// use std::time::Duration;
    ///
    /// let limits = DurationLimits::default();
    /// let left = Action::Motion(MotionAction::Left);
    /// assert_eq!(limits.normalize(left, Duration::from_secs(10)), Duration::from_millis(6800));
    /// assert_eq!(limits.normalize(left, Duration::from_secs(3)), Duration::from_secs(3));
    /// ```
    pub fn normalize(&self, action: Action, requested: Duration) -> Duration {
        match action {
            Action::Motion(motion) => self.normalize_motion(motion, requested),
            Action::Light(_) | Action::Shutdown => requested,
        }
    }

    fn normalize_motion(&self, motion: MotionAction, requested: Duration) -> Duration {
        if motion.is_horizontal() && requested > self.horizontal_ceiling {
            self.horizontal_safe
        } else if motion.is_vertical() && requested > self.vertical_ceiling {
            self.vertical_safe
        } else {
            requested
        }
    }
}

fn check_axis(axis: &str, ceiling: Duration, safe: Duration) -> Result<()> {
    if safe.is_zero() {
        return Err(ProtocolError::InvalidLimits(format!(
            "{} safe duration must be greater than zero",
            axis
        )));
    }
    if safe >= ceiling {
        return Err(ProtocolError::InvalidLimits(format!(
            "{} safe duration {:?} must be below its ceiling {:?}",
            axis, safe, ceiling
        )));
    }
    Ok(())
}
