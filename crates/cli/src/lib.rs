//! turretctl library
//!
//! Configuration and action handling behind the `turretctl` binary.

pub mod actions;
pub mod config;

pub use actions::{ActionKind, DEFAULT_BLINKS, MAX_SHOTS, TurretAction};
pub use config::TurretConfig;
