//! USB subsystem
//!
//! Real-hardware collaborators of the sequencer:
//! - Turret discovery against the known vendor/product table
//! - The rusb control-transfer transport
//!
//! Nothing in here runs on a worker thread except
//! [`RusbTransport::control_transfer`], which the worker calls through the
//! [`crate::Transport`] trait.

pub mod device;
pub mod discovery;

pub use device::{DEFAULT_TIMEOUT, RusbTransport};
pub use discovery::{
    DiscoveredTurret, KnownDevice, TurretInfo, default_known_devices, find_turrets, list_turrets,
};
