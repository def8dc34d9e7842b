//! turretctl configuration management

use anyhow::{Context, Result, anyhow};
use driver::usb::KnownDevice;
use driver::{Pacing, SequencerConfig};
use protocol::{DeviceFamily, DeviceIdentity, DurationLimits, KNOWN_DEVICES, limits};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurretConfig {
    pub general: GeneralSettings,
    /// Per-device command queue
    #[serde(default)]
    pub queue: QueueSettings,
    /// Motion duration ceilings and their safe replacements
    #[serde(default)]
    pub limits: LimitSettings,
    /// Fixed pauses of the convenience actions
    #[serde(default)]
    pub pacing: PacingSettings,
    #[serde(default)]
    pub usb: UsbSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Commands held before callers block
    #[serde(default = "QueueSettings::default_capacity")]
    pub capacity: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: Self::default_capacity(),
        }
    }
}

impl QueueSettings {
    fn default_capacity() -> usize {
        common::DEFAULT_QUEUE_CAPACITY
    }
}

/// Duration limits in milliseconds
///
/// A requested move strictly longer than a ceiling is cut to the matching
/// safe value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitSettings {
    #[serde(default = "LimitSettings::default_horizontal_ceiling")]
    pub horizontal_ceiling_ms: u64,
    #[serde(default = "LimitSettings::default_horizontal_safe")]
    pub horizontal_safe_ms: u64,
    #[serde(default = "LimitSettings::default_vertical_ceiling")]
    pub vertical_ceiling_ms: u64,
    #[serde(default = "LimitSettings::default_vertical_safe")]
    pub vertical_safe_ms: u64,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            horizontal_ceiling_ms: Self::default_horizontal_ceiling(),
            horizontal_safe_ms: Self::default_horizontal_safe(),
            vertical_ceiling_ms: Self::default_vertical_ceiling(),
            vertical_safe_ms: Self::default_vertical_safe(),
        }
    }
}

impl LimitSettings {
    fn default_horizontal_ceiling() -> u64 {
        limits::HORIZONTAL_CEILING.as_millis() as u64
    }

    fn default_horizontal_safe() -> u64 {
        limits::HORIZONTAL_SAFE.as_millis() as u64
    }

    fn default_vertical_ceiling() -> u64 {
        limits::VERTICAL_CEILING.as_millis() as u64
    }

    fn default_vertical_safe() -> u64 {
        limits::VERTICAL_SAFE.as_millis() as u64
    }

    pub fn to_limits(&self) -> Result<DurationLimits> {
        DurationLimits::new(
            Duration::from_millis(self.horizontal_ceiling_ms),
            Duration::from_millis(self.horizontal_safe_ms),
            Duration::from_millis(self.vertical_ceiling_ms),
            Duration::from_millis(self.vertical_safe_ms),
        )
        .map_err(|e| anyhow!("Invalid [limits]: {}", e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingSettings {
    #[serde(default = "PacingSettings::default_fire_cooldown")]
    pub fire_cooldown_ms: u64,
    #[serde(default = "PacingSettings::default_blink_interval")]
    pub blink_interval_ms: u64,
    #[serde(default = "PacingSettings::default_stop")]
    pub stop_ms: u64,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            fire_cooldown_ms: Self::default_fire_cooldown(),
            blink_interval_ms: Self::default_blink_interval(),
            stop_ms: Self::default_stop(),
        }
    }
}

impl PacingSettings {
    fn default_fire_cooldown() -> u64 {
        driver::FIRE_COOLDOWN.as_millis() as u64
    }

    fn default_blink_interval() -> u64 {
        driver::BLINK_INTERVAL.as_millis() as u64
    }

    fn default_stop() -> u64 {
        driver::STOP_PAUSE.as_millis() as u64
    }

    pub fn to_pacing(&self) -> Pacing {
        Pacing {
            fire_cooldown: Duration::from_millis(self.fire_cooldown_ms),
            blink_interval: Duration::from_millis(self.blink_interval_ms),
            stop_pause: Duration::from_millis(self.stop_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbSettings {
    /// Control transfer timeout
    #[serde(default = "UsbSettings::default_timeout")]
    pub timeout_ms: u64,
    /// Devices to look for during discovery
    #[serde(default = "UsbSettings::default_devices")]
    pub devices: Vec<DeviceEntry>,
}

impl Default for UsbSettings {
    fn default() -> Self {
        Self {
            timeout_ms: Self::default_timeout(),
            devices: Self::default_devices(),
        }
    }
}

impl UsbSettings {
    fn default_timeout() -> u64 {
        driver::usb::DEFAULT_TIMEOUT.as_millis() as u64
    }

    fn default_devices() -> Vec<DeviceEntry> {
        KNOWN_DEVICES
            .iter()
            .map(|(identity, family)| DeviceEntry {
                vendor_id: format!("0x{:04x}", identity.vendor_id),
                product_id: format!("0x{:04x}", identity.product_id),
                family: *family,
            })
            .collect()
    }
}

/// A turret model to match during discovery
///
/// # Example Configuration
/// ```toml
/// [[usb.devices]]
/// vendor_id = "0x2123"
/// product_id = "0x1010"
/// family = "thunder"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Hex vendor ID with `0x` prefix
    pub vendor_id: String,
    /// Hex product ID with `0x` prefix
    pub product_id: String,
    pub family: DeviceFamily,
}

impl DeviceEntry {
    pub fn identity(&self) -> Result<DeviceIdentity> {
        Ok(DeviceIdentity::new(
            TurretConfig::parse_hex_id(&self.vendor_id, "vendor_id")?,
            TurretConfig::parse_hex_id(&self.product_id, "product_id")?,
        ))
    }
}

impl Default for TurretConfig {
    fn default() -> Self {
        Self {
            general: GeneralSettings {
                log_level: "info".to_string(),
            },
            queue: QueueSettings::default(),
            limits: LimitSettings::default(),
            pacing: PacingSettings::default(),
            usb: UsbSettings::default(),
        }
    }
}

impl TurretConfig {
    /// Load configuration from the specified path
    ///
    /// Without a path, the standard locations are tried in order.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => expand_path(&p),
            None => Self::find_existing(&Self::search_paths())
                .ok_or_else(|| anyhow!("No configuration file found"))?,
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: TurretConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load the first configuration file found, or defaults if there is none
    ///
    /// A file that exists but cannot be read, parsed or validated is an
    /// error, never a silent fallback.
    pub fn load_or_default() -> Result<Self> {
        Self::load_first_of(&Self::search_paths())
    }

    /// Like [`Self::load_or_default`], over an explicit list of candidates
    pub fn load_first_of(candidates: &[PathBuf]) -> Result<Self> {
        match Self::find_existing(candidates) {
            Some(path) => Self::load(Some(path)),
            None => {
                tracing::warn!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Standard locations, in search order
    pub fn search_paths() -> Vec<PathBuf> {
        vec![
            Self::default_path(),
            PathBuf::from("/etc/rust-turret/turretctl.toml"),
        ]
    }

    fn find_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
        candidates.iter().find(|p| p.exists()).cloned()
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("rust-turret").join("turretctl.toml")
        } else {
            PathBuf::from(".config/rust-turret/turretctl.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.general.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.queue.capacity == 0 {
            return Err(anyhow!("Queue capacity must be at least 1"));
        }

        self.limits.to_limits()?;

        if self.usb.timeout_ms == 0 {
            return Err(anyhow!("USB timeout must be greater than 0"));
        }

        if self.usb.devices.is_empty() {
            return Err(anyhow!("At least one entry is required in usb.devices"));
        }

        for entry in &self.usb.devices {
            entry.identity()?;
            if entry.family == DeviceFamily::Unknown {
                return Err(anyhow!(
                    "Device {}:{} has family 'unknown', expected 'thunder' or 'classic'",
                    entry.vendor_id,
                    entry.product_id
                ));
            }
        }

        Ok(())
    }

    pub fn duration_limits(&self) -> Result<DurationLimits> {
        self.limits.to_limits()
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing.to_pacing()
    }

    pub fn usb_timeout(&self) -> Duration {
        Duration::from_millis(self.usb.timeout_ms)
    }

    /// Devices to match during discovery
    pub fn known_devices(&self) -> Result<Vec<KnownDevice>> {
        self.usb
            .devices
            .iter()
            .map(|entry| Ok(KnownDevice::new(entry.identity()?, entry.family)))
            .collect()
    }

    /// Sequencer settings for one device
    pub fn sequencer_config(&self, name: impl Into<String>) -> Result<SequencerConfig> {
        Ok(SequencerConfig {
            name: name.into(),
            capacity: self.queue.capacity,
            limits: self.duration_limits()?,
        })
    }

    /// Parse a hex ID (vendor or product)
    fn parse_hex_id(id: &str, name: &str) -> Result<u16> {
        let hex_part = id
            .strip_prefix("0x")
            .or_else(|| id.strip_prefix("0X"))
            .ok_or_else(|| {
                anyhow!(
                    "Invalid {} '{}', must start with '0x' (e.g., '0x1234')",
                    name,
                    id
                )
            })?;

        if hex_part.is_empty() || hex_part.len() > 4 {
            return Err(anyhow!(
                "Invalid {} '{}', hex part must be 1-4 digits",
                name,
                id
            ));
        }

        u16::from_str_radix(hex_part, 16)
            .map_err(|_| anyhow!("Invalid {} '{}', not a valid hex number", name, id))
    }
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}
