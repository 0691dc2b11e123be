//! Runtime settings loaded from TOML.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::device::{DEFAULT_COMMAND_PORT, DeviceAddress};
use crate::error::{Result, TvError};
use crate::retry::RetryPolicy;

/// Tunables for sessions, uploads and slideshows.
///
/// Every field has a default, so an empty or missing file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Command/feature channel port
    pub command_port: u16,
    /// Reachability check timeout
    pub probe_timeout_ms: u64,
    /// Timeout for optional capability queries (gallery mode support/state)
    pub capability_timeout_ms: u64,
    /// Timeout for any other single call to the device
    pub device_timeout_ms: u64,
    /// How long the power key is held
    pub power_hold_seconds: u32,
    /// Pause after a power command before status is re-read
    pub power_settle_delay_ms: u64,
    /// Listing polls used to confirm an upload
    pub upload_attempts: u32,
    /// Delay before each confirmation poll
    pub upload_poll_delay_ms: u64,
    /// Matte applied when an upload names none
    pub default_matte: String,
    /// Default slideshow interval
    pub slideshow_interval_secs: u64,
    pub slideshow_shuffle: bool,
    /// Known devices
    pub devices: Vec<DeviceEntry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            command_port: DEFAULT_COMMAND_PORT,
            probe_timeout_ms: 1500,
            capability_timeout_ms: 1000,
            device_timeout_ms: 10_000,
            power_hold_seconds: 3,
            power_settle_delay_ms: 3000,
            upload_attempts: 5,
            upload_poll_delay_ms: 1000,
            default_matte: "shadowbox_polar".to_string(),
            slideshow_interval_secs: 5,
            slideshow_shuffle: true,
            devices: Vec::new(),
        }
    }
}

/// A named device from the `[[devices]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub name: String,
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Settings {
    /// Load settings from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings = Self::from_toml(&contents).map_err(|e| match e {
            TvError::Config(msg) => TvError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })?;
        info!(
            path = %path.display(),
            devices = settings.devices.len(),
            "Loaded config"
        );
        Ok(settings)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(contents).map_err(|e| TvError::Config(e.message().to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.command_port == 0 {
            return Err(TvError::Config("command_port must be non-zero".to_string()));
        }
        if self.device_timeout_ms == 0 {
            return Err(TvError::Config("device_timeout_ms must be non-zero".to_string()));
        }
        if self.upload_attempts == 0 {
            return Err(TvError::Config("upload_attempts must be at least 1".to_string()));
        }
        if self.slideshow_interval_secs == 0 {
            return Err(TvError::Config(
                "slideshow_interval_secs must be at least 1".to_string(),
            ));
        }
        for entry in &self.devices {
            if entry.host.trim().is_empty() {
                return Err(TvError::Config(format!("device '{}' has no host", entry.name)));
            }
        }
        Ok(())
    }

    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub const fn capability_timeout(&self) -> Duration {
        Duration::from_millis(self.capability_timeout_ms)
    }

    pub const fn device_timeout(&self) -> Duration {
        Duration::from_millis(self.device_timeout_ms)
    }

    pub const fn power_settle_delay(&self) -> Duration {
        Duration::from_millis(self.power_settle_delay_ms)
    }

    pub const fn slideshow_interval(&self) -> Duration {
        Duration::from_secs(self.slideshow_interval_secs)
    }

    /// Bounded polling used to confirm uploads.
    pub const fn upload_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.upload_attempts,
            Duration::from_millis(self.upload_poll_delay_ms),
        )
    }

    /// Address of a known device by name (case-insensitive).
    pub fn device_address(&self, name: &str) -> Option<DeviceAddress> {
        self.devices
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .map(|d| DeviceAddress::new(d.host.clone(), d.port.unwrap_or(self.command_port)))
    }

    /// Resolve a `--host` value: a known device name, else an address.
    pub fn resolve_target(&self, target: &str, port: Option<u16>) -> Result<DeviceAddress> {
        if let Some(mut addr) = self.device_address(target) {
            if let Some(port) = port {
                addr.port = port;
            }
            return Ok(addr);
        }
        let mut addr = DeviceAddress::parse_with_port(target, self.command_port)?;
        if let Some(port) = port {
            addr.port = port;
        }
        Ok(addr)
    }
}
