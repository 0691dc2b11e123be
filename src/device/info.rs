//! Device-level value types shared by the channels and the session layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TvError;

/// Default port of the command and feature channels.
pub const DEFAULT_COMMAND_PORT: u16 = 8002;

/// Remote key that toggles power (held) and gallery mode (clicked).
pub const KEY_POWER: &str = "KEY_POWER";

/// Network address + port pair identifying one device.
///
/// This is the key for session identity: the registry keeps exactly one
/// live session per address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceAddress {
    /// Hostname or IP address
    pub host: String,
    /// Command channel port
    pub port: u16,
}

impl DeviceAddress {
    /// Create an address from a host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Create an address on the default command port.
    pub fn with_default_port(host: impl Into<String>) -> Self {
        Self::new(host, DEFAULT_COMMAND_PORT)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl DeviceAddress {
    /// Parse `host`, `host:port` or `[v6]:port`, using `default_port` when
    /// the text names no port.
    pub fn parse_with_port(s: &str, default_port: u16) -> Result<Self, TvError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TvError::InvalidArgument("empty device address".to_string()));
        }

        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(|| {
                TvError::InvalidArgument(format!("unterminated IPv6 address: {s}"))
            })?;
            let port = match tail.strip_prefix(':') {
                Some(p) => parse_port(p)?,
                None if tail.is_empty() => default_port,
                None => return Err(TvError::InvalidArgument(format!("invalid address: {s}"))),
            };
            return Ok(Self::new(host, port));
        }

        match s.rsplit_once(':') {
            // A bare IPv6 address has several colons and no port.
            Some((host, port)) if !host.contains(':') => Ok(Self::new(host, parse_port(port)?)),
            _ => Ok(Self::new(s, default_port)),
        }
    }
}

impl FromStr for DeviceAddress {
    type Err = TvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with_port(s, DEFAULT_COMMAND_PORT)
    }
}

fn parse_port(raw: &str) -> Result<u16, TvError> {
    raw.parse::<u16>()
        .map_err(|_| TvError::InvalidArgument(format!("invalid port: {raw}")))
}

/// Point-in-time device information from the status channel.
///
/// The raw payload is kept verbatim; accessors pull out the fields the
/// session layer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceInfo {
    pub raw: Value,
}

impl DeviceInfo {
    pub const fn new(raw: Value) -> Self {
        Self { raw }
    }

    fn device_field(&self, name: &str) -> Option<&str> {
        self.raw.get("device")?.get(name)?.as_str()
    }

    /// Reported power state string, if any.
    pub fn power_state(&self) -> Option<&str> {
        self.device_field("PowerState")
    }

    /// True when the device reports `PowerState == "on"`. A missing field reads as off.
    pub fn powered_on(&self) -> bool {
        self.power_state() == Some("on")
    }

    pub fn name(&self) -> Option<&str> {
        self.device_field("name")
    }

    pub fn model_name(&self) -> Option<&str> {
        self.device_field("modelName")
    }
}

/// Image collections exposed by the feature channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageCategory {
    /// User uploads
    #[default]
    #[serde(rename = "MY-C0002")]
    MyPhotos,
    /// Favourites
    #[serde(rename = "MY-C0004")]
    Favorites,
    /// Vendor store images
    #[serde(rename = "MY-C0008")]
    Store,
}

impl ImageCategory {
    /// Numeric code used by callers (2, 4 or 8).
    pub const fn code(self) -> u8 {
        match self {
            Self::MyPhotos => 2,
            Self::Favorites => 4,
            Self::Store => 8,
        }
    }

    /// Category identifier understood by the device.
    pub const fn id(self) -> &'static str {
        match self {
            Self::MyPhotos => "MY-C0002",
            Self::Favorites => "MY-C0004",
            Self::Store => "MY-C0008",
        }
    }

    /// Parse a numeric category code.
    pub fn from_code(code: u8) -> Result<Self, TvError> {
        match code {
            2 => Ok(Self::MyPhotos),
            4 => Ok(Self::Favorites),
            8 => Ok(Self::Store),
            other => Err(TvError::InvalidArgument(format!(
                "invalid category {other}: use 2 (my photos), 4 (favorites) or 8 (store)"
            ))),
        }
    }
}

/// An image stored on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub content_id: String,
    pub created_at: DateTime<Utc>,
    pub category: ImageCategory,
}

/// How a remote key is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyPress {
    /// Short press
    Click,
    /// Long press held for `seconds`
    Hold { seconds: u32 },
}

/// Gallery mode state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtMode {
    On,
    Off,
}

impl ArtMode {
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

/// Parameters of an image upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOptions {
    /// File extension, e.g. `png` or `jpg`
    pub file_type: String,
    /// Landscape matte
    pub matte: String,
    /// Portrait matte
    pub portrait_matte: String,
}

/// Device-native scheduled rotation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoRotation {
    /// Minutes between images; 0 disables rotation
    pub interval_minutes: u32,
    pub shuffle: bool,
    pub category: ImageCategory,
}
