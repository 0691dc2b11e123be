//! Channel abstraction layer for TV devices.
//!
//! A device is driven through three independent capabilities: a command
//! channel for remote keys, a status poller for power/device info, and a
//! feature channel for gallery mode and image management. The wire
//! protocol behind them lives outside this crate; this module only defines
//! the capabilities the session layer drives, plus an in-memory simulated
//! appliance for tests and `--simulate` runs.

mod info;
pub mod mock;

pub use info::{
    ArtMode, AutoRotation, DEFAULT_COMMAND_PORT, DeviceAddress, DeviceInfo, ImageAsset,
    ImageCategory, KEY_POWER, KeyPress, UploadOptions,
};

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a channel implementation.
///
/// Transports classify their own failures; the session layer never
/// inspects message text to decide what went wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("no route to device: {0}")]
    Unreachable(String),

    /// Reachable, but the device refused pairing from this network.
    #[error("pairing rejected: {0}")]
    PairingRejected(String),

    #[error("connection refused: {0}")]
    Refused(String),

    #[error("timed out: {0}")]
    TimedOut(String),

    #[error("{0} not supported")]
    Unsupported(String),

    #[error("channel closed")]
    Closed,

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Convenience alias for channel results.
pub type ChannelResult<T> = std::result::Result<T, ChannelError>;

/// Remote-key channel.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn open(&self) -> ChannelResult<()>;

    async fn close(&self) -> ChannelResult<()>;

    /// Send a single key press.
    async fn send_key(&self, key: &str, press: KeyPress) -> ChannelResult<()>;
}

/// Point-in-time device status. Holds no channel state.
#[async_trait]
pub trait StatusPoller: Send + Sync {
    async fn device_info(&self) -> ChannelResult<DeviceInfo>;
}

/// Gallery-mode and image management channel.
#[async_trait]
pub trait FeatureChannel: Send + Sync {
    async fn open(&self) -> ChannelResult<()>;

    async fn close(&self) -> ChannelResult<()>;

    /// Whether the device offers gallery mode at all.
    async fn supported(&self) -> ChannelResult<bool>;

    async fn get_mode(&self) -> ChannelResult<ArtMode>;

    async fn list_images(&self, category: ImageCategory) -> ChannelResult<Vec<ImageAsset>>;

    /// Upload an image. The returned id, when present, is not authoritative.
    async fn upload(&self, bytes: Vec<u8>, options: UploadOptions)
    -> ChannelResult<Option<String>>;

    async fn delete_images(&self, content_ids: &[String]) -> ChannelResult<()>;

    /// Display one image.
    async fn select_image(&self, content_id: &str) -> ChannelResult<()>;

    async fn get_auto_rotation(&self) -> ChannelResult<AutoRotation>;

    async fn set_auto_rotation(&self, rotation: AutoRotation) -> ChannelResult<()>;
}

/// The three channels of one device, opened and closed together.
#[derive(Clone)]
pub struct DeviceChannels {
    pub command: Arc<dyn CommandChannel>,
    pub status: Arc<dyn StatusPoller>,
    pub feature: Arc<dyn FeatureChannel>,
}

impl std::fmt::Debug for DeviceChannels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceChannels").finish_non_exhaustive()
    }
}

/// Builds unopened channel handles for a device address.
pub trait ChannelFactory: Send + Sync {
    fn channels(&self, address: &DeviceAddress) -> DeviceChannels;
}

/// Factory for builds without a wire transport.
///
/// Every channel fails to open with [`ChannelError::Unsupported`], so device
/// commands report a clear error after the real connectivity probe.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTransport;

fn no_transport<T>() -> ChannelResult<T> {
    Err(ChannelError::Unsupported("wire transport".to_string()))
}

#[async_trait]
impl CommandChannel for NoTransport {
    async fn open(&self) -> ChannelResult<()> {
        no_transport()
    }

    async fn close(&self) -> ChannelResult<()> {
        Ok(())
    }

    async fn send_key(&self, _key: &str, _press: KeyPress) -> ChannelResult<()> {
        no_transport()
    }
}

#[async_trait]
impl StatusPoller for NoTransport {
    async fn device_info(&self) -> ChannelResult<DeviceInfo> {
        no_transport()
    }
}

#[async_trait]
impl FeatureChannel for NoTransport {
    async fn open(&self) -> ChannelResult<()> {
        no_transport()
    }

    async fn close(&self) -> ChannelResult<()> {
        Ok(())
    }

    async fn supported(&self) -> ChannelResult<bool> {
        Ok(false)
    }

    async fn get_mode(&self) -> ChannelResult<ArtMode> {
        no_transport()
    }

    async fn list_images(&self, _category: ImageCategory) -> ChannelResult<Vec<ImageAsset>> {
        no_transport()
    }

    async fn upload(
        &self,
        _bytes: Vec<u8>,
        _options: UploadOptions,
    ) -> ChannelResult<Option<String>> {
        no_transport()
    }

    async fn delete_images(&self, _content_ids: &[String]) -> ChannelResult<()> {
        no_transport()
    }

    async fn select_image(&self, _content_id: &str) -> ChannelResult<()> {
        no_transport()
    }

    async fn get_auto_rotation(&self) -> ChannelResult<AutoRotation> {
        no_transport()
    }

    async fn set_auto_rotation(&self, _rotation: AutoRotation) -> ChannelResult<()> {
        no_transport()
    }
}

impl ChannelFactory for NoTransport {
    fn channels(&self, _address: &DeviceAddress) -> DeviceChannels {
        let transport = Arc::new(Self);
        DeviceChannels {
            command: transport.clone(),
            status: transport.clone(),
            feature: transport,
        }
    }
}
