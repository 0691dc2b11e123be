//! Per-device control session.
//!
//! A [`DeviceSession`] owns the channel set of one TV. Channels are opened
//! lazily on first use, behind a reachability check, and are either all
//! open or all closed. Every call to the device is bounded by a timeout. The session also owns the device's slideshow task
//! and the operation guard that serialises state-changing commands.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::config::Settings;
use crate::device::{
    AutoRotation, ChannelError, ChannelFactory, ChannelResult, DeviceAddress, DeviceChannels, DeviceInfo,
    ImageAsset, ImageCategory, KEY_POWER, KeyPress, UploadOptions,
};
use crate::error::{Result, TvError};
use crate::probe::ConnectivityCheck;
use crate::reconcile::Action;
use crate::slideshow::{SlideshowExit, SlideshowPlan, SlideshowStates, SlideshowTask};
use crate::upload;

/// Point-in-time status of a device.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub powered_on: bool,
    /// False when gallery mode is off, unsupported, or could not be queried.
    pub mode_on: bool,
    pub raw: DeviceInfo,
}

/// Result of a power or mode transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub command_sent: bool,
    /// Observed state after the transition.
    pub state: bool,
}

/// Control session for one device address.
pub struct DeviceSession {
    address: DeviceAddress,
    label: String,
    factory: Arc<dyn ChannelFactory>,
    probe: Arc<dyn ConnectivityCheck>,
    settings: Arc<Settings>,
    channels: Mutex<Option<Arc<DeviceChannels>>>,
    slideshow: Mutex<Option<SlideshowTask>>,
    op_guard: Mutex<()>,
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("address", &self.label)
            .finish_non_exhaustive()
    }
}

impl DeviceSession {
    pub fn new(
        address: DeviceAddress,
        factory: Arc<dyn ChannelFactory>,
        probe: Arc<dyn ConnectivityCheck>,
        settings: Arc<Settings>,
    ) -> Self {
        let label = address.to_string();
        Self {
            address,
            label,
            factory,
            probe,
            settings,
            channels: Mutex::new(None),
            slideshow: Mutex::new(None),
            op_guard: Mutex::new(()),
        }
    }

    pub const fn address(&self) -> &DeviceAddress {
        &self.address
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn is_connected(&self) -> bool {
        self.channels.lock().await.is_some()
    }

    /// Serialise a state-changing operation against others on this device.
    pub async fn lock_operations(&self) -> MutexGuard<'_, ()> {
        self.op_guard.lock().await
    }

    // === Connection lifecycle ===

    /// Connect if not already connected.
    pub async fn connect(&self) -> Result<()> {
        self.ensure_connected().await.map(|_| ())
    }

    /// Return the open channel set, connecting first if needed.
    ///
    /// Concurrent callers wait on the same attempt; only one channel set is
    /// ever built per connection.
    pub async fn ensure_connected(&self) -> Result<Arc<DeviceChannels>> {
        let mut slot = self.channels.lock().await;
        if let Some(channels) = slot.as_ref() {
            return Ok(Arc::clone(channels));
        }
        let channels = Arc::new(self.open_channels().await?);
        *slot = Some(Arc::clone(&channels));
        Ok(channels)
    }

    #[instrument(skip(self), fields(address = %self.label))]
    async fn open_channels(&self) -> Result<DeviceChannels> {
        let start = Instant::now();

        let probe = self.probe.check(&self.address).await;
        if let Some(err) = probe.into_error(&self.address) {
            warn!(error = %err, "Device failed connectivity check");
            return Err(err);
        }

        let channels = self.factory.channels(&self.address);

        self.bounded("open command channel", channels.command.open())
            .await?;

        // The status poller holds no channel state, so there is nothing to open.

        if let Err(e) = self
            .bounded("open feature channel", channels.feature.open())
            .await
        {
            warn!(error = %e, "Feature channel failed to open, rolling back");
            if let Err(close_err) = self
                .bounded("close command channel", channels.command.close())
                .await
            {
                debug!(error = %close_err, "Command channel close failed during rollback");
            }
            return Err(e);
        }

        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Connected"
        );
        Ok(channels)
    }

    /// Stop the slideshow and close all channels. Safe to call repeatedly.
    #[instrument(skip(self), fields(address = %self.label))]
    pub async fn close(&self) -> Result<()> {
        self.stop_slideshow().await;

        let Some(channels) = self.channels.lock().await.take() else {
            debug!("Session already closed");
            return Ok(());
        };

        if let Err(e) = self
            .bounded("close feature channel", channels.feature.close())
            .await
        {
            warn!(error = %e, "Feature channel close failed");
        }
        if let Err(e) = self
            .bounded("close command channel", channels.command.close())
            .await
        {
            warn!(error = %e, "Command channel close failed");
        }
        info!("Disconnected");
        Ok(())
    }

    // === Commands and status ===

    /// Send one key press on the command channel.
    pub async fn send_command(&self, key: &str, press: KeyPress) -> Result<()> {
        let channels = self.ensure_connected().await?;
        debug!(address = %self.label, key, ?press, "Sending key");
        let operation = format!("send {key}");
        let timeout = self.settings.device_timeout();
        match tokio::time::timeout(timeout, channels.command.send_key(key, press)).await {
            Ok(result) => result.map_err(|e| TvError::failed(operation, e.to_string())),
            Err(_) => Err(self.timed_out(&operation, timeout)),
        }
    }

    /// Read power from the status poller. Must succeed.
    pub async fn read_power(&self) -> Result<(bool, DeviceInfo)> {
        let channels = self.ensure_connected().await?;
        let info = self
            .bounded("read device info", channels.status.device_info())
            .await?;
        Ok((info.powered_on(), info))
    }

    /// Power plus best-effort gallery mode.
    pub async fn get_status(&self) -> Result<DeviceStatus> {
        let (powered_on, raw) = self.read_power().await?;
        let mode_on = self.probe_mode().await;
        Ok(DeviceStatus {
            powered_on,
            mode_on,
            raw,
        })
    }

    /// Gallery mode state, degrading to `false` on any failure or timeout.
    async fn probe_mode(&self) -> bool {
        let Ok(channels) = self.ensure_connected().await else {
            return false;
        };
        let query = async {
            if !channels.feature.supported().await? {
                return Ok(false);
            }
            Ok::<_, ChannelError>(channels.feature.get_mode().await?.is_on())
        };

        match tokio::time::timeout(self.settings.capability_timeout(), query).await {
            Ok(Ok(on)) => on,
            Ok(Err(e)) => {
                debug!(address = %self.label, error = %e, "Mode query failed, reporting off");
                false
            }
            Err(_) => {
                debug!(address = %self.label, "Mode query timed out, reporting off");
                false
            }
        }
    }

    /// Reconcile power against `action` using a held power key.
    #[instrument(skip(self), fields(address = %self.label))]
    pub async fn power_control(&self, action: Action) -> Result<Transition> {
        let (before, _) = self.read_power().await?;
        let command_sent = action.should_issue(before);
        if command_sent {
            let seconds = self.settings.power_hold_seconds;
            self.send_command(KEY_POWER, KeyPress::Hold { seconds })
                .await?;
        } else {
            debug!(powered_on = before, "Power already in requested state");
        }
        let (after, _) = self.read_power().await?;
        Ok(Transition {
            command_sent,
            state: after,
        })
    }

    /// Reconcile gallery mode against `action` using a clicked power key.
    ///
    /// Mode reads degrade to off, so `toggle` always clicks and a failed
    /// re-read after the click still reports success.
    #[instrument(skip(self), fields(address = %self.label))]
    pub async fn mode_control(&self, action: Action) -> Result<Transition> {
        self.ensure_connected().await?;
        let before = self.probe_mode().await;
        let command_sent = action.should_issue(before);
        if command_sent {
            self.send_command(KEY_POWER, KeyPress::Click).await?;
        } else {
            debug!(mode_on = before, "Art mode already in requested state");
        }
        let after = self.probe_mode().await;
        Ok(Transition {
            command_sent,
            state: after,
        })
    }

    // === Images ===

    pub async fn list_images(&self, category: ImageCategory) -> Result<Vec<ImageAsset>> {
        let channels = self.ensure_connected().await?;
        self.bounded("list images", channels.feature.list_images(category)).await
    }

    /// Upload an image and confirm it landed by polling the listing.
    pub async fn upload(&self, bytes: Vec<u8>, options: UploadOptions) -> Result<ImageAsset> {
        let channels = self.ensure_connected().await?;
        upload::upload_and_confirm(
            Arc::clone(&channels.feature),
            &self.label,
            bytes,
            options,
            self.settings.upload_policy(),
        )
        .await
    }

    pub async fn delete_images(&self, content_ids: &[String]) -> Result<()> {
        let channels = self.ensure_connected().await?;
        self.bounded("delete images", channels.feature.delete_images(content_ids)).await
    }

    pub async fn select_image(&self, content_id: &str) -> Result<()> {
        let channels = self.ensure_connected().await?;
        self.bounded("select image", channels.feature.select_image(content_id)).await
    }

    pub async fn get_auto_rotation(&self) -> Result<AutoRotation> {
        let channels = self.ensure_connected().await?;
        self.bounded("read auto rotation", channels.feature.get_auto_rotation()).await
    }

    pub async fn set_auto_rotation(&self, rotation: AutoRotation) -> Result<()> {
        let channels = self.ensure_connected().await?;
        self.bounded("set auto rotation", channels.feature.set_auto_rotation(rotation)).await
    }

    // === Slideshow ===

    /// Replace any running slideshow with a new one.
    ///
    /// The previous task is cancelled and awaited before the new one is
    /// spawned, so at most one task is ever alive for this device.
    pub async fn start_slideshow(self: &Arc<Self>, plan: SlideshowPlan, states: Arc<SlideshowStates>) {
        let mut slot = self.slideshow.lock().await;
        if let Some(previous) = slot.take() {
            let exit = previous.stop().await;
            debug!(address = %self.label, ?exit, "Previous slideshow stopped");
        }
        *slot = Some(SlideshowTask::start(Arc::clone(self), plan, states).await);
    }

    /// Stop the slideshow if one exists. Returns how it ended.
    pub async fn stop_slideshow(&self) -> Option<SlideshowExit> {
        let task = self.slideshow.lock().await.take()?;
        let exit = task.stop().await;
        debug!(address = %self.label, ?exit, "Slideshow stopped");
        Some(exit)
    }

    /// Whether a slideshow task is currently alive.
    pub async fn slideshow_running(&self) -> bool {
        self.slideshow
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Run one device call under the device timeout.
    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = ChannelResult<T>>,
    ) -> Result<T> {
        let timeout = self.settings.device_timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result.map_err(|e| self.channel_error(operation, e)),
            Err(_) => Err(self.timed_out(operation, timeout)),
        }
    }

    fn timed_out(&self, operation: &str, timeout: Duration) -> TvError {
        warn!(address = %self.label, operation, timeout_ms = timeout.as_millis() as u64, "Device call timed out");
        TvError::TimedOut {
            address: self.label.clone(),
            reason: format!("{operation} exceeded {}ms", timeout.as_millis()),
        }
    }

    fn channel_error(&self, operation: &str, err: ChannelError) -> TvError {
        TvError::from_channel(&self.label, operation, err)
    }
}
