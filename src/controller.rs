//! Orchestration layer: the operations exposed to front ends.
//!
//! Every operation returns an [`OpResult`] rather than an error, so callers
//! can render failures uniformly. State-changing operations hold the
//! session's operation guard and stop any running slideshow first; reads
//! run unguarded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::device::{AutoRotation, ChannelFactory, DeviceAddress, ImageAsset, ImageCategory, KeyPress, UploadOptions};
use crate::error::{ErrorKind, Result, TvError};
use crate::probe::ConnectivityCheck;
use crate::reconcile::Action;
use crate::registry::SessionRegistry;
use crate::session::{DeviceSession, DeviceStatus};
use crate::slideshow::{SlideshowPlan, SlideshowState, SlideshowStates};
use crate::upload::UPLOAD_CATEGORY;

/// Uniform operation result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'static str>,
    /// Whether the user can fix the failure (network, arguments, config).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recoverable: Option<bool>,
}

impl<T> OpResult<T> {
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_type: None,
            suggestion: None,
            recoverable: None,
        }
    }

    pub fn err(error: &TvError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            error_type: Some(error.kind()),
            suggestion: error.suggestion(),
            recoverable: Some(error.is_user_recoverable()),
        }
    }

    /// Convert back into a `Result`, for callers that prefer `?`.
    pub fn into_result(self) -> std::result::Result<T, OpFailure> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (_, _) => Err(OpFailure {
                message: self.error.unwrap_or_else(|| "no data".to_string()),
                kind: self.error_type.unwrap_or(ErrorKind::OperationFailed),
                suggestion: self.suggestion,
                recoverable: self.recoverable.unwrap_or(false),
            }),
        }
    }
}

impl<T> From<Result<T>> for OpResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(&e),
        }
    }
}

/// The failure half of an [`OpResult`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct OpFailure {
    pub message: String,
    pub kind: ErrorKind,
    pub suggestion: Option<&'static str>,
    pub recoverable: bool,
}

impl From<&TvError> for OpFailure {
    fn from(error: &TvError) -> Self {
        Self {
            message: error.to_string(),
            kind: error.kind(),
            suggestion: error.suggestion(),
            recoverable: error.is_user_recoverable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub address: String,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    #[serde(flatten)]
    pub status: DeviceStatus,
    pub slideshow: SlideshowState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerReport {
    pub command_sent: bool,
    pub powered_on: bool,
    pub status: DeviceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeReport {
    pub command_sent: bool,
    pub mode_on: bool,
    pub status: DeviceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deleted {
    pub content_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selected {
    pub content_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySent {
    pub key: String,
}

/// Front-end facing TV controller.
pub struct Controller {
    registry: SessionRegistry,
    slideshows: Arc<SlideshowStates>,
    settings: Arc<Settings>,
}

impl Controller {
    pub fn new(
        factory: Arc<dyn ChannelFactory>,
        probe: Arc<dyn ConnectivityCheck>,
        settings: Settings,
    ) -> Self {
        let settings = Arc::new(settings);
        Self {
            registry: SessionRegistry::new(factory, probe, Arc::clone(&settings)),
            slideshows: Arc::new(SlideshowStates::new()),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub const fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub async fn connect(&self, address: &DeviceAddress) -> OpResult<Connection> {
        let start = Instant::now();
        let session = self.registry.get(address).await;
        let result = session.connect().await.map(|()| Connection {
            address: address.to_string(),
            connected: true,
        });
        finish("connect", address, start, result)
    }

    /// Power, gallery mode and slideshow state.
    pub async fn get_status(&self, address: &DeviceAddress) -> OpResult<StatusReport> {
        let start = Instant::now();
        let session = self.registry.get(address).await;
        let result = match session.get_status().await {
            Ok(status) => Ok(StatusReport {
                status,
                slideshow: self.slideshow_state(address).await,
            }),
            Err(e) => Err(e),
        };
        finish("get_status", address, start, result)
    }

    pub async fn power_control(&self, address: &DeviceAddress, action: Action) -> OpResult<PowerReport> {
        let start = Instant::now();
        let session = self.registry.get(address).await;
        let result: Result<PowerReport> = async {
            let _guard = session.lock_operations().await;
            halt_slideshow(&session).await;

            let transition = session.power_control(action).await?;
            if transition.command_sent {
                tokio::time::sleep(self.settings.power_settle_delay()).await;
            }
            let status = session.get_status().await?;
            Ok(PowerReport {
                command_sent: transition.command_sent,
                powered_on: status.powered_on,
                status,
            })
        }
        .await;
        finish("power_control", address, start, result)
    }

    pub async fn mode_control(&self, address: &DeviceAddress, action: Action) -> OpResult<ModeReport> {
        let start = Instant::now();
        let session = self.registry.get(address).await;
        let result: Result<ModeReport> = async {
            let _guard = session.lock_operations().await;
            halt_slideshow(&session).await;

            let transition = session.mode_control(action).await?;
            let status = session.get_status().await?;
            Ok(ModeReport {
                command_sent: transition.command_sent,
                mode_on: transition.state,
                status,
            })
        }
        .await;
        finish("mode_control", address, start, result)
    }

    /// Upload an image. Empty mattes fall back to the configured default.
    pub async fn upload_photo(
        &self,
        address: &DeviceAddress,
        bytes: Vec<u8>,
        file_type: &str,
        matte: &str,
        portrait_matte: &str,
    ) -> OpResult<ImageAsset> {
        let start = Instant::now();
        let result: Result<ImageAsset> = async {
            if bytes.is_empty() {
                return Err(TvError::InvalidArgument("image is empty".to_string()));
            }
            let file_type = file_type.trim().trim_start_matches('.').to_ascii_lowercase();
            if file_type.is_empty() {
                return Err(TvError::InvalidArgument("file type is required".to_string()));
            }
            let options = UploadOptions {
                file_type,
                matte: self.matte_or_default(matte),
                portrait_matte: self.matte_or_default(portrait_matte),
            };

            let session = self.registry.get(address).await;
            let _guard = session.lock_operations().await;
            halt_slideshow(&session).await;
            session.upload(bytes, options).await
        }
        .await;
        finish("upload_photo", address, start, result)
    }

    pub async fn list_images(&self, address: &DeviceAddress, category: u8) -> OpResult<Vec<ImageAsset>> {
        let start = Instant::now();
        let result: Result<Vec<ImageAsset>> = async {
            let category = ImageCategory::from_code(category)?;
            let session = self.registry.get(address).await;
            session.list_images(category).await
        }
        .await;
        finish("list_images", address, start, result)
    }

    /// Delete images by id. An empty list deletes every personal image.
    pub async fn delete_images(&self, address: &DeviceAddress, content_ids: Vec<String>) -> OpResult<Deleted> {
        let start = Instant::now();
        let session = self.registry.get(address).await;
        let result: Result<Deleted> = async {
            let _guard = session.lock_operations().await;
            halt_slideshow(&session).await;

            let content_ids = if content_ids.is_empty() {
                let all: Vec<String> = session
                    .list_images(UPLOAD_CATEGORY)
                    .await?
                    .into_iter()
                    .map(|asset| asset.content_id)
                    .collect();
                info!(address = %address, count = all.len(), "Deleting all personal images");
                all
            } else {
                content_ids
            };

            if !content_ids.is_empty() {
                session.delete_images(&content_ids).await?;
            }
            Ok(Deleted { content_ids })
        }
        .await;
        finish("delete_images", address, start, result)
    }

    pub async fn select_image(&self, address: &DeviceAddress, content_id: &str) -> OpResult<Selected> {
        let start = Instant::now();
        let session = self.registry.get(address).await;
        let result: Result<Selected> = async {
            let _guard = session.lock_operations().await;
            halt_slideshow(&session).await;
            session.select_image(content_id).await?;
            Ok(Selected {
                content_id: content_id.to_string(),
            })
        }
        .await;
        finish("select_image", address, start, result)
    }

    pub async fn get_auto_rotation(&self, address: &DeviceAddress) -> OpResult<AutoRotation> {
        let start = Instant::now();
        let session = self.registry.get(address).await;
        let result = session.get_auto_rotation().await;
        finish("get_auto_rotation", address, start, result)
    }

    /// Configure device-native rotation. `interval_minutes == 0` disables it.
    pub async fn set_auto_rotation(
        &self,
        address: &DeviceAddress,
        interval_minutes: u32,
        shuffle: bool,
        category: u8,
    ) -> OpResult<AutoRotation> {
        let start = Instant::now();
        let result: Result<AutoRotation> = async {
            let rotation = AutoRotation {
                interval_minutes,
                shuffle,
                category: ImageCategory::from_code(category)?,
            };
            let session = self.registry.get(address).await;
            let _guard = session.lock_operations().await;
            halt_slideshow(&session).await;
            session.set_auto_rotation(rotation).await?;
            Ok(rotation)
        }
        .await;
        finish("set_auto_rotation", address, start, result)
    }

    /// Click an arbitrary remote key.
    pub async fn send_key(&self, address: &DeviceAddress, key: &str) -> OpResult<KeySent> {
        let start = Instant::now();
        let result: Result<KeySent> = async {
            let key = key.trim().to_ascii_uppercase();
            if key.is_empty() {
                return Err(TvError::InvalidArgument("key is required".to_string()));
            }
            let session = self.registry.get(address).await;
            let _guard = session.lock_operations().await;
            session.send_command(&key, KeyPress::Click).await?;
            Ok(KeySent { key })
        }
        .await;
        finish("send_key", address, start, result)
    }

    /// Start (or restart) the slideshow for `address`.
    pub async fn start_slideshow(
        &self,
        address: &DeviceAddress,
        interval: Duration,
        shuffle: bool,
        category: u8,
    ) -> OpResult<SlideshowState> {
        let start = Instant::now();
        let result: Result<SlideshowState> = async {
            if interval.is_zero() {
                return Err(TvError::InvalidArgument(
                    "slideshow interval must be greater than zero".to_string(),
                ));
            }
            let category = ImageCategory::from_code(category)?;

            let session = self.registry.get(address).await;
            let _guard = session.lock_operations().await;
            halt_slideshow(&session).await;

            let content_ids: Vec<String> = session
                .list_images(category)
                .await?
                .into_iter()
                .map(|asset| asset.content_id)
                .collect();
            if content_ids.is_empty() {
                return Err(TvError::InvalidArgument(format!(
                    "no images in category {}",
                    category.id()
                )));
            }

            let plan = SlideshowPlan {
                content_ids,
                interval,
                shuffle,
                category,
            };
            session.start_slideshow(plan, Arc::clone(&self.slideshows)).await;
            Ok(self.slideshow_state(address).await)
        }
        .await;
        finish("start_slideshow", address, start, result)
    }

    /// Stop the slideshow. A no-op when none is running.
    pub async fn stop_slideshow(&self, address: &DeviceAddress) -> OpResult<SlideshowState> {
        let start = Instant::now();
        if let Some(session) = self.registry.existing(address).await {
            let _guard = session.lock_operations().await;
            halt_slideshow(&session).await;
        }
        let state = self.slideshow_state(address).await;
        finish("stop_slideshow", address, start, Ok(state))
    }

    pub async fn slideshow_status(&self, address: &DeviceAddress) -> OpResult<SlideshowState> {
        OpResult::ok(self.slideshow_state(address).await)
    }

    /// Close the session for `address`. Closing an unknown or closed device succeeds.
    pub async fn close(&self, address: &DeviceAddress) -> OpResult<Connection> {
        let start = Instant::now();
        let result = match self.registry.existing(address).await {
            Some(session) => {
                let _guard = session.lock_operations().await;
                session.close().await
            }
            None => Ok(()),
        }
        .map(|()| Connection {
            address: address.to_string(),
            connected: false,
        });
        finish("close", address, start, result)
    }

    /// Close every session. Returns how many were closed.
    pub async fn shutdown(&self) -> usize {
        self.registry.close_all().await
    }

    async fn slideshow_state(&self, address: &DeviceAddress) -> SlideshowState {
        self.slideshows
            .get(address)
            .await
            .unwrap_or_else(|| SlideshowState {
                running: false,
                interval: self.settings.slideshow_interval(),
                shuffle: self.settings.slideshow_shuffle,
                category: ImageCategory::default(),
                last_exit: None,
            })
    }

    fn matte_or_default(&self, matte: &str) -> String {
        let matte = matte.trim();
        if matte.is_empty() {
            self.settings.default_matte.clone()
        } else {
            matte.to_string()
        }
    }
}

async fn halt_slideshow(session: &DeviceSession) {
    if let Some(exit) = session.stop_slideshow().await {
        debug!(address = %session.address(), ?exit, "Stopped slideshow before command");
    }
}

fn finish<T>(operation: &'static str, address: &DeviceAddress, start: Instant, result: Result<T>) -> OpResult<T> {
    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => info!(operation, address = %address, duration_ms, "Operation completed"),
        Err(e) => warn!(
            operation,
            address = %address,
            duration_ms,
            error = %e,
            error_type = %e.kind(),
            "Operation failed"
        ),
    }
    result.into()
}
