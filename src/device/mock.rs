//! Simulated TV for testing and `--simulate` runs.
//!
//! [`MockTv`] implements all three channels against in-memory state and
//! records every call for later assertion.
//!
//! # Example
//!
//! ```rust,ignore
//! use tvctl::device::mock::{MockTvBuilder, Operation};
//! use tvctl::device::{CommandChannel, KeyPress, KEY_POWER};
//!
//! let tv = MockTvBuilder::new().powered_on(false).build();
//! CommandChannel::open(&tv).await?;
//! tv.send_key(KEY_POWER, KeyPress::Hold { seconds: 3 }).await?;
//!
//! assert!(tv.is_powered_on());
//! tv.assert_contains(&Operation::SendKey {
//!     key: KEY_POWER.to_string(),
//!     press: KeyPress::Hold { seconds: 3 },
//! });
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, trace};

use super::{
    ArtMode, AutoRotation, ChannelError, ChannelFactory, ChannelResult, CommandChannel,
    DeviceAddress, DeviceChannels, DeviceInfo, FeatureChannel, ImageAsset, ImageCategory,
    KEY_POWER, KeyPress, StatusPoller, UploadOptions,
};

/// 2024-01-01T00:00:00Z, the simulated clock's origin.
const CLOCK_ORIGIN_SECS: i64 = 1_704_067_200;

/// Recorded operation for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    OpenCommand,
    CloseCommand,
    OpenFeature,
    CloseFeature,
    SendKey {
        key: String,
        press: KeyPress,
    },
    DeviceInfo,
    Supported,
    GetMode,
    ListImages {
        category: ImageCategory,
    },
    Upload {
        file_type: String,
        matte: String,
        portrait_matte: String,
        size: usize,
    },
    DeleteImages {
        content_ids: Vec<String>,
    },
    SelectImage {
        content_id: String,
    },
    GetAutoRotation,
    SetAutoRotation(AutoRotation),
}

/// Call sites where errors can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    OpenCommand,
    OpenFeature,
    SendKey,
    DeviceInfo,
    GetMode,
    ListImages,
    Upload,
    DeleteImages,
    SelectImage,
    AutoRotation,
}

/// When an uploaded image shows up in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadVisibility {
    /// Listed as soon as the upload returns.
    #[default]
    Immediate,
    /// Listed from the Nth listing after the upload returns.
    AfterListings(u32),
    /// Never listed.
    Never,
}

/// Configuration for mock behavior.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,
    pub model: String,
    pub powered_on: bool,
    pub art_mode: bool,
    /// Whether the device offers gallery mode.
    pub art_supported: bool,
    /// Images seeded into the personal category.
    pub seeded_images: usize,
    pub upload_visibility: UploadVisibility,
    /// Whether the upload call returns the new content id.
    pub upload_returns_id: bool,
    /// Simulated transfer time of an upload.
    pub upload_delay: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "Simulated Frame".to_string(),
            model: "QE55LS03".to_string(),
            powered_on: false,
            art_mode: false,
            art_supported: true,
            seeded_images: 0,
            upload_visibility: UploadVisibility::Immediate,
            upload_returns_id: true,
            upload_delay: Duration::ZERO,
        }
    }
}

impl MockConfig {
    /// A TV that is on, in gallery mode, with a few images stored.
    pub fn demo() -> Self {
        Self {
            powered_on: true,
            art_mode: true,
            seeded_images: 3,
            ..Default::default()
        }
    }
}

#[derive(Debug)]
struct PendingUpload {
    asset: ImageAsset,
    remaining: Option<u32>,
}

#[derive(Debug)]
struct TvState {
    powered_on: bool,
    art_mode: bool,
    images: Vec<ImageAsset>,
    pending: Vec<PendingUpload>,
    displayed: Option<String>,
    auto_rotation: AutoRotation,
    next_id: u32,
}

impl TvState {
    fn mint_asset(&mut self, category: ImageCategory) -> ImageAsset {
        self.next_id += 1;
        let created_at =
            DateTime::<Utc>::from_timestamp(CLOCK_ORIGIN_SECS + i64::from(self.next_id), 0)
                .unwrap_or_default();
        ImageAsset {
            content_id: format!("MY_F{:04}", self.next_id),
            created_at,
            category,
        }
    }
}

/// Simulated TV with command, status and feature channels.
pub struct MockTv {
    config: MockConfig,
    state: Mutex<TvState>,
    command_open: AtomicBool,
    feature_open: AtomicBool,
    reachable: AtomicBool,
    operation_log: Mutex<Vec<Operation>>,
    one_shot_errors: Mutex<HashMap<FailPoint, ChannelError>>,
    persistent_errors: Mutex<HashMap<FailPoint, ChannelError>>,
    stalled: Mutex<HashSet<FailPoint>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTv {
    /// Create a simulated TV with the given behavior.
    pub fn new(config: MockConfig) -> Self {
        debug!(name = %config.name, powered_on = config.powered_on, "Creating mock TV");

        let mut state = TvState {
            powered_on: config.powered_on,
            art_mode: config.powered_on && config.art_mode,
            images: Vec::new(),
            pending: Vec::new(),
            displayed: None,
            auto_rotation: AutoRotation {
                interval_minutes: 0,
                shuffle: false,
                category: ImageCategory::MyPhotos,
            },
            next_id: 0,
        };
        for _ in 0..config.seeded_images {
            let asset = state.mint_asset(ImageCategory::MyPhotos);
            state.images.push(asset);
        }

        Self {
            config,
            state: Mutex::new(state),
            command_open: AtomicBool::new(false),
            feature_open: AtomicBool::new(false),
            reachable: AtomicBool::new(true),
            operation_log: Mutex::new(Vec::new()),
            one_shot_errors: Mutex::new(HashMap::new()),
            persistent_errors: Mutex::new(HashMap::new()),
            stalled: Mutex::new(HashSet::new()),
        }
    }

    // === Configuration ===

    /// Fail the next call at `point` with `error`.
    pub fn inject_error(&self, point: FailPoint, error: ChannelError) {
        lock(&self.one_shot_errors).insert(point, error);
    }

    /// Fail every call at `point` with `error` until cleared.
    pub fn fail_always(&self, point: FailPoint, error: ChannelError) {
        lock(&self.persistent_errors).insert(point, error);
    }

    /// Never answer calls at `point` until cleared.
    pub fn stall(&self, point: FailPoint) {
        lock(&self.stalled).insert(point);
    }

    /// Clear all injected errors and stalls.
    pub fn clear_errors(&self) {
        lock(&self.one_shot_errors).clear();
        lock(&self.persistent_errors).clear();
        lock(&self.stalled).clear();
    }

    /// Drop off the network: every call fails as unreachable.
    pub fn disconnect(&self) {
        self.reachable.store(false, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        self.reachable.store(true, Ordering::SeqCst);
    }

    // === External state changes ===

    /// Change power as if someone used the physical remote.
    pub fn set_power(&self, on: bool) {
        let mut state = lock(&self.state);
        state.powered_on = on;
        if !on {
            state.art_mode = false;
        }
    }

    /// Change gallery mode as if someone used the physical remote.
    pub fn set_art_mode(&self, on: bool) {
        let mut state = lock(&self.state);
        state.art_mode = on && state.powered_on;
    }

    // === Inspection ===

    pub fn is_powered_on(&self) -> bool {
        lock(&self.state).powered_on
    }

    pub fn is_art_mode(&self) -> bool {
        lock(&self.state).art_mode
    }

    pub fn is_command_open(&self) -> bool {
        self.command_open.load(Ordering::SeqCst)
    }

    pub fn is_feature_open(&self) -> bool {
        self.feature_open.load(Ordering::SeqCst)
    }

    /// Content id currently on screen.
    pub fn displayed(&self) -> Option<String> {
        lock(&self.state).displayed.clone()
    }

    /// All listed images, across categories.
    pub fn images(&self) -> Vec<ImageAsset> {
        lock(&self.state).images.clone()
    }

    // === Assertions ===

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        lock(&self.operation_log).clone()
    }

    /// Number of recorded operations matching `pred`.
    pub fn count(&self, pred: impl Fn(&Operation) -> bool) -> usize {
        lock(&self.operation_log).iter().filter(|op| pred(op)).count()
    }

    /// Content ids passed to `select_image`, in call order.
    pub fn selections(&self) -> Vec<String> {
        lock(&self.operation_log)
            .iter()
            .filter_map(|op| match op {
                Operation::SelectImage { content_id } => Some(content_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Key presses sent, in call order.
    pub fn key_presses(&self) -> Vec<(String, KeyPress)> {
        lock(&self.operation_log)
            .iter()
            .filter_map(|op| match op {
                Operation::SendKey { key, press } => Some((key.clone(), *press)),
                _ => None,
            })
            .collect()
    }

    /// Assert specific operations were performed.
    ///
    /// # Panics
    ///
    /// Panics if the operations don't match.
    pub fn assert_operations(&self, expected: &[Operation]) {
        let actual = self.operations();
        assert_eq!(
            actual, expected,
            "Operation mismatch.\nExpected: {expected:#?}\nActual: {actual:#?}",
        );
    }

    /// Assert a specific operation was performed at least once.
    ///
    /// # Panics
    ///
    /// Panics if the operation was not found.
    pub fn assert_contains(&self, expected: &Operation) {
        let ops = self.operations();
        assert!(
            ops.contains(expected),
            "Expected operation {expected:?} not found in: {ops:#?}",
        );
    }

    /// Clear the operation log for fresh assertions.
    pub fn clear_operations(&self) {
        lock(&self.operation_log).clear();
    }

    // === Internal Helpers ===

    fn record_op(&self, op: Operation) {
        trace!(?op, "Recording operation");
        lock(&self.operation_log).push(op);
    }

    async fn hang_if_stalled(&self, point: FailPoint) {
        let stalled = lock(&self.stalled).contains(&point);
        if stalled {
            trace!(?point, "Stalling call");
            std::future::pending::<()>().await;
        }
    }

    fn check_error(&self, point: FailPoint) -> ChannelResult<()> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(ChannelError::Unreachable("mock TV offline".to_string()));
        }
        if let Some(error) = lock(&self.one_shot_errors).remove(&point) {
            return Err(error);
        }
        if let Some(error) = lock(&self.persistent_errors).get(&point) {
            return Err(error.clone());
        }
        Ok(())
    }

    fn require_feature(&self) -> ChannelResult<()> {
        if !self.feature_open.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        if !self.config.art_supported {
            return Err(ChannelError::Unsupported("art mode".to_string()));
        }
        Ok(())
    }

    /// Promote pending uploads whose listing countdown has run out.
    fn tick_pending(state: &mut TvState) {
        let mut ready = Vec::new();
        state.pending.retain_mut(|pending| match pending.remaining.as_mut() {
            None => true,
            Some(n) => {
                *n = n.saturating_sub(1);
                if *n == 0 {
                    ready.push(pending.asset.clone());
                    false
                } else {
                    true
                }
            }
        });
        state.images.extend(ready);
    }
}

#[async_trait]
impl CommandChannel for MockTv {
    async fn open(&self) -> ChannelResult<()> {
        self.record_op(Operation::OpenCommand);
        self.hang_if_stalled(FailPoint::OpenCommand).await;
        self.check_error(FailPoint::OpenCommand)?;
        self.command_open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> ChannelResult<()> {
        self.record_op(Operation::CloseCommand);
        self.command_open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send_key(&self, key: &str, press: KeyPress) -> ChannelResult<()> {
        self.record_op(Operation::SendKey {
            key: key.to_string(),
            press,
        });
        self.hang_if_stalled(FailPoint::SendKey).await;
        self.check_error(FailPoint::SendKey)?;
        if !self.is_command_open() {
            return Err(ChannelError::Closed);
        }

        if key == KEY_POWER {
            let mut state = lock(&self.state);
            match press {
                KeyPress::Hold { .. } => {
                    state.powered_on = !state.powered_on;
                    state.art_mode = false;
                }
                KeyPress::Click if state.powered_on && self.config.art_supported => {
                    state.art_mode = !state.art_mode;
                }
                KeyPress::Click => {}
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StatusPoller for MockTv {
    async fn device_info(&self) -> ChannelResult<DeviceInfo> {
        self.record_op(Operation::DeviceInfo);
        self.hang_if_stalled(FailPoint::DeviceInfo).await;
        self.check_error(FailPoint::DeviceInfo)?;
        let powered_on = self.is_powered_on();
        Ok(DeviceInfo::new(json!({
            "device": {
                "name": self.config.name,
                "modelName": self.config.model,
                "PowerState": if powered_on { "on" } else { "standby" },
                "FrameTVSupport": if self.config.art_supported { "true" } else { "false" },
            }
        })))
    }
}

#[async_trait]
impl FeatureChannel for MockTv {
    async fn open(&self) -> ChannelResult<()> {
        self.record_op(Operation::OpenFeature);
        self.hang_if_stalled(FailPoint::OpenFeature).await;
        self.check_error(FailPoint::OpenFeature)?;
        self.feature_open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> ChannelResult<()> {
        self.record_op(Operation::CloseFeature);
        self.feature_open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn supported(&self) -> ChannelResult<bool> {
        self.record_op(Operation::Supported);
        self.check_error(FailPoint::GetMode)?;
        Ok(self.config.art_supported)
    }

    async fn get_mode(&self) -> ChannelResult<ArtMode> {
        self.record_op(Operation::GetMode);
        self.check_error(FailPoint::GetMode)?;
        self.require_feature()?;
        Ok(if self.is_art_mode() {
            ArtMode::On
        } else {
            ArtMode::Off
        })
    }

    async fn list_images(&self, category: ImageCategory) -> ChannelResult<Vec<ImageAsset>> {
        self.record_op(Operation::ListImages { category });
        self.hang_if_stalled(FailPoint::ListImages).await;
        self.check_error(FailPoint::ListImages)?;
        self.require_feature()?;
        let mut state = lock(&self.state);
        Self::tick_pending(&mut state);
        Ok(state
            .images
            .iter()
            .filter(|asset| asset.category == category)
            .cloned()
            .collect())
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        options: UploadOptions,
    ) -> ChannelResult<Option<String>> {
        self.record_op(Operation::Upload {
            file_type: options.file_type,
            matte: options.matte,
            portrait_matte: options.portrait_matte,
            size: bytes.len(),
        });
        if !self.config.upload_delay.is_zero() {
            tokio::time::sleep(self.config.upload_delay).await;
        }
        self.check_error(FailPoint::Upload)?;
        self.require_feature()?;

        let mut state = lock(&self.state);
        let asset = state.mint_asset(ImageCategory::MyPhotos);
        let content_id = asset.content_id.clone();
        match self.config.upload_visibility {
            UploadVisibility::Immediate => state.images.push(asset),
            UploadVisibility::AfterListings(n) => state.pending.push(PendingUpload {
                asset,
                remaining: Some(n.max(1)),
            }),
            UploadVisibility::Never => state.pending.push(PendingUpload {
                asset,
                remaining: None,
            }),
        }
        Ok(self.config.upload_returns_id.then_some(content_id))
    }

    async fn delete_images(&self, content_ids: &[String]) -> ChannelResult<()> {
        self.record_op(Operation::DeleteImages {
            content_ids: content_ids.to_vec(),
        });
        self.check_error(FailPoint::DeleteImages)?;
        self.require_feature()?;
        let mut state = lock(&self.state);
        state
            .images
            .retain(|asset| !content_ids.contains(&asset.content_id));
        if state
            .displayed
            .as_ref()
            .is_some_and(|id| content_ids.contains(id))
        {
            state.displayed = None;
        }
        Ok(())
    }

    async fn select_image(&self, content_id: &str) -> ChannelResult<()> {
        self.record_op(Operation::SelectImage {
            content_id: content_id.to_string(),
        });
        self.hang_if_stalled(FailPoint::SelectImage).await;
        self.check_error(FailPoint::SelectImage)?;
        self.require_feature()?;
        let mut state = lock(&self.state);
        if !state.images.iter().any(|asset| asset.content_id == content_id) {
            return Err(ChannelError::Protocol(format!(
                "unknown content id {content_id}"
            )));
        }
        state.displayed = Some(content_id.to_string());
        Ok(())
    }

    async fn get_auto_rotation(&self) -> ChannelResult<AutoRotation> {
        self.record_op(Operation::GetAutoRotation);
        self.check_error(FailPoint::AutoRotation)?;
        self.require_feature()?;
        Ok(lock(&self.state).auto_rotation)
    }

    async fn set_auto_rotation(&self, rotation: AutoRotation) -> ChannelResult<()> {
        self.record_op(Operation::SetAutoRotation(rotation));
        self.check_error(FailPoint::AutoRotation)?;
        self.require_feature()?;
        lock(&self.state).auto_rotation = rotation;
        Ok(())
    }
}

/// Builder for creating `MockTv` with common configurations.
#[derive(Debug, Default)]
pub struct MockTvBuilder {
    config: MockConfig,
}

impl MockTvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn powered_on(mut self, on: bool) -> Self {
        self.config.powered_on = on;
        self
    }

    /// Start powered on and in gallery mode.
    #[must_use]
    pub fn in_art_mode(mut self) -> Self {
        self.config.powered_on = true;
        self.config.art_mode = true;
        self
    }

    #[must_use]
    pub fn art_unsupported(mut self) -> Self {
        self.config.art_supported = false;
        self
    }

    #[must_use]
    pub fn with_images(mut self, count: usize) -> Self {
        self.config.seeded_images = count;
        self
    }

    #[must_use]
    pub fn upload_visibility(mut self, visibility: UploadVisibility) -> Self {
        self.config.upload_visibility = visibility;
        self
    }

    #[must_use]
    pub fn upload_returns_id(mut self, returns_id: bool) -> Self {
        self.config.upload_returns_id = returns_id;
        self
    }

    #[must_use]
    pub fn upload_delay(mut self, delay: Duration) -> Self {
        self.config.upload_delay = delay;
        self
    }

    pub fn build(self) -> MockTv {
        MockTv::new(self.config)
    }

    pub fn build_arc(self) -> Arc<MockTv> {
        Arc::new(self.build())
    }
}

/// Channel factory serving one simulated TV per address.
///
/// Addresses without a registered TV get a fresh one built from the
/// factory's template config.
#[derive(Default)]
pub struct MockFactory {
    template: MockConfig,
    devices: Mutex<HashMap<DeviceAddress, Arc<MockTv>>>,
}

impl MockFactory {
    pub fn new(template: MockConfig) -> Self {
        Self {
            template,
            devices: Mutex::new(HashMap::new()),
        }
    }

    /// Register a specific TV for `address`.
    #[must_use]
    pub fn with_device(self, address: DeviceAddress, tv: Arc<MockTv>) -> Self {
        lock(&self.devices).insert(address, tv);
        self
    }

    /// The TV serving `address`, if channels were built or it was registered.
    pub fn device(&self, address: &DeviceAddress) -> Option<Arc<MockTv>> {
        lock(&self.devices).get(address).cloned()
    }
}

impl ChannelFactory for MockFactory {
    fn channels(&self, address: &DeviceAddress) -> DeviceChannels {
        let tv = lock(&self.devices)
            .entry(address.clone())
            .or_insert_with(|| Arc::new(MockTv::new(self.template.clone())))
            .clone();
        DeviceChannels {
            command: tv.clone(),
            status: tv.clone(),
            feature: tv,
        }
    }
}
