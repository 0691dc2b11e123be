//! Background slideshow driven from this process.
//!
//! One [`SlideshowTask`] runs per device. The loop cycles through a fixed
//! image sequence until it is stopped or the device leaves gallery mode.
//! Cancellation is observed at the top of each iteration, during the
//! status check and during the wait between images. A display call in
//! flight completes, bounded by the device timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde::{Serialize, Serializer};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::device::{DeviceAddress, ImageCategory};
use crate::session::DeviceSession;

/// What a slideshow should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideshowPlan {
    pub content_ids: Vec<String>,
    pub interval: Duration,
    pub shuffle: bool,
    pub category: ImageCategory,
}

/// Why a slideshow loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SlideshowExit {
    /// Stopped on request.
    Stopped,
    /// The device left gallery mode.
    ModeLost,
    /// Status could not be read.
    Failed(String),
}

/// Per-address slideshow state as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideshowState {
    pub running: bool,
    #[serde(rename = "intervalSecs", serialize_with = "serialize_secs")]
    pub interval: Duration,
    pub shuffle: bool,
    pub category: ImageCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_exit: Option<SlideshowExit>,
}

fn serialize_secs<S: Serializer>(interval: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(interval.as_secs_f64())
}

/// Slideshow state for every address, owned by the orchestration layer.
#[derive(Debug, Default)]
pub struct SlideshowStates {
    states: RwLock<HashMap<DeviceAddress, SlideshowState>>,
}

impl SlideshowStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, address: &DeviceAddress) -> Option<SlideshowState> {
        self.states.read().await.get(address).cloned()
    }

    pub async fn set(&self, address: DeviceAddress, state: SlideshowState) {
        self.states.write().await.insert(address, state);
    }

    /// Mark the slideshow for `address` as no longer running.
    pub async fn mark_stopped(&self, address: &DeviceAddress, exit: SlideshowExit) {
        if let Some(state) = self.states.write().await.get_mut(address) {
            state.running = false;
            state.last_exit = Some(exit);
        }
    }
}

/// A running slideshow loop and its stop signal.
#[derive(Debug)]
pub struct SlideshowTask {
    token: CancellationToken,
    handle: JoinHandle<SlideshowExit>,
    address: DeviceAddress,
    states: Arc<SlideshowStates>,
}

impl SlideshowTask {
    /// Record the slideshow as running and spawn its loop.
    ///
    /// The caller must have stopped any previous task for this device.
    pub async fn start(
        session: Arc<DeviceSession>,
        plan: SlideshowPlan,
        states: Arc<SlideshowStates>,
    ) -> Self {
        let address = session.address().clone();
        let SlideshowPlan {
            mut content_ids,
            interval,
            shuffle,
            category,
        } = plan;

        if shuffle {
            content_ids.shuffle(&mut rand::thread_rng());
        }

        states
            .set(
                address.clone(),
                SlideshowState {
                    running: true,
                    interval,
                    shuffle,
                    category,
                    last_exit: None,
                },
            )
            .await;

        info!(
            address = %address,
            images = content_ids.len(),
            interval_ms = interval.as_millis() as u64,
            shuffle,
            "Slideshow started"
        );

        let token = CancellationToken::new();
        let child = token.clone();
        let loop_address = address.clone();
        let loop_states = Arc::clone(&states);
        let handle = tokio::spawn(async move {
            let exit = run_loop(&session, &content_ids, interval, &child).await;
            info!(address = %loop_address, ?exit, "Slideshow ended");
            loop_states.mark_stopped(&loop_address, exit.clone()).await;
            exit
        });

        Self {
            token,
            handle,
            address,
            states,
        }
    }

    /// Signal the loop to stop and wait for it to finish.
    pub async fn stop(self) -> SlideshowExit {
        let Self {
            token,
            handle,
            address,
            states,
        } = self;
        token.cancel();
        match handle.await {
            Ok(exit) => exit,
            Err(e) => {
                warn!(address = %address, error = %e, "Slideshow task aborted");
                let exit = SlideshowExit::Failed(e.to_string());
                states.mark_stopped(&address, exit.clone()).await;
                exit
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

async fn run_loop(
    session: &DeviceSession,
    content_ids: &[String],
    interval: Duration,
    token: &CancellationToken,
) -> SlideshowExit {
    if content_ids.is_empty() {
        return SlideshowExit::Failed("no images to show".to_string());
    }

    loop {
        for content_id in content_ids {
            if token.is_cancelled() {
                return SlideshowExit::Stopped;
            }

            let status = tokio::select! {
                () = token.cancelled() => return SlideshowExit::Stopped,
                status = session.get_status() => status,
            };
            match status {
                Ok(status) if !status.mode_on => return SlideshowExit::ModeLost,
                Ok(_) => {}
                Err(e) => {
                    warn!(address = %session.address(), error = %e, "Slideshow status check failed");
                    return SlideshowExit::Failed(e.to_string());
                }
            }

            match session.select_image(content_id).await {
                Ok(()) => debug!(address = %session.address(), content_id, "Displayed image"),
                Err(e) => {
                    warn!(address = %session.address(), content_id, error = %e, "Failed to display image");
                }
            }

            tokio::select! {
                () = token.cancelled() => return SlideshowExit::Stopped,
                () = tokio::time::sleep(interval) => {}
            }
        }
    }
}
