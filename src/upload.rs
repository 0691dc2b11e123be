//! Upload with listing-based confirmation.
//!
//! The device does not return a trustworthy content id from the upload
//! call, so completion is confirmed by polling the image listing for a new
//! asset. The upload itself runs as a separate task; if it fails before the
//! polls are exhausted its error is returned at once.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::device::{ChannelError, FeatureChannel, ImageAsset, ImageCategory, UploadOptions};
use crate::error::{Result, TvError};
use crate::retry::{RetryPolicy, poll_until};

/// Uploads always land in the personal category.
pub const UPLOAD_CATEGORY: ImageCategory = ImageCategory::MyPhotos;

type UploadOutcome = Option<std::result::Result<Option<String>, ChannelError>>;

/// Upload `bytes` and wait until the new asset shows up in the listing.
pub async fn upload_and_confirm(
    feature: Arc<dyn FeatureChannel>,
    address: &str,
    bytes: Vec<u8>,
    options: UploadOptions,
    policy: RetryPolicy,
) -> Result<ImageAsset> {
    let start = Instant::now();
    let size = bytes.len();

    let baseline: HashSet<String> = feature
        .list_images(UPLOAD_CATEGORY)
        .await
        .map_err(|e| TvError::from_channel(address, "list images", e))?
        .into_iter()
        .map(|asset| asset.content_id)
        .collect();

    let (tx, rx) = watch::channel::<UploadOutcome>(None);
    let task = tokio::spawn({
        let feature = Arc::clone(&feature);
        async move {
            let result = feature.upload(bytes, options).await;
            // Receiver gone means the caller already gave up.
            let _ = tx.send(Some(result));
        }
    });

    let confirm = poll_until(policy, |attempt| {
        let feature = Arc::clone(&feature);
        let rx = rx.clone();
        let baseline = &baseline;
        async move {
            let returned_id = match &*rx.borrow() {
                Some(Ok(id)) => id.clone(),
                _ => None,
            };
            match feature.list_images(UPLOAD_CATEGORY).await {
                Ok(assets) => Ok(pick_new_asset(assets, baseline, returned_id.as_deref())),
                Err(e) => {
                    warn!(address, attempt, error = %e, "Listing failed while confirming upload");
                    Ok::<_, TvError>(None)
                }
            }
        }
    });

    let outcome = tokio::select! {
        confirmed = confirm => confirmed,
        err = upload_failure(rx.clone()) => Err(TvError::from_channel(address, "upload", err)),
    };

    match outcome {
        Ok(Some(asset)) => {
            info!(
                address,
                content_id = %asset.content_id,
                size,
                duration_ms = start.elapsed().as_millis() as u64,
                "Upload confirmed"
            );
            Ok(asset)
        }
        Ok(None) => {
            task.abort();
            warn!(address, attempts = policy.max_attempts, "Uploaded image never appeared");
            Err(TvError::NotFoundAfterUpload {
                attempts: policy.max_attempts,
            })
        }
        Err(e) => {
            task.abort();
            Err(e)
        }
    }
}

/// Resolves when the upload task reports an error; pends forever otherwise.
async fn upload_failure(mut rx: watch::Receiver<UploadOutcome>) -> ChannelError {
    loop {
        if let Some(Err(e)) = &*rx.borrow_and_update() {
            return e.clone();
        }
        if rx.changed().await.is_err() {
            // Upload task ended without an error.
            std::future::pending::<()>().await;
        }
    }
}

/// The newest asset not present before the upload.
///
/// An id returned by the upload call wins when it is listed.
fn pick_new_asset(
    assets: Vec<ImageAsset>,
    baseline: &HashSet<String>,
    returned_id: Option<&str>,
) -> Option<ImageAsset> {
    let mut fresh: Vec<ImageAsset> = assets
        .into_iter()
        .filter(|asset| !baseline.contains(&asset.content_id))
        .collect();

    if let Some(id) = returned_id {
        if let Some(pos) = fresh.iter().position(|asset| asset.content_id == id) {
            return Some(fresh.swap_remove(pos));
        }
        debug!(content_id = id, "Returned id not listed yet");
    }

    fresh.into_iter().max_by_key(|asset| asset.created_at)
}
