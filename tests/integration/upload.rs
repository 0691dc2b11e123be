//! Upload confirmation polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use tvctl::device::mock::{FailPoint, MockTvBuilder, Operation, UploadVisibility};
use tvctl::device::{ChannelError, ImageCategory, UploadOptions};
use tvctl::error::{ErrorKind, TvError};
use tvctl::probe::StaticProbe;

use crate::common::{controller_with, session_with, tv_address};

fn jpeg_options() -> UploadOptions {
    UploadOptions {
        file_type: "jpg".to_string(),
        matte: "none".to_string(),
        portrait_matte: "none".to_string(),
    }
}

fn list_count(op: &Operation) -> bool {
    matches!(op, Operation::ListImages { .. })
}

#[tokio::test(start_paused = true)]
async fn test_upload_returns_new_asset() {
    let tv = MockTvBuilder::new().in_art_mode().with_images(2).build_arc();
    let controller = controller_with(&tv);

    let asset = controller
        .upload_photo(&tv_address(), vec![0xFF, 0xD8, 0xFF], "JPG", "", "")
        .await
        .into_result()
        .unwrap();

    assert_eq!(asset.content_id, "MY_F0003");
    assert_eq!(asset.category, ImageCategory::MyPhotos);
    tv.assert_contains(&Operation::Upload {
        file_type: "jpg".to_string(),
        matte: "shadowbox_polar".to_string(),
        portrait_matte: "shadowbox_polar".to_string(),
        size: 3,
    });
}

#[tokio::test(start_paused = true)]
async fn test_upload_found_on_third_poll() {
    let tv = MockTvBuilder::new()
        .in_art_mode()
        .with_images(1)
        .upload_visibility(UploadVisibility::AfterListings(3))
        .upload_returns_id(false)
        .build_arc();
    let session = session_with(&tv, Arc::new(StaticProbe::reachable()));

    let start = Instant::now();
    let asset = session.upload(vec![1, 2, 3], jpeg_options()).await.unwrap();

    assert_eq!(asset.content_id, "MY_F0002");
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert!(start.elapsed() < Duration::from_secs(4));
    // One baseline listing plus three polls.
    assert_eq!(tv.count(list_count), 4);
}

#[tokio::test(start_paused = true)]
async fn test_upload_never_listed_fails_after_five_polls() {
    let tv = MockTvBuilder::new()
        .in_art_mode()
        .upload_visibility(UploadVisibility::Never)
        .build_arc();
    let session = session_with(&tv, Arc::new(StaticProbe::reachable()));

    let start = Instant::now();
    let err = session.upload(vec![1, 2, 3], jpeg_options()).await.unwrap_err();

    assert!(matches!(err, TvError::NotFoundAfterUpload { attempts: 5 }));
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert_eq!(tv.count(list_count), 6);
}

#[tokio::test(start_paused = true)]
async fn test_upload_error_is_reported_before_polls_run_out() {
    let tv = MockTvBuilder::new()
        .in_art_mode()
        .upload_delay(Duration::from_millis(2500))
        .build_arc();
    tv.inject_error(FailPoint::Upload, ChannelError::Refused("storage full".to_string()));
    let controller = controller_with(&tv);

    let start = Instant::now();
    let result = controller
        .upload_photo(&tv_address(), vec![1, 2, 3], "png", "", "")
        .await;

    assert!(!result.success);
    assert_eq!(result.error_type, Some(ErrorKind::Refused));
    assert!(start.elapsed() >= Duration::from_millis(2500));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_failed_listing_counts_as_miss() {
    let tv = MockTvBuilder::new()
        .in_art_mode()
        .upload_returns_id(false)
        .build_arc();
    let session = session_with(&tv, Arc::new(StaticProbe::reachable()));
    session.connect().await.unwrap();

    // The baseline listing succeeds; the first poll fails.
    let upload = session.upload(vec![1], jpeg_options());
    tokio::pin!(upload);
    tokio::select! {
        biased;
        _ = &mut upload => panic!("upload finished before the first poll"),
        () = tokio::time::sleep(Duration::from_millis(500)) => {
            tv.inject_error(FailPoint::ListImages, ChannelError::Protocol("hiccup".to_string()));
        }
    }
    let asset = upload.await.unwrap();

    assert_eq!(asset.content_id, "MY_F0001");
    assert_eq!(tv.count(list_count), 3);
}

#[tokio::test]
async fn test_upload_validates_input_before_connecting() {
    let tv = MockTvBuilder::new().in_art_mode().build_arc();
    let controller = controller_with(&tv);

    let empty = controller
        .upload_photo(&tv_address(), Vec::new(), "jpg", "", "")
        .await;
    assert_eq!(empty.error_type, Some(ErrorKind::InvalidArgument));

    let no_type = controller
        .upload_photo(&tv_address(), vec![1], " ", "", "")
        .await;
    assert_eq!(no_type.error_type, Some(ErrorKind::InvalidArgument));

    assert!(tv.operations().is_empty());
}

#[tokio::test]
async fn test_delete_without_ids_clears_my_photos() {
    let tv = MockTvBuilder::new().in_art_mode().with_images(3).build_arc();
    let controller = controller_with(&tv);

    let deleted = controller
        .delete_images(&tv_address(), Vec::new())
        .await
        .into_result()
        .unwrap();

    assert_eq!(deleted.content_ids.len(), 3);
    assert!(tv.images().is_empty());
}

#[tokio::test]
async fn test_delete_and_select_by_id() {
    let tv = MockTvBuilder::new().in_art_mode().with_images(3).build_arc();
    let controller = controller_with(&tv);

    controller
        .select_image(&tv_address(), "MY_F0003")
        .await
        .into_result()
        .unwrap();
    assert_eq!(tv.displayed().as_deref(), Some("MY_F0003"));

    controller
        .delete_images(&tv_address(), vec!["MY_F0003".to_string()])
        .await
        .into_result()
        .unwrap();
    assert_eq!(tv.displayed(), None);

    let listed = controller
        .list_images(&tv_address(), 2)
        .await
        .into_result()
        .unwrap();
    assert_eq!(listed.len(), 2);

    let unknown = controller.select_image(&tv_address(), "MY_F0003").await;
    assert_eq!(unknown.error_type, Some(ErrorKind::OperationFailed));
}

#[tokio::test]
async fn test_auto_rotation_round_trip() {
    let tv = MockTvBuilder::new().in_art_mode().build_arc();
    let controller = controller_with(&tv);

    let set = controller
        .set_auto_rotation(&tv_address(), 15, true, 4)
        .await
        .into_result()
        .unwrap();
    assert_eq!(set.category, ImageCategory::Favorites);

    let read = controller
        .get_auto_rotation(&tv_address())
        .await
        .into_result()
        .unwrap();
    assert_eq!(read, set);
    assert_eq!(read.interval_minutes, 15);
}
