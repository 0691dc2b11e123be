//! Connection lifecycle: lazy connect, rollback, close.

use std::sync::Arc;

use tvctl::device::ChannelError;
use tvctl::device::mock::{FailPoint, MockTvBuilder, Operation};
use tvctl::error::ErrorKind;
use tvctl::probe::{FailureClass, StaticProbe};

use crate::common::{controller_with, session_with, tv_address};

#[tokio::test]
async fn test_connect_opens_command_then_feature() {
    let tv = MockTvBuilder::new().in_art_mode().build_arc();
    let controller = controller_with(&tv);

    let connection = controller.connect(&tv_address()).await.into_result().unwrap();
    assert!(connection.connected);
    assert_eq!(connection.address, "10.0.0.5:8002");

    tv.assert_operations(&[Operation::OpenCommand, Operation::OpenFeature]);
    assert!(tv.is_command_open());
    assert!(tv.is_feature_open());
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let tv = MockTvBuilder::new().build_arc();
    let controller = controller_with(&tv);

    controller.connect(&tv_address()).await.into_result().unwrap();
    controller.connect(&tv_address()).await.into_result().unwrap();

    assert_eq!(tv.count(|op| *op == Operation::OpenCommand), 1);
}

#[tokio::test]
async fn test_concurrent_connects_share_one_attempt() {
    let tv = MockTvBuilder::new().build_arc();
    let session = session_with(&tv, Arc::new(StaticProbe::reachable()));

    let (a, b) = tokio::join!(session.connect(), session.connect());
    a.unwrap();
    b.unwrap();

    assert_eq!(tv.count(|op| *op == Operation::OpenCommand), 1);
    assert_eq!(tv.count(|op| *op == Operation::OpenFeature), 1);
}

#[tokio::test]
async fn test_feature_open_failure_rolls_back_command_channel() {
    let tv = MockTvBuilder::new().build_arc();
    tv.inject_error(
        FailPoint::OpenFeature,
        ChannelError::PairingRejected("pairing denied on TV".to_string()),
    );
    let controller = controller_with(&tv);

    let result = controller.connect(&tv_address()).await;
    assert!(!result.success);
    assert_eq!(result.error_type, Some(ErrorKind::Unreachable));

    tv.assert_operations(&[
        Operation::OpenCommand,
        Operation::OpenFeature,
        Operation::CloseCommand,
    ]);
    assert!(!tv.is_command_open());

    // The injected error was one-shot; the next attempt connects cleanly.
    controller.connect(&tv_address()).await.into_result().unwrap();
    assert!(tv.is_command_open());
    assert!(tv.is_feature_open());
}

#[tokio::test(start_paused = true)]
async fn test_hung_feature_open_times_out_and_rolls_back() {
    let tv = MockTvBuilder::new().build_arc();
    tv.stall(FailPoint::OpenFeature);
    let controller = controller_with(&tv);

    let result = controller.connect(&tv_address()).await;
    assert!(!result.success);
    assert_eq!(result.error_type, Some(ErrorKind::TimedOut));
    assert!(!tv.is_command_open());
    tv.assert_contains(&Operation::CloseCommand);

    tv.clear_errors();
    controller.connect(&tv_address()).await.into_result().unwrap();
    assert!(tv.is_feature_open());
}

#[tokio::test]
async fn test_probe_failure_touches_no_channel() {
    let tv = MockTvBuilder::new().build_arc();
    let session = session_with(
        &tv,
        Arc::new(StaticProbe::failing(FailureClass::Refused, "port closed")),
    );

    let err = session.connect().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Refused);
    assert!(tv.operations().is_empty());
    assert!(!session.is_connected().await);
}

#[tokio::test]
async fn test_offline_device_is_unreachable() {
    let tv = MockTvBuilder::new().build_arc();
    tv.disconnect();
    let controller = controller_with(&tv);

    let result = controller.get_status(&tv_address()).await;
    assert!(!result.success);
    assert_eq!(result.error_type, Some(ErrorKind::Unreachable));
    assert!(result.suggestion.is_some());
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let tv = MockTvBuilder::new().in_art_mode().build_arc();
    let controller = controller_with(&tv);
    controller.connect(&tv_address()).await.into_result().unwrap();

    let first = controller.close(&tv_address()).await.into_result().unwrap();
    let second = controller.close(&tv_address()).await.into_result().unwrap();

    assert!(!first.connected);
    assert!(!second.connected);
    assert_eq!(tv.count(|op| *op == Operation::CloseCommand), 1);
    assert_eq!(tv.count(|op| *op == Operation::CloseFeature), 1);
    assert!(!tv.is_command_open());
    assert!(!tv.is_feature_open());
}

#[tokio::test]
async fn test_close_unknown_device_succeeds() {
    let tv = MockTvBuilder::new().build_arc();
    let controller = controller_with(&tv);

    let result = controller.close(&tv_address()).await;
    assert!(result.success);
    assert!(tv.operations().is_empty());
}

#[tokio::test]
async fn test_operations_reconnect_after_close() {
    let tv = MockTvBuilder::new().in_art_mode().build_arc();
    let controller = controller_with(&tv);

    controller.connect(&tv_address()).await.into_result().unwrap();
    controller.close(&tv_address()).await.into_result().unwrap();

    let report = controller.get_status(&tv_address()).await.into_result().unwrap();
    assert!(report.status.powered_on);
    assert_eq!(tv.count(|op| *op == Operation::OpenCommand), 2);
    assert!(tv.is_command_open());
}
