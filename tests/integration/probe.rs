//! Real TCP connectivity checks, with and without a session on top.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use tvctl::controller::Controller;
use tvctl::device::{DeviceAddress, NoTransport};
use tvctl::error::ErrorKind;
use tvctl::probe::{ConnectivityCheck, FailureClass, TcpProbe};

use crate::common::{fast_settings, init_test_logging};

async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn network_controller() -> Controller {
    init_test_logging();
    Controller::new(
        Arc::new(NoTransport),
        Arc::new(TcpProbe::new(Duration::from_millis(500))),
        fast_settings(),
    )
}

#[tokio::test]
async fn test_tcp_check_listening_port() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let result = TcpProbe::default()
        .check(&DeviceAddress::new("127.0.0.1", port))
        .await;
    assert!(result.ok);
    assert_eq!(result.classification, None);
}

#[tokio::test]
async fn test_tcp_check_closed_port_is_refused() {
    let port = closed_port().await;

    let result = TcpProbe::default()
        .check(&DeviceAddress::new("127.0.0.1", port))
        .await;
    assert!(!result.ok);
    assert_eq!(result.classification, Some(FailureClass::Refused));
}

/// Needs a host with no route to TEST-NET-1; with a default route the
/// connect times out instead.
#[tokio::test]
#[ignore = "requires a host without a route to 192.0.2.0/24"]
async fn test_tcp_check_unroutable_address_is_unreachable() {
    let address = DeviceAddress::new("192.0.2.1", 8002);
    let result = TcpProbe::default().check(&address).await;
    assert!(!result.ok);
    assert_eq!(result.classification, Some(FailureClass::Unreachable));

    let err = result.into_error(&address).unwrap();
    assert_eq!(err.kind(), ErrorKind::Unreachable);
}

#[tokio::test]
async fn test_session_refused_before_any_channel() {
    let port = closed_port().await;
    let controller = network_controller();

    let result = controller
        .get_status(&DeviceAddress::new("127.0.0.1", port))
        .await;
    assert!(!result.success);
    assert_eq!(result.error_type, Some(ErrorKind::Refused));
}

#[tokio::test]
async fn test_reachable_device_without_transport_is_unsupported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let controller = network_controller();

    let result = controller
        .connect(&DeviceAddress::new("127.0.0.1", port))
        .await;
    assert!(!result.success);
    assert_eq!(result.error_type, Some(ErrorKind::Unsupported));
}
