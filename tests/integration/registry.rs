//! Session registry and shutdown.

use std::sync::Arc;
use std::time::Duration;

use tvctl::controller::Controller;
use tvctl::device::DeviceAddress;
use tvctl::device::mock::{MockConfig, MockFactory};
use tvctl::probe::StaticProbe;
use tvctl::slideshow::SlideshowExit;

use crate::common::{fast_settings, init_test_logging};

fn fleet() -> (Arc<MockFactory>, Controller, Vec<DeviceAddress>) {
    init_test_logging();
    let factory = Arc::new(MockFactory::new(MockConfig::demo()));
    let controller = Controller::new(
        factory.clone(),
        Arc::new(StaticProbe::reachable()),
        fast_settings(),
    );
    let addresses = (1..=3)
        .map(|n| DeviceAddress::with_default_port(format!("10.0.0.{n}")))
        .collect();
    (factory, controller, addresses)
}

#[tokio::test]
async fn test_one_session_per_address() {
    let (_factory, controller, addresses) = fleet();

    let a = controller.registry().get(&addresses[0]).await;
    let b = controller.registry().get(&addresses[0]).await;
    let c = controller.registry().get(&addresses[1]).await;

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(controller.registry().len().await, 2);
}

#[tokio::test]
async fn test_same_host_different_port_is_separate() {
    let (_factory, controller, _) = fleet();

    let a = controller
        .registry()
        .get(&DeviceAddress::new("10.0.0.9", 8001))
        .await;
    let b = controller
        .registry()
        .get(&DeviceAddress::new("10.0.0.9", 8002))
        .await;
    assert!(!Arc::ptr_eq(&a, &b));
}

#[tokio::test]
async fn test_shutdown_closes_every_session() {
    let (factory, controller, addresses) = fleet();

    for address in &addresses {
        controller.connect(address).await.into_result().unwrap();
    }
    for address in &addresses {
        assert!(factory.device(address).unwrap().is_command_open());
    }

    assert_eq!(controller.shutdown().await, 3);

    for address in &addresses {
        let tv = factory.device(address).unwrap();
        assert!(!tv.is_command_open());
        assert!(!tv.is_feature_open());
    }
    assert!(controller.registry().is_empty().await);
    assert_eq!(controller.shutdown().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_slideshows() {
    let (factory, controller, addresses) = fleet();
    let address = &addresses[0];

    controller
        .start_slideshow(address, Duration::from_secs(5), false, 2)
        .await
        .into_result()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    controller.shutdown().await;

    let state = controller
        .slideshow_status(address)
        .await
        .into_result()
        .unwrap();
    assert!(!state.running);
    assert_eq!(state.last_exit, Some(SlideshowExit::Stopped));

    let tv = factory.device(address).unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(tv.selections().len(), 1);
}
