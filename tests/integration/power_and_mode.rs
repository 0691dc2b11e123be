//! Power and art mode reconciliation through the controller.

use std::time::Duration;

use tokio::time::Instant;

use tvctl::config::Settings;
use tvctl::device::mock::{FailPoint, MockTvBuilder};
use tvctl::device::{ChannelError, KEY_POWER, KeyPress};
use tvctl::error::ErrorKind;
use tvctl::reconcile::Action;

use crate::common::{controller_with, controller_with_settings, tv_address};

#[tokio::test]
async fn test_power_reconcile_table() {
    let cases = [
        (true, Action::On, false),
        (true, Action::Off, true),
        (false, Action::On, true),
        (false, Action::Off, false),
        (true, Action::Toggle, true),
        (false, Action::Toggle, true),
    ];

    for (initially_on, action, expect_sent) in cases {
        let tv = MockTvBuilder::new().powered_on(initially_on).build_arc();
        let controller = controller_with(&tv);

        let report = controller
            .power_control(&tv_address(), action)
            .await
            .into_result()
            .unwrap();

        let expected_on = initially_on ^ expect_sent;
        assert_eq!(
            report.command_sent, expect_sent,
            "initially_on={initially_on} action={action}"
        );
        assert_eq!(report.powered_on, expected_on, "action={action}");
        assert_eq!(report.status.powered_on, expected_on);
        assert_eq!(tv.key_presses().len(), usize::from(expect_sent));
    }
}

#[tokio::test]
async fn test_toggle_from_off_holds_power_key_once() {
    let tv = MockTvBuilder::new().powered_on(false).build_arc();
    let controller = controller_with(&tv);

    let report = controller
        .power_control(&tv_address(), Action::Toggle)
        .await
        .into_result()
        .unwrap();

    assert!(report.command_sent);
    assert!(report.powered_on);
    assert!(tv.is_powered_on());
    assert_eq!(
        tv.key_presses(),
        vec![(KEY_POWER.to_string(), KeyPress::Hold { seconds: 3 })]
    );
}

#[tokio::test(start_paused = true)]
async fn test_power_waits_to_settle_only_when_command_sent() {
    let tv = MockTvBuilder::new().powered_on(false).build_arc();
    let controller = controller_with_settings(&tv, Settings::default());

    let start = Instant::now();
    controller
        .power_control(&tv_address(), Action::On)
        .await
        .into_result()
        .unwrap();
    assert!(start.elapsed() >= Duration::from_secs(3));

    let start = Instant::now();
    let report = controller
        .power_control(&tv_address(), Action::On)
        .await
        .into_result()
        .unwrap();
    assert!(!report.command_sent);
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_mode_on_clicks_power_key() {
    let tv = MockTvBuilder::new().powered_on(true).build_arc();
    let controller = controller_with(&tv);

    let report = controller
        .mode_control(&tv_address(), Action::On)
        .await
        .into_result()
        .unwrap();
    assert!(report.command_sent);
    assert!(report.mode_on);
    assert!(report.status.mode_on);
    assert!(tv.is_art_mode());
    assert_eq!(
        tv.key_presses(),
        vec![(KEY_POWER.to_string(), KeyPress::Click)]
    );

    let again = controller
        .mode_control(&tv_address(), Action::On)
        .await
        .into_result()
        .unwrap();
    assert!(!again.command_sent);
    assert_eq!(tv.key_presses().len(), 1);
}

#[tokio::test]
async fn test_mode_control_unsupported_device_reads_as_off() {
    let tv = MockTvBuilder::new()
        .powered_on(true)
        .art_unsupported()
        .build_arc();
    let controller = controller_with(&tv);

    let report = controller
        .mode_control(&tv_address(), Action::On)
        .await
        .into_result()
        .unwrap();
    assert!(report.command_sent);
    assert!(!report.mode_on);
    assert_eq!(
        tv.key_presses(),
        vec![(KEY_POWER.to_string(), KeyPress::Click)]
    );
}

#[tokio::test]
async fn test_mode_toggle_clicks_when_mode_read_fails() {
    let tv = MockTvBuilder::new().in_art_mode().build_arc();
    tv.inject_error(FailPoint::GetMode, ChannelError::TimedOut("slow art channel".to_string()));
    let controller = controller_with(&tv);

    let report = controller
        .mode_control(&tv_address(), Action::Toggle)
        .await
        .into_result()
        .unwrap();
    assert!(report.command_sent);
    assert!(!report.mode_on);
    assert!(!tv.is_art_mode());
    assert_eq!(
        tv.key_presses(),
        vec![(KEY_POWER.to_string(), KeyPress::Click)]
    );
}

#[tokio::test]
async fn test_mode_reread_failure_after_click_still_succeeds() {
    let tv = MockTvBuilder::new().powered_on(true).build_arc();
    let controller = controller_with(&tv);
    controller.connect(&tv_address()).await.into_result().unwrap();
    tv.fail_always(FailPoint::GetMode, ChannelError::Protocol("garbled".to_string()));

    let report = controller
        .mode_control(&tv_address(), Action::On)
        .await
        .into_result()
        .unwrap();
    assert!(report.command_sent);
    assert!(!report.mode_on);
    assert!(tv.is_art_mode());
}

#[tokio::test]
async fn test_status_reports_mode_off_when_unsupported() {
    let tv = MockTvBuilder::new()
        .powered_on(true)
        .art_unsupported()
        .build_arc();
    let controller = controller_with(&tv);

    let report = controller.get_status(&tv_address()).await.into_result().unwrap();
    assert!(report.status.powered_on);
    assert!(!report.status.mode_on);
    assert!(!report.slideshow.running);
}

#[tokio::test]
async fn test_status_mode_degrades_on_query_failure() {
    let tv = MockTvBuilder::new().in_art_mode().build_arc();
    tv.fail_always(FailPoint::GetMode, ChannelError::Protocol("garbled".to_string()));
    let controller = controller_with(&tv);

    let report = controller.get_status(&tv_address()).await.into_result().unwrap();
    assert!(report.status.powered_on);
    assert!(!report.status.mode_on);
}

#[tokio::test]
async fn test_status_fails_when_power_unreadable() {
    let tv = MockTvBuilder::new().in_art_mode().build_arc();
    tv.fail_always(FailPoint::DeviceInfo, ChannelError::TimedOut("no reply".to_string()));
    let controller = controller_with(&tv);

    let result = controller.get_status(&tv_address()).await;
    assert!(!result.success);
    assert_eq!(result.error_type, Some(ErrorKind::TimedOut));
}

#[tokio::test]
async fn test_failed_key_send_is_operation_failure() {
    let tv = MockTvBuilder::new().powered_on(false).build_arc();
    tv.inject_error(FailPoint::SendKey, ChannelError::Protocol("rejected".to_string()));
    let controller = controller_with(&tv);

    let result = controller.power_control(&tv_address(), Action::On).await;
    assert!(!result.success);
    assert_eq!(result.error_type, Some(ErrorKind::OperationFailed));
    assert!(!tv.is_powered_on());
}

#[tokio::test]
async fn test_send_key_normalises_name() {
    let tv = MockTvBuilder::new().powered_on(true).build_arc();
    let controller = controller_with(&tv);

    let sent = controller
        .send_key(&tv_address(), " key_home ")
        .await
        .into_result()
        .unwrap();
    assert_eq!(sent.key, "KEY_HOME");
    assert_eq!(
        tv.key_presses(),
        vec![("KEY_HOME".to_string(), KeyPress::Click)]
    );
}

#[tokio::test]
async fn test_send_key_rejects_blank() {
    let tv = MockTvBuilder::new().build_arc();
    let controller = controller_with(&tv);

    let result = controller.send_key(&tv_address(), "  ").await;
    assert_eq!(result.error_type, Some(ErrorKind::InvalidArgument));
    assert!(tv.operations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hung_status_read_times_out() {
    let tv = MockTvBuilder::new().powered_on(true).build_arc();
    tv.stall(FailPoint::DeviceInfo);
    let controller = controller_with(&tv);

    let start = Instant::now();
    let result = controller.get_status(&tv_address()).await;
    assert!(!result.success);
    assert_eq!(result.error_type, Some(ErrorKind::TimedOut));
    assert!(start.elapsed() >= controller.settings().device_timeout());
}

#[tokio::test(start_paused = true)]
async fn test_hung_key_send_times_out() {
    let tv = MockTvBuilder::new().powered_on(true).build_arc();
    tv.stall(FailPoint::SendKey);
    let controller = controller_with(&tv);

    let result = controller.send_key(&tv_address(), "KEY_HOME").await;
    assert_eq!(result.error_type, Some(ErrorKind::TimedOut));
}
