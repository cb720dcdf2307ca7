//! 关节状态同步集成测试

mod common;

use common::{Fixture, settle};
use robert_client::{ClientConfig, ClientError, Direction};
use robert_protocol::{
    CalibrationPhase, CommandName, Joint, JointArray, ProtocolError, SteppersAnglesReport,
};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_toggle_flips_before_backend_resolves() {
    let fx = Fixture::connected().await;
    fx.arm.set_latency(Duration::from_millis(50));
    let stepper = fx.dashboard.stepper();
    assert!(!stepper.enabled(Joint::J1));

    let (result, observed) = tokio::join!(fx.dashboard.toggle_stepper(Joint::J1), async {
        tokio::task::yield_now().await;
        // 此时 toggle 命令仍在等待后端
        assert_eq!(fx.arm.call_count(CommandName::ToggleStepper), 1);
        stepper.enabled(Joint::J1)
    });

    assert!(observed);
    assert!(result.unwrap());
    assert!(stepper.enabled(Joint::J1));
    assert_eq!(
        fx.arm.calls()[0].args,
        json!({ "jointIndex": 1, "enabled": "ENABLED" })
    );
    // 成功后刷新角度
    assert_eq!(fx.arm.call_count(CommandName::GetSteppersAngles), 1);
}

#[tokio::test]
async fn test_toggle_rolls_back_on_failure_by_default() {
    let fx = Fixture::connected().await;
    fx.arm.reject(CommandName::ToggleStepper, "Stepper J4 not responding");

    assert!(fx.dashboard.toggle_stepper(Joint::J4).await.is_err());

    assert!(!fx.dashboard.stepper().enabled(Joint::J4));
    assert_eq!(fx.errors(), vec!["Stepper J4 not responding".to_string()]);
}

#[tokio::test]
async fn test_toggle_stays_optimistic_when_rollback_disabled() {
    let mut config = ClientConfig::default();
    config.stepper.rollback_toggle_on_failure = false;
    let fx = Fixture::with_config(config);
    fx.dashboard
        .connection()
        .connect_to_port(common::PORT)
        .await
        .unwrap();
    fx.arm.reject(CommandName::ToggleStepper, "Stepper J4 not responding");

    assert!(fx.dashboard.toggle_stepper(Joint::J4).await.is_err());
    assert!(fx.dashboard.stepper().enabled(Joint::J4));
}

#[tokio::test]
async fn test_calibrate_success_and_failure() {
    let fx = Fixture::connected().await;
    let stepper = fx.dashboard.stepper();

    fx.dashboard.calibrate(Joint::J2).await.unwrap();
    assert_eq!(stepper.calibration(Joint::J2), CalibrationPhase::Calibrated);
    assert_eq!(stepper.display_angle(Joint::J2), "0°");
    assert_eq!(fx.arm.calls()[0].args, json!({ "jointsIndexes": [2] }));

    fx.arm.reject(CommandName::CalibrateSteppers, "[CALIBRATION];FAILED");
    assert!(fx.dashboard.calibrate(Joint::J5).await.is_err());
    assert_eq!(stepper.calibration(Joint::J5), CalibrationPhase::NotCalibrated);
}

#[tokio::test]
async fn test_calibrating_phase_visible_while_in_flight() {
    let fx = Fixture::connected().await;
    fx.arm.set_latency(Duration::from_millis(50));
    let stepper = fx.dashboard.stepper();

    let (result, phase) = tokio::join!(fx.dashboard.calibrate(Joint::J1), async {
        tokio::task::yield_now().await;
        stepper.calibration(Joint::J1)
    });

    result.unwrap();
    assert_eq!(phase, CalibrationPhase::Calibrating);
    assert_eq!(stepper.calibration(Joint::J1), CalibrationPhase::Calibrated);
}

#[tokio::test]
async fn test_calibrate_all_targets_configured_joints() {
    let fx = Fixture::connected().await;
    let stepper = fx.dashboard.stepper();

    fx.dashboard.calibrate_all().await.unwrap();

    assert_eq!(fx.arm.calls()[0].args, json!({ "jointsIndexes": [1, 2, 3, 4] }));
    for joint in [Joint::J1, Joint::J2, Joint::J3, Joint::J4] {
        assert_eq!(stepper.calibration(joint), CalibrationPhase::Calibrated);
    }
    assert_eq!(stepper.calibration(Joint::J5), CalibrationPhase::NotCalibrated);
    assert_eq!(stepper.calibration(Joint::J6), CalibrationPhase::NotCalibrated);
}

#[tokio::test]
async fn test_calibrate_all_uses_config() {
    let mut config = ClientConfig::default();
    config.calibration.all_joints = vec![5, 6];
    let fx = Fixture::with_config(config);
    fx.dashboard
        .connection()
        .connect_to_port(common::PORT)
        .await
        .unwrap();
    fx.arm.clear_calls();

    fx.dashboard.calibrate_all().await.unwrap();
    assert_eq!(fx.arm.calls()[0].args, json!({ "jointsIndexes": [5, 6] }));
}

#[tokio::test]
async fn test_angle_report_displays_absolute_value() {
    let fx = Fixture::connected().await;

    fx.arm.emit_angles(SteppersAnglesReport {
        j1: Some(10.0),
        j3: Some(-45.0),
        ..Default::default()
    });
    settle().await;

    let stepper = fx.dashboard.stepper();
    assert_eq!(stepper.display_angle(Joint::J3), "45°");
    assert_eq!(stepper.display_angle(Joint::J1), "10°");
    assert_eq!(stepper.display_angle(Joint::J6), "N/A");

    // 上报整体替换角度表
    fx.arm.emit_angles(SteppersAnglesReport {
        j2: Some(1.234),
        ..Default::default()
    });
    settle().await;
    assert_eq!(stepper.angle(Joint::J1), None);
    assert_eq!(stepper.display_angle(Joint::J2), "1.23°");
}

#[tokio::test]
async fn test_drive_over_limit_rejected_before_dispatch() {
    let fx = Fixture::connected().await;

    let err = fx
        .dashboard
        .drive_to_angles(&[(Joint::J1, 10.0), (Joint::J2, 400.0)])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Protocol(ProtocolError::AngleOutOfRange {
            joint: Joint::J2,
            ..
        })
    ));
    assert_eq!(fx.arm.call_count(CommandName::DriveSteppersToAngles), 0);
    assert!(fx.drain().is_empty());
}

#[tokio::test]
async fn test_drive_dispatches_ordered_pairs() {
    let fx = Fixture::connected().await;
    fx.dashboard.calibrate_all().await.unwrap();
    fx.arm.clear_calls();

    fx.dashboard
        .drive_to_angles(&[(Joint::J3, 20.5), (Joint::J1, 10.0)])
        .await
        .unwrap();
    settle().await;

    assert_eq!(
        fx.arm.calls()[0].args,
        json!({ "jointsAngles": [[3, 20.5], [1, 10.0]] })
    );
    assert_eq!(fx.dashboard.stepper().angle(Joint::J3), Some(20.5));
}

#[tokio::test]
async fn test_parameters_clamped_and_kept_on_failure() {
    let fx = Fixture::connected().await;

    fx.dashboard.set_velocity(250).await.unwrap();
    assert_eq!(fx.dashboard.stepper().parameters().velocity, 100);
    assert_eq!(fx.arm.parameters().velocity, 100);

    fx.arm.reject(CommandName::SetAcceleration, "Timeout while waiting for response");
    assert!(fx.dashboard.set_acceleration(-5).await.is_err());
    assert_eq!(fx.dashboard.stepper().parameters().acceleration, 0);
}

#[tokio::test]
async fn test_nudge_moves_enabled_joint() {
    let fx = Fixture::connected().await;
    fx.dashboard.calibrate(Joint::J6).await.unwrap();
    fx.dashboard.toggle_stepper(Joint::J6).await.unwrap();

    fx.dashboard.nudge(Joint::J6, Direction::Forward).await.unwrap();
    settle().await;

    // J6: 10 步 × 1.8°
    let angle = fx.dashboard.stepper().angle(Joint::J6).unwrap();
    assert!((angle - 18.0).abs() < 1e-9, "angle = {}", angle);
}

#[tokio::test]
async fn test_refresh_reads_backend_state() {
    let fx = Fixture::connected().await;
    let mut angles = JointArray::splat(None);
    angles[Joint::J4] = Some(-30.0);
    fx.arm.set_angles(angles);

    fx.dashboard.refresh().await.unwrap();

    assert_eq!(fx.dashboard.stepper().display_angle(Joint::J4), "30°");
}
