use ecu_app::{EcuConfig, FaultId};

use crate::{lmt01_pulses, run, SimError, SimOptions, SnapshotFormatter};

#[test]
fn healthy_board_reports_readings() {
    let options = SimOptions {
        duration_ms: 1200,
        ..SimOptions::default()
    };
    let mut snapshots = Vec::new();
    let summary = run(&EcuConfig::default(), &options, |s| snapshots.push(*s)).unwrap();

    assert_eq!(snapshots.len(), 12);
    let last = snapshots.last().unwrap().data;
    assert_eq!(last.pressure, 1470);
    assert_eq!(last.temperature, 2500);
    assert!((2990..=3010).contains(&last.tachometer), "rpm {}", last.tachometer);
    assert!((1255..=1261).contains(&last.vbat), "vbat {}", last.vbat);
    assert!(summary.faults.is_empty());
    assert!(summary.panel.on);
    assert!(summary.frames >= 10);
    assert!(summary.pools_idle);

    let formatter = SnapshotFormatter::new(false);
    assert!(formatter.fault_lines(&summary.faults)[0].contains("No faults recorded"));
}

#[test]
fn display_loss_and_stall_are_visible() {
    let options = SimOptions {
        duration_ms: 600,
        stall_tach: true,
        fail_display_at: Some(300),
        ..SimOptions::default()
    };
    let mut last = None;
    let summary = run(&EcuConfig::default(), &options, |s| last = Some(*s)).unwrap();

    let ids: Vec<_> = summary.faults.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![FaultId::DisplayI2c]);
    assert_eq!(last.map(|s| s.data.tachometer), Some(0));

    let formatter = SnapshotFormatter::new(true);
    let json = &formatter.fault_lines(&summary.faults)[0];
    let parsed: serde_json::Value = serde_json::from_str(json).unwrap();
    assert_eq!(parsed["faults"][0]["code"], 101);
}

#[test]
fn json_snapshot_lines_parse() {
    let options = SimOptions {
        duration_ms: 100,
        ..SimOptions::default()
    };
    let formatter = SnapshotFormatter::new(true);
    let mut lines = Vec::new();
    run(&EcuConfig::default(), &options, |s| lines.push(formatter.snapshot_line(s))).unwrap();

    assert_eq!(lines.len(), 1);
    let v: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(v["t_ms"], 100);
    assert!(v["motor"]["pressure"].is_number());
    assert!(v["timestamp"].is_string());
}

#[test]
fn config_from_partial_json() {
    let config: EcuConfig = serde_json::from_str(r#"{ "display": { "priority": 1, "queue_capacity": 12 } }"#).unwrap();
    assert_eq!(config.display.queue_capacity, 12);
    assert_eq!(config.shared_i2c, EcuConfig::default().shared_i2c);

    let bad: Result<EcuConfig, SimError> = serde_json::from_str("{ nope").map_err(SimError::from);
    assert!(matches!(bad, Err(SimError::Config(_))));
}

#[test]
fn colliding_priorities_are_reported() {
    let config = EcuConfig::builder().temperature(6, 4).build();
    let err = run(&config, &SimOptions::default(), |_| {}).unwrap_err();
    assert!(matches!(err, SimError::InvalidConfig(_)));
}

#[test]
fn lmt01_pulse_count() {
    assert_eq!(lmt01_pulses(25.0), 1200);
    assert_eq!(lmt01_pulses(-50.0), 0);
}
