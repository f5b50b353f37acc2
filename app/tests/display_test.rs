//! SSD1306 driver over the simulated bus

mod common;

use common::{advance, prio, settle, Probe};
use ecu_app::display::{self, framebuffer, DisplayState, INIT_COMMANDS};
use ecu_app::signals::{FAULT_GENERATED, MOTOR_DATA};
use ecu_app::{Display, EcuPools, EcuQf, FaultId, FaultManager, MediumEvt, MotorData, SharedI2c};
use ecu_hal::sim::{SimI2cBus, SimTransfer};
use ecu_hal::HalError;
use qp_qf::{QDuration, QPayload, SizeClass};

fn writes(bus: &SimI2cBus) -> Vec<Vec<u8>> {
    bus.transfers()
        .into_iter()
        .map(|t| match t {
            SimTransfer::Write { address, data } => {
                assert_eq!(address, display::ADDRESS);
                data
            }
            other => panic!("unexpected transfer {:?}", other),
        })
        .collect()
}

#[test]
fn test_startup_sends_init_table_one_command_at_a_time() {
    let qf = EcuQf::new(EcuPools::new());
    let faults = FaultManager::new(&qf);
    let bus = SimI2cBus::new();
    let mut arb = SharedI2c::new(&qf, prio(6), bus.clone());
    let i2c = arb.machine().client();
    let mut disp = Display::new(&qf, &faults, prio(1), i2c, QDuration::from_millis(100)).unwrap();
    qf.start(&mut arb, 8).unwrap();
    qf.start(&mut disp, 8).unwrap();

    settle(&qf, &mut [&mut arb, &mut disp], &bus, i2c);

    let sent = writes(&bus);
    assert_eq!(sent.len(), INIT_COMMANDS.len());
    for (frame, (cmd, args)) in sent.iter().zip(INIT_COMMANDS.iter()) {
        assert_eq!(frame[0], 0x00);
        assert_eq!(frame[1], *cmd);
        assert_eq!(&frame[2..], *args);
    }
    let payload: usize = sent.iter().map(|f| f.len() - 1).sum();
    assert_eq!(payload, 26);
    assert_eq!(disp.state(), Some(DisplayState::Idle));
    assert_eq!(faults.active_count(), 0);
    assert!(qf.pool_stats(SizeClass::Large).is_idle());
}

#[test]
fn test_refresh_streams_windows_then_eight_pages() {
    let qf = EcuQf::new(EcuPools::new());
    let faults = FaultManager::new(&qf);
    let bus = SimI2cBus::new();
    let mut arb = SharedI2c::new(&qf, prio(6), bus.clone());
    let i2c = arb.machine().client();
    let mut disp = Display::new(&qf, &faults, prio(1), i2c, QDuration::from_millis(100)).unwrap();
    qf.start(&mut arb, 8).unwrap();
    qf.start(&mut disp, 8).unwrap();
    settle(&qf, &mut [&mut arb, &mut disp], &bus, i2c);
    bus.clear_transfers();

    let data = MotorData {
        temperature: 2350,
        pressure: 1250,
        tachometer: 1200,
        vbat: 1260,
        ..MotorData::default()
    };
    qf.publish(MOTOR_DATA, QPayload::Medium(MediumEvt::MotorData(data)));
    advance(&qf, &mut [&mut arb, &mut disp], &bus, i2c, 99);
    assert_eq!(disp.machine().frames(), 0);
    advance(&qf, &mut [&mut arb, &mut disp], &bus, i2c, 1);
    assert_eq!(disp.machine().frames(), 1);

    let sent = writes(&bus);
    assert_eq!(sent.len(), 2 + framebuffer::PAGES);
    assert_eq!(sent[0], vec![0x00, 0x21, 0, 127]);
    assert_eq!(sent[1], vec![0x00, 0x22, 0, 7]);
    for (page, frame) in sent[2..].iter().enumerate() {
        assert_eq!(frame.len(), 1 + framebuffer::WIDTH);
        assert_eq!(frame[0], 0x40);
        assert_eq!(&frame[1..], disp.machine().framebuffer().page(page));
    }
    assert!(disp.machine().framebuffer().lit_pixels() > 0);

    advance(&qf, &mut [&mut arb, &mut disp], &bus, i2c, 200);
    assert_eq!(disp.machine().frames(), 3);
    assert!(qf.pool_stats(SizeClass::Medium).is_idle());
}

#[test]
fn test_startup_nack_raises_startup_fault() {
    let qf = EcuQf::new(EcuPools::new());
    let faults = FaultManager::new(&qf);
    let bus = SimI2cBus::new();
    bus.set_nack(display::ADDRESS, true);
    let mut arb = SharedI2c::new(&qf, prio(6), bus.clone());
    let i2c = arb.machine().client();
    let mut disp = Display::new(&qf, &faults, prio(2), i2c, QDuration::from_millis(100)).unwrap();
    let mut probe = Probe::new(&qf, prio(1), &[FAULT_GENERATED]);
    qf.start(&mut arb, 8).unwrap();
    qf.start(&mut probe, 8).unwrap();
    qf.start(&mut disp, 8).unwrap();

    advance(&qf, &mut [&mut arb, &mut disp, &mut probe], &bus, i2c, 300);

    assert_eq!(disp.state(), Some(DisplayState::StartupError));
    assert_eq!(bus.transfers().len(), 1);
    assert!(faults.is_active(FaultId::DisplayStartup));
    assert_eq!(probe.machine().count(FAULT_GENERATED), 1);
}

#[test]
fn test_running_error_raises_fault_and_stops_refresh() {
    let qf = EcuQf::new(EcuPools::new());
    let faults = FaultManager::new(&qf);
    let bus = SimI2cBus::new();
    let mut arb = SharedI2c::new(&qf, prio(6), bus.clone());
    let i2c = arb.machine().client();
    let mut disp = Display::new(&qf, &faults, prio(1), i2c, QDuration::from_millis(100)).unwrap();
    qf.start(&mut arb, 8).unwrap();
    qf.start(&mut disp, 8).unwrap();
    settle(&qf, &mut [&mut arb, &mut disp], &bus, i2c);

    bus.fail_next(HalError::ArbitrationLost);
    advance(&qf, &mut [&mut arb, &mut disp], &bus, i2c, 100);
    assert_eq!(disp.state(), Some(DisplayState::Error));
    assert!(faults.is_active(FaultId::DisplayI2c));
    assert!(!faults.is_active(FaultId::DisplayStartup));

    bus.clear_transfers();
    advance(&qf, &mut [&mut arb, &mut disp], &bus, i2c, 300);
    assert!(bus.transfers().is_empty());
}
