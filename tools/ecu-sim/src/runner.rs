//! Runs the complete firmware on simulated peripherals at 1 kHz

use ecu_app::{
    display, telemetry_complete_isr, EcuConfig, EcuPeripherals, EcuPools, EcuQf, EcuSystem,
    FaultManager, FaultRecord, MotorData, SharedI2cHandle,
};
use ecu_hal::sim::{SimI2cBus, SimMotorInputs, SimPin, SimPulseCounter, SimUart};
use qp_qf::{QActive, SizeClass};
use serde::Serialize;

use crate::devices::{MprlsModel, PanelState, Ssd1306Model};
use crate::error::SimError;

/// Input-capture timer period, 16 bits at the capture clock
const CAPTURE_PERIOD_MS: u64 = 33;

/// LMT01 conversion cadence
const TEMPERATURE_CONVERSION_MS: u64 = 100;

/// Scenario of one run
#[derive(Debug, Clone)]
pub struct SimOptions {
    pub duration_ms: u64,
    pub report_ms: u64,
    pub pressure_psi: f64,
    pub engine_rpm: f64,
    pub celsius: f64,
    pub vbat_volts: f32,
    pub stall_tach: bool,
    pub fail_display_at: Option<u64>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            duration_ms: 1000,
            report_ms: 100,
            pressure_psi: 14.7,
            engine_rpm: 3000.0,
            celsius: 25.0,
            vbat_volts: 12.6,
            stall_tach: false,
            fail_display_at: None,
        }
    }
}

/// One motor-data sample taken during the run
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Snapshot {
    pub t_ms: u64,
    pub data: MotorData,
}

/// Outcome of a run
#[derive(Debug, Clone)]
pub struct SimSummary {
    pub elapsed_ms: u64,
    pub frames: u32,
    pub telemetry_frames: usize,
    pub faults: Vec<FaultRecord>,
    pub panel: PanelState,
    pub pools_idle: bool,
}

/// LMT01 pulse count for a temperature
pub fn lmt01_pulses(celsius: f64) -> u16 {
    ((celsius * 100.0 + 5000.0) / 6.25).round().clamp(0.0, f64::from(u16::MAX)) as u16
}

/// Battery ADC counts for a voltage
fn vbat_raw(config: &EcuConfig, volts: f32) -> u16 {
    let cal = config.vbat_cal;
    (volts / cal.multiplier * cal.adc_full_scale)
        .round()
        .clamp(0.0, f32::from(u16::MAX)) as u16
}

fn settle(
    qf: &EcuQf,
    aos: &mut [&mut dyn QActive<EcuPools>],
    bus: &SimI2cBus,
    i2c: SharedI2cHandle,
) -> Result<(), SimError> {
    i2c.run_polled(qf, aos, || bus.complete())?;
    Ok(())
}

/// Run `options` against `config`, handing each periodic snapshot to
/// `on_snapshot`.
pub fn run(
    config: &EcuConfig,
    options: &SimOptions,
    mut on_snapshot: impl FnMut(&Snapshot),
) -> Result<SimSummary, SimError> {
    if !config.priorities_unique() {
        return Err(SimError::InvalidConfig(
            "two active objects share a priority".to_string(),
        ));
    }

    let qf = EcuQf::new(EcuPools::new());
    let faults = FaultManager::new(&qf);

    let bus = SimI2cBus::new();
    let panel = Ssd1306Model::new();
    let sensor = MprlsModel::new(options.pressure_psi, config.pressure_cal);
    bus.attach(panel.clone());
    bus.attach(sensor.clone());

    let counter = SimPulseCounter::new();
    let inputs = SimMotorInputs::new();
    inputs.vbat.set(vbat_raw(config, options.vbat_volts));
    let uart = SimUart::new();

    let mut system = EcuSystem::new(
        &qf,
        &faults,
        config,
        EcuPeripherals {
            i2c: bus.clone(),
            pressure_reset: SimPin::new(true),
            temperature_counter: counter.clone(),
            inputs: inputs.pins(),
            telemetry: uart.clone(),
        },
    )?;
    system.start(&qf)?;
    let i2c = system.i2c();
    let tach = system.tach();

    let cal = config.tach_cal;
    let pulse_hz = options.engine_rpm * f64::from(cal.pulses_per_revolution) / 60.0;
    let width = if pulse_hz > 0.0 {
        (f64::from(cal.capture_clock_hz) / pulse_hz).round() as u32
    } else {
        0
    };
    let mut phase = 0.0f64;
    let mut capture = 0u32;

    log::info!(
        "simulating {} ms: {} psi, {} rpm, {} C",
        options.duration_ms,
        options.pressure_psi,
        options.engine_rpm,
        options.celsius
    );

    for ms in 0..options.duration_ms {
        if options.fail_display_at == Some(ms) {
            log::warn!("display disconnected at {} ms", ms);
            bus.set_nack(display::ADDRESS, true);
        }
        if ms % TEMPERATURE_CONVERSION_MS == 0 {
            counter.set(lmt01_pulses(options.celsius));
        }

        qf.tick();

        if !options.stall_tach && width > 0 {
            phase += pulse_hz / 1000.0;
            while phase >= 1.0 {
                phase -= 1.0;
                capture = capture.wrapping_add(width);
                tach.capture_isr(&qf, capture);
            }
        }
        if ms % CAPTURE_PERIOD_MS == CAPTURE_PERIOD_MS - 1 {
            tach.period_elapsed_isr(&qf);
        }

        settle(&qf, &mut system.actives(), &bus, i2c)?;
        if uart.finish() {
            telemetry_complete_isr(&qf);
            settle(&qf, &mut system.actives(), &bus, i2c)?;
        }

        if options.report_ms > 0 && (ms + 1) % options.report_ms == 0 {
            on_snapshot(&Snapshot {
                t_ms: ms + 1,
                data: *system.data_manager.machine().data(),
            });
        }
    }

    let pools_idle = [SizeClass::Small, SizeClass::Medium, SizeClass::Large]
        .into_iter()
        .all(|class| qf.pool_stats(class).is_idle());

    Ok(SimSummary {
        elapsed_ms: options.duration_ms,
        frames: system.display.machine().frames(),
        telemetry_frames: uart.sent().len(),
        faults: faults
            .active_fault_list()
            .into_iter()
            .take_while(|f| !f.is_none())
            .collect(),
        panel: panel.panel(),
        pools_idle,
    })
}
