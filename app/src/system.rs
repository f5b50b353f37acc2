//! The board's full set of active objects, built from one [`EcuConfig`]

use ecu_hal::{I2cBus, MotorInputs, PulseCounter, TelemetryPort};
use embedded_hal::digital::OutputPin;
use qp_qf::{QActive, QError, QHsm, QResult};

use crate::config::EcuConfig;
use crate::data_manager::DataManager;
use crate::display::Display;
use crate::events::{EcuPools, EcuQf};
use crate::fault::FaultManager;
use crate::pressure::PressureSensor;
use crate::shared_i2c::{SharedI2c, SharedI2cHandle};
use crate::tachometer::{Tachometer, TachometerHandle};
use crate::temperature::TemperatureSensor;

/// Peripherals the active objects take ownership of
pub struct EcuPeripherals<B, R, C, I, U> {
    pub i2c: B,
    pub pressure_reset: R,
    pub temperature_counter: C,
    pub inputs: I,
    pub telemetry: U,
}

pub struct EcuSystem<'q, B, R, C, I, U>
where
    B: I2cBus,
    R: OutputPin,
    C: PulseCounter,
    I: MotorInputs,
    U: TelemetryPort,
{
    pub shared_i2c: QHsm<SharedI2c<'q, B>>,
    pub tachometer: QHsm<Tachometer<'q>>,
    pub pressure: QHsm<PressureSensor<'q, R>>,
    pub temperature: QHsm<TemperatureSensor<'q, C>>,
    pub data_manager: QHsm<DataManager<'q, I, U>>,
    pub display: QHsm<Display<'q>>,
    config: EcuConfig,
}

impl<'q, B, R, C, I, U> EcuSystem<'q, B, R, C, I, U>
where
    B: I2cBus,
    R: OutputPin,
    C: PulseCounter,
    I: MotorInputs,
    U: TelemetryPort,
{
    pub fn new(
        qf: &'q EcuQf,
        faults: &'q FaultManager<'q>,
        config: &EcuConfig,
        peripherals: EcuPeripherals<B, R, C, I, U>,
    ) -> QResult<Self> {
        if !config.priorities_unique() {
            log::error!("active object priorities collide");
            return Err(QError::InvalidPriority);
        }

        let shared_i2c = SharedI2c::new(qf, config.shared_i2c.prio(), peripherals.i2c);
        let i2c = shared_i2c.machine().client();

        Ok(Self {
            shared_i2c,
            tachometer: Tachometer::new(qf, config.tachometer.prio(), config.tach_cal),
            pressure: PressureSensor::new(
                qf,
                faults,
                config.pressure.prio(),
                i2c,
                peripherals.pressure_reset,
                config.pressure_cal,
                config.pressure_sample,
                config.pressure_watchdog,
            )?,
            temperature: TemperatureSensor::new(
                qf,
                config.temperature.prio(),
                peripherals.temperature_counter,
                config.temperature_poll,
            )?,
            data_manager: DataManager::new(
                qf,
                config.data_manager.prio(),
                peripherals.inputs,
                peripherals.telemetry,
                config.data_sample,
                config.vbat_cal,
                config.tach_lambda,
                config.vbat_lambda,
            )?,
            display: Display::new(
                qf,
                faults,
                config.display.prio(),
                i2c,
                config.display_refresh,
            )?,
            config: config.clone(),
        })
    }

    /// Register every queue and run the initial transitions.
    ///
    /// The arbiter starts first; the drivers post to it from their
    /// initial transitions.
    pub fn start(&mut self, qf: &EcuQf) -> QResult<()> {
        let cfg = &self.config;
        qf.start(&mut self.shared_i2c, cfg.shared_i2c.queue_capacity)?;
        qf.start(&mut self.tachometer, cfg.tachometer.queue_capacity)?;
        qf.start(&mut self.temperature, cfg.temperature.queue_capacity)?;
        qf.start(&mut self.data_manager, cfg.data_manager.queue_capacity)?;
        qf.start(&mut self.pressure, cfg.pressure.queue_capacity)?;
        qf.start(&mut self.display, cfg.display.queue_capacity)?;
        log::info!("ecu: active objects started");
        Ok(())
    }

    pub fn config(&self) -> &EcuConfig {
        &self.config
    }

    /// Client and ISR handle of the bus arbiter
    pub fn i2c(&self) -> SharedI2cHandle {
        self.shared_i2c.machine().client()
    }

    pub fn tach(&self) -> TachometerHandle {
        self.tachometer.machine().isr_handle()
    }

    /// All active objects, for the scheduler
    pub fn actives(&mut self) -> [&mut dyn QActive<EcuPools>; 6] {
        [
            &mut self.shared_i2c,
            &mut self.tachometer,
            &mut self.pressure,
            &mut self.temperature,
            &mut self.data_manager,
            &mut self.display,
        ]
    }
}
