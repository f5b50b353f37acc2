//! MPRLS0025PA pressure sensor driver.
//!
//! The sensor is reset through a GPIO, then polled: a measurement command
//! goes out through the command composer, and once the conversion time has
//! passed a 7-byte read returns status, pressure counts and temperature
//! counts. A watchdog independent of bus errors restarts the sensor when no
//! valid reading arrived within its window.

use embedded_hal::digital::OutputPin;
use ecu_hal::I2cAddress;
use qp_qf::{
    q_fatal, QActiveObject, QDuration, QHsm, QPayload, QPriority, QResult, QSignal,
    QStateMachine, QStateReturn, QTimeEvtId,
};

use crate::command::CommandSender;
use crate::config::PressureCalibration;
use crate::events::{EcuQf, Evt, MediumEvt, Payload, SmallEvt};
use crate::fault::{FaultId, FaultManager};
use crate::shared_i2c::{I2cReplyTo, SharedI2cHandle};
use crate::signals::{PRESSURE, PRESSURE_BASE};

pub const ADDRESS: I2cAddress = I2cAddress::new_unchecked(0x18);

const MEASURE: u8 = 0xAA;
const READ_LEN: usize = 7;
const RESET_HOLD_MS: u32 = 10;
const CONVERSION_MS: u32 = 10;

/// Status byte bits
pub const STATUS_POWERED: u8 = 0x40;
pub const STATUS_BUSY: u8 = 0x20;

const TIMEOUT: QSignal = PRESSURE_BASE;
const WATCHDOG: QSignal = PRESSURE_BASE.offset(1);
const I2C_COMPLETE: QSignal = PRESSURE_BASE.offset(2);
const I2C_ERROR: QSignal = PRESSURE_BASE.offset(3);

/// One decoded readout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressureSample {
    pub status: u8,
    pub pressure_counts: u32,
    pub temperature_counts: u32,
}

impl PressureSample {
    pub fn decode(raw: &[u8]) -> Option<Self> {
        let raw: &[u8; READ_LEN] = raw.get(..READ_LEN)?.try_into().ok()?;
        let counts = |b: &[u8]| u32::from(b[0]) << 16 | u32::from(b[1]) << 8 | u32::from(b[2]);
        Some(Self {
            status: raw[0],
            pressure_counts: counts(&raw[1..4]),
            temperature_counts: counts(&raw[4..7]),
        })
    }

    /// Conversion still running; the counts are stale
    pub fn is_busy(&self) -> bool {
        self.status & STATUS_BUSY != 0
    }

    /// Die temperature in °C
    pub fn die_temperature(&self) -> f32 {
        self.temperature_counts as f32 * 200.0 / 16_777_215.0 - 50.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureState {
    Top,
    Startup,
    IntoReset,
    OutOfReset,
    StartupError,
    Running,
    Waiting,
    /// Composer state; parent set by the composer
    SendCommand,
    ReadData,
    Error,
}

pub struct PressureSensor<'q, R: OutputPin> {
    qf: &'q EcuQf,
    faults: &'q FaultManager<'q>,
    prio: QPriority,
    i2c: SharedI2cHandle,
    command: CommandSender<PressureState>,
    reset: R,
    cal: PressureCalibration,
    timer: QTimeEvtId,
    watchdog: QTimeEvtId,
    sample_ticks: u32,
    watchdog_ticks: u32,
    reading_seen: bool,
    /// A request of ours is on the bus
    awaiting_reply: bool,
    /// Replies still owed for requests abandoned by a restart
    stale_replies: u8,
    last_psi: Option<f32>,
    discarded: u32,
}

impl<'q, R: OutputPin> PressureSensor<'q, R> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        qf: &'q EcuQf,
        faults: &'q FaultManager<'q>,
        prio: QPriority,
        i2c: SharedI2cHandle,
        reset: R,
        cal: PressureCalibration,
        sample: QDuration,
        watchdog: QDuration,
    ) -> QResult<QHsm<Self>> {
        Ok(QHsm::new(Self {
            qf,
            faults,
            prio,
            i2c,
            command: CommandSender::new(ADDRESS, None),
            reset,
            cal,
            timer: qf.time_event(prio, TIMEOUT)?,
            watchdog: qf.time_event(prio, WATCHDOG)?,
            sample_ticks: sample.ticks(),
            watchdog_ticks: watchdog.ticks(),
            reading_seen: false,
            awaiting_reply: false,
            stale_replies: 0,
            last_psi: None,
            discarded: 0,
        }))
    }

    /// Latest published pressure in psi
    pub fn last_psi(&self) -> Option<f32> {
        self.last_psi
    }

    /// Samples dropped because the busy bit was set
    pub fn discarded(&self) -> u32 {
        self.discarded
    }

    fn reply(&self) -> I2cReplyTo {
        I2cReplyTo {
            to: self.prio,
            complete: I2C_COMPLETE,
            error: I2C_ERROR,
        }
    }

    fn arm_once(&self, ticks: u32) {
        if let Err(e) = self.qf.arm(self.timer, ticks, 0) {
            q_fatal(e, "PressureSensor::arm");
        }
    }

    fn disarm(&self) {
        let _ = self.qf.disarm(self.timer);
    }

    fn set_reset(&mut self, released: bool) {
        let result = if released {
            self.reset.set_high()
        } else {
            self.reset.set_low()
        };
        if result.is_err() {
            log::warn!("pressure: reset line not driven");
        }
    }

    fn on_readout(&mut self, evt: &Evt) {
        let QPayload::Medium(MediumEvt::I2cReply(reply)) = evt.payload() else {
            log::warn!("pressure: readout without data");
            return;
        };
        let Some(sample) = PressureSample::decode(&reply.data) else {
            log::warn!("pressure: short readout ({} bytes)", reply.data.len());
            return;
        };
        if sample.is_busy() {
            self.discarded += 1;
            log::warn!("pressure: busy sample discarded (status 0x{:02x})", sample.status);
            return;
        }
        let psi = self.cal.pressure(sample.pressure_counts) as f32;
        log::debug!(
            "pressure: {} psi, die {} C",
            psi,
            sample.die_temperature()
        );
        self.reading_seen = true;
        self.last_psi = Some(psi);
        self.qf
            .publish(PRESSURE, QPayload::Small(SmallEvt::Float(psi)));
    }
}

impl<R: OutputPin> QStateMachine for PressureSensor<'_, R> {
    type State = PressureState;
    type Payload = Payload;

    fn initial(&mut self) -> PressureState {
        PressureState::Top
    }

    fn superstate(&self, state: PressureState) -> Option<PressureState> {
        use PressureState::*;

        match state {
            Top => None,
            Startup | StartupError | Running | Error => Some(Top),
            IntoReset | OutOfReset => Some(Startup),
            Waiting | ReadData => Some(Running),
            SendCommand => self.command.superstate(),
        }
    }

    fn handle(&mut self, state: PressureState, evt: &Evt) -> QStateReturn<PressureState> {
        use PressureState::*;

        if evt.signal() == I2C_COMPLETE || evt.signal() == I2C_ERROR {
            if self.stale_replies > 0 {
                self.stale_replies -= 1;
                log::debug!("pressure: dropped reply to a request from before the restart");
                return QStateReturn::Handled;
            }
            self.awaiting_reply = false;
        }

        match (state, evt.signal()) {
            (SendCommand, _) => {
                let reply = self.reply();
                self.command.handle(self.qf, self.i2c, reply, evt)
            }

            (Top, QSignal::ENTRY) => {
                let wd = self.watchdog_ticks;
                if let Err(e) = self.qf.arm(self.watchdog, wd, wd) {
                    q_fatal(e, "PressureSensor::watchdog");
                }
                QStateReturn::Handled
            }
            (Top, QSignal::INIT) => QStateReturn::Initial(Startup),
            (Top, WATCHDOG) => {
                if self.reading_seen {
                    self.reading_seen = false;
                    QStateReturn::Handled
                } else {
                    self.faults.generate_fault(
                        "pressure",
                        FaultId::PressureNoData,
                        "no reading in watchdog window",
                    );
                    if self.awaiting_reply {
                        self.awaiting_reply = false;
                        self.stale_replies = self.stale_replies.saturating_add(1);
                    }
                    QStateReturn::Transition(Startup)
                }
            }

            (Startup, QSignal::INIT) => QStateReturn::Initial(IntoReset),
            (Startup, I2C_ERROR) => QStateReturn::Transition(StartupError),
            (IntoReset, QSignal::ENTRY) => {
                log::info!("pressure: reset");
                self.set_reset(false);
                self.arm_once(QDuration::from_millis(RESET_HOLD_MS).ticks());
                QStateReturn::Handled
            }
            (IntoReset, QSignal::EXIT) | (OutOfReset, QSignal::EXIT) => {
                self.disarm();
                QStateReturn::Handled
            }
            (IntoReset, TIMEOUT) => QStateReturn::Transition(OutOfReset),
            (OutOfReset, QSignal::ENTRY) => {
                self.set_reset(true);
                self.arm_once(QDuration::from_millis(RESET_HOLD_MS).ticks());
                QStateReturn::Handled
            }
            (OutOfReset, TIMEOUT) => QStateReturn::Transition(Running),

            (StartupError, QSignal::ENTRY) => {
                self.faults.generate_fault(
                    "pressure",
                    FaultId::PressureStartup,
                    "sensor did not start",
                );
                QStateReturn::Handled
            }

            (Running, QSignal::INIT) => QStateReturn::Initial(Waiting),
            (Running, I2C_ERROR) => QStateReturn::Transition(Error),
            (Waiting, QSignal::ENTRY) => {
                self.arm_once(self.sample_ticks);
                QStateReturn::Handled
            }
            (ReadData, QSignal::ENTRY) => {
                self.arm_once(QDuration::from_millis(CONVERSION_MS).ticks());
                QStateReturn::Handled
            }
            (Waiting, QSignal::EXIT) | (ReadData, QSignal::EXIT) => {
                self.disarm();
                QStateReturn::Handled
            }
            (Waiting, TIMEOUT) => {
                self.command.prepare(Running, ReadData, MEASURE, &[0x00, 0x00]);
                self.awaiting_reply = true;
                QStateReturn::Transition(SendCommand)
            }
            (ReadData, TIMEOUT) => {
                self.i2c.read(self.qf, ADDRESS, READ_LEN, self.reply());
                self.awaiting_reply = true;
                QStateReturn::Handled
            }
            (ReadData, I2C_COMPLETE) => {
                self.on_readout(evt);
                QStateReturn::Transition(Waiting)
            }

            (Error, QSignal::ENTRY) => {
                self.faults
                    .generate_fault("pressure", FaultId::PressureI2c, "transfer failed");
                QStateReturn::Handled
            }

            _ => QStateReturn::Super,
        }
    }
}

impl<R: OutputPin> QActiveObject for PressureSensor<'_, R> {
    fn priority(&self) -> QPriority {
        self.prio
    }
}
