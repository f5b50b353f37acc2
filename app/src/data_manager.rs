//! Aggregates sensor readings and board inputs into [`MotorData`].
//!
//! Sampling runs at the data-sample period. Each pass publishes a snapshot
//! and sends a text telemetry frame; the next frame waits for the UART to
//! report completion.

use core::fmt::Write;

use ecu_hal::{HalError, HalResult, MotorInputs, TelemetryPort, TriState, VbatCalibration};
use heapless::String;
use qp_qf::{
    q_fatal, QActiveObject, QDuration, QHsm, QPayload, QPriority, QResult, QSignal,
    QStateMachine, QStateReturn, QTimeEvtId,
};

use crate::events::{self, EcuQf, Evt, MediumEvt, MotorData, Payload};
use crate::signals::{DATA_MANAGER_BASE, MOTOR_DATA, PRESSURE, TACH, TEMPERATURE, UART_COMPLETE};

const SAMPLE: QSignal = DATA_MANAGER_BASE;

pub const TELEMETRY_MAX_LEN: usize = 48;

/// Telemetry UART transmit-complete interrupt
pub fn telemetry_complete_isr(qf: &EcuQf) {
    qf.publish(UART_COMPLETE, QPayload::None);
}

/// First-order low-pass, `f = λ·f + (1-λ)·x`, seeded by the first sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ema {
    lambda: f32,
    value: Option<f32>,
}

impl Ema {
    pub const fn new(lambda: f32) -> Self {
        Self { lambda, value: None }
    }

    pub fn update(&mut self, x: f32) -> f32 {
        let f = match self.value {
            Some(f) => self.lambda * f + (1.0 - self.lambda) * x,
            None => x,
        };
        self.value = Some(f);
        f
    }

    pub fn value(&self) -> Option<f32> {
        self.value
    }
}

/// Nearest integer, saturating
fn round_i16(x: f32) -> i16 {
    if x >= 0.0 {
        (x + 0.5) as i16
    } else {
        (x - 0.5) as i16
    }
}

/// Text frame sent over the telemetry UART
pub fn telemetry_frame(data: &MotorData) -> String<TELEMETRY_MAX_LEN> {
    let mut frame = String::new();
    // three i16 values always fit
    let _ = write!(
        frame,
        "P{}\r\nT{}\r\nR{}\r\n",
        data.pressure, data.temperature, data.tachometer
    );
    frame
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataState {
    Top,
    Running,
    WaitingForUart,
}

pub struct DataManager<'q, I: MotorInputs, U: TelemetryPort> {
    qf: &'q EcuQf,
    prio: QPriority,
    inputs: I,
    uart: U,
    sample: QTimeEvtId,
    sample_ticks: u32,
    vbat_cal: VbatCalibration,
    tach: Ema,
    /// Latest unfiltered reading, filtered once per sample
    tach_raw: Option<i16>,
    vbat: Ema,
    data: MotorData,
    sent: u32,
    skipped: u32,
}

impl<'q, I: MotorInputs, U: TelemetryPort> DataManager<'q, I, U> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        qf: &'q EcuQf,
        prio: QPriority,
        inputs: I,
        uart: U,
        sample: QDuration,
        vbat_cal: VbatCalibration,
        tach_lambda: f32,
        vbat_lambda: f32,
    ) -> QResult<QHsm<Self>> {
        Ok(QHsm::new(Self {
            qf,
            prio,
            inputs,
            uart,
            sample: qf.time_event(prio, SAMPLE)?,
            sample_ticks: sample.ticks(),
            vbat_cal,
            tach: Ema::new(tach_lambda),
            tach_raw: None,
            vbat: Ema::new(vbat_lambda),
            data: MotorData::default(),
            sent: 0,
            skipped: 0,
        }))
    }

    /// Most recent snapshot
    pub fn data(&self) -> &MotorData {
        &self.data
    }

    /// Telemetry frames handed to the UART
    pub fn frames_sent(&self) -> u32 {
        self.sent
    }

    /// Samples dropped while a frame was still going out
    pub fn samples_skipped(&self) -> u32 {
        self.skipped
    }

    fn read_inputs(&mut self) -> HalResult<()> {
        self.data.neutral = self.inputs.neutral()?;
        self.data.start = self.inputs.start()?;
        self.data.buzzer = self.inputs.buzzer()?;
        self.data.red = self.inputs.red_wire()?;
        self.data.orange = self.inputs.orange_wire()?;
        let volts = self.vbat_cal.volts(self.inputs.vbat_raw()?);
        self.data.vbat = round_i16(self.vbat.update(volts) * 100.0);
        Ok(())
    }

    fn filter_tach(&mut self) {
        if let Some(rpm) = self.tach_raw {
            self.data.tachometer = round_i16(self.tach.update(f32::from(rpm)));
        }
    }

    /// Samples, publishes, and returns true once a frame is in flight
    fn on_sample(&mut self) -> bool {
        self.filter_tach();
        if let Err(e) = self.read_inputs() {
            log::warn!("data: input read failed: {}", e);
            self.data.red = TriState::Unknown;
            self.data.orange = TriState::Unknown;
        }
        self.qf.publish(
            MOTOR_DATA,
            QPayload::Medium(MediumEvt::MotorData(self.data)),
        );

        let frame = telemetry_frame(&self.data);
        match self.uart.start_transmit(frame.as_bytes()) {
            Ok(()) => {
                self.sent += 1;
                true
            }
            Err(nb::Error::WouldBlock) | Err(nb::Error::Other(HalError::Busy)) => {
                log::warn!("data: telemetry port busy");
                false
            }
            Err(nb::Error::Other(e)) => {
                log::error!("data: telemetry failed: {}", e);
                false
            }
        }
    }
}

impl<I: MotorInputs, U: TelemetryPort> QStateMachine for DataManager<'_, I, U> {
    type State = DataState;
    type Payload = Payload;

    fn initial(&mut self) -> DataState {
        for sig in [PRESSURE, TEMPERATURE, TACH, UART_COMPLETE] {
            if let Err(e) = self.qf.subscribe(self.prio, sig) {
                q_fatal(e, "DataManager::initial");
            }
        }
        DataState::Top
    }

    fn superstate(&self, state: DataState) -> Option<DataState> {
        match state {
            DataState::Top => None,
            DataState::Running | DataState::WaitingForUart => Some(DataState::Top),
        }
    }

    fn handle(&mut self, state: DataState, evt: &Evt) -> QStateReturn<DataState> {
        use DataState::*;

        match (state, evt.signal()) {
            (Top, QSignal::ENTRY) => {
                let t = self.sample_ticks;
                if let Err(e) = self.qf.arm(self.sample, t, t) {
                    q_fatal(e, "DataManager::top");
                }
                QStateReturn::Handled
            }
            (Top, QSignal::EXIT) => {
                let _ = self.qf.disarm(self.sample);
                QStateReturn::Handled
            }
            (Top, QSignal::INIT) => QStateReturn::Initial(Running),
            (Top, PRESSURE) => {
                if let Some(psi) = events::float(evt) {
                    self.data.pressure = round_i16(psi * 100.0);
                }
                QStateReturn::Handled
            }
            (Top, TEMPERATURE) => {
                if let Some(t) = events::int16(evt) {
                    self.data.temperature = t;
                }
                QStateReturn::Handled
            }
            (Top, TACH) => {
                if let Some(rpm) = events::int16(evt) {
                    self.tach_raw = Some(rpm);
                }
                QStateReturn::Handled
            }
            (Top, UART_COMPLETE) => QStateReturn::Handled,

            (Running, SAMPLE) => {
                if self.on_sample() {
                    QStateReturn::Transition(WaitingForUart)
                } else {
                    QStateReturn::Handled
                }
            }
            (WaitingForUart, SAMPLE) => {
                self.filter_tach();
                self.skipped += 1;
                log::trace!("data: sample skipped, telemetry in flight");
                QStateReturn::Handled
            }
            (WaitingForUart, UART_COMPLETE) => QStateReturn::Transition(Running),

            _ => QStateReturn::Super,
        }
    }
}

impl<I: MotorInputs, U: TelemetryPort> QActiveObject for DataManager<'_, I, U> {
    fn priority(&self) -> QPriority {
        self.prio
    }
}
