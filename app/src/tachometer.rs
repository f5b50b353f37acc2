//! Tachometer from timer input capture.
//!
//! The capture and period-elapsed interrupts only forward raw counter
//! values; pulse widths and RPM are computed here.

use qp_qf::{QActiveObject, QHsm, QPayload, QPriority, QSignal, QStateMachine, QStateReturn};

use crate::config::TachCalibration;
use crate::events::{EcuQf, Evt, Payload, SmallEvt};
use crate::signals::{TACH, TACH_BASE};

const CAPTURE: QSignal = TACH_BASE;
const OVERFLOW: QSignal = TACH_BASE.offset(1);

/// ISR side of the tachometer
#[derive(Debug, Clone, Copy)]
pub struct TachometerHandle {
    prio: QPriority,
}

impl TachometerHandle {
    pub const fn new(prio: QPriority) -> Self {
        Self { prio }
    }

    /// Input-capture interrupt
    pub fn capture_isr(&self, qf: &EcuQf, counter: u32) {
        qf.post(self.prio, CAPTURE, QPayload::Small(SmallEvt::Capture(counter)));
    }

    /// Timer period elapsed without wrapping into a new capture
    pub fn period_elapsed_isr(&self, qf: &EcuQf) {
        qf.post(self.prio, OVERFLOW, QPayload::None);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TachState {
    Measuring,
}

pub struct Tachometer<'q> {
    qf: &'q EcuQf,
    prio: QPriority,
    cal: TachCalibration,
    baseline: Option<u32>,
    captured: bool,
    rpm: i16,
}

impl<'q> Tachometer<'q> {
    pub fn new(qf: &'q EcuQf, prio: QPriority, cal: TachCalibration) -> QHsm<Self> {
        QHsm::new(Self {
            qf,
            prio,
            cal,
            baseline: None,
            captured: false,
            rpm: 0,
        })
    }

    pub fn isr_handle(&self) -> TachometerHandle {
        TachometerHandle::new(self.prio)
    }

    /// Last published RPM
    pub fn rpm(&self) -> i16 {
        self.rpm
    }

    fn publish(&mut self, rpm: i16) {
        self.rpm = rpm;
        self.qf.publish(TACH, QPayload::Small(SmallEvt::Int16(rpm)));
    }

    fn on_capture(&mut self, counter: u32) {
        self.captured = true;
        let Some(old) = self.baseline.replace(counter) else {
            return;
        };
        let width = counter.wrapping_sub(old);
        if width == 0 {
            log::debug!("tach: zero width, stalled");
        }
        let rpm = self.cal.rpm(width);
        self.publish(rpm);
    }

    fn on_overflow(&mut self) {
        if !self.captured {
            self.baseline = None;
            self.publish(0);
        }
        self.captured = false;
    }
}

impl QStateMachine for Tachometer<'_> {
    type State = TachState;
    type Payload = Payload;

    fn initial(&mut self) -> TachState {
        TachState::Measuring
    }

    fn superstate(&self, _state: TachState) -> Option<TachState> {
        None
    }

    fn handle(&mut self, state: TachState, evt: &Evt) -> QStateReturn<TachState> {
        match (state, evt.signal()) {
            (TachState::Measuring, CAPTURE) => {
                if let QPayload::Small(SmallEvt::Capture(counter)) = evt.payload() {
                    self.on_capture(*counter);
                }
                QStateReturn::Handled
            }
            (TachState::Measuring, OVERFLOW) => {
                self.on_overflow();
                QStateReturn::Handled
            }
            _ => QStateReturn::Super,
        }
    }
}

impl QActiveObject for Tachometer<'_> {
    fn priority(&self) -> QPriority {
        self.prio
    }
}
