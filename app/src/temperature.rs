//! LMT01 pulse-count temperature sensor.
//!
//! The sensor emits a burst of pulses per conversion, counted in hardware.
//! A burst is complete once two consecutive polls see the same nonzero
//! count.

use ecu_hal::PulseCounter;
use qp_qf::{
    q_fatal, QActiveObject, QDuration, QHsm, QPayload, QPriority, QResult, QSignal,
    QStateMachine, QStateReturn, QTimeEvtId,
};

use crate::events::{EcuQf, Evt, Payload, SmallEvt};
use crate::signals::{TEMPERATURE, TEMPERATURE_BASE};

const POLL: QSignal = TEMPERATURE_BASE;

/// Hundredths of °C for a completed pulse count
pub fn centidegrees(count: u16) -> i16 {
    (f32::from(count) * 6.25 - 5000.0) as i16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureState {
    Polling,
}

pub struct TemperatureSensor<'q, C: PulseCounter> {
    qf: &'q EcuQf,
    prio: QPriority,
    counter: C,
    poll: QTimeEvtId,
    poll_ticks: u32,
    previous: u16,
    last: Option<i16>,
}

impl<'q, C: PulseCounter> TemperatureSensor<'q, C> {
    pub fn new(
        qf: &'q EcuQf,
        prio: QPriority,
        counter: C,
        poll: QDuration,
    ) -> QResult<QHsm<Self>> {
        Ok(QHsm::new(Self {
            qf,
            prio,
            counter,
            poll: qf.time_event(prio, POLL)?,
            poll_ticks: poll.ticks(),
            previous: 0,
            last: None,
        }))
    }

    /// Latest published temperature in hundredths of °C
    pub fn last(&self) -> Option<i16> {
        self.last
    }

    fn on_poll(&mut self) {
        let count = self.counter.count();
        if self.previous > 0 && self.previous == count {
            self.counter.reset();
            self.previous = 0;
            let value = centidegrees(count);
            log::trace!("temperature: {} pulses, {} cC", count, value);
            self.last = Some(value);
            self.qf
                .publish(TEMPERATURE, QPayload::Small(SmallEvt::Int16(value)));
        } else {
            self.previous = count;
        }
    }
}

impl<C: PulseCounter> QStateMachine for TemperatureSensor<'_, C> {
    type State = TemperatureState;
    type Payload = Payload;

    fn initial(&mut self) -> TemperatureState {
        TemperatureState::Polling
    }

    fn superstate(&self, _state: TemperatureState) -> Option<TemperatureState> {
        None
    }

    fn handle(&mut self, state: TemperatureState, evt: &Evt) -> QStateReturn<TemperatureState> {
        match (state, evt.signal()) {
            (TemperatureState::Polling, QSignal::ENTRY) => {
                if let Err(e) = self.qf.arm(self.poll, self.poll_ticks, self.poll_ticks) {
                    q_fatal(e, "TemperatureSensor::polling");
                }
                QStateReturn::Handled
            }
            (TemperatureState::Polling, QSignal::EXIT) => {
                let _ = self.qf.disarm(self.poll);
                QStateReturn::Handled
            }
            (TemperatureState::Polling, POLL) => {
                self.on_poll();
                QStateReturn::Handled
            }
            _ => QStateReturn::Super,
        }
    }
}

impl<C: PulseCounter> QActiveObject for TemperatureSensor<'_, C> {
    fn priority(&self) -> QPriority {
        self.prio
    }
}
