//! Shared fixtures for the ecu-app integration tests
#![allow(dead_code)]

use ecu_app::{EcuQf, Evt, Payload, SharedI2cHandle, SmallEvt};
use ecu_hal::sim::SimI2cBus;
use qp_qf::{
    QActive, QActiveObject, QHsm, QPayload, QPriority, QSignal, QStateMachine, QStateReturn,
};
use qp_qv::QV;

pub fn prio(p: u8) -> QPriority {
    QPriority::new(p).unwrap()
}

/// Records every user event it receives
pub struct Probe<'q> {
    qf: &'q EcuQf,
    prio: QPriority,
    subscriptions: Vec<QSignal>,
    pub log: Vec<(QSignal, Payload)>,
}

impl<'q> Probe<'q> {
    pub fn new(qf: &'q EcuQf, prio: QPriority, subscriptions: &[QSignal]) -> QHsm<Self> {
        QHsm::new(Self {
            qf,
            prio,
            subscriptions: subscriptions.to_vec(),
            log: Vec::new(),
        })
    }

    pub fn signals(&self) -> Vec<QSignal> {
        self.log.iter().map(|(s, _)| *s).collect()
    }

    pub fn count(&self, signal: QSignal) -> usize {
        self.log.iter().filter(|(s, _)| *s == signal).count()
    }

    pub fn int16s(&self, signal: QSignal) -> Vec<i16> {
        self.log
            .iter()
            .filter(|(s, _)| *s == signal)
            .filter_map(|(_, p)| match p {
                QPayload::Small(SmallEvt::Int16(v)) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn floats(&self, signal: QSignal) -> Vec<f32> {
        self.log
            .iter()
            .filter(|(s, _)| *s == signal)
            .filter_map(|(_, p)| match p {
                QPayload::Small(SmallEvt::Float(v)) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }
}

impl QStateMachine for Probe<'_> {
    type State = ();
    type Payload = Payload;

    fn initial(&mut self) {
        for sig in &self.subscriptions {
            self.qf.subscribe(self.prio, *sig).unwrap();
        }
    }

    fn superstate(&self, _state: ()) -> Option<()> {
        None
    }

    fn handle(&mut self, _state: (), evt: &Evt) -> QStateReturn<()> {
        if evt.is_reserved() {
            return QStateReturn::Super;
        }
        self.log.push((evt.signal(), evt.payload().clone()));
        QStateReturn::Handled
    }
}

impl QActiveObject for Probe<'_> {
    fn priority(&self) -> QPriority {
        self.prio
    }
}

/// Run to idle, then play the bus interrupts until no transfer is left
pub fn settle(
    qf: &EcuQf,
    aos: &mut [&mut dyn QActive<ecu_app::EcuPools>],
    bus: &SimI2cBus,
    i2c: SharedI2cHandle,
) {
    i2c.run_polled(qf, aos, || bus.complete()).unwrap();
}

/// Advance `ms` system ticks, settling after each
pub fn advance(
    qf: &EcuQf,
    aos: &mut [&mut dyn QActive<ecu_app::EcuPools>],
    bus: &SimI2cBus,
    i2c: SharedI2cHandle,
    ms: u32,
) {
    for _ in 0..ms {
        qf.tick();
        settle(qf, aos, bus, i2c);
    }
}

/// Advance `ms` system ticks for objects that never touch the bus
pub fn run_ticks(qf: &EcuQf, aos: &mut [&mut dyn QActive<ecu_app::EcuPools>], ms: u32) {
    let qv = QV::new(qf);
    qv.run_until_idle(aos).unwrap();
    for _ in 0..ms {
        qf.tick();
        qv.run_until_idle(aos).unwrap();
    }
}
