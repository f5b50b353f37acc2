#![no_std]
#![forbid(unsafe_code)]

//! # QV Cooperative Kernel
//!
//! The vanilla (cooperative) kernel providing run-to-completion semantics
//! with priority-based event dispatching. No preemption occurs between
//! events: each pass takes one event from the highest-priority ready queue
//! and runs it to completion before looking at the queues again.

use core::cell::RefCell;

use critical_section::Mutex;
use qp_core::{q_fatal, QError, QResult};
use qp_qf::{QActive, QEventStore, QF};

/// QV kernel - cooperative scheduler over one framework instance
pub struct QV<'q, S: QEventStore> {
    qf: &'q QF<S>,
    running: Mutex<RefCell<bool>>,
}

impl<'q, S: QEventStore> QV<'q, S> {
    pub const fn new(qf: &'q QF<S>) -> Self {
        Self {
            qf,
            running: Mutex::new(RefCell::new(false)),
        }
    }

    pub fn qf(&self) -> &'q QF<S> {
        self.qf
    }

    /// Dispatch one event, if any is ready.
    ///
    /// The event goes to the object in `aos` whose priority owns the ready
    /// queue; its pool reference is dropped after the dispatch. Returns
    /// false when every queue was empty.
    pub fn dispatch_once(&self, aos: &mut [&mut dyn QActive<S>]) -> QResult<bool> {
        let Some((prio, evt_ref)) = self.qf.next_ready() else {
            return Ok(false);
        };
        let result = self.qf.resolve(evt_ref).and_then(|evt| {
            let ao = aos
                .iter_mut()
                .find(|ao| ao.priority() == prio)
                .ok_or(QError::InvalidPriority)?;
            log::trace!("dispatch {} to {}", evt.signal(), prio);
            ao.dispatch(&evt)
        });
        self.qf.gc(evt_ref);
        result.map(|_| true)
    }

    /// Dispatch until no queue holds an event; returns the number dispatched
    pub fn run_until_idle(&self, aos: &mut [&mut dyn QActive<S>]) -> QResult<usize> {
        let mut count = 0;
        while self.dispatch_once(aos)? {
            count += 1;
        }
        Ok(count)
    }

    /// Run the cooperative scheduler forever.
    ///
    /// `on_idle` runs whenever every queue is empty, typically to sleep
    /// until the next interrupt. An error from a state machine is fatal.
    pub fn run(&self, aos: &mut [&mut dyn QActive<S>], mut on_idle: impl FnMut()) -> ! {
        critical_section::with(|cs| {
            *self.running.borrow_ref_mut(cs) = true;
        });
        log::info!("QV running {} active objects", aos.len());

        loop {
            match self.dispatch_once(aos) {
                Ok(true) => {}
                Ok(false) => on_idle(),
                Err(e) => q_fatal(e, "QV::run"),
            }
        }
    }

    /// Clear the running flag
    pub fn stop(&self) {
        critical_section::with(|cs| {
            *self.running.borrow_ref_mut(cs) = false;
        });
    }

    pub fn is_running(&self) -> bool {
        critical_section::with(|cs| *self.running.borrow_ref(cs))
    }
}

#[cfg(feature = "defmt")]
impl<S: QEventStore> defmt::Format for QV<'_, S> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "QV{{running: {}}}", self.is_running());
    }
}
