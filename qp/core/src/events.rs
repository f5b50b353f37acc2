//! Signals and immutable events

use core::fmt;

/// Type-safe event signal identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QSignal(pub u16);

impl QSignal {
    /// Reserved signal for the nested initial transition of a state
    pub const INIT: QSignal = QSignal(0);
    /// Reserved signal for state entry actions
    pub const ENTRY: QSignal = QSignal(1);
    /// Reserved signal for state exit actions
    pub const EXIT: QSignal = QSignal(2);
    /// Reserved signal for empty/null events
    pub const EMPTY: QSignal = QSignal(3);

    /// First user-defined signal
    pub const USER: QSignal = QSignal(4);

    /// Create a new signal from a raw value
    pub const fn new(signal: u16) -> Self {
        QSignal(signal)
    }

    /// Get the raw signal value
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Signals below [`QSignal::USER`] belong to the state machine engine
    pub const fn is_reserved(self) -> bool {
        self.0 < Self::USER.0
    }

    /// Offset into an application signal range
    pub const fn offset(self, n: u16) -> Self {
        QSignal(self.0 + n)
    }
}

impl fmt::Display for QSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QSignal({})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for QSignal {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "QSignal({})", self.0);
    }
}

/// An event as seen by a state handler.
///
/// The signal and payload are fixed at construction. Events that travel
/// through queues live in the event pools; the scheduler rebuilds a `QEvt`
/// from the pooled payload for the duration of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct QEvt<P> {
    signal: QSignal,
    payload: P,
}

impl<P> QEvt<P> {
    /// Create an event carrying `payload`
    pub const fn new(signal: QSignal, payload: P) -> Self {
        Self { signal, payload }
    }

    pub const fn signal(&self) -> QSignal {
        self.signal
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }

    pub fn is_reserved(&self) -> bool {
        self.signal.is_reserved()
    }
}

impl<P: Default> QEvt<P> {
    /// Payload-free event, used for ENTRY/EXIT/INIT and plain notifications
    pub fn signal_only(signal: QSignal) -> Self {
        Self {
            signal,
            payload: P::default(),
        }
    }
}

#[cfg(feature = "defmt")]
impl<P> defmt::Format for QEvt<P> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "QEvt({})", self.signal);
    }
}
