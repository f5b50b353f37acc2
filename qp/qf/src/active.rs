//! Active objects: a state machine with an event queue and a priority

use qp_qep::{QHsm, QStateMachine};

use crate::{QEventStore, QEvt, QPayload, QPriority, QResult};

/// Event type delivered by a framework using store `S`
pub type QEvtFor<S> = QEvt<QPayload<<S as QEventStore>::Catalog>>;

/// A state machine that runs as an active object.
///
/// The priority is both the scheduling order and the address other objects
/// post to; it must be unique.
pub trait QActiveObject: QStateMachine {
    fn priority(&self) -> QPriority;
}

/// The scheduler's view of an active object.
///
/// Object safe, so a scheduler can hold a slice of differently typed
/// objects.
pub trait QActive<S: QEventStore> {
    fn priority(&self) -> QPriority;

    /// Take the top-most initial transition
    fn start(&mut self) -> QResult<()>;

    /// Process one event to completion
    fn dispatch(&mut self, evt: &QEvtFor<S>) -> QResult<()>;
}

impl<S, M> QActive<S> for QHsm<M>
where
    S: QEventStore,
    M: QActiveObject<Payload = QPayload<S::Catalog>>,
{
    fn priority(&self) -> QPriority {
        self.machine().priority()
    }

    fn start(&mut self) -> QResult<()> {
        self.init()
    }

    fn dispatch(&mut self, evt: &QEvtFor<S>) -> QResult<()> {
        QHsm::dispatch(self, evt)
    }
}
