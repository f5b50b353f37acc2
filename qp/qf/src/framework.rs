//! The framework instance shared by the scheduler, active objects and ISRs

use core::cell::RefCell;

use critical_section::Mutex;
use qp_mem::QEvtRef;

use crate::{
    q_fatal, QActive, QActiveRegistry, QEventStore, QEvtFor, QPayload, QPoolStats,
    QPriority, QPriorityMask, QResult, QSignal, QSubscriberTable, QTick, QTimeEvtId,
    QTimerWheel, SizeClass,
};

/// Event pools, queues, subscriptions and time events of one system.
///
/// Every table sits behind its own critical section, so `&QF` can be used
/// from thread and interrupt context alike. Nothing here is global: tests
/// build as many independent instances as they need.
pub struct QF<S: QEventStore> {
    store: S,
    active: Mutex<RefCell<QActiveRegistry>>,
    subscribers: Mutex<RefCell<QSubscriberTable>>,
    timers: Mutex<RefCell<QTimerWheel>>,
}

impl<S: QEventStore> QF<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            active: Mutex::new(RefCell::new(QActiveRegistry::new())),
            subscribers: Mutex::new(RefCell::new(QSubscriberTable::new())),
            timers: Mutex::new(RefCell::new(QTimerWheel::new())),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give `ao` a queue of `queue_capacity` events and run its initial
    /// transition. Events posted during the initial transition are queued.
    pub fn start(&self, ao: &mut dyn QActive<S>, queue_capacity: usize) -> QResult<()> {
        let prio = ao.priority();
        critical_section::with(|cs| {
            self.active
                .borrow_ref_mut(cs)
                .register(prio, queue_capacity)
        })?;
        log::info!("started active object at {} (queue {})", prio, queue_capacity);
        ao.start()
    }

    /// Post an event to one active object.
    ///
    /// Pool exhaustion, a full queue, or an unknown target halt the system.
    pub fn post(&self, target: QPriority, signal: QSignal, payload: QPayload<S::Catalog>) {
        if let Err(e) = self.try_post(target, signal, payload) {
            q_fatal(e, "QF::post");
        }
    }

    /// Post without halting on failure; the event is dropped on error
    pub fn try_post(
        &self,
        target: QPriority,
        signal: QSignal,
        payload: QPayload<S::Catalog>,
    ) -> QResult<()> {
        let evt = self.store.alloc(signal, payload)?;
        self.enqueue(target, evt, false)
    }

    /// Post to the front of the target's queue
    pub fn post_lifo(&self, target: QPriority, signal: QSignal, payload: QPayload<S::Catalog>) {
        let result = self
            .store
            .alloc(signal, payload)
            .and_then(|evt| self.enqueue(target, evt, true));
        if let Err(e) = result {
            q_fatal(e, "QF::post_lifo");
        }
    }

    /// Deliver one shared event to every subscriber of `signal`.
    pub fn publish(&self, signal: QSignal, payload: QPayload<S::Catalog>) {
        let subscribers = match self.subscribers(signal) {
            Ok(s) => s,
            Err(e) => q_fatal(e, "QF::publish"),
        };
        let evt = match self.store.alloc(signal, payload) {
            Ok(evt) => evt,
            Err(e) => q_fatal(e, "QF::publish"),
        };
        // Guard reference keeps the block alive while fanning out
        if let Err(e) = self.store.retain(evt) {
            q_fatal(e, "QF::publish");
        }
        for prio in subscribers.iter() {
            if let Err(e) = self.enqueue(prio, evt, false) {
                q_fatal(e, "QF::publish");
            }
        }
        log::trace!("published {} to {} subscribers", signal, subscribers.len());
        self.gc(evt);
    }

    pub fn subscribe(&self, priority: QPriority, signal: QSignal) -> QResult<()> {
        critical_section::with(|cs| self.subscribers.borrow_ref_mut(cs).subscribe(priority, signal))
    }

    pub fn unsubscribe(&self, priority: QPriority, signal: QSignal) -> QResult<()> {
        critical_section::with(|cs| {
            self.subscribers
                .borrow_ref_mut(cs)
                .unsubscribe(priority, signal)
        })
    }

    pub fn unsubscribe_all(&self, priority: QPriority) {
        critical_section::with(|cs| self.subscribers.borrow_ref_mut(cs).unsubscribe_all(priority))
    }

    pub fn subscribers(&self, signal: QSignal) -> QResult<QPriorityMask> {
        critical_section::with(|cs| self.subscribers.borrow_ref(cs).subscribers(signal))
    }

    /// New disarmed time event posting `signal` to `owner`
    pub fn time_event(&self, owner: QPriority, signal: QSignal) -> QResult<QTimeEvtId> {
        critical_section::with(|cs| self.timers.borrow_ref_mut(cs).add(owner, signal))
    }

    /// Arm a time event: first expiry after `ticks`, then every `interval`
    /// ticks (0 = one-shot)
    pub fn arm(&self, id: QTimeEvtId, ticks: u32, interval: u32) -> QResult<()> {
        critical_section::with(|cs| self.timers.borrow_ref_mut(cs).arm(id, ticks, interval))
    }

    pub fn disarm(&self, id: QTimeEvtId) -> QResult<bool> {
        critical_section::with(|cs| self.timers.borrow_ref_mut(cs).disarm(id))
    }

    pub fn is_armed(&self, id: QTimeEvtId) -> bool {
        critical_section::with(|cs| self.timers.borrow_ref(cs).is_armed(id))
    }

    /// Advance time by one tick; called from the system-tick interrupt
    pub fn tick(&self) {
        let expired = critical_section::with(|cs| self.timers.borrow_ref_mut(cs).tick());
        for (owner, signal) in expired {
            self.post(owner, signal, QPayload::None);
        }
    }

    pub fn now(&self) -> QTick {
        critical_section::with(|cs| self.timers.borrow_ref(cs).now())
    }

    /// Take the next event for the highest-priority ready active object
    pub fn next_ready(&self) -> Option<(QPriority, QEvtRef)> {
        critical_section::with(|cs| self.active.borrow_ref_mut(cs).next_ready())
    }

    pub fn has_ready(&self) -> bool {
        critical_section::with(|cs| !self.active.borrow_ref(cs).ready_set().is_empty())
    }

    pub fn resolve(&self, evt: QEvtRef) -> QResult<QEvtFor<S>> {
        self.store.resolve(evt)
    }

    /// Drop the reference held by a consumer of `evt`
    pub fn gc(&self, evt: QEvtRef) {
        if let Err(e) = self.store.release(evt) {
            q_fatal(e, "QF::gc");
        }
    }

    pub fn queue_len(&self, priority: QPriority) -> usize {
        critical_section::with(|cs| {
            self.active
                .borrow_ref(cs)
                .queue(priority)
                .map(|q| q.len())
                .unwrap_or(0)
        })
    }

    /// Fewest free slots the queue of `priority` ever had
    pub fn queue_min_free(&self, priority: QPriority) -> Option<usize> {
        critical_section::with(|cs| {
            self.active
                .borrow_ref(cs)
                .queue(priority)
                .map(|q| q.min_free())
        })
    }

    pub fn pool_stats(&self, class: SizeClass) -> QPoolStats {
        self.store.stats(class)
    }

    /// Queue `evt` for `target`, taking a reference for the queue.
    ///
    /// On failure the reference is dropped again, which frees an event no
    /// one else holds.
    fn enqueue(&self, target: QPriority, evt: QEvtRef, lifo: bool) -> QResult<()> {
        self.store.retain(evt)?;
        let queued =
            critical_section::with(|cs| self.active.borrow_ref_mut(cs).enqueue(target, evt, lifo));
        if let Err(e) = queued {
            let _ = self.store.release(evt);
            log::warn!("post of {} to {} failed: {}", evt.signal(), target, e);
            return Err(e);
        }
        Ok(())
    }
}

impl<S: QEventStore + Default> Default for QF<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

#[cfg(feature = "defmt")]
impl<S: QEventStore> defmt::Format for QF<S> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "QF{{now: {}}}", self.now());
    }
}

