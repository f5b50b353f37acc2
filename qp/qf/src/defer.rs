//! Deferred-event queues

use heapless::Deque;

use crate::{q_fatal, QError, QEventCatalog, QEventStore, QEvt, QF, QPayload, QPriority};

/// Bounded FIFO of events an active object set aside to handle later.
///
/// Events are stored by value, so a deferred event holds no pool block.
/// Overflow is a provisioning error and halts the system.
pub struct QDeferQueue<C: QEventCatalog, const N: usize> {
    queue: Deque<QEvt<QPayload<C>>, N>,
}

impl<C: QEventCatalog, const N: usize> QDeferQueue<C, N> {
    pub const fn new() -> Self {
        Self { queue: Deque::new() }
    }

    /// Set `evt` aside; fatal when the queue is full
    pub fn defer(&mut self, evt: &QEvt<QPayload<C>>) {
        if self.queue.push_back(evt.clone()).is_err() {
            q_fatal(QError::QueueFull, "QDeferQueue::defer");
        }
        log::trace!("deferred {} ({} waiting)", evt.signal(), self.queue.len());
    }

    /// Re-post the oldest deferred event to the front of `me`'s queue.
    ///
    /// Returns false when nothing was deferred.
    pub fn recall<S>(&mut self, qf: &QF<S>, me: QPriority) -> bool
    where
        S: QEventStore<Catalog = C>,
    {
        match self.queue.pop_front() {
            Some(evt) => {
                let signal = evt.signal();
                qf.post_lifo(me, signal, evt.into_payload());
                log::trace!("recalled {} ({} waiting)", signal, self.queue.len());
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Drop every deferred event
    pub fn flush(&mut self) -> usize {
        let n = self.queue.len();
        self.queue.clear();
        n
    }
}

impl<C: QEventCatalog, const N: usize> Default for QDeferQueue<C, N> {
    fn default() -> Self {
        Self::new()
    }
}
