//! Priority-indexed tables: event queues with the ready set, and the
//! publish/subscribe table.

use qp_mem::QEvtRef;

use crate::{
    QError, QEventQueue, QPriority, QPriorityMask, QResult, QSignal, MAX_ACTIVE, MAX_PUB_SIGNALS,
};

/// Event queues of all started active objects, indexed by priority.
pub struct QActiveRegistry {
    queues: [Option<QEventQueue>; MAX_ACTIVE],
    ready: QPriorityMask,
}

impl QActiveRegistry {
    pub fn new() -> Self {
        Self {
            queues: core::array::from_fn(|_| None),
            ready: QPriorityMask::new(),
        }
    }

    /// Create the queue of the active object at `priority`.
    ///
    /// Each priority belongs to exactly one active object.
    pub fn register(&mut self, priority: QPriority, capacity: usize) -> QResult<()> {
        let slot = self.slot(priority)?;
        if slot.is_some() {
            return Err(QError::InvalidPriority);
        }
        *slot = Some(QEventQueue::new(capacity)?);
        Ok(())
    }

    pub fn is_registered(&self, priority: QPriority) -> bool {
        self.queue(priority).is_some()
    }

    pub fn enqueue(&mut self, priority: QPriority, evt: QEvtRef, lifo: bool) -> QResult<()> {
        let queue = self
            .slot(priority)?
            .as_mut()
            .ok_or(QError::InvalidPriority)?;
        if lifo {
            queue.post_lifo(evt)?;
        } else {
            queue.post(evt)?;
        }
        self.ready.set(priority);
        Ok(())
    }

    /// Take the oldest event of the highest-priority non-empty queue
    pub fn next_ready(&mut self) -> Option<(QPriority, QEvtRef)> {
        let priority = self.ready.highest_priority()?;
        let queue = self.queues.get_mut(priority.index())?.as_mut()?;
        let evt = queue.get();
        if queue.is_empty() {
            self.ready.clear(priority);
        }
        evt.map(|e| (priority, e))
    }

    pub fn ready_set(&self) -> QPriorityMask {
        self.ready
    }

    pub fn queue(&self, priority: QPriority) -> Option<&QEventQueue> {
        if !priority.is_valid() {
            return None;
        }
        self.queues.get(priority.index()).and_then(|q| q.as_ref())
    }

    fn slot(&mut self, priority: QPriority) -> QResult<&mut Option<QEventQueue>> {
        if !priority.is_valid() {
            return Err(QError::InvalidPriority);
        }
        self.queues
            .get_mut(priority.index())
            .ok_or(QError::InvalidPriority)
    }
}

impl Default for QActiveRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber set per published signal.
#[derive(Debug, Clone)]
pub struct QSubscriberTable {
    lists: [QPriorityMask; MAX_PUB_SIGNALS],
}

impl QSubscriberTable {
    pub const fn new() -> Self {
        Self {
            lists: [QPriorityMask::EMPTY; MAX_PUB_SIGNALS],
        }
    }

    pub fn subscribe(&mut self, priority: QPriority, signal: QSignal) -> QResult<()> {
        if !priority.is_valid() {
            return Err(QError::InvalidPriority);
        }
        self.list_mut(signal)?.set(priority);
        Ok(())
    }

    pub fn unsubscribe(&mut self, priority: QPriority, signal: QSignal) -> QResult<()> {
        self.list_mut(signal)?.clear(priority);
        Ok(())
    }

    pub fn unsubscribe_all(&mut self, priority: QPriority) {
        for list in self.lists.iter_mut() {
            list.clear(priority);
        }
    }

    pub fn subscribers(&self, signal: QSignal) -> QResult<QPriorityMask> {
        Self::check(signal)?;
        Ok(self.lists[signal.raw() as usize])
    }

    fn list_mut(&mut self, signal: QSignal) -> QResult<&mut QPriorityMask> {
        Self::check(signal)?;
        Ok(&mut self.lists[signal.raw() as usize])
    }

    fn check(signal: QSignal) -> QResult<()> {
        if signal.is_reserved() || signal.raw() as usize >= MAX_PUB_SIGNALS {
            Err(QError::InvalidSignal)
        } else {
            Ok(())
        }
    }
}

impl Default for QSubscriberTable {
    fn default() -> Self {
        Self::new()
    }
}
