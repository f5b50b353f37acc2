//! Event queue for active objects

use heapless::Deque;
use qp_mem::QEvtRef;

use crate::{QError, QResult, MAX_QUEUE_DEPTH};

/// Bounded FIFO of event references.
///
/// Storage is sized for [`MAX_QUEUE_DEPTH`] so every active object's queue
/// has the same type; the capacity an object asked for is enforced at run
/// time. The payloads live in the event pools.
#[derive(Debug)]
pub struct QEventQueue {
    queue: Deque<QEvtRef, MAX_QUEUE_DEPTH>,
    capacity: usize,
    min_free: usize,
}

impl QEventQueue {
    /// Create a queue holding at most `capacity` events
    pub fn new(capacity: usize) -> QResult<Self> {
        if capacity == 0 || capacity > MAX_QUEUE_DEPTH {
            return Err(QError::InvalidSize);
        }
        Ok(Self {
            queue: Deque::new(),
            capacity,
            min_free: capacity,
        })
    }

    /// Append an event (FIFO)
    pub fn post(&mut self, evt: QEvtRef) -> QResult<()> {
        if self.is_full() {
            return Err(QError::QueueFull);
        }
        self.queue.push_back(evt).map_err(|_| QError::QueueFull)?;
        self.note_usage();
        Ok(())
    }

    /// Put an event at the head of the queue (LIFO)
    pub fn post_lifo(&mut self, evt: QEvtRef) -> QResult<()> {
        if self.is_full() {
            return Err(QError::QueueFull);
        }
        self.queue.push_front(evt).map_err(|_| QError::QueueFull)?;
        self.note_usage();
        Ok(())
    }

    pub fn get(&mut self) -> Option<QEvtRef> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fewest free slots ever observed, for sizing queues
    pub const fn min_free(&self) -> usize {
        self.min_free
    }

    fn note_usage(&mut self) {
        self.min_free = self.min_free.min(self.capacity - self.queue.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qp_core::QSignal;

    fn evt(sig: u16) -> QEvtRef {
        QEvtRef::signal_only(QSignal::new(sig))
    }

    #[test]
    fn test_event_queue_fifo() {
        let mut queue = QEventQueue::new(4).unwrap();
        assert!(queue.is_empty());

        queue.post(evt(10)).unwrap();
        queue.post(evt(20)).unwrap();
        queue.post(evt(30)).unwrap();
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.get().map(|e| e.signal()), Some(QSignal::new(10)));
        assert_eq!(queue.get().map(|e| e.signal()), Some(QSignal::new(20)));
        assert_eq!(queue.get().map(|e| e.signal()), Some(QSignal::new(30)));
        assert_eq!(queue.get(), None);
    }

    #[test]
    fn test_event_queue_lifo() {
        let mut queue = QEventQueue::new(4).unwrap();
        queue.post(evt(10)).unwrap();
        queue.post_lifo(evt(20)).unwrap();

        assert_eq!(queue.get().map(|e| e.signal()), Some(QSignal::new(20)));
        assert_eq!(queue.get().map(|e| e.signal()), Some(QSignal::new(10)));
    }

    #[test]
    fn test_capacity_is_enforced_below_storage_size() {
        let mut queue = QEventQueue::new(2).unwrap();
        assert!(queue.post(evt(10)).is_ok());
        assert!(queue.post(evt(20)).is_ok());
        assert!(queue.is_full());
        assert_eq!(queue.post(evt(30)), Err(QError::QueueFull));
        assert_eq!(queue.post_lifo(evt(30)), Err(QError::QueueFull));
        assert_eq!(queue.min_free(), 0);
    }

    #[test]
    fn test_capacity_bounds() {
        assert_eq!(QEventQueue::new(0).err(), Some(QError::InvalidSize));
        assert_eq!(
            QEventQueue::new(MAX_QUEUE_DEPTH + 1).err(),
            Some(QError::InvalidSize)
        );
        assert!(QEventQueue::new(MAX_QUEUE_DEPTH).is_ok());
    }
}
