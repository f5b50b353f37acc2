//! Time events: one-shot and periodic timeouts delivered as signals.

use heapless::Vec;

use crate::{QError, QPriority, QResult, QSignal, QTick, QCountdown, MAX_TIME_EVENTS};

/// Handle to an entry of the time-event table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QTimeEvtId(u8);

impl QTimeEvtId {
    pub const fn raw(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct QTimeEvt {
    owner: QPriority,
    signal: QSignal,
    ctr: QCountdown,
    interval: u32,
}

/// Expired time events of one tick: owner and signal to post
pub type QExpired = Vec<(QPriority, QSignal), MAX_TIME_EVENTS>;

/// Table of time events, advanced once per system tick.
#[derive(Debug)]
pub struct QTimerWheel {
    events: Vec<QTimeEvt, MAX_TIME_EVENTS>,
    now: QTick,
}

impl QTimerWheel {
    pub const fn new() -> Self {
        Self {
            events: Vec::new(),
            now: QTick::ZERO,
        }
    }

    /// Add a disarmed time event that will post `signal` to `owner`
    pub fn add(&mut self, owner: QPriority, signal: QSignal) -> QResult<QTimeEvtId> {
        let id = QTimeEvtId(self.events.len() as u8);
        self.events
            .push(QTimeEvt {
                owner,
                signal,
                ctr: QCountdown::DISARMED,
                interval: 0,
            })
            .map_err(|_| QError::TimerError)?;
        Ok(id)
    }

    /// Fire after `ticks`, then every `interval` ticks (0 = one-shot).
    /// Re-arming an armed event restarts it.
    pub fn arm(&mut self, id: QTimeEvtId, ticks: u32, interval: u32) -> QResult<()> {
        if ticks == 0 {
            return Err(QError::TimerError);
        }
        let evt = self.entry(id)?;
        evt.ctr = QCountdown::start(ticks);
        evt.interval = interval;
        Ok(())
    }

    /// Stop a time event; false if it was not armed
    pub fn disarm(&mut self, id: QTimeEvtId) -> QResult<bool> {
        let evt = self.entry(id)?;
        let was_armed = evt.ctr.is_running();
        evt.ctr = QCountdown::DISARMED;
        evt.interval = 0;
        Ok(was_armed)
    }

    pub fn is_armed(&self, id: QTimeEvtId) -> bool {
        self.events
            .get(id.0 as usize)
            .map(|e| e.ctr.is_running())
            .unwrap_or(false)
    }

    pub fn now(&self) -> QTick {
        self.now
    }

    /// Advance one tick and collect the events that expired on it
    pub fn tick(&mut self) -> QExpired {
        self.now.increment();
        let mut expired = Vec::new();
        for evt in self.events.iter_mut() {
            if evt.ctr.step() {
                // Capacity equals the table size
                let _ = expired.push((evt.owner, evt.signal));
                if evt.interval > 0 {
                    evt.ctr = QCountdown::start(evt.interval);
                }
            }
        }
        expired
    }

    fn entry(&mut self, id: QTimeEvtId) -> QResult<&mut QTimeEvt> {
        self.events.get_mut(id.0 as usize).ok_or(QError::TimerError)
    }
}

impl Default for QTimerWheel {
    fn default() -> Self {
        Self::new()
    }
}
