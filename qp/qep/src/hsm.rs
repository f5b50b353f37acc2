//! Hierarchical state machine instance: current leaf plus dispatch

use heapless::Vec;
use qp_core::{QError, QEvt, QResult, QSignal, QStateReturn};

use crate::{QStateMachine, QTransition, MAX_STATE_DEPTH};

/// Chain of states from some state up to the root, deepest first
pub(crate) type StatePath<S> = Vec<S, MAX_STATE_DEPTH>;

/// A state machine together with its current leaf state.
pub struct QHsm<M: QStateMachine> {
    machine: M,
    state: Option<M::State>,
}

impl<M: QStateMachine> QHsm<M> {
    /// Wrap a machine. Nothing runs until [`QHsm::init`].
    pub const fn new(machine: M) -> Self {
        Self { machine, state: None }
    }

    /// Current leaf state, `None` before [`QHsm::init`]
    pub fn state(&self) -> Option<M::State> {
        self.state
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    pub fn is_started(&self) -> bool {
        self.state.is_some()
    }

    /// True when `state` is the current leaf or one of its ancestors
    pub fn is_in(&self, state: M::State) -> bool {
        let mut s = self.state;
        while let Some(cur) = s {
            if cur == state {
                return true;
            }
            s = self.machine.superstate(cur);
        }
        false
    }

    /// Run the top-most initial transition.
    ///
    /// Enters every state from the root down to the initial target, then
    /// follows nested initial transitions to a leaf.
    pub fn init(&mut self) -> QResult<()> {
        let target = self.machine.initial();
        let path = path_to_root(&self.machine, target)?;
        for s in path.iter().rev() {
            self.trigger(*s, QSignal::ENTRY);
        }
        self.state = Some(target);
        log::trace!("init -> {:?}", target);
        self.drill_into(target)
    }

    /// Process one event to completion.
    ///
    /// The event goes to the current leaf first and bubbles up the parent
    /// chain until a state handles it or takes a transition. Events no state
    /// wants are consumed silently at the root.
    pub fn dispatch(&mut self, evt: &QEvt<M::Payload>) -> QResult<()> {
        let leaf = self.state.ok_or(QError::NotStarted)?;
        let mut s = leaf;
        loop {
            match self.machine.handle(s, evt) {
                QStateReturn::Handled => return Ok(()),
                QStateReturn::Super | QStateReturn::Unhandled => {
                    match self.machine.superstate(s) {
                        Some(parent) => s = parent,
                        None => {
                            log::trace!("{} dropped in {:?}", evt.signal(), leaf);
                            return Ok(());
                        }
                    }
                }
                QStateReturn::Transition(target) => {
                    let plan = QTransition::plan(&self.machine, leaf, s, target)?;
                    log::trace!("{:?} -> {:?} on {}", s, target, evt.signal());
                    plan.execute(self);
                    return self.drill_into(target);
                }
                QStateReturn::Initial(_) => return Err(QError::InvalidTransition),
            }
        }
    }

    /// Deliver a reserved signal to exactly one state
    pub(crate) fn trigger(&mut self, state: M::State, signal: QSignal) -> QStateReturn<M::State> {
        self.machine.handle(state, &QEvt::signal_only(signal))
    }

    pub(crate) fn set_state(&mut self, state: M::State) {
        self.state = Some(state);
    }

    /// Nested initial transitions, starting at `state`
    fn drill_into(&mut self, mut state: M::State) -> QResult<()> {
        loop {
            let target = match self.trigger(state, QSignal::INIT) {
                QStateReturn::Initial(t) | QStateReturn::Transition(t) => t,
                _ => return Ok(()),
            };
            // Entry path from just below `state` down to `target`
            let mut path: StatePath<M::State> = Vec::new();
            let mut s = target;
            while s != state {
                path.push(s).map_err(|_| QError::InvalidTransition)?;
                s = self
                    .machine
                    .superstate(s)
                    .ok_or(QError::InvalidTransition)?;
            }
            if path.is_empty() {
                return Err(QError::InvalidTransition);
            }
            for s in path.iter().rev() {
                self.trigger(*s, QSignal::ENTRY);
            }
            self.state = Some(target);
            state = target;
        }
    }
}

/// `state` followed by each of its ancestors
pub(crate) fn path_to_root<M: QStateMachine>(
    machine: &M,
    state: M::State,
) -> QResult<StatePath<M::State>> {
    let mut path = Vec::new();
    let mut s = Some(state);
    while let Some(cur) = s {
        path.push(cur).map_err(|_| QError::InvalidTransition)?;
        s = machine.superstate(cur);
    }
    Ok(path)
}

#[cfg(feature = "defmt")]
impl<M: QStateMachine> defmt::Format for QHsm<M> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "QHsm(started: {})", self.state.is_some());
    }
}
