#![no_std]
#![forbid(unsafe_code)]

//! # QP Event Processor (QEP)
//!
//! Hierarchical state machine engine implementing UML statecharts:
//! - entry and exit actions, run exactly once per state left or entered
//! - transitions resolved through the least common ancestor
//! - nested initial transitions cascading into the deepest initial leaf
//! - events bubbling from the current leaf to its ancestors
//!
//! States are plain identifiers (usually a fieldless enum). A machine
//! supplies one handler that matches on `(state, signal)` and a parent link
//! per state. The parent link is read whenever the engine needs it, so a
//! generic state can be re-parented at run time by the data it carries.

#[cfg(test)]
extern crate std;

use core::fmt;

use qp_core::{QEvt, QStateReturn};

pub mod hsm;
pub mod transition;

pub use hsm::*;
pub use transition::*;


/// Maximum nesting depth for hierarchical states
pub const MAX_STATE_DEPTH: usize = 8;

/// A hierarchical state machine: state tree plus handlers.
pub trait QStateMachine {
    /// State identifier
    type State: Copy + PartialEq + fmt::Debug;
    /// Event payload delivered to handlers
    type Payload: Default;

    /// Top-most initial transition. Runs the initial actions and names the
    /// first state to enter.
    fn initial(&mut self) -> Self::State;

    /// Parent of `state`, or `None` for a state directly below the root.
    fn superstate(&self, state: Self::State) -> Option<Self::State>;

    /// Handle `evt` in `state`.
    ///
    /// ENTRY, EXIT and INIT are delivered to one state only and never
    /// bubble. Answer INIT with [`QStateReturn::Initial`] to descend into a
    /// nested state.
    fn handle(
        &mut self,
        state: Self::State,
        evt: &QEvt<Self::Payload>,
    ) -> QStateReturn<Self::State>;
}
