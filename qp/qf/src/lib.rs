#![no_std]
#![forbid(unsafe_code)]

//! # QP Framework (QF)
//!
//! The framework layer: event queues per active object, a static
//! publish/subscribe table, time events, and deferred-event queues.
//!
//! A [`QF`] instance owns all of this behind critical sections, so the
//! scheduler, the active objects it dispatches to, and interrupt handlers
//! all share it through a plain `&QF`. Active objects only ever talk to
//! each other by posting or publishing through it.

#[cfg(test)]
extern crate std;

pub mod active;
pub mod defer;
pub mod framework;
pub mod queue;
pub mod registry;
pub mod time;

pub use qp_core::*;
pub use qp_mem::{QEventCatalog, QEventStore, QEvtRef, QPayload, QPoolSet, QPoolStats, SizeClass};
pub use qp_qep::{QHsm, QStateMachine, MAX_STATE_DEPTH};
pub use active::*;
pub use defer::*;
pub use framework::*;
pub use queue::*;
pub use registry::*;
pub use time::*;

/// Maximum number of active objects in the system
pub const MAX_ACTIVE: usize = 32;

/// Largest event queue an active object may request
pub const MAX_QUEUE_DEPTH: usize = 16;

/// Published signals must be below this value
pub const MAX_PUB_SIGNALS: usize = 32;

/// Capacity of the time-event table
pub const MAX_TIME_EVENTS: usize = 16;
