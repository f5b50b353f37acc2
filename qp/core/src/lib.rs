#![no_std]
#![forbid(unsafe_code)]

//! Types shared by every layer of the active-object framework.
//!
//! Signals and events, handler return codes, priorities, the tick base and
//! [`QError`]. Nothing here allocates or depends on a target.

#[cfg(any(test, feature = "std"))]
extern crate std;

use core::fmt;

pub mod events;
pub mod states;
pub mod priorities;
pub mod time;

pub use events::*;
pub use states::*;
pub use priorities::*;
pub use time::*;

pub type QResult<T> = Result<T, QError>;

/// Failures reported by the framework layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QError {
    /// An event queue has no free slot
    QueueFull,
    /// Priority outside 1..=64, already taken, or with nothing registered
    InvalidPriority,
    /// A handler asked for a transition the engine cannot take
    InvalidTransition,
    /// The pool of the payload's size class has no free block
    OutOfMemory,
    /// A capacity or buffer length that cannot hold the request
    InvalidSize,
    /// Signal reserved or beyond the subscriber table
    InvalidSignal,
    /// Time-event table full, unknown handle, or a zero timeout
    TimerError,
    /// Dispatch before `init`
    NotStarted,
    InvalidArgument,
    /// Internal bookkeeping went out of sync
    Framework,
}

impl QError {
    pub const fn as_str(self) -> &'static str {
        match self {
            QError::QueueFull => "event queue full",
            QError::InvalidPriority => "invalid priority",
            QError::InvalidTransition => "invalid transition",
            QError::OutOfMemory => "event pool exhausted",
            QError::InvalidSize => "invalid size",
            QError::InvalidSignal => "invalid signal",
            QError::TimerError => "time event error",
            QError::NotStarted => "state machine not started",
            QError::InvalidArgument => "invalid argument",
            QError::Framework => "framework bookkeeping error",
        }
    }
}

impl fmt::Display for QError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for QError {}

#[cfg(feature = "defmt")]
impl defmt::Format for QError {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=str}", self.as_str());
    }
}

/// Halts on a violated framework invariant.
///
/// Capacity exhaustion and invalid parameters are programming errors with no
/// local recovery. The release profile aborts on panic, so the board's panic
/// handler resets the system.
#[cold]
#[track_caller]
pub fn q_fatal(err: QError, origin: &'static str) -> ! {
    log::error!("fatal error in {}: {}", origin, err);
    panic!("{}: {}", origin, err)
}
