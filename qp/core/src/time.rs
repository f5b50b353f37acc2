//! Framework time base.
//!
//! The tick ISR runs at 1 kHz, so a tick and a millisecond are the same unit
//! throughout the framework. Durations are carried as ticks and appear as
//! plain millisecond numbers in configuration files.

use core::fmt;

/// Tick ISR rate
pub const TICK_RATE_HZ: u32 = 1_000;

/// Remaining ticks of an armed time event. Zero means disarmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QCountdown(u32);

impl QCountdown {
    pub const DISARMED: Self = Self(0);

    pub const fn start(ticks: u32) -> Self {
        Self(ticks)
    }

    pub const fn remaining(self) -> u32 {
        self.0
    }

    pub const fn is_running(self) -> bool {
        self.0 != 0
    }

    /// One tick passes. Returns true on the tick that reaches zero.
    pub fn step(&mut self) -> bool {
        match self.0 {
            0 => false,
            1 => {
                self.0 = 0;
                true
            }
            n => {
                self.0 = n - 1;
                false
            }
        }
    }
}

/// Ticks counted since `QF::new`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct QTick(u64);

impl QTick {
    pub const ZERO: Self = Self(0);

    pub const fn new(ticks: u64) -> Self {
        Self(ticks)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl fmt::Display for QTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t+{}ms", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for QTick {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "t+{}ms", self.0);
    }
}

/// Timer period or timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct QDuration(u32);

impl QDuration {
    pub const fn from_millis(millis: u32) -> Self {
        Self(millis)
    }

    pub const fn from_secs(secs: u32) -> Self {
        Self(secs.saturating_mul(TICK_RATE_HZ))
    }

    pub const fn ticks(self) -> u32 {
        self.0
    }

    pub const fn as_millis(self) -> u32 {
        self.0
    }
}

impl fmt::Display for QDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= TICK_RATE_HZ && self.0 % TICK_RATE_HZ == 0 {
            write!(f, "{}s", self.0 / TICK_RATE_HZ)
        } else {
            write!(f, "{}ms", self.0)
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for QDuration {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}ms", self.0);
    }
}
