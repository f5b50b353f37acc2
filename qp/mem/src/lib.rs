#![no_std]
#![forbid(unsafe_code)]

//! Event storage for the framework.
//!
//! A [`QEventPool`] holds a fixed array of blocks of one payload type with a
//! LIFO free list and a reference count per block, so allocation and release
//! are O(1) and never touch a heap. [`QPoolSet`] groups three of them, one per
//! [`SizeClass`].

#[cfg(test)]
extern crate std;

pub mod pools;
pub mod events;

pub use pools::*;
pub use events::*;

/// Block accounting of one pool, kept up to date by the pool itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QPoolStats {
    pub capacity: usize,
    pub in_use: usize,
    /// Highest `in_use` seen, for sizing the pool
    pub peak: usize,
}

impl QPoolStats {
    pub const fn new(capacity: usize) -> Self {
        Self { capacity, in_use: 0, peak: 0 }
    }

    pub fn on_alloc(&mut self) {
        self.in_use += 1;
        if self.in_use > self.peak {
            self.peak = self.in_use;
        }
    }

    pub fn on_release(&mut self) {
        self.in_use = self.in_use.saturating_sub(1);
    }

    pub const fn available(&self) -> usize {
        self.capacity - self.in_use
    }

    pub const fn is_exhausted(&self) -> bool {
        self.in_use == self.capacity
    }

    /// Every block is back on the free list
    pub const fn is_idle(&self) -> bool {
        self.in_use == 0
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for QPoolStats {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}/{} in use (peak {})", self.in_use, self.capacity, self.peak);
    }
}
