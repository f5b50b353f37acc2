//! Active-object priorities and priority sets

use core::fmt;
use crate::{QError, QResult};

/// Scheduling priority of an active object; higher runs first.
///
/// Priorities are unique per active object, so a priority doubles as the
/// object's address when posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QPriority(u8);

impl QPriority {
    /// Lowest priority usable by an active object
    pub const MIN: QPriority = QPriority(1);

    /// Highest priority representable in a [`QPriorityMask`]
    pub const MAX: QPriority = QPriority(QPriorityMask::CAPACITY);

    /// Reserved for the idle loop
    pub const IDLE: QPriority = QPriority(0);

    /// Create a validated priority
    pub fn new(priority: u8) -> QResult<Self> {
        if priority == 0 || priority > Self::MAX.0 {
            Err(QError::InvalidPriority)
        } else {
            Ok(QPriority(priority))
        }
    }

    /// Create priority without validation, for constants
    pub const fn new_unchecked(priority: u8) -> Self {
        QPriority(priority)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 > 0 && self.0 <= Self::MAX.0
    }

    /// Zero-based slot for priority-indexed tables
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for QPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Priority({})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for QPriority {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Priority({})", self.0);
    }
}

/// Set of priorities, one bit each.
///
/// Used both as the scheduler's ready set and as a subscriber list per
/// published signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QPriorityMask(u64);

impl QPriorityMask {
    /// Number of priorities a mask can hold
    pub const CAPACITY: u8 = 64;

    pub const EMPTY: Self = Self(0);

    pub const fn new() -> Self {
        Self::EMPTY
    }

    pub fn set(&mut self, priority: QPriority) {
        if priority.is_valid() {
            self.0 |= 1u64 << priority.index();
        }
    }

    pub fn clear(&mut self, priority: QPriority) {
        if priority.is_valid() {
            self.0 &= !(1u64 << priority.index());
        }
    }

    pub const fn is_set(&self, priority: QPriority) -> bool {
        priority.is_valid() && (self.0 & (1u64 << priority.index())) != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn len(&self) -> u32 {
        self.0.count_ones()
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// Highest priority in the set
    pub fn highest_priority(&self) -> Option<QPriority> {
        if self.is_empty() {
            None
        } else {
            let msb = 63 - self.0.leading_zeros();
            Some(QPriority((msb + 1) as u8))
        }
    }

    /// Lowest priority in the set
    pub fn lowest_priority(&self) -> Option<QPriority> {
        if self.is_empty() {
            None
        } else {
            Some(QPriority((self.0.trailing_zeros() + 1) as u8))
        }
    }

    /// Members from highest to lowest priority
    pub fn iter(&self) -> QPriorityIter {
        QPriorityIter { remaining: *self }
    }
}

impl IntoIterator for QPriorityMask {
    type Item = QPriority;
    type IntoIter = QPriorityIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`QPriorityMask`], highest priority first
#[derive(Debug, Clone)]
pub struct QPriorityIter {
    remaining: QPriorityMask,
}

impl Iterator for QPriorityIter {
    type Item = QPriority;

    fn next(&mut self) -> Option<QPriority> {
        let p = self.remaining.highest_priority()?;
        self.remaining.clear(p);
        Some(p)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for QPriorityMask {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "PriorityMask({=u64:b})", self.0);
    }
}

/// Compile-time priority constant
#[macro_export]
macro_rules! priority {
    ($value:literal) => {
        $crate::QPriority::new_unchecked($value)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_range() {
        assert!(QPriority::new(0).is_err());
        assert!(QPriority::new(1).is_ok());
        assert!(QPriority::new(64).is_ok());
        assert!(QPriority::new(65).is_err());
    }

    #[test]
    fn test_priority_mask() {
        let mut mask = QPriorityMask::new();
        assert!(mask.is_empty());

        let p1 = QPriority::new(1).unwrap();
        let p5 = QPriority::new(5).unwrap();
        let p64 = QPriority::new(64).unwrap();

        mask.set(p1);
        mask.set(p5);
        mask.set(p64);

        assert!(mask.is_set(p1));
        assert!(mask.is_set(p64));
        assert!(!mask.is_set(QPriority::new(3).unwrap()));
        assert_eq!(mask.len(), 3);

        assert_eq!(mask.highest_priority(), Some(p64));
        assert_eq!(mask.lowest_priority(), Some(p1));
    }

    #[test]
    fn test_mask_iterates_highest_first() {
        let mut mask = QPriorityMask::new();
        for p in [3u8, 9, 1, 7] {
            mask.set(QPriority::new(p).unwrap());
        }
        let order: std::vec::Vec<u8> = mask.iter().map(|p| p.raw()).collect();
        assert_eq!(order.as_slice(), &[9, 7, 3, 1]);
    }
}
