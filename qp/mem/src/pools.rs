use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Vec;
use qp_core::{QError, QResult};

use crate::QPoolStats;

struct PoolInner<T, const N: usize> {
    blocks: [Option<T>; N],
    ref_counts: [u8; N],
    free: Vec<u8, N>,
    stats: QPoolStats,
}

/// Fixed pool of `N` event blocks holding payloads of type `T`.
///
/// A freshly allocated block has a reference count of zero; every queue
/// that takes the event retains it, and every consumer releases it. The
/// block returns to the free list when the count drops back to zero.
/// All operations run inside a critical section, so ISRs and the scheduler
/// may share one pool.
pub struct QEventPool<T, const N: usize> {
    inner: Mutex<RefCell<PoolInner<T, N>>>,
}

impl<T, const N: usize> QEventPool<T, N> {
    const INDEXABLE: () = assert!(N > 0 && N <= 256, "pool block index must fit in u8");

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::INDEXABLE;
        let mut free = Vec::new();
        // Lowest index on top of the stack so allocation order is predictable
        for i in (0..N).rev() {
            let _ = free.push(i as u8);
        }
        Self {
            inner: Mutex::new(RefCell::new(PoolInner {
                blocks: core::array::from_fn(|_| None),
                ref_counts: [0; N],
                free,
                stats: QPoolStats::new(N),
            })),
        }
    }

    /// Store `value` in a free block and return the block index
    pub fn alloc(&self, value: T) -> QResult<u8> {
        critical_section::with(|cs| {
            let mut pool = self.inner.borrow_ref_mut(cs);
            let Some(index) = pool.free.pop() else {
                log::warn!("event pool exhausted ({} blocks)", N);
                return Err(QError::OutOfMemory);
            };
            pool.blocks[index as usize] = Some(value);
            pool.ref_counts[index as usize] = 0;
            pool.stats.on_alloc();
            Ok(index)
        })
    }

    /// Add a reference to an allocated block, returning the new count
    pub fn retain(&self, index: u8) -> QResult<u8> {
        critical_section::with(|cs| {
            let mut pool = self.inner.borrow_ref_mut(cs);
            let i = Self::live_index(&pool, index)?;
            let count = pool.ref_counts[i].checked_add(1).ok_or(QError::Framework)?;
            pool.ref_counts[i] = count;
            Ok(count)
        })
    }

    /// Drop a reference; returns true when the block went back to the free list
    pub fn release(&self, index: u8) -> QResult<bool> {
        critical_section::with(|cs| {
            let mut pool = self.inner.borrow_ref_mut(cs);
            let i = Self::live_index(&pool, index)?;
            let count = pool.ref_counts[i].saturating_sub(1);
            pool.ref_counts[i] = count;
            if count > 0 {
                return Ok(false);
            }
            pool.blocks[i] = None;
            pool.free.push(index).map_err(|_| QError::Framework)?;
            pool.stats.on_release();
            Ok(true)
        })
    }

    pub fn ref_count(&self, index: u8) -> u8 {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref(cs)
                .ref_counts
                .get(index as usize)
                .copied()
                .unwrap_or(0)
        })
    }

    pub fn is_allocated(&self, index: u8) -> bool {
        critical_section::with(|cs| {
            matches!(self.inner.borrow_ref(cs).blocks.get(index as usize), Some(Some(_)))
        })
    }

    pub fn stats(&self) -> QPoolStats {
        critical_section::with(|cs| self.inner.borrow_ref(cs).stats)
    }

    pub const fn block_size(&self) -> usize {
        core::mem::size_of::<T>()
    }

    fn live_index(pool: &PoolInner<T, N>, index: u8) -> QResult<usize> {
        match pool.blocks.get(index as usize) {
            Some(Some(_)) => Ok(index as usize),
            _ => {
                log::warn!("event pool: block {} is not allocated", index);
                Err(QError::InvalidSize)
            }
        }
    }
}

impl<T: Clone, const N: usize> QEventPool<T, N> {
    /// Copy of the payload held by an allocated block
    pub fn get(&self, index: u8) -> Option<T> {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref(cs)
                .blocks
                .get(index as usize)
                .and_then(|b| b.clone())
        })
    }
}

impl<T, const N: usize> Default for QEventPool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_until_exhausted() {
        let pool: QEventPool<u32, 3> = QEventPool::new();
        assert_eq!(pool.alloc(10), Ok(0));
        assert_eq!(pool.alloc(11), Ok(1));
        assert_eq!(pool.alloc(12), Ok(2));
        assert_eq!(pool.alloc(13), Err(QError::OutOfMemory));

        let stats = pool.stats();
        assert!(stats.is_exhausted());
        assert_eq!(stats.available(), 0);
        assert_eq!(stats.peak, 3);
    }

    #[test]
    fn test_block_freed_when_last_reference_drops() {
        let pool: QEventPool<u32, 2> = QEventPool::new();
        let idx = pool.alloc(7).unwrap();
        assert_eq!(pool.retain(idx), Ok(1));
        assert_eq!(pool.retain(idx), Ok(2));

        assert_eq!(pool.release(idx), Ok(false));
        assert_eq!(pool.get(idx), Some(7));
        assert_eq!(pool.release(idx), Ok(true));

        assert!(!pool.is_allocated(idx));
        assert_eq!(pool.get(idx), None);
        assert!(pool.stats().is_idle());
    }

    #[test]
    fn test_unreferenced_block_is_freed_on_first_release() {
        let pool: QEventPool<u8, 1> = QEventPool::new();
        let idx = pool.alloc(1).unwrap();
        assert_eq!(pool.ref_count(idx), 0);
        assert_eq!(pool.release(idx), Ok(true));
        assert_eq!(pool.alloc(2), Ok(idx));
    }

    #[test]
    fn test_freed_block_is_reused_lifo() {
        let pool: QEventPool<u8, 4> = QEventPool::new();
        let a = pool.alloc(1).unwrap();
        let b = pool.alloc(2).unwrap();
        pool.release(a).unwrap();
        assert_eq!(pool.alloc(3), Ok(a));
        assert_ne!(a, b);
    }

    #[test]
    fn test_stale_index_is_rejected() {
        let pool: QEventPool<u8, 2> = QEventPool::new();
        assert_eq!(pool.retain(0), Err(QError::InvalidSize));
        assert_eq!(pool.release(1), Err(QError::InvalidSize));
        assert_eq!(pool.release(9), Err(QError::InvalidSize));
    }
}
