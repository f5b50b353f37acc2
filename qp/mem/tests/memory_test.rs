//! Pool-set tests for qp-mem

use proptest::prelude::*;
use qp_core::{QError, QSignal};
use qp_mem::{QEventCatalog, QEventStore, QPayload, QPoolSet, QPoolStats, SizeClass};

#[derive(Debug, Clone, PartialEq)]
enum Small {
    Reading(i16),
}

#[derive(Debug, Clone, PartialEq)]
enum Medium {
    Snapshot { a: i32, b: i32, c: i32 },
}

#[derive(Debug, Clone, PartialEq)]
enum Large {
    Frame([u8; 64]),
}

struct Catalog;

impl QEventCatalog for Catalog {
    type Small = Small;
    type Medium = Medium;
    type Large = Large;
}

type Pools = QPoolSet<Catalog, 4, 2, 1>;

const SIG: QSignal = QSignal(10);

#[test]
fn test_pool_stats_remember_peak_usage() {
    let mut stats = QPoolStats::new(10);
    stats.on_alloc();
    stats.on_alloc();
    stats.on_release();
    assert_eq!(stats.in_use, 1);
    assert_eq!(stats.available(), 9);
    assert_eq!(stats.peak, 2);
    stats.on_release();
    stats.on_release();
    assert!(stats.is_idle());
}

#[test]
fn test_payload_lands_in_its_size_class() {
    let pools = Pools::new();
    let evt = pools
        .alloc(SIG, QPayload::Medium(Medium::Snapshot { a: 1, b: 2, c: 3 }))
        .unwrap();

    assert_eq!(evt.block().map(|b| b.class), Some(SizeClass::Medium));
    assert_eq!(pools.stats(SizeClass::Medium).in_use, 1);
    assert_eq!(pools.stats(SizeClass::Small).in_use, 0);
    assert!(pools.block_size(SizeClass::Large) >= 64);

    let resolved = pools.resolve(evt).unwrap();
    assert_eq!(resolved.signal(), SIG);
    assert_eq!(
        resolved.payload(),
        &QPayload::Medium(Medium::Snapshot { a: 1, b: 2, c: 3 })
    );
}

#[test]
fn test_signal_only_events_use_no_block() {
    let pools = Pools::new();
    let evt = pools.alloc(SIG, QPayload::None).unwrap();
    assert!(!evt.is_pooled());
    assert_eq!(pools.retain(evt), Ok(()));
    assert_eq!(pools.release(evt), Ok(false));
    assert_eq!(pools.resolve(evt).unwrap().payload(), &QPayload::None);
}

#[test]
fn test_exhausted_class_reports_out_of_memory() {
    let pools = Pools::new();
    pools.alloc(SIG, QPayload::Large(Large::Frame([0; 64]))).unwrap();
    assert_eq!(
        pools.alloc(SIG, QPayload::Large(Large::Frame([1; 64]))),
        Err(QError::OutOfMemory)
    );
    // Other classes are unaffected
    assert!(pools.alloc(SIG, QPayload::Small(Small::Reading(1))).is_ok());
}

#[test]
fn test_released_event_cannot_be_resolved() {
    let pools = Pools::new();
    let evt = pools.alloc(SIG, QPayload::Small(Small::Reading(5))).unwrap();
    pools.retain(evt).unwrap();
    assert!(pools.release(evt).unwrap());
    assert_eq!(pools.resolve(evt), Err(QError::InvalidSize));
}

proptest! {
    /// However many consumers share an event, it returns to the pool exactly
    /// when the last one lets go.
    #[test]
    fn prop_block_freed_after_last_release(consumers in 1u8..8) {
        let pools = Pools::new();
        let evt = pools.alloc(SIG, QPayload::Small(Small::Reading(-3))).unwrap();
        for _ in 0..consumers {
            pools.retain(evt).unwrap();
        }
        prop_assert_eq!(pools.ref_count(evt), consumers);
        for remaining in (0..consumers).rev() {
            let freed = pools.release(evt).unwrap();
            prop_assert_eq!(freed, remaining == 0);
        }
        prop_assert!(pools.stats(SizeClass::Small).is_idle());
    }
}
