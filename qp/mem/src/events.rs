//! Pooled events: size classes, payload catalogs, and event references

use core::fmt;

use qp_core::{QError, QEvt, QResult, QSignal};

use crate::{QEventPool, QPoolStats};

/// Pool a payload is carved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

#[cfg(feature = "defmt")]
impl defmt::Format for SizeClass {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            SizeClass::Small => defmt::write!(fmt, "Small"),
            SizeClass::Medium => defmt::write!(fmt, "Medium"),
            SizeClass::Large => defmt::write!(fmt, "Large"),
        }
    }
}

/// An application's payload types, one tagged enum per size class.
///
/// Each pool's block is as large as the largest variant of its enum, so
/// grouping payloads by size keeps small readings out of the large blocks.
pub trait QEventCatalog: 'static {
    type Small: Clone + fmt::Debug + Send;
    type Medium: Clone + fmt::Debug + Send;
    type Large: Clone + fmt::Debug + Send;
}

/// Payload of an event, tagged with its size class.
pub enum QPayload<C: QEventCatalog> {
    /// Signal-only event; needs no pool block
    None,
    Small(C::Small),
    Medium(C::Medium),
    Large(C::Large),
}

impl<C: QEventCatalog> QPayload<C> {
    pub fn size_class(&self) -> Option<SizeClass> {
        match self {
            QPayload::None => None,
            QPayload::Small(_) => Some(SizeClass::Small),
            QPayload::Medium(_) => Some(SizeClass::Medium),
            QPayload::Large(_) => Some(SizeClass::Large),
        }
    }

    pub fn small(&self) -> Option<&C::Small> {
        match self {
            QPayload::Small(p) => Some(p),
            _ => None,
        }
    }

    pub fn medium(&self) -> Option<&C::Medium> {
        match self {
            QPayload::Medium(p) => Some(p),
            _ => None,
        }
    }

    pub fn large(&self) -> Option<&C::Large> {
        match self {
            QPayload::Large(p) => Some(p),
            _ => None,
        }
    }
}

impl<C: QEventCatalog> Default for QPayload<C> {
    fn default() -> Self {
        QPayload::None
    }
}

impl<C: QEventCatalog> Clone for QPayload<C> {
    fn clone(&self) -> Self {
        match self {
            QPayload::None => QPayload::None,
            QPayload::Small(p) => QPayload::Small(p.clone()),
            QPayload::Medium(p) => QPayload::Medium(p.clone()),
            QPayload::Large(p) => QPayload::Large(p.clone()),
        }
    }
}

impl<C: QEventCatalog> fmt::Debug for QPayload<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QPayload::None => f.write_str("None"),
            QPayload::Small(p) => f.debug_tuple("Small").field(p).finish(),
            QPayload::Medium(p) => f.debug_tuple("Medium").field(p).finish(),
            QPayload::Large(p) => f.debug_tuple("Large").field(p).finish(),
        }
    }
}

impl<C> PartialEq for QPayload<C>
where
    C: QEventCatalog,
    C::Small: PartialEq,
    C::Medium: PartialEq,
    C::Large: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (QPayload::None, QPayload::None) => true,
            (QPayload::Small(a), QPayload::Small(b)) => a == b,
            (QPayload::Medium(a), QPayload::Medium(b)) => a == b,
            (QPayload::Large(a), QPayload::Large(b)) => a == b,
            _ => false,
        }
    }
}

/// Location of a payload inside a pool set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QBlock {
    pub class: SizeClass,
    pub index: u8,
}

/// What event queues hold: the signal plus the pooled payload, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QEvtRef {
    signal: QSignal,
    block: Option<QBlock>,
}

impl QEvtRef {
    /// Reference to a signal-only event
    pub const fn signal_only(signal: QSignal) -> Self {
        Self { signal, block: None }
    }

    pub const fn signal(&self) -> QSignal {
        self.signal
    }

    pub const fn block(&self) -> Option<QBlock> {
        self.block
    }

    pub const fn is_pooled(&self) -> bool {
        self.block.is_some()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for QEvtRef {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "QEvtRef({}, pooled: {})", self.signal, self.block.is_some());
    }
}

/// Storage behind the framework's event queues.
pub trait QEventStore {
    type Catalog: QEventCatalog;

    /// Place a payload in the pool of its class. The new block is unreferenced.
    fn alloc(&self, signal: QSignal, payload: QPayload<Self::Catalog>) -> QResult<QEvtRef>;

    /// Rebuild the event a reference points to
    fn resolve(&self, evt: QEvtRef) -> QResult<QEvt<QPayload<Self::Catalog>>>;

    fn retain(&self, evt: QEvtRef) -> QResult<()>;

    /// Drop a reference; true when the block returned to its pool
    fn release(&self, evt: QEvtRef) -> QResult<bool>;

    fn ref_count(&self, evt: QEvtRef) -> u8;

    fn stats(&self, class: SizeClass) -> QPoolStats;
}

/// The three event pools of an application.
pub struct QPoolSet<C: QEventCatalog, const NS: usize, const NM: usize, const NL: usize> {
    small: QEventPool<C::Small, NS>,
    medium: QEventPool<C::Medium, NM>,
    large: QEventPool<C::Large, NL>,
}

impl<C: QEventCatalog, const NS: usize, const NM: usize, const NL: usize> QPoolSet<C, NS, NM, NL> {
    pub fn new() -> Self {
        Self {
            small: QEventPool::new(),
            medium: QEventPool::new(),
            large: QEventPool::new(),
        }
    }

    /// Bytes per block in the pool of `class`
    pub const fn block_size(&self, class: SizeClass) -> usize {
        match class {
            SizeClass::Small => self.small.block_size(),
            SizeClass::Medium => self.medium.block_size(),
            SizeClass::Large => self.large.block_size(),
        }
    }
}

impl<C: QEventCatalog, const NS: usize, const NM: usize, const NL: usize> Default
    for QPoolSet<C, NS, NM, NL>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C: QEventCatalog, const NS: usize, const NM: usize, const NL: usize> QEventStore
    for QPoolSet<C, NS, NM, NL>
{
    type Catalog = C;

    fn alloc(&self, signal: QSignal, payload: QPayload<C>) -> QResult<QEvtRef> {
        let block = match payload {
            QPayload::None => None,
            QPayload::Small(p) => Some(QBlock {
                class: SizeClass::Small,
                index: self.small.alloc(p)?,
            }),
            QPayload::Medium(p) => Some(QBlock {
                class: SizeClass::Medium,
                index: self.medium.alloc(p)?,
            }),
            QPayload::Large(p) => Some(QBlock {
                class: SizeClass::Large,
                index: self.large.alloc(p)?,
            }),
        };
        Ok(QEvtRef { signal, block })
    }

    fn resolve(&self, evt: QEvtRef) -> QResult<QEvt<QPayload<C>>> {
        let payload = match evt.block {
            None => QPayload::None,
            Some(QBlock { class: SizeClass::Small, index }) => {
                QPayload::Small(self.small.get(index).ok_or(QError::InvalidSize)?)
            }
            Some(QBlock { class: SizeClass::Medium, index }) => {
                QPayload::Medium(self.medium.get(index).ok_or(QError::InvalidSize)?)
            }
            Some(QBlock { class: SizeClass::Large, index }) => {
                QPayload::Large(self.large.get(index).ok_or(QError::InvalidSize)?)
            }
        };
        Ok(QEvt::new(evt.signal, payload))
    }

    fn retain(&self, evt: QEvtRef) -> QResult<()> {
        match evt.block {
            None => Ok(()),
            Some(QBlock { class: SizeClass::Small, index }) => self.small.retain(index).map(|_| ()),
            Some(QBlock { class: SizeClass::Medium, index }) => self.medium.retain(index).map(|_| ()),
            Some(QBlock { class: SizeClass::Large, index }) => self.large.retain(index).map(|_| ()),
        }
    }

    fn release(&self, evt: QEvtRef) -> QResult<bool> {
        match evt.block {
            None => Ok(false),
            Some(QBlock { class: SizeClass::Small, index }) => self.small.release(index),
            Some(QBlock { class: SizeClass::Medium, index }) => self.medium.release(index),
            Some(QBlock { class: SizeClass::Large, index }) => self.large.release(index),
        }
    }

    fn ref_count(&self, evt: QEvtRef) -> u8 {
        match evt.block {
            None => 0,
            Some(QBlock { class: SizeClass::Small, index }) => self.small.ref_count(index),
            Some(QBlock { class: SizeClass::Medium, index }) => self.medium.ref_count(index),
            Some(QBlock { class: SizeClass::Large, index }) => self.large.ref_count(index),
        }
    }

    fn stats(&self, class: SizeClass) -> QPoolStats {
        match class {
            SizeClass::Small => self.small.stats(),
            SizeClass::Medium => self.medium.stats(),
            SizeClass::Large => self.large.stats(),
        }
    }
}
