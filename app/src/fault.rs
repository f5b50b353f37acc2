//! Fault manager: the bounded list of active faults

use core::cell::RefCell;
use core::fmt;

use critical_section::Mutex;
use heapless::{String, Vec};
use qp_qf::{QPayload, QTick};

use crate::events::{EcuQf, MediumEvt};
use crate::signals::FAULT_GENERATED;

/// Longest fault message kept, in bytes
pub const FAULT_MSG_MAX_LEN: usize = 32;

/// Fault ids other than the sentinel; one slot each
pub const FAULT_CAPACITY: usize = FaultId::ALL.len();

/// Length of [`FaultManager::active_fault_list`]; always ends with a sentinel
pub const FAULT_LIST_LEN: usize = FAULT_CAPACITY + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FaultId {
    /// Sentinel: "no fault"
    #[default]
    None,
    DisplayStartup,
    DisplayI2c,
    PressureStartup,
    PressureI2c,
    PressureNoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultType {
    #[default]
    None,
    /// A bus transfer failed
    Communication,
    /// A device never finished its init sequence
    Startup,
    /// A device stopped delivering data
    Stale,
}

impl FaultId {
    pub const ALL: [FaultId; 5] = [
        FaultId::DisplayStartup,
        FaultId::DisplayI2c,
        FaultId::PressureStartup,
        FaultId::PressureI2c,
        FaultId::PressureNoData,
    ];

    pub const fn code(self) -> u16 {
        match self {
            FaultId::None => 0,
            FaultId::DisplayStartup => 100,
            FaultId::DisplayI2c => 101,
            FaultId::PressureStartup => 200,
            FaultId::PressureI2c => 201,
            FaultId::PressureNoData => 202,
        }
    }

    pub const fn fault_type(self) -> FaultType {
        match self {
            FaultId::None => FaultType::None,
            FaultId::DisplayStartup | FaultId::PressureStartup => FaultType::Startup,
            FaultId::DisplayI2c | FaultId::PressureI2c => FaultType::Communication,
            FaultId::PressureNoData => FaultType::Stale,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            FaultId::None => "No fault",
            FaultId::DisplayStartup => "Display failed to initialize",
            FaultId::DisplayI2c => "Display I2C communication error",
            FaultId::PressureStartup => "Pressure sensor failed to initialize",
            FaultId::PressureI2c => "Pressure sensor I2C communication error",
            FaultId::PressureNoData => "Pressure sensor stopped reporting",
        }
    }
}

impl fmt::Display for FaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{} {}", self.code(), self.description())
    }
}

/// One active fault
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FaultRecord {
    pub id: FaultId,
    pub fault_type: FaultType,
    pub code: u16,
    pub msg: String<FAULT_MSG_MAX_LEN>,
    /// Time of the latest occurrence
    pub raised_at: QTick,
    /// Occurrences since the fault was last cleared
    pub count: u16,
}

impl FaultRecord {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        self.id == FaultId::None
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FaultRecord {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "F{} x{}: {=str}", self.code, self.count, self.msg.as_str());
    }
}

/// Longest prefix of `msg` that fits, cut at a character boundary
fn truncate(msg: &str) -> String<FAULT_MSG_MAX_LEN> {
    let mut out = String::new();
    for c in msg.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Active faults in order of first occurrence, at most one per id.
///
/// Any active object may raise faults through a shared reference; the list
/// lives behind a critical section. A fault stays until [`clear`] or
/// [`clear_all`] removes it.
///
/// [`clear`]: FaultManager::clear
/// [`clear_all`]: FaultManager::clear_all
pub struct FaultManager<'q> {
    qf: &'q EcuQf,
    faults: Mutex<RefCell<Vec<FaultRecord, FAULT_CAPACITY>>>,
}

impl<'q> FaultManager<'q> {
    pub fn new(qf: &'q EcuQf) -> Self {
        Self {
            qf,
            faults: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    /// Record a fault and publish it on `FAULT_GENERATED`.
    ///
    /// A fault that is already active keeps its slot; its message, time and
    /// count are updated.
    pub fn generate_fault(&self, source: &str, id: FaultId, msg: &str) {
        if id == FaultId::None {
            log::warn!("{} raised the no-fault sentinel; ignored", source);
            return;
        }
        let now = self.qf.now();
        let msg = truncate(msg);
        let record = critical_section::with(|cs| {
            let mut faults = self.faults.borrow_ref_mut(cs);
            if let Some(existing) = faults.iter_mut().find(|f| f.id == id) {
                existing.msg = msg;
                existing.raised_at = now;
                existing.count = existing.count.saturating_add(1);
                return Some(existing.clone());
            }
            let record = FaultRecord {
                id,
                fault_type: id.fault_type(),
                code: id.code(),
                msg,
                raised_at: now,
                count: 1,
            };
            faults.push(record.clone()).ok().map(|_| record)
        });
        match record {
            Some(record) => {
                log::error!("fault {} from {}: {}", id, source, record.msg);
                self.qf
                    .publish(FAULT_GENERATED, QPayload::Medium(MediumEvt::Fault(record)));
            }
            None => log::error!("fault list full; dropped {} from {}", id, source),
        }
    }

    /// Active faults followed by `FaultId::None` entries.
    ///
    /// `list[0].id == FaultId::None` exactly when nothing is active.
    pub fn active_fault_list(&self) -> [FaultRecord; FAULT_LIST_LEN] {
        let mut list: [FaultRecord; FAULT_LIST_LEN] = Default::default();
        critical_section::with(|cs| {
            for (slot, f) in list.iter_mut().zip(self.faults.borrow_ref(cs).iter()) {
                *slot = f.clone();
            }
        });
        list
    }

    pub fn active_count(&self) -> usize {
        critical_section::with(|cs| self.faults.borrow_ref(cs).len())
    }

    pub fn is_active(&self, id: FaultId) -> bool {
        critical_section::with(|cs| self.faults.borrow_ref(cs).iter().any(|f| f.id == id))
    }

    /// Most recently raised active fault
    pub fn latest(&self) -> Option<FaultRecord> {
        critical_section::with(|cs| {
            self.faults
                .borrow_ref(cs)
                .iter()
                .max_by_key(|f| f.raised_at)
                .cloned()
        })
    }

    pub fn code(&self, id: FaultId) -> u16 {
        id.code()
    }

    pub fn description(&self, id: FaultId) -> &'static str {
        id.description()
    }

    /// Remove one fault, keeping the others in order; false if not active
    pub fn clear(&self, id: FaultId) -> bool {
        let cleared = critical_section::with(|cs| {
            let mut faults = self.faults.borrow_ref_mut(cs);
            match faults.iter().position(|f| f.id == id) {
                Some(i) => {
                    faults.remove(i);
                    true
                }
                None => false,
            }
        });
        if cleared {
            log::info!("cleared fault {}", id);
        }
        cleared
    }

    pub fn clear_all(&self) {
        critical_section::with(|cs| self.faults.borrow_ref_mut(cs).clear());
        log::info!("cleared all faults");
    }
}
