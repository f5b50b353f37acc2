//! Event payloads, grouped by size class

use ecu_hal::{HalError, TriState};
use qp_qf::{QEventCatalog, QEvt, QPayload, QPoolSet, QF};

use crate::fault::FaultRecord;
use crate::shared_i2c::{I2cReply, I2cRequest};

/// Scalar readings and ISR samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmallEvt {
    Int16(i16),
    Float(f32),
    /// Raw input-capture counter value
    Capture(u32),
    BusError(HalError),
}

/// Snapshot of everything the board senses, published at 100 Hz.
///
/// Temperature and pressure are in hundredths (°C, psi), battery voltage in
/// hundredths of a volt.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotorData {
    pub temperature: i16,
    pub pressure: i16,
    pub tachometer: i16,
    pub vbat: i16,
    pub start: bool,
    pub neutral: bool,
    pub buzzer: bool,
    pub red: TriState,
    pub orange: TriState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediumEvt {
    MotorData(MotorData),
    Fault(FaultRecord),
    I2cReply(I2cReply),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LargeEvt {
    I2cRequest(I2cRequest),
}

/// Payload catalog of the firmware
pub struct EcuCatalog;

impl QEventCatalog for EcuCatalog {
    type Small = SmallEvt;
    type Medium = MediumEvt;
    type Large = LargeEvt;
}

pub const SMALL_POOL_LEN: usize = 16;
pub const MEDIUM_POOL_LEN: usize = 8;
pub const LARGE_POOL_LEN: usize = 4;

pub type Payload = QPayload<EcuCatalog>;
pub type Evt = QEvt<Payload>;
pub type EcuPools = QPoolSet<EcuCatalog, SMALL_POOL_LEN, MEDIUM_POOL_LEN, LARGE_POOL_LEN>;
pub type EcuQf = QF<EcuPools>;

/// Scalar of an `Int16` event
pub fn int16(evt: &Evt) -> Option<i16> {
    match evt.payload() {
        QPayload::Small(SmallEvt::Int16(v)) => Some(*v),
        _ => None,
    }
}

pub fn float(evt: &Evt) -> Option<f32> {
    match evt.payload() {
        QPayload::Small(SmallEvt::Float(v)) => Some(*v),
        _ => None,
    }
}
