//! Non-blocking I2C master

use crate::error::{HalError, HalResult};

/// 7-bit I2C device address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct I2cAddress(u8);

impl I2cAddress {
    /// Validated address; 0 (general call) and values above 0x7F are rejected
    pub fn new(address: u8) -> HalResult<Self> {
        if address == 0 || address > 0x7F {
            Err(HalError::InvalidParameter)
        } else {
            Ok(Self(address))
        }
    }

    /// Address constant without validation
    pub const fn new_unchecked(address: u8) -> Self {
        Self(address)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Address byte as sent on the wire, before the R/W bit
    pub const fn wire(self) -> u8 {
        self.0 << 1
    }
}

/// Width of a device register address in a memory read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemAddressSize {
    One,
    Two,
}

impl MemAddressSize {
    pub const fn bytes(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

impl TryFrom<u8> for MemAddressSize {
    type Error = HalError;

    fn try_from(bytes: u8) -> Result<Self, HalError> {
        match bytes {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            _ => Err(HalError::InvalidParameter),
        }
    }
}

/// Interrupt-driven I2C master.
///
/// Each `start_*` call only initiates a transfer. `nb::Error::WouldBlock`
/// means the peripheral is busy; any other error means the transfer was
/// refused outright. Once a transfer is accepted, exactly one completion or
/// error interrupt follows. Write data is copied into the driver's buffer
/// before the call returns.
pub trait I2cBus {
    fn start_write(&mut self, address: I2cAddress, data: &[u8]) -> nb::Result<(), HalError>;

    fn start_read(&mut self, address: I2cAddress, len: usize) -> nb::Result<(), HalError>;

    /// Read `len` bytes starting at device register `mem_address`
    fn start_memory_read(
        &mut self,
        address: I2cAddress,
        mem_address: u16,
        mem_size: MemAddressSize,
        len: usize,
    ) -> nb::Result<(), HalError>;

    /// Copy out the bytes of the last completed read; returns the count
    fn take_received(&mut self, buf: &mut [u8]) -> usize;
}
