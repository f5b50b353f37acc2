//! Simulated peripherals for host tests and the simulator.
//!
//! Every simulated peripheral is a cheap handle around shared state: clone
//! it, hand one copy to the firmware and keep the other to script inputs and
//! inspect what the firmware did.

use std::boxed::Box;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::adc::AdcChannel;
use crate::error::{HalError, HalResult};
use crate::gpio::MotorInputPins;
use crate::i2c::{I2cAddress, I2cBus, MemAddressSize};
use crate::timer::PulseCounter;
use crate::uart::TelemetryPort;

/// One transfer as it went out on the simulated wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimTransfer {
    Write {
        address: I2cAddress,
        data: Vec<u8>,
    },
    Read {
        address: I2cAddress,
        len: usize,
    },
    MemoryRead {
        address: I2cAddress,
        mem_address: u16,
        mem_size: MemAddressSize,
        len: usize,
    },
}

impl SimTransfer {
    pub fn address(&self) -> I2cAddress {
        match self {
            SimTransfer::Write { address, .. }
            | SimTransfer::Read { address, .. }
            | SimTransfer::MemoryRead { address, .. } => *address,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, SimTransfer::Write { .. })
    }
}

/// Behavioural model of a device on the simulated bus
pub trait SimDevice {
    fn address(&self) -> I2cAddress;

    fn on_write(&mut self, data: &[u8]) -> HalResult<()>;

    fn on_read(&mut self, buf: &mut [u8]) -> HalResult<()>;

    fn on_memory_read(&mut self, mem_address: u16, buf: &mut [u8]) -> HalResult<()> {
        let _ = mem_address;
        self.on_read(buf)
    }
}

#[derive(Default)]
struct BusState {
    devices: Vec<Box<dyn SimDevice>>,
    transfers: Vec<SimTransfer>,
    in_flight: Option<SimTransfer>,
    refuse: VecDeque<HalError>,
    fail: VecDeque<HalError>,
    nack: Vec<I2cAddress>,
    read_data: VecDeque<Vec<u8>>,
    received: Vec<u8>,
}

impl BusState {
    fn start(&mut self, transfer: SimTransfer) -> nb::Result<(), HalError> {
        if self.in_flight.is_some() {
            return Err(nb::Error::WouldBlock);
        }
        match self.refuse.pop_front() {
            Some(HalError::Busy) => return Err(nb::Error::WouldBlock),
            Some(e) => return Err(nb::Error::Other(e)),
            None => {}
        }
        self.transfers.push(transfer.clone());
        self.in_flight = Some(transfer);
        Ok(())
    }

    fn finish(&mut self, transfer: SimTransfer) -> HalResult<()> {
        if let Some(e) = self.fail.pop_front() {
            return Err(e);
        }
        let address = transfer.address();
        if self.nack.contains(&address) {
            return Err(HalError::Nack);
        }
        let device = self.devices.iter_mut().find(|d| d.address() == address);
        match (transfer, device) {
            (SimTransfer::Write { data, .. }, Some(device)) => device.on_write(&data),
            (SimTransfer::Write { .. }, None) => Ok(()),
            (SimTransfer::Read { len, .. }, Some(device)) => {
                let mut buf = std::vec![0u8; len];
                device.on_read(&mut buf)?;
                self.received = buf;
                Ok(())
            }
            (
                SimTransfer::MemoryRead {
                    mem_address, len, ..
                },
                Some(device),
            ) => {
                let mut buf = std::vec![0u8; len];
                device.on_memory_read(mem_address, &mut buf)?;
                self.received = buf;
                Ok(())
            }
            (SimTransfer::Read { len, .. }, None)
            | (SimTransfer::MemoryRead { len, .. }, None) => {
                let mut buf = self.read_data.pop_front().ok_or(HalError::Nack)?;
                buf.resize(len, 0);
                self.received = buf;
                Ok(())
            }
        }
    }
}

/// Scripted I2C master.
///
/// A started transfer stays in flight until the test calls
/// [`SimI2cBus::complete`], which plays the role of the transfer-complete
/// or error interrupt. Writes to addresses without a device model are
/// acknowledged; reads from them consume data queued with
/// [`SimI2cBus::push_read_data`] and NACK when none is queued.
#[derive(Clone, Default)]
pub struct SimI2cBus {
    state: Rc<RefCell<BusState>>,
}

impl SimI2cBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, device: impl SimDevice + 'static) {
        self.state.borrow_mut().devices.push(Box::new(device));
    }

    /// Refuse the next start synchronously; `Busy` maps to `WouldBlock`
    pub fn refuse_next(&self, error: HalError) {
        self.state.borrow_mut().refuse.push_back(error);
    }

    /// Fail the next completion with `error`
    pub fn fail_next(&self, error: HalError) {
        self.state.borrow_mut().fail.push_back(error);
    }

    /// NACK every transfer to `address` until cleared
    pub fn set_nack(&self, address: I2cAddress, nack: bool) {
        let mut state = self.state.borrow_mut();
        state.nack.retain(|a| *a != address);
        if nack {
            state.nack.push(address);
        }
    }

    pub fn push_read_data(&self, data: &[u8]) {
        self.state.borrow_mut().read_data.push_back(data.to_vec());
    }

    pub fn is_pending(&self) -> bool {
        self.state.borrow().in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<SimTransfer> {
        self.state.borrow().in_flight.clone()
    }

    /// Finish the in-flight transfer; `None` when the bus is idle
    pub fn complete(&self) -> Option<HalResult<()>> {
        let mut state = self.state.borrow_mut();
        let transfer = state.in_flight.take()?;
        Some(state.finish(transfer))
    }

    /// Every accepted transfer so far, oldest first
    pub fn transfers(&self) -> Vec<SimTransfer> {
        self.state.borrow().transfers.clone()
    }

    pub fn clear_transfers(&self) {
        self.state.borrow_mut().transfers.clear();
    }
}

impl I2cBus for SimI2cBus {
    fn start_write(&mut self, address: I2cAddress, data: &[u8]) -> nb::Result<(), HalError> {
        self.state.borrow_mut().start(SimTransfer::Write {
            address,
            data: data.to_vec(),
        })
    }

    fn start_read(&mut self, address: I2cAddress, len: usize) -> nb::Result<(), HalError> {
        self.state
            .borrow_mut()
            .start(SimTransfer::Read { address, len })
    }

    fn start_memory_read(
        &mut self,
        address: I2cAddress,
        mem_address: u16,
        mem_size: MemAddressSize,
        len: usize,
    ) -> nb::Result<(), HalError> {
        self.state.borrow_mut().start(SimTransfer::MemoryRead {
            address,
            mem_address,
            mem_size,
            len,
        })
    }

    fn take_received(&mut self, buf: &mut [u8]) -> usize {
        let mut state = self.state.borrow_mut();
        let n = state.received.len().min(buf.len());
        buf[..n].copy_from_slice(&state.received[..n]);
        state.received.clear();
        n
    }
}

/// Digital pin usable as input or output
#[derive(Clone, Default)]
pub struct SimPin {
    level: Rc<Cell<bool>>,
}

impl SimPin {
    pub fn new(high: bool) -> Self {
        Self {
            level: Rc::new(Cell::new(high)),
        }
    }

    pub fn set(&self, high: bool) {
        self.level.set(high);
    }

    pub fn level(&self) -> bool {
        self.level.get()
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level.get())
    }
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.level.set(true);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct SimPulseCounter {
    count: Rc<Cell<u16>>,
    resets: Rc<Cell<u32>>,
}

impl SimPulseCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, count: u16) {
        self.count.set(count);
    }

    pub fn resets(&self) -> u32 {
        self.resets.get()
    }
}

impl PulseCounter for SimPulseCounter {
    fn count(&self) -> u16 {
        self.count.get()
    }

    fn reset(&mut self) {
        self.count.set(0);
        self.resets.set(self.resets.get() + 1);
    }
}

#[derive(Clone, Default)]
pub struct SimAdc {
    raw: Rc<Cell<u16>>,
}

impl SimAdc {
    pub fn new(raw: u16) -> Self {
        Self {
            raw: Rc::new(Cell::new(raw)),
        }
    }

    pub fn set(&self, raw: u16) {
        self.raw.set(raw);
    }
}

impl AdcChannel for SimAdc {
    fn read_raw(&mut self) -> HalResult<u16> {
        Ok(self.raw.get())
    }
}

#[derive(Default)]
struct UartState {
    sent: Vec<Vec<u8>>,
    busy: bool,
}

/// Telemetry UART that stays busy until [`SimUart::finish`]
#[derive(Clone, Default)]
pub struct SimUart {
    state: Rc<RefCell<UartState>>,
}

impl SimUart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().busy
    }

    /// End the current transmission; returns false if none was running
    pub fn finish(&self) -> bool {
        let mut state = self.state.borrow_mut();
        let was_busy = state.busy;
        state.busy = false;
        was_busy
    }

    pub fn sent(&self) -> Vec<String> {
        self.state
            .borrow()
            .sent
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }
}

impl TelemetryPort for SimUart {
    fn start_transmit(&mut self, data: &[u8]) -> nb::Result<(), HalError> {
        let mut state = self.state.borrow_mut();
        if state.busy {
            return Err(nb::Error::WouldBlock);
        }
        state.busy = true;
        state.sent.push(data.to_vec());
        Ok(())
    }
}

/// Scriptable handles for every motor sense input
#[derive(Clone, Default)]
pub struct SimMotorInputs {
    pub neutral: SimPin,
    pub start: SimPin,
    pub buzzer: SimPin,
    pub red: (SimPin, SimPin),
    pub orange: (SimPin, SimPin),
    pub vbat: SimAdc,
}

impl SimMotorInputs {
    /// Idle bike: neutral released (line high), switches off, wires low
    pub fn new() -> Self {
        let inputs = Self::default();
        inputs.neutral.set(true);
        inputs
    }

    /// Firmware-side view sharing these handles
    pub fn pins(&self) -> MotorInputPins<SimPin, SimAdc> {
        MotorInputPins::new(
            self.neutral.clone(),
            self.start.clone(),
            self.buzzer.clone(),
            self.red.clone(),
            self.orange.clone(),
            self.vbat.clone(),
        )
    }
}
