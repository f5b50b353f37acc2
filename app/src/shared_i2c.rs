//! Shared I2C bus arbiter.
//!
//! One [`SharedI2c`] active object owns each physical bus. Drivers never
//! touch the bus: they post requests through a [`SharedI2cHandle`] and get
//! the outcome back as an event on the signals they named in
//! [`I2cReplyTo`]. While a transfer is in flight new requests are deferred
//! and replayed in arrival order once the bus is idle again, so drivers
//! never see "busy" and never interleave on the wire.
//!
//! Request buffers travel inside the request event. A driver's data is
//! copied at the call and nothing refers back to it afterwards.

use ecu_hal::{HalError, HalResult, I2cAddress, I2cBus, MemAddressSize};
use heapless::Vec;
use qp_qf::{
    q_fatal, QActive, QActiveObject, QDeferQueue, QError, QHsm, QPayload, QPriority, QResult,
    QSignal, QStateMachine, QStateReturn,
};
use qp_qv::QV;

use crate::events::{EcuCatalog, EcuPools, EcuQf, Evt, LargeEvt, MediumEvt, Payload, SmallEvt};
use crate::signals::SHARED_I2C_BASE;

/// Largest write: a display page plus its control byte
pub const MAX_WRITE_LEN: usize = 129;
pub const MAX_READ_LEN: usize = 16;

/// Deferred requests held on the board's bus
pub const DEFAULT_DEFER_DEPTH: usize = 3;

const REQUEST: QSignal = SHARED_I2C_BASE;
const TRANSFER_COMPLETE: QSignal = SHARED_I2C_BASE.offset(1);
const TRANSFER_ERROR: QSignal = SHARED_I2C_BASE.offset(2);

/// Where the outcome of a request goes.
///
/// A completed write posts `complete` without payload, a completed read
/// posts `complete` with an [`I2cReply`], and a failure posts `error` with
/// [`SmallEvt::BusError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cReplyTo {
    pub to: QPriority,
    pub complete: QSignal,
    pub error: QSignal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum I2cOp {
    Write(Vec<u8, MAX_WRITE_LEN>),
    Read {
        len: usize,
    },
    MemoryRead {
        mem_address: u16,
        mem_size: MemAddressSize,
        len: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct I2cRequest {
    pub address: I2cAddress,
    pub op: I2cOp,
    pub reply: I2cReplyTo,
}

impl I2cRequest {
    fn read_len(&self) -> Option<usize> {
        match self.op {
            I2cOp::Write(_) => None,
            I2cOp::Read { len } | I2cOp::MemoryRead { len, .. } => Some(len),
        }
    }

    fn start<B: I2cBus>(&self, bus: &mut B) -> nb::Result<(), HalError> {
        match &self.op {
            I2cOp::Write(data) => bus.start_write(self.address, data),
            I2cOp::Read { len } => bus.start_read(self.address, *len),
            I2cOp::MemoryRead {
                mem_address,
                mem_size,
                len,
            } => bus.start_memory_read(self.address, *mem_address, *mem_size, *len),
        }
    }
}

/// Bytes of a completed read
#[derive(Debug, Clone, PartialEq, Default)]
pub struct I2cReply {
    pub data: Vec<u8, MAX_READ_LEN>,
}

/// Client and interrupt-side API of one arbiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedI2cHandle {
    prio: QPriority,
}

impl SharedI2cHandle {
    pub const fn new(prio: QPriority) -> Self {
        Self { prio }
    }

    pub const fn priority(&self) -> QPriority {
        self.prio
    }

    /// Queue a write of `data` to `address`
    pub fn write(&self, qf: &EcuQf, address: I2cAddress, data: &[u8], reply: I2cReplyTo) {
        check_address(address, "SharedI2c::write");
        if data.is_empty() {
            q_fatal(QError::InvalidSize, "SharedI2c::write");
        }
        let data = match Vec::from_slice(data) {
            Ok(d) => d,
            Err(()) => q_fatal(QError::InvalidSize, "SharedI2c::write"),
        };
        self.submit(qf, address, I2cOp::Write(data), reply);
    }

    /// Queue a read of `len` bytes
    pub fn read(&self, qf: &EcuQf, address: I2cAddress, len: usize, reply: I2cReplyTo) {
        check_address(address, "SharedI2c::read");
        check_read_len(len, "SharedI2c::read");
        self.submit(qf, address, I2cOp::Read { len }, reply);
    }

    /// Queue a read of `len` bytes from device register `mem_address`,
    /// which is `mem_size` (1 or 2) bytes wide
    pub fn memory_read(
        &self,
        qf: &EcuQf,
        address: I2cAddress,
        mem_address: u16,
        mem_size: u8,
        len: usize,
        reply: I2cReplyTo,
    ) {
        check_address(address, "SharedI2c::memory_read");
        check_read_len(len, "SharedI2c::memory_read");
        let mem_size = match MemAddressSize::try_from(mem_size) {
            Ok(size) => size,
            Err(_) => q_fatal(QError::InvalidArgument, "SharedI2c::memory_read"),
        };
        if mem_size == MemAddressSize::One && mem_address > 0xFF {
            q_fatal(QError::InvalidArgument, "SharedI2c::memory_read");
        }
        let op = I2cOp::MemoryRead {
            mem_address,
            mem_size,
            len,
        };
        self.submit(qf, address, op, reply);
    }

    /// Transfer-complete interrupt
    pub fn transfer_complete_isr(&self, qf: &EcuQf) {
        qf.post(self.prio, TRANSFER_COMPLETE, QPayload::None);
    }

    /// Transfer-error interrupt (NACK, arbitration loss, timeout)
    pub fn transfer_error_isr(&self, qf: &EcuQf, error: HalError) {
        qf.post(
            self.prio,
            TRANSFER_ERROR,
            QPayload::Small(SmallEvt::BusError(error)),
        );
    }

    /// Runs `aos` to idle, then feeds the outcome of the finished transfer
    /// from `complete` to the transfer ISRs, until `complete` reports no
    /// transfer in flight. Returns the number of events dispatched.
    ///
    /// For buses that are polled instead of interrupt driven.
    pub fn run_polled(
        &self,
        qf: &EcuQf,
        aos: &mut [&mut dyn QActive<EcuPools>],
        mut complete: impl FnMut() -> Option<HalResult<()>>,
    ) -> QResult<usize> {
        let qv = QV::new(qf);
        let mut dispatched = 0;
        loop {
            dispatched += qv.run_until_idle(aos)?;
            match complete() {
                None => return Ok(dispatched),
                Some(Ok(())) => self.transfer_complete_isr(qf),
                Some(Err(e)) => self.transfer_error_isr(qf, e),
            }
        }
    }

    fn submit(&self, qf: &EcuQf, address: I2cAddress, op: I2cOp, reply: I2cReplyTo) {
        let request = I2cRequest { address, op, reply };
        qf.post(self.prio, REQUEST, QPayload::Large(LargeEvt::I2cRequest(request)));
    }
}

fn check_address(address: I2cAddress, origin: &'static str) {
    if I2cAddress::new(address.raw()).is_err() {
        q_fatal(QError::InvalidArgument, origin);
    }
}

fn check_read_len(len: usize, origin: &'static str) {
    if len == 0 || len > MAX_READ_LEN {
        q_fatal(QError::InvalidSize, origin);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedI2cState {
    Idle,
    Busy,
}

/// The request on the wire
#[derive(Debug, Clone, Copy)]
struct InFlight {
    address: I2cAddress,
    read_len: Option<usize>,
    reply: I2cReplyTo,
}

/// Arbiter active object for bus `B`, deferring up to `D` requests
pub struct SharedI2c<'q, B: I2cBus, const D: usize = DEFAULT_DEFER_DEPTH> {
    qf: &'q EcuQf,
    prio: QPriority,
    bus: B,
    in_flight: Option<InFlight>,
    deferred: QDeferQueue<EcuCatalog, D>,
    completed: u32,
    failed: u32,
}

impl<'q, B: I2cBus> SharedI2c<'q, B> {
    /// Arbiter with the board's deferral depth
    pub fn new(qf: &'q EcuQf, prio: QPriority, bus: B) -> QHsm<Self> {
        Self::with_depth(qf, prio, bus)
    }
}

impl<'q, B: I2cBus, const D: usize> SharedI2c<'q, B, D> {
    pub fn with_depth(qf: &'q EcuQf, prio: QPriority, bus: B) -> QHsm<Self> {
        QHsm::new(Self {
            qf,
            prio,
            bus,
            in_flight: None,
            deferred: QDeferQueue::new(),
            completed: 0,
            failed: 0,
        })
    }

    pub fn client(&self) -> SharedI2cHandle {
        SharedI2cHandle::new(self.prio)
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Transfers that completed and that failed, synchronously or not
    pub fn counters(&self) -> (u32, u32) {
        (self.completed, self.failed)
    }

    fn begin(&mut self, request: &I2cRequest) -> QStateReturn<SharedI2cState> {
        match request.start(&mut self.bus) {
            Ok(()) => {
                log::trace!("i2c 0x{:02x}: started", request.address.raw());
                self.in_flight = Some(InFlight {
                    address: request.address,
                    read_len: request.read_len(),
                    reply: request.reply,
                });
                QStateReturn::Transition(SharedI2cState::Busy)
            }
            Err(e) => {
                let error = match e {
                    nb::Error::WouldBlock => HalError::Busy,
                    nb::Error::Other(err) => err,
                };
                if error.is_transient() {
                    log::debug!("i2c 0x{:02x}: refused ({})", request.address.raw(), error);
                } else {
                    log::warn!("i2c 0x{:02x}: refused ({})", request.address.raw(), error);
                }
                self.fail(request.reply, error);
                // stay idle; the next deferred request must not wait for
                // an event that will never come
                self.deferred.recall(self.qf, self.prio);
                QStateReturn::Handled
            }
        }
    }

    fn finish(&mut self, transfer: InFlight) {
        self.completed += 1;
        let reply = transfer.reply;
        match transfer.read_len {
            None => self.qf.post(reply.to, reply.complete, QPayload::None),
            Some(len) => {
                let mut buf = [0u8; MAX_READ_LEN];
                let n = self.bus.take_received(&mut buf[..len]);
                let mut data = Vec::new();
                // n <= len <= MAX_READ_LEN
                let _ = data.extend_from_slice(&buf[..n]);
                self.qf.post(
                    reply.to,
                    reply.complete,
                    QPayload::Medium(MediumEvt::I2cReply(I2cReply { data })),
                );
            }
        }
    }

    fn fail(&mut self, reply: I2cReplyTo, error: HalError) {
        self.failed += 1;
        self.qf.post(
            reply.to,
            reply.error,
            QPayload::Small(SmallEvt::BusError(error)),
        );
    }
}

impl<B: I2cBus, const D: usize> QStateMachine for SharedI2c<'_, B, D> {
    type State = SharedI2cState;
    type Payload = Payload;

    fn initial(&mut self) -> SharedI2cState {
        SharedI2cState::Idle
    }

    fn superstate(&self, _state: SharedI2cState) -> Option<SharedI2cState> {
        None
    }

    fn handle(&mut self, state: SharedI2cState, evt: &Evt) -> QStateReturn<SharedI2cState> {
        use SharedI2cState::*;

        match (state, evt.signal()) {
            (Idle, QSignal::ENTRY) => {
                self.deferred.recall(self.qf, self.prio);
                QStateReturn::Handled
            }
            (Idle, REQUEST) => match evt.payload() {
                QPayload::Large(LargeEvt::I2cRequest(request)) => self.begin(request),
                other => {
                    log::warn!("i2c request without payload: {:?}", other);
                    QStateReturn::Handled
                }
            },
            (Idle, TRANSFER_COMPLETE) | (Idle, TRANSFER_ERROR) => {
                log::warn!("i2c {} with no transfer in flight", evt.signal());
                QStateReturn::Handled
            }
            (Busy, REQUEST) => {
                self.deferred.defer(evt);
                QStateReturn::Handled
            }
            (Busy, TRANSFER_COMPLETE) => {
                if let Some(transfer) = self.in_flight.take() {
                    log::trace!("i2c 0x{:02x}: complete", transfer.address.raw());
                    self.finish(transfer);
                }
                QStateReturn::Transition(Idle)
            }
            (Busy, TRANSFER_ERROR) => {
                let error = match evt.payload() {
                    QPayload::Small(SmallEvt::BusError(e)) => *e,
                    _ => HalError::HardwareError,
                };
                if let Some(transfer) = self.in_flight.take() {
                    log::warn!("i2c 0x{:02x}: {}", transfer.address.raw(), error);
                    self.fail(transfer.reply, error);
                }
                QStateReturn::Transition(Idle)
            }
            _ => QStateReturn::Super,
        }
    }
}

impl<B: I2cBus, const D: usize> QActiveObject for SharedI2c<'_, B, D> {
    fn priority(&self) -> QPriority {
        self.prio
    }
}
