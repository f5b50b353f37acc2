//! Command composer: a generic "send one I2C command" sub-machine.
//!
//! A driver embeds a [`CommandSender`] and dedicates one state to it. Before
//! entering that state it calls [`CommandSender::prepare`] with the state to
//! act as parent, the state to continue in, and the command bytes. The
//! composer state then
//!
//! - writes `[stream marker?, command, args...]` on entry,
//! - transitions to the continuation when the write completes,
//! - hands every other event (including the error reply) to the parent.
//!
//! The driver's `superstate()` must return [`CommandSender::superstate`]
//! for the composer state, which is how one piece of code gets a different
//! place in the tree on every use.

use core::fmt;

use ecu_hal::I2cAddress;
use heapless::Vec;
use qp_qf::{q_fatal, QError, QSignal, QStateReturn};

use crate::events::{EcuQf, Evt};
use crate::shared_i2c::{I2cReplyTo, SharedI2cHandle, MAX_WRITE_LEN};

pub struct CommandSender<S> {
    address: I2cAddress,
    marker: Option<u8>,
    superstate: Option<S>,
    next: Option<S>,
    frame: Vec<u8, MAX_WRITE_LEN>,
}

impl<S: Copy + fmt::Debug> CommandSender<S> {
    /// Composer for the device at `address`; `marker` is the control byte
    /// sent ahead of every command, if the device has one
    pub const fn new(address: I2cAddress, marker: Option<u8>) -> Self {
        Self {
            address,
            marker,
            superstate: None,
            next: None,
            frame: Vec::new(),
        }
    }

    /// Parameterize the next use. Replaces the frame and both states.
    pub fn prepare(&mut self, superstate: S, next: S, command: u8, args: &[u8]) {
        let mut frame = Vec::new();
        let built = match self.marker {
            Some(marker) => frame.push(marker).map_err(|_| ()),
            None => Ok(()),
        }
        .and_then(|()| frame.push(command).map_err(|_| ()))
        .and_then(|()| frame.extend_from_slice(args));
        if built.is_err() {
            q_fatal(QError::InvalidSize, "CommandSender::prepare");
        }
        self.frame = frame;
        self.superstate = Some(superstate);
        self.next = Some(next);
    }

    /// Parent of the composer state in its current use
    pub fn superstate(&self) -> Option<S> {
        self.superstate
    }

    pub fn next(&self) -> Option<S> {
        self.next
    }

    /// Bytes the next entry will write
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    /// Handler of the composer state
    pub fn handle(
        &mut self,
        qf: &EcuQf,
        i2c: SharedI2cHandle,
        reply: I2cReplyTo,
        evt: &Evt,
    ) -> QStateReturn<S> {
        match evt.signal() {
            QSignal::ENTRY => {
                if self.frame.is_empty() {
                    q_fatal(QError::InvalidTransition, "CommandSender::entry");
                }
                log::trace!("command {:02x?} -> {:?}", self.frame.as_slice(), self.next);
                i2c.write(qf, self.address, &self.frame, reply);
                QStateReturn::Handled
            }
            sig if sig == reply.complete => match self.next {
                Some(next) => QStateReturn::Transition(next),
                None => q_fatal(QError::InvalidTransition, "CommandSender::complete"),
            },
            _ => QStateReturn::Super,
        }
    }
}
