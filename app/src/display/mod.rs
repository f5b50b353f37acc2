//! SSD1306 128x64 OLED driver.
//!
//! Startup walks the controller's init table one command at a time through
//! the command composer. Running redraws the dashboard on a periodic timer
//! and streams it out: column window, page window, then eight page writes,
//! each started by the completion of the previous one.

pub mod framebuffer;
pub mod screen;

use ecu_hal::I2cAddress;
use qp_qf::{
    q_fatal, QActiveObject, QDuration, QError, QHsm, QPayload, QPriority, QResult, QSignal,
    QStateMachine, QStateReturn, QTimeEvtId,
};

use crate::command::CommandSender;
use crate::events::{EcuQf, Evt, MediumEvt, MotorData, Payload};
use crate::fault::{FaultId, FaultManager, FaultRecord};
use crate::shared_i2c::{I2cReplyTo, SharedI2cHandle};
use crate::signals::{DISPLAY_BASE, FAULT_GENERATED, MOTOR_DATA};

pub use framebuffer::Framebuffer;

pub const ADDRESS: I2cAddress = I2cAddress::new_unchecked(0x3C);

/// Control byte: command stream follows
const COMMAND_STREAM: u8 = 0x00;
/// Control byte: display data stream follows
const DATA_STREAM: u8 = 0x40;

const SET_COLUMN_ADDR: u8 = 0x21;
const SET_PAGE_ADDR: u8 = 0x22;

/// Power-on sequence for the 128x64 panel, one entry per command
pub const INIT_COMMANDS: [(u8, &[u8]); 17] = [
    (0xAE, &[]),     // display off
    (0xA8, &[0x3F]), // multiplex ratio 64
    (0x20, &[0x00]), // horizontal addressing
    (0x40, &[]),     // start line 0
    (0xD3, &[0x00]), // display offset 0
    (0xA1, &[]),     // segment remap
    (0xC8, &[]),     // COM scan remapped
    (0xDA, &[0x12]), // alternative COM pins
    (0x81, &[0x7F]), // contrast
    (0xA4, &[]),     // follow RAM
    (0xA6, &[]),     // normal, not inverted
    (0xD5, &[0x80]), // clock divide
    (0xD9, &[0xC2]), // pre-charge
    (0xDB, &[0x20]), // VCOMH deselect
    (0x8D, &[0x14]), // charge pump on
    (0x2E, &[]),     // scroll off
    (0xAF, &[]),     // display on
];

const REFRESH: QSignal = DISPLAY_BASE;
const I2C_COMPLETE: QSignal = DISPLAY_BASE.offset(1);
const I2C_ERROR: QSignal = DISPLAY_BASE.offset(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Startup,
    /// Sends the next init command each time it is entered
    StartupAdvance,
    /// Composer state; parent set by the composer
    SendCommand,
    StartupError,
    Running,
    Idle,
    Refresh,
    SetPageWindow,
    WritePage,
    Error,
}

pub struct Display<'q> {
    qf: &'q EcuQf,
    faults: &'q FaultManager<'q>,
    prio: QPriority,
    i2c: SharedI2cHandle,
    command: CommandSender<DisplayState>,
    refresh: QTimeEvtId,
    refresh_ticks: u32,
    next_init: usize,
    page: usize,
    fb: Framebuffer,
    motor: Option<MotorData>,
    fault: Option<FaultRecord>,
    frames: u32,
}

impl<'q> Display<'q> {
    pub fn new(
        qf: &'q EcuQf,
        faults: &'q FaultManager<'q>,
        prio: QPriority,
        i2c: SharedI2cHandle,
        refresh: QDuration,
    ) -> QResult<QHsm<Self>> {
        Ok(QHsm::new(Self {
            qf,
            faults,
            prio,
            i2c,
            command: CommandSender::new(ADDRESS, Some(COMMAND_STREAM)),
            refresh: qf.time_event(prio, REFRESH)?,
            refresh_ticks: refresh.ticks(),
            next_init: 0,
            page: 0,
            fb: Framebuffer::new(),
            motor: None,
            fault: None,
            frames: 0,
        }))
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.fb
    }

    /// Frames fully streamed to the panel
    pub fn frames(&self) -> u32 {
        self.frames
    }

    fn reply(&self) -> I2cReplyTo {
        I2cReplyTo {
            to: self.prio,
            complete: I2C_COMPLETE,
            error: I2C_ERROR,
        }
    }

    fn send_page(&mut self) {
        let mut buf = [0u8; 1 + framebuffer::WIDTH];
        buf[0] = DATA_STREAM;
        buf[1..].copy_from_slice(self.fb.page(self.page));
        self.i2c.write(self.qf, ADDRESS, &buf, self.reply());
    }
}

impl QStateMachine for Display<'_> {
    type State = DisplayState;
    type Payload = Payload;

    fn initial(&mut self) -> DisplayState {
        for sig in [MOTOR_DATA, FAULT_GENERATED] {
            if let Err(e) = self.qf.subscribe(self.prio, sig) {
                q_fatal(e, "Display::initial");
            }
        }
        DisplayState::Startup
    }

    fn superstate(&self, state: DisplayState) -> Option<DisplayState> {
        use DisplayState::*;

        match state {
            Startup | StartupError | Running | Error => None,
            StartupAdvance => Some(Startup),
            SendCommand => self.command.superstate(),
            Idle | Refresh | SetPageWindow | WritePage => Some(Running),
        }
    }

    fn handle(&mut self, state: DisplayState, evt: &Evt) -> QStateReturn<DisplayState> {
        use DisplayState::*;

        match (state, evt.signal()) {
            (SendCommand, _) => {
                let reply = self.reply();
                self.command.handle(self.qf, self.i2c, reply, evt)
            }

            (Startup, QSignal::ENTRY) => {
                log::info!("display: init sequence");
                self.next_init = 0;
                QStateReturn::Handled
            }
            (Startup, QSignal::INIT) => QStateReturn::Initial(StartupAdvance),
            (Startup, I2C_ERROR) => QStateReturn::Transition(StartupError),
            (StartupAdvance, QSignal::INIT) => {
                let Some(&(cmd, args)) = INIT_COMMANDS.get(self.next_init) else {
                    q_fatal(QError::InvalidTransition, "Display::startup");
                };
                self.next_init += 1;
                let next = if self.next_init == INIT_COMMANDS.len() {
                    Running
                } else {
                    StartupAdvance
                };
                self.command.prepare(StartupAdvance, next, cmd, args);
                QStateReturn::Initial(SendCommand)
            }
            (StartupError, QSignal::ENTRY) => {
                self.faults.generate_fault(
                    "display",
                    FaultId::DisplayStartup,
                    "init command failed",
                );
                QStateReturn::Handled
            }

            (Running, QSignal::ENTRY) => {
                log::info!("display: running");
                if let Err(e) = self.qf.arm(self.refresh, self.refresh_ticks, self.refresh_ticks) {
                    q_fatal(e, "Display::running");
                }
                QStateReturn::Handled
            }
            (Running, QSignal::EXIT) => {
                let _ = self.qf.disarm(self.refresh);
                QStateReturn::Handled
            }
            (Running, QSignal::INIT) => QStateReturn::Initial(Idle),
            (Running, MOTOR_DATA) => {
                if let QPayload::Medium(MediumEvt::MotorData(data)) = evt.payload() {
                    self.motor = Some(*data);
                }
                QStateReturn::Handled
            }
            (Running, FAULT_GENERATED) => {
                if let QPayload::Medium(MediumEvt::Fault(record)) = evt.payload() {
                    self.fault = Some(record.clone());
                }
                QStateReturn::Handled
            }
            (Running, REFRESH) => {
                log::trace!("display: refresh during update dropped");
                QStateReturn::Handled
            }
            (Running, I2C_ERROR) => QStateReturn::Transition(Error),

            (Idle, REFRESH) => QStateReturn::Transition(Refresh),
            (Refresh, QSignal::INIT) => {
                screen::render(&mut self.fb, self.motor.as_ref(), self.fault.as_ref());
                self.command
                    .prepare(Refresh, SetPageWindow, SET_COLUMN_ADDR, &[0, 127]);
                QStateReturn::Initial(SendCommand)
            }
            (SetPageWindow, QSignal::INIT) => {
                self.command
                    .prepare(SetPageWindow, WritePage, SET_PAGE_ADDR, &[0, 7]);
                QStateReturn::Initial(SendCommand)
            }
            (WritePage, QSignal::ENTRY) => {
                self.page = 0;
                self.send_page();
                QStateReturn::Handled
            }
            (WritePage, I2C_COMPLETE) => {
                self.page += 1;
                if self.page < framebuffer::PAGES {
                    self.send_page();
                    QStateReturn::Handled
                } else {
                    self.frames += 1;
                    QStateReturn::Transition(Idle)
                }
            }

            (Error, QSignal::ENTRY) => {
                self.faults
                    .generate_fault("display", FaultId::DisplayI2c, "transfer failed");
                QStateReturn::Handled
            }

            _ => QStateReturn::Super,
        }
    }
}

impl QActiveObject for Display<'_> {
    fn priority(&self) -> QPriority {
        self.prio
    }
}
