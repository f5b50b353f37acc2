//! Behavioural models of the devices on the board's I2C bus

use std::cell::RefCell;
use std::rc::Rc;

use ecu_app::display::{self, framebuffer};
use ecu_app::{pressure, PressureCalibration};
use ecu_hal::sim::SimDevice;
use ecu_hal::{HalError, HalResult, I2cAddress};

const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;

/// What the SSD1306 has been told so far
#[derive(Debug, Clone)]
pub struct PanelState {
    pub on: bool,
    pub commands: usize,
    pub page_writes: usize,
    pub page: usize,
    pub gddram: [[u8; framebuffer::WIDTH]; framebuffer::PAGES],
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            on: false,
            commands: 0,
            page_writes: 0,
            page: 0,
            gddram: [[0; framebuffer::WIDTH]; framebuffer::PAGES],
        }
    }
}

impl PanelState {
    /// Panel contents as text, one character per 2x4 pixel cell
    pub fn ascii(&self) -> Vec<String> {
        let mut rows = Vec::new();
        for y in (0..framebuffer::HEIGHT).step_by(4) {
            let row = (0..framebuffer::WIDTH)
                .step_by(2)
                .map(|x| {
                    let lit = (0..2).any(|dx| (0..4).any(|dy| self.pixel(x + dx, y + dy)));
                    if lit {
                        '#'
                    } else {
                        ' '
                    }
                })
                .collect::<String>();
            rows.push(row.trim_end().to_string());
        }
        rows
    }

    fn pixel(&self, x: usize, y: usize) -> bool {
        self.gddram[y / 8][x] & (1 << (y % 8)) != 0
    }
}

/// SSD1306 in horizontal addressing mode
#[derive(Clone, Default)]
pub struct Ssd1306Model {
    state: Rc<RefCell<PanelState>>,
}

impl Ssd1306Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panel(&self) -> PanelState {
        self.state.borrow().clone()
    }
}

impl SimDevice for Ssd1306Model {
    fn address(&self) -> I2cAddress {
        display::ADDRESS
    }

    fn on_write(&mut self, data: &[u8]) -> HalResult<()> {
        let mut panel = self.state.borrow_mut();
        match data {
            [CONTROL_COMMAND, cmd, args @ ..] => {
                panel.commands += 1;
                match (*cmd, args) {
                    (0xAE, _) => panel.on = false,
                    (0xAF, _) => panel.on = true,
                    (0x22, [start, ..]) => panel.page = usize::from(*start) % framebuffer::PAGES,
                    _ => {}
                }
                Ok(())
            }
            [CONTROL_DATA, pixels @ ..] => {
                let page = panel.page;
                let n = pixels.len().min(framebuffer::WIDTH);
                panel.gddram[page][..n].copy_from_slice(&pixels[..n]);
                panel.page = (page + 1) % framebuffer::PAGES;
                panel.page_writes += 1;
                Ok(())
            }
            _ => Err(HalError::InvalidParameter),
        }
    }

    fn on_read(&mut self, _buf: &mut [u8]) -> HalResult<()> {
        Err(HalError::Nack)
    }
}

#[derive(Debug, Clone, Copy)]
struct SensorState {
    psi: f64,
    celsius: f64,
    measuring: bool,
}

/// MPRLS0025PA: measures on command, answers with status and counts
#[derive(Clone)]
pub struct MprlsModel {
    state: Rc<RefCell<SensorState>>,
    cal: PressureCalibration,
}

impl MprlsModel {
    pub fn new(psi: f64, cal: PressureCalibration) -> Self {
        Self {
            state: Rc::new(RefCell::new(SensorState {
                psi,
                celsius: 25.0,
                measuring: false,
            })),
            cal,
        }
    }

    pub fn set_psi(&self, psi: f64) {
        self.state.borrow_mut().psi = psi;
    }

    /// Output counts for `psi`, the inverse of the sensor transfer function
    pub fn counts(&self, psi: f64) -> u32 {
        let span = f64::from(self.cal.output_max - self.cal.output_min);
        let c = (psi - self.cal.p_min) * span / (self.cal.p_max - self.cal.p_min)
            + f64::from(self.cal.output_min);
        c.round().clamp(0.0, 16_777_215.0) as u32
    }
}

impl SimDevice for MprlsModel {
    fn address(&self) -> I2cAddress {
        pressure::ADDRESS
    }

    fn on_write(&mut self, data: &[u8]) -> HalResult<()> {
        match data {
            [0xAA, 0x00, 0x00] => {
                self.state.borrow_mut().measuring = true;
                Ok(())
            }
            _ => Err(HalError::InvalidParameter),
        }
    }

    fn on_read(&mut self, buf: &mut [u8]) -> HalResult<()> {
        let mut state = self.state.borrow_mut();
        let mut status = pressure::STATUS_POWERED;
        if !state.measuring {
            status |= pressure::STATUS_BUSY;
        }
        state.measuring = false;
        let p = self.counts(state.psi).to_be_bytes();
        let t = (((state.celsius + 50.0) * 16_777_215.0 / 200.0) as u32).to_be_bytes();
        let frame = [status, p[1], p[2], p[3], t[1], t[2], t[3]];
        let n = buf.len().min(frame.len());
        buf[..n].copy_from_slice(&frame[..n]);
        Ok(())
    }
}
