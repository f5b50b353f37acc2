//! Host simulator for the ECU accessory board.
//!
//! Builds the complete firmware on simulated peripherals, with behavioural
//! models of the SSD1306 panel and the MPRLS sensor on the I2C bus, and
//! drives it from a 1 kHz tick loop. Scenarios (pressure, engine speed, a
//! display that drops off the bus) come from [`SimOptions`].

mod devices;
mod error;
mod formatter;
mod runner;

pub use devices::{MprlsModel, PanelState, Ssd1306Model};
pub use error::SimError;
pub use formatter::SnapshotFormatter;
pub use runner::{lmt01_pulses, run, SimOptions, SimSummary, Snapshot};

#[cfg(test)]
mod tests;
