//! Hardware interfaces for the ECU accessory board.
//!
//! The firmware core never touches registers. It drives the board through
//! the traits here: a non-blocking I2C bus whose completion is reported by
//! interrupt, digital sense inputs, the battery ADC channel, the LMT01 pulse
//! counter, and the telemetry UART. With the `sim` feature the crate also
//! provides host-side simulations of each of them.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod error;
pub mod gpio;
pub mod i2c;
pub mod adc;
pub mod timer;
pub mod uart;

#[cfg(feature = "sim")]
pub mod sim;

// Re-export commonly used types
pub use error::{HalError, HalResult};
pub use gpio::{MotorInputPins, MotorInputs, SwitchInput, TriState, TriStateInput};
pub use i2c::{I2cAddress, I2cBus, MemAddressSize};
pub use adc::{AdcChannel, VbatCalibration};
pub use timer::PulseCounter;
pub use uart::TelemetryPort;
