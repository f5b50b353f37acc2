#![no_std]
#![forbid(unsafe_code)]

//! # ECU accessory board firmware
//!
//! Every task is an active object on the QP framework: a private queue
//! plus a hierarchical state machine, run to completion by the cooperative
//! [`QV`](qp_qv::QV) scheduler. Interrupt handlers only post or publish.
//!
//! - [`shared_i2c`]: one arbiter per physical bus; serializes requests and
//!   defers the ones that arrive while a transfer is in flight
//! - [`command`]: reusable "send one command, then go to X" sub-machine
//! - [`display`], [`pressure`], [`temperature`], [`tachometer`]: device
//!   drivers
//! - [`data_manager`]: aggregates readings into the motor-data snapshot
//! - [`fault`]: bounded list of active faults, one entry per fault id
//!
//! Nothing is global. [`EcuSystem`] wires a complete board from a
//! [`EcuConfig`] and borrowed peripherals, and tests build as many
//! independent systems as they like.

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod command;
pub mod config;
pub mod data_manager;
pub mod display;
pub mod events;
pub mod fault;
pub mod pressure;
pub mod shared_i2c;
pub mod signals;
pub mod system;
pub mod tachometer;
pub mod temperature;

pub use command::CommandSender;
pub use config::{ActiveConfig, EcuConfig, EcuConfigBuilder, PressureCalibration, TachCalibration};
pub use data_manager::{telemetry_complete_isr, DataManager};
pub use display::Display;
pub use events::{EcuCatalog, EcuPools, EcuQf, Evt, LargeEvt, MediumEvt, MotorData, Payload, SmallEvt};
pub use fault::{FaultId, FaultManager, FaultRecord, FaultType};
pub use pressure::{PressureSample, PressureSensor};
pub use shared_i2c::{I2cReply, I2cReplyTo, I2cRequest, SharedI2c, SharedI2cHandle};
pub use system::{EcuPeripherals, EcuSystem};
pub use tachometer::{Tachometer, TachometerHandle};
pub use temperature::TemperatureSensor;
