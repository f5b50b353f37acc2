//! Telemetry UART

use crate::error::HalError;

/// Interrupt- or DMA-driven transmitter.
///
/// `start_transmit` copies `data` and returns immediately; completion is
/// reported by interrupt. `WouldBlock` means a transmission is in progress.
pub trait TelemetryPort {
    fn start_transmit(&mut self, data: &[u8]) -> nb::Result<(), HalError>;
}
