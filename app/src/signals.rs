//! Signal map.
//!
//! Published signals sit right above the reserved range and below
//! [`MAX_PUB_SIGNALS`](qp_qf::MAX_PUB_SIGNALS). Each active object owns a
//! private block of 16 signals above that for its own timers and
//! completions.

use qp_qf::QSignal;

pub const FAULT_GENERATED: QSignal = QSignal::USER.offset(1);
pub const PRESSURE: QSignal = QSignal::USER.offset(2);
pub const TEMPERATURE: QSignal = QSignal::USER.offset(3);
pub const MOTOR_DATA: QSignal = QSignal::USER.offset(4);
pub const TACH: QSignal = QSignal::USER.offset(5);
pub const UART_COMPLETE: QSignal = QSignal::USER.offset(6);

/// Base of each active object's private range
pub const SHARED_I2C_BASE: QSignal = QSignal(32);
pub const DISPLAY_BASE: QSignal = QSignal(48);
pub const PRESSURE_BASE: QSignal = QSignal(64);
pub const TEMPERATURE_BASE: QSignal = QSignal(80);
pub const DATA_MANAGER_BASE: QSignal = QSignal(96);
pub const TACH_BASE: QSignal = QSignal(112);

#[cfg(test)]
mod tests {
    use super::*;
    use qp_qf::MAX_PUB_SIGNALS;

    #[test]
    fn test_published_signals_fit_the_subscriber_table() {
        for sig in [FAULT_GENERATED, PRESSURE, TEMPERATURE, MOTOR_DATA, TACH, UART_COMPLETE] {
            assert!(!sig.is_reserved());
            assert!((sig.raw() as usize) < MAX_PUB_SIGNALS);
            assert!(sig.raw() < SHARED_I2C_BASE.raw());
        }
        assert_eq!(FAULT_GENERATED, QSignal(5));
        assert_eq!(UART_COMPLETE, QSignal(10));
    }
}
