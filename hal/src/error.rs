//! Peripheral failures as the ECU drivers see them

use core::fmt;

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

/// Why a peripheral call or transfer failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Argument the peripheral cannot accept (address, length, channel)
    InvalidParameter,
    /// A transfer is already in flight
    Busy,
    Nack,
    ArbitrationLost,
    Timeout,
    /// Bus error, overrun, or any fault the peripheral does not classify
    HardwareError,
}

impl HalError {
    /// Worth retrying later without resetting the peripheral
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Busy | Self::ArbitrationLost)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParameter => "invalid parameter",
            Self::Busy => "peripheral busy",
            Self::Nack => "no acknowledge",
            Self::ArbitrationLost => "arbitration lost",
            Self::Timeout => "timed out",
            Self::HardwareError => "hardware error",
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

#[cfg(feature = "defmt")]
impl defmt::Format for HalError {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=str}", self.as_str());
    }
}

impl From<ErrorKind> for HalError {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NoAcknowledge(_) => Self::Nack,
            ErrorKind::ArbitrationLoss => Self::ArbitrationLost,
            _ => Self::HardwareError,
        }
    }
}

/// Lets board I2C drivers written against `embedded-hal` report through
/// the same error type.
impl embedded_hal::i2c::Error for HalError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Nack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            Self::ArbitrationLost => ErrorKind::ArbitrationLoss,
            Self::HardwareError => ErrorKind::Bus,
            _ => ErrorKind::Other,
        }
    }
}

pub type HalResult<T> = Result<T, HalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i2c_error_kinds_map_both_ways() {
        use embedded_hal::i2c::Error;

        let nack = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);
        assert_eq!(HalError::from(nack), HalError::Nack);
        assert_eq!(HalError::from(ErrorKind::Overrun), HalError::HardwareError);
        assert_eq!(HalError::ArbitrationLost.kind(), ErrorKind::ArbitrationLoss);
        assert_eq!(HalError::Timeout.kind(), ErrorKind::Other);
    }

    #[test]
    fn only_contention_is_transient() {
        assert!(HalError::Busy.is_transient());
        assert!(!HalError::Nack.is_transient());
    }
}
