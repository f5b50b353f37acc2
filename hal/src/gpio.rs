//! Digital sense inputs

use embedded_hal::digital::InputPin;

use crate::adc::AdcChannel;
use crate::error::{HalError, HalResult};

/// State of a wire sensed through two pins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TriState {
    Low,
    High,
    HighZ,
    /// Pin combination the sense circuit should never produce
    #[default]
    Unknown,
}

impl TriState {
    /// Decode the 2-bit sample `(pin2 << 1) | pin1`.
    ///
    /// | pin2 pin1 | state   |
    /// |-----------|---------|
    /// | 0 0       | Low     |
    /// | 1 1       | High    |
    /// | 1 0       | HighZ   |
    /// | 0 1       | Unknown |
    pub const fn decode(pin1: bool, pin2: bool) -> Self {
        match ((pin2 as u8) << 1) | pin1 as u8 {
            0b00 => Self::Low,
            0b11 => Self::High,
            0b10 => Self::HighZ,
            _ => Self::Unknown,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::High => "HIGH",
            Self::HighZ => "HIGH_Z",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TriState {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=str}", self.as_str());
    }
}

fn level<P: InputPin>(pin: &mut P) -> HalResult<bool> {
    pin.is_high().map_err(|_| HalError::HardwareError)
}

/// A colored sense wire read through a pin pair
pub struct TriStateInput<P> {
    pin1: P,
    pin2: P,
}

impl<P: InputPin> TriStateInput<P> {
    pub fn new(pin1: P, pin2: P) -> Self {
        Self { pin1, pin2 }
    }

    pub fn read(&mut self) -> HalResult<TriState> {
        let p1 = level(&mut self.pin1)?;
        let p2 = level(&mut self.pin2)?;
        Ok(TriState::decode(p1, p2))
    }
}

/// A switch input with configurable polarity
pub struct SwitchInput<P> {
    pin: P,
    active_low: bool,
}

impl<P: InputPin> SwitchInput<P> {
    pub fn active_high(pin: P) -> Self {
        Self { pin, active_low: false }
    }

    pub fn active_low(pin: P) -> Self {
        Self { pin, active_low: true }
    }

    pub fn is_active(&mut self) -> HalResult<bool> {
        Ok(level(&mut self.pin)? != self.active_low)
    }
}

/// Everything the data manager samples on each pass
pub trait MotorInputs {
    fn neutral(&mut self) -> HalResult<bool>;
    fn start(&mut self) -> HalResult<bool>;
    fn buzzer(&mut self) -> HalResult<bool>;
    fn red_wire(&mut self) -> HalResult<TriState>;
    fn orange_wire(&mut self) -> HalResult<TriState>;
    /// Raw battery ADC sample
    fn vbat_raw(&mut self) -> HalResult<u16>;
}

/// [`MotorInputs`] wired to pins and an ADC channel.
///
/// The neutral switch pulls its line low when engaged; start and buzzer
/// are active high.
pub struct MotorInputPins<P, A> {
    pub neutral: SwitchInput<P>,
    pub start: SwitchInput<P>,
    pub buzzer: SwitchInput<P>,
    pub red: TriStateInput<P>,
    pub orange: TriStateInput<P>,
    pub vbat: A,
}

impl<P: InputPin, A: AdcChannel> MotorInputPins<P, A> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        neutral: P,
        start: P,
        buzzer: P,
        red: (P, P),
        orange: (P, P),
        vbat: A,
    ) -> Self {
        Self {
            neutral: SwitchInput::active_low(neutral),
            start: SwitchInput::active_high(start),
            buzzer: SwitchInput::active_high(buzzer),
            red: TriStateInput::new(red.0, red.1),
            orange: TriStateInput::new(orange.0, orange.1),
            vbat,
        }
    }
}

impl<P: InputPin, A: AdcChannel> MotorInputs for MotorInputPins<P, A> {
    fn neutral(&mut self) -> HalResult<bool> {
        self.neutral.is_active()
    }

    fn start(&mut self) -> HalResult<bool> {
        self.start.is_active()
    }

    fn buzzer(&mut self) -> HalResult<bool> {
        self.buzzer.is_active()
    }

    fn red_wire(&mut self) -> HalResult<TriState> {
        self.red.read()
    }

    fn orange_wire(&mut self) -> HalResult<TriState> {
        self.orange.read()
    }

    fn vbat_raw(&mut self) -> HalResult<u16> {
        self.vbat.read_raw()
    }
}
