//! ADC channel and battery voltage calibration

use crate::error::HalResult;

/// Single-ended ADC channel
pub trait AdcChannel {
    /// Read raw ADC value
    fn read_raw(&mut self) -> HalResult<u16>;
}

/// Linear transform from battery ADC counts to volts
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VbatCalibration {
    /// Counts at the ADC reference voltage
    pub adc_full_scale: f32,
    /// Reference voltage times the input divider ratio
    pub multiplier: f32,
}

impl VbatCalibration {
    pub fn volts(&self, raw: u16) -> f32 {
        raw as f32 / self.adc_full_scale * self.multiplier
    }
}

impl Default for VbatCalibration {
    fn default() -> Self {
        Self {
            adc_full_scale: 4096.0,
            multiplier: 4.3,
        }
    }
}
