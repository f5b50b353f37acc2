//! Board configuration

use ecu_hal::VbatCalibration;
use qp_qf::{QDuration, QPriority};

/// Scheduling parameters of one active object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActiveConfig {
    pub priority: u8,
    pub queue_capacity: usize,
}

impl ActiveConfig {
    pub const fn new(priority: u8, queue_capacity: usize) -> Self {
        Self {
            priority,
            queue_capacity,
        }
    }

    /// The priority as the framework type; out-of-range values are fatal
    pub fn prio(&self) -> QPriority {
        match QPriority::new(self.priority) {
            Ok(p) => p,
            Err(e) => qp_qf::q_fatal(e, "ActiveConfig::prio"),
        }
    }
}

/// Linear transfer function of the MPRLS pressure sensor.
///
/// Counts between `output_min` and `output_max` map onto `p_min..=p_max`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PressureCalibration {
    pub output_min: u32,
    pub output_max: u32,
    pub p_min: f64,
    pub p_max: f64,
}

impl PressureCalibration {
    pub fn pressure(&self, counts: u32) -> f64 {
        let span = f64::from(self.output_max) - f64::from(self.output_min);
        (f64::from(counts) - f64::from(self.output_min)) * (self.p_max - self.p_min) / span
            + self.p_min
    }
}

impl Default for PressureCalibration {
    /// 10% to 90% of the 24-bit output range over 0..=30 psi
    fn default() -> Self {
        Self {
            output_min: 1_677_722,
            output_max: 15_099_494,
            p_min: 0.0,
            p_max: 30.0,
        }
    }
}

/// Input-capture clock and pulses per crank revolution
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TachCalibration {
    pub capture_clock_hz: f32,
    pub pulses_per_revolution: f32,
}

impl TachCalibration {
    /// RPM for a capture period of `width` clock ticks; zero means stalled
    pub fn rpm(&self, width: u32) -> i16 {
        if width == 0 {
            return 0;
        }
        let hz = self.capture_clock_hz / width as f32;
        // float-to-int casts saturate
        (hz * 60.0 / self.pulses_per_revolution) as i16
    }
}

impl Default for TachCalibration {
    fn default() -> Self {
        Self {
            capture_clock_hz: 2_000_000.0,
            pulses_per_revolution: 6.666,
        }
    }
}

/// Everything that differs between boards and test setups.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EcuConfig {
    pub shared_i2c: ActiveConfig,
    pub tachometer: ActiveConfig,
    pub pressure: ActiveConfig,
    pub temperature: ActiveConfig,
    pub data_manager: ActiveConfig,
    pub display: ActiveConfig,

    pub display_refresh: QDuration,
    pub pressure_sample: QDuration,
    pub pressure_watchdog: QDuration,
    pub temperature_poll: QDuration,
    pub data_sample: QDuration,

    pub pressure_cal: PressureCalibration,
    pub tach_cal: TachCalibration,
    pub vbat_cal: VbatCalibration,
    pub tach_lambda: f32,
    pub vbat_lambda: f32,
}

impl Default for EcuConfig {
    fn default() -> Self {
        Self {
            shared_i2c: ActiveConfig::new(6, 8),
            tachometer: ActiveConfig::new(5, 8),
            pressure: ActiveConfig::new(4, 6),
            temperature: ActiveConfig::new(3, 4),
            data_manager: ActiveConfig::new(2, 8),
            display: ActiveConfig::new(1, 8),
            display_refresh: QDuration::from_millis(100),
            pressure_sample: QDuration::from_millis(10),
            pressure_watchdog: QDuration::from_secs(1),
            temperature_poll: QDuration::from_millis(10),
            data_sample: QDuration::from_millis(10),
            pressure_cal: PressureCalibration::default(),
            tach_cal: TachCalibration::default(),
            vbat_cal: VbatCalibration::default(),
            tach_lambda: 0.9,
            vbat_lambda: 0.99,
        }
    }
}

impl EcuConfig {
    pub fn builder() -> EcuConfigBuilder {
        EcuConfigBuilder::default()
    }

    /// Every active object's scheduling parameters, highest priority first
    pub fn actives(&self) -> [(&'static str, ActiveConfig); 6] {
        [
            ("shared_i2c", self.shared_i2c),
            ("tachometer", self.tachometer),
            ("pressure", self.pressure),
            ("temperature", self.temperature),
            ("data_manager", self.data_manager),
            ("display", self.display),
        ]
    }

    /// True when no two active objects share a priority and every
    /// priority is valid
    pub fn priorities_unique(&self) -> bool {
        let actives = self.actives();
        actives.iter().enumerate().all(|(i, (_, a))| {
            QPriority::new(a.priority).is_ok()
                && actives[i + 1..].iter().all(|(_, b)| b.priority != a.priority)
        })
    }
}

/// Builder for [`EcuConfig`]
#[derive(Debug, Clone, Default)]
pub struct EcuConfigBuilder {
    config: EcuConfig,
}

impl EcuConfigBuilder {
    pub fn shared_i2c(mut self, priority: u8, queue_capacity: usize) -> Self {
        self.config.shared_i2c = ActiveConfig::new(priority, queue_capacity);
        self
    }

    pub fn tachometer(mut self, priority: u8, queue_capacity: usize) -> Self {
        self.config.tachometer = ActiveConfig::new(priority, queue_capacity);
        self
    }

    pub fn pressure(mut self, priority: u8, queue_capacity: usize) -> Self {
        self.config.pressure = ActiveConfig::new(priority, queue_capacity);
        self
    }

    pub fn temperature(mut self, priority: u8, queue_capacity: usize) -> Self {
        self.config.temperature = ActiveConfig::new(priority, queue_capacity);
        self
    }

    pub fn data_manager(mut self, priority: u8, queue_capacity: usize) -> Self {
        self.config.data_manager = ActiveConfig::new(priority, queue_capacity);
        self
    }

    pub fn display(mut self, priority: u8, queue_capacity: usize) -> Self {
        self.config.display = ActiveConfig::new(priority, queue_capacity);
        self
    }

    /// Period of the display redraw
    pub fn display_refresh(mut self, period: QDuration) -> Self {
        self.config.display_refresh = period;
        self
    }

    /// Delay between measurement command and readout, and between samples
    pub fn pressure_sample(mut self, period: QDuration) -> Self {
        self.config.pressure_sample = period;
        self
    }

    /// Window in which the pressure sensor must deliver a valid reading
    pub fn pressure_watchdog(mut self, window: QDuration) -> Self {
        self.config.pressure_watchdog = window;
        self
    }

    pub fn temperature_poll(mut self, period: QDuration) -> Self {
        self.config.temperature_poll = period;
        self
    }

    pub fn data_sample(mut self, period: QDuration) -> Self {
        self.config.data_sample = period;
        self
    }

    pub fn pressure_calibration(mut self, cal: PressureCalibration) -> Self {
        self.config.pressure_cal = cal;
        self
    }

    pub fn tach_calibration(mut self, cal: TachCalibration) -> Self {
        self.config.tach_cal = cal;
        self
    }

    pub fn vbat_calibration(mut self, cal: VbatCalibration) -> Self {
        self.config.vbat_cal = cal;
        self
    }

    /// Smoothing factors `λ` of the tachometer and battery filters
    pub fn filters(mut self, tach_lambda: f32, vbat_lambda: f32) -> Self {
        self.config.tach_lambda = tach_lambda;
        self.config.vbat_lambda = vbat_lambda;
        self
    }

    pub fn build(self) -> EcuConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_calibration_endpoints_are_exact() {
        let cal = PressureCalibration::default();
        assert_eq!(cal.pressure(cal.output_min), cal.p_min);
        assert_eq!(cal.pressure(cal.output_max), cal.p_max);
        let mid = (cal.output_min + cal.output_max) / 2;
        assert!((cal.pressure(mid) - 15.0).abs() < 1e-5);
    }

    #[test]
    fn test_tach_rpm() {
        let cal = TachCalibration::default();
        assert_eq!(cal.rpm(0), 0);
        // 100 Hz pulse train
        assert_eq!(cal.rpm(20_000), (6000.0f32 / 6.666) as i16);
        // a single tick would be far above i16::MAX
        assert_eq!(cal.rpm(1), i16::MAX);
    }

    #[test]
    fn test_builder_overrides_defaults() {
        let config = EcuConfig::builder()
            .display(9, 4)
            .pressure_watchdog(QDuration::from_millis(250))
            .filters(0.5, 0.5)
            .build();
        assert_eq!(config.display, ActiveConfig::new(9, 4));
        assert_eq!(config.pressure_watchdog.as_millis(), 250);
        assert_eq!(config.tach_lambda, 0.5);
        assert_eq!(config.shared_i2c, EcuConfig::default().shared_i2c);
    }

    #[test]
    fn test_default_priorities_are_unique() {
        assert!(EcuConfig::default().priorities_unique());
        let clash = EcuConfig::builder().display(6, 4).build();
        assert!(!clash.priorities_unique());
    }
}
