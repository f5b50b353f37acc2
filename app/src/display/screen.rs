//! Dashboard layout

use core::fmt::Write;

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use heapless::String;

use super::framebuffer::Framebuffer;
use crate::events::MotorData;
use crate::fault::FaultRecord;

/// Text rows on the 64-pixel panel
pub const ROWS: usize = 6;
const ROW_HEIGHT: i32 = 10;

type Line = String<24>;

/// `v` hundredths as a decimal with two places
fn hundredths(out: &mut Line, v: i16) {
    let sign = if v < 0 { "-" } else { "" };
    let a = i32::from(v).abs();
    let _ = write!(out, "{}{}.{:02}", sign, a / 100, a % 100);
}

/// Text of each row, top to bottom
pub fn lines(motor: Option<&MotorData>, fault: Option<&FaultRecord>) -> [Line; ROWS] {
    let mut rows: [Line; ROWS] = Default::default();
    match motor {
        Some(m) => {
            let _ = rows[0].push_str("P ");
            hundredths(&mut rows[0], m.pressure);
            let _ = rows[0].push_str(" psi");

            let _ = rows[1].push_str("T ");
            hundredths(&mut rows[1], m.temperature);
            let _ = rows[1].push_str(" C");

            let _ = write!(rows[2], "RPM {} V ", m.tachometer);
            hundredths(&mut rows[2], m.vbat);

            let _ = write!(
                rows[3],
                "N{} S{} B{}",
                u8::from(m.neutral),
                u8::from(m.start),
                u8::from(m.buzzer)
            );
            let _ = write!(rows[4], "RED {} ORG {}", m.red.as_str(), m.orange.as_str());
        }
        None => {
            let _ = rows[0].push_str("Waiting for data");
        }
    }
    match fault {
        Some(f) if !f.is_none() => {
            let _ = write!(rows[5], "FAULT {} x{}", f.code, f.count);
        }
        _ => {
            let _ = rows[5].push_str("NO FAULTS");
        }
    }
    rows
}

/// Redraw the whole screen
pub fn render(fb: &mut Framebuffer, motor: Option<&MotorData>, fault: Option<&FaultRecord>) {
    fb.clear();
    let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    for (row, line) in lines(motor, fault).iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let origin = Point::new(0, row as i32 * ROW_HEIGHT);
        Text::with_baseline(line, origin, style, Baseline::Top)
            .draw(fb)
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultId;
    use ecu_hal::TriState;

    fn data() -> MotorData {
        MotorData {
            temperature: 2350,
            pressure: -5,
            tachometer: 1200,
            vbat: 1260,
            start: true,
            neutral: false,
            buzzer: false,
            red: TriState::Low,
            orange: TriState::HighZ,
        }
    }

    #[test]
    fn test_lines() {
        let fault = FaultRecord {
            id: FaultId::DisplayI2c,
            code: 101,
            count: 2,
            ..FaultRecord::none()
        };
        let rows = lines(Some(&data()), Some(&fault));
        assert_eq!(rows[0].as_str(), "P -0.05 psi");
        assert_eq!(rows[1].as_str(), "T 23.50 C");
        assert_eq!(rows[2].as_str(), "RPM 1200 V 12.60");
        assert_eq!(rows[3].as_str(), "N0 S1 B0");
        assert_eq!(rows[4].as_str(), "RED LOW ORG HIGH_Z");
        assert_eq!(rows[5].as_str(), "FAULT 101 x2");
    }

    #[test]
    fn test_no_data() {
        let rows = lines(None, None);
        assert_eq!(rows[0].as_str(), "Waiting for data");
        assert!(rows[1].is_empty());
        assert_eq!(rows[5].as_str(), "NO FAULTS");
    }

    #[test]
    fn test_render_lights_only_text_rows() {
        let mut fb = Framebuffer::new();
        fb.set_pixel(127, 63, true);
        render(&mut fb, None, None);
        assert!(fb.lit_pixels() > 0);
        // rows 1..=4 are blank without data
        for page in 2..5 {
            assert!(fb.page(page).iter().all(|b| *b == 0));
        }
        assert!(!fb.pixel(127, 63));
    }
}
