//! SSD1306 frame buffer in the controller's page layout

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Pixel, Size};

pub const WIDTH: usize = 128;
pub const HEIGHT: usize = 64;
pub const PAGES: usize = HEIGHT / 8;

/// 128x64 one-bit image. Each page is eight pixel rows; bit `n` of a
/// column byte is row `8 * page + n`, as in the controller's GDDRAM.
#[derive(Clone)]
pub struct Framebuffer {
    pages: [[u8; WIDTH]; PAGES],
}

impl Framebuffer {
    pub const fn new() -> Self {
        Self {
            pages: [[0; WIDTH]; PAGES],
        }
    }

    pub fn clear(&mut self) {
        self.pages = [[0; WIDTH]; PAGES];
    }

    /// Out-of-range coordinates are ignored
    pub fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        if x >= WIDTH || y >= HEIGHT {
            return;
        }
        let bit = 1 << (y % 8);
        let byte = &mut self.pages[y / 8][x];
        if on {
            *byte |= bit;
        } else {
            *byte &= !bit;
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < WIDTH && y < HEIGHT && self.pages[y / 8][x] & (1 << (y % 8)) != 0
    }

    pub fn page(&self, page: usize) -> &[u8; WIDTH] {
        &self.pages[page]
    }

    pub fn lit_pixels(&self) -> u32 {
        self.pages
            .iter()
            .flatten()
            .map(|b| b.count_ones())
            .sum()
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set_pixel(point.x as usize, point.y as usize, color.is_on());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_layout() {
        let mut fb = Framebuffer::new();
        fb.set_pixel(5, 0, true);
        fb.set_pixel(5, 7, true);
        fb.set_pixel(127, 63, true);
        assert_eq!(fb.page(0)[5], 0b1000_0001);
        assert_eq!(fb.page(7)[127], 0b1000_0000);
        assert!(fb.pixel(127, 63));
        assert_eq!(fb.lit_pixels(), 3);

        fb.set_pixel(5, 7, false);
        assert_eq!(fb.page(0)[5], 0b0000_0001);
        fb.set_pixel(128, 0, true);
        fb.set_pixel(0, 64, true);
        assert_eq!(fb.lit_pixels(), 2);
    }

    #[test]
    fn test_draw_target_clips() {
        use embedded_graphics::prelude::Point;

        let mut fb = Framebuffer::new();
        fb.draw_iter([
            Pixel(Point::new(-1, 3), BinaryColor::On),
            Pixel(Point::new(3, 3), BinaryColor::On),
            Pixel(Point::new(200, 3), BinaryColor::On),
        ])
        .ok();
        assert_eq!(fb.lit_pixels(), 1);
        assert!(fb.pixel(3, 3));
    }
}
