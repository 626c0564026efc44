//! 8-bit RGBA output image.
//!
//! Rows are stored bottom-up (the preview blit convention): reading
//! pixel (x, 0) addresses the top image row via `(H-1-y)*W + x`.

use bokeh_math::{Vec3, Vec4};

pub type PixelColor = [u8; 4];

#[derive(Debug, Clone)]
pub struct Image {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Image {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; (width * height * 4) as usize],
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width);
        debug_assert!(y < self.height);
        (((self.height - y - 1) * self.width + x) * 4) as usize
    }

    pub fn pixel(&self, x: u32, y: u32) -> PixelColor {
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    pub fn pixelf(&self, x: u32, y: u32) -> Vec4 {
        let [r, g, b, a] = self.pixel(x, y);
        Vec4::new(floatval(r), floatval(g), floatval(b), floatval(a))
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: PixelColor) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&color);
    }

    pub fn set_pixelf(&mut self, x: u32, y: u32, color: Vec4) {
        self.set_pixel(x, y, charvec(color));
    }

    /// Fill a rectangle, clipped to the image bounds.
    pub fn set_pixel_range(&mut self, x0: u32, y0: u32, width: u32, height: u32, color: PixelColor) {
        let x1 = (x0 + width).min(self.width);
        let y1 = (y0 + height).min(self.height);
        for y in y0..y1 {
            for x in x0..x1 {
                self.set_pixel(x, y, color);
            }
        }
    }

    pub fn set_pixel_rangef(&mut self, x0: u32, y0: u32, width: u32, height: u32, color: Vec4) {
        self.set_pixel_range(x0, y0, width, height, charvec(color));
    }

    pub fn clear_to_color(&mut self, color: PixelColor) {
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    pub fn num_pixels(&self) -> usize {
        (self.width * self.height) as usize
    }

    /// The raw bottom-up RGBA buffer handed to the preview blit.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// A top-down RGBA copy for file encoders.
    pub fn topdown_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len());
        for y in 0..self.height {
            for x in 0..self.width {
                out.extend_from_slice(&self.pixel(x, y));
            }
        }
        out
    }
}

fn charval(x: f32) -> u8 {
    (255.0 * x.clamp(0.0, 1.0)) as u8
}

fn floatval(x: u8) -> f32 {
    x as f32 / 255.0
}

fn charvec(color: Vec4) -> PixelColor {
    [
        charval(color.x),
        charval(color.y),
        charval(color.z),
        charval(color.w),
    ]
}

/// Convenience conversion from a traced color to an opaque pixel.
pub(crate) fn color_to_pixel(color: Vec3) -> PixelColor {
    charvec(color.extend(1.0))
}
