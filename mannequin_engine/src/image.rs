//! In-memory RGBA8 image and pixel transforms
//!
//! Loaded or generated texture content lives here before it is uploaded to
//! the GPU. The recoloring transforms operate in place so a texture can be
//! recolored without re-reading its source file.

use std::path::Path;

use glam::Vec3;

use crate::error::{Error, Result};
use crate::engine_debug;

/// In-memory RGBA8 image
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Tightly packed RGBA8 pixel bytes (width * height * 4)
    pub pixels: Vec<u8>,
}

/// Convert a normalized channel to its 8-bit value
pub(crate) fn channel_to_u8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Hue of a color in degrees, None when the color is a grey (hue undefined)
fn hue_degrees(color: Vec3) -> Option<f32> {
    let r = color.x.clamp(0.0, 1.0);
    let g = color.y.clamp(0.0, 1.0);
    let b = color.z.clamp(0.0, 1.0);

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    if delta <= f32::EPSILON {
        return None;
    }

    let h = if max == r {
        60.0 * ((g - b) / delta)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    Some(if h < 0.0 { h + 360.0 } else { h })
}

impl ImageData {
    /// Load and decode an image file, converting to RGBA8
    ///
    /// Any format supported by the `image` crate is accepted.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotFound(path.display().to_string()));
        }

        let decoded = image::open(path)
            .map_err(|e| Error::Parse(format!("{}: {}", path.display(), e)))?
            .to_rgba8();

        let (width, height) = decoded.dimensions();
        engine_debug!("mannequin::ImageData", "Load: {} ({}x{})",
            path.display(), width, height);

        Ok(Self {
            width,
            height,
            pixels: decoded.into_raw(),
        })
    }

    /// Build a 1x1 image filled with the given color (alpha 255)
    pub fn solid(color: Vec3) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![
                channel_to_u8(color.x),
                channel_to_u8(color.y),
                channel_to_u8(color.z),
                255,
            ],
        }
    }

    /// Wrap existing RGBA8 bytes
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(Error::InvalidResource(format!(
                "pixel buffer is {} bytes, {}x{} RGBA8 needs {}",
                pixels.len(), width, height, expected
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// Size in bytes of the pixel buffer
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    // ===== PIXEL TRANSFORMS =====

    /// Replace every pixel's hue with the hue of `color`, preserving each
    /// pixel's own value and saturation. A grey target desaturates the image
    /// while keeping luminance. Alpha is untouched.
    pub fn to_constant_hue(&mut self, color: Vec3) {
        let hue = hue_degrees(color);

        // Constant per call: the HSV sector and in-sector position of the
        // target hue.
        let (hue_index, hue_diff) = match hue {
            Some(h) => {
                let hue60 = h / 60.0;
                ((hue60.floor() as i32).rem_euclid(6), hue60 - hue60.floor())
            }
            None => (0, 0.0),
        };

        let px: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut self.pixels);
        for p in px.iter_mut() {
            let r = p[0] as f32 / 256.0;
            let g = p[1] as f32 / 256.0;
            let b = p[2] as f32 / 256.0;

            let value = r.max(g).max(b);
            let delta = value - r.min(g).min(b);

            let (pp, qq, tt) = if hue.is_none() {
                (value, value, value)
            } else {
                let sat = if value == 0.0 { 0.0 } else { delta / value };
                (
                    value * (1.0 - sat),
                    value * (1.0 - hue_diff * sat),
                    value * (1.0 - (1.0 - hue_diff) * sat),
                )
            };

            let (nr, ng, nb) = match hue_index {
                0 => (value, tt, pp),
                1 => (qq, value, pp),
                2 => (pp, value, tt),
                3 => (pp, qq, value),
                4 => (tt, pp, value),
                _ => (value, pp, qq),
            };

            p[0] = (nr * 256.0).min(255.0) as u8;
            p[1] = (ng * 256.0).min(255.0) as u8;
            p[2] = (nb * 256.0).min(255.0) as u8;
        }
    }

    /// Multiply each pixel's RGB channels by the channels of `color`.
    /// Alpha is untouched.
    pub fn multiply_rgb(&mut self, color: Vec3) {
        let mult = [
            color.x.clamp(0.0, 1.0),
            color.y.clamp(0.0, 1.0),
            color.z.clamp(0.0, 1.0),
        ];

        let px: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut self.pixels);
        for p in px.iter_mut() {
            for c in 0..3 {
                p[c] = (p[c] as f32 * mult[c]).min(255.0) as u8;
            }
        }
    }

    /// Desaturate keeping luminance, then multiply by `color`
    pub fn grey_to_color(&mut self, color: Vec3) {
        self.to_constant_hue(Vec3::ONE);
        self.multiply_rgb(color);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "image_tests.rs"]
mod tests;
