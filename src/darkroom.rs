//! Viewer adjustments for a developed plate.
//!
//! Brightness, contrast and sepia are percentages; grain is a toggle. On
//! screen they are applied as a CSS filter over the unchanged plate
//! ([`Adjustments::css_filter`]). [`bake`] renders the same filter chain
//! into pixels for callers that explicitly ask for an adjusted export.
//!
//! ## Filter math
//!
//! Channels are normalized to `0.0..=1.0` and run through the chain in CSS
//! order, clamping after each step:
//!
//! | Step | Formula |
//! |---|---|
//! | `sepia(s)` | Filter Effects sepia matrix, interpolated by `s` |
//! | `contrast(c)` | `(v - 0.5) * c + 0.5` |
//! | `brightness(b)` | `v * b` |
//!
//! Grain adds a fixed, position-hashed luminance noise so a baked plate is
//! reproducible byte for byte.

use crate::capture::ImagePayload;
use crate::config::DarkroomConfig;
use image::{ImageFormat, RgbaImage};
use rayon::prelude::*;
use serde::Serialize;
use std::io::Cursor;
use std::ops::RangeInclusive;
use thiserror::Error;

pub const BRIGHTNESS_RANGE: RangeInclusive<u32> = 50..=150;
pub const CONTRAST_RANGE: RangeInclusive<u32> = 50..=150;
pub const SEPIA_RANGE: RangeInclusive<u32> = 0..=100;

/// Peak grain amplitude, in normalized channel units.
const GRAIN_AMPLITUDE: f32 = 0.08;

#[derive(Error, Debug)]
pub enum DarkroomError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Display settings for the result view. Never alters the stored plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Adjustments {
    brightness: u32,
    contrast: u32,
    sepia: u32,
    grain: bool,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            brightness: 100,
            contrast: 100,
            sepia: 0,
            grain: false,
        }
    }
}

fn clamp_to(value: u32, range: &RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}

impl Adjustments {
    /// Starting values from config, clamped into range.
    pub fn from_config(config: &DarkroomConfig) -> Self {
        let mut adj = Self::default();
        adj.set_brightness(config.brightness);
        adj.set_contrast(config.contrast);
        adj.set_sepia(config.sepia);
        adj.set_grain(config.grain);
        adj
    }

    pub fn brightness(&self) -> u32 {
        self.brightness
    }

    pub fn contrast(&self) -> u32 {
        self.contrast
    }

    pub fn sepia(&self) -> u32 {
        self.sepia
    }

    pub fn grain(&self) -> bool {
        self.grain
    }

    pub fn set_brightness(&mut self, percent: u32) {
        self.brightness = clamp_to(percent, &BRIGHTNESS_RANGE);
    }

    pub fn set_contrast(&mut self, percent: u32) {
        self.contrast = clamp_to(percent, &CONTRAST_RANGE);
    }

    pub fn set_sepia(&mut self, percent: u32) {
        self.sepia = clamp_to(percent, &SEPIA_RANGE);
    }

    pub fn set_grain(&mut self, on: bool) {
        self.grain = on;
    }

    pub fn toggle_grain(&mut self) {
        self.grain = !self.grain;
    }

    /// True when baking would leave every pixel untouched.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// The CSS `filter` value for the result view.
    pub fn css_filter(&self) -> String {
        format!(
            "sepia({}%) contrast({}%) brightness({}%)",
            self.sepia, self.contrast, self.brightness
        )
    }

    /// Apply sepia, contrast and brightness to one normalized RGB triple.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let rgb = sepia(rgb, self.sepia as f32 / 100.0);
        let c = self.contrast as f32 / 100.0;
        let rgb = rgb.map(|v| ((v - 0.5) * c + 0.5).clamp(0.0, 1.0));
        let b = self.brightness as f32 / 100.0;
        rgb.map(|v| (v * b).clamp(0.0, 1.0))
    }
}

fn sepia([r, g, b]: [f32; 3], amount: f32) -> [f32; 3] {
    let k = 1.0 - amount;
    let out = [
        (0.393 + 0.607 * k) * r + (0.769 - 0.769 * k) * g + (0.189 - 0.189 * k) * b,
        (0.349 - 0.349 * k) * r + (0.686 + 0.314 * k) * g + (0.168 - 0.168 * k) * b,
        (0.272 - 0.272 * k) * r + (0.534 - 0.534 * k) * g + (0.131 + 0.869 * k) * b,
    ];
    out.map(|v| v.clamp(0.0, 1.0))
}

/// Deterministic noise in `-1.0..=1.0` for a pixel position.
fn grain_noise(x: u32, y: u32) -> f32 {
    let mut h = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77);
    h ^= h >> 15;
    h = h.wrapping_mul(0x2C1B_3C6D);
    h ^= h >> 12;
    (h & 0xFFFF) as f32 / 32767.5 - 1.0
}

fn to_unit(v: u8) -> f32 {
    v as f32 / 255.0
}

fn to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Render `adjustments` into the plate's pixels and return a PNG.
///
/// Rows are processed in parallel. Alpha is preserved.
pub fn bake(plate: &ImagePayload, adjustments: &Adjustments) -> Result<ImagePayload, DarkroomError> {
    let mut img: RgbaImage = plate.decode()?.to_rgba8();
    let width = img.width() as usize;
    let adj = *adjustments;

    img.par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let mut rgb = adj.apply([to_unit(px[0]), to_unit(px[1]), to_unit(px[2])]);
                if adj.grain {
                    let n = grain_noise(x as u32, y as u32) * GRAIN_AMPLITUDE;
                    rgb = rgb.map(|v| (v + n).clamp(0.0, 1.0));
                }
                px[0] = to_byte(rgb[0]);
                px[1] = to_byte(rgb[1]);
                px[2] = to_byte(rgb[2]);
            }
        });

    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    tracing::debug!(filter = %adj.css_filter(), grain = adj.grain, "baked plate");
    Ok(ImagePayload::new("image/png", out.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::png_bytes;
    use image::{Rgba, RgbaImage};

    fn solid_png(rgba: [u8; 4]) -> ImagePayload {
        let img = RgbaImage::from_pixel(4, 4, Rgba(rgba));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        ImagePayload::new("image/png", out.into_inner())
    }

    fn first_pixel(payload: &ImagePayload) -> [u8; 4] {
        payload.decode().unwrap().to_rgba8().get_pixel(0, 0).0
    }

    #[test]
    fn defaults_are_neutral() {
        let adj = Adjustments::default();
        assert!(adj.is_identity());
        assert_eq!(adj.css_filter(), "sepia(0%) contrast(100%) brightness(100%)");
    }

    #[test]
    fn setters_clamp_to_slider_ranges() {
        let mut adj = Adjustments::default();
        adj.set_brightness(10);
        adj.set_contrast(400);
        adj.set_sepia(250);
        assert_eq!(adj.brightness(), 50);
        assert_eq!(adj.contrast(), 150);
        assert_eq!(adj.sepia(), 100);
    }

    #[test]
    fn toggle_grain_flips() {
        let mut adj = Adjustments::default();
        adj.toggle_grain();
        assert!(adj.grain());
        assert!(!adj.is_identity());
        adj.toggle_grain();
        assert!(!adj.grain());
    }

    #[test]
    fn from_config_clamps_values() {
        let config = DarkroomConfig {
            brightness: 200,
            contrast: 90,
            sepia: 40,
            grain: true,
        };
        let adj = Adjustments::from_config(&config);
        assert_eq!(adj.brightness(), 150);
        assert_eq!(adj.contrast(), 90);
        assert_eq!(adj.sepia(), 40);
        assert!(adj.grain());
        assert_eq!(adj.css_filter(), "sepia(40%) contrast(90%) brightness(150%)");
    }

    #[test]
    fn apply_identity_is_noop() {
        let adj = Adjustments::default();
        let out = adj.apply([0.2, 0.5, 0.9]);
        for (a, b) in out.iter().zip([0.2, 0.5, 0.9]) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn apply_contrast_stretches_around_midpoint() {
        let mut adj = Adjustments::default();
        adj.set_contrast(150);
        let out = adj.apply([0.25, 0.5, 0.75]);
        assert!((out[0] - 0.125).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert!((out[2] - 0.875).abs() < 1e-6);
    }

    #[test]
    fn bake_identity_preserves_pixels() {
        let plate = solid_png([10, 120, 240, 255]);
        let baked = bake(&plate, &Adjustments::default()).unwrap();
        assert_eq!(baked.mime_type(), "image/png");
        assert_eq!(first_pixel(&baked), [10, 120, 240, 255]);
    }

    #[test]
    fn bake_brightness_half_darkens() {
        let mut adj = Adjustments::default();
        adj.set_brightness(50);
        let baked = bake(&solid_png([200, 100, 50, 255]), &adj).unwrap();
        assert_eq!(first_pixel(&baked), [100, 50, 25, 255]);
    }

    #[test]
    fn bake_full_sepia_tints_white() {
        let mut adj = Adjustments::default();
        adj.set_sepia(100);
        let baked = bake(&solid_png([255, 255, 255, 255]), &adj).unwrap();
        assert_eq!(first_pixel(&baked), [255, 255, 239, 255]);
    }

    #[test]
    fn bake_keeps_alpha() {
        let mut adj = Adjustments::default();
        adj.set_brightness(150);
        let baked = bake(&solid_png([40, 40, 40, 77]), &adj).unwrap();
        assert_eq!(first_pixel(&baked)[3], 77);
    }

    #[test]
    fn bake_grain_is_deterministic() {
        let mut adj = Adjustments::default();
        adj.set_grain(true);
        let plate = ImagePayload::new("image/png", png_bytes(16, 16));
        let a = bake(&plate, &adj).unwrap();
        let b = bake(&plate, &adj).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, bake(&plate, &Adjustments::default()).unwrap());
    }

    #[test]
    fn bake_rejects_undecodable_plate() {
        let plate = ImagePayload::new("image/png", vec![0u8, 1, 2, 3]);
        assert!(bake(&plate, &Adjustments::default()).is_err());
    }
}
