//! Synthetic seven-segment panels for image-based unit tests.

use image::{GrayImage, Luma};

use super::geometry::PixelRect;
use super::segments::{Segment, SegmentPattern};

#[derive(Debug, Clone, Copy)]
pub(crate) struct PanelStyle {
    pub digit_width: u32,
    pub digit_height: u32,
    pub thickness: u32,
    pub gap: u32,
    pub background: u8,
    pub foreground: u8,
}

impl Default for PanelStyle {
    fn default() -> Self {
        Self {
            digit_width: 30,
            digit_height: 56,
            thickness: 7,
            gap: 10,
            background: 20,
            foreground: 230,
        }
    }
}

impl PanelStyle {
    /// Same panel seen at a different zoom.
    pub(crate) fn scaled(factor: f32) -> Self {
        let base = Self::default();
        let scale = |v: u32| ((v as f32 * factor).round() as u32).max(1);
        Self {
            digit_width: scale(base.digit_width),
            digit_height: scale(base.digit_height),
            thickness: scale(base.thickness),
            gap: scale(base.gap),
            ..base
        }
    }

    pub(crate) fn panel_width(&self, digits: usize) -> u32 {
        let n = digits as u32;
        n * self.digit_width + n.saturating_sub(1) * self.gap
    }
}

/// Render `text` as lit segments with the panel's top-left corner at `(x, y)`.
/// A space leaves its digit position dark.
pub(crate) fn render_panel(
    width: u32,
    height: u32,
    text: &str,
    x: u32,
    y: u32,
    style: &PanelStyle,
) -> GrayImage {
    let mut img = GrayImage::from_pixel(width, height, Luma([style.background]));
    draw_panel(&mut img, text, x, y, style);
    img
}

pub(crate) fn draw_panel(img: &mut GrayImage, text: &str, x: u32, y: u32, style: &PanelStyle) {
    let pitch = style.digit_width + style.gap;
    for (i, ch) in text.chars().enumerate() {
        let pattern = ch
            .to_digit(10)
            .and_then(|d| SegmentPattern::for_digit(d as u8))
            .unwrap_or(SegmentPattern::EMPTY);
        let cell = PixelRect::new(
            x + i as u32 * pitch,
            y,
            style.digit_width,
            style.digit_height,
        );
        for segment in Segment::ALL {
            if pattern.contains(segment) {
                fill(img, &segment.glyph_rect(cell, style.thickness), style.foreground);
            }
        }
    }
}

pub(crate) fn fill(img: &mut GrayImage, rect: &PixelRect, value: u8) {
    let r = rect.clamp_to(img.width(), img.height());
    for py in r.y..r.bottom() {
        for px in r.x..r.right() {
            img.put_pixel(px, py, Luma([value]));
        }
    }
}

/// Add a left-to-right brightness ramp of `amount` grey levels, saturating.
pub(crate) fn add_ramp(img: &mut GrayImage, amount: u8) {
    let width = img.width().max(1);
    for (x, _, p) in img.enumerate_pixels_mut() {
        let delta = (x * amount as u32 / width) as u8;
        p[0] = p[0].saturating_add(delta);
    }
}

/// Uniform noise in `[-amplitude, amplitude]` from a seeded xorshift, saturating.
pub(crate) fn add_noise(img: &mut GrayImage, amplitude: u8, seed: u32) {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    let span = 2 * amplitude as u32 + 1;
    for p in img.pixels_mut() {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let delta = (state % span) as i32 - amplitude as i32;
        p[0] = (p[0] as i32 + delta).clamp(0, 255) as u8;
    }
}

/// Frame of `width` x `height` with the panel centred on it.
pub(crate) fn centered_frame(width: u32, height: u32, text: &str, style: &PanelStyle) -> GrayImage {
    let digits = text.chars().count();
    let x = width.saturating_sub(style.panel_width(digits)) / 2;
    let y = height.saturating_sub(style.digit_height) / 2;
    render_panel(width, height, text, x, y, style)
}

/// Frame of the size the pipeline tests use, with the panel inside the centre ROI.
pub(crate) fn scale_frame(text: &str) -> GrayImage {
    centered_frame(400, 300, text, &PanelStyle::default())
}
