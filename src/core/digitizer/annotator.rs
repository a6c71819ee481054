//! 调试叠加层：只往调用方的画布上画，不读取也不改变识别结果

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};

use super::config::DigitizerConfig;
use super::geometry::PixelRect;
use super::pipeline::FrameAnalysis;
use super::segments::{Segment, SegmentPattern};

const GUIDE: Rgba<u8> = Rgba([255, 128, 0, 255]);
const ROI: Rgba<u8> = Rgba([255, 255, 0, 255]);
const REGION: Rgba<u8> = Rgba([0, 255, 0, 255]);
const CELL_OK: Rgba<u8> = Rgba([255, 0, 255, 255]);
const CELL_BAD: Rgba<u8> = Rgba([128, 0, 0, 255]);
const CANDIDATE: Rgba<u8> = Rgba([0, 255, 255, 255]);
const READING: Rgba<u8> = Rgba([255, 0, 0, 255]);

pub struct DebugAnnotator {
    min_height_fraction: f32,
    max_height_fraction: f32,
}

impl DebugAnnotator {
    pub fn new(config: &DigitizerConfig) -> Self {
        Self {
            min_height_fraction: config.min_height_fraction,
            max_height_fraction: config.max_height_fraction,
        }
    }

    /// `analysis` 中的坐标都是整帧坐标，画布尺寸由调用方保证与帧一致
    pub fn annotate(&self, canvas: &mut RgbaImage, analysis: &FrameAnalysis, reading: Option<&str>) {
        self.draw_guides(canvas, &analysis.roi);

        if let Some(region) = &analysis.region {
            outline(canvas, region, REGION);
        }
        for cell in &analysis.cells {
            let color = if cell.is_recognized() { CELL_OK } else { CELL_BAD };
            outline(canvas, &cell.rect, color);
        }

        let glyph_height = (canvas.height() / 12).max(8);
        if let Some(candidate) = &analysis.candidate {
            let y = canvas.height().saturating_sub(glyph_height + glyph_height / 4);
            draw_digits(canvas, candidate, glyph_height / 4, y, glyph_height, CANDIDATE);
        }
        if let Some(reading) = reading {
            draw_digits(canvas, reading, glyph_height / 4, glyph_height / 4, glyph_height, READING);
        }
    }

    /// ROI 外框，以及面板期望高度的上下限（居中的两条横带）
    fn draw_guides(&self, canvas: &mut RgbaImage, roi: &PixelRect) {
        outline(canvas, roi, ROI);
        for fraction in [self.min_height_fraction, self.max_height_fraction] {
            let band = (roi.height as f32 * fraction).round() as u32;
            let y = roi.y + (roi.height.saturating_sub(band)) / 2;
            outline(canvas, &PixelRect::new(roi.x, y, roi.width, band), GUIDE);
        }
    }
}

fn outline(canvas: &mut RgbaImage, rect: &PixelRect, color: Rgba<u8>) {
    let clipped = rect.clamp_to(canvas.width(), canvas.height());
    if let Some(r) = clipped.to_imageproc() {
        draw_hollow_rect_mut(canvas, r, color);
    }
}

fn fill(canvas: &mut RgbaImage, rect: &PixelRect, color: Rgba<u8>) {
    let clipped = rect.clamp_to(canvas.width(), canvas.height());
    if let Some(r) = clipped.to_imageproc() {
        draw_filled_rect_mut(canvas, r, color);
    }
}

/// 用七段字形画数字串，非数字字符留空位
pub fn draw_digits(canvas: &mut RgbaImage, text: &str, x: u32, y: u32, height: u32, color: Rgba<u8>) {
    let width = (height as f32 * 0.55).round().max(3.0) as u32;
    let thickness = (height / 8).max(1);
    let pitch = width + thickness * 2;

    for (i, ch) in text.chars().enumerate() {
        let Some(pattern) = ch.to_digit(10).and_then(|d| SegmentPattern::for_digit(d as u8)) else {
            continue;
        };
        let cell = PixelRect::new(x + i as u32 * pitch, y, width, height);
        for segment in Segment::ALL {
            if pattern.contains(segment) {
                fill(canvas, &segment.glyph_rect(cell, thickness), color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::digitizer::classifier::CellReading;

    fn count(canvas: &RgbaImage, color: Rgba<u8>) -> usize {
        canvas.pixels().filter(|p| **p == color).count()
    }

    fn analysis() -> FrameAnalysis {
        FrameAnalysis {
            roi: PixelRect::new(20, 10, 80, 80),
            region: Some(PixelRect::new(30, 40, 60, 20)),
            cells: vec![
                CellReading {
                    index: 0,
                    rect: PixelRect::new(30, 40, 12, 20),
                    pattern: SegmentPattern::for_digit(8).unwrap(),
                    digit: Some(8),
                    confidence: 0.5,
                },
                CellReading {
                    index: 1,
                    rect: PixelRect::new(50, 40, 12, 20),
                    pattern: SegmentPattern::EMPTY,
                    digit: None,
                    confidence: 0.5,
                },
            ],
            candidate: None,
        }
    }

    #[test]
    fn test_draws_region_and_cells() {
        let mut canvas = RgbaImage::new(120, 100);
        let annotator = DebugAnnotator::new(&DigitizerConfig::default());
        annotator.annotate(&mut canvas, &analysis(), None);

        assert!(count(&canvas, ROI) > 0);
        assert!(count(&canvas, GUIDE) > 0);
        assert!(count(&canvas, REGION) > 0);
        assert!(count(&canvas, CELL_OK) > 0);
        assert!(count(&canvas, CELL_BAD) > 0);
        assert_eq!(count(&canvas, CANDIDATE), 0);
    }

    #[test]
    fn test_draws_candidate_and_reading() {
        let mut canvas = RgbaImage::new(120, 100);
        let mut a = analysis();
        a.candidate = Some("0512".into());
        DebugAnnotator::new(&DigitizerConfig::default()).annotate(&mut canvas, &a, Some("0512"));
        assert!(count(&canvas, CANDIDATE) > 0);
        // top bar of the leading "0", drawn in the top-left corner
        assert_eq!(canvas.get_pixel(3, 2), &READING);
    }

    #[test]
    fn test_rects_outside_canvas_are_clipped() {
        let mut canvas = RgbaImage::new(16, 16);
        let a = FrameAnalysis {
            roi: PixelRect::new(10, 10, 40, 40),
            region: Some(PixelRect::new(100, 100, 5, 5)),
            cells: Vec::new(),
            candidate: Some("88888888".into()),
        };
        DebugAnnotator::new(&DigitizerConfig::default()).annotate(&mut canvas, &a, Some("1"));
        assert_eq!(count(&canvas, REGION), 0);
    }

    #[test]
    fn test_draw_digits_skips_non_digits() {
        let mut canvas = RgbaImage::new(60, 20);
        draw_digits(&mut canvas, "-", 0, 0, 16, CANDIDATE);
        assert_eq!(count(&canvas, CANDIDATE), 0);
        draw_digits(&mut canvas, "1", 0, 0, 16, CANDIDATE);
        assert!(count(&canvas, CANDIDATE) > 0);
    }
}
