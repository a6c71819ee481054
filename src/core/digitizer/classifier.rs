//! 段判定：每位数字按比例取七个采样窗，前景密度减去格内背景密度后与阈值比较，再查表解码

use log::debug;

use super::config::DigitizerConfig;
use super::geometry::PixelRect;
use super::preprocess::BinaryFrame;
use super::segmenter::{DigitCell, Segmentation};
use super::segments::{Segment, SegmentPattern, BACKGROUND_WINDOWS};

/// 一位数字的判定结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellReading {
    pub index: usize,
    pub rect: PixelRect,
    pub pattern: SegmentPattern,
    /// None：组合不在表中，或某段的判定离阈值太近
    pub digit: Option<u8>,
    /// 七段中离阈值最近的那一段的距离
    pub confidence: f32,
}

impl CellReading {
    pub fn is_recognized(&self) -> bool {
        self.digit.is_some()
    }
}

pub struct SegmentClassifier {
    lit_threshold: f32,
    min_confidence_margin: f32,
}

impl SegmentClassifier {
    pub fn new(config: &DigitizerConfig) -> Self {
        Self {
            lit_threshold: config.lit_threshold,
            min_confidence_margin: config.min_confidence_margin,
        }
    }

    pub fn classify_cell(&self, binary: &BinaryFrame, cell: &DigitCell) -> CellReading {
        let background = cell_background(binary, &cell.rect);

        let mut pattern = SegmentPattern::EMPTY;
        let mut confidence = f32::MAX;
        for segment in Segment::ALL {
            let (x0, y0, x1, y1) = segment.sample_window();
            let window = cell.rect.fraction(x0, y0, x1, y1);
            let contrast = binary.density(&window) - background;
            if contrast >= self.lit_threshold {
                pattern.insert(segment);
            }
            confidence = confidence.min((contrast - self.lit_threshold).abs());
        }

        let digit = if confidence < self.min_confidence_margin {
            None
        } else {
            pattern.decode()
        };

        debug!(
            "classifier: cell {} bits={:07b} digit={:?} confidence={:.2}",
            cell.index,
            pattern.bits(),
            digit,
            confidence
        );

        CellReading {
            index: cell.index,
            rect: cell.rect,
            pattern,
            digit,
            confidence,
        }
    }

    /// 返回每个已分割位的判定，以及整帧的候选读数；任何一位缺失或无法识别则无候选
    pub fn classify(
        &self,
        binary: &BinaryFrame,
        segmentation: &Segmentation,
    ) -> (Vec<CellReading>, Option<String>) {
        let readings: Vec<CellReading> = segmentation
            .resolved()
            .map(|cell| self.classify_cell(binary, cell))
            .collect();

        if segmentation.partial || segmentation.cells.is_empty() {
            return (readings, None);
        }

        let candidate: Option<String> = readings
            .iter()
            .map(|r| r.digit.map(|d| char::from(b'0' + d)))
            .collect();

        (readings, candidate)
    }
}

/// 两个“孔”窗口的平均前景密度
fn cell_background(binary: &BinaryFrame, cell: &PixelRect) -> f32 {
    let total: f32 = BACKGROUND_WINDOWS
        .iter()
        .map(|&(x0, y0, x1, y1)| binary.density(&cell.fraction(x0, y0, x1, y1)))
        .sum();
    total / BACKGROUND_WINDOWS.len() as f32
}
