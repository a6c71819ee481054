//! 数字分割：对面板做列投影，空白列即数字间隔

use log::debug;

use super::config::DigitizerConfig;
use super::geometry::PixelRect;
use super::locator::DisplayRegion;
use super::preprocess::BinaryFrame;

/// 垂直跨度小于面板高度此比例的列段（小数点、杂点）不算数字
const MIN_RUN_HEIGHT_FRACTION: f32 = 0.4;

/// 比典型宽度窄到此比例以下的列段才向左补齐
const NARROW_RUN_FRACTION: f32 = 0.8;

/// 行段宽度达到笔画粗细的这个倍数才算横段
const BAR_WIDTH_FACTOR: f32 = 1.5;

/// 一位数字在面板中的位置（从左到右的序号）和外接矩形
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DigitCell {
    pub index: usize,
    pub rect: PixelRect,
}

/// 分割结果。`cells` 长度等于期望位数，无法分出的位置为 None。
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub cells: Vec<Option<DigitCell>>,
    pub partial: bool,
}

impl Segmentation {
    fn empty(slots: usize) -> Self {
        Self {
            cells: vec![None; slots],
            partial: true,
        }
    }

    pub fn resolved(&self) -> impl Iterator<Item = &DigitCell> {
        self.cells.iter().flatten()
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnRun {
    start: u32,
    end: u32,
    top: u32,
    bottom: u32,
}

impl ColumnRun {
    fn width(&self) -> u32 {
        self.end - self.start
    }

    fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

pub struct DigitSegmenter {
    expected: Option<usize>,
    digit_aspect: f32,
}

impl DigitSegmenter {
    pub fn new(config: &DigitizerConfig) -> Self {
        Self {
            expected: config.expected_digits(),
            digit_aspect: config.digit_aspect,
        }
    }

    /// 每帧独立分割，不依赖上一帧结果
    pub fn segment(&self, binary: &BinaryFrame, region: &DisplayRegion) -> Segmentation {
        let area = restore_digit_height(
            binary,
            &region.rect.clamp_to(binary.width(), binary.height()),
        );
        let runs: Vec<ColumnRun> = column_runs(binary, &area)
            .into_iter()
            .filter(|r| r.width() >= 2)
            .filter(|r| r.height() as f32 >= area.height as f32 * MIN_RUN_HEIGHT_FRACTION)
            .collect();

        let slots = self.expected.unwrap_or(runs.len());
        if runs.is_empty() {
            debug!("segmenter: no digit columns in {:?}", area);
            return Segmentation::empty(slots);
        }
        if runs.len() > slots {
            debug!(
                "segmenter: {} column runs but {} digits expected",
                runs.len(),
                slots
            );
            return Segmentation::empty(slots);
        }

        // 缺左侧竖段的数字（1、3、7）列段偏窄，向左补齐到典型宽度
        let widest = runs.iter().map(ColumnRun::width).max().unwrap_or(0);
        let typical = widest.max((area.height as f32 * self.digit_aspect).round() as u32);

        let mut rects = Vec::with_capacity(runs.len());
        let mut previous_end = 0u32;
        for run in &runs {
            let start = if (run.width() as f32) < typical as f32 * NARROW_RUN_FRACTION {
                run.end.saturating_sub(typical).max(previous_end)
            } else {
                run.start
            };
            rects.push(PixelRect::new(start, area.y, run.end - start, area.height));
            previous_end = run.end;
        }

        // 位数不足时右对齐（秤的前导位通常熄灭），缺失位置留空
        let missing = slots - rects.len();
        let mut cells = vec![None; missing];
        cells.extend(rects.into_iter().enumerate().map(|(i, rect)| {
            Some(DigitCell {
                index: missing + i,
                rect,
            })
        }));

        Segmentation {
            cells,
            partial: missing > 0,
        }
    }
}

/// 只由 1、4、7 组成的读数没有底横（1、4 也没有顶横），外接框比数字矮一个笔画。
/// 用竖段宽度估计笔画粗细，顶/底缺横段时各补一个笔画。
fn restore_digit_height(binary: &BinaryFrame, area: &PixelRect) -> PixelRect {
    if area.height < 4 {
        return *area;
    }

    // 1/4 与 3/4 高度处只会穿过竖段
    let mut widths: Vec<u32> = [area.y + area.height / 4, area.y + area.height * 3 / 4]
        .into_iter()
        .flat_map(|y| row_runs(binary, area, y))
        .collect();
    if widths.is_empty() {
        return *area;
    }
    widths.sort_unstable();
    let thickness = widths[widths.len() / 2];

    let has_bar = |y: u32| {
        row_runs(binary, area, y)
            .into_iter()
            .any(|w| w as f32 >= thickness as f32 * BAR_WIDTH_FACTOR)
    };
    let top = if has_bar(area.y + thickness / 2) {
        area.y
    } else {
        area.y.saturating_sub(thickness)
    };
    let bottom = if has_bar(area.bottom().saturating_sub(1 + thickness / 2).max(area.y)) {
        area.bottom()
    } else {
        (area.bottom() + thickness).min(binary.height())
    };

    let restored = PixelRect::new(area.x, top, area.width, bottom - top);
    if restored != *area {
        debug!(
            "segmenter: digit height {} -> {} (stroke {})",
            area.height, restored.height, thickness
        );
    }
    restored
}

/// 第 y 行在 area 内各段连续前景的宽度
fn row_runs(binary: &BinaryFrame, area: &PixelRect, y: u32) -> Vec<u32> {
    let mut widths = Vec::new();
    let mut current = 0u32;
    for x in area.x..area.right() {
        if binary.is_foreground(x, y) {
            current += 1;
        } else if current > 0 {
            widths.push(current);
            current = 0;
        }
    }
    if current > 0 {
        widths.push(current);
    }
    widths
}

/// 投影到 x 轴的连续非空列段，附带每段前景的垂直跨度
fn column_runs(binary: &BinaryFrame, area: &PixelRect) -> Vec<ColumnRun> {
    let mut runs = Vec::new();
    let mut current: Option<ColumnRun> = None;

    for x in area.x..area.right() {
        let mut top = None;
        let mut bottom = 0;
        for y in area.y..area.bottom() {
            if binary.is_foreground(x, y) {
                top.get_or_insert(y);
                bottom = y + 1;
            }
        }

        match (top, current.as_mut()) {
            (Some(top), Some(run)) => {
                run.end = x + 1;
                run.top = run.top.min(top);
                run.bottom = run.bottom.max(bottom);
            }
            (Some(top), None) => {
                current = Some(ColumnRun {
                    start: x,
                    end: x + 1,
                    top,
                    bottom,
                });
            }
            (None, _) => {
                if let Some(run) = current.take() {
                    runs.push(run);
                }
            }
        }
    }
    if let Some(run) = current {
        runs.push(run);
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::digitizer::config::DigitCount;
    use crate::core::digitizer::locator::DisplayLocator;
    use crate::core::digitizer::preprocess::Preprocessor;
    use crate::core::digitizer::test_utils::{fill, render_panel, PanelStyle};
    use image::GrayImage;

    fn segment(gray: &GrayImage, config: &DigitizerConfig) -> Segmentation {
        let binary = Preprocessor::new(config, gray.width()).binarize(gray);
        let region = DisplayLocator::new(config)
            .locate(&binary)
            .expect("panel should be found");
        DigitSegmenter::new(config).segment(&binary, &region)
    }

    #[test]
    fn test_four_cells_left_to_right() {
        let config = DigitizerConfig::default();
        let gray = render_panel(400, 300, "0512", 125, 122, &PanelStyle::default());
        let seg = segment(&gray, &config);

        assert!(!seg.partial);
        assert_eq!(seg.cells.len(), 4);
        let cells: Vec<&DigitCell> = seg.resolved().collect();
        assert_eq!(cells.len(), 4);
        for pair in cells.windows(2) {
            assert!(pair[0].rect.right() <= pair[1].rect.x);
            assert_eq!(pair[0].index + 1, pair[1].index);
        }
    }

    #[test]
    fn test_narrow_one_is_widened() {
        let config = DigitizerConfig::default();
        let style = PanelStyle::default();
        let gray = render_panel(400, 300, "0512", 125, 122, &style);
        let seg = segment(&gray, &config);

        let one = seg.cells[2].unwrap();
        // the "1" cell starts at the digit cell origin, not at its right-hand strokes
        let origin = 125 + 2 * (style.digit_width + style.gap);
        assert!(one.rect.x.abs_diff(origin) <= 2, "{:?}", one);
        assert!(one.rect.width >= style.digit_width - 1);
    }

    #[test]
    fn test_missing_digits_are_partial() {
        let config = DigitizerConfig::default();
        // blank leading positions: only two digits lit
        let gray = render_panel(400, 300, "  88", 125, 122, &PanelStyle::default());
        let seg = segment(&gray, &config);

        assert!(seg.partial);
        assert_eq!(seg.cells.len(), 4);
        assert!(seg.cells[0].is_none());
        assert!(seg.cells[1].is_none());
        assert_eq!(seg.cells[2].map(|c| c.index), Some(2));
        assert_eq!(seg.cells[3].map(|c| c.index), Some(3));
    }

    #[test]
    fn test_auto_count_follows_runs() {
        let config = DigitizerConfig {
            digit_count: DigitCount::Auto,
            ..Default::default()
        };
        let gray = render_panel(400, 300, "808", 125, 122, &PanelStyle::default());
        let seg = segment(&gray, &config);
        assert!(!seg.partial);
        assert_eq!(seg.cells.len(), 3);
    }

    #[test]
    fn test_decimal_point_ignored() {
        let config = DigitizerConfig::default();
        let style = PanelStyle::default();
        let mut gray = render_panel(400, 300, "0512", 125, 122, &style);
        // dot between 3rd and 4th digit, sitting on the baseline
        let dot_x = 125 + 3 * (style.digit_width + style.gap) - style.gap / 2 - 3;
        let dot_y = 122 + style.digit_height - 7;
        fill(&mut gray, &PixelRect::new(dot_x, dot_y, 6, 6), style.foreground);

        let seg = segment(&gray, &config);
        assert!(!seg.partial);
        assert_eq!(seg.resolved().count(), 4);
    }

    #[test]
    fn test_height_restored_without_bottom_bars() {
        let config = DigitizerConfig::default();
        let style = PanelStyle::default();
        for text in ["1147", "4711", "7414"] {
            let gray = render_panel(400, 300, text, 125, 122, &style);
            let seg = segment(&gray, &config);
            assert!(!seg.partial, "{}", text);
            for cell in seg.resolved() {
                assert_eq!(cell.rect.y, 122, "{}", text);
                assert_eq!(cell.rect.height, style.digit_height, "{}", text);
            }
        }
    }

    #[test]
    fn test_height_restored_without_any_bars() {
        let config = DigitizerConfig::default();
        let style = PanelStyle::default();
        let gray = render_panel(400, 300, "1441", 125, 122, &style);
        let seg = segment(&gray, &config);
        let cell = seg.cells[1].unwrap();
        assert_eq!(cell.rect.y, 122);
        assert_eq!(cell.rect.height, style.digit_height);
    }

    #[test]
    fn test_full_height_panel_unchanged() {
        let area = PixelRect::new(125, 122, 150, 56);
        let gray = render_panel(400, 300, "0512", 125, 122, &PanelStyle::default());
        let binary = Preprocessor::new(&DigitizerConfig::default(), 400).binarize(&gray);
        assert_eq!(restore_digit_height(&binary, &area), area);
    }

    #[test]
    fn test_row_runs() {
        let mut gray = GrayImage::new(40, 10);
        fill(&mut gray, &PixelRect::new(2, 0, 5, 10), 255);
        fill(&mut gray, &PixelRect::new(20, 0, 12, 10), 255);
        let binary = BinaryFrame::from_mask(gray);
        assert_eq!(row_runs(&binary, &PixelRect::new(0, 0, 40, 10), 4), vec![5, 12]);
        assert_eq!(row_runs(&binary, &PixelRect::new(4, 0, 20, 10), 4), vec![3, 4]);
    }

    #[test]
    fn test_too_many_runs_rejected() {
        let config = DigitizerConfig {
            digit_count: DigitCount::Fixed(2),
            ..Default::default()
        };
        let gray = render_panel(400, 300, "888", 125, 122, &PanelStyle::default());
        let seg = segment(&gray, &config);
        assert!(seg.partial);
        assert_eq!(seg.resolved().count(), 0);
    }
}
