//! 七段数码管的段定义、段组合 → 数字查找表、以及段在数字格中的几何位置

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::geometry::PixelRect;

/// 标准七段，位序 a-g
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Top,
    UpperRight,
    LowerRight,
    Bottom,
    LowerLeft,
    UpperLeft,
    Middle,
}

impl Segment {
    pub const ALL: [Segment; 7] = [
        Segment::Top,
        Segment::UpperRight,
        Segment::LowerRight,
        Segment::Bottom,
        Segment::LowerLeft,
        Segment::UpperLeft,
        Segment::Middle,
    ];

    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// 采样窗口（相对数字格的比例坐标），只取段的中心部分，避开段与段的拐角
    pub const fn sample_window(self) -> (f32, f32, f32, f32) {
        match self {
            Segment::Top => (0.3, 0.0, 0.7, 0.12),
            Segment::UpperRight => (0.8, 0.2, 1.0, 0.4),
            Segment::LowerRight => (0.8, 0.6, 1.0, 0.8),
            Segment::Bottom => (0.3, 0.88, 0.7, 1.0),
            Segment::LowerLeft => (0.0, 0.6, 0.2, 0.8),
            Segment::UpperLeft => (0.0, 0.2, 0.2, 0.4),
            Segment::Middle => (0.3, 0.44, 0.7, 0.56),
        }
    }

    /// Segment outline inside a digit cell drawn with stroke `thickness`.
    pub fn glyph_rect(self, cell: PixelRect, thickness: u32) -> PixelRect {
        let t = thickness;
        let w = cell.width;
        let h = cell.height;
        let bar = w.saturating_sub(2 * t);
        let mid_top = h.saturating_sub(t) / 2;
        let upper = mid_top.saturating_sub(t);
        let lower = h.saturating_sub(t).saturating_sub(mid_top + t);
        let right = w.saturating_sub(t);

        let (x, y, rw, rh) = match self {
            Segment::Top => (t, 0, bar, t),
            Segment::Middle => (t, mid_top, bar, t),
            Segment::Bottom => (t, h.saturating_sub(t), bar, t),
            Segment::UpperLeft => (0, t, t, upper),
            Segment::UpperRight => (right, t, t, upper),
            Segment::LowerLeft => (0, mid_top + t, t, lower),
            Segment::LowerRight => (right, mid_top + t, t, lower),
        };
        PixelRect::new(cell.x + x, cell.y + y, rw, rh)
    }
}

/// 数字格内永远不亮的两个“孔”，用来估计该格自身的背景密度
pub const BACKGROUND_WINDOWS: [(f32, f32, f32, f32); 2] =
    [(0.35, 0.2, 0.65, 0.35), (0.35, 0.65, 0.65, 0.8)];

/// 一位数字的亮段位集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SegmentPattern(u8);

impl SegmentPattern {
    pub const EMPTY: SegmentPattern = SegmentPattern(0);

    pub fn from_segments(segments: &[Segment]) -> Self {
        SegmentPattern(segments.iter().fold(0, |acc, s| acc | s.bit()))
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, segment: Segment) -> bool {
        self.0 & segment.bit() != 0
    }

    pub fn insert(&mut self, segment: Segment) {
        self.0 |= segment.bit();
    }

    pub fn lit_count(self) -> u32 {
        self.0.count_ones()
    }

    /// 查表解码；不在表中的组合（包括全灭）返回 None
    pub fn decode(self) -> Option<u8> {
        DIGIT_TABLE.get(&self).copied()
    }

    /// Canonical rendering of `digit`.
    pub fn for_digit(digit: u8) -> Option<Self> {
        CANONICAL_DIGITS
            .get(digit as usize)
            .map(|segments| Self::from_segments(segments))
    }
}

use Segment::*;

const CANONICAL_DIGITS: [&[Segment]; 10] = [
    &[Top, UpperRight, LowerRight, Bottom, LowerLeft, UpperLeft],
    &[UpperRight, LowerRight],
    &[Top, UpperRight, Middle, LowerLeft, Bottom],
    &[Top, UpperRight, Middle, LowerRight, Bottom],
    &[UpperLeft, Middle, UpperRight, LowerRight],
    &[Top, UpperLeft, Middle, LowerRight, Bottom],
    &[Top, UpperLeft, Middle, LowerLeft, LowerRight, Bottom],
    &[Top, UpperRight, LowerRight],
    &[Top, UpperRight, LowerRight, Bottom, LowerLeft, UpperLeft, Middle],
    &[Top, UpperRight, LowerRight, Bottom, UpperLeft, Middle],
];

/// 部分厂家的变体字形：6 不带顶横、7 带左上竖、9 不带底横
const VARIANT_DIGITS: [(&[Segment], u8); 3] = [
    (&[UpperLeft, Middle, LowerLeft, LowerRight, Bottom], 6),
    (&[Top, UpperLeft, UpperRight, LowerRight], 7),
    (&[Top, UpperRight, LowerRight, UpperLeft, Middle], 9),
];

static DIGIT_TABLE: Lazy<HashMap<SegmentPattern, u8>> = Lazy::new(|| {
    let mut table = HashMap::with_capacity(CANONICAL_DIGITS.len() + VARIANT_DIGITS.len());
    for (digit, segments) in CANONICAL_DIGITS.iter().enumerate() {
        table.insert(SegmentPattern::from_segments(segments), digit as u8);
    }
    for (segments, digit) in VARIANT_DIGITS {
        table.insert(SegmentPattern::from_segments(segments), digit);
    }
    table
});
