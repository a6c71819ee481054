/// 轴对齐像素矩形，右/下边界为开区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f32 / self.height as f32
    }

    pub fn union(&self, other: &PixelRect) -> PixelRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        PixelRect::new(x, y, right - x, bottom - y)
    }

    /// 两矩形之间的水平、垂直空隙（相交时为 0）
    pub fn gap_to(&self, other: &PixelRect) -> (u32, u32) {
        let dx = self
            .x
            .max(other.x)
            .saturating_sub(self.right().min(other.right()));
        let dy = self
            .y
            .max(other.y)
            .saturating_sub(self.bottom().min(other.bottom()));
        (dx, dy)
    }

    pub fn offset(&self, dx: u32, dy: u32) -> PixelRect {
        PixelRect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Sub-rectangle given as fractions of this rectangle's size.
    pub fn fraction(&self, fx0: f32, fy0: f32, fx1: f32, fy1: f32) -> PixelRect {
        let w = self.width as f32;
        let h = self.height as f32;
        let x0 = (fx0 * w).round() as u32;
        let y0 = (fy0 * h).round() as u32;
        let x1 = ((fx1 * w).round() as u32).max(x0 + 1).min(self.width.max(x0 + 1));
        let y1 = ((fy1 * h).round() as u32).max(y0 + 1).min(self.height.max(y0 + 1));
        PixelRect::new(self.x + x0, self.y + y0, x1 - x0, y1 - y0)
    }

    /// Clip to a `width` x `height` canvas.
    pub fn clamp_to(&self, width: u32, height: u32) -> PixelRect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let right = self.right().min(width);
        let bottom = self.bottom().min(height);
        PixelRect::new(x, y, right - x, bottom - y)
    }

    pub fn to_imageproc(&self) -> Option<imageproc::rect::Rect> {
        if self.is_empty() {
            return None;
        }
        Some(imageproc::rect::Rect::at(self.x as i32, self.y as i32).of_size(self.width, self.height))
    }
}
