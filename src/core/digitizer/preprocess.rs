//! 帧预处理：中值去噪 → 局部自适应阈值 → 开运算，输出二值前景图

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::distance_transform::Norm;
use log::debug;
use imageproc::integral_image::integral_image;

use super::config::{DigitizerConfig, Polarity};
use super::geometry::PixelRect;

type IntegralImage = ImageBuffer<Luma<u32>, Vec<u32>>;

const FOREGROUND: u8 = 255;

/// 高斯噪声下 σ ≈ 1.4826 × MAD
const MAD_TO_SIGMA: f32 = 1.4826;

/// 二值前景图及其积分图，后续阶段用积分图 O(1) 求任意矩形的前景密度
pub struct BinaryFrame {
    mask: GrayImage,
    integral: IntegralImage,
}

impl BinaryFrame {
    pub fn from_mask(mask: GrayImage) -> Self {
        let integral = integral_image::<_, u32>(&mask);
        Self { mask, integral }
    }

    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    pub fn mask(&self) -> &GrayImage {
        &self.mask
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.mask.get_pixel(x, y)[0] != 0
    }

    pub fn foreground_count(&self, rect: &PixelRect) -> u32 {
        let r = rect.clamp_to(self.width(), self.height());
        if r.is_empty() {
            return 0;
        }
        rect_sum(&self.integral, r.x, r.y, r.right(), r.bottom()) / FOREGROUND as u32
    }

    /// 前景像素占比，空矩形返回 0
    pub fn density(&self, rect: &PixelRect) -> f32 {
        let r = rect.clamp_to(self.width(), self.height());
        if r.is_empty() {
            return 0.0;
        }
        self.foreground_count(&r) as f32 / r.area() as f32
    }
}

/// Sum over `[x0, x1) x [y0, y1)` from an integral image with a leading zero row/column.
fn rect_sum(integral: &IntegralImage, x0: u32, y0: u32, x1: u32, y1: u32) -> u32 {
    let a = integral.get_pixel(x0, y0)[0];
    let b = integral.get_pixel(x1, y0)[0];
    let c = integral.get_pixel(x0, y1)[0];
    let d = integral.get_pixel(x1, y1)[0];
    d.wrapping_add(a).wrapping_sub(b).wrapping_sub(c)
}

pub struct Preprocessor {
    median_radius: u32,
    block_radius: u32,
    offset: u8,
    noise_offset_factor: f32,
    open_radius: u8,
    polarity: Polarity,
}

impl Preprocessor {
    /// 窗口大小按整帧宽度缩放，保证不同分辨率下效果一致
    pub fn new(config: &DigitizerConfig, frame_width: u32) -> Self {
        let scale = |fraction: f32, min: u32| {
            ((frame_width as f32 * fraction / 2.0).round() as u32).max(min)
        };
        Self {
            median_radius: scale(config.median_fraction, 1),
            block_radius: scale(config.threshold_block_fraction, 2),
            offset: config.threshold_offset,
            noise_offset_factor: config.noise_offset_factor,
            open_radius: config.open_radius,
            polarity: config.polarity,
        }
    }

    pub fn binarize(&self, gray: &GrayImage) -> BinaryFrame {
        let mut source = gray.clone();
        if self.polarity == Polarity::LitDark {
            image::imageops::invert(&mut source);
        }

        let denoised = imageproc::filter::median_filter(&source, self.median_radius, self.median_radius);
        let offset = self.effective_offset(&source, &denoised);
        let mut mask = adaptive_threshold(&denoised, self.block_radius, offset);
        if self.open_radius > 0 {
            mask = imageproc::morphology::open(&mask, Norm::LInf, self.open_radius);
        }

        BinaryFrame::from_mask(mask)
    }

    /// 噪声越大，前景需要高出局部均值越多；干净画面保持配置的 offset
    fn effective_offset(&self, source: &GrayImage, denoised: &GrayImage) -> u8 {
        if self.noise_offset_factor <= 0.0 {
            return self.offset;
        }
        let sigma = noise_sigma(source, denoised);
        let adaptive = (self.noise_offset_factor * sigma).round().min(255.0) as u8;
        if adaptive > self.offset {
            debug!(
                "threshold offset raised {} -> {} (noise σ ≈ {:.1})",
                self.offset, adaptive, sigma
            );
            adaptive
        } else {
            self.offset
        }
    }
}

/// 用中值滤波残差的中位数（MAD）估计噪声标准差。
/// 笔画边缘只占少数像素，不影响中位数。
fn noise_sigma(source: &GrayImage, denoised: &GrayImage) -> f32 {
    let mut histogram = [0u32; 256];
    for (a, b) in source.pixels().zip(denoised.pixels()) {
        histogram[a[0].abs_diff(b[0]) as usize] += 1;
    }

    let total: u32 = histogram.iter().sum();
    let half = total.div_ceil(2);
    let mut seen = 0u32;
    for (residual, count) in histogram.iter().enumerate() {
        seen += count;
        if seen >= half && total > 0 {
            return residual as f32 * MAD_TO_SIGMA;
        }
    }
    0.0
}

/// 均值自适应阈值：像素比 (2r+1)² 邻域均值高出 offset 才算前景。
/// 平坦区域（全亮或全暗）不会产生任何前景。
fn adaptive_threshold(image: &GrayImage, block_radius: u32, offset: u8) -> GrayImage {
    let (width, height) = image.dimensions();
    let integral = integral_image::<_, u32>(image);
    let mut out = GrayImage::new(width, height);

    for y in 0..height {
        let y0 = y.saturating_sub(block_radius);
        let y1 = (y + block_radius + 1).min(height);
        for x in 0..width {
            let x0 = x.saturating_sub(block_radius);
            let x1 = (x + block_radius + 1).min(width);

            let count = ((x1 - x0) * (y1 - y0)) as u64;
            let sum = rect_sum(&integral, x0, y0, x1, y1) as u64;
            let pixel = image.get_pixel(x, y)[0] as u64;

            if pixel * count > sum + offset as u64 * count {
                out.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
    }

    out
}
