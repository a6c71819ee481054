use image::{GrayImage, RgbaImage};

use super::error::DigitizerError;
use super::geometry::PixelRect;

/// 原生层传来的亮度平面（相机 Y 通道），按行跨度借用
#[derive(Debug, Clone, Copy)]
pub struct LumaFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub row_stride: usize,
    pub data: &'a [u8],
}

impl<'a> LumaFrame<'a> {
    pub fn new(
        width: u32,
        height: u32,
        row_stride: usize,
        data: &'a [u8],
    ) -> Result<Self, DigitizerError> {
        check_frame_size(width, height)?;
        if row_stride < width as usize {
            return Err(DigitizerError::InvalidStride {
                stride: row_stride,
                width,
            });
        }

        // 最后一行不要求补齐到 stride
        let expected = row_stride * (height as usize - 1) + width as usize;
        if data.len() < expected {
            return Err(DigitizerError::FrameBufferSize {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            row_stride,
            data,
        })
    }

    /// Tightly packed frame, stride equal to width.
    pub fn packed(width: u32, height: u32, data: &'a [u8]) -> Result<Self, DigitizerError> {
        Self::new(width, height, width as usize, data)
    }

    pub fn to_gray_image(&self) -> GrayImage {
        let w = self.width as usize;
        let mut pixels = Vec::with_capacity(w * self.height as usize);
        for row in 0..self.height as usize {
            let start = row * self.row_stride;
            pixels.extend_from_slice(&self.data[start..start + w]);
        }
        GrayImage::from_raw(self.width, self.height, pixels)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }
}

pub(crate) fn check_frame_size(width: u32, height: u32) -> Result<(), DigitizerError> {
    if width == 0 || height == 0 {
        return Err(DigitizerError::EmptyFrame { width, height });
    }
    Ok(())
}

pub(crate) fn check_canvas(
    canvas: &RgbaImage,
    frame_width: u32,
    frame_height: u32,
) -> Result<(), DigitizerError> {
    let (canvas_width, canvas_height) = canvas.dimensions();
    if canvas_width != frame_width || canvas_height != frame_height {
        return Err(DigitizerError::CanvasSizeMismatch {
            canvas_width,
            canvas_height,
            frame_width,
            frame_height,
        });
    }
    Ok(())
}

/// 画面中心的正方形分析区域，边长 = 短边 × fraction
pub fn center_roi(width: u32, height: u32, fraction: f32) -> PixelRect {
    let side = ((width.min(height) as f32 * fraction) as u32).clamp(1, width.min(height).max(1));
    PixelRect::new((width - side) / 2, (height - side) / 2, side, side)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_frame_to_image() {
        let data: Vec<u8> = (0..12).collect();
        let frame = LumaFrame::packed(4, 3, &data).unwrap();
        let img = frame.to_gray_image();
        assert_eq!(img.dimensions(), (4, 3));
        assert_eq!(img.get_pixel(1, 2)[0], 9);
    }

    #[test]
    fn test_strided_frame_drops_padding() {
        // 2x2 image with 3 bytes of padding per row, last row unpadded
        let data = [1u8, 2, 0, 0, 0, 3, 4];
        let frame = LumaFrame::new(2, 2, 5, &data).unwrap();
        let img = frame.to_gray_image();
        assert_eq!(img.into_raw(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_area_rejected() {
        assert!(matches!(
            LumaFrame::packed(0, 10, &[]),
            Err(DigitizerError::EmptyFrame { .. })
        ));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let data = vec![0u8; 10];
        assert!(matches!(
            LumaFrame::packed(4, 4, &data),
            Err(DigitizerError::FrameBufferSize {
                expected: 16,
                actual: 10
            })
        ));
        assert!(matches!(
            LumaFrame::new(4, 2, 3, &data),
            Err(DigitizerError::InvalidStride { .. })
        ));
    }

    #[test]
    fn test_canvas_mismatch() {
        let canvas = RgbaImage::new(10, 10);
        assert!(check_canvas(&canvas, 10, 10).is_ok());
        assert!(matches!(
            check_canvas(&canvas, 12, 10),
            Err(DigitizerError::CanvasSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_center_roi() {
        let roi = center_roi(400, 300, 0.66);
        assert_eq!(roi, PixelRect::new(101, 51, 198, 198));
        assert_eq!(center_roi(100, 50, 1.0), PixelRect::new(25, 0, 50, 50));
    }
}
