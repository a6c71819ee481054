//! 调试快照：保留最近 N 帧原始灰度输入，拼成网格图导出 JPEG。
//! 记录的是未标注的输入帧，可以直接交给 `Digitizer::analyze` 回放。

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, GrayImage};
use log::{debug, info};
use std::collections::VecDeque;
use std::io::Cursor;
use std::path::Path;

use super::error::DigitizerError;

pub struct DebugRecorder {
    frames: VecDeque<GrayImage>,
    capacity: usize,
}

impl DebugRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// 按时间顺序（最旧在前）
    pub fn frames(&self) -> impl Iterator<Item = &GrayImage> {
        self.frames.iter()
    }

    /// 尺寸必须与已有帧一致；满了丢掉最旧的一帧
    pub fn push(&mut self, frame: GrayImage) -> Result<(), DigitizerError> {
        if self.capacity == 0 {
            return Ok(());
        }
        if let Some(first) = self.frames.front() {
            if first.dimensions() != frame.dimensions() {
                return Err(DigitizerError::Snapshot(format!(
                    "frame is {}x{} but recorder holds {}x{} frames",
                    frame.width(),
                    frame.height(),
                    first.width(),
                    first.height()
                )));
            }
        }
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
        Ok(())
    }

    /// 每行 round(√capacity) 张，从左上角开始按时间顺序排列；空时返回 None
    pub fn compose_grid(&self) -> Option<GrayImage> {
        let (tile_w, tile_h) = self.frames.front()?.dimensions();
        let columns = ((self.capacity as f64).sqrt().round() as usize).max(1);
        let rows = self.frames.len().div_ceil(columns);

        let mut grid = GrayImage::new(tile_w * columns as u32, tile_h * rows as u32);
        for (i, frame) in self.frames.iter().enumerate() {
            let x = (i % columns) as u32 * tile_w;
            let y = (i / columns) as u32 * tile_h;
            imageops::replace(&mut grid, frame, x as i64, y as i64);
        }
        Some(grid)
    }

    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, DigitizerError> {
        let grid = self
            .compose_grid()
            .ok_or_else(|| DigitizerError::Snapshot("no frames recorded".into()))?;

        let mut buffer = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        grid.write_with_encoder(encoder)?;

        let bytes = buffer.into_inner();
        debug!("recorder: {} frames -> {} bytes", self.frames.len(), bytes.len());
        Ok(bytes)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DigitizerError> {
        let bytes = self.encode_jpeg(100)?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| DigitizerError::Snapshot(format!("{}: {}", path.as_ref().display(), e)))?;
        info!("📸 debug snapshot saved to {}", path.as_ref().display());
        Ok(())
    }
}
