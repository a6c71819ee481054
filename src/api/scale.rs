//! 体重秤读数识别

use crate::core::digitizer::{Digitizer, DigitizerConfig, DigitizerError, LumaFrame, SessionStats};
use crate::core::reading::{ReadingError, Weight, WeightUnit};
use flutter_rust_bridge::frb;
use image::RgbaImage;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

/// 识别 API 错误类型，FRB 友好的设计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleApiError {
    pub error_type: String,
    pub message: String,
}

impl ScaleApiError {
    fn new(error_type: &str, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.to_string(),
            message: message.into(),
        }
    }
}

impl From<DigitizerError> for ScaleApiError {
    fn from(e: DigitizerError) -> Self {
        let error_type = match &e {
            DigitizerError::EmptyFrame { .. }
            | DigitizerError::FrameBufferSize { .. }
            | DigitizerError::InvalidStride { .. } => "InvalidFrame",
            DigitizerError::CanvasSizeMismatch { .. } => "CanvasSizeMismatch",
            DigitizerError::InvalidConfig(_) | DigitizerError::ConfigJson(_) => "InvalidConfig",
            DigitizerError::Snapshot(_) | DigitizerError::Image(_) => "Snapshot",
        };
        Self::new(error_type, e.to_string())
    }
}

impl From<ReadingError> for ScaleApiError {
    fn from(e: ReadingError) -> Self {
        Self::new("InvalidReading", e.to_string())
    }
}

impl std::fmt::Display for ScaleApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error_type, self.message)
    }
}

impl std::error::Error for ScaleApiError {}

/// 相机 Y 平面帧数据
#[derive(Debug, Clone)]
pub struct YFrameData {
    pub width: u32,
    pub height: u32,
    pub row_stride: u32,
    pub y_plane: Vec<u8>,
}

/// 单帧处理结果
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// 本帧识别出的数字串
    pub candidate: Option<String>,
    /// 已锁定的读数
    pub reading: Option<String>,
    /// 候选已连续出现的帧数 / 需要的帧数
    pub count: u32,
    pub required: u32,
    /// debug 时返回标注后的 RGBA 画布
    pub canvas_rgba: Option<Vec<u8>>,
}

/// 体重秤读数识别器
///
/// ```dart
/// final reader = ScaleReader.create(configJson: null);
/// final report = reader.parseYFrame(frame: yFrame, canvasRgba: null, debug: false);
/// final text = reader.parsedText; // "0512" -> 51.2
/// ```
#[frb(opaque)]
pub struct ScaleReader {
    digitizer: Mutex<Digitizer>,
}

impl ScaleReader {
    /// 创建识别器，config_json 为 None 时使用默认配置
    #[frb(sync)]
    pub fn create(config_json: Option<String>) -> Result<Self, ScaleApiError> {
        let config = match config_json {
            Some(json) => DigitizerConfig::from_json(&json)?,
            None => DigitizerConfig::default(),
        };
        let digitizer = Digitizer::new(config)?;
        info!("⚖️ ScaleReader: created");
        Ok(Self {
            digitizer: Mutex::new(digitizer),
        })
    }

    /// 处理一帧。canvas_rgba 需与帧同尺寸（width × height × 4）
    #[frb]
    pub fn parse_y_frame(
        &self,
        frame: YFrameData,
        canvas_rgba: Option<Vec<u8>>,
        debug: bool,
    ) -> Result<FrameReport, ScaleApiError> {
        let luma = LumaFrame::new(
            frame.width,
            frame.height,
            frame.row_stride as usize,
            &frame.y_plane,
        )?;

        let mut canvas = match canvas_rgba {
            Some(bytes) => Some(canvas_from_bytes(bytes, frame.width, frame.height)?),
            None => None,
        };

        let mut digitizer = self.lock();
        let outcome = digitizer.parse_luma(&luma, canvas.as_mut(), debug)?;
        let progress = digitizer.progress();

        Ok(FrameReport {
            candidate: outcome.candidate,
            reading: outcome.reading,
            count: progress.count,
            required: progress.required,
            canvas_rgba: canvas.map(RgbaImage::into_raw),
        })
    }

    /// 当前锁定的读数
    #[frb(sync, getter)]
    pub fn parsed_text(&self) -> Option<String> {
        self.lock().parsed_text().map(str::to_string)
    }

    /// 取走读数并结束本次会话，reset 之前不再接受新帧
    #[frb(sync)]
    pub fn finalize(&self) -> Option<String> {
        self.lock().finalize()
    }

    /// 开始新一轮识别
    #[frb(sync)]
    pub fn reset(&self) {
        self.lock().reset()
    }

    #[frb(sync, getter)]
    pub fn stats(&self) -> SessionStats {
        self.lock().stats()
    }

    /// 最近几帧调试画面（JPEG）
    #[frb]
    pub fn debug_snapshot_jpeg(&self) -> Result<Vec<u8>, ScaleApiError> {
        Ok(self.lock().debug_snapshot()?)
    }

    fn lock(&self) -> MutexGuard<'_, Digitizer> {
        self.digitizer.lock().unwrap_or_else(|poisoned| {
            warn!("ScaleReader: recovering from poisoned lock");
            poisoned.into_inner()
        })
    }
}

impl Drop for ScaleReader {
    fn drop(&mut self) {
        info!("🗑️ ScaleReader: released");
    }
}

fn canvas_from_bytes(bytes: Vec<u8>, width: u32, height: u32) -> Result<RgbaImage, ScaleApiError> {
    let expected = width as usize * height as usize * 4;
    if bytes.len() != expected {
        return Err(ScaleApiError::new(
            "CanvasSizeMismatch",
            format!("canvas has {} bytes, expected {}", bytes.len(), expected),
        ));
    }
    RgbaImage::from_raw(width, height, bytes)
        .ok_or_else(|| ScaleApiError::new("CanvasSizeMismatch", "invalid canvas buffer"))
}

/// 把锁定的读数转成重量（最后 fraction_digits 位为小数）
#[frb(sync)]
pub fn parse_weight(text: String, fraction_digits: u32, unit: String) -> Result<f64, ScaleApiError> {
    let unit: WeightUnit = unit.parse()?;
    let weight = Weight::from_reading(&text, fraction_digits as usize, unit)?;
    Ok(weight.value)
}

/// 同上，并换算为千克
#[frb(sync)]
pub fn parse_weight_kg(text: String, fraction_digits: u32, unit: String) -> Result<f64, ScaleApiError> {
    let unit: WeightUnit = unit.parse()?;
    Ok(Weight::from_reading(&text, fraction_digits as usize, unit)?.to_kilograms())
}
