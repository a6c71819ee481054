use thiserror::Error;

/// 调用方契约错误。识别失败（找不到面板、数字无法解码）不是错误，见 `FrameOutcome`。
#[derive(Debug, Error)]
pub enum DigitizerError {
    #[error("Frame has zero area ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("Frame buffer too small: expected at least {expected} bytes, got {actual}")]
    FrameBufferSize { expected: usize, actual: usize },
    #[error("Invalid row stride {stride} for width {width}")]
    InvalidStride { stride: usize, width: u32 },
    #[error("Canvas is {canvas_width}x{canvas_height} but frame is {frame_width}x{frame_height}")]
    CanvasSizeMismatch {
        canvas_width: u32,
        canvas_height: u32,
        frame_width: u32,
        frame_height: u32,
    },
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Config JSON error: {0}")]
    ConfigJson(#[from] serde_json::Error),
    #[error("Debug snapshot error: {0}")]
    Snapshot(String),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
}
