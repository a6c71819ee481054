//! 七段数码管读数识别（体重秤等）
//!
//! 处理流程：
//! 1. 预处理 - 中值去噪 + 局部自适应阈值 + 开运算
//! 2. 面板定位 - 连通域聚类，按面积/宽高比筛选
//! 3. 数字分割 - 列投影找数字间隔
//! 4. 段判定 - 采样七段密度，查表解码
//! 5. 时间稳定 - 连续 K 帧一致才锁定读数

pub mod annotator;
pub mod classifier;
pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod locator;
pub mod pipeline;
pub mod preprocess;
pub mod recorder;
pub mod segmenter;
pub mod segments;
pub mod stabilizer;

#[cfg(test)]
pub(crate) mod test_utils;

pub use classifier::{CellReading, SegmentClassifier};
pub use config::{DigitCount, DigitizerConfig, Polarity};
pub use error::DigitizerError;
pub use frame::LumaFrame;
pub use geometry::PixelRect;
pub use locator::{DisplayLocator, DisplayRegion};
pub use pipeline::{Digitizer, FrameAnalysis, FrameOutcome, Progress, SessionStats};
pub use recorder::DebugRecorder;
pub use segmenter::{DigitCell, DigitSegmenter, Segmentation};
pub use segments::{Segment, SegmentPattern};
pub use stabilizer::{Stabilizer, StabilizerAction, StabilizerState};
