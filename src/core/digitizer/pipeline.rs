use image::{GenericImageView, GrayImage, Luma, RgbaImage};
use log::{debug, error, info, warn};
use std::path::Path;

use super::annotator::DebugAnnotator;
use super::classifier::{CellReading, SegmentClassifier};
use super::config::DigitizerConfig;
use super::error::DigitizerError;
use super::frame::{center_roi, check_canvas, check_frame_size, LumaFrame};
use super::geometry::PixelRect;
use super::locator::DisplayLocator;
use super::preprocess::Preprocessor;
use super::recorder::DebugRecorder;
use super::segmenter::DigitSegmenter;
use super::stabilizer::{Stabilizer, StabilizerAction, StabilizerConfig, StabilizerState};

/// 单帧分析结果，坐标均为整帧坐标
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnalysis {
    pub roi: PixelRect,
    pub region: Option<PixelRect>,
    pub cells: Vec<CellReading>,
    pub candidate: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub candidate: Option<String>,
    pub action: StabilizerAction,
    /// 当前锁定的读数（本帧之后）
    pub reading: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub candidate: Option<String>,
    pub count: u32,
    pub required: u32,
    pub stable: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub processed_frames: u64,
    pub located_frames: u64,
    pub candidate_frames: u64,
    pub missed_frames: u64,
    pub ignored_frames: u64,
}

/// 识别引擎：每帧调用一次 `parse_frame`，`parsed_text` 查询锁定的读数，`reset` 开始新会话。
///
/// 不是线程安全的；调用方需要串行调用（相机帧本来就来自单一线程）。
pub struct Digitizer {
    config: DigitizerConfig,
    locator: DisplayLocator,
    segmenter: DigitSegmenter,
    classifier: SegmentClassifier,
    annotator: DebugAnnotator,
    stabilizer: Stabilizer,
    recorder: DebugRecorder,
    stats: SessionStats,
}

impl Digitizer {
    pub fn new(config: DigitizerConfig) -> Result<Self, DigitizerError> {
        config.validate()?;
        info!(
            "🔢 Digitizer: created (K={}, digits={:?})",
            config.stable_frames, config.digit_count
        );
        Ok(Self {
            locator: DisplayLocator::new(&config),
            segmenter: DigitSegmenter::new(&config),
            classifier: SegmentClassifier::new(&config),
            annotator: DebugAnnotator::new(&config),
            stabilizer: Stabilizer::with_config(StabilizerConfig {
                stable_frames: config.stable_frames,
                miss_tolerance: config.miss_tolerance,
            }),
            recorder: DebugRecorder::new(config.debug_history),
            stats: SessionStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &DigitizerConfig {
        &self.config
    }

    /// 只做单帧识别，不改变会话状态
    pub fn analyze<I>(&self, frame: &I) -> Result<FrameAnalysis, DigitizerError>
    where
        I: GenericImageView<Pixel = Luma<u8>>,
    {
        let (width, height) = frame.dimensions();
        check_frame_size(width, height).inspect_err(|e| error!("❌ {}", e))?;

        let roi = center_roi(width, height, self.config.roi_fraction);
        let cropped = copy_region(frame, &roi);
        let binary = Preprocessor::new(&self.config, width).binarize(&cropped);

        let Some(region) = self.locator.locate(&binary) else {
            debug!("digitizer: no display region");
            return Ok(FrameAnalysis {
                roi,
                region: None,
                cells: Vec::new(),
                candidate: None,
            });
        };

        let segmentation = self.segmenter.segment(&binary, &region);
        let (cells, candidate) = self.classifier.classify(&binary, &segmentation);
        debug!(
            "digitizer: region {:?}, {} cells, candidate {:?}",
            region.rect,
            cells.len(),
            candidate
        );

        Ok(FrameAnalysis {
            roi,
            region: Some(region.rect.offset(roi.x, roi.y)),
            cells: cells
                .into_iter()
                .map(|c| CellReading {
                    rect: c.rect.offset(roi.x, roi.y),
                    ..c
                })
                .collect(),
            candidate,
        })
    }

    /// 处理一帧：识别、并入会话状态，`debug` 时在画布上叠加标注并记录快照
    pub fn parse_frame<I>(
        &mut self,
        frame: &I,
        canvas: Option<&mut RgbaImage>,
        debug: bool,
    ) -> Result<FrameOutcome, DigitizerError>
    where
        I: GenericImageView<Pixel = Luma<u8>>,
    {
        let (width, height) = frame.dimensions();
        check_frame_size(width, height).inspect_err(|e| error!("❌ {}", e))?;
        if let Some(canvas) = canvas.as_deref() {
            check_canvas(canvas, width, height).inspect_err(|e| error!("❌ {}", e))?;
        }

        self.stats.processed_frames += 1;

        if matches!(self.stabilizer.current_state(), StabilizerState::Finalized { .. }) {
            self.stats.ignored_frames += 1;
            let action = self.stabilizer.process_frame(None);
            return Ok(FrameOutcome {
                candidate: None,
                action,
                reading: self.parsed_text().map(str::to_string),
            });
        }

        let analysis = self.analyze(frame)?;
        if analysis.region.is_some() {
            self.stats.located_frames += 1;
        }
        if analysis.candidate.is_some() {
            self.stats.candidate_frames += 1;
        } else {
            self.stats.missed_frames += 1;
        }

        let action = self.stabilizer.process_frame(analysis.candidate.as_deref());

        if debug {
            self.record_debug(frame, canvas, &analysis);
        }

        Ok(FrameOutcome {
            candidate: analysis.candidate,
            action,
            reading: self.parsed_text().map(str::to_string),
        })
    }

    /// 相机 Y 平面入口
    pub fn parse_luma(
        &mut self,
        frame: &LumaFrame<'_>,
        canvas: Option<&mut RgbaImage>,
        debug: bool,
    ) -> Result<FrameOutcome, DigitizerError> {
        let gray = frame.to_gray_image();
        self.parse_frame(&gray, canvas, debug)
    }

    /// 画布上叠加标注；快照记录未标注的灰度输入
    fn record_debug<I>(&mut self, frame: &I, canvas: Option<&mut RgbaImage>, analysis: &FrameAnalysis)
    where
        I: GenericImageView<Pixel = Luma<u8>>,
    {
        if let Some(canvas) = canvas {
            self.annotator
                .annotate(canvas, analysis, self.stabilizer.reading());
        }
        let (width, height) = frame.dimensions();
        let gray = copy_region(frame, &PixelRect::new(0, 0, width, height));
        if let Err(e) = self.push_snapshot(gray) {
            warn!("debug snapshot skipped: {}", e);
        }
    }

    /// 分辨率变化时丢弃旧快照再记录
    fn push_snapshot(&mut self, frame: GrayImage) -> Result<(), DigitizerError> {
        let resized = self
            .recorder
            .frames()
            .next()
            .is_some_and(|first| first.dimensions() != frame.dimensions());
        if resized {
            debug!("recorder: frame size changed, clearing history");
            self.recorder.clear();
        }
        self.recorder.push(frame)
    }

    /// 当前锁定的读数；未稳定时为 None
    pub fn parsed_text(&self) -> Option<&str> {
        self.stabilizer.reading()
    }

    pub fn state(&self) -> &StabilizerState {
        self.stabilizer.current_state()
    }

    pub fn progress(&self) -> Progress {
        let required = self.config.stable_frames;
        match self.stabilizer.current_state() {
            StabilizerState::Idle => Progress {
                candidate: None,
                count: 0,
                required,
                stable: false,
            },
            StabilizerState::Accumulating {
                candidate, count, ..
            } => Progress {
                candidate: Some(candidate.clone()),
                count: *count,
                required,
                stable: false,
            },
            StabilizerState::Stable { reading } | StabilizerState::Finalized { reading } => {
                Progress {
                    candidate: Some(reading.clone()),
                    count: required,
                    required,
                    stable: true,
                }
            }
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// 取走锁定的读数，之后的帧都被忽略直到 reset
    pub fn finalize(&mut self) -> Option<String> {
        self.stabilizer.finalize()
    }

    pub fn reset(&mut self) {
        self.stabilizer.reset();
        self.recorder.clear();
        self.stats = SessionStats::default();
        info!("🔄 Digitizer: session reset");
    }

    pub fn debug_frame_count(&self) -> usize {
        self.recorder.len()
    }

    /// 调试模式下记录的原始输入帧，最旧在前
    pub fn debug_frames(&self) -> impl Iterator<Item = &GrayImage> {
        self.recorder.frames()
    }

    /// 最近几帧调试画面拼成的 JPEG
    pub fn debug_snapshot(&self) -> Result<Vec<u8>, DigitizerError> {
        self.recorder.encode_jpeg(100)
    }

    /// 同上，写入文件
    pub fn save_debug_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<(), DigitizerError> {
        self.recorder.save(path)
    }
}

fn copy_region<I>(frame: &I, rect: &PixelRect) -> GrayImage
where
    I: GenericImageView<Pixel = Luma<u8>>,
{
    GrayImage::from_fn(rect.width, rect.height, |x, y| {
        frame.get_pixel(rect.x + x, rect.y + y)
    })
}
