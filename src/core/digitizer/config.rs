use serde::{Deserialize, Serialize};

use super::error::DigitizerError;

/// 期望的数字位数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitCount {
    Fixed(u32),
    /// 按投影分割出的列数决定位数
    Auto,
}

/// 点亮段相对背景的明暗
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// 背光/LED：点亮段比背景亮
    #[default]
    LitBright,
    /// 反射式 LCD：点亮段比背景暗
    LitDark,
}

/// 识别引擎配置。所有字段都有默认值，JSON 只需给出要覆盖的字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitizerConfig {
    /// 连续多少帧读数一致才锁定（K）
    pub stable_frames: u32,
    /// 累积阶段允许连续丢失多少帧而不打断计数
    pub miss_tolerance: u32,
    pub digit_count: DigitCount,
    /// 只分析画面中心的正方形区域，边长 = 短边 × roi_fraction
    pub roi_fraction: f32,
    pub min_area_fraction: f32,
    pub max_area_fraction: f32,
    /// 面板宽高比范围
    pub min_aspect_ratio: f32,
    pub max_aspect_ratio: f32,
    /// 面板高度占 ROI 高度的范围，同时也是调试引导框
    pub min_height_fraction: f32,
    pub max_height_fraction: f32,
    pub polarity: Polarity,
    /// 中值滤波窗口 ≈ 帧宽 × median_fraction
    pub median_fraction: f32,
    /// 自适应阈值窗口 ≈ 帧宽 × threshold_block_fraction
    pub threshold_block_fraction: f32,
    /// 像素需高出局部均值多少才算前景
    pub threshold_offset: u8,
    /// 噪声自适应：实际 offset 取 max(threshold_offset, noise_offset_factor × σ)，
    /// σ 由中值滤波残差估计。0 表示关闭
    pub noise_offset_factor: f32,
    /// 开运算半径（像素）
    pub open_radius: u8,
    /// 小于 ROI 面积此比例的连通域视为噪点
    pub min_blob_fraction: f32,
    /// 段块外扩比例（相对块的长边），外扩后相交即归为同一面板
    pub merge_gap_fraction: f32,
    /// 单个数字的宽高比
    pub digit_aspect: f32,
    /// 段密度减去背景密度超过此值即判为点亮
    pub lit_threshold: f32,
    /// 段判定离 lit_threshold 太近时整位放弃
    pub min_confidence_margin: f32,
    /// 调试模式下保留的最近帧数（调试快照用）
    pub debug_history: usize,
}

impl Default for DigitizerConfig {
    fn default() -> Self {
        Self {
            stable_frames: 5,
            miss_tolerance: 0,
            digit_count: DigitCount::Fixed(4),
            roi_fraction: 0.66,
            min_area_fraction: 0.01,
            max_area_fraction: 0.9,
            min_aspect_ratio: 0.3,
            max_aspect_ratio: 10.0,
            min_height_fraction: 0.05,
            max_height_fraction: 0.8,
            polarity: Polarity::LitBright,
            median_fraction: 0.004,
            threshold_block_fraction: 0.03,
            threshold_offset: 10,
            noise_offset_factor: 3.0,
            open_radius: 1,
            min_blob_fraction: 0.0002,
            merge_gap_fraction: 1.5,
            digit_aspect: 0.55,
            lit_threshold: 0.5,
            min_confidence_margin: 0.2,
            debug_history: 9,
        }
    }
}

impl DigitizerConfig {
    /// 光线差、背景杂乱时使用：更多确认帧，更严格的段判定
    pub fn for_noisy_scene() -> Self {
        Self {
            stable_frames: 8,
            miss_tolerance: 1,
            threshold_offset: 16,
            min_confidence_margin: 0.3,
            ..Self::default()
        }
    }

    /// 画面稳定时使用：更快给出读数
    pub fn for_quick_read() -> Self {
        Self {
            stable_frames: 3,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DigitizerError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DigitizerError> {
        if self.stable_frames == 0 {
            return Err(DigitizerError::InvalidConfig(
                "stable_frames must be at least 1".into(),
            ));
        }
        if self.digit_count == DigitCount::Fixed(0) {
            return Err(DigitizerError::InvalidConfig(
                "digit_count must be at least 1".into(),
            ));
        }

        let fractions = [
            ("roi_fraction", self.roi_fraction),
            ("min_area_fraction", self.min_area_fraction),
            ("max_area_fraction", self.max_area_fraction),
            ("min_height_fraction", self.min_height_fraction),
            ("max_height_fraction", self.max_height_fraction),
            ("median_fraction", self.median_fraction),
            ("threshold_block_fraction", self.threshold_block_fraction),
            ("lit_threshold", self.lit_threshold),
        ];
        for (name, value) in fractions {
            if !(value > 0.0 && value <= 1.0) {
                return Err(DigitizerError::InvalidConfig(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.min_area_fraction > self.max_area_fraction {
            return Err(DigitizerError::InvalidConfig(
                "min_area_fraction exceeds max_area_fraction".into(),
            ));
        }
        if self.min_height_fraction > self.max_height_fraction {
            return Err(DigitizerError::InvalidConfig(
                "min_height_fraction exceeds max_height_fraction".into(),
            ));
        }
        if !(self.min_aspect_ratio > 0.0) || self.min_aspect_ratio > self.max_aspect_ratio {
            return Err(DigitizerError::InvalidConfig(format!(
                "aspect ratio range [{}, {}] is invalid",
                self.min_aspect_ratio, self.max_aspect_ratio
            )));
        }
        if !(self.digit_aspect > 0.0) || !(self.merge_gap_fraction >= 0.0) {
            return Err(DigitizerError::InvalidConfig(
                "digit_aspect must be positive and merge_gap_fraction non-negative".into(),
            ));
        }
        if !(self.min_blob_fraction >= 0.0 && self.min_blob_fraction < 1.0) {
            return Err(DigitizerError::InvalidConfig(
                "min_blob_fraction must be in [0, 1)".into(),
            ));
        }
        if !(self.noise_offset_factor >= 0.0) {
            return Err(DigitizerError::InvalidConfig(
                "noise_offset_factor must be non-negative".into(),
            ));
        }
        if !(self.min_confidence_margin >= 0.0) {
            return Err(DigitizerError::InvalidConfig(
                "min_confidence_margin must be non-negative".into(),
            ));
        }

        Ok(())
    }

    pub(crate) fn expected_digits(&self) -> Option<usize> {
        match self.digit_count {
            DigitCount::Fixed(n) => Some(n as usize),
            DigitCount::Auto => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(DigitizerConfig::default().validate().is_ok());
        assert!(DigitizerConfig::for_noisy_scene().validate().is_ok());
        assert!(DigitizerConfig::for_quick_read().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            DigitizerConfig::from_json(r#"{"stable_frames": 7, "digit_count": "auto"}"#).unwrap();
        assert_eq!(config.stable_frames, 7);
        assert_eq!(config.digit_count, DigitCount::Auto);
        assert_eq!(config.roi_fraction, DigitizerConfig::default().roi_fraction);
    }

    #[test]
    fn test_json_fixed_count_and_polarity() {
        let config =
            DigitizerConfig::from_json(r#"{"digit_count": {"fixed": 3}, "polarity": "lit_dark"}"#)
                .unwrap();
        assert_eq!(config.digit_count, DigitCount::Fixed(3));
        assert_eq!(config.polarity, Polarity::LitDark);
    }

    #[test]
    fn test_zero_stable_frames_rejected() {
        let config = DigitizerConfig {
            stable_frames: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DigitizerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_inverted_area_range_rejected() {
        let config = DigitizerConfig {
            min_area_fraction: 0.5,
            max_area_fraction: 0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(matches!(
            DigitizerConfig::from_json("{not json"),
            Err(DigitizerError::ConfigJson(_))
        ));
        assert!(DigitizerConfig::from_json(r#"{"roi_fraction": 1.5}"#).is_err());
    }

    #[test]
    fn test_negative_noise_factor_rejected() {
        assert!(DigitizerConfig::from_json(r#"{"noise_offset_factor": -1.0}"#).is_err());
        let off = DigitizerConfig::from_json(r#"{"noise_offset_factor": 0.0}"#).unwrap();
        assert_eq!(off.noise_offset_factor, 0.0);
    }
}
