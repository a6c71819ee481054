//! 读数后处理：补上隐含的小数点、单位换算。引擎本身只输出数字串。

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const KG_PER_LB: f64 = 0.453_592_37;

#[derive(Debug, Error, PartialEq)]
pub enum ReadingError {
    #[error("Reading contains non-digit characters: {0:?}")]
    NotNumeric(String),
    #[error("Reading {text:?} is too short for {fraction_digits} fractional digits")]
    TooShort { text: String, fraction_digits: usize },
    #[error("Unknown weight unit: {0:?}")]
    UnknownUnit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightUnit {
    #[default]
    Kg,
    Lb,
}

impl FromStr for WeightUnit {
    type Err = ReadingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kg" => Ok(WeightUnit::Kg),
            "lb" | "lbs" => Ok(WeightUnit::Lb),
            _ => Err(ReadingError::UnknownUnit(s.to_string())),
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightUnit::Kg => write!(f, "kg"),
            WeightUnit::Lb => write!(f, "lb"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weight {
    pub value: f64,
    pub unit: WeightUnit,
}

impl Weight {
    pub fn new(value: f64, unit: WeightUnit) -> Self {
        Self { value, unit }
    }

    /// 按秤的约定解析：最后 `fraction_digits` 位是小数部分
    pub fn from_reading(
        text: &str,
        fraction_digits: usize,
        unit: WeightUnit,
    ) -> Result<Self, ReadingError> {
        Ok(Self::new(parse_reading(text, fraction_digits)?, unit))
    }

    pub fn to_kilograms(&self) -> f64 {
        match self.unit {
            WeightUnit::Kg => self.value,
            WeightUnit::Lb => self.value * KG_PER_LB,
        }
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} {}", self.value, self.unit)
    }
}

/// "0512" + 1 位小数 → 51.2
pub fn parse_reading(text: &str, fraction_digits: usize) -> Result<f64, ReadingError> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ReadingError::NotNumeric(text.to_string()));
    }
    if text.len() <= fraction_digits {
        return Err(ReadingError::TooShort {
            text: text.to_string(),
            fraction_digits,
        });
    }

    let (whole, fraction) = text.split_at(text.len() - fraction_digits);
    let formatted = if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    };
    formatted
        .parse::<f64>()
        .map_err(|_| ReadingError::NotNumeric(text.to_string()))
}
