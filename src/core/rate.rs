use crate::core::{RateDirection, Result, SourceError};

/// 支持的最大播放速率（实际上不限速）
pub const MAX_RATE: f32 = 1_000_000.0;

/// 最慢速率（0 表示支持单帧刷新）
pub const SLOWEST_RATE: f32 = 0.0;

/// 正常播放速率
pub const NORMAL_RATE: f32 = 1.0;

/// 检查速率是否可以被接受
///
/// thin 模式和倒放都不支持；超出 ±MAX_RATE 的速率被拒绝
pub fn validate_rate(thin: bool, rate: f32) -> Result<()> {
    if thin {
        return Err(SourceError::ThinningUnsupported);
    }
    if rate.is_nan() {
        return Err(SourceError::UnsupportedRate(rate));
    }
    if rate < 0.0 {
        return Err(SourceError::ReverseUnsupported);
    }
    if rate > MAX_RATE {
        return Err(SourceError::UnsupportedRate(rate));
    }
    Ok(())
}

/// 最快速率
pub fn fastest_rate(direction: RateDirection) -> Result<f32> {
    match direction {
        RateDirection::Forward => Ok(MAX_RATE),
        RateDirection::Reverse => Err(SourceError::ReverseUnsupported),
    }
}

/// 最慢速率
pub fn slowest_rate(direction: RateDirection) -> Result<f32> {
    match direction {
        RateDirection::Forward => Ok(SLOWEST_RATE),
        RateDirection::Reverse => Err(SourceError::ReverseUnsupported),
    }
}

/// 最接近的可支持速率
pub fn nearest_supported_rate(rate: f32) -> f32 {
    if rate.is_nan() {
        NORMAL_RATE
    } else {
        rate.clamp(SLOWEST_RATE, MAX_RATE)
    }
}
