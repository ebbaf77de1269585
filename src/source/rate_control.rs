use crate::core::{RateDirection, Result};

/// 速率能力查询
pub trait RateSupport: Send + Sync {
    fn get_slowest_rate(&self, direction: RateDirection, thin: bool) -> Result<f32>;

    fn get_fastest_rate(&self, direction: RateDirection, thin: bool) -> Result<f32>;

    /// 支持时返回该速率本身；不支持时返回错误，可用 [`crate::core::rate::nearest_supported_rate`] 取最接近的值
    fn is_rate_supported(&self, thin: bool, rate: f32) -> Result<f32>;
}

/// 速率控制
pub trait RateControl: Send + Sync {
    /// 设置速率，成功后在媒体源事件队列上发出 SourceRateChanged
    fn set_rate(&self, thin: bool, rate: f32) -> Result<()>;

    /// 返回 (thin, rate)，thin 总是 false
    fn get_rate(&self) -> Result<(bool, f32)>;
}

/// 可以通过 `get_service` 查询的能力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    RateSupport,
    RateControl,
}

/// 查询到的服务
#[derive(Clone, Copy)]
pub enum Service<'a> {
    RateSupport(&'a dyn RateSupport),
    RateControl(&'a dyn RateControl),
}

impl<'a> Service<'a> {
    pub fn as_rate_support(self) -> Option<&'a dyn RateSupport> {
        match self {
            Service::RateSupport(service) => Some(service),
            _ => None,
        }
    }

    pub fn as_rate_control(self) -> Option<&'a dyn RateControl> {
        match self {
            Service::RateControl(service) => Some(service),
            _ => None,
        }
    }
}
