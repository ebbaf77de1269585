use crate::core::{Result, SourceError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 媒体源配置
///
/// 所有字段都有默认值，JSON 中可以只写需要覆盖的部分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// 工作线程数（ThreadPoolWorkQueue 使用）
    pub worker_threads: usize,
    /// 读包缓冲区初始大小（字节）
    pub initial_sample_capacity: usize,
    /// 读包缓冲区上限（字节），超过则视为错误，保证重试循环有界
    pub max_sample_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            initial_sample_capacity: 64 * 1024,
            max_sample_size: 64 * 1024 * 1024,
        }
    }
}

impl SourceConfig {
    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SourceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(SourceError::InvalidRequest(
                "worker_threads 必须大于 0".to_string(),
            ));
        }
        if self.initial_sample_capacity == 0 {
            return Err(SourceError::InvalidRequest(
                "initial_sample_capacity 必须大于 0".to_string(),
            ));
        }
        if self.initial_sample_capacity > self.max_sample_size {
            return Err(SourceError::InvalidRequest(format!(
                "initial_sample_capacity ({}) 超过 max_sample_size ({})",
                self.initial_sample_capacity, self.max_sample_size
            )));
        }
        Ok(())
    }
}
