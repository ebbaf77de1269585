use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 流的主类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MajorType {
    Audio,
    Video,
    Subtitle,
    Other,
}

/// 流格式（解封装器给出的编码格式描述，数据仍是压缩的）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamFormat {
    Audio {
        codec: String,
        sample_rate: u32,
        channels: u16,
    },
    Video {
        codec: String,
        width: u32,
        height: u32,
        fps: f64,
    },
    Subtitle {
        codec: String,
    },
    Other {
        codec: String,
    },
}

impl StreamFormat {
    pub fn major_type(&self) -> MajorType {
        match self {
            StreamFormat::Audio { .. } => MajorType::Audio,
            StreamFormat::Video { .. } => MajorType::Video,
            StreamFormat::Subtitle { .. } => MajorType::Subtitle,
            StreamFormat::Other { .. } => MajorType::Other,
        }
    }

    pub fn codec(&self) -> &str {
        match self {
            StreamFormat::Audio { codec, .. }
            | StreamFormat::Video { codec, .. }
            | StreamFormat::Subtitle { codec }
            | StreamFormat::Other { codec } => codec,
        }
    }
}

/// 媒体源状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceState {
    Stopped,
    Paused,
    Running,
    Shutdown,
}

/// Start 的时间格式，目前只支持默认格式（毫秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    Default,
    /// 其他时间格式（例如按帧号），仅用于拒绝
    Custom(u32),
}

/// Start 的起始位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// 空位置：从当前位置继续（暂停恢复）
    Current,
    /// 绝对位置（毫秒），即 seek
    At(i64),
}

impl StartPosition {
    pub fn is_seek(&self) -> bool {
        matches!(self, StartPosition::At(_))
    }
}

/// 媒体样本 - 解封装得到的一个压缩数据包
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub data: Vec<u8>,
    pub pts: Option<i64>,      // 显示时间戳（毫秒）
    pub duration: Option<i64>, // 持续时间（毫秒）
    pub keyframe: bool,
}

/// 请求令牌 - 消费者随 RequestSample 传入，随满足该请求的样本一起返回
#[derive(Clone)]
pub struct Token(Arc<dyn Any + Send + Sync>);

impl Token {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// 两个令牌是否为同一个对象
    pub fn same_as(&self, other: &Token) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:p})", Arc::as_ptr(&self.0))
    }
}

/// 媒体源特性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCharacteristics {
    pub can_seek: bool,
    pub can_pause: bool,
}

/// 速率方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDirection {
    Forward,
    Reverse,
}

/// 单个流的缓冲状态（用于监控和调试）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamStatus {
    pub active: bool,
    pub eos: bool,
    /// 等待请求的样本数
    pub buffered_samples: usize,
    /// 等待样本的令牌数
    pub pending_tokens: usize,
}

/// 媒体源状态快照
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub state: SourceState,
    pub rate: f32,
    pub pending_reads: usize,
    pub streams: Vec<StreamStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_major_type_from_format() {
        let format = StreamFormat::Video {
            codec: "h264".to_string(),
            width: 1920,
            height: 1080,
            fps: 25.0,
        };
        assert_eq!(format.major_type(), MajorType::Video);
        assert_eq!(format.codec(), "h264");
    }

    #[test]
    fn test_token_identity() {
        let a = Token::new(7u32);
        let b = a.clone();
        let c = Token::new(7u32);
        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
        assert_eq!(c.downcast_ref::<u32>(), Some(&7));
        assert_eq!(c.downcast_ref::<i64>(), None);
    }

    #[test]
    fn test_format_serde() {
        let format = StreamFormat::Audio {
            codec: "aac".to_string(),
            sample_rate: 48000,
            channels: 2,
        };
        let json = serde_json::to_string(&format).unwrap();
        assert!(json.contains("\"type\":\"audio\""));
        let back: StreamFormat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, format);
    }
}
